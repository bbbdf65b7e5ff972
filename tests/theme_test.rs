use finsight::config::{AppConfig, ColorParser, Theme};
use ratatui::style::Color;

#[test]
fn test_theme_from_default_config() {
    let config = AppConfig::default();
    let theme = Theme::from_config(&config.theme).expect("default theme should parse");

    for name in ["primary", "error", "table_header", "column_numeric", "tab_active"] {
        assert!(theme.get_optional(name).is_some(), "missing {}", name);
    }
    assert_eq!(theme.get("no_such_color"), Color::Reset);
    assert!(theme.get_optional("no_such_color").is_none());
}

#[test]
fn test_theme_with_custom_colors() {
    let mut config = AppConfig::default();
    config.theme.colors.primary = "#ff0000".to_string();
    config.theme.colors.error = "bright_red".to_string();
    config.theme.colors.column_date = "indexed(33)".to_string();

    let theme = Theme::from_config(&config.theme).expect("custom colors should parse");
    let parser = ColorParser::new();
    assert_eq!(theme.get("primary"), parser.parse("#ff0000").unwrap());
    assert_eq!(theme.get("error"), parser.parse("bright_red").unwrap());
    assert_eq!(theme.get("column_date"), parser.parse("indexed(33)").unwrap());
}

#[test]
fn test_theme_with_invalid_color() {
    let mut config = AppConfig::default();
    config.theme.colors.warning = "orangeish".to_string();

    let err = Theme::from_config(&config.theme).unwrap_err();
    assert!(err.to_string().contains("orangeish"));
}
