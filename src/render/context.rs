use crate::config::{DisplayConfig, Theme};
use crate::schema::ColumnKind;
use ratatui::style::{Color, Modifier, Style};

/// Snapshot of theme colors and display configuration for rendering.
/// Passed to widgets to avoid threading many individual parameters.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub primary: Color,
    pub secondary: Color,
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    pub dimmed: Color,
    pub controls_bg: Color,
    pub keybind_hints: Color,
    pub keybind_labels: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub table_header: Color,
    /// None means "reversed".
    pub table_selected: Option<Color>,
    pub modal_border: Color,
    pub modal_border_active: Color,
    pub tab_active: Color,

    pub numeric_col: Color,
    pub text_col: Color,
    pub date_col: Color,

    pub table_cell_padding: u16,
    pub max_column_width: u16,
}

impl RenderContext {
    pub fn from_theme_and_config(theme: &Theme, display: &DisplayConfig) -> Self {
        let column_color = |name: &str| {
            if display.column_colors {
                theme.get(name)
            } else {
                Color::Reset
            }
        };
        Self {
            primary: theme.get("primary"),
            secondary: theme.get("secondary"),
            success: theme.get("success"),
            error: theme.get("error"),
            warning: theme.get("warning"),
            dimmed: theme.get("dimmed"),
            controls_bg: theme.get("controls_bg"),
            keybind_hints: theme.get("keybind_hints"),
            keybind_labels: theme.get("keybind_labels"),
            text_primary: theme.get("text_primary"),
            text_secondary: theme.get("text_secondary"),
            table_header: theme.get("table_header"),
            table_selected: theme
                .get_optional("table_selected")
                .filter(|c| *c != Color::Reset),
            modal_border: theme.get("modal_border"),
            modal_border_active: theme.get("modal_border_active"),
            tab_active: theme.get("tab_active"),

            numeric_col: column_color("column_numeric"),
            text_col: column_color("column_text"),
            date_col: column_color("column_date"),

            table_cell_padding: display.table_cell_padding,
            max_column_width: display.max_column_width,
        }
    }

    pub fn column_color(&self, kind: ColumnKind) -> Color {
        match kind {
            ColumnKind::Numeric => self.numeric_col,
            ColumnKind::Temporal => self.date_col,
            ColumnKind::Text => self.text_col,
        }
    }

    pub fn selected_style(&self) -> Style {
        match self.table_selected {
            Some(color) => Style::default().bg(color),
            None => Style::default().add_modifier(Modifier::REVERSED),
        }
    }

    /// Color for a risk severity label as sent by the backend.
    pub fn severity_color(&self, severity: Option<&str>) -> Color {
        match severity.map(str::to_ascii_lowercase).as_deref() {
            Some("high") | Some("critical") => self.error,
            Some("medium") | Some("moderate") => self.warning,
            Some("low") => self.success,
            _ => self.text_secondary,
        }
    }
}
