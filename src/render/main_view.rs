//! Chrome around the active tab: tab bar, status line, control bar and debug row.

use crate::render::context::RenderContext;
use crate::session::{DashboardState, DashboardTab};
use crate::widgets::controls::Controls;
use crate::{App, InputMode, StatusMessage};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Tabs, Widget};

/// Key hints for the control bar in the current mode and tab.
pub fn control_pairs(mode: InputMode, tab: DashboardTab) -> Vec<(&'static str, &'static str)> {
    match mode {
        InputMode::Normal => match tab {
            DashboardTab::Overview => vec![
                ("Tab", "Tabs"),
                ("u", "Upload"),
                ("l", "Language"),
                ("r", "Refresh"),
                ("R", "Reset"),
                ("?", "Help"),
                ("q", "Quit"),
            ],
            DashboardTab::Data => vec![
                ("/", "Search"),
                ("c", "Columns"),
                ("f", "Range"),
                ("←→", "Scroll"),
                ("u", "Upload"),
                ("l", "Language"),
                ("?", "Help"),
                ("q", "Quit"),
            ],
            DashboardTab::Insights => vec![
                ("↑↓", "Scroll"),
                ("Tab", "Tabs"),
                ("l", "Language"),
                ("?", "Help"),
                ("q", "Quit"),
            ],
        },
        InputMode::Search => vec![("Enter", "Keep"), ("Esc", "Restore")],
        InputMode::Upload => vec![("Enter", "Upload"), ("Esc", "Cancel")],
        InputMode::ColumnPicker => vec![
            ("Space", "Toggle"),
            ("a", "All"),
            ("n", "None"),
            ("o", "Only"),
            ("Esc", "Close"),
        ],
        InputMode::Range => vec![
            ("Tab", "Min/Max"),
            ("↑↓", "Column"),
            ("Enter", "Apply"),
            ("Ctrl-D", "Remove"),
            ("Esc", "Cancel"),
        ],
        InputMode::ConfirmReset => vec![("y", "Yes"), ("n", "No")],
        InputMode::Help => vec![("Any key", "Close")],
    }
}

pub fn render_tabs(area: Rect, buf: &mut Buffer, app: &App, ctx: &RenderContext) {
    let locale = app.session.locale();
    let right = format!(" {} ", locale.display_name());
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(right.chars().count() as u16),
        ])
        .split(area);

    Tabs::new(DashboardTab::ALL.iter().map(|t| t.title()))
        .select(app.session.tab().index())
        .style(Style::default().fg(ctx.text_secondary))
        .highlight_style(
            Style::default()
                .fg(ctx.tab_active)
                .add_modifier(Modifier::BOLD),
        )
        .divider("|")
        .render(chunks[0], buf);

    Paragraph::new(right)
        .style(Style::default().fg(ctx.secondary))
        .right_aligned()
        .render(chunks[1], buf);
}

/// One line: the latest message if any, otherwise a summary of the session.
pub fn render_status_line(area: Rect, buf: &mut Buffer, app: &App, ctx: &RenderContext) {
    let line = match &app.status {
        Some(StatusMessage::Error(msg)) => {
            Line::from(Span::styled(msg.as_str(), Style::default().fg(ctx.error)))
        }
        Some(StatusMessage::Info(msg)) => {
            Line::from(Span::styled(msg.as_str(), Style::default().fg(ctx.success)))
        }
        None => {
            let text = match app.session.state() {
                DashboardState::Uninitialized => String::new(),
                DashboardState::Loading => "Loading dashboard...".to_string(),
                DashboardState::Empty => "No data. Press 'u' to upload a spreadsheet.".to_string(),
                DashboardState::Loaded => match (app.session.dataset(), app.session.schema()) {
                    (Some(dataset), Some(schema)) => format!(
                        "{} rows, {} columns",
                        dataset.len(),
                        schema.info.total_columns()
                    ),
                    _ => String::new(),
                },
            };
            Line::from(Span::styled(text, Style::default().fg(ctx.text_secondary)))
        }
    };
    Paragraph::new(line).render(area, buf);
}

pub fn render_control_bar(area: Rect, buf: &mut Buffer, app: &mut App, ctx: &RenderContext) {
    let tab = app.session.tab();
    let mut controls = Controls::from_context(control_pairs(app.input_mode, tab), ctx)
        .with_busy(app.is_busy(), app.throbber_frame)
        .with_dimmed(app.input_mode == InputMode::Help);
    if tab == DashboardTab::Data && app.session.state() == DashboardState::Loaded {
        if let Some((view, _)) = app.projected() {
            let total = app.session.dataset().map_or(0, |d| d.len());
            controls = controls.with_row_count(view.len(), total);
        }
    }
    (&controls).render(area, buf);
}

pub fn render_debug_row(area: Rect, buf: &mut Buffer, app: &App, ctx: &RenderContext) {
    let text = format!(
        "state={:?} tab={:?} locale={} mode={:?} filter_narrowed={} cache={}/{}",
        app.session.state(),
        app.session.tab(),
        app.session.locale(),
        app.input_mode,
        app.session
            .schema()
            .is_some_and(|s| app.session.filter().is_narrowed(&s.info)),
        app.projection.hits(),
        app.projection.misses(),
    );
    Paragraph::new(text)
        .style(Style::default().fg(ctx.dimmed))
        .render(area, buf);
}
