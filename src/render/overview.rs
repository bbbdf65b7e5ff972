//! Overview tab: headline figures, health narrative and a dataset summary.

use crate::render::context::RenderContext;
use crate::render::layout::centered_rect_fixed;
use crate::session::DashboardState;
use crate::App;
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Gauge, Paragraph, Widget, Wrap};

/// Two decimals with thousands separators.
pub fn format_amount(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

fn panel(title: &str, ctx: &RenderContext) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ctx.modal_border))
        .title(format!(" {title} "))
}

/// Message shown in place of a tab's content while there is nothing to show.
pub fn render_placeholder(area: Rect, buf: &mut Buffer, app: &App, ctx: &RenderContext) -> bool {
    let lines: Vec<Line> = match app.session.state() {
        DashboardState::Loaded => return false,
        DashboardState::Uninitialized => vec![],
        DashboardState::Loading => vec![Line::from(Span::styled(
            "Loading dashboard...",
            Style::default().fg(ctx.text_secondary),
        ))],
        DashboardState::Empty => {
            let mut lines = vec![
                Line::from(Span::styled(
                    "No data to show",
                    Style::default()
                        .fg(ctx.text_primary)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Press 'u' to upload a CSV or Excel file.",
                    Style::default().fg(ctx.text_secondary),
                )),
            ];
            if let Some(err) = app.session.last_error() {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    err.to_string(),
                    Style::default().fg(ctx.error),
                )));
                lines.push(Line::from(Span::styled(
                    "Press 'r' to try again.",
                    Style::default().fg(ctx.text_secondary),
                )));
            }
            lines
        }
    };
    let height = lines.len() as u16;
    let popup = centered_rect_fixed(area, area.width.min(72), height);
    Paragraph::new(lines)
        .centered()
        .wrap(Wrap { trim: true })
        .render(popup, buf);
    true
}

pub fn render_overview(area: Rect, buf: &mut Buffer, app: &mut App, ctx: &RenderContext) {
    if render_placeholder(area, buf, app, ctx) {
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(11), Constraint::Fill(1)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Fill(1)])
        .split(top[1]);

    render_key_figures(top[0], buf, app, ctx);
    render_health(right[0], buf, app, ctx);
    render_dataset_summary(right[1], buf, app, ctx);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Fill(1)])
        .split(bottom[1]);

    render_summary(bottom[0], buf, app, ctx);
    render_benchmarks(side[0], buf, app, ctx);
    render_top_expenses(side[1], buf, app, ctx);
}

fn status_color(status: &str, ctx: &RenderContext) -> Color {
    match status.to_lowercase().as_str() {
        "critical" => ctx.error,
        "warning" => ctx.warning,
        _ => ctx.success,
    }
}

fn render_summary(area: Rect, buf: &mut Buffer, app: &App, ctx: &RenderContext) {
    let narrative = app.session.narrative();
    let label = Style::default().fg(ctx.text_secondary);
    let summary = narrative
        .and_then(|n| n.summary.as_deref())
        .unwrap_or("No summary available.");
    let mut lines = vec![Line::from(Span::styled(
        summary.to_string(),
        Style::default().fg(ctx.text_primary),
    ))];

    if let Some(wc) = narrative.and_then(|n| n.working_capital.as_ref()) {
        let status = wc.status.as_deref().unwrap_or("Unknown");
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("Working capital  ", label),
            Span::styled(
                status.to_string(),
                Style::default()
                    .fg(status_color(status, ctx))
                    .add_modifier(Modifier::BOLD),
            ),
        ]));
        if let Some(message) = &wc.message {
            lines.push(Line::from(Span::styled(
                message.clone(),
                Style::default().fg(ctx.text_primary),
            )));
        }
    }

    if let Some(score) = narrative.and_then(|n| n.creditworthiness_score) {
        lines.push(Line::from(""));
        let mut spans = vec![
            Span::styled("Creditworthiness ", label),
            Span::styled(
                format!("{:.0}/100", score),
                Style::default().fg(ctx.primary),
            ),
        ];
        if let Some(rationale) = narrative.and_then(|n| n.creditworthiness_rationale.as_deref()) {
            spans.push(Span::styled(format!("  {rationale}"), label));
        }
        lines.push(Line::from(spans));
    }

    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(panel("Summary", ctx))
        .render(area, buf);
}

/// One benchmark row: `(label, yours, industry average, lower_is_better)`.
type BenchmarkRow = (&'static str, Option<f64>, Option<f64>, bool);

fn render_benchmarks(area: Rect, buf: &mut Buffer, app: &App, ctx: &RenderContext) {
    let block = panel("Industry benchmarks", ctx);
    let inner = block.inner(area);
    block.render(area, buf);

    let Some(bench) = app.session.narrative().and_then(|n| n.benchmarks.as_ref()) else {
        Paragraph::new("No benchmark comparison for this dataset.")
            .style(Style::default().fg(ctx.dimmed))
            .render(inner, buf);
        return;
    };
    let metrics = app.session.metrics();
    let rows: [BenchmarkRow; 3] = [
        (
            "Profit margin",
            metrics.and_then(|m| m.profit_margin),
            bench.profit_margin_avg,
            false,
        ),
        (
            "Expense ratio",
            metrics.and_then(|m| m.expense_ratio),
            bench.expense_ratio_avg,
            true,
        ),
        ("Revenue growth", None, bench.revenue_growth_avg, false),
    ];

    let label = Style::default().fg(ctx.text_secondary);
    let mut lines: Vec<Line> = rows
        .iter()
        .filter(|(_, _, avg, _)| avg.is_some())
        .map(|(name, yours, avg, lower_is_better)| {
            let avg = avg.unwrap_or_default();
            let mut spans = vec![Span::styled(format!("{:<15}", name), label)];
            match yours {
                Some(v) => {
                    let ahead = if *lower_is_better { *v <= avg } else { *v >= avg };
                    spans.push(Span::styled(
                        format!("you {:>6.1}%  ", v),
                        Style::default().fg(ctx.text_primary),
                    ));
                    spans.push(Span::styled(format!("avg {:>6.1}%  ", avg), label));
                    spans.push(if ahead {
                        Span::styled("ahead", Style::default().fg(ctx.success))
                    } else {
                        Span::styled("behind", Style::default().fg(ctx.error))
                    });
                }
                None => spans.push(Span::styled(format!("avg {:>6.1}%", avg), label)),
            }
            Line::from(spans)
        })
        .collect();
    if let Some(comparison) = &bench.user_comparison {
        lines.push(Line::from(Span::styled(
            comparison.clone(),
            Style::default().fg(ctx.text_primary),
        )));
    }
    Paragraph::new(lines).render(inner, buf);
}

fn render_top_expenses(area: Rect, buf: &mut Buffer, app: &App, ctx: &RenderContext) {
    let block = panel("Top expenses", ctx);
    let inner = block.inner(area);
    block.render(area, buf);

    let expenses = app
        .session
        .metrics()
        .map(|m| m.top_expenses.as_slice())
        .unwrap_or_default();
    if expenses.is_empty() {
        Paragraph::new("No expense breakdown for this dataset.")
            .style(Style::default().fg(ctx.dimmed))
            .render(inner, buf);
        return;
    }

    let label_width = expenses
        .iter()
        .map(|e| e.category.chars().count())
        .max()
        .unwrap_or(0)
        .min(20);
    let amounts: Vec<String> = expenses.iter().map(|e| format_amount(e.amount)).collect();
    let amount_width = amounts.iter().map(String::len).max().unwrap_or(0);
    let bar_room = (inner.width as usize).saturating_sub(label_width + amount_width + 4);
    let largest = expenses.iter().map(|e| e.amount.abs()).fold(0.0, f64::max);

    let lines: Vec<Line> = expenses
        .iter()
        .zip(&amounts)
        .map(|(e, amount)| {
            let bar = if largest > 0.0 {
                ((e.amount.abs() / largest) * bar_room as f64).round() as usize
            } else {
                0
            };
            let name: String = e.category.chars().take(label_width).collect();
            Line::from(vec![
                Span::styled(
                    format!("{:<width$}  ", name, width = label_width),
                    Style::default().fg(ctx.text_secondary),
                ),
                Span::styled(
                    format!("{:>width$}  ", amount, width = amount_width),
                    Style::default().fg(ctx.numeric_col),
                ),
                Span::styled("█".repeat(bar), Style::default().fg(ctx.primary)),
            ])
        })
        .collect();
    Paragraph::new(lines).render(inner, buf);
}

fn render_key_figures(area: Rect, buf: &mut Buffer, app: &App, ctx: &RenderContext) {
    let block = panel("Key figures", ctx);
    let inner = block.inner(area);
    block.render(area, buf);

    let entries = app
        .session
        .metrics()
        .map(|m| m.entries())
        .unwrap_or_default();
    if entries.is_empty() {
        Paragraph::new("No headline figures for this dataset.")
            .style(Style::default().fg(ctx.dimmed))
            .render(inner, buf);
        return;
    }

    let label_width = entries
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let lines: Vec<Line> = entries
        .iter()
        .map(|(label, value)| {
            let color = if *value < 0.0 { ctx.error } else { ctx.numeric_col };
            Line::from(vec![
                Span::styled(
                    format!("{:<width$}  ", label, width = label_width),
                    Style::default().fg(ctx.text_secondary),
                ),
                Span::styled(format_amount(*value), Style::default().fg(color)),
            ])
        })
        .collect();
    Paragraph::new(lines).render(inner, buf);
}

fn render_health(area: Rect, buf: &mut Buffer, app: &App, ctx: &RenderContext) {
    let block = panel("Health", ctx);
    let inner = block.inner(area);
    block.render(area, buf);

    let narrative = app.session.narrative();
    let status = narrative
        .and_then(|n| n.status.as_deref())
        .unwrap_or("Not assessed");
    match narrative.and_then(|n| n.health_score) {
        Some(score) => {
            let ratio = (score / 100.0).clamp(0.0, 1.0);
            let color = if score >= 70.0 {
                ctx.success
            } else if score >= 40.0 {
                ctx.warning
            } else {
                ctx.error
            };
            Gauge::default()
                .gauge_style(Style::default().fg(color))
                .ratio(ratio)
                .label(format!("{:.0}/100  {}", score, status))
                .render(inner, buf);
        }
        None => Paragraph::new(status)
            .style(Style::default().fg(ctx.dimmed))
            .render(inner, buf),
    }
}

fn render_dataset_summary(area: Rect, buf: &mut Buffer, app: &App, ctx: &RenderContext) {
    let (Some(dataset), Some(schema)) = (app.session.dataset(), app.session.schema()) else {
        return;
    };
    let info = &schema.info;
    let label = Style::default().fg(ctx.text_secondary);
    let value = Style::default().fg(ctx.text_primary);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Rows     ", label),
            Span::styled(dataset.len().to_string(), value),
        ]),
        Line::from(vec![
            Span::styled("Columns  ", label),
            Span::styled(info.total_columns().to_string(), value),
            Span::styled("  (", label),
            Span::styled(
                format!("{} numeric", info.numeric_count()),
                Style::default().fg(ctx.numeric_col),
            ),
            Span::styled(", ", label),
            Span::styled(
                format!("{} text", info.text_count()),
                Style::default().fg(ctx.text_col),
            ),
            Span::styled(", ", label),
            Span::styled(
                format!("{} date", info.date_count()),
                Style::default().fg(ctx.date_col),
            ),
            Span::styled(")", label),
        ]),
    ];
    if let Some(report_id) = app.session.report_id() {
        lines.push(Line::from(vec![
            Span::styled("Report   ", label),
            Span::styled(report_id.to_string(), value),
        ]));
    }
    Paragraph::new(lines)
        .block(panel("Dataset", ctx))
        .render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(999.5), "999.50");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(-45000.0), "-45,000.00");
        assert_eq!(format_amount(-0.001), "0.00");
    }
}
