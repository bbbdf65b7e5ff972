//! Insights tab: column statistics, correlations, risks, recommendations and forecast.

use crate::dataset::format_number;
use crate::render::context::RenderContext;
use crate::render::overview::render_placeholder;
use crate::statistics::strongest_correlations;
use crate::App;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Widget, Wrap};

const TOP_CORRELATIONS: usize = 5;

fn heading(title: &str, ctx: &RenderContext) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default()
            .fg(ctx.primary)
            .add_modifier(Modifier::BOLD),
    ))
}

fn dimmed(text: &str, ctx: &RenderContext) -> Line<'static> {
    Line::from(Span::styled(
        format!("  {text}"),
        Style::default().fg(ctx.dimmed),
    ))
}

fn stats_lines(app: &App, ctx: &RenderContext) -> Vec<Line<'static>> {
    let mut lines = vec![heading("Column statistics", ctx)];
    let Some(schema) = app.session.schema() else {
        return lines;
    };
    if schema.stats.is_empty() {
        lines.push(dimmed("No numeric columns.", ctx));
        return lines;
    }
    let name_width = schema
        .stats
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0)
        .max(6);
    lines.push(Line::from(Span::styled(
        format!(
            "  {:<w$}  {:>14}  {:>14}  {:>14}  {:>6}",
            "Column",
            "Min",
            "Max",
            "Mean",
            "Count",
            w = name_width
        ),
        Style::default().fg(ctx.table_header),
    )));
    for (name, s) in schema.stats.iter() {
        lines.push(Line::from(Span::styled(
            format!(
                "  {:<w$}  {:>14}  {:>14}  {:>14.2}  {:>6}",
                name,
                format_number(s.min),
                format_number(s.max),
                s.mean,
                s.count,
                w = name_width
            ),
            Style::default().fg(ctx.numeric_col),
        )));
    }
    lines
}

fn correlation_lines(app: &mut App, ctx: &RenderContext) -> Vec<Line<'static>> {
    let mut lines = vec![heading("Strongest correlations", ctx)];
    let cells = app.correlations().unwrap_or_default();
    let top = strongest_correlations(&cells, TOP_CORRELATIONS);
    if top.is_empty() {
        lines.push(dimmed("Needs at least two numeric columns.", ctx));
        return lines;
    }
    for cell in top {
        let color = if cell.value.abs() >= 0.7 {
            ctx.warning
        } else {
            ctx.text_primary
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {} / {}  ", cell.x, cell.y),
                Style::default().fg(ctx.text_secondary),
            ),
            Span::styled(format!("{:+.2}", cell.value), Style::default().fg(color)),
        ]));
    }
    lines
}

fn narrative_lines(app: &App, ctx: &RenderContext) -> Vec<Line<'static>> {
    let narrative = app.session.narrative();
    let mut lines = vec![heading("Risks", ctx)];
    match narrative.map(|n| n.risks.as_slice()).unwrap_or_default() {
        [] => lines.push(dimmed("None reported.", ctx)),
        risks => {
            for risk in risks {
                let severity = risk.severity.as_deref().unwrap_or("info");
                let mut spans = vec![Span::styled(
                    format!("  [{}] ", severity.to_uppercase()),
                    Style::default().fg(ctx.severity_color(risk.severity.as_deref())),
                )];
                if let Some(kind) = &risk.kind {
                    spans.push(Span::styled(
                        format!("{kind}: "),
                        Style::default().fg(ctx.text_secondary),
                    ));
                }
                spans.push(Span::styled(
                    risk.message.clone(),
                    Style::default().fg(ctx.text_primary),
                ));
                lines.push(Line::from(spans));
            }
        }
    }

    lines.push(Line::from(""));
    lines.push(heading("Recommendations", ctx));
    match narrative
        .map(|n| n.recommendations.as_slice())
        .unwrap_or_default()
    {
        [] => lines.push(dimmed("None reported.", ctx)),
        recs => {
            for rec in recs {
                let mut spans = vec![Span::styled(
                    format!("  * {}", rec.action),
                    Style::default().fg(ctx.text_primary),
                )];
                let detail: Vec<&str> = [rec.category.as_deref(), rec.impact.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect();
                if !detail.is_empty() {
                    spans.push(Span::styled(
                        format!(" ({})", detail.join(", ")),
                        Style::default().fg(ctx.text_secondary),
                    ));
                }
                lines.push(Line::from(spans));
            }
        }
    }

    lines.push(Line::from(""));
    lines.push(heading("Forecast", ctx));
    match narrative.and_then(|n| n.forecast.as_deref()) {
        Some(text) => lines.push(Line::from(Span::styled(
            format!("  {text}"),
            Style::default().fg(ctx.text_primary),
        ))),
        None => lines.push(dimmed("Not available.", ctx)),
    }
    lines
}

pub fn render_insights(area: Rect, buf: &mut Buffer, app: &mut App, ctx: &RenderContext) {
    if render_placeholder(area, buf, app, ctx) {
        return;
    }

    let mut lines = stats_lines(app, ctx);
    lines.push(Line::from(""));
    lines.extend(correlation_lines(app, ctx));
    lines.push(Line::from(""));
    lines.extend(narrative_lines(app, ctx));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ctx.modal_border))
        .title(" Insights ");
    let visible = block.inner(area).height;
    let max_scroll = (lines.len() as u16).saturating_sub(visible);
    app.insights_scroll = app.insights_scroll.min(max_scroll);

    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.insights_scroll, 0))
        .block(block)
        .render(area, buf);
}
