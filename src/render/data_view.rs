//! Data tab: active filters, optional search strip and the projected table.

use crate::dataset::format_number;
use crate::render::context::RenderContext;
use crate::render::overview::render_placeholder;
use crate::widgets::datatable::DataTable;
use crate::{App, InputMode};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, StatefulWidget, Widget};

/// Short description of the filters that narrow the view, if any.
fn filter_summary(app: &App, ctx: &RenderContext) -> Option<Line<'static>> {
    let filter = app.session.filter();
    let schema = app.session.schema()?;
    if !filter.is_narrowed(&schema.info) {
        return None;
    }

    let label = Style::default().fg(ctx.text_secondary);
    let value = Style::default().fg(ctx.primary);
    let mut spans = vec![Span::styled("Filters: ", label)];
    let hidden = schema
        .info
        .total_columns()
        .saturating_sub(filter.selected_columns.len());
    if hidden > 0 {
        spans.push(Span::styled(format!("{hidden} hidden column(s)"), value));
    }
    for (column, range) in &filter.range_filters {
        if spans.len() > 1 {
            spans.push(Span::styled("; ", label));
        }
        spans.push(Span::styled(
            format!(
                "{} in [{}, {}]",
                column,
                format_number(range.min),
                format_number(range.max)
            ),
            value,
        ));
    }
    if !filter.search_term.is_empty() {
        if spans.len() > 1 {
            spans.push(Span::styled("; ", label));
        }
        spans.push(Span::styled(format!("search \"{}\"", filter.search_term), value));
    }
    Some(Line::from(spans))
}

pub fn render_data_view(area: Rect, buf: &mut Buffer, app: &mut App, ctx: &RenderContext) {
    if render_placeholder(area, buf, app, ctx) {
        return;
    }
    let Some((view, schema)) = app.projected() else {
        return;
    };

    let searching = app.input_mode == InputMode::Search;
    let summary = filter_summary(app, ctx);
    let mut constraints = Vec::new();
    if searching {
        constraints.push(Constraint::Length(1));
    }
    if summary.is_some() {
        constraints.push(Constraint::Length(1));
    }
    constraints.push(Constraint::Fill(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let mut next = 0;
    if searching {
        let strip = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(8), Constraint::Fill(1)])
            .split(chunks[next]);
        Paragraph::new("Search: ")
            .style(Style::default().fg(ctx.keybind_hints))
            .render(strip[0], buf);
        (&app.search_input).render(strip[1], buf);
        next += 1;
    }
    if let Some(line) = summary {
        Paragraph::new(line).render(chunks[next], buf);
        next += 1;
    }

    if !view.columns.is_empty() && view.is_empty() {
        Paragraph::new("No rows match the current filters.")
            .style(Style::default().fg(ctx.dimmed))
            .render(chunks[next], buf);
        return;
    }

    app.table.clamp_to(view.len(), view.columns.len());
    DataTable::new(&view, &schema.info, ctx).render(chunks[next], buf, &mut app.table);
}
