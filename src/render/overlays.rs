//! Overlay rendering (help, reset confirmation, upload prompt, column picker, range editor).

use crate::range_modal::{RangeFocus, RangeModal};
use crate::render::context::RenderContext;
use crate::render::layout::{centered_rect, centered_rect_fixed};
use crate::{App, InputMode};
use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Clear, List, ListItem, Paragraph, StatefulWidget, Widget, Wrap,
};

fn modal_block<'a>(title: &'a str, ctx: &RenderContext) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .border_style(Style::default().fg(ctx.modal_border_active))
}

pub fn render_overlays(area: Rect, buf: &mut Buffer, app: &mut App, ctx: &RenderContext) {
    match app.input_mode {
        InputMode::Help => render_help_overlay(area, buf, ctx),
        InputMode::ConfirmReset => render_confirm_reset(area, buf, app.confirm_reset_yes, ctx),
        InputMode::Upload => render_upload_prompt(area, buf, app, ctx),
        InputMode::ColumnPicker => render_column_picker(area, buf, app, ctx),
        InputMode::Range => render_range_modal(area, buf, &app.range_modal, ctx),
        InputMode::Normal | InputMode::Search => {}
    }
}

pub fn render_help_overlay(area: Rect, buf: &mut Buffer, ctx: &RenderContext) {
    let popup_area = centered_rect(area, 80, 80);
    Clear.render(popup_area, buf);
    Paragraph::new(crate::help_strings::dashboard())
        .style(Style::default().fg(ctx.text_primary))
        .block(modal_block(" Help ", ctx))
        .render(popup_area, buf);
}

pub fn render_confirm_reset(area: Rect, buf: &mut Buffer, focus_yes: bool, ctx: &RenderContext) {
    let popup_area = centered_rect_fixed(area, 56, 9);
    Clear.render(popup_area, buf);
    let block = modal_block(" Reset dashboard ", ctx);
    let inner = block.inner(popup_area);
    block.render(popup_area, buf);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(3)])
        .split(inner);

    Paragraph::new(
        "Clear the dashboard? It stays empty until the next upload, even after a refresh.",
    )
    .style(Style::default().fg(ctx.text_primary))
    .wrap(Wrap { trim: true })
    .render(chunks[0], buf);

    let buttons = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(10),
            Constraint::Length(2),
            Constraint::Length(10),
            Constraint::Fill(1),
        ])
        .split(chunks[1]);
    let button = |label: &'static str, focused: bool| {
        let style = if focused {
            Style::default().fg(ctx.modal_border_active)
        } else {
            Style::default().fg(ctx.dimmed)
        };
        Paragraph::new(label).centered().block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(style),
        )
    };
    button("Yes", focus_yes).render(buttons[1], buf);
    button("No", !focus_yes).render(buttons[3], buf);
}

fn render_upload_prompt(area: Rect, buf: &mut Buffer, app: &App, ctx: &RenderContext) {
    let popup_area = centered_rect_fixed(area, 70, 5);
    Clear.render(popup_area, buf);
    let block = modal_block(" Upload spreadsheet ", ctx);
    let inner = block.inner(popup_area);
    block.render(popup_area, buf);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Fill(1)])
        .split(inner);
    Paragraph::new("Path to a .csv, .xlsx or .xls file:")
        .style(Style::default().fg(ctx.text_secondary))
        .render(rows[0], buf);
    (&app.upload_input).render(rows[2], buf);
}

fn render_column_picker(area: Rect, buf: &mut Buffer, app: &mut App, ctx: &RenderContext) {
    let height = (app.column_picker.columns.len() as u16 + 2).clamp(5, area.height);
    let popup_area = centered_rect_fixed(area, 48, height);
    Clear.render(popup_area, buf);

    let filter = app.session.filter();
    let items: Vec<ListItem> = app
        .column_picker
        .columns
        .iter()
        .map(|(name, kind)| {
            let mark = if filter.is_selected(name) { "[x] " } else { "[ ] " };
            ListItem::new(Line::from(vec![
                Span::styled(mark, Style::default().fg(ctx.text_primary)),
                Span::styled(name.clone(), Style::default().fg(ctx.column_color(*kind))),
                Span::styled(
                    format!("  {}", kind.label()),
                    Style::default().fg(ctx.dimmed),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(modal_block(" Columns ", ctx))
        .highlight_style(ctx.selected_style());
    StatefulWidget::render(list, popup_area, buf, &mut app.column_picker.list_state);
}

fn render_range_modal(area: Rect, buf: &mut Buffer, modal: &RangeModal, ctx: &RenderContext) {
    let popup_area = centered_rect_fixed(area, 52, 8);
    Clear.render(popup_area, buf);
    let title = format!(" Range: {} ", modal.column().unwrap_or("-"));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(title)
        .border_style(Style::default().fg(ctx.modal_border_active));
    let inner = block.inner(popup_area);
    block.render(popup_area, buf);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
        ])
        .split(inner);

    for (row, label, input, focus) in [
        (rows[0], "Minimum", &modal.min_input, RangeFocus::Min),
        (rows[1], "Maximum", &modal.max_input, RangeFocus::Max),
    ] {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(10), Constraint::Fill(1)])
            .split(row);
        let style = if modal.focus == focus {
            Style::default()
                .fg(ctx.modal_border_active)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(ctx.text_secondary)
        };
        Paragraph::new(label).style(style).render(cols[0], buf);
        input.render(cols[1], buf);
    }

    if let Some(err) = &modal.error {
        Paragraph::new(err.as_str())
            .style(Style::default().fg(ctx.error))
            .wrap(Wrap { trim: true })
            .render(rows[3], buf);
    }
}
