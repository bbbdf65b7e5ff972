use crate::dataset::cell;
use crate::projector::ProjectedView;
use crate::render::context::RenderContext;
use crate::schema::{ColumnInfo, ColumnKind};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Style, Stylize},
    text::Line,
    widgets::{Cell, Paragraph, Row, StatefulWidget, Table, TableState, Widget},
};

/// Scroll position of the data table: selected row plus first visible column.
#[derive(Debug, Default, Clone)]
pub struct DataTableState {
    pub table_state: TableState,
    pub column_offset: usize,
}

impl DataTableState {
    pub fn reset(&mut self) {
        self.table_state = TableState::default();
        self.column_offset = 0;
    }

    pub fn selected(&self) -> Option<usize> {
        self.table_state.selected()
    }

    pub fn scroll_down(&mut self, by: usize, row_count: usize) {
        if row_count == 0 {
            self.table_state.select(None);
            return;
        }
        let next = self
            .table_state
            .selected()
            .map_or(0, |i| i.saturating_add(by))
            .min(row_count - 1);
        self.table_state.select(Some(next));
    }

    pub fn scroll_up(&mut self, by: usize) {
        let next = self.table_state.selected().map_or(0, |i| i.saturating_sub(by));
        self.table_state.select(Some(next));
    }

    pub fn scroll_right(&mut self, column_count: usize) {
        if self.column_offset + 1 < column_count {
            self.column_offset += 1;
        }
    }

    pub fn scroll_left(&mut self) {
        self.column_offset = self.column_offset.saturating_sub(1);
    }

    /// Keep the selection and column offset inside a (possibly smaller) new view.
    pub fn clamp_to(&mut self, row_count: usize, column_count: usize) {
        match self.table_state.selected() {
            Some(_) if row_count == 0 => self.table_state.select(None),
            Some(i) if i >= row_count => self.table_state.select(Some(row_count - 1)),
            None if row_count > 0 => self.table_state.select(Some(0)),
            _ => {}
        }
        if row_count == 0 {
            *self.table_state.offset_mut() = 0;
        }
        self.column_offset = self.column_offset.min(column_count.saturating_sub(1));
    }
}

/// Table view of a [`ProjectedView`], colored by column kind.
pub struct DataTable<'a> {
    view: &'a ProjectedView,
    info: &'a ColumnInfo,
    ctx: &'a RenderContext,
}

impl<'a> DataTable<'a> {
    pub fn new(view: &'a ProjectedView, info: &'a ColumnInfo, ctx: &'a RenderContext) -> Self {
        Self { view, info, ctx }
    }

    fn column_widths(&self, columns: &[String], first_row: usize, visible_rows: usize) -> Vec<u16> {
        let cap = self.ctx.max_column_width;
        columns
            .iter()
            .map(|name| {
                let content = self
                    .view
                    .records
                    .iter()
                    .skip(first_row)
                    .take(visible_rows)
                    .map(|r| cell(r, name).canonical_string().chars().count())
                    .max()
                    .unwrap_or(0);
                (content.max(name.chars().count()) as u16).min(cap)
            })
            .collect()
    }
}

impl StatefulWidget for DataTable<'_> {
    type State = DataTableState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if self.view.columns.is_empty() {
            Paragraph::new("No columns selected. Press 'c' to choose columns.")
                .style(Style::default().fg(self.ctx.dimmed))
                .render(area, buf);
            return;
        }

        let visible_rows = area.height.saturating_sub(1) as usize;
        let first_row = state.table_state.offset();
        let candidates = &self.view.columns[state.column_offset.min(self.view.columns.len() - 1)..];
        let all_widths = self.column_widths(candidates, first_row, visible_rows.max(1));

        // Take columns while they fit; always show at least one.
        let padding = self.ctx.table_cell_padding;
        let mut used = 0u16;
        let mut shown = 0;
        for w in &all_widths {
            let need = if shown == 0 { *w } else { w + padding };
            if shown > 0 && used + need > area.width {
                break;
            }
            used += need;
            shown += 1;
        }
        let columns = &candidates[..shown];
        let widths = &all_widths[..shown];

        let kinds: Vec<ColumnKind> = columns
            .iter()
            .map(|c| self.info.kind_of(c).unwrap_or(ColumnKind::Text))
            .collect();

        let rows: Vec<Row> = self
            .view
            .records
            .iter()
            .map(|record| {
                let cells = columns.iter().zip(&kinds).map(|(name, kind)| {
                    let line = Line::from(cell(record, name).canonical_string())
                        .style(Style::default().fg(self.ctx.column_color(*kind)));
                    if *kind == ColumnKind::Numeric {
                        Cell::from(line.right_aligned())
                    } else {
                        Cell::from(line)
                    }
                });
                Row::new(cells)
            })
            .collect();

        let header = Row::new(columns.iter().map(|c| Cell::from(c.as_str())))
            .style(Style::default().fg(self.ctx.table_header).bold());

        StatefulWidget::render(
            Table::new(rows, widths.iter().copied())
                .column_spacing(padding)
                .header(header)
                .row_highlight_style(self.ctx.selected_style()),
            area,
            buf,
            &mut state.table_state,
        );
    }
}
