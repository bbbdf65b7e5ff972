use crate::render::context::RenderContext;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Paragraph, Widget},
};

/// Key hints along the bottom row, with a row count and a busy throbber at the right.
pub struct Controls {
    pub row_count: Option<(usize, usize)>,
    pub dimmed: bool,
    pub pairs: Vec<(&'static str, &'static str)>,
    pub bg_color: Color,
    pub key_color: Color,
    pub label_color: Color,
    pub dimmed_color: Color,
    pub throbber_color: Color,
    pub busy: bool,
    pub throbber_frame: u8,
}

impl Controls {
    pub fn from_context(pairs: Vec<(&'static str, &'static str)>, ctx: &RenderContext) -> Self {
        Self {
            row_count: None,
            dimmed: false,
            pairs,
            bg_color: ctx.controls_bg,
            key_color: ctx.keybind_hints,
            label_color: ctx.keybind_labels,
            dimmed_color: ctx.dimmed,
            throbber_color: ctx.primary,
            busy: false,
            throbber_frame: 0,
        }
    }

    /// Visible rows out of total rows.
    pub fn with_row_count(mut self, shown: usize, total: usize) -> Self {
        self.row_count = Some((shown, total));
        self
    }

    pub fn with_busy(mut self, busy: bool, throbber_frame: u8) -> Self {
        self.busy = busy;
        self.throbber_frame = throbber_frame;
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }
}

const THROBBER_WIDTH: u16 = 3;
const ROW_COUNT_WIDTH: u16 = 24;
const THROBBER: [char; 4] = ['|', '/', '-', '\\'];

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let no_bg = self.bg_color == Color::Reset;
        if !no_bg {
            Block::default()
                .style(Style::default().bg(self.bg_color))
                .render(area, buf);
        }

        // Pairs are never shrunk; the ones that do not fit are dropped from the right.
        let pair_width = |(key, action): &(&str, &str)| -> u16 {
            (key.chars().count() as u16 + 1) + (action.chars().count() as u16 + 1)
        };
        let right_reserved =
            (if self.row_count.is_some() { ROW_COUNT_WIDTH } else { 1 }) + THROBBER_WIDTH;
        let mut available = area.width.saturating_sub(right_reserved);
        let n_show = self
            .pairs
            .iter()
            .take_while(|pair| {
                let need = pair_width(pair);
                if available >= need {
                    available -= need;
                    true
                } else {
                    false
                }
            })
            .count();

        let mut constraints: Vec<Constraint> = self
            .pairs
            .iter()
            .take(n_show)
            .flat_map(|(key, action)| {
                [
                    Constraint::Length(key.chars().count() as u16 + 1),
                    Constraint::Length(action.chars().count() as u16 + 1),
                ]
            })
            .collect();
        constraints.push(Constraint::Fill(1));
        if self.row_count.is_some() {
            constraints.push(Constraint::Length(ROW_COUNT_WIDTH));
        }
        constraints.push(Constraint::Length(THROBBER_WIDTH));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);

        let base = if no_bg {
            Style::default()
        } else {
            Style::default().bg(self.bg_color)
        };
        let (key_style, label_style) = if self.dimmed {
            (base.fg(self.dimmed_color), base.fg(self.dimmed_color))
        } else {
            (base.fg(self.key_color), base.fg(self.label_color))
        };

        for (i, (key, action)) in self.pairs.iter().take(n_show).enumerate() {
            let j = i * 2;
            Paragraph::new(*key).style(key_style).render(layout[j], buf);
            Paragraph::new(*action)
                .style(label_style)
                .render(layout[j + 1], buf);
        }

        let fill_idx = n_show * 2;
        Paragraph::new("").style(base).render(layout[fill_idx], buf);

        if let Some((shown, total)) = self.row_count {
            let text = if shown == total {
                format!("Rows: {}", format_number_with_commas(total))
            } else {
                format!(
                    "Rows: {} of {}",
                    format_number_with_commas(shown),
                    format_number_with_commas(total)
                )
            };
            Paragraph::new(text)
                .style(label_style)
                .right_aligned()
                .render(layout[fill_idx + 1], buf);
        }

        // The throbber slot is always reserved so the layout never shifts.
        let throbber_idx = fill_idx + if self.row_count.is_some() { 2 } else { 1 };
        let throbber_ch = if self.busy {
            THROBBER[self.throbber_frame as usize % THROBBER.len()].to_string()
        } else {
            " ".to_string()
        };
        Paragraph::new(throbber_ch)
            .style(base.fg(self.throbber_color))
            .centered()
            .render(layout[throbber_idx], buf);
    }
}

pub fn format_number_with_commas(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, ch) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}
