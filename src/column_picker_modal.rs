use crate::filter::FilterModel;
use crate::schema::{ColumnInfo, ColumnKind};
use crate::session::Command;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::ListState;

/// What the app should do after the picker handled a key.
#[derive(Debug, Clone, PartialEq)]
pub enum PickerAction {
    None,
    Close,
    Send(Command),
}

#[derive(Debug, Default)]
pub struct ColumnPickerModal {
    pub active: bool,
    pub columns: Vec<(String, ColumnKind)>,
    pub list_state: ListState,
}

impl ColumnPickerModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, info: &ColumnInfo) {
        self.columns = info
            .columns
            .iter()
            .filter_map(|c| info.kind_of(c).map(|k| (c.clone(), k)))
            .collect();
        self.list_state = ListState::default();
        if !self.columns.is_empty() {
            self.list_state.select(Some(0));
        }
        self.active = true;
    }

    pub fn close(&mut self) {
        self.active = false;
    }

    fn current(&self) -> Option<&str> {
        self.list_state
            .selected()
            .and_then(|i| self.columns.get(i))
            .map(|(name, _)| name.as_str())
    }

    fn move_by(&mut self, delta: isize) {
        if self.columns.is_empty() {
            return;
        }
        let last = self.columns.len() as isize - 1;
        let i = self.list_state.selected().unwrap_or(0) as isize;
        self.list_state.select(Some((i + delta).clamp(0, last) as usize));
    }

    pub fn handle_key(&mut self, event: &KeyEvent, filter: &FilterModel) -> PickerAction {
        match event.code {
            KeyCode::Esc | KeyCode::Char('c') | KeyCode::Char('q') => {
                self.close();
                PickerAction::Close
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_by(1);
                PickerAction::None
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_by(-1);
                PickerAction::None
            }
            KeyCode::Char(' ') | KeyCode::Enter => match self.current() {
                Some(name) => PickerAction::Send(Command::ToggleColumn(name.to_string())),
                None => PickerAction::None,
            },
            KeyCode::Char('a') => PickerAction::Send(Command::SelectColumns(
                self.columns.iter().map(|(c, _)| c.clone()).collect(),
            )),
            KeyCode::Char('n') => PickerAction::Send(Command::SelectColumns(Vec::new())),
            // Keep only the highlighted column.
            KeyCode::Char('o') => match self.current() {
                Some(name) if !(filter.selected_columns.len() == 1 && filter.is_selected(name)) => {
                    PickerAction::Send(Command::SelectColumns(vec![name.to_string()]))
                }
                _ => PickerAction::None,
            },
            _ => PickerAction::None,
        }
    }
}
