use crate::dataset::format_number;
use crate::filter::FilterModel;
use crate::schema::DatasetSchema;
use crate::session::Command;
use crate::widgets::text_input::TextInput;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum RangeFocus {
    #[default]
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RangeAction {
    None,
    Close,
    Send(Command),
}

/// Editor for the numeric range of one column at a time.
#[derive(Debug, Default)]
pub struct RangeModal {
    pub active: bool,
    pub columns: Vec<String>,
    pub column_idx: usize,
    pub min_input: TextInput,
    pub max_input: TextInput,
    pub focus: RangeFocus,
    pub error: Option<String>,
}

impl RangeModal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open on `preferred` if it can take a range, otherwise on the first column that can.
    /// Returns false when no column has bounds.
    pub fn open(&mut self, schema: &DatasetSchema, filter: &FilterModel, preferred: Option<&str>) -> bool {
        self.columns = schema.range_filterable_columns().map(str::to_string).collect();
        if self.columns.is_empty() {
            self.active = false;
            return false;
        }
        self.column_idx = preferred
            .and_then(|p| self.columns.iter().position(|c| c == p))
            .unwrap_or(0);
        self.focus = RangeFocus::Min;
        self.load_column(schema, filter);
        self.active = true;
        true
    }

    pub fn close(&mut self) {
        self.active = false;
        self.error = None;
    }

    pub fn column(&self) -> Option<&str> {
        self.columns.get(self.column_idx).map(String::as_str)
    }

    /// Fill the inputs with the active range, or the column's bounds when there is none.
    fn load_column(&mut self, schema: &DatasetSchema, filter: &FilterModel) {
        self.error = None;
        let Some(column) = self.column() else {
            return;
        };
        let (min, max) = match filter.range_filters.get(column) {
            Some(r) => (r.min, r.max),
            None => schema.stats.bounds(column).unwrap_or((0.0, 0.0)),
        };
        self.min_input.set_value(format_number(min));
        self.max_input.set_value(format_number(max));
        self.sync_focus();
    }

    fn sync_focus(&mut self) {
        self.min_input.set_focused(self.focus == RangeFocus::Min);
        self.max_input.set_focused(self.focus == RangeFocus::Max);
    }

    fn cycle_column(&mut self, forward: bool, schema: &DatasetSchema, filter: &FilterModel) {
        let n = self.columns.len();
        if n == 0 {
            return;
        }
        self.column_idx = if forward {
            (self.column_idx + 1) % n
        } else {
            (self.column_idx + n - 1) % n
        };
        self.load_column(schema, filter);
    }

    fn parse_bound(input: &TextInput, label: &str) -> Result<f64, String> {
        let text = input.value().trim().replace(',', "");
        text.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("{} is not a number: '{}'", label, input.value().trim()))
    }

    pub fn handle_key(
        &mut self,
        event: &KeyEvent,
        schema: &DatasetSchema,
        filter: &FilterModel,
    ) -> RangeAction {
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        match event.code {
            KeyCode::Esc => {
                self.close();
                RangeAction::Close
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    RangeFocus::Min => RangeFocus::Max,
                    RangeFocus::Max => RangeFocus::Min,
                };
                self.sync_focus();
                RangeAction::None
            }
            KeyCode::Down => {
                self.cycle_column(true, schema, filter);
                RangeAction::None
            }
            KeyCode::Up => {
                self.cycle_column(false, schema, filter);
                RangeAction::None
            }
            KeyCode::Char('d') if ctrl => match self.column() {
                Some(column) => {
                    let command = Command::ClearRange(column.to_string());
                    self.close();
                    RangeAction::Send(command)
                }
                None => RangeAction::None,
            },
            KeyCode::Enter => {
                let Some(column) = self.column().map(str::to_string) else {
                    return RangeAction::None;
                };
                let bounds = Self::parse_bound(&self.min_input, "Minimum")
                    .and_then(|min| Self::parse_bound(&self.max_input, "Maximum").map(|max| (min, max)));
                match bounds {
                    Ok((min, max)) => {
                        self.close();
                        RangeAction::Send(Command::SetRange { column, min, max })
                    }
                    Err(e) => {
                        self.error = Some(e);
                        RangeAction::None
                    }
                }
            }
            _ => {
                let input = match self.focus {
                    RangeFocus::Min => &mut self.min_input,
                    RangeFocus::Max => &mut self.max_input,
                };
                input.handle_key(event);
                self.error = None;
                RangeAction::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::RawDataset;
    use serde_json::json;

    fn schema() -> DatasetSchema {
        DatasetSchema::derive(&RawDataset::from_json_rows(&[
            json!({"category": "Sales", "amount": 10, "qty": 1}),
            json!({"category": "Rent", "amount": 90, "qty": 4}),
        ]))
    }

    fn key(c: KeyCode) -> KeyEvent {
        KeyEvent::new(c, KeyModifiers::NONE)
    }

    #[test]
    fn test_open_prefills_bounds() {
        let schema = schema();
        let filter = FilterModel::seeded(&schema.info);
        let mut modal = RangeModal::new();
        assert!(modal.open(&schema, &filter, Some("qty")));
        assert_eq!(modal.column(), Some("qty"));
        assert_eq!(modal.min_input.value(), "1");
        assert_eq!(modal.max_input.value(), "4");

        modal.open(&schema, &filter, Some("category"));
        assert_eq!(modal.column(), Some("amount"));
    }

    #[test]
    fn test_open_without_numeric_columns() {
        let schema = DatasetSchema::derive(&RawDataset::from_json_rows(&[json!({"a": "x"})]));
        let mut modal = RangeModal::new();
        assert!(!modal.open(&schema, &FilterModel::seeded(&schema.info), None));
        assert!(!modal.active);
    }

    #[test]
    fn test_enter_sends_range() {
        let schema = schema();
        let filter = FilterModel::seeded(&schema.info);
        let mut modal = RangeModal::new();
        modal.open(&schema, &filter, None);
        modal.handle_key(&KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL), &schema, &filter);
        for c in "20".chars() {
            modal.handle_key(&key(KeyCode::Char(c)), &schema, &filter);
        }
        modal.handle_key(&key(KeyCode::Tab), &schema, &filter);
        modal.handle_key(&key(KeyCode::Backspace), &schema, &filter);
        assert_eq!(modal.max_input.value(), "9");
        assert_eq!(
            modal.handle_key(&key(KeyCode::Enter), &schema, &filter),
            RangeAction::Send(Command::SetRange {
                column: "amount".into(),
                min: 20.0,
                max: 9.0,
            })
        );
        assert!(!modal.active);
    }

    #[test]
    fn test_bad_number_keeps_modal_open() {
        let schema = schema();
        let filter = FilterModel::seeded(&schema.info);
        let mut modal = RangeModal::new();
        modal.open(&schema, &filter, None);
        modal.min_input.set_value("abc");
        assert_eq!(modal.handle_key(&key(KeyCode::Enter), &schema, &filter), RangeAction::None);
        assert!(modal.active);
        assert!(modal.error.as_deref().is_some_and(|e| e.contains("Minimum")));
    }

    #[test]
    fn test_ctrl_d_clears_range() {
        let schema = schema();
        let filter = FilterModel::seeded(&schema.info);
        let mut modal = RangeModal::new();
        modal.open(&schema, &filter, Some("qty"));
        assert_eq!(
            modal.handle_key(&KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL), &schema, &filter),
            RangeAction::Send(Command::ClearRange("qty".into()))
        );
    }
}
