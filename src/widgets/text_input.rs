use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

/// Event emitted by TextInput widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextInputEvent {
    None,
    Changed,
    Submit,
    Cancel,
}

/// Single-line text input. The cursor is a char index, not a byte index.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    cursor: usize,
    focused: bool,
    text_color: Option<Color>,
}

fn byte_pos(text: &str, char_pos: usize) -> usize {
    text.char_indices()
        .nth(char_pos)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text_color(mut self, color: Color) -> Self {
        self.text_color = Some(color);
        self
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the value and move the cursor to the end.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into().replace(['\n', '\r'], " ");
        self.cursor = self.value.chars().count();
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn handle_key(&mut self, event: &KeyEvent) -> TextInputEvent {
        let len = self.value.chars().count();
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        match event.code {
            KeyCode::Enter => TextInputEvent::Submit,
            KeyCode::Esc => TextInputEvent::Cancel,
            KeyCode::Char('u') if ctrl => {
                self.clear();
                TextInputEvent::Changed
            }
            KeyCode::Char('a') if ctrl => {
                self.cursor = 0;
                TextInputEvent::None
            }
            KeyCode::Char('e') if ctrl => {
                self.cursor = len;
                TextInputEvent::None
            }
            KeyCode::Char(c) if !ctrl => {
                let at = byte_pos(&self.value, self.cursor);
                self.value.insert(at, c);
                self.cursor += 1;
                TextInputEvent::Changed
            }
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                let at = byte_pos(&self.value, self.cursor);
                self.value.remove(at);
                TextInputEvent::Changed
            }
            KeyCode::Delete if self.cursor < len => {
                let at = byte_pos(&self.value, self.cursor);
                self.value.remove(at);
                TextInputEvent::Changed
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                TextInputEvent::None
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(len);
                TextInputEvent::None
            }
            KeyCode::Home => {
                self.cursor = 0;
                TextInputEvent::None
            }
            KeyCode::End => {
                self.cursor = len;
                TextInputEvent::None
            }
            _ => TextInputEvent::None,
        }
    }
}

impl Widget for &TextInput {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let style = self
            .text_color
            .map(|c| Style::default().fg(c))
            .unwrap_or_default();
        if !self.focused {
            Paragraph::new(self.value.as_str())
                .style(style)
                .render(area, buf);
            return;
        }

        // Scroll horizontally so the cursor stays visible.
        let width = area.width.max(1) as usize;
        let skip = (self.cursor + 1).saturating_sub(width);
        let chars: Vec<char> = self.value.chars().skip(skip).collect();
        let cursor = self.cursor - skip;
        let before: String = chars[..cursor.min(chars.len())].iter().collect();
        let at: String = chars
            .get(cursor)
            .map(char::to_string)
            .unwrap_or_else(|| " ".to_string());
        let after: String = chars.iter().skip(cursor + 1).collect();

        Paragraph::new(Line::from(vec![
            Span::styled(before, style),
            Span::styled(at, style.add_modifier(Modifier::REVERSED)),
            Span::styled(after, style),
        ]))
        .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(input: &mut TextInput, s: &str) {
        for c in s.chars() {
            input.handle_key(&key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_typing_and_editing() {
        let mut input = TextInput::new();
        type_str(&mut input, "slaes");
        input.handle_key(&key(KeyCode::Left));
        input.handle_key(&key(KeyCode::Left));
        input.handle_key(&key(KeyCode::Left));
        input.handle_key(&key(KeyCode::Backspace));
        input.handle_key(&key(KeyCode::Right));
        type_str(&mut input, "l");
        assert_eq!(input.value(), "sales");
        assert_eq!(input.handle_key(&key(KeyCode::Enter)), TextInputEvent::Submit);
        assert_eq!(input.handle_key(&key(KeyCode::Esc)), TextInputEvent::Cancel);
    }

    #[test]
    fn test_multibyte_cursor() {
        let mut input = TextInput::new();
        type_str(&mut input, "आय");
        assert_eq!(input.cursor(), 2);
        input.handle_key(&key(KeyCode::Home));
        input.handle_key(&key(KeyCode::Delete));
        assert_eq!(input.value(), "य");
        input.handle_key(&KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert!(input.is_empty());
    }

    #[test]
    fn test_set_value_strips_newlines() {
        let mut input = TextInput::new();
        input.set_value("a\nb");
        assert_eq!(input.value(), "a b");
        assert_eq!(input.cursor(), 3);
    }
}
