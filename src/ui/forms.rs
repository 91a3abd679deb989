use std::path::PathBuf;

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::controller::{FormField, FormRequest};
use crate::models::FieldValues;

/// Modal state for adding or editing a row. One input per column, in column
/// order, built from the controller's [`FormRequest`].
#[derive(Clone, Debug)]
pub(crate) struct RowForm {
    pub(crate) title: String,
    fields: Vec<FormField>,
    values: Vec<String>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
}

impl RowForm {
    pub(crate) fn from_request(request: &FormRequest) -> Self {
        Self {
            title: request.title.clone(),
            values: request
                .fields
                .iter()
                .map(|field| field.initial.clone())
                .collect(),
            fields: request.fields.clone(),
            active: 0,
            error: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len()
    }

    /// Move focus to the next field, wrapping at the end.
    pub(crate) fn next_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + 1) % self.fields.len();
        }
    }

    /// Move focus to the previous field, wrapping at the start.
    pub(crate) fn previous_field(&mut self) {
        if !self.fields.is_empty() {
            self.active = (self.active + self.fields.len() - 1) % self.fields.len();
        }
    }

    /// Append a character to the active field. Control characters are ignored.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.values.get_mut(self.active) {
            Some(value) => {
                value.push(ch);
                true
            }
            None => false,
        }
    }

    pub(crate) fn backspace(&mut self) {
        if let Some(value) = self.values.get_mut(self.active) {
            value.pop();
        }
    }

    /// Everything typed so far, keyed by column name in column order.
    pub(crate) fn field_values(&self) -> FieldValues {
        self.fields
            .iter()
            .zip(&self.values)
            .map(|(field, value)| (field.name.clone(), value.clone()))
            .collect()
    }

    /// Label width shared by every line so the inputs line up.
    pub(crate) fn label_width(&self) -> usize {
        self.fields
            .iter()
            .map(|field| field.name.chars().count())
            .max()
            .unwrap_or(0)
    }

    /// Render the field at `index` as `name: value  (hint)`.
    pub(crate) fn build_line(&self, index: usize) -> Line<'static> {
        let (Some(field), Some(value)) = (self.fields.get(index), self.values.get(index)) else {
            return Line::from("");
        };
        let is_active = index == self.active;

        let display = if value.is_empty() && !is_active {
            "<empty>".to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        let mut spans = vec![
            Span::raw(format!("{:>width$}: ", field.name, width = self.label_width())),
            Span::styled(display, style),
        ];
        if !field.hint.is_empty() {
            spans.push(Span::styled(
                format!("  ({})", field.hint),
                Style::default().fg(Color::DarkGray),
            ));
        }
        Line::from(spans)
    }

    /// Cursor column offset inside the active line.
    pub(crate) fn cursor_offset(&self) -> usize {
        let typed = self
            .values
            .get(self.active)
            .map(|value| value.chars().count())
            .unwrap_or(0);
        self.label_width() + ": ".len() + typed
    }
}

/// The "open database" prompt standing in for a file dialog.
#[derive(Default, Clone, Debug)]
pub(crate) struct PathPrompt {
    pub(crate) input: String,
    pub(crate) error: Option<String>,
}

impl PathPrompt {
    pub(crate) fn with_path(initial: &str) -> Self {
        Self {
            input: initial.to_string(),
            error: None,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            false
        } else {
            self.input.push(ch);
            true
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.input.pop();
    }

    /// The entered path, or `None` when the prompt is blank.
    pub(crate) fn path(&self) -> Option<PathBuf> {
        let trimmed = self.input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{PathPrompt, RowForm};
    use crate::controller::{FormField, FormRequest};

    fn request() -> FormRequest {
        let field = |name: &str, initial: &str| FormField {
            name: name.to_string(),
            hint: String::new(),
            initial: initial.to_string(),
        };
        FormRequest {
            title: "Edit row in users".into(),
            fields: vec![field("id", "2"), field("name", "Bob")],
        }
    }

    #[test]
    fn typing_edits_only_the_active_field() {
        let mut form = RowForm::from_request(&request());
        form.next_field();
        form.backspace();
        form.backspace();
        form.push_char('e');
        form.push_char('a');
        assert!(!form.push_char('\n'));

        let values: Vec<_> = form
            .field_values()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        assert_eq!(values, vec!["id=2", "name=Bea"]);
    }

    #[test]
    fn focus_wraps_in_both_directions() {
        let mut form = RowForm::from_request(&request());
        form.previous_field();
        assert_eq!(form.active, 1);
        form.next_field();
        assert_eq!(form.active, 0);
        assert_eq!(form.len(), 2);
    }

    #[test]
    fn blank_path_prompt_yields_nothing() {
        let mut prompt = PathPrompt::with_path("  ");
        assert_eq!(prompt.path(), None);
        prompt.push_char('a');
        prompt.push_char('.');
        prompt.push_char('d');
        prompt.push_char('b');
        assert_eq!(prompt.path(), Some(PathBuf::from("a.db")));
    }
}
