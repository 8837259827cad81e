use std::collections::BTreeMap;

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::table::{FieldDef, InputKind, Row};

/// Schema-driven state of the add/edit modal. `values` always has one entry
/// per field, hidden ones included, so it can be submitted as-is.
#[derive(Debug, Clone)]
pub(crate) struct FormState {
    pub(crate) title: String,
    pub(crate) fields: Vec<FieldDef>,
    pub(crate) values: Row,
    pub(crate) options: BTreeMap<usize, Vec<String>>,
    pub(crate) active: usize,
    pub(crate) error: Option<String>,
}

impl FormState {
    pub(crate) fn new(
        title: impl Into<String>,
        fields: Vec<FieldDef>,
        mut values: Row,
        options: BTreeMap<usize, Vec<String>>,
    ) -> Self {
        values.resize(fields.len(), String::new());
        let mut form = Self {
            title: title.into(),
            fields,
            values,
            options,
            active: 0,
            error: None,
        };
        form.active = form.focusable().first().copied().unwrap_or(0);
        form
    }

    /// Field indices shown in the form, in schema order.
    pub(crate) fn visible(&self) -> Vec<usize> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, field)| !field.hidden_in_form)
            .map(|(idx, _)| idx)
            .collect()
    }

    fn focusable(&self) -> Vec<usize> {
        self.visible()
            .into_iter()
            .filter(|&idx| self.fields[idx].input != InputKind::Fixed)
            .collect()
    }

    /// Move focus by `offset` among editable fields, wrapping around.
    pub(crate) fn move_focus(&mut self, offset: isize) {
        let focusable = self.focusable();
        if focusable.is_empty() {
            return;
        }
        let len = focusable.len() as isize;
        let current = focusable
            .iter()
            .position(|&idx| idx == self.active)
            .unwrap_or(0) as isize;
        let next = (current + offset).rem_euclid(len);
        self.active = focusable[next as usize];
    }

    fn active_input(&self) -> InputKind {
        self.fields
            .get(self.active)
            .map(|field| field.input)
            .unwrap_or(InputKind::Fixed)
    }

    /// Append a character to the active field, validating allowed input.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        let accepted = match self.active_input() {
            InputKind::Line | InputKind::Text => !ch.is_control(),
            InputKind::Date => ch.is_ascii_digit() || ch == '.',
            InputKind::Choice | InputKind::Fixed => false,
        };
        if accepted {
            self.values[self.active].push(ch);
        }
        accepted
    }

    pub(crate) fn backspace(&mut self) {
        if matches!(
            self.active_input(),
            InputKind::Line | InputKind::Text | InputKind::Date
        ) {
            self.values[self.active].pop();
        }
    }

    /// Step through the options of the active choice field. A value that is
    /// not among the options jumps to the first one.
    pub(crate) fn cycle_choice(&mut self, offset: isize) -> bool {
        if self.active_input() != InputKind::Choice {
            return false;
        }
        let Some(options) = self.options.get(&self.active).filter(|o| !o.is_empty()) else {
            return false;
        };
        let len = options.len() as isize;
        let next = match options
            .iter()
            .position(|option| *option == self.values[self.active])
        {
            Some(current) => (current as isize + offset).rem_euclid(len) as usize,
            None => 0,
        };
        self.values[self.active] = options[next].clone();
        true
    }

    /// Width of the widest `Label*: ` prefix, used to align values.
    pub(crate) fn label_width(&self) -> usize {
        self.visible()
            .iter()
            .map(|&idx| self.fields[idx].form_label().chars().count())
            .max()
            .unwrap_or(0)
            + 2
    }

    /// Render a single line for the form widget.
    pub(crate) fn build_line(&self, idx: usize) -> Line<'static> {
        let field = &self.fields[idx];
        let value = &self.values[idx];
        let is_active = idx == self.active;

        let display = match field.input {
            _ if value.is_empty() && field.required => "<required>".to_string(),
            _ if value.is_empty() => "<optional>".to_string(),
            InputKind::Choice => format!("< {value} >"),
            _ => value.clone(),
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() || field.input == InputKind::Fixed {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        let label = format!("{}: ", field.form_label());
        Line::from(vec![
            Span::raw(format!("{label:<width$}", width = self.label_width())),
            Span::styled(display, style),
        ])
    }

    /// Character count of the active value, for cursor placement.
    pub(crate) fn active_len(&self) -> usize {
        self.values
            .get(self.active)
            .map(|value| value.chars().count())
            .unwrap_or(0)
    }

    /// Whether the cursor should be drawn (text-like inputs only).
    pub(crate) fn shows_cursor(&self) -> bool {
        matches!(
            self.active_input(),
            InputKind::Line | InputKind::Text | InputKind::Date
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> FormState {
        let fields = vec![
            FieldDef::new("Id", InputKind::Fixed).hidden_in_form(),
            FieldDef::new("Title", InputKind::Line).required(),
            FieldDef::new("Author", InputKind::Choice).required(),
            FieldDef::new("ISBN", InputKind::Fixed).required(),
            FieldDef::new("Release Date", InputKind::Date).required(),
        ];
        let mut options = BTreeMap::new();
        options.insert(2, vec!["A B 1".to_string(), "C D 2".to_string()]);
        FormState::new("Add Book", fields, vec![String::new(); 3], options)
    }

    #[test]
    fn focus_skips_hidden_and_fixed_fields() {
        let mut form = form();
        assert_eq!(form.values.len(), 5);
        assert_eq!(form.active, 1);
        form.move_focus(1);
        assert_eq!(form.active, 2);
        form.move_focus(1);
        assert_eq!(form.active, 4);
        form.move_focus(1);
        assert_eq!(form.active, 1);
        form.move_focus(-1);
        assert_eq!(form.active, 4);
    }

    #[test]
    fn date_input_only_takes_digits_and_dots() {
        let mut form = form();
        form.active = 4;
        for ch in "21.03.2024x".chars() {
            form.push_char(ch);
        }
        assert_eq!(form.values[4], "21.03.2024");
        form.backspace();
        assert_eq!(form.values[4], "21.03.202");
    }

    #[test]
    fn choice_cycles_through_options() {
        let mut form = form();
        form.active = 2;
        assert!(!form.push_char('x'));
        assert!(form.cycle_choice(1));
        assert_eq!(form.values[2], "A B 1");
        form.cycle_choice(1);
        assert_eq!(form.values[2], "C D 2");
        form.cycle_choice(1);
        assert_eq!(form.values[2], "A B 1");
        form.cycle_choice(-1);
        assert_eq!(form.values[2], "C D 2");
    }
}
