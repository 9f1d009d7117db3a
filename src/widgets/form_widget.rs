use crate::widgets::form::{FormState, RowValue};
use crossterm::event::KeyCode;
use ratatui::crossterm::event as rt_event;
use ratatui::prelude::*;
use tui_textarea::TextArea;

/// What a key press on a form asks the app to do. Mutations that stay inside
/// the form happen in place; everything that touches the store, the backend
/// or the modal editor is routed through the update loop.
#[derive(Debug, PartialEq, Eq)]
pub enum FormSignal {
    None,
    Submit,
    Cancel,
    OpenEditor { row_key: String, text: String },
    AddEntry { row_key: String },
    RemoveEntry { row_key: String },
}

pub fn on_key(form: &mut FormState, key: KeyCode) -> FormSignal {
    if form.disabled {
        return FormSignal::None;
    }
    match key {
        KeyCode::Up => {
            if form.editing {
                if let Some(row) = form.selected_row_mut() {
                    if let RowValue::List { cursor, .. } = &mut row.value {
                        if *cursor > 0 {
                            *cursor -= 1;
                        }
                    }
                }
            } else {
                form.select_prev();
            }
            FormSignal::None
        }
        KeyCode::Down => {
            if form.editing {
                if let Some(row) = form.selected_row_mut() {
                    if let RowValue::List { entries, cursor } = &mut row.value {
                        if *cursor + 1 < entries.len() {
                            *cursor += 1;
                        }
                    }
                }
            } else {
                form.select_next();
            }
            FormSignal::None
        }
        KeyCode::Enter => {
            if form.selected == form.submit_index() {
                return FormSignal::Submit;
            }
            if form.selected == form.cancel_index() {
                return FormSignal::Cancel;
            }
            match form.rows.get(form.selected).map(|r| (&r.value, &r.key)) {
                Some((RowValue::Text(_), _)) | Some((RowValue::List { .. }, _)) => {
                    form.editing = !form.editing;
                    form.message = None;
                    FormSignal::None
                }
                Some((RowValue::MultiLine(text), key)) => FormSignal::OpenEditor {
                    row_key: key.clone(),
                    text: text.clone(),
                },
                _ => FormSignal::None,
            }
        }
        KeyCode::Esc => {
            if form.editing {
                form.editing = false;
                form.message = None;
            }
            FormSignal::None
        }
        KeyCode::Backspace => {
            if form.editing {
                if let Some(row) = form.selected_row_mut() {
                    match &mut row.value {
                        RowValue::Text(s) => {
                            s.pop();
                        }
                        RowValue::List { entries, cursor } => {
                            if let Some(entry) = entries.get_mut(*cursor) {
                                entry.pop();
                            }
                        }
                        _ => {}
                    }
                }
            }
            FormSignal::None
        }
        KeyCode::Char(c) => {
            if form.editing {
                if let Some(row) = form.selected_row_mut() {
                    match &mut row.value {
                        RowValue::Text(s) => s.push(c),
                        RowValue::List { entries, cursor } => {
                            if let Some(entry) = entries.get_mut(*cursor) {
                                entry.push(c);
                            }
                        }
                        _ => {}
                    }
                }
                return FormSignal::None;
            }
            if c == '+' || c == '-' {
                if let Some(row) = form.selected_row_mut() {
                    if matches!(row.value, RowValue::List { .. }) {
                        let row_key = row.key.clone();
                        return if c == '+' {
                            FormSignal::AddEntry { row_key }
                        } else {
                            FormSignal::RemoveEntry { row_key }
                        };
                    }
                }
            }
            FormSignal::None
        }
        _ => FormSignal::None,
    }
}

/// Modal multi-line editor for one form row. Committed with Ctrl+S, dropped
/// with Esc; the form row is only written on commit.
pub struct TextAreaOverlay {
    pub form_key: String,
    pub row_key: String,
    ta: TextArea<'static>,
}

impl TextAreaOverlay {
    pub fn open(form_key: String, row_key: String, text: &str) -> Self {
        let mut ta = TextArea::default();
        if !text.is_empty() {
            ta.insert_str(text);
        }
        ta.set_block(
            ratatui::widgets::Block::default()
                .borders(ratatui::widgets::Borders::ALL)
                .title(format!("Editing: {row_key} — Ctrl+S Save • Esc Cancel")),
        );
        Self {
            form_key,
            row_key,
            ta,
        }
    }

    pub fn text(&self) -> String {
        self.ta.lines().join("\n")
    }

    pub fn input(&mut self, key: KeyCode) {
        // tui-textarea speaks ratatui's bundled crossterm; translate the key.
        let code = match key {
            KeyCode::Char(c) => rt_event::KeyCode::Char(c),
            KeyCode::Enter => rt_event::KeyCode::Enter,
            KeyCode::Backspace => rt_event::KeyCode::Backspace,
            KeyCode::Delete => rt_event::KeyCode::Delete,
            KeyCode::Left => rt_event::KeyCode::Left,
            KeyCode::Right => rt_event::KeyCode::Right,
            KeyCode::Up => rt_event::KeyCode::Up,
            KeyCode::Down => rt_event::KeyCode::Down,
            KeyCode::Home => rt_event::KeyCode::Home,
            KeyCode::End => rt_event::KeyCode::End,
            KeyCode::Tab => rt_event::KeyCode::Tab,
            _ => return,
        };
        let _ = self
            .ta
            .input(rt_event::KeyEvent::new(code, rt_event::KeyModifiers::NONE));
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let rect = centered_rect(80, 70, area);
        f.render_widget(ratatui::widgets::Clear, rect);
        f.render_widget(&self.ta, rect);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(area);
    let h = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(v[1]);
    h[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ActionDescriptor;
    use serde_json::json;

    fn form() -> FormState {
        let ds: ActionDescriptor = serde_json::from_value(json!({
            "capture_data": "yes",
            "captured_data": {"name": "s-1", "barcodes": ["a"]}
        }))
        .unwrap();
        FormState::new(
            "ST1-annotatecore-form".into(),
            "Annotate",
            "ST1",
            "annotate",
            "core",
            ds,
        )
    }

    #[test]
    fn typing_edits_the_selected_text_row() {
        let mut f = form();
        assert_eq!(on_key(&mut f, KeyCode::Enter), FormSignal::None);
        assert!(f.editing);
        on_key(&mut f, KeyCode::Backspace);
        on_key(&mut f, KeyCode::Char('2'));
        assert_eq!(f.rows[0].value, RowValue::Text("s-2".into()));
        on_key(&mut f, KeyCode::Esc);
        assert!(!f.editing);
    }

    #[test]
    fn plus_minus_signal_list_edits_when_browsing() {
        let mut f = form();
        on_key(&mut f, KeyCode::Down); // barcodes row
        assert_eq!(
            on_key(&mut f, KeyCode::Char('+')),
            FormSignal::AddEntry {
                row_key: "barcodes".into()
            }
        );
        assert_eq!(
            on_key(&mut f, KeyCode::Char('-')),
            FormSignal::RemoveEntry {
                row_key: "barcodes".into()
            }
        );
    }

    #[test]
    fn enter_on_buttons_signals_submit_and_cancel() {
        let mut f = form();
        f.selected = f.submit_index();
        assert_eq!(on_key(&mut f, KeyCode::Enter), FormSignal::Submit);
        f.selected = f.cancel_index();
        assert_eq!(on_key(&mut f, KeyCode::Enter), FormSignal::Cancel);
    }

    #[test]
    fn disabled_form_swallows_keys() {
        let mut f = form();
        f.disabled = true;
        f.selected = f.submit_index();
        assert_eq!(on_key(&mut f, KeyCode::Enter), FormSignal::None);
    }

    #[test]
    fn overlay_round_trips_text() {
        let mut ov = TextAreaOverlay::open(
            "ST1-annotatecore-form".into(),
            "notes".into(),
            "line one",
        );
        ov.input(KeyCode::End);
        ov.input(KeyCode::Enter);
        ov.input(KeyCode::Char('x'));
        assert_eq!(ov.text(), "line one\nx");
    }
}
