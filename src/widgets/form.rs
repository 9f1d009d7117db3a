use crate::model::ActionDescriptor;
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::Value as JsonValue;

/// Keys starting with this prefix carry server-controlled display content.
/// They are spliced into the form verbatim and never merged back.
pub const LITERAL_PREFIX: char = '_';

#[derive(Clone, Debug, PartialEq)]
pub enum RowValue {
    /// Raw server markup; not editable, not merged.
    Literal(String),
    Text(String),
    /// Values whose default contains newlines get the modal editor.
    MultiLine(String),
    /// Repeatable field: one entry per element of the server default.
    List { entries: Vec<String>, cursor: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct FormRow {
    pub key: String,
    pub value: RowValue,
}

impl FormRow {
    pub fn editable(&self) -> bool {
        !matches!(self.value, RowValue::Literal(_))
    }

    /// Field name on the wire; repeatable fields carry the `[]` suffix so the
    /// backend can reassemble the sequence.
    pub fn wire_name(&self) -> String {
        match self.value {
            RowValue::List { .. } => format!("{}[]", self.key),
            _ => self.key.clone(),
        }
    }
}

fn scalar_text(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Build form rows from the descriptor's `captured_data`, in server order.
pub fn rows_from_descriptor(ds: &ActionDescriptor) -> Vec<FormRow> {
    let mut rows: Vec<FormRow> = Vec::new();
    for (key, value) in &ds.captured_data {
        if key.starts_with(LITERAL_PREFIX) {
            rows.push(FormRow {
                key: key.clone(),
                value: RowValue::Literal(scalar_text(value)),
            });
            continue;
        }
        let value = match value {
            JsonValue::Array(items) => RowValue::List {
                entries: items.iter().map(scalar_text).collect(),
                cursor: 0,
            },
            other => {
                let text = scalar_text(other);
                if text.contains('\n') {
                    RowValue::MultiLine(text)
                } else {
                    RowValue::Text(text)
                }
            }
        };
        rows.push(FormRow {
            key: key.clone(),
            value,
        });
    }
    rows
}

/// A rendered action form, keyed by its identity string. Holds the parsed
/// descriptor so submission needs no re-parse of embedded markup.
#[derive(Clone, Debug)]
pub struct FormState {
    pub key: String,
    pub title: String,
    pub step_euid: String,
    pub action: String,
    pub action_group: String,
    pub descriptor: ActionDescriptor,
    pub rows: Vec<FormRow>,
    pub selected: usize,
    pub editing: bool,
    pub visible: bool,
    pub disabled: bool,
    pub message: Option<String>,
}

impl FormState {
    pub fn new(
        key: String,
        title: &str,
        step_euid: &str,
        action: &str,
        action_group: &str,
        descriptor: ActionDescriptor,
    ) -> Self {
        let rows = rows_from_descriptor(&descriptor);
        let selected = rows.iter().position(|r| r.editable()).unwrap_or(rows.len());
        Self {
            key,
            title: title.to_string(),
            step_euid: step_euid.to_string(),
            action: action.to_string(),
            action_group: action_group.to_string(),
            descriptor,
            rows,
            selected,
            editing: false,
            visible: true,
            disabled: false,
            message: None,
        }
    }

    pub fn submit_index(&self) -> usize {
        self.rows.len()
    }

    pub fn cancel_index(&self) -> usize {
        self.rows.len() + 1
    }

    fn selectable(&self, idx: usize) -> bool {
        if idx >= self.rows.len() {
            idx <= self.cancel_index()
        } else {
            self.rows[idx].editable()
        }
    }

    pub fn select_next(&mut self) {
        let mut idx = self.selected;
        while idx < self.cancel_index() {
            idx += 1;
            if self.selectable(idx) {
                self.selected = idx;
                return;
            }
        }
    }

    pub fn select_prev(&mut self) {
        let mut idx = self.selected;
        while idx > 0 {
            idx -= 1;
            if self.selectable(idx) {
                self.selected = idx;
                return;
            }
        }
    }

    pub fn row_mut(&mut self, field: &str) -> Option<&mut FormRow> {
        self.rows.iter_mut().find(|r| r.key == field)
    }

    pub fn selected_row_mut(&mut self) -> Option<&mut FormRow> {
        let idx = self.selected;
        self.rows.get_mut(idx)
    }

    /// Append an empty entry to a repeatable field.
    pub fn add_list_entry(&mut self, field: &str) -> bool {
        if let Some(FormRow {
            value: RowValue::List { entries, cursor },
            ..
        }) = self.row_mut(field)
        {
            entries.push(String::new());
            *cursor = entries.len() - 1;
            return true;
        }
        false
    }

    /// Drop the last entry of a repeatable field. Removing the final
    /// remaining entry is a no-op.
    pub fn remove_list_entry(&mut self, field: &str) -> bool {
        if let Some(FormRow {
            value: RowValue::List { entries, cursor },
            ..
        }) = self.row_mut(field)
        {
            if entries.len() > 1 {
                entries.pop();
                *cursor = (*cursor).min(entries.len() - 1);
                return true;
            }
        }
        false
    }

    /// Fold the current row values back into `captured_data` under their
    /// original keys. Literal rows are skipped; an empty list row never made
    /// it into the form, so the server value is left alone.
    pub fn merge_into_descriptor(&mut self) {
        for row in &self.rows {
            match &row.value {
                RowValue::Literal(_) => {}
                RowValue::Text(s) | RowValue::MultiLine(s) => {
                    self.descriptor
                        .captured_data
                        .insert(row.key.clone(), JsonValue::String(s.clone()));
                }
                RowValue::List { entries, .. } => {
                    if entries.is_empty() {
                        continue;
                    }
                    self.descriptor.captured_data.insert(
                        row.key.clone(),
                        JsonValue::Array(
                            entries
                                .iter()
                                .map(|e| JsonValue::String(e.clone()))
                                .collect(),
                        ),
                    );
                }
            }
        }
    }
}

pub fn draw_form(f: &mut Frame, area: Rect, form: &FormState, highlight: bool, cursor_on: bool) {
    let mut lines: Vec<Line> = Vec::new();
    for (i, row) in form.rows.iter().enumerate() {
        let sel = if i == form.selected { '›' } else { ' ' };
        match &row.value {
            RowValue::Literal(content) => {
                for l in content.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {l}"),
                        crate::theme::text_muted(),
                    )));
                }
            }
            RowValue::Text(s) => {
                let mut val = s.clone();
                if form.editing && i == form.selected && cursor_on {
                    val.push('▏');
                }
                let value_style = if i == form.selected {
                    if form.editing {
                        crate::theme::text_editing_bold()
                    } else {
                        crate::theme::text_active_bold()
                    }
                } else {
                    Style::default()
                };
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} {}: ", row.key)),
                    Span::styled(val, value_style),
                ]));
            }
            RowValue::MultiLine(s) => {
                let value_style = if i == form.selected {
                    crate::theme::text_active_bold()
                } else {
                    Style::default()
                };
                lines.push(Line::from(Span::raw(format!("{sel} {}:", row.key))));
                for l in s.lines() {
                    lines.push(Line::from(vec![
                        Span::raw("  "),
                        Span::styled(l.to_string(), value_style),
                    ]));
                }
            }
            RowValue::List { entries, cursor } => {
                lines.push(Line::from(Span::raw(format!(
                    "{sel} {}: ",
                    row.wire_name()
                ))));
                if entries.is_empty() {
                    lines.push(Line::from(Span::styled(
                        "  (no entries)",
                        crate::theme::text_muted(),
                    )));
                }
                for (ei, entry) in entries.iter().enumerate() {
                    let active = i == form.selected && ei == *cursor;
                    let mark = if active { '›' } else { ' ' };
                    let mut val = entry.clone();
                    if form.editing && active && cursor_on {
                        val.push('▏');
                    }
                    let st = if active {
                        if form.editing {
                            crate::theme::text_editing_bold()
                        } else {
                            crate::theme::text_active_bold()
                        }
                    } else {
                        Style::default()
                    };
                    lines.push(Line::from(vec![
                        Span::raw(format!("  {mark} ")),
                        Span::styled(val, st),
                    ]));
                }
            }
        }
    }
    if !form.rows.is_empty() {
        lines.push(Line::from(""));
    }
    let can_submit = !form.disabled;
    let mut submit_style = if can_submit {
        crate::theme::text_active_bold()
    } else {
        crate::theme::text_muted()
    };
    let mut cancel_style = crate::theme::text_muted();
    if form.selected == form.submit_index() {
        submit_style = crate::theme::list_cursor_style();
    }
    if form.selected == form.cancel_index() {
        cancel_style = crate::theme::list_cursor_style();
    }
    lines.push(Line::from(vec![
        Span::styled("  [ Submit ]  ", submit_style),
        Span::styled("Cancel", cancel_style),
    ]));
    if let Some(msg) = &form.message {
        lines.push(Line::from(Span::styled(
            msg.clone(),
            crate::theme::text_muted(),
        )));
    }
    let title = if form.editing {
        format!("{} — editing", form.title)
    } else {
        form.title.clone()
    };
    let block = panel_block(&title, highlight);
    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}
