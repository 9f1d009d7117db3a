use crate::model::AuditRow;
use crate::widgets::chrome::panel_block;
use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::Value as JsonValue;

/// Paired before/after JSON display for one audit row. Both sides show and
/// hide together, and the toggle label tracks the current visibility.
pub struct DiffViewer {
    pub row_id: String,
    pub title: String,
    pub old_text: String,
    pub new_text: String,
    pub shown: bool,
    pub scroll_y: u16,
    last_viewport_h: u16,
}

fn pretty(v: &JsonValue) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

impl DiffViewer {
    pub fn from_row(row: &AuditRow) -> Self {
        let title = row
            .summary
            .clone()
            .unwrap_or_else(|| format!("Audit {}", row.id));
        Self {
            row_id: row.id.clone(),
            title,
            old_text: pretty(&row.old_json),
            new_text: pretty(&row.new_json),
            shown: true,
            scroll_y: 0,
            last_viewport_h: 0,
        }
    }

    pub fn toggle(&mut self) {
        self.shown = !self.shown;
    }

    pub fn button_label(&self) -> &'static str {
        if self.shown {
            "Hide JSON"
        } else {
            "Show JSON"
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, focused: bool) {
        let block = panel_block(&self.title, focused);
        if !self.shown {
            let p = Paragraph::new(Line::from(Span::styled(
                format!("[ {} ]", self.button_label()),
                crate::theme::text_muted(),
            )))
            .block(block);
            f.render_widget(p, area);
            return;
        }
        let inner = block.inner(area);
        f.render_widget(block, area);
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(inner);
        self.last_viewport_h = inner.height.saturating_sub(2);
        let max_lines = self
            .old_text
            .lines()
            .count()
            .max(self.new_text.lines().count()) as u16;
        let max_scroll = max_lines.saturating_sub(self.last_viewport_h);
        if self.scroll_y > max_scroll {
            self.scroll_y = max_scroll;
        }
        let old = Paragraph::new(self.old_text.as_str())
            .block(Block::default().borders(Borders::ALL).title("Before"))
            .scroll((self.scroll_y, 0));
        let new = Paragraph::new(self.new_text.as_str())
            .block(Block::default().borders(Borders::ALL).title("After"))
            .scroll((self.scroll_y, 0));
        f.render_widget(old, halves[0]);
        f.render_widget(new, halves[1]);
    }

    pub fn on_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up => {
                if self.scroll_y > 0 {
                    self.scroll_y -= 1;
                }
            }
            KeyCode::Down => {
                self.scroll_y = self.scroll_y.saturating_add(1);
            }
            KeyCode::PageUp => {
                self.scroll_y = self.scroll_y.saturating_sub(self.last_viewport_h);
            }
            KeyCode::PageDown => {
                self.scroll_y = self.scroll_y.saturating_add(self.last_viewport_h);
            }
            KeyCode::Home => {
                self.scroll_y = 0;
            }
            _ => {}
        }
    }
}
