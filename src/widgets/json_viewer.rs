use crate::widgets::chrome::panel_block;
use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::*;

/// Scrollable display of the last backend response (or error) in Pane B.
pub struct ResponseViewer {
    pub title: String,
    pub error: Option<String>,
    pub text: String,
    pub scroll_y: u16,
    pub wrap: bool,
    last_viewport_h: u16,
}

impl ResponseViewer {
    pub fn from_text(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            error: None,
            text: text.into(),
            scroll_y: 0,
            wrap: false,
            last_viewport_h: 0,
        }
    }

    pub fn from_error(title: impl Into<String>, err: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            error: Some(err.into()),
            text: String::new(),
            scroll_y: 0,
            wrap: false,
            last_viewport_h: 0,
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, focused: bool) {
        let mut lines: Vec<Line> = Vec::new();
        if let Some(err) = &self.error {
            lines.push(Line::from(err.clone()).style(crate::theme::text_error()));
            lines.push(Line::from(""));
        }
        for l in self.text.lines() {
            lines.push(Line::from(l.to_string()));
        }
        self.last_viewport_h = area.height.saturating_sub(2);
        let total_lines = lines.len() as u16;
        let max_scroll = total_lines.saturating_sub(self.last_viewport_h);
        if self.scroll_y > max_scroll {
            self.scroll_y = max_scroll;
        }
        let block = panel_block(&self.title, focused);
        let p = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: !self.wrap })
            .scroll((self.scroll_y, 0));
        f.render_widget(p, area);
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
            KeyCode::End => {
                let mut total: u16 = 0;
                if self.error.is_some() {
                    total = total.saturating_add(2);
                }
                total = total.saturating_add(self.text.lines().count() as u16);
                self.scroll_y = total.saturating_sub(self.last_viewport_h);
            }
            KeyCode::Char('w') | KeyCode::Char('W') => {
                self.wrap = !self.wrap;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn end_jumps_to_bottom_and_w_toggles_wrap() {
        let text = (0..30)
            .map(|i| format!("line-{i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let mut w = ResponseViewer::from_text("Last Response", text);
        let backend = TestBackend::new(40, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        let _ = terminal.draw(|f| {
            let area = ratatui::layout::Rect {
                x: 0,
                y: 0,
                width: 40,
                height: 12,
            };
            w.render(f, area, true);
        });
        w.on_key(KeyCode::End);
        let expected_max = (30u16).saturating_sub(w.last_viewport_h);
        assert_eq!(w.scroll_y, expected_max);
        assert!(!w.wrap);
        w.on_key(KeyCode::Char('w'));
        assert!(w.wrap);
    }
}
