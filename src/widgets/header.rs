use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::ui::AppState;

pub fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let title = state
        .config
        .header
        .clone()
        .unwrap_or_else(|| "FLOWDECK".to_string());
    let mut spans = vec![Span::styled(
        title,
        Style::default()
            .fg(state.theme.primary)
            .add_modifier(Modifier::BOLD),
    )];
    if let Some(view) = &state.view {
        spans.push(Span::raw("  —  "));
        spans.push(Span::styled(
            format!("{} ({})", view.name, view.euid),
            Style::default().fg(state.theme.accent),
        ));
        if let Some(status) = &view.status {
            spans.push(Span::styled(
                format!("  [{status}]"),
                crate::theme::text_muted(),
            ));
        }
    }
    let block = Block::default().borders(Borders::BOTTOM);
    let p = Paragraph::new(Line::from(spans)).block(block);
    f.render_widget(p, area);
}
