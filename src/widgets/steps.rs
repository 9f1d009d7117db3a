use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::nav::flatten::{flatten_nodes, FlatNode};
use crate::nav::keys::form_key;
use crate::ui::AppState;
use crate::widgets::chrome::panel_block;

#[allow(dead_code)]
pub(crate) fn compute_scroll_window(total: usize, selected: usize, inner_h: u16) -> (usize, usize) {
    if inner_h == 0 || total == 0 {
        return (0, 0);
    }
    let sel = selected.min(total.saturating_sub(1));
    let ih = inner_h as usize;
    let start = sel.saturating_sub(ih - 1);
    let end = (start + ih).min(total);
    (start, end)
}

/// Left pane: workflow steps with their actions and audit rows. Closed step
/// panels collapse to a single header line.
pub fn draw_steps(f: &mut Frame, area: Rect, state: &AppState) {
    let nodes = flatten_nodes(state);
    let inner_h = area.height.saturating_sub(2);
    let total = nodes.len();
    let ih = inner_h as usize;
    let max_start = total.saturating_sub(ih);
    let start = state.tree_offset.min(max_start);
    let end = (start + ih).min(total);

    let Some(view) = &state.view else {
        let msg = state
            .last_error
            .clone()
            .unwrap_or_else(|| "Loading workflow…".to_string());
        let p = Paragraph::new(msg).block(panel_block("Workflow", true));
        f.render_widget(p, area);
        return;
    };

    let items: Vec<ListItem> = nodes
        .iter()
        .enumerate()
        .skip(start)
        .take(end - start)
        .map(|(idx, node)| {
            let is_sel = idx == state.selected;
            let sel = if is_sel { "> " } else { "  " };
            match node {
                FlatNode::Step { step_idx } => {
                    let step = &view.steps[*step_idx];
                    let chevron = if state.panels.is_open(&step.euid) {
                        "▾"
                    } else {
                        "▸"
                    };
                    let status = step
                        .status
                        .as_deref()
                        .map(|s| format!(" [{s}]"))
                        .unwrap_or_default();
                    let text = format!("{sel}{chevron} {} ({}){status}", step.name, step.euid);
                    ListItem::new(text).style(Style::default().fg(Color::Yellow))
                }
                FlatNode::Action {
                    step_idx,
                    group_idx,
                    action_idx,
                } => {
                    let step = &view.steps[*step_idx];
                    let group = &step.action_groups[*group_idx];
                    let action = &group.actions[*action_idx];
                    let hint = if action.runs_immediately() {
                        " (runs now)".to_string()
                    } else {
                        let key = form_key(&step.euid, &action.name, &group.name);
                        if state.forms.visible(&key) {
                            " (form open)".to_string()
                        } else if state.forms.get(&key).is_some() {
                            " (form hidden)".to_string()
                        } else {
                            String::new()
                        }
                    };
                    ListItem::new(format!(
                        "{sel}    {} · {}{hint}",
                        group.label(),
                        action.label()
                    ))
                }
                FlatNode::Audit { step_idx, row_idx } => {
                    let step = &view.steps[*step_idx];
                    let row = &step.audit[*row_idx];
                    let label = match &state.diff {
                        Some(d) if d.row_id == row.id => d.button_label(),
                        _ => "Show JSON",
                    };
                    let summary = row.summary.as_deref().unwrap_or(row.id.as_str());
                    ListItem::new(format!("{sel}    {summary}  [{label}]"))
                        .style(crate::theme::text_muted())
                }
            }
        })
        .collect();

    let title = format!("Workflow: {} ({})", view.name, view.euid);
    let focused = matches!(state.focus, crate::ui::PaneFocus::Steps);
    let list = List::new(items).block(panel_block(&title, focused));
    f.render_widget(list, area);
}
