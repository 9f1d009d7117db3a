use crate::ui::AppState;

/// One selectable line in the workflow tree: a step header, an action under
/// an open step, or an audit row under an open step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FlatNode {
    Step {
        step_idx: usize,
    },
    Action {
        step_idx: usize,
        group_idx: usize,
        action_idx: usize,
    },
    Audit {
        step_idx: usize,
        row_idx: usize,
    },
}

/// Flatten the workflow into a linear list, honoring panel open/closed state:
/// a closed step contributes only its header line.
pub(crate) fn flatten_nodes(state: &AppState) -> Vec<FlatNode> {
    let mut nodes: Vec<FlatNode> = Vec::new();
    let Some(view) = &state.view else {
        return nodes;
    };
    for (step_idx, step) in view.steps.iter().enumerate() {
        nodes.push(FlatNode::Step { step_idx });
        if !state.panels.is_open(&step.euid) {
            continue;
        }
        for (group_idx, group) in step.action_groups.iter().enumerate() {
            for (action_idx, _) in group.actions.iter().enumerate() {
                nodes.push(FlatNode::Action {
                    step_idx,
                    group_idx,
                    action_idx,
                });
            }
        }
        for (row_idx, _) in step.audit.iter().enumerate() {
            nodes.push(FlatNode::Audit { step_idx, row_idx });
        }
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_state(panel_state: &str) -> AppState {
        let view: crate::model::WorkflowView = serde_json::from_value(json!({
            "euid": "WF1",
            "name": "Accession",
            "steps": [{
                "euid": "ST1",
                "name": "Receive",
                "panel_state": panel_state,
                "action_groups": [{
                    "name": "core",
                    "actions": [
                        {"name": "print_label", "ds": {"capture_data": "no"}},
                        {"name": "annotate", "ds": {"capture_data": "yes"}}
                    ]
                }],
                "audit": [{"id": "r1"}]
            }]
        }))
        .unwrap();
        let mut state = AppState::default();
        state
            .panels
            .reset_from(view.steps.iter().map(|s| (s.euid.as_str(), s.panel_state.as_str())));
        state.view = Some(view);
        state
    }

    #[test]
    fn open_step_exposes_actions_and_audit_rows() {
        let state = sample_state("open");
        let nodes = flatten_nodes(&state);
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0], FlatNode::Step { step_idx: 0 });
        assert_eq!(
            nodes[1],
            FlatNode::Action {
                step_idx: 0,
                group_idx: 0,
                action_idx: 0
            }
        );
        assert_eq!(nodes[3], FlatNode::Audit { step_idx: 0, row_idx: 0 });
    }

    #[test]
    fn closed_step_is_header_only() {
        let state = sample_state("closed");
        let nodes = flatten_nodes(&state);
        assert_eq!(nodes, vec![FlatNode::Step { step_idx: 0 }]);
    }
}
