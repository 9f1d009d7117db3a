use crate::deck_core::forms::Activation;
use crate::model::{validate_workflow_view, WorkflowView};
use crate::nav::keys::list_key;
use crate::services::backend::{PanelStateRequest, StepActionRequest};
use crate::ui::{AppState, PaneFocus, ToastLevel};
use crate::widgets::diff_viewer::DiffViewer;
use crate::widgets::json_viewer::ResponseViewer;
use serde_json::Value as JsonValue;

/// Delay between a dispatch completing and the full view reload, so the
/// backend can settle derived state before we re-fetch.
pub const RELOAD_DELAY_MS: u64 = 500;

pub enum AppMsg {
    ActivateAction {
        step_euid: String,
        group: String,
        action: String,
    },
    SubmitForm {
        key: String,
    },
    CancelForm {
        key: String,
    },
    AddListEntry {
        key: String,
        field: String,
    },
    RemoveListEntry {
        key: String,
        field: String,
    },
    TogglePanel {
        step_euid: String,
    },
    ToggleDiff {
        row_id: String,
    },
    ViewLoaded {
        outcome: Result<WorkflowView, String>,
    },
    DispatchDone {
        euid: String,
        action: String,
        outcome: Result<JsonValue, String>,
    },
    PanelSynced {
        step_euid: String,
        outcome: Result<JsonValue, String>,
    },
    ReloadDue,
}

#[derive(Debug)]
pub enum Effect {
    DispatchAction {
        request: StepActionRequest,
    },
    SyncPanelState {
        request: PanelStateRequest,
    },
    ScheduleReload {
        delay_ms: u64,
    },
    LoadView,
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
}

fn clamp_selection(state: &mut AppState) {
    let total = crate::nav::flatten::flatten_nodes(state).len();
    if total == 0 {
        state.selected = 0;
        state.tree_offset = 0;
    } else if state.selected >= total {
        state.selected = total - 1;
    }
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        ActivateAction {
            step_euid,
            group,
            action,
        } => {
            let found = state.view.as_ref().and_then(|view| {
                view.steps
                    .iter()
                    .find(|s| s.euid == step_euid)
                    .and_then(|step| {
                        step.action_groups
                            .iter()
                            .find(|g| g.name == group)
                            .and_then(|g| g.actions.iter().find(|a| a.name == action))
                    })
                    .map(|a| (a.label().to_string(), a.ds.clone()))
            });
            let Some((title, ds)) = found else {
                state.dbg(format!(
                    "activation for unknown action {step_euid}/{group}/{action} ignored"
                ));
                return effects;
            };
            match state.forms.activate(&step_euid, &action, &group, &title, &ds) {
                Ok(Activation::Created { key }) => {
                    state.dbg(format!("form {key} rendered"));
                    state.active_form_key = Some(key);
                    state.focus = PaneFocus::Detail;
                }
                Ok(Activation::Toggled { key, visible }) => {
                    state.dbg(format!(
                        "form {key} {}",
                        if visible { "shown" } else { "hidden" }
                    ));
                    if visible {
                        state.active_form_key = Some(key);
                        state.focus = PaneFocus::Detail;
                    } else {
                        if state.active_form_key.as_deref() == Some(key.as_str()) {
                            state.active_form_key = None;
                        }
                        state.focus = PaneFocus::Steps;
                    }
                }
                Ok(Activation::Immediate { descriptor }) => {
                    state.dbg(format!("action {action} needs no capture, dispatching"));
                    effects.push(Effect::DispatchAction {
                        request: StepActionRequest {
                            action_group: group,
                            euid: step_euid,
                            action,
                            ds: *descriptor,
                        },
                    });
                }
                Err(e) => {
                    state.dbg(e);
                    effects.push(Effect::ShowToast {
                        text: "Invalid action payload".into(),
                        level: ToastLevel::Error,
                        seconds: 3,
                    });
                }
            }
        }
        SubmitForm { key } => {
            let Some(mut form) = state.forms.take(&key) else {
                // The submit control only exists while its form does; log and
                // carry on rather than tearing the whole UI down.
                state.dbg(format!("submit for unknown form {key} ignored"));
                return effects;
            };
            form.merge_into_descriptor();
            if state.active_form_key.as_deref() == Some(key.as_str()) {
                state.active_form_key = None;
            }
            state.focus = PaneFocus::Steps;
            state.dbg(format!("form {key} submitted and removed"));
            effects.push(Effect::DispatchAction {
                request: StepActionRequest {
                    action_group: form.action_group,
                    euid: form.step_euid,
                    action: form.action,
                    ds: form.descriptor,
                },
            });
        }
        CancelForm { key } => {
            if let Some(form) = state.forms.get_mut(&key) {
                form.visible = false;
                form.editing = false;
            }
            if state.active_form_key.as_deref() == Some(key.as_str()) {
                state.active_form_key = None;
            }
            state.focus = PaneFocus::Steps;
            state.dbg(format!("form {key} hidden"));
        }
        AddListEntry { key, field } => {
            let outcome = state
                .forms
                .get_mut(&key)
                .map(|form| (form.add_list_entry(&field), list_key(&form.step_euid, &field)));
            match outcome {
                Some((true, lk)) => state.dbg(format!("added entry to {lk}")),
                Some((false, lk)) => state.dbg(format!("no repeatable field behind {lk}")),
                None => state.dbg(format!("list add for unknown form {key} ignored")),
            }
        }
        RemoveListEntry { key, field } => {
            let outcome = state
                .forms
                .get_mut(&key)
                .map(|form| (form.remove_list_entry(&field), list_key(&form.step_euid, &field)));
            match outcome {
                Some((true, lk)) => state.dbg(format!("removed entry from {lk}")),
                // one entry always stays
                Some((false, lk)) => state.dbg(format!("remove on {lk} ignored")),
                None => state.dbg(format!("list remove for unknown form {key} ignored")),
            }
        }
        TogglePanel { step_euid } => match state.panels.toggle(&step_euid) {
            Some(next) => {
                state.dbg(format!("panel {step_euid} -> {}", next.as_str()));
                effects.push(Effect::SyncPanelState {
                    request: PanelStateRequest {
                        step_euid,
                        state: next.as_str().to_string(),
                    },
                });
                clamp_selection(state);
            }
            None => state.dbg(format!("toggle for unknown panel {step_euid} ignored")),
        },
        ToggleDiff { row_id } => {
            let is_current = state
                .diff
                .as_ref()
                .map(|d| d.row_id == row_id)
                .unwrap_or(false);
            if is_current {
                let shown = state.diff.as_mut().map(|d| {
                    d.toggle();
                    d.shown
                });
                state.focus = if shown.unwrap_or(false) {
                    PaneFocus::Detail
                } else {
                    PaneFocus::Steps
                };
            } else {
                let row = state.view.as_ref().and_then(|view| {
                    view.steps
                        .iter()
                        .flat_map(|s| s.audit.iter())
                        .find(|r| r.id == row_id)
                        .cloned()
                });
                match row {
                    Some(row) => {
                        state.dbg(format!("showing json diff for {row_id}"));
                        state.diff = Some(DiffViewer::from_row(&row));
                        state.focus = PaneFocus::Detail;
                    }
                    None => state.dbg(format!("diff toggle for unknown row {row_id} ignored")),
                }
            }
        }
        ViewLoaded { outcome } => match outcome {
            Ok(view) => {
                if let Err(e) = validate_workflow_view(&view) {
                    state.dbg(format!("view validation: {e}"));
                }
                state
                    .panels
                    .reset_from(view.steps.iter().map(|s| (s.euid.as_str(), s.panel_state.as_str())));
                state.forms.clear();
                state.active_form_key = None;
                state.diff = None;
                state.loading = false;
                state.status_text = None;
                state.last_error = None;
                state.dbg(format!("view loaded: {} steps", view.steps.len()));
                state.view = Some(view);
                clamp_selection(state);
            }
            Err(e) => {
                state.loading = false;
                state.status_text = None;
                state.dbg(format!("view load failed: {e}"));
                state.last_error = Some(e);
                effects.push(Effect::ShowToast {
                    text: "Failed to load workflow".into(),
                    level: ToastLevel::Error,
                    seconds: 3,
                });
            }
        },
        DispatchDone {
            euid,
            action,
            outcome,
        } => {
            state.submitting = false;
            state.status_text = None;
            match outcome {
                Ok(v) => {
                    let pretty =
                        serde_json::to_string_pretty(&v).unwrap_or_else(|_| v.to_string());
                    state.dbg(format!("action {action} ok for {euid}"));
                    state.response = Some(ResponseViewer::from_text("Last Response", pretty));
                    effects.push(Effect::ShowToast {
                        text: format!("{action} performed for {euid}"),
                        level: ToastLevel::Success,
                        seconds: 2,
                    });
                }
                Err(e) => {
                    state.dbg(format!("action {action} failed for {euid}: {e}"));
                    state.response = Some(ResponseViewer::from_error("Last Response", e));
                    effects.push(Effect::ShowToast {
                        text: format!("{action} failed for {euid}"),
                        level: ToastLevel::Error,
                        seconds: 3,
                    });
                }
            }
            // The backend owns the truth either way; re-sync the whole view.
            effects.push(Effect::ScheduleReload {
                delay_ms: RELOAD_DELAY_MS,
            });
        }
        PanelSynced { step_euid, outcome } => match outcome {
            Ok(_) => state.dbg(format!("panel state saved for {step_euid}")),
            Err(e) => state.dbg(format!("panel state save failed for {step_euid}: {e}")),
        },
        ReloadDue => {
            state.forms.clear();
            state.active_form_key = None;
            state.diff = None;
            state.loading = true;
            state.status_text = Some("Reloading view…".into());
            state.dbg("reloading workflow view");
            effects.push(Effect::LoadView);
        }
    }
    effects
}

#[cfg(test)]
mod tests;
