use super::*;
use serde_json::json;

fn seeded_state() -> AppState {
    let view: WorkflowView = serde_json::from_value(json!({
        "euid": "WF1",
        "name": "Accession",
        "steps": [
            {
                "euid": "ST1",
                "name": "Receive",
                "panel_state": "open",
                "action_groups": [{
                    "name": "core",
                    "actions": [
                        {
                            "name": "annotate",
                            "title": "Annotate Sample",
                            "ds": {
                                "capture_data": "yes",
                                "captured_data": {
                                    "Sample Name": "s-1",
                                    "_hint": "<b>check the label</b>",
                                    "barcodes": ["bc-1", "bc-2"]
                                },
                                "opaque": 7
                            }
                        },
                        {
                            "name": "release",
                            "ds": {"capture_data": "no", "captured_data": {"k": "v"}}
                        }
                    ]
                }],
                "audit": [{"id": "r1", "old_json": {"a": 1}, "new_json": {"a": 2}}]
            },
            {"euid": "ST2", "name": "QC", "panel_state": "closed"}
        ]
    }))
    .unwrap();
    let mut state = AppState::default();
    state
        .panels
        .reset_from(view.steps.iter().map(|s| (s.euid.as_str(), s.panel_state.as_str())));
    state.view = Some(view);
    state
}

fn activate_annotate(state: &mut AppState) -> Vec<Effect> {
    update(
        state,
        AppMsg::ActivateAction {
            step_euid: "ST1".into(),
            group: "core".into(),
            action: "annotate".into(),
        },
    )
}

#[test]
fn capture_no_dispatches_immediately_without_rendering() {
    let mut st = seeded_state();
    let effects = update(
        &mut st,
        AppMsg::ActivateAction {
            step_euid: "ST1".into(),
            group: "core".into(),
            action: "release".into(),
        },
    );
    assert!(st.forms.is_empty());
    match effects.as_slice() {
        [Effect::DispatchAction { request }] => {
            assert_eq!(request.euid, "ST1");
            assert_eq!(request.action, "release");
            assert_eq!(request.action_group, "core");
            assert_eq!(
                serde_json::to_value(&request.ds).unwrap(),
                json!({"capture_data": "no", "captured_data": {"k": "v"}})
            );
        }
        other => panic!("expected a single dispatch, got {other:?}"),
    }
}

#[test]
fn first_activation_renders_second_toggles() {
    let mut st = seeded_state();
    let effects = activate_annotate(&mut st);
    assert!(effects.is_empty());
    let key = "ST1-annotatecore-form";
    assert_eq!(st.forms.len(), 1);
    assert!(st.forms.visible(key));
    assert_eq!(st.active_form_key.as_deref(), Some(key));

    let effects = activate_annotate(&mut st);
    assert!(effects.is_empty());
    assert_eq!(st.forms.len(), 1, "no second form under the same identity");
    assert!(!st.forms.visible(key));
    assert!(st.active_form_key.is_none());
}

#[test]
fn malformed_descriptor_is_caught_and_logged() {
    let mut st = seeded_state();
    if let Some(view) = st.view.as_mut() {
        view.steps[0].action_groups[0].actions[0].ds = json!({"capture_data": 13});
    }
    let effects = activate_annotate(&mut st);
    assert!(st.forms.is_empty());
    assert!(matches!(effects.as_slice(), [Effect::ShowToast { .. }]));
    assert!(st
        .debug_log
        .iter()
        .any(|l| l.contains("invalid action payload")));
}

#[test]
fn submit_merges_edits_skips_literals_and_removes_form() {
    let mut st = seeded_state();
    activate_annotate(&mut st);
    let key = "ST1-annotatecore-form";
    {
        let form = st.forms.get_mut(key).unwrap();
        if let crate::widgets::form::RowValue::Text(s) = &mut form.rows[0].value {
            *s = "renamed \"x\"".into();
        }
        assert!(form.remove_list_entry("barcodes"));
    }
    let effects = update(&mut st, AppMsg::SubmitForm { key: key.into() });
    assert!(st.forms.is_empty(), "container removed unconditionally");
    match effects.as_slice() {
        [Effect::DispatchAction { request }] => {
            assert_eq!(
                serde_json::to_value(&request.ds).unwrap(),
                json!({
                    "capture_data": "yes",
                    "captured_data": {
                        "Sample Name": "renamed \"x\"",
                        "_hint": "<b>check the label</b>",
                        "barcodes": ["bc-1"]
                    },
                    "opaque": 7
                })
            );
        }
        other => panic!("expected a single dispatch, got {other:?}"),
    }
}

#[test]
fn submit_for_missing_form_is_a_logged_noop() {
    let mut st = seeded_state();
    let effects = update(
        &mut st,
        AppMsg::SubmitForm {
            key: "ST9-nopenope-form".into(),
        },
    );
    assert!(effects.is_empty());
    assert!(st.debug_log.iter().any(|l| l.contains("unknown form")));
}

#[test]
fn dispatch_completion_schedules_one_reload_either_way() {
    let mut st = seeded_state();
    let ok = update(
        &mut st,
        AppMsg::DispatchDone {
            euid: "ST1".into(),
            action: "annotate".into(),
            outcome: Ok(json!({"status": "success"})),
        },
    );
    let reloads_ok: Vec<_> = ok
        .iter()
        .filter(|e| matches!(e, Effect::ScheduleReload { delay_ms } if *delay_ms == RELOAD_DELAY_MS))
        .collect();
    assert_eq!(reloads_ok.len(), 1);

    let err = update(
        &mut st,
        AppMsg::DispatchDone {
            euid: "ST1".into(),
            action: "annotate".into(),
            outcome: Err("boom".into()),
        },
    );
    let reloads_err: Vec<_> = err
        .iter()
        .filter(|e| matches!(e, Effect::ScheduleReload { delay_ms } if *delay_ms == RELOAD_DELAY_MS))
        .collect();
    assert_eq!(reloads_err.len(), 1, "failure reloads just like success");
}

#[test]
fn panel_toggle_flips_locally_and_persists_precomputed_state() {
    let mut st = seeded_state();
    assert!(st.panels.is_open("ST1"));
    let effects = update(
        &mut st,
        AppMsg::TogglePanel {
            step_euid: "ST1".into(),
        },
    );
    assert!(!st.panels.is_open("ST1"), "local flip is unconditional");
    match effects.as_slice() {
        [Effect::SyncPanelState { request }] => {
            assert_eq!(request.step_euid, "ST1");
            assert_eq!(request.state, "closed");
        }
        other => panic!("expected one persistence request, got {other:?}"),
    }
    let effects = update(
        &mut st,
        AppMsg::TogglePanel {
            step_euid: "ST1".into(),
        },
    );
    match effects.as_slice() {
        [Effect::SyncPanelState { request }] => assert_eq!(request.state, "open"),
        other => panic!("expected one persistence request, got {other:?}"),
    }
}

#[test]
fn panel_sync_failure_leaves_local_state_alone() {
    let mut st = seeded_state();
    update(
        &mut st,
        AppMsg::TogglePanel {
            step_euid: "ST1".into(),
        },
    );
    assert!(!st.panels.is_open("ST1"));
    let effects = update(
        &mut st,
        AppMsg::PanelSynced {
            step_euid: "ST1".into(),
            outcome: Err("500".into()),
        },
    );
    assert!(effects.is_empty());
    assert!(!st.panels.is_open("ST1"));
}

#[test]
fn list_entries_shrink_but_never_below_one() {
    let mut st = seeded_state();
    activate_annotate(&mut st);
    let key = "ST1-annotatecore-form".to_string();
    update(
        &mut st,
        AppMsg::RemoveListEntry {
            key: key.clone(),
            field: "barcodes".into(),
        },
    );
    update(
        &mut st,
        AppMsg::RemoveListEntry {
            key: key.clone(),
            field: "barcodes".into(),
        },
    );
    let form = st.forms.get(&key).unwrap();
    match &form.rows.iter().find(|r| r.key == "barcodes").unwrap().value {
        crate::widgets::form::RowValue::List { entries, .. } => {
            assert_eq!(entries.as_slice(), ["bc-1"]);
        }
        other => panic!("expected list row, got {other:?}"),
    }
    assert!(st.debug_log.iter().any(|l| l.contains("list-ST1-barcodes")));
}

#[test]
fn reload_discards_forms_and_refetches() {
    let mut st = seeded_state();
    activate_annotate(&mut st);
    assert_eq!(st.forms.len(), 1);
    let effects = update(&mut st, AppMsg::ReloadDue);
    assert!(st.forms.is_empty());
    assert!(st.loading);
    assert!(matches!(effects.as_slice(), [Effect::LoadView]));
}

#[test]
fn view_load_reinitializes_panels_from_server_attrs() {
    let mut st = seeded_state();
    update(
        &mut st,
        AppMsg::TogglePanel {
            step_euid: "ST1".into(),
        },
    );
    assert!(!st.panels.is_open("ST1"));
    let reloaded: WorkflowView = serde_json::from_value(json!({
        "euid": "WF1",
        "name": "Accession",
        "steps": [
            {"euid": "ST1", "name": "Receive", "panel_state": "open"},
            {"euid": "ST2", "name": "QC", "panel_state": "closed"}
        ]
    }))
    .unwrap();
    update(
        &mut st,
        AppMsg::ViewLoaded {
            outcome: Ok(reloaded),
        },
    );
    assert!(st.panels.is_open("ST1"), "server attribute wins on load");
    assert!(!st.panels.is_open("ST2"));
    assert!(st.last_error.is_none());
}

#[test]
fn diff_toggle_tracks_row_and_label() {
    let mut st = seeded_state();
    update(&mut st, AppMsg::ToggleDiff { row_id: "r1".into() });
    let d = st.diff.as_ref().unwrap();
    assert!(d.shown);
    assert_eq!(d.button_label(), "Hide JSON");
    update(&mut st, AppMsg::ToggleDiff { row_id: "r1".into() });
    let d = st.diff.as_ref().unwrap();
    assert!(!d.shown);
    assert_eq!(d.button_label(), "Show JSON");
}
