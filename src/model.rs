use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Whether an action wants user input captured before it runs.
///
/// Anything the server does not explicitly mark `"no"` gets a form.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    #[serde(rename = "yes")]
    Yes,
    #[serde(rename = "no")]
    No,
}

impl CaptureMode {
    pub fn requires_capture(self) -> bool {
        matches!(self, CaptureMode::Yes)
    }
}

/// Server-supplied description of one step action.
///
/// Only `capture_data` and `captured_data` are interpreted by the client;
/// everything else round-trips verbatim through `rest` and is sent back to
/// the backend untouched when the action is dispatched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ActionDescriptor {
    #[serde(default)]
    pub capture_data: CaptureMode,
    #[serde(default)]
    pub captured_data: serde_json::Map<String, JsonValue>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, JsonValue>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StepAction {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Raw descriptor as embedded by the server; parsed on activation so a
    /// malformed payload only affects the action it belongs to.
    pub ds: JsonValue,
}

impl StepAction {
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    /// Peek at `capture_data` without a full parse (used for list hints).
    pub fn runs_immediately(&self) -> bool {
        self.ds.get("capture_data").and_then(|s| s.as_str()) == Some("no")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ActionGroup {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub actions: Vec<StepAction>,
}

impl ActionGroup {
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }
}

/// One audit entry with the object payload before and after a mutation.
#[derive(Debug, Deserialize, Clone)]
pub struct AuditRow {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub old_json: JsonValue,
    #[serde(default)]
    pub new_json: JsonValue,
}

fn default_panel_state() -> String {
    "closed".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowStep {
    pub euid: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    /// `open` means the step panel starts expanded; any other value closed.
    #[serde(default = "default_panel_state")]
    pub panel_state: String,
    #[serde(default)]
    pub action_groups: Vec<ActionGroup>,
    #[serde(default)]
    pub audit: Vec<AuditRow>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorkflowView {
    pub euid: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Base URL of the backend; may contain `${VAR}` placeholders.
    pub backend_url: String,
    /// Workflow to load on startup; may contain `${VAR}` placeholders.
    pub workflow_euid: String,
    #[serde(default)]
    pub header: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8911".to_string(),
            workflow_euid: String::new(),
            header: Some("FLOWDECK".to_string()),
        }
    }
}

pub(crate) fn validate_workflow_view(view: &WorkflowView) -> Result<(), String> {
    use std::collections::HashSet;
    let mut euids = HashSet::new();
    for (i, step) in view.steps.iter().enumerate() {
        if step.euid.is_empty() {
            return Err(format!("step at index {i} has an empty euid"));
        }
        if !euids.insert(&step.euid) {
            return Err(format!("duplicate step euid: '{}' at index {}", step.euid, i));
        }
        for group in &step.action_groups {
            for action in &group.actions {
                if action.name.is_empty() {
                    return Err(format!(
                        "step '{}' group '{}' contains an action without a name",
                        step.euid, group.name
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn capture_mode_defaults_to_yes_when_absent() {
        let ds: ActionDescriptor = serde_json::from_value(json!({
            "captured_data": {"Sample Name": "s-1"}
        }))
        .unwrap();
        assert!(ds.capture_data.requires_capture());
    }

    #[test]
    fn descriptor_round_trips_including_quotes_and_unknown_fields() {
        let raw = json!({
            "capture_data": "yes",
            "captured_data": {
                "note": "a \"quoted\" <value>",
                "barcodes": ["bc-1", "bc-2"],
                "_hint": "<b>scan both tubes</b>"
            },
            "max_objs": 4,
            "nested": {"keep": ["me", 1, null]}
        });
        let ds: ActionDescriptor = serde_json::from_value(raw.clone()).unwrap();
        let back = serde_json::to_value(&ds).unwrap();
        assert_eq!(back, raw);
        let again: ActionDescriptor = serde_json::from_value(back).unwrap();
        assert_eq!(again, ds);
    }

    #[test]
    fn step_action_immediate_hint_reads_capture_flag() {
        let a = StepAction {
            name: "release".into(),
            title: None,
            ds: json!({"capture_data": "no", "captured_data": {}}),
        };
        assert!(a.runs_immediately());
        let b = StepAction {
            name: "annotate".into(),
            title: None,
            ds: json!({"capture_data": "yes"}),
        };
        assert!(!b.runs_immediately());
    }

    #[test]
    fn validate_detects_duplicate_step_euids() {
        let view: WorkflowView = serde_json::from_value(json!({
            "euid": "WF1",
            "name": "Accession",
            "steps": [
                {"euid": "ST1", "name": "Receive"},
                {"euid": "ST1", "name": "Receive again"}
            ]
        }))
        .unwrap();
        let err = validate_workflow_view(&view).unwrap_err();
        assert!(err.contains("duplicate step euid"));
    }

    #[test]
    fn step_panel_state_defaults_closed() {
        let step: WorkflowStep =
            serde_json::from_value(json!({"euid": "ST2", "name": "QC"})).unwrap();
        assert_eq!(step.panel_state, "closed");
    }
}
