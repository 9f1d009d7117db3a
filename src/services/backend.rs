use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::env;
use std::sync::mpsc::Sender;
use std::thread;

use crate::model::{ActionDescriptor, WorkflowView};

/// Expand `${VAR}` placeholders from the environment; unknown variables
/// collapse to the empty string.
pub fn expand_env(input: &str) -> String {
    let re = Regex::new(r"\$\{([A-Z0-9_]+)\}").unwrap();
    let env_map: HashMap<String, String> = env::vars().collect();
    re.replace_all(input, |caps: &regex::Captures| {
        env_map.get(&caps[1]).cloned().unwrap_or_default()
    })
    .to_string()
}

/// Body of the action-execution request. Field names are the wire contract.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepActionRequest {
    pub action_group: String,
    pub euid: String,
    pub action: String,
    pub ds: ActionDescriptor,
}

/// Body of the panel-state persistence request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PanelStateRequest {
    pub step_euid: String,
    pub state: String,
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: expand_env(base_url).trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn perform_step_action(&self, req: &StepActionRequest) -> Result<JsonValue> {
        let url = self.endpoint("workflow_step_action");
        let body = serde_json::to_value(req).context("encoding step action request")?;
        let response = ureq::post(&url)
            .send_json(body)
            .map_err(|e| anyhow!("POST {url}: {e}"))?;
        response
            .into_json::<JsonValue>()
            .with_context(|| format!("parsing response from {url}"))
    }

    pub fn update_panel_state(&self, req: &PanelStateRequest) -> Result<JsonValue> {
        let url = self.endpoint("update_accordion_state");
        let body = serde_json::to_value(req).context("encoding panel state request")?;
        let response = ureq::post(&url)
            .send_json(body)
            .map_err(|e| anyhow!("POST {url}: {e}"))?;
        response
            .into_json::<JsonValue>()
            .with_context(|| format!("parsing response from {url}"))
    }

    pub fn fetch_workflow_view(&self, workflow_euid: &str) -> Result<WorkflowView> {
        let url = format!(
            "{}?workflow_euid={}",
            self.endpoint("workflow_view"),
            urlencoding::encode(workflow_euid)
        );
        let response = ureq::get(&url)
            .call()
            .map_err(|e| anyhow!("GET {url}: {e}"))?;
        response
            .into_json::<WorkflowView>()
            .with_context(|| format!("parsing workflow view from {url}"))
    }
}

// One thread per request; the outcome always comes back over the channel,
// success or failure alike, so the update loop owns every state change.

pub fn spawn_dispatch_action(
    client: BackendClient,
    req: StepActionRequest,
    tx: Sender<crate::ui::NetMsg>,
) {
    thread::spawn(move || {
        let outcome = client.perform_step_action(&req).map_err(|e| format!("{e}"));
        let _ = tx.send(crate::ui::NetMsg::Dispatch {
            euid: req.euid,
            action: req.action,
            outcome,
        });
    });
}

pub fn spawn_sync_panel_state(
    client: BackendClient,
    req: PanelStateRequest,
    tx: Sender<crate::ui::NetMsg>,
) {
    thread::spawn(move || {
        let outcome = client.update_panel_state(&req).map_err(|e| format!("{e}"));
        let _ = tx.send(crate::ui::NetMsg::PanelSync {
            step_euid: req.step_euid,
            outcome,
        });
    });
}

pub fn spawn_load_view(client: BackendClient, workflow_euid: String, tx: Sender<crate::ui::NetMsg>) {
    thread::spawn(move || {
        let outcome = client
            .fetch_workflow_view(&workflow_euid)
            .map_err(|e| format!("{e}"));
        let _ = tx.send(crate::ui::NetMsg::View(outcome));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn step_action_body_matches_wire_contract() {
        let ds: ActionDescriptor = serde_json::from_value(json!({
            "capture_data": "yes",
            "captured_data": {"Sample Name": "s-1"},
            "opaque": true
        }))
        .unwrap();
        let req = StepActionRequest {
            action_group: "core".into(),
            euid: "ST1".into(),
            action: "annotate".into(),
            ds,
        };
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body,
            json!({
                "action_group": "core",
                "euid": "ST1",
                "action": "annotate",
                "ds": {
                    "capture_data": "yes",
                    "captured_data": {"Sample Name": "s-1"},
                    "opaque": true
                }
            })
        );
    }

    #[test]
    fn panel_state_body_matches_wire_contract() {
        let req = PanelStateRequest {
            step_euid: "ST1".into(),
            state: "closed".into(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"step_euid": "ST1", "state": "closed"})
        );
    }

    #[test]
    fn endpoint_join_tolerates_slashes() {
        let c = BackendClient::new("http://host:1234/");
        assert_eq!(
            c.endpoint("/workflow_step_action"),
            "http://host:1234/workflow_step_action"
        );
        assert_eq!(
            c.endpoint("update_accordion_state"),
            "http://host:1234/update_accordion_state"
        );
    }

    #[test]
    fn expand_env_substitutes_known_vars_and_drops_unknown() {
        std::env::set_var("FLOWDECK_TEST_HOST", "lab-01");
        let out = expand_env("http://${FLOWDECK_TEST_HOST}:9/${FLOWDECK_TEST_MISSING}x");
        assert_eq!(out, "http://lab-01:9/x");
    }
}
