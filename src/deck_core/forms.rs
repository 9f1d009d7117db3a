use crate::model::{ActionDescriptor, CaptureMode};
use crate::nav::keys::form_key;
use crate::widgets::form::FormState;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Result of activating an action control.
#[derive(Debug)]
pub enum Activation {
    /// A new form was rendered under its identity key.
    Created { key: String },
    /// A form already existed; only its visibility flipped.
    Toggled { key: String, visible: bool },
    /// The action captures nothing; dispatch the descriptor as-is.
    Immediate { descriptor: Box<ActionDescriptor> },
}

/// All rendered action forms, keyed by identity. The identity is the
/// step/action/group triple, so repeated activation of the same control can
/// never produce a second form.
#[derive(Default)]
pub struct FormStore {
    forms: HashMap<String, FormState>,
}

impl FormStore {
    /// Toggle-or-create: the only way a form enters the store.
    pub fn activate(
        &mut self,
        step_euid: &str,
        action: &str,
        action_group: &str,
        title: &str,
        ds: &JsonValue,
    ) -> Result<Activation, String> {
        let key = form_key(step_euid, action, action_group);
        if let Some(form) = self.forms.get_mut(&key) {
            form.visible = !form.visible;
            return Ok(Activation::Toggled {
                key,
                visible: form.visible,
            });
        }
        let descriptor: ActionDescriptor = serde_json::from_value(ds.clone())
            .map_err(|e| format!("invalid action payload for '{action}': {e}"))?;
        if descriptor.capture_data == CaptureMode::No {
            return Ok(Activation::Immediate {
                descriptor: Box::new(descriptor),
            });
        }
        self.forms.insert(
            key.clone(),
            FormState::new(key.clone(), title, step_euid, action, action_group, descriptor),
        );
        Ok(Activation::Created { key })
    }

    pub fn get(&self, key: &str) -> Option<&FormState> {
        self.forms.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FormState> {
        self.forms.get_mut(key)
    }

    /// Remove a form from the store, returning it for submission. Removal is
    /// unconditional: it happens whether or not the dispatch later succeeds.
    pub fn take(&mut self, key: &str) -> Option<FormState> {
        self.forms.remove(key)
    }

    pub fn visible(&self, key: &str) -> bool {
        self.forms.get(key).map(|f| f.visible).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// Page-reload semantics: every rendered form is discarded.
    pub fn clear(&mut self) {
        self.forms.clear();
    }
}
