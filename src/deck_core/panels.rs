use std::collections::HashMap;

/// Visual state of one collapsible step panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelState {
    Open,
    Closed,
}

impl PanelState {
    /// Server attribute contract: `open` opens the panel, anything else closes it.
    pub fn from_attr(attr: &str) -> Self {
        if attr == "open" {
            PanelState::Open
        } else {
            PanelState::Closed
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            PanelState::Open => PanelState::Closed,
            PanelState::Closed => PanelState::Open,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PanelState::Open => "open",
            PanelState::Closed => "closed",
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, PanelState::Open)
    }
}

/// Open/closed state per step euid. Seeded from server attributes on every
/// view load; the client never remembers panel state across loads itself.
#[derive(Default)]
pub struct PanelRegistry {
    states: HashMap<String, PanelState>,
}

impl PanelRegistry {
    pub fn reset_from<'a>(&mut self, panels: impl Iterator<Item = (&'a str, &'a str)>) {
        self.states.clear();
        for (euid, attr) in panels {
            self.states
                .insert(euid.to_string(), PanelState::from_attr(attr));
        }
    }

    pub fn is_open(&self, euid: &str) -> bool {
        self.states.get(euid).map(|s| s.is_open()).unwrap_or(false)
    }

    /// Flip a panel and return the state it transitioned into. The target
    /// state is derived from the current state before any mutation, so each
    /// toggle corresponds to exactly one persistence request.
    pub fn toggle(&mut self, euid: &str) -> Option<PanelState> {
        let slot = self.states.get_mut(euid)?;
        let next = slot.flipped();
        *slot = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_open_opens_everything_else_closes() {
        assert!(PanelState::from_attr("open").is_open());
        assert!(!PanelState::from_attr("closed").is_open());
        assert!(!PanelState::from_attr("").is_open());
        assert!(!PanelState::from_attr("OPEN").is_open());
    }

    #[test]
    fn toggle_walks_open_closed_open() {
        let mut reg = PanelRegistry::default();
        reg.reset_from([("ST1", "open")].into_iter());
        assert!(reg.is_open("ST1"));
        assert_eq!(reg.toggle("ST1"), Some(PanelState::Closed));
        assert!(!reg.is_open("ST1"));
        assert_eq!(reg.toggle("ST1"), Some(PanelState::Open));
        assert!(reg.is_open("ST1"));
    }

    #[test]
    fn toggle_of_unknown_panel_is_none() {
        let mut reg = PanelRegistry::default();
        assert_eq!(reg.toggle("missing"), None);
    }

    #[test]
    fn reset_discards_previous_states() {
        let mut reg = PanelRegistry::default();
        reg.reset_from([("ST1", "open")].into_iter());
        reg.toggle("ST1");
        reg.reset_from([("ST1", "open")].into_iter());
        assert!(reg.is_open("ST1"));
    }
}
