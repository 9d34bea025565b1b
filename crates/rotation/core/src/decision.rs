use crate::catalog::Slot;
use crate::ids::ActionId;
use crate::usability::Target;

/// An action bound to its target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Selected {
    pub action: ActionId,
    pub target: Target,
}

impl Selected {
    pub fn new(action: ActionId, target: Target) -> Self {
        Self { action, target }
    }
}

/// The engine's output for one tick.
///
/// Produced fresh each tick and never retained. An empty decision is a valid
/// idle tick, not an error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecisionOutput {
    /// At most one action for the main cycle slot.
    pub main: Option<Selected>,
    /// Weave actions in the order they should be submitted.
    pub weaves: Vec<Selected>,
}

impl DecisionOutput {
    pub fn is_empty(&self) -> bool {
        self.main.is_none() && self.weaves.is_empty()
    }

    /// Returns `true` if `action` was already selected this tick.
    pub fn contains(&self, action: ActionId) -> bool {
        self.main.is_some_and(|s| s.action == action) || self.weaves.iter().any(|s| s.action == action)
    }

    /// Every selected action with its slot, main action first.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &Selected)> {
        self.main
            .iter()
            .map(|s| (Slot::Main, s))
            .chain(self.weaves.iter().map(|s| (Slot::Weave, s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_main_first() {
        let decision = DecisionOutput {
            main: Some(Selected::new(ActionId(1), Target::Actor)),
            weaves: vec![Selected::new(ActionId(2), Target::Actor)],
        };
        let slots: Vec<_> = decision.iter().map(|(slot, s)| (slot, s.action)).collect();

        assert_eq!(slots, vec![(Slot::Main, ActionId(1)), (Slot::Weave, ActionId(2))]);
        assert!(decision.contains(ActionId(2)));
        assert!(!decision.contains(ActionId(3)));
        assert!(DecisionOutput::default().is_empty());
    }
}
