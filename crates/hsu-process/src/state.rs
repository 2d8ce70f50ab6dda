use std::fmt;

/// Lifecycle of a [`ProcessHandle`](crate::ProcessHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    /// Not launched yet
    #[default]
    Idle,
    /// Child forked and not yet reaped
    Launched,
    /// Child reaped; terminal
    Joined,
    /// Setup failed before a child existed
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Idle => write!(f, "idle"),
            LifecycleState::Launched => write!(f, "launched"),
            LifecycleState::Joined => write!(f, "joined"),
            LifecycleState::Failed => write!(f, "failed"),
        }
    }
}

impl LifecycleState {
    /// Whether a launch may be attempted from this state.
    pub fn can_launch(&self) -> bool {
        matches!(self, LifecycleState::Idle | LifecycleState::Failed)
    }

    /// Whether the handle owns a live, unreaped child.
    pub fn is_live(&self) -> bool {
        matches!(self, LifecycleState::Launched)
    }

    /// Check if a transition from this state to `target` is valid
    pub fn is_valid_transition(&self, target: LifecycleState) -> bool {
        match (self, target) {
            (LifecycleState::Idle, LifecycleState::Launched) => true,
            (LifecycleState::Idle, LifecycleState::Failed) => true,

            // Retrying after a setup failure
            (LifecycleState::Failed, LifecycleState::Launched) => true,
            (LifecycleState::Failed, LifecycleState::Failed) => true,

            (LifecycleState::Launched, LifecycleState::Joined) => true,

            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(LifecycleState::Idle.is_valid_transition(LifecycleState::Launched));
        assert!(LifecycleState::Idle.is_valid_transition(LifecycleState::Failed));
        assert!(LifecycleState::Launched.is_valid_transition(LifecycleState::Joined));
        assert!(LifecycleState::Failed.is_valid_transition(LifecycleState::Launched));
    }

    #[test]
    fn test_joined_is_terminal() {
        for target in [
            LifecycleState::Idle,
            LifecycleState::Launched,
            LifecycleState::Joined,
            LifecycleState::Failed,
        ] {
            assert!(!LifecycleState::Joined.is_valid_transition(target));
        }
        assert!(!LifecycleState::Launched.is_valid_transition(LifecycleState::Launched));
        assert!(!LifecycleState::Launched.is_valid_transition(LifecycleState::Idle));
    }

    #[test]
    fn test_launch_guard() {
        assert!(LifecycleState::Idle.can_launch());
        assert!(LifecycleState::Failed.can_launch());
        assert!(!LifecycleState::Launched.can_launch());
        assert!(!LifecycleState::Joined.can_launch());
        assert!(LifecycleState::Launched.is_live());
        assert_eq!(LifecycleState::default(), LifecycleState::Idle);
    }
}
