use std::fmt;

/// Lifecycle of one staging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Open,
    Validated,
    Closed,
    Released,
    Dropped,
}

/// A state-changing call on a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Validate { passed: bool },
    Close,
    Release,
    Drop,
}

impl SessionState {
    /// The transition table. `None` means the operation is illegal here.
    pub fn apply(self, op: Operation) -> Option<SessionState> {
        use Operation::*;
        use SessionState::*;

        match (self, op) {
            (Open, Upload) => Some(Open),
            (Open, Validate { passed: true }) => Some(Validated),
            (Open, Validate { passed: false }) => Some(Open),
            (Validated, Close) => Some(Closed),
            (Closed, Close) => Some(Closed),
            (Closed, Release) => Some(Released),
            (Open | Validated | Closed, Drop) => Some(Dropped),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Released | SessionState::Dropped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Open => "OPEN",
            SessionState::Validated => "VALIDATED",
            SessionState::Closed => "CLOSED",
            SessionState::Released => "RELEASED",
            SessionState::Dropped => "DROPPED",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Upload => "upload",
            Operation::Validate { .. } => "validate",
            Operation::Close => "close",
            Operation::Release => "release",
            Operation::Drop => "drop",
        };
        f.write_str(s)
    }
}
