use serde::Serialize;

/// Why a run stopped before finishing its steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The command could not be run or exited non-zero.
    Execution,
    /// The command ran but its output did not match.
    Validation,
    /// A stop was requested before the step started.
    Stopped,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Execution => "execution",
            Self::Validation => "validation",
            Self::Stopped => "stopped",
        }
    }
}

/// Lifecycle of one action run. `index` is zero-based and equals the number of
/// steps that already passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineState {
    Idle,
    Preloading,
    Connecting,
    Running { index: usize, total: usize },
    Succeeded { total: usize },
    Failed { index: usize, total: usize, kind: FailureKind },
    ConnectionError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    PreloadFinished,
    Connected { total: usize },
    ConnectFailed,
    StepPassed,
    StepFailed(FailureKind),
}

impl EngineState {
    /// Next state. Transitions that do not apply leave the state unchanged.
    pub fn advance(self, transition: Transition) -> EngineState {
        use EngineState::*;
        use Transition::*;

        match (self, transition) {
            (Idle, Start) => Preloading,
            (Preloading, PreloadFinished) => Connecting,
            (Connecting, Connected { total: 0 }) => Succeeded { total: 0 },
            (Connecting, Connected { total }) => Running { index: 0, total },
            (Connecting, ConnectFailed) => ConnectionError,
            (Running { index, total }, StepPassed) if index + 1 >= total => Succeeded { total },
            (Running { index, total }, StepPassed) => Running {
                index: index + 1,
                total,
            },
            (Running { index, total }, StepFailed(kind)) => Failed { index, total, kind },
            (state, _) => state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineState::Succeeded { .. } | EngineState::Failed { .. } | EngineState::ConnectionError
        )
    }

    /// Steps that passed so far.
    pub fn succeeded(&self) -> usize {
        match *self {
            EngineState::Running { index, .. } | EngineState::Failed { index, .. } => index,
            EngineState::Succeeded { total } => total,
            _ => 0,
        }
    }
}
