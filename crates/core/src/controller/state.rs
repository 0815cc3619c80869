use std::fmt;

/// Lifecycle of one powered session. Transitions are driven solely by the
/// supervisor; nothing else mutates the state.
///
/// `Booting → Evaluating → {StayingUp → }ShuttingDown → Idling`
///
/// `Idling` is terminal but productive: the process keeps acknowledging the
/// watchdog there until the OS actually cuts power.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Booting,
    Evaluating,
    StayingUp { remaining: u32 },
    ShuttingDown { reason: String },
    Idling,
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Booting => write!(f, "Booting"),
            Self::Evaluating => write!(f, "Evaluating"),
            Self::StayingUp { remaining } => write!(f, "StayingUp({remaining}m)"),
            Self::ShuttingDown { reason } => write!(f, "ShuttingDown({reason})"),
            Self::Idling => write!(f, "Idling"),
        }
    }
}
