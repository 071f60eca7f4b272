use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Cleaning,
    Parsing,
    Probing,
    Rendering,
    Writing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictOutcome {
    /// A candidate probed live.
    Accepted,
    /// Every candidate probed dead.
    Rejected,
    /// The task failed before reaching a decision.
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupVerdict {
    pub group: String,
    pub outcome: VerdictOutcome,
    /// Candidate URLs that were actually probed, in order.
    pub probed: Vec<String>,
}

impl GroupVerdict {
    pub fn is_valid(&self) -> bool {
        self.outcome == VerdictOutcome::Accepted
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress { stage: Stage },
    GroupChecked(GroupVerdict),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub groups_parsed: usize,
    pub groups_valid: usize,
    pub channels_written: usize,
    pub output_path: PathBuf,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    LocalRead,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::LocalRead => write!(f, "local read failed"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
