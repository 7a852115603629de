use std::fmt;
use std::path::PathBuf;

/// Why a coordinate was not expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Already visited in this traversal (dependency cycle or shared dependency).
    AlreadyVisited,
    Cancelled,
}

/// Phase in which a coordinate failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    NoMetadata,
    NoVersion,
    NoDescriptor,
    NoArtifact,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::NoMetadata => "no-metadata",
            FailureReason::NoVersion => "no-version",
            FailureReason::NoDescriptor => "no-descriptor",
            FailureReason::NoArtifact => "no-artifact",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Synced {
        version: String,
        artifact: PathBuf,
    },
    Skipped(SkipReason),
    Failed {
        reason: FailureReason,
        detail: String,
    },
}

/// Terminal state of one requested coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// The coordinate as requested (`g:a:v` or `g:a:`).
    pub coordinate: String,
    pub status: SyncStatus,
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self.status, SyncStatus::Synced { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, SyncStatus::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SyncStatus::Failed { .. })
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            SyncStatus::Synced { version, .. } => write!(f, "{} synced ({})", self.coordinate, version),
            SyncStatus::Skipped(SkipReason::AlreadyVisited) => {
                write!(f, "{} skipped (already visited)", self.coordinate)
            }
            SyncStatus::Skipped(SkipReason::Cancelled) => {
                write!(f, "{} skipped (cancelled)", self.coordinate)
            }
            SyncStatus::Failed { reason, detail } => {
                write!(f, "{} failed [{}]: {}", self.coordinate, reason, detail)
            }
        }
    }
}

/// Per-coordinate outcomes of a traversal, parents before their children.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
    /// Size of the visited set when the traversal finished.
    pub visited: usize,
}

impl SyncReport {
    pub fn synced(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes.iter().filter(|o| o.is_synced())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes.iter().filter(|o| o.is_skipped())
    }

    pub fn failed(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn outcome(&self, coordinate: &str) -> Option<&SyncOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.coordinate == coordinate && !o.is_skipped())
    }
}
