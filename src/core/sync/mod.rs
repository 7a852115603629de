mod outcome;
mod printer;
mod state;
mod syncer;

pub use outcome::{FailureReason, SkipReason, SyncOutcome, SyncReport, SyncStatus};
pub use printer::DependencyPrinter;
pub use state::{CancelToken, SyncState};
pub use syncer::{SyncOptions, Syncer};
