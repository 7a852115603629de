pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::cache::{LocalStore, Repository};
pub use crate::core::config::SyncSettings;
pub use crate::core::downloader::{Credentials, MirrorSet, RepositoryHost};
pub use crate::core::error::{SyncError, SyncResult};
pub use crate::core::maven::{Coordinate, MetadataDocument, PomDocument};
pub use crate::core::sync::{DependencyPrinter, SyncOptions, SyncReport, SyncState, Syncer};

/// Install the structured log subscriber.
///
/// Honors `RUST_LOG`, defaulting to `info,mavensync=debug`. Calling it again
/// once a subscriber is installed does nothing.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,mavensync=debug")),
        )
        .try_init();
}
