use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::coordinate::Coordinate;
use super::pom::{PomDocument, RawPom};
use crate::core::cache::Repository;
use crate::core::error::SyncResult;

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = SyncResult<Arc<PomDocument>>> + Send + 'a>>;

enum ParentLink {
    Resolved(Arc<PomDocument>),
    Unavailable,
    /// The parent is already being resolved further down this chain.
    Loop,
}

/// Resolves descriptors together with their parent chain.
///
/// Resolved documents are memoized by store path for the resolver's lifetime,
/// so a parent shared by many artifacts is read and parsed once. A document
/// whose parent was cut by the loop guard is not memoized: resolving it
/// directly later yields its full chain.
pub struct DescriptorResolver {
    repository: Arc<Repository>,
    resolved: Mutex<HashMap<String, Arc<PomDocument>>>,
}

impl DescriptorResolver {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self {
            repository,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Resolve the descriptor for `coordinate`, selecting a version through
    /// metadata first if it has none.
    pub async fn resolve(&self, coordinate: &Coordinate) -> SyncResult<Arc<PomDocument>> {
        let version = self.repository.resolve_version(coordinate).await?;
        self.resolve_chain(coordinate.with_version(&version), Vec::new())
            .await
    }

    /// `in_progress` holds the descriptor paths of the children currently
    /// waiting on this document, used to cut parent loops.
    fn resolve_chain<'a>(
        &'a self,
        coordinate: Coordinate,
        mut in_progress: Vec<String>,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            let path = coordinate.descriptor_path(&coordinate.version);

            let cached = self.resolved.lock().await.get(&path).cloned();
            if let Some(doc) = cached {
                return Ok(doc);
            }

            let text = self.repository.descriptor(&path).await?;
            let raw = RawPom::parse(&text)?;

            in_progress.push(path.clone());
            let (parent, truncated) = match &raw.parent {
                Some(parent_ref) => match self.resolve_parent(parent_ref, &in_progress).await {
                    ParentLink::Resolved(doc) => (Some(doc), false),
                    ParentLink::Unavailable => (None, false),
                    ParentLink::Loop => (None, true),
                },
                None => (None, false),
            };

            let doc = Arc::new(PomDocument::resolve(raw, &coordinate, parent));
            debug!("Resolved descriptor {} as {}", path, doc.coordinate());
            if !truncated {
                self.resolved.lock().await.insert(path, doc.clone());
            }
            Ok(doc)
        })
    }

    /// Nested metadata → descriptor resolution of a `<parent>` reference.
    ///
    /// Failures are not fatal for the child: it falls back to the declared
    /// reference and its own coordinate.
    async fn resolve_parent(
        &self,
        parent_ref: &Coordinate,
        in_progress: &[String],
    ) -> ParentLink {
        let version = match self.repository.resolve_version(parent_ref).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Cannot resolve version of parent {}: {}", parent_ref, e);
                return ParentLink::Unavailable;
            }
        };

        let coordinate = parent_ref.with_version(&version);
        let path = coordinate.descriptor_path(&version);
        if in_progress.contains(&path) {
            warn!("Parent loop at {}, treating it as resolved", path);
            return ParentLink::Loop;
        }

        match self.resolve_chain(coordinate, in_progress.to_vec()).await {
            Ok(doc) => ParentLink::Resolved(doc),
            Err(e) => {
                warn!("Parent {} unavailable: {}", parent_ref, e);
                ParentLink::Unavailable
            }
        }
    }
}
