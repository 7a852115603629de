use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use super::state::SyncState;
use crate::core::cache::{LocalStore, Repository};
use crate::core::error::SyncResult;
use crate::core::maven::{Coordinate, DescriptorResolver};

type LinesFuture<'a> = Pin<Box<dyn Future<Output = Vec<String>> + Send + 'a>>;

const REPEATED: &str = " (*)";
const NOT_CACHED: &str = " (n)";

/// Renders the dependency tree of a coordinate from the local store only.
///
/// Walks the graph exactly like [`super::Syncer`]: same visited-set keys, same
/// descriptor resolution and effective dependency list. Coordinates seen
/// before are printed with `(*)` and not expanded again; coordinates whose
/// descriptor is not stored locally end in `(n)`.
pub struct DependencyPrinter {
    resolver: DescriptorResolver,
}

impl DependencyPrinter {
    pub fn new(store: LocalStore) -> Self {
        Self {
            resolver: DescriptorResolver::new(Arc::new(Repository::offline(store))),
        }
    }

    pub async fn render(&self, coordinate: &str) -> SyncResult<String> {
        let root = Coordinate::parse(coordinate)?;
        let state = SyncState::new();
        let lines = self
            .node(root, &state, String::new(), String::new())
            .await;

        let mut out = lines.join("\n");
        out.push('\n');
        Ok(out)
    }

    /// `lead` precedes this node's label; `indent` precedes its children.
    fn node<'a>(
        &'a self,
        coordinate: Coordinate,
        state: &'a SyncState,
        lead: String,
        indent: String,
    ) -> LinesFuture<'a> {
        Box::pin(async move {
            let key = coordinate.to_string();
            if !state.try_visit(&key).await {
                return vec![format!("{}{}{}", lead, key, REPEATED)];
            }

            let pom = match self.resolver.resolve(&coordinate).await {
                Ok(pom) => pom,
                Err(e) => {
                    debug!("{} not in local store: {}", key, e);
                    return vec![format!("{}{}{}", lead, key, NOT_CACHED)];
                }
            };

            let label = if coordinate.has_version() {
                key
            } else {
                format!("{} -> {}", key, pom.version)
            };
            let mut lines = vec![format!("{}{}", lead, label)];

            let children = pom.dependency_coordinates();
            let count = children.len();

            for (i, child) in children.into_iter().enumerate() {
                let (branch, continuation) = if i + 1 == count {
                    ("\\--- ", "     ")
                } else {
                    ("+--- ", "|    ")
                };
                lines.extend(
                    self.node(
                        child,
                        state,
                        format!("{}{}", indent, branch),
                        format!("{}{}", indent, continuation),
                    )
                    .await,
                );
            }

            lines
        })
    }
}
