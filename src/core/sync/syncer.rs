use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::outcome::{FailureReason, SkipReason, SyncOutcome, SyncReport, SyncStatus};
use super::state::{CancelToken, SyncState};
use crate::core::cache::{LocalStore, Materialized, Repository};
use crate::core::config::SyncSettings;
use crate::core::downloader::MirrorSet;
use crate::core::error::{SyncError, SyncResult};
use crate::core::http::build_http_client;
use crate::core::maven::{Coordinate, DescriptorResolver, PomDocument};

type VisitFuture<'a> = Pin<Box<dyn Future<Output = Vec<SyncOutcome>> + Send + 'a>>;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub resolve_dependencies: bool,
    pub fetch_sources: bool,
    /// Number of sibling dependencies expanded at once. 1 is sequential.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            resolve_dependencies: true,
            fetch_sources: true,
            concurrency: 1,
        }
    }
}

/// Mirrors a coordinate and its transitive dependencies into the local store.
///
/// Per coordinate: dedup → metadata → version → descriptor (with parents) →
/// artifact → dependency expansion. A failure ends that coordinate only; the
/// rest of the traversal continues.
pub struct Syncer {
    resolver: DescriptorResolver,
    options: SyncOptions,
    cancel: CancelToken,
}

impl Syncer {
    pub fn new(repository: Arc<Repository>, options: SyncOptions) -> Self {
        Self {
            resolver: DescriptorResolver::new(repository),
            options,
            cancel: CancelToken::default(),
        }
    }

    pub fn from_settings(settings: &SyncSettings) -> SyncResult<Self> {
        settings.validate()?;
        let mirrors = MirrorSet::new(build_http_client()?, settings.repositories.clone())
            .with_concurrency(settings.concurrency)
            .with_fingerprint_verification(settings.verify_fingerprints);
        let repository = Repository::new(
            LocalStore::new(&settings.store_dir),
            mirrors,
            settings.metadata_max_age(),
        );

        Ok(Self::new(
            Arc::new(repository),
            SyncOptions {
                resolve_dependencies: settings.resolve_dependencies,
                fetch_sources: settings.fetch_sources,
                concurrency: settings.concurrency,
            },
        ))
    }

    /// Handle that stops the traversal at the next coordinate boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn repository(&self) -> &Repository {
        self.resolver.repository()
    }

    /// Sync one coordinate with a fresh visited set.
    ///
    /// Only a malformed `coordinate` is an error; everything else is reported
    /// per coordinate in the returned [`SyncReport`].
    pub async fn sync(&self, coordinate: &str) -> SyncResult<SyncReport> {
        self.sync_all(&[coordinate]).await
    }

    /// Sync several coordinates sharing one visited set.
    pub async fn sync_all(&self, coordinates: &[&str]) -> SyncResult<SyncReport> {
        self.sync_with_state(coordinates, &SyncState::new()).await
    }

    /// Sync with a caller-owned visited set, e.g. to continue an earlier run.
    pub async fn sync_with_state(
        &self,
        coordinates: &[&str],
        state: &SyncState,
    ) -> SyncResult<SyncReport> {
        let parsed = coordinates
            .iter()
            .map(|c| Coordinate::parse(c))
            .collect::<SyncResult<Vec<_>>>()?;

        let mut outcomes = Vec::new();
        for coordinate in parsed {
            outcomes.extend(self.visit(coordinate, state).await);
        }

        let report = SyncReport {
            outcomes,
            visited: state.len().await,
        };
        info!(
            "Sync finished: {} synced, {} skipped, {} failed",
            report.synced().count(),
            report.skipped().count(),
            report.failed().count()
        );
        Ok(report)
    }

    fn visit<'a>(&'a self, coordinate: Coordinate, state: &'a SyncState) -> VisitFuture<'a> {
        Box::pin(async move {
            let key = coordinate.to_string();

            if self.cancel.is_cancelled() {
                return vec![SyncOutcome {
                    coordinate: key,
                    status: SyncStatus::Skipped(SkipReason::Cancelled),
                }];
            }
            if !state.try_visit(&key).await {
                debug!("Already visited {}", key);
                return vec![SyncOutcome {
                    coordinate: key,
                    status: SyncStatus::Skipped(SkipReason::AlreadyVisited),
                }];
            }

            info!("sync: {}", key);
            let (status, pom) = self.sync_coordinate(&coordinate).await;
            if let SyncStatus::Failed { reason, detail } = &status {
                warn!("{} failed [{}]: {}", key, reason, detail);
            }
            let mut outcomes = vec![SyncOutcome {
                coordinate: key,
                status,
            }];

            if let (true, Some(pom)) = (self.options.resolve_dependencies, pom) {
                let nested: Vec<Vec<SyncOutcome>> = stream::iter(pom.dependency_coordinates())
                    .map(|child| self.visit(child, state))
                    .buffered(self.options.concurrency.max(1))
                    .collect()
                    .await;
                outcomes.extend(nested.into_iter().flatten());
            }

            outcomes
        })
    }

    /// Metadata, version, descriptor and artifact phases for a single
    /// coordinate. The descriptor is returned whenever
    /// it was resolved, so dependencies can be expanded even if the artifact
    /// itself is unavailable.
    async fn sync_coordinate(
        &self,
        coordinate: &Coordinate,
    ) -> (SyncStatus, Option<Arc<PomDocument>>) {
        let failed = |reason: FailureReason, e: SyncError| SyncStatus::Failed {
            reason,
            detail: e.to_string(),
        };

        let version = match self.repository().resolve_version(coordinate).await {
            Ok(v) => v,
            Err(e @ SyncError::UnresolvableVersion(_)) => {
                return (failed(FailureReason::NoVersion, e), None)
            }
            Err(e) => return (failed(FailureReason::NoMetadata, e), None),
        };

        let pom = match self.resolver.resolve(&coordinate.with_version(&version)).await {
            Ok(pom) => pom,
            Err(e) => return (failed(FailureReason::NoDescriptor, e), None),
        };

        let status = match self.repository().artifact(&pom.artifact_path()).await {
            Ok(materialized) => {
                if let Materialized::Fetched(_) = &materialized {
                    self.fetch_sources(&pom).await;
                }
                SyncStatus::Synced {
                    version,
                    artifact: materialized.path().clone(),
                }
            }
            Err(e) => failed(FailureReason::NoArtifact, e),
        };

        (status, Some(pom))
    }

    async fn fetch_sources(&self, pom: &PomDocument) {
        if !self.options.fetch_sources || pom.is_pom() {
            return;
        }
        let path = pom.source_artifact_path();
        if let Err(e) = self.repository().artifact(&path).await {
            debug!("No sources for {}: {}", pom.coordinate(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::downloader::RepositoryHost;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pom_xml(coordinate: &str, packaging: &str, deps: &[&str]) -> String {
        let c = Coordinate::parse(coordinate).unwrap();
        let deps: String = deps
            .iter()
            .map(|d| {
                let d = Coordinate::parse(d).unwrap();
                format!(
                    "<dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version></dependency>",
                    d.group_id, d.artifact_id, d.version
                )
            })
            .collect();
        format!(
            "<project><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version>\
             <packaging>{}</packaging><dependencies>{}</dependencies></project>",
            c.group_id, c.artifact_id, c.version, packaging, deps
        )
    }

    /// Serve the descriptor and jar of `coordinate`, each expected exactly once.
    async fn publish(server: &MockServer, coordinate: &str, deps: &[&str]) {
        let c = Coordinate::parse(coordinate).unwrap();
        let pom_path = format!("/{}", c.descriptor_path(&c.version));
        let jar_path = pom_path.replace(".pom", ".jar");
        Mock::given(method("GET"))
            .and(path(pom_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(pom_xml(coordinate, "jar", deps)))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(jar_path))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(coordinate.as_bytes().to_vec()))
            .expect(1)
            .mount(server)
            .await;
    }

    fn syncer(server: &MockServer, dir: &tempfile::TempDir, options: SyncOptions) -> Syncer {
        let mirrors = MirrorSet::new(reqwest::Client::new(), vec![RepositoryHost::new(server.uri())])
            .with_concurrency(options.concurrency);
        let repository = Repository::new(
            LocalStore::new(dir.path()),
            mirrors,
            Duration::from_secs(600),
        );
        Syncer::new(Arc::new(repository), options)
    }

    fn status_of<'a>(report: &'a SyncReport, coordinate: &str) -> &'a SyncStatus {
        &report.outcome(coordinate).unwrap().status
    }

    #[tokio::test]
    async fn dependency_cycle_visits_each_coordinate_once() {
        let server = MockServer::start().await;
        publish(&server, "com.x:a:1.0", &["com.x:b:1.0"]).await;
        publish(&server, "com.x:b:1.0", &["com.x:a:1.0"]).await;

        let dir = tempfile::tempdir().unwrap();
        let report = syncer(&server, &dir, SyncOptions::default())
            .sync("com.x:a:1.0")
            .await
            .unwrap();

        assert_eq!(report.visited, 2);
        assert_eq!(report.synced().count(), 2);
        let skipped: Vec<_> = report.skipped().map(|o| o.coordinate.as_str()).collect();
        assert_eq!(skipped, vec!["com.x:a:1.0"]);
    }

    #[tokio::test]
    async fn stores_artifact_fingerprints_and_sources() {
        let server = MockServer::start().await;
        publish(&server, "com.x:a:1.0", &[]).await;
        Mock::given(method("GET"))
            .and(path("/com/x/a/1.0/a-1.0.jar.sha1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("0000"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/com/x/a/1.0/a-1.0-sources.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_string("src"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let report = syncer(&server, &dir, SyncOptions::default())
            .sync("com.x:a:1.0")
            .await
            .unwrap();

        let root = dir.path().join("com/x/a/1.0");
        assert_eq!(
            status_of(&report, "com.x:a:1.0"),
            &SyncStatus::Synced {
                version: "1.0".into(),
                artifact: root.join("a-1.0.jar"),
            }
        );
        assert!(root.join("a-1.0.pom").is_file());
        assert!(root.join("a-1.0.jar.sha1").is_file());
        assert!(root.join("a-1.0-sources.jar").is_file());
    }

    #[tokio::test]
    async fn failures_are_isolated_per_coordinate() {
        let server = MockServer::start().await;
        publish(&server, "com.x:root:1.0", &["com.x:gone:1.0", "com.x:ok:1.0"]).await;
        publish(&server, "com.x:ok:1.0", &[]).await;

        let dir = tempfile::tempdir().unwrap();
        let report = syncer(&server, &dir, SyncOptions::default())
            .sync("com.x:root:1.0")
            .await
            .unwrap();

        assert!(matches!(
            status_of(&report, "com.x:gone:1.0"),
            SyncStatus::Failed { reason: FailureReason::NoDescriptor, .. }
        ));
        assert!(report.outcome("com.x:ok:1.0").unwrap().is_synced());
        assert!(report.outcome("com.x:root:1.0").unwrap().is_synced());
        let order: Vec<_> = report.outcomes.iter().map(|o| o.coordinate.as_str()).collect();
        assert_eq!(order, vec!["com.x:root:1.0", "com.x:gone:1.0", "com.x:ok:1.0"]);
    }

    #[tokio::test]
    async fn missing_artifact_still_expands_dependencies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/com/x/a/1.0/a-1.0.pom"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(pom_xml("com.x:a:1.0", "aar", &["com.x:b:1.0"])),
            )
            .mount(&server)
            .await;
        publish(&server, "com.x:b:1.0", &[]).await;

        let dir = tempfile::tempdir().unwrap();
        let report = syncer(&server, &dir, SyncOptions::default())
            .sync("com.x:a:1.0")
            .await
            .unwrap();

        assert!(matches!(
            status_of(&report, "com.x:a:1.0"),
            SyncStatus::Failed { reason: FailureReason::NoArtifact, .. }
        ));
        assert!(report.outcome("com.x:b:1.0").unwrap().is_synced());
    }

    #[tokio::test]
    async fn unversioned_dependency_resolves_through_metadata() {
        let server = MockServer::start().await;
        publish(&server, "com.x:a:1.0", &["com.x:b:"]).await;
        publish(&server, "com.x:b:1.1", &[]).await;
        Mock::given(method("GET"))
            .and(path("/com/x/b/maven-metadata.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<metadata><versioning><latest>1.2</latest><release>1.1</release></versioning></metadata>",
            ))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/com/x/c/maven-metadata.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<metadata/>"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let report = syncer(&server, &dir, SyncOptions::default())
            .sync_all(&["com.x:a:1.0", "com.x:c"])
            .await
            .unwrap();

        assert!(matches!(
            status_of(&report, "com.x:b:"),
            SyncStatus::Synced { version, .. } if version == "1.1"
        ));
        assert!(matches!(
            status_of(&report, "com.x:c:"),
            SyncStatus::Failed { reason: FailureReason::NoVersion, .. }
        ));
    }

    #[tokio::test]
    async fn unreachable_metadata_is_reported() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let report = syncer(&server, &dir, SyncOptions::default())
            .sync("com.x:nothing")
            .await
            .unwrap();
        assert!(matches!(
            status_of(&report, "com.x:nothing:"),
            SyncStatus::Failed { reason: FailureReason::NoMetadata, .. }
        ));
    }

    #[tokio::test]
    async fn malformed_top_level_coordinate_is_an_error() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let result = syncer(&server, &dir, SyncOptions::default())
            .sync_all(&["com.x:a:1.0", "not-a-coordinate"])
            .await;
        assert!(matches!(result, Err(SyncError::MalformedCoordinate(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dependencies_are_left_alone_when_disabled() {
        let server = MockServer::start().await;
        publish(&server, "com.x:a:1.0", &["com.x:b:1.0"]).await;

        let dir = tempfile::tempdir().unwrap();
        let options = SyncOptions {
            resolve_dependencies: false,
            fetch_sources: false,
            concurrency: 1,
        };
        let report = syncer(&server, &dir, options).sync("com.x:a:1.0").await.unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.visited, 1);
    }

    #[tokio::test]
    async fn concurrent_diamond_fetches_shared_dependency_once() {
        let server = MockServer::start().await;
        publish(&server, "com.x:root:1.0", &["com.x:b:1.0", "com.x:c:1.0"]).await;
        publish(&server, "com.x:b:1.0", &["com.x:d:1.0"]).await;
        publish(&server, "com.x:c:1.0", &["com.x:d:1.0"]).await;
        publish(&server, "com.x:d:1.0", &[]).await;

        let dir = tempfile::tempdir().unwrap();
        let options = SyncOptions {
            concurrency: 4,
            ..SyncOptions::default()
        };
        let report = syncer(&server, &dir, options).sync("com.x:root:1.0").await.unwrap();

        assert_eq!(report.visited, 4);
        assert_eq!(report.synced().count(), 4);
        assert_eq!(report.skipped().count(), 1);
    }

    #[tokio::test]
    async fn concurrent_siblings_share_one_parent_download() {
        let server = MockServer::start().await;
        publish(&server, "com.x:root:1.0", &["com.x:b:1.0", "com.x:c:1.0"]).await;
        Mock::given(method("GET"))
            .and(path("/com/x/p/1.0/p-1.0.pom"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(pom_xml("com.x:p:1.0", "pom", &[]))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&server)
            .await;
        for name in ["b", "c"] {
            let pom = format!(
                "<project><parent><groupId>com.x</groupId><artifactId>p</artifactId>\
                 <version>1.0</version></parent><artifactId>{}</artifactId></project>",
                name
            );
            Mock::given(method("GET"))
                .and(path(format!("/com/x/{0}/1.0/{0}-1.0.pom", name)))
                .respond_with(ResponseTemplate::new(200).set_body_string(pom))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path(format!("/com/x/{0}/1.0/{0}-1.0.jar", name)))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jar".to_vec()))
                .expect(1)
                .mount(&server)
                .await;
        }

        let dir = tempfile::tempdir().unwrap();
        let options = SyncOptions {
            concurrency: 4,
            ..SyncOptions::default()
        };
        let report = syncer(&server, &dir, options).sync("com.x:root:1.0").await.unwrap();

        assert_eq!(report.synced().count(), 3);
        let parent = std::fs::read_to_string(dir.path().join("com/x/p/1.0/p-1.0.pom")).unwrap();
        assert!(parent.contains("<packaging>pom</packaging>"));
    }

    #[tokio::test]
    async fn cancelled_traversal_skips_remaining_coordinates() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let syncer = syncer(&server, &dir, SyncOptions::default());
        syncer.cancel_token().cancel();

        let report = syncer.sync("com.x:a:1.0").await.unwrap();
        assert_eq!(
            report.outcomes[0].status,
            SyncStatus::Skipped(SkipReason::Cancelled)
        );
        assert_eq!(report.visited, 0);
    }
}
