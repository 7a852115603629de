use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::core::cache::LocalStore;
use crate::core::checksum::Fingerprint;
use crate::core::error::{SyncError, SyncResult};

/// Basic-auth credentials for a private repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// One candidate repository. Position in the list is fetch priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryHost {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

impl RepositoryHost {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// `<uri>/<relative_path>` with exactly one separating slash.
    pub fn url(&self, relative_path: &str) -> String {
        format!(
            "{}/{}",
            self.uri.trim_end_matches('/'),
            relative_path.trim_start_matches('/')
        )
    }

    fn basic_auth(&self) -> Option<(&str, &str)> {
        self.credentials
            .as_ref()
            .filter(|c| !c.username.is_empty() && !c.password.is_empty())
            .map(|c| (c.username.as_str(), c.password.as_str()))
    }
}

/// A file served by one of the mirrors and already written to the store.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Index into the mirror list of the host that served the file.
    pub host: usize,
    pub bytes: Vec<u8>,
}

/// Ordered set of mirrors sharing one HTTP client.
///
/// Every request holds a permit from a shared semaphore, which bounds the
/// number of in-flight fetches across a concurrent traversal.
pub struct MirrorSet {
    client: Client,
    hosts: Vec<RepositoryHost>,
    permits: Arc<Semaphore>,
    verify_fingerprints: bool,
}

impl MirrorSet {
    pub fn new(client: Client, hosts: Vec<RepositoryHost>) -> Self {
        Self {
            client,
            hosts,
            permits: Arc::new(Semaphore::new(1)),
            verify_fingerprints: true,
        }
    }

    /// Maximum number of simultaneous requests.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(n.max(1)));
        self
    }

    pub fn with_fingerprint_verification(mut self, enabled: bool) -> Self {
        self.verify_fingerprints = enabled;
        self
    }

    pub fn hosts(&self) -> &[RepositoryHost] {
        &self.hosts
    }

    // ── Single host ─────────────────────────────────────

    /// Download `relative_path` from one host and persist it on HTTP 200.
    async fn fetch_from(
        &self,
        host: &RepositoryHost,
        store: &LocalStore,
        relative_path: &str,
    ) -> SyncResult<Vec<u8>> {
        // Validate the destination before touching the network.
        store.path(relative_path)?;

        let url = host.url(relative_path);
        let bytes = {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| SyncError::FetchExhausted {
                    path: relative_path.to_string(),
                })?;

            let mut request = self.client.get(&url);
            if let Some((username, password)) = host.basic_auth() {
                request = request.basic_auth(username, Some(password));
            }
            let response = request.send().await?;

            let status = response.status();
            if status != reqwest::StatusCode::OK {
                return Err(SyncError::DownloadFailed {
                    url,
                    status: status.as_u16(),
                });
            }
            response.bytes().await?.to_vec()
        };

        store.write(relative_path, &bytes).await?;
        debug!("Downloaded: {}", url);
        Ok(bytes)
    }

    // ── Mirror fallback ─────────────────────────────────

    /// Try each host in order until one serves `relative_path`.
    pub async fn fetch(&self, store: &LocalStore, relative_path: &str) -> SyncResult<Fetched> {
        for (index, host) in self.hosts.iter().enumerate() {
            match self.fetch_from(host, store, relative_path).await {
                Ok(bytes) => return Ok(Fetched { host: index, bytes }),
                Err(e @ SyncError::UnsafePath(_)) => return Err(e),
                Err(e) => debug!("Repository {} failed for {}: {}", host.uri, relative_path, e),
            }
        }

        Err(SyncError::FetchExhausted {
            path: relative_path.to_string(),
        })
    }

    /// [`Self::fetch`], then best-effort download of the fingerprint side files
    /// from the host that served the primary file.
    pub async fn fetch_with_fingerprints(
        &self,
        store: &LocalStore,
        relative_path: &str,
    ) -> SyncResult<Fetched> {
        let fetched = self.fetch(store, relative_path).await?;
        let host = &self.hosts[fetched.host];

        let mut side_files = Vec::new();
        for fingerprint in Fingerprint::ALL {
            let side_path = fingerprint.side_path(relative_path);
            match self.fetch_from(host, store, &side_path).await {
                Ok(bytes) => side_files.push((fingerprint, bytes)),
                Err(e) => debug!("Fingerprint {} unavailable: {}", side_path, e),
            }
        }

        if self.verify_fingerprints {
            verify(relative_path, &fetched.bytes, &side_files);
        }

        info!("Fetched {} from {}", relative_path, host.uri);
        Ok(fetched)
    }
}

/// Check the primary file against the most trusted side file that was served.
/// Returns false only on a mismatch; no side file at all counts as verified.
fn verify(relative_path: &str, bytes: &[u8], side_files: &[(Fingerprint, Vec<u8>)]) -> bool {
    let chosen = Fingerprint::VERIFY_ORDER.iter().find_map(|wanted| {
        side_files
            .iter()
            .find(|(fingerprint, _)| fingerprint == wanted)
    });

    let Some((fingerprint, expected)) = chosen else {
        return true;
    };
    let expected = String::from_utf8_lossy(expected);
    if fingerprint.matches(&expected, bytes) {
        return true;
    }
    warn!(
        "{} does not match its .{} fingerprint (expected {}, got {})",
        relative_path,
        fingerprint.extension(),
        expected.trim(),
        fingerprint.digest_hex(bytes)
    );
    false
}
