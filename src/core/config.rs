use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::downloader::RepositoryHost;
use crate::core::error::{SyncError, SyncResult};
use crate::core::maven::{GOOGLE_MAVEN, MAVEN_CENTRAL};

const STORE_DIR_NAME: &str = "mavensync";

/// Everything a sync run needs from its caller.
///
/// Stored as JSON; missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Mirrors in priority order.
    pub repositories: Vec<RepositoryHost>,
    pub store_dir: PathBuf,
    /// Recurse into the effective dependency list of every synced descriptor.
    pub resolve_dependencies: bool,
    /// Best-effort download of `-sources.jar` next to each artifact.
    pub fetch_sources: bool,
    /// Compare downloaded files with their fingerprint side files.
    pub verify_fingerprints: bool,
    pub metadata_max_age_secs: u64,
    /// Width of dependency expansion and of the fetch pool. 1 is sequential.
    pub concurrency: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            repositories: vec![
                RepositoryHost::new(MAVEN_CENTRAL),
                RepositoryHost::new(GOOGLE_MAVEN),
            ],
            store_dir: default_store_dir(),
            resolve_dependencies: true,
            fetch_sources: true,
            verify_fingerprints: true,
            metadata_max_age_secs: 30 * 60,
            concurrency: 1,
        }
    }
}

impl SyncSettings {
    pub fn load(path: &Path) -> SyncResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| SyncError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let settings: SyncSettings = serde_json::from_str(&raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> SyncResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| SyncError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn validate(&self) -> SyncResult<()> {
        if self.repositories.is_empty() {
            return Err(SyncError::Config("no repositories configured".into()));
        }
        if let Some(host) = self.repositories.iter().find(|h| h.uri.trim().is_empty()) {
            return Err(SyncError::Config(format!("repository with empty uri: {:?}", host)));
        }
        if self.concurrency == 0 {
            return Err(SyncError::Config("concurrency must be at least 1".into()));
        }
        Ok(())
    }

    pub fn metadata_max_age(&self) -> Duration {
        Duration::from_secs(self.metadata_max_age_secs)
    }
}

fn default_store_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join(STORE_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".m"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let settings: SyncSettings = serde_json::from_str(
            r#"{
                "repositories": [
                    { "uri": "https://maven.google.com/" },
                    {
                        "uri": "https://maven.example.org/repository/maven-releases/",
                        "credentials": { "username": "develop", "password": "secret" }
                    }
                ],
                "store_dir": ".m",
                "fetch_sources": false
            }"#,
        )
        .unwrap();

        assert_eq!(settings.repositories.len(), 2);
        assert!(settings.repositories[0].credentials.is_none());
        assert_eq!(
            settings.repositories[1].credentials.as_ref().unwrap().username,
            "develop"
        );
        assert_eq!(settings.store_dir, PathBuf::from(".m"));
        assert!(!settings.fetch_sources);
        assert!(settings.resolve_dependencies);
        assert_eq!(settings.metadata_max_age(), Duration::from_secs(1800));
        assert_eq!(settings.concurrency, 1);
        settings.validate().unwrap();
    }

    #[test]
    fn validation_rejects_unusable_settings() {
        let mut settings = SyncSettings::default();
        settings.concurrency = 0;
        assert!(matches!(settings.validate(), Err(SyncError::Config(_))));

        settings.concurrency = 2;
        settings.repositories.clear();
        assert!(matches!(settings.validate(), Err(SyncError::Config(_))));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.json");
        let mut settings = SyncSettings::default();
        settings.store_dir = dir.path().join("store");
        settings.concurrency = 4;
        settings.save(&path).unwrap();

        let loaded = SyncSettings::load(&path).unwrap();
        assert_eq!(loaded.store_dir, settings.store_dir);
        assert_eq!(loaded.concurrency, 4);
        assert_eq!(loaded.repositories, settings.repositories);
    }
}
