use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::{SyncError, SyncResult};

/// On-disk store laid out exactly like the remote repositories.
///
/// Files are only ever added: once a relative path exists it is not
/// rewritten by the sync engine (metadata refreshes excepted).
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a store-relative path.
    ///
    /// Rejects absolute paths and `..` components so remote descriptors cannot
    /// direct writes outside the store.
    pub fn path(&self, relative_path: &str) -> SyncResult<PathBuf> {
        let relative = Path::new(relative_path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || relative.as_os_str().is_empty() {
            return Err(SyncError::UnsafePath(relative_path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    pub fn contains(&self, relative_path: &str) -> bool {
        self.path(relative_path)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// True if the file exists and was modified less than `max_age` ago.
    pub fn is_fresh(&self, relative_path: &str, max_age: Duration) -> bool {
        let Ok(path) = self.path(relative_path) else {
            return false;
        };
        let modified = match std::fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age < max_age,
            // Modified in the future (clock skew): treat as just written.
            Err(_) => true,
        }
    }

    pub async fn read(&self, relative_path: &str) -> SyncResult<Vec<u8>> {
        let path = self.path(relative_path)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| SyncError::Io { path, source: e })
    }

    pub async fn read_to_string(&self, relative_path: &str) -> SyncResult<String> {
        let bytes = self.read(relative_path).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Persist `bytes` under `relative_path`, creating parent directories.
    pub async fn write(&self, relative_path: &str, bytes: &[u8]) -> SyncResult<PathBuf> {
        let dest = self.path(relative_path)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SyncError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        // Scope the handle so it is closed before the path is handed out.
        {
            let mut file = tokio::fs::File::create(&dest)
                .await
                .map_err(|e| SyncError::Io {
                    path: dest.clone(),
                    source: e,
                })?;
            file.write_all(bytes).await.map_err(|e| SyncError::Io {
                path: dest.clone(),
                source: e,
            })?;
            file.flush().await.map_err(|e| SyncError::Io {
                path: dest.clone(),
                source: e,
            })?;
        }

        debug!("Stored {} ({} bytes)", relative_path, bytes.len());
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;

    fn age(path: &Path, seconds: u64) {
        let then = SystemTime::now() - Duration::from_secs(seconds);
        filetime::set_file_mtime(path, FileTime::from_system_time(then)).unwrap();
    }

    #[tokio::test]
    async fn write_creates_parents_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        let path = store.write("com/x/a/1.0/a-1.0.pom", b"<project/>").await.unwrap();
        assert_eq!(path, dir.path().join("com/x/a/1.0/a-1.0.pom"));
        assert!(store.contains("com/x/a/1.0/a-1.0.pom"));
        assert_eq!(
            store.read_to_string("com/x/a/1.0/a-1.0.pom").await.unwrap(),
            "<project/>"
        );
        assert!(!store.contains("com/x/a/1.0/a-1.0.jar"));
    }

    #[tokio::test]
    async fn freshness_window() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let rel = "com/x/a/maven-metadata.xml";
        let path = store.write(rel, b"<metadata/>").await.unwrap();
        let window = Duration::from_secs(10 * 60);

        age(&path, 5 * 60);
        assert!(store.is_fresh(rel, window));

        age(&path, 15 * 60);
        assert!(!store.is_fresh(rel, window));

        assert!(!store.is_fresh("com/x/missing/maven-metadata.xml", window));
    }

    #[test]
    fn rejects_paths_leaving_the_store() {
        let store = LocalStore::new("/tmp/store");
        for bad in ["../etc/passwd", "com/../../x", ""] {
            assert!(matches!(store.path(bad), Err(SyncError::UnsafePath(_))), "{bad}");
        }
        assert_eq!(
            store.path("/com/x/a.pom").unwrap(),
            PathBuf::from("/tmp/store/com/x/a.pom")
        );
    }
}
