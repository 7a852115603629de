use std::path::{Path, PathBuf};

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use tracing::debug;

use crate::core::error::{SyncError, SyncResult};

/// Checksum side files published next to repository files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl Fingerprint {
    /// Every algorithm mirrored from remote repositories.
    pub const ALL: [Fingerprint; 4] = [
        Fingerprint::Md5,
        Fingerprint::Sha1,
        Fingerprint::Sha256,
        Fingerprint::Sha512,
    ];

    /// Order in which downloaded side files are trusted for verification.
    pub const VERIFY_ORDER: [Fingerprint; 4] = [
        Fingerprint::Sha1,
        Fingerprint::Sha256,
        Fingerprint::Md5,
        Fingerprint::Sha512,
    ];

    /// Side file suffix without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Fingerprint::Md5 => "md5",
            Fingerprint::Sha1 => "sha1",
            Fingerprint::Sha256 => "sha256",
            Fingerprint::Sha512 => "sha512",
        }
    }

    /// `<path>.<extension>`
    pub fn side_path(self, path: &str) -> String {
        format!("{}.{}", path, self.extension())
    }

    /// Lowercase hex digest of `bytes`.
    pub fn digest_hex(self, bytes: &[u8]) -> String {
        match self {
            Fingerprint::Md5 => hex::encode(Md5::digest(bytes)),
            Fingerprint::Sha1 => hex::encode(Sha1::digest(bytes)),
            Fingerprint::Sha256 => hex::encode(Sha256::digest(bytes)),
            Fingerprint::Sha512 => hex::encode(Sha512::digest(bytes)),
        }
    }

    /// Compare a side file's content with the digest of `bytes`.
    ///
    /// Side files sometimes carry a trailing file name (`<hash>  <name>`); only
    /// the first token is compared.
    pub fn matches(self, side_file: &str, bytes: &[u8]) -> bool {
        side_file
            .split_whitespace()
            .next()
            .map(|expected| expected.eq_ignore_ascii_case(&self.digest_hex(bytes)))
            .unwrap_or(false)
    }
}

/// Write `.md5`, `.sha1` and `.sha256` side files for a local file.
///
/// Returns the written paths.
pub async fn write_fingerprints(path: &Path) -> SyncResult<Vec<PathBuf>> {
    let bytes = tokio::fs::read(path).await.map_err(|e| SyncError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut written = Vec::new();
    for fingerprint in [Fingerprint::Md5, Fingerprint::Sha1, Fingerprint::Sha256] {
        let side = PathBuf::from(fingerprint.side_path(&path.to_string_lossy()));
        tokio::fs::write(&side, fingerprint.digest_hex(&bytes))
            .await
            .map_err(|e| SyncError::Io {
                path: side.clone(),
                source: e,
            })?;
        debug!("Wrote fingerprint {:?}", side);
        written.push(side);
    }

    Ok(written)
}
