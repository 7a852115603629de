use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::{SyncError, SyncResult};

/// A parsed `groupId:artifactId[:version]` reference.
///
/// Supported formats:
///   `groupId:artifactId:version`
///   `groupId:artifactId:`  (version resolved through metadata)
///   `groupId:artifactId`   (same as above)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub group_id: String,
    pub artifact_id: String,
    /// Empty until resolved through `maven-metadata.xml`.
    pub version: String,
}

impl Coordinate {
    /// Parse a coordinate string.
    ///
    /// # Examples
    /// ```
    /// use mavensync::core::maven::Coordinate;
    ///
    /// let c = Coordinate::parse("com.google.code.gson:gson:2.8.9").unwrap();
    /// assert_eq!(c.group_id, "com.google.code.gson");
    /// ```
    pub fn parse(text: &str) -> SyncResult<Self> {
        let parts: Vec<&str> = text.trim().split(':').collect();

        let (group_id, artifact_id, version) = match parts.as_slice() {
            [group, artifact] => (*group, *artifact, ""),
            [group, artifact, version] => (*group, *artifact, *version),
            _ => return Err(SyncError::MalformedCoordinate(text.to_string())),
        };

        Self::new(group_id, artifact_id, version)
            .map_err(|_| SyncError::MalformedCoordinate(text.to_string()))
    }

    /// Build a coordinate from already separated fields.
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> SyncResult<Self> {
        let group_id = group_id.trim();
        let artifact_id = artifact_id.trim();
        if group_id.is_empty() || artifact_id.is_empty() {
            return Err(SyncError::MalformedCoordinate(format!(
                "{}:{}:{}",
                group_id, artifact_id, version
            )));
        }

        Ok(Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.trim().to_string(),
        })
    }

    pub fn has_version(&self) -> bool {
        !self.version.is_empty()
    }

    /// Return a copy pinned to `version`.
    pub fn with_version(&self, version: &str) -> Self {
        let mut clone = self.clone();
        clone.version = version.to_string();
        clone
    }

    /// Group path portion (`com/google/code/gson`).
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// `<group_path>/<artifact_id>`, the directory holding every version.
    pub fn root_path(&self) -> String {
        format!("{}/{}", self.group_path(), self.artifact_id)
    }

    /// `<root_path>/maven-metadata.xml`
    pub fn metadata_path(&self) -> String {
        format!("{}/maven-metadata.xml", self.root_path())
    }

    /// `<root_path>/<version>/<artifact_id>-<version>.pom`
    pub fn descriptor_path(&self, version: &str) -> String {
        format!(
            "{}/{}/{}-{}.pom",
            self.root_path(),
            version,
            self.artifact_id,
            version
        )
    }
}

/// Canonical key, also used for cycle detection: `g:a:v`, or `g:a:` while the
/// version is unresolved.
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}
