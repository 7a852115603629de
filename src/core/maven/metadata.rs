use chrono::NaiveDateTime;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::core::error::{SyncError, SyncResult};
use crate::core::xml::root_element_name;

/// Parsed `maven-metadata.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataDocument {
    pub group_id: String,
    pub artifact_id: String,
    /// Bare `<version>` element, used as the last resort by [`Self::select_version`].
    pub version: String,
    pub latest_version: String,
    pub release_version: String,
    pub versions: Vec<String>,
    pub last_updated: String,
}

// Raw serde shape. Unknown elements (snapshot, plugins, ...) are ignored.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default)]
    artifact_id: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    versioning: Option<RawVersioning>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawVersioning {
    #[serde(default)]
    latest: Option<String>,
    #[serde(default)]
    release: Option<String>,
    #[serde(default)]
    versions: Option<RawVersions>,
    #[serde(default)]
    last_updated: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawVersions {
    #[serde(default, rename = "version")]
    items: Vec<String>,
}

impl MetadataDocument {
    /// Parse a metadata document. The root element must be `<metadata>`.
    pub fn parse(xml: &str) -> SyncResult<Self> {
        let root = root_element_name(xml).map_err(SyncError::MalformedMetadata)?;
        if root != "metadata" {
            return Err(SyncError::MalformedMetadata(format!(
                "unexpected root element <{}>",
                root
            )));
        }

        let raw: RawMetadata =
            from_str(xml).map_err(|e| SyncError::MalformedMetadata(e.to_string()))?;
        let versioning = raw.versioning.unwrap_or_default();

        Ok(Self {
            group_id: text(raw.group_id),
            artifact_id: text(raw.artifact_id),
            version: version_text(raw.version),
            latest_version: version_text(versioning.latest),
            release_version: version_text(versioning.release),
            versions: versioning
                .versions
                .map(|v| v.items)
                .unwrap_or_default()
                .into_iter()
                .map(|v| strip_brackets(v.trim()).to_string())
                .filter(|v| !v.is_empty())
                .collect(),
            last_updated: text(versioning.last_updated),
        })
    }

    /// Version to use when none was requested: release, then latest, then
    /// the bare `<version>` element.
    pub fn select_version(&self) -> SyncResult<&str> {
        [&self.release_version, &self.latest_version, &self.version]
            .into_iter()
            .find(|v| !v.is_empty())
            .map(String::as_str)
            .ok_or_else(|| {
                SyncError::UnresolvableVersion(format!("{}:{}", self.group_id, self.artifact_id))
            })
    }

    /// `lastUpdated` as a timestamp (`yyyyMMddHHmmss`), if well formed.
    pub fn last_updated_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.last_updated, "%Y%m%d%H%M%S").ok()
    }
}

fn text(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

fn version_text(value: Option<String>) -> String {
    strip_brackets(&text(value)).to_string()
}

/// `[1.0]` → `1.0`
pub(crate) fn strip_brackets(value: &str) -> &str {
    value.trim_matches(|c| c == '[' || c == ']')
}
