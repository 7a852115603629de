use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::coordinate::Coordinate;
use super::metadata::strip_brackets;
use crate::core::error::{SyncError, SyncResult};
use crate::core::xml::XmlElement;

/// One `<dependency>` entry.
///
/// `scope` is carried for consumers; the sync engine never filters on it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub scope: String,
}

impl Dependency {
    /// Coordinate to sync for this dependency. An empty version is resolved
    /// through metadata later.
    pub fn coordinate(&self) -> SyncResult<Coordinate> {
        Coordinate::new(&self.group_id, &self.artifact_id, &self.version)
    }
}

/// Declared descriptor content, before parent fallback and `${...}`
/// substitution.
#[derive(Debug, Clone, Default)]
pub struct RawPom {
    pub model_version: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
    pub parent: Option<Coordinate>,
    /// `<properties>` in document order.
    pub properties: Vec<(String, String)>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Vec<Dependency>,
}

impl RawPom {
    /// Parse a descriptor. The root element must be `project`, optionally
    /// namespace-prefixed; that prefix is then expected on every child tag.
    pub fn parse(xml: &str) -> SyncResult<Self> {
        let root = XmlElement::parse(xml).map_err(SyncError::MalformedPom)?;
        if root.local_name() != "project" {
            return Err(SyncError::MalformedPom(format!(
                "unexpected root element <{}>",
                root.name
            )));
        }

        let ns = root.prefix().map(|p| format!("{}:", p)).unwrap_or_default();
        let tag = |name: &str| format!("{}{}", ns, name);

        let parent = root.child(&tag("parent")).and_then(|p| {
            let group = strip_brackets(p.child_text(&tag("groupId")));
            let artifact = strip_brackets(p.child_text(&tag("artifactId")));
            let version = strip_brackets(p.child_text(&tag("version")));
            Coordinate::new(group, artifact, version).ok()
        });

        let properties = root
            .child(&tag("properties"))
            .map(|props| {
                props
                    .children
                    .iter()
                    .filter(|p| p.name.starts_with(&ns))
                    .map(|p| (p.name[ns.len()..].to_string(), p.text.trim().to_string()))
                    .collect()
            })
            .unwrap_or_default();

        let dependencies = root
            .child(&tag("dependencies"))
            .map(|deps| parse_dependencies(deps, &ns))
            .unwrap_or_default();

        let dependency_management = root
            .child(&tag("dependencyManagement"))
            .and_then(|dm| dm.child(&tag("dependencies")))
            .map(|deps| parse_dependencies(deps, &ns))
            .unwrap_or_default();

        Ok(Self {
            model_version: root.child_text(&tag("modelVersion")).to_string(),
            group_id: root.child_text(&tag("groupId")).to_string(),
            artifact_id: root.child_text(&tag("artifactId")).to_string(),
            version: root.child_text(&tag("version")).to_string(),
            packaging: root.child_text(&tag("packaging")).to_string(),
            parent,
            properties,
            dependencies,
            dependency_management,
        })
    }
}

fn parse_dependencies(deps: &XmlElement, ns: &str) -> Vec<Dependency> {
    let tag = |name: &str| format!("{}{}", ns, name);
    deps.children_named(&tag("dependency"))
        .map(|d| Dependency {
            group_id: d.child_text(&tag("groupId")).to_string(),
            artifact_id: d.child_text(&tag("artifactId")).to_string(),
            version: d.child_text(&tag("version")).to_string(),
            scope: d.child_text(&tag("scope")).to_string(),
        })
        .collect()
}

/// A descriptor with its effective coordinate, properties and dependencies.
///
/// The parent chain is an immutable tree: each document holds a shared,
/// read-only reference to its resolved parent.
#[derive(Debug, Clone, Default)]
pub struct PomDocument {
    pub model_version: String,
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub packaging: String,
    pub properties: HashMap<String, String>,
    pub dependencies: Vec<Dependency>,
    pub dependency_management: Vec<Dependency>,
    pub parent_ref: Option<Coordinate>,
    pub parent: Option<Arc<PomDocument>>,
}

impl PomDocument {
    /// Parse and resolve a descriptor that has no resolved parent available.
    pub fn parse(xml: &str, owner: &Coordinate) -> SyncResult<Self> {
        Ok(Self::resolve(RawPom::parse(xml)?, owner, None))
    }

    /// Apply parent fallback and property substitution to a parsed descriptor.
    ///
    /// `owner` is the coordinate whose fetch produced this descriptor; it is the
    /// last fallback for group, artifact and version.
    pub fn resolve(raw: RawPom, owner: &Coordinate, parent: Option<Arc<PomDocument>>) -> Self {
        let parent_doc = parent.as_deref();
        let parent_ref = raw.parent.as_ref();

        let fallback_group = inherited(
            parent_doc.map(|p| p.group_id.as_str()),
            parent_ref.map(|p| p.group_id.as_str()),
            &owner.group_id,
        );
        let fallback_artifact = inherited(
            parent_doc.map(|p| p.artifact_id.as_str()),
            parent_ref.map(|p| p.artifact_id.as_str()),
            &owner.artifact_id,
        );
        let fallback_version = inherited(
            parent_doc.map(|p| p.version.as_str()),
            parent_ref.map(|p| p.version.as_str()),
            &owner.version,
        );

        // Synthetic keys are seeded before any declared property so that a
        // declared `project.*` entry wins.
        let mut properties = HashMap::new();
        let literal_or = |declared: &str, fallback: &str| {
            if declared.is_empty() || declared.contains("${") {
                fallback.to_string()
            } else {
                declared.to_string()
            }
        };
        properties.insert(
            "project.groupId".to_string(),
            literal_or(&raw.group_id, &fallback_group),
        );
        properties.insert(
            "project.artifactId".to_string(),
            literal_or(&raw.artifact_id, &fallback_artifact),
        );
        properties.insert(
            "project.version".to_string(),
            literal_or(strip_brackets(&raw.version), &fallback_version),
        );
        if let Some(p) = parent_ref {
            properties.insert("project.parent.groupId".to_string(), p.group_id.clone());
            properties.insert("project.parent.artifactId".to_string(), p.artifact_id.clone());
            properties.insert("project.parent.version".to_string(), p.version.clone());
        }
        properties.extend(raw.properties.iter().cloned());

        let interpolator = Interpolator {
            own: &properties,
            parent: parent_doc,
        };
        let field = |declared: &str, fallback: &str| {
            let value = interpolator.apply(declared);
            if value.is_empty() {
                fallback.to_string()
            } else {
                value
            }
        };

        let group_id = field(&raw.group_id, &fallback_group);
        let artifact_id = field(&raw.artifact_id, &fallback_artifact);
        let version = strip_brackets(&field(&raw.version, &fallback_version)).to_string();
        let packaging = field(&raw.packaging, "jar");
        let model_version = interpolator.apply(&raw.model_version);
        let dependencies = interpolator.dependencies(&raw.dependencies);
        let dependency_management = interpolator.dependencies(&raw.dependency_management);

        properties.insert("project.groupId".to_string(), group_id.clone());
        properties.insert("project.artifactId".to_string(), artifact_id.clone());
        properties.insert("project.version".to_string(), version.clone());

        Self {
            model_version,
            group_id,
            artifact_id,
            version,
            packaging,
            properties,
            dependencies,
            dependency_management,
            parent_ref: raw.parent,
            parent,
        }
    }

    pub fn coordinate(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// Look a property up in this document, then up the parent chain.
    pub fn property(&self, key: &str) -> Option<&str> {
        match self.properties.get(key) {
            Some(value) => Some(value.as_str()),
            None => self.parent.as_deref().and_then(|p| p.property(key)),
        }
    }

    /// Own `<dependencies>` followed by own `<dependencyManagement>` entries.
    pub fn declared_dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .chain(self.dependency_management.iter())
    }

    /// Parent's effective dependencies first, then this document's own.
    ///
    /// No de-duplication happens here: the same coordinate may appear more
    /// than once, possibly with different versions.
    pub fn effective_dependencies(&self) -> Vec<Dependency> {
        let mut effective = self
            .parent
            .as_deref()
            .map(PomDocument::effective_dependencies)
            .unwrap_or_default();
        effective.extend(self.declared_dependencies().cloned());
        effective
    }

    /// Effective dependencies as traversal coordinates, in order. Entries that
    /// do not form a valid coordinate are dropped.
    pub fn dependency_coordinates(&self) -> Vec<Coordinate> {
        self.effective_dependencies()
            .iter()
            .filter_map(|d| d.coordinate().ok())
            .collect()
    }

    /// `<group_path>/<artifact_id>/<version>`
    pub fn root_dir(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version
        )
    }

    /// File extension of the main artifact for this packaging.
    pub fn artifact_extension(&self) -> &str {
        match self.packaging.as_str() {
            "aar" | "pom" | "war" | "ear" | "rar" | "zip" | "apk" | "klib" => self.packaging.as_str(),
            _ => "jar",
        }
    }

    pub fn is_pom(&self) -> bool {
        self.packaging == "pom"
    }

    /// Store-relative path of the main artifact.
    pub fn artifact_path(&self) -> String {
        format!(
            "{}/{}-{}.{}",
            self.root_dir(),
            self.artifact_id,
            self.version,
            self.artifact_extension()
        )
    }

    /// Store-relative path of the `-sources.jar` companion.
    pub fn source_artifact_path(&self) -> String {
        format!(
            "{}/{}-{}-sources.jar",
            self.root_dir(),
            self.artifact_id,
            self.version
        )
    }
}

/// First non-empty of parent document, declared parent reference, owner.
fn inherited(from_parent: Option<&str>, from_ref: Option<&str>, from_owner: &str) -> String {
    [from_parent, from_ref]
        .into_iter()
        .flatten()
        .find(|v| !v.is_empty())
        .unwrap_or(from_owner)
        .to_string()
}

/// `${name}` substitution against one document's table plus its parent chain.
struct Interpolator<'a> {
    own: &'a HashMap<String, String>,
    parent: Option<&'a PomDocument>,
}

impl Interpolator<'_> {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.own
            .get(key)
            .map(String::as_str)
            .or_else(|| self.parent.and_then(|p| p.property(key)))
    }

    /// Replace every `${name}` in `text`. Unknown names are left as written.
    fn apply(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("${") {
            let Some(len) = rest[start + 2..].find('}') else {
                break;
            };
            let key = &rest[start + 2..start + 2 + len];
            out.push_str(&rest[..start]);
            match self.lookup(key) {
                Some(value) => out.push_str(value),
                None => out.push_str(&rest[start..start + 3 + len]),
            }
            rest = &rest[start + 3 + len..];
        }

        out.push_str(rest);
        out
    }

    fn dependencies(&self, declared: &[Dependency]) -> Vec<Dependency> {
        declared
            .iter()
            .map(|d| Dependency {
                group_id: self.apply(&d.group_id),
                artifact_id: self.apply(&d.artifact_id),
                version: strip_brackets(&self.apply(&d.version)).to_string(),
                scope: self.apply(&d.scope),
            })
            .filter(|d| !d.group_id.is_empty() && !d.artifact_id.is_empty())
            .collect()
    }
}
