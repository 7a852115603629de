mod coordinate;
mod metadata;
mod pom;
mod resolver;

pub use coordinate::Coordinate;
pub use metadata::MetadataDocument;
pub use pom::{Dependency, PomDocument, RawPom};
pub use resolver::DescriptorResolver;

/// Well-known public Maven repositories.
pub const MAVEN_CENTRAL: &str = "https://repo1.maven.org/maven2";
pub const GOOGLE_MAVEN: &str = "https://dl.google.com/dl/android/maven2";
