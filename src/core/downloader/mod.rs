mod mirror;

pub use mirror::{Credentials, Fetched, MirrorSet, RepositoryHost};
