mod repository;
mod store;

pub use repository::{Materialized, Repository};
pub use store::LocalStore;
