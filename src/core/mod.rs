// ─── mavensync core ───
// Mirrors Maven-style repositories into a local store.
//
// Architecture:
//   core/
//     maven/      : Coordinates, metadata, POM model, descriptor resolver
//     downloader/ : Ordered mirror fetch with fingerprint side files
//     cache/      : Local store layout + read-before-fetch repository
//     sync/       : Traversal engine, outcomes, dependency printer
//     checksum    : md5/sha1/sha256/sha512 fingerprints
//     config      : JSON settings
//     xml         : Owned element tree over quick-xml

pub mod cache;
pub mod checksum;
pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod maven;
pub mod sync;
pub mod xml;
