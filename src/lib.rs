//! Local-first data layer for an accounting and tax news curation desk.
//!
//! Records live in typed collections over a swappable blob store
//! ([`storage`]). Sync operations ([`services`]) call a remote backend
//! through the `gateway` crate when it is configured and fall back to
//! locally synthesized demo data when it is not.

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod services;
pub mod storage;
