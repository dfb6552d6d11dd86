//! Client for the Halyard instance, disk and image management API
//!
//! - [`api`] - Request dispatcher, client and errors
//! - [`resource`] - Operation table, request bodies and resource callers
//! - [`config`] - Persisted user configuration
//! - [`output`] - Terminal rendering of results

pub mod api;
pub mod config;
pub mod output;
pub mod resource;

/// Version injected at compile time via HALYARD_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("HALYARD_VERSION") {
    Some(v) => v,
    None => "dev",
};
