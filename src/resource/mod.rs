//! Resource abstraction layer
//!
//! Instances, disks and images are all managed through the same handful of
//! REST calls. The calls are described as data in an embedded JSON table,
//! including the kind of body each one sends; the caller functions only
//! gather the inputs those bodies are built from.
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches operation definitions from embedded JSON
//! - [`body`] - Pure builders for create/restore request bodies
//! - [`callers`] - One async function per API operation
//!
//! # Example
//!
//! ```no_run
//! use halyard::api::client::HalyardClient;
//! use halyard::resource::callers;
//!
//! async fn restore(client: &HalyardClient) -> Result<(), halyard::api::error::ApiError> {
//!     let instance = callers::restore_disk(client, "halyard-user-00001").await?;
//!     println!("{instance}");
//!     Ok(())
//! }
//! ```

pub mod body;
pub mod callers;
mod registry;

pub use body::{
    build_body, image_body, instance_body, restore_body, strip_user_prefix, CallArgs,
    ImageOptions, RequestProfile, SignalingConfig, UserIdInput, DEFAULT_TAG, USER_DISK_PREFIX,
};
pub use registry::*;
