//! Halyard API interaction module
//!
//! This module provides the plumbing for talking to the Halyard management
//! server: a JSON request dispatcher, the client that owns it, and the error
//! type every call resolves to on failure.
//!
//! # Module Structure
//!
//! - [`client`] - Client combining the dispatcher with the request profile
//! - [`error`] - Failure outcomes and user-facing formatting
//! - [`http`] - Request descriptors, the dispatcher and its observer hooks
//!
//! # Example
//!
//! ```no_run
//! use halyard::api::client::HalyardClient;
//! use halyard::resource::{callers, RequestProfile};
//!
//! async fn example() -> Result<(), halyard::api::error::ApiError> {
//!     let client = HalyardClient::new("http://127.0.0.1:5000/", RequestProfile::default())?;
//!     let instance = callers::info_instance(&client, "halyard-00001").await?;
//!     println!("{instance}");
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod http;
