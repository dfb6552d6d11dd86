//! Halyard Client
//!
//! Main client for the Halyard API, combining the request dispatcher with the
//! request profile fixed at deploy time.

use super::error::ApiError;
use super::http::{DispatchObserver, Dispatcher, RequestDescriptor};
use crate::resource::RequestProfile;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use url::Url;

/// Main Halyard client
#[derive(Clone, Debug)]
pub struct HalyardClient {
    pub dispatcher: Dispatcher,
    pub profile: RequestProfile,
}

impl HalyardClient {
    /// Create a new client rooted at `base_url`
    pub fn new(base_url: &str, profile: RequestProfile) -> Result<Self, ApiError> {
        let dispatcher = Dispatcher::new(base_url)?;
        Ok(Self {
            dispatcher,
            profile,
        })
    }

    /// Replace the observer notified around each request
    pub fn with_observer(mut self, observer: Arc<dyn DispatchObserver>) -> Self {
        self.dispatcher = self.dispatcher.with_observer(observer);
        self
    }

    pub fn base_url(&self) -> &Url {
        self.dispatcher.base_url()
    }

    /// Whether instance bodies carry signaling server details
    pub fn signaling_enabled(&self) -> bool {
        self.profile.signaling.is_some()
    }

    /// Issue a request through the dispatcher
    pub async fn dispatch(&self, request: RequestDescriptor) -> Result<Value, ApiError> {
        self.dispatcher.dispatch(request).await
    }

    /// Issue a request on the runtime, returning its handle right away
    pub fn spawn(&self, request: RequestDescriptor) -> JoinHandle<Result<Value, ApiError>> {
        self.dispatcher.spawn(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::SignalingConfig;

    #[test]
    fn test_client_normalizes_base_url() {
        let client = HalyardClient::new("http://localhost:5000", RequestProfile::default()).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:5000/");
        assert!(!client.signaling_enabled());
    }

    #[test]
    fn test_signaling_follows_profile() {
        let profile = RequestProfile {
            signaling: Some(SignalingConfig::new("10.0.0.2", "8443")),
            ..RequestProfile::default()
        };
        let client = HalyardClient::new("http://localhost:5000/", profile).unwrap();
        assert!(client.signaling_enabled());
    }
}
