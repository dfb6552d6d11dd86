//! Resource Callers
//!
//! One function per API operation. Each gathers its inputs; the operation
//! table decides the path and body kind, and the dispatcher sends it.

use super::body::{CallArgs, ImageOptions, UserIdInput};
use super::registry::Operation;
use crate::api::client::HalyardClient;
use crate::api::error::ApiError;
use serde_json::Value;

async fn call(
    client: &HalyardClient,
    operation: Operation,
    args: CallArgs<'_>,
) -> Result<Value, ApiError> {
    let request = operation.def().request(&client.profile, &args)?;
    client.dispatch(request).await
}

fn named(name: &str) -> CallArgs<'_> {
    CallArgs {
        name: Some(name),
        ..CallArgs::default()
    }
}

// =============================================================================
// Instances
// =============================================================================

/// Create a new instance.
///
/// `input` is read only when signaling is enabled; its value becomes the
/// instance's `user_id`.
pub async fn create_instance<I>(client: &HalyardClient, input: &I) -> Result<Value, ApiError>
where
    I: UserIdInput + ?Sized,
{
    let user_id = client
        .profile
        .signaling
        .as_ref()
        .map(|_| input.read_user_id());
    let args = CallArgs {
        user_id: user_id.as_deref(),
        ..CallArgs::default()
    };
    call(client, Operation::InstanceCreate, args).await
}

pub async fn info_instance(client: &HalyardClient, name: &str) -> Result<Value, ApiError> {
    call(client, Operation::InstanceInfo, named(name)).await
}

/// Stop an instance; the server deletes it and keeps its user disk
pub async fn stop_instance(client: &HalyardClient, name: &str) -> Result<Value, ApiError> {
    call(client, Operation::InstanceStop, named(name)).await
}

pub async fn list_instances(client: &HalyardClient) -> Result<Value, ApiError> {
    call(client, Operation::InstanceList, CallArgs::default()).await
}

// =============================================================================
// Disks
// =============================================================================

/// Restore a stopped user disk as a new instance
pub async fn restore_disk(client: &HalyardClient, name: &str) -> Result<Value, ApiError> {
    call(client, Operation::DiskRestore, named(name)).await
}

pub async fn delete_disk(client: &HalyardClient, name: &str) -> Result<Value, ApiError> {
    call(client, Operation::DiskDelete, named(name)).await
}

/// List user disks that have no running instance
pub async fn list_disks(client: &HalyardClient) -> Result<Value, ApiError> {
    call(client, Operation::DiskList, CallArgs::default()).await
}

// =============================================================================
// Images
// =============================================================================

pub async fn create_image(
    client: &HalyardClient,
    options: &ImageOptions,
) -> Result<Value, ApiError> {
    let args = CallArgs {
        image: Some(options),
        ..CallArgs::default()
    };
    call(client, Operation::ImageCreate, args).await
}

pub async fn info_image(client: &HalyardClient, name: &str) -> Result<Value, ApiError> {
    call(client, Operation::ImageInfo, named(name)).await
}

pub async fn delete_image(client: &HalyardClient, name: &str) -> Result<Value, ApiError> {
    call(client, Operation::ImageDelete, named(name)).await
}

pub async fn list_images(client: &HalyardClient) -> Result<Value, ApiError> {
    call(client, Operation::ImageList, CallArgs::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::http::{DispatchObserver, RequestDescriptor};
    use crate::resource::{RequestProfile, SignalingConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Captures descriptors; the base URL points nowhere so every call fails fast
    #[derive(Default)]
    struct Capture {
        requests: Mutex<Vec<RequestDescriptor>>,
    }

    impl DispatchObserver for Capture {
        fn on_start(&self, request: &RequestDescriptor) {
            self.requests.lock().unwrap().push(request.clone());
        }
        fn on_success(&self, _: &RequestDescriptor, _: &Value) {}
        fn on_failure(&self, _: &RequestDescriptor, _: &ApiError) {}
    }

    fn client_with(profile: RequestProfile) -> (HalyardClient, Arc<Capture>) {
        let capture = Arc::new(Capture::default());
        let client = HalyardClient::new("http://127.0.0.1:9/", profile)
            .unwrap()
            .with_observer(capture.clone());
        (client, capture)
    }

    #[tokio::test]
    async fn test_create_instance_skips_input_without_signaling() {
        let (client, capture) = client_with(RequestProfile::default());
        let reads = AtomicUsize::new(0);
        let input = || {
            reads.fetch_add(1, Ordering::SeqCst);
            "00001".to_string()
        };

        let _ = create_instance(&client, &input).await;

        assert_eq!(reads.load(Ordering::SeqCst), 0);
        let requests = capture.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].payload.contains_key("user_id"));
    }

    #[tokio::test]
    async fn test_create_instance_reads_input_once_with_signaling() {
        let profile = RequestProfile {
            signaling: Some(SignalingConfig::new("127.0.0.1", "8443")),
            ..RequestProfile::default()
        };
        let (client, capture) = client_with(profile);
        let reads = AtomicUsize::new(0);
        let input = || {
            reads.fetch_add(1, Ordering::SeqCst);
            "00007".to_string()
        };

        let _ = create_instance(&client, &input).await;

        assert_eq!(reads.load(Ordering::SeqCst), 1);
        let requests = capture.requests.lock().unwrap();
        assert_eq!(requests[0].payload["user_id"], "00007");
        assert_eq!(requests[0].payload["sig_server_port"], "8443");
    }

    #[tokio::test]
    async fn test_named_callers_build_expected_paths() {
        let (client, capture) = client_with(RequestProfile::default());

        let _ = info_instance(&client, "halyard-00001").await;
        let _ = stop_instance(&client, "halyard-00001").await;
        let _ = delete_disk(&client, "halyard-user-00001").await;
        let _ = info_image(&client, "halyard-base").await;
        let _ = delete_image(&client, "halyard-base").await;

        let paths: Vec<_> = capture
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| (r.method.as_str(), r.path.clone(), r.payload.is_empty()))
            .collect();

        assert_eq!(
            paths,
            vec![
                ("GET", "instance/halyard-00001".to_string(), true),
                ("DELETE", "instance/halyard-00001".to_string(), true),
                ("DELETE", "disk/halyard-user-00001".to_string(), true),
                ("GET", "image/halyard-base".to_string(), true),
                ("DELETE", "image/halyard-base".to_string(), true),
            ]
        );
    }

    #[tokio::test]
    async fn test_restore_disk_posts_to_instance_list() {
        let (client, capture) = client_with(RequestProfile::default());

        let _ = restore_disk(&client, "halyard-user-abc123").await;

        let requests = capture.requests.lock().unwrap();
        assert_eq!(requests[0].path, "instance-list");
        assert_eq!(requests[0].label, "Restore Disk request");
        assert_eq!(requests[0].payload["user_id"], "abc123");
    }
}
