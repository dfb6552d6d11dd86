//! Request bodies
//!
//! Pure builders for the JSON objects sent with create and restore calls.

use super::registry::BodyKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Network tag applied to everything the client creates
pub const DEFAULT_TAG: &str = "kradtke-ssh";

/// Prefix the server gives to per-user disks
pub const USER_DISK_PREFIX: &str = "halyard-user-";

/// Signaling server handed to new instances for peer-connection setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingConfig {
    pub addr: String,
    pub port: String,
}

impl SignalingConfig {
    pub fn new(addr: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            port: port.into(),
        }
    }

    /// Signaling server baked in at build time.
    ///
    /// Both `HALYARD_SIG_SERVER_ADDR` and `HALYARD_SIG_SERVER_PORT` must be set
    /// when compiling; otherwise signaling stays disabled.
    pub fn from_build_env() -> Option<Self> {
        match (
            option_env!("HALYARD_SIG_SERVER_ADDR"),
            option_env!("HALYARD_SIG_SERVER_PORT"),
        ) {
            (Some(addr), Some(port)) => Some(Self::new(addr, port)),
            _ => None,
        }
    }

    fn merge_into(&self, body: &mut Map<String, Value>) {
        body.insert("sig_server_addr".to_string(), Value::from(self.addr.as_str()));
        body.insert("sig_server_port".to_string(), Value::from(self.port.as_str()));
    }
}

/// Fixed per-deployment inputs to instance and image bodies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestProfile {
    pub tags: Vec<String>,
    /// Present when the deployment runs a signaling server
    pub signaling: Option<SignalingConfig>,
    /// Base image branch for new instances
    pub branch: Option<String>,
    /// Base image build target for new instances
    pub target: Option<String>,
}

impl Default for RequestProfile {
    fn default() -> Self {
        Self {
            tags: vec![DEFAULT_TAG.to_string()],
            signaling: None,
            branch: None,
            target: None,
        }
    }
}

/// Source of the user-chosen identifier, read when an instance is created
pub trait UserIdInput {
    fn read_user_id(&self) -> String;
}

impl UserIdInput for str {
    fn read_user_id(&self) -> String {
        self.to_string()
    }
}

impl UserIdInput for String {
    fn read_user_id(&self) -> String {
        self.clone()
    }
}

impl<F> UserIdInput for F
where
    F: Fn() -> String,
{
    fn read_user_id(&self) -> String {
        self()
    }
}

/// Optional settings for building a new base image.
/// Unset fields are left out of the body so the server defaults apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_family: Option<String>,
    /// Rebuild even if an image for this build already exists
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub respin: bool,
}

/// Caller-supplied inputs an operation draws its path and body from
#[derive(Debug, Clone, Copy, Default)]
pub struct CallArgs<'a> {
    /// Resource name: the path segment of named operations, the disk of a restore
    pub name: Option<&'a str>,
    /// User id for instance creation, already read from its input
    pub user_id: Option<&'a str>,
    pub image: Option<&'a ImageOptions>,
}

/// Recover a user id from a disk name.
///
/// Only a leading `halyard-user-` is removed, once; any other name is
/// returned as is.
pub fn strip_user_prefix(disk_name: &str) -> &str {
    disk_name
        .strip_prefix(USER_DISK_PREFIX)
        .unwrap_or(disk_name)
}

fn tags_body(tags: &[String]) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert(
        "tags".to_string(),
        Value::Array(tags.iter().map(|t| Value::from(t.as_str())).collect()),
    );
    body
}

fn merge_instance_fields(profile: &RequestProfile, body: &mut Map<String, Value>) {
    if let Some(signaling) = &profile.signaling {
        signaling.merge_into(body);
    }
    if let Some(branch) = &profile.branch {
        body.insert("branch".to_string(), Value::from(branch.as_str()));
    }
    if let Some(target) = &profile.target {
        body.insert("target".to_string(), Value::from(target.as_str()));
    }
}

/// Body for creating an instance
pub fn instance_body(profile: &RequestProfile, user_id: Option<&str>) -> Map<String, Value> {
    let mut body = tags_body(&profile.tags);
    if let Some(user_id) = user_id {
        body.insert("user_id".to_string(), Value::from(user_id));
    }
    merge_instance_fields(profile, &mut body);
    body
}

/// Body for restoring a user disk as a new instance
pub fn restore_body(profile: &RequestProfile, disk_name: &str) -> Map<String, Value> {
    let mut body = tags_body(&profile.tags);
    body.insert(
        "user_id".to_string(),
        Value::from(strip_user_prefix(disk_name)),
    );
    merge_instance_fields(profile, &mut body);
    body
}

/// Body for building a new image. Never carries signaling details.
pub fn image_body(profile: &RequestProfile, options: &ImageOptions) -> Map<String, Value> {
    let mut body = match serde_json::to_value(options) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    body.extend(tags_body(&profile.tags));
    body
}

/// Body for an operation of the given kind
pub fn build_body(
    kind: BodyKind,
    profile: &RequestProfile,
    args: &CallArgs<'_>,
) -> Map<String, Value> {
    match kind {
        BodyKind::Empty => Map::new(),
        BodyKind::Instance => instance_body(profile, args.user_id),
        BodyKind::Restore => restore_body(profile, args.name.unwrap_or_default()),
        BodyKind::Image => match args.image {
            Some(options) => image_body(profile, options),
            None => image_body(profile, &ImageOptions::default()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signaling_profile() -> RequestProfile {
        RequestProfile {
            signaling: Some(SignalingConfig::new("10.0.0.5", "8443")),
            ..RequestProfile::default()
        }
    }

    #[test]
    fn test_strip_user_prefix() {
        assert_eq!(strip_user_prefix("halyard-user-abc123"), "abc123");
        assert_eq!(strip_user_prefix("abc123"), "abc123");
    }

    #[test]
    fn test_strip_user_prefix_is_anchored_and_single() {
        assert_eq!(strip_user_prefix("x-halyard-user-abc"), "x-halyard-user-abc");
        assert_eq!(
            strip_user_prefix("halyard-user-halyard-user-abc"),
            "halyard-user-abc"
        );
        assert_eq!(strip_user_prefix("halyard-user-"), "");
    }

    #[test]
    fn test_instance_body_default_is_tags_only() {
        let body = instance_body(&RequestProfile::default(), None);
        assert_eq!(Value::Object(body), json!({"tags": ["kradtke-ssh"]}));
    }

    #[test]
    fn test_instance_body_with_signaling() {
        let body = instance_body(&signaling_profile(), Some("00042"));
        assert_eq!(
            Value::Object(body),
            json!({
                "tags": ["kradtke-ssh"],
                "user_id": "00042",
                "sig_server_addr": "10.0.0.5",
                "sig_server_port": "8443"
            })
        );
    }

    #[test]
    fn test_restore_body() {
        let body = restore_body(&RequestProfile::default(), "halyard-user-abc123");
        assert_eq!(
            Value::Object(body),
            json!({"user_id": "abc123", "tags": ["kradtke-ssh"]})
        );
    }

    #[test]
    fn test_restore_body_with_signaling() {
        let body = restore_body(&signaling_profile(), "halyard-user-abc123");
        assert_eq!(body["user_id"], "abc123");
        assert_eq!(body["sig_server_addr"], "10.0.0.5");
        assert_eq!(body["sig_server_port"], "8443");
    }

    #[test]
    fn test_instance_body_includes_base_image_version() {
        let profile = RequestProfile {
            branch: Some("aosp-master".to_string()),
            target: Some("aosp_cf_x86_phone-userdebug".to_string()),
            ..RequestProfile::default()
        };
        let body = instance_body(&profile, None);
        assert_eq!(body["branch"], "aosp-master");
        assert_eq!(body["target"], "aosp_cf_x86_phone-userdebug");
    }

    #[test]
    fn test_image_body_never_has_signaling() {
        let body = image_body(&signaling_profile(), &ImageOptions::default());
        assert_eq!(Value::Object(body), json!({"tags": ["kradtke-ssh"]}));
    }

    #[test]
    fn test_image_body_with_options() {
        let options = ImageOptions {
            build_instance: Some("my-build".to_string()),
            respin: true,
            ..ImageOptions::default()
        };
        let body = image_body(&RequestProfile::default(), &options);
        assert_eq!(
            Value::Object(body),
            json!({"build_instance": "my-build", "respin": true, "tags": ["kradtke-ssh"]})
        );
    }

    #[test]
    fn test_build_body_follows_kind() {
        let profile = signaling_profile();
        let args = CallArgs {
            name: Some("halyard-user-abc123"),
            user_id: Some("00042"),
            image: None,
        };

        assert!(build_body(BodyKind::Empty, &profile, &args).is_empty());
        assert_eq!(
            build_body(BodyKind::Instance, &profile, &args),
            instance_body(&profile, Some("00042"))
        );
        assert_eq!(
            build_body(BodyKind::Restore, &profile, &args),
            restore_body(&profile, "halyard-user-abc123")
        );
        assert_eq!(
            Value::Object(build_body(BodyKind::Image, &profile, &args)),
            json!({"tags": ["kradtke-ssh"]})
        );
    }

    #[test]
    fn test_user_id_input_sources() {
        assert_eq!("00001".read_user_id(), "00001");
        assert_eq!(String::from("00002").read_user_id(), "00002");
        let field = || "00003".to_string();
        assert_eq!(field.read_user_id(), "00003");
    }
}
