//! Operation Registry - Load operation definitions from JSON
//!
//! Every call the client can make is described once in an embedded JSON
//! table: its log label, HTTP verb, path template and the kind of body it
//! carries. Callers look their definition up here instead of repeating it.

use super::body::{build_body, CallArgs, RequestProfile};
use crate::api::error::ApiError;
use crate::api::http::{Method, RequestDescriptor};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Embedded operation table (compiled into the binary)
const OPERATIONS_FILE: &str = include_str!("../resources/operations.json");

/// Placeholder substituted with the resource name in path templates
pub const NAME_PLACEHOLDER: &str = "{name}";

/// Every operation exposed by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    InstanceCreate,
    InstanceInfo,
    InstanceStop,
    InstanceList,
    DiskRestore,
    DiskDelete,
    DiskList,
    ImageCreate,
    ImageInfo,
    ImageDelete,
    ImageList,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::InstanceCreate,
        Operation::InstanceInfo,
        Operation::InstanceStop,
        Operation::InstanceList,
        Operation::DiskRestore,
        Operation::DiskDelete,
        Operation::DiskList,
        Operation::ImageCreate,
        Operation::ImageInfo,
        Operation::ImageDelete,
        Operation::ImageList,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Operation::InstanceCreate => "instance-create",
            Operation::InstanceInfo => "instance-info",
            Operation::InstanceStop => "instance-stop",
            Operation::InstanceList => "instance-list",
            Operation::DiskRestore => "disk-restore",
            Operation::DiskDelete => "disk-delete",
            Operation::DiskList => "disk-list",
            Operation::ImageCreate => "image-create",
            Operation::ImageInfo => "image-info",
            Operation::ImageDelete => "image-delete",
            Operation::ImageList => "image-list",
        }
    }

    /// Definition of this operation from the embedded table
    pub fn def(self) -> &'static OperationDef {
        &get_registry().operations[&self]
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Shape of the body an operation sends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    #[default]
    Empty,
    /// Tags, plus user id and signaling details when enabled
    Instance,
    /// Instance body keyed by the user id recovered from a disk name
    Restore,
    /// Tags plus optional image build settings
    Image,
}

/// Operation definition from JSON
#[derive(Debug, Clone, Deserialize)]
pub struct OperationDef {
    pub label: String,
    pub method: Method,
    /// Relative path, possibly containing [`NAME_PLACEHOLDER`]
    pub path: String,
    #[serde(default)]
    pub body: BodyKind,
}

impl OperationDef {
    /// Whether the path addresses a single named resource
    pub fn requires_name(&self) -> bool {
        self.path.contains(NAME_PLACEHOLDER)
    }

    /// Concrete path with the (percent-encoded) resource name filled in.
    ///
    /// Names that URL resolution would collapse (empty, `.` and `..`) are
    /// rejected, so a named operation always targets its own resource.
    pub fn path_for(&self, name: Option<&str>) -> Result<String, ApiError> {
        if !self.requires_name() {
            return Ok(self.path.clone());
        }

        match name {
            Some(name) if !matches!(name, "" | "." | "..") => Ok(self
                .path
                .replace(NAME_PLACEHOLDER, &urlencoding::encode(name))),
            other => Err(ApiError::InvalidName(other.unwrap_or_default().to_string())),
        }
    }

    /// Assemble the request for one call; the body follows this operation's body kind
    pub fn request(
        &self,
        profile: &RequestProfile,
        args: &CallArgs<'_>,
    ) -> Result<RequestDescriptor, ApiError> {
        let path = self.path_for(args.name)?;
        Ok(RequestDescriptor::new(self.label.clone(), path, self.method)
            .with_payload(build_body(self.body, profile, args)))
    }
}

/// Root structure of resources/operations.json
#[derive(Debug, Clone, Deserialize)]
pub struct OperationConfig {
    pub operations: HashMap<Operation, OperationDef>,
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<OperationConfig> = OnceLock::new();

/// Get the operation registry (loads from embedded JSON on first access)
pub fn get_registry() -> &'static OperationConfig {
    REGISTRY.get_or_init(|| {
        let config: OperationConfig = serde_json::from_str(OPERATIONS_FILE)
            .unwrap_or_else(|e| panic!("Failed to parse embedded operation JSON: {}", e));

        if let Some(missing) = Operation::ALL
            .iter()
            .find(|op| !config.operations.contains_key(op))
        {
            panic!("Embedded operation JSON has no entry for {}", missing);
        }

        config
    })
}
