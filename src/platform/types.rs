//! Edge platform request and response types.
//!
//! Requests are what the deploy pipeline hands to the resource clients; the
//! HTTP client serializes them as the JSON bodies the platform API expects.

use serde::{Deserialize, Serialize};

use crate::manifest::RulePhase;

/// Platform-assigned resource identifier.
pub type ResourceId = u64;

/// Name of the rule created when a project declares no rules of its own.
pub const DEFAULT_RULE_SET_NAME: &str = "default";

/// Application creation request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApplicationRequest {
    /// Application name.
    pub name: String,
    /// `http`, `https` or `http,https`.
    pub delivery_protocol: String,
    /// HTTP port.
    pub http_port: u16,
    /// HTTPS port.
    pub https_port: u16,
    /// Enables the edge functions module.
    pub edge_functions: bool,
}

/// Origin creation or update request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OriginRequest {
    /// Origin name.
    pub name: String,
    /// `single_origin`, `object_storage` or `load_balancer`.
    pub origin_type: String,
    /// Upstream addresses.
    pub addresses: Vec<OriginAddress>,
    /// Host header sent upstream.
    pub host_header: String,
    /// `preserve`, `http` or `https`.
    pub origin_protocol_policy: String,
    /// Bucket for object storage origins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// Key prefix for object storage origins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// A single upstream address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OriginAddress {
    /// Host or host:port.
    pub address: String,
}

/// Bucket creation request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BucketRequest {
    /// Bucket name.
    pub name: String,
    /// `read_only`, `read_write` or `restricted`.
    pub edge_access: String,
}

/// Function registration request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FunctionRequest {
    /// Function name.
    pub name: String,
    /// Function source code.
    pub code: String,
    /// Runtime language.
    pub language: String,
    /// `edge_application` or `edge_firewall`.
    pub initiator_type: String,
    /// Arguments passed to the instance.
    pub json_args: serde_json::Value,
    /// Local file the code was read from.
    #[serde(skip)]
    pub file: String,
}

/// Domain creation request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DomainRequest {
    /// Domain name.
    pub name: String,
    /// Alternate hostnames.
    pub cnames: Vec<String>,
    /// Serve only on the CNAMEs.
    pub cname_access_only: bool,
    /// Certificate to present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digital_certificate_id: Option<u64>,
}

/// Rule creation or update request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RuleRequest {
    /// Rule name.
    pub name: String,
    /// Phase the rule runs in; part of the URL, not the body.
    #[serde(skip)]
    pub phase: RulePhase,
    /// Free-form description.
    pub description: String,
    /// Whether the rule is active.
    pub is_active: bool,
    /// OR-list of AND-groups.
    pub criteria: Vec<Vec<Criterion>>,
    /// Behaviors applied on match.
    pub behaviors: Vec<Behavior>,
}

/// A rule condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Criterion {
    /// Request variable.
    pub variable: String,
    /// Comparison operator.
    pub operator: String,
    /// `if`, `and` or `or`.
    pub conditional: String,
    /// Value compared against.
    pub input_value: String,
}

/// A rule behavior with its resolved target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Behavior {
    /// Behavior name.
    pub name: String,
    /// Resolved target, if the behavior takes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Behavior {
    /// Creates a behavior with a target.
    #[must_use]
    pub fn with_target(name: &str, target: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            target: Some(target.to_string()),
        }
    }
}

/// Result of a static directory upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    /// Files uploaded.
    pub files: usize,
    /// Total bytes uploaded.
    pub bytes: u64,
}

/// Domain as returned by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainInfo {
    /// Platform ID.
    pub id: ResourceId,
    /// Hostname assigned by the platform.
    pub name: String,
}

/// Function and instance IDs created by registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionInstance {
    /// Function ID.
    pub function_id: ResourceId,
    /// Instance ID attached to the application.
    pub instance_id: ResourceId,
}
