//! Manifest declaration types.
//!
//! These structs map one-to-one onto the manifest file. Every collection is
//! optional and unknown keys are rejected so typos surface as parse errors
//! instead of silently ignored settings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The root manifest: named collections of resource declarations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Application declarations (at most one).
    #[serde(default)]
    pub applications: Vec<ApplicationDecl>,
    /// Origin declarations.
    #[serde(default)]
    pub origins: Vec<OriginDecl>,
    /// Storage bucket declarations.
    #[serde(default)]
    pub buckets: Vec<BucketDecl>,
    /// Function declarations (at most one).
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
    /// Domain declarations (at most one).
    #[serde(default)]
    pub domains: Vec<DomainDecl>,
    /// Rules engine declarations.
    #[serde(default)]
    pub rules: Vec<RuleDecl>,
}

/// The project's edge application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ApplicationDecl {
    /// Application name.
    pub name: String,
    /// Protocols the application answers on.
    #[serde(default)]
    pub delivery_protocol: DeliveryProtocol,
    /// HTTP port.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// HTTPS port.
    #[serde(default = "default_https_port")]
    pub https_port: u16,
}

/// Delivery protocol options.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DeliveryProtocol {
    /// Plain HTTP only.
    #[serde(rename = "http")]
    Http,
    /// HTTPS only.
    #[serde(rename = "https")]
    Https,
    /// Both HTTP and HTTPS.
    #[default]
    #[serde(rename = "http,https")]
    HttpAndHttps,
}

/// An origin traffic can be routed to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OriginDecl {
    /// Origin name, referenced by `set_origin` rule behaviors.
    pub name: String,
    /// Origin type.
    #[serde(rename = "type", default)]
    pub origin_type: OriginType,
    /// Upstream addresses (host or host:port).
    #[serde(default)]
    pub addresses: Vec<String>,
    /// Host header sent upstream.
    #[serde(default = "default_host_header")]
    pub host_header: String,
    /// Upstream protocol policy.
    #[serde(default)]
    pub protocol_policy: ProtocolPolicy,
    /// Bucket served by an object storage origin.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Key prefix within the bucket.
    #[serde(default)]
    pub prefix: Option<String>,
    /// Existing platform ID; marks the origin as externally managed.
    #[serde(default)]
    pub id: Option<u64>,
}

/// Origin types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OriginType {
    /// A single upstream host.
    #[default]
    SingleOrigin,
    /// A platform storage bucket.
    ObjectStorage,
    /// Several upstream hosts behind a balancer.
    LoadBalancer,
}

/// Upstream protocol policy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolPolicy {
    /// Reuse the client's protocol.
    #[default]
    Preserve,
    /// Always HTTP.
    Http,
    /// Always HTTPS.
    Https,
}

/// A storage bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BucketDecl {
    /// Bucket name, unique platform-wide.
    pub name: String,
    /// Access granted to the edge.
    #[serde(default)]
    pub edge_access: EdgeAccess,
}

/// Edge access levels for buckets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeAccess {
    /// Edge can read objects.
    #[default]
    ReadOnly,
    /// Edge can read and write objects.
    ReadWrite,
    /// Edge has no access.
    Restricted,
}

/// The project's edge function.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FunctionDecl {
    /// Function name.
    pub name: String,
    /// Entry file; overrides the build artifact location.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// JSON arguments passed to the function instance.
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
}

/// The project's public domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DomainDecl {
    /// Domain name.
    pub name: String,
    /// Alternate hostnames.
    #[serde(default)]
    pub cnames: Vec<String>,
    /// Serve only on the CNAMEs, not on the platform hostname.
    #[serde(default)]
    pub cname_access_only: bool,
    /// Certificate to present.
    #[serde(default)]
    pub digital_certificate_id: Option<u64>,
}

/// A rules engine rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuleDecl {
    /// Rule name, the key for idempotent matching.
    pub name: String,
    /// Phase the rule runs in.
    #[serde(default)]
    pub phase: RulePhase,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Whether the rule is active.
    #[serde(default = "default_active")]
    pub active: bool,
    /// OR-list of AND-groups of conditions.
    #[serde(default)]
    pub criteria: Vec<Vec<CriterionDecl>>,
    /// Behaviors applied when the criteria match.
    #[serde(default)]
    pub behaviors: Vec<BehaviorDecl>,
}

/// A single rule condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CriterionDecl {
    /// Request variable, e.g. `${uri}`.
    pub variable: String,
    /// Comparison operator.
    pub operator: String,
    /// `if`, `and` or `or`.
    pub conditional: String,
    /// Value compared against.
    #[serde(default)]
    pub input_value: String,
}

/// A rule behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BehaviorDecl {
    /// Behavior name, e.g. `set_origin`.
    pub name: String,
    /// Behavior target; meaning depends on the behavior.
    #[serde(default)]
    pub target: Option<String>,
}

/// Rules engine phases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum RulePhase {
    /// Runs on the incoming request.
    #[default]
    Request,
    /// Runs on the outgoing response.
    Response,
}

/// Behavior that routes to an origin.
pub const BEHAVIOR_SET_ORIGIN: &str = "set_origin";

/// Behavior that runs the edge function.
pub const BEHAVIOR_RUN_FUNCTION: &str = "run_function";

/// Alias that always resolves to the default origin.
pub const DEFAULT_ORIGIN_ALIAS: &str = "default";

// Default value functions

const fn default_http_port() -> u16 {
    80
}

const fn default_https_port() -> u16 {
    443
}

const fn default_active() -> bool {
    true
}

fn default_host_header() -> String {
    String::from("${host}")
}

impl Manifest {
    /// Returns "the" application, if declared.
    #[must_use]
    pub fn application(&self) -> Option<&ApplicationDecl> {
        self.applications.first()
    }

    /// Returns "the" function, if declared.
    #[must_use]
    pub fn function(&self) -> Option<&FunctionDecl> {
        self.functions.first()
    }

    /// Returns the project domain, if declared.
    #[must_use]
    pub fn domain(&self) -> Option<&DomainDecl> {
        self.domains.first()
    }

    /// Index of the origin backing the default origin step.
    ///
    /// An externally managed origin wins; otherwise the first declared one.
    #[must_use]
    pub fn default_origin_index(&self) -> Option<usize> {
        self.origins
            .iter()
            .position(OriginDecl::is_external)
            .or_else(|| (!self.origins.is_empty()).then_some(0))
    }

    /// Returns the declaration backing the default origin, if any.
    #[must_use]
    pub fn default_origin(&self) -> Option<&OriginDecl> {
        self.default_origin_index().map(|i| &self.origins[i])
    }

    /// Returns the externally managed origin, if declared.
    #[must_use]
    pub fn external_origin(&self) -> Option<&OriginDecl> {
        self.origins.iter().find(|o| o.is_external())
    }

    /// Origins created by the manifest pass rather than the origin step.
    pub fn extra_origins(&self) -> impl Iterator<Item = &OriginDecl> {
        let skip = self.default_origin_index();
        self.origins
            .iter()
            .enumerate()
            .filter(move |(i, _)| Some(*i) != skip)
            .map(|(_, o)| o)
    }

    /// Returns the bucket declaration naming the project bucket.
    #[must_use]
    pub fn project_bucket(&self) -> Option<&BucketDecl> {
        self.buckets.first()
    }

    /// Buckets created by the manifest pass rather than the bucket step.
    pub fn extra_buckets(&self) -> impl Iterator<Item = &BucketDecl> {
        self.buckets.iter().skip(1)
    }

    /// Returns true if the manifest declares any rules.
    #[must_use]
    pub fn declares_rules(&self) -> bool {
        !self.rules.is_empty()
    }

    /// Total number of declarations across all collections.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.applications.len()
            + self.origins.len()
            + self.buckets.len()
            + self.functions.len()
            + self.domains.len()
            + self.rules.len()
    }
}

impl OriginDecl {
    /// Returns true if the origin already exists and must not be created.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        self.id.is_some()
    }
}

impl std::fmt::Display for RulePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self {
            Self::Request => "request",
            Self::Response => "response",
        };
        write!(f, "{phase}")
    }
}

impl std::fmt::Display for DeliveryProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let protocol = match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::HttpAndHttps => "http,https",
        };
        write!(f, "{protocol}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin(name: &str, id: Option<u64>) -> OriginDecl {
        OriginDecl {
            name: name.to_string(),
            origin_type: OriginType::SingleOrigin,
            addresses: vec![String::from("backend.example.com")],
            host_header: default_host_header(),
            protocol_policy: ProtocolPolicy::Preserve,
            bucket: None,
            prefix: None,
            id,
        }
    }

    #[test]
    fn test_first_origin_is_default() {
        let manifest = Manifest {
            origins: vec![origin("main", None), origin("api", None)],
            ..Manifest::default()
        };

        assert_eq!(manifest.default_origin().map(|o| o.name.as_str()), Some("main"));
        let extras: Vec<_> = manifest.extra_origins().map(|o| o.name.as_str()).collect();
        assert_eq!(extras, vec!["api"]);
    }

    #[test]
    fn test_external_origin_wins_default() {
        let manifest = Manifest {
            origins: vec![origin("api", None), origin("legacy", Some(42))],
            ..Manifest::default()
        };

        assert_eq!(manifest.default_origin().map(|o| o.name.as_str()), Some("legacy"));
        assert!(manifest.external_origin().is_some());
        let extras: Vec<_> = manifest.extra_origins().map(|o| o.name.as_str()).collect();
        assert_eq!(extras, vec!["api"]);
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::default();
        assert!(manifest.default_origin().is_none());
        assert_eq!(manifest.extra_origins().count(), 0);
        assert!(!manifest.declares_rules());
        assert_eq!(manifest.resource_count(), 0);
    }
}
