//! Manifest declarations to platform requests.
//!
//! Cross-references are resolved here: `set_origin` targets become origin
//! IDs and `run_function` is bound to the function instance. A reference
//! that cannot be resolved is an error, never a guess.

use std::collections::HashMap;

use super::naming::default_origin_name;
use super::options::DeployOptions;
use crate::error::{EdgeDeployError, ManifestError, Result};
use crate::manifest::{
    BEHAVIOR_RUN_FUNCTION, BEHAVIOR_SET_ORIGIN, BucketDecl, DEFAULT_ORIGIN_ALIAS, EdgeAccess,
    Manifest, OriginDecl, OriginType, ProtocolPolicy, RuleDecl,
};
use crate::platform::{
    ApplicationRequest, Behavior, BucketRequest, Criterion, DomainRequest, FunctionRequest,
    OriginAddress, OriginRequest, ResourceId, RuleRequest,
};
use crate::state::LocalState;

/// Upstream of the default origin when the manifest declares none.
pub const DEFAULT_ORIGIN_ADDRESS: &str = "api.azion.net";

/// Language of uploaded function code.
const FUNCTION_LANGUAGE: &str = "javascript";

/// IDs rule behaviors may refer to.
#[derive(Debug, Default)]
pub struct References {
    /// Default origin ID.
    default_origin: Option<ResourceId>,
    /// Declared name of the default origin.
    default_origin_name: Option<String>,
    /// Manifest origins by name.
    origins: HashMap<String, ResourceId>,
    /// Function instance ID.
    instance: Option<ResourceId>,
}

impl References {
    /// Collects resolvable IDs from the manifest and local state.
    #[must_use]
    pub fn collect(manifest: &Manifest, state: &LocalState) -> Self {
        Self {
            default_origin: state.origin.id,
            default_origin_name: manifest.default_origin().map(|o| o.name.clone()),
            origins: state
                .origins
                .iter()
                .map(|o| (o.name.clone(), o.id))
                .collect(),
            instance: state.function.instance_id,
        }
    }

    fn origin(&self, name: &str, rule: &str) -> Result<ResourceId> {
        let is_default =
            name == DEFAULT_ORIGIN_ALIAS || self.default_origin_name.as_deref() == Some(name);

        let id = if is_default {
            self.default_origin
        } else {
            self.origins.get(name).copied()
        };

        id.ok_or_else(|| unresolved("origin", name, rule))
    }
}

fn unresolved(resource_type: &str, name: &str, rule: &str) -> EdgeDeployError {
    EdgeDeployError::Manifest(ManifestError::UnresolvedReference {
        resource_type: resource_type.to_string(),
        name: name.to_string(),
        referrer: format!("rule '{rule}'"),
    })
}

/// Application request from the declaration, or defaults named after the project.
#[must_use]
pub fn application_request(project: &str, manifest: &Manifest) -> ApplicationRequest {
    manifest.application().map_or_else(
        || ApplicationRequest {
            name: project.to_string(),
            delivery_protocol: String::from("http,https"),
            http_port: 80,
            https_port: 443,
            edge_functions: true,
        },
        |app| ApplicationRequest {
            name: app.name.clone(),
            delivery_protocol: app.delivery_protocol.to_string(),
            http_port: app.http_port,
            https_port: app.https_port,
            edge_functions: true,
        },
    )
}

/// Request for a declared origin.
#[must_use]
pub fn origin_request(decl: &OriginDecl) -> OriginRequest {
    OriginRequest {
        name: decl.name.clone(),
        origin_type: origin_type_name(decl.origin_type).to_string(),
        addresses: decl
            .addresses
            .iter()
            .map(|a| OriginAddress { address: a.clone() })
            .collect(),
        host_header: decl.host_header.clone(),
        origin_protocol_policy: protocol_policy_name(decl.protocol_policy).to_string(),
        bucket: decl.bucket.clone(),
        prefix: decl.prefix.clone(),
    }
}

/// Request for the default origin: the declared one, else a placeholder
/// single origin named after the project.
#[must_use]
pub fn default_origin_request(project: &str, manifest: &Manifest) -> OriginRequest {
    manifest.default_origin().map_or_else(
        || OriginRequest {
            name: default_origin_name(project),
            origin_type: origin_type_name(OriginType::SingleOrigin).to_string(),
            addresses: vec![OriginAddress {
                address: DEFAULT_ORIGIN_ADDRESS.to_string(),
            }],
            host_header: String::from("${host}"),
            origin_protocol_policy: protocol_policy_name(ProtocolPolicy::Preserve).to_string(),
            bucket: None,
            prefix: None,
        },
        origin_request,
    )
}

/// Bucket request.
#[must_use]
pub fn bucket_request(name: &str, decl: Option<&BucketDecl>) -> BucketRequest {
    let edge_access = decl.map_or(EdgeAccess::ReadOnly, |b| b.edge_access);
    BucketRequest {
        name: name.to_string(),
        edge_access: edge_access_name(edge_access).to_string(),
    }
}

/// Function request carrying the code read from `file`.
#[must_use]
pub fn function_request(
    project: &str,
    manifest: &Manifest,
    options: &DeployOptions,
    file: &str,
    code: String,
) -> FunctionRequest {
    let (name, args) = manifest.function().map_or_else(
        || (project.to_string(), serde_json::Map::new()),
        |f| (f.name.clone(), f.args.clone()),
    );

    FunctionRequest {
        name,
        code,
        language: FUNCTION_LANGUAGE.to_string(),
        initiator_type: options.initiator_type().to_string(),
        json_args: serde_json::Value::Object(args),
        file: file.to_string(),
    }
}

/// Domain request from the declaration, or defaults named after the project.
#[must_use]
pub fn domain_request(project: &str, manifest: &Manifest) -> DomainRequest {
    manifest.domain().map_or_else(
        || DomainRequest {
            name: project.to_string(),
            cnames: Vec::new(),
            cname_access_only: false,
            digital_certificate_id: None,
        },
        |d| DomainRequest {
            name: d.name.clone(),
            cnames: d.cnames.clone(),
            cname_access_only: d.cname_access_only,
            digital_certificate_id: d.digital_certificate_id,
        },
    )
}

/// Rule request with behavior targets resolved to platform IDs.
///
/// # Errors
///
/// Returns `ManifestError::UnresolvedReference` if a behavior points at an
/// origin or function instance that does not exist.
pub fn rule_request(decl: &RuleDecl, refs: &References) -> Result<RuleRequest> {
    let behaviors = decl
        .behaviors
        .iter()
        .map(|b| match b.name.as_str() {
            BEHAVIOR_SET_ORIGIN => {
                let target = b.target.as_deref().unwrap_or(DEFAULT_ORIGIN_ALIAS);
                refs.origin(target, &decl.name)
                    .map(|id| Behavior::with_target(BEHAVIOR_SET_ORIGIN, id))
            }
            BEHAVIOR_RUN_FUNCTION => refs
                .instance
                .map(|id| Behavior::with_target(BEHAVIOR_RUN_FUNCTION, id))
                .ok_or_else(|| unresolved("function instance", "function", &decl.name)),
            _ => Ok(Behavior {
                name: b.name.clone(),
                target: b.target.clone(),
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    let criteria = decl
        .criteria
        .iter()
        .map(|group| {
            group
                .iter()
                .map(|c| Criterion {
                    variable: c.variable.clone(),
                    operator: c.operator.clone(),
                    conditional: c.conditional.clone(),
                    input_value: c.input_value.clone(),
                })
                .collect()
        })
        .collect();

    Ok(RuleRequest {
        name: decl.name.clone(),
        phase: decl.phase,
        description: decl.description.clone(),
        is_active: decl.active,
        criteria,
        behaviors,
    })
}

const fn origin_type_name(origin_type: OriginType) -> &'static str {
    match origin_type {
        OriginType::SingleOrigin => "single_origin",
        OriginType::ObjectStorage => "object_storage",
        OriginType::LoadBalancer => "load_balancer",
    }
}

const fn protocol_policy_name(policy: ProtocolPolicy) -> &'static str {
    match policy {
        ProtocolPolicy::Preserve => "preserve",
        ProtocolPolicy::Http => "http",
        ProtocolPolicy::Https => "https",
    }
}

const fn edge_access_name(access: EdgeAccess) -> &'static str {
    match access {
        EdgeAccess::ReadOnly => "read_only",
        EdgeAccess::ReadWrite => "read_write",
        EdgeAccess::Restricted => "restricted",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::{ManifestFormat, ManifestLoader};

    fn manifest() -> Manifest {
        ManifestLoader::parse_str(
            r#"{
                "origins": [
                    {"name": "main", "addresses": ["www.shop.example"]},
                    {"name": "api", "addresses": ["api.shop.example"], "protocol_policy": "https"}
                ],
                "rules": [{
                    "name": "routes",
                    "criteria": [[{"variable": "${uri}", "operator": "starts_with", "conditional": "if", "input_value": "/api"}]],
                    "behaviors": [
                        {"name": "set_origin", "target": "api"},
                        {"name": "set_origin", "target": "main"},
                        {"name": "set_origin", "target": "default"},
                        {"name": "run_function", "target": "ignored"},
                        {"name": "redirect_to_301", "target": "https://shop.example"}
                    ]
                }]
            }"#,
            ManifestFormat::Json,
            None,
        )
        .unwrap()
    }

    fn provisioned() -> LocalState {
        let mut state = LocalState::new("shop");
        state.origin.id = Some(100);
        state.track_origin("api", 200);
        state.function.instance_id = Some(300);
        state
    }

    #[test]
    fn test_rule_targets_resolved() {
        let manifest = manifest();
        let refs = References::collect(&manifest, &provisioned());
        let rule = rule_request(&manifest.rules[0], &refs).unwrap();

        let targets: Vec<_> = rule.behaviors.iter().map(|b| b.target.as_deref()).collect();
        assert_eq!(
            targets,
            vec![
                Some("200"),
                Some("100"),
                Some("100"),
                Some("300"),
                Some("https://shop.example")
            ]
        );
        assert_eq!(rule.criteria[0][0].input_value, "/api");
    }

    #[test]
    fn test_unresolved_origin() {
        let manifest = manifest();
        let mut state = provisioned();
        state.origins.clear();
        let refs = References::collect(&manifest, &state);

        let err = rule_request(&manifest.rules[0], &refs).unwrap_err();
        assert!(matches!(
            err,
            EdgeDeployError::Manifest(ManifestError::UnresolvedReference { ref name, .. }) if name == "api"
        ));
    }

    #[test]
    fn test_unresolved_function_instance() {
        let manifest = manifest();
        let mut state = provisioned();
        state.function.instance_id = None;
        let refs = References::collect(&manifest, &state);

        assert!(rule_request(&manifest.rules[0], &refs).is_err());
    }

    #[test]
    fn test_default_origin_request() {
        let fallback = default_origin_request("shop", &Manifest::default());
        assert_eq!(fallback.name, "shop-single");
        assert_eq!(fallback.addresses[0].address, DEFAULT_ORIGIN_ADDRESS);

        let declared = default_origin_request("shop", &manifest());
        assert_eq!(declared.name, "main");
        assert_eq!(declared.origin_protocol_policy, "preserve");
    }

    #[test]
    fn test_function_request_uses_options() {
        let options = DeployOptions::new("/work/shop").with_firewall(true);
        let request =
            function_request("shop", &Manifest::default(), &options, ".edge/worker.js", String::from("code"));

        assert_eq!(request.name, "shop");
        assert_eq!(request.initiator_type, "edge_firewall");
        assert_eq!(request.json_args, serde_json::json!({}));
    }
}
