//! Manifest validation.
//!
//! Parsing only guarantees the manifest is well-formed; this module checks
//! that it is consistent before anything is sent to the platform. All issues
//! are collected so a single `validate` run reports every problem.

use crate::error::{EdgeDeployError, ManifestError, Result};
use std::collections::HashSet;
use tracing::debug;

use super::schema::{
    BEHAVIOR_SET_ORIGIN, DEFAULT_ORIGIN_ALIAS, DeliveryProtocol, Manifest, OriginDecl, OriginType,
    RuleDecl,
};

/// Operators that compare against nothing and accept an empty input value.
const VALUELESS_OPERATORS: &[&str] = &["exists", "does_not_exist"];

/// Accepted values for a criterion's `conditional`.
const CONDITIONALS: &[&str] = &["if", "and", "or"];

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

/// Validator for manifests.
#[derive(Debug, Default)]
pub struct ManifestValidator;

impl ManifestValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a manifest, failing on the first collected error.
    ///
    /// # Errors
    ///
    /// Returns a validation error if any check fails.
    pub fn validate(&self, manifest: &Manifest) -> Result<ValidationResult> {
        let result = self.check(manifest);

        if result.errors.is_empty() {
            debug!("Manifest validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(EdgeDeployError::Manifest(ManifestError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Runs every check and returns all findings without failing.
    #[must_use]
    pub fn check(&self, manifest: &Manifest) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_singletons(manifest, &mut result);
        Self::validate_applications(manifest, &mut result);
        Self::validate_origins(&manifest.origins, &mut result);
        Self::validate_buckets(manifest, &mut result);
        Self::validate_functions(manifest, &mut result);
        Self::validate_domains(manifest, &mut result);
        Self::validate_rules(manifest, &mut result);

        result
    }

    /// Application, function and domain are singletons.
    fn validate_singletons(manifest: &Manifest, result: &mut ValidationResult) {
        for (field, count) in [
            ("applications", manifest.applications.len()),
            ("functions", manifest.functions.len()),
            ("domains", manifest.domains.len()),
        ] {
            if count > 1 {
                result.errors.push(ValidationError {
                    field: String::from(field),
                    message: format!("At most one entry is allowed in '{field}', found {count}"),
                });
            }
        }
    }

    fn validate_applications(manifest: &Manifest, result: &mut ValidationResult) {
        for (i, app) in manifest.applications.iter().enumerate() {
            let prefix = format!("applications[{i}]");
            check_name(&app.name, &prefix, result);

            if app.delivery_protocol == DeliveryProtocol::Http {
                result.warnings.push(format!(
                    "{prefix}.delivery_protocol: Application '{}' is served over plain HTTP only",
                    app.name
                ));
            }

            if app.http_port == 0 || app.https_port == 0 {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.http_port"),
                    message: String::from("Ports must be non-zero"),
                });
            }
        }
    }

    fn validate_origins(origins: &[OriginDecl], result: &mut ValidationResult) {
        let mut seen_names = HashSet::new();
        let mut external = 0_usize;

        for (i, origin) in origins.iter().enumerate() {
            let prefix = format!("origins[{i}]");
            check_name(&origin.name, &prefix, result);

            if !seen_names.insert(origin.name.as_str()) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!("Duplicate origin name: {}", origin.name),
                });
            }

            if origin.name == DEFAULT_ORIGIN_ALIAS {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!("Origin name '{DEFAULT_ORIGIN_ALIAS}' is reserved"),
                });
            }

            if origin.is_external() {
                external += 1;
                continue;
            }

            match origin.origin_type {
                OriginType::ObjectStorage => {
                    if origin.bucket.as_deref().is_none_or(str::is_empty) {
                        result.errors.push(ValidationError {
                            field: format!("{prefix}.bucket"),
                            message: format!(
                                "Object storage origin '{}' must name a bucket",
                                origin.name
                            ),
                        });
                    }
                }
                OriginType::SingleOrigin | OriginType::LoadBalancer => {
                    if origin.addresses.is_empty() {
                        result.errors.push(ValidationError {
                            field: format!("{prefix}.addresses"),
                            message: format!("Origin '{}' has no addresses", origin.name),
                        });
                    }
                    for (j, address) in origin.addresses.iter().enumerate() {
                        if !is_valid_address(address) {
                            result.errors.push(ValidationError {
                                field: format!("{prefix}.addresses[{j}]"),
                                message: format!("Malformed origin address: '{address}'"),
                            });
                        }
                    }
                }
            }
        }

        if external > 1 {
            result.errors.push(ValidationError {
                field: String::from("origins"),
                message: format!("At most one externally managed origin is allowed, found {external}"),
            });
        }
    }

    fn validate_buckets(manifest: &Manifest, result: &mut ValidationResult) {
        let mut seen_names = HashSet::new();

        for (i, bucket) in manifest.buckets.iter().enumerate() {
            let prefix = format!("buckets[{i}]");

            if !seen_names.insert(bucket.name.as_str()) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!("Duplicate bucket name: {}", bucket.name),
                });
            }

            if !is_valid_bucket_name(&bucket.name) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!(
                        "Bucket name '{}' is invalid. Must be 3-63 lowercase alphanumeric characters or hyphens.",
                        bucket.name
                    ),
                });
            }
        }
    }

    fn validate_functions(manifest: &Manifest, result: &mut ValidationResult) {
        for (i, function) in manifest.functions.iter().enumerate() {
            check_name(&function.name, &format!("functions[{i}]"), result);
        }
    }

    fn validate_domains(manifest: &Manifest, result: &mut ValidationResult) {
        for (i, domain) in manifest.domains.iter().enumerate() {
            let prefix = format!("domains[{i}]");
            check_name(&domain.name, &prefix, result);

            if domain.cname_access_only && domain.cnames.is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.cnames"),
                    message: String::from("cname_access_only requires at least one CNAME"),
                });
            }
        }
    }

    fn validate_rules(manifest: &Manifest, result: &mut ValidationResult) {
        let origin_names: HashSet<&str> = manifest.origins.iter().map(|o| o.name.as_str()).collect();
        let mut seen = HashSet::new();

        for (i, rule) in manifest.rules.iter().enumerate() {
            let prefix = format!("rules[{i}]");
            check_name(&rule.name, &prefix, result);

            if !seen.insert((rule.phase, rule.name.as_str())) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.name"),
                    message: format!("Duplicate {} rule name: {}", rule.phase, rule.name),
                });
            }

            Self::validate_criteria(rule, &prefix, result);
            Self::validate_behaviors(rule, &prefix, &origin_names, result);
        }
    }

    fn validate_criteria(rule: &RuleDecl, prefix: &str, result: &mut ValidationResult) {
        if rule.criteria.is_empty() {
            result.warnings.push(format!(
                "{prefix}.criteria: Rule '{}' has no criteria and matches every request",
                rule.name
            ));
            return;
        }

        for (g, group) in rule.criteria.iter().enumerate() {
            if group.is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.criteria[{g}]"),
                    message: String::from("Criteria group cannot be empty"),
                });
            }

            for (c, criterion) in group.iter().enumerate() {
                let field = format!("{prefix}.criteria[{g}][{c}]");

                for (key, value) in [
                    ("variable", &criterion.variable),
                    ("operator", &criterion.operator),
                    ("conditional", &criterion.conditional),
                ] {
                    if value.trim().is_empty() {
                        result.errors.push(ValidationError {
                            field: format!("{field}.{key}"),
                            message: format!("Criterion {key} cannot be empty"),
                        });
                    }
                }

                if !criterion.conditional.is_empty()
                    && !CONDITIONALS.contains(&criterion.conditional.as_str())
                {
                    result.errors.push(ValidationError {
                        field: format!("{field}.conditional"),
                        message: format!(
                            "Unknown conditional '{}', expected one of: {}",
                            criterion.conditional,
                            CONDITIONALS.join(", ")
                        ),
                    });
                }

                if criterion.input_value.is_empty()
                    && !VALUELESS_OPERATORS.contains(&criterion.operator.as_str())
                {
                    result.errors.push(ValidationError {
                        field: format!("{field}.input_value"),
                        message: format!(
                            "Criterion input_value cannot be empty for operator '{}'",
                            criterion.operator
                        ),
                    });
                }
            }
        }
    }

    fn validate_behaviors(
        rule: &RuleDecl,
        prefix: &str,
        origin_names: &HashSet<&str>,
        result: &mut ValidationResult,
    ) {
        if rule.behaviors.is_empty() {
            result.errors.push(ValidationError {
                field: format!("{prefix}.behaviors"),
                message: format!("Rule '{}' has no behaviors", rule.name),
            });
        }

        for (b, behavior) in rule.behaviors.iter().enumerate() {
            let field = format!("{prefix}.behaviors[{b}]");

            if behavior.name.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{field}.name"),
                    message: String::from("Behavior name cannot be empty"),
                });
                continue;
            }

            if behavior.name == BEHAVIOR_SET_ORIGIN {
                match behavior.target.as_deref() {
                    None | Some("") => result.errors.push(ValidationError {
                        field: format!("{field}.target"),
                        message: String::from("set_origin requires a target origin"),
                    }),
                    Some(target)
                        if target != DEFAULT_ORIGIN_ALIAS && !origin_names.contains(target) =>
                    {
                        result.errors.push(ValidationError {
                            field: format!("{field}.target"),
                            message: format!("set_origin targets unknown origin '{target}'"),
                        });
                    }
                    Some(_) => {}
                }
            }
        }
    }
}

/// Records an error if a resource name is blank or padded with whitespace.
fn check_name(name: &str, prefix: &str, result: &mut ValidationResult) {
    if name.trim().is_empty() {
        result.errors.push(ValidationError {
            field: format!("{prefix}.name"),
            message: String::from("Name cannot be empty"),
        });
    } else if name.trim() != name {
        result.errors.push(ValidationError {
            field: format!("{prefix}.name"),
            message: format!("Name '{name}' has leading or trailing whitespace"),
        });
    }
}

/// Bucket names: 3-63 characters, lowercase alphanumeric and hyphens,
/// starting and ending with an alphanumeric.
pub(crate) fn is_valid_bucket_name(name: &str) -> bool {
    if !(3..=63).contains(&name.len()) {
        return false;
    }

    let valid_char = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();

    name.chars().all(|c| valid_char(c) || c == '-')
        && name.chars().next().is_some_and(valid_char)
        && name.chars().last().is_some_and(valid_char)
}

/// Origin addresses are `host` or `host:port` without a scheme or path.
fn is_valid_address(address: &str) -> bool {
    if address.is_empty() || address.contains("://") || address.contains('/') {
        return false;
    }

    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (address, None),
    };

    if let Some(port) = port {
        if !port.parse::<u16>().is_ok_and(|p| p != 0) {
            return false;
        }
    }

    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
