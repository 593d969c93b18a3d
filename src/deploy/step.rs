//! Pipeline steps and the gates that decide what each one does.
//!
//! Gates are pure functions of the manifest, the local state and the deploy
//! options. The orchestrator uses them to drive remote calls and `preview`
//! uses them to describe a run without making any.

use serde::Serialize;

use crate::manifest::Manifest;
use crate::platform::ResourceId;
use crate::state::LocalState;

/// Presets whose default rule runs the function instead of routing to an origin.
const SCRIPT_PRESETS: &[&str] = &["javascript", "typescript"];

/// Deploy pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Create the edge application.
    Application,
    /// Create or adopt the default origin.
    Origin,
    /// Create the project bucket.
    Bucket,
    /// Register or update the function.
    Function,
    /// Configure the default rule on first run.
    DefaultRule,
    /// Create the platform default rule set.
    ExplicitRules,
    /// Upload static assets.
    StaticUpload,
    /// Apply manifest-declared origins, buckets and rules.
    ManifestResources,
    /// Create or fetch the domain.
    Domain,
}

impl Step {
    /// Every step, in execution order.
    pub const ALL: [Self; 9] = [
        Self::Application,
        Self::Origin,
        Self::Bucket,
        Self::Function,
        Self::DefaultRule,
        Self::ExplicitRules,
        Self::StaticUpload,
        Self::ManifestResources,
        Self::Domain,
    ];

    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Origin => "origin",
            Self::Bucket => "bucket",
            Self::Function => "function",
            Self::DefaultRule => "default_rule",
            Self::ExplicitRules => "explicit_rules",
            Self::StaticUpload => "static_upload",
            Self::ManifestResources => "manifest_resources",
            Self::Domain => "domain",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What the origin step will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginAction {
    /// Use the externally managed origin's ID.
    Adopt(ResourceId),
    /// Already tracked.
    Tracked(ResourceId),
    /// Create the default origin.
    Create,
}

/// What the function step will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionAction {
    /// Register the function and attach an instance.
    Create,
    /// Re-upload the code of the tracked function.
    UpdateCode(ResourceId),
}

/// What the explicit rules step will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplicitRulesAction {
    /// Create the platform default rule set.
    CreateDefault,
    /// Rules are declared; the manifest pass handles them.
    Deferred,
    /// Rules are already tracked.
    AlreadyTracked,
}

/// What the static upload step will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticUploadAction {
    /// Upload the static directory.
    Upload,
    /// Script presets serve from the function.
    SkipScriptPreset,
    /// Nothing to upload.
    SkipMissingDirectory,
}

/// Returns true for presets served entirely by the function.
#[must_use]
pub fn is_script_preset(preset: &str) -> bool {
    SCRIPT_PRESETS
        .iter()
        .any(|p| p.eq_ignore_ascii_case(preset.trim()))
}

/// Application gate: create only when untracked.
#[must_use]
pub const fn needs_application(state: &LocalState) -> bool {
    state.application.id.is_none()
}

/// Origin gate.
#[must_use]
pub fn origin_action(manifest: &Manifest, state: &LocalState) -> OriginAction {
    if let Some(id) = manifest.external_origin().and_then(|o| o.id) {
        return OriginAction::Adopt(id);
    }

    state
        .origin
        .id
        .map_or(OriginAction::Create, OriginAction::Tracked)
}

/// Bucket gate: create only when untracked.
#[must_use]
pub const fn needs_bucket(state: &LocalState) -> bool {
    state.bucket.is_none()
}

/// Function gate.
#[must_use]
pub const fn function_action(state: &LocalState) -> FunctionAction {
    match (state.function.id, state.function.instance_id) {
        (Some(id), Some(_)) => FunctionAction::UpdateCode(id),
        _ => FunctionAction::Create,
    }
}

/// Default rule gate: runs exactly once per project.
#[must_use]
pub const fn needs_default_rule(state: &LocalState) -> bool {
    !state.not_first_run
}

/// Explicit rules gate.
#[must_use]
pub fn explicit_rules_action(manifest: &Manifest, state: &LocalState) -> ExplicitRulesAction {
    if !state.rules_engine.rules.is_empty() {
        ExplicitRulesAction::AlreadyTracked
    } else if manifest.declares_rules() {
        ExplicitRulesAction::Deferred
    } else {
        ExplicitRulesAction::CreateDefault
    }
}

/// Static upload gate; either condition skips the upload.
#[must_use]
pub fn static_upload_action(
    preset: &str,
    template: &str,
    static_dir_exists: bool,
) -> StaticUploadAction {
    if is_script_preset(preset) || is_script_preset(template) {
        StaticUploadAction::SkipScriptPreset
    } else if !static_dir_exists {
        StaticUploadAction::SkipMissingDirectory
    } else {
        StaticUploadAction::Upload
    }
}
