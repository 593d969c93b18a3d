//! State types for tracking provisioned resources.
//!
//! `LocalState` is the sole source of truth for "does X already exist". IDs are
//! platform-assigned and only ever stored, never guessed; an unprovisioned
//! resource is `null` in the file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::manifest::RulePhase;

/// Current version of the state format.
pub const STATE_VERSION: &str = "1.0";

/// Maximum number of history entries kept.
pub const MAX_HISTORY_ENTRIES: usize = 20;

/// Persisted per-project deployment state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalState {
    /// State format version.
    pub version: String,
    /// Project name.
    pub name: String,
    /// The project application.
    #[serde(default)]
    pub application: ApplicationState,
    /// The default origin.
    #[serde(default)]
    pub origin: OriginState,
    /// Name of the project bucket.
    #[serde(default)]
    pub bucket: Option<String>,
    /// The project function and its instance.
    #[serde(default)]
    pub function: FunctionState,
    /// Tracked rules engine rules.
    #[serde(default)]
    pub rules_engine: RulesEngineState,
    /// The project domain.
    #[serde(default)]
    pub domain: DomainState,
    /// Manifest-declared origins beyond the default one.
    #[serde(default)]
    pub origins: Vec<NamedResource>,
    /// Manifest-declared buckets beyond the project bucket.
    #[serde(default)]
    pub buckets: Vec<String>,
    /// Set once the default rule has been configured; never reset.
    #[serde(default)]
    pub not_first_run: bool,
    /// Declared preset (language or framework).
    #[serde(default)]
    pub preset: String,
    /// Declared template.
    #[serde(default)]
    pub template: String,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
    /// Recent successful deploys, newest last.
    #[serde(default)]
    pub history: Vec<DeployHistoryEntry>,
}

/// Tracked application.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationState {
    /// Platform ID.
    pub id: Option<u64>,
}

/// Tracked default origin.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OriginState {
    /// Platform ID.
    pub id: Option<u64>,
}

/// Tracked function.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionState {
    /// Function ID.
    pub id: Option<u64>,
    /// ID of the function instance attached to the application.
    pub instance_id: Option<u64>,
    /// Source file uploaded as the function code.
    pub file: Option<String>,
}

/// Tracked rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RulesEngineState {
    /// Rules created by deploys.
    pub rules: Vec<RuleRef>,
}

/// Tracked domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainState {
    /// Platform ID.
    pub id: Option<u64>,
    /// Hostname assigned by the platform.
    pub name: Option<String>,
}

/// A rule tracked in local state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleRef {
    /// Platform ID.
    pub id: u64,
    /// Rule name.
    pub name: String,
    /// Phase the rule runs in.
    pub phase: RulePhase,
}

/// A manifest resource tracked by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamedResource {
    /// Declared name.
    pub name: String,
    /// Platform ID.
    pub id: u64,
}

/// A single successful deploy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeployHistoryEntry {
    /// When the deploy finished.
    pub timestamp: DateTime<Utc>,
    /// Preset in effect.
    pub preset: String,
    /// Domain the project was served on.
    pub domain: Option<String>,
    /// Steps that performed work.
    pub steps: Vec<String>,
}

impl LocalState {
    /// Creates a state for a project that has never been deployed.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            name: name.to_string(),
            application: ApplicationState::default(),
            origin: OriginState::default(),
            bucket: None,
            function: FunctionState::default(),
            rules_engine: RulesEngineState::default(),
            domain: DomainState::default(),
            origins: Vec::new(),
            buckets: Vec::new(),
            not_first_run: false,
            preset: String::new(),
            template: String::new(),
            last_updated: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Finds a tracked rule by phase and name.
    #[must_use]
    pub fn tracked_rule(&self, phase: RulePhase, name: &str) -> Option<&RuleRef> {
        self.rules_engine
            .rules
            .iter()
            .find(|r| r.phase == phase && r.name == name)
    }

    /// Adds or replaces a tracked rule.
    pub fn track_rule(&mut self, rule: RuleRef) {
        self.rules_engine
            .rules
            .retain(|r| !(r.phase == rule.phase && r.name == rule.name));
        self.rules_engine.rules.push(rule);
        self.touch();
    }

    /// Stops tracking a rule.
    pub fn untrack_rule(&mut self, id: u64) {
        self.rules_engine.rules.retain(|r| r.id != id);
        self.touch();
    }

    /// Finds a tracked manifest origin by name.
    #[must_use]
    pub fn tracked_origin(&self, name: &str) -> Option<u64> {
        self.origins.iter().find(|o| o.name == name).map(|o| o.id)
    }

    /// Adds a tracked manifest origin.
    pub fn track_origin(&mut self, name: &str, id: u64) {
        self.origins.retain(|o| o.name != name);
        self.origins.push(NamedResource {
            name: name.to_string(),
            id,
        });
        self.touch();
    }

    /// Returns true if the manifest bucket is tracked.
    #[must_use]
    pub fn tracks_bucket(&self, name: &str) -> bool {
        self.bucket.as_deref() == Some(name) || self.buckets.iter().any(|b| b == name)
    }

    /// Number of tracked remote resources.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        usize::from(self.application.id.is_some())
            + usize::from(self.origin.id.is_some())
            + usize::from(self.bucket.is_some())
            + usize::from(self.function.id.is_some())
            + usize::from(self.domain.id.is_some())
            + self.rules_engine.rules.len()
            + self.origins.len()
            + self.buckets.len()
    }

    /// Appends a history entry, keeping only the most recent ones.
    pub fn add_history(&mut self, entry: DeployHistoryEntry) {
        self.history.push(entry);

        if self.history.len() > MAX_HISTORY_ENTRIES {
            let excess = self.history.len() - MAX_HISTORY_ENTRIES;
            self.history.drain(0..excess);
        }
        self.touch();
    }

    /// Updates the last-modified timestamp.
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

impl DeployHistoryEntry {
    /// Creates an entry stamped now.
    #[must_use]
    pub fn new(preset: &str, domain: Option<String>, steps: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            preset: preset.to_string(),
            domain,
            steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_unprovisioned() {
        let state = LocalState::new("shop");
        assert_eq!(state.version, STATE_VERSION);
        assert!(!state.not_first_run);
        assert_eq!(state.resource_count(), 0);
    }

    #[test]
    fn test_unset_ids_serialize_as_null() {
        let state = LocalState::new("shop");
        let json: serde_json::Value = serde_json::to_value(&state).unwrap();

        assert!(json["application"]["id"].is_null());
        assert!(json["origin"]["id"].is_null());
        assert!(json["function"]["instance_id"].is_null());
        assert!(json["domain"]["name"].is_null());
        assert_eq!(json["rules_engine"]["rules"], serde_json::json!([]));
        assert_eq!(json["not_first_run"], false);
    }

    #[test]
    fn test_track_rule_replaces_by_name() {
        let mut state = LocalState::new("shop");
        state.track_rule(RuleRef {
            id: 1,
            name: String::from("api"),
            phase: RulePhase::Request,
        });
        state.track_rule(RuleRef {
            id: 2,
            name: String::from("api"),
            phase: RulePhase::Request,
        });

        assert_eq!(state.rules_engine.rules.len(), 1);
        assert_eq!(state.tracked_rule(RulePhase::Request, "api").map(|r| r.id), Some(2));
        assert!(state.tracked_rule(RulePhase::Response, "api").is_none());

        state.untrack_rule(2);
        assert!(state.rules_engine.rules.is_empty());
    }

    #[test]
    fn test_history_is_capped() {
        let mut state = LocalState::new("shop");
        for i in 0..25 {
            state.add_history(DeployHistoryEntry::new("other", Some(format!("d{i}")), vec![]));
        }

        assert_eq!(state.history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(state.history[0].domain.as_deref(), Some("d5"));
    }
}
