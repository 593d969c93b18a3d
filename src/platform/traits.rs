//! Capability traits, one per remote resource kind.
//!
//! The deploy pipeline only talks to the platform through these traits, so
//! the HTTP client can be swapped for test doubles. Implementations may retry
//! internally; callers never do.

use async_trait::async_trait;
use std::path::Path;

use super::types::{
    ApplicationRequest, Behavior, BucketRequest, DomainInfo, DomainRequest, FunctionInstance,
    FunctionRequest, OriginRequest, ResourceId, RuleRequest, UploadSummary,
};
use crate::error::Result;
use crate::manifest::RulePhase;

/// Edge application operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationClient: Send + Sync {
    /// Creates an application and returns its ID.
    async fn create(&self, request: &ApplicationRequest) -> Result<ResourceId>;

    /// Returns the ID of the always-present default rule of a phase.
    async fn get_default_rule(&self, app_id: ResourceId, phase: RulePhase) -> Result<ResourceId>;

    /// Replaces the behaviors of a rule.
    async fn update_rule_behaviors(
        &self,
        app_id: ResourceId,
        phase: RulePhase,
        rule_id: ResourceId,
        behaviors: &[Behavior],
    ) -> Result<()>;

    /// Points the default rule at a function instance.
    async fn publish_default_rule(&self, app_id: ResourceId, instance_id: ResourceId)
    -> Result<()>;
}

/// Origin operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OriginClient: Send + Sync {
    /// Creates the project's default single origin.
    async fn create_single(&self, app_id: ResourceId, request: &OriginRequest)
    -> Result<ResourceId>;

    /// Creates a manifest-declared origin.
    async fn create(&self, app_id: ResourceId, request: &OriginRequest) -> Result<ResourceId>;

    /// Updates an existing origin.
    async fn update(
        &self,
        app_id: ResourceId,
        origin_id: ResourceId,
        request: &OriginRequest,
    ) -> Result<()>;
}

/// Storage bucket operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BucketClient: Send + Sync {
    /// Creates a bucket and returns its name.
    async fn create(&self, request: &BucketRequest) -> Result<String>;
}

/// Edge function operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FunctionClient: Send + Sync {
    /// Registers a function and attaches an instance of it to the application.
    async fn create_instance(
        &self,
        app_id: ResourceId,
        request: &FunctionRequest,
    ) -> Result<FunctionInstance>;

    /// Replaces the code of an existing function.
    async fn update_code(&self, function_id: ResourceId, request: &FunctionRequest) -> Result<()>;
}

/// Domain operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainClient: Send + Sync {
    /// Fetches the tracked domain, or creates one bound to the application.
    async fn create_or_get(
        &self,
        app_id: ResourceId,
        existing_id: Option<ResourceId>,
        request: &DomainRequest,
    ) -> Result<DomainInfo>;
}

/// Rules engine operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RulesEngineClient: Send + Sync {
    /// Creates the platform default rule set and returns its rule ID.
    async fn create_default(&self, app_id: ResourceId, phase: RulePhase) -> Result<ResourceId>;

    /// Creates a rule.
    async fn create(&self, app_id: ResourceId, rule: &RuleRequest) -> Result<ResourceId>;

    /// Updates a rule.
    async fn update(&self, app_id: ResourceId, rule_id: ResourceId, rule: &RuleRequest)
    -> Result<()>;

    /// Deletes a rule.
    async fn delete(&self, app_id: ResourceId, phase: RulePhase, rule_id: ResourceId)
    -> Result<()>;
}

/// Static asset upload.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StaticUploader: Send + Sync {
    /// Uploads every file under `dir` into `bucket`, keyed by relative path.
    async fn upload_dir(&self, bucket: &str, dir: &Path) -> Result<UploadSummary>;
}
