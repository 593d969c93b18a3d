//! Ordered, idempotent deploy pipeline.
//!
//! Steps run strictly in `Step::ALL` order. Each reads the IDs earlier steps
//! recorded in `LocalState`, writes its own, and the state is saved after
//! every mutating step. The first failing step aborts the run; remote
//! resources created before it are kept and stay tracked.

use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use super::mapping::{self, References};
use super::naming;
use super::options::DeployOptions;
use super::result::{DeployResult, StepOutcome, StepPreview, StepReport};
use super::step::{
    self, ExplicitRulesAction, FunctionAction, OriginAction, StaticUploadAction, Step,
};
use crate::error::{DeployError, EdgeDeployError, Result};
use crate::manifest::{BEHAVIOR_SET_ORIGIN, Manifest, RulePhase};
use crate::platform::{Behavior, Clients, DEFAULT_RULE_SET_NAME, DomainInfo};
use crate::state::{DeployHistoryEntry, LocalState, RuleRef, StateStore};

/// Drives the resource clients through the deploy pipeline.
pub struct Orchestrator<'a, S: StateStore> {
    /// Run options.
    options: &'a DeployOptions,
    /// Resource clients.
    clients: &'a Clients,
    /// State store.
    store: &'a S,
}

/// Per-run bookkeeping.
struct Run<'m> {
    manifest: &'m Manifest,
    preset: String,
    template: String,
    warnings: Vec<String>,
    domain: Option<DomainInfo>,
}

impl<'a, S: StateStore> Orchestrator<'a, S> {
    /// Creates a new orchestrator.
    #[must_use]
    pub const fn new(options: &'a DeployOptions, clients: &'a Clients, store: &'a S) -> Self {
        Self {
            options,
            clients,
            store,
        }
    }

    /// Runs the full pipeline against `state`.
    ///
    /// `state` is updated in place as steps complete, so after a failure it
    /// still records every resource created before the failing step.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::ArtifactNotFound` before any remote call if the
    /// function artifact is missing, and `DeployError::StepFailed` naming the
    /// step if any step fails.
    pub async fn deploy(&self, manifest: &Manifest, state: &mut LocalState) -> Result<DeployResult> {
        let artifact = self.options.resolve(&self.function_file(manifest));
        if !artifact.is_file() {
            return Err(DeployError::ArtifactNotFound { path: artifact }.into());
        }

        let mut run = Run {
            manifest,
            preset: self.resolve_preset(state),
            template: self.resolve_template(state),
            warnings: Vec::new(),
            domain: None,
        };

        info!(
            "Deploying project '{}' (preset: {})",
            state.name,
            display_preset(&run.preset)
        );

        let mut reports = Vec::with_capacity(Step::ALL.len());

        for step in Step::ALL {
            debug!("Running step '{step}'");

            let report = match self.run_step(step, &mut run, state).await {
                Ok(report) => report,
                Err(e) => {
                    error!("Deploy step '{step}' failed: {e}");
                    return Err(DeployError::step_failed(step, e).into());
                }
            };

            if report.outcome.did_work() {
                info!("[{step}] {}: {}", report.outcome, report.detail);
            } else {
                debug!("[{step}] skipped: {}", report.detail);
            }
            reports.push(report);
        }

        let domain = run
            .domain
            .take()
            .ok_or_else(|| EdgeDeployError::internal("Domain step produced no domain"))?;

        let worked = reports
            .iter()
            .filter(|r| r.outcome.did_work())
            .map(|r| r.step.to_string())
            .collect();
        state.add_history(DeployHistoryEntry::new(
            &run.preset,
            Some(domain.name.clone()),
            worked,
        ));
        self.persist(state, Step::Domain, &mut run.warnings).await;

        info!("Deploy of '{}' complete: https://{}", state.name, domain.name);

        Ok(DeployResult {
            url: format!("https://{}", domain.name),
            domain_name: domain.name,
            steps: reports,
            warnings: run.warnings,
        })
    }

    /// Describes what `deploy` would do, without any remote call.
    #[must_use]
    pub fn preview(&self, manifest: &Manifest, state: &LocalState) -> Vec<StepPreview> {
        let preset = self.resolve_preset(state);
        let template = self.resolve_template(state);

        Step::ALL
            .iter()
            .map(|&step| {
                let (outcome, detail) =
                    self.preview_step(step, manifest, state, &preset, &template);
                StepPreview {
                    step,
                    outcome,
                    detail,
                }
            })
            .collect()
    }

    fn preview_step(
        &self,
        step: Step,
        manifest: &Manifest,
        state: &LocalState,
        preset: &str,
        template: &str,
    ) -> (StepOutcome, String) {
        match step {
            Step::Application => match state.application.id {
                Some(id) => (StepOutcome::Skipped, format!("application {id} exists")),
                None => (
                    StepOutcome::Created,
                    format!(
                        "create application '{}'",
                        mapping::application_request(&state.name, manifest).name
                    ),
                ),
            },
            Step::Origin => match step::origin_action(manifest, state) {
                OriginAction::Adopt(id) => {
                    (StepOutcome::Adopted, format!("adopt external origin {id}"))
                }
                OriginAction::Tracked(id) => (StepOutcome::Skipped, format!("origin {id} exists")),
                OriginAction::Create => (
                    StepOutcome::Created,
                    format!(
                        "create origin '{}'",
                        mapping::default_origin_request(&state.name, manifest).name
                    ),
                ),
            },
            Step::Bucket => match &state.bucket {
                Some(name) => (StepOutcome::Skipped, format!("bucket '{name}' exists")),
                None => {
                    let name = manifest.project_bucket().map_or_else(
                        || String::from("derived from the application ID"),
                        |b| format!("'{}'", b.name),
                    );
                    (StepOutcome::Created, format!("create bucket {name}"))
                }
            },
            Step::Function => {
                let file = self.function_file(manifest);
                match step::function_action(state) {
                    FunctionAction::Create => (
                        StepOutcome::Created,
                        format!("register {}", file.display()),
                    ),
                    FunctionAction::UpdateCode(id) => (
                        StepOutcome::Updated,
                        format!("upload {} to function {id}", file.display()),
                    ),
                }
            }
            Step::DefaultRule => {
                if !step::needs_default_rule(state) {
                    (StepOutcome::Skipped, String::from("already configured"))
                } else if step::is_script_preset(preset) {
                    (StepOutcome::Updated, String::from("run the function"))
                } else {
                    (StepOutcome::Updated, String::from("route to the default origin"))
                }
            }
            Step::ExplicitRules => match step::explicit_rules_action(manifest, state) {
                ExplicitRulesAction::CreateDefault => {
                    (StepOutcome::Created, String::from("create default rule set"))
                }
                ExplicitRulesAction::Deferred => {
                    (StepOutcome::Skipped, String::from("rules declared in manifest"))
                }
                ExplicitRulesAction::AlreadyTracked => (
                    StepOutcome::Skipped,
                    format!("{} rules tracked", state.rules_engine.rules.len()),
                ),
            },
            Step::StaticUpload => {
                let dir = self.options.static_path();
                upload_decision(
                    step::static_upload_action(preset, template, dir.is_dir()),
                    &dir,
                )
            }
            Step::ManifestResources => {
                let creates = manifest
                    .extra_origins()
                    .filter(|o| state.tracked_origin(&o.name).is_none())
                    .count()
                    + manifest
                        .extra_buckets()
                        .filter(|b| !state.tracks_bucket(&b.name))
                        .count()
                    + manifest
                        .rules
                        .iter()
                        .filter(|r| state.tracked_rule(r.phase, &r.name).is_none())
                        .count();
                let declared =
                    manifest.extra_origins().count() + manifest.extra_buckets().count() + manifest.rules.len();
                let deletes = if manifest.declares_rules() {
                    stale_rules(manifest, state).len()
                } else {
                    0
                };
                let updates = declared - creates;

                let outcome = if creates > 0 {
                    StepOutcome::Created
                } else if updates + deletes > 0 {
                    StepOutcome::Updated
                } else {
                    StepOutcome::Skipped
                };
                (
                    outcome,
                    format!("{creates} to create, {updates} to update, {deletes} to delete"),
                )
            }
            Step::Domain => match &state.domain.name {
                Some(name) => (StepOutcome::Completed, format!("serve on {name}")),
                None => (
                    StepOutcome::Created,
                    format!(
                        "create domain '{}'",
                        mapping::domain_request(&state.name, manifest).name
                    ),
                ),
            },
        }
    }

    async fn run_step(
        &self,
        step: Step,
        run: &mut Run<'_>,
        state: &mut LocalState,
    ) -> Result<StepReport> {
        match step {
            Step::Application => self.application(run, state).await,
            Step::Origin => self.origin(run, state).await,
            Step::Bucket => self.bucket(run, state).await,
            Step::Function => self.function(run, state).await,
            Step::DefaultRule => self.default_rule(run, state).await,
            Step::ExplicitRules => self.explicit_rules(run, state).await,
            Step::StaticUpload => self.static_upload(run, state).await,
            Step::ManifestResources => self.manifest_resources(run, state).await,
            Step::Domain => self.domain(run, state).await,
        }
    }

    async fn application(&self, run: &mut Run<'_>, state: &mut LocalState) -> Result<StepReport> {
        if !step::needs_application(state) {
            if state.preset != run.preset || state.template != run.template {
                state.preset.clone_from(&run.preset);
                state.template.clone_from(&run.template);
                self.persist(state, Step::Application, &mut run.warnings)
                    .await;
            }
            return Ok(report(
                Step::Application,
                StepOutcome::Skipped,
                format!(
                    "application {} already provisioned",
                    state.application.id.unwrap_or_default()
                ),
            ));
        }

        let request = mapping::application_request(&state.name, run.manifest);
        let id = self.clients.application.create(&request).await?;

        state.application.id = Some(id);
        state.preset.clone_from(&run.preset);
        state.template.clone_from(&run.template);
        self.persist(state, Step::Application, &mut run.warnings)
            .await;

        Ok(report(
            Step::Application,
            StepOutcome::Created,
            format!("application '{}' ({id})", request.name),
        ))
    }

    async fn origin(&self, run: &mut Run<'_>, state: &mut LocalState) -> Result<StepReport> {
        let app_id = require(state.application.id, Step::Origin, "an application")?;

        match step::origin_action(run.manifest, state) {
            OriginAction::Adopt(id) => {
                if state.origin.id != Some(id) {
                    state.origin.id = Some(id);
                    self.persist(state, Step::Origin, &mut run.warnings).await;
                }
                Ok(report(
                    Step::Origin,
                    StepOutcome::Adopted,
                    format!("externally managed origin {id}"),
                ))
            }
            OriginAction::Tracked(id) => Ok(report(
                Step::Origin,
                StepOutcome::Skipped,
                format!("origin {id} already provisioned"),
            )),
            OriginAction::Create => {
                let request = mapping::default_origin_request(&state.name, run.manifest);
                let id = self.clients.origin.create_single(app_id, &request).await?;

                state.origin.id = Some(id);
                self.persist(state, Step::Origin, &mut run.warnings).await;

                Ok(report(
                    Step::Origin,
                    StepOutcome::Created,
                    format!("origin '{}' ({id})", request.name),
                ))
            }
        }
    }

    async fn bucket(&self, run: &mut Run<'_>, state: &mut LocalState) -> Result<StepReport> {
        if !step::needs_bucket(state) {
            return Ok(report(
                Step::Bucket,
                StepOutcome::Skipped,
                format!(
                    "bucket '{}' already provisioned",
                    state.bucket.as_deref().unwrap_or_default()
                ),
            ));
        }

        let app_id = require(state.application.id, Step::Bucket, "an application")?;
        let name = naming::project_bucket_name(run.manifest, &state.name, app_id);
        let request = mapping::bucket_request(&name, run.manifest.project_bucket());
        let created = self.clients.bucket.create(&request).await?;

        let detail = format!("bucket '{created}'");
        state.bucket = Some(created);
        self.persist(state, Step::Bucket, &mut run.warnings).await;

        Ok(report(Step::Bucket, StepOutcome::Created, detail))
    }

    async fn function(&self, run: &mut Run<'_>, state: &mut LocalState) -> Result<StepReport> {
        let app_id = require(state.application.id, Step::Function, "an application")?;

        let file = self.function_file(run.manifest);
        let path = self.options.resolve(&file);
        let code = tokio::fs::read_to_string(&path).await?;
        let file = file.display().to_string();
        let request =
            mapping::function_request(&state.name, run.manifest, self.options, &file, code);

        match step::function_action(state) {
            FunctionAction::UpdateCode(id) => {
                self.clients.function.update_code(id, &request).await?;

                if state.function.file.as_deref() != Some(file.as_str()) {
                    state.function.file = Some(file.clone());
                    self.persist(state, Step::Function, &mut run.warnings)
                        .await;
                }

                Ok(report(
                    Step::Function,
                    StepOutcome::Updated,
                    format!("uploaded {file} to function {id}"),
                ))
            }
            FunctionAction::Create => {
                let instance = self
                    .clients
                    .function
                    .create_instance(app_id, &request)
                    .await?;

                state.function.id = Some(instance.function_id);
                state.function.instance_id = Some(instance.instance_id);
                state.function.file = Some(file.clone());
                self.persist(state, Step::Function, &mut run.warnings)
                    .await;

                Ok(report(
                    Step::Function,
                    StepOutcome::Created,
                    format!(
                        "function '{}' ({}) from {file}, instance {}",
                        request.name, instance.function_id, instance.instance_id
                    ),
                ))
            }
        }
    }

    async fn default_rule(&self, run: &mut Run<'_>, state: &mut LocalState) -> Result<StepReport> {
        if !step::needs_default_rule(state) {
            return Ok(report(
                Step::DefaultRule,
                StepOutcome::Skipped,
                String::from("default rule already configured"),
            ));
        }

        let app_id = require(state.application.id, Step::DefaultRule, "an application")?;
        let rule_id = self
            .clients
            .application
            .get_default_rule(app_id, RulePhase::Request)
            .await?;

        let detail = if step::is_script_preset(&run.preset) {
            let instance = require(
                state.function.instance_id,
                Step::DefaultRule,
                "a function instance",
            )?;
            self.clients
                .application
                .publish_default_rule(app_id, instance)
                .await?;
            format!("default rule {rule_id} runs function instance {instance}")
        } else {
            let origin = require(state.origin.id, Step::DefaultRule, "an origin")?;
            let behaviors = [Behavior::with_target(BEHAVIOR_SET_ORIGIN, origin)];
            self.clients
                .application
                .update_rule_behaviors(app_id, RulePhase::Request, rule_id, &behaviors)
                .await?;
            format!("default rule {rule_id} routes to origin {origin}")
        };

        state.not_first_run = true;
        self.persist(state, Step::DefaultRule, &mut run.warnings)
            .await;

        Ok(report(Step::DefaultRule, StepOutcome::Updated, detail))
    }

    async fn explicit_rules(&self, run: &mut Run<'_>, state: &mut LocalState) -> Result<StepReport> {
        match step::explicit_rules_action(run.manifest, state) {
            ExplicitRulesAction::AlreadyTracked => Ok(report(
                Step::ExplicitRules,
                StepOutcome::Skipped,
                format!("{} rules already tracked", state.rules_engine.rules.len()),
            )),
            ExplicitRulesAction::Deferred => Ok(report(
                Step::ExplicitRules,
                StepOutcome::Skipped,
                String::from("rules declared in manifest"),
            )),
            ExplicitRulesAction::CreateDefault => {
                let app_id = require(state.application.id, Step::ExplicitRules, "an application")?;
                let id = self
                    .clients
                    .rules_engine
                    .create_default(app_id, RulePhase::Request)
                    .await?;

                state.track_rule(RuleRef {
                    id,
                    name: DEFAULT_RULE_SET_NAME.to_string(),
                    phase: RulePhase::Request,
                });
                self.persist(state, Step::ExplicitRules, &mut run.warnings)
                    .await;

                Ok(report(
                    Step::ExplicitRules,
                    StepOutcome::Created,
                    format!("default rule set ({id})"),
                ))
            }
        }
    }

    async fn static_upload(&self, run: &mut Run<'_>, state: &mut LocalState) -> Result<StepReport> {
        let dir = self.options.static_path();
        let action = step::static_upload_action(&run.preset, &run.template, dir.is_dir());

        if action != StaticUploadAction::Upload {
            let (outcome, detail) = upload_decision(action, &dir);
            return Ok(report(Step::StaticUpload, outcome, detail));
        }

        let bucket = require(state.bucket.clone(), Step::StaticUpload, "a bucket")?;
        let summary = self.clients.uploader.upload_dir(&bucket, &dir).await?;

        Ok(report(
            Step::StaticUpload,
            StepOutcome::Completed,
            format!(
                "{} files ({} bytes) uploaded to '{bucket}'",
                summary.files, summary.bytes
            ),
        ))
    }

    async fn manifest_resources(
        &self,
        run: &mut Run<'_>,
        state: &mut LocalState,
    ) -> Result<StepReport> {
        let manifest = run.manifest;
        let app_id = require(
            state.application.id,
            Step::ManifestResources,
            "an application",
        )?;
        let (mut created, mut updated, mut deleted) = (0_usize, 0_usize, 0_usize);

        for decl in manifest.extra_origins() {
            let request = mapping::origin_request(decl);
            if let Some(id) = state.tracked_origin(&decl.name) {
                self.clients.origin.update(app_id, id, &request).await?;
                updated += 1;
            } else {
                let id = self.clients.origin.create(app_id, &request).await?;
                state.track_origin(&decl.name, id);
                self.persist(state, Step::ManifestResources, &mut run.warnings)
                    .await;
                created += 1;
            }
        }

        for decl in manifest.extra_buckets() {
            if state.tracks_bucket(&decl.name) {
                continue;
            }
            let request = mapping::bucket_request(&decl.name, Some(decl));
            let name = self.clients.bucket.create(&request).await?;
            state.buckets.push(name);
            state.touch();
            self.persist(state, Step::ManifestResources, &mut run.warnings)
                .await;
            created += 1;
        }

        if manifest.declares_rules() {
            let refs = References::collect(manifest, state);
            let requests = manifest
                .rules
                .iter()
                .map(|rule| mapping::rule_request(rule, &refs))
                .collect::<Result<Vec<_>>>()?;

            for request in &requests {
                let tracked = state
                    .tracked_rule(request.phase, &request.name)
                    .map(|r| r.id);
                if let Some(id) = tracked {
                    self.clients.rules_engine.update(app_id, id, request).await?;
                    updated += 1;
                } else {
                    let id = self.clients.rules_engine.create(app_id, request).await?;
                    state.track_rule(RuleRef {
                        id,
                        name: request.name.clone(),
                        phase: request.phase,
                    });
                    self.persist(state, Step::ManifestResources, &mut run.warnings)
                        .await;
                    created += 1;
                }
            }

            for rule in stale_rules(manifest, state) {
                self.clients
                    .rules_engine
                    .delete(app_id, rule.phase, rule.id)
                    .await?;
                state.untrack_rule(rule.id);
                self.persist(state, Step::ManifestResources, &mut run.warnings)
                    .await;
                deleted += 1;
            }
        }

        let outcome = if created > 0 {
            StepOutcome::Created
        } else if updated + deleted > 0 {
            StepOutcome::Updated
        } else {
            StepOutcome::Skipped
        };

        Ok(report(
            Step::ManifestResources,
            outcome,
            format!("{created} created, {updated} updated, {deleted} deleted"),
        ))
    }

    async fn domain(&self, run: &mut Run<'_>, state: &mut LocalState) -> Result<StepReport> {
        let app_id = require(state.application.id, Step::Domain, "an application")?;
        let request = mapping::domain_request(&state.name, run.manifest);
        let existing = state.domain.id;

        let domain = self
            .clients
            .domain
            .create_or_get(app_id, existing, &request)
            .await?;

        if state.domain.id != Some(domain.id)
            || state.domain.name.as_deref() != Some(domain.name.as_str())
        {
            state.domain.id = Some(domain.id);
            state.domain.name = Some(domain.name.clone());
            self.persist(state, Step::Domain, &mut run.warnings).await;
        }

        let outcome = if existing == Some(domain.id) {
            StepOutcome::Completed
        } else {
            StepOutcome::Created
        };
        let detail = format!("domain {} ({})", domain.name, domain.id);
        run.domain = Some(domain);

        Ok(report(Step::Domain, outcome, detail))
    }

    /// Saves state; failures are recorded as warnings and never abort the run.
    async fn persist(&self, state: &mut LocalState, step: Step, warnings: &mut Vec<String>) {
        state.touch();
        if let Err(e) = self.store.save(state).await {
            warn!("Failed to save state after step '{step}': {e}");
            warnings.push(format!("State not saved after step '{step}': {e}"));
        }
    }

    /// Function source as declared: the manifest path, else the build artifact.
    fn function_file(&self, manifest: &Manifest) -> PathBuf {
        manifest
            .function()
            .and_then(|f| f.path.clone())
            .unwrap_or_else(|| self.options.artifact.clone())
    }

    fn resolve_preset(&self, state: &LocalState) -> String {
        self.options
            .preset
            .clone()
            .unwrap_or_else(|| state.preset.clone())
    }

    fn resolve_template(&self, state: &LocalState) -> String {
        self.options
            .template
            .clone()
            .unwrap_or_else(|| state.template.clone())
    }
}

/// Tracked rules the manifest no longer declares.
fn stale_rules(manifest: &Manifest, state: &LocalState) -> Vec<RuleRef> {
    state
        .rules_engine
        .rules
        .iter()
        .filter(|tracked| {
            !manifest
                .rules
                .iter()
                .any(|d| d.phase == tracked.phase && d.name == tracked.name)
        })
        .cloned()
        .collect()
}

fn upload_decision(action: StaticUploadAction, dir: &std::path::Path) -> (StepOutcome, String) {
    match action {
        StaticUploadAction::Upload => (
            StepOutcome::Completed,
            format!("upload {}", dir.display()),
        ),
        StaticUploadAction::SkipScriptPreset => (
            StepOutcome::Skipped,
            String::from("script presets are served by the function"),
        ),
        StaticUploadAction::SkipMissingDirectory => (
            StepOutcome::Skipped,
            format!("no static directory at {}", dir.display()),
        ),
    }
}

fn require<T>(value: Option<T>, step: Step, missing: &str) -> Result<T> {
    value.ok_or_else(|| {
        DeployError::MissingPrerequisite {
            step,
            missing: missing.to_string(),
        }
        .into()
    })
}

fn report(step: Step, outcome: StepOutcome, detail: String) -> StepReport {
    StepReport {
        step,
        outcome,
        detail,
    }
}

fn display_preset(preset: &str) -> &str {
    if preset.is_empty() { "none" } else { preset }
}
