use mockall::Sequence;
use std::path::Path;
use tempfile::TempDir;

use super::*;
use crate::error::{DeployError, EdgeDeployError, PlatformError, StateError};
use crate::manifest::{Manifest, ManifestFormat, ManifestLoader, RulePhase};
use crate::platform::{
    Clients, DomainInfo, FunctionInstance, MockApplicationClient, MockBucketClient,
    MockDomainClient, MockFunctionClient, MockOriginClient, MockRulesEngineClient,
    MockStaticUploader, ResourceId, UploadSummary,
};
use crate::state::{LocalState, LocalStateStore, MockStateStore, RuleRef, StateStore};

const APP_ID: ResourceId = 1001;
const ORIGIN_ID: ResourceId = 2001;
const FUNCTION_ID: ResourceId = 3001;
const INSTANCE_ID: ResourceId = 3002;
const DEFAULT_RULE_ID: ResourceId = 4001;
const DEFAULT_SET_ID: ResourceId = 4002;
const DOMAIN_ID: ResourceId = 5001;
const DOMAIN_NAME: &str = "xyz123.map.azionedge.net";

struct Mocks {
    application: MockApplicationClient,
    origin: MockOriginClient,
    bucket: MockBucketClient,
    function: MockFunctionClient,
    domain: MockDomainClient,
    rules_engine: MockRulesEngineClient,
    uploader: MockStaticUploader,
}

impl Mocks {
    fn new() -> Self {
        Self {
            application: MockApplicationClient::new(),
            origin: MockOriginClient::new(),
            bucket: MockBucketClient::new(),
            function: MockFunctionClient::new(),
            domain: MockDomainClient::new(),
            rules_engine: MockRulesEngineClient::new(),
            uploader: MockStaticUploader::new(),
        }
    }

    fn into_clients(self) -> Clients {
        Clients {
            application: Box::new(self.application),
            origin: Box::new(self.origin),
            bucket: Box::new(self.bucket),
            function: Box::new(self.function),
            domain: Box::new(self.domain),
            rules_engine: Box::new(self.rules_engine),
            uploader: Box::new(self.uploader),
        }
    }

    fn expect_application(&mut self, seq: &mut Sequence) {
        self.application
            .expect_create()
            .withf(|req| req.name == "shop" && req.edge_functions)
            .times(1)
            .in_sequence(seq)
            .returning(|_| Ok(APP_ID));
    }

    fn expect_default_origin(&mut self, seq: &mut Sequence, name: &'static str) {
        self.origin
            .expect_create_single()
            .withf(move |app, req| *app == APP_ID && req.name == name)
            .times(1)
            .in_sequence(seq)
            .returning(|_, _| Ok(ORIGIN_ID));
    }

    fn expect_bucket(&mut self, seq: &mut Sequence) {
        self.bucket
            .expect_create()
            .withf(|req| req.name.starts_with("shop-") && req.edge_access == "read_only")
            .times(1)
            .in_sequence(seq)
            .returning(|req| Ok(req.name.clone()));
    }

    fn expect_function(&mut self, seq: &mut Sequence) {
        self.function
            .expect_create_instance()
            .withf(|app, req| {
                *app == APP_ID
                    && req.code.contains("addEventListener")
                    && req.initiator_type == "edge_application"
            })
            .times(1)
            .in_sequence(seq)
            .returning(|_, _| {
                Ok(FunctionInstance {
                    function_id: FUNCTION_ID,
                    instance_id: INSTANCE_ID,
                })
            });
    }

    fn expect_default_rule_lookup(&mut self, seq: &mut Sequence) {
        self.application
            .expect_get_default_rule()
            .withf(|app, phase| *app == APP_ID && *phase == RulePhase::Request)
            .times(1)
            .in_sequence(seq)
            .returning(|_, _| Ok(DEFAULT_RULE_ID));
    }

    fn expect_route_to_origin(&mut self, seq: &mut Sequence, origin: ResourceId) {
        self.application
            .expect_update_rule_behaviors()
            .withf(move |app, phase, rule, behaviors| {
                let target = origin.to_string();
                *app == APP_ID
                    && *phase == RulePhase::Request
                    && *rule == DEFAULT_RULE_ID
                    && behaviors.len() == 1
                    && behaviors[0].name == "set_origin"
                    && behaviors[0].target.as_deref() == Some(target.as_str())
            })
            .times(1)
            .in_sequence(seq)
            .returning(|_, _, _, _| Ok(()));
        self.application.expect_publish_default_rule().times(0);
    }

    fn expect_default_rule_set(&mut self, seq: &mut Sequence) {
        self.rules_engine
            .expect_create_default()
            .withf(|app, phase| *app == APP_ID && *phase == RulePhase::Request)
            .times(1)
            .in_sequence(seq)
            .returning(|_, _| Ok(DEFAULT_SET_ID));
    }

    fn expect_domain(&mut self, seq: &mut Sequence, existing: Option<ResourceId>) {
        self.domain
            .expect_create_or_get()
            .withf(move |app, id, req| *app == APP_ID && *id == existing && req.name == "shop")
            .times(1)
            .in_sequence(seq)
            .returning(|_, _, _| {
                Ok(DomainInfo {
                    id: DOMAIN_ID,
                    name: DOMAIN_NAME.to_string(),
                })
            });
    }

    /// Every call a first deploy of an "other" preset project makes, in order.
    fn expect_fresh_deploy(&mut self, seq: &mut Sequence) {
        self.expect_application(seq);
        self.expect_default_origin(seq, "shop-single");
        self.expect_bucket(seq);
        self.expect_function(seq);
        self.expect_default_rule_lookup(seq);
        self.expect_route_to_origin(seq, ORIGIN_ID);
        self.expect_default_rule_set(seq);
        self.expect_domain(seq, None);
    }
}

fn project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".edge")).unwrap();
    std::fs::write(
        dir.path().join(".edge/worker.js"),
        "addEventListener('fetch', (event) => event.respondWith(new Response('ok')));",
    )
    .unwrap();
    dir
}

fn add_static_files(dir: &Path) {
    let storage = dir.join(".edge/storage");
    std::fs::create_dir_all(&storage).unwrap();
    std::fs::write(storage.join("index.html"), "<h1>shop</h1>").unwrap();
}

fn manifest(json: &str) -> Manifest {
    ManifestLoader::parse_str(json, ManifestFormat::Json, None).unwrap()
}

/// State as left behind by a successful first deploy.
fn deployed_state() -> LocalState {
    let mut state = LocalState::new("shop");
    state.application.id = Some(APP_ID);
    state.origin.id = Some(ORIGIN_ID);
    state.bucket = Some(String::from("shop-1a2b3c4d"));
    state.function.id = Some(FUNCTION_ID);
    state.function.instance_id = Some(INSTANCE_ID);
    state.function.file = Some(String::from(".edge/worker.js"));
    state.track_rule(RuleRef {
        id: DEFAULT_SET_ID,
        name: String::from("default"),
        phase: RulePhase::Request,
    });
    state.domain.id = Some(DOMAIN_ID);
    state.domain.name = Some(DOMAIN_NAME.to_string());
    state.not_first_run = true;
    state.preset = String::from("other");
    state
}

fn expect_redeploy(mocks: &mut Mocks) {
    mocks
        .function
        .expect_update_code()
        .withf(|id, req| *id == FUNCTION_ID && req.code.contains("addEventListener"))
        .times(1)
        .returning(|_, _| Ok(()));
    mocks.function.expect_create_instance().times(0);
    mocks.application.expect_create().times(0);
    mocks.application.expect_get_default_rule().times(0);
    mocks.application.expect_update_rule_behaviors().times(0);
    mocks.application.expect_publish_default_rule().times(0);
    mocks.origin.expect_create_single().times(0);
    mocks.bucket.expect_create().times(0);
    mocks.rules_engine.expect_create_default().times(0);
    mocks.expect_domain(&mut Sequence::new(), Some(DOMAIN_ID));
}

#[tokio::test]
async fn test_fresh_deploy_runs_every_step_in_order() {
    let dir = project();
    let options = DeployOptions::new(dir.path()).with_preset("other");
    let mut mocks = Mocks::new();
    mocks.expect_fresh_deploy(&mut Sequence::new());
    mocks.uploader.expect_upload_dir().times(0);
    let clients = mocks.into_clients();
    let store = LocalStateStore::for_project(dir.path());

    let mut state = LocalState::new("shop");
    let result = Orchestrator::new(&options, &clients, &store)
        .deploy(&Manifest::default(), &mut state)
        .await
        .unwrap();

    assert_eq!(result.domain_name, DOMAIN_NAME);
    assert_eq!(result.url, format!("https://{DOMAIN_NAME}"));
    assert!(result.warnings.is_empty());
    assert_eq!(
        result.steps.iter().map(|r| r.step).collect::<Vec<_>>(),
        Step::ALL.to_vec()
    );
    assert_eq!(
        result.step(Step::StaticUpload).unwrap().outcome,
        StepOutcome::Skipped
    );

    assert_eq!(state.application.id, Some(APP_ID));
    assert_eq!(state.origin.id, Some(ORIGIN_ID));
    assert!(state.bucket.as_deref().unwrap().starts_with("shop-"));
    assert_eq!(state.function.id, Some(FUNCTION_ID));
    assert_eq!(state.function.instance_id, Some(INSTANCE_ID));
    assert_eq!(state.function.file.as_deref(), Some(".edge/worker.js"));
    assert!(state.not_first_run);
    assert_eq!(state.tracked_rule(RulePhase::Request, "default").unwrap().id, DEFAULT_SET_ID);
    assert_eq!(state.domain.name.as_deref(), Some(DOMAIN_NAME));
    assert_eq!(state.preset, "other");
    assert_eq!(state.history.len(), 1);
    assert!(!state.history[0].steps.contains(&String::from("static_upload")));

    let saved = store.load().await.unwrap().unwrap();
    assert_eq!(saved, state);
}

#[tokio::test]
async fn test_second_deploy_only_updates_code_and_domain() {
    let dir = project();
    let options = DeployOptions::new(dir.path());
    let mut mocks = Mocks::new();
    expect_redeploy(&mut mocks);
    let clients = mocks.into_clients();
    let store = LocalStateStore::for_project(dir.path());

    let mut state = deployed_state();
    let result = Orchestrator::new(&options, &clients, &store)
        .deploy(&Manifest::default(), &mut state)
        .await
        .unwrap();

    assert_eq!(
        result.worked_steps().collect::<Vec<_>>(),
        vec![Step::Function, Step::Domain]
    );
    assert_eq!(result.step(Step::Domain).unwrap().outcome, StepOutcome::Completed);
    assert_eq!(state.application.id, Some(APP_ID));
    assert_eq!(state.rules_engine.rules.len(), 1);
    assert_eq!(state.history.len(), 1);
}

#[tokio::test]
async fn test_script_preset_publishes_function_and_skips_upload() {
    let dir = project();
    add_static_files(dir.path());
    let options = DeployOptions::new(dir.path()).with_preset("javascript");

    let mut seq = Sequence::new();
    let mut mocks = Mocks::new();
    mocks.expect_application(&mut seq);
    mocks.expect_default_origin(&mut seq, "shop-single");
    mocks.expect_bucket(&mut seq);
    mocks.expect_function(&mut seq);
    mocks.expect_default_rule_lookup(&mut seq);
    mocks
        .application
        .expect_publish_default_rule()
        .withf(|app, instance| *app == APP_ID && *instance == INSTANCE_ID)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    mocks.application.expect_update_rule_behaviors().times(0);
    mocks.expect_default_rule_set(&mut seq);
    mocks.expect_domain(&mut seq, None);
    mocks.uploader.expect_upload_dir().times(0);
    let clients = mocks.into_clients();
    let store = LocalStateStore::for_project(dir.path());

    let mut state = LocalState::new("shop");
    let result = Orchestrator::new(&options, &clients, &store)
        .deploy(&Manifest::default(), &mut state)
        .await
        .unwrap();

    assert_eq!(
        result.step(Step::StaticUpload).unwrap().outcome,
        StepOutcome::Skipped
    );
    assert_eq!(state.preset, "javascript");
    assert!(state.not_first_run);
}

#[tokio::test]
async fn test_static_directory_is_uploaded_to_project_bucket() {
    let dir = project();
    add_static_files(dir.path());
    let options = DeployOptions::new(dir.path()).with_preset("html");

    let mut mocks = Mocks::new();
    mocks.expect_fresh_deploy(&mut Sequence::new());
    mocks
        .uploader
        .expect_upload_dir()
        .withf(|bucket, dir| bucket.starts_with("shop-") && dir.ends_with(".edge/storage"))
        .times(1)
        .returning(|_, _| Ok(UploadSummary { files: 1, bytes: 13 }));
    let clients = mocks.into_clients();
    let store = LocalStateStore::for_project(dir.path());

    let mut state = LocalState::new("shop");
    let result = Orchestrator::new(&options, &clients, &store)
        .deploy(&Manifest::default(), &mut state)
        .await
        .unwrap();

    let upload = result.step(Step::StaticUpload).unwrap();
    assert_eq!(upload.outcome, StepOutcome::Completed);
    assert!(upload.detail.contains("1 files"));
}

#[tokio::test]
async fn test_script_template_is_recorded_and_skips_upload() {
    let dir = project();
    add_static_files(dir.path());
    let options = DeployOptions::new(dir.path())
        .with_preset("html")
        .with_template("javascript");

    let mut mocks = Mocks::new();
    mocks.expect_fresh_deploy(&mut Sequence::new());
    mocks.uploader.expect_upload_dir().times(0);
    let clients = mocks.into_clients();
    let store = LocalStateStore::for_project(dir.path());

    let mut state = LocalState::new("shop");
    let result = Orchestrator::new(&options, &clients, &store)
        .deploy(&Manifest::default(), &mut state)
        .await
        .unwrap();

    assert_eq!(
        result.step(Step::StaticUpload).unwrap().outcome,
        StepOutcome::Skipped
    );
    assert_eq!(state.preset, "html");
    assert_eq!(state.template, "javascript");

    let saved = store.load().await.unwrap().unwrap();
    assert_eq!(saved.template, "javascript");
}

#[tokio::test]
async fn test_recorded_template_applies_on_redeploy() {
    let dir = project();
    add_static_files(dir.path());
    let options = DeployOptions::new(dir.path());
    let mut mocks = Mocks::new();
    expect_redeploy(&mut mocks);
    mocks.uploader.expect_upload_dir().times(0);
    let clients = mocks.into_clients();
    let store = LocalStateStore::for_project(dir.path());

    let mut state = deployed_state();
    state.template = String::from("typescript");
    let result = Orchestrator::new(&options, &clients, &store)
        .deploy(&Manifest::default(), &mut state)
        .await
        .unwrap();

    assert_eq!(
        result.step(Step::StaticUpload).unwrap().outcome,
        StepOutcome::Skipped
    );
    assert_eq!(state.template, "typescript");
}

#[tokio::test]
async fn test_application_failure_leaves_state_untouched() {
    let dir = project();
    let options = DeployOptions::new(dir.path()).with_preset("other");
    let mut mocks = Mocks::new();
    mocks
        .application
        .expect_create()
        .times(1)
        .returning(|_| Err(PlatformError::api_error(422, "invalid name").into()));
    mocks.origin.expect_create_single().times(0);
    mocks.domain.expect_create_or_get().times(0);
    let clients = mocks.into_clients();

    let mut store = MockStateStore::new();
    store.expect_save().times(0);

    let mut state = LocalState::new("shop");
    let before = state.clone();
    let err = Orchestrator::new(&options, &clients, &store)
        .deploy(&Manifest::default(), &mut state)
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some(Step::Application));
    assert!(matches!(
        err.into_root(),
        EdgeDeployError::Platform(PlatformError::ApiRequestFailed { status: 422, .. })
    ));
    assert_eq!(state, before);
}

#[tokio::test]
async fn test_failure_keeps_earlier_resources_tracked() {
    let dir = project();
    let options = DeployOptions::new(dir.path()).with_preset("other");
    let mut seq = Sequence::new();
    let mut mocks = Mocks::new();
    mocks.expect_application(&mut seq);
    mocks
        .origin
        .expect_create_single()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(PlatformError::network("connection reset").into()));
    mocks.bucket.expect_create().times(0);
    let clients = mocks.into_clients();
    let store = LocalStateStore::for_project(dir.path());

    let mut state = LocalState::new("shop");
    let err = Orchestrator::new(&options, &clients, &store)
        .deploy(&Manifest::default(), &mut state)
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some(Step::Origin));
    assert_eq!(state.application.id, Some(APP_ID));
    assert_eq!(state.origin.id, None);

    let saved = store.load().await.unwrap().unwrap();
    assert_eq!(saved.application.id, Some(APP_ID));
    assert!(saved.history.is_empty());
}

#[tokio::test]
async fn test_missing_artifact_fails_before_remote_calls() {
    let dir = TempDir::new().unwrap();
    let options = DeployOptions::new(dir.path());
    let clients = Mocks::new().into_clients();
    let store = LocalStateStore::for_project(dir.path());

    let mut state = LocalState::new("shop");
    let err = Orchestrator::new(&options, &clients, &store)
        .deploy(&Manifest::default(), &mut state)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EdgeDeployError::Deploy(DeployError::ArtifactNotFound { .. })
    ));
    assert!(!store.exists().await.unwrap());
}

#[tokio::test]
async fn test_save_failures_are_warnings() {
    let dir = project();
    let options = DeployOptions::new(dir.path()).with_preset("other");
    let mut mocks = Mocks::new();
    mocks.expect_fresh_deploy(&mut Sequence::new());
    let clients = mocks.into_clients();

    let mut store = MockStateStore::new();
    store
        .expect_save()
        .returning(|_| Err(StateError::write("disk full").into()));

    let mut state = LocalState::new("shop");
    let result = Orchestrator::new(&options, &clients, &store)
        .deploy(&Manifest::default(), &mut state)
        .await
        .unwrap();

    assert!(!result.warnings.is_empty());
    assert!(result.warnings.iter().all(|w| w.contains("disk full")));
    assert_eq!(state.domain.id, Some(DOMAIN_ID));
}

#[tokio::test]
async fn test_external_origin_is_adopted() {
    let dir = project();
    let options = DeployOptions::new(dir.path()).with_preset("other");
    let manifest = manifest(
        r#"{"origins": [{"name": "legacy", "addresses": ["legacy.shop.example"], "id": 42}]}"#,
    );

    let mut seq = Sequence::new();
    let mut mocks = Mocks::new();
    mocks.expect_application(&mut seq);
    mocks.origin.expect_create_single().times(0);
    mocks.expect_bucket(&mut seq);
    mocks.expect_function(&mut seq);
    mocks.expect_default_rule_lookup(&mut seq);
    mocks.expect_route_to_origin(&mut seq, 42);
    mocks.expect_default_rule_set(&mut seq);
    mocks.expect_domain(&mut seq, None);
    let clients = mocks.into_clients();
    let store = LocalStateStore::for_project(dir.path());

    let mut state = LocalState::new("shop");
    let result = Orchestrator::new(&options, &clients, &store)
        .deploy(&manifest, &mut state)
        .await
        .unwrap();

    assert_eq!(result.step(Step::Origin).unwrap().outcome, StepOutcome::Adopted);
    assert_eq!(state.origin.id, Some(42));
}

#[tokio::test]
async fn test_declared_rules_replace_default_rule_set() {
    let dir = project();
    let options = DeployOptions::new(dir.path()).with_preset("other");
    let manifest = manifest(
        r#"{
            "origins": [
                {"name": "main", "addresses": ["www.shop.example"]},
                {"name": "api", "addresses": ["api.shop.example"]}
            ],
            "rules": [{
                "name": "routes",
                "criteria": [[{"variable": "${uri}", "operator": "starts_with", "conditional": "if", "input_value": "/api"}]],
                "behaviors": [{"name": "set_origin", "target": "api"}]
            }]
        }"#,
    );

    let mut seq = Sequence::new();
    let mut mocks = Mocks::new();
    mocks.expect_application(&mut seq);
    mocks.expect_default_origin(&mut seq, "main");
    mocks.expect_bucket(&mut seq);
    mocks.expect_function(&mut seq);
    mocks.expect_default_rule_lookup(&mut seq);
    mocks.expect_route_to_origin(&mut seq, ORIGIN_ID);
    mocks.rules_engine.expect_create_default().times(0);
    mocks
        .origin
        .expect_create()
        .withf(|app, req| *app == APP_ID && req.name == "api")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(2002));
    mocks
        .rules_engine
        .expect_create()
        .withf(|app, rule| {
            *app == APP_ID
                && rule.name == "routes"
                && rule.behaviors[0].target.as_deref() == Some("2002")
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(4100));
    mocks.expect_domain(&mut seq, None);
    let clients = mocks.into_clients();
    let store = LocalStateStore::for_project(dir.path());

    let mut state = LocalState::new("shop");
    let result = Orchestrator::new(&options, &clients, &store)
        .deploy(&manifest, &mut state)
        .await
        .unwrap();

    assert_eq!(
        result.step(Step::ExplicitRules).unwrap().outcome,
        StepOutcome::Skipped
    );
    assert_eq!(
        result.step(Step::ManifestResources).unwrap().outcome,
        StepOutcome::Created
    );
    assert_eq!(state.tracked_origin("api"), Some(2002));
    assert_eq!(
        state.rules_engine.rules,
        vec![RuleRef {
            id: 4100,
            name: String::from("routes"),
            phase: RulePhase::Request,
        }]
    );
}

#[tokio::test]
async fn test_rules_no_longer_declared_are_deleted() {
    let dir = project();
    let options = DeployOptions::new(dir.path());
    let manifest = manifest(
        r#"{"rules": [{
            "name": "routes",
            "criteria": [[{"variable": "${uri}", "operator": "starts_with", "conditional": "if", "input_value": "/"}]],
            "behaviors": [{"name": "set_origin", "target": "default"}]
        }]}"#,
    );

    let mut mocks = Mocks::new();
    expect_redeploy(&mut mocks);
    mocks
        .rules_engine
        .expect_create()
        .withf(|_, rule| {
            let target = ORIGIN_ID.to_string();
            rule.behaviors[0].target.as_deref() == Some(target.as_str())
        })
        .times(1)
        .returning(|_, _| Ok(4100));
    mocks
        .rules_engine
        .expect_delete()
        .withf(|app, phase, id| *app == APP_ID && *phase == RulePhase::Request && *id == DEFAULT_SET_ID)
        .times(1)
        .returning(|_, _, _| Ok(()));
    let clients = mocks.into_clients();
    let store = LocalStateStore::for_project(dir.path());

    let mut state = deployed_state();
    Orchestrator::new(&options, &clients, &store)
        .deploy(&manifest, &mut state)
        .await
        .unwrap();

    assert!(state.tracked_rule(RulePhase::Request, "default").is_none());
    assert_eq!(state.tracked_rule(RulePhase::Request, "routes").unwrap().id, 4100);
}

#[tokio::test]
async fn test_unresolved_rule_reference_fails_the_step() {
    let dir = project();
    let options = DeployOptions::new(dir.path());
    let manifest = manifest(
        r#"{"rules": [{
            "name": "routes",
            "criteria": [[{"variable": "${uri}", "operator": "starts_with", "conditional": "if", "input_value": "/"}]],
            "behaviors": [{"name": "set_origin", "target": "missing"}]
        }]}"#,
    );

    let mut mocks = Mocks::new();
    mocks
        .function
        .expect_update_code()
        .times(1)
        .returning(|_, _| Ok(()));
    mocks.rules_engine.expect_create().times(0);
    mocks.domain.expect_create_or_get().times(0);
    let clients = mocks.into_clients();
    let store = LocalStateStore::for_project(dir.path());

    let mut state = deployed_state();
    let err = Orchestrator::new(&options, &clients, &store)
        .deploy(&manifest, &mut state)
        .await
        .unwrap_err();

    assert_eq!(err.failed_step(), Some(Step::ManifestResources));
}

#[test]
fn test_preview_makes_no_calls() {
    let options = DeployOptions::new("/work/shop").with_preset("other");
    let clients = Mocks::new().into_clients();
    let store = MockStateStore::new();
    let orchestrator = Orchestrator::new(&options, &clients, &store);

    let fresh = orchestrator.preview(&Manifest::default(), &LocalState::new("shop"));
    let outcomes: Vec<_> = fresh.iter().map(|p| p.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            StepOutcome::Created,
            StepOutcome::Created,
            StepOutcome::Created,
            StepOutcome::Created,
            StepOutcome::Updated,
            StepOutcome::Created,
            StepOutcome::Skipped,
            StepOutcome::Skipped,
            StepOutcome::Created,
        ]
    );

    let again = orchestrator.preview(&Manifest::default(), &deployed_state());
    let worked: Vec<_> = again
        .iter()
        .filter(|p| p.outcome.did_work())
        .map(|p| p.step)
        .collect();
    assert_eq!(worked, vec![Step::Function, Step::Domain]);
}
