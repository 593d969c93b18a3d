//! Capability trait implementations backed by the REST client.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use super::client::{Api, Body, PlatformClient};
use super::traits::{
    ApplicationClient, BucketClient, DomainClient, FunctionClient, OriginClient,
    RulesEngineClient,
};
use super::types::{
    ApplicationRequest, Behavior, BucketRequest, Criterion, DEFAULT_RULE_SET_NAME, DomainInfo,
    DomainRequest, FunctionInstance, FunctionRequest, OriginRequest, ResourceId, RuleRequest,
};
use crate::error::{EdgeDeployError, PlatformError, Result};
use crate::manifest::{BEHAVIOR_RUN_FUNCTION, RulePhase};

/// A created resource; origins report `origin_id` instead of `id`.
#[derive(Debug, Deserialize)]
struct Created {
    #[serde(alias = "origin_id")]
    id: ResourceId,
}

#[derive(Debug, Deserialize)]
struct RuleSummary {
    id: ResourceId,
}

#[derive(Debug, Deserialize)]
struct DomainResponse {
    id: ResourceId,
    domain_name: String,
}

#[derive(Debug, Deserialize)]
struct BucketResponse {
    name: String,
}

fn json(value: impl serde::Serialize) -> Result<Option<Body>> {
    serde_json::to_value(value)
        .map(|v| Some(Body::Json(v)))
        .map_err(|e| EdgeDeployError::internal(format!("Failed to encode request: {e}")))
}

fn rules_path(app_id: ResourceId, phase: RulePhase) -> String {
    format!("edge_applications/{app_id}/rules_engine/{phase}/rules")
}

#[async_trait]
impl ApplicationClient for PlatformClient {
    async fn create(&self, request: &ApplicationRequest) -> Result<ResourceId> {
        let created: Created = self
            .send(Method::POST, Api::Resources, "edge_applications", json(request)?)
            .await?;
        info!("Created application '{}' ({})", request.name, created.id);
        Ok(created.id)
    }

    async fn get_default_rule(&self, app_id: ResourceId, phase: RulePhase) -> Result<ResourceId> {
        let path = format!("{}?order_by=order&sort=asc&page_size=1", rules_path(app_id, phase));
        let rules: Vec<RuleSummary> = self.send(Method::GET, Api::Resources, &path, None).await?;

        rules.first().map(|r| r.id).ok_or_else(|| {
            EdgeDeployError::Platform(PlatformError::ResourceNotFound {
                resource_type: format!("Default {phase} rule"),
                id: app_id.to_string(),
            })
        })
    }

    async fn update_rule_behaviors(
        &self,
        app_id: ResourceId,
        phase: RulePhase,
        rule_id: ResourceId,
        behaviors: &[Behavior],
    ) -> Result<()> {
        let path = format!("{}/{rule_id}", rules_path(app_id, phase));
        self.send_unit(
            Method::PATCH,
            Api::Resources,
            &path,
            json(serde_json::json!({ "behaviors": behaviors }))?,
        )
        .await
    }

    async fn publish_default_rule(&self, app_id: ResourceId, instance_id: ResourceId) -> Result<()> {
        let rule_id = self.get_default_rule(app_id, RulePhase::Request).await?;
        let behaviors = [Behavior::with_target(BEHAVIOR_RUN_FUNCTION, instance_id)];

        debug!("Binding default rule {rule_id} to function instance {instance_id}");
        self.update_rule_behaviors(app_id, RulePhase::Request, rule_id, &behaviors)
            .await
    }
}

#[async_trait]
impl OriginClient for PlatformClient {
    async fn create_single(&self, app_id: ResourceId, request: &OriginRequest) -> Result<ResourceId> {
        OriginClient::create(self, app_id, request).await
    }

    async fn create(&self, app_id: ResourceId, request: &OriginRequest) -> Result<ResourceId> {
        let path = format!("edge_applications/{app_id}/origins");
        let created: Created = self
            .send(Method::POST, Api::Resources, &path, json(request)?)
            .await?;
        info!("Created origin '{}' ({})", request.name, created.id);
        Ok(created.id)
    }

    async fn update(
        &self,
        app_id: ResourceId,
        origin_id: ResourceId,
        request: &OriginRequest,
    ) -> Result<()> {
        let path = format!("edge_applications/{app_id}/origins/{origin_id}");
        self.send_unit(Method::PATCH, Api::Resources, &path, json(request)?)
            .await
    }
}

#[async_trait]
impl BucketClient for PlatformClient {
    async fn create(&self, request: &BucketRequest) -> Result<String> {
        let bucket: BucketResponse = self
            .send(Method::POST, Api::Storage, "storage/buckets", json(request)?)
            .await?;
        info!("Created bucket '{}'", bucket.name);
        Ok(bucket.name)
    }
}

#[async_trait]
impl FunctionClient for PlatformClient {
    async fn create_instance(
        &self,
        app_id: ResourceId,
        request: &FunctionRequest,
    ) -> Result<FunctionInstance> {
        let function: Created = self
            .send(Method::POST, Api::Resources, "edge_functions", json(request)?)
            .await?;

        let path = format!("edge_applications/{app_id}/functions_instances");
        let instance: Created = self
            .send(
                Method::POST,
                Api::Resources,
                &path,
                json(serde_json::json!({
                    "name": request.name,
                    "edge_function_id": function.id,
                    "args": request.json_args,
                }))?,
            )
            .await?;

        info!(
            "Created function '{}' ({}) with instance {}",
            request.name, function.id, instance.id
        );
        Ok(FunctionInstance {
            function_id: function.id,
            instance_id: instance.id,
        })
    }

    async fn update_code(&self, function_id: ResourceId, request: &FunctionRequest) -> Result<()> {
        let path = format!("edge_functions/{function_id}");
        self.send_unit(
            Method::PATCH,
            Api::Resources,
            &path,
            json(serde_json::json!({
                "code": request.code,
                "json_args": request.json_args,
            }))?,
        )
        .await
    }
}

#[async_trait]
impl DomainClient for PlatformClient {
    async fn create_or_get(
        &self,
        app_id: ResourceId,
        existing_id: Option<ResourceId>,
        request: &DomainRequest,
    ) -> Result<DomainInfo> {
        if let Some(id) = existing_id {
            let path = format!("domains/{id}");
            match self
                .send::<DomainResponse>(Method::GET, Api::Resources, &path, None)
                .await
            {
                Ok(domain) => {
                    return Ok(DomainInfo {
                        id: domain.id,
                        name: domain.domain_name,
                    });
                }
                Err(EdgeDeployError::Platform(PlatformError::ApiRequestFailed {
                    status: 404,
                    ..
                })) => {
                    debug!("Tracked domain {id} no longer exists, creating a new one");
                }
                Err(e) => return Err(e),
            }
        }

        let mut body = serde_json::to_value(request)
            .map_err(|e| EdgeDeployError::internal(format!("Failed to encode request: {e}")))?;
        body["edge_application_id"] = serde_json::json!(app_id);

        let domain: DomainResponse = self
            .send(Method::POST, Api::Resources, "domains", Some(Body::Json(body)))
            .await?;
        info!("Created domain '{}' ({})", domain.domain_name, domain.id);

        Ok(DomainInfo {
            id: domain.id,
            name: domain.domain_name,
        })
    }
}

#[async_trait]
impl RulesEngineClient for PlatformClient {
    async fn create_default(&self, app_id: ResourceId, phase: RulePhase) -> Result<ResourceId> {
        let rule = RuleRequest {
            name: DEFAULT_RULE_SET_NAME.to_string(),
            phase,
            description: String::from("Compress responses for every path"),
            is_active: true,
            criteria: vec![vec![Criterion {
                variable: String::from("${uri}"),
                operator: String::from("starts_with"),
                conditional: String::from("if"),
                input_value: String::from("/"),
            }]],
            behaviors: vec![Behavior {
                name: String::from("enable_gzip"),
                target: None,
            }],
        };
        RulesEngineClient::create(self, app_id, &rule).await
    }

    async fn create(&self, app_id: ResourceId, rule: &RuleRequest) -> Result<ResourceId> {
        let created: Created = self
            .send(
                Method::POST,
                Api::Resources,
                &rules_path(app_id, rule.phase),
                json(rule)?,
            )
            .await?;
        info!("Created {} rule '{}' ({})", rule.phase, rule.name, created.id);
        Ok(created.id)
    }

    async fn update(&self, app_id: ResourceId, rule_id: ResourceId, rule: &RuleRequest) -> Result<()> {
        let path = format!("{}/{rule_id}", rules_path(app_id, rule.phase));
        self.send_unit(Method::PUT, Api::Resources, &path, json(rule)?)
            .await
    }

    async fn delete(&self, app_id: ResourceId, phase: RulePhase, rule_id: ResourceId) -> Result<()> {
        let path = format!("{}/{rule_id}", rules_path(app_id, phase));
        self.send_unit(Method::DELETE, Api::Resources, &path, None)
            .await?;
        info!("Deleted {phase} rule {rule_id}");
        Ok(())
    }
}
