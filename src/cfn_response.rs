//! CloudFormation custom resources backed by the Well-Architected Tool.
//!
//! Every invocation answers CloudFormation exactly once, SUCCESS or FAILED.
//! A stack waits on that answer until it times out.

use async_trait::async_trait;
use log::{error, info};
use rusoto_core::Region;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::Config;
use crate::context::InvocationContext;
use crate::error::{LabsError, Result};
use crate::well_architected_client::WellArchitected;
use crate::workload_reconciler::{QuestionChoices, WorkloadDescriptor, WorkloadReconciler};

pub const HELPER_PHYSICAL_ID: &str = "createWAWorkloadHelperFunction";
pub const PROPERTIES_ERROR: &str = "ERROR LOADING RESOURCE PROPERTIES";
const DELETE: &str = "Delete";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnEvent {
    pub request_type: String,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: Value,
}

impl CfnEvent {
    pub fn is_delete(&self) -> bool {
        self.request_type == DELETE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CfnStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CfnResponse {
    pub status: CfnStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: Map<String, Value>,
}

impl CfnResponse {
    /// Response to `event`. Without an explicit physical id the log stream
    /// of the invocation is used.
    pub fn new(
        event: &CfnEvent,
        context: &InvocationContext,
        status: CfnStatus,
        data: Map<String, Value>,
        physical_resource_id: Option<&str>,
    ) -> Self {
        CfnResponse {
            status,
            reason: format!(
                "See the details in CloudWatch Log Stream: {}",
                context.log_stream
            ),
            physical_resource_id: physical_resource_id
                .map(str::to_string)
                .unwrap_or_else(|| context.log_stream.clone()),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            no_echo: false,
            data,
        }
    }
}

fn error_data(message: &str) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("Error".to_string(), Value::from(message));
    data
}

/// Delivers a response to the pre-signed `ResponseURL` of the event.
#[async_trait]
pub trait CfnResponder: Send + Sync {
    async fn send(&self, response_url: &str, response: &CfnResponse) -> Result<()>;
}

pub struct HttpResponder {
    client: reqwest::Client,
}

impl HttpResponder {
    pub fn new() -> Self {
        HttpResponder {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpResponder {
    fn default() -> Self {
        HttpResponder::new()
    }
}

#[async_trait]
impl CfnResponder for HttpResponder {
    async fn send(&self, response_url: &str, response: &CfnResponse) -> Result<()> {
        let body = serde_json::to_vec(response)?;
        // The pre-signed URL is signed for an empty content type.
        let result = self
            .client
            .put(response_url)
            .header(reqwest::header::CONTENT_TYPE, "")
            .body(body)
            .send()
            .await?;
        info!("CloudFormation response status code: {}", result.status());
        result.error_for_status()?;
        Ok(())
    }
}

/// Region of a Lambda service token ARN, `arn:aws:lambda:{region}:...`.
pub fn service_token_region(service_token: &str) -> Result<Region> {
    let region = service_token
        .split(':')
        .nth(3)
        .filter(|region| !region.is_empty())
        .ok_or_else(|| LabsError::Validation(format!("not an ARN: {}", service_token)))?;
    Region::from_str(region).map_err(|error| LabsError::Validation(error.to_string()))
}

fn required<'a>(properties: &'a Value, key: &str) -> Result<&'a Value> {
    properties
        .get(key)
        .ok_or_else(|| LabsError::Validation(format!("missing resource property {}", key)))
}

fn required_str(properties: &Value, key: &str) -> Result<String> {
    required(properties, key)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LabsError::Validation(format!("{} must be a string", key)))
}

fn string_list(value: &Value, key: &str) -> Result<Vec<String>> {
    value
        .as_array()
        .ok_or_else(|| LabsError::Validation(format!("{} must be a list", key)))?
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| LabsError::Validation(format!("{} must hold strings", key)))
        })
        .collect()
}

fn string_map(value: &Value, key: &str) -> Result<BTreeMap<String, String>> {
    let object = value
        .as_object()
        .ok_or_else(|| LabsError::Validation(format!("{} must be a mapping", key)))?;
    Ok(object
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(value) => value.clone(),
                other => other.to_string(),
            };
            (name.clone(), value)
        })
        .collect())
}

/// Resource properties of the workload custom resource.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadProperties {
    pub descriptor: WorkloadDescriptor,
    pub region: Region,
}

impl WorkloadProperties {
    pub fn parse(properties: &Value) -> Result<Self> {
        let descriptor = WorkloadDescriptor {
            name: required_str(properties, "WorkloadName")?,
            description: required_str(properties, "WorkloadDesc")?,
            review_owner: required_str(properties, "WorkloadOwner")?,
            environment: required_str(properties, "WorkloadEnv")?,
            regions: vec![required_str(properties, "WorkloadRegion")?],
            lenses: string_list(required(properties, "WorkloadLenses")?, "WorkloadLenses")?,
            tags: string_map(required(properties, "Tags")?, "Tags")?,
        };
        let region = service_token_region(&required_str(properties, "ServiceToken")?)?;
        Ok(WorkloadProperties { descriptor, region })
    }
}

/// Resource properties of the question custom resource.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionProperties {
    pub workload_id: String,
    pub pillar_id: String,
    pub lens_alias: String,
    pub answers: Vec<QuestionChoices>,
    pub region: Region,
}

impl QuestionProperties {
    pub fn parse(properties: &Value) -> Result<Self> {
        let mut answers = vec![];
        let question_answers = required(properties, "QuestionAnswers")?
            .as_array()
            .ok_or_else(|| LabsError::Validation("QuestionAnswers must be a list".to_string()))?;
        for entry in question_answers {
            let entry = entry.as_object().ok_or_else(|| {
                LabsError::Validation("QuestionAnswers must hold mappings".to_string())
            })?;
            for (question_title, choice_titles) in entry {
                answers.push(QuestionChoices {
                    question_title: question_title.clone(),
                    choice_titles: string_list(choice_titles, question_title)?,
                });
            }
        }

        Ok(QuestionProperties {
            workload_id: required_str(properties, "WorkloadId")?,
            pillar_id: required_str(properties, "Pillar")?,
            lens_alias: required_str(properties, "Lens")?,
            answers,
            region: service_token_region(&required_str(properties, "ServiceToken")?)?,
        })
    }
}

async fn respond<R: CfnResponder + ?Sized>(
    responder: &R,
    event: &CfnEvent,
    response: CfnResponse,
) -> Result<CfnResponse> {
    info!(
        "[{}] Responding {:?} to {}",
        response.request_id, response.status, event.logical_resource_id
    );
    responder.send(&event.response_url, &response).await?;
    Ok(response)
}

fn acknowledge_delete(event: &CfnEvent, context: &InvocationContext) -> CfnResponse {
    info!("[{}] Delete request, nothing to remove", context.request_id);
    CfnResponse::new(
        event,
        context,
        CfnStatus::Success,
        Map::new(),
        event.physical_resource_id.as_deref(),
    )
}

fn properties_failure(event: &CfnEvent, context: &InvocationContext, error: &LabsError) -> CfnResponse {
    error!("[{}] {}: {}", context.request_id, PROPERTIES_ERROR, error);
    CfnResponse::new(
        event,
        context,
        CfnStatus::Failed,
        error_data(PROPERTIES_ERROR),
        Some(HELPER_PHYSICAL_ID),
    )
}

/// Creates or reconciles the workload described by the event and reports
/// `{WorkloadId, WorkloadARN}` back to CloudFormation.
pub async fn handle_workload_event<C, F, R>(
    event: &CfnEvent,
    context: &InvocationContext,
    config: &Config,
    connect: F,
    responder: &R,
) -> Result<CfnResponse>
where
    C: WellArchitected,
    F: FnOnce(Region) -> C,
    R: CfnResponder + ?Sized,
{
    if event.is_delete() {
        return respond(responder, event, acknowledge_delete(event, context)).await;
    }

    let properties = match WorkloadProperties::parse(&event.resource_properties) {
        Ok(properties) => properties,
        Err(error) => {
            return respond(responder, event, properties_failure(event, context, &error)).await
        }
    };

    info!(
        "[{}] Reconciling workload {} in {}",
        context.request_id,
        properties.descriptor.name,
        properties.region.name()
    );
    let reconciler = WorkloadReconciler::new(connect(properties.region.clone()), context.clone())
        .with_title_match(config.title_match);

    let response = match reconciler.ensure_workload(&properties.descriptor).await {
        Ok(workload) => {
            let mut data = Map::new();
            data.insert("WorkloadId".to_string(), Value::from(workload.id));
            data.insert("WorkloadARN".to_string(), Value::from(workload.arn));
            CfnResponse::new(event, context, CfnStatus::Success, data, None)
        }
        Err(error) => CfnResponse::new(
            event,
            context,
            CfnStatus::Failed,
            error_data(&error.to_string()),
            None,
        ),
    };
    respond(responder, event, response).await
}

/// Selects the answers listed in the event on an existing workload.
pub async fn handle_question_event<C, F, R>(
    event: &CfnEvent,
    context: &InvocationContext,
    config: &Config,
    connect: F,
    responder: &R,
) -> Result<CfnResponse>
where
    C: WellArchitected,
    F: FnOnce(Region) -> C,
    R: CfnResponder + ?Sized,
{
    if event.is_delete() {
        return respond(responder, event, acknowledge_delete(event, context)).await;
    }

    let properties = match QuestionProperties::parse(&event.resource_properties) {
        Ok(properties) => properties,
        Err(error) => {
            return respond(responder, event, properties_failure(event, context, &error)).await
        }
    };

    let reconciler = WorkloadReconciler::new(connect(properties.region.clone()), context.clone())
        .with_title_match(config.title_match)
        .with_notes(&config.answer_notes);

    let result = reconciler
        .ensure_answers(
            &properties.workload_id,
            &properties.lens_alias,
            &properties.pillar_id,
            &properties.answers,
        )
        .await;
    let response = match result {
        Ok(applied) => {
            info!("[{}] Updated {} questions", context.request_id, applied);
            CfnResponse::new(event, context, CfnStatus::Success, Map::new(), Some(HELPER_PHYSICAL_ID))
        }
        Err(error) => {
            error!("[{}] Failed to update answers: {}", context.request_id, error);
            CfnResponse::new(
                event,
                context,
                CfnStatus::Failed,
                error_data(&error.to_string()),
                Some(HELPER_PHYSICAL_ID),
            )
        }
    };
    respond(responder, event, response).await
}
