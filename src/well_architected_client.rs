//! Well-Architected Tool REST API.
//!
//! rusoto ships no crate for this service, so requests are built and signed
//! with `rusoto_core` directly, the same way generated rusoto clients do it.

use async_trait::async_trait;
use rusoto_core::param::Params;
use rusoto_core::signature::SignedRequest;
use rusoto_core::{Client, Region, RusotoError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::convert::Infallible;

use crate::error::{LabsError, Result};

const SERVICE: &str = "wellarchitected";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkloadRef {
    #[serde(rename = "WorkloadId")]
    pub id: String,
    #[serde(rename = "WorkloadArn")]
    pub arn: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateWorkloadInput {
    pub workload_name: String,
    pub description: String,
    pub environment: String,
    pub review_owner: String,
    pub aws_regions: Vec<String>,
    pub lenses: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    pub client_request_token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateWorkloadInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workload_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_regions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WorkloadSummary {
    pub workload_id: String,
    pub workload_arn: String,
    pub workload_name: String,
    pub owner: Option<String>,
    pub lenses: Vec<String>,
    pub risk_counts: BTreeMap<String, i64>,
    pub improvement_status: Option<String>,
}

impl WorkloadSummary {
    pub fn workload_ref(&self) -> WorkloadRef {
        WorkloadRef {
            id: self.workload_id.clone(),
            arn: self.workload_arn.clone(),
        }
    }
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WorkloadPage {
    pub workload_summaries: Vec<WorkloadSummary>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Workload {
    pub workload_id: String,
    pub workload_arn: String,
    pub workload_name: String,
    pub description: Option<String>,
    pub environment: Option<String>,
    pub review_owner: Option<String>,
    pub aws_regions: Vec<String>,
    pub lenses: Vec<String>,
    pub risk_counts: BTreeMap<String, i64>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetWorkloadOutput {
    workload: Workload,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LensSummary {
    pub lens_alias: String,
    pub lens_name: Option<String>,
    pub lens_version: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ListLensesOutput {
    lens_summaries: Vec<LensSummary>,
    next_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Choice {
    pub choice_id: String,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AnswerSummary {
    pub question_id: String,
    pub pillar_id: Option<String>,
    pub question_title: String,
    pub choices: Vec<Choice>,
    pub selected_choices: Vec<String>,
    pub is_applicable: Option<bool>,
    pub risk: Option<String>,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AnswerPage {
    pub answer_summaries: Vec<AnswerSummary>,
    pub next_token: Option<String>,
}

/// Which answers to list: one lens of a workload, optionally narrowed to a
/// pillar and read from a milestone instead of the current review.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerQuery {
    pub workload_id: String,
    pub lens_alias: String,
    pub pillar_id: Option<String>,
    pub milestone_number: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Answer {
    pub question_id: String,
    pub pillar_id: Option<String>,
    pub question_title: String,
    pub choices: Vec<Choice>,
    pub selected_choices: Vec<String>,
    pub notes: Option<String>,
    pub risk: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AnswerOutput {
    answer: Answer,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnswerUpdate {
    pub selected_choices: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MilestoneSummary {
    pub milestone_number: i64,
    pub milestone_name: String,
    pub recorded_at: Option<f64>,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MilestonePage {
    pub milestone_summaries: Vec<MilestoneSummary>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Milestone {
    pub milestone_number: i64,
    pub milestone_name: String,
    pub recorded_at: Option<f64>,
    pub workload: Workload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetMilestoneOutput {
    milestone: Milestone,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateMilestoneOutput {
    milestone_number: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PillarReviewSummary {
    pub pillar_id: String,
    pub pillar_name: Option<String>,
    pub risk_counts: BTreeMap<String, i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LensReview {
    pub lens_alias: String,
    pub lens_name: Option<String>,
    pub lens_status: Option<String>,
    pub pillar_review_summaries: Vec<PillarReviewSummary>,
    pub risk_counts: BTreeMap<String, i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetLensReviewOutput {
    lens_review: LensReview,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LensReviewReport {
    pub lens_alias: String,
    pub base64_string: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetLensReviewReportOutput {
    lens_review_report: LensReviewReport,
}

/// The Well-Architected Tool operations used by the reconciler and the review
/// walkthrough. Implemented by `WellArchitectedClient`, and by in-memory fakes
/// in tests.
#[async_trait]
pub trait WellArchitected: Send + Sync {
    async fn create_workload(&self, input: &CreateWorkloadInput) -> Result<WorkloadRef>;

    async fn list_workloads(
        &self,
        name_prefix: &str,
        next_token: Option<String>,
    ) -> Result<WorkloadPage>;

    async fn get_workload(&self, workload_id: &str) -> Result<Workload>;

    async fn update_workload(&self, workload_id: &str, input: &UpdateWorkloadInput) -> Result<()>;

    async fn tag_resource(&self, arn: &str, tags: &BTreeMap<String, String>) -> Result<()>;

    async fn delete_workload(&self, workload_id: &str) -> Result<()>;

    async fn list_lenses(&self) -> Result<Vec<LensSummary>>;

    async fn associate_lenses(&self, workload_id: &str, lens_aliases: &[String]) -> Result<()>;

    async fn disassociate_lenses(&self, workload_id: &str, lens_aliases: &[String])
        -> Result<()>;

    async fn list_answers(&self, query: &AnswerQuery, next_token: Option<String>)
        -> Result<AnswerPage>;

    async fn get_answer(
        &self,
        workload_id: &str,
        lens_alias: &str,
        question_id: &str,
    ) -> Result<Answer>;

    async fn update_answer(
        &self,
        workload_id: &str,
        lens_alias: &str,
        question_id: &str,
        update: &AnswerUpdate,
    ) -> Result<Answer>;

    async fn list_milestones(
        &self,
        workload_id: &str,
        next_token: Option<String>,
    ) -> Result<MilestonePage>;

    async fn create_milestone(&self, workload_id: &str, milestone_name: &str) -> Result<i64>;

    async fn get_milestone(&self, workload_id: &str, milestone_number: i64) -> Result<Milestone>;

    async fn get_lens_review(
        &self,
        workload_id: &str,
        lens_alias: &str,
        milestone_number: Option<i64>,
    ) -> Result<LensReview>;

    async fn get_lens_review_report(
        &self,
        workload_id: &str,
        lens_alias: &str,
        milestone_number: Option<i64>,
    ) -> Result<LensReviewReport>;
}

pub struct WellArchitectedClient {
    client: Client,
    region: Region,
}

impl WellArchitectedClient {
    pub fn new(region: Region) -> Self {
        WellArchitectedClient::new_with_client(Client::shared(), region)
    }

    pub fn new_with_client(client: Client, region: Region) -> Self {
        WellArchitectedClient { client, region }
    }

    fn request(&self, method: &str, path: &str) -> SignedRequest {
        let mut request = SignedRequest::new(method, SERVICE, &self.region, path);
        request.set_content_type(CONTENT_TYPE.to_owned());
        request
    }

    fn request_with_body<B: Serialize>(
        &self,
        method: &str,
        path: &str,
        body: &B,
    ) -> Result<SignedRequest> {
        let mut request = self.request(method, path);
        request.set_payload(Some(serde_json::to_vec(body)?));
        Ok(request)
    }

    async fn send<T: DeserializeOwned>(&self, request: SignedRequest) -> Result<T> {
        let mut response = self
            .client
            .sign_and_dispatch(request)
            .await
            .map_err(RusotoError::<Infallible>::from)?;
        let response = response
            .buffer()
            .await
            .map_err(RusotoError::<Infallible>::HttpDispatch)?;

        if !response.status.is_success() {
            return Err(LabsError::from_response(
                response.status.as_u16(),
                &response.body,
            ));
        }
        if response.body.is_empty() {
            return Ok(serde_json::from_slice(b"{}")?);
        }
        Ok(serde_json::from_slice(&response.body)?)
    }
}

fn put_param(params: &mut Params, key: &str, value: String) {
    params.insert(key.to_string(), Some(value));
}

fn milestone_params(milestone_number: Option<i64>) -> Params {
    let mut params = Params::new();
    if let Some(number) = milestone_number {
        put_param(&mut params, "MilestoneNumber", number.to_string());
    }
    params
}

#[async_trait]
impl WellArchitected for WellArchitectedClient {
    async fn create_workload(&self, input: &CreateWorkloadInput) -> Result<WorkloadRef> {
        let request = self.request_with_body("POST", "/workloads", input)?;
        self.send(request).await
    }

    async fn list_workloads(
        &self,
        name_prefix: &str,
        next_token: Option<String>,
    ) -> Result<WorkloadPage> {
        let mut body = BTreeMap::new();
        body.insert("WorkloadNamePrefix", name_prefix.to_string());
        if let Some(token) = next_token {
            body.insert("NextToken", token);
        }
        let request = self.request_with_body("POST", "/workloadsSummaries", &body)?;
        self.send(request).await
    }

    async fn get_workload(&self, workload_id: &str) -> Result<Workload> {
        let request = self.request("GET", &format!("/workloads/{}", workload_id));
        let output: GetWorkloadOutput = self.send(request).await?;
        Ok(output.workload)
    }

    async fn update_workload(&self, workload_id: &str, input: &UpdateWorkloadInput) -> Result<()> {
        let request =
            self.request_with_body("PATCH", &format!("/workloads/{}", workload_id), input)?;
        let _: Value = self.send(request).await?;
        Ok(())
    }

    async fn tag_resource(&self, arn: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        let mut body = BTreeMap::new();
        body.insert("Tags", tags);
        let request = self.request_with_body("POST", &format!("/tags/{}", arn), &body)?;
        let _: Value = self.send(request).await?;
        Ok(())
    }

    async fn delete_workload(&self, workload_id: &str) -> Result<()> {
        let mut request = self.request("DELETE", &format!("/workloads/{}", workload_id));
        let mut params = Params::new();
        put_param(&mut params, "ClientRequestToken", uuid::Uuid::new_v4().to_string());
        request.set_params(params);
        let _: Value = self.send(request).await?;
        Ok(())
    }

    async fn list_lenses(&self) -> Result<Vec<LensSummary>> {
        let mut lenses = vec![];
        let mut next_token: Option<String> = None;
        loop {
            let mut request = self.request("GET", "/lenses");
            let mut params = Params::new();
            if let Some(ref token) = next_token {
                put_param(&mut params, "NextToken", token.clone());
            }
            request.set_params(params);
            let output: ListLensesOutput = self.send(request).await?;
            lenses.extend(output.lens_summaries);
            match output.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(lenses)
    }

    async fn associate_lenses(&self, workload_id: &str, lens_aliases: &[String]) -> Result<()> {
        let mut body = BTreeMap::new();
        body.insert("LensAliases", lens_aliases);
        let request = self.request_with_body(
            "PATCH",
            &format!("/workloads/{}/associateLenses", workload_id),
            &body,
        )?;
        let _: Value = self.send(request).await?;
        Ok(())
    }

    async fn disassociate_lenses(
        &self,
        workload_id: &str,
        lens_aliases: &[String],
    ) -> Result<()> {
        let mut body = BTreeMap::new();
        body.insert("LensAliases", lens_aliases);
        let request = self.request_with_body(
            "PATCH",
            &format!("/workloads/{}/disassociateLenses", workload_id),
            &body,
        )?;
        let _: Value = self.send(request).await?;
        Ok(())
    }

    async fn list_answers(
        &self,
        query: &AnswerQuery,
        next_token: Option<String>,
    ) -> Result<AnswerPage> {
        let mut request = self.request(
            "GET",
            &format!(
                "/workloads/{}/lensReviews/{}/answers",
                query.workload_id, query.lens_alias
            ),
        );
        let mut params = milestone_params(query.milestone_number);
        if let Some(ref pillar_id) = query.pillar_id {
            put_param(&mut params, "PillarId", pillar_id.clone());
        }
        if let Some(token) = next_token {
            put_param(&mut params, "NextToken", token);
        }
        request.set_params(params);
        self.send(request).await
    }

    async fn get_answer(
        &self,
        workload_id: &str,
        lens_alias: &str,
        question_id: &str,
    ) -> Result<Answer> {
        let request = self.request(
            "GET",
            &format!(
                "/workloads/{}/lensReviews/{}/answers/{}",
                workload_id, lens_alias, question_id
            ),
        );
        let output: AnswerOutput = self.send(request).await?;
        Ok(output.answer)
    }

    async fn update_answer(
        &self,
        workload_id: &str,
        lens_alias: &str,
        question_id: &str,
        update: &AnswerUpdate,
    ) -> Result<Answer> {
        let request = self.request_with_body(
            "PATCH",
            &format!(
                "/workloads/{}/lensReviews/{}/answers/{}",
                workload_id, lens_alias, question_id
            ),
            update,
        )?;
        let output: AnswerOutput = self.send(request).await?;
        Ok(output.answer)
    }

    async fn list_milestones(
        &self,
        workload_id: &str,
        next_token: Option<String>,
    ) -> Result<MilestonePage> {
        let mut body = BTreeMap::new();
        if let Some(token) = next_token {
            body.insert("NextToken", token);
        }
        let request = self.request_with_body(
            "POST",
            &format!("/workloads/{}/milestonesSummaries", workload_id),
            &body,
        )?;
        self.send(request).await
    }

    async fn create_milestone(&self, workload_id: &str, milestone_name: &str) -> Result<i64> {
        let mut body = BTreeMap::new();
        body.insert("MilestoneName", milestone_name.to_string());
        body.insert("ClientRequestToken", uuid::Uuid::new_v4().to_string());
        let request = self.request_with_body(
            "POST",
            &format!("/workloads/{}/milestones", workload_id),
            &body,
        )?;
        let output: CreateMilestoneOutput = self.send(request).await?;
        Ok(output.milestone_number)
    }

    async fn get_milestone(&self, workload_id: &str, milestone_number: i64) -> Result<Milestone> {
        let request = self.request(
            "GET",
            &format!("/workloads/{}/milestones/{}", workload_id, milestone_number),
        );
        let output: GetMilestoneOutput = self.send(request).await?;
        Ok(output.milestone)
    }

    async fn get_lens_review(
        &self,
        workload_id: &str,
        lens_alias: &str,
        milestone_number: Option<i64>,
    ) -> Result<LensReview> {
        let mut request = self.request(
            "GET",
            &format!("/workloads/{}/lensReviews/{}", workload_id, lens_alias),
        );
        request.set_params(milestone_params(milestone_number));
        let output: GetLensReviewOutput = self.send(request).await?;
        Ok(output.lens_review)
    }

    async fn get_lens_review_report(
        &self,
        workload_id: &str,
        lens_alias: &str,
        milestone_number: Option<i64>,
    ) -> Result<LensReviewReport> {
        let mut request = self.request(
            "GET",
            &format!(
                "/workloads/{}/lensReviews/{}/report",
                workload_id, lens_alias
            ),
        );
        request.set_params(milestone_params(milestone_number));
        let output: GetLensReviewReportOutput = self.send(request).await?;
        Ok(output.lens_review_report)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::LabsError;
    use crate::well_architected_client::{
        AnswerQuery, AnswerUpdate, CreateWorkloadInput, UpdateWorkloadInput, WellArchitected,
        WellArchitectedClient, WorkloadRef,
    };
    use rusoto_core::signature::{SignedRequest, SignedRequestPayload};
    use serde_json::Value;
    use rusoto_core::{Client, Region};
    use rusoto_mock::{MockCredentialsProvider, MockRequestDispatcher};

    fn client(dispatcher: MockRequestDispatcher) -> WellArchitectedClient {
        WellArchitectedClient::new_with_client(
            Client::new_with(MockCredentialsProvider, dispatcher),
            Region::UsEast1,
        )
    }

    #[tokio::test]
    async fn test_create_workload() {
        let dispatcher = MockRequestDispatcher::with_status(200)
            .with_body(r#"{"WorkloadId":"abc123","WorkloadArn":"arn:aws:wellarchitected:us-east-1:111111111111:workload/abc123"}"#)
            .with_request_checker(|request: &SignedRequest| {
                assert_eq!(request.method, "POST");
                assert_eq!(request.path, "/workloads");
            });

        let workload = client(dispatcher)
            .create_workload(&CreateWorkloadInput {
                workload_name: "WA Lab Test Workload".to_string(),
                ..CreateWorkloadInput::default()
            })
            .await
            .unwrap();

        assert_eq!(
            workload,
            WorkloadRef {
                id: "abc123".to_string(),
                arn: "arn:aws:wellarchitected:us-east-1:111111111111:workload/abc123".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_create_workload_conflict() {
        let dispatcher = MockRequestDispatcher::with_status(409).with_body(
            r#"{"Message":"Workload name already exists","ResourceId":"abc123","ResourceType":"WORKLOAD"}"#,
        );

        let result = client(dispatcher)
            .create_workload(&CreateWorkloadInput::default())
            .await;

        assert!(result.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_list_answers_sends_query_parameters() {
        let dispatcher = MockRequestDispatcher::with_status(200)
            .with_body(r#"{"AnswerSummaries":[{"QuestionId":"dev-integ","QuestionTitle":"How do you reduce defects, ease remediation, and improve flow into production?","Choices":[]}],"NextToken":"t2"}"#)
            .with_request_checker(|request: &SignedRequest| {
                assert_eq!(request.method, "GET");
                assert_eq!(
                    request.path,
                    "/workloads/abc123/lensReviews/wellarchitected/answers"
                );
                assert_eq!(
                    request.params.get("PillarId"),
                    Some(&Some("operationalExcellence".to_string()))
                );
                assert_eq!(request.params.get("NextToken"), Some(&Some("t1".to_string())));
            });
        let query = AnswerQuery {
            workload_id: "abc123".to_string(),
            lens_alias: "wellarchitected".to_string(),
            pillar_id: Some("operationalExcellence".to_string()),
            milestone_number: None,
        };

        let page = client(dispatcher)
            .list_answers(&query, Some("t1".to_string()))
            .await
            .unwrap();

        assert_eq!(page.answer_summaries.len(), 1);
        assert_eq!(page.answer_summaries[0].question_id, "dev-integ");
        assert_eq!(page.next_token, Some("t2".to_string()));
    }

    #[tokio::test]
    async fn test_update_workload_sends_name() {
        let dispatcher = MockRequestDispatcher::with_status(200)
            .with_body("{}")
            .with_request_checker(|request: &SignedRequest| {
                assert_eq!(request.method, "PATCH");
                assert_eq!(request.path, "/workloads/abc123");
                let body: Value = match request.payload {
                    Some(SignedRequestPayload::Buffer(ref bytes)) => {
                        serde_json::from_slice(bytes).unwrap()
                    }
                    _ => panic!("expected a JSON body"),
                };
                assert_eq!(body["WorkloadName"], "WA Lab Test Workload");
                assert_eq!(body["ReviewOwner"], "WA Rust Script");
                assert!(body.get("Environment").is_none());
            });

        let result = client(dispatcher)
            .update_workload(
                "abc123",
                &UpdateWorkloadInput {
                    workload_name: Some("WA Lab Test Workload".to_string()),
                    review_owner: Some("WA Rust Script".to_string()),
                    ..UpdateWorkloadInput::default()
                },
            )
            .await;

        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_update_answer() {
        let dispatcher = MockRequestDispatcher::with_status(200)
            .with_body(r#"{"WorkloadId":"abc123","LensAlias":"wellarchitected","Answer":{"QuestionId":"dev-integ","QuestionTitle":"How do you reduce defects","SelectedChoices":["dev_integ_version_control"],"Notes":"Added by lab automation"}}"#)
            .with_request_checker(|request: &SignedRequest| {
                assert_eq!(request.method, "PATCH");
                assert_eq!(
                    request.path,
                    "/workloads/abc123/lensReviews/wellarchitected/answers/dev-integ"
                );
            });

        let answer = client(dispatcher)
            .update_answer(
                "abc123",
                "wellarchitected",
                "dev-integ",
                &AnswerUpdate {
                    selected_choices: vec!["dev_integ_version_control".to_string()],
                    notes: "Added by lab automation".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(answer.selected_choices, vec!["dev_integ_version_control"]);
    }

    #[tokio::test]
    async fn test_empty_response_body() {
        let dispatcher = MockRequestDispatcher::with_status(200).with_request_checker(
            |request: &SignedRequest| {
                assert_eq!(request.method, "DELETE");
                assert!(request.params.contains_key("ClientRequestToken"));
            },
        );

        assert_eq!(client(dispatcher).delete_workload("abc123").await, Ok(()));
    }

    #[tokio::test]
    async fn test_missing_workload_is_not_found() {
        let dispatcher = MockRequestDispatcher::with_status(404)
            .with_body(r#"{"Message":"No workload with id abc123"}"#);

        let result = client(dispatcher).get_workload("abc123").await;

        match result {
            Err(LabsError::NotFound(_)) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_lenses() {
        let dispatcher = MockRequestDispatcher::with_status(200).with_body(
            r#"{"LensSummaries":[{"LensAlias":"wellarchitected","LensName":"AWS Well-Architected Framework"},{"LensAlias":"serverless","LensName":"Serverless Lens"}]}"#,
        );

        let lenses = client(dispatcher).list_lenses().await.unwrap();

        let aliases: Vec<&str> = lenses.iter().map(|lens| lens.lens_alias.as_str()).collect();
        assert_eq!(aliases, vec!["wellarchitected", "serverless"]);
    }
}
