//! Find-or-create reconciliation of Well-Architected workloads, answers and
//! milestones.

use log::{error, info, warn};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::config::DEFAULT_ANSWER_NOTES;
use crate::context::InvocationContext;
use crate::error::{LabsError, Result};
use crate::well_architected_client::{
    Answer, AnswerQuery, AnswerSummary, AnswerUpdate, CreateWorkloadInput, MilestoneSummary,
    UpdateWorkloadInput, WellArchitected, WorkloadRef, WorkloadSummary,
};

/// How question, choice and workload titles are compared with the wanted text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TitleMatch {
    /// The title starts with the wanted text. The first match in API order wins.
    Prefix,
    Exact,
}

impl TitleMatch {
    pub fn matches(self, title: &str, wanted: &str) -> bool {
        match self {
            TitleMatch::Prefix => title.starts_with(wanted),
            TitleMatch::Exact => title == wanted,
        }
    }
}

impl Default for TitleMatch {
    fn default() -> Self {
        TitleMatch::Prefix
    }
}

impl FromStr for TitleMatch {
    type Err = LabsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefix" => Ok(TitleMatch::Prefix),
            "exact" => Ok(TitleMatch::Exact),
            other => Err(LabsError::Config(format!(
                "TITLE_MATCH must be 'prefix' or 'exact', got '{}'",
                other
            ))),
        }
    }
}

/// Desired state of a workload. `name` is the natural key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkloadDescriptor {
    pub name: String,
    pub description: String,
    pub review_owner: String,
    pub environment: String,
    pub regions: Vec<String>,
    pub lenses: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

impl WorkloadDescriptor {
    fn create_input(&self) -> CreateWorkloadInput {
        CreateWorkloadInput {
            workload_name: self.name.clone(),
            description: self.description.clone(),
            environment: self.environment.clone(),
            review_owner: self.review_owner.clone(),
            aws_regions: self.regions.clone(),
            lenses: self.lenses.clone(),
            tags: self.tags.clone(),
            client_request_token: uuid::Uuid::new_v4().to_string(),
        }
    }

    fn update_input(&self) -> UpdateWorkloadInput {
        UpdateWorkloadInput {
            workload_name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            environment: Some(self.environment.clone()),
            review_owner: Some(self.review_owner.clone()),
            aws_regions: Some(self.regions.clone()),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum CreateOutcome {
    Created(WorkloadRef),
    /// A workload with the same name exists; its id is found by lookup.
    AlreadyExists,
    Failed(LabsError),
}

/// Choices to select for one question, both given by title.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionChoices {
    pub question_title: String,
    pub choice_titles: Vec<String>,
}

impl QuestionChoices {
    pub fn new(question_title: &str, choice_titles: &[&str]) -> Self {
        QuestionChoices {
            question_title: question_title.to_string(),
            choice_titles: choice_titles.iter().map(|title| title.to_string()).collect(),
        }
    }
}

pub struct WorkloadReconciler<C: WellArchitected> {
    client: C,
    context: InvocationContext,
    title_match: TitleMatch,
    notes: String,
}

impl<C: WellArchitected> WorkloadReconciler<C> {
    pub fn new(client: C, context: InvocationContext) -> Self {
        WorkloadReconciler {
            client,
            context,
            title_match: TitleMatch::default(),
            notes: DEFAULT_ANSWER_NOTES.to_string(),
        }
    }

    pub fn with_title_match(mut self, title_match: TitleMatch) -> Self {
        self.title_match = title_match;
        self
    }

    pub fn with_notes(mut self, notes: &str) -> Self {
        self.notes = notes.to_string();
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    fn first_match<'a, T, F>(&self, items: &'a [T], title: F, kind: &str, wanted: &str) -> Result<&'a T>
    where
        F: Fn(&T) -> &str,
    {
        let mut matches = items
            .iter()
            .filter(|item| self.title_match.matches(title(*item), wanted));
        let first = matches.next().ok_or_else(|| {
            LabsError::NotFound(format!("no {} titled '{}'", kind, wanted))
        })?;
        let others = matches.count();
        if others > 0 {
            warn!(
                "[{}] '{}' matches {} {}s, using '{}'",
                self.context.request_id,
                wanted,
                others + 1,
                kind,
                title(first)
            );
        }
        Ok(first)
    }

    pub async fn create_workload(&self, descriptor: &WorkloadDescriptor) -> CreateOutcome {
        match self.client.create_workload(&descriptor.create_input()).await {
            Ok(workload) => CreateOutcome::Created(workload),
            Err(error) if error.is_conflict() => CreateOutcome::AlreadyExists,
            Err(error) => CreateOutcome::Failed(error),
        }
    }

    /// First workload, in API order, whose name matches `name`.
    pub async fn find_workload(&self, name: &str) -> Result<WorkloadRef> {
        let mut summaries: Vec<WorkloadSummary> = vec![];
        let mut next_token = None;
        loop {
            let page = self.client.list_workloads(name, next_token).await?;
            summaries.extend(page.workload_summaries);
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        let summary = self.first_match(
            &summaries,
            |summary| summary.workload_name.as_str(),
            "workload",
            name,
        )?;
        Ok(summary.workload_ref())
    }

    /// Applies description, owner, environment and regions, then tags.
    /// Failures are logged only.
    pub async fn update_workload(&self, workload: &WorkloadRef, descriptor: &WorkloadDescriptor) {
        if let Err(error) = self
            .client
            .update_workload(&workload.id, &descriptor.update_input())
            .await
        {
            warn!(
                "[{}] Failed to update workload {}: {}",
                self.context.request_id, workload.id, error
            );
        }
        if descriptor.tags.is_empty() {
            return;
        }
        if let Err(error) = self.client.tag_resource(&workload.arn, &descriptor.tags).await {
            warn!(
                "[{}] Failed to tag workload {}: {}",
                self.context.request_id, workload.arn, error
            );
        }
    }

    /// Creates the workload, or finds and updates the one holding its name.
    pub async fn ensure_workload(&self, descriptor: &WorkloadDescriptor) -> Result<WorkloadRef> {
        match self.create_workload(descriptor).await {
            CreateOutcome::Created(workload) => {
                info!(
                    "[{}] Created workload {} ({})",
                    self.context.request_id, descriptor.name, workload.id
                );
                Ok(workload)
            }
            CreateOutcome::AlreadyExists => {
                info!(
                    "[{}] Workload {} already exists, updating it",
                    self.context.request_id, descriptor.name
                );
                let workload = self.find_workload(&descriptor.name).await?;
                self.update_workload(&workload, descriptor).await;
                Ok(workload)
            }
            CreateOutcome::Failed(error) => {
                error!(
                    "[{}] Failed to create workload {}: {}",
                    self.context.request_id, descriptor.name, error
                );
                Err(error)
            }
        }
    }

    /// Every answer summary of the query, across all pages.
    pub async fn answer_summaries(&self, query: &AnswerQuery) -> Result<Vec<AnswerSummary>> {
        let mut summaries = vec![];
        let mut next_token = None;
        loop {
            let page = self.client.list_answers(query, next_token).await?;
            summaries.extend(page.answer_summaries);
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(summaries)
    }

    pub async fn find_question_id(
        &self,
        workload_id: &str,
        lens_alias: &str,
        pillar_id: &str,
        question_title: &str,
    ) -> Result<String> {
        let query = AnswerQuery {
            workload_id: workload_id.to_string(),
            lens_alias: lens_alias.to_string(),
            pillar_id: Some(pillar_id.to_string()),
            milestone_number: None,
        };
        let summaries = self.answer_summaries(&query).await?;
        let summary = self.first_match(
            &summaries,
            |summary| summary.question_title.as_str(),
            "question",
            question_title,
        )?;
        Ok(summary.question_id.clone())
    }

    /// Resolves choice titles to ids, keeping the order of `choice_titles`.
    pub fn find_choice_ids(&self, answer: &Answer, choice_titles: &[String]) -> Result<Vec<String>> {
        choice_titles
            .iter()
            .map(|wanted| {
                self.first_match(&answer.choices, |choice| choice.title.as_str(), "choice", wanted)
                    .map(|choice| choice.choice_id.clone())
            })
            .collect()
    }

    pub async fn update_answer(
        &self,
        workload_id: &str,
        lens_alias: &str,
        question_id: &str,
        choice_ids: Vec<String>,
    ) -> Result<Answer> {
        let update = AnswerUpdate {
            selected_choices: choice_ids,
            notes: self.notes.clone(),
        };
        self.client
            .update_answer(workload_id, lens_alias, question_id, &update)
            .await
    }

    /// Selects the given choices question by question and returns how many
    /// questions were updated. Stops at the first failure; questions already
    /// updated stay updated.
    pub async fn ensure_answers(
        &self,
        workload_id: &str,
        lens_alias: &str,
        pillar_id: &str,
        answers: &[QuestionChoices],
    ) -> Result<usize> {
        let mut applied = 0;
        for wanted in answers {
            let question_id = self
                .find_question_id(workload_id, lens_alias, pillar_id, &wanted.question_title)
                .await?;
            info!(
                "[{}] Found QuestionID of '{}' for the question text of '{}'",
                self.context.request_id, question_id, wanted.question_title
            );

            let answer = self
                .client
                .get_answer(workload_id, lens_alias, &question_id)
                .await?;
            let choice_ids = self.find_choice_ids(&answer, &wanted.choice_titles)?;
            info!(
                "[{}] Selecting {:?} for questionId {}",
                self.context.request_id, choice_ids, question_id
            );

            self.update_answer(workload_id, lens_alias, &question_id, choice_ids)
                .await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Creates a milestone, or returns the number of the existing milestone
    /// with the same name.
    pub async fn ensure_milestone(&self, workload_id: &str, milestone_name: &str) -> Result<i64> {
        match self.client.create_milestone(workload_id, milestone_name).await {
            Ok(number) => Ok(number),
            Err(error) if error.is_conflict() => {
                info!(
                    "[{}] Milestone {} already exists",
                    self.context.request_id, milestone_name
                );
                let mut milestones: Vec<MilestoneSummary> = vec![];
                let mut next_token = None;
                loop {
                    let page = self.client.list_milestones(workload_id, next_token).await?;
                    milestones.extend(page.milestone_summaries);
                    match page.next_token {
                        Some(token) => next_token = Some(token),
                        None => break,
                    }
                }
                milestones
                    .into_iter()
                    .find(|milestone| milestone.milestone_name == milestone_name)
                    .map(|milestone| milestone.milestone_number)
                    .ok_or_else(|| {
                        LabsError::NotFound(format!("no milestone named '{}'", milestone_name))
                    })
            }
            Err(error) => Err(error),
        }
    }
}
