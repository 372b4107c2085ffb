//! Walks a workload through a complete Well-Architected review: lenses,
//! answers, a milestone, the review report, and finally its deletion.

use env_logger::Env;
use log::info;
use rusoto_core::Region;
use std::collections::BTreeMap;
use std::io::{self, Write};

use wa_labs_toolkit::config::Config;
use wa_labs_toolkit::context::InvocationContext;
use wa_labs_toolkit::well_architected_client::{AnswerQuery, WellArchitected, WellArchitectedClient};
use wa_labs_toolkit::workload_reconciler::{QuestionChoices, WorkloadDescriptor, WorkloadReconciler};

const LENS_ALIAS: &str = "wellarchitected";
const SERVERLESS_LENS: &str = "serverless";
const PILLAR_ID: &str = "operationalExcellence";
const QUESTION: &str = "How do you reduce defects, ease remediation, and improve flow into production";
const CHOICES: [&str; 5] = [
    "Use version control",
    "Use configuration management systems",
    "Use build and deployment management systems",
    "Perform patch management",
    "Use multiple environments",
];
const MILESTONE_NAME: &str = "Rev1";
const REPORT_FILE: &str = "WAReviewOutput.pdf";

fn lab_workload(region: &Region) -> WorkloadDescriptor {
    WorkloadDescriptor {
        name: "WA Lab Test Workload".to_string(),
        description: "Test Workload for WA Lab".to_string(),
        review_owner: "WA Rust Script".to_string(),
        environment: "PRODUCTION".to_string(),
        regions: vec![region.name().to_string()],
        lenses: vec![LENS_ALIAS.to_string(), SERVERLESS_LENS.to_string()],
        tags: BTreeMap::new(),
    }
}

async fn log_lenses<C: WellArchitected>(client: &C, workload_id: &str) -> anyhow::Result<()> {
    let workload = client.get_workload(workload_id).await?;
    info!("Workload ID '{}' has lenses {:?}", workload_id, workload.lenses);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let config = Config::from_env()?;
    let region = Region::default();

    info!("1 - Starting session in {}", region.name());
    let reconciler = WorkloadReconciler::new(
        WellArchitectedClient::new(region.clone()),
        InvocationContext::local(),
    )
    .with_title_match(config.title_match)
    .with_notes(&config.answer_notes);
    let client = reconciler.client();

    info!("2 - Creating a new workload");
    let workload = reconciler.ensure_workload(&lab_workload(&region)).await?;
    info!("Workload id {}", workload.id);

    info!("2 - Using WorkloadId to remove and add lenses");
    let lenses: Vec<String> = client
        .list_lenses()
        .await?
        .into_iter()
        .map(|lens| lens.lens_alias)
        .collect();
    info!("Lenses currently available: {:?}", lenses);
    log_lenses(client, &workload.id).await?;
    let serverless = vec![SERVERLESS_LENS.to_string()];
    info!("Removing the serverless lens");
    client.disassociate_lenses(&workload.id, &serverless).await?;
    log_lenses(client, &workload.id).await?;
    info!("Adding serverless lens back into the workload");
    client.associate_lenses(&workload.id, &serverless).await?;
    log_lenses(client, &workload.id).await?;

    info!("3 - Performing a review");
    let applied = reconciler
        .ensure_answers(
            &workload.id,
            LENS_ALIAS,
            PILLAR_ID,
            &[QuestionChoices::new(QUESTION, &CHOICES)],
        )
        .await?;
    info!("Updated {} questions", applied);

    info!("4 - Saving a Milestone");
    let milestones = client.list_milestones(&workload.id, None).await?;
    info!(
        "Workload {} has {} milestones",
        workload.id,
        milestones.milestone_summaries.len()
    );
    let milestone_number = reconciler.ensure_milestone(&workload.id, MILESTONE_NAME).await?;
    info!("Milestone #{} called {}", milestone_number, MILESTONE_NAME);

    let milestone = client.get_milestone(&workload.id, milestone_number).await?;
    info!(
        "Risk counts for all lenses for milestone {} are: {:?}",
        milestone_number, milestone.workload.risk_counts
    );

    let answers = reconciler
        .answer_summaries(&AnswerQuery {
            workload_id: workload.id.clone(),
            lens_alias: LENS_ALIAS.to_string(),
            pillar_id: None,
            milestone_number: Some(milestone_number),
        })
        .await?;
    for answer in &answers {
        info!(
            "{} [{}]: {}",
            answer.question_id,
            answer.risk.as_deref().unwrap_or("UNANSWERED"),
            answer.question_title
        );
    }

    info!("5 - Viewing and downloading the report");
    let review = client.get_lens_review(&workload.id, LENS_ALIAS, None).await?;
    info!(
        "The Well-Architected base framework has the following RiskCounts {:?}",
        review.risk_counts
    );
    for pillar in &review.pillar_review_summaries {
        info!(
            "{}: {:?}",
            pillar.pillar_name.as_deref().unwrap_or(&pillar.pillar_id),
            pillar.risk_counts
        );
    }

    let report = client
        .get_lens_review_report(&workload.id, LENS_ALIAS, None)
        .await?;
    match report.base64_string {
        Some(encoded) => {
            std::fs::write(REPORT_FILE, base64::decode(encoded)?)?;
            info!("Report written to {}", REPORT_FILE);
        }
        None => info!("No report returned for {}", LENS_ALIAS),
    }

    info!("6 - Teardown");
    print!("\n*** Press Enter to delete the workload or use ctrl-c to abort the script and keep the workload");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;

    info!("Deleting workload {}", workload.id);
    client.delete_workload(&workload.id).await?;
    Ok(())
}
