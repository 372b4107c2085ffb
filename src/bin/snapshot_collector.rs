use lambda::{handler_fn, Context, Error};
use log::info;
use rusoto_core::Region;
use rusoto_ec2::Ec2Client;
use serde::Deserialize;
use serde_json::{json, Value};

use wa_labs_toolkit::config::Config;
use wa_labs_toolkit::context::InvocationContext;
use wa_labs_toolkit::cross_account_client::{available_regions, CrossAccountClient};
use wa_labs_toolkit::date_partition::DatePartition;
use wa_labs_toolkit::ec2_inventory_client::{collect_account_to_file, Ec2Inventory};
use wa_labs_toolkit::s3_upload::S3Uploader;

const OUTPUT_FILE: &str = "data.json";

#[derive(Deserialize)]
pub struct CollectorEvent {
    account_id: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    lambda::run(handler_fn(snapshot_handler)).await?;
    Ok(())
}

async fn snapshot_handler(event: Value, context: Context) -> Result<Value, Error> {
    let context = InvocationContext::from_lambda(&context);
    let event: CollectorEvent = serde_json::from_value(event)?;
    let config = Config::from_env()?;

    let accounts = CrossAccountClient::new(config.require_role_name()?);
    let regions = available_regions(&Ec2Client::new(Region::default())).await?;
    info!(
        "[{}] Collecting snapshots of {} in {} regions",
        context.request_id,
        event.account_id,
        regions.len()
    );

    let path = config.output_path(OUTPUT_FILE);
    let (file, summary) = collect_account_to_file(
        &accounts,
        Ec2Inventory::Snapshots,
        &event.account_id,
        &regions,
        &path,
    )
    .await?;

    let key = match config.upload {
        Some(ref target) => {
            S3Uploader::new(target)?
                .try_upload_dated(target, DatePartition::today(), &file)
                .await
        }
        None => None,
    };

    Ok(json!({
        "records": summary.written,
        "skipped": summary.skipped,
        "key": key,
    }))
}
