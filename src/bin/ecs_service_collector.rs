use lambda::{handler_fn, Context, Error};
use log::info;
use rusoto_core::Region;
use rusoto_ecs::EcsClient;
use rusoto_glue::GlueClient;
use serde_json::{json, Value};

use wa_labs_toolkit::config::Config;
use wa_labs_toolkit::context::InvocationContext;
use wa_labs_toolkit::cross_account_client::CrossAccountClient;
use wa_labs_toolkit::date_partition::DatePartition;
use wa_labs_toolkit::ecs_service_client::EcsServicePageSource;
use wa_labs_toolkit::error::LabsError;
use wa_labs_toolkit::paginated_collector::{collect, write_records};
use wa_labs_toolkit::record_sink::RecordSink;
use wa_labs_toolkit::s3_upload::{start_crawler, S3Uploader};

const OUTPUT_FILE: &str = "data.json";

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    lambda::run(handler_fn(ecs_handler)).await?;
    Ok(())
}

/// Without an `account_id` in the event the function's own credentials are used.
async fn ecs_client(config: &Config, event: &Value) -> Result<EcsClient, LabsError> {
    match event.get("account_id").and_then(Value::as_str) {
        Some(account_id) => {
            let accounts = CrossAccountClient::new(config.require_role_name()?);
            accounts
                .acquire_client(account_id, Region::default())
                .await
                .ok_or_else(|| {
                    LabsError::Authorization(format!("cannot act in account {}", account_id))
                })
        }
        None => Ok(EcsClient::new(Region::default())),
    }
}

async fn ecs_handler(event: Value, context: Context) -> Result<Value, Error> {
    let context = InvocationContext::from_lambda(&context);
    let config = Config::from_env()?;
    let upload = config.require_upload()?;

    let source = EcsServicePageSource::new(ecs_client(&config, &event).await?);
    let path = config.output_path(OUTPUT_FILE);
    let mut sink = RecordSink::create(&path)?;
    let written = write_records(collect(&source), &mut sink).await?;
    let file = sink.close(&path)?;
    info!("[{}] Collected {} services", context.request_id, written);

    let key = S3Uploader::new(upload)?
        .try_upload_dated(upload, DatePartition::today(), &file)
        .await;

    let crawled = match config.crawler {
        Some(ref crawler) => start_crawler(&GlueClient::new(Region::default()), crawler).await,
        None => false,
    };

    Ok(json!({
        "records": written,
        "key": key,
        "crawler_started": crawled,
    }))
}
