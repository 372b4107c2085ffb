use env_logger::Env;
use lambda::{handler_fn, Context, Error};
use log::info;
use serde_json::Value;
use std::env;

use wa_labs_toolkit::vpc_stack::{VpcEvent, VpcStackClient, DEFAULT_REGION};

const LOG_LEVEL_VAR: &str = "log_level";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // The effective level is chosen per event.
    env_logger::Builder::from_env(Env::default().default_filter_or("debug")).init();
    lambda::run(handler_fn(deploy_handler)).await?;
    Ok(())
}

async fn deploy_handler(event: Value, context: Context) -> Result<Value, Error> {
    let vpc_event: VpcEvent = serde_json::from_value(event.clone())?;
    let environment_level = env::var(LOG_LEVEL_VAR).ok();
    log::set_max_level(vpc_event.effective_log_level(environment_level.as_deref()));
    info!("event: {}", event);
    info!("context.request_id: {}", context.request_id);

    let default_region = env::var("AWS_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
    let location = vpc_event.location(&default_region);
    let output = VpcStackClient::new(&location.region)?
        .deploy(&vpc_event, &default_region)
        .await?;
    Ok(serde_json::to_value(output)?)
}
