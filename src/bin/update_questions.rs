use lambda::{handler_fn, Context, Error};
use log::{info, warn};
use serde_json::{json, Value};
use std::collections::HashMap;

use wa_labs_toolkit::cfn_response::{handle_question_event, CfnEvent, HttpResponder};
use wa_labs_toolkit::config::Config;
use wa_labs_toolkit::context::InvocationContext;
use wa_labs_toolkit::well_architected_client::WellArchitectedClient;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    lambda::run(handler_fn(question_handler)).await?;
    Ok(())
}

async fn question_handler(event: Value, context: Context) -> Result<Value, Error> {
    let context = InvocationContext::from_lambda(&context);
    info!("[{}] Received event: {}", context.request_id, event);
    let event: CfnEvent = serde_json::from_value(event)?;

    // CloudFormation waits for a response, so a bad setting must not abort here.
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(error) => {
            warn!("[{}] {}, using defaults", context.request_id, error);
            Config::from_vars(HashMap::new())?
        }
    };

    let response = handle_question_event(
        &event,
        &context,
        &config,
        WellArchitectedClient::new,
        &HttpResponder::new(),
    )
    .await?;
    Ok(json!({ "Status": response.status, "Data": response.data }))
}
