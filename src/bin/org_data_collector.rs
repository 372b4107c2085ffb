use lambda::{handler_fn, Context, Error};
use log::info;
use rusoto_core::Region;
use rusoto_glue::GlueClient;
use rusoto_organizations::OrganizationsClient;
use serde_json::{json, Value};

use wa_labs_toolkit::config::Config;
use wa_labs_toolkit::context::InvocationContext;
use wa_labs_toolkit::cross_account_client::CrossAccountClient;
use wa_labs_toolkit::error::LabsError;
use wa_labs_toolkit::organization_client::{
    OrganizationClient, ORGANIZATIONS_REGION, ORGANIZATION_SESSION_NAME,
};
use wa_labs_toolkit::record_sink::RecordSink;
use wa_labs_toolkit::s3_upload::{start_crawler, S3Uploader};

const UNIT_ACCOUNTS: &str = "ou-org";
const ROOT_ACCOUNTS: &str = "acc-org";

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    lambda::run(handler_fn(org_handler)).await?;
    Ok(())
}

async fn org_handler(_: Value, context: Context) -> Result<Value, Error> {
    let context = InvocationContext::from_lambda(&context);
    let config = Config::from_env()?;
    let role_name = config.require_role_name()?;
    let management_account_id = config.require_management_account_id()?;
    let upload = config.require_upload()?;

    let accounts = CrossAccountClient::new(role_name).with_session_name(ORGANIZATION_SESSION_NAME);
    let client: OrganizationsClient = accounts
        .acquire_client(management_account_id, ORGANIZATIONS_REGION)
        .await
        .ok_or_else(|| {
            LabsError::Authorization(format!(
                "cannot assume {} in management account {}",
                role_name, management_account_id
            ))
        })?;
    let organization = OrganizationClient::new_with_client(client, config.tag_keys.clone());

    let root_id = organization.root_id().await?;
    let units = organization.organizational_units(&root_id).await?;
    info!(
        "[{}] Found {} organizational units under {}",
        context.request_id,
        units.len(),
        root_id
    );

    let unit_path = config.output_path(&format!("{}.json", UNIT_ACCOUNTS));
    let mut sink = RecordSink::create(&unit_path)?;
    let summary = organization.write_unit_accounts(&units, &mut sink).await;
    let unit_file = sink.close(&unit_path)?;

    let root_path = config.output_path(&format!("{}.json", ROOT_ACCOUNTS));
    let mut sink = RecordSink::create(&root_path)?;
    organization.write_root_accounts(&root_id, &mut sink).await?;
    let root_file = sink.close(&root_path)?;

    let uploader = S3Uploader::new(upload)?;
    let uploaded = uploader
        .upload_organisation_files(
            upload,
            &[(UNIT_ACCOUNTS, &unit_file), (ROOT_ACCOUNTS, &root_file)],
        )
        .await;

    if let Some(ref crawler) = config.crawler {
        start_crawler(&GlueClient::new(Region::default()), crawler).await;
    }

    Ok(json!({
        "unit_accounts": unit_file.records,
        "root_accounts": root_file.records,
        "skipped_units": summary.skipped,
        "uploaded": uploaded,
    }))
}
