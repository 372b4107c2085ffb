pub mod cfn_response;
pub mod config;
pub mod context;
pub mod cross_account_client;
pub mod date_partition;
pub mod ec2_inventory_client;
pub mod ecs_service_client;
pub mod error;
pub mod organization_client;
pub mod paginated_collector;
pub mod record;
pub mod record_sink;
pub mod s3_upload;
pub mod vpc_stack;
pub mod well_architected_client;
pub mod workload_reconciler;
