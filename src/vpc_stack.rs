use log::{debug, info, LevelFilter};
use rusoto_cloudformation::{
    CloudFormation, CloudFormationClient, CreateStackInput, DescribeStacksInput, Parameter, Tag,
};
use rusoto_core::Region;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{LabsError, Result};

pub const STACK_NAME: &str = "ResiliencyVPC";
pub const DEFAULT_REGION: &str = "us-east-2";
pub const DEFAULT_BUCKET: &str = "aws-well-architected-labs-ohio";
pub const DEFAULT_FOLDER: &str = "/";
pub const DEFAULT_WORKSHOP: &str = "UnknownWorkshop";
const TEMPLATE_FILE: &str = "three_az_vpc_sg_nat.json";
const CAPABILITY_NAMED_IAM: &str = "CAPABILITY_NAMED_IAM";
const TIMEOUT_IN_MINUTES: i64 = 10;

const CIDR_PARAMETERS: [(&str, &str); 8] = [
    ("BastionCidrIp", "0.0.0.0/0"),
    ("VPCCidrBlock", "10.0.0.0/16"),
    ("IGWCidrBlock1", "10.0.0.0/20"),
    ("IGWCidrBlock2", "10.0.16.0/20"),
    ("IGWCidrBlock3", "10.0.32.0/20"),
    ("PrivateCidrBlock1", "10.0.48.0/20"),
    ("PrivateCidrBlock2", "10.0.64.0/20"),
    ("PrivateCidrBlock3", "10.0.80.0/20"),
];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VpcEvent {
    pub region_name: Option<String>,
    pub cfn_region: Option<String>,
    pub cfn_bucket: Option<String>,
    pub folder: Option<String>,
    pub workshop: Option<String>,
    pub log_level: Option<String>,
}

/// Where the stack is created and where its template is read from.
#[derive(Debug, Clone, PartialEq)]
pub struct StackLocation {
    pub region: String,
    pub cfn_region: String,
    pub bucket: String,
    pub folder: String,
}

impl StackLocation {
    pub fn template_url(&self) -> String {
        format!(
            "https://s3.{}.amazonaws.com/{}/{}{}",
            self.cfn_region, self.bucket, self.folder, TEMPLATE_FILE
        )
    }
}

impl VpcEvent {
    /// The location given by the event. If any part is missing the whole
    /// location falls back to `default_region` and the public lab bucket.
    pub fn location(&self, default_region: &str) -> StackLocation {
        match (&self.region_name, &self.cfn_region, &self.cfn_bucket, &self.folder) {
            (Some(region), Some(cfn_region), Some(bucket), Some(folder)) => StackLocation {
                region: region.clone(),
                cfn_region: cfn_region.clone(),
                bucket: bucket.clone(),
                folder: folder.clone(),
            },
            _ => {
                debug!("Incomplete stack location in event, using defaults");
                StackLocation {
                    region: default_region.to_string(),
                    cfn_region: default_region.to_string(),
                    bucket: DEFAULT_BUCKET.to_string(),
                    folder: DEFAULT_FOLDER.to_string(),
                }
            }
        }
    }

    pub fn workshop_name(&self) -> &str {
        self.workshop.as_deref().unwrap_or(DEFAULT_WORKSHOP)
    }

    /// Level named by the event; anything unknown means INFO.
    pub fn log_level(&self) -> LevelFilter {
        level_filter(self.log_level.as_deref())
    }

    /// A `log_level` set in the function environment wins over the event.
    pub fn effective_log_level(&self, environment_level: Option<&str>) -> LevelFilter {
        match environment_level {
            Some(level) => level_filter(Some(level)),
            None => self.log_level(),
        }
    }
}

/// Maps Python style level names.
fn level_filter(name: Option<&str>) -> LevelFilter {
    match name.map(str::to_ascii_uppercase).as_deref() {
        Some("CRITICAL") | Some("ERROR") => LevelFilter::Error,
        Some("WARNING") | Some("WARN") => LevelFilter::Warn,
        Some("DEBUG") => LevelFilter::Debug,
        _ => LevelFilter::Info,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployOutput {
    pub stackname: String,
}

fn parameter(key: &str, value: &str) -> Parameter {
    Parameter {
        parameter_key: Some(key.to_string()),
        parameter_value: Some(value.to_string()),
        use_previous_value: Some(true),
        ..Parameter::default()
    }
}

pub fn vpc_parameters(region: &str, workshop_name: &str) -> Vec<Parameter> {
    let mut parameters: Vec<Parameter> = CIDR_PARAMETERS
        .iter()
        .map(|(key, value)| parameter(key, value))
        .collect();
    for (index, zone) in ["a", "b", "c"].iter().enumerate() {
        parameters.push(parameter(
            &format!("AvailabilityZone{}", index + 1),
            &format!("{}{}", region, zone),
        ));
    }
    parameters.push(parameter("WorkshopName", workshop_name));
    parameters
}

pub fn stack_tags(workshop_name: &str) -> Vec<Tag> {
    vec![Tag {
        key: "Workshop".to_string(),
        value: format!("AWSWellArchitectedReliability{}", workshop_name),
    }]
}

pub struct VpcStackClient {
    client: CloudFormationClient,
}

impl VpcStackClient {
    pub fn new(region: &str) -> Result<Self> {
        let region = Region::from_str(region).map_err(|error| LabsError::Config(error.to_string()))?;
        Ok(VpcStackClient::new_with_client(CloudFormationClient::new(region)))
    }

    pub fn new_with_client(client: CloudFormationClient) -> Self {
        VpcStackClient { client }
    }

    /// A `ValidationError` means the stack does not exist. Any other failure
    /// is treated as existing so nothing gets created.
    pub async fn stack_exists(&self, stack_name: &str) -> bool {
        let result = self
            .client
            .describe_stacks(DescribeStacksInput {
                stack_name: Some(stack_name.to_string()),
                ..DescribeStacksInput::default()
            })
            .await
            .map_err(LabsError::from);

        match result {
            Ok(output) => match output.stacks.unwrap_or_default().first() {
                Some(stack) => {
                    debug!("Found stack named {}, status {}", stack_name, stack.stack_status);
                    true
                }
                None => {
                    debug!("No stack named {}", stack_name);
                    false
                }
            },
            Err(LabsError::Validation(_)) => false,
            Err(error) => {
                debug!(
                    "Stack will not be created: unexpected error looking for stack named {}: {}",
                    stack_name, error
                );
                true
            }
        }
    }

    pub async fn create_vpc_stack(&self, location: &StackLocation, workshop_name: &str) -> Result<Option<String>> {
        let template_url = location.template_url();
        info!("Creating {} from {}", STACK_NAME, template_url);
        let output = self
            .client
            .create_stack(CreateStackInput {
                stack_name: STACK_NAME.to_string(),
                template_url: Some(template_url),
                parameters: Some(vpc_parameters(&location.region, workshop_name)),
                disable_rollback: Some(false),
                timeout_in_minutes: Some(TIMEOUT_IN_MINUTES),
                tags: Some(stack_tags(workshop_name)),
                capabilities: Some(vec![CAPABILITY_NAMED_IAM.to_string()]),
                ..CreateStackInput::default()
            })
            .await?;
        Ok(output.stack_id)
    }

    /// Creates the VPC stack unless it already exists.
    pub async fn deploy(&self, event: &VpcEvent, default_region: &str) -> Result<DeployOutput> {
        let location = event.location(default_region);
        if self.stack_exists(STACK_NAME).await {
            debug!("Stack {} exists", STACK_NAME);
        } else {
            debug!("Stack {} doesn't exist; creating", STACK_NAME);
            let stack_id = self.create_vpc_stack(&location, event.workshop_name()).await?;
            info!("Stack id {}", stack_id.unwrap_or_default());
        }
        Ok(DeployOutput {
            stackname: STACK_NAME.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::vpc_stack::{
        stack_tags, vpc_parameters, VpcEvent, VpcStackClient, DEFAULT_BUCKET, STACK_NAME,
    };
    use log::LevelFilter;
    use rusoto_cloudformation::CloudFormationClient;
    use rusoto_mock::{
        MockCredentialsProvider, MockRequestDispatcher, MockResponseReader,
        MultipleMockRequestDispatcher, ReadMockResponse,
    };

    fn client(dispatcher: MockRequestDispatcher) -> VpcStackClient {
        VpcStackClient::new_with_client(CloudFormationClient::new_with(
            dispatcher,
            MockCredentialsProvider,
            Default::default(),
        ))
    }

    fn response(directory: &str, file: &str) -> String {
        MockResponseReader::read_response(directory, file)
    }

    fn lab_event() -> VpcEvent {
        serde_json::from_str(
            r#"{"log_level":"DEBUG","region_name":"us-west-2","cfn_region":"us-east-2","workshop":"LondonSummit","cfn_bucket":"aws-well-architected-labs-ohio","folder":"Reliability/"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_template_url() {
        assert_eq!(
            lab_event().location("us-east-2").template_url(),
            "https://s3.us-east-2.amazonaws.com/aws-well-architected-labs-ohio/Reliability/three_az_vpc_sg_nat.json"
        );
    }

    #[test]
    fn test_missing_location_falls_back_to_defaults() {
        let event = VpcEvent {
            region_name: Some("us-west-2".to_string()),
            ..VpcEvent::default()
        };

        let location = event.location("eu-west-1");

        assert_eq!(location.region, "eu-west-1");
        assert_eq!(location.bucket, DEFAULT_BUCKET);
        assert_eq!(
            location.template_url(),
            "https://s3.eu-west-1.amazonaws.com/aws-well-architected-labs-ohio//three_az_vpc_sg_nat.json"
        );
        assert_eq!(event.workshop_name(), "UnknownWorkshop");
        assert_eq!(event.log_level(), LevelFilter::Info);
    }

    #[test]
    fn test_vpc_parameters() {
        let parameters = vpc_parameters("us-west-2", "LondonSummit");

        assert_eq!(parameters.len(), 12);
        let zone3 = &parameters[10];
        assert_eq!(zone3.parameter_key.as_deref(), Some("AvailabilityZone3"));
        assert_eq!(zone3.parameter_value.as_deref(), Some("us-west-2c"));
        assert_eq!(parameters[11].parameter_value.as_deref(), Some("LondonSummit"));
        assert!(parameters.iter().all(|p| p.use_previous_value == Some(true)));
        assert_eq!(stack_tags("LondonSummit")[0].value, "AWSWellArchitectedReliabilityLondonSummit");
        assert_eq!(lab_event().log_level(), LevelFilter::Debug);
    }

    #[test]
    fn test_environment_log_level_wins_over_event() {
        let event = lab_event();

        assert_eq!(event.effective_log_level(Some("ERROR")), LevelFilter::Error);
        assert_eq!(event.effective_log_level(Some("warning")), LevelFilter::Warn);
        assert_eq!(event.effective_log_level(None), LevelFilter::Debug);
    }

    #[tokio::test]
    async fn test_validation_error_means_absent() {
        let vpc = client(
            MockRequestDispatcher::with_status(400)
                .with_body(&response("test_resources/error", "describe_stacks.xml")),
        );

        assert!(!vpc.stack_exists(STACK_NAME).await);
    }

    #[tokio::test]
    async fn test_other_errors_mean_present() {
        let vpc = client(MockRequestDispatcher::with_status(500).with_body("internal failure"));

        assert!(vpc.stack_exists(STACK_NAME).await);
    }

    #[tokio::test]
    async fn test_existing_stack_is_left_alone() {
        let vpc = client(
            MockRequestDispatcher::default()
                .with_body(&response("test_resources/valid", "describe_stacks.xml")),
        );

        let output = vpc.deploy(&lab_event(), "us-east-2").await.unwrap();

        assert_eq!(output.stackname, "ResiliencyVPC");
    }

    #[tokio::test]
    async fn test_absent_stack_is_created() {
        let vpc = VpcStackClient::new_with_client(CloudFormationClient::new_with(
            MultipleMockRequestDispatcher::new(vec![
                MockRequestDispatcher::with_status(400)
                    .with_body(&response("test_resources/error", "describe_stacks.xml")),
                MockRequestDispatcher::default()
                    .with_body(&response("test_resources/valid", "create_stack.xml")),
            ]),
            MockCredentialsProvider,
            Default::default(),
        ));

        let output = vpc.deploy(&lab_event(), "us-east-2").await.unwrap();

        assert_eq!(output.stackname, "ResiliencyVPC");
    }
}
