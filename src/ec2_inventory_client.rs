use async_trait::async_trait;
use rusoto_core::Region;
use rusoto_ec2::{
    BlockDeviceMapping, DescribeImagesRequest, DescribeSnapshotsRequest, Ec2, Ec2Client,
    EbsBlockDevice, Image, ProductCode, Snapshot, StateReason, Tag,
};
use std::fmt::{self, Display, Formatter};
use std::io::Write;
use std::path::Path;

use crate::cross_account_client::CrossAccountClient;
use crate::error::Result;
use crate::paginated_collector::{collect_units, CollectionSummary, Page, PageSource};
use crate::record::{Field, Record};
use crate::record_sink::{CollectedFile, RecordSink};

const SELF_OWNER: &str = "self";
const SNAPSHOT_PAGE_SIZE: i64 = 1000;

fn records<T: Into<Record>>(items: Option<Vec<T>>) -> Option<Vec<Record>> {
    items.map(|items| items.into_iter().map(Into::into).collect())
}

impl From<Tag> for Record {
    fn from(tag: Tag) -> Self {
        Record::new()
            .with_some("Key", tag.key)
            .with_some("Value", tag.value)
    }
}

impl From<EbsBlockDevice> for Record {
    fn from(ebs: EbsBlockDevice) -> Self {
        Record::new()
            .with_some("DeleteOnTermination", ebs.delete_on_termination)
            .with_some("Iops", ebs.iops)
            .with_some("SnapshotId", ebs.snapshot_id)
            .with_some("VolumeSize", ebs.volume_size)
            .with_some("VolumeType", ebs.volume_type)
            .with_some("KmsKeyId", ebs.kms_key_id)
            .with_some("Throughput", ebs.throughput)
            .with_some("OutpostArn", ebs.outpost_arn)
            .with_some("Encrypted", ebs.encrypted)
    }
}

impl From<BlockDeviceMapping> for Record {
    fn from(mapping: BlockDeviceMapping) -> Self {
        Record::new()
            .with_some("DeviceName", mapping.device_name)
            .with_some("VirtualName", mapping.virtual_name)
            .with_some("Ebs", mapping.ebs.map(Record::from))
            .with_some("NoDevice", mapping.no_device)
    }
}

impl From<ProductCode> for Record {
    fn from(code: ProductCode) -> Self {
        Record::new()
            .with_some("ProductCodeId", code.product_code_id)
            .with_some("ProductCodeType", code.product_code_type)
    }
}

impl From<StateReason> for Record {
    fn from(reason: StateReason) -> Self {
        Record::new()
            .with_some("Code", reason.code)
            .with_some("Message", reason.message)
    }
}

/// Every attribute the API returned. Absent attributes get no key.
impl From<Image> for Record {
    fn from(image: Image) -> Self {
        Record::new()
            .with_some("Architecture", image.architecture)
            .with_some("CreationDate", image.creation_date.map(Field::timestamp))
            .with_some("ImageId", image.image_id)
            .with_some("ImageLocation", image.image_location)
            .with_some("ImageType", image.image_type)
            .with_some("Public", image.public)
            .with_some("KernelId", image.kernel_id)
            .with_some("OwnerId", image.owner_id)
            .with_some("Platform", image.platform)
            .with_some("PlatformDetails", image.platform_details)
            .with_some("UsageOperation", image.usage_operation)
            .with_some("ProductCodes", records(image.product_codes))
            .with_some("RamdiskId", image.ramdisk_id)
            .with_some("State", image.state)
            .with_some("BlockDeviceMappings", records(image.block_device_mappings))
            .with_some("Description", image.description)
            .with_some("EnaSupport", image.ena_support)
            .with_some("Hypervisor", image.hypervisor)
            .with_some("ImageOwnerAlias", image.image_owner_alias)
            .with_some("Name", image.name)
            .with_some("RootDeviceName", image.root_device_name)
            .with_some("RootDeviceType", image.root_device_type)
            .with_some("SriovNetSupport", image.sriov_net_support)
            .with_some("StateReason", image.state_reason.map(Record::from))
            .with_some("Tags", records(image.tags))
            .with_some("VirtualizationType", image.virtualization_type)
            .with_some("BootMode", image.boot_mode)
            .with_some("DeprecationTime", image.deprecation_time.map(Field::timestamp))
    }
}

impl From<Snapshot> for Record {
    fn from(snapshot: Snapshot) -> Self {
        Record::new()
            .with_some("DataEncryptionKeyId", snapshot.data_encryption_key_id)
            .with_some("Description", snapshot.description)
            .with_some("Encrypted", snapshot.encrypted)
            .with_some("KmsKeyId", snapshot.kms_key_id)
            .with_some("OwnerId", snapshot.owner_id)
            .with_some("Progress", snapshot.progress)
            .with_some("SnapshotId", snapshot.snapshot_id)
            .with_some("StartTime", snapshot.start_time.map(Field::timestamp))
            .with_some("State", snapshot.state)
            .with_some("StateMessage", snapshot.state_message)
            .with_some("VolumeId", snapshot.volume_id)
            .with_some("VolumeSize", snapshot.volume_size)
            .with_some("OwnerAlias", snapshot.owner_alias)
            .with_some("OutpostArn", snapshot.outpost_arn)
            .with_some("Tags", records(snapshot.tags))
    }
}

/// AMIs owned by the account. `DescribeImages` answers in a single page.
pub struct ImagePageSource {
    client: Ec2Client,
}

impl ImagePageSource {
    pub fn new(client: Ec2Client) -> Self {
        ImagePageSource { client }
    }
}

#[async_trait]
impl PageSource for ImagePageSource {
    async fn fetch_page(&self, _next_token: Option<String>) -> Result<Page> {
        let result = self
            .client
            .describe_images(DescribeImagesRequest {
                owners: Some(vec![SELF_OWNER.to_string()]),
                ..DescribeImagesRequest::default()
            })
            .await?;

        Ok(Page::last(
            result
                .images
                .unwrap_or_default()
                .into_iter()
                .map(Record::from)
                .collect(),
        ))
    }
}

/// EBS snapshots owned by the account.
pub struct SnapshotPageSource {
    client: Ec2Client,
}

impl SnapshotPageSource {
    pub fn new(client: Ec2Client) -> Self {
        SnapshotPageSource { client }
    }
}

#[async_trait]
impl PageSource for SnapshotPageSource {
    async fn fetch_page(&self, next_token: Option<String>) -> Result<Page> {
        let result = self
            .client
            .describe_snapshots(DescribeSnapshotsRequest {
                owner_ids: Some(vec![SELF_OWNER.to_string()]),
                max_results: Some(SNAPSHOT_PAGE_SIZE),
                next_token,
                ..DescribeSnapshotsRequest::default()
            })
            .await?;

        Ok(Page {
            records: result
                .snapshots
                .unwrap_or_default()
                .into_iter()
                .map(Record::from)
                .collect(),
            next_token: result.next_token,
        })
    }
}

/// A region of a member account, the unit of work of the EC2 collectors.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRegion {
    pub account_id: String,
    pub region: Region,
}

impl Display for AccountRegion {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} {}", self.account_id, self.region.name())
    }
}

pub fn account_regions(account_id: &str, regions: &[Region]) -> Vec<AccountRegion> {
    regions
        .iter()
        .map(|region| AccountRegion {
            account_id: account_id.to_string(),
            region: region.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ec2Inventory {
    Images,
    Snapshots,
}

impl Ec2Inventory {
    fn source(&self, client: Ec2Client) -> Box<dyn PageSource> {
        match self {
            Ec2Inventory::Images => Box::new(ImagePageSource::new(client)),
            Ec2Inventory::Snapshots => Box::new(SnapshotPageSource::new(client)),
        }
    }
}

/// Collects `inventory` from every region of `account_id`, assuming the
/// collector role once per region. Regions that fail are skipped.
pub async fn collect_account<W: Write>(
    accounts: &CrossAccountClient,
    inventory: Ec2Inventory,
    units: &[AccountRegion],
    sink: &mut RecordSink<W>,
) -> CollectionSummary {
    collect_units(units, sink, |unit: &AccountRegion| {
        let unit = unit.clone();
        async move {
            accounts
                .acquire_client::<Ec2Client>(&unit.account_id, unit.region)
                .await
                .map(|client| inventory.source(client))
        }
    })
    .await
}

/// Collects `inventory` from `regions` of `account_id` into a new file at `path`.
pub async fn collect_account_to_file(
    accounts: &CrossAccountClient,
    inventory: Ec2Inventory,
    account_id: &str,
    regions: &[Region],
    path: &Path,
) -> Result<(CollectedFile, CollectionSummary)> {
    let mut sink = RecordSink::create(path)?;
    let summary = collect_account(
        accounts,
        inventory,
        &account_regions(account_id, regions),
        &mut sink,
    )
    .await;
    Ok((sink.close(path)?, summary))
}

#[cfg(test)]
mod tests {
    use crate::ec2_inventory_client::{account_regions, ImagePageSource, SnapshotPageSource};
    use crate::paginated_collector::tests::StubPages;
    use crate::paginated_collector::{collect, collect_units, PageSource};
    use crate::record::{to_json_line, Field, Record};
    use crate::record_sink::RecordSink;
    use chrono::{TimeZone, Utc};
    use futures::TryStreamExt;
    use rusoto_core::Region;
    use rusoto_ec2::{Ec2Client, Snapshot};
    use rusoto_mock::{
        MockCredentialsProvider, MockRequestDispatcher, MockResponseReader,
        MultipleMockRequestDispatcher, ReadMockResponse,
    };
    use serde_json::Value;

    fn response(file: &str) -> MockRequestDispatcher {
        MockRequestDispatcher::default().with_body(&*MockResponseReader::read_response(
            "test_resources/valid",
            file,
        ))
    }

    #[tokio::test]
    async fn test_describe_images() {
        let mock = Ec2Client::new_with(
            response("describe_images.xml"),
            MockCredentialsProvider,
            Default::default(),
        );

        let page = ImagePageSource::new(mock).fetch_page(None).await.unwrap();

        assert_eq!(page.records.len(), 2);
        assert_eq!(page.next_token, None);
        let image = &page.records[0];
        assert_eq!(
            image.get("ImageId"),
            Some(&Field::String("ami-1234567890EXAMPLE".to_string()))
        );
        assert_eq!(
            image.get("CreationDate"),
            Some(&Field::DateTime(Utc.ymd(2019, 1, 12).and_hms(0, 0, 0)))
        );
    }

    #[tokio::test]
    async fn test_image_keeps_nested_attributes() {
        let mock = Ec2Client::new_with(
            response("describe_images.xml"),
            MockCredentialsProvider,
            Default::default(),
        );

        let page = ImagePageSource::new(mock).fetch_page(None).await.unwrap();

        let line = to_json_line(&page.records[0]).unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        let ebs = &value["BlockDeviceMappings"][0]["Ebs"];
        assert_eq!(ebs["SnapshotId"], "snap-1234567890EXAMPLE");
        assert_eq!(ebs["VolumeSize"], 8);
        assert_eq!(ebs["DeleteOnTermination"], true);
        assert_eq!(value["BlockDeviceMappings"][0]["DeviceName"], "/dev/xvda");
        assert_eq!(value["ProductCodes"][0]["ProductCodeType"], "marketplace");
        assert_eq!(value["EnaSupport"], true);
        assert_eq!(value["Hypervisor"], "xen");
        assert_eq!(value["PlatformDetails"], "Linux/UNIX");
        assert_eq!(value["UsageOperation"], "RunInstances");
        assert_eq!(value["Tags"][0]["Key"], "Env");
        assert_eq!(value["Tags"][0]["Value"], "prod");
    }

    #[tokio::test]
    async fn test_absent_attributes_have_no_key() {
        let mock = Ec2Client::new_with(
            response("describe_images.xml"),
            MockCredentialsProvider,
            Default::default(),
        );

        let page = ImagePageSource::new(mock).fetch_page(None).await.unwrap();

        let second = &page.records[1];
        assert!(second.get("Description").is_none());
        assert!(second.get("BlockDeviceMappings").is_none());
        assert!(!to_json_line(second).unwrap().contains("null"));
    }

    #[test]
    fn test_snapshot_record_keeps_every_attribute() {
        let snapshot = Snapshot {
            snapshot_id: Some("snap-1".to_string()),
            state_message: Some("copying".to_string()),
            outpost_arn: Some("arn:aws:outposts:us-east-1:111111111111:outpost/op-1".to_string()),
            data_encryption_key_id: Some("key-1".to_string()),
            ..Snapshot::default()
        };

        let record = Record::from(snapshot);

        assert_eq!(record.len(), 4);
        assert_eq!(record.get("StateMessage"), Some(&Field::String("copying".to_string())));
        assert!(record.get("OutpostArn").is_some());
    }

    #[tokio::test]
    async fn test_describe_snapshots_follows_next_token() {
        let mock = Ec2Client::new_with(
            MultipleMockRequestDispatcher::new(vec![
                response("describe_snapshots_page1.xml"),
                response("describe_snapshots_page2.xml"),
            ]),
            MockCredentialsProvider,
            Default::default(),
        );
        let source = SnapshotPageSource::new(mock);

        let records: Vec<Record> = collect(&source).try_collect().await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(
            records[2].get("SnapshotId"),
            Some(&Field::String("snap-3333333333EXAMPLE".to_string()))
        );
        assert_eq!(records[0].get("VolumeSize"), Some(&Field::Integer(8)));
    }

    #[tokio::test]
    async fn test_describe_images_error() {
        let mock = Ec2Client::new_with(
            MockRequestDispatcher::with_status(400).with_body(&*MockResponseReader::read_response(
                "test_resources/error",
                "describe_images.xml",
            )),
            MockCredentialsProvider,
            Default::default(),
        );

        let result = ImagePageSource::new(mock).fetch_page(None).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_image_collection_writes_one_line_per_image() {
        let units = account_regions("111111111111", &[Region::UsEast1]);
        let mut sink = RecordSink::new(Vec::new());

        let summary = collect_units(&units, &mut sink, |_| async {
            Some(StubPages::new(&[2, 1], "ImageId"))
        })
        .await;

        assert_eq!(summary.written, 3);
        assert!(summary.skipped.is_empty());
        let output = String::from_utf8(sink.finish().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let value: Value = serde_json::from_str(line).unwrap();
            assert!(value.get("ImageId").is_some());
        }
    }

    #[test]
    fn test_account_region_display() {
        let units = account_regions("111111111111", &[Region::UsEast1, Region::EuWest1]);
        assert_eq!(units[1].to_string(), "111111111111 eu-west-1");
    }
}
