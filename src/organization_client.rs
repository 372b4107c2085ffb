use async_trait::async_trait;
use log::info;
use rusoto_core::Region;
use rusoto_organizations::{
    Account, DescribeAccountRequest, DescribeOrganizationalUnitRequest, ListAccountsForParentRequest,
    ListChildrenRequest, ListRootsRequest, ListTagsForResourceRequest, Organizations,
    OrganizationsClient, Tag,
};
use std::fmt::{self, Display, Formatter};
use std::io::Write;

use crate::error::{LabsError, Result};
use crate::paginated_collector::{collect, collect_units, write_records, CollectionSummary, Page, PageSource};
use crate::record::{Field, Record};
use crate::record_sink::RecordSink;

/// Organizations is a global service served from us-east-1 only.
pub const ORGANIZATIONS_REGION: Region = Region::UsEast1;
pub const ORGANIZATION_SESSION_NAME: &str = "cross_acct_lambda";
const CHILD_TYPE_OU: &str = "ORGANIZATIONAL_UNIT";

#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
}

impl Display for OrganizationalUnit {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

impl From<Account> for Record {
    fn from(account: Account) -> Self {
        Record::new()
            .with("Id", account.id)
            .with("Arn", account.arn)
            .with("Email", account.email)
            .with("Name", account.name)
            .with("Status", account.status)
            .with("JoinedMethod", account.joined_method)
            .with("JoinedTimestamp", Field::epoch_seconds(account.joined_timestamp))
    }
}

pub struct OrganizationClient {
    client: OrganizationsClient,
    tag_keys: Vec<String>,
}

impl OrganizationClient {
    pub fn new_with_client(client: OrganizationsClient, tag_keys: Vec<String>) -> Self {
        OrganizationClient { client, tag_keys }
    }

    pub async fn root_id(&self) -> Result<String> {
        let response = self
            .client
            .list_roots(ListRootsRequest::default())
            .await?;
        response
            .roots
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|root| root.id)
            .ok_or_else(|| LabsError::NotFound("organization has no root".to_string()))
    }

    async fn child_unit_ids(&self, parent_id: &str) -> Result<Vec<String>> {
        let mut ids = vec![];
        let mut next_token = None;
        loop {
            let response = self
                .client
                .list_children(ListChildrenRequest {
                    parent_id: parent_id.to_string(),
                    child_type: CHILD_TYPE_OU.to_string(),
                    next_token,
                    ..ListChildrenRequest::default()
                })
                .await?;
            ids.extend(
                response
                    .children
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|child| child.id),
            );
            match response.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(ids)
    }

    async fn unit_name(&self, id: &str) -> Result<String> {
        let response = self
            .client
            .describe_organizational_unit(DescribeOrganizationalUnitRequest {
                organizational_unit_id: id.to_string(),
            })
            .await?;
        response
            .organizational_unit
            .and_then(|unit| unit.name)
            .ok_or(LabsError::NoneValue)
    }

    /// Every organizational unit below `root_id`, depth first, parents before
    /// children. Walks an explicit worklist so deep hierarchies cannot
    /// exhaust the stack.
    pub async fn organizational_units(&self, root_id: &str) -> Result<Vec<OrganizationalUnit>> {
        let mut units = vec![];
        let mut pending = self.child_unit_ids(root_id).await?;
        pending.reverse();

        while let Some(id) = pending.pop() {
            let name = self.unit_name(&id).await?;
            let mut children = self.child_unit_ids(&id).await?;
            children.reverse();
            pending.extend(children);
            units.push(OrganizationalUnit { id, name });
        }
        info!("Found {} organizational units", units.len());
        Ok(units)
    }

    async fn tags(&self, account_id: &str) -> Result<Vec<Tag>> {
        let mut tags = vec![];
        let mut next_token = None;
        loop {
            let response = self
                .client
                .list_tags_for_resource(ListTagsForResourceRequest {
                    resource_id: account_id.to_string(),
                    next_token,
                })
                .await?;
            tags.extend(response.tags.unwrap_or_default());
            match response.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        Ok(tags)
    }

    /// Describes `account_id`, adds the configured tag keys found on the
    /// account and the `Parent` it was listed under.
    pub async fn account_record(&self, account_id: &str, parent_name: &str) -> Result<Record> {
        let response = self
            .client
            .describe_account(DescribeAccountRequest {
                account_id: account_id.to_string(),
            })
            .await?;
        let mut record = Record::from(response.account.ok_or(LabsError::NoneValue)?);

        if !self.tag_keys.is_empty() {
            let tags = self.tags(account_id).await?;
            for key in &self.tag_keys {
                for tag in tags.iter().filter(|tag| &tag.key == key) {
                    record.insert(key.clone(), tag.value.clone());
                }
            }
        }
        record.insert("Parent", parent_name);
        Ok(record)
    }

    /// Writes every account directly under each unit, skipping units that fail.
    pub async fn write_unit_accounts<W: Write>(
        &self,
        units: &[OrganizationalUnit],
        sink: &mut RecordSink<W>,
    ) -> CollectionSummary {
        collect_units(units, sink, |unit: &OrganizationalUnit| {
            let unit = unit.clone();
            async move { Some(AccountPageSource::new(self, unit.id, unit.name)) }
        })
        .await
    }

    /// Writes the accounts directly under the root, with the root id as parent.
    pub async fn write_root_accounts<W: Write>(
        &self,
        root_id: &str,
        sink: &mut RecordSink<W>,
    ) -> Result<usize> {
        let source = AccountPageSource::new(self, root_id.to_string(), root_id.to_string());
        write_records(collect(&source), sink).await
    }
}

/// Accounts of one parent, each one described and tagged before it is emitted.
pub struct AccountPageSource<'a> {
    organization: &'a OrganizationClient,
    parent_id: String,
    parent_name: String,
}

impl<'a> AccountPageSource<'a> {
    pub fn new(organization: &'a OrganizationClient, parent_id: String, parent_name: String) -> Self {
        AccountPageSource {
            organization,
            parent_id,
            parent_name,
        }
    }
}

#[async_trait]
impl<'a> PageSource for AccountPageSource<'a> {
    async fn fetch_page(&self, next_token: Option<String>) -> Result<Page> {
        let response = self
            .organization
            .client
            .list_accounts_for_parent(ListAccountsForParentRequest {
                parent_id: self.parent_id.clone(),
                next_token,
                ..ListAccountsForParentRequest::default()
            })
            .await?;

        let mut records = vec![];
        for account in response.accounts.unwrap_or_default() {
            if let Some(id) = account.id {
                records.push(
                    self.organization
                        .account_record(&id, &self.parent_name)
                        .await?,
                );
            }
        }
        Ok(Page {
            records,
            next_token: response.next_token,
        })
    }
}
