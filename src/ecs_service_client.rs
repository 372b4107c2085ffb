use async_trait::async_trait;
use rusoto_ecs::{
    DescribeServicesRequest, Ecs, EcsClient, ListClustersRequest, ListServicesRequest, Service,
};

use crate::error::Result;
use crate::paginated_collector::{Page, PageSource};
use crate::record::Record;

const SERVICE_PAGE_SIZE: i64 = 100;
const INCLUDE_TAGS: &str = "TAGS";

/// Last path segment of an ECS ARN, e.g. the cluster or service name.
fn resource_name(arn: &str) -> &str {
    arn.rsplit('/').next().unwrap_or(arn)
}

fn service_record(cluster: &str, service_arn: &str, service: Service) -> Record {
    let tags: Vec<Record> = service
        .tags
        .unwrap_or_default()
        .into_iter()
        .map(|tag| Record::new().with("key", tag.key).with("value", tag.value))
        .collect();

    Record::new()
        .with("cluster", cluster)
        .with("services", resource_name(service_arn))
        .with("serviceName", service.service_name)
        .with("tags", tags)
}

/// ECS services of every cluster, described one by one with their tags.
pub struct EcsServicePageSource {
    client: EcsClient,
}

impl EcsServicePageSource {
    pub fn new(client: EcsClient) -> Self {
        EcsServicePageSource { client }
    }

    async fn list_service_arns(&self, cluster: &str) -> Result<Vec<String>> {
        let mut service_arns = vec![];
        let mut next_token = None;
        loop {
            let response = self
                .client
                .list_services(ListServicesRequest {
                    cluster: Some(cluster.to_string()),
                    max_results: Some(SERVICE_PAGE_SIZE),
                    next_token,
                    ..ListServicesRequest::default()
                })
                .await?;
            service_arns.extend(response.service_arns.unwrap_or_default());
            match response.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }
        Ok(service_arns)
    }

    async fn describe_cluster(&self, cluster_arn: &str) -> Result<Vec<Record>> {
        let cluster = resource_name(cluster_arn);
        let mut records = vec![];
        for service_arn in self.list_service_arns(cluster).await? {
            let response = self
                .client
                .describe_services(DescribeServicesRequest {
                    cluster: Some(cluster.to_string()),
                    services: vec![resource_name(&service_arn).to_string()],
                    include: Some(vec![INCLUDE_TAGS.to_string()]),
                    ..DescribeServicesRequest::default()
                })
                .await?;
            for service in response.services.unwrap_or_default() {
                records.push(service_record(cluster, &service_arn, service));
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl PageSource for EcsServicePageSource {
    async fn fetch_page(&self, next_token: Option<String>) -> Result<Page> {
        let response = self
            .client
            .list_clusters(ListClustersRequest {
                next_token,
                ..ListClustersRequest::default()
            })
            .await?;

        let mut records = vec![];
        for cluster_arn in response.cluster_arns.unwrap_or_default() {
            records.extend(self.describe_cluster(&cluster_arn).await?);
        }
        Ok(Page {
            records,
            next_token: response.next_token,
        })
    }
}
