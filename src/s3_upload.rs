use log::{info, warn};
use rusoto_core::{ByteStream, Region};
use rusoto_glue::{Glue, GlueClient, StartCrawlerRequest};
use rusoto_s3::{PutObjectRequest, S3Client, S3};
use std::path::Path;
use std::str::FromStr;

use crate::config::{CrawlerTarget, UploadTarget};
use crate::date_partition::{organisation_key, DatePartition};
use crate::error::{LabsError, Result};
use crate::record_sink::CollectedFile;

pub struct S3Uploader {
    client: S3Client,
}

impl S3Uploader {
    pub fn new(target: &UploadTarget) -> Result<Self> {
        let region = match target.region {
            Some(ref region) => {
                Region::from_str(region).map_err(|error| LabsError::Config(error.to_string()))?
            }
            None => Region::default(),
        };
        Ok(S3Uploader::new_with_client(S3Client::new(region)))
    }

    pub fn new_with_client(client: S3Client) -> Self {
        S3Uploader { client }
    }

    pub async fn upload_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        let body = tokio::fs::read(path).await?;
        self.client
            .put_object(PutObjectRequest {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                body: Some(ByteStream::from(body)),
                content_type: Some("application/json".to_owned()),
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    /// Uploads under `{prefix}-data/year={year}/month={month}/{prefix}.json`.
    pub async fn upload_dated(
        &self,
        target: &UploadTarget,
        partition: DatePartition,
        file: &CollectedFile,
    ) -> Result<String> {
        let key = partition.object_key(&target.prefix);
        self.upload_file(&target.bucket, &key, &file.path).await?;
        info!("Data in s3 - {}-data/{}", target.prefix, partition);
        Ok(key)
    }

    /// Uploads under `organisation-data/{name}.json`.
    pub async fn upload_organisation(
        &self,
        target: &UploadTarget,
        name: &str,
        file: &CollectedFile,
    ) -> Result<String> {
        let key = organisation_key(name);
        self.upload_file(&target.bucket, &key, &file.path).await?;
        info!("{} org data in s3", name);
        Ok(key)
    }

    /// Dated upload whose failure is only logged.
    pub async fn try_upload_dated(
        &self,
        target: &UploadTarget,
        partition: DatePartition,
        file: &CollectedFile,
    ) -> Option<String> {
        match self.upload_dated(target, partition, file).await {
            Ok(key) => Some(key),
            Err(error) => {
                warn!("{}-data upload failed: {}", target.prefix, error);
                None
            }
        }
    }

    /// Uploads each named file under `organisation-data/`. A failed upload is
    /// logged and the remaining files are still uploaded.
    pub async fn upload_organisation_files(
        &self,
        target: &UploadTarget,
        files: &[(&str, &CollectedFile)],
    ) -> Vec<String> {
        let mut keys = vec![];
        for (name, file) in files {
            match self.upload_organisation(target, name, file).await {
                Ok(key) => keys.push(key),
                Err(error) => warn!("{} org data upload failed: {}", name, error),
            }
        }
        keys
    }
}

/// Starts the Glue crawler over the uploaded data. Failures are only logged.
pub async fn start_crawler(client: &GlueClient, crawler: &CrawlerTarget) -> bool {
    if let Some(ref role_arn) = crawler.role_arn {
        info!("Starting crawler {} (role {})", crawler.name, role_arn);
    }
    match client
        .start_crawler(StartCrawlerRequest {
            name: crawler.name.clone(),
        })
        .await
    {
        Ok(_) => true,
        Err(error) => {
            warn!("{}", LabsError::from(error));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{CrawlerTarget, UploadTarget};
    use crate::date_partition::DatePartition;
    use crate::record_sink::CollectedFile;
    use crate::s3_upload::{start_crawler, S3Uploader};
    use rusoto_core::signature::SignedRequest;
    use rusoto_core::Region;
    use rusoto_glue::GlueClient;
    use rusoto_mock::{MockCredentialsProvider, MockRequestDispatcher, MultipleMockRequestDispatcher};
    use rusoto_s3::S3Client;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(contents: &str) -> (NamedTempFile, CollectedFile) {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(contents.as_bytes()).unwrap();
        let file = CollectedFile {
            path: temp.path().to_path_buf(),
            records: 1,
        };
        (temp, file)
    }

    fn target() -> UploadTarget {
        UploadTarget {
            bucket: "b".to_string(),
            prefix: "cost".to_string(),
            region: None,
        }
    }

    #[tokio::test]
    async fn test_upload_dated_key() {
        let dispatcher = MockRequestDispatcher::default().with_request_checker(
            |request: &SignedRequest| {
                assert_eq!(request.method, "PUT");
                assert!(request.path.ends_with("cost-data/year=2024/month=3/cost.json"));
            },
        );
        let uploader = S3Uploader::new_with_client(S3Client::new_with(
            dispatcher,
            MockCredentialsProvider,
            Region::UsEast1,
        ));
        let (_temp, file) = temp_file("{\"ImageId\":\"ami-1\"}\n");

        let key = uploader
            .upload_dated(&target(), DatePartition { year: 2024, month: 3 }, &file)
            .await
            .unwrap();

        assert_eq!(key, "cost-data/year=2024/month=3/cost.json");
    }

    #[tokio::test]
    async fn test_failed_dated_upload_is_logged() {
        let uploader = S3Uploader::new_with_client(S3Client::new_with(
            MockRequestDispatcher::with_status(500).with_body("internal failure"),
            MockCredentialsProvider,
            Region::UsEast1,
        ));
        let (_temp, file) = temp_file("{\"ImageId\":\"ami-1\"}\n");

        let key = uploader
            .try_upload_dated(&target(), DatePartition { year: 2024, month: 3 }, &file)
            .await;

        assert_eq!(key, None);
    }

    #[tokio::test]
    async fn test_failed_organisation_upload_does_not_stop_the_next() {
        let uploader = S3Uploader::new_with_client(S3Client::new_with(
            MultipleMockRequestDispatcher::new(vec![
                MockRequestDispatcher::with_status(500).with_body("internal failure"),
                MockRequestDispatcher::default().with_request_checker(|request: &SignedRequest| {
                    assert!(request.path.ends_with("organisation-data/acc-org.json"));
                }),
            ]),
            MockCredentialsProvider,
            Region::UsEast1,
        ));
        let (_unit_temp, unit_file) = temp_file("{\"Id\":\"1\"}\n");
        let (_root_temp, root_file) = temp_file("{\"Id\":\"2\"}\n");

        let keys = uploader
            .upload_organisation_files(&target(), &[("ou-org", &unit_file), ("acc-org", &root_file)])
            .await;

        assert_eq!(keys, vec!["organisation-data/acc-org.json".to_string()]);
    }

    #[tokio::test]
    async fn test_upload_missing_file_fails() {
        let uploader = S3Uploader::new_with_client(S3Client::new_with(
            MockRequestDispatcher::default(),
            MockCredentialsProvider,
            Region::UsEast1,
        ));
        let result = uploader
            .upload_file("b", "organisation-data/acc-org.json", std::path::Path::new("/nonexistent/acc-org.json"))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_start_crawler_failure_is_not_fatal() {
        let client = GlueClient::new_with(
            MockRequestDispatcher::with_status(400)
                .with_body(r#"{"__type":"EntityNotFoundException","Message":"crawler not found"}"#),
            MockCredentialsProvider,
            Region::UsEast1,
        );
        let crawler = CrawlerTarget {
            name: "missing".to_string(),
            role_arn: None,
        };

        assert!(!start_crawler(&client, &crawler).await);
    }

    #[tokio::test]
    async fn test_start_crawler() {
        let client = GlueClient::new_with(
            MockRequestDispatcher::default().with_body("{}"),
            MockCredentialsProvider,
            Region::UsEast1,
        );
        let crawler = CrawlerTarget {
            name: "cost-crawler".to_string(),
            role_arn: Some("arn:aws:iam::111111111111:role/crawler".to_string()),
        };

        assert!(start_crawler(&client, &crawler).await);
    }
}
