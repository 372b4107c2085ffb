//! Environment driven settings shared by the Lambda functions.

use crate::error::{LabsError, Result};
use crate::workload_reconciler::TitleMatch;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_SESSION_NAME: &str = "AssumeRoleRoot";
pub const DEFAULT_ANSWER_NOTES: &str = "Added by lab automation";
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp";

/// Where a finished collection file is copied to.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTarget {
    pub bucket: String,
    pub prefix: String,
    pub region: Option<String>,
}

/// Glue crawler started once the dated upload has landed.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlerTarget {
    pub name: String,
    pub role_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub role_name: Option<String>,
    pub management_account_id: Option<String>,
    pub upload: Option<UploadTarget>,
    pub crawler: Option<CrawlerTarget>,
    pub tag_keys: Vec<String>,
    pub title_match: TitleMatch,
    pub answer_notes: String,
    pub output_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let upload = match get("BUCKET_NAME") {
            Some(bucket) => Some(UploadTarget {
                bucket,
                prefix: get("PREFIX").unwrap_or_default(),
                region: get("REGION"),
            }),
            None => None,
        };

        let title_match = match get("TITLE_MATCH") {
            Some(value) => TitleMatch::from_str(&value)?,
            None => TitleMatch::Prefix,
        };

        Ok(Config {
            role_name: get("ROLENAME"),
            management_account_id: get("MANAGEMENT_ACCOUNT_ID"),
            upload,
            crawler: get("CRAWLER_NAME").map(|name| CrawlerTarget {
                name,
                role_arn: get("ROLE_ARN"),
            }),
            tag_keys: get("TAGS").map_or(vec![], |tags| parse_tag_keys(&tags)),
            title_match,
            answer_notes: get("ANSWER_NOTES").unwrap_or_else(|| DEFAULT_ANSWER_NOTES.to_string()),
            output_dir: get("OUTPUT_DIR").map_or(PathBuf::from(DEFAULT_OUTPUT_DIR), PathBuf::from),
        })
    }

    pub fn require_role_name(&self) -> Result<&str> {
        self.role_name
            .as_deref()
            .ok_or_else(|| LabsError::Config("ROLENAME is not set".to_string()))
    }

    pub fn require_upload(&self) -> Result<&UploadTarget> {
        self.upload
            .as_ref()
            .ok_or_else(|| LabsError::Config("BUCKET_NAME is not set".to_string()))
    }

    pub fn require_management_account_id(&self) -> Result<&str> {
        self.management_account_id
            .as_deref()
            .ok_or_else(|| LabsError::Config("MANAGEMENT_ACCOUNT_ID is not set".to_string()))
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

fn parse_tag_keys(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(|tag| tag.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::config::{Config, UploadTarget, DEFAULT_ANSWER_NOTES};
    use crate::error::LabsError;
    use crate::workload_reconciler::TitleMatch;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_from_vars() {
        let config = Config::from_vars(vars(&[
            ("ROLENAME", "OrgRole"),
            ("BUCKET_NAME", "b"),
            ("PREFIX", "cost"),
            ("REGION", "eu-west-1"),
            ("CRAWLER_NAME", "cost-crawler"),
            ("TAGS", "Env, CostCenter,,"),
            ("TITLE_MATCH", "exact"),
        ]))
        .unwrap();

        assert_eq!(config.require_role_name().unwrap(), "OrgRole");
        assert_eq!(
            config.upload,
            Some(UploadTarget {
                bucket: "b".to_string(),
                prefix: "cost".to_string(),
                region: Some("eu-west-1".to_string()),
            })
        );
        assert_eq!(config.crawler.as_ref().unwrap().name, "cost-crawler");
        assert_eq!(config.tag_keys, vec!["Env".to_string(), "CostCenter".to_string()]);
        assert_eq!(config.title_match, TitleMatch::Exact);
        assert_eq!(config.answer_notes, DEFAULT_ANSWER_NOTES);
        assert_eq!(config.output_path("data.json"), PathBuf::from("/tmp/data.json"));
    }

    #[test]
    fn test_missing_values() {
        let config = Config::from_vars(vars(&[("TAGS", "")])).unwrap();
        assert!(config.tag_keys.is_empty());
        assert!(config.upload.is_none());
        assert_eq!(config.title_match, TitleMatch::Prefix);
        assert!(matches!(
            config.require_role_name(),
            Err(LabsError::Config(_))
        ));
    }

    #[test]
    fn test_invalid_title_match() {
        let result = Config::from_vars(vars(&[("TITLE_MATCH", "fuzzy")]));
        assert!(matches!(result, Err(LabsError::Config(_))));
    }
}
