use chrono::{DateTime, Utc};
use log::{info, warn};
use rusoto_core::credential::StaticProvider;
use rusoto_core::{HttpClient, Region};
use rusoto_ec2::{DescribeRegionsRequest, Ec2, Ec2Client};
use rusoto_ecs::EcsClient;
use rusoto_organizations::OrganizationsClient;
use rusoto_sts::{AssumeRoleRequest, Sts, StsClient};
use std::str::FromStr;

use crate::config::DEFAULT_SESSION_NAME;
use crate::error::{LabsError, Result};

/// Short lived credentials of an assumed role. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: Option<DateTime<Utc>>,
}

impl TemporaryCredentials {
    fn provider(&self) -> StaticProvider {
        let valid_for = self
            .expiration
            .map(|expiration| (expiration - Utc::now()).num_seconds().max(0));
        StaticProvider::new(
            self.access_key_id.clone(),
            self.secret_access_key.clone(),
            Some(self.session_token.clone()),
            valid_for,
        )
    }
}

/// Service clients that can be built from assumed role credentials.
pub trait FromCredentials: Sized {
    fn from_credentials(credentials: StaticProvider, region: Region) -> Result<Self>;
}

macro_rules! from_credentials {
    ($($client:ident),*) => {
        $(
            impl FromCredentials for $client {
                fn from_credentials(credentials: StaticProvider, region: Region) -> Result<Self> {
                    Ok($client::new_with(HttpClient::new()?, credentials, region))
                }
            }
        )*
    };
}

from_credentials!(Ec2Client, EcsClient, OrganizationsClient);

pub struct CrossAccountClient {
    client: StsClient,
    role_name: String,
    session_name: String,
}

impl CrossAccountClient {
    pub fn new(role_name: &str) -> Self {
        CrossAccountClient::new_with_client(StsClient::new(Region::default()), role_name)
    }

    pub fn new_with_client(client: StsClient, role_name: &str) -> Self {
        CrossAccountClient {
            client,
            role_name: role_name.to_string(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
        }
    }

    pub fn with_session_name(mut self, session_name: &str) -> Self {
        self.session_name = session_name.to_string();
        self
    }

    pub fn role_arn(&self, account_id: &str) -> String {
        format!("arn:aws:iam::{}:role/{}", account_id, self.role_name)
    }

    /// Assumes the configured role in `account_id`. Every failure is reported
    /// as [`LabsError::Authorization`].
    pub async fn assume(&self, account_id: &str) -> Result<TemporaryCredentials> {
        let response = self
            .client
            .assume_role(AssumeRoleRequest {
                role_arn: self.role_arn(account_id),
                role_session_name: self.session_name.clone(),
                ..AssumeRoleRequest::default()
            })
            .await
            .map_err(|error| LabsError::Authorization(error.to_string()))?;

        let credentials = response.credentials.ok_or_else(|| {
            LabsError::Authorization(format!("no credentials returned for {}", account_id))
        })?;

        Ok(TemporaryCredentials {
            access_key_id: credentials.access_key_id,
            secret_access_key: credentials.secret_access_key,
            session_token: credentials.session_token,
            expiration: DateTime::parse_from_rfc3339(&credentials.expiration)
                .ok()
                .map(|expiration| expiration.with_timezone(&Utc)),
        })
    }

    /// Builds a `region` scoped client acting as the role in `account_id`.
    /// Returns `None` when the role cannot be assumed, so callers skip the unit.
    pub async fn acquire_client<C: FromCredentials>(
        &self,
        account_id: &str,
        region: Region,
    ) -> Option<C> {
        let credentials = match self.assume(account_id).await {
            Ok(credentials) => credentials,
            Err(error) => {
                warn!("Unexpected error Account {}: {}", account_id, error);
                return None;
            }
        };

        match C::from_credentials(credentials.provider(), region) {
            Ok(client) => Some(client),
            Err(error) => {
                warn!("Failed to build client for account {}: {}", account_id, error);
                None
            }
        }
    }
}

/// Regions enabled for the calling account.
pub async fn available_regions(client: &Ec2Client) -> Result<Vec<Region>> {
    let response = client
        .describe_regions(DescribeRegionsRequest::default())
        .await?;

    let mut regions = vec![];
    for region in response.regions.unwrap_or_default() {
        if let Some(name) = region.region_name {
            match Region::from_str(&name) {
                Ok(region) => regions.push(region),
                Err(_) => info!("Skipping unknown region {}", name),
            }
        }
    }
    Ok(regions)
}
