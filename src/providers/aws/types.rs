use crate::providers::fetcher::StoreCredentials;
use crate::providers::s3_client::{create_s3_client, S3ClientConfig};
use aws_sdk_s3::Client;

/// Service-wide S3 settings; credentials arrive per request instead.
#[derive(Debug, Clone)]
pub struct AwsConfig {
    pub region: String,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

fn build_endpoint_url(config: &AwsConfig) -> Option<&str> {
    let url = config.endpoint_url.as_deref()?.trim();
    if url.is_empty() {
        return None;
    }
    Some(url)
}

pub(crate) fn create_aws_client(config: &AwsConfig, credentials: &StoreCredentials) -> Client {
    create_s3_client(&S3ClientConfig {
        credentials,
        region: &config.region,
        endpoint_url: build_endpoint_url(config),
        force_path_style: config.force_path_style,
    })
}
