use aws_config::Region;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, ResponseChecksumValidation};
use aws_sdk_s3::Client;

use super::fetcher::StoreCredentials;

pub struct S3ClientConfig<'a> {
    pub credentials: &'a StoreCredentials,
    pub region: &'a str,
    pub endpoint_url: Option<&'a str>,
    pub force_path_style: bool,
}

/// Build a client for one download. Checksum validation on responses is only
/// performed when the service requires it, which keeps large reads cheap.
pub fn create_s3_client(config: &S3ClientConfig<'_>) -> Client {
    let credentials = Credentials::new(
        &config.credentials.access_key,
        &config.credentials.secret_key,
        None,
        None,
        "s3-download-manager",
    );

    let mut builder = S3ConfigBuilder::new()
        .credentials_provider(credentials)
        .region(Region::new(config.region.to_string()))
        .response_checksum_validation(ResponseChecksumValidation::WhenRequired);

    if let Some(endpoint_url) = config.endpoint_url {
        builder = builder.endpoint_url(endpoint_url);
    }

    if config.force_path_style {
        builder = builder.force_path_style(true);
    }

    Client::from_conf(builder.build())
}
