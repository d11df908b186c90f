use super::types::{create_aws_client, AwsConfig};
use crate::providers::fetcher::{BlobFetcher, BlobReader, FetchResult, StoreCredentials};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use log::debug;

/// Reads objects with a fresh S3 client built from each request's credentials.
#[derive(Debug, Clone, Default)]
pub struct S3Fetcher {
    config: AwsConfig,
}

impl S3Fetcher {
    pub fn new(config: AwsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BlobFetcher for S3Fetcher {
    async fn open_reader(
        &self,
        credentials: &StoreCredentials,
        bucket: &str,
        object_name: &str,
    ) -> FetchResult<Box<dyn BlobReader>> {
        let client = create_aws_client(&self.config, credentials);
        let output = client
            .get_object()
            .bucket(bucket)
            .key(object_name)
            .send()
            .await
            .map_err(|e| DisplayErrorContext(e).to_string())?;

        let expected_bytes = output
            .content_length()
            .and_then(|len| u64::try_from(len).ok());
        debug!(
            "s3_get_object: {}/{} content_length={:?}",
            bucket, object_name, expected_bytes
        );

        Ok(Box::new(S3Reader {
            body: output.body,
            expected_bytes,
            received_bytes: 0,
        }))
    }
}

struct S3Reader {
    body: ByteStream,
    expected_bytes: Option<u64>,
    received_bytes: u64,
}

#[async_trait]
impl BlobReader for S3Reader {
    async fn next_chunk(&mut self) -> FetchResult<Option<Bytes>> {
        let chunk = self.body.try_next().await?;
        if let Some(chunk) = chunk.as_ref() {
            self.received_bytes += chunk.len() as u64;
        }
        Ok(chunk)
    }

    async fn close(&mut self) -> FetchResult<()> {
        match self.expected_bytes {
            Some(expected) if expected != self.received_bytes => Err(format!(
                "short read: received {} of {} bytes",
                self.received_bytes, expected
            )
            .into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::S3Reader;
    use crate::providers::fetcher::BlobReader;
    use aws_sdk_s3::primitives::ByteStream;

    async fn drain(reader: &mut S3Reader) -> Vec<u8> {
        let mut received = Vec::new();
        while let Some(chunk) = reader.next_chunk().await.unwrap() {
            received.extend_from_slice(&chunk);
        }
        received
    }

    #[tokio::test]
    async fn close_rejects_a_body_shorter_than_content_length() {
        let mut reader = S3Reader {
            body: ByteStream::from_static(b"abc"),
            expected_bytes: Some(5),
            received_bytes: 0,
        };

        assert_eq!(drain(&mut reader).await, b"abc");
        let err = reader.close().await.err().unwrap();
        assert_eq!(err.to_string(), "short read: received 3 of 5 bytes");
    }

    #[tokio::test]
    async fn close_accepts_a_complete_body() {
        let mut reader = S3Reader {
            body: ByteStream::from_static(b"abcde"),
            expected_bytes: Some(5),
            received_bytes: 0,
        };

        assert_eq!(drain(&mut reader).await, b"abcde");
        assert!(reader.close().await.is_ok());
    }

    #[tokio::test]
    async fn close_without_content_length_trusts_the_body() {
        let mut reader = S3Reader {
            body: ByteStream::from_static(b"abc"),
            expected_bytes: None,
            received_bytes: 0,
        };

        drain(&mut reader).await;
        assert!(reader.close().await.is_ok());
    }
}
