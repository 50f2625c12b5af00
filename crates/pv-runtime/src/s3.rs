//! S3-compatible replica endpoint adapter.
//!
//! Maps each endpoint name to a bucket on one shared client. Part checksums
//! travel as user metadata on the object so a later audit can read them
//! back from a HEAD request without fetching the body.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use pv_audit::ports::outbound::{ObjectStoreError, PartMetadata, ReplicaObjectStore};
use pv_types::{EndpointName, Md5Digest, PartKey};

const MD5_METADATA_KEY: &str = "checksum-md5";
const SIZE_METADATA_KEY: &str = "size";

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    buckets: HashMap<EndpointName, String>,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, buckets: HashMap<EndpointName, String>) -> Self {
        Self { client, buckets }
    }

    /// Build from ambient AWS configuration (env credentials, region,
    /// endpoint overrides).
    pub async fn from_env(buckets: HashMap<EndpointName, String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_s3::Client::new(&config), buckets)
    }

    fn bucket(&self, endpoint: &EndpointName) -> Result<&str, ObjectStoreError> {
        self.buckets
            .get(endpoint)
            .map(String::as_str)
            .ok_or_else(|| ObjectStoreError {
                endpoint: endpoint.to_string(),
                message: "no bucket configured for endpoint".to_string(),
            })
    }
}

fn transport_error(endpoint: &EndpointName, error: impl std::error::Error) -> ObjectStoreError {
    ObjectStoreError {
        endpoint: endpoint.to_string(),
        message: format!("{}", DisplayErrorContext(&error)),
    }
}

#[async_trait]
impl ReplicaObjectStore for S3ObjectStore {
    async fn exists(
        &self,
        endpoint: &EndpointName,
        key: &PartKey,
    ) -> Result<bool, ObjectStoreError> {
        Ok(self.metadata(endpoint, key).await?.is_some())
    }

    async fn metadata(
        &self,
        endpoint: &EndpointName,
        key: &PartKey,
    ) -> Result<Option<PartMetadata>, ObjectStoreError> {
        let bucket = self.bucket(endpoint)?;
        let head = match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key.to_string())
            .send()
            .await
        {
            Ok(head) => head,
            Err(error) => {
                if error.as_service_error().is_some_and(|e| e.is_not_found()) {
                    return Ok(None);
                }
                return Err(transport_error(endpoint, error));
            }
        };

        let user_metadata = head.metadata().cloned().unwrap_or_default();
        let checksum_md5 = user_metadata
            .get(MD5_METADATA_KEY)
            .and_then(|raw| Md5Digest::parse(raw).ok())
            .ok_or_else(|| ObjectStoreError {
                endpoint: endpoint.to_string(),
                message: format!("{key}: missing or malformed {MD5_METADATA_KEY} metadata"),
            })?;
        let size = head
            .content_length()
            .filter(|len| *len >= 0)
            .map(|len| len as u64)
            .or_else(|| {
                user_metadata
                    .get(SIZE_METADATA_KEY)
                    .and_then(|raw| raw.parse().ok())
            })
            .unwrap_or(0);

        Ok(Some(PartMetadata { checksum_md5, size }))
    }

    async fn put(
        &self,
        endpoint: &EndpointName,
        key: &PartKey,
        bytes: Vec<u8>,
        metadata: PartMetadata,
    ) -> Result<(), ObjectStoreError> {
        let bucket = self.bucket(endpoint)?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key.to_string())
            .metadata(MD5_METADATA_KEY, metadata.checksum_md5.to_string())
            .metadata(SIZE_METADATA_KEY, metadata.size.to_string())
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|error| transport_error(endpoint, error))?;
        Ok(())
    }
}
