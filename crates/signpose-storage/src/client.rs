//! S3-compatible client implementation.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::Client;
use aws_types::region::Region;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::KeypointStore;

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region
    pub region: String,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("S3_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("S3_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("S3_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("S3_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("S3_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("S3_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("S3_BUCKET_NAME not set"))?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        })
    }
}

/// S3-compatible object storage client.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    /// Create a new client from configuration.
    pub fn new(config: S3Config) -> StorageResult<Self> {
        if config.bucket_name.is_empty() {
            return Err(StorageError::config_error("bucket name is empty"));
        }

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "signpose",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = Client::from_conf(sdk_config);

        Ok(Self {
            client,
            bucket: config.bucket_name,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let config = S3Config::from_env()?;
        Self::new(config)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Download object as bytes.
    pub async fn download_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        debug!("Downloading {}", key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::download_failed(format!("{}: {}", key, e))
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::download_failed(format!("{}: {}", key, e)))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// List object keys with a prefix, following continuation tokens.
    pub async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>> {
        debug!("Listing objects with prefix: {}", prefix);

        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StorageError::list_failed(format!("{}: {}", prefix, e)))?;

            if let Some(ref contents) = response.contents {
                keys.extend(contents.iter().filter_map(|obj| obj.key.clone()));
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token;
            } else {
                break;
            }
        }

        info!("Listed {} objects under {}", keys.len(), prefix);
        Ok(keys)
    }

    /// Check connectivity by performing a head bucket operation.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("S3 connectivity check failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl KeypointStore for S3Client {
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.list_objects(prefix).await
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.download_bytes(key).await
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_bucket_rejected() {
        let config = S3Config {
            endpoint_url: "http://localhost:9000".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: String::new(),
            region: "us-east-1".to_string(),
        };
        assert!(matches!(
            S3Client::new(config),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[test]
    fn test_client_construction() {
        let config = S3Config {
            endpoint_url: "http://localhost:9000".to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket_name: "keypoints".to_string(),
            region: "us-east-1".to_string(),
        };
        let client = S3Client::new(config).unwrap();
        assert_eq!(client.bucket(), "keypoints");
        assert_eq!(client.backend_name(), "s3");
    }
}
