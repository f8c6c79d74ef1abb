use std::time::Duration;
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::presigning::PresigningConfig;
use tracing::{debug, error};
use crate::config::StorageConfig;
use crate::error::{Error, ResolveError, Result};
use crate::storage::blob::{parse_reference, BlobRef, BlobStore};

/// Resolves image keys in an S3-compatible bucket (AWS or MinIO) to
/// presigned GET URLs.
pub struct S3BlobStore {
    client: S3Client,
    bucket: String,
    url_ttl: Duration,
}

impl S3BlobStore {
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        debug!(
            endpoint = ?config.endpoint,
            bucket = %config.bucket,
            region = %config.region,
            "Initializing blob store"
        );

        let region = Region::new(config.region.clone());

        let s3_config = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "static-credentials",
                );
                let mut builder = aws_sdk_s3::Config::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .region(region)
                    .credentials_provider(credentials);
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint_url(endpoint).force_path_style(true);
                }
                builder.build()
            }
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                let mut builder = aws_sdk_s3::config::Builder::from(&shared);
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.endpoint_url(endpoint).force_path_style(true);
                }
                builder.build()
            }
        };

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            url_ttl: Duration::from_secs(config.url_ttl_secs.max(1)),
        })
    }

    /// Checks the bucket is reachable with the configured credentials.
    pub async fn verify_bucket(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, bucket = %self.bucket, "Failed to access bucket");
                Error::Storage(format!("Cannot access bucket '{}': {}", self.bucket, e))
            })?;
        Ok(())
    }

    async fn ensure_exists(&self, key: &str) -> std::result::Result<(), ResolveError> {
        match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(service_error)) => {
                let status = service_error.raw().status().as_u16();
                if service_error.err().is_not_found() || status == 404 {
                    Err(ResolveError::NotFound(key.to_string()))
                } else if status == 403 {
                    Err(ResolveError::AccessDenied(key.to_string()))
                } else {
                    Err(ResolveError::Backend(format!(
                        "HEAD {} returned {}: {}",
                        key,
                        status,
                        service_error.err()
                    )))
                }
            }
            Err(e) => Err(ResolveError::Backend(e.to_string())),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn resolve(&self, reference: &str) -> std::result::Result<String, ResolveError> {
        let key = match parse_reference(reference, &self.bucket)? {
            BlobRef::Url(url) => return Ok(url),
            BlobRef::Key(key) => key,
        };

        self.ensure_exists(&key).await?;

        let presigning = PresigningConfig::expires_in(self.url_ttl)
            .map_err(|e| ResolveError::Backend(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .presigned(presigning)
            .await
            .map_err(|e| ResolveError::Backend(e.to_string()))?;

        debug!(key = %key, "Presigned image URL");
        Ok(presigned.uri().to_string())
    }
}
