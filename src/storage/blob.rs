use async_trait::async_trait;
use crate::error::ResolveError;

/// Turns opaque storage references into fetchable URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<String, ResolveError>;
}

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobRef {
    /// Already fetchable as-is.
    Url(String),
    /// An object key inside the configured bucket.
    Key(String),
}

/// Accepts `http(s)://` URLs, `s3://bucket/key`, `gs://bucket/key`, and bare keys.
pub fn parse_reference(reference: &str, bucket: &str) -> Result<BlobRef, ResolveError> {
    let reference = reference.trim();

    if reference.starts_with("https://") || reference.starts_with("http://") {
        return Ok(BlobRef::Url(reference.to_string()));
    }

    let key = match reference
        .strip_prefix("s3://")
        .or_else(|| reference.strip_prefix("gs://"))
    {
        Some(rest) => {
            let (ref_bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            if ref_bucket != bucket {
                return Err(ResolveError::AccessDenied(format!(
                    "{} is outside bucket '{}'",
                    reference, bucket
                )));
            }
            key
        }
        None => reference,
    };

    let key = key.trim_start_matches('/');
    if key.is_empty() {
        return Err(ResolveError::NotFound(reference.to_string()));
    }
    Ok(BlobRef::Key(key.to_string()))
}

/// Resolves references that are already URLs; everything else is unknown.
#[derive(Debug, Clone, Default)]
pub struct PassthroughBlobStore;

#[async_trait]
impl BlobStore for PassthroughBlobStore {
    async fn resolve(&self, reference: &str) -> Result<String, ResolveError> {
        match parse_reference(reference, "")? {
            BlobRef::Url(url) => Ok(url),
            BlobRef::Key(key) => Err(ResolveError::NotFound(key)),
        }
    }
}
