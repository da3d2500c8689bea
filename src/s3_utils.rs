// src/s3_utils.rs
//
// Presigned URL minting. Authorization is baked into the URL signature, so
// nothing application-side runs when the client later hits the URL.

use std::fmt;
use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::Client as S3Client;

pub const UPLOAD_URL_TTL_SECS: u64 = 3600;
pub const DOWNLOAD_URL_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug)]
pub enum PresignError {
    Config(String),
    Sdk(String),
}

impl fmt::Display for PresignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresignError::Config(e) => write!(f, "presigning config error: {e}"),
            PresignError::Sdk(e) => write!(f, "presign request error: {e}"),
        }
    }
}

/// Write-scoped URL for a direct client upload.
pub async fn presign_upload(
    client: &S3Client,
    bucket: &str,
    key: &str,
    content_type: &str,
    expires_in_secs: u64,
) -> Result<String, PresignError> {
    let config = PresigningConfig::expires_in(Duration::from_secs(expires_in_secs))
        .map_err(|e| PresignError::Config(e.to_string()))?;

    let presigned = client
        .put_object()
        .bucket(bucket)
        .key(key)
        .content_type(content_type)
        .presigned(config)
        .await
        .map_err(|e| PresignError::Sdk(e.to_string()))?;

    Ok(presigned.uri().to_string())
}

/// Read-scoped URL, usable until `expires_in_secs` after issuance.
pub async fn presign_download(
    client: &S3Client,
    bucket: &str,
    key: &str,
    expires_in_secs: u64,
) -> Result<String, PresignError> {
    let config = PresigningConfig::expires_in(Duration::from_secs(expires_in_secs))
        .map_err(|e| PresignError::Config(e.to_string()))?;

    let presigned = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .presigned(config)
        .await
        .map_err(|e| PresignError::Sdk(e.to_string()))?;

    Ok(presigned.uri().to_string())
}

/// Recovers the object key from a stored file URL.
///
/// Keys look like `uploads/{user}/{millis}-{name}`, so taking only the last
/// path segment would lose the prefix and point at a nonexistent object. We
/// strip the scheme, the authority and (for path-style URLs) the leading
/// bucket segment, and keep the whole remaining path.
pub fn storage_key_from_url(file_url: &str, bucket: &str) -> String {
    let without_scheme = file_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(file_url);

    match without_scheme.split_once('/') {
        Some((_, path)) if !path.is_empty() => {
            let path = path.trim_start_matches('/');
            let path = path.split('?').next().unwrap_or(path);
            path.strip_prefix(&format!("{bucket}/"))
                .unwrap_or(path)
                .to_string()
        }
        _ => file_url.rsplit('/').next().unwrap_or(file_url).to_string(),
    }
}
