use std::io::Cursor;

use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};
use serde::Deserialize;

use super::error::StorageError;
use super::traits::{BoxReader, ObjectStore, validate_key};

/// Connection settings for an S3-compatible bucket.
///
/// Supabase Storage exposes such an endpoint at
/// `https://<project>.supabase.co/storage/v1/s3`.
#[derive(Debug, Deserialize, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Object store backed by an S3-compatible bucket, using path-style URLs.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    max_size: u64,
}

impl S3ObjectStore {
    pub fn new(config: &S3Config, max_size: u64) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(backend_error)?
            .with_path_style();

        Ok(Self { bucket, max_size })
    }
}

fn backend_error(err: S3Error) -> StorageError {
    StorageError::Backend(err.to_string())
}

fn is_not_found(err: &S3Error) -> bool {
    matches!(err, S3Error::HttpFailWithBody(404, _))
}

fn check_status(key: &str, status: u16) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(key.to_string())),
        other => Err(StorageError::Backend(format!(
            "unexpected status {other} for {key}"
        ))),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(backend_error)?;
        check_status(key, response.status_code())
    }

    async fn get_stream(&self, key: &str) -> Result<BoxReader, StorageError> {
        validate_key(key)?;
        let response = match self.bucket.get_object(key).await {
            Ok(r) => r,
            Err(e) if is_not_found(&e) => return Err(StorageError::NotFound(key.to_string())),
            Err(e) => return Err(backend_error(e)),
        };
        check_status(key, response.status_code())?;
        Ok(Box::new(Cursor::new(response.bytes().to_vec())))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        match self.bucket.head_object(key).await {
            Ok((_, status)) => match check_status(key, status) {
                Ok(()) => Ok(true),
                Err(StorageError::NotFound(_)) => Ok(false),
                Err(e) => Err(e),
            },
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(backend_error(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        if !self.exists(key).await? {
            return Ok(false);
        }
        let response = self.bucket.delete_object(key).await.map_err(backend_error)?;
        check_status(key, response.status_code())?;
        Ok(true)
    }
}
