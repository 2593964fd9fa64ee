use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Key-addressed object storage for uploaded files.
///
/// Keys are relative, `/`-separated paths such as
/// `registrations/12/payment/0190...pdf`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, replacing any existing object.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Retrieve all bytes stored under `key`.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(key).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve an object as a streaming async reader.
    async fn get_stream(&self, key: &str) -> Result<BoxReader, StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete the object under `key`.
    ///
    /// Returns `true` if an object was deleted, `false` if none existed.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;
}

/// Reject keys that are empty, absolute, or that could traverse out of the
/// store's namespace.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = |msg: &str| Err(StorageError::InvalidKey(format!("{msg}: {key:?}")));

    if key.is_empty() || key.len() > 1024 {
        return invalid("key must be 1-1024 bytes");
    }
    if key.starts_with('/') || key.ends_with('/') {
        return invalid("key must not start or end with '/'");
    }
    if key.contains('\\') || key.contains('\0') {
        return invalid("key contains a forbidden character");
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return invalid("key contains an empty or relative segment");
    }
    Ok(())
}
