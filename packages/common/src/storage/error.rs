/// Errors that can occur during object storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No object is stored under the key.
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The key would escape the store's namespace or is malformed.
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),
    #[error("object exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
    /// Failure reported by a remote backend (S3 and compatibles).
    #[error("storage backend error: {0}")]
    Backend(String),
}
