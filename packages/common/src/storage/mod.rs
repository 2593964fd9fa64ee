mod checksum;
mod error;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

pub use checksum::Checksum;
pub use error::StorageError;
pub use traits::{BoxReader, ObjectStore, validate_key};
