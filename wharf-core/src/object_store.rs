//! Contract for the object-storage collaborator.

use std::{path::Path, time::Duration};

use crate::{Credentials, TransportError};

/// Metadata returned by an existence probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Object size in bytes.
    pub size: u64,
}

/// Opens region-scoped object-storage clients.
pub trait ObjectStoreConnector: Send + Sync {
    /// Connect to the storage endpoint for `region` using `credentials`.
    fn connect(
        &self,
        region: &str,
        credentials: &Credentials,
    ) -> Result<Box<dyn ObjectStore>, TransportError>;
}

/// Blob operations against one region.
pub trait ObjectStore {
    /// Store `payload` under `key`.
    fn put_object_from_string(
        &self,
        bucket: &str,
        key: &str,
        payload: &str,
    ) -> Result<(), TransportError>;

    /// Upload the file at `path` under `key`.
    fn put_object_from_file(&self, bucket: &str, key: &str, path: &Path)
    -> Result<(), TransportError>;

    /// Read an object into memory.
    fn get_object_as_bytes(&self, bucket: &str, key: &str) -> Result<Vec<u8>, TransportError>;

    /// Download an object to `path`, returning the bytes written.
    fn get_object_to_file(&self, bucket: &str, key: &str, path: &Path)
    -> Result<u64, TransportError>;

    /// Probe for an object; an error means it does not exist or is unreachable.
    fn object_meta(&self, bucket: &str, key: &str) -> Result<ObjectMeta, TransportError>;

    /// Delete an object.
    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), TransportError>;

    /// Produce a URL granting read access to `key` for `ttl`.
    fn generate_shared_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, TransportError>;
}
