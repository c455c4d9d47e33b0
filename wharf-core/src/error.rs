//! Error types shared by every data source and collaborator.

use std::{error::Error as StdError, io, path::PathBuf};

use thiserror::Error;

use crate::RemoteOperation;

/// Boxed error used where the underlying library error type should not leak
/// into the public signature.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Errors produced while fetching from or saving to a data source.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DataSourceError {
    /// The local path, object, or remote dataset does not exist.
    #[error("{what} not found")]
    NotFound {
        /// Description of the missing location.
        what: String,
    },
    /// No [`FormatType`](crate::FormatType) matches the supplied suffix.
    #[error("cannot match a format type for suffix {suffix:?}")]
    InvalidFormat {
        /// Suffix that failed to match.
        suffix: String,
    },
    /// The caller supplied conflicting, missing, or malformed parameters.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Explanation of the violated precondition.
        reason: String,
    },
    /// The operation is not valid for this source or storage kind.
    #[error("{operation} is not supported: {reason}")]
    Unsupported {
        /// Operation that was attempted.
        operation: &'static str,
        /// Why the operation cannot proceed.
        reason: String,
    },
    /// The export archive expands beyond the configured ceiling.
    #[error("dataset archive expands to {total} bytes, limit is {limit} bytes")]
    SizeLimitExceeded {
        /// Summed uncompressed size of every archive entry.
        total: u64,
        /// Configured byte ceiling.
        limit: u64,
    },
    /// A remote export, import, or release job reported failure.
    #[error("{operation} failed for dataset {dataset_id}: {detail}")]
    RemoteOperationFailed {
        /// Remote job kind.
        operation: RemoteOperation,
        /// Dataset the job targeted.
        dataset_id: String,
        /// Message reported by the platform.
        detail: String,
    },
    /// A collaborator call raised a transport-level error.
    ///
    /// Missing remote resources convert to [`DataSourceError::NotFound`]
    /// instead.
    #[error(transparent)]
    Transport(TransportError),
    /// Local filesystem access failed.
    #[error("filesystem access failed for {path:?}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// An archive could not be opened, read, or extracted.
    #[error("failed to process archive {path:?}: {source}")]
    Archive {
        /// Archive location on disk.
        path: PathBuf,
        /// Underlying archive error.
        #[source]
        source: BoxedError,
    },
    /// The cache metadata file could not be encoded or decoded.
    #[error("failed to process cache metadata {path:?}: {source}")]
    Metadata {
        /// Metadata file location.
        path: PathBuf,
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },
    /// Content was not valid UTF-8 text.
    #[error("content of {location} is not valid UTF-8: {source}")]
    Decode {
        /// Where the bytes came from.
        location: String,
        /// Underlying decoding error.
        #[source]
        source: std::string::FromUtf8Error,
    },
}

impl DataSourceError {
    /// Build an [`DataSourceError::InvalidArgument`] from any displayable reason.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Build a [`DataSourceError::NotFound`] for the described location.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Wrap an I/O error with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<TransportError> for DataSourceError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NotFound { what } => Self::NotFound { what },
            other => Self::Transport(other),
        }
    }
}

/// Transport-level errors raised by platform and object-storage collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description supplied by the server.
        message: String,
    },
    /// The request failed due to an I/O error.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        #[source]
        source: io::Error,
    },
    /// The remote service rejected the call.
    #[error("{operation} rejected by the service: {message}")]
    Service {
        /// Operation being attempted.
        operation: String,
        /// Error message returned by the service.
        message: String,
    },
    /// The addressed object or dataset does not exist remotely.
    #[error("{what} does not exist")]
    NotFound {
        /// Description of the missing resource.
        what: String,
    },
    /// A URL could not be parsed.
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        /// Rejected input.
        url: String,
        /// Parse failure.
        #[source]
        source: BoxedError,
    },
}
