//! Platform-side dataset models: type tags, revision info, and job results.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DataSourceError, DatasetIdentity, FormatType, StorageDescriptor};

/// Broad family of a managed dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetCategory {
    /// Text-only corpora.
    Text,
    /// Datasets pairing text with other media.
    MultiModal,
}

/// Template describing the record layout of a managed dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetTemplate {
    /// Conversations without ranking.
    NonSortedConversation,
    /// Conversations with ranked responses.
    SortedConversation,
    /// Prompts without responses.
    QuerySet,
    /// Free-form text.
    GenericText,
    /// Prompt and image pairs.
    TextToImage,
}

impl DatasetTemplate {
    /// Family the template belongs to.
    #[must_use]
    pub const fn category(self) -> DatasetCategory {
        match self {
            Self::TextToImage => DatasetCategory::MultiModal,
            Self::NonSortedConversation
            | Self::SortedConversation
            | Self::QuerySet
            | Self::GenericText => DatasetCategory::Text,
        }
    }

    /// Format bound to datasets of this template.
    ///
    /// # Examples
    /// ```
    /// use wharf_core::{DatasetTemplate, FormatType};
    ///
    /// assert_eq!(DatasetTemplate::QuerySet.format(), FormatType::Jsonl);
    /// assert_eq!(DatasetTemplate::TextToImage.format(), FormatType::Json);
    /// ```
    #[must_use]
    pub const fn format(self) -> FormatType {
        match self.category() {
            DatasetCategory::Text => FormatType::Jsonl,
            DatasetCategory::MultiModal => FormatType::Json,
        }
    }
}

/// Platform view of one dataset revision.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetInfo {
    /// Revision identity.
    pub identity: DatasetIdentity,
    /// Human-readable name.
    pub name: String,
    /// Record layout.
    pub template: DatasetTemplate,
    /// Backing storage.
    pub storage: StorageDescriptor,
    /// Last time the revision's content changed, by the server clock.
    pub modify_time: DateTime<Utc>,
    /// Number of exports ever produced for the revision.
    pub export_record_count: u64,
    /// Number of entities held by the revision.
    pub entity_count: u64,
    /// Payload as returned by the platform.
    pub raw: Value,
}

/// Result of a successful export job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Where the exported archive can be downloaded.
    pub download_url: String,
    /// When the export finished, by the server clock.
    pub produced_at: DateTime<Utc>,
    /// Payload as returned by the platform.
    #[serde(default)]
    pub raw: Value,
}

/// Select the most recent export from an unordered listing.
#[must_use]
pub fn latest_export(records: Vec<ExportRecord>) -> Option<ExportRecord> {
    records
        .into_iter()
        .max_by_key(|record| record.produced_at)
}

/// Where an import job reads its data from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    /// An object uploaded to storage, addressed as `/{bucket}/{key}`.
    ObjectStoreFile(String),
    /// A time-bounded shared URL pointing at a zip archive.
    SharedZipUrl(String),
}

impl ImportSource {
    /// Location the platform should read from.
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::ObjectStoreFile(location) | Self::SharedZipUrl(location) => location,
        }
    }
}

/// Terminal state of a blocking remote job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job completed successfully.
    Succeeded,
    /// The job reached a failed terminal state.
    Failed {
        /// Message reported by the platform.
        message: String,
    },
}

/// Remote job kinds, used for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    /// Snapshot a revision into a downloadable archive.
    Export,
    /// Ingest uploaded data into a revision.
    Import,
    /// Publish a revision.
    Release,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Export => "export job",
            Self::Import => "import job",
            Self::Release => "release job",
        })
    }
}

/// Storage requested when creating a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageRequest {
    /// Let the platform store the data.
    PublicManaged,
    /// Store the data in a user-owned bucket.
    PrivateUserOwned {
        /// Bucket identifier.
        bucket: String,
        /// Object prefix within the bucket.
        path: String,
    },
}

/// Parameters for creating an empty dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct BareDatasetRequest {
    /// Dataset name.
    pub name: String,
    /// Record layout.
    pub template: DatasetTemplate,
    /// Backing storage.
    pub storage: StorageRequest,
    /// Caller-supplied fields merged into the recorded dataset info.
    pub extra_info: Option<serde_json::Map<String, Value>>,
}

impl BareDatasetRequest {
    /// Request a platform-managed dataset.
    pub fn new(name: impl Into<String>, template: DatasetTemplate) -> Self {
        Self {
            name: name.into(),
            template,
            storage: StorageRequest::PublicManaged,
            extra_info: None,
        }
    }

    /// Store the dataset in a user-owned bucket.
    #[must_use]
    pub fn with_private_storage(
        mut self,
        bucket: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        self.storage = StorageRequest::PrivateUserOwned {
            bucket: bucket.into(),
            path: path.into(),
        };
        self
    }

    /// Attach caller-supplied info.
    #[must_use]
    pub fn with_extra_info(mut self, extra: serde_json::Map<String, Value>) -> Self {
        self.extra_info = Some(extra);
        self
    }

    /// Check that private storage names both a bucket and a path.
    pub fn validate(&self) -> Result<(), DataSourceError> {
        match &self.storage {
            StorageRequest::PrivateUserOwned { bucket, path }
                if bucket.is_empty() || path.is_empty() =>
            {
                Err(DataSourceError::invalid_argument(
                    "private storage requires a bucket and a path",
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Platform response to dataset creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedDataset {
    /// Identity of the new revision.
    pub identity: DatasetIdentity,
    /// Storage assigned by the platform; private storage carries region and
    /// raw path.
    pub storage: StorageDescriptor,
    /// Payload as returned by the platform.
    pub raw: Value,
}

/// Parse a server timestamp.
///
/// RFC 3339 values keep their offset; naive `YYYY-MM-DD HH:MM:SS` and
/// `YYYY-MM-DDTHH:MM:SS` values are read as UTC.
///
/// # Examples
/// ```
/// use wharf_core::parse_server_timestamp;
///
/// let a = parse_server_timestamp("2024-03-01T08:00:00+08:00")?;
/// let b = parse_server_timestamp("2024-03-01 00:00:00")?;
/// assert_eq!(a, b);
/// # Ok::<(), wharf_core::DataSourceError>(())
/// ```
pub fn parse_server_timestamp(value: &str) -> Result<DateTime<Utc>, DataSourceError> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(trimmed, pattern).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            DataSourceError::invalid_argument(format!("unrecognised server timestamp {value:?}"))
        })
}
