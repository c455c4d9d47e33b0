//! Addressing for one revision of one managed dataset.

use std::fmt;

use crate::DataSourceError;

/// Identity of a managed dataset revision.
///
/// The triple doubles as the cache-directory key, so each component must be a
/// single, non-empty path segment.
///
/// # Examples
/// ```
/// use wharf_core::DatasetIdentity;
///
/// let identity = DatasetIdentity::new("g-1", "ds-42", 3)?;
/// assert_eq!(identity.cache_segments(), ["g-1".to_owned(), "ds-42".to_owned(), "3".to_owned()]);
/// assert!(DatasetIdentity::new("g-1", "../escape", 1).is_err());
/// # Ok::<(), wharf_core::DataSourceError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetIdentity {
    group_id: String,
    dataset_id: String,
    version: u64,
}

impl DatasetIdentity {
    /// Validate and construct an identity.
    pub fn new(
        group_id: impl Into<String>,
        dataset_id: impl Into<String>,
        version: u64,
    ) -> Result<Self, DataSourceError> {
        let group = group_id.into();
        let dataset = dataset_id.into();
        validate_segment("group id", &group)?;
        validate_segment("dataset id", &dataset)?;
        Ok(Self {
            group_id: group,
            dataset_id: dataset,
            version,
        })
    }

    /// Group the dataset belongs to.
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Dataset identifier used for platform calls.
    #[must_use]
    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    /// Revision number.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Path segments of the cache directory, outermost first.
    #[must_use]
    pub fn cache_segments(&self) -> [String; 3] {
        [
            self.group_id.clone(),
            self.dataset_id.clone(),
            self.version.to_string(),
        ]
    }
}

impl fmt::Display for DatasetIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@v{}", self.group_id, self.dataset_id, self.version)
    }
}

fn validate_segment(field: &str, value: &str) -> Result<(), DataSourceError> {
    let trimmed = value.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed.contains("..")
        || trimmed.contains(['/', '\\'])
    {
        return Err(DataSourceError::invalid_argument(format!(
            "{field} {value:?} is not a valid cache path segment"
        )));
    }
    Ok(())
}
