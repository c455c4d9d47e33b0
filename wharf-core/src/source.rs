//! The uniform contract shared by every data source.
//!
//! A [`DataSource`] reads its content with [`DataSource::fetch`] and writes new
//! content with [`DataSource::save`]. Each source is bound to one
//! [`FormatType`], which decides how multi-record payloads are framed.

use std::path::PathBuf;

use crate::{Content, DataSourceError, DestinationOverride, FormatType};

/// Options accepted by [`DataSource::fetch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Force archive handling regardless of the location's suffix.
    pub read_as_archive: Option<bool>,
}

impl FetchOptions {
    /// Force or suppress archive handling.
    #[must_use]
    pub const fn with_read_as_archive(mut self, read_as_archive: bool) -> Self {
        self.read_as_archive = Some(read_as_archive);
        self
    }
}

/// Options accepted by [`DataSource::save`].
///
/// Exactly one of `data` and `zip_file_path` must be set; sources validate this
/// before touching the filesystem or network.
///
/// # Examples
/// ```
/// use wharf_core::{Content, SaveOptions};
///
/// let options = SaveOptions::with_data(Content::from("hello")).annotated(true);
/// assert!(options.check_exclusive().is_ok());
/// assert!(SaveOptions::default().check_exclusive().is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveOptions {
    /// Inline content to write.
    pub data: Option<Content>,
    /// Local zip archive to upload instead of inline content.
    pub zip_file_path: Option<PathBuf>,
    /// Whether the imported data carries annotations.
    pub annotated: bool,
    /// Release the new revision once the import succeeds.
    pub release: bool,
    /// Replace an existing object instead of failing.
    pub overwrite: bool,
    /// Upload target overriding the dataset's own storage.
    pub destination: Option<DestinationOverride>,
}

impl SaveOptions {
    /// Save inline content.
    pub fn with_data(data: impl Into<Content>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::default()
        }
    }

    /// Save a local zip archive.
    pub fn with_zip_file(path: impl Into<PathBuf>) -> Self {
        Self {
            zip_file_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Tag the import as annotated.
    #[must_use]
    pub const fn annotated(mut self, annotated: bool) -> Self {
        self.annotated = annotated;
        self
    }

    /// Release after a successful import.
    #[must_use]
    pub const fn release(mut self, release: bool) -> Self {
        self.release = release;
        self
    }

    /// Allow replacing existing objects.
    #[must_use]
    pub const fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Upload to an explicit destination.
    #[must_use]
    pub fn destination(mut self, destination: DestinationOverride) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Fail unless exactly one payload is supplied.
    pub fn check_exclusive(&self) -> Result<(), DataSourceError> {
        match (&self.data, &self.zip_file_path) {
            (Some(_), None) | (None, Some(_)) => Ok(()),
            (Some(_), Some(_)) => Err(DataSourceError::invalid_argument(
                "data and zip_file_path are mutually exclusive",
            )),
            (None, None) => Err(DataSourceError::invalid_argument(
                "one of data or zip_file_path is required",
            )),
        }
    }
}

/// Capability contract shared by file, object-store, and managed sources.
///
/// `fetch` takes `&mut self` because managed sources record whether they have
/// synchronised their cache; callers sharing a source across threads wrap it in
/// a lock.
pub trait DataSource {
    /// Read the source's content.
    fn fetch(&mut self, options: &FetchOptions) -> Result<Content, DataSourceError>;

    /// Write new content, returning whether every requested step succeeded.
    fn save(&mut self, options: SaveOptions) -> Result<bool, DataSourceError>;

    /// Format bound to the source.
    fn format(&self) -> FormatType;

    /// Rebind the source's format.
    fn set_format(&mut self, format: FormatType) -> Result<(), DataSourceError>;
}
