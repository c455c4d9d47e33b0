//! Data source backed by a single object in an object-storage bucket.

use std::fmt;

use camino::Utf8PathBuf;
use log::{debug, info, warn};
use wharf_core::{
    Content, Credentials, DataSource, DataSourceError, FetchOptions, FormatType, ObjectStore,
    ObjectStoreConnector, SaveOptions, infer_format,
};

use crate::archive;

const ARCHIVE_EXTENSION: &str = "zip";

/// Where an object lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    /// Storage region of the bucket.
    pub region: String,
    /// Bucket name.
    pub bucket: String,
    /// Object key, without a leading `/`.
    pub key: String,
}

impl ObjectLocation {
    /// Describe an object. A leading `/` on `key` is dropped.
    pub fn new(
        region: impl Into<String>,
        bucket: impl Into<String>,
        key: impl AsRef<str>,
    ) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            key: key.as_ref().trim_start_matches('/').to_owned(),
        }
    }
}

/// Reads and writes one object through an [`ObjectStore`] client.
pub struct ObjectStoreSource {
    store: Box<dyn ObjectStore>,
    location: ObjectLocation,
    format: FormatType,
}

impl fmt::Debug for ObjectStoreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreSource")
            .field("location", &self.location)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl ObjectStoreSource {
    /// Connect to the object's region and bind the source to it.
    ///
    /// # Errors
    /// Fails with [`DataSourceError::InvalidArgument`] when the key names a
    /// directory or no credentials are available, with
    /// [`DataSourceError::InvalidFormat`] when the format cannot be inferred,
    /// and with [`DataSourceError::Transport`] when the connection fails.
    pub fn new(
        connector: &dyn ObjectStoreConnector,
        location: ObjectLocation,
        format: Option<FormatType>,
        credentials: Option<&Credentials>,
    ) -> Result<Self, DataSourceError> {
        if location.key.is_empty() || location.key.ends_with('/') {
            return Err(DataSourceError::invalid_argument(format!(
                "object key {:?} must name a file",
                location.key
            )));
        }
        let resolved = credentials.ok_or_else(|| {
            DataSourceError::invalid_argument("object storage requires an access key and secret key")
        })?;
        let bound = match format {
            Some(explicit) => explicit,
            None => infer_format(&location.key)?.format,
        };
        let store = connector.connect(&location.region, resolved)?;
        Ok(Self {
            store,
            location,
            format: bound,
        })
    }

    /// Object the source is bound to.
    #[must_use]
    pub const fn location(&self) -> &ObjectLocation {
        &self.location
    }

    /// Key used when uploading an archive: the format extension becomes `.zip`.
    fn archive_key(&self) -> String {
        let suffix = format!(".{}", self.format.extension());
        self.location.key.strip_suffix(&suffix).map_or_else(
            || self.location.key.clone(),
            |stem| format!("{stem}.{ARCHIVE_EXTENSION}"),
        )
    }

    fn fetch_archive(&self) -> Result<Content, DataSourceError> {
        let ObjectLocation { bucket, key, .. } = &self.location;
        let download = tempfile::Builder::new()
            .prefix("wharf-object-")
            .suffix(".zip")
            .tempfile()
            .map_err(|err| DataSourceError::io(std::env::temp_dir(), err))?;
        let path = Utf8PathBuf::from_path_buf(download.path().to_path_buf()).map_err(|path| {
            DataSourceError::invalid_argument(format!("temporary path {path:?} is not UTF-8"))
        })?;
        let bytes = self.store.get_object_to_file(bucket, key, download.path())?;
        debug!("downloaded {bytes} bytes from {bucket}/{key} to {path}");
        let records = archive::read_records(&path);
        if let Err(err) = download.close() {
            warn!("failed to remove temporary archive {path}: {err}");
        }
        records.map(Content::Records)
    }

    fn fetch_document(&self) -> Result<Content, DataSourceError> {
        let ObjectLocation { bucket, key, .. } = &self.location;
        let bytes = self.store.get_object_as_bytes(bucket, key)?;
        String::from_utf8(bytes)
            .map(Content::Document)
            .map_err(|source| DataSourceError::Decode {
                location: format!("{bucket}/{key}"),
                source,
            })
    }

    fn ensure_writable(&self, key: &str, overwrite: bool) -> Result<(), DataSourceError> {
        let bucket = &self.location.bucket;
        if overwrite {
            if let Err(err) = self.store.delete_object(bucket, key) {
                debug!("ignoring failed delete of {bucket}/{key}: {err}");
            }
            return Ok(());
        }
        match self.store.object_meta(bucket, key) {
            Ok(_) => Err(DataSourceError::invalid_argument(format!(
                "object {bucket}/{key} already exists and overwrite is disabled"
            ))),
            Err(err) => {
                debug!("no existing object at {bucket}/{key}: {err}");
                Ok(())
            }
        }
    }
}

impl DataSource for ObjectStoreSource {
    fn fetch(&mut self, options: &FetchOptions) -> Result<Content, DataSourceError> {
        let as_archive = options.read_as_archive.unwrap_or_else(|| {
            self.location
                .key
                .ends_with(&format!(".{ARCHIVE_EXTENSION}"))
        });
        if as_archive {
            self.fetch_archive()
        } else {
            self.fetch_document()
        }
    }

    fn save(&mut self, options: SaveOptions) -> Result<bool, DataSourceError> {
        options.check_exclusive()?;
        let bucket = self.location.bucket.clone();
        match (options.data, options.zip_file_path) {
            (Some(data), _) => {
                let key = self.location.key.clone();
                self.ensure_writable(&key, options.overwrite)?;
                let payload = data.into_payload(self.format);
                self.store.put_object_from_string(&bucket, &key, &payload)?;
                info!("uploaded {} bytes to {bucket}/{key}", payload.len());
            }
            (None, Some(archive_path)) => {
                let key = self.archive_key();
                self.ensure_writable(&key, options.overwrite)?;
                self.store.put_object_from_file(&bucket, &key, &archive_path)?;
                info!("uploaded archive {} to {bucket}/{key}", archive_path.display());
            }
            (None, None) => {
                return Err(DataSourceError::invalid_argument(
                    "one of data or zip_file_path is required",
                ));
            }
        }
        Ok(true)
    }

    fn format(&self) -> FormatType {
        self.format
    }

    fn set_format(&mut self, format: FormatType) -> Result<(), DataSourceError> {
        self.format = format;
        Ok(())
    }
}
