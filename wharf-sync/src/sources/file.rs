//! Data source backed by a local file, directory, or zip archive.

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use uuid::Uuid;
use wharf_core::{
    Content, DataSource, DataSourceError, FetchOptions, FormatType, SaveOptions, default_format,
    infer_format,
};
use wharf_fs::PathKind;

use crate::content;

/// Reads and writes content at a local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: Utf8PathBuf,
    format: FormatType,
}

impl FileSource {
    /// Bind a source to `path`.
    ///
    /// Without an explicit `format`, the format is inferred from the file name;
    /// directories and archives fall back to [`FormatType::Text`].
    ///
    /// # Errors
    /// Returns [`DataSourceError::InvalidFormat`] when the file name carries an
    /// unknown suffix and no format was supplied, and
    /// [`DataSourceError::Io`] when the path cannot be inspected.
    pub fn new(
        path: impl Into<Utf8PathBuf>,
        format: Option<FormatType>,
    ) -> Result<Self, DataSourceError> {
        let location = path.into();
        let bound = match format {
            Some(explicit) => explicit,
            None => Self::infer(&location)?,
        };
        Ok(Self {
            path: location,
            format: bound,
        })
    }

    fn infer(location: &Utf8Path) -> Result<FormatType, DataSourceError> {
        let kind = wharf_fs::path_kind(location)
            .map_err(|err| DataSourceError::io(location.as_std_path(), err))?;
        if kind == PathKind::Directory {
            return Ok(default_format(location.as_str()).format);
        }
        infer_format(location.as_str()).map(|inferred| inferred.format)
    }

    /// Location the source reads from and writes to.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn kind(&self) -> Result<PathKind, DataSourceError> {
        wharf_fs::path_kind(&self.path).map_err(|err| DataSourceError::io(self.path.as_std_path(), err))
    }

    fn write(path: &Utf8Path, payload: &str) -> Result<(), DataSourceError> {
        wharf_fs::write_atomic(path, payload.as_bytes())
            .map_err(|err| DataSourceError::io(path.as_std_path(), err))?;
        info!("wrote {} bytes to {path}", payload.len());
        Ok(())
    }

    fn save_document(&self, text: &str) -> Result<(), DataSourceError> {
        let target = if self.kind()? == PathKind::Directory {
            self.path
                .join(format!("data_{}.{}", Uuid::new_v4(), self.format.extension()))
        } else {
            self.path.clone()
        };
        Self::write(&target, text)
    }

    fn save_records(&self, records: &[String]) -> Result<(), DataSourceError> {
        if self.kind()? != PathKind::Missing {
            return Err(DataSourceError::invalid_argument(format!(
                "cannot write records into existing path {}",
                self.path
            )));
        }
        wharf_fs::ensure_dir_all(&self.path)
            .map_err(|err| DataSourceError::io(self.path.as_std_path(), err))?;
        for (index, record) in records.iter().enumerate() {
            let entry = self
                .path
                .join(format!("entry_{index}.{}", self.format.extension()));
            Self::write(&entry, record)?;
        }
        Ok(())
    }
}

impl DataSource for FileSource {
    fn fetch(&mut self, _options: &FetchOptions) -> Result<Content, DataSourceError> {
        content::read_location(&self.path)
    }

    fn save(&mut self, options: SaveOptions) -> Result<bool, DataSourceError> {
        options.check_exclusive()?;
        match options.data {
            Some(Content::Document(text)) => self.save_document(&text)?,
            Some(Content::Records(records)) => self.save_records(&records)?,
            None => {
                return Err(DataSourceError::Unsupported {
                    operation: "saving an archive",
                    reason: "local file sources accept inline data only".to_owned(),
                });
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
