//! Serialisation families bound to data sources and their inference rules.

use std::{fmt, str::FromStr};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::DataSourceError;

const ARCHIVE_SUFFIX: &str = "zip";

/// Content framing understood by every data source.
///
/// # Examples
/// ```
/// use wharf_core::FormatType;
///
/// assert_eq!(FormatType::Jsonl.extension(), "jsonl");
/// assert_eq!("txt".parse::<FormatType>().ok(), Some(FormatType::Text));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatType {
    /// Plain text.
    Text,
    /// Line-delimited JSON records.
    Jsonl,
    /// A single JSON document.
    Json,
}

impl FormatType {
    /// Every known format, longest extension first.
    pub const ALL: [Self; 3] = [Self::Jsonl, Self::Json, Self::Text];

    /// File extension associated with the format, without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Jsonl => "jsonl",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FormatType {
    type Err = DataSourceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension() == value)
            .ok_or_else(|| DataSourceError::InvalidFormat {
                suffix: value.to_owned(),
            })
    }
}

/// Outcome of inferring a [`FormatType`] from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInference {
    /// Selected format.
    pub format: FormatType,
    /// Whether the plain-text default was used because nothing matched.
    pub fallback: bool,
}

impl FormatInference {
    const fn matched(format: FormatType) -> Self {
        Self {
            format,
            fallback: false,
        }
    }

    const fn fallback() -> Self {
        Self {
            format: FormatType::Text,
            fallback: true,
        }
    }
}

/// Infer the format of a path or object key from its final component.
///
/// The longest known suffix wins. Names without a suffix, and `.zip`
/// archives, fall back to [`FormatType::Text`] with a logged warning; any other
/// unknown suffix is rejected.
///
/// # Examples
/// ```
/// use wharf_core::{FormatType, infer_format};
///
/// let inferred = infer_format("exports/data.jsonl")?;
/// assert_eq!(inferred.format, FormatType::Jsonl);
/// assert!(infer_format("archive.zip")?.fallback);
/// assert!(infer_format("data.unknownext").is_err());
/// # Ok::<(), wharf_core::DataSourceError>(())
/// ```
pub fn infer_format(path: &str) -> Result<FormatInference, DataSourceError> {
    let name = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    if let Some(format) = FormatType::ALL
        .into_iter()
        .find(|format| name.ends_with(&format!(".{}", format.extension())))
    {
        info!("use format type {format} for {path}");
        return Ok(FormatInference::matched(format));
    }
    match name.rsplit_once('.') {
        Some((_, suffix)) if suffix != ARCHIVE_SUFFIX => Err(DataSourceError::InvalidFormat {
            suffix: suffix.to_owned(),
        }),
        _ => Ok(default_format(path)),
    }
}

/// Select the plain-text default, logging the fallback.
#[must_use]
pub fn default_format(path: &str) -> FormatInference {
    warn!("use default format type {} for {path}", FormatType::Text);
    FormatInference::fallback()
}
