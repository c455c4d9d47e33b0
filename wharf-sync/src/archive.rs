//! Zip archive inspection, bounded extraction, and record reading.

use std::{
    fs::File,
    io::{BufReader, Read},
};

use camino::Utf8Path;
use log::{debug, info};
use wharf_core::DataSourceError;
use zip::{ZipArchive, result::ZipError};

const LOCAL_HEADER_MAGIC: [u8; 4] = *b"PK\x03\x04";
const EMPTY_ARCHIVE_MAGIC: [u8; 4] = *b"PK\x05\x06";

fn archive_error(path: &Utf8Path, source: ZipError) -> DataSourceError {
    DataSourceError::Archive {
        path: path.as_std_path().to_path_buf(),
        source: Box::new(source),
    }
}

fn open(path: &Utf8Path) -> Result<ZipArchive<BufReader<File>>, DataSourceError> {
    let file = wharf_fs::open_utf8_file(path)
        .map_err(|err| DataSourceError::io(path.as_std_path(), err))?
        .into_std();
    ZipArchive::new(BufReader::new(file)).map_err(|err| archive_error(path, err))
}

/// Whether the file at `path` starts with a zip signature.
pub fn is_zip(path: &Utf8Path) -> Result<bool, DataSourceError> {
    let mut file = wharf_fs::open_utf8_file(path)
        .map_err(|err| DataSourceError::io(path.as_std_path(), err))?
        .into_std();
    let mut magic = [0_u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == LOCAL_HEADER_MAGIC || magic == EMPTY_ARCHIVE_MAGIC),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(DataSourceError::io(path.as_std_path(), err)),
    }
}

/// Sum the declared uncompressed size of every entry.
pub fn uncompressed_size(path: &Utf8Path) -> Result<u64, DataSourceError> {
    let mut archive = open(path)?;
    let mut total: u64 = 0;
    for index in 0..archive.len() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|err| archive_error(path, err))?;
        total = total.saturating_add(entry.size());
    }
    Ok(total)
}

/// Fail when `total` reaches `limit`.
pub fn ensure_within_limit(total: u64, limit: u64) -> Result<(), DataSourceError> {
    if total >= limit {
        return Err(DataSourceError::SizeLimitExceeded { total, limit });
    }
    Ok(())
}

/// Check the archive against `limit`, returning its uncompressed size.
pub fn check_size(path: &Utf8Path, limit: u64) -> Result<u64, DataSourceError> {
    let total = uncompressed_size(path)?;
    debug!("archive {path} expands to {total} bytes (limit {limit})");
    ensure_within_limit(total, limit)?;
    Ok(total)
}

/// Extract every entry into `destination`, which must already exist.
///
/// Entry names that would escape `destination` are rejected by the zip reader.
pub fn extract_into(path: &Utf8Path, destination: &Utf8Path) -> Result<(), DataSourceError> {
    let mut archive = open(path)?;
    archive
        .extract(destination.as_std_path())
        .map_err(|err| archive_error(path, err))?;
    info!("extracted {} entries from {path} into {destination}", archive.len());
    Ok(())
}

/// Read the text of every file entry, ordered by entry name.
pub fn read_records(path: &Utf8Path) -> Result<Vec<String>, DataSourceError> {
    let mut archive = open(path)?;
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(str::to_owned)
        .collect();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let mut entry = archive
                .by_name(&name)
                .map_err(|err| archive_error(path, err))?;
            let mut bytes = Vec::new();
            entry
                .read_to_end(&mut bytes)
                .map_err(|err| DataSourceError::io(path.as_std_path(), err))?;
            String::from_utf8(bytes).map_err(|source| DataSourceError::Decode {
                location: format!("{path}!{name}"),
                source,
            })
        })
        .collect()
}
