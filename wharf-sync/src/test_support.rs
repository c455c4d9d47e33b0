//! Shared fixtures for synchronisation tests.

use std::{
    collections::HashMap,
    io::{Cursor, Write},
    sync::{Mutex, PoisonError},
};

use camino::Utf8Path;
use wharf_core::TransportError;
use zip::{ZipWriter, write::SimpleFileOptions};

use crate::download::ArchiveFetcher;

/// Build an in-memory zip archive from `(name, contents)` pairs.
#[must_use]
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap_or_else(|err| panic!("failed to start zip entry {name}: {err}"));
        writer
            .write_all(contents.as_bytes())
            .unwrap_or_else(|err| panic!("failed to write zip entry {name}: {err}"));
    }
    writer
        .finish()
        .unwrap_or_else(|err| panic!("failed to finish zip archive: {err}"))
        .into_inner()
}

/// Write a zip archive built by [`zip_bytes`] to `path`.
pub fn write_zip(path: &Utf8Path, entries: &[(&str, &str)]) {
    std::fs::write(path, zip_bytes(entries))
        .unwrap_or_else(|err| panic!("failed to write zip fixture {path}: {err}"));
}

/// [`ArchiveFetcher`] serving archives from memory, keyed by URL.
#[derive(Debug, Default)]
pub struct StubArchiveFetcher {
    archives: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<Vec<String>>,
}

impl StubArchiveFetcher {
    /// Create a fetcher serving nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` at `url`.
    #[must_use]
    pub fn with_archive(self, url: &str, bytes: Vec<u8>) -> Self {
        self.set_archive(url, bytes);
        self
    }

    /// Replace whatever is served at `url`.
    pub fn set_archive(&self, url: &str, bytes: Vec<u8>) {
        self.archives
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_owned(), bytes);
    }

    /// URLs requested so far, oldest first.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ArchiveFetcher for StubArchiveFetcher {
    fn fetch_archive(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_owned());
        let bytes = self
            .archives
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::NotFound {
                what: format!("archive at {url}"),
            })?;
        sink.write_all(&bytes)
            .map_err(|source| TransportError::Network {
                url: url.to_owned(),
                source,
            })?;
        Ok(bytes.len() as u64)
    }
}
