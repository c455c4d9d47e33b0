//! Streamed download of export archives.
//!
//! [`ArchiveFetcher`] abstracts the transport; [`HttpArchiveFetcher`] streams
//! over HTTP(S). [`download_archive`] writes an archive to a local path.

mod http;

use std::io::{BufWriter, Write};

use camino::Utf8Path;
use log::info;
use wharf_core::{DataSourceError, TransportError};

pub use http::{DEFAULT_USER_AGENT, FetcherBuildError, HttpArchiveFetcher};

/// Streams an archive from a URL into a sink.
pub trait ArchiveFetcher: Send + Sync {
    /// Copy the body at `url` into `sink`, returning the bytes written.
    fn fetch_archive(&self, url: &str, sink: &mut dyn Write) -> Result<u64, TransportError>;
}

/// Download the archive at `url` to `output_path`, truncating any previous
/// file.
///
/// A failed or interrupted download may leave a partial file behind; callers
/// must not treat the file as valid until they have checked it.
pub fn download_archive<F: ArchiveFetcher + ?Sized>(
    fetcher: &F,
    url: &str,
    output_path: &Utf8Path,
) -> Result<u64, DataSourceError> {
    let file = wharf_fs::create_utf8_file(output_path)
        .map_err(|err| DataSourceError::io(output_path.as_std_path(), err))?
        .into_std();
    let mut writer = BufWriter::new(file);
    let bytes_written = fetcher.fetch_archive(url, &mut writer)?;
    writer
        .flush()
        .map_err(|err| DataSourceError::io(output_path.as_std_path(), err))?;
    info!("downloaded {bytes_written} bytes from {url} to {output_path}");
    Ok(bytes_written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubArchiveFetcher;
    use camino::Utf8PathBuf;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    fn writes_archive_and_creates_parents() {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        let target = root.join("nested/bin.zip");
        let fetcher = StubArchiveFetcher::new().with_archive("stub://a", b"payload".to_vec());

        let written = download_archive(&fetcher, "stub://a", &target).expect("download");

        assert_eq!(written, 7);
        assert_eq!(std::fs::read(&target).expect("read"), b"payload");
    }

    #[rstest]
    fn unknown_url_surfaces_transport_error() {
        let dir = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        let fetcher = StubArchiveFetcher::new();
        let err = download_archive(&fetcher, "stub://missing", &root.join("bin.zip"))
            .expect_err("missing archive should fail");
        assert!(matches!(
            err,
            DataSourceError::Transport(TransportError::NotFound { .. })
        ));
    }
}
