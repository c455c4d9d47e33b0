//! Read local files, directories, and archives into [`Content`].

use camino::Utf8Path;
use wharf_core::{Content, DataSourceError};
use wharf_fs::PathKind;

use crate::archive;

fn decode(path: &Utf8Path, bytes: Vec<u8>) -> Result<String, DataSourceError> {
    String::from_utf8(bytes).map_err(|source| DataSourceError::Decode {
        location: path.to_string(),
        source,
    })
}

/// Read a file as UTF-8 text.
pub fn read_text(path: &Utf8Path) -> Result<String, DataSourceError> {
    let bytes =
        wharf_fs::read_file(path).map_err(|err| DataSourceError::io(path.as_std_path(), err))?;
    decode(path, bytes)
}

/// Read every file below `root`, ordered by relative path.
pub fn read_directory(root: &Utf8Path) -> Result<Vec<String>, DataSourceError> {
    wharf_fs::list_files_sorted(root)
        .map_err(|err| DataSourceError::io(root.as_std_path(), err))?
        .iter()
        .map(|path| read_text(path))
        .collect()
}

/// Read whatever lives at `path`.
///
/// A directory yields its files as records, a zip archive yields its entries
/// as records, and any other file yields one document with surrounding
/// newlines removed.
pub fn read_location(path: &Utf8Path) -> Result<Content, DataSourceError> {
    match wharf_fs::path_kind(path).map_err(|err| DataSourceError::io(path.as_std_path(), err))? {
        PathKind::Missing => Err(DataSourceError::not_found(format!("path {path}"))),
        PathKind::Directory => read_directory(path).map(Content::Records),
        PathKind::File if archive::is_zip(path)? => archive::read_records(path).map(Content::Records),
        PathKind::File => {
            let text = read_text(path)?;
            Ok(Content::Document(trim_newlines(&text).to_owned()))
        }
    }
}

fn trim_newlines(text: &str) -> &str {
    text.trim_matches(|ch| ch == '\n' || ch == '\r')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_zip;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn sandbox() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap_or_else(|err| panic!("temp dir: {err}"));
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .unwrap_or_else(|path| panic!("non-UTF-8 temp dir {path:?}"));
        (dir, root)
    }

    #[rstest]
    fn missing_path_is_not_found(sandbox: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = sandbox;
        assert!(matches!(
            read_location(&root.join("absent.jsonl")),
            Err(DataSourceError::NotFound { .. })
        ));
    }

    #[rstest]
    fn documents_lose_surrounding_newlines(sandbox: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = sandbox;
        let path = root.join("doc.txt");
        fs::write(&path, "\nhello\nworld\n\n").expect("write");
        assert_eq!(
            read_location(&path).expect("read"),
            Content::Document("hello\nworld".to_owned())
        );
    }

    #[rstest]
    fn directories_and_archives_yield_records(sandbox: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = sandbox;
        let dir = root.join("folder");
        fs::create_dir(&dir).expect("mkdir");
        fs::write(dir.join("b.txt"), "b").expect("write");
        fs::write(dir.join("a.txt"), "a").expect("write");
        assert_eq!(
            read_location(&dir).expect("read"),
            Content::Records(vec!["a".into(), "b".into()])
        );

        let zipped = root.join("bundle.data");
        write_zip(&zipped, &[("2.txt", "two"), ("1.txt", "one")]);
        assert_eq!(
            read_location(&zipped).expect("read"),
            Content::Records(vec!["one".into(), "two".into()])
        );
    }
}
