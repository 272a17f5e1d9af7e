use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a unique temporary directory to hold submission documents for
/// the duration of a test. The directory is removed when the returned
/// `TempDir` is dropped.
///
/// Keep the returned `TempDir` in scope for as long as you need the files.
pub fn setup_test_document_dir() -> TempDir {
    TempDir::new().expect("failed to create tempdir")
}

/// Writes `contents` to `dir/name` and returns the absolute path.
pub fn write_test_document(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write test document");
    path.canonicalize().unwrap_or(path)
}
