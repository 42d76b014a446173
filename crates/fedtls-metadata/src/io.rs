//! Atomic file writes for verified metadata.
//!
//! Content is written to a hidden temp file next to the destination and then
//! renamed over it, so a reader never observes a partially written document.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

/// Temp file in the destination's directory, unique per call.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "metadata".to_string());
    let nonce: u64 = rand::random();
    path.with_file_name(format!(
        ".{}.{}.{:016x}.tmp",
        name,
        std::process::id(),
        nonce
    ))
}

/// Write `content` to `path` through temp file + rename.
///
/// On failure the temp file is removed and `path` is left as it was.
pub(crate) async fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let temp_path = temp_path_for(path);

    if let Err(e) = fs::write(&temp_path, content).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e);
    }

    debug!(path = %path.display(), bytes = content.len(), "wrote file atomically");
    Ok(())
}

/// Whether two paths name the same existing file.
pub(crate) async fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a).await, fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_write_atomic_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no-such-dir").join("metadata.json");

        assert!(write_atomic(&path, b"content").await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_write_atomic_onto_directory_keeps_it() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("occupied");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        assert!(write_atomic(&target, b"content").await.is_err());
        assert!(target.join("keep").exists());
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, "{}").unwrap();

        let dotted = dir.path().join(".").join("metadata.json");
        assert!(same_file(&path, &dotted).await);
        assert!(!same_file(&path, &dir.path().join("other.json")).await);
    }

    #[test]
    fn test_temp_path_differs_per_call() {
        let path = Path::new("/var/lib/fedtls/metadata.json");
        assert_ne!(temp_path_for(path), temp_path_for(path));
    }

    #[tokio::test]
    async fn test_concurrent_writes_to_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let first = vec![b'a'; 256 * 1024];
        let second = vec![b'b'; 256 * 1024];

        let (a, b) = tokio::join!(write_atomic(&path, &first), write_atomic(&path, &second));
        a.unwrap();
        b.unwrap();

        let content = std::fs::read(&path).unwrap();
        assert!(content == first || content == second);
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/var/lib/fedtls/metadata.json"));
        assert_eq!(temp.parent(), Some(Path::new("/var/lib/fedtls")));
        let name = temp.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(".metadata.json."));
        assert!(name.ends_with(".tmp"));
    }
}
