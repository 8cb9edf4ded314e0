//! Whole-document JSON file I/O.
//!
//! Writes use the temp-file + fsync + rename pattern so a crash never leaves
//! a half-written document behind. When backups are enabled the previous
//! version is copied to `<name>.bak` first.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::StorageError;

pub fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))
}

/// Read and parse a JSON document. A missing file is `Ok(None)`.
pub fn read_json(path: &Path) -> Result<Option<Value>, StorageError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StorageError::Corrupted {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Pretty-print `document` (2-space indent) to `path` atomically.
pub fn write_json(path: &Path, document: &Value, backup: bool) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(document)?;
    if backup {
        backup_file(path)?;
    }
    write_atomic(path, json.as_bytes())
}

pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let temp_path = sibling(path, ".", ".tmp");

    let result = write_synced(&temp_path, data)
        .map_err(|e| StorageError::io(&temp_path, e))
        .and_then(|()| std::fs::rename(&temp_path, path).map_err(|e| StorageError::io(path, e)));
    if result.is_err() {
        discard_temp(&temp_path);
    }
    result
}

fn discard_temp(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove temp file"),
    }
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// Copy `path` to `path.bak`. Returns the backup path, or `None` when there
/// was nothing to back up.
pub fn backup_file(path: &Path) -> Result<Option<PathBuf>, StorageError> {
    if !path.exists() {
        return Ok(None);
    }
    let backup = sibling(path, "", ".bak");
    std::fs::copy(path, &backup).map_err(|e| StorageError::io(&backup, e))?;
    tracing::debug!(path = %path.display(), backup = %backup.display(), "backed up file");
    Ok(Some(backup))
}

/// Delete `path`, backing it up first when asked. Missing files are fine.
pub fn remove_file(path: &Path, backup: bool) -> Result<(), StorageError> {
    if !path.exists() {
        return Ok(());
    }
    if backup {
        backup_file(path)?;
    }
    std::fs::remove_file(path).map_err(|e| StorageError::io(path, e))
}

/// Every `*.json` file directly inside `dir`, sorted by name. A missing
/// directory yields an empty list.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>, StorageError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(dir, e)),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StorageError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn sibling(path: &Path, prefix: &str, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix);
    name.push(path.file_name().unwrap_or_default());
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn temp() -> TempDir {
        TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"))
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = temp();
        let read = read_json(&dir.path().join("absent.json")).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(read, None);
    }

    #[test]
    fn write_then_read_uses_two_space_indent() {
        let dir = temp();
        let path = dir.path().join("nested").join("doc.json");
        let doc = json!({"agarose_bottles": {"AG-1": {"manufacturer": "Thermo"}}});
        write_json(&path, &doc, false).unwrap_or_else(|e| panic!("{e}"));

        let raw = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("{e}"));
        assert!(raw.starts_with("{\n  \"agarose_bottles\": {\n    \"AG-1\""), "{raw}");
        assert_eq!(read_json(&path).unwrap_or_else(|e| panic!("{e}")), Some(doc));
        assert!(!dir.path().join("nested").join(".doc.json.tmp").exists());
    }

    #[test]
    fn overwrite_keeps_backup_of_previous_version() {
        let dir = temp();
        let path = dir.path().join("doc.json");
        write_json(&path, &json!({"v": 1}), true).unwrap_or_else(|e| panic!("{e}"));
        assert!(!dir.path().join("doc.json.bak").exists());

        write_json(&path, &json!({"v": 2}), true).unwrap_or_else(|e| panic!("{e}"));
        let backup = read_json(&dir.path().join("doc.json.bak")).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(backup, Some(json!({"v": 1})));
    }

    #[test]
    fn corrupted_document_is_reported_with_path() {
        let dir = temp();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap_or_else(|e| panic!("{e}"));
        match read_json(&path) {
            Err(StorageError::Corrupted { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected corruption error, got {other:?}"),
        }
    }

    #[test]
    fn list_ignores_backups_and_other_files() {
        let dir = temp();
        for name in ["b.json", "a.json", "a.json.bak", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").unwrap_or_else(|e| panic!("{e}"));
        }
        let names: Vec<String> = list_json_files(dir.path())
            .unwrap_or_else(|e| panic!("{e}"))
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
        assert_eq!(
            list_json_files(&dir.path().join("missing")).unwrap_or_else(|e| panic!("{e}")),
            Vec::<PathBuf>::new()
        );
    }

    #[test]
    fn failed_write_leaves_no_temp_file() {
        let dir = temp();
        let target = dir.path().join("taken.json");
        std::fs::create_dir_all(target.join("inner")).unwrap_or_else(|e| panic!("{e}"));

        let result = write_atomic(&target, b"{}");
        assert!(matches!(result, Err(StorageError::Io { .. })));
        assert!(!dir.path().join(".taken.json.tmp").exists());
        assert!(target.is_dir());
    }

    #[test]
    fn remove_backs_up_first() {
        let dir = temp();
        let path = dir.path().join("gone.json");
        std::fs::write(&path, "{}").unwrap_or_else(|e| panic!("{e}"));
        remove_file(&path, true).unwrap_or_else(|e| panic!("{e}"));
        assert!(!path.exists());
        assert!(dir.path().join("gone.json.bak").exists());
        remove_file(&path, true).unwrap_or_else(|e| panic!("{e}"));
    }
}
