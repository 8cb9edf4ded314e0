//! Fish dishes, one `{dish_id}_{dof}.json` document per dish.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use labinv_model::{DocumentKind, FishDish, SchemaValidator, ids};
use serde_json::Value;

use crate::error::StorageError;
use crate::files;

/// A dish file that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of loading every dish in the directory.
#[derive(Debug, Default)]
pub struct DishScan {
    pub dishes: Vec<FishDish>,
    pub skipped: Vec<SkippedFile>,
}

pub struct DishStore {
    dir: PathBuf,
    schemas: Arc<SchemaValidator>,
    backups: bool,
}

impl DishStore {
    pub fn new(dir: &Path, schemas: Arc<SchemaValidator>, backups: bool) -> Self {
        Self {
            dir: dir.to_path_buf(),
            schemas,
            backups,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files whose name parses as `{dish_id}_{dof}.json` for exactly this
    /// dish id.
    fn files_for(&self, dish_id: &str) -> Result<Vec<PathBuf>, StorageError> {
        Ok(files::list_json_files(&self.dir)?
            .into_iter()
            .filter(|path| {
                path.file_name()
                    .and_then(std::ffi::OsStr::to_str)
                    .and_then(ids::parse_dish_file_name)
                    .is_some_and(|(id, _)| id == dish_id)
            })
            .collect())
    }

    pub fn exists(&self, dish_id: &str) -> Result<bool, StorageError> {
        Ok(!self.files_for(dish_id)?.is_empty())
    }

    pub fn load(&self, dish_id: &str) -> Result<Option<FishDish>, StorageError> {
        let mut matches = self.files_for(dish_id)?;
        if matches.len() > 1 {
            tracing::warn!(dish_id, files = matches.len(), "several files for one dish; using the last");
        }
        match matches.pop() {
            Some(path) => self.load_file(&path).map(Some),
            None => Ok(None),
        }
    }

    pub fn load_file(&self, path: &Path) -> Result<FishDish, StorageError> {
        let document = files::read_json(path)?.ok_or_else(|| StorageError::Corrupted {
            path: path.to_path_buf(),
            reason: "file disappeared while reading".to_string(),
        })?;
        self.schemas
            .validate(DocumentKind::FishDish, &document)
            .map_err(|source| StorageError::Invalid {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_value(document).map_err(|e| StorageError::Corrupted {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write `dish` to its file. Files for the same dish under another date
    /// of fertilization are removed.
    pub fn save(&self, dish: &FishDish) -> Result<PathBuf, StorageError> {
        let path = self.dir.join(dish.file_name());
        dish.validate().map_err(|source| StorageError::Invalid {
            path: path.clone(),
            source,
        })?;
        let document = serde_json::to_value(dish)?;
        self.schemas
            .validate(DocumentKind::FishDish, &document)
            .map_err(|source| StorageError::Invalid {
                path: path.clone(),
                source,
            })?;

        let stale: Vec<PathBuf> = self
            .files_for(&dish.dish_id)?
            .into_iter()
            .filter(|p| *p != path)
            .collect();
        files::write_json(&path, &document, self.backups)?;
        for old in stale {
            tracing::info!(dish_id = %dish.dish_id, old = %old.display(), "removing dish file for previous dof");
            files::remove_file(&old, self.backups)?;
        }
        Ok(path)
    }

    /// Load every dish file. Files that fail to parse or validate are
    /// logged and returned in [`DishScan::skipped`].
    pub fn load_all(&self) -> Result<DishScan, StorageError> {
        let mut scan = DishScan::default();
        for path in files::list_json_files(&self.dir)? {
            match self.load_file(&path) {
                Ok(dish) => scan.dishes.push(dish),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping dish file");
                    scan.skipped.push(SkippedFile {
                        reason: e.to_string(),
                        path,
                    });
                }
            }
        }
        Ok(scan)
    }

    /// Raw documents of every dish file that is a JSON object with a
    /// `dish_id`, for reports that tolerate partially filled records.
    pub fn load_raw_all(&self) -> Result<Vec<Value>, StorageError> {
        raw_dish_documents(&self.dir)
    }

    pub fn files(&self) -> Result<Vec<PathBuf>, StorageError> {
        files::list_json_files(&self.dir)
    }
}

/// See [`DishStore::load_raw_all`]; usable on any directory.
pub fn raw_dish_documents(dir: &Path) -> Result<Vec<Value>, StorageError> {
    let paths = files::list_json_files(dir)?;
    tracing::info!(dir = %dir.display(), files = paths.len(), "collecting dish documents");
    let mut documents = Vec::new();
    for path in paths {
        match files::read_json(&path) {
            Ok(Some(doc)) if doc.get("dish_id").is_some() => documents.push(doc),
            Ok(_) => tracing::warn!(path = %path.display(), "skipping invalid dish file"),
            Err(e) => tracing::error!(path = %path.display(), error = %e, "error loading dish file"),
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use labinv_model::{LabDate, NewDish};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn setup() -> (TempDir, DishStore) {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let schemas = Arc::new(SchemaValidator::new().unwrap_or_else(|e| panic!("{e}")));
        let store = DishStore::new(dir.path(), schemas, false);
        (dir, store)
    }

    fn day(d: u32) -> LabDate {
        LabDate::from_ymd(2025, 4, d).unwrap_or_else(|| panic!("bad test date"))
    }

    fn dish(cross: &str, n: u32) -> FishDish {
        FishDish::create(NewDish::new(cross, n, "wt", "Ana"), day(1)).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn lookup_matches_dish_id_exactly() {
        let (_dir, store) = setup();
        store.save(&dish("C1", 10)).unwrap_or_else(|e| panic!("{e}"));

        assert!(!store.exists("C1_1").unwrap_or_else(|e| panic!("{e}")));
        assert_eq!(store.load("C1_1").unwrap_or_else(|e| panic!("{e}")), None);
        let found = store.load("C1_10").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(found.map(|d| d.dish_id), Some("C1_10".to_string()));
    }

    #[test]
    fn changing_dof_moves_the_file() {
        let (dir, store) = setup();
        let mut d = dish("C2", 1);
        let first = store.save(&d).unwrap_or_else(|e| panic!("{e}"));
        assert!(first.ends_with("C2_1_20250401.json"));

        d.dof = day(3);
        let second = store.save(&d).unwrap_or_else(|e| panic!("{e}"));
        assert!(second.ends_with("C2_1_20250403.json"));
        assert!(!first.exists());
        assert_eq!(files::list_json_files(dir.path()).unwrap_or_else(|e| panic!("{e}")).len(), 1);
    }

    #[test]
    fn load_all_collects_bad_files_as_skipped() {
        let (dir, store) = setup();
        store.save(&dish("C3", 1)).unwrap_or_else(|e| panic!("{e}"));
        std::fs::write(dir.path().join("broken_20250101.json"), "{")
            .unwrap_or_else(|e| panic!("{e}"));
        std::fs::write(dir.path().join("hot_1_20250101.json"), r#"{"dish_id": "hot_1"}"#)
            .unwrap_or_else(|e| panic!("{e}"));

        let scan = store.load_all().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(scan.dishes.len(), 1);
        assert_eq!(scan.skipped.len(), 2);

        // the raw loader still sees the partial document
        let raw = store.load_raw_all().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(raw.len(), 2);
    }

    #[test]
    fn save_rejects_invalid_dish() {
        let (_dir, store) = setup();
        let mut d = dish("C4", 1);
        d.enclosure.temperature = 12.0;
        assert!(matches!(store.save(&d), Err(StorageError::Invalid { .. })));
    }
}
