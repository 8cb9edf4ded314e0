//! Material categories: one JSON document per category, shaped
//! `{ "<key>": { "<id>": { ...record... } } }`.
//!
//! Every mutation loads the whole document, changes one entry and rewrites
//! the file. Other top-level keys in the document are carried through
//! untouched.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use labinv_model::{
    AgaroseBottle, AgaroseSolution, DocumentKind, FishWaterBatch, FishWaterDerivative, ModelError,
    PolyLSerineAliquot, PolyLSerineBottle, SchemaValidator, ids,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::StorageError;
use crate::files;

/// A record type stored in a category document.
pub trait Record: Serialize + DeserializeOwned {
    const KIND: DocumentKind;

    fn validate(&self) -> Result<(), ModelError>;
}

macro_rules! impl_record {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl Record for $ty {
                const KIND: DocumentKind = DocumentKind::$kind;

                fn validate(&self) -> Result<(), ModelError> {
                    <$ty>::validate(self)
                }
            }
        )*
    };
}

impl_record! {
    AgaroseBottle => AgaroseBottles,
    AgaroseSolution => AgaroseSolutions,
    FishWaterBatch => FishWaterBatches,
    FishWaterDerivative => FishWaterDerivatives,
    PolyLSerineBottle => PolyLSerineBottles,
    PolyLSerineAliquot => PolyLSerineAliquots,
}

pub struct CategoryStore<T> {
    path: PathBuf,
    key: &'static str,
    schemas: Arc<SchemaValidator>,
    backups: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> CategoryStore<T> {
    pub fn new(dir: &Path, schemas: Arc<SchemaValidator>, backups: bool) -> Result<Self, StorageError> {
        let (Some(file_name), Some(key)) = (T::KIND.file_name(), T::KIND.key()) else {
            return Err(StorageError::NotACategory(T::KIND));
        };
        Ok(Self {
            path: dir.join(file_name),
            key,
            schemas,
            backups,
            _record: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw document, checked against the category schema. A missing
    /// file reads as an empty document.
    pub fn load_document(&self) -> Result<Map<String, Value>, StorageError> {
        let Some(document) = files::read_json(&self.path)? else {
            return Ok(Map::new());
        };
        self.schemas
            .validate(T::KIND, &document)
            .map_err(|source| StorageError::Invalid {
                path: self.path.clone(),
                source,
            })?;
        match document {
            Value::Object(map) => Ok(map),
            _ => Err(self.corrupted("document is not a JSON object".to_string())),
        }
    }

    pub fn load_all(&self) -> Result<BTreeMap<String, T>, StorageError> {
        let document = self.load_document()?;
        let Some(records) = document.get(self.key) else {
            return Ok(BTreeMap::new());
        };
        let Some(records) = records.as_object() else {
            return Err(self.corrupted(format!("`{}` is not an object", self.key)));
        };
        records
            .iter()
            .map(|(id, raw)| {
                T::deserialize(raw)
                    .map(|record| (id.clone(), record))
                    .map_err(|e| self.corrupted(format!("record {id:?}: {e}")))
            })
            .collect()
    }

    /// Replace the category's records and rewrite the file.
    pub fn save_all(&self, records: &BTreeMap<String, T>) -> Result<(), StorageError> {
        let mut document = self.load_document()?;
        let mut entries = Map::new();
        for (id, record) in records {
            entries.insert(id.clone(), serde_json::to_value(record)?);
        }
        document.insert(self.key.to_string(), Value::Object(entries));

        let document = Value::Object(document);
        self.schemas
            .validate(T::KIND, &document)
            .map_err(|source| StorageError::Invalid {
                path: self.path.clone(),
                source,
            })?;
        files::write_json(&self.path, &document, self.backups)?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "saved {}", T::KIND);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<T>, StorageError> {
        Ok(self.load_all()?.remove(id))
    }

    pub fn contains(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.load_all()?.contains_key(id))
    }

    pub fn ids(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.load_all()?.into_keys().collect())
    }

    /// Add `record` under `id` unless the id is taken. Returns whether it
    /// was inserted.
    pub fn insert_new(&self, id: &str, record: T) -> Result<bool, StorageError> {
        self.check_record(id, &record)?;
        let mut records = self.load_all()?;
        if records.contains_key(id) {
            return Ok(false);
        }
        records.insert(id.to_string(), record);
        self.save_all(&records)?;
        Ok(true)
    }

    pub fn upsert(&self, id: &str, record: T) -> Result<(), StorageError> {
        self.check_record(id, &record)?;
        let mut records = self.load_all()?;
        records.insert(id.to_string(), record);
        self.save_all(&records)
    }

    pub fn remove(&self, id: &str) -> Result<Option<T>, StorageError> {
        let mut records = self.load_all()?;
        let removed = records.remove(id);
        if removed.is_some() {
            self.save_all(&records)?;
        }
        Ok(removed)
    }

    fn check_record(&self, id: &str, record: &T) -> Result<(), StorageError> {
        ids::validate_id(id)
            .and_then(|()| record.validate())
            .map_err(|source| StorageError::Invalid {
                path: self.path.clone(),
                source,
            })
    }

    fn corrupted(&self, reason: String) -> StorageError {
        StorageError::Corrupted {
            path: self.path.clone(),
            reason,
        }
    }
}
