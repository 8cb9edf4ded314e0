//! Declarative validation of on-disk documents.
//!
//! Each document kind has a draft-7 JSON schema embedded at compile time
//! with `include_str!`, so validation never depends on files next to the
//! binary.

use std::collections::HashMap;
use std::fmt;

use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentKind {
    AgaroseBottles,
    AgaroseSolutions,
    FishWaterBatches,
    FishWaterDerivatives,
    PolyLSerineBottles,
    PolyLSerineAliquots,
    FishDish,
}

impl DocumentKind {
    /// The material category documents, in the order they are audited.
    pub const CATEGORIES: [DocumentKind; 6] = [
        Self::AgaroseBottles,
        Self::AgaroseSolutions,
        Self::FishWaterBatches,
        Self::FishWaterDerivatives,
        Self::PolyLSerineBottles,
        Self::PolyLSerineAliquots,
    ];

    pub const ALL: [DocumentKind; 7] = [
        Self::AgaroseBottles,
        Self::AgaroseSolutions,
        Self::FishWaterBatches,
        Self::FishWaterDerivatives,
        Self::PolyLSerineBottles,
        Self::PolyLSerineAliquots,
        Self::FishDish,
    ];

    /// File in the material data directory holding this category. Fish
    /// dishes are stored one file per dish and have none.
    pub fn file_name(self) -> Option<&'static str> {
        match self {
            Self::AgaroseBottles => Some("agarose_bottles.json"),
            Self::AgaroseSolutions => Some("agarose_solutions.json"),
            Self::FishWaterBatches => Some("fish_water_sources.json"),
            Self::FishWaterDerivatives => Some("fish_water_derivatives.json"),
            Self::PolyLSerineBottles => Some("poly-l-serine_bottles.json"),
            Self::PolyLSerineAliquots => Some("poly-l-serine_derivatives.json"),
            Self::FishDish => None,
        }
    }

    /// Top-level key wrapping the records of a category document.
    pub fn key(self) -> Option<&'static str> {
        match self {
            Self::AgaroseBottles => Some("agarose_bottles"),
            Self::AgaroseSolutions => Some("agarose_solutions"),
            Self::FishWaterBatches => Some("fish_water_batches"),
            Self::FishWaterDerivatives => Some("fish_water_derivatives"),
            Self::PolyLSerineBottles => Some("poly_l_serine_bottles"),
            Self::PolyLSerineAliquots => Some("poly_l_serine_derivatives"),
            Self::FishDish => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AgaroseBottles => "agarose bottles",
            Self::AgaroseSolutions => "agarose solutions",
            Self::FishWaterBatches => "fish water batches",
            Self::FishWaterDerivatives => "fish water derivatives",
            Self::PolyLSerineBottles => "poly-l-serine bottles",
            Self::PolyLSerineAliquots => "poly-l-serine aliquots",
            Self::FishDish => "fish dish",
        }
    }

    fn schema_source(self) -> &'static str {
        match self {
            Self::AgaroseBottles => include_str!("schemas/agarose_bottles.schema.json"),
            Self::AgaroseSolutions => include_str!("schemas/agarose_solutions.schema.json"),
            Self::FishWaterBatches => include_str!("schemas/fish_water_batches.schema.json"),
            Self::FishWaterDerivatives => {
                include_str!("schemas/fish_water_derivatives.schema.json")
            }
            Self::PolyLSerineBottles => include_str!("schemas/poly_l_serine_bottles.schema.json"),
            Self::PolyLSerineAliquots => {
                include_str!("schemas/poly_l_serine_aliquots.schema.json")
            }
            Self::FishDish => include_str!("schemas/fish_dish.schema.json"),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Compiled schemas for every [`DocumentKind`].
pub struct SchemaValidator {
    schemas: HashMap<DocumentKind, JSONSchema>,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("kinds", &self.schemas.len())
            .finish()
    }
}

impl SchemaValidator {
    pub fn new() -> Result<Self, ModelError> {
        let mut schemas = HashMap::with_capacity(DocumentKind::ALL.len());
        for kind in DocumentKind::ALL {
            let compile_error = |reason: String| ModelError::SchemaCompile {
                kind: kind.label().to_string(),
                reason,
            };
            let value: Value = serde_json::from_str(kind.schema_source())
                .map_err(|e| compile_error(e.to_string()))?;
            let compiled = JSONSchema::options()
                .with_draft(Draft::Draft7)
                .compile(&value)
                .map_err(|e| compile_error(e.to_string()))?;
            schemas.insert(kind, compiled);
        }
        Ok(Self { schemas })
    }

    /// Every violation of `kind`'s schema in `document`, each suffixed with
    /// the JSON pointer of the offending value.
    pub fn violations(&self, kind: DocumentKind, document: &Value) -> Vec<String> {
        let Some(schema) = self.schemas.get(&kind) else {
            return vec![format!("no schema registered for {kind}")];
        };
        match schema.validate(document) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    let path = if path.is_empty() { "root".to_string() } else { path };
                    format!("{e} at '{path}'")
                })
                .collect(),
        }
    }

    pub fn validate(&self, kind: DocumentKind, document: &Value) -> Result<(), ModelError> {
        let violations = self.violations(kind, document);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ModelError::Schema {
                kind: kind.label().to_string(),
                violations,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn validator() -> SchemaValidator {
        SchemaValidator::new().unwrap_or_else(|e| panic!("schemas must compile: {e}"))
    }

    #[test]
    fn every_category_has_file_and_key() {
        for kind in DocumentKind::CATEGORIES {
            assert!(kind.file_name().is_some(), "{kind} has no file");
            assert!(kind.key().is_some(), "{kind} has no key");
        }
        assert_eq!(DocumentKind::FishDish.file_name(), None);
        assert_eq!(
            DocumentKind::FishWaterBatches.file_name(),
            Some("fish_water_sources.json")
        );
    }

    #[test]
    fn empty_category_documents_are_valid() {
        let validator = validator();
        for kind in DocumentKind::CATEGORIES {
            assert!(validator.validate(kind, &json!({})).is_ok(), "{kind}");
        }
    }

    #[test]
    fn reports_pointer_to_bad_concentration() {
        let doc = json!({
            "agarose_solutions": {
                "AGSOL_20250127": {
                    "concentration": 1.5,
                    "date_prepared": "20250127",
                    "prepared_by": "Lab Staff",
                    "agarose_bottle_id": "AG-1",
                    "fish_water_batch_id": "FW-1",
                    "volume_prepared_mL": 50.0,
                    "storage": {"location": "2E.260-6-3"},
                    "quality_checks": {"visual_inspection": "Clear, no particles"}
                }
            }
        });
        let violations = validator().violations(DocumentKind::AgaroseSolutions, &doc);
        assert_eq!(violations.len(), 1);
        assert!(
            violations[0].ends_with("at '/agarose_solutions/AGSOL_20250127/concentration'"),
            "{violations:?}"
        );
    }

    #[test]
    fn dish_schema_accepts_legacy_checks_and_rejects_bad_temperature() {
        let mut dish = json!({
            "dish_id": "C_1",
            "date_created": "20250127",
            "cross_id": "C",
            "dof": "20250126",
            "genotype": "wt",
            "responsible": "Ana",
            "fish_count": 3,
            "enclosure": {
                "temperature": 28.5,
                "light_cycle": {"light_duration": "14:10", "dawn_dusk": "8:00"},
                "room": "2E.282"
            },
            "quality_checks": {
                "20250127": "Created and checked - normal",
                "2025012800:00:00": {"check_time": "2025012800:00:00", "num_dead": 0}
            },
            "status": "active"
        });
        let validator = validator();
        assert!(validator.validate(DocumentKind::FishDish, &dish).is_ok());

        dish["enclosure"]["temperature"] = json!(35);
        let err = validator
            .validate(DocumentKind::FishDish, &dish)
            .err()
            .unwrap_or_else(|| panic!("hot dish accepted"));
        assert!(err.to_string().contains("/enclosure/temperature"), "{err}");
    }

    #[test]
    fn batch_dates_accept_both_formats() {
        let validator = validator();
        for date in ["20250120", "2025-01-20"] {
            let doc = json!({
                "fish_water_batches": {"FW1": {"source": "Janelia System", "preparation_date": date}}
            });
            assert!(validator.validate(DocumentKind::FishWaterBatches, &doc).is_ok(), "{date}");
        }
        let doc = json!({
            "fish_water_batches": {"FW1": {"source": "Janelia System", "preparation_date": "Jan 20"}}
        });
        assert!(validator.validate(DocumentKind::FishWaterBatches, &doc).is_err());
    }
}
