//! Laboratory materials: stock bottles and the solutions, filtered water and
//! aliquots prepared from them.
//!
//! Field names match the JSON documents written to the material data
//! directory, including the historical `volume_prepared_mL` spelling.

use serde::{Deserialize, Serialize};

use crate::date::{self, LabDate};
use crate::error::ModelError;

pub const JANELIA_SYSTEM: &str = "Janelia System";

// ─────────────────────────────────────────────────────────────────────────────
// Shared sub-records
// ─────────────────────────────────────────────────────────────────────────────

/// Where a prepared material is kept and when it stops being usable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageLocation {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// Used by agarose solutions.
    #[serde(
        default,
        deserialize_with = "date::optional::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration: Option<LabDate>,
    /// Used by poly-l-serine aliquots (inherited from the bottle).
    #[serde(
        default,
        deserialize_with = "date::optional::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_date: Option<LabDate>,
}

impl StorageLocation {
    fn at(location: &str) -> Self {
        Self {
            location: location.to_string(),
            container: None,
            expiration: None,
            expiration_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualInspection {
    pub visual_inspection: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivativeKind {
    Filtered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    Vacuum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliquotKind {
    Aliquot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Processing {
    pub filter_type: FilterType,
    /// Pore size rendered as `"{n}um"`.
    pub filter_size: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Preparation defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Values filled in when a preparation request leaves them out. Also the
/// `[preparation]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreparationDefaults {
    pub prepared_by: String,
    pub agarose_location: String,
    pub agarose_container: String,
    pub agarose_expiration_days: u32,
    pub filtered_water_location: String,
    pub pls_location: String,
    pub pls_container: String,
}

impl Default for PreparationDefaults {
    fn default() -> Self {
        Self {
            prepared_by: "Lab Staff".to_string(),
            agarose_location: "2E.260-6-3".to_string(),
            agarose_container: "incubator".to_string(),
            agarose_expiration_days: 60,
            filtered_water_location: "2E.260-7-B".to_string(),
            pls_location: "2E.254".to_string(),
            pls_container: "50mL tube".to_string(),
        }
    }
}

impl PreparationDefaults {
    fn preparer(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.prepared_by.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agarose
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgaroseBottle {
    pub source_number: String,
    pub manufacturer: String,
    pub date_received: LabDate,
    pub expiration_date: LabDate,
    pub storage_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AgaroseBottle {
    pub fn validate(&self) -> Result<(), ModelError> {
        require_text("source_number", &self.source_number)?;
        require_text("manufacturer", &self.manufacturer)?;
        require_text("storage_location", &self.storage_location)?;
        if self.expiration_date < self.date_received {
            return Err(ModelError::Inconsistent(format!(
                "agarose bottle expires ({}) before it was received ({})",
                self.expiration_date, self.date_received
            )));
        }
        Ok(())
    }
}

/// Inputs for preparing an agarose solution.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionRequest {
    pub concentration: f64,
    pub agarose_bottle_id: String,
    pub fish_water_batch_id: String,
    pub volume_ml: f64,
    pub prepared_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgaroseSolution {
    /// Fraction between 0 and 1.
    pub concentration: f64,
    pub date_prepared: LabDate,
    pub prepared_by: String,
    pub agarose_bottle_id: String,
    pub fish_water_batch_id: String,
    #[serde(rename = "volume_prepared_mL")]
    pub volume_prepared_ml: f64,
    pub storage: StorageLocation,
    pub quality_checks: VisualInspection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl AgaroseSolution {
    pub fn prepare(
        request: &SolutionRequest,
        defaults: &PreparationDefaults,
        today: LabDate,
    ) -> Result<Self, ModelError> {
        if !(request.concentration > 0.0 && request.concentration <= 1.0) {
            return Err(ModelError::OutOfRange {
                field: "concentration",
                reason: format!("{} is not in (0, 1]", request.concentration),
            });
        }
        let solution = Self {
            concentration: request.concentration,
            date_prepared: today,
            prepared_by: defaults.preparer(request.prepared_by.as_deref()),
            agarose_bottle_id: request.agarose_bottle_id.trim().to_string(),
            fish_water_batch_id: request.fish_water_batch_id.trim().to_string(),
            volume_prepared_ml: request.volume_ml,
            storage: StorageLocation {
                container: Some(defaults.agarose_container.clone()),
                expiration: Some(today.plus_days(defaults.agarose_expiration_days)),
                ..StorageLocation::at(&defaults.agarose_location)
            },
            quality_checks: VisualInspection {
                visual_inspection: "Clear, no particles".to_string(),
            },
            notes: clean_notes(request.notes.as_deref()),
        };
        solution.validate()?;
        Ok(solution)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if !(0.0..=1.0).contains(&self.concentration) {
            return Err(ModelError::OutOfRange {
                field: "concentration",
                reason: format!("{} is not in [0, 1]", self.concentration),
            });
        }
        require_text("agarose_bottle_id", &self.agarose_bottle_id)?;
        require_text("fish_water_batch_id", &self.fish_water_batch_id)?;
        require_text("prepared_by", &self.prepared_by)?;
        require_positive("volume_prepared_mL", self.volume_prepared_ml)?;
        require_text("storage.location", &self.storage.location)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fish water
// ─────────────────────────────────────────────────────────────────────────────

/// A batch drawn from the facility water system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FishWaterBatch {
    pub source: String,
    pub preparation_date: LabDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FishWaterBatch {
    pub fn new(preparation_date: LabDate, notes: Option<&str>) -> Self {
        Self {
            source: JANELIA_SYSTEM.to_string(),
            preparation_date,
            notes: clean_notes(notes),
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require_text("source", &self.source)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterRequest {
    pub source_batch_id: String,
    pub volume_ml: f64,
    pub filter_size_um: u32,
    pub prepared_by: Option<String>,
    pub notes: Option<String>,
}

/// Water filtered out of a [`FishWaterBatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FishWaterDerivative {
    pub source_batch_id: String,
    #[serde(rename = "type")]
    pub kind: DerivativeKind,
    pub date_prepared: LabDate,
    pub prepared_by: String,
    #[serde(rename = "volume_prepared_mL")]
    pub volume_prepared_ml: f64,
    pub storage: StorageLocation,
    pub processing: Processing,
    pub quality_checks: VisualInspection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FishWaterDerivative {
    pub fn filter(
        request: &FilterRequest,
        defaults: &PreparationDefaults,
        today: LabDate,
    ) -> Result<Self, ModelError> {
        if request.filter_size_um == 0 {
            return Err(ModelError::OutOfRange {
                field: "filter_size",
                reason: "must be at least 1um".to_string(),
            });
        }
        let derivative = Self {
            source_batch_id: request.source_batch_id.trim().to_string(),
            kind: DerivativeKind::Filtered,
            date_prepared: today,
            prepared_by: defaults.preparer(request.prepared_by.as_deref()),
            volume_prepared_ml: request.volume_ml,
            storage: StorageLocation::at(&defaults.filtered_water_location),
            processing: Processing {
                filter_type: FilterType::Vacuum,
                filter_size: format!("{}um", request.filter_size_um),
            },
            quality_checks: VisualInspection {
                visual_inspection: "clear, no particles".to_string(),
            },
            notes: clean_notes(request.notes.as_deref()),
        };
        derivative.validate()?;
        Ok(derivative)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require_text("source_batch_id", &self.source_batch_id)?;
        require_text("prepared_by", &self.prepared_by)?;
        require_positive("volume_prepared_mL", self.volume_prepared_ml)?;
        let size = self
            .processing
            .filter_size
            .strip_suffix("um")
            .and_then(|n| n.parse::<f64>().ok());
        match size {
            Some(n) if n > 0.0 => Ok(()),
            _ => Err(ModelError::InvalidValue {
                field: "processing.filter_size",
                value: self.processing.filter_size.clone(),
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Poly-L-serine
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyLSerineBottle {
    pub manufacturer: String,
    #[serde(
        default,
        deserialize_with = "date::optional::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_received: Option<LabDate>,
    pub expiration_date: LabDate,
    pub storage_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PolyLSerineBottle {
    pub fn validate(&self) -> Result<(), ModelError> {
        require_text("manufacturer", &self.manufacturer)?;
        require_text("storage_location", &self.storage_location)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AliquotRequest {
    pub source_bottle_id: String,
    pub volume: f64,
    pub prepared_by: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyLSerineAliquot {
    pub source_bottle_id: String,
    #[serde(rename = "type")]
    pub kind: AliquotKind,
    pub date_prepared: LabDate,
    pub prepared_by: String,
    pub volume_prepared: f64,
    pub storage: StorageLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl PolyLSerineAliquot {
    /// Split an aliquot off `bottle`. The aliquot expires with its bottle.
    pub fn from_bottle(
        bottle: &PolyLSerineBottle,
        request: &AliquotRequest,
        defaults: &PreparationDefaults,
        today: LabDate,
    ) -> Result<Self, ModelError> {
        let aliquot = Self {
            source_bottle_id: request.source_bottle_id.trim().to_string(),
            kind: AliquotKind::Aliquot,
            date_prepared: today,
            prepared_by: defaults.preparer(request.prepared_by.as_deref()),
            volume_prepared: request.volume,
            storage: StorageLocation {
                container: Some(defaults.pls_container.clone()),
                expiration_date: Some(bottle.expiration_date),
                ..StorageLocation::at(&defaults.pls_location)
            },
            notes: clean_notes(request.notes.as_deref()),
        };
        aliquot.validate()?;
        Ok(aliquot)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        require_text("source_bottle_id", &self.source_bottle_id)?;
        require_text("prepared_by", &self.prepared_by)?;
        require_positive("volume_prepared", self.volume_prepared)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ModelError> {
    if value.trim().is_empty() {
        Err(ModelError::MissingField(field))
    } else {
        Ok(())
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ModelError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::OutOfRange {
            field,
            reason: format!("{value} must be greater than 0"),
        })
    }
}

pub(crate) fn clean_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn today() -> LabDate {
        LabDate::from_ymd(2025, 1, 27).unwrap_or_else(|| panic!("bad test date"))
    }

    fn solution_request(concentration: f64, volume_ml: f64) -> SolutionRequest {
        SolutionRequest {
            concentration,
            agarose_bottle_id: "AG-001".to_string(),
            fish_water_batch_id: "FW_20250120".to_string(),
            volume_ml,
            prepared_by: None,
            notes: Some("  ".to_string()),
        }
    }

    #[test]
    fn agarose_solution_gets_storage_defaults() {
        let defaults = PreparationDefaults::default();
        let solution = AgaroseSolution::prepare(&solution_request(0.015, 50.0), &defaults, today())
            .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(solution.prepared_by, "Lab Staff");
        assert_eq!(solution.storage.location, "2E.260-6-3");
        assert_eq!(solution.storage.container.as_deref(), Some("incubator"));
        assert_eq!(solution.storage.expiration, Some(today().plus_days(60)));
        assert_eq!(solution.quality_checks.visual_inspection, "Clear, no particles");
        assert_eq!(solution.notes, None);
    }

    #[test]
    fn agarose_solution_serializes_with_historical_field_names() {
        let solution = AgaroseSolution::prepare(
            &solution_request(0.02, 25.0),
            &PreparationDefaults::default(),
            today(),
        )
        .unwrap_or_else(|e| panic!("{e}"));
        let value = serde_json::to_value(&solution).unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(value["volume_prepared_mL"], json!(25.0));
        assert_eq!(value["date_prepared"], json!("20250127"));
        assert_eq!(value["storage"]["expiration"], json!("20250328"));
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn agarose_solution_rejects_bad_inputs() {
        let defaults = PreparationDefaults::default();
        for concentration in [0.0, -0.1, 1.5] {
            let err = AgaroseSolution::prepare(&solution_request(concentration, 10.0), &defaults, today());
            assert!(
                matches!(err, Err(ModelError::OutOfRange { field: "concentration", .. })),
                "concentration {concentration} accepted"
            );
        }
        assert!(AgaroseSolution::prepare(&solution_request(0.5, 0.0), &defaults, today()).is_err());

        let mut missing_batch = solution_request(0.5, 10.0);
        missing_batch.fish_water_batch_id = " ".to_string();
        assert_eq!(
            AgaroseSolution::prepare(&missing_batch, &defaults, today()),
            Err(ModelError::MissingField("fish_water_batch_id"))
        );
    }

    #[test]
    fn stored_solution_may_have_zero_concentration() {
        let mut solution = AgaroseSolution::prepare(
            &solution_request(0.5, 10.0),
            &PreparationDefaults::default(),
            today(),
        )
        .unwrap_or_else(|e| panic!("{e}"));
        solution.concentration = 0.0;
        assert!(solution.validate().is_ok());
    }

    #[test]
    fn filtered_water_renders_filter_size() {
        let request = FilterRequest {
            source_batch_id: "FW_20250120".to_string(),
            volume_ml: 500.0,
            filter_size_um: 2,
            prepared_by: Some("Ana".to_string()),
            notes: None,
        };
        let derivative = FishWaterDerivative::filter(&request, &PreparationDefaults::default(), today())
            .unwrap_or_else(|e| panic!("{e}"));
        let value = serde_json::to_value(&derivative).unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(value["type"], json!("filtered"));
        assert_eq!(value["processing"], json!({"filter_type": "vacuum", "filter_size": "2um"}));
        assert_eq!(value["storage"], json!({"location": "2E.260-7-B"}));
        assert_eq!(value["quality_checks"]["visual_inspection"], json!("clear, no particles"));
        assert_eq!(value["prepared_by"], json!("Ana"));
    }

    #[test]
    fn filtered_water_rejects_zero_filter() {
        let request = FilterRequest {
            source_batch_id: "FW_20250120".to_string(),
            volume_ml: 500.0,
            filter_size_um: 0,
            prepared_by: None,
            notes: None,
        };
        assert!(FishWaterDerivative::filter(&request, &PreparationDefaults::default(), today()).is_err());
    }

    #[test]
    fn aliquot_inherits_bottle_expiration() {
        let expires = LabDate::from_ymd(2026, 6, 1).unwrap_or_else(|| panic!("bad test date"));
        let bottle = PolyLSerineBottle {
            manufacturer: "Sigma".to_string(),
            date_received: None,
            expiration_date: expires,
            storage_location: "fridge".to_string(),
            notes: None,
        };
        let request = AliquotRequest {
            source_bottle_id: "PLS-1".to_string(),
            volume: 5.0,
            prepared_by: None,
            notes: None,
        };
        let aliquot = PolyLSerineAliquot::from_bottle(&bottle, &request, &PreparationDefaults::default(), today())
            .unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(aliquot.storage.location, "2E.254");
        assert_eq!(aliquot.storage.container.as_deref(), Some("50mL tube"));
        assert_eq!(aliquot.storage.expiration_date, Some(expires));
        assert_eq!(aliquot.kind, AliquotKind::Aliquot);
    }

    #[test]
    fn fish_water_batch_reads_legacy_dashed_dates() {
        let batch: FishWaterBatch = serde_json::from_value(json!({
            "source": "Janelia System",
            "preparation_date": "2025-01-20",
            "notes": null
        }))
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(batch.preparation_date.to_string(), "20250120");
        assert_eq!(batch.notes, None);
    }

    #[test]
    fn bottle_expiring_before_receipt_is_inconsistent() {
        let bottle = AgaroseBottle {
            source_number: "S1".to_string(),
            manufacturer: "Thermo".to_string(),
            date_received: today(),
            expiration_date: LabDate::from_ymd(2024, 1, 1).unwrap_or_else(|| panic!("bad test date")),
            storage_location: "shelf".to_string(),
            notes: None,
        };
        assert!(matches!(bottle.validate(), Err(ModelError::Inconsistent(_))));
    }
}
