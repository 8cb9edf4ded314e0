//! The data-access facade used by every front end.
//!
//! [`Lab`] owns one [`CategoryStore`] per material category plus the
//! [`DishStore`], and enforces the cross-record rules: duplicate ids,
//! references from derived materials to their sources, and the dish
//! lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use labinv_model::{
    AgaroseBottle, AgaroseSolution, AliquotRequest, DishQuery, DishStatus, DocumentKind,
    FilterRequest, FishDish, FishWaterBatch, FishWaterDerivative, LabDate, NewDish,
    PolyLSerineAliquot, PolyLSerineBottle, PreparationDefaults, QualityCheck, SchemaValidator,
    SolutionRequest, ids,
};
use serde::Serialize;
use serde_json::Value;

use crate::category::{CategoryStore, Record};
use crate::config::AppConfig;
use crate::dishes::{DishScan, DishStore};
use crate::error::{LabError, Result};
use crate::files;

/// Source of "today" for preparation dates, ids and expirations.
pub type Clock = Arc<dyn Fn() -> LabDate + Send + Sync>;

const AGAROSE_BOTTLE: &str = "agarose bottle";
const AGAROSE_SOLUTION: &str = "agarose solution";
const FISH_WATER_BATCH: &str = "fish water batch";
const PLS_BOTTLE: &str = "poly-l-serine bottle";
const DISH: &str = "dish";

pub struct Lab {
    material_dir: PathBuf,
    preparation: PreparationDefaults,
    schemas: Arc<SchemaValidator>,
    agarose_bottles: CategoryStore<AgaroseBottle>,
    agarose_solutions: CategoryStore<AgaroseSolution>,
    water_batches: CategoryStore<FishWaterBatch>,
    water_derivatives: CategoryStore<FishWaterDerivative>,
    pls_bottles: CategoryStore<PolyLSerineBottle>,
    pls_aliquots: CategoryStore<PolyLSerineAliquot>,
    dishes: DishStore,
    clock: Clock,
}

impl Lab {
    /// Open the inventory described by `config`, creating the data
    /// directories when they do not exist yet.
    pub fn open(config: &AppConfig) -> Result<Self> {
        let storage = &config.storage;
        files::ensure_dir(&storage.material_data_dir)?;
        files::ensure_dir(&storage.dish_data_dir)?;

        let schemas = Arc::new(SchemaValidator::new()?);
        let dir = storage.material_data_dir.as_path();
        let backups = storage.backups;
        tracing::debug!(
            materials = %dir.display(),
            dishes = %storage.dish_data_dir.display(),
            backups,
            "opening lab inventory"
        );

        Ok(Self {
            material_dir: dir.to_path_buf(),
            preparation: config.preparation.clone(),
            agarose_bottles: CategoryStore::new(dir, Arc::clone(&schemas), backups)?,
            agarose_solutions: CategoryStore::new(dir, Arc::clone(&schemas), backups)?,
            water_batches: CategoryStore::new(dir, Arc::clone(&schemas), backups)?,
            water_derivatives: CategoryStore::new(dir, Arc::clone(&schemas), backups)?,
            pls_bottles: CategoryStore::new(dir, Arc::clone(&schemas), backups)?,
            pls_aliquots: CategoryStore::new(dir, Arc::clone(&schemas), backups)?,
            dishes: DishStore::new(&storage.dish_data_dir, Arc::clone(&schemas), backups),
            schemas,
            clock: Arc::new(LabDate::today),
        })
    }

    /// Replace the clock, mainly so tests get stable dates and ids.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn today(&self) -> LabDate {
        (self.clock)()
    }

    pub fn preparation(&self) -> &PreparationDefaults {
        &self.preparation
    }

    pub fn material_dir(&self) -> &Path {
        &self.material_dir
    }

    pub fn dish_dir(&self) -> &Path {
        self.dishes.dir()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Agarose
    // ─────────────────────────────────────────────────────────────────────

    pub fn add_agarose_bottle(&self, id: &str, bottle: AgaroseBottle) -> Result<()> {
        let id = id.trim();
        if !self.agarose_bottles.insert_new(id, bottle)? {
            return Err(duplicate(AGAROSE_BOTTLE, id));
        }
        tracing::info!(id, "added agarose bottle");
        Ok(())
    }

    pub fn agarose_bottles(&self) -> Result<Vec<(String, AgaroseBottle)>> {
        Ok(self.agarose_bottles.load_all()?.into_iter().collect())
    }

    pub fn agarose_solutions(&self) -> Result<Vec<(String, AgaroseSolution)>> {
        Ok(self.agarose_solutions.load_all()?.into_iter().collect())
    }

    pub fn agarose_solution(&self, id: &str) -> Result<AgaroseSolution> {
        self.agarose_solutions
            .get(id)?
            .ok_or_else(|| not_found(AGAROSE_SOLUTION, id))
    }

    /// Prepare a solution from a bottle of agarose and fish water. The water
    /// may be a source batch or a filtered derivative.
    pub fn prepare_agarose_solution(
        &self,
        request: &SolutionRequest,
    ) -> Result<(String, AgaroseSolution)> {
        let water_id = request.fish_water_batch_id.trim();
        if !self.water_batches.contains(water_id)? && !self.water_derivatives.contains(water_id)? {
            return Err(not_found(FISH_WATER_BATCH, water_id));
        }
        let bottle_id = request.agarose_bottle_id.trim();
        if !self.agarose_bottles.contains(bottle_id)? {
            tracing::warn!(bottle_id, "agarose bottle is not in the inventory");
        }

        let today = self.today();
        let solution = AgaroseSolution::prepare(request, &self.preparation, today)?;
        let taken = self.agarose_solutions.ids()?;
        let id = ids::daily_id(ids::AGAROSE_SOLUTION_PREFIX, today, |c| {
            taken.iter().any(|t| t == c)
        });
        insert_generated(&self.agarose_solutions, AGAROSE_SOLUTION, &id, solution.clone())?;
        tracing::info!(%id, concentration = solution.concentration, "prepared agarose solution");
        Ok((id, solution))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Fish water
    // ─────────────────────────────────────────────────────────────────────

    /// Register a batch drawn on `date` (`YYYYMMDD` or `YYYY-MM-DD`).
    pub fn add_fish_water_batch(
        &self,
        id: &str,
        date: &str,
        notes: Option<&str>,
    ) -> Result<FishWaterBatch> {
        let id = id.trim();
        ids::validate_id(id)?;
        let batch = FishWaterBatch::new(LabDate::parse(date)?, notes);
        if !self.water_batches.insert_new(id, batch.clone())? {
            return Err(duplicate(FISH_WATER_BATCH, id));
        }
        tracing::info!(id, date = %batch.preparation_date, "added fish water batch");
        Ok(batch)
    }

    pub fn fish_water_batches(&self) -> Result<Vec<(String, FishWaterBatch)>> {
        Ok(self.water_batches.load_all()?.into_iter().collect())
    }

    pub fn add_filtered_water(
        &self,
        request: &FilterRequest,
    ) -> Result<(String, FishWaterDerivative)> {
        let source = request.source_batch_id.trim();
        if !self.water_batches.contains(source)? {
            return Err(not_found(FISH_WATER_BATCH, source));
        }
        let today = self.today();
        let derivative = FishWaterDerivative::filter(request, &self.preparation, today)?;
        let taken = self.water_derivatives.ids()?;
        let id = ids::daily_id(ids::FILTERED_WATER_PREFIX, today, |c| {
            taken.iter().any(|t| t == c)
        });
        insert_generated(
            &self.water_derivatives,
            "fish water derivative",
            &id,
            derivative.clone(),
        )?;
        tracing::info!(%id, source, "added filtered water");
        Ok((id, derivative))
    }

    pub fn filtered_waters(&self) -> Result<Vec<(String, FishWaterDerivative)>> {
        Ok(self.water_derivatives.load_all()?.into_iter().collect())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Poly-L-serine
    // ─────────────────────────────────────────────────────────────────────

    pub fn add_pls_bottle(&self, id: &str, bottle: PolyLSerineBottle) -> Result<()> {
        let id = id.trim();
        if !self.pls_bottles.insert_new(id, bottle)? {
            return Err(duplicate(PLS_BOTTLE, id));
        }
        tracing::info!(id, "added poly-l-serine bottle");
        Ok(())
    }

    pub fn pls_bottles(&self) -> Result<Vec<(String, PolyLSerineBottle)>> {
        Ok(self.pls_bottles.load_all()?.into_iter().collect())
    }

    pub fn add_pls_aliquot(&self, request: &AliquotRequest) -> Result<(String, PolyLSerineAliquot)> {
        let source = request.source_bottle_id.trim();
        let bottle = self
            .pls_bottles
            .get(source)?
            .ok_or_else(|| not_found(PLS_BOTTLE, source))?;
        let today = self.today();
        let aliquot = PolyLSerineAliquot::from_bottle(&bottle, request, &self.preparation, today)?;
        let taken = self.pls_aliquots.ids()?;
        let id = ids::daily_id(ids::PLS_ALIQUOT_PREFIX, today, |c| taken.iter().any(|t| t == c));
        insert_generated(&self.pls_aliquots, "poly-l-serine aliquot", &id, aliquot.clone())?;
        tracing::info!(%id, source, "added poly-l-serine aliquot");
        Ok((id, aliquot))
    }

    pub fn pls_aliquots(&self) -> Result<Vec<(String, PolyLSerineAliquot)>> {
        Ok(self.pls_aliquots.load_all()?.into_iter().collect())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Fish dishes
    // ─────────────────────────────────────────────────────────────────────

    pub fn create_dish(&self, new: NewDish) -> Result<FishDish> {
        let dish = FishDish::create(new, self.today())?;
        if self.dishes.exists(&dish.dish_id)? {
            return Err(duplicate(DISH, &dish.dish_id));
        }
        let path = self.dishes.save(&dish)?;
        tracing::info!(dish_id = %dish.dish_id, path = %path.display(), "created dish");
        Ok(dish)
    }

    pub fn dish(&self, dish_id: &str) -> Result<FishDish> {
        self.dishes
            .load(dish_id)?
            .ok_or_else(|| not_found(DISH, dish_id))
    }

    /// Every readable dish passing `query`, in the query's order. Files that
    /// could not be read are reported in [`DishScan::skipped`].
    pub fn dishes(&self, query: &DishQuery) -> Result<DishScan> {
        let DishScan { dishes, skipped } = self.dishes.load_all()?;
        Ok(DishScan {
            dishes: query.apply(dishes),
            skipped,
        })
    }

    pub fn record_quality_check(&self, dish_id: &str, check: QualityCheck) -> Result<FishDish> {
        let mut dish = self.dish(dish_id)?;
        let at = check.check_time;
        dish.record_check(check);
        self.dishes.save(&dish)?;
        tracing::info!(dish_id, %at, "recorded quality check");
        Ok(dish)
    }

    /// Set the status of a dish. Deactivating stamps the termination date
    /// (today unless given) and reason; reactivating clears both.
    pub fn update_dish_status(
        &self,
        dish_id: &str,
        status: DishStatus,
        termination_date: Option<LabDate>,
        reason: Option<&str>,
    ) -> Result<FishDish> {
        let mut dish = self.dish(dish_id)?;
        dish.set_status(status, termination_date, reason, self.today());
        self.dishes.save(&dish)?;
        tracing::info!(dish_id, %status, "updated dish status");
        Ok(dish)
    }

    pub fn terminate_dish(
        &self,
        dish_id: &str,
        reason: &str,
        date: Option<LabDate>,
    ) -> Result<FishDish> {
        self.update_dish_status(dish_id, DishStatus::Inactive, date, Some(reason))
    }

    pub(crate) fn dish_store(&self) -> &DishStore {
        &self.dishes
    }

    // ─────────────────────────────────────────────────────────────────────
    // Audit
    // ─────────────────────────────────────────────────────────────────────

    /// Check every category document and every dish file against its schema
    /// and record rules. Nothing is modified.
    pub fn validate_all(&self) -> Result<ValidationReport> {
        let mut files = vec![
            self.audit_category(&self.agarose_bottles),
            self.audit_category(&self.agarose_solutions),
            self.audit_category(&self.water_batches),
            self.audit_category(&self.water_derivatives),
            self.audit_category(&self.pls_bottles),
            self.audit_category(&self.pls_aliquots),
        ];
        for path in self.dishes.files()? {
            files.push(self.audit_dish(path));
        }
        let report = ValidationReport { files };
        tracing::info!(
            files = report.files.len(),
            invalid = report.invalid_count(),
            "validated inventory"
        );
        Ok(report)
    }

    fn audit_category<T: Record>(&self, store: &CategoryStore<T>) -> FileReport {
        let path = store.path().to_path_buf();
        let kind = T::KIND.label();
        let document = match files::read_json(&path) {
            Ok(Some(document)) => document,
            Ok(None) => return FileReport::new(kind, path, FileStatus::Missing),
            Err(e) => return FileReport::invalid(kind, path, vec![e.to_string()]),
        };

        let mut problems = self.schemas.violations(T::KIND, &document);
        let records = document
            .get(T::KIND.key().unwrap_or_default())
            .and_then(Value::as_object);
        let count = records.map_or(0, serde_json::Map::len);
        for (id, raw) in records.into_iter().flatten() {
            let checked = ids::validate_id(id)
                .map_err(|e| e.to_string())
                .and_then(|()| T::deserialize(raw).map_err(|e| e.to_string()))
                .and_then(|record| record.validate().map_err(|e| e.to_string()));
            if let Err(problem) = checked {
                problems.push(format!("{id}: {problem}"));
            }
        }

        if problems.is_empty() {
            FileReport::new(kind, path, FileStatus::Ok { records: count })
        } else {
            FileReport::invalid(kind, path, problems)
        }
    }

    fn audit_dish(&self, path: PathBuf) -> FileReport {
        let kind = DocumentKind::FishDish.label();
        let document = match files::read_json(&path) {
            Ok(Some(document)) => document,
            Ok(None) => return FileReport::new(kind, path, FileStatus::Missing),
            Err(e) => return FileReport::invalid(kind, path, vec![e.to_string()]),
        };

        let mut problems = self.schemas.violations(DocumentKind::FishDish, &document);
        if problems.is_empty() {
            match serde_json::from_value::<FishDish>(document) {
                Ok(dish) => {
                    if let Err(e) = dish.validate() {
                        problems.push(e.to_string());
                    }
                    let expected = dish.file_name();
                    let actual = path.file_name().and_then(std::ffi::OsStr::to_str);
                    if actual != Some(expected.as_str()) {
                        problems.push(format!("file name does not match dish (expected {expected})"));
                    }
                }
                Err(e) => problems.push(e.to_string()),
            }
        }

        if problems.is_empty() {
            FileReport::new(kind, path, FileStatus::Ok { records: 1 })
        } else {
            FileReport::invalid(kind, path, problems)
        }
    }
}

fn insert_generated<T: Record>(
    store: &CategoryStore<T>,
    kind: &'static str,
    id: &str,
    record: T,
) -> Result<()> {
    if store.insert_new(id, record)? {
        Ok(())
    } else {
        Err(duplicate(kind, id))
    }
}

fn not_found(kind: &'static str, id: &str) -> LabError {
    LabError::NotFound {
        kind,
        id: id.to_string(),
    }
}

fn duplicate(kind: &'static str, id: &str) -> LabError {
    LabError::Duplicate {
        kind,
        id: id.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation report
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub files: Vec<FileReport>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.invalid_count() == 0
    }

    pub fn invalid_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Invalid { .. }))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub kind: &'static str,
    pub path: PathBuf,
    pub status: FileStatus,
}

impl FileReport {
    fn new(kind: &'static str, path: PathBuf, status: FileStatus) -> Self {
        Self { kind, path, status }
    }

    fn invalid(kind: &'static str, path: PathBuf, problems: Vec<String>) -> Self {
        tracing::warn!(path = %path.display(), problems = problems.len(), "invalid document");
        Self::new(kind, path, FileStatus::Invalid { problems })
    }
}

/// Outcome for one file. A missing category file is not an error: the
/// category is simply empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Ok { records: usize },
    Missing,
    Invalid { problems: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn day(d: u32) -> LabDate {
        LabDate::from_ymd(2025, 3, d).unwrap_or_else(|| panic!("bad test date"))
    }

    fn open(dir: &TempDir) -> Lab {
        let config = AppConfig {
            storage: StorageConfig {
                material_data_dir: dir.path().join("materials"),
                dish_data_dir: dir.path().join("dishes"),
                backups: false,
            },
            ..AppConfig::default()
        };
        Lab::open(&config)
            .unwrap_or_else(|e| panic!("{e}"))
            .with_clock(Arc::new(|| day(14)))
    }

    #[test]
    fn open_creates_directories() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let lab = open(&dir);
        assert!(lab.material_dir().is_dir());
        assert!(lab.dish_dir().is_dir());
        assert_eq!(lab.today(), day(14));
    }

    #[test]
    fn duplicate_batch_is_rejected() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let lab = open(&dir);
        lab.add_fish_water_batch("FW1", "2025-03-01", None)
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            lab.add_fish_water_batch("FW1", "20250302", None),
            Err(LabError::Duplicate { .. })
        ));
        assert!(matches!(
            lab.add_fish_water_batch("FW2", "03/02/2025", None),
            Err(LabError::Model(_))
        ));
        assert!(matches!(
            lab.add_fish_water_batch("  ", "20250302", None),
            Err(LabError::Model(_))
        ));
    }

    #[test]
    fn filtered_water_requires_source_batch() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let lab = open(&dir);
        let request = FilterRequest {
            source_batch_id: "FW9".to_string(),
            volume_ml: 500.0,
            filter_size_um: 22,
            prepared_by: None,
            notes: None,
        };
        match lab.add_filtered_water(&request) {
            Err(LabError::NotFound { kind, id }) => {
                assert_eq!(kind, FISH_WATER_BATCH);
                assert_eq!(id, "FW9");
            }
            other => panic!("expected not found, got {other:?}"),
        }
    }

    #[test]
    fn empty_inventory_validates_as_missing() {
        let dir = TempDir::new().unwrap_or_else(|e| panic!("{e}"));
        let lab = open(&dir);
        let report = lab.validate_all().unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(report.files.len(), DocumentKind::CATEGORIES.len());
        assert!(report.files.iter().all(|f| f.status == FileStatus::Missing));
        assert!(report.is_clean());
    }
}
