//! `labinv-model`: domain model for the lab materials and fish-dish inventory.
//!
//! Everything here is pure: no filesystem access, no global state.
//!
//! - [`material`]: bottles and the solutions/aliquots derived from them
//! - [`dish`]: fish dishes, quality checks and the active → inactive lifecycle
//! - [`query`]: filtering, free-text search and sorting of dishes
//! - [`schema`]: declarative JSON-schema validation of on-disk documents
//! - [`survival`]: survivability reports computed from dish documents

pub mod date;
pub mod dish;
pub mod error;
pub mod ids;
pub mod material;
pub mod query;
pub mod schema;
pub mod survival;

pub use date::{CheckTime, LabDate};
pub use dish::{CheckEntry, DishStatus, FishDish, NewDish, QualityCheck, Sex};
pub use error::ModelError;
pub use material::{
    AgaroseBottle, AgaroseSolution, AliquotRequest, FilterRequest, FishWaterBatch,
    FishWaterDerivative, PolyLSerineAliquot, PolyLSerineBottle, PreparationDefaults,
    SolutionRequest,
};
pub use query::{DishQuery, SortKey, StatusFilter};
pub use schema::{DocumentKind, SchemaValidator};
pub use survival::{CsvRecord, SummaryRow, SurvivalRow};
