//! `labinv-store`: configuration, JSON persistence and the [`Lab`] facade.
//!
//! Material categories live in one JSON document each under the material
//! data directory; fish dishes live one document per dish under the dish
//! data directory. Every write rewrites the whole document.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod category;
pub mod config;
pub mod dishes;
pub mod error;
pub mod export;
pub mod files;
pub mod lab;

pub use category::{CategoryStore, Record};
pub use config::{AppConfig, ConfigError, ConfigLoader};
pub use dishes::{DishScan, DishStore, SkippedFile};
pub use error::{LabError, Result, StorageError};
pub use export::{ExportKind, ExportPaths, ExportSummary, WrittenReport};
pub use lab::{Clock, FileReport, FileStatus, Lab, ValidationReport};
