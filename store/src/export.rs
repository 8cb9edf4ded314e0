//! Survivability CSV export.

use std::path::{Path, PathBuf};

use labinv_model::survival::{self, CsvRecord};
use serde::Serialize;

use crate::dishes::raw_dish_documents;
use crate::error::{LabError, Result};
use crate::lab::Lab;

pub const DEFAULT_DETAILED_REPORT: &str = "survivability_report.csv";
pub const DEFAULT_SUMMARY_REPORT: &str = "survivability_summary.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportKind {
    /// One row per quality check.
    #[default]
    Detailed,
    /// One row per cross, genotype and date of fertilization.
    Summary,
    Both,
}

impl ExportKind {
    fn detailed(self) -> bool {
        matches!(self, Self::Detailed | Self::Both)
    }

    fn summary(self) -> bool {
        matches!(self, Self::Summary | Self::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub detailed: PathBuf,
    pub summary: PathBuf,
}

impl Default for ExportPaths {
    fn default() -> Self {
        Self {
            detailed: PathBuf::from(DEFAULT_DETAILED_REPORT),
            summary: PathBuf::from(DEFAULT_SUMMARY_REPORT),
        }
    }
}

/// A report file that was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenReport {
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub dishes: usize,
    pub reports: Vec<WrittenReport>,
}

impl Lab {
    /// Write the survivability report(s) selected by `kind`. Dish documents
    /// are read from `dishes_dir` when given, otherwise from the configured
    /// dish directory. Documents that are not JSON objects with a `dish_id`
    /// are skipped.
    pub fn export_survivability(
        &self,
        kind: ExportKind,
        paths: &ExportPaths,
        dishes_dir: Option<&Path>,
    ) -> Result<ExportSummary> {
        let documents = match dishes_dir {
            Some(dir) => raw_dish_documents(dir)?,
            None => self.dish_store().load_raw_all()?,
        };
        let mut summary = ExportSummary {
            dishes: documents.len(),
            reports: Vec::new(),
        };

        if kind.detailed() {
            let rows = survival::detailed_rows(&documents)?;
            summary.reports.push(write_report(&paths.detailed, &rows)?);
        }
        if kind.summary() {
            let rows = survival::summary_rows(&documents)?;
            summary.reports.push(write_report(&paths.summary, &rows)?);
        }
        Ok(summary)
    }
}

fn write_report<R: CsvRecord>(path: &Path, rows: &[R]) -> Result<WrittenReport> {
    let csv = survival::render_csv(rows)?;
    let report_error = |source| LabError::Report {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(report_error)?;
    }
    std::fs::write(path, csv).map_err(report_error)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "wrote survivability report");
    Ok(WrittenReport {
        path: path.to_path_buf(),
        rows: rows.len(),
    })
}
