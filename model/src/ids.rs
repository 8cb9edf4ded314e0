//! Record identifiers and dish file names.

use crate::date::LabDate;
use crate::error::ModelError;

pub const AGAROSE_SOLUTION_PREFIX: &str = "AGSOL";
pub const FILTERED_WATER_PREFIX: &str = "FW_FILTERED";
pub const PLS_ALIQUOT_PREFIX: &str = "PLS_ALIQUOT";

const DISH_FILE_SUFFIX: &str = ".json";

/// Reject ids that are blank or would escape the data directory when used
/// as part of a file name.
pub fn validate_id(value: &str) -> Result<(), ModelError> {
    let invalid = |reason: &str| ModelError::InvalidId {
        value: value.to_string(),
        reason: reason.to_string(),
    };
    if value.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(invalid("must not contain path separators"));
    }
    Ok(())
}

/// `PREFIX_YYYYMMDD`, or `PREFIX_YYYYMMDD_N` with the first `N >= 1` not
/// already `taken`.
pub fn daily_id(prefix: &str, date: LabDate, taken: impl Fn(&str) -> bool) -> String {
    let base = format!("{prefix}_{date}");
    if !taken(&base) {
        return base;
    }
    let mut n = 1u32;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

pub fn dish_id(cross_id: &str, dish_number: u32) -> String {
    format!("{cross_id}_{dish_number}")
}

pub fn dish_file_name(dish_id: &str, dof: LabDate) -> String {
    format!("{dish_id}_{dof}{DISH_FILE_SUFFIX}")
}

/// Split `{dish_id}_{YYYYMMDD}.json` into its dish id and date of
/// fertilization. Returns `None` for anything else.
pub fn parse_dish_file_name(file_name: &str) -> Option<(&str, LabDate)> {
    let stem = file_name.strip_suffix(DISH_FILE_SUFFIX)?;
    let (dish_id, dof) = stem.rsplit_once('_')?;
    if dish_id.is_empty() {
        return None;
    }
    Some((dish_id, LabDate::parse_compact(dof)?))
}
