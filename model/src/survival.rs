//! Survivability reports computed from raw fish-dish documents.
//!
//! Works on `serde_json::Value` rather than [`crate::FishDish`] so that old
//! or partially filled dish files still contribute to the report: missing
//! text fields become `unknown` and missing counts become 0.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::date::{LabDate, check_key_date};
use crate::error::ModelError;

const UNKNOWN: &str = "unknown";

/// A report row that can be written as one CSV record.
pub trait CsvRecord {
    const HEADER: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

/// One quality check of one dish.
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivalRow {
    pub dish_id: String,
    pub cross_id: String,
    pub genotype: String,
    pub date_fertilized: String,
    pub date_created: String,
    pub initial_count: i64,
    pub check_date: String,
    pub fish_deaths: i64,
    pub cumulative_deaths: i64,
    pub remaining: i64,
    /// Percent of the initial count still alive; `None` when the dish
    /// started empty.
    pub survival_rate: Option<f64>,
    pub days_since_fertilization: i64,
    pub status: String,
    pub termination_date: String,
    pub termination_reason: String,
    pub responsible: String,
    pub in_beaker: bool,
    pub vol_water_total: String,
    pub room: String,
    pub water_changed: bool,
    pub vol_water_changed: String,
}

impl CsvRecord for SurvivalRow {
    const HEADER: &'static [&'static str] = &[
        "dish_id",
        "cross_id",
        "genotype",
        "date_fertilized",
        "date_created",
        "initial_count",
        "check_date",
        "fish_deaths",
        "cumulative_deaths",
        "remaining",
        "survival_rate",
        "days_since_fertilization",
        "status",
        "termination_date",
        "termination_reason",
        "responsible",
        "in_beaker",
        "vol_water_total",
        "room",
        "water_changed",
        "vol_water_changed",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.dish_id.clone(),
            self.cross_id.clone(),
            self.genotype.clone(),
            self.date_fertilized.clone(),
            self.date_created.clone(),
            self.initial_count.to_string(),
            self.check_date.clone(),
            self.fish_deaths.to_string(),
            self.cumulative_deaths.to_string(),
            self.remaining.to_string(),
            format_rate(self.survival_rate),
            self.days_since_fertilization.to_string(),
            self.status.clone(),
            self.termination_date.clone(),
            self.termination_reason.clone(),
            self.responsible.clone(),
            yes_no(self.in_beaker),
            self.vol_water_total.clone(),
            self.room.clone(),
            yes_no(self.water_changed),
            self.vol_water_changed.clone(),
        ]
    }
}

/// Dishes sharing a cross, genotype and date of fertilization.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub cross_id: String,
    pub genotype: String,
    pub date_fertilized: String,
    pub dish_count: u64,
    pub total_initial: i64,
    pub total_surviving: i64,
    pub survival_rate: Option<f64>,
    pub max_days: i64,
}

impl CsvRecord for SummaryRow {
    const HEADER: &'static [&'static str] = &[
        "cross_id",
        "genotype",
        "date_fertilized",
        "dish_count",
        "total_initial",
        "total_surviving",
        "survival_rate",
        "max_days",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.cross_id.clone(),
            self.genotype.clone(),
            self.date_fertilized.clone(),
            self.dish_count.to_string(),
            self.total_initial.to_string(),
            self.total_surviving.to_string(),
            format_rate(self.survival_rate),
            self.max_days.to_string(),
        ]
    }
}

struct CheckPoint {
    date: String,
    num_dead: i64,
    water_changed: bool,
    vol_water_changed: String,
}

/// Per-check survival rows for every dish that has quality checks.
pub fn detailed_rows(dishes: &[Value]) -> Result<Vec<SurvivalRow>, ModelError> {
    if dishes.is_empty() {
        return Err(ModelError::NoDishData);
    }
    let mut rows = Vec::new();
    for dish in dishes {
        let Some(checks) = quality_checks(dish) else {
            tracing::warn!(dish_id = %text(dish, "dish_id"), "skipping dish with no quality checks");
            continue;
        };

        let mut points: Vec<CheckPoint> = checks
            .iter()
            .filter_map(|(key, entry)| check_point(key, entry))
            .collect();
        points.sort_by(|a, b| a.date.cmp(&b.date));

        let dof = text(dish, "dof");
        let initial = integer(dish.get("fish_count"));
        let enclosure = dish.get("enclosure");
        let mut remaining = initial;
        for point in points {
            remaining = remaining.saturating_sub(point.num_dead);
            rows.push(SurvivalRow {
                dish_id: text(dish, "dish_id"),
                cross_id: text(dish, "cross_id"),
                genotype: text(dish, "genotype"),
                date_fertilized: dof.clone(),
                date_created: text(dish, "date_created"),
                initial_count: initial,
                days_since_fertilization: days_between(&dof, &point.date),
                check_date: point.date,
                fish_deaths: point.num_dead,
                cumulative_deaths: initial.saturating_sub(remaining),
                remaining,
                survival_rate: rate(remaining, initial),
                status: text(dish, "status"),
                termination_date: optional_text(dish.get("termination_date")),
                termination_reason: optional_text(dish.get("termination_reason")),
                responsible: text(dish, "responsible"),
                in_beaker: enclosure
                    .and_then(|e| e.get("in_beaker"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                vol_water_total: number_text(enclosure.and_then(|e| e.get("vol_water_total"))),
                room: enclosure.map_or_else(|| UNKNOWN.to_string(), |e| text(e, "room")),
                water_changed: point.water_changed,
                vol_water_changed: point.vol_water_changed,
            });
        }
    }
    Ok(rows)
}

/// Survival grouped by `(cross_id, genotype, dof)`, ordered by cross id and
/// genotype.
pub fn summary_rows(dishes: &[Value]) -> Result<Vec<SummaryRow>, ModelError> {
    if dishes.is_empty() {
        return Err(ModelError::NoDishData);
    }
    let mut groups: BTreeMap<(String, String, String), SummaryRow> = BTreeMap::new();
    for dish in dishes {
        let Some(checks) = quality_checks(dish) else {
            continue;
        };
        let cross_id = text(dish, "cross_id");
        let genotype = text(dish, "genotype");
        let dof = text(dish, "dof");
        let initial = integer(dish.get("fish_count"));

        let group = groups
            .entry((cross_id.clone(), genotype.clone(), dof.clone()))
            .or_insert_with(|| SummaryRow {
                cross_id,
                genotype,
                date_fertilized: dof.clone(),
                dish_count: 0,
                total_initial: 0,
                total_surviving: 0,
                survival_rate: None,
                max_days: 0,
            });
        group.dish_count += 1;
        group.total_initial = group.total_initial.saturating_add(initial);

        // Only structured checks carry death counts and a usable date.
        let mut surviving = initial;
        let mut latest: Option<String> = None;
        for (key, entry) in checks {
            if !entry.is_object() {
                continue;
            }
            surviving = surviving.saturating_sub(integer(entry.get("num_dead")));
            let date = check_date(key);
            if latest.as_deref().is_none_or(|seen| date.as_str() > seen) {
                latest = Some(date);
            }
        }
        group.total_surviving = group.total_surviving.saturating_add(surviving.max(0));
        if let Some(latest) = latest {
            group.max_days = group.max_days.max(days_between(&dof, &latest));
        }
    }

    Ok(groups
        .into_values()
        .map(|mut row| {
            row.survival_rate = rate(row.total_surviving, row.total_initial);
            row
        })
        .collect())
}

/// Render rows as CSV with a header line. Fields containing a comma, quote
/// or line break are quoted with embedded quotes doubled.
pub fn render_csv<R: CsvRecord>(rows: &[R]) -> Result<String, ModelError> {
    if rows.is_empty() {
        return Err(ModelError::EmptyReport);
    }
    let mut out = String::new();
    push_record(&mut out, R::HEADER.iter().map(|h| h.to_string()));
    for row in rows {
        push_record(&mut out, row.cells());
    }
    Ok(out)
}

fn push_record(out: &mut String, cells: impl IntoIterator<Item = String>) {
    let escaped: Vec<String> = cells.into_iter().map(|c| csv_escape(&c)).collect();
    out.push_str(&escaped.join(","));
    out.push_str("\r\n");
}

fn csv_escape(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn quality_checks(dish: &Value) -> Option<&serde_json::Map<String, Value>> {
    dish.get("quality_checks")
        .and_then(Value::as_object)
        .filter(|checks| !checks.is_empty())
}

fn check_point(key: &str, entry: &Value) -> Option<CheckPoint> {
    match entry {
        Value::Object(_) => {
            let water_changed = entry
                .get("water_changed")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let vol_water_changed = if water_changed {
                number_text(entry.get("vol_water_changed"))
            } else {
                "0".to_string()
            };
            Some(CheckPoint {
                date: check_date(key),
                num_dead: integer(entry.get("num_dead")),
                water_changed,
                vol_water_changed,
            })
        }
        Value::String(_) => Some(CheckPoint {
            date: key.to_string(),
            num_dead: 0,
            water_changed: false,
            vol_water_changed: "0".to_string(),
        }),
        _ => None,
    }
}

/// `YYYYMMDD` part of a check key; keys without a time are used as is.
fn check_date(key: &str) -> String {
    if key.contains(':') {
        key.get(0..8).unwrap_or(key).to_string()
    } else {
        key.to_string()
    }
}

fn days_between(from: &str, to: &str) -> i64 {
    match (LabDate::parse_compact(from), check_key_date(to)) {
        (Some(from), Some(to)) => from.days_until(to),
        _ => {
            tracing::debug!(from, to, "cannot compute days between non-dates");
            0
        }
    }
}

fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => UNKNOWN.to_string(),
    }
}

fn optional_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn number_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => "0".to_string(),
    }
}

fn integer(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn rate(surviving: i64, initial: i64) -> Option<f64> {
    (initial > 0).then(|| surviving as f64 / initial as f64 * 100.0)
}

fn format_rate(rate: Option<f64>) -> String {
    match rate {
        None => "0".to_string(),
        Some(r) if r.fract() == 0.0 => format!("{r:.1}"),
        Some(r) => r.to_string(),
    }
}

fn yes_no(flag: bool) -> String {
    let answer = if flag { "Yes" } else { "No" };
    answer.to_string()
}
