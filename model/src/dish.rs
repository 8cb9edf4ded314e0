//! Fish dishes: one experiment unit from creation through daily quality
//! checks to termination.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::date::{self, CheckTime, LabDate};
use crate::error::ModelError;
use crate::ids;
use crate::material::{clean_notes, require_text};

pub const DEFAULT_SPECIES: &str = "Danio rerio";
pub const CREATION_NOTE: &str = "Created and checked - normal";
pub const MIN_TEMPERATURE_C: f64 = 18.0;
pub const MAX_TEMPERATURE_C: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Sex {
    M,
    F,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::M => "M",
            Self::F => "F",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "m" => Ok(Self::M),
            "f" => Ok(Self::F),
            "unknown" => Ok(Self::Unknown),
            _ => Err(ModelError::InvalidValue {
                field: "sex",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DishStatus {
    #[default]
    Active,
    Inactive,
}

impl DishStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for DishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DishStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(ModelError::InvalidValue {
                field: "status",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightCycle {
    /// Light:dark hours, e.g. `14:10`.
    pub light_duration: String,
    pub dawn_dusk: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enclosure {
    /// Degrees Celsius.
    pub temperature: f64,
    pub light_cycle: LightCycle,
    pub room: String,
    #[serde(default)]
    pub in_beaker: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vol_water_total: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breeding {
    #[serde(default)]
    pub parents: Vec<String>,
}

/// One observation of a dish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub check_time: CheckTime,
    #[serde(default)]
    pub fed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feed_type: Option<String>,
    #[serde(default)]
    pub water_changed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vol_water_changed: Option<f64>,
    #[serde(default)]
    pub num_dead: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl QualityCheck {
    /// A check at `check_time` with nothing fed, changed or dead.
    pub fn at(check_time: CheckTime) -> Self {
        Self {
            check_time,
            fed: false,
            feed_type: None,
            water_changed: false,
            vol_water_changed: None,
            num_dead: 0,
            notes: None,
        }
    }

    fn normalized(mut self) -> Self {
        if !self.fed {
            self.feed_type = None;
        }
        if !self.water_changed {
            self.vol_water_changed = None;
        }
        self.feed_type = clean_notes(self.feed_type.as_deref());
        self.notes = clean_notes(self.notes.as_deref());
        self
    }
}

/// Value stored under a quality-check key. Older dishes recorded checks as
/// a plain note string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckEntry {
    Record(QualityCheck),
    Note(String),
}

impl CheckEntry {
    pub fn num_dead(&self) -> u32 {
        match self {
            Self::Record(check) => check.num_dead,
            Self::Note(_) => 0,
        }
    }

    pub fn notes(&self) -> Option<&str> {
        match self {
            Self::Record(check) => check.notes.as_deref(),
            Self::Note(note) => Some(note),
        }
    }
}

fn default_species() -> String {
    DEFAULT_SPECIES.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FishDish {
    pub dish_id: String,
    pub date_created: LabDate,
    pub cross_id: String,
    /// Date of fertilization.
    pub dof: LabDate,
    pub genotype: String,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default = "default_species")]
    pub species: String,
    pub responsible: String,
    pub fish_count: u32,
    #[serde(default)]
    pub breeding: Breeding,
    pub enclosure: Enclosure,
    /// Keyed by check time (`YYYYMMDDhh:mm:ss`), or a bare date for old notes.
    #[serde(default)]
    pub quality_checks: BTreeMap<String, CheckEntry>,
    #[serde(default)]
    pub status: DishStatus,
    #[serde(
        default,
        deserialize_with = "date::optional::deserialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub termination_date: Option<LabDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,
}

/// Form data for a new dish. [`NewDish::new`] fills in the usual defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDish {
    pub cross_id: String,
    pub dish_number: u32,
    pub genotype: String,
    pub responsible: String,
    pub dof: Option<LabDate>,
    pub sex: Sex,
    pub species: String,
    pub fish_count: u32,
    pub parents: Vec<String>,
    pub temperature: f64,
    pub light_duration: String,
    pub dawn_dusk: String,
    pub room: String,
    pub in_beaker: bool,
    pub vol_water_total: Option<f64>,
}

impl NewDish {
    pub fn new(
        cross_id: impl Into<String>,
        dish_number: u32,
        genotype: impl Into<String>,
        responsible: impl Into<String>,
    ) -> Self {
        Self {
            cross_id: cross_id.into(),
            dish_number,
            genotype: genotype.into(),
            responsible: responsible.into(),
            dof: None,
            sex: Sex::Unknown,
            species: DEFAULT_SPECIES.to_string(),
            fish_count: 1,
            parents: Vec::new(),
            temperature: 28.5,
            light_duration: "14:10".to_string(),
            dawn_dusk: "8:00".to_string(),
            room: "2E.282".to_string(),
            in_beaker: false,
            vol_water_total: None,
        }
    }

    pub fn dish_id(&self) -> String {
        ids::dish_id(self.cross_id.trim(), self.dish_number)
    }
}

impl FishDish {
    pub fn create(new: NewDish, today: LabDate) -> Result<Self, ModelError> {
        ids::validate_id(&new.cross_id)?;
        if new.dish_number == 0 {
            return Err(ModelError::OutOfRange {
                field: "dish_number",
                reason: "must be at least 1".to_string(),
            });
        }
        let dish_id = new.dish_id();
        let seeded = QualityCheck {
            notes: Some(CREATION_NOTE.to_string()),
            ..QualityCheck::at(CheckTime::start_of_day(today))
        };
        let mut quality_checks = BTreeMap::new();
        quality_checks.insert(seeded.check_time.to_string(), CheckEntry::Record(seeded));

        let species = match new.species.trim() {
            "" => DEFAULT_SPECIES.to_string(),
            s => s.to_string(),
        };
        let dish = Self {
            dish_id,
            date_created: today,
            cross_id: new.cross_id.trim().to_string(),
            dof: new.dof.unwrap_or(today),
            genotype: new.genotype.trim().to_string(),
            sex: new.sex,
            species,
            responsible: new.responsible.trim().to_string(),
            fish_count: new.fish_count,
            breeding: Breeding {
                parents: new
                    .parents
                    .iter()
                    .map(String::as_str)
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect(),
            },
            enclosure: Enclosure {
                temperature: new.temperature,
                light_cycle: LightCycle {
                    light_duration: new.light_duration,
                    dawn_dusk: new.dawn_dusk,
                },
                room: new.room,
                in_beaker: new.in_beaker,
                vol_water_total: new.vol_water_total,
            },
            quality_checks,
            status: DishStatus::Active,
            termination_date: None,
            termination_reason: None,
        };
        dish.validate()?;
        Ok(dish)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        ids::validate_id(&self.dish_id)?;
        require_text("cross_id", &self.cross_id)?;
        require_text("responsible", &self.responsible)?;
        let temp = self.enclosure.temperature;
        if !(MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&temp) {
            return Err(ModelError::OutOfRange {
                field: "enclosure.temperature",
                reason: format!("{temp} is not between {MIN_TEMPERATURE_C} and {MAX_TEMPERATURE_C} °C"),
            });
        }
        match self.status {
            DishStatus::Active
                if self.termination_date.is_some() || self.termination_reason.is_some() =>
            {
                Err(ModelError::Inconsistent(format!(
                    "dish {} is active but carries termination details",
                    self.dish_id
                )))
            }
            DishStatus::Inactive if self.termination_date.is_none() => {
                Err(ModelError::Inconsistent(format!(
                    "dish {} is inactive without a termination date",
                    self.dish_id
                )))
            }
            _ => Ok(()),
        }
    }

    /// Store `check` under its check time, replacing any check at the same
    /// instant.
    pub fn record_check(&mut self, check: QualityCheck) {
        if !self.is_active() {
            tracing::warn!(dish_id = %self.dish_id, "recording quality check on inactive dish");
        }
        let check = check.normalized();
        self.quality_checks
            .insert(check.check_time.to_string(), CheckEntry::Record(check));
    }

    pub fn set_status(
        &mut self,
        status: DishStatus,
        termination_date: Option<LabDate>,
        reason: Option<&str>,
        today: LabDate,
    ) {
        self.status = status;
        match status {
            DishStatus::Inactive => {
                self.termination_date = Some(termination_date.unwrap_or(today));
                self.termination_reason = clean_notes(reason);
            }
            DishStatus::Active => {
                self.termination_date = None;
                self.termination_reason = None;
            }
        }
    }

    pub fn terminate(&mut self, reason: &str, date: LabDate) {
        self.set_status(DishStatus::Inactive, Some(date), Some(reason), date);
    }

    pub fn is_active(&self) -> bool {
        self.status == DishStatus::Active
    }

    pub fn total_dead(&self) -> u32 {
        self.quality_checks
            .values()
            .map(CheckEntry::num_dead)
            .fold(0, u32::saturating_add)
    }

    pub fn remaining_fish(&self) -> u32 {
        self.fish_count.saturating_sub(self.total_dead())
    }

    /// Date of the most recent quality check, if any key carries one.
    pub fn last_check_date(&self) -> Option<LabDate> {
        self.quality_checks
            .keys()
            .filter_map(|key| date::check_key_date(key))
            .max()
    }

    pub fn file_name(&self) -> String {
        ids::dish_file_name(&self.dish_id, self.dof)
    }
}
