//! Filtering, free-text search and ordering of fish dishes.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::dish::{CheckEntry, DishStatus, FishDish};
use crate::error::ModelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    pub fn matches(self, status: DishStatus) -> bool {
        match self {
            Self::All => true,
            Self::Active => status == DishStatus::Active,
            Self::Inactive => status == DishStatus::Inactive,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::Active => "active",
            Self::Inactive => "inactive",
        })
    }
}

impl FromStr for StatusFilter {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(ModelError::InvalidValue {
                field: "status filter",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    DishId,
    DateCreated,
    Genotype,
    Responsible,
    Status,
    Room,
    FishCount,
    Dof,
}

impl SortKey {
    pub const ALL: [SortKey; 8] = [
        Self::DishId,
        Self::DateCreated,
        Self::Genotype,
        Self::Responsible,
        Self::Status,
        Self::Room,
        Self::FishCount,
        Self::Dof,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DishId => "dish_id",
            Self::DateCreated => "date_created",
            Self::Genotype => "genotype",
            Self::Responsible => "responsible",
            Self::Status => "status",
            Self::Room => "room",
            Self::FishCount => "fish_count",
            Self::Dof => "dof",
        }
    }

    fn compare(self, a: &FishDish, b: &FishDish) -> Ordering {
        match self {
            Self::DishId => Ordering::Equal,
            Self::DateCreated => a.date_created.cmp(&b.date_created),
            Self::Genotype => a.genotype.cmp(&b.genotype),
            Self::Responsible => a.responsible.cmp(&b.responsible),
            Self::Status => a.status.cmp(&b.status),
            Self::Room => a.enclosure.room.cmp(&b.enclosure.room),
            Self::FishCount => a.fish_count.cmp(&b.fish_count),
            Self::Dof => a.dof.cmp(&b.dof),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == wanted)
            .ok_or_else(|| ModelError::InvalidValue {
                field: "sort key",
                value: s.to_string(),
            })
    }
}

/// True if `text` occurs in any searchable field of `dish`. Empty text
/// matches every dish.
pub fn matches_search(dish: &FishDish, text: &str, case_sensitive: bool) -> bool {
    let needle = text.trim();
    if needle.is_empty() {
        return true;
    }
    let needle = if case_sensitive {
        needle.to_string()
    } else {
        needle.to_lowercase()
    };
    let contains = |haystack: &str| {
        if case_sensitive {
            haystack.contains(needle.as_str())
        } else {
            haystack.to_lowercase().contains(needle.as_str())
        }
    };

    let fish_count = dish.fish_count.to_string();
    let fields = [
        dish.dish_id.as_str(),
        dish.genotype.as_str(),
        dish.responsible.as_str(),
        dish.species.as_str(),
        dish.cross_id.as_str(),
        dish.enclosure.room.as_str(),
        fish_count.as_str(),
    ];
    fields.into_iter().any(contains)
        || dish.breeding.parents.iter().any(|p| contains(p))
        || dish
            .quality_checks
            .values()
            .filter_map(CheckEntry::notes)
            .any(contains)
}

pub fn search<'a>(dishes: &'a [FishDish], text: &str, case_sensitive: bool) -> Vec<&'a FishDish> {
    dishes
        .iter()
        .filter(|dish| matches_search(dish, text, case_sensitive))
        .collect()
}

/// Everything the dish list can be narrowed and ordered by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DishQuery {
    pub status: StatusFilter,
    pub search: Option<String>,
    pub case_sensitive: bool,
    pub sort: SortKey,
    pub descending: bool,
}

impl DishQuery {
    pub fn apply(&self, dishes: Vec<FishDish>) -> Vec<FishDish> {
        let text = self.search.as_deref().unwrap_or("");
        let mut selected: Vec<FishDish> = dishes
            .into_iter()
            .filter(|dish| self.status.matches(dish.status))
            .filter(|dish| matches_search(dish, text, self.case_sensitive))
            .collect();
        selected.sort_by(|a, b| {
            let primary = self.sort.compare(a, b);
            let primary = if self.descending { primary.reverse() } else { primary };
            primary.then_with(|| {
                let by_id = a.dish_id.cmp(&b.dish_id);
                if self.descending && self.sort == SortKey::DishId {
                    by_id.reverse()
                } else {
                    by_id
                }
            })
        });
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::{CheckTime, LabDate};
    use crate::dish::{NewDish, QualityCheck};
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> LabDate {
        LabDate::from_ymd(2025, 2, d).unwrap_or_else(|| panic!("bad test date"))
    }

    fn dish(cross: &str, n: u32, genotype: &str, responsible: &str, count: u32, created: u32) -> FishDish {
        let mut new = NewDish::new(cross, n, genotype, responsible);
        new.fish_count = count;
        FishDish::create(new, day(created)).unwrap_or_else(|e| panic!("{e}"))
    }

    fn sample() -> Vec<FishDish> {
        let mut inactive = dish("B", 1, "het", "Bo", 12, 3);
        inactive.terminate("done", day(10));
        let mut noted = dish("A", 2, "wt", "Ana", 5, 2);
        let time = CheckTime::parse("2025020312:00:00").unwrap_or_else(|e| panic!("{e}"));
        noted.record_check(QualityCheck {
            notes: Some("Cloudy water".to_string()),
            ..QualityCheck::at(time)
        });
        vec![inactive, noted, dish("A", 1, "mut", "Cy", 8, 1)]
    }

    fn ids(dishes: &[FishDish]) -> Vec<&str> {
        dishes.iter().map(|d| d.dish_id.as_str()).collect()
    }

    #[test]
    fn default_query_sorts_by_dish_id() {
        let result = DishQuery::default().apply(sample());
        assert_eq!(ids(&result), vec!["A_1", "A_2", "B_1"]);
    }

    #[test]
    fn status_filter_selects_lifecycle_state() {
        let query = DishQuery {
            status: StatusFilter::Inactive,
            ..DishQuery::default()
        };
        assert_eq!(ids(&query.apply(sample())), vec!["B_1"]);

        let query = DishQuery {
            status: StatusFilter::Active,
            ..DishQuery::default()
        };
        assert_eq!(ids(&query.apply(sample())), vec!["A_1", "A_2"]);
    }

    #[test]
    fn search_covers_check_notes_and_respects_case() {
        let dishes = sample();
        assert_eq!(search(&dishes, "cloudy", false).len(), 1);
        assert_eq!(search(&dishes, "cloudy", true).len(), 0);
        assert_eq!(search(&dishes, "12", false).len(), 1);
        assert_eq!(search(&dishes, "", true).len(), 3);
        // the seeded creation note is on every dish
        assert_eq!(search(&dishes, "created and checked", false).len(), 3);
    }

    #[test]
    fn descending_sort_breaks_ties_by_id() {
        let query = DishQuery {
            sort: SortKey::FishCount,
            descending: true,
            ..DishQuery::default()
        };
        assert_eq!(ids(&query.apply(sample())), vec!["B_1", "A_1", "A_2"]);

        let query = DishQuery {
            sort: SortKey::DishId,
            descending: true,
            ..DishQuery::default()
        };
        assert_eq!(ids(&query.apply(sample())), vec!["B_1", "A_2", "A_1"]);
    }

    #[test]
    fn sort_key_parses_names() {
        assert_eq!("date-created".parse::<SortKey>(), Ok(SortKey::DateCreated));
        assert_eq!("fish_count".parse::<SortKey>(), Ok(SortKey::FishCount));
        assert!("colour".parse::<SortKey>().is_err());
    }
}
