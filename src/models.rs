use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WasteCategory {
    Plastic,
    Paper,
    Glass,
    Metal,
    Electronic,
    OilAndFats,
    Organic,
}

impl WasteCategory {
    /// Every category, in display order.
    pub const ALL: [WasteCategory; 7] = [
        WasteCategory::Plastic,
        WasteCategory::Paper,
        WasteCategory::Glass,
        WasteCategory::Metal,
        WasteCategory::Electronic,
        WasteCategory::OilAndFats,
        WasteCategory::Organic,
    ];

    pub fn code(self) -> &'static str {
        match self {
            WasteCategory::Plastic => "PLASTIC",
            WasteCategory::Paper => "PAPER",
            WasteCategory::Glass => "GLASS",
            WasteCategory::Metal => "METAL",
            WasteCategory::Electronic => "ELECTRONIC",
            WasteCategory::OilAndFats => "OIL_AND_FATS",
            WasteCategory::Organic => "ORGANIC",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WasteCategory::Plastic => "Plastic",
            WasteCategory::Paper => "Paper",
            WasteCategory::Glass => "Glass",
            WasteCategory::Metal => "Metal",
            WasteCategory::Electronic => "Electronic",
            WasteCategory::OilAndFats => "Oil and fats",
            WasteCategory::Organic => "Organic",
        }
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized waste category `{0}`")]
pub struct ParseCategoryError(pub String);

impl FromStr for WasteCategory {
    type Err = ParseCategoryError;

    /// Accepts the upstream codes case-insensitively; `-` and spaces count as `_`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();

        WasteCategory::ALL
            .into_iter()
            .find(|category| category.code() == normalized)
            .ok_or_else(|| ParseCategoryError(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasteRecord {
    pub id: i64,
    #[serde(rename = "type")]
    pub category: WasteCategory,
    pub amount: f64,
    #[serde(rename = "date")]
    pub timestamp: NaiveDateTime,
}

/// One category's aggregate view of a waste history.
///
/// `records` is `None` when the upstream only reported a total for the
/// category. In that case the total cannot be re-derived and is carried
/// through filtering as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasteCategoryGroup {
    #[serde(rename = "waste_type")]
    pub category: WasteCategory,
    pub total_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<WasteRecord>>,
}

impl WasteCategoryGroup {
    pub fn from_records(category: WasteCategory, records: Vec<WasteRecord>) -> Self {
        Self {
            category,
            total_amount: sum_amounts(&records),
            records: Some(records),
        }
    }

    pub fn aggregate_only(category: WasteCategory, total_amount: f64) -> Self {
        Self {
            category,
            total_amount,
            records: None,
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.as_ref().map_or(0, Vec::len)
    }
}

pub fn sum_amounts(records: &[WasteRecord]) -> f64 {
    records
        .iter()
        .fold(0.0, |total, record| total + record.amount)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterSummary {
    pub selected_categories: usize,
    pub total_categories: usize,
    pub group_count: usize,
    pub record_count: usize,
    pub total_amount: f64,
    pub active: bool,
}

impl FilterSummary {
    pub fn selection_line(&self) -> String {
        format!(
            "{} of {} categories selected",
            self.selected_categories, self.total_categories
        )
    }
}
