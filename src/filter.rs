use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::models::{sum_amounts, FilterSummary, WasteCategory, WasteCategoryGroup};
use crate::range::{filter_records_by_date, resolve_bounds, TimeRange};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSelection {
    pub time_range: TimeRange,
    pub categories: BTreeSet<WasteCategory>,
}

impl Default for FilterSelection {
    fn default() -> Self {
        Self {
            time_range: TimeRange::All,
            categories: WasteCategory::ALL.into_iter().collect(),
        }
    }
}

impl FilterSelection {
    pub fn new(
        time_range: TimeRange,
        categories: impl IntoIterator<Item = WasteCategory>,
    ) -> Self {
        Self {
            time_range,
            categories: categories.into_iter().collect(),
        }
    }

    pub fn is_active(&self) -> bool {
        has_active_filters(self)
    }
}

/// True when the selection differs from "every category, all time".
pub fn has_active_filters(selection: &FilterSelection) -> bool {
    if selection.time_range != TimeRange::All {
        return true;
    }
    !WasteCategory::ALL
        .iter()
        .copied()
        .eq(selection.categories.iter().copied())
}

/// Applies `selection` to a waste history.
///
/// Groups outside the selected categories are dropped. Groups with record
/// detail get their total recomputed from the records inside the window.
/// Groups without any records keep the upstream total, since there is
/// nothing to filter.
pub fn filter_waste_data(
    groups: &[WasteCategoryGroup],
    selection: &FilterSelection,
    now: NaiveDateTime,
) -> Vec<WasteCategoryGroup> {
    let bounds = resolve_bounds(selection.time_range, now);

    groups
        .iter()
        .filter(|group| selection.categories.contains(&group.category))
        .map(|group| match &group.records {
            Some(records) if !records.is_empty() => {
                let kept = filter_records_by_date(records, bounds);
                WasteCategoryGroup {
                    category: group.category,
                    total_amount: sum_amounts(&kept),
                    records: Some(kept),
                }
            }
            _ => group.clone(),
        })
        .collect()
}

pub fn summarize(filtered: &[WasteCategoryGroup], selection: &FilterSelection) -> FilterSummary {
    FilterSummary {
        selected_categories: selection.categories.len(),
        total_categories: WasteCategory::ALL.len(),
        group_count: filtered.len(),
        record_count: filtered.iter().map(WasteCategoryGroup::record_count).sum(),
        total_amount: filtered
            .iter()
            .fold(0.0, |total, group| total + group.total_amount),
        active: has_active_filters(selection),
    }
}
