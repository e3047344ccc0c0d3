use chrono::NaiveDateTime;

use crate::filter::{filter_waste_data, has_active_filters, summarize, FilterSelection};
use crate::models::{FilterSummary, WasteCategory, WasteCategoryGroup};
use crate::range::TimeRange;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FilterModal {
    #[default]
    Closed,
    Open { draft: FilterSelection },
}

/// Committed filter selection for one screen visit, plus the selection modal.
///
/// Edits made while the modal is open live in a draft and only reach the
/// committed selection through [`FilterState::apply_draft`] or
/// [`FilterState::apply_filters`].
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    selection: FilterSelection,
    modal: FilterModal,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn modal(&self) -> &FilterModal {
        &self.modal
    }

    pub fn is_modal_open(&self) -> bool {
        matches!(self.modal, FilterModal::Open { .. })
    }

    pub fn draft(&self) -> Option<&FilterSelection> {
        match &self.modal {
            FilterModal::Open { draft } => Some(draft),
            FilterModal::Closed => None,
        }
    }

    pub fn open_filter_modal(&mut self) {
        tracing::debug!("opening filter modal");
        self.modal = FilterModal::Open {
            draft: self.selection.clone(),
        };
    }

    pub fn close_filter_modal(&mut self) {
        if self.is_modal_open() {
            tracing::debug!("closing filter modal, draft discarded");
        }
        self.modal = FilterModal::Closed;
    }

    pub fn apply_filters(&mut self, selection: FilterSelection) {
        tracing::debug!(
            range = selection.time_range.label(),
            categories = selection.categories.len(),
            "applying filters"
        );
        self.selection = selection;
    }

    pub fn reset_filters(&mut self) {
        tracing::debug!("resetting filters");
        self.selection = FilterSelection::default();
    }

    pub fn has_active_filters(&self) -> bool {
        has_active_filters(&self.selection)
    }

    pub fn set_draft_time_range(&mut self, time_range: TimeRange) {
        if let FilterModal::Open { draft } = &mut self.modal {
            draft.time_range = time_range;
        }
    }

    /// Flips `category` in the draft. Returns false when nothing changed,
    /// which includes trying to turn off the last selected category.
    pub fn toggle_draft_category(&mut self, category: WasteCategory) -> bool {
        let FilterModal::Open { draft } = &mut self.modal else {
            return false;
        };

        if draft.categories.contains(&category) {
            if draft.categories.len() == 1 {
                return false;
            }
            draft.categories.remove(&category)
        } else {
            draft.categories.insert(category)
        }
    }

    pub fn select_all_draft_categories(&mut self) {
        if let FilterModal::Open { draft } = &mut self.modal {
            draft.categories = WasteCategory::ALL.into_iter().collect();
        }
    }

    /// Commits the draft and closes the modal. Does nothing when closed.
    pub fn apply_draft(&mut self) {
        if let FilterModal::Open { draft } = std::mem::take(&mut self.modal) {
            self.apply_filters(draft);
        }
    }

    pub fn filtered(
        &self,
        groups: &[WasteCategoryGroup],
        now: NaiveDateTime,
    ) -> Vec<WasteCategoryGroup> {
        filter_waste_data(groups, &self.selection, now)
    }

    pub fn summary(&self, groups: &[WasteCategoryGroup], now: NaiveDateTime) -> FilterSummary {
        summarize(&self.filtered(groups, now), &self.selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn glass_only() -> FilterSelection {
        FilterSelection::new(TimeRange::Week, [WasteCategory::Glass])
    }

    #[test]
    fn starts_closed_with_defaults() {
        let state = FilterState::new();
        assert!(!state.is_modal_open());
        assert_eq!(state.selection(), &FilterSelection::default());
        assert!(!state.has_active_filters());
    }

    #[test]
    fn opening_copies_committed_selection_into_draft() {
        let mut state = FilterState::new();
        state.apply_filters(glass_only());
        state.open_filter_modal();

        assert!(state.is_modal_open());
        assert_eq!(state.draft(), Some(&glass_only()));
        assert_eq!(state.selection(), &glass_only());
    }

    #[test]
    fn closing_discards_draft_edits() {
        let mut state = FilterState::new();
        state.open_filter_modal();
        state.set_draft_time_range(TimeRange::Day);
        assert!(state.toggle_draft_category(WasteCategory::Paper));
        state.close_filter_modal();

        assert_eq!(state.modal(), &FilterModal::Closed);
        assert_eq!(state.selection(), &FilterSelection::default());
    }

    #[test]
    fn apply_draft_commits_and_closes() {
        let mut state = FilterState::new();
        state.open_filter_modal();
        state.set_draft_time_range(TimeRange::Month);
        state.toggle_draft_category(WasteCategory::Organic);
        state.apply_draft();

        assert!(!state.is_modal_open());
        assert_eq!(state.selection().time_range, TimeRange::Month);
        assert!(!state.selection().categories.contains(&WasteCategory::Organic));
        assert!(state.has_active_filters());
    }

    #[test]
    fn apply_replaces_selection_wholesale() {
        let mut state = FilterState::new();
        state.apply_filters(glass_only());
        let next = FilterSelection::new(TimeRange::Year, [WasteCategory::Metal]);
        state.apply_filters(next.clone());
        assert_eq!(state.selection(), &next);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut state = FilterState::new();
        state.apply_filters(glass_only());
        state.reset_filters();
        assert_eq!(state.selection(), &FilterSelection::default());
        assert!(!state.has_active_filters());
    }

    #[test]
    fn last_category_cannot_be_toggled_off() {
        let mut state = FilterState::new();
        state.apply_filters(glass_only());
        state.open_filter_modal();

        assert!(!state.toggle_draft_category(WasteCategory::Glass));
        assert_eq!(state.draft().map(|draft| draft.categories.len()), Some(1));

        assert!(state.toggle_draft_category(WasteCategory::Paper));
        assert!(state.toggle_draft_category(WasteCategory::Glass));
        let remaining: Vec<_> = state
            .draft()
            .map(|draft| draft.categories.iter().copied().collect())
            .unwrap_or_default();
        assert_eq!(remaining, vec![WasteCategory::Paper]);
    }

    #[test]
    fn select_all_restores_every_category() {
        let mut state = FilterState::new();
        state.apply_filters(glass_only());
        state.open_filter_modal();
        state.select_all_draft_categories();
        assert_eq!(
            state.draft().map(|draft| draft.categories.len()),
            Some(WasteCategory::ALL.len())
        );
    }

    #[test]
    fn draft_edits_are_ignored_while_closed() {
        let mut state = FilterState::new();
        state.set_draft_time_range(TimeRange::Day);
        assert!(!state.toggle_draft_category(WasteCategory::Paper));
        state.apply_draft();
        assert_eq!(state.selection(), &FilterSelection::default());
    }

    #[test]
    fn summary_follows_committed_selection() {
        let now = NaiveDate::from_ymd_opt(2024, 6, 15)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .unwrap();
        let groups = vec![
            WasteCategoryGroup::aggregate_only(WasteCategory::Glass, 3.0),
            WasteCategoryGroup::aggregate_only(WasteCategory::Paper, 5.0),
        ];

        let mut state = FilterState::new();
        assert_eq!(state.summary(&groups, now).total_amount, 8.0);

        state.apply_filters(glass_only());
        let summary = state.summary(&groups, now);
        assert_eq!(summary.group_count, 1);
        assert_eq!(summary.total_amount, 3.0);
        assert_eq!(summary.selection_line(), "1 of 7 categories selected");
        assert_eq!(state.filtered(&groups, now).len(), 1);
    }
}
