use chrono::{Days, Months, NaiveDateTime, NaiveTime};

use crate::models::WasteRecord;

/// A user-selectable window bounding which records count toward totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    Day,
    Week,
    Month,
    Year,
    #[default]
    All,
    Custom {
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    },
}

impl TimeRange {
    /// Parses a range label. Unknown labels fall back to `All`.
    pub fn from_label(label: &str) -> TimeRange {
        match label.trim().to_ascii_lowercase().as_str() {
            "day" | "today" => TimeRange::Day,
            "week" => TimeRange::Week,
            "month" => TimeRange::Month,
            "year" => TimeRange::Year,
            "all" => TimeRange::All,
            "custom" => TimeRange::Custom {
                start: None,
                end: None,
            },
            other => {
                tracing::warn!(range = other, "unrecognized time range, using all");
                TimeRange::All
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Year => "year",
            TimeRange::All => "all",
            TimeRange::Custom { .. } => "custom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateBounds {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl DateBounds {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start.map_or(true, |start| timestamp >= start)
            && self.end.map_or(true, |end| timestamp <= end)
    }
}

fn midnight(value: NaiveDateTime) -> NaiveDateTime {
    value.date().and_time(NaiveTime::MIN)
}

/// Start of the window for `range`, relative to the local wall-clock `now`.
///
/// Preset ranges always start at midnight. Calendar arithmetic clamps to the
/// end of a shorter month, so one month before March 31 is the last day of
/// February.
pub fn start_for_range(range: TimeRange, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let start = match range {
        TimeRange::All => return None,
        TimeRange::Custom { start, .. } => return start,
        TimeRange::Day => Some(now),
        TimeRange::Week => now.checked_sub_days(Days::new(7)),
        TimeRange::Month => now.checked_sub_months(Months::new(1)),
        TimeRange::Year => now.checked_sub_months(Months::new(12)),
    };
    start.map(midnight)
}

pub fn resolve_bounds(range: TimeRange, now: NaiveDateTime) -> DateBounds {
    let end = match range {
        TimeRange::Custom { end, .. } => end,
        _ => None,
    };
    DateBounds {
        start: start_for_range(range, now),
        end,
    }
}

pub fn filter_records_by_date(records: &[WasteRecord], bounds: DateBounds) -> Vec<WasteRecord> {
    if bounds.is_unbounded() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|record| bounds.contains(record.timestamp))
        .cloned()
        .collect()
}
