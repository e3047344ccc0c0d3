use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use thiserror::Error;

use crate::models::{WasteCategory, WasteCategoryGroup, WasteRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized date `{0}`")]
pub struct ParseTimestampError(pub String);

pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ParseTimestampError> {
    parse_timestamp_or_day(value, NaiveTime::MIN)
}

/// Like [`parse_timestamp`], but a bare date means the end of that day.
pub fn parse_end_timestamp(value: &str) -> Result<NaiveDateTime, ParseTimestampError> {
    let end_of_day = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
        .ok_or_else(|| ParseTimestampError(value.to_string()))?;
    parse_timestamp_or_day(value, end_of_day)
}

fn parse_timestamp_or_day(
    value: &str,
    day_time: NaiveTime,
) -> Result<NaiveDateTime, ParseTimestampError> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Local).naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(day_time))
        .map_err(|_| ParseTimestampError(value.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum UpstreamPayload {
    Groups(Vec<UpstreamGroup>),
    Wrapped { data: Vec<UpstreamGroup> },
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpstreamGroup {
    waste_type: String,
    total_amount: f64,
    #[serde(default)]
    records: Option<Vec<UpstreamRecord>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpstreamRecord {
    id: i64,
    #[serde(rename = "type", default)]
    waste_type: Option<String>,
    amount: f64,
    date: String,
}

impl UpstreamPayload {
    /// Converts the wire shape, skipping groups and records that cannot be
    /// trusted (unknown categories, negative amounts, unreadable dates).
    pub(crate) fn into_groups(self) -> Vec<WasteCategoryGroup> {
        let groups = match self {
            UpstreamPayload::Groups(groups) => groups,
            UpstreamPayload::Wrapped { data } => data,
        };

        groups.into_iter().filter_map(convert_group).collect()
    }
}

fn convert_group(group: UpstreamGroup) -> Option<WasteCategoryGroup> {
    let category = match group.waste_type.parse::<WasteCategory>() {
        Ok(category) => category,
        Err(err) => {
            tracing::warn!(%err, "skipping waste group");
            return None;
        }
    };

    // An empty list carries no more detail than a missing one.
    let upstream_records = match group.records {
        Some(records) if !records.is_empty() => records,
        _ => {
            return Some(WasteCategoryGroup::aggregate_only(
                category,
                group.total_amount,
            ))
        }
    };

    let records: Vec<WasteRecord> = upstream_records
        .into_iter()
        .filter_map(|record| convert_record(category, record))
        .collect();
    if records.is_empty() {
        tracing::warn!(
            group = %category,
            total = group.total_amount,
            "no usable records, keeping upstream total"
        );
        return Some(WasteCategoryGroup::aggregate_only(
            category,
            group.total_amount,
        ));
    }

    let reconciled = WasteCategoryGroup::from_records(category, records);
    if (reconciled.total_amount - group.total_amount).abs() > TOTAL_TOLERANCE {
        tracing::warn!(
            group = %category,
            upstream = group.total_amount,
            records = reconciled.total_amount,
            "upstream total disagrees with its records, using record sum"
        );
    }
    Some(reconciled)
}

const TOTAL_TOLERANCE: f64 = 1e-9;

fn convert_record(category: WasteCategory, record: UpstreamRecord) -> Option<WasteRecord> {
    if let Some(waste_type) = record.waste_type.as_deref() {
        match waste_type.parse::<WasteCategory>() {
            Ok(parsed) if parsed != category => {
                tracing::warn!(
                    id = record.id,
                    record_type = %parsed,
                    group = %category,
                    "record filed under another category, keeping group category"
                );
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(id = record.id, %err, "record has unknown type"),
        }
    }

    if record.amount < 0.0 {
        tracing::warn!(id = record.id, amount = record.amount, "skipping negative amount");
        return None;
    }

    match parse_timestamp(&record.date) {
        Ok(timestamp) => Some(WasteRecord {
            id: record.id,
            category,
            amount: record.amount,
            timestamp,
        }),
        Err(err) => {
            tracing::warn!(id = record.id, %err, "skipping record");
            None
        }
    }
}

pub fn parse_history(json: &str) -> anyhow::Result<Vec<WasteCategoryGroup>> {
    let payload: UpstreamPayload =
        serde_json::from_str(json).context("waste history is not in the expected shape")?;
    Ok(payload.into_groups())
}

pub fn load_json(path: &Path) -> anyhow::Result<Vec<WasteCategoryGroup>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let groups = parse_history(&contents)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    tracing::info!(groups = groups.len(), path = %path.display(), "loaded waste history");
    Ok(groups)
}

pub fn write_json(path: &Path, groups: &[WasteCategoryGroup]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(groups)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Reads a record-level CSV export (`id,type,amount,date`) and groups it by
/// category. Rows with unknown categories or negative amounts are skipped.
pub fn import_csv(csv_path: &Path) -> anyhow::Result<Vec<WasteCategoryGroup>> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        id: i64,
        #[serde(rename = "type")]
        waste_type: String,
        amount: f64,
        date: String,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut by_category: BTreeMap<WasteCategory, Vec<WasteRecord>> = BTreeMap::new();
    let mut skipped = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let category = match row.waste_type.parse::<WasteCategory>() {
            Ok(category) => category,
            Err(err) => {
                tracing::warn!(id = row.id, %err, "skipping csv row");
                skipped += 1;
                continue;
            }
        };
        if row.amount < 0.0 {
            tracing::warn!(id = row.id, amount = row.amount, "skipping negative amount");
            skipped += 1;
            continue;
        }
        let timestamp = parse_timestamp(&row.date)
            .with_context(|| format!("invalid date on row {}", row.id))?;

        by_category.entry(category).or_default().push(WasteRecord {
            id: row.id,
            category,
            amount: row.amount,
            timestamp,
        });
    }

    if skipped > 0 {
        tracing::info!(skipped, "ignored csv rows");
    }

    Ok(by_category
        .into_iter()
        .map(|(category, records)| WasteCategoryGroup::from_records(category, records))
        .collect())
}

/// A small history relative to `now`: detailed plastic, paper and glass
/// records plus an aggregate-only electronic total.
pub fn sample_history(now: NaiveDateTime) -> Vec<WasteCategoryGroup> {
    let entries = [
        (1, WasteCategory::Plastic, 0, 2.5),
        (2, WasteCategory::Plastic, 3, 1.5),
        (3, WasteCategory::Plastic, 10, 3.0),
        (4, WasteCategory::Plastic, 45, 2.0),
        (5, WasteCategory::Plastic, 400, 5.0),
        (6, WasteCategory::Paper, 1, 4.0),
        (7, WasteCategory::Paper, 33, 1.0),
        (8, WasteCategory::Glass, 20, 3.0),
    ];

    let mut by_category: BTreeMap<WasteCategory, Vec<WasteRecord>> = BTreeMap::new();
    for (id, category, days_ago, amount) in entries {
        by_category.entry(category).or_default().push(WasteRecord {
            id,
            category,
            amount,
            timestamp: now - Duration::days(days_ago),
        });
    }

    let mut groups: Vec<WasteCategoryGroup> = by_category
        .into_iter()
        .map(|(category, records)| WasteCategoryGroup::from_records(category, records))
        .collect();
    groups.push(WasteCategoryGroup::aggregate_only(
        WasteCategory::Electronic,
        1.2,
    ));
    groups
}
