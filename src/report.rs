use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::filter::{summarize, FilterSelection};
use crate::models::{FilterSummary, WasteCategory, WasteCategoryGroup, WasteRecord};
use crate::range::{resolve_bounds, TimeRange};

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub category: WasteCategory,
    pub total_amount: f64,
    pub record_count: usize,
    pub share_pct: f64,
}

/// Per-category shares of the filtered total, largest first.
pub fn category_shares(filtered: &[WasteCategoryGroup]) -> Vec<CategoryShare> {
    let grand_total: f64 = filtered
        .iter()
        .fold(0.0, |total, group| total + group.total_amount);

    let mut shares: Vec<CategoryShare> = filtered
        .iter()
        .map(|group| CategoryShare {
            category: group.category,
            total_amount: group.total_amount,
            record_count: group.record_count(),
            share_pct: if grand_total > 0.0 {
                group.total_amount / grand_total * 100.0
            } else {
                0.0
            },
        })
        .collect();

    shares.sort_by(|a, b| {
        b.total_amount
            .partial_cmp(&a.total_amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    shares
}

fn count_records(count: usize) -> String {
    if count == 1 {
        "1 record".to_string()
    } else {
        format!("{count} records")
    }
}

fn describe_window(range: TimeRange, now: NaiveDateTime) -> String {
    let bounds = resolve_bounds(range, now);
    let stamp = |value: NaiveDateTime| value.format("%Y-%m-%d %H:%M").to_string();
    match (bounds.start, bounds.end) {
        (None, None) => "all time".to_string(),
        (Some(start), None) => format!("since {}", stamp(start)),
        (None, Some(end)) => format!("until {}", stamp(end)),
        (Some(start), Some(end)) => format!("{} to {}", stamp(start), stamp(end)),
    }
}

/// Plain-text totals for the terminal, one line per visible category.
pub fn format_totals(filtered: &[WasteCategoryGroup], summary: &FilterSummary) -> String {
    let mut output = String::new();

    for group in filtered {
        let detail = match &group.records {
            Some(records) => count_records(records.len()),
            None => "aggregate".to_string(),
        };
        let _ = writeln!(
            output,
            "{:<14} {:>10.1} g  ({})",
            group.category.code(),
            group.total_amount,
            detail
        );
    }

    let _ = write!(output, "{}", summary.selection_line());
    if summary.active {
        let _ = write!(output, " (filters active)");
    }
    let _ = writeln!(output);
    output
}

pub fn build_report(
    filtered: &[WasteCategoryGroup],
    selection: &FilterSelection,
    now: NaiveDateTime,
) -> String {
    let summary = summarize(filtered, selection);
    let shares = category_shares(filtered);

    let mut output = String::new();

    let _ = writeln!(output, "# Waste History Report");
    let _ = writeln!(output, "Generated {}", now.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(
        output,
        "Window: {} ({} range)",
        describe_window(selection.time_range, now),
        selection.time_range.label()
    );
    let _ = writeln!(output);
    let mut selection_line = summary.selection_line();
    if summary.active {
        selection_line.push_str(" (filters active)");
    }
    let _ = writeln!(output, "{selection_line}");
    let _ = writeln!(
        output,
        "Total: {:.1} g across {}",
        summary.total_amount,
        count_records(summary.record_count)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Mix");

    if shares.is_empty() {
        let _ = writeln!(output, "No waste recorded for this selection.");
    } else {
        for share in shares.iter() {
            let _ = writeln!(
                output,
                "- {}: {:.1} g ({:.0}%, {})",
                share.category.label(),
                share.total_amount,
                share.share_pct,
                count_records(share.record_count)
            );
        }
    }

    let mut recent_records: Vec<&WasteRecord> = filtered
        .iter()
        .filter_map(|group| group.records.as_ref())
        .flatten()
        .collect();
    recent_records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Records");

    if recent_records.is_empty() {
        let _ = writeln!(output, "No individual records in this window.");
    } else {
        for record in recent_records.iter().take(5) {
            let _ = writeln!(
                output,
                "- #{} {} {:.1} g on {}",
                record.id,
                record.category.label(),
                record.amount,
                record.timestamp.format("%Y-%m-%d")
            );
        }
    }

    output
}
