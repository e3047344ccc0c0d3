use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use waste_filter::config::{self, ApiConfig};
use waste_filter::fetch::HistoryClient;
use waste_filter::filter::FilterSelection;
use waste_filter::models::{WasteCategory, WasteCategoryGroup};
use waste_filter::range::TimeRange;
use waste_filter::report;
use waste_filter::source::{self, parse_end_timestamp, parse_timestamp};
use waste_filter::state::FilterState;

#[derive(Parser)]
#[command(name = "waste-filter")]
#[command(about = "Filter and summarize a waste-tracking history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print per-category totals for a filter selection
    Filter {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        /// Print the filtered groups as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write the built-in sample history as JSON
    Sample {
        #[arg(long, default_value = "waste-history.json")]
        out: PathBuf,
    },
    /// Convert a record-level CSV export into history JSON
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "waste-history.json")]
        out: PathBuf,
    },
}

/// Where the waste history comes from. Falls back to `WASTE_API_URL`.
#[derive(Args, Debug, Default)]
#[group(multiple = false)]
struct SourceArgs {
    /// History JSON file
    #[arg(long)]
    file: Option<PathBuf>,
    /// Record-level CSV export
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Upstream endpoint returning history JSON
    #[arg(long)]
    url: Option<String>,
    /// Use the built-in sample history
    #[arg(long)]
    sample: bool,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// day, week, month, year, all or custom
    #[arg(long, default_value = "all")]
    range: String,
    /// Start of a custom window
    #[arg(long, value_parser = parse_timestamp)]
    from: Option<NaiveDateTime>,
    /// End of a custom window; a bare date includes that whole day
    #[arg(long, value_parser = parse_end_timestamp)]
    to: Option<NaiveDateTime>,
    /// Category to include; repeat for more. Defaults to every category
    #[arg(long = "category")]
    categories: Vec<WasteCategory>,
}

impl FilterArgs {
    fn selection(&self) -> FilterSelection {
        let time_range = if self.from.is_some() || self.to.is_some() {
            TimeRange::Custom {
                start: self.from,
                end: self.to,
            }
        } else {
            TimeRange::from_label(&self.range)
        };

        if self.categories.is_empty() {
            FilterSelection {
                time_range,
                ..FilterSelection::default()
            }
        } else {
            FilterSelection::new(time_range, self.categories.iter().copied())
        }
    }
}

async fn load_history(
    args: SourceArgs,
    now: NaiveDateTime,
) -> anyhow::Result<Vec<WasteCategoryGroup>> {
    if let Some(path) = args.file {
        return source::load_json(&path);
    }
    if let Some(path) = args.csv {
        return source::import_csv(&path);
    }
    if args.sample {
        return Ok(source::sample_history(now));
    }

    let config = ApiConfig::from_env()?.with_url(args.url);
    if config.url.is_none() {
        anyhow::bail!(
            "no history source given; pass --file, --csv, --url or --sample, or set {}",
            config::API_URL_VAR
        );
    }
    let client = HistoryClient::new(&config)?;
    client
        .fetch_latest()
        .await?
        .context("waste history fetch was superseded")
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "waste_filter=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let now = Local::now().naive_local();

    match cli.command {
        Commands::Filter {
            source,
            filter,
            json,
        } => {
            let groups = load_history(source, now).await?;
            let mut state = FilterState::new();
            state.apply_filters(filter.selection());

            let filtered = state.filtered(&groups, now);
            if json {
                println!("{}", serde_json::to_string_pretty(&filtered)?);
            } else {
                let summary = state.summary(&groups, now);
                print!("{}", report::format_totals(&filtered, &summary));
            }
        }
        Commands::Report {
            source,
            filter,
            out,
        } => {
            let groups = load_history(source, now).await?;
            let mut state = FilterState::new();
            state.apply_filters(filter.selection());

            let filtered = state.filtered(&groups, now);
            let report = report::build_report(&filtered, state.selection(), now);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Sample { out } => {
            let groups = source::sample_history(now);
            source::write_json(&out, &groups)?;
            println!("Sample history written to {}.", out.display());
        }
        Commands::Import { csv, out } => {
            let groups = source::import_csv(&csv)?;
            source::write_json(&out, &groups)?;
            let records: usize = groups.iter().map(WasteCategoryGroup::record_count).sum();
            println!(
                "Imported {records} records in {} categories from {}.",
                groups.len(),
                csv.display()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_args(args: &[&str]) -> FilterArgs {
        let mut argv = vec!["waste-filter", "filter", "--sample"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Filter { filter, .. } => filter,
            _ => unreachable!("parsed a filter command"),
        }
    }

    #[test]
    fn defaults_to_unfiltered_selection() {
        let selection = filter_args(&[]).selection();
        assert_eq!(selection, FilterSelection::default());
        assert!(!selection.is_active());
    }

    #[test]
    fn maps_range_and_categories() {
        let selection =
            filter_args(&["--range", "week", "--category", "glass", "--category", "PLASTIC"])
                .selection();
        assert_eq!(selection.time_range, TimeRange::Week);
        assert_eq!(
            selection.categories.into_iter().collect::<Vec<_>>(),
            vec![WasteCategory::Plastic, WasteCategory::Glass]
        );
    }

    #[test]
    fn dates_imply_custom_range() {
        let selection = filter_args(&["--from", "2024-06-01", "--to", "2024-06-10"]).selection();
        let TimeRange::Custom { start, end } = selection.time_range else {
            panic!("expected a custom range, got {:?}", selection.time_range);
        };
        assert_eq!(start, parse_timestamp("2024-06-01").ok());
        assert_eq!(end, parse_end_timestamp("2024-06-10").ok());
    }

    #[test]
    fn unknown_range_falls_back_to_all() {
        let selection = filter_args(&["--range", "decade"]).selection();
        assert_eq!(selection.time_range, TimeRange::All);
    }

    #[test]
    fn rejects_unknown_categories_and_multiple_sources() {
        assert!(Cli::try_parse_from(["waste-filter", "filter", "--category", "textile"]).is_err());
        assert!(
            Cli::try_parse_from(["waste-filter", "filter", "--sample", "--file", "a.json"])
                .is_err()
        );
    }

    #[tokio::test]
    async fn loads_sample_source() {
        let now = Local::now().naive_local();
        let args = SourceArgs {
            sample: true,
            ..SourceArgs::default()
        };
        let groups = load_history(args, now).await.unwrap();
        assert_eq!(groups, source::sample_history(now));
    }
}
