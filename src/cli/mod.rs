//! Command-line parsing for the saleyard report pipeline.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! ingest/aggregation code. `app` turns these structs into store paths and
//! row filters.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{Metric, REPORT_DATE_FORMAT};

/// Upper bound for `--days`: a century.
const MAX_DAYS: i64 = 36_500;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "saleyard", version, about = "Merge and analyse saleyard price reports")]
pub struct Cli {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest new raw reports, update ledger and combined dataset, write the workbook.
    Merge(MergeArgs),
    /// Print the weighted pivot by weight range; optionally export a workbook.
    Report(ReportArgs),
    /// Weekly weighted averages by weight range since 1 Jan 2024.
    Trend(TrendArgs),
    /// List the saleyard reports behind the current filters.
    Used(FilterArgs),
    /// Check whether a (saleyard, report date) pair is already ingested.
    ///
    /// Exits 0 when present and 1 when absent, so a downloader can skip it.
    Check(CheckArgs),
}

/// Where inputs and persisted state live.
#[derive(Debug, Args, Clone)]
pub struct PathArgs {
    /// Root directory for the ledger, combined dataset, workbook and favourites.
    #[arg(long, env = "SALEYARD_DATA_DIR", default_value = ".", global = true)]
    pub data_dir: PathBuf,

    /// Directory the report source downloads into (default: <data-dir>/downloads).
    #[arg(long, env = "SALEYARD_DOWNLOADS_DIR", global = true)]
    pub downloads: Option<PathBuf>,

    /// Directory processed reports are moved to (default: <data-dir>/history).
    #[arg(long, env = "SALEYARD_HISTORY_DIR", global = true)]
    pub history: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct MergeArgs {
    /// Skip writing the formatted workbook.
    #[arg(long)]
    pub no_workbook: bool,
}

/// Row filters shared by the reporting commands.
#[derive(Debug, Args, Clone)]
pub struct FilterArgs {
    /// Only reports from the last N days (1 to 36500).
    #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=MAX_DAYS))]
    pub days: u32,

    /// Reference date for `--days` (DD/MM/YYYY or YYYY-MM-DD; default: today).
    #[arg(long, value_parser = parse_report_date)]
    pub as_of: Option<NaiveDate>,

    /// Saleyard to include (repeatable). Defaults to the user's favourites.
    #[arg(long = "saleyard")]
    pub saleyards: Vec<String>,

    /// Category to include (repeatable).
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Weight range to include (repeatable).
    #[arg(long = "weight-range")]
    pub weight_ranges: Vec<String>,

    /// Sale prefix to include (repeatable).
    #[arg(long = "sale-prefix")]
    pub sale_prefixes: Vec<String>,

    /// User whose favourite saleyards are the default saleyard filter.
    #[arg(long, env = "SALEYARD_USER")]
    pub user: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Export the pivot, rows and per-category sheets to this `.xlsx` file.
    #[arg(long, value_name = "XLSX")]
    pub export: Option<PathBuf>,

    /// Export only rows matching every filter (default: whole reports of the
    /// matching saleyards and dates).
    #[arg(long)]
    pub include_all_filters: bool,

    /// Print the pivot as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct TrendArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Metric(s) to show (repeatable).
    #[arg(long = "metric", value_enum, default_values_t = [Metric::DollarsPerHead])]
    pub metrics: Vec<Metric>,

    /// Disable the terminal chart.
    #[arg(long)]
    pub no_chart: bool,

    /// Chart width (columns, 10 to 500).
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u16).range(10..=500))]
    pub width: u16,

    /// Chart height (rows, 5 to 200).
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u16).range(5..=200))]
    pub height: u16,

    /// Print the weekly points as JSON instead of tables.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct CheckArgs {
    /// Saleyard name as it appears in the ledger.
    #[arg(long)]
    pub saleyard: String,

    /// Report date (DD/MM/YYYY or YYYY-MM-DD).
    #[arg(long, value_parser = parse_report_date)]
    pub date: NaiveDate,
}

/// Accept the ledger's `DD/MM/YYYY` and ISO dates.
pub fn parse_report_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 2] = [REPORT_DATE_FORMAT, "%Y-%m-%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s.trim(), fmt) {
            return Ok(d);
        }
    }
    Err(format!("Invalid date '{s}'. Expected DD/MM/YYYY or YYYY-MM-DD."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_report_with_filters() {
        let cli = Cli::try_parse_from([
            "saleyard",
            "report",
            "--days",
            "30",
            "--saleyard",
            "Scone",
            "--saleyard",
            "Dubbo",
            "--as-of",
            "15/03/2024",
            "--data-dir",
            "/srv/mla",
        ])
        .unwrap();

        assert_eq!(cli.paths.data_dir, PathBuf::from("/srv/mla"));
        let Command::Report(args) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(args.filters.days, 30);
        assert_eq!(args.filters.saleyards, ["Scone", "Dubbo"]);
        assert_eq!(args.filters.as_of, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn trend_defaults_to_dollars_per_head() {
        let cli = Cli::try_parse_from(["saleyard", "trend"]).unwrap();
        let Command::Trend(args) = cli.command else {
            panic!("expected trend command");
        };
        assert_eq!(args.metrics, [Metric::DollarsPerHead]);
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        assert!(Cli::try_parse_from(["saleyard", "report", "--days", "99999999"]).is_err());
        assert!(Cli::try_parse_from(["saleyard", "report", "--days", "0"]).is_err());
        assert!(Cli::try_parse_from(["saleyard", "trend", "--width", "70000"]).is_err());
        assert!(Cli::try_parse_from(["saleyard", "trend", "--height", "100000"]).is_err());

        let cli = Cli::try_parse_from(["saleyard", "report", "--days", "36500"]).unwrap();
        let Command::Report(args) = cli.command else {
            panic!("expected report command");
        };
        assert_eq!(args.filters.days, 36_500);
    }

    #[test]
    fn date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(parse_report_date("02/01/2024"), Ok(d));
        assert_eq!(parse_report_date("2024-01-02"), Ok(d));
        assert!(parse_report_date("Jan 2").is_err());
    }
}
