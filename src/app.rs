//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - runs the merge or reporting workflow
//! - prints tables, charts or JSON to stdout

use chrono::{Local, NaiveDate};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{DateWindow, RowFilter, reports_used};
use crate::cli::{CheckArgs, Cli, Command, FilterArgs, MergeArgs, PathArgs, ReportArgs, TrendArgs};
use crate::config::StorePaths;
use crate::domain::{ProvenanceKey, REPORT_DATE_FORMAT};
use crate::error::AppError;
use crate::store::{CombinedDataset, DownloadLedger};

pub mod pipeline;

/// Entry point for the `saleyard` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    crate::logging::init_logging(cli.verbose, cli.quiet);

    let paths = store_paths_from_args(&cli.paths);
    debug!(?paths, "resolved paths");

    match cli.command {
        Command::Merge(args) => handle_merge(&paths, args),
        Command::Report(args) => handle_report(&paths, args),
        Command::Trend(args) => handle_trend(&paths, args),
        Command::Used(args) => handle_used(&paths, args),
        Command::Check(args) => handle_check(&paths, args),
    }
}

pub fn store_paths_from_args(args: &PathArgs) -> StorePaths {
    StorePaths::under(&args.data_dir)
        .with_downloads(args.downloads.clone())
        .with_history(args.history.clone())
}

/// Build the row filter. Without explicit saleyards, the user's favourites
/// (if any) are used.
pub fn row_filter_from_args(
    args: &FilterArgs,
    paths: &StorePaths,
    today: NaiveDate,
) -> Result<RowFilter, AppError> {
    let saleyards = match (&args.user, args.saleyards.is_empty()) {
        (Some(user), true) => {
            let favourites = crate::io::load_favourites(&paths.favourites, user)?;
            if !favourites.is_empty() {
                info!(user, saleyards = ?favourites, "using favourite saleyards");
            }
            favourites
        }
        _ => args.saleyards.clone(),
    };

    Ok(RowFilter::default()
        .with_window(DateWindow {
            as_of: args.as_of.unwrap_or(today),
            days: args.days,
        })
        .with_saleyards(saleyards)
        .with_categories(&args.categories)
        .with_weight_ranges(&args.weight_ranges)
        .with_sale_prefixes(&args.sale_prefixes))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::new(2, format!("Failed to serialize output: {e}")))?;
    println!("{json}");
    Ok(())
}

fn handle_merge(paths: &StorePaths, args: MergeArgs) -> Result<(), AppError> {
    let run = pipeline::run_merge(paths, !args.no_workbook)?;

    println!(
        "Merged {} report(s), {} already ingested, {} skipped; {} archived.",
        run.merged.len(),
        run.already_ingested.len(),
        run.failed.len(),
        run.archived.len()
    );
    for (path, reason) in &run.failed {
        println!("  skipped {}: {reason}", path.display());
    }
    println!("Combined dataset: {} row(s).", run.dataset_rows);
    if let Some(summary) = &run.workbook {
        println!(
            "Workbook {}: {} sheet(s), {} category sheet(s) skipped.",
            paths.workbook.display(),
            summary.sheets.len(),
            summary.skipped.len()
        );
    }
    Ok(())
}

fn handle_report(paths: &StorePaths, args: ReportArgs) -> Result<(), AppError> {
    let dataset = CombinedDataset::load(&paths.dataset)?;
    let filter = row_filter_from_args(&args.filters, paths, today())?;
    let pivot = pipeline::run_report(&dataset, &filter)?;

    if args.json {
        print_json(&pivot)?;
    } else {
        println!("{}", crate::report::format_pivot(&pivot));
    }

    if let Some(path) = &args.export {
        let summary = pipeline::export_report(path, &dataset, &filter, args.include_all_filters)?;
        eprintln!("Exported {} sheet(s) to {}", summary.sheets.len(), path.display());
    }
    Ok(())
}

fn handle_trend(paths: &StorePaths, args: TrendArgs) -> Result<(), AppError> {
    let dataset = CombinedDataset::load(&paths.dataset)?;
    let filter = row_filter_from_args(&args.filters, paths, today())?;
    let trend = pipeline::run_trend(&dataset, &filter)?;

    if args.json {
        return print_json(&trend);
    }

    for metric in &args.metrics {
        println!("{}", metric.display_name());
        println!("{}", crate::report::format_trend_table(&trend, *metric));
        if !args.no_chart {
            println!(
                "{}",
                crate::plot::render_trend_chart(
                    &trend,
                    *metric,
                    usize::from(args.width),
                    usize::from(args.height),
                )
            );
        }
    }
    Ok(())
}

fn handle_used(paths: &StorePaths, args: FilterArgs) -> Result<(), AppError> {
    let dataset = CombinedDataset::load(&paths.dataset)?;
    let filter = row_filter_from_args(&args, paths, today())?;
    let rows = pipeline::filtered_rows(&dataset, &filter)?;
    println!("{}", crate::report::format_reports_used(&reports_used(&rows)));
    Ok(())
}

fn handle_check(paths: &StorePaths, args: CheckArgs) -> Result<(), AppError> {
    let ledger = DownloadLedger::load(&paths.ledger)?;
    let key = ProvenanceKey::new(args.saleyard.trim(), args.date);
    let date = args.date.format(REPORT_DATE_FORMAT);

    if ledger.contains(&key) {
        println!("{} {date}: already ingested", key.saleyard);
        Ok(())
    } else {
        Err(AppError::new(1, format!("{} {date}: not ingested", key.saleyard)))
    }
}
