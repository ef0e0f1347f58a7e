//! Formatted terminal output: pivot tables, weekly trends, reports used.
//!
//! Aggregation runs at full precision; rounding to two decimals happens only
//! here, at presentation time.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::aggregate::{Pivot, WeeklyTrend};
use crate::domain::Metric;

/// Two decimals with `,` thousands separators (`1234567.891` → `1,234,567.89`).
pub fn format_thousands(v: f64) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // "-0.00" reads as noise; only show the sign when something survives rounding.
    let sign = if v < 0.0 && fixed.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}

/// Format the weight-range pivot as a fixed-width table.
pub fn format_pivot(pivot: &Pivot) -> String {
    let labels: Vec<&str> = pivot.all_rows().map(|r| r.weight_range.as_str()).collect();
    let label_width = labels
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once("Weight Range".len()))
        .max()
        .unwrap_or(12);

    let mut out = String::new();
    out.push_str(
        format!(
            "{:<label_width$} {:>18} {:>18} {:>18}",
            "Weight Range",
            Metric::LiveWeight.display_name(),
            Metric::CentsPerKg.display_name(),
            Metric::DollarsPerHead.display_name(),
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!("{:-<label_width$} {:-<18} {:-<18} {:-<18}\n", "", "", "", ""));

    for row in pivot.all_rows() {
        out.push_str(&format!(
            "{:<label_width$} {:>18} {:>18} {:>18}\n",
            row.weight_range,
            format_thousands(row.metrics.live_weight),
            format_thousands(row.metrics.cents_per_kg),
            format_thousands(row.metrics.dollars_per_head),
        ));
    }

    out
}

/// Format one metric of the weekly trend as a week × weight-range table.
pub fn format_trend_table(trend: &WeeklyTrend, metric: Metric) -> String {
    let ranges = trend.weight_ranges();
    let widths: Vec<usize> = ranges.iter().map(|r| r.chars().count().max(12)).collect();

    let mut out = String::new();
    out.push_str(&format!("{} – Weekly Average by Weight Range\n", metric.display_name()));

    let mut header = format!("{:<10}", "Week");
    for (range, width) in ranges.iter().zip(&widths) {
        header.push_str(&format!(" {range:>width$}"));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for week in trend.weeks() {
        let mut line = week.format("%Y-%m-%d").to_string();
        for (range, width) in ranges.iter().zip(&widths) {
            let cell = trend
                .value(week, range, metric)
                .map(format_thousands)
                .unwrap_or_default();
            line.push_str(&format!(" {cell:>width$}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// `1 January 2024` style date.
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

/// One line per saleyard listing the report dates that fed the view.
pub fn format_reports_used(used: &BTreeMap<String, BTreeSet<NaiveDate>>) -> String {
    let width = used
        .keys()
        .map(|k| k.chars().count())
        .chain(std::iter::once("Saleyard".len()))
        .max()
        .unwrap_or(8);

    let mut out = format!("{:<width$} Report Dates\n", "Saleyard");
    out.push_str(&format!("{:-<width$} {:-<12}\n", "", ""));
    for (saleyard, dates) in used {
        let dates: Vec<String> = dates.iter().map(|d| format_long_date(*d)).collect();
        out.push_str(&format!("{saleyard:<width$} {}\n", dates.join(", ")));
    }
    out
}
