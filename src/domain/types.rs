//! Shared domain types.
//!
//! These types are kept lightweight so they can be:
//!
//! - built by the ingest parser from raw saleyard exports
//! - merged and persisted by the store
//! - aggregated, rendered and exported by the reporting layers

use std::fmt;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Report dates are persisted (ledger, combined dataset) as `DD/MM/YYYY`.
pub const REPORT_DATE_FORMAT: &str = "%d/%m/%Y";

/// The fixed set of columns understood by the pipeline.
///
/// `Saleyard` and `ReportDate` come from the filename; every other column is
/// allow-listed from the raw export's data table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReportColumn {
    Saleyard,
    ReportDate,
    Category,
    WeightRange,
    SalePrefix,
    HeadCount,
    HeadChange,
    MinLwtCkg,
    MaxLwtCkg,
    AvgLwtCkg,
    AvgLwtChange,
    MinDollarHead,
    MaxDollarHead,
    AvgDollarHead,
}

impl ReportColumn {
    /// Column order of the persisted combined dataset.
    pub const DATASET: [ReportColumn; 14] = [
        ReportColumn::Saleyard,
        ReportColumn::ReportDate,
        ReportColumn::Category,
        ReportColumn::WeightRange,
        ReportColumn::SalePrefix,
        ReportColumn::HeadCount,
        ReportColumn::HeadChange,
        ReportColumn::MinLwtCkg,
        ReportColumn::MaxLwtCkg,
        ReportColumn::AvgLwtCkg,
        ReportColumn::AvgLwtChange,
        ReportColumn::MinDollarHead,
        ReportColumn::MaxDollarHead,
        ReportColumn::AvgDollarHead,
    ];

    /// Columns kept from a raw report's data table, in allow-list order.
    pub const ALLOWED: [ReportColumn; 12] = [
        ReportColumn::Category,
        ReportColumn::WeightRange,
        ReportColumn::SalePrefix,
        ReportColumn::HeadCount,
        ReportColumn::HeadChange,
        ReportColumn::MinLwtCkg,
        ReportColumn::MaxLwtCkg,
        ReportColumn::AvgLwtCkg,
        ReportColumn::AvgLwtChange,
        ReportColumn::MinDollarHead,
        ReportColumn::MaxDollarHead,
        ReportColumn::AvgDollarHead,
    ];

    pub fn header(self) -> &'static str {
        match self {
            ReportColumn::Saleyard => "Saleyard",
            ReportColumn::ReportDate => "Report Date",
            ReportColumn::Category => "Category",
            ReportColumn::WeightRange => "Weight Range",
            ReportColumn::SalePrefix => "Sale Prefix",
            ReportColumn::HeadCount => "Head Count",
            ReportColumn::HeadChange => "Head Change",
            ReportColumn::MinLwtCkg => "Min Lwt c/kg",
            ReportColumn::MaxLwtCkg => "Max Lwt c/kg",
            ReportColumn::AvgLwtCkg => "Avg Lwt c/kg",
            ReportColumn::AvgLwtChange => "Avg Lwt Change",
            ReportColumn::MinDollarHead => "Min $/Head",
            ReportColumn::MaxDollarHead => "Max $/Head",
            ReportColumn::AvgDollarHead => "Avg $/Head",
        }
    }

    /// Resolve a (trimmed) header name to a known column.
    pub fn from_header(name: &str) -> Option<Self> {
        ReportColumn::DATASET
            .into_iter()
            .find(|c| c.header() == name)
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            ReportColumn::Saleyard
            | ReportColumn::ReportDate
            | ReportColumn::Category
            | ReportColumn::WeightRange
            | ReportColumn::SalePrefix => ColumnKind::Text,
            ReportColumn::HeadCount | ReportColumn::HeadChange => ColumnKind::Integer,
            _ => ColumnKind::Decimal,
        }
    }
}

impl fmt::Display for ReportColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// How a column is coerced and formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    /// Whole numbers (head counts); rendered with zero decimals.
    Integer,
    /// Prices and weights; rendered with two decimals.
    Decimal,
}

/// A numeric cell: the exact source text plus its coerced value.
///
/// The text is what gets persisted, so a parse/serialize cycle never reformats
/// or loses precision. `value` is `None` when coercion failed or the cell was
/// empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericCell {
    raw: String,
    value: Option<f64>,
}

impl NumericCell {
    pub fn decimal(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let value = parse_decimal(&raw);
        Self { raw, value }
    }

    /// Integer coercion; `non_negative` rejects values below zero (head counts).
    pub fn integer(raw: impl Into<String>, non_negative: bool) -> Self {
        let raw = raw.into();
        let value = parse_decimal(&raw)
            .filter(|v| v.fract() == 0.0)
            .filter(|v| !non_negative || *v >= 0.0);
        Self { raw, value }
    }

    pub fn for_column(column: ReportColumn, raw: impl Into<String>) -> Self {
        match column {
            ReportColumn::HeadCount => Self::integer(raw, true),
            ReportColumn::HeadChange => Self::integer(raw, false),
            _ => Self::decimal(raw),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// True when the cell holds text that could not be coerced.
    pub fn is_coercion_failure(&self) -> bool {
        self.value.is_none() && !self.raw.trim().is_empty()
    }
}

fn parse_decimal(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// One priced category/weight-range observation from a saleyard report.
///
/// Every field is optional: a column missing from the source export is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportRow {
    pub category: Option<String>,
    pub weight_range: Option<String>,
    pub sale_prefix: Option<String>,
    pub head_count: Option<NumericCell>,
    pub head_change: Option<NumericCell>,
    pub min_lwt_ckg: Option<NumericCell>,
    pub max_lwt_ckg: Option<NumericCell>,
    pub avg_lwt_ckg: Option<NumericCell>,
    pub avg_lwt_change: Option<NumericCell>,
    pub min_dollar_head: Option<NumericCell>,
    pub max_dollar_head: Option<NumericCell>,
    pub avg_dollar_head: Option<NumericCell>,
}

impl ReportRow {
    /// Set a column from its source text.
    ///
    /// An empty cell leaves the column absent, exactly as a reloaded dataset
    /// row would have it. `Saleyard` and `ReportDate` are provenance, not row
    /// data, and are ignored.
    pub fn set(&mut self, column: ReportColumn, raw: &str) {
        let present = !raw.is_empty();
        let text = || present.then(|| raw.to_string());
        let num = || present.then(|| NumericCell::for_column(column, raw));
        match column {
            ReportColumn::Saleyard | ReportColumn::ReportDate => {}
            ReportColumn::Category => self.category = text(),
            ReportColumn::WeightRange => self.weight_range = text(),
            ReportColumn::SalePrefix => self.sale_prefix = text(),
            ReportColumn::HeadCount => self.head_count = num(),
            ReportColumn::HeadChange => self.head_change = num(),
            ReportColumn::MinLwtCkg => self.min_lwt_ckg = num(),
            ReportColumn::MaxLwtCkg => self.max_lwt_ckg = num(),
            ReportColumn::AvgLwtCkg => self.avg_lwt_ckg = num(),
            ReportColumn::AvgLwtChange => self.avg_lwt_change = num(),
            ReportColumn::MinDollarHead => self.min_dollar_head = num(),
            ReportColumn::MaxDollarHead => self.max_dollar_head = num(),
            ReportColumn::AvgDollarHead => self.avg_dollar_head = num(),
        }
    }

    pub fn text(&self, column: ReportColumn) -> Option<&str> {
        match column {
            ReportColumn::Category => self.category.as_deref(),
            ReportColumn::WeightRange => self.weight_range.as_deref(),
            ReportColumn::SalePrefix => self.sale_prefix.as_deref(),
            _ => self.numeric(column).map(NumericCell::raw),
        }
    }

    pub fn numeric(&self, column: ReportColumn) -> Option<&NumericCell> {
        match column {
            ReportColumn::HeadCount => self.head_count.as_ref(),
            ReportColumn::HeadChange => self.head_change.as_ref(),
            ReportColumn::MinLwtCkg => self.min_lwt_ckg.as_ref(),
            ReportColumn::MaxLwtCkg => self.max_lwt_ckg.as_ref(),
            ReportColumn::AvgLwtCkg => self.avg_lwt_ckg.as_ref(),
            ReportColumn::AvgLwtChange => self.avg_lwt_change.as_ref(),
            ReportColumn::MinDollarHead => self.min_dollar_head.as_ref(),
            ReportColumn::MaxDollarHead => self.max_dollar_head.as_ref(),
            ReportColumn::AvgDollarHead => self.avg_dollar_head.as_ref(),
            _ => None,
        }
    }

    /// Coerced value of a numeric column (`None` when absent or missing).
    pub fn value(&self, column: ReportColumn) -> Option<f64> {
        self.numeric(column).and_then(NumericCell::value)
    }

    /// Columns whose text failed numeric coercion.
    pub fn coercion_failures(&self) -> Vec<(ReportColumn, &str)> {
        ReportColumn::ALLOWED
            .into_iter()
            .filter_map(|c| {
                let cell = self.numeric(c)?;
                cell.is_coercion_failure().then_some((c, cell.raw()))
            })
            .collect()
    }
}

/// The (saleyard, report date) pair that identifies one raw report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProvenanceKey {
    pub saleyard: String,
    pub report_date: NaiveDate,
}

impl ProvenanceKey {
    pub fn new(saleyard: impl Into<String>, report_date: NaiveDate) -> Self {
        Self {
            saleyard: saleyard.into(),
            report_date,
        }
    }
}

impl fmt::Display for ProvenanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {}",
            self.saleyard,
            self.report_date.format(REPORT_DATE_FORMAT)
        )
    }
}

/// A report row tagged with the report it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub saleyard: String,
    pub report_date: NaiveDate,
    pub row: ReportRow,
}

impl DatasetRow {
    pub fn new(key: &ProvenanceKey, row: ReportRow) -> Self {
        Self {
            saleyard: key.saleyard.clone(),
            report_date: key.report_date,
            row,
        }
    }

    /// Cell text as persisted; absent columns render as empty.
    pub fn cell(&self, column: ReportColumn) -> String {
        match column {
            ReportColumn::Saleyard => self.saleyard.clone(),
            ReportColumn::ReportDate => self.report_date.format(REPORT_DATE_FORMAT).to_string(),
            other => self.row.text(other).unwrap_or_default().to_string(),
        }
    }

    /// The full persisted record, in dataset column order.
    ///
    /// Two rows are duplicates exactly when their records are equal.
    pub fn record(&self) -> Vec<String> {
        ReportColumn::DATASET.into_iter().map(|c| self.cell(c)).collect()
    }

    pub fn head_count(&self) -> Option<f64> {
        self.row.value(ReportColumn::HeadCount)
    }

    pub fn avg_lwt_ckg(&self) -> Option<f64> {
        self.row.value(ReportColumn::AvgLwtCkg)
    }

    pub fn avg_dollar_head(&self) -> Option<f64> {
        self.row.value(ReportColumn::AvgDollarHead)
    }
}

/// The three head-count-weighted metrics shown in pivots and trends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    /// Weighted average live weight index.
    #[value(name = "lw")]
    LiveWeight,
    /// Weighted average c/kg live weight.
    #[value(name = "ckg")]
    CentsPerKg,
    /// Weighted average $/head.
    #[value(name = "head")]
    DollarsPerHead,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::LiveWeight, Metric::CentsPerKg, Metric::DollarsPerHead];

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::LiveWeight => "Sum of Av LW",
            Metric::CentsPerKg => "Sum of Av c/kg LW",
            Metric::DollarsPerHead => "Sum of Av $/hd",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_count_rejects_negative_and_fractional() {
        assert_eq!(NumericCell::integer("12", true).value(), Some(12.0));
        assert_eq!(NumericCell::integer("12.0", true).value(), Some(12.0));
        assert!(NumericCell::integer("-3", true).is_coercion_failure());
        assert!(NumericCell::integer("2.5", true).is_coercion_failure());
        assert_eq!(NumericCell::integer("-3", false).value(), Some(-3.0));
    }

    #[test]
    fn empty_cell_is_missing_but_not_a_failure() {
        let cell = NumericCell::decimal("  ");
        assert_eq!(cell.value(), None);
        assert!(!cell.is_coercion_failure());
        assert!(NumericCell::decimal("n/a").is_coercion_failure());
    }

    #[test]
    fn record_keeps_source_text() {
        let key = ProvenanceKey::new("Scone", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let mut row = ReportRow::default();
        row.set(ReportColumn::Category, "Yearling Steer");
        row.set(ReportColumn::AvgLwtCkg, "350.10");

        let record = DatasetRow::new(&key, row).record();
        assert_eq!(record[0], "Scone");
        assert_eq!(record[1], "01/01/2024");
        assert_eq!(record[2], "Yearling Steer");
        assert_eq!(record[3], "");
        assert_eq!(record[9], "350.10");
    }

    #[test]
    fn empty_cells_stay_absent() {
        let mut row = ReportRow::default();
        row.set(ReportColumn::WeightRange, "");
        row.set(ReportColumn::HeadCount, "");
        assert!(row.weight_range.is_none());
        assert!(row.head_count.is_none());

        row.set(ReportColumn::WeightRange, "400+");
        row.set(ReportColumn::WeightRange, "");
        assert!(row.weight_range.is_none());
    }

    #[test]
    fn header_lookup_is_exact() {
        assert_eq!(ReportColumn::from_header("Avg $/Head"), Some(ReportColumn::AvgDollarHead));
        assert_eq!(ReportColumn::from_header("Dressing %"), None);
    }
}
