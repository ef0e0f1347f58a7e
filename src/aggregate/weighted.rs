//! Head-count-weighted averages and the weight-range pivot.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{DatasetRow, Metric};

/// Label of the ungrouped row appended to every pivot.
pub const GRAND_TOTAL: &str = "Grand Total";

/// The three weighted metrics for one group of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeightedMetrics {
    /// Σ(avg $/head ÷ avg c/kg × head) / Σhead × 100.
    pub live_weight: f64,
    /// Σ(avg c/kg × head) / Σhead / 100.
    pub cents_per_kg: f64,
    /// Σ(avg $/head × head) / Σhead.
    pub dollars_per_head: f64,
}

impl WeightedMetrics {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::LiveWeight => self.live_weight,
            Metric::CentsPerKg => self.cents_per_kg,
            Metric::DollarsPerHead => self.dollars_per_head,
        }
    }
}

/// Running numerators and the head-count denominator for one group.
///
/// A term only contributes when every input it needs is present and the
/// result is finite, so missing cells never poison a group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedSums {
    head: f64,
    live_weight: f64,
    cents_per_kg: f64,
    dollars_per_head: f64,
}

impl WeightedSums {
    pub fn add(&mut self, row: &DatasetRow) {
        let Some(head) = row.head_count() else {
            return;
        };
        self.head += head;

        let ckg = row.avg_lwt_ckg();
        let dollars = row.avg_dollar_head();

        if let (Some(d), Some(c)) = (dollars, ckg) {
            add_finite(&mut self.live_weight, d / c * head);
        }
        if let Some(c) = ckg {
            add_finite(&mut self.cents_per_kg, c * head);
        }
        if let Some(d) = dollars {
            add_finite(&mut self.dollars_per_head, d * head);
        }
    }

    pub fn head_total(&self) -> f64 {
        self.head
    }

    /// Finish the group. A zero head total yields all-zero metrics.
    pub fn metrics(&self) -> WeightedMetrics {
        if self.head == 0.0 {
            return WeightedMetrics::default();
        }
        WeightedMetrics {
            live_weight: self.live_weight / self.head * 100.0,
            cents_per_kg: self.cents_per_kg / self.head / 100.0,
            dollars_per_head: self.dollars_per_head / self.head,
        }
    }
}

fn add_finite(acc: &mut f64, term: f64) {
    if term.is_finite() {
        *acc += term;
    }
}

pub fn weighted_metrics<'a>(rows: impl IntoIterator<Item = &'a DatasetRow>) -> WeightedMetrics {
    let mut sums = WeightedSums::default();
    for row in rows {
        sums.add(row);
    }
    sums.metrics()
}

/// One line of the pivot table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub weight_range: String,
    pub head_count: f64,
    #[serde(flatten)]
    pub metrics: WeightedMetrics,
}

/// Weighted metrics per weight range (sorted by label) plus a grand total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pivot {
    pub rows: Vec<PivotRow>,
    pub grand_total: PivotRow,
}

impl Pivot {
    /// Group rows followed by the grand total.
    pub fn all_rows(&self) -> impl Iterator<Item = &PivotRow> {
        self.rows.iter().chain(std::iter::once(&self.grand_total))
    }
}

/// Build the weight-range pivot.
///
/// Rows without a weight range only count towards the grand total.
pub fn pivot_by_weight_range(rows: &[&DatasetRow]) -> Pivot {
    let mut groups: BTreeMap<&str, WeightedSums> = BTreeMap::new();
    let mut total = WeightedSums::default();

    for row in rows {
        total.add(row);
        if let Some(range) = row.row.weight_range.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            groups.entry(range).or_default().add(row);
        }
    }

    let rows = groups
        .into_iter()
        .map(|(range, sums)| PivotRow {
            weight_range: range.to_string(),
            head_count: sums.head_total(),
            metrics: sums.metrics(),
        })
        .collect();

    Pivot {
        rows,
        grand_total: PivotRow {
            weight_range: GRAND_TOTAL.to_string(),
            head_count: total.head_total(),
            metrics: total.metrics(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::domain::{ProvenanceKey, ReportColumn, ReportRow};

    fn row(range: &str, head: &str, ckg: &str, dollars: &str) -> DatasetRow {
        let key = ProvenanceKey::new("Scone", NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        let mut r = ReportRow::default();
        r.set(ReportColumn::WeightRange, range);
        r.set(ReportColumn::HeadCount, head);
        r.set(ReportColumn::AvgLwtCkg, ckg);
        r.set(ReportColumn::AvgDollarHead, dollars);
        DatasetRow::new(&key, r)
    }

    #[test]
    fn weighted_example() {
        let rows = [row("A", "2", "5", "10"), row("A", "3", "7", "14")];
        let m = weighted_metrics(&rows);
        assert!((m.cents_per_kg - 0.062).abs() < 1e-12);
        assert!((m.dollars_per_head - 12.4).abs() < 1e-12);
        // ((10/5)*2 + (14/7)*3) / 5 * 100
        assert!((m.live_weight - 200.0).abs() < 1e-9);
    }

    #[test]
    fn zero_head_total_is_all_zero() {
        let rows = [row("A", "0", "5", "10"), row("A", "0", "7", "14")];
        assert_eq!(weighted_metrics(&rows), WeightedMetrics::default());
        assert_eq!(weighted_metrics(std::iter::empty()), WeightedMetrics::default());
    }

    #[test]
    fn missing_inputs_do_not_contribute() {
        let rows = [row("A", "2", "5", "10"), row("A", "3", "", "n/a")];
        let m = weighted_metrics(&rows);
        // Head count still counts towards the denominator.
        assert!((m.dollars_per_head - 4.0).abs() < 1e-12);
        assert!((m.cents_per_kg - 0.02).abs() < 1e-12);

        let zero_price = [row("A", "2", "0", "10")];
        assert_eq!(weighted_metrics(&zero_price).live_weight, 0.0);
    }

    #[test]
    fn pivot_groups_sorted_with_grand_total() {
        let data = [
            row("400+", "1", "300", "1200"),
            row("200-280", "2", "350", "800"),
            row("200-280", "2", "370", "900"),
        ];
        let refs: Vec<&DatasetRow> = data.iter().collect();
        let pivot = pivot_by_weight_range(&refs);

        let labels: Vec<&str> = pivot.all_rows().map(|r| r.weight_range.as_str()).collect();
        assert_eq!(labels, ["200-280", "400+", GRAND_TOTAL]);
        assert!((pivot.rows[0].metrics.dollars_per_head - 850.0).abs() < 1e-9);
        assert_eq!(pivot.grand_total.head_count, 5.0);
        assert!((pivot.grand_total.metrics.dollars_per_head - 4600.0 / 5.0).abs() < 1e-9);
    }
}
