//! Row selection for reports: date window, saleyard/category/weight/prefix sets.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{Days, NaiveDate};

use crate::domain::DatasetRow;

/// Trailing window of `days` ending at `as_of`.
///
/// A row is inside when its report date is strictly after `as_of - days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub as_of: NaiveDate,
    pub days: u32,
}

impl DateWindow {
    /// Saturates at the earliest representable date.
    pub fn cutoff(&self) -> NaiveDate {
        self.as_of
            .checked_sub_days(Days::new(u64::from(self.days)))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date > self.cutoff()
    }
}

/// Conjunction of optional filters. An empty set means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub window: Option<DateWindow>,
    pub saleyards: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub weight_ranges: BTreeSet<String>,
    pub sale_prefixes: BTreeSet<String>,
}

impl RowFilter {
    pub fn with_window(mut self, window: DateWindow) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_saleyards<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.saleyards = trimmed(values);
        self
    }

    pub fn with_categories<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.categories = trimmed(values);
        self
    }

    pub fn with_weight_ranges<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.weight_ranges = trimmed(values);
        self
    }

    pub fn with_sale_prefixes<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.sale_prefixes = trimmed(values);
        self
    }

    /// The same filter with the date window removed (used by trend charts).
    pub fn without_window(&self) -> Self {
        Self {
            window: None,
            ..self.clone()
        }
    }

    pub fn matches(&self, row: &DatasetRow) -> bool {
        if let Some(window) = &self.window {
            if !window.contains(row.report_date) {
                return false;
            }
        }
        in_set(&self.saleyards, Some(row.saleyard.as_str()))
            && in_set(&self.categories, row.row.category.as_deref())
            && in_set(&self.weight_ranges, row.row.weight_range.as_deref())
            && in_set(&self.sale_prefixes, row.row.sale_prefix.as_deref())
    }

    pub fn apply<'a>(&self, rows: &'a [DatasetRow]) -> Vec<&'a DatasetRow> {
        rows.iter().filter(|r| self.matches(r)).collect()
    }
}

fn trimmed<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn in_set(set: &BTreeSet<String>, value: Option<&str>) -> bool {
    if set.is_empty() {
        return true;
    }
    value.is_some_and(|v| set.contains(v.trim()))
}

/// Rows to export alongside a filtered report.
///
/// With `include_all_filters` the filtered rows are exported as-is. Otherwise
/// every row whose saleyard and report date both occur in the filtered set is
/// exported, so a whole saleyard report is kept even when only some of its
/// categories matched.
pub fn export_rows<'a>(
    all: &'a [DatasetRow],
    filtered: &[&'a DatasetRow],
    include_all_filters: bool,
) -> Vec<&'a DatasetRow> {
    if include_all_filters {
        return filtered.to_vec();
    }
    let saleyards: HashSet<&str> = filtered.iter().map(|r| r.saleyard.as_str()).collect();
    let dates: HashSet<NaiveDate> = filtered.iter().map(|r| r.report_date).collect();
    all.iter()
        .filter(|r| saleyards.contains(r.saleyard.as_str()) && dates.contains(&r.report_date))
        .collect()
}

/// Distinct report dates per saleyard, both ascending.
pub fn reports_used(rows: &[&DatasetRow]) -> BTreeMap<String, BTreeSet<NaiveDate>> {
    let mut out: BTreeMap<String, BTreeSet<NaiveDate>> = BTreeMap::new();
    for row in rows {
        out.entry(row.saleyard.trim().to_string())
            .or_default()
            .insert(row.report_date);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProvenanceKey, ReportColumn, ReportRow};

    fn row(yard: &str, day: u32, category: &str) -> DatasetRow {
        let key = ProvenanceKey::new(yard, NaiveDate::from_ymd_opt(2024, 6, day).unwrap());
        let mut r = ReportRow::default();
        r.set(ReportColumn::Category, category);
        DatasetRow::new(&key, r)
    }

    #[test]
    fn window_is_exclusive_of_cutoff() {
        let window = DateWindow {
            as_of: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            days: 7,
        };
        assert!(!window.contains(NaiveDate::from_ymd_opt(2024, 6, 23).unwrap()));
        assert!(window.contains(NaiveDate::from_ymd_opt(2024, 6, 24).unwrap()));
    }

    #[test]
    fn huge_window_includes_everything() {
        let window = DateWindow {
            as_of: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            days: u32::MAX,
        };
        assert_eq!(window.cutoff(), NaiveDate::MIN);
        assert!(window.contains(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()));
    }

    #[test]
    fn sets_are_conjunctive_and_trimmed() {
        let rows = vec![row("Scone", 1, " Cows "), row("Scone", 2, "Bulls"), row("Dubbo", 1, "Cows")];
        let filter = RowFilter::default()
            .with_saleyards(["Scone "])
            .with_categories(["Cows"]);
        let hits = filter.apply(&rows);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].report_date.format("%d").to_string(), "01");
    }

    #[test]
    fn export_keeps_whole_reports_unless_asked() {
        let rows = vec![row("Scone", 1, "Cows"), row("Scone", 1, "Bulls"), row("Dubbo", 2, "Cows")];
        let filtered = RowFilter::default().with_categories(["Cows"]).with_saleyards(["Scone"]).apply(&rows);

        assert_eq!(export_rows(&rows, &filtered, false).len(), 2);
        assert_eq!(export_rows(&rows, &filtered, true).len(), 1);
    }

    #[test]
    fn reports_used_groups_dates() {
        let rows = vec![row("Scone", 8, "Cows"), row("Scone", 1, "Bulls"), row("Scone", 1, "Cows")];
        let refs: Vec<&DatasetRow> = rows.iter().collect();
        let used = reports_used(&refs);
        assert_eq!(used["Scone"].len(), 2);
        assert_eq!(used["Scone"].first(), Some(&NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
    }
}
