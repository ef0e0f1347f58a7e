//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the fixed column schema (`ReportColumn`, `ColumnKind`)
//! - report rows with optional, text-preserving numeric cells (`ReportRow`, `NumericCell`)
//! - provenance-tagged dataset rows (`ProvenanceKey`, `DatasetRow`)
//! - the weighted metrics shown in reports (`Metric`)

pub mod types;

pub use types::*;
