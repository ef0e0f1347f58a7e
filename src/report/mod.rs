//! Reporting: terminal formatting of pivots, trends and report usage.

pub mod format;

pub use format::*;
