//! `saleyard-reports` library crate.
//!
//! The binary (`saleyard`) is a thin wrapper around this library so that:
//!
//! - ingest, merge and aggregation are testable without spawning processes
//! - the store and aggregation modules can back other front-ends
//! - code stays easy to navigate as the project grows

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
pub mod store;
