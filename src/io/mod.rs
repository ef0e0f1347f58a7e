//! Input/output helpers.
//!
//! - raw report ingest + filename metadata (`ingest`)
//! - moving processed reports into history (`archive`)
//! - per-user favourite saleyards (`favourites`)
//! - formatted `.xlsx` export (`workbook`)

pub mod archive;
pub mod favourites;
pub mod ingest;
pub mod workbook;

pub use archive::*;
pub use favourites::*;
pub use ingest::*;
pub use workbook::*;
