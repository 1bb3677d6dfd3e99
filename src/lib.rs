//! Review client for file-node records.
//!
//! The library holds the view model (`view`), the backend seam (`remote`) and
//! the ambient pieces shared with the `fnreview` binary.

pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod record;
pub mod remote;
pub mod view;
