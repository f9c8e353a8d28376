//! Output writers.
//!
//! # Submodules
//!
//! - [`rss`]: the RSS 2.0 feed, one file per pipeline
//! - [`json`]: optional dump of the final records for debugging
//!
//! Both create missing parent directories of their target path.

pub mod json;
pub mod rss;
