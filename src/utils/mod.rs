//!
//! Utility module for the mesh collector.
//!
//! Formatting helpers used in log output.
/// Utility functions for formatting and display
pub mod index;

pub use index::{bytes_to_hex, format_unix_time};
