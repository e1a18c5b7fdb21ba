//! Utilities for mysql_baseline
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

// Re-export key utility functions
pub use naming::{quote_identifier, quote_identifier_list, TablePrefix};
