//! Models module for mysql_baseline
//!
//! This module handles model registration and discovery.

pub mod registry;

// Re-export key types
pub use registry::{ModelInfo, ModelRegistry, TableModel};
