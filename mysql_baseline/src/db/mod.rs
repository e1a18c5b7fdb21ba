//! Database module for mysql_baseline
//!
//! This module handles the MySQL connection pool and the metadata and row
//! queries run over it.

pub mod connection;
pub mod mysql;

// Re-export key types
pub use connection::DatabaseConnection;
