//! # PIM Common Library
//!
//! Shared code for the catalog completeness workspace:
//! - Error and result types
//! - Configuration loading (TOML + environment + platform defaults)
//! - Logging initialization
//! - Database initialization, settings and schema synchronization

pub mod config;
pub mod db;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
