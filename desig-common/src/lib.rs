//! # Designation Common Library
//!
//! Shared code for the designation services including:
//! - Error taxonomy (Error enum)
//! - Configuration loading and validation
//! - Database bootstrap, schema sync and migrations
//! - Timestamp utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use config::{NamerConfig, StoreLayout};
pub use error::{Error, Result};
