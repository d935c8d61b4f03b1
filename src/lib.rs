//! Dump a database schema and its data into a Yii `CDbMigration` class.
//!
//! The pieces, leaf to root:
//! - [`provider`]: schema sources (SQL dumps, DuckDB files, in-memory tables)
//! - [`filter`]: which tables take part
//! - [`codegen`]: per-table statement generation
//! - [`migration`]: naming, rendering and writing the migration file

// Allow dead code for items that are part of the public API but only used in tests
#![allow(dead_code)]

pub mod codegen;
pub mod config;
pub mod dialect;
pub mod error;
pub mod filter;
pub mod migration;
pub mod parser;
pub mod progress;
pub mod provider;
pub mod schema;

pub use error::{DumpError, Result};
