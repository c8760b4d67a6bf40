//! Core types for crudmap, the static CRUD and include analyzer.
//!
//! Provides the report data model ([`model::FileRecord`], [`model::IncludeEdge`]),
//! the diagnostics stream and error taxonomy, the process-wide constant table,
//! view/procedure name lists, configuration, and JSON report persistence.

pub mod config;
pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod names;
pub mod report;
pub mod storage;
