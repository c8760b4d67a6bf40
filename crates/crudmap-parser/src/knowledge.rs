//! Immutable, run-wide lookup data: name lists, compiled patterns and limits.

use crate::sql::fallback::Patterns;
use anyhow::{Context, Result};
use crudmap_core::config::CrudmapConfig;
use crudmap_core::names::NameList;

/// Built once per run and shared by reference with every file analysis.
#[derive(Debug)]
pub struct Knowledge {
    pub views: NameList,
    pub procedures: NameList,
    pub lowercase_tables: bool,
    pub max_fold_depth: usize,
    pub patterns: Patterns,
}

impl Knowledge {
    /// Defaults with empty name lists.
    pub fn new() -> Result<Self> {
        Self::from_config(&CrudmapConfig::default())
    }

    pub fn from_config(config: &CrudmapConfig) -> Result<Self> {
        let views = NameList::load_optional(config.sql.view_list.as_deref())?;
        let procedures = NameList::load_optional(config.sql.procedure_list.as_deref())?;
        let patterns = Patterns::new().context("failed to compile fallback patterns")?;
        Ok(Self {
            views,
            procedures,
            lowercase_tables: config.sql.lowercase_tables,
            max_fold_depth: config.evaluator.max_fold_depth,
            patterns,
        })
    }

    pub fn with_views(mut self, views: NameList) -> Self {
        self.views = views;
        self
    }

    pub fn with_procedures(mut self, procedures: NameList) -> Self {
        self.procedures = procedures;
        self
    }
}
