//! Configuration for source discovery, folding, SQL classification and include resolution.
//!
//! Load order: `.crudmap/config.toml` → environment variables → defaults.
//! The loaded value is immutable for the rest of the run and is passed by
//! reference into every component.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level crudmap configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudmapConfig {
    pub source: SourceConfig,
    pub evaluator: EvaluatorConfig,
    pub sql: SqlConfig,
    pub includes: IncludeConfig,
    pub engine: EngineConfig,
}

/// Which files are analyzed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// File extensions (without dot) to analyze.
    pub extensions: Vec<String>,
    /// Glob patterns, relative to the root, to skip.
    pub exclude: Vec<String>,
}

/// Static expression evaluator limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Hard recursion ceiling for folding one expression.
    pub max_fold_depth: usize,
}

/// SQL extraction and classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    /// Line-delimited list of known view names.
    pub view_list: Option<PathBuf>,
    /// Line-delimited list of known stored-procedure names.
    pub procedure_list: Option<PathBuf>,
    /// Lowercase unquoted table names so `Orders` and `orders` merge.
    pub lowercase_tables: bool,
}

/// Priority-scoring weights for include candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub base: i64,
    /// Penalty per level of depth difference from the including directory.
    pub depth_penalty: i64,
    /// Bonus per leading path component shared with the including directory.
    pub common_prefix: i64,
    pub descendant: i64,
    pub ancestor: i64,
    pub under_root: i64,
    /// Match's file stem equals the including directory's own name.
    pub dir_name_match: i64,
}

/// Include resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IncludeConfig {
    /// Extensions substituted into a bare filename when generating candidates.
    pub extensions: Vec<String>,
    /// Conventional index files tried for directory-like targets.
    pub index_files: Vec<String>,
    /// Extra directories (relative to the root) searched like an include path.
    pub include_paths: Vec<PathBuf>,
    /// Maximum number of scored candidates kept per edge.
    pub max_candidates: usize,
    /// Dependency expansion stops below this depth.
    pub max_depth: usize,
    pub scoring: ScoringWeights,
}

/// When constants defined in one file become visible to the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstantPolicy {
    /// Discover all constants first, then analyze files in parallel.
    #[default]
    TwoPass,
    /// Analyze files sequentially; constants are visible only after their file.
    Streaming,
}

impl FromStr for ConstantPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "twopass" => Ok(Self::TwoPass),
            "streaming" => Ok(Self::Streaming),
            other => Err(format!("unknown constant policy: {}", other)),
        }
    }
}

/// Engine-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub constant_policy: ConstantPolicy,
    /// Upper bound on constant-discovery rounds in two-pass mode.
    pub max_constant_passes: usize,
    /// Worker threads for per-file analysis; 0 uses rayon's default.
    pub threads: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            extensions: ["php", "php3", "php4", "php5", "phtml", "inc", "src"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            exclude: Vec::new(),
        }
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_fold_depth: 256,
        }
    }
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            view_list: None,
            procedure_list: None,
            lowercase_tables: true,
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: 100,
            depth_penalty: 5,
            common_prefix: 30,
            descendant: 30,
            ancestor: 20,
            under_root: 15,
            dir_name_match: 25,
        }
    }
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            extensions: [".php", ".inc", ".inc.php", ".phtml", ".html", ".htm"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            index_files: ["index.php", "index.inc", "default.php", "index.html"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            include_paths: Vec::new(),
            max_candidates: 5,
            max_depth: 32,
            scoring: ScoringWeights::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            constant_policy: ConstantPolicy::TwoPass,
            max_constant_passes: 4,
            threads: 0,
        }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

fn env_path_override(var: &str, target: &mut Option<PathBuf>) {
    if let Ok(v) = std::env::var(var)
        && !v.trim().is_empty()
    {
        *target = Some(PathBuf::from(v));
    }
}

impl CrudmapConfig {
    /// Load config from `.crudmap/config.toml` in the project root, with env var overrides.
    /// Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".crudmap").join("config.toml");

        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        // Environment variable overrides
        env_override(
            "CRUDMAP_MAX_FOLD_DEPTH",
            &mut config.evaluator.max_fold_depth,
        );
        env_override(
            "CRUDMAP_MAX_CANDIDATES",
            &mut config.includes.max_candidates,
        );
        env_override("CRUDMAP_MAX_INCLUDE_DEPTH", &mut config.includes.max_depth);
        env_override(
            "CRUDMAP_CONSTANT_POLICY",
            &mut config.engine.constant_policy,
        );
        env_override("CRUDMAP_THREADS", &mut config.engine.threads);
        env_path_override("CRUDMAP_VIEW_LIST", &mut config.sql.view_list);
        env_path_override("CRUDMAP_PROCEDURE_LIST", &mut config.sql.procedure_list);

        // Name-list paths in the file are relative to the project root.
        for list in [&mut config.sql.view_list, &mut config.sql.procedure_list] {
            if let Some(p) = list.as_mut()
                && p.is_relative()
            {
                *p = project_root.join(&*p);
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.evaluator.max_fold_depth == 0 {
            anyhow::bail!("evaluator.max_fold_depth must be at least 1");
        }
        if self.source.extensions.is_empty() {
            anyhow::bail!("source.extensions must name at least one extension");
        }
        let weights = &self.includes.scoring;
        // One extra shared path component must outweigh every bonus a
        // less-related match at the same depth can still collect.
        if weights.common_prefix <= weights.dir_name_match {
            anyhow::bail!(
                "includes.scoring.common_prefix ({}) must be greater than dir_name_match ({})",
                weights.common_prefix,
                weights.dir_name_match,
            );
        }
        Ok(())
    }

    /// Normalized extension set: lowercase, no leading dot.
    pub fn source_extensions(&self) -> Vec<String> {
        self.source
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_lowercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CrudmapConfig::default();
        assert_eq!(config.evaluator.max_fold_depth, 256);
        assert_eq!(config.includes.max_candidates, 5);
        assert_eq!(config.engine.constant_policy, ConstantPolicy::TwoPass);
        assert!(config.sql.lowercase_tables);
        assert!(config.source_extensions().contains(&"php".to_string()));
        assert!(config.source_extensions().contains(&"src".to_string()));
        config.validate().unwrap();
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[source]
extensions = ["php", ".INC"]

[engine]
constant_policy = "streaming"

[includes]
max_candidates = 3

[includes.scoring]
common_prefix = 40
"#;
        let config: CrudmapConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.constant_policy, ConstantPolicy::Streaming);
        assert_eq!(config.includes.max_candidates, 3);
        assert_eq!(config.includes.scoring.common_prefix, 40);
        assert_eq!(config.source_extensions(), vec!["php", "inc"]);
        // Defaults for unspecified fields
        assert_eq!(config.includes.scoring.base, 100);
        assert_eq!(config.evaluator.max_fold_depth, 256);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let config = CrudmapConfig::load(Path::new("/nonexistent/path")).unwrap();
        assert_eq!(config.includes.max_depth, 32);
    }

    #[test]
    fn test_validate_rejects_weak_prefix_weight() {
        let mut config = CrudmapConfig::default();
        config.includes.scoring.common_prefix = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_name_lists_resolve_against_root() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".crudmap");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.toml"),
            "[sql]\nview_list = \"lists/views.txt\"\n",
        )
        .unwrap();

        let config = CrudmapConfig::load(tmp.path()).unwrap();
        assert_eq!(
            config.sql.view_list,
            Some(tmp.path().join("lists/views.txt"))
        );
    }

    #[test]
    fn test_constant_policy_from_str() {
        assert_eq!("two-pass".parse::<ConstantPolicy>(), Ok(ConstantPolicy::TwoPass));
        assert_eq!(
            "Streaming".parse::<ConstantPolicy>(),
            Ok(ConstantPolicy::Streaming)
        );
        assert!("lazy".parse::<ConstantPolicy>().is_err());
    }
}
