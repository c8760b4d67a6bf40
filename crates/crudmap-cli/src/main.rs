//! CLI binary for crudmap: map table CRUD usage and include dependencies in legacy PHP code.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crudmap_core::config::{ConstantPolicy, CrudmapConfig};
use crudmap_core::model::EdgeTarget;
use crudmap_core::report::AnalysisResult;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "crudmap", about = "Static CRUD and include map for legacy PHP code")]
struct Cli {
    /// Project root directory (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Policy {
    TwoPass,
    Streaming,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the source tree and print the CRUD map, include edges and diagnostics
    Analyze {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,

        /// Write the report to .crudmap/report.json
        #[arg(long)]
        save: bool,

        /// When constants from one file become visible to others
        #[arg(long, value_enum)]
        policy: Option<Policy>,

        /// Glob patterns to exclude files (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Line-delimited list of known view names
        #[arg(long)]
        views: Option<PathBuf>,

        /// Line-delimited list of known stored-procedure names
        #[arg(long)]
        procedures: Option<PathBuf>,

        /// Worker threads (0 = one per core)
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Show CRUD rows from the saved report
    Crud {
        /// Only rows for this table (case-insensitive)
        #[arg(short, long)]
        table: Option<String>,

        /// Only rows for files whose path contains this text
        #[arg(short, long)]
        file: Option<String>,
    },

    /// Show include edges from the saved report
    Deps {
        /// Only UNRESOLVED and CIRCULAR edges
        #[arg(long)]
        unresolved: bool,

        /// Only direct (depth 1) edges
        #[arg(long)]
        direct: bool,
    },

    /// Show diagnostics from the saved report
    Diagnostics,

    /// Show report statistics
    Info,
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.project {
        Some(p) => Ok(p.clone()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let project_root = get_project_root(&cli)?;

    match cli.command {
        Commands::Analyze {
            format,
            save,
            policy,
            exclude,
            views,
            procedures,
            threads,
        } => {
            let mut config = CrudmapConfig::load(&project_root)?;
            if let Some(policy) = policy {
                config.engine.constant_policy = match policy {
                    Policy::TwoPass => ConstantPolicy::TwoPass,
                    Policy::Streaming => ConstantPolicy::Streaming,
                };
            }
            config.source.exclude.extend(exclude);
            if views.is_some() {
                config.sql.view_list = views;
            }
            if procedures.is_some() {
                config.sql.procedure_list = procedures;
            }
            if let Some(threads) = threads {
                config.engine.threads = threads;
            }
            cmd_analyze(&project_root, &config, format, save)
        }
        Commands::Crud { table, file } => cmd_crud(&project_root, table.as_deref(), file.as_deref()),
        Commands::Deps { unresolved, direct } => cmd_deps(&project_root, unresolved, direct),
        Commands::Diagnostics => cmd_diagnostics(&project_root),
        Commands::Info => cmd_info(&project_root),
    }
}

fn load_report(project_root: &Path) -> Result<Option<AnalysisResult>> {
    if !crudmap_core::storage::report_exists(project_root) {
        eprintln!("No report found. Run `crudmap analyze --save` first.");
        return Ok(None);
    }
    crudmap_core::storage::load(project_root).map(Some)
}

fn cmd_analyze(project_root: &Path, config: &CrudmapConfig, format: Format, save: bool) -> Result<()> {
    tracing::debug!(
        "policy {:?}, {} exclude glob(s), {} thread(s)",
        config.engine.constant_policy,
        config.source.exclude.len(),
        config.engine.threads
    );
    let result = crudmap_engine::analyze(project_root, config)?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        Format::Text => {
            print_crud(&result, None, None);
            println!();
            print_edges(&result, false, false);
            if !result.diagnostics.is_empty() {
                println!();
                print_diagnostics(&result);
            }
        }
    }

    if save {
        crudmap_core::storage::save(project_root, &result)?;
        eprintln!(
            "Saved report to {}",
            crudmap_core::storage::report_file(project_root).display()
        );
    }
    Ok(())
}

fn print_crud(result: &AnalysisResult, table: Option<&str>, file: Option<&str>) {
    let rows: Vec<_> = result
        .crud_rows()
        .into_iter()
        .filter(|r| table.is_none_or(|t| r.table.eq_ignore_ascii_case(t)))
        .filter(|r| file.is_none_or(|f| r.file.contains(f)))
        .collect();
    if rows.is_empty() {
        println!("No table references.");
        return;
    }

    let file_w = rows.iter().map(|r| r.file.len()).max().unwrap_or(4).max(4);
    let scope_w = rows.iter().map(|r| r.scope.len()).max().unwrap_or(5).max(5);
    let table_w = rows.iter().map(|r| r.table.len()).max().unwrap_or(5).max(5);
    println!(
        "{:file_w$}  {:scope_w$}  {:table_w$}  CRUD  ANNOTATION",
        "FILE", "SCOPE", "TABLE"
    );
    for r in &rows {
        println!(
            "{:file_w$}  {:scope_w$}  {:table_w$}  {}  {}",
            r.file,
            r.scope,
            r.table,
            r.flags(),
            r.annotation
        );
    }
}

fn print_edges(result: &AnalysisResult, unresolved: bool, direct: bool) {
    let edges: Vec<_> = result
        .edges
        .iter()
        .filter(|e| !direct || e.depth == 1)
        .filter(|e| !unresolved || !matches!(e.target, EdgeTarget::Resolved(_)))
        .collect();
    if edges.is_empty() {
        println!("No include edges.");
        return;
    }

    for e in edges {
        let indent = "  ".repeat(e.depth.saturating_sub(1));
        println!(
            "{}  {}{}:{}  {} -> {}",
            e.origin,
            indent,
            e.source,
            e.line,
            e.raw,
            e.target.label()
        );
        if e.candidates.len() > 1 {
            println!("      candidates: {}", e.candidates.join(", "));
        }
    }
}

fn print_diagnostics(result: &AnalysisResult) {
    for (location, message) in result.diagnostic_rows() {
        println!("{}: {}", location, message);
    }
}

fn cmd_crud(project_root: &Path, table: Option<&str>, file: Option<&str>) -> Result<()> {
    let Some(result) = load_report(project_root)? else {
        return Ok(());
    };
    print_crud(&result, table, file);
    Ok(())
}

fn cmd_deps(project_root: &Path, unresolved: bool, direct: bool) -> Result<()> {
    let Some(result) = load_report(project_root)? else {
        return Ok(());
    };
    print_edges(&result, unresolved, direct);
    Ok(())
}

fn cmd_diagnostics(project_root: &Path) -> Result<()> {
    let Some(result) = load_report(project_root)? else {
        return Ok(());
    };
    if result.diagnostics.is_empty() {
        println!("No diagnostics.");
    } else {
        print_diagnostics(&result);
    }
    Ok(())
}

fn cmd_info(project_root: &Path) -> Result<()> {
    let Some(result) = load_report(project_root)? else {
        return Ok(());
    };
    let summary = result.summary();

    println!("crudmap report v{}", result.version);
    println!("Root: {}", result.root);
    println!();
    println!("Files analyzed: {}", summary.files_analyzed);
    println!("Files with SQL: {}", summary.files_with_sql);
    println!("Table references: {}", summary.table_references);
    println!(
        "Include edges: {} ({} unresolved, {} circular)",
        summary.include_edges, summary.unresolved_edges, summary.circular_edges
    );
    println!("Diagnostics: {}", summary.diagnostics);

    let mut by_kind = std::collections::BTreeMap::new();
    for d in &result.diagnostics {
        *by_kind.entry(d.kind).or_insert(0usize) += 1;
    }
    for (kind, count) in by_kind {
        println!("  {:?}: {}", kind, count);
    }
    Ok(())
}
