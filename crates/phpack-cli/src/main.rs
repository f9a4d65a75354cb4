//! phpack CLI - bundle a multi-file PHP application into one script
//!
//! Single-shot driver: load the JSON configuration, resolve every
//! reachable file to a fixed point, order the result, and emit the bundle.
//!
//! Exit codes: 0 success, 1 configuration error, 2 analysis error,
//! 3 generation error.

mod config;

use clap::Parser;
use colored::*;
use config::{ConfigError, PackConfig};
use phpack_analyze::{AutoloadResolver, DependencyResolver, FileAnalyzer, LoadOrderer, ResolveError};
use phpack_codegen::{generate_bundle, GenerateError, GenerateOptions};
use phpack_core::{ConsoleSink, FileSink, Logger};
use phpack_store::{AutoloadKind, Store, StoreError};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "phpack")]
#[command(version = "0.1.0")]
#[command(about = "Bundle a PHP application into a single self-contained file")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(value_name = "CONFIG", default_value = "phpack.json")]
    config: PathBuf,

    /// Entry script, overriding the configuration
    #[arg(long, value_name = "PATH")]
    entry: Option<String>,

    /// Output bundle path, overriding the configuration
    #[arg(long, short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,

    /// Catalog database path, overriding the configuration
    #[arg(long, value_name = "PATH")]
    database: Option<PathBuf>,

    /// Project root (default: the configuration file's directory)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Strip comments from the bundle
    #[arg(long)]
    remove_comments: bool,

    /// Inject the rethrowing error handler
    #[arg(long)]
    error_handler: bool,

    /// Write timestamped diagnostics to a file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Show verbose output
    #[arg(long, short = 'v')]
    verbose: bool,
}

enum DriverError {
    Config(String),
    Analysis(String),
    Generation(String),
}

impl DriverError {
    fn exit_code(&self) -> ExitCode {
        match self {
            DriverError::Config(_) => ExitCode::from(1),
            DriverError::Analysis(_) => ExitCode::from(2),
            DriverError::Generation(_) => ExitCode::from(3),
        }
    }

    fn message(&self) -> &str {
        match self {
            DriverError::Config(m) | DriverError::Analysis(m) | DriverError::Generation(m) => m,
        }
    }
}

impl From<ConfigError> for DriverError {
    fn from(err: ConfigError) -> Self {
        DriverError::Config(err.to_string())
    }
}

impl From<ResolveError> for DriverError {
    fn from(err: ResolveError) -> Self {
        DriverError::Analysis(err.to_string())
    }
}

impl From<GenerateError> for DriverError {
    fn from(err: GenerateError) -> Self {
        DriverError::Generation(err.to_string())
    }
}

impl From<StoreError> for DriverError {
    fn from(err: StoreError) -> Self {
        DriverError::Analysis(err.to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logger = match &cli.log_file {
        Some(path) => match FileSink::create(path) {
            Ok(sink) => Logger::new(Arc::new(sink)),
            Err(err) => {
                eprintln!("{} cannot open log file: {}", "error:".red().bold(), err);
                return ExitCode::from(1);
            }
        },
        None => Logger::new(Arc::new(ConsoleSink::new(cli.verbose))),
    };

    match run(&cli, &logger) {
        Ok(output) => {
            println!("{} bundle written to {}", "ok:".green().bold(), output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err.message());
            err.exit_code()
        }
    }
}

fn run(cli: &Cli, logger: &Logger) -> Result<PathBuf, DriverError> {
    let (config, config_dir) = load_config(cli)?;

    let root = cli
        .root
        .clone()
        .unwrap_or(config_dir)
        .canonicalize()
        .map_err(|e| DriverError::Config(format!("Invalid project root: {}", e)))?;

    let entry = cli
        .entry
        .clone()
        .map(Ok)
        .unwrap_or_else(|| config.entry().map(str::to_string))?;

    let database = cli.database.clone().unwrap_or_else(|| config.database());
    let mut store = Store::open(&resolve_under(&root, &database))?;

    let analyzer =
        FileAnalyzer::new(&root, logger.clone()).with_excludes(&config.exclude_patterns());

    let mut autoload = AutoloadResolver::new(&root, logger.clone());
    store.clear_autoload_rules()?;
    let manifest = root.join("composer.json");
    if manifest.exists() {
        autoload
            .load_composer_manifest(&mut store, &manifest)
            .map_err(|e| DriverError::Config(e.to_string()))?;
    }
    let mut psr4: Vec<_> = config.autoload.psr4.iter().collect();
    psr4.sort_by(|a, b| a.0.cmp(b.0));
    for (prefix, paths) in psr4 {
        for path in paths.to_vec() {
            autoload
                .add_rule(&mut store, AutoloadKind::Psr4, Some(prefix.as_str()), &root.join(path), 100)
                .map_err(|e| DriverError::Config(e.to_string()))?;
        }
    }

    // Pre-analyze configured include globs.
    for pattern in config.include_patterns() {
        let full = root.join(&pattern);
        let Ok(entries) = glob::glob(&full.to_string_lossy()) else {
            logger.warn(format!("Invalid include pattern {:?}", pattern));
            continue;
        };
        for path in entries.flatten() {
            if !path.is_file() {
                continue;
            }
            let rel = analyzer.relative_path(&path);
            if analyzer.is_excluded(&rel) {
                continue;
            }
            analyzer.analyze(&mut store, &path)?;
        }
    }

    let mut resolver = DependencyResolver::new(&analyzer, &autoload, logger.clone());
    let summary = resolver.resolve_all(&mut store, Path::new(&entry))?;
    logger.info(format!(
        "Analysis complete: {} passes, {} dependencies resolved, {} unresolved",
        summary.passes, summary.resolved, summary.unresolved
    ));

    let entry_file = store
        .entry_file()?
        .ok_or_else(|| DriverError::Analysis(format!("Entry file {} was not cataloged", entry)))?;

    let order = LoadOrderer::new(logger.clone())
        .load_order(&store, entry_file.id)
        .map_err(DriverError::from)?;
    logger.info(format!("Bundling {} files", order.len()));

    let options = GenerateOptions {
        output: resolve_under(&root, &cli.output.clone().unwrap_or_else(|| config.output())),
        remove_comments: cli.remove_comments || config.optimization.remove_comments,
        minimize_whitespace: config.optimization.minimize_whitespace,
        dead_code: config.optimization.enabled,
        error_handler: cli.error_handler || config.error_handler,
    };

    let output = generate_bundle(&store, &root, &entry, &order, &options, logger)?;
    Ok(output)
}

/// Load the configuration file; a missing file is tolerated when the entry
/// comes from the command line.
fn load_config(cli: &Cli) -> Result<(PackConfig, PathBuf), DriverError> {
    let config_dir = |path: &Path| {
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    };

    if cli.config.exists() {
        let config = PackConfig::load(&cli.config)?;
        return Ok((config, config_dir(&cli.config)));
    }
    if cli.entry.is_some() {
        return Ok((PackConfig::default(), PathBuf::from(".")));
    }
    Err(DriverError::Config(format!(
        "Configuration file {} not found",
        cli.config.display()
    )))
}

fn resolve_under(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
