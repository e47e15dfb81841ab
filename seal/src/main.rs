//! Seal Compiler CLI

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use seal::build::{self, BuildConfig, BuildError, BuildResult};
use seal::error::{report_error, report_warning, CompileError, CompileWarning};
use seal::resolver::SourceMap;

#[derive(Parser)]
#[command(name = "seal", version, about = "Seal - sealed classes with exhaustive `when` checking")]
struct Cli {
    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Type check a source file or a project directory
    Check {
        /// Source file, or directory containing Seal.toml
        path: PathBuf,
    },
    /// Type check, then run the entry function
    Run {
        /// Source file, or directory containing Seal.toml
        path: PathBuf,
        /// Entry function (default: the manifest's, or `main`)
        #[arg(long)]
        entry: Option<String>,
    },
    /// Print class hierarchies with their closed variant sets
    Hierarchy {
        /// Source file, or directory containing Seal.toml
        path: PathBuf,
    },
    /// Parse and dump AST (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Check { path } => check(BuildConfig::new(path).verbose(cli.verbose)),
        Command::Run { path, entry } => {
            let mut config = BuildConfig::new(path).verbose(cli.verbose);
            if let Some(entry) = entry {
                config = config.entry(entry);
            }
            run(config)
        }
        Command::Hierarchy { path } => build::hierarchy(&BuildConfig::new(path)).map(|tree| print!("{tree}")),
        Command::Parse { file } => parse_file(&file),
        Command::Tokens { file } => tokenize_file(&file),
    };

    if let Err(e) = result {
        report(&e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn report(error: &BuildError) {
    let rendered = match error {
        BuildError::Compile { error, sources } => report_error(sources, error),
        other => {
            eprintln!("error: {other}");
            Ok(())
        }
    };
    if let Err(e) = rendered {
        eprintln!("Error: {error} (could not render diagnostic: {e})");
    }
}

fn report_warnings(sources: &SourceMap, warnings: &[CompileWarning]) {
    for warning in warnings {
        if report_warning(sources, warning).is_err() {
            eprintln!("{warning}");
        }
    }
}

fn check(config: BuildConfig) -> BuildResult<()> {
    let checked = build::check(&config)?;
    report_warnings(&checked.project.sources, &checked.warnings);
    println!("✓ {} type checks successfully", checked.project.name);
    Ok(())
}

fn run(config: BuildConfig) -> BuildResult<()> {
    let (checked, value) = build::run(&config)?;
    report_warnings(&checked.project.sources, &checked.warnings);
    println!("{value}");
    Ok(())
}

/// Read one file into a single-entry source map
fn read_source(path: &Path) -> BuildResult<(String, SourceMap)> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        BuildError::compile(
            CompileError::io_error(format!("Failed to read {}: {}", path.display(), e)),
            SourceMap::new(),
        )
    })?;
    let sources = SourceMap::single(path.display().to_string(), source.clone());
    Ok((source, sources))
}

fn parse_file(path: &Path) -> BuildResult<()> {
    let (source, sources) = read_source(path)?;

    let ast = seal::lexer::tokenize(&source)
        .and_then(seal::parser::parse)
        .map_err(|e| BuildError::compile(e, sources.clone()))?;

    let json = serde_json::to_string_pretty(&ast)
        .map_err(|e| BuildError::compile(CompileError::io_error(e.to_string()), sources))?;
    println!("{json}");
    Ok(())
}

fn tokenize_file(path: &Path) -> BuildResult<()> {
    let (source, sources) = read_source(path)?;

    let tokens = seal::lexer::tokenize(&source).map_err(|e| BuildError::compile(e, sources))?;
    for (tok, span) in &tokens {
        println!("{:?} @ {}..{}", tok, span.start, span.end);
    }

    Ok(())
}
