//! Build Pipeline
//!
//! Orchestrates the pipeline behind every CLI command:
//!
//! ```text
//! Seal.toml / file → Resolver (lex + parse per module) → Program
//!                  → TypeChecker (class table, exhaustiveness) → lints
//!                  → Interpreter (run)
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ast::Program;
use crate::config::{LintConfig, LintLevel, Manifest};
use crate::error::{CompileError, CompileWarning};
use crate::interp::{Interpreter, RuntimeError, Value};
use crate::resolver::{Resolver, SourceMap};
use crate::types::{ClassTable, TypeChecker};

/// Build configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Source file, or project directory containing `Seal.toml`
    pub input: PathBuf,
    /// Entry function overriding the manifest's
    pub entry: Option<String>,
    /// Verbose output
    pub verbose: bool,
}

impl BuildConfig {
    /// Create a new build configuration with defaults
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            entry: None,
            verbose: false,
        }
    }

    /// Set the entry function
    pub fn entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(name.into());
        self
    }

    /// Set verbose mode
    pub fn verbose(mut self, v: bool) -> Self {
        self.verbose = v;
        self
    }
}

/// Build error
#[derive(Debug, Error)]
pub enum BuildError {
    /// Compile errors, with the sources needed to render them
    #[error("{error}")]
    Compile { error: CompileError, sources: SourceMap },

    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    #[error("Entry error: {0}")]
    Entry(String),
}

impl BuildError {
    pub fn compile(error: CompileError, sources: SourceMap) -> Self {
        BuildError::Compile { error, sources }
    }
}

/// Build result
pub type BuildResult<T> = Result<T, BuildError>;

/// A loaded and resolved project
#[derive(Debug)]
pub struct Project {
    pub name: String,
    /// Entry function from the manifest or the build configuration
    pub entry: String,
    pub lints: LintConfig,
    pub program: Program,
    pub sources: SourceMap,
}

/// A project that passed type checking
#[derive(Debug)]
pub struct CheckedProject {
    pub project: Project,
    pub checker: TypeChecker,
    /// Warnings at `warn` level; `allow`ed ones are dropped
    pub warnings: Vec<CompileWarning>,
}

/// Read the manifest and every source module of the build input
pub fn load_project(config: &BuildConfig) -> BuildResult<Project> {
    let (manifest, files) = if config.input.is_dir() {
        let manifest =
            Manifest::load(&config.input).map_err(|e| BuildError::compile(e, SourceMap::new()))?;
        let files = manifest
            .source_files(&config.input)
            .map_err(|e| BuildError::compile(e, SourceMap::new()))?;
        (manifest, files)
    } else {
        (Manifest::for_file(&config.input), vec![config.input.clone()])
    };

    let mut resolver = Resolver::new(Path::new("."));
    for file in &files {
        if let Err(e) = resolver.load_file(file) {
            let (_, sources) = resolver.finish();
            return Err(BuildError::compile(e, sources));
        }
    }

    if config.verbose {
        tracing::info!(
            package = %manifest.package.name,
            modules = resolver.module_count(),
            "resolved project"
        );
    }

    let (program, sources) = resolver.finish();
    Ok(Project {
        name: manifest.package.name,
        entry: config.entry.clone().unwrap_or(manifest.package.entry),
        lints: manifest.lints,
        program,
        sources,
    })
}

/// Load and type check; lints at `deny` fail the check
pub fn check(config: &BuildConfig) -> BuildResult<CheckedProject> {
    let project = load_project(config)?;

    let mut checker = TypeChecker::new();
    if let Err(e) = checker.check_program(&project.program) {
        return Err(BuildError::compile(e, project.sources));
    }

    let (warnings, denied) = apply_lints(&project.lints, checker.take_warnings());
    if let Some(error) = CompileError::from_many(denied) {
        return Err(BuildError::compile(error, project.sources));
    }

    tracing::debug!(package = %project.name, warnings = warnings.len(), "check passed");
    Ok(CheckedProject {
        project,
        checker,
        warnings,
    })
}

/// Split warnings by their configured level: kept warnings and `deny` errors
pub fn apply_lints(
    lints: &LintConfig,
    warnings: Vec<CompileWarning>,
) -> (Vec<CompileWarning>, Vec<CompileError>) {
    let mut kept = Vec::new();
    let mut denied = Vec::new();
    for warning in warnings {
        match lints.level(&warning) {
            LintLevel::Allow => {}
            LintLevel::Warn => kept.push(warning),
            LintLevel::Deny => denied.push(warning.into_error()),
        }
    }
    (kept, denied)
}

/// Check, then run the entry function
pub fn run(config: &BuildConfig) -> BuildResult<(CheckedProject, Value)> {
    let checked = check(config)?;
    let entry = checked.project.entry.as_str();

    match checked.checker.function(entry) {
        None => {
            return Err(BuildError::Entry(format!("entry function `{entry}` not found")));
        }
        Some(sig) if !sig.params.is_empty() => {
            return Err(BuildError::Entry(format!(
                "entry function `{entry}` must take no parameters, found {}",
                sig.params.len()
            )));
        }
        Some(_) => {}
    }

    let mut interpreter = Interpreter::new();
    interpreter.load(&checked.project.program);
    let value = interpreter.run(entry)?;
    Ok((checked, value))
}

/// Class hierarchy rendered as trees. Bodies are not checked.
pub fn hierarchy(config: &BuildConfig) -> BuildResult<String> {
    let project = load_project(config)?;
    match ClassTable::build(&project.program) {
        Ok(table) => Ok(table.render_tree()),
        Err(e) => Err(BuildError::compile(e, project.sources)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const ZOO: &str = "
        sealed class Mammal(name: String)
        class Cat(name: String) : Mammal(name)
        class Human(name: String) : Mammal(name)
        fn greet(m: Mammal) -> String = when m {
            is Human => \"Hello \" + m.name,
            is Cat => \"Hello \" + m.name,
            else => \"never\",
        };
        fn main() -> String = greet(Cat(\"Lucy\"));
    ";

    fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_build_config_builder() {
        let config = BuildConfig::new(PathBuf::from("zoo.seal")).entry("start").verbose(true);
        assert_eq!(config.entry.as_deref(), Some("start"));
        assert!(config.verbose);
    }

    #[test]
    fn test_run_single_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "zoo.seal", ZOO);
        let (checked, value) = run(&BuildConfig::new(path)).unwrap();
        assert_eq!(value, Value::string("Hello Lucy"));
        assert_eq!(checked.project.name, "zoo");
        // The trailing `else` is redundant
        assert_eq!(checked.warnings.len(), 1);
        assert_eq!(checked.warnings[0].kind(), "redundant-else");
    }

    #[test]
    fn test_project_lint_levels() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "src/zoo.seal", ZOO);

        write_file(&dir, "Seal.toml", "[package]\nname = \"zoo\"\n[lints]\nredundant-else = \"allow\"\n");
        let checked = check(&BuildConfig::new(dir.path().to_path_buf())).unwrap();
        assert!(checked.warnings.is_empty());

        write_file(&dir, "Seal.toml", "[package]\nname = \"zoo\"\n[lints]\nredundant-else = \"deny\"\n");
        match check(&BuildConfig::new(dir.path().to_path_buf())) {
            Err(BuildError::Compile { error, .. }) => assert_eq!(error.kind(), "Lint"),
            other => panic!("expected lint error, got {other:?}"),
        }
    }

    #[test]
    fn test_entry_validation() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "zoo.seal", ZOO);

        let err = run(&BuildConfig::new(path.clone()).entry("start")).unwrap_err();
        assert!(matches!(err, BuildError::Entry(ref m) if m.contains("`start` not found")));

        let err = run(&BuildConfig::new(path).entry("greet")).unwrap_err();
        assert!(matches!(err, BuildError::Entry(ref m) if m.contains("no parameters")));
    }

    #[test]
    fn test_parse_error_keeps_sources() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "broken.seal", "fn main( -> Int = 1;");
        match check(&BuildConfig::new(path)) {
            Err(BuildError::Compile { error, sources }) => {
                assert_eq!(error.kind(), "Parser");
                assert_eq!(sources.len(), 1);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let err = check(&BuildConfig::new(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, BuildError::Compile { ref error, .. } if error.kind() == "IO"));
    }

    #[test]
    fn test_hierarchy_skips_body_checks() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "zoo.seal",
            "sealed class Mammal
             class Cat : Mammal
             class Human : Mammal
             fn f(m: Mammal) -> Int = when m { is Cat => 1 };",
        );
        let tree = hierarchy(&BuildConfig::new(path)).unwrap();
        assert!(tree.contains("sealed class Mammal [zoo] closed {Cat, Human}"));
    }
}
