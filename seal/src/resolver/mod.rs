//! Module Resolver for Seal
//!
//! Handles multi-file compilation: every source file becomes a module named
//! after its file stem, so a file is always a sealing boundary of its own.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::{FileId, Item, ModuleDef, Program, Span, Spanned};
use crate::error::{CompileError, Result};

/// Source file extension
pub const SOURCE_EXTENSION: &str = "seal";

/// A loaded source file
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Display name used in diagnostics
    pub name: String,
    /// Path on disk, if the source came from a file
    pub path: Option<PathBuf>,
    pub source: String,
}

/// All sources of a compilation, indexed by [`FileId`]
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source map holding a single in-memory file with id 0
    pub fn single(name: impl Into<String>, source: impl Into<String>) -> Self {
        let mut map = Self::new();
        map.add(name.into(), None, source.into());
        map
    }

    pub fn add(&mut self, name: String, path: Option<PathBuf>, source: String) -> FileId {
        self.files.push(SourceFile { name, path, source });
        (self.files.len() - 1) as FileId
    }

    pub fn get(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Module resolver for multi-file compilation
#[derive(Debug)]
pub struct Resolver {
    /// Base directory for relative source paths
    base_dir: PathBuf,
    sources: SourceMap,
    /// One module per loaded file, in load order
    modules: Vec<ModuleDef>,
    /// Module name -> file it came from
    module_files: HashMap<String, FileId>,
}

impl Resolver {
    /// Create a new resolver with the given base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            sources: SourceMap::new(),
            modules: Vec::new(),
            module_files: HashMap::new(),
        }
    }

    /// Read and parse a source file. Relative paths are resolved against the base directory.
    pub fn load_file(&mut self, path: &Path) -> Result<FileId> {
        let full_path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        };

        let source = std::fs::read_to_string(&full_path).map_err(|e| {
            CompileError::io_error(format!("Failed to read {}: {}", full_path.display(), e))
        })?;

        let module_name = full_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                CompileError::resolve_error(format!("Invalid source file name: {}", full_path.display()))
            })?
            .to_string();

        let display_name = path.display().to_string();
        self.add_module(module_name, display_name, Some(full_path), source)
    }

    /// Parse in-memory source as module `module_name`
    pub fn add_source(&mut self, module_name: &str, source: &str) -> Result<FileId> {
        self.add_module(
            module_name.to_string(),
            format!("{module_name}.{SOURCE_EXTENSION}"),
            None,
            source.to_string(),
        )
    }

    fn add_module(
        &mut self,
        module_name: String,
        display_name: String,
        path: Option<PathBuf>,
        source: String,
    ) -> Result<FileId> {
        if let Some(&existing) = self.module_files.get(&module_name) {
            let other = self
                .sources
                .get(existing)
                .map(|f| f.name.clone())
                .unwrap_or_default();
            return Err(CompileError::resolve_error(format!(
                "Module '{}' is defined by both '{}' and '{}'",
                module_name, other, display_name
            )));
        }

        let len = source.len();
        let file = self.sources.add(display_name, path, source);
        let source = self
            .sources
            .get(file)
            .map(|f| f.source.as_str())
            .unwrap_or_default();

        let tokens = crate::lexer::tokenize(source).map_err(|e| e.in_file(file))?;
        let program = crate::parser::parse_in_file(file, tokens)?;

        tracing::debug!(module = %module_name, file, items = program.items.len(), "loaded module");

        let span = Span::in_file(file, 0, len);
        self.modules.push(ModuleDef {
            name: Spanned::new(module_name.clone(), Span::in_file(file, 0, 0)),
            items: program.items,
            span,
        });
        self.module_files.insert(module_name, file);
        Ok(file)
    }

    /// Get the number of loaded modules
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn sources(&self) -> &SourceMap {
        &self.sources
    }

    /// Assemble the loaded modules into one program
    pub fn finish(self) -> (Program, SourceMap) {
        let items = self.modules.into_iter().map(Item::Module).collect();
        (Program { items }, self.sources)
    }
}

/// Every `*.seal` file under `dir`, recursively, in sorted order
pub fn discover_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    collect_sources(dir, &mut found)?;
    found.sort();
    Ok(found)
}

fn collect_sources(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        CompileError::io_error(format!("Failed to read directory {}: {}", dir.display(), e))
    })?;
    for entry in entries {
        let path = entry
            .map_err(|e| CompileError::io_error(format!("Failed to read directory entry: {e}")))?
            .path();
        if path.is_dir() {
            collect_sources(&path, found)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION) {
            found.push(path);
        }
    }
    Ok(())
}
