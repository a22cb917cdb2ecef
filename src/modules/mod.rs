//! Module lookup for `import`
//!
//! A module `name` is searched as `name.lpg` in the configured module
//! directory, then in the directory of the importing file, then among
//! in-memory modules registered by the embedder, and finally among the
//! modules built into the compiler.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::diagnostics::SourceFile;

const STD: &str = include_str!("std.lpg");
const ARRAY: &str = include_str!("array.lpg");

/// Source of a module built into the compiler
pub fn builtin_module(name: &str) -> Option<&'static str> {
    match name {
        "std" => Some(STD),
        "array" => Some(ARRAY),
        _ => None,
    }
}

/// A module's source text and where its own imports are resolved
#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub source: SourceFile,
    pub import_directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleLoader {
    module_directory: Option<PathBuf>,
    in_memory: IndexMap<String, String>,
}

impl ModuleLoader {
    pub fn new(module_directory: Option<PathBuf>) -> Self {
        Self {
            module_directory,
            in_memory: IndexMap::new(),
        }
    }

    /// Registers a module that exists only in memory
    pub fn with_module(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.in_memory.insert(name.into(), content.into());
        self
    }

    pub fn load(&self, name: &str, import_directory: Option<&Path>) -> Option<LoadedModule> {
        let file_name = format!("{}.lpg", name);
        let directories = self.module_directory.as_deref().into_iter().chain(import_directory);
        for directory in directories {
            let path = directory.join(&file_name);
            match fs::read_to_string(&path) {
                Ok(content) => {
                    tracing::debug!(module = name, path = %path.display(), "loaded module from file");
                    return Some(LoadedModule {
                        source: SourceFile::new(path.display().to_string(), content),
                        import_directory: path.parent().map(Path::to_path_buf),
                    });
                }
                Err(error) => {
                    tracing::trace!(module = name, path = %path.display(), %error, "module not found here");
                }
            }
        }
        let content = match self.in_memory.get(name) {
            Some(content) => content.as_str(),
            None => builtin_module(name)?,
        };
        tracing::debug!(module = name, "loaded module from memory");
        Some(LoadedModule {
            source: SourceFile::new(file_name, content),
            import_directory: None,
        })
    }
}
