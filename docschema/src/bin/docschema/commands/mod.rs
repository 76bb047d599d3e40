pub mod schema;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use docschema::{DefinitionFile, DocumentType};
use walkdir::WalkDir;

use crate::context::ProjectContext;
use crate::output::Reporter;

/// Expands directories into the `.toml` files below them, skipping hidden entries.
pub fn discover_definition_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
            continue;
        }
        if !path.is_dir() {
            anyhow::bail!("Definition path not found: {}", path.display());
        }

        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|entry| entry.into_path())
            .filter(|entry| entry.extension().is_some_and(|ext| ext == "toml"))
            .filter(|entry| {
                !entry
                    .strip_prefix(path)
                    .unwrap_or(entry)
                    .components()
                    .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
            })
            .collect();
        found.sort();
        files.extend(found);
    }

    Ok(files)
}

/// Loads and declares every definition file, in order.
pub fn load_definitions(paths: &[PathBuf], reporter: &Reporter) -> Result<Vec<Arc<DocumentType>>> {
    let mut declared = Vec::new();

    for file in discover_definition_files(paths)? {
        reporter.trace(&format!("loading {}", file.display()));
        let definitions = DefinitionFile::from_path(&file)
            .with_context(|| format!("Failed to load definitions from {}", file.display()))?;
        let types = definitions
            .declare()
            .with_context(|| format!("Failed to declare document types from {}", file.display()))?;
        declared.extend(types);
    }

    Ok(declared)
}

/// Paths given on the command line, or the configured ones when none were given.
pub fn definition_paths_or_config(paths: Vec<PathBuf>, ctx: &ProjectContext) -> Result<Vec<PathBuf>> {
    if !paths.is_empty() {
        return Ok(paths);
    }
    let configured = ctx.definition_paths();
    if configured.is_empty() {
        anyhow::bail!("No definition files given and no definitions configured in docschema.toml");
    }
    Ok(configured)
}

pub fn display_path(path: &Path) -> String {
    path.display().to_string()
}
