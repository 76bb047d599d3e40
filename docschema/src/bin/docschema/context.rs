use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// Name of the optional project configuration file
pub const CONFIG_FILE: &str = "docschema.toml";

/// Project context for docschema commands
pub struct ProjectContext {
    /// Directory holding the config file, or the start directory when there is none
    pub project_root: PathBuf,
    /// Loaded configuration
    pub config: Option<DocschemaConfig>,
}

/// Configuration stored in docschema.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocschemaConfig {
    #[serde(default)]
    pub docschema: DocschemaSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocschemaSettings {
    /// Definition files or directories, relative to the project root
    #[serde(default)]
    pub definitions: Vec<String>,
    /// Output format used when --output is not given
    #[serde(default)]
    pub output: Option<OutputFormat>,
}

impl ProjectContext {
    /// Find and load project context from current directory or ancestors
    pub fn find() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::find_from(&current_dir)
    }

    /// Find project context starting from the given directory
    pub fn find_from(start: &Path) -> Result<Self> {
        let mut current = start.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.is_file() {
                let content = std::fs::read_to_string(&config_path)
                    .with_context(|| format!("Failed to read {}", config_path.display()))?;
                let config: DocschemaConfig = toml::from_str(&content)
                    .with_context(|| format!("Failed to parse {}", config_path.display()))?;
                log::debug!("loaded project config from {}", config_path.display());
                return Ok(Self {
                    project_root: current,
                    config: Some(config),
                });
            }

            if !current.pop() {
                return Ok(Self {
                    project_root: start.to_path_buf(),
                    config: None,
                });
            }
        }
    }

    /// Configured definition paths, resolved against the project root
    pub fn definition_paths(&self) -> Vec<PathBuf> {
        self.config
            .as_ref()
            .map(|config| {
                config
                    .docschema
                    .definitions
                    .iter()
                    .map(|path| self.project_root.join(path))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn output_format(&self) -> Option<OutputFormat> {
        self.config.as_ref().and_then(|config| config.docschema.output)
    }
}
