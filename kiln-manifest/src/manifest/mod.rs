//! Manifest types and parsing for kiln.yaml files.

mod parse;
mod span;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use kiln_core::EnvBlock;
pub use parse::{DEFAULT_MAX_INCLUDE_DEPTH, Loader};
use serde::Deserialize;

use crate::{Command, Commands};

/// Root manifest for kiln.yaml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Format version, checked against the loader's supported version
    #[serde(default)]
    pub version: u32,

    /// Project name (required)
    #[serde(default)]
    pub project: String,

    /// Commands run when the tool exits
    #[serde(default, rename = "onExit")]
    pub on_exit: Vec<String>,

    /// Environment files evaluated before `env`, in order
    #[serde(default, rename = "envs")]
    pub env_files: Vec<String>,

    /// Inline environment, evaluated in declaration order
    #[serde(default)]
    pub env: EnvBlock,

    /// Free-form options block, typed by [`Manifest::parse_options`]
    #[serde(default)]
    pub options: IndexMap<String, serde_yaml::Value>,

    /// Interpreter used to run `exec` scripts
    #[serde(default)]
    pub interpreter: String,

    /// Other manifests imported by this one
    #[serde(default, rename = "import")]
    pub imports: Vec<String>,

    /// Top-level commands
    #[serde(default)]
    pub commands: Commands,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    root: PathBuf,
}

impl Manifest {
    /// Directory containing the manifest file.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.root = root.into();
    }

    /// Resolve a path declared in the manifest against its directory.
    /// Absolute paths are returned unchanged.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Environment files, resolved against the manifest directory.
    pub fn env_file_paths(&self) -> Vec<PathBuf> {
        self.env_files.iter().map(|f| self.resolve_path(f)).collect()
    }

    /// Imported manifests, resolved against the manifest directory.
    pub fn import_paths(&self) -> Vec<PathBuf> {
        self.imports.iter().map(|f| self.resolve_path(f)).collect()
    }

    /// Check if a command exists (supports nested paths like "release.docker")
    pub fn has_command(&self, path: &str) -> bool {
        self.commands.get_path(path).is_some()
    }

    /// Look up a command by dot-separated path; segments may be aliases.
    pub fn command(&self, path: &str) -> Option<&Command> {
        self.commands.get_path(path)
    }
}
