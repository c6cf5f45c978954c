//! Manifest loading from files and strings.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use kiln_core::FORMAT_VERSION;

use super::{Manifest, span::find_top_level_key};
use crate::{
    command::IncludeResolver,
    error::{Error, Result, SourceContext, read_file},
};

/// Default limit on nested includes along one branch of the command tree.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 32;

/// Loads manifests with a fixed configuration.
///
/// ```ignore
/// let manifest = Loader::new().supported_version(3).load("kiln.yaml")?;
/// ```
#[derive(Debug, Clone)]
pub struct Loader {
    supported_version: u32,
    max_include_depth: usize,
}

impl Default for Loader {
    fn default() -> Self {
        Self {
            supported_version: FORMAT_VERSION,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the manifest version this loader accepts.
    pub fn supported_version(mut self, version: u32) -> Self {
        self.supported_version = version;
        self
    }

    /// Set how deeply includes may nest before loading fails.
    pub fn max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }

    /// Load a manifest file. Includes are resolved relative to its directory.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Manifest> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading manifest");

        let content = read_file(path)?;
        let root = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        self.load_str(&content, &path.display().to_string(), root)
    }

    /// Load a manifest from a string. `filename` is used for error reporting
    /// and `root` is the directory includes are resolved against.
    pub fn load_str(
        &self,
        content: &str,
        filename: &str,
        root: impl Into<PathBuf>,
    ) -> Result<Manifest> {
        let source_ctx = SourceContext::new(content, filename);
        let mut manifest: Manifest =
            serde_yaml::from_str(content).map_err(|e| source_ctx.parse_error(e))?;

        if manifest.version != self.supported_version {
            return Err(source_ctx.version_mismatch_error(
                manifest.version,
                self.supported_version,
                find_top_level_key(content, "version"),
            ));
        }
        if manifest.project.is_empty() {
            return Err(source_ctx.missing_project_error(find_top_level_key(content, "project")));
        }

        let root: PathBuf = root.into();
        let stubs = std::mem::take(&mut manifest.commands);
        manifest.commands = IncludeResolver::new(&root, self.max_include_depth).resolve(stubs)?;
        manifest.set_root(root);

        tracing::debug!(
            project = %manifest.project,
            commands = manifest.commands.count(),
            "manifest loaded"
        );
        Ok(manifest)
    }
}

impl FromStr for Manifest {
    type Err = Box<Error>;

    /// Parse with the default loader, resolving includes against the
    /// current directory.
    fn from_str(s: &str) -> Result<Self> {
        Loader::default().load_str(s, "kiln.yaml", ".")
    }
}

impl Manifest {
    /// Parse a kiln.yaml file from the given path with the default loader.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Loader::default().load(path)
    }

    /// Parse a kiln.yaml from a string with a custom filename for error
    /// reporting.
    pub fn from_str_with_filename(content: &str, filename: &str) -> Result<Self> {
        Loader::default().load_str(content, filename, ".")
    }
}
