use std::path::{Path, PathBuf};

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Result type for kiln-manifest operations (boxed to reduce size on stack)
pub type Result<T> = std::result::Result<T, Box<Error>>;

/// Source context for error reporting.
///
/// Encapsulates the source content and filename, reducing parameter passing
/// in error factory functions.
///
/// # Example
///
/// ```ignore
/// let ctx = SourceContext::new(content, "kiln.yaml");
/// ctx.missing_project_error(None);
/// ctx.version_mismatch_error(1, 3, span);
/// ```
#[derive(Debug, Clone)]
pub struct SourceContext {
    src: String,
    filename: String,
}

impl SourceContext {
    /// Create a new source context.
    pub fn new(src: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            filename: filename.into(),
        }
    }

    /// Get the source content.
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Get the filename.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Create a NamedSource for miette error reporting.
    pub fn named_source(&self) -> NamedSource<String> {
        NamedSource::new(&self.filename, self.src.clone())
    }

    /// Create a format error from a YAML error.
    pub fn parse_error(&self, source: serde_yaml::Error) -> Box<Error> {
        let span = source.location().map(|loc| SourceSpan::from(loc.index()));
        Box::new(Error::Format {
            src: self.named_source(),
            span,
            filename: self.filename.clone(),
            source,
        })
    }

    /// Create a version mismatch error.
    pub fn version_mismatch_error(
        &self,
        found: u32,
        expected: u32,
        span: Option<SourceSpan>,
    ) -> Box<Error> {
        Box::new(Error::VersionMismatch {
            src: self.named_source(),
            span,
            found,
            expected,
        })
    }

    /// Create a missing project error.
    pub fn missing_project_error(&self, span: Option<SourceSpan>) -> Box<Error> {
        Box::new(Error::MissingProject {
            src: self.named_source(),
            span,
        })
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to read '{path}'")]
    #[diagnostic(code(kiln::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{filename}'")]
    #[diagnostic(code(kiln::format_error))]
    Format {
        #[source_code]
        src: NamedSource<String>,
        #[label("parse error here")]
        span: Option<SourceSpan>,
        filename: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("incompatible manifest version: file={found} supported={expected}")]
    #[diagnostic(
        code(kiln::version_mismatch),
        help("set 'version: {expected}' and migrate the manifest to the current format")
    )]
    VersionMismatch {
        #[source_code]
        src: NamedSource<String>,
        #[label("declared here")]
        span: Option<SourceSpan>,
        found: u32,
        expected: u32,
    },

    #[error("no project name set")]
    #[diagnostic(
        code(kiln::missing_project),
        help("add a top-level 'project: <name>' entry")
    )]
    MissingProject {
        #[source_code]
        src: NamedSource<String>,
        #[label("project name is empty")]
        span: Option<SourceSpan>,
    },

    #[error("invalid option '{name}': {reason}")]
    #[diagnostic(
        code(kiln::invalid_option),
        help("options must be a boolean or a non-empty list of alternatives")
    )]
    InvalidOption { name: String, reason: String },

    #[error("duplicate option '{name}'")]
    #[diagnostic(code(kiln::duplicate_option))]
    DuplicateOption { name: String },

    #[error("failed to include '{path}' into command '{command}'")]
    #[diagnostic(code(kiln::include))]
    Include {
        command: String,
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("include cycle at command '{command}': {chain}")]
    #[diagnostic(
        code(kiln::include_cycle),
        help("an included file must not include itself, directly or through nested commands")
    )]
    IncludeCycle { command: String, chain: String },

    #[error("include depth limit of {max} exceeded at command '{command}'")]
    #[diagnostic(code(kiln::include_depth))]
    IncludeDepth { command: String, max: usize },

    #[error("failed to load environment file '{path}'")]
    #[diagnostic(code(kiln::env_file))]
    EnvFile {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an I/O error for the given path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Box<Self> {
        Box::new(Error::Io {
            path: path.into(),
            source,
        })
    }

    /// Create an invalid option error
    pub fn invalid_option(name: impl Into<String>, reason: impl Into<String>) -> Box<Self> {
        Box::new(Error::InvalidOption {
            name: name.into(),
            reason: reason.into(),
        })
    }

    /// Create a duplicate option error
    pub fn duplicate_option(name: impl Into<String>) -> Box<Self> {
        Box::new(Error::DuplicateOption { name: name.into() })
    }

    /// Wrap an error raised while loading an included file
    pub fn include(command: impl Into<String>, path: impl Into<PathBuf>, source: Box<Self>) -> Box<Self> {
        Box::new(Error::Include {
            command: command.into(),
            path: path.into(),
            source,
        })
    }

    /// Wrap an error raised while loading an environment file
    pub fn env_file(path: impl Into<PathBuf>, source: Box<Self>) -> Box<Self> {
        Box::new(Error::EnvFile {
            path: path.into(),
            source,
        })
    }

    /// The innermost error, following include and env-file wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Include { source, .. } | Error::EnvFile { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Read a file to a string, reporting the path on failure.
pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

/// Deserialize a YAML document, treating a blank document as the default value.
pub(crate) fn parse_yaml<T>(content: &str, filename: &str) -> Result<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(content).map_err(|e| SourceContext::new(content, filename).parse_error(e))
}
