use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Result type for kiln-spec operations
pub type Result<T> = std::result::Result<T, Box<Error>>;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("failed to read '{path}'")]
    #[diagnostic(code(kiln_spec::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{filename}'")]
    #[diagnostic(code(kiln_spec::format_error))]
    Format {
        #[source_code]
        src: NamedSource<String>,
        #[label("parse error here")]
        span: Option<SourceSpan>,
        filename: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("target '{name}': {reason}")]
    #[diagnostic(code(kiln_spec::target_init))]
    TargetInit { name: String, reason: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Box<Self> {
        Box::new(Error::Io {
            path: path.into(),
            source,
        })
    }

    /// Create a format error pointing at the location reported by the YAML parser.
    pub fn format(content: &str, filename: &str, source: serde_yaml::Error) -> Box<Self> {
        let span = source.location().map(|loc| SourceSpan::from(loc.index()));
        Box::new(Error::Format {
            src: NamedSource::new(filename, content.to_string()),
            span,
            filename: filename.to_string(),
            source,
        })
    }

    pub fn target_init(name: impl Into<String>, reason: impl Into<String>) -> Box<Self> {
        Box::new(Error::TargetInit {
            name: name.into(),
            reason: reason.into(),
        })
    }
}
