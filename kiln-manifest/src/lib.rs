//! Loading and evaluation of kiln.yaml build definitions.
//!
//! [`Manifest::from_file`] (or a configured [`Loader`]) parses the manifest
//! strictly, checks its version and project name and resolves command
//! includes. The environment and the typed options are derived on demand
//! with [`Manifest::eval_env`] and [`Manifest::parse_options`].

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod command;
mod env;
mod error;
mod manifest;
mod options;

pub use command::{Command, Commands};
pub use error::{Error, Result, SourceContext};
pub use kiln_core::{EnvBlock, EnvValue, Environment, FORMAT_VERSION};
pub use manifest::{DEFAULT_MAX_INCLUDE_DEPTH, Loader, Manifest};
pub use options::{Choice, Options};
