//! Loader for the legacy kiln build file format.
//!
//! A spec is a flat document with an unordered `env` map and a `targets`
//! map. It predates the manifest format in `kiln-manifest` and is kept so
//! older projects keep building.

// Miette's derive macro generates code that triggers these warnings
#![allow(unused_assignments)]

mod error;
mod spec;
mod target;

pub use error::{Error, Result};
pub use kiln_core::Environment;
pub use spec::Spec;
pub use target::Target;
