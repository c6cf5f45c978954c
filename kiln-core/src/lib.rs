//! Core types shared by the kiln manifest crates.
//!
//! This crate holds the pieces that both the current manifest schema and the
//! legacy spec schema build on: the ordered environment block, value
//! flattening, `${NAME}` substitution and the resolved environment map.

mod block;
mod env;
mod utils;

// Ordered environment blocks
pub use block::{EnvBlock, EnvValue};
// Resolved environments
pub use env::{Environment, resolve_block, substitute};
// Value utilities
pub use utils::{clean_path, yaml_scalar_to_string};

/// Manifest format version understood by this release.
///
/// Loaders take the supported version as configuration and default to this
/// value, so older generations can be dispatched separately.
pub const FORMAT_VERSION: u32 = 3;
