//! Resolved environments and `${NAME}` substitution.

use std::{borrow::Cow, sync::LazyLock};

use indexmap::IndexMap;
use regex::{Captures, Regex};

use crate::EnvBlock;

static VAR_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("variable reference pattern is valid"));

/// A resolved environment: variable name to final string value.
///
/// Iteration follows insertion order. Re-inserting an existing key replaces
/// its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: IndexMap<String, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the environment of the current process.
    ///
    /// Variables whose name or value is not valid unicode are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Set a variable, returning the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.vars.insert(name.into(), value.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Copy every entry of `defaults` whose key is not set yet.
    pub fn merge_missing(&mut self, defaults: &Environment) {
        for (k, v) in defaults.iter() {
            if !self.vars.contains_key(k) {
                self.vars.insert(k.to_string(), v.to_string());
            }
        }
    }

    /// Render as `KEY=VALUE` strings, in iteration order, for spawning
    /// subprocesses.
    pub fn to_env_list(&self) -> Vec<String> {
        self.vars.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K, V> Extend<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.vars
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl IntoIterator for Environment {
    type Item = (String, String);
    type IntoIter = indexmap::map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.vars.into_iter()
    }
}

/// Replace every `${name}` in `value` for which `lookup` returns a value.
///
/// Unknown references are left untouched. The text is scanned once, left to
/// right; substituted values are not scanned again.
pub fn substitute<'a, F>(value: &'a str, lookup: F) -> Cow<'a, str>
where
    F: Fn(&str) -> Option<&'a str>,
{
    VAR_REF.replace_all(value, |caps: &Captures<'_>| match lookup(&caps[1]) {
        Some(resolved) => resolved.to_string(),
        None => caps[0].to_string(),
    })
}

/// Evaluate an ordered block into `resolved`.
///
/// Each entry is flattened and its references are looked up first among the
/// variables already in `resolved` (earlier entries, earlier blocks), then in
/// `parent`. Forward references stay literal. The entry is then stored,
/// overwriting an earlier value of the same key.
pub fn resolve_block(block: &EnvBlock, resolved: &mut Environment, parent: &Environment) {
    for (key, value) in block.iter() {
        let flat = value.flatten();
        let expanded = {
            let current: &Environment = resolved;
            substitute(&flat, |name| current.get(name).or_else(|| parent.get(name)))
                .into_owned()
        };

        if resolved.insert(key, expanded).is_some() {
            tracing::debug!(key, "environment variable redefined");
        }
    }
}
