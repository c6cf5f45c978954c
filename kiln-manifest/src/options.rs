//! Typed build options derived from the free-form `options` block.
//!
//! ```yaml
//! options:
//!   debug: true          # boolean option
//!   mode: [fast, slow]   # choice option, "fast" is active by default
//! ```

use indexmap::IndexMap;
use kiln_core::{EnvValue, Environment, yaml_scalar_to_string};

use crate::{
    Manifest,
    error::{Error, Result},
};

/// A multiple-choice option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    alternatives: Vec<String>,
    active: String,
}

impl Choice {
    /// Create a choice with the first alternative active.
    /// Returns `None` if there are no alternatives.
    pub fn new(alternatives: Vec<String>) -> Option<Self> {
        let active = alternatives.first()?.clone();
        Some(Self {
            alternatives,
            active,
        })
    }

    pub fn alternatives(&self) -> &[String] {
        &self.alternatives
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    /// Make `value` the active alternative. Returns false if it is not one
    /// of the alternatives.
    pub fn set_active(&mut self, value: &str) -> bool {
        if !self.alternatives.iter().any(|a| a == value) {
            return false;
        }
        self.active = value.to_string();
        true
    }
}

/// Boolean and choice options, keyed by name.
///
/// A name belongs to exactly one of the two kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    bools: IndexMap<String, bool>,
    choices: IndexMap<String, Choice>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive options from `(name, value)` entries.
    pub fn from_block<'a, K, I>(entries: I) -> Result<Self>
    where
        K: AsRef<str> + 'a,
        I: IntoIterator<Item = (&'a K, &'a serde_yaml::Value)>,
    {
        let mut options = Options::new();
        for (name, value) in entries {
            options.add(name.as_ref(), value)?;
        }
        Ok(options)
    }

    /// Register one option from its declared value.
    ///
    /// Booleans become boolean options and non-empty lists become choices.
    /// Anything else is an invalid option.
    pub fn add(&mut self, name: &str, value: &serde_yaml::Value) -> Result<()> {
        if self.contains(name) {
            return Err(Error::duplicate_option(name));
        }

        match value {
            serde_yaml::Value::Bool(b) => {
                self.bools.insert(name.to_string(), *b);
            }
            serde_yaml::Value::Sequence(items) => {
                let alternatives = items
                    .iter()
                    .map(|item| alternative(name, item))
                    .collect::<Result<Vec<_>>>()?;
                let choice = Choice::new(alternatives)
                    .ok_or_else(|| Error::invalid_option(name, "choice list is empty"))?;
                self.choices.insert(name.to_string(), choice);
            }
            serde_yaml::Value::Tagged(tagged) => return self.add(name, &tagged.value),
            other => {
                return Err(Error::invalid_option(
                    name,
                    format!("unsupported value {}", describe(other)),
                ));
            }
        }
        Ok(())
    }

    /// Combine two option sets. A name defined in both is a duplicate.
    pub fn merge(mut self, other: Options) -> Result<Self> {
        for (name, value) in other.bools {
            if self.contains(&name) {
                return Err(Error::duplicate_option(name));
            }
            self.bools.insert(name, value);
        }
        for (name, choice) in other.choices {
            if self.contains(&name) {
                return Err(Error::duplicate_option(name));
            }
            self.choices.insert(name, choice);
        }
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bools.contains_key(name) || self.choices.contains_key(name)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.bools.get(name).copied()
    }

    pub fn choice(&self, name: &str) -> Option<&Choice> {
        self.choices.get(name)
    }

    pub fn bools(&self) -> impl Iterator<Item = (&str, bool)> {
        self.bools.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn choices(&self) -> impl Iterator<Item = (&str, &Choice)> {
        self.choices.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.bools.len() + self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bools.is_empty() && self.choices.is_empty()
    }

    /// Set a boolean option.
    pub fn set_bool(&mut self, name: &str, value: bool) -> Result<()> {
        match self.bools.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::invalid_option(name, "not a boolean option")),
        }
    }

    /// Select the active alternative of a choice option.
    pub fn set_choice(&mut self, name: &str, value: &str) -> Result<()> {
        let choice = self
            .choices
            .get_mut(name)
            .ok_or_else(|| Error::invalid_option(name, "not a choice option"))?;

        if !choice.set_active(value) {
            return Err(Error::invalid_option(
                name,
                format!(
                    "'{value}' is not one of [{}]",
                    choice.alternatives().join(", ")
                ),
            ));
        }
        Ok(())
    }

    /// Export the current option values as environment variables: `true` or
    /// `false` for booleans, the active alternative for choices.
    pub fn env_vars(&self) -> Environment {
        let bools = self.bools.iter().map(|(k, v)| (k.clone(), v.to_string()));
        let choices = self
            .choices
            .iter()
            .map(|(k, c)| (k.clone(), c.active.clone()));
        bools.chain(choices).collect()
    }
}

/// Stringify one choice alternative. Lists and mappings become compact JSON.
fn alternative(name: &str, item: &serde_yaml::Value) -> Result<String> {
    if let Some(s) = yaml_scalar_to_string(item) {
        return Ok(s);
    }
    serde_yaml::from_value::<EnvValue>(item.clone())
        .map(|value| value.flatten())
        .map_err(|e| Error::invalid_option(name, e.to_string()))
}

fn describe(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "boolean",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "list",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged value",
    }
}

impl Manifest {
    /// Derive the typed options model from the `options` block.
    pub fn parse_options(&self) -> Result<Options> {
        Options::from_block(&self.options)
    }
}
