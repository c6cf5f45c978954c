mod include;

use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;
pub(crate) use include::IncludeResolver;
use serde::Deserialize;

/// A command or subcommand of the build definition
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Command {
    /// Alternative names the command can be invoked by
    #[serde(default)]
    pub alias: Vec<String>,

    /// Help text
    #[serde(default)]
    pub help: String,

    /// Declared argument names
    #[serde(default)]
    pub args: Vec<String>,

    /// Commands that must run first
    #[serde(default)]
    pub deps: Vec<String>,

    /// Script executed by the interpreter
    #[serde(default)]
    pub exec: String,

    /// File (relative to the manifest directory) merged into this command.
    /// Kept after loading to record where the definition came from.
    #[serde(default)]
    pub include: String,

    /// Nested subcommands
    #[serde(default)]
    pub commands: Commands,
}

impl Command {
    /// Returns true if this command has subcommands
    pub fn has_subcommands(&self) -> bool {
        !self.commands.is_empty()
    }

    /// Returns true if the command was (or will be) filled from an include file
    pub fn is_included(&self) -> bool {
        !self.include.is_empty()
    }

    /// Returns true if `alias` is one of the command's aliases
    pub fn has_alias(&self, alias: &str) -> bool {
        self.alias.iter().any(|a| a == alias)
    }
}

/// Command tree: command name to [`Command`], in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Commands(IndexMap<String, Command>);

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of commands, nested ones included.
    pub fn count(&self) -> usize {
        self.0.len() + self.0.values().map(|c| c.commands.count()).sum::<usize>()
    }

    /// Find a direct child by name, then by alias.
    pub fn find(&self, name: &str) -> Option<(&str, &Command)> {
        if let Some((key, cmd)) = self.0.get_key_value(name) {
            return Some((key.as_str(), cmd));
        }
        self.0
            .iter()
            .find(|(_, cmd)| cmd.has_alias(name))
            .map(|(key, cmd)| (key.as_str(), cmd))
    }

    /// Look up a nested command by dot-separated path (e.g., "release.docker").
    ///
    /// Every segment may be a name or an alias. Names that themselves contain
    /// a dot are reachable through [`Commands::get_path_segments`].
    pub fn get_path(&self, path: &str) -> Option<&Command> {
        let segments: Vec<&str> = path.split('.').collect();
        self.get_path_segments(&segments)
    }

    /// Look up a nested command by its path segments. An empty slice
    /// matches nothing.
    pub fn get_path_segments(&self, segments: &[&str]) -> Option<&Command> {
        let (first, rest) = segments.split_first()?;
        let (_, cmd) = self.find(first)?;
        if rest.is_empty() {
            Some(cmd)
        } else {
            cmd.commands.get_path_segments(rest)
        }
    }

    /// Depth-first walk yielding `(dot-separated path, command)` in
    /// declaration order, parents before children.
    pub fn walk(&self) -> Vec<(String, &Command)> {
        let mut out = Vec::new();
        self.walk_into("", &mut out);
        out
    }

    fn walk_into<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Command)>) {
        for (name, cmd) in &self.0 {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            out.push((path.clone(), cmd));
            cmd.commands.walk_into(&path, out);
        }
    }
}

impl Deref for Commands {
    type Target = IndexMap<String, Command>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Commands {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl FromIterator<(String, Command)> for Commands {
    fn from_iter<I: IntoIterator<Item = (String, Command)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Commands {
    type Item = (String, Command);
    type IntoIter = indexmap::map::IntoIter<String, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Commands {
    type Item = (&'a String, &'a Command);
    type IntoIter = indexmap::map::Iter<'a, String, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
