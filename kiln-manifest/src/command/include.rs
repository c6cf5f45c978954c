//! Include resolution for the command tree.
//!
//! A command with `include: <file>` is a stub. Loading overlays it with the
//! contents of `<file>` (relative to the manifest directory) and then
//! resolves the includes of its subcommands. The tree is consumed and rebuilt
//! so a failure never leaves a half-merged tree behind.

use std::path::{Path, PathBuf};

use kiln_core::clean_path;
use serde::Deserialize;

use super::{Command, Commands};
use crate::error::{Error, Result, parse_yaml, read_file};

/// Fields read from an included file. Absent fields keep the stub's value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct CommandOverlay {
    alias: Option<Vec<String>>,
    help: Option<String>,
    args: Option<Vec<String>>,
    deps: Option<Vec<String>>,
    exec: Option<String>,
    include: Option<String>,
    commands: Option<Commands>,
}

impl CommandOverlay {
    /// Read an included file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let content = read_file(path)?;
        parse_yaml(&content, &path.display().to_string())
    }
}

impl Command {
    /// Overlay an included definition onto this command.
    ///
    /// Subcommands are merged by name, the included definition replacing a
    /// stub subcommand of the same name. `include` keeps the reference that
    /// was resolved.
    pub(crate) fn overlay(self, overlay: CommandOverlay) -> Command {
        if let Some(nested) = overlay.include.as_deref().filter(|i| !i.is_empty()) {
            tracing::warn!(
                include = %self.include,
                nested,
                "ignoring 'include' inside an included file"
            );
        }

        let mut commands = self.commands;
        if let Some(included) = overlay.commands {
            for (name, cmd) in included {
                commands.insert(name, cmd);
            }
        }

        Command {
            alias: overlay.alias.unwrap_or(self.alias),
            help: overlay.help.unwrap_or(self.help),
            args: overlay.args.unwrap_or(self.args),
            deps: overlay.deps.unwrap_or(self.deps),
            exec: overlay.exec.unwrap_or(self.exec),
            include: self.include,
            commands,
        }
    }
}

/// Walks a command tree and replaces include stubs with their definitions.
pub(crate) struct IncludeResolver<'a> {
    root: &'a Path,
    max_depth: usize,
    /// Includes being expanded along the current branch
    stack: Vec<PathBuf>,
    /// Command names from the top of the tree to the current command
    path: Vec<String>,
}

impl<'a> IncludeResolver<'a> {
    pub(crate) fn new(root: &'a Path, max_depth: usize) -> Self {
        Self {
            root,
            max_depth,
            stack: Vec::new(),
            path: Vec::new(),
        }
    }

    /// Resolve every include in `commands`, depth first, in declaration order.
    pub(crate) fn resolve(&mut self, commands: Commands) -> Result<Commands> {
        let mut resolved = Commands::new();
        for (name, cmd) in commands {
            self.path.push(name.clone());
            let result = self.resolve_command(cmd);
            self.path.pop();
            resolved.insert(name, result?);
        }
        Ok(resolved)
    }

    fn resolve_command(&mut self, cmd: Command) -> Result<Command> {
        if !cmd.is_included() {
            let nested = cmd.commands;
            return Ok(Command {
                commands: self.resolve(nested)?,
                ..cmd
            });
        }

        let command = self.path.join(".");
        let file = self.root.join(&cmd.include);
        let key = file.canonicalize().unwrap_or_else(|_| clean_path(&file));

        if self.stack.contains(&key) {
            let chain = self
                .stack
                .iter()
                .chain(std::iter::once(&key))
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(Box::new(Error::IncludeCycle { command, chain }));
        }
        if self.stack.len() >= self.max_depth {
            return Err(Box::new(Error::IncludeDepth {
                command,
                max: self.max_depth,
            }));
        }

        tracing::debug!(command = %command, file = %file.display(), "resolving include");
        let overlay = CommandOverlay::load(&file).map_err(|e| Error::include(&command, &file, e))?;
        let merged = cmd.overlay(overlay);

        self.stack.push(key);
        let nested = merged.commands;
        let result = self.resolve(nested);
        self.stack.pop();

        Ok(Command {
            commands: result?,
            ..merged
        })
    }
}
