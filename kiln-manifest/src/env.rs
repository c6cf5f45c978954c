//! Environment evaluation for a loaded manifest.

use std::path::Path;

use kiln_core::{EnvBlock, Environment, resolve_block};

use crate::{
    Manifest,
    error::{Error, Result, parse_yaml, read_file},
};

impl Manifest {
    /// Evaluate the project environment.
    ///
    /// Environment files are evaluated first, in the listed order, then the
    /// inline `env` block, all into one accumulating result. A `${NAME}`
    /// reference sees variables defined before it, then `parent`. Finally
    /// every `parent` variable that was not defined locally is added.
    pub fn eval_env(&self, parent: &Environment) -> Result<Environment> {
        let mut env = Environment::new();

        for path in self.env_file_paths() {
            let block = load_env_file(&path).map_err(|e| Error::env_file(&path, e))?;
            resolve_block(&block, &mut env, parent);
        }

        resolve_block(&self.env, &mut env, parent);
        env.merge_missing(parent);
        Ok(env)
    }

    /// Evaluate the project environment on top of the process environment.
    pub fn eval_process_env(&self) -> Result<Environment> {
        self.eval_env(&Environment::from_process())
    }
}

/// Read an environment file in an order preserving manner.
fn load_env_file(path: &Path) -> Result<EnvBlock> {
    tracing::debug!(path = %path.display(), "reading environment file");
    let content = read_file(path)?;
    parse_yaml(&content, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn manifest(env: &str) -> Manifest {
        let content = format!("version: 3\nproject: demo\nenv:\n{env}");
        Manifest::from_str(&content).expect("Failed to load manifest")
    }

    fn parent(pairs: &[(&str, &str)]) -> Environment {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_backward_reference_resolves() {
        let m = manifest("  - A: \"1\"\n  - B: \"${A}2\"\n");
        let env = m.eval_env(&Environment::new()).unwrap();
        assert_eq!(env.get("A"), Some("1"));
        assert_eq!(env.get("B"), Some("12"));
    }

    #[test]
    fn test_forward_reference_stays_literal() {
        let m = manifest("  - B: \"${A}2\"\n  - A: \"1\"\n");
        let env = m.eval_env(&Environment::new()).unwrap();
        assert_eq!(env.get("B"), Some("${A}2"));
        assert_eq!(env.get("A"), Some("1"));
    }

    #[test]
    fn test_parent_visible_but_never_overrides() {
        let m = manifest("  HOME: /srv/demo\n  CACHE: ${USER}-${HOME}\n");
        let env = m
            .eval_env(&parent(&[("HOME", "/home/ada"), ("USER", "ada")]))
            .unwrap();

        assert_eq!(env.get("HOME"), Some("/srv/demo"));
        assert_eq!(env.get("CACHE"), Some("ada-/srv/demo"));
        assert_eq!(env.get("USER"), Some("ada"));
    }

    #[test]
    fn test_parent_entries_follow_local_ones() {
        let m = manifest("  A: a\n");
        let env = m.eval_env(&parent(&[("Z", "z"), ("A", "parent")])).unwrap();
        assert_eq!(env.to_env_list(), vec!["A=a", "Z=z"]);
    }

    #[test]
    fn test_nested_values_are_json() {
        let m = manifest("  DB:\n    host: localhost\n    port: 5432\n  HOSTS: [a, b]\n");
        let env = m.eval_env(&Environment::new()).unwrap();
        assert_eq!(env.get("DB"), Some(r#"{"host":"localhost","port":5432}"#));
        assert_eq!(env.get("HOSTS"), Some(r#"["a","b"]"#));
    }

    #[test]
    fn test_missing_env_file() {
        let content = "version: 3\nproject: demo\nenvs: [/nonexistent-kiln/env.yaml]\n";
        let m = Manifest::from_str(content).unwrap();
        let err = m.eval_env(&Environment::new()).unwrap_err();

        match &*err {
            Error::EnvFile { path, source } => {
                assert_eq!(path, Path::new("/nonexistent-kiln/env.yaml"));
                assert!(matches!(**source, Error::Io { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
