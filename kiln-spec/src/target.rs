use std::{collections::HashMap, path::Path};

use kiln_core::{clean_path, substitute};
use serde::Deserialize;

use crate::error::{Error, Result};

/// A build target of the legacy format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Target {
    /// Set from the key under `targets` when the spec is loaded
    #[serde(skip)]
    name: String,

    /// Files produced by the target
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Run this target when none is requested
    #[serde(default)]
    pub default: bool,

    /// Targets that must be built first
    #[serde(default)]
    pub deps: Vec<String>,

    /// Script executed to build the target
    #[serde(default)]
    pub run: String,

    #[serde(default)]
    pub help: String,
}

impl Target {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if one of the outputs names `path` after lexical
    /// normalization of both sides.
    pub fn produces(&self, path: impl AsRef<Path>) -> bool {
        let wanted = clean_path(path);
        self.outputs.iter().any(|o| clean_path(o) == wanted)
    }

    /// Attach the name, expand `${NAME}` references against `env` and check
    /// outputs and dependencies. `exists` reports whether a target name is
    /// defined in the same spec.
    pub(crate) fn init<F>(&mut self, name: &str, env: &HashMap<String, String>, exists: F) -> Result<()>
    where
        F: Fn(&str) -> bool,
    {
        self.name = name.to_string();

        let expand = |value: &str| -> String {
            substitute(value, |var| env.get(var).map(String::as_str)).into_owned()
        };
        self.outputs = self.outputs.iter().map(|o| expand(o)).collect();
        self.deps = self.deps.iter().map(|d| expand(d)).collect();
        self.run = expand(&self.run);

        if self.outputs.iter().any(|o| o.trim().is_empty()) {
            return Err(Error::target_init(name, "empty output path"));
        }
        for dep in &self.deps {
            if dep == name {
                return Err(Error::target_init(name, "target depends on itself"));
            }
            if !exists(dep) {
                return Err(Error::target_init(
                    name,
                    format!("unknown dependency '{dep}'"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(yaml: &str) -> Target {
        serde_yaml::from_str(yaml).expect("Failed to parse YAML")
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_init_expands_references() {
        let mut t = target("outputs: [\"${OUT}/app\"]\ndeps: [\"${GEN}\"]\nrun: cc -o ${OUT}/app\n");
        t.init("app", &vars(&[("OUT", "build"), ("GEN", "gen")]), |n| n == "gen")
            .unwrap();

        assert_eq!(t.name(), "app");
        assert_eq!(t.outputs, vec!["build/app"]);
        assert_eq!(t.deps, vec!["gen"]);
        assert_eq!(t.run, "cc -o build/app");
    }

    #[test]
    fn test_init_rejects_empty_output() {
        let mut t = target("outputs: [\"${EMPTY}\"]\n");
        let err = t.init("app", &vars(&[("EMPTY", "")]), |_| true).unwrap_err();
        assert!(matches!(&*err, Error::TargetInit { name, .. } if name == "app"));
    }

    #[test]
    fn test_init_rejects_unknown_and_self_deps() {
        let err = target("deps: [missing]\n")
            .init("app", &HashMap::new(), |_| false)
            .unwrap_err();
        assert!(err.to_string().contains("unknown dependency 'missing'"));

        let err = target("deps: [app]\n")
            .init("app", &HashMap::new(), |_| true)
            .unwrap_err();
        assert!(err.to_string().contains("depends on itself"));
    }

    #[test]
    fn test_produces_normalizes_paths() {
        let t = target("outputs: [out/a.txt, ./bin//tool]\n");
        assert!(t.produces("./out//a.txt"));
        assert!(t.produces("bin/x/../tool"));
        assert!(!t.produces("out/b.txt"));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let t = target("run: make\nphony: true\n");
        assert_eq!(t.run, "make");
    }
}
