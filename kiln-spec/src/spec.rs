use std::{collections::HashMap, path::Path};

use kiln_core::{Environment, substitute, yaml_scalar_to_string};
use serde::{Deserialize, Deserializer, de::Error as _};

use crate::{
    Target,
    error::{Error, Result},
};

/// A build file of the legacy format.
///
/// ```yaml
/// env:
///   OUT: build
/// targets:
///   app:
///     outputs: ["${OUT}/app"]
///     default: true
///     run: cc -o ${OUT}/app main.c
/// ```
///
/// Unknown keys are ignored. The environment is a plain map, so unlike a
/// manifest `env` block its entries cannot refer to each other in order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Spec {
    #[serde(default, deserialize_with = "deserialize_env")]
    env: HashMap<String, String>,

    #[serde(default, deserialize_with = "deserialize_targets")]
    targets: HashMap<String, Target>,
}

impl Spec {
    /// Load a spec file, resolving its environment against `env`.
    pub fn from_file(path: impl AsRef<Path>, env: &Environment) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::parse(&content, &path.display().to_string(), env)
    }

    /// Parse spec content. `filename` is only used in error reports.
    pub fn parse(content: &str, filename: &str, env: &Environment) -> Result<Self> {
        let mut spec: Spec = if content.trim().is_empty() {
            Spec::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| Error::format(content, filename, e))?
        };

        spec.resolve_env(env);
        spec.init_targets()?;

        tracing::debug!(
            file = filename,
            vars = spec.env.len(),
            targets = spec.targets.len(),
            "loaded spec"
        );
        Ok(spec)
    }

    /// Expand references in every value, first against the caller's
    /// environment and then against the spec's own values as they stand
    /// after that first pass. A caller variable wins over a spec variable of
    /// the same name.
    fn resolve_env(&mut self, caller: &Environment) {
        let inherited: HashMap<String, String> = self
            .env
            .iter()
            .map(|(k, v)| (k.clone(), substitute(v, |name| caller.get(name)).into_owned()))
            .collect();

        self.env = inherited
            .iter()
            .map(|(k, v)| {
                let value = substitute(v, |name| inherited.get(name).map(String::as_str));
                (k.clone(), value.into_owned())
            })
            .collect();
    }

    fn init_targets(&mut self) -> Result<()> {
        let names: Vec<String> = self.target_names().map(str::to_string).collect();
        for name in &names {
            let exists = |dep: &str| names.iter().any(|n| n == dep);
            if let Some(target) = self.targets.get_mut(name) {
                target.init(name, &self.env, exists)?;
            }
        }
        Ok(())
    }

    /// Resolved value of an environment variable.
    pub fn env(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    /// The resolved environment as sorted `KEY=VALUE` strings, ready to be
    /// passed to a child process.
    pub fn env_list(&self) -> Vec<String> {
        let mut list: Vec<String> = self.env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        list.sort();
        list
    }

    /// Target names in sorted order.
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        let mut names: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names.into_iter()
    }

    /// Targets in name order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.target_names().filter_map(|name| self.targets.get(name))
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    /// The first target, in name order, flagged `default`.
    ///
    /// Several default targets are not an error.
    pub fn default_target(&self) -> Option<&Target> {
        self.targets().find(|t| t.default)
    }

    /// The first target, in name order, that declares `path` as an output.
    pub fn target_with_output(&self, path: impl AsRef<Path>) -> Option<&Target> {
        let path = path.as_ref();
        self.targets().find(|t| t.produces(path))
    }
}

fn deserialize_env<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, serde_yaml::Value>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| match yaml_scalar_to_string(&value) {
            Some(s) => Ok((key, s)),
            None => Err(D::Error::custom(format!(
                "env value for '{key}' must be a scalar"
            ))),
        })
        .collect()
}

/// Accepts `name:` with no body as a target with default settings.
fn deserialize_targets<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, Target>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<HashMap<String, Option<Target>>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, target)| (name, target.unwrap_or_default()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Spec> {
        Spec::parse(content, "kiln.spec.yaml", &Environment::new())
    }

    fn parse_with(content: &str, pairs: &[(&str, &str)]) -> Result<Spec> {
        let env: Environment = pairs.iter().copied().collect();
        Spec::parse(content, "kiln.spec.yaml", &env)
    }

    const SAMPLE: &str = r#"
env:
  OUT: build
  CC: gcc
targets:
  app:
    outputs: ["${OUT}/app"]
    deps: [lib]
    default: true
    run: ${CC} -o ${OUT}/app main.c
  lib:
    outputs: ["${OUT}/libfoo.a"]
    run: ar rcs ${OUT}/libfoo.a foo.o
  docs:
"#;

    #[test]
    fn test_parse_sample() {
        let spec = parse(SAMPLE).unwrap();

        assert_eq!(spec.env("OUT"), Some("build"));
        assert_eq!(spec.target_names().collect::<Vec<_>>(), ["app", "docs", "lib"]);

        let app = spec.target("app").unwrap();
        assert_eq!(app.name(), "app");
        assert_eq!(app.outputs, vec!["build/app"]);
        assert_eq!(app.run, "gcc -o build/app main.c");

        let docs = spec.target("docs").unwrap();
        assert_eq!(docs.name(), "docs");
        assert!(docs.outputs.is_empty());
    }

    #[test]
    fn test_env_list_is_sorted() {
        let spec = parse("env:\n  Z: z\n  A: a\n  M: \"1\"\n").unwrap();
        assert_eq!(spec.env_list(), vec!["A=a", "M=1", "Z=z"]);
    }

    #[test]
    fn test_env_scalars_are_stringified() {
        let spec = parse("env:\n  N: 42\n  B: true\n  E:\n").unwrap();
        assert_eq!(spec.env("N"), Some("42"));
        assert_eq!(spec.env("B"), Some("true"));
        assert_eq!(spec.env("E"), Some(""));
    }

    #[test]
    fn test_env_rejects_nested_values() {
        let err = parse("env:\n  DB: {host: x}\n").unwrap_err();
        assert!(matches!(&*err, Error::Format { .. }));
    }

    #[test]
    fn test_env_caller_then_spec() {
        let spec = parse_with(
            "env:\n  ROOT: ${HOME}/src\n  BIN: ${ROOT}/bin\n  USER: spec\n  WHO: ${USER}\n",
            &[("HOME", "/home/ada"), ("USER", "ada")],
        )
        .unwrap();

        assert_eq!(spec.env("ROOT"), Some("/home/ada/src"));
        assert_eq!(spec.env("BIN"), Some("/home/ada/src/bin"));
        // The caller's value is substituted before the spec's own
        assert_eq!(spec.env("WHO"), Some("ada"));
        assert_eq!(spec.env("USER"), Some("spec"));
        // Caller variables are not exported
        assert_eq!(spec.env("HOME"), None);
    }

    #[test]
    fn test_env_unknown_reference_stays_literal() {
        let spec = parse("env:\n  A: ${NOPE}/x\n").unwrap();
        assert_eq!(spec.env("A"), Some("${NOPE}/x"));
    }

    #[test]
    fn test_default_target() {
        let spec = parse(SAMPLE).unwrap();
        assert_eq!(spec.default_target().unwrap().name(), "app");

        let spec = parse("targets:\n  a:\n    run: x\n").unwrap();
        assert!(spec.default_target().is_none());
    }

    #[test]
    fn test_multiple_defaults_first_in_name_order() {
        let spec = parse("targets:\n  zeta:\n    default: true\n  alpha:\n    default: true\n")
            .unwrap();
        assert_eq!(spec.default_target().unwrap().name(), "alpha");
    }

    #[test]
    fn test_target_with_output() {
        let spec = parse(SAMPLE).unwrap();
        assert_eq!(spec.target_with_output("./build//app").unwrap().name(), "app");
        assert_eq!(
            spec.target_with_output("build/tmp/../libfoo.a").unwrap().name(),
            "lib"
        );
        assert!(spec.target_with_output("build/other").is_none());
    }

    #[test]
    fn test_target_init_error_names_target() {
        let err = parse("targets:\n  app:\n    deps: [ghost]\n").unwrap_err();
        match &*err {
            Error::TargetInit { name, reason } => {
                assert_eq!(name, "app");
                assert_eq!(reason, "unknown dependency 'ghost'");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let spec = parse("version: 1\noptions: {x: y}\nenv:\n  A: a\n").unwrap();
        assert_eq!(spec.env("A"), Some("a"));
    }

    #[test]
    fn test_empty_document() {
        let spec = parse("").unwrap();
        assert!(spec.env_list().is_empty());
        assert_eq!(spec.targets().count(), 0);
    }

    #[test]
    fn test_malformed_yaml() {
        let err = parse("env: [unterminated\n").unwrap_err();
        assert!(matches!(&*err, Error::Format { filename, .. } if filename == "kiln.spec.yaml"));
    }
}
