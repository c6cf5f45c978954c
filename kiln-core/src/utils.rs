//! Shared value and path helpers.

use std::path::{Component, Path, PathBuf};

/// Convert a YAML scalar to the string form a manifest author expects.
///
/// Returns `None` for sequences and mappings. Null becomes the empty string
/// and tagged scalars are unwrapped.
pub fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Null => Some(String::new()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
        serde_yaml::Value::Sequence(_) | serde_yaml::Value::Mapping(_) => None,
    }
}

/// Lexically normalize a path (e.g., "./out//a/../b.txt" -> "out/b.txt").
///
/// Does not touch the filesystem, so symlinks are not resolved. An empty
/// result becomes ".".
pub fn clean_path(path: impl AsRef<Path>) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                // ".." directly under the root stays at the root
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}
