//! Source locations for manifest diagnostics.

use miette::SourceSpan;

/// Find the span of a top-level key (no indentation), e.g. `version:`.
pub(crate) fn find_top_level_key(src: &str, key: &str) -> Option<SourceSpan> {
    let pattern = format!("{key}:");
    let mut offset = 0;
    for line in src.split_inclusive('\n') {
        if line.starts_with(&pattern) {
            return Some(SourceSpan::from((offset, key.len())));
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_top_level_key() {
        let src = "project: demo\nversion: 1\ncommands:\n  version:\n    exec: x\n";
        let span = find_top_level_key(src, "version").unwrap();
        assert_eq!(span.offset(), 14);
        assert_eq!(span.len(), 7);
        assert!(find_top_level_key(src, "env").is_none());
    }

    #[test]
    fn test_nested_key_is_not_top_level() {
        assert!(find_top_level_key("commands:\n  project: x\n", "project").is_none());
    }
}
