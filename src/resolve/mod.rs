// Re-export all items from the submodules
mod env_vars;

// Re-export environment variable helpers
pub use env_vars::{expand_unix_vars, expand_windows_vars, normalize_separators};

use std::path::PathBuf;

use log::{debug, warn};

/// Expands a manifest path pattern into the existing regular files it names.
///
/// Environment variables are substituted first (`%VAR%`, then `$VAR` and
/// `${VAR}`), double quotes are stripped, separators are normalized for the
/// current platform, and the result is globbed when it still contains a `*`.
/// Candidates that are not existing regular files are dropped without an
/// error: a pattern that matches nothing is an ordinary outcome, not a
/// failure.
pub fn resolve_pattern(pattern: &str) -> Vec<PathBuf> {
    let mut expanded = pattern.to_string();
    if expanded.contains('%') {
        expanded = expand_windows_vars(&expanded);
    }
    if expanded.contains('$') {
        expanded = expand_unix_vars(&expanded);
    }
    let expanded = normalize_separators(&expanded.replace('"', ""));

    let candidates: Vec<PathBuf> = if expanded.contains('*') {
        match glob::glob(&expanded) {
            Ok(paths) => paths
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(err) => {
                        debug!("skipping unreadable glob match: {err}");
                        None
                    }
                })
                .collect(),
            Err(err) => {
                warn!("invalid glob pattern '{expanded}': {err}");
                Vec::new()
            }
        }
    } else {
        vec![PathBuf::from(&expanded)]
    };

    let files: Vec<PathBuf> = candidates
        .into_iter()
        .filter(|path| path.is_file())
        .collect();
    debug!("pattern '{pattern}' resolved to {} file(s)", files.len());
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn literal_path_resolves_to_one_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("app.log");
        fs::write(&target, "entry").unwrap();

        let resolved = resolve_pattern(&target.to_string_lossy());
        assert_eq!(resolved, vec![target]);
    }

    #[test]
    fn missing_literal_path_resolves_to_nothing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("not_there.log");
        assert!(resolve_pattern(&target.to_string_lossy()).is_empty());
    }

    #[test]
    fn wildcard_matches_files_but_not_directories() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("one.log"), "1").unwrap();
        fs::write(dir.path().join("two.log"), "2").unwrap();
        fs::write(dir.path().join("three.log"), "3").unwrap();
        fs::create_dir(dir.path().join("four.log")).unwrap();

        let pattern = dir.path().join("*.log");
        let resolved = resolve_pattern(&pattern.to_string_lossy());
        assert_eq!(resolved.len(), 3);
        assert!(resolved.iter().all(|path| path.is_file()));
    }

    #[test]
    fn double_quotes_are_stripped() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("quoted.log");
        fs::write(&target, "q").unwrap();

        let quoted = format!("\"{}\"", target.display());
        assert_eq!(resolve_pattern(&quoted), vec![target]);
    }

    #[test]
    fn environment_variables_expand_before_matching() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("expanded.log");
        fs::write(&target, "e").unwrap();

        env::set_var("ODC_RESOLVE_ROOT", dir.path());
        let resolved = resolve_pattern("%ODC_RESOLVE_ROOT%/expanded.log");
        env::remove_var("ODC_RESOLVE_ROOT");
        assert_eq!(resolved, vec![target]);
    }

    #[test]
    fn invalid_glob_pattern_resolves_to_nothing() {
        assert!(resolve_pattern("/tmp/broken[*").is_empty());
    }

    #[test]
    fn empty_pattern_resolves_to_nothing() {
        assert!(resolve_pattern("").is_empty());
    }
}
