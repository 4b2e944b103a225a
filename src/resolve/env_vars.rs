//! Environment variable expansion for manifest path patterns.
//!
//! Manifests are written for Windows hosts but the collector runs anywhere,
//! so both `%VAR%` and `$VAR`/`${VAR}` forms are understood regardless of
//! platform. Expansion is a single pass: substituted values are never
//! rescanned for further variables.

/// Expands `%VAR%` references against the process environment.
///
/// References to unset variables are left in place.
pub fn expand_windows_vars(pattern: &str) -> String {
    let mut result = pattern.to_string();
    let mut from = 0;

    while let Some(open) = find_from(&result, from, '%') {
        let close = match find_from(&result, open + 1, '%') {
            Some(close) => close,
            None => break,
        };
        let name = result[open + 1..close].to_string();
        match std::env::var(&name) {
            Ok(value) => {
                result.replace_range(open..=close, &value);
                from = open + value.len();
            }
            Err(_) => from = close + 1,
        }
    }

    result
}

/// Expands `$VAR` and `${VAR}` references against the process environment.
///
/// Braced references to unset variables collapse to nothing; bare `$VAR`
/// references to unset variables are left in place. A bare name runs to the
/// first character that is not alphanumeric or an underscore.
pub fn expand_unix_vars(pattern: &str) -> String {
    let mut result = pattern.to_string();
    let mut from = 0;

    while let Some(open) = find_from(&result, from, '$') {
        let rest = &result[open + 1..];

        if let Some(brace_rest) = rest.strip_prefix('{') {
            let offset = match brace_rest.find('}') {
                Some(offset) => offset,
                None => break,
            };
            let name = brace_rest[..offset].to_string();
            let close = open + 2 + offset;
            let value = std::env::var(&name).unwrap_or_default();
            result.replace_range(open..=close, &value);
            from = open + value.len();
            continue;
        }

        let name_len = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .count();
        if name_len == 0 {
            from = open + 1;
            continue;
        }

        let name = result[open + 1..open + 1 + name_len].to_string();
        match std::env::var(&name) {
            Ok(value) => {
                result.replace_range(open..open + 1 + name_len, &value);
                from = open + value.len();
            }
            Err(_) => from = open + 1 + name_len,
        }
    }

    result
}

/// Rewrites path separators to the current platform's convention.
pub fn normalize_separators(path: &str) -> String {
    if cfg!(windows) {
        path.replace('/', "\\")
    } else {
        path.replace('\\', "/")
    }
}

fn find_from(haystack: &str, from: usize, needle: char) -> Option<usize> {
    haystack[from..].find(needle).map(|pos| from + pos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::env;

    #[test]
    fn windows_vars_expand_in_place() {
        env::set_var("ODC_WINDIR_TEST", "/fake/windows");
        assert_eq!(expand_windows_vars("%ODC_WINDIR_TEST%"), "/fake/windows");
        assert_eq!(
            expand_windows_vars("%ODC_WINDIR_TEST%\\debug\\netlogon.log"),
            "/fake/windows\\debug\\netlogon.log"
        );
        env::remove_var("ODC_WINDIR_TEST");
    }

    #[test]
    fn windows_vars_expand_repeatedly() {
        env::set_var("ODC_REPEAT_TEST", "x");
        assert_eq!(
            expand_windows_vars("%ODC_REPEAT_TEST%/%ODC_REPEAT_TEST%"),
            "x/x"
        );
        env::remove_var("ODC_REPEAT_TEST");
    }

    #[test]
    fn unset_windows_vars_stay_put() {
        assert_eq!(
            expand_windows_vars("%ODC_NOT_SET_ANYWHERE%\\file.txt"),
            "%ODC_NOT_SET_ANYWHERE%\\file.txt"
        );
    }

    #[test]
    fn stray_percent_signs_survive() {
        assert_eq!(expand_windows_vars("%INCOMPLETE"), "%INCOMPLETE");
        assert_eq!(expand_windows_vars("%%"), "%%");
        assert_eq!(expand_windows_vars("100% done"), "100% done");
    }

    #[test]
    fn unix_vars_expand_both_forms() {
        env::set_var("ODC_UNIX_TEST", "/var/log");
        assert_eq!(expand_unix_vars("$ODC_UNIX_TEST"), "/var/log");
        assert_eq!(expand_unix_vars("${ODC_UNIX_TEST}/app"), "/var/log/app");
        assert_eq!(
            expand_unix_vars("$ODC_UNIX_TEST/${ODC_UNIX_TEST}"),
            "/var/log//var/log"
        );
        env::remove_var("ODC_UNIX_TEST");
    }

    #[test]
    fn bare_names_stop_at_non_word_characters() {
        env::set_var("ODC_BOUNDARY", "edge");
        assert_eq!(expand_unix_vars("$ODC_BOUNDARY-suffix"), "edge-suffix");
        assert_eq!(expand_unix_vars("$ODC_BOUNDARY2"), "$ODC_BOUNDARY2");
        env::remove_var("ODC_BOUNDARY");
    }

    #[test]
    fn unset_unix_vars_follow_their_form() {
        assert_eq!(expand_unix_vars("$ODC_MISSING/path"), "$ODC_MISSING/path");
        assert_eq!(expand_unix_vars("${ODC_MISSING}/path"), "/path");
    }

    #[test]
    fn stray_dollar_signs_survive() {
        assert_eq!(expand_unix_vars("$"), "$");
        assert_eq!(expand_unix_vars("$$"), "$$");
        assert_eq!(expand_unix_vars("${"), "${");
        assert_eq!(expand_unix_vars("${incomplete"), "${incomplete");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        env::set_var("ODC_OUTER_TEST", "%ODC_OUTER_TEST%");
        assert_eq!(expand_windows_vars("%ODC_OUTER_TEST%"), "%ODC_OUTER_TEST%");
        env::remove_var("ODC_OUTER_TEST");
    }

    #[test]
    fn separators_follow_the_platform() {
        if cfg!(windows) {
            assert_eq!(normalize_separators("C:/Users/test"), "C:\\Users\\test");
        } else {
            assert_eq!(normalize_separators("C:\\Users\\test"), "C:/Users/test");
            assert_eq!(normalize_separators("already/fine"), "already/fine");
        }
    }

    proptest! {
        #[test]
        fn plain_text_passes_through_unchanged(s in "[A-Za-z0-9 ./_-]*") {
            prop_assert_eq!(expand_windows_vars(&s), s.clone());
            prop_assert_eq!(expand_unix_vars(&s), s);
        }
    }
}
