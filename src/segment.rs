//! Validation of names that end up as URL path segments.

/// Strings that cannot be used as names specified as path segments.
pub const NAME_MAY_NOT_BE: &[&str] = &[".", ".."];

/// Substrings that cannot appear in names specified as path segments.
pub const NAME_MAY_NOT_CONTAIN: &[&str] = &["/", "%"];

/// Validates that `name` can be safely used as a single path segment.
///
/// Returns one human-readable reason per violated rule. An empty vector means
/// the name is valid.
///
/// # Examples
///
/// ```
/// use restcall::segment::validate_path_segment;
///
/// assert!(validate_path_segment("widgets").is_empty());
/// assert_eq!(validate_path_segment(".."), vec!["may not be '..'"]);
/// assert_eq!(validate_path_segment("a/%").len(), 2);
/// ```
pub fn validate_path_segment(name: &str) -> Vec<String> {
    let mut reasons: Vec<String> = NAME_MAY_NOT_BE
        .iter()
        .filter(|illegal| name == **illegal)
        .map(|illegal| format!("may not be '{}'", illegal))
        .collect();

    reasons.extend(
        NAME_MAY_NOT_CONTAIN
            .iter()
            .filter(|illegal| name.contains(**illegal))
            .map(|illegal| format!("may not contain '{}'", illegal)),
    );

    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_names_are_rejected() {
        assert_eq!(validate_path_segment("."), vec!["may not be '.'"]);
        assert_eq!(validate_path_segment(".."), vec!["may not be '..'"]);
    }

    #[test]
    fn test_forbidden_substrings_each_reported() {
        assert_eq!(validate_path_segment("a/b"), vec!["may not contain '/'"]);
        assert_eq!(validate_path_segment("a%b"), vec!["may not contain '%'"]);
        assert_eq!(
            validate_path_segment("a/%"),
            vec!["may not contain '/'", "may not contain '%'"]
        );
    }

    #[test]
    fn test_plain_names_pass() {
        assert!(validate_path_segment("widgets").is_empty());
        assert!(validate_path_segment("...").is_empty());
        assert!(validate_path_segment("").is_empty());
    }
}
