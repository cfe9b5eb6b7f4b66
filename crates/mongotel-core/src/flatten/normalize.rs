//! Field name normalization into metric name tokens.
//!
//! `asserts` stays `asserts`, `totalCreated` becomes `total_created`,
//! `bytes currently in the cache` becomes `bytes_currently_in_the_cache`.
//! Consecutive underscores are kept as produced.

/// Converts a mixed-case field name into a lowercase, underscore-delimited token.
///
/// - lowercase ASCII letters and digits pass through;
/// - an uppercase ASCII letter becomes `_` followed by its lowercase form;
/// - any other character (punctuation, whitespace, non-ASCII) becomes `_`.
pub fn normalize(field_name: &str) -> String {
    let mut out = String::with_capacity(field_name.len() + 4);
    for c in field_name.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }
    out
}

/// Joins a name and a normalized segment with `_`. An empty base yields the segment.
pub fn join(base: &str, segment: &str) -> String {
    if base.is_empty() {
        return segment.to_string();
    }
    let mut out = String::with_capacity(base.len() + 1 + segment.len());
    out.push_str(base);
    out.push('_');
    out.push_str(segment);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_passthrough() {
        assert_eq!(normalize("asserts"), "asserts");
        assert_eq!(normalize("r2d2"), "r2d2");
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(normalize("totalCreated"), "total_created");
        assert_eq!(normalize("serverStatus"), "server_status");
    }

    #[test]
    fn test_leading_uppercase() {
        assert_eq!(normalize("Global"), "_global");
    }

    #[test]
    fn test_acronym_is_not_collapsed() {
        assert_eq!(normalize("journaledMB"), "journaled_m_b");
    }

    #[test]
    fn test_spaces_and_punctuation() {
        assert_eq!(
            normalize("bytes currently in the cache"),
            "bytes_currently_in_the_cache"
        );
        assert_eq!(normalize("a.b-c"), "a_b_c");
        assert_eq!(normalize("a  b"), "a__b");
    }

    #[test]
    fn test_non_ascii() {
        assert_eq!(normalize("héllo"), "h_llo");
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_join() {
        assert_eq!(join("p", "a"), "p_a");
        assert_eq!(join("", "a"), "a");
    }
}
