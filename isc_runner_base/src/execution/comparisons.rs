//! # Value Comparison Operations
//!
//! Type-aware comparison primitives used by the expectation evaluator.

use crate::execution::evaluator::EvaluationError;
use chrono::{DateTime, Utc};
use isc_profile::model::Value;
use regex::Regex;
use std::cmp::Ordering;
use std::time::Duration;

/// Exact, type-aware equality
pub fn equals(actual: &Value, expected: &Value) -> bool {
    actual.structural_eq(expected)
}

/// Membership by structural equality
pub fn in_set(actual: &Value, set: &[Value]) -> bool {
    set.iter().any(|candidate| actual.structural_eq(candidate))
}

/// Numeric ordering; strings and containers never coerce
pub fn greater_or_equal(actual: &Value, expected: &Value) -> Result<bool, EvaluationError> {
    let ordering = match (actual, expected) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (a, b) if a.is_numeric() && b.is_numeric() => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
        _ => {
            return Err(EvaluationError::TypeMismatch {
                message: format!(
                    "cannot order {} against {}",
                    actual.type_name(),
                    expected.type_name()
                ),
            })
        }
    };
    Ok(matches!(ordering, Some(Ordering::Greater | Ordering::Equal)))
}

/// Whether at least `minimum` has elapsed since the RFC3339 timestamp held by `actual`
///
/// Timestamps in the future never satisfy the check.
pub fn age_at_least(
    actual: &Value,
    minimum: Duration,
    now: DateTime<Utc>,
) -> Result<bool, EvaluationError> {
    let raw = actual.as_str().ok_or_else(|| EvaluationError::TypeMismatch {
        message: format!("expected an RFC3339 timestamp string, got {}", actual.type_name()),
    })?;
    let timestamp = parse_timestamp(raw)?;

    let minimum = chrono::Duration::from_std(minimum).map_err(|e| EvaluationError::TypeMismatch {
        message: format!("age threshold out of range: {}", e),
    })?;
    Ok(now.signed_duration_since(timestamp) >= minimum)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, EvaluationError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| EvaluationError::InvalidTimestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

/// Full-match regular expression test against the stringified value
pub fn matches(actual: &Value, pattern: &str) -> Result<bool, EvaluationError> {
    let regex = compile_pattern(pattern)?;
    Ok(regex.is_match(&actual.stringify()))
}

/// Compile a pattern anchored at both ends
///
/// `\h` and `\H` are accepted as hex-digit and non-hex-digit classes.
pub fn compile_pattern(pattern: &str) -> Result<Regex, EvaluationError> {
    let translated = translate_hex_classes(pattern);
    Regex::new(&format!("^(?:{})$", translated)).map_err(|e| EvaluationError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn translate_hex_classes(pattern: &str) -> String {
    let mut output = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    // Nesting depth of bracket classes, e.g. `[[:alpha:]\h]`
    let mut depth = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('h') if depth > 0 => output.push_str("0-9a-fA-F"),
                Some('h') => output.push_str("[0-9a-fA-F]"),
                Some('H') => output.push_str("[^0-9a-fA-F]"),
                Some(other) => {
                    output.push('\\');
                    output.push(other);
                }
                None => output.push('\\'),
            },
            '[' => {
                depth += 1;
                output.push(c);
                // A leading `]` (after an optional `^`) is a literal member
                if chars.peek() == Some(&'^') {
                    output.push('^');
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    output.push(']');
                    chars.next();
                }
            }
            ']' if depth > 0 => {
                depth -= 1;
                output.push(c);
            }
            _ => output.push(c),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    #[test]
    fn test_matches_is_full_match() {
        let pattern = "bigip-\\h{4}";
        assert!(matches(&Value::from("bigip-a1b2"), pattern).unwrap());
        assert!(!matches(&Value::from("bigip-a1b2c"), pattern).unwrap());
        assert!(!matches(&Value::from("xbigip-a1b2"), pattern).unwrap());
        assert!(!matches(&Value::from("bigip-a1g2"), pattern).unwrap());
    }

    #[test]
    fn test_hex_class_translation() {
        assert_eq!(translate_hex_classes("\\h{4}"), "[0-9a-fA-F]{4}");
        assert_eq!(translate_hex_classes("[\\h-]+"), "[0-9a-fA-F-]+");
        assert_eq!(translate_hex_classes("\\H"), "[^0-9a-fA-F]");
        assert_eq!(translate_hex_classes("\\\\h"), "\\\\h");
        assert_eq!(translate_hex_classes("\\d\\."), "\\d\\.");
        assert_eq!(
            translate_hex_classes("[[:alpha:]\\h]+"),
            "[[:alpha:]0-9a-fA-F]+"
        );
        assert_eq!(translate_hex_classes("[]\\h]"), "[]0-9a-fA-F]");
        assert_eq!(translate_hex_classes("[^]x]\\h"), "[^]x][0-9a-fA-F]");
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let regex = compile_pattern("a|b").unwrap();
        assert!(regex.is_match("a"));
        assert!(!regex.is_match("ab"));
    }

    #[test]
    fn test_hex_escape_inside_posix_class() {
        let pattern = "[[:upper:]\\h]+";
        assert!(matches(&Value::from("XYZ0f9"), pattern).unwrap());
        assert!(!matches(&Value::from("XYZ0g9"), pattern).unwrap());
    }

    #[test]
    fn test_invalid_pattern() {
        assert_matches!(
            compile_pattern("bigip-("),
            Err(EvaluationError::InvalidPattern { .. })
        );
    }

    #[test]
    fn test_matches_stringifies_numbers() {
        assert!(matches(&Value::Integer(42), "\\d+").unwrap());
    }

    #[test]
    fn test_equals_is_type_aware() {
        assert!(equals(&Value::Integer(1), &Value::Float(1.0)));
        assert!(!equals(&Value::from("1"), &Value::Integer(1)));
        assert!(equals(
            &Value::mapping_of([("a", "1"), ("b", "2")]),
            &Value::mapping_of([("b", "2"), ("a", "1")])
        ));
    }

    #[test]
    fn test_in_set() {
        let zones = vec![Value::from("us-west1-a"), Value::from("us-west1-b")];
        assert!(in_set(&Value::from("us-west1-b"), &zones));
        assert!(!in_set(&Value::from("us-east1-b"), &zones));
        assert!(!in_set(&Value::from("us-west1-a"), &[]));
    }

    #[test]
    fn test_greater_or_equal_numeric() {
        assert!(greater_or_equal(&Value::Integer(2), &Value::Integer(2)).unwrap());
        assert!(greater_or_equal(&Value::Float(2.5), &Value::Integer(2)).unwrap());
        assert!(!greater_or_equal(&Value::Integer(1), &Value::Float(1.5)).unwrap());
        assert_matches!(
            greater_or_equal(&Value::from("3"), &Value::Integer(2)),
            Err(EvaluationError::TypeMismatch { .. })
        );
    }

    #[test]
    fn test_age_boundary() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let timestamp = Value::from("2024-01-01T00:00:00Z");
        let threshold = Duration::from_secs(360);

        let at = |secs| created + chrono::Duration::seconds(secs);
        assert!(age_at_least(&timestamp, threshold, at(360)).unwrap());
        assert!(!age_at_least(&timestamp, threshold, at(359)).unwrap());
        assert!(!age_at_least(&timestamp, threshold, at(-10)).unwrap());
    }

    #[test]
    fn test_age_accepts_offsets_and_fractions() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let timestamp = Value::from("2024-01-01T00:53:59.123-07:00");
        assert!(age_at_least(&timestamp, Duration::from_secs(360), now).unwrap());
        assert_matches!(
            age_at_least(&Value::from("yesterday"), Duration::from_secs(1), now),
            Err(EvaluationError::InvalidTimestamp { .. })
        );
        assert_matches!(
            age_at_least(&Value::Integer(0), Duration::from_secs(1), now),
            Err(EvaluationError::TypeMismatch { .. })
        );
    }
}
