//! Expectation evaluator
//!
//! Pure and synchronous: given one snapshot, one expectation and a clock,
//! produce a [`Verdict`]. Evaluation problems never escape as errors; they
//! become failing verdicts carrying the reason.

use crate::execution::clock::Clock;
use crate::execution::comparisons;
use crate::types::{ResolveError, ResourceSnapshot};
use isc_profile::model::{Comparator, Expectation, Expected, Value};
use serde::{Deserialize, Serialize};

/// Why an expectation could not be evaluated to a plain pass or fail
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("field '{field}' not found")]
    FieldNotFound { field: String },

    #[error("invalid field path '{field}': {reason}")]
    InvalidPath { field: String, reason: String },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("type mismatch: {message}")]
    TypeMismatch { message: String },

    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

impl From<ResolveError> for EvaluationError {
    fn from(error: ResolveError) -> Self {
        let reason = error.to_string();
        match error {
            ResolveError::NotFound { path } => EvaluationError::FieldNotFound { field: path },
            ResolveError::NotTraversable { path, .. } => {
                EvaluationError::InvalidPath { field: path, reason }
            }
        }
    }
}

/// Outcome of one expectation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
}

impl Verdict {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            ..Self::pass(message)
        }
    }

    fn with_values(mut self, expected: &Expected, actual: Option<&Value>) -> Self {
        if !matches!(expected, Expected::Nothing) {
            self.expected = Some(expected.to_string());
        }
        self.actual = actual.cloned();
        self
    }
}

/// Evaluate one expectation against a snapshot
pub fn evaluate(
    snapshot: &ResourceSnapshot,
    expectation: &Expectation,
    clock: &dyn Clock,
) -> Verdict {
    let summary = expectation.summary();

    if expectation.comparator == Comparator::Exists {
        let passed = snapshot.exists != expectation.negate;
        let message = if passed {
            summary
        } else if snapshot.exists {
            format!("{}: resource exists", summary)
        } else {
            format!("{}: resource does not exist", summary)
        };
        return Verdict {
            passed,
            ..Verdict::pass(message)
        };
    }

    if !snapshot.exists {
        return Verdict::fail(format!("{}: resource does not exist", summary));
    }

    let Some(field) = &expectation.field else {
        return Verdict::fail(format!(
            "{}: {}",
            summary,
            EvaluationError::InvalidPath {
                field: String::new(),
                reason: format!("'{}' requires a field", expectation.comparator),
            }
        ));
    };

    let actual = match snapshot.resolve(field) {
        Ok(value) => Some(value),
        Err(ResolveError::NotFound { .. }) if expectation.comparator == Comparator::IsNull => None,
        Err(e) => {
            return Verdict::fail(format!("{}: {}", summary, EvaluationError::from(e)))
                .with_values(&expectation.expected, None)
        }
    };

    let outcome = match actual {
        // Absent field under is_null
        None => Ok(true),
        Some(value) => compare(value, expectation, clock),
    };

    match outcome {
        Ok(raw) => {
            let passed = raw != expectation.negate;
            let verdict = if passed {
                Verdict::pass(summary)
            } else {
                let got = match actual {
                    Some(value) => value.to_string(),
                    None => "absent".to_string(),
                };
                Verdict::fail(format!("{}: got {}", summary, got))
            };
            verdict.with_values(&expectation.expected, actual)
        }
        Err(e) => Verdict::fail(format!("{}: {}", summary, e))
            .with_values(&expectation.expected, actual),
    }
}

fn compare(
    actual: &Value,
    expectation: &Expectation,
    clock: &dyn Clock,
) -> Result<bool, EvaluationError> {
    let missing_expected = || EvaluationError::TypeMismatch {
        message: format!("'{}' has no usable expected value", expectation.comparator),
    };

    match (expectation.comparator, &expectation.expected) {
        (Comparator::Exists, _) => Ok(true),
        (Comparator::IsNull, _) => Ok(false),
        (Comparator::IsEmpty, _) => Ok(actual.len() == Some(0)),

        (Comparator::Equals, Expected::Value(expected)) => Ok(comparisons::equals(actual, expected)),

        (Comparator::Matches, Expected::Value(Value::String(pattern))) => {
            comparisons::matches(actual, pattern)
        }

        (Comparator::InSet, Expected::Value(Value::Sequence(set))) => {
            Ok(comparisons::in_set(actual, set))
        }
        (Comparator::InSet, Expected::Value(other)) => Err(EvaluationError::TypeMismatch {
            message: format!("'in_set' needs a sequence, got {}", other.type_name()),
        }),

        (Comparator::GreaterOrEqual, Expected::MinimumAge(minimum)) => {
            comparisons::age_at_least(actual, *minimum, clock.now())
        }
        (Comparator::GreaterOrEqual, Expected::Value(expected)) => {
            comparisons::greater_or_equal(actual, expected)
        }

        _ => Err(missing_expected()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use isc_profile::model::FieldPath;
    use std::time::Duration;

    fn clock() -> FixedClock {
        FixedClock::at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 6, 0).unwrap())
    }

    fn instance() -> ResourceSnapshot {
        let json = serde_json::json!({
            "name": "bigip-1a2b",
            "status": "RUNNING",
            "disk_count": 1,
            "creation_timestamp": "2024-01-01T00:00:00Z",
            "labels": {"env": "prod", "owner": "net"},
            "tags": [],
            "description": "",
            "serviceAccounts": [{"email": "bigip@p.iam.gserviceaccount.com"}]
        });
        ResourceSnapshot::from_json_object(json.as_object().unwrap())
    }

    fn expect(field: &str, comparator: Comparator, expected: Expected) -> Expectation {
        Expectation::field(FieldPath::parse(field).unwrap(), comparator, expected)
    }

    fn value(v: impl Into<Value>) -> Expected {
        Expected::Value(v.into())
    }

    fn run(expectation: &Expectation) -> Verdict {
        evaluate(&instance(), expectation, &clock())
    }

    #[test]
    fn test_exists() {
        assert!(evaluate(&instance(), &Expectation::exists(), &clock()).passed);

        let verdict = evaluate(&ResourceSnapshot::missing(), &Expectation::exists(), &clock());
        assert!(!verdict.passed);
        assert!(verdict.message.contains("resource does not exist"));

        let negated = Expectation::exists().negated();
        assert!(evaluate(&ResourceSnapshot::missing(), &negated, &clock()).passed);
    }

    #[test]
    fn test_missing_resource_fails_field_expectations() {
        let expectation = expect("status", Comparator::IsNull, Expected::Nothing);
        let verdict = evaluate(&ResourceSnapshot::missing(), &expectation, &clock());
        assert!(!verdict.passed);
        assert!(verdict.message.ends_with("resource does not exist"));
    }

    #[test]
    fn test_equals_and_reflexivity() {
        assert!(run(&expect("status", Comparator::Equals, value("RUNNING"))).passed);
        assert!(run(&expect("disk_count", Comparator::Equals, value(1i64))).passed);
        assert!(!run(&expect("disk_count", Comparator::Equals, value("1"))).passed);

        let snapshot = instance();
        for (name, attribute) in &snapshot.attributes {
            let expectation = expect(name, Comparator::Equals, Expected::Value(attribute.clone()));
            assert!(evaluate(&snapshot, &expectation, &clock()).passed, "{}", name);
        }
    }

    #[test]
    fn test_field_not_found_fails() {
        let verdict = run(&expect("zone", Comparator::Equals, value("us-west1-a")));
        assert!(!verdict.passed);
        assert!(verdict.message.contains("field 'zone' not found"));
    }

    #[test]
    fn test_negate_never_turns_missing_field_into_pass() {
        let expectation = expect("zone", Comparator::Equals, value("x")).negated();
        assert!(!run(&expectation).passed);

        let expectation = expect("name", Comparator::Matches, value("bad-(")).negated();
        assert!(!run(&expectation).passed);

        let expectation = expect("status", Comparator::Equals, value("STOPPED")).negated();
        assert!(run(&expectation).passed);
    }

    #[test]
    fn test_is_null_and_is_empty_are_distinct() {
        // absent field
        assert!(run(&expect("zone", Comparator::IsNull, Expected::Nothing)).passed);
        assert!(!run(&expect("zone", Comparator::IsEmpty, Expected::Nothing)).passed);

        // present, zero-length
        for field in ["tags", "description"] {
            assert!(!run(&expect(field, Comparator::IsNull, Expected::Nothing)).passed);
            assert!(run(&expect(field, Comparator::IsEmpty, Expected::Nothing)).passed);
        }

        // present, non-empty
        assert!(!run(&expect("labels", Comparator::IsNull, Expected::Nothing)).passed);
        assert!(!run(&expect("labels", Comparator::IsEmpty, Expected::Nothing)).passed);
        assert!(run(&expect("labels", Comparator::IsNull, Expected::Nothing).negated()).passed);
    }

    #[test]
    fn test_matches_full_match() {
        assert!(run(&expect("name", Comparator::Matches, value("bigip-\\h{4}"))).passed);
        assert!(!run(&expect("name", Comparator::Matches, value("bigip-\\h{3}"))).passed);
    }

    #[test]
    fn test_in_set_and_nested_paths() {
        let zones = Value::Sequence(vec![Value::from("bigip-1a2b")]);
        assert!(run(&expect("name", Comparator::InSet, Expected::Value(zones))).passed);
        assert!(run(&expect(
            "serviceAccounts[0].email",
            Comparator::Equals,
            value("bigip@p.iam.gserviceaccount.com")
        ))
        .passed);
    }

    #[test]
    fn test_mapping_equality_ignores_order() {
        let labels = Value::mapping_of([("owner", "net"), ("env", "prod")]);
        assert!(run(&expect("labels", Comparator::Equals, Expected::Value(labels))).passed);
        let subset = Value::mapping_of([("env", "prod")]);
        assert!(!run(&expect("labels", Comparator::Equals, Expected::Value(subset))).passed);
    }

    #[test]
    fn test_uptime_boundary() {
        let minimum = Expected::MinimumAge(Duration::from_secs(360));
        let expectation = expect("creation_timestamp", Comparator::GreaterOrEqual, minimum);

        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let at = |secs| FixedClock::at(created + chrono::Duration::seconds(secs));
        assert!(evaluate(&instance(), &expectation, &at(360)).passed);
        assert!(!evaluate(&instance(), &expectation, &at(359)).passed);
    }

    #[test]
    fn test_failure_records_expected_and_actual() {
        let verdict = run(&expect("status", Comparator::Equals, value("TERMINATED")));
        assert!(!verdict.passed);
        assert_eq!(verdict.expected.as_deref(), Some("\"TERMINATED\""));
        assert_eq!(verdict.actual, Some(Value::from("RUNNING")));
        assert!(verdict.message.contains("got \"RUNNING\""));
    }
}
