use std::collections::BTreeSet;
use std::fmt;
use crate::config::CompletionPolicy;
use crate::metrics::FieldMap;

/// REDCap instrument status code for one calculation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Incomplete,
    Complete,
}

impl CompletionStatus {
    pub fn code(&self) -> &'static str {
        match self {
            CompletionStatus::Incomplete => "1",
            CompletionStatus::Complete => "2",
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<bool> for CompletionStatus {
    fn from(complete: bool) -> Self {
        if complete {
            CompletionStatus::Complete
        } else {
            CompletionStatus::Incomplete
        }
    }
}

/// Decides a method's status from the patient's accumulated fields.
///
/// `expected` is the union of fields across the method's structure mappings.
/// Under `AnyPresent` a zero value counts the same as an absent one.
pub fn evaluate(
    policy: CompletionPolicy,
    fields: &FieldMap,
    expected: &BTreeSet<String>,
) -> CompletionStatus {
    match policy {
        CompletionPolicy::AllComplete => CompletionStatus::Complete,
        CompletionPolicy::Strict => expected
            .iter()
            .all(|field| matches!(fields.get(field), Some(Some(_))))
            .into(),
        CompletionPolicy::AnyPresent => expected
            .iter()
            .any(|field| matches!(fields.get(field), Some(Some(v)) if *v != 0.0))
            .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected() -> BTreeSet<String> {
        ["ctv_d90", "rect_d2cc", "uret_d01cc"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn fields(entries: &[(&str, Option<f64>)]) -> FieldMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_all_complete_ignores_data() {
        let empty = FieldMap::new();
        assert_eq!(
            evaluate(CompletionPolicy::AllComplete, &empty, &expected()),
            CompletionStatus::Complete
        );
    }

    #[test]
    fn test_strict_requires_every_field() {
        let partial = fields(&[("ctv_d90", Some(150.2)), ("rect_d2cc", Some(3.1))]);
        assert_eq!(
            evaluate(CompletionPolicy::Strict, &partial, &expected()),
            CompletionStatus::Incomplete
        );

        let with_gap = fields(&[
            ("ctv_d90", Some(150.2)),
            ("rect_d2cc", None),
            ("uret_d01cc", Some(1.0)),
        ]);
        assert_eq!(
            evaluate(CompletionPolicy::Strict, &with_gap, &expected()),
            CompletionStatus::Incomplete
        );

        let full = fields(&[
            ("ctv_d90", Some(150.2)),
            ("rect_d2cc", Some(0.0)),
            ("uret_d01cc", Some(1.0)),
        ]);
        assert_eq!(
            evaluate(CompletionPolicy::Strict, &full, &expected()),
            CompletionStatus::Complete
        );
    }

    #[test]
    fn test_any_present_treats_zero_as_absent() {
        let zeros = fields(&[("ctv_d90", Some(0.0)), ("rect_d2cc", None)]);
        assert_eq!(
            evaluate(CompletionPolicy::AnyPresent, &zeros, &expected()),
            CompletionStatus::Incomplete
        );

        let one = fields(&[("ctv_d90", Some(0.0)), ("uret_d01cc", Some(12.0))]);
        assert_eq!(
            evaluate(CompletionPolicy::AnyPresent, &one, &expected()),
            CompletionStatus::Complete
        );
    }

    #[test]
    fn test_any_present_ignores_unexpected_fields() {
        let other_method = fields(&[("ctv_d90_v2", Some(150.0))]);
        assert_eq!(
            evaluate(CompletionPolicy::AnyPresent, &other_method, &expected()),
            CompletionStatus::Incomplete
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CompletionStatus::Incomplete.code(), "1");
        assert_eq!(CompletionStatus::Complete.to_string(), "2");
    }
}
