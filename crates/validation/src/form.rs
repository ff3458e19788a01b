//! Mapping pipeline findings onto a form.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::issue::ValidationError;

/// The error a form shows next to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormError {
    /// The issue code, e.g. `REQUIRED` or `IP_CONFLICT`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&ValidationError> for FormError {
    fn from(issue: &ValidationError) -> Self {
        Self {
            kind: issue.code.clone(),
            message: issue.message.clone(),
        }
    }
}

/// Anything that can display a per-field error.
pub trait FieldErrorSink {
    /// Show `error` next to the field at `path`.
    fn set_field_error(&mut self, path: &str, error: FormError);
}

impl FieldErrorSink for IndexMap<String, FormError> {
    fn set_field_error(&mut self, path: &str, error: FormError) {
        self.insert(path.to_owned(), error);
    }
}

/// Pick the first finding of each field, in stage order.
///
/// A field with several findings surfaces only the earliest one.
#[must_use]
pub fn map_to_form_errors(
    field_errors: &IndexMap<String, Vec<ValidationError>>,
) -> IndexMap<String, FormError> {
    field_errors
        .iter()
        .filter_map(|(path, issues)| {
            issues
                .first()
                .map(|issue| (path.clone(), FormError::from(issue)))
        })
        .collect()
}

/// Feed [`map_to_form_errors`] output into `sink`. Returns the number of fields set.
pub fn apply_form_errors(
    field_errors: &IndexMap<String, Vec<ValidationError>>,
    sink: &mut dyn FieldErrorSink,
) -> usize {
    let mapped = map_to_form_errors(field_errors);
    let count = mapped.len();
    for (path, error) in mapped {
        sink.set_field_error(&path, error);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageName;
    use pretty_assertions::assert_eq;

    fn field_errors() -> IndexMap<String, Vec<ValidationError>> {
        let mut map = IndexMap::new();
        map.insert(
            "address".to_owned(),
            vec![
                ValidationError::new(StageName::Schema, "INVALID_FORMAT", "not an IPv4 address")
                    .with_field("address"),
                ValidationError::new(StageName::CrossResource, "IP_CONFLICT", "address in use")
                    .with_field("address"),
            ],
        );
        map.insert(
            "mtu".to_owned(),
            vec![
                ValidationError::warning(StageName::Network, "MTU_LOW", "mtu below 1280")
                    .with_field("mtu"),
            ],
        );
        map.insert("empty".to_owned(), Vec::new());
        map
    }

    #[test]
    fn first_issue_wins() {
        let mapped = map_to_form_errors(&field_errors());
        assert_eq!(
            mapped["address"],
            FormError {
                kind: "INVALID_FORMAT".into(),
                message: "not an IPv4 address".into(),
            }
        );
        assert_eq!(mapped["mtu"].kind, "MTU_LOW");
        assert!(!mapped.contains_key("empty"));
    }

    #[test]
    fn sink_receives_each_field_once() {
        #[derive(Default)]
        struct Recorder(Vec<(String, String)>);
        impl FieldErrorSink for Recorder {
            fn set_field_error(&mut self, path: &str, error: FormError) {
                self.0.push((path.to_owned(), error.kind));
            }
        }

        let mut sink = Recorder::default();
        let count = apply_form_errors(&field_errors(), &mut sink);
        assert_eq!(count, 2);
        assert_eq!(
            sink.0,
            vec![
                ("address".to_owned(), "INVALID_FORMAT".to_owned()),
                ("mtu".to_owned(), "MTU_LOW".to_owned()),
            ]
        );
    }

    #[test]
    fn form_error_serializes_kind_as_type() {
        let json = serde_json::to_value(FormError {
            kind: "REQUIRED".into(),
            message: "name is required".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "REQUIRED", "message": "name is required" })
        );
    }
}
