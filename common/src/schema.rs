//! Request schema for `/predict`.
//!
//! Validation walks the raw JSON payload once and collects every offending
//! field, so a caller can fix all of them in a single round trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Declared feature order. Inference always consumes features in this order.
pub const FEATURE_NAMES: [&str; 5] = ["feature1", "feature2", "feature3", "feature4", "feature5"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredictionRequest {
    pub feature1: f64,
    pub feature2: f64,
    pub feature3: f64,
    pub feature4: f64,
    pub feature5: f64,
}

impl PredictionRequest {
    pub fn features(&self) -> [f64; 5] {
        [
            self.feature1,
            self.feature2,
            self.feature3,
            self.feature4,
            self.feature5,
        ]
    }

    fn from_features(values: [f64; 5]) -> Self {
        let [feature1, feature2, feature3, feature4, feature5] = values;
        Self {
            feature1,
            feature2,
            feature3,
            feature4,
            feature5,
        }
    }
}

/// One field-level problem with a request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    pub fn new(loc: &[&str], msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: loc.iter().map(|s| s.to_string()).collect(),
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }

    fn missing(field: &str) -> Self {
        Self::new(&["body", field], "Field required", "missing")
    }

    fn not_a_number(field: &str) -> Self {
        Self::new(&["body", field], "Input should be a valid number", "float_type")
    }

    fn extra(field: &str) -> Self {
        Self::new(&["body", field], "Extra inputs are not permitted", "extra_forbidden")
    }
}

/// Parse a raw body and validate it. Malformed JSON is reported as a
/// single `json_invalid` entry.
pub fn parse_body(body: &[u8]) -> Result<PredictionRequest, Vec<FieldError>> {
    let payload: Value = serde_json::from_slice(body).map_err(|e| {
        vec![FieldError::new(
            &["body"],
            format!("JSON decode error: {}", e),
            "json_invalid",
        )]
    })?;
    validate(&payload)
}

pub fn validate(payload: &Value) -> Result<PredictionRequest, Vec<FieldError>> {
    let Some(object) = payload.as_object() else {
        return Err(vec![FieldError::new(
            &["body"],
            "Input should be a valid object",
            "model_type",
        )]);
    };

    let mut errors = Vec::new();
    let mut values = [0.0; 5];

    for (slot, name) in values.iter_mut().zip(FEATURE_NAMES) {
        match object.get(name) {
            None => errors.push(FieldError::missing(name)),
            Some(value) => match coerce_number(value) {
                Some(number) => *slot = number,
                None => errors.push(FieldError::not_a_number(name)),
            },
        }
    }

    errors.extend(unknown_keys(object).map(FieldError::extra));

    if errors.is_empty() {
        Ok(PredictionRequest::from_features(values))
    } else {
        Err(errors)
    }
}

// Integers widen to f64; strings, booleans and null are rejected.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn unknown_keys(object: &Map<String, Value>) -> impl Iterator<Item = &str> {
    object
        .keys()
        .map(String::as_str)
        .filter(|key| !FEATURE_NAMES.contains(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "feature1": 5.1,
            "feature2": 3.5,
            "feature3": 1.4,
            "feature4": 0.2,
            "feature5": 0.1
        })
    }

    #[test]
    fn test_valid_payload() {
        let request = validate(&valid()).unwrap();
        assert_eq!(request.features(), [5.1, 3.5, 1.4, 0.2, 0.1]);
    }

    #[test]
    fn test_integers_are_coerced() {
        let payload = json!({
            "feature1": 5,
            "feature2": 3,
            "feature3": -1,
            "feature4": 0,
            "feature5": 18446744073709551615u64
        });
        let request = validate(&payload).unwrap();
        assert_eq!(request.feature1, 5.0);
        assert_eq!(request.feature3, -1.0);
        assert!(request.feature5 > 1.0e19);
    }

    #[test]
    fn test_each_missing_field_is_named() {
        for name in FEATURE_NAMES {
            let mut payload = valid();
            payload.as_object_mut().unwrap().remove(name);

            let errors = validate(&payload).unwrap_err();
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].loc, vec!["body".to_string(), name.to_string()]);
            assert_eq!(errors[0].kind, "missing");
        }
    }

    #[test]
    fn test_all_errors_reported_in_one_pass() {
        let payload = json!({
            "feature1": "abc",
            "feature2": null,
            "feature4": true,
            "feature5": 1.0,
            "colour": "red"
        });
        let errors = validate(&payload).unwrap_err();
        let summary: Vec<(&str, &str)> = errors
            .iter()
            .map(|e| (e.loc[1].as_str(), e.kind.as_str()))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("feature1", "float_type"),
                ("feature2", "float_type"),
                ("feature3", "missing"),
                ("feature4", "float_type"),
                ("colour", "extra_forbidden"),
            ]
        );
    }

    #[test]
    fn test_empty_object_reports_every_feature() {
        let errors = validate(&json!({})).unwrap_err();
        assert_eq!(errors.len(), FEATURE_NAMES.len());
        assert!(errors.iter().all(|e| e.kind == "missing"));
    }

    #[test]
    fn test_non_object_body() {
        let errors = validate(&json!([5.1, 3.5, 1.4, 0.2, 0.1])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, "model_type");
        assert_eq!(errors[0].loc, vec!["body".to_string()]);
    }

    #[test]
    fn test_malformed_json() {
        let errors = parse_body(br#"{"feature1": 5.1,"#).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, "json_invalid");
        assert!(errors[0].msg.starts_with("JSON decode error"));
    }

    #[test]
    fn test_field_error_serialization() {
        let missing = serde_json::to_value(FieldError::missing("feature2")).unwrap();
        assert_eq!(
            missing,
            json!({"loc": ["body", "feature2"], "msg": "Field required", "type": "missing"})
        );

        let bare = serde_json::to_value(FieldError::new(&[], "boom", "internal_error")).unwrap();
        assert_eq!(bare, json!({"msg": "boom", "type": "internal_error"}));
    }
}
