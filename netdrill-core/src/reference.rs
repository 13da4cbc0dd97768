//! Backward references to outputs of earlier steps
//!
//! A reference is embedded in a command payload in place of a literal value:
//!
//! ```json
//! {"type": "output", "step": -1, "name": "participant", "onEmpty": []}
//! ```
//!
//! `step` is relative to the step being resolved and is always negative.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const REFERENCE_TYPE: &str = "output";

/// A reference to a named output of an earlier step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    /// Relative step offset, -1 being the previous step
    #[serde(rename = "step")]
    pub step_offset: i64,

    /// Output name in the referenced step
    pub name: String,

    /// Substituted when the referenced step produced nothing under `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_empty: Option<Value>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReference {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    reference: Reference,
}

impl Reference {
    /// Reference output `name` of the step `step_offset` steps back
    pub fn output(step_offset: i64, name: impl Into<String>) -> Self {
        Self {
            step_offset,
            name: name.into(),
            on_empty: None,
        }
    }

    /// Set the default substituted when the output is missing
    pub fn or_else(mut self, on_empty: Value) -> Self {
        self.on_empty = Some(on_empty);
        self
    }

    /// Parse a payload value that may be a reference
    ///
    /// `Ok(None)` for anything not tagged `"type": "output"`; a tagged object
    /// without a valid `step` and `name` is an error.
    pub fn parse(value: &Value) -> Result<Option<Self>, ModelError> {
        let Some(map) = value.as_object() else {
            return Ok(None);
        };
        if map.get("type").and_then(Value::as_str) != Some(REFERENCE_TYPE) {
            return Ok(None);
        }
        serde_json::from_value::<WireReference>(value.clone())
            .map(|wire| Some(wire.reference))
            .map_err(|e| ModelError::InvalidReference(format!("{}: {}", value, e)))
    }

    /// Recognise a well-formed reference embedded in a payload
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::parse(value).ok().flatten()
    }

    /// Wire representation for embedding in a payload
    pub fn to_value(&self) -> Value {
        let wire = WireReference {
            kind: REFERENCE_TYPE.to_string(),
            reference: self.clone(),
        };
        serde_json::to_value(wire).unwrap_or(Value::Null)
    }

    /// Visit every reference embedded in a payload
    pub fn collect(value: &Value) -> Vec<Reference> {
        let mut found = Vec::new();
        collect_into(value, &mut found);
        found
    }
}

impl From<Reference> for Value {
    fn from(reference: Reference) -> Self {
        reference.to_value()
    }
}

fn collect_into(value: &Value, found: &mut Vec<Reference>) {
    if let Some(reference) = Reference::from_value(value) {
        found.push(reference);
        return;
    }
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect_into(item, found)),
        Value::Object(map) => map.values().for_each(|item| collect_into(item, found)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let reference = Reference::output(-2, "participant").or_else(json!([]));
        assert_eq!(
            reference.to_value(),
            json!({"type": "output", "step": -2, "name": "participant", "onEmpty": []})
        );
        assert_eq!(Reference::from_value(&reference.to_value()), Some(reference));
    }

    #[test]
    fn test_plain_objects_are_not_references() {
        assert!(Reference::from_value(&json!({"step": -1, "name": "x"})).is_none());
        assert!(Reference::from_value(&json!({"type": "literal", "step": -1})).is_none());
        assert!(Reference::from_value(&json!("output")).is_none());
    }

    #[test]
    fn test_tagged_object_without_step_is_invalid() {
        let err = Reference::parse(&json!({"type": "output", "name": "group1"})).unwrap_err();
        assert!(matches!(err, ModelError::InvalidReference(_)));
        assert!(Reference::parse(&json!({"type": "output", "step": -1})).is_err());
        assert!(Reference::parse(&json!({"type": "literal"})).unwrap().is_none());
        assert_eq!(
            Reference::parse(&Reference::output(-1, "key").to_value()).unwrap(),
            Some(Reference::output(-1, "key"))
        );
    }

    #[test]
    fn test_collect_nested() {
        let payload = json!({
            "nodes": Reference::output(-1, "group1").to_value(),
            "nested": {"keys": [Reference::output(-3, "key").to_value()]},
            "tps": 0.5
        });
        let mut names: Vec<_> = Reference::collect(&payload)
            .into_iter()
            .map(|r| r.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["group1", "key"]);
    }
}
