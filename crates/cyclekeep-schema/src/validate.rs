//! Structural validation of untyped profile blobs.
//!
//! The expected shape is declared as data ([`Shape`]) and built once per
//! process. Validation walks a `serde_json::Value` against it and reports the
//! first violation with its JSON path, then converts the value into a typed
//! [`SerializedManager`]. Unknown fields are ignored.

use crate::profile::SerializedManager;
use once_cell::sync::Lazy;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },
    #[error("{path}: required field is missing")]
    MissingField { path: String },
    #[error("{path}: expected {expected}, found {found}")]
    WrongType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("malformed profile: {0}")]
    Malformed(String),
}

/// Expected shape of a JSON value.
#[derive(Debug)]
pub enum Shape {
    String,
    /// A non-negative integer that fits in 64 bits.
    Integer,
    Array(Box<Shape>),
    Object(Vec<Field>),
}

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub required: bool,
    pub shape: Shape,
}

impl Field {
    pub fn required(name: &'static str, shape: Shape) -> Self {
        Self {
            name,
            aliases: &[],
            required: true,
            shape,
        }
    }

    pub fn optional(name: &'static str, shape: Shape) -> Self {
        Self {
            required: false,
            ..Self::required(name, shape)
        }
    }

    #[must_use]
    pub fn with_aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    fn lookup<'v>(&self, object: &'v serde_json::Map<String, Value>) -> Option<&'v Value> {
        object
            .get(self.name)
            .or_else(|| self.aliases.iter().find_map(|alias| object.get(*alias)))
    }
}

impl Shape {
    fn expected(&self) -> &'static str {
        match self {
            Shape::String => "string",
            Shape::Integer => "non-negative integer",
            Shape::Array(_) => "array",
            Shape::Object(_) => "object",
        }
    }

    /// Check `value` against this shape. `path` names `value` in error messages.
    pub fn check(&self, value: &Value, path: &str) -> Result<(), ValidationError> {
        let matches = match (self, value) {
            (Shape::String, Value::String(_)) => true,
            (Shape::Integer, Value::Number(n)) => n.is_u64(),
            (Shape::Array(items), Value::Array(values)) => {
                for (idx, item) in values.iter().enumerate() {
                    items.check(item, &format!("{path}[{idx}]"))?;
                }
                true
            }
            (Shape::Object(fields), Value::Object(object)) => {
                for field in fields {
                    let field_path = if path.is_empty() {
                        field.name.to_owned()
                    } else {
                        format!("{path}.{}", field.name)
                    };
                    match field.lookup(object) {
                        Some(child) => field.shape.check(child, &field_path)?,
                        None if field.required => {
                            return Err(ValidationError::MissingField { path: field_path });
                        }
                        None => {}
                    }
                }
                true
            }
            _ => false,
        };

        if matches {
            Ok(())
        } else {
            Err(ValidationError::WrongType {
                path: if path.is_empty() {
                    "<root>".to_owned()
                } else {
                    path.to_owned()
                },
                expected: self.expected(),
                found: describe_json_type(value),
            })
        }
    }
}

static MANAGER_SCHEMA: Lazy<Shape> = Lazy::new(|| {
    let quota = Shape::Object(vec![
        Field::required("remaining", Shape::Integer).with_aliases(&["remainingCycles"])
    ]);
    let resource = Shape::Object(vec![
        Field::required("nickname", Shape::String),
        Field::required("id", Shape::String),
        Field::optional("quota", quota).with_aliases(&["remainingCyclesInfo"]),
    ]);
    Shape::Object(vec![
        Field::required("resources", Shape::Array(Box::new(resource))).with_aliases(&["canisters"]),
        Field::required("publicKey", Shape::String),
        Field::required("privateKey", Shape::String),
    ])
});

/// The shape every persisted or imported profile must have.
pub fn manager_schema() -> &'static Shape {
    &MANAGER_SCHEMA
}

/// Validate an untyped blob and convert it into a [`SerializedManager`].
pub fn validate_manager(input: &Value) -> Result<SerializedManager, ValidationError> {
    if !input.is_object() {
        return Err(ValidationError::NotAnObject {
            found: describe_json_type(input),
        });
    }
    manager_schema().check(input, "")?;
    serde_json::from_value(input.clone()).map_err(|e| ValidationError::Malformed(e.to_string()))
}

/// JSON type name of a value, for diagnostics.
pub fn describe_json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_u64() || n.is_i64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_minimal_profile() {
        let profile =
            validate_manager(&json!({"resources": [], "publicKey": "", "privateKey": ""}))
                .unwrap();
        assert!(profile.resources.is_empty());
        assert!(!profile.has_keys());
    }

    #[test]
    fn accepts_full_profile() {
        let profile = validate_manager(&json!({
            "resources": [
                {"nickname": "alpha", "id": "c-1", "quota": {"remaining": 900}},
                {"nickname": "beta", "id": "c-2"}
            ],
            "publicKey": "pk",
            "privateKey": "sk"
        }))
        .unwrap();
        assert_eq!(profile.resources.len(), 2);
        assert_eq!(profile.resources[0].remaining_quota(), 900);
        assert_eq!(profile.resources[1].remaining_quota(), 0);
    }

    #[test]
    fn ignores_unknown_fields() {
        let profile = validate_manager(&json!({
            "resources": [{"nickname": "a", "id": "b", "color": "red"}],
            "publicKey": "pk",
            "privateKey": "sk",
            "version": 3
        }))
        .unwrap();
        assert_eq!(profile.resources.len(), 1);
    }

    #[test]
    fn rejects_empty_object() {
        let err = validate_manager(&json!({})).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                path: "resources".to_owned()
            }
        );
    }

    #[test]
    fn rejects_non_objects() {
        for input in [json!(null), json!([]), json!("profile"), json!(12)] {
            assert!(matches!(
                validate_manager(&input),
                Err(ValidationError::NotAnObject { .. })
            ));
        }
    }

    #[test]
    fn reports_path_of_bad_resource_field() {
        let err = validate_manager(&json!({
            "resources": [{"nickname": "a", "id": "b"}, {"nickname": "c", "id": 7}],
            "publicKey": "pk",
            "privateKey": "sk"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "resources[1].id: expected string, found integer");
    }

    #[test]
    fn quota_sub_object_needs_integer() {
        let missing = validate_manager(&json!({
            "resources": [{"nickname": "a", "id": "b", "quota": {}}],
            "publicKey": "pk",
            "privateKey": "sk"
        }))
        .unwrap_err();
        assert!(missing.to_string().contains("resources[0].quota.remaining"));

        let fractional = validate_manager(&json!({
            "resources": [{"nickname": "a", "id": "b", "quota": {"remaining": 1.5}}],
            "publicKey": "pk",
            "privateKey": "sk"
        }))
        .unwrap_err();
        assert!(matches!(fractional, ValidationError::WrongType { .. }));

        let negative = validate_manager(&json!({
            "resources": [{"nickname": "a", "id": "b", "quota": {"remaining": -3}}],
            "publicKey": "pk",
            "privateKey": "sk"
        }));
        assert!(negative.is_err());
    }

    #[test]
    fn keys_must_be_strings() {
        let err = validate_manager(&json!({
            "resources": [],
            "publicKey": null,
            "privateKey": "sk"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "publicKey: expected string, found null");
    }

    #[test]
    fn accepts_legacy_layout() {
        let profile = validate_manager(&json!({
            "canisters": [{
                "nickname": "chat",
                "id": "c-1",
                "remainingCyclesInfo": {"remainingCycles": 10}
            }],
            "publicKey": "pk",
            "privateKey": "sk"
        }))
        .unwrap();
        assert_eq!(profile.resources[0].remaining_quota(), 10);
    }

    #[test]
    fn describes_json_types() {
        assert_eq!(describe_json_type(&json!(1)), "integer");
        assert_eq!(describe_json_type(&json!(1.5)), "number");
        assert_eq!(describe_json_type(&json!(true)), "boolean");
        assert_eq!(describe_json_type(&json!({})), "object");
    }
}
