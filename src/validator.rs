//! # Validator Module
//!
//! The contract between the dispatcher and whatever checks payloads against declared
//! schemas.
//!
//! The dispatcher only needs two things from a validator:
//!
//! - [`Validator::validate`] takes a value and a schema and returns the value to use
//!   downstream (possibly with defaults filled in) or a [`ValidationError`]
//! - [`Validator::describe`] turns a schema into a small structural description for the
//!   route catalog
//!
//! [`JsonSchemaValidator`] is the bundled implementation. Schemas are JSON Schema
//! documents compiled with the `jsonschema` crate and kept in a
//! [`ValidatorCache`](crate::validator_cache::ValidatorCache) so that each distinct schema
//! is compiled once.
//!
//! ## Defaults
//!
//! Before validation, missing object properties whose schema declares a `default` are
//! filled in, recursively through nested `properties` and array `items`:
//!
//! ```rust
//! use bendf::validator::{JsonSchemaValidator, Validator};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "required": ["title"],
//!     "properties": {
//!         "title": {"type": "string"},
//!         "status": {"type": "string", "enum": ["active", "inactive"], "default": "active"}
//!     }
//! });
//! let v = JsonSchemaValidator::new(true);
//! let out = v.validate(json!({"title": "t"}), &schema).unwrap();
//! assert_eq!(out, json!({"title": "t", "status": "active"}));
//! ```

use crate::route::Schema;
use crate::validator_cache::ValidatorCache;
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::debug;

/// A value did not satisfy its schema, or the schema itself is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One message per violated constraint, in the order the engine reported them.
    Mismatch(Vec<String>),
    /// The schema failed to compile.
    InvalidSchema(String),
}

impl ValidationError {
    /// Violation messages; empty for [`ValidationError::InvalidSchema`].
    #[must_use]
    pub fn details(&self) -> &[String] {
        match self {
            ValidationError::Mismatch(details) => details,
            ValidationError::InvalidSchema(_) => &[],
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Mismatch(details) => {
                write!(f, "Validation failed: {}", details.join("; "))
            }
            ValidationError::InvalidSchema(reason) => write!(f, "Invalid schema: {reason}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Schema validation capability used by the dispatcher.
pub trait Validator: Send + Sync {
    /// Check `value` against `schema`, returning the (possibly coerced) value.
    ///
    /// # Errors
    ///
    /// [`ValidationError`] when the value does not conform or the schema is invalid.
    fn validate(&self, value: Value, schema: &Schema) -> Result<Value, ValidationError>;

    /// Structural description of `schema` for the route catalog.
    fn describe(&self, schema: &Schema) -> Value {
        describe_schema(schema)
    }
}

/// JSON Schema validator backed by a shared compiled-schema cache.
#[derive(Clone)]
pub struct JsonSchemaValidator {
    cache: ValidatorCache,
}

impl JsonSchemaValidator {
    /// `cache_enabled = false` compiles the schema on every call.
    #[must_use]
    pub fn new(cache_enabled: bool) -> Self {
        Self {
            cache: ValidatorCache::new(cache_enabled),
        }
    }

    #[must_use]
    pub fn cache(&self) -> &ValidatorCache {
        &self.cache
    }
}

impl Default for JsonSchemaValidator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("cache_enabled", &self.cache.is_enabled())
            .field("cached", &self.cache.size())
            .finish()
    }
}

impl Validator for JsonSchemaValidator {
    fn validate(&self, mut value: Value, schema: &Schema) -> Result<Value, ValidationError> {
        let compiled = self.cache.get_or_compile(schema)?;
        apply_defaults(&mut value, schema);

        let details: Vec<String> = compiled.iter_errors(&value).map(|e| e.to_string()).collect();
        if details.is_empty() {
            Ok(value)
        } else {
            debug!(violations = details.len(), "Schema validation failed");
            Err(ValidationError::Mismatch(details))
        }
    }
}

/// Fill missing object properties from their schema `default`.
///
/// Walks `properties` of object schemas and `items` of array schemas. Values of the wrong
/// shape are left alone; the validator reports them afterwards.
pub fn apply_defaults(value: &mut Value, schema: &Value) {
    match value {
        Value::Object(map) => {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                return;
            };
            for (key, prop_schema) in properties {
                match map.get_mut(key) {
                    Some(child) => apply_defaults(child, prop_schema),
                    None => {
                        if let Some(default) = prop_schema.get("default") {
                            map.insert(key.clone(), default.clone());
                        }
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items").filter(|s| s.is_object()) {
                for item in items {
                    apply_defaults(item, item_schema);
                }
            }
        }
        _ => {}
    }
}

/// Describe a JSON Schema as `{type, properties?, items?, enum?, optional?, default?}`.
///
/// Object properties not listed in `required` are marked `optional: true`. Anything this
/// function cannot interpret is reported as `{"type": "unknown"}`.
#[must_use]
pub fn describe_schema(schema: &Value) -> Value {
    let Some(obj) = schema.as_object() else {
        return json!({ "type": "unknown" });
    };

    let ty = match obj.get("type") {
        Some(Value::String(t)) => t.as_str(),
        None if obj.contains_key("properties") => "object",
        None if obj.contains_key("items") => "array",
        None if obj.contains_key("enum") => "string",
        _ => "unknown",
    };

    let mut out = Map::new();
    out.insert("type".to_string(), Value::String(ty.to_string()));

    match ty {
        "object" => {
            let required: Vec<&str> = obj
                .get("required")
                .and_then(Value::as_array)
                .map(|r| r.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let mut properties = Map::new();
            if let Some(props) = obj.get("properties").and_then(Value::as_object) {
                for (name, prop_schema) in props {
                    let mut described = describe_schema(prop_schema);
                    if !required.contains(&name.as_str()) {
                        if let Value::Object(d) = &mut described {
                            d.insert("optional".to_string(), Value::Bool(true));
                        }
                    }
                    properties.insert(name.clone(), described);
                }
            }
            out.insert("properties".to_string(), Value::Object(properties));
        }
        "array" => {
            let items = obj
                .get("items")
                .map_or_else(|| json!({ "type": "unknown" }), describe_schema);
            out.insert("items".to_string(), items);
        }
        _ => {}
    }

    if let Some(values) = obj.get("enum") {
        out.insert("enum".to_string(), values.clone());
    }
    if let Some(default) = obj.get("default") {
        out.insert("default".to_string(), default.clone());
    }

    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_schema() -> Value {
        json!({
            "type": "object",
            "required": ["title", "description"],
            "properties": {
                "title": {"type": "string"},
                "description": {"type": "string"},
                "status": {"type": "string", "enum": ["active", "inactive"], "default": "active"}
            }
        })
    }

    #[test]
    fn test_valid_value_passes_with_defaults() {
        let v = JsonSchemaValidator::new(true);
        let out = v
            .validate(json!({"title": "t", "description": "d"}), &task_schema())
            .unwrap();
        assert_eq!(out["status"], "active");
    }

    #[test]
    fn test_explicit_value_is_not_overwritten() {
        let v = JsonSchemaValidator::new(false);
        let out = v
            .validate(
                json!({"title": "t", "description": "d", "status": "inactive"}),
                &task_schema(),
            )
            .unwrap();
        assert_eq!(out["status"], "inactive");
    }

    #[test]
    fn test_missing_required_field_fails() {
        let v = JsonSchemaValidator::new(true);
        let err = v.validate(json!({"title": "t"}), &task_schema()).unwrap_err();
        match &err {
            ValidationError::Mismatch(details) => {
                assert_eq!(details.len(), 1);
                assert!(details[0].contains("description"));
            }
            ValidationError::InvalidSchema(_) => panic!("unexpected {err:?}"),
        }
        assert!(err.to_string().starts_with("Validation failed: "));
    }

    #[test]
    fn test_invalid_schema_is_reported() {
        let v = JsonSchemaValidator::new(true);
        let err = v
            .validate(json!(1), &json!({"type": "no-such-type"}))
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidSchema(_)));
        assert!(err.details().is_empty());
    }

    #[test]
    fn test_defaults_in_array_items() {
        let schema = json!({
            "type": "array",
            "items": {"type": "object", "properties": {"n": {"type": "integer", "default": 0}}}
        });
        let mut value = json!([{}, {"n": 3}]);
        apply_defaults(&mut value, &schema);
        assert_eq!(value, json!([{"n": 0}, {"n": 3}]));
    }

    #[test]
    fn test_describe_object() {
        let described = describe_schema(&task_schema());
        assert_eq!(described["type"], "object");
        assert_eq!(described["properties"]["title"], json!({"type": "string"}));
        assert_eq!(
            described["properties"]["status"],
            json!({
                "type": "string",
                "optional": true,
                "enum": ["active", "inactive"],
                "default": "active"
            })
        );
    }

    #[test]
    fn test_describe_array_and_unknown() {
        let described = describe_schema(&json!({"type": "array", "items": {"type": "number"}}));
        assert_eq!(described, json!({"type": "array", "items": {"type": "number"}}));
        assert_eq!(describe_schema(&json!(true)), json!({"type": "unknown"}));
    }
}
