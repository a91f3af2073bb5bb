//! Per-request validation of commands against the entity schema.
//!
//! Validation iterates the schema's attribute definitions, not the object's own keys, so
//! the object's attribute container stays a uniform string-keyed map while validation stays
//! complete.

use serde_json::Value;

use crate::config::{AttributeDef, AttributeType, EntitySchema};
use crate::domain::ParentRef;
use crate::error::ValidationError;

const DEFAULT_MAX_LENGTH: u64 = 100;

/// Validates a parent reference against the entity's allowed-parent list. An empty allowed
/// list means the placement is unconstrained.
pub fn validate_parent(
    schema: &EntitySchema,
    entity: &str,
    parent: Option<&ParentRef>,
) -> Result<(), ValidationError> {
    let def = schema
        .entity(entity)
        .ok_or_else(|| ValidationError::UnknownEntity {
            entity: entity.to_string(),
        })?;

    if def.parent.required && parent.is_none() {
        return Err(ValidationError::ParentRequired {
            entity: entity.to_string(),
        });
    }

    let Some(parent) = parent else {
        return Ok(());
    };

    if let ParentRef::Root(root) = parent {
        if !schema.has_root(root) {
            return Err(ValidationError::UnknownParentRoot { root: root.clone() });
        }
    }

    let allowed = &def.parent.allowed;
    let ok = allowed.iter().any(|a| match parent {
        ParentRef::Root(root) => a.root.as_deref() == Some(root.as_str()),
        ParentRef::Entity { entity, .. } => a.entity.as_deref() == Some(entity.as_str()),
    });

    if !ok && !allowed.is_empty() {
        return Err(ValidationError::ParentNotAllowed {
            entity: entity.to_string(),
        });
    }

    Ok(())
}

/// Validates an attribute map against the entity's attribute definitions.
pub fn validate_attributes(
    schema: &EntitySchema,
    entity: &str,
    attributes: &serde_json::Map<String, Value>,
) -> Result<(), ValidationError> {
    let def = schema
        .entity(entity)
        .ok_or_else(|| ValidationError::UnknownEntity {
            entity: entity.to_string(),
        })?;

    for (key, attr_def) in &def.attributes {
        let raw = attributes.get(key);

        if is_empty_value(raw) {
            if attr_def.nullable {
                continue;
            }
            if attr_def.required {
                return Err(ValidationError::MissingRequiredAttribute {
                    entity: entity.to_string(),
                    attribute: key.clone(),
                });
            }
            continue;
        }

        let raw = raw.unwrap_or(&Value::Null);
        let coerced = coerce_value(entity, key, attr_def.ty, raw)?;
        check_constraints(entity, key, attr_def, &coerced)?;
    }

    Ok(())
}

fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

#[derive(Debug)]
struct CoercedValue {
    /// The original input as a string, used for pattern checks on numeric inputs.
    raw_string: String,
    scalar: CoercedScalar,
}

#[derive(Debug)]
enum CoercedScalar {
    Str(String),
    Num(f64),
    Bool(bool),
}

fn invalid(entity: &str, attribute: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidAttribute {
        entity: entity.to_string(),
        attribute: attribute.to_string(),
        reason: reason.into(),
    }
}

fn coerce_value(
    entity: &str,
    key: &str,
    ty: AttributeType,
    raw: &Value,
) -> Result<CoercedValue, ValidationError> {
    let raw_string = match raw {
        Value::String(s) => s.trim().to_string(),
        other => scalar_to_string(other),
    };

    match ty {
        AttributeType::String => match raw {
            Value::String(s) => Ok(CoercedValue {
                raw_string,
                scalar: CoercedScalar::Str(s.clone()),
            }),
            Value::Number(_) | Value::Bool(_) => Ok(CoercedValue {
                scalar: CoercedScalar::Str(raw_string.clone()),
                raw_string,
            }),
            _ => Err(invalid(entity, key, "expected string")),
        },

        AttributeType::Boolean => match raw {
            Value::Bool(b) => Ok(CoercedValue {
                raw_string: b.to_string(),
                scalar: CoercedScalar::Bool(*b),
            }),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(CoercedValue {
                    raw_string: "true".to_string(),
                    scalar: CoercedScalar::Bool(true),
                }),
                "false" => Ok(CoercedValue {
                    raw_string: "false".to_string(),
                    scalar: CoercedScalar::Bool(false),
                }),
                _ => Err(invalid(entity, key, "expected boolean (true/false)")),
            },
            _ => Err(invalid(entity, key, "expected boolean (true/false)")),
        },

        AttributeType::Number | AttributeType::Integer => {
            let num = match raw {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            let num = num.filter(|n| n.is_finite()).ok_or_else(|| {
                invalid(entity, key, format!("expected {}", ty.as_str()))
            })?;

            if ty == AttributeType::Integer && num.fract() != 0.0 {
                return Err(invalid(entity, key, "expected integer"));
            }

            Ok(CoercedValue {
                raw_string,
                scalar: CoercedScalar::Num(num),
            })
        }
    }
}

fn check_constraints(
    entity: &str,
    key: &str,
    def: &AttributeDef,
    coerced: &CoercedValue,
) -> Result<(), ValidationError> {
    if let CoercedScalar::Str(s) = &coerced.scalar {
        let max_length = def.max_length.unwrap_or(DEFAULT_MAX_LENGTH);
        if s.chars().count() as u64 > max_length {
            return Err(invalid(
                entity,
                key,
                format!("exceeds max_length {max_length}"),
            ));
        }
    }

    if let Some(pattern) = &def.pattern {
        // Patterns were compiled once at config load; a failure here means the definition
        // changed underneath us, which validation treats as a rejection.
        let re = regex::Regex::new(pattern)
            .map_err(|err| invalid(entity, key, format!("invalid pattern: {err}")))?;

        // For numbers we validate the original input format, not the parsed value.
        let test_value = match &coerced.scalar {
            CoercedScalar::Num(_) => coerced.raw_string.clone(),
            CoercedScalar::Str(s) => s.clone(),
            CoercedScalar::Bool(b) => b.to_string(),
        };
        if !re.is_match(&test_value) {
            return Err(invalid(
                entity,
                key,
                format!("does not match pattern {pattern}"),
            ));
        }
    }

    if let Some(values) = &def.values {
        let ok = match &coerced.scalar {
            CoercedScalar::Str(s) => values.iter().any(|v| scalar_to_string(v) == *s),
            CoercedScalar::Num(n) => values
                .iter()
                .any(|v| v.as_f64().is_some_and(|allowed| allowed == *n)),
            CoercedScalar::Bool(b) => values.iter().any(|v| v.as_bool() == Some(*b)),
        };
        if !ok {
            let allowed = values
                .iter()
                .map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(invalid(entity, key, format!("must be one of [{allowed}]")));
        }
    }

    if let CoercedScalar::Num(num) = &coerced.scalar {
        if let Some(min) = def.minimum {
            if *num < min {
                return Err(invalid(entity, key, format!("must be >= {min}")));
            }
        }
        if let Some(max) = def.maximum {
            if *num > max {
                return Err(invalid(entity, key, format!("must be <= {max}")));
            }
        }
    }

    Ok(())
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
