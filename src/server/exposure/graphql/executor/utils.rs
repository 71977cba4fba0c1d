//! Utility functions for GraphQL execution: type conversion and scalar
//! coercion of inputs and outputs.

use graphql_parser::query::{Type, Value as GqlValue};
use serde_json::{Map, Number, Value, json};

use crate::server::exposure::graphql::schema::TypeRef;

/// Convert a variable type from the query AST
pub fn type_ref_from_ast(ty: &Type<'_, String>) -> TypeRef {
    match ty {
        Type::NamedType(name) => TypeRef::named(name.clone()),
        Type::ListType(inner) => TypeRef::list(type_ref_from_ast(inner)),
        Type::NonNullType(inner) => TypeRef::non_null(type_ref_from_ast(inner)),
    }
}

/// Render a literal the way it was written, for error messages
pub fn print_literal(value: &GqlValue<'_, String>) -> String {
    match value {
        GqlValue::Variable(name) => format!("${}", name),
        GqlValue::Int(i) => i.as_i64().map(|v| v.to_string()).unwrap_or_default(),
        GqlValue::Float(f) => f.to_string(),
        GqlValue::String(s) => json!(s).to_string(),
        GqlValue::Boolean(b) => b.to_string(),
        GqlValue::Null => "null".to_string(),
        GqlValue::Enum(e) => e.clone(),
        GqlValue::List(items) => {
            let items: Vec<String> = items.iter().map(print_literal).collect();
            format!("[{}]", items.join(", "))
        }
        GqlValue::Object(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(k, v)| format!("{}: {}", k, print_literal(v)))
                .collect();
            format!("{{{}}}", fields.join(", "))
        }
    }
}

// =============================================================================
// Input coercion
// =============================================================================

/// Coerce a literal written in the query to the argument type.
///
/// Returns `Ok(None)` when the literal is a variable that was not provided,
/// which makes the argument absent.
pub fn coerce_literal(
    ty: &TypeRef,
    value: &GqlValue<'_, String>,
    variables: &Map<String, Value>,
) -> Result<Option<Value>, String> {
    if let GqlValue::Variable(name) = value {
        return Ok(variables.get(name).cloned());
    }

    match ty {
        TypeRef::NonNull(inner) => match value {
            GqlValue::Null => Err(format!(
                "Expected value of type \"{}\", found null.",
                ty
            )),
            _ => coerce_literal(inner, value, variables),
        },
        _ if matches!(value, GqlValue::Null) => Ok(Some(Value::Null)),
        TypeRef::List(inner) => match value {
            GqlValue::List(items) => {
                let mut coerced = Vec::with_capacity(items.len());
                for item in items {
                    coerced.push(coerce_literal(inner, item, variables)?.unwrap_or(Value::Null));
                }
                Ok(Some(Value::Array(coerced)))
            }
            single => Ok(Some(Value::Array(vec![
                coerce_literal(inner, single, variables)?.unwrap_or(Value::Null),
            ]))),
        },
        TypeRef::Named(name) => coerce_scalar_literal(name, value).map(Some),
    }
}

fn coerce_scalar_literal(name: &str, value: &GqlValue<'_, String>) -> Result<Value, String> {
    let printed = print_literal(value);
    match (name, value) {
        ("ID", GqlValue::String(s)) => Ok(json!(s)),
        ("ID", GqlValue::Int(i)) => i
            .as_i64()
            .map(|v| json!(v.to_string()))
            .ok_or_else(|| format!("ID cannot represent value: {}", printed)),
        ("ID", _) => Err(format!(
            "ID cannot represent a non-string and non-integer value: {}",
            printed
        )),
        ("String", GqlValue::String(s)) => Ok(json!(s)),
        ("String", _) => Err(format!(
            "String cannot represent a non string value: {}",
            printed
        )),
        ("Int", GqlValue::Int(i)) => match i.as_i64().and_then(|v| i32::try_from(v).ok()) {
            Some(v) => Ok(json!(v)),
            None => Err(format!(
                "Int cannot represent non 32-bit signed integer value: {}",
                printed
            )),
        },
        ("Int", _) => Err(format!("Int cannot represent non-integer value: {}", printed)),
        ("Float", GqlValue::Float(f)) => Ok(json!(f)),
        ("Float", GqlValue::Int(i)) => Ok(json!(i.as_i64().unwrap_or(0) as f64)),
        ("Float", _) => Err(format!("Float cannot represent non numeric value: {}", printed)),
        ("Boolean", GqlValue::Boolean(b)) => Ok(json!(b)),
        ("Boolean", _) => Err(format!(
            "Boolean cannot represent a non boolean value: {}",
            printed
        )),
        (other, _) => Err(format!("Unknown input type \"{}\"", other)),
    }
}

/// Coerce a JSON variable value to the declared variable type
pub fn coerce_input(ty: &TypeRef, value: &Value) -> Result<Value, String> {
    match ty {
        TypeRef::NonNull(inner) => {
            if value.is_null() {
                Err(format!("Expected non-nullable type \"{}\" not to be null.", ty))
            } else {
                coerce_input(inner, value)
            }
        }
        _ if value.is_null() => Ok(Value::Null),
        TypeRef::List(inner) => match value {
            Value::Array(items) => items
                .iter()
                .map(|item| coerce_input(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            single => Ok(Value::Array(vec![coerce_input(inner, single)?])),
        },
        TypeRef::Named(name) => coerce_scalar_input(name, value),
    }
}

fn coerce_scalar_input(name: &str, value: &Value) -> Result<Value, String> {
    match (name, value) {
        ("ID", Value::String(_)) => Ok(value.clone()),
        ("ID", Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(json!(n.to_string())),
        ("ID", _) => Err(format!("ID cannot represent value: {}", value)),
        ("String", Value::String(_)) => Ok(value.clone()),
        ("String", _) => Err(format!("String cannot represent a non string value: {}", value)),
        ("Int", Value::Number(n)) => match as_i32(n) {
            Some(v) => Ok(json!(v)),
            None => Err(format!(
                "Int cannot represent non 32-bit signed integer value: {}",
                value
            )),
        },
        ("Int", _) => Err(format!("Int cannot represent non-integer value: {}", value)),
        ("Float", Value::Number(n)) => Ok(json!(n.as_f64().unwrap_or(0.0))),
        ("Float", _) => Err(format!("Float cannot represent non numeric value: {}", value)),
        ("Boolean", Value::Bool(_)) => Ok(value.clone()),
        ("Boolean", _) => Err(format!(
            "Boolean cannot represent a non boolean value: {}",
            value
        )),
        (other, _) => Err(format!("Unknown input type \"{}\"", other)),
    }
}

/// Integral JSON number within the 32-bit range (`30.0` counts)
fn as_i32(n: &Number) -> Option<i32> {
    if let Some(i) = n.as_i64() {
        return i32::try_from(i).ok();
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

// =============================================================================
// Output coercion
// =============================================================================

/// Serialize a resolved leaf value as the named scalar
pub fn serialize_scalar(name: &str, value: &Value) -> Result<Value, String> {
    match (name, value) {
        ("ID", Value::String(_)) => Ok(value.clone()),
        ("ID", Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(json!(n.to_string())),
        ("ID", _) => Err(format!("ID cannot represent value: {}", value)),
        ("String", Value::String(_)) => Ok(value.clone()),
        ("String", Value::Number(n)) => Ok(json!(n.to_string())),
        ("String", Value::Bool(b)) => Ok(json!(b.to_string())),
        ("String", _) => Err(format!("String cannot represent value: {}", value)),
        ("Int", Value::Number(n)) => as_i32(n)
            .map(|v| json!(v))
            .ok_or_else(|| format!("Int cannot represent non 32-bit signed integer value: {}", value)),
        ("Int", Value::Bool(b)) => Ok(json!(if *b { 1 } else { 0 })),
        ("Int", _) => Err(format!("Int cannot represent non-integer value: {}", value)),
        ("Float", Value::Number(n)) => Ok(json!(n.as_f64().unwrap_or(0.0))),
        ("Float", _) => Err(format!("Float cannot represent non numeric value: {}", value)),
        ("Boolean", Value::Bool(_)) => Ok(value.clone()),
        ("Boolean", _) => Err(format!("Boolean cannot represent a non boolean value: {}", value)),
        (other, _) => Err(format!("Unknown scalar type \"{}\"", other)),
    }
}
