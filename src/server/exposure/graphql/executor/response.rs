//! Response envelope and field-scoped errors

use graphql_parser::Pos;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Position in the query document (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl From<Pos> for Location {
    fn from(pos: Pos) -> Self {
        Self {
            line: pos.line,
            column: pos.column,
        }
    }
}

/// One step of a response path: a response key or a list index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

/// An error reported in the `errors` array of a response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
}

impl ServerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: Vec::new(),
        }
    }

    pub fn at(mut self, pos: Pos) -> Self {
        self.locations.push(pos.into());
        self
    }

    pub fn with_path(mut self, path: &[PathSegment]) -> Self {
        self.path = path.to_vec();
        self
    }
}

/// Result of resolving part of a response: the value plus the errors raised
/// while producing it.
///
/// `value` is `None` when a non-null position could not be filled; the
/// nearest nullable ancestor turns that into `null`.
#[derive(Debug, Default)]
pub struct Resolution {
    pub value: Option<Value>,
    pub errors: Vec<ServerError>,
}

impl Resolution {
    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            errors: Vec::new(),
        }
    }

    pub fn null() -> Self {
        Self::value(Value::Null)
    }

    /// A failed position carrying one error
    pub fn error(error: ServerError) -> Self {
        Self {
            value: None,
            errors: vec![error],
        }
    }

    /// Turn a failed position into `null` (used at nullable positions)
    pub fn or_null(mut self) -> Self {
        if self.value.is_none() {
            self.value = Some(Value::Null);
        }
        self
    }
}

/// A complete GraphQL response.
///
/// `data` is absent when the request failed before execution started
/// (syntax, validation or variable errors).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ServerError>,
}

impl Response {
    pub fn data(data: Value, errors: Vec<ServerError>) -> Self {
        Self {
            data: Some(data),
            errors,
        }
    }

    pub fn from_errors(errors: Vec<ServerError>) -> Self {
        Self { data: None, errors }
    }

    /// Whether execution started (a `data` entry is present)
    pub fn is_executed(&self) -> bool {
        self.data.is_some()
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}
