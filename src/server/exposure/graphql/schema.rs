//! Schema registry
//!
//! The schema is plain data: a map from object type name to its fields, each
//! field carrying its return type, its arguments and an optional resolver.
//! A field without a resolver projects the parent object's attribute of the
//! same name unchanged.
//!
//! Only object types and the built-in scalars exist; there are no
//! interfaces, unions, enums or input objects.

use anyhow::{Result, bail};
use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::server::host::ServerHost;

/// Built-in scalar type names
pub const SCALARS: &[&str] = &["ID", "String", "Int", "Float", "Boolean"];

/// Future returned by every resolver
pub type ResolverFuture<'a> = BoxFuture<'a, Result<Value>>;

/// A field resolution function
pub type ResolverFn =
    Arc<dyn for<'a> Fn(ResolverContext<'a>) -> ResolverFuture<'a> + Send + Sync>;

/// Everything a resolver can see: the host (for storage access), the parent
/// value already resolved (`Value::Null` for root fields) and the coerced
/// arguments.
#[derive(Clone, Copy)]
pub struct ResolverContext<'a> {
    pub host: &'a ServerHost,
    pub parent: &'a Value,
    pub args: &'a Map<String, Value>,
}

impl<'a> ResolverContext<'a> {
    /// String argument, `None` when absent or null
    pub fn arg_str(&self, name: &str) -> Option<&'a str> {
        self.args.get(name).and_then(Value::as_str)
    }

    /// String argument that validation guarantees to be present
    pub fn required_str(&self, name: &str) -> Result<&'a str> {
        match self.arg_str(name) {
            Some(value) => Ok(value),
            None => bail!("Missing required argument '{}'", name),
        }
    }

    /// Int argument that validation guarantees to be present
    pub fn required_i32(&self, name: &str) -> Result<i32> {
        self.args
            .get(name)
            .and_then(Value::as_i64)
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| anyhow::anyhow!("Missing required argument '{}'", name))
    }

    /// String attribute of the parent object
    pub fn parent_str(&self, name: &str) -> Option<&'a str> {
        self.parent.get(name).and_then(Value::as_str)
    }
}

// =============================================================================
// Type references
// =============================================================================

/// A reference to a type, possibly wrapped in list / non-null modifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    List(Box<TypeRef>),
    NonNull(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeRef) -> Self {
        TypeRef::NonNull(Box::new(inner))
    }

    /// The innermost named type
    pub fn named_type(&self) -> &str {
        match self {
            TypeRef::Named(name) => name,
            TypeRef::List(inner) | TypeRef::NonNull(inner) => inner.named_type(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeRef::NonNull(_))
    }

    /// Strip one non-null wrapper, if any
    pub fn nullable(&self) -> &TypeRef {
        match self {
            TypeRef::NonNull(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{}", name),
            TypeRef::List(inner) => write!(f, "[{}]", inner),
            TypeRef::NonNull(inner) => write!(f, "{}!", inner),
        }
    }
}

// =============================================================================
// Fields and object types
// =============================================================================

/// An argument accepted by a field
#[derive(Debug, Clone)]
pub struct ArgumentDef {
    pub name: String,
    pub ty: TypeRef,
}

/// A field declaration with its resolver
#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub args: Vec<ArgumentDef>,
    pub resolver: Option<ResolverFn>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            args: Vec::new(),
            resolver: None,
        }
    }

    pub fn argument(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.args.push(ArgumentDef {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn resolver<F>(mut self, resolver: F) -> Self
    where
        F: for<'a> Fn(ResolverContext<'a>) -> ResolverFuture<'a> + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn find_argument(&self, name: &str) -> Option<&ArgumentDef> {
        self.args.iter().find(|arg| arg.name == name)
    }
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("args", &self.args)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// An object type: named fields in declaration order
#[derive(Debug, Clone)]
pub struct ObjectType {
    pub name: String,
    pub fields: IndexMap<String, FieldDef>,
}

impl ObjectType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }
}

// =============================================================================
// Registry
// =============================================================================

/// All object types of a schema plus its root operation types
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    types: IndexMap<String, ObjectType>,
    query_type: String,
    mutation_type: Option<String>,
}

impl SchemaRegistry {
    pub fn new(query_type: impl Into<String>) -> Self {
        Self {
            types: IndexMap::new(),
            query_type: query_type.into(),
            mutation_type: None,
        }
    }

    pub fn with_mutation_type(mut self, name: impl Into<String>) -> Self {
        self.mutation_type = Some(name.into());
        self
    }

    pub fn register(mut self, object: ObjectType) -> Self {
        self.types.insert(object.name.clone(), object);
        self
    }

    pub fn query_type(&self) -> &str {
        &self.query_type
    }

    pub fn mutation_type(&self) -> Option<&str> {
        self.mutation_type.as_deref()
    }

    pub fn object(&self, name: &str) -> Option<&ObjectType> {
        self.types.get(name)
    }

    pub fn field(&self, type_name: &str, field_name: &str) -> Option<&FieldDef> {
        self.object(type_name)?.fields.get(field_name)
    }

    pub fn is_scalar(name: &str) -> bool {
        SCALARS.contains(&name)
    }

    pub fn is_known_type(&self, name: &str) -> bool {
        Self::is_scalar(name) || self.types.contains_key(name)
    }

    pub fn types(&self) -> impl Iterator<Item = &ObjectType> {
        self.types.values()
    }

    /// Check that root types exist, every referenced type is known and
    /// arguments only take scalars.
    pub fn validate(&self) -> Result<()> {
        if self.object(&self.query_type).is_none() {
            bail!("Query root type '{}' is not registered", self.query_type);
        }
        if let Some(mutation) = &self.mutation_type
            && self.object(mutation).is_none()
        {
            bail!("Mutation root type '{}' is not registered", mutation);
        }

        for object in self.types.values() {
            for field in object.fields.values() {
                if !self.is_known_type(field.ty.named_type()) {
                    bail!(
                        "Field '{}.{}' references unknown type '{}'",
                        object.name,
                        field.name,
                        field.ty.named_type()
                    );
                }
                for arg in &field.args {
                    if !Self::is_scalar(arg.ty.named_type()) {
                        bail!(
                            "Argument '{}' of '{}.{}' must be a scalar, found '{}'",
                            arg.name,
                            object.name,
                            field.name,
                            arg.ty
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Render the schema as SDL
    pub fn to_sdl(&self) -> String {
        let mut sdl = String::new();

        for object in self.types.values() {
            sdl.push_str(&format!("type {} {{\n", object.name));
            for field in object.fields.values() {
                sdl.push_str("  ");
                sdl.push_str(&field.name);
                if !field.args.is_empty() {
                    let args: Vec<String> = field
                        .args
                        .iter()
                        .map(|arg| format!("{}: {}", arg.name, arg.ty))
                        .collect();
                    sdl.push_str(&format!("({})", args.join(", ")));
                }
                sdl.push_str(&format!(": {}\n", field.ty));
            }
            sdl.push_str("}\n\n");
        }

        sdl.push_str("schema {\n");
        sdl.push_str(&format!("  query: {}\n", self.query_type));
        if let Some(mutation) = &self.mutation_type {
            sdl.push_str(&format!("  mutation: {}\n", mutation));
        }
        sdl.push_str("}\n");

        sdl
    }
}
