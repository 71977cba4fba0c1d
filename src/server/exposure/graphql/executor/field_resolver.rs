//! Field resolution and value completion
//!
//! Resolution walks the selection set top-down. Each field runs its resolver
//! (or projects the parent attribute), then the raw JSON value is completed
//! against the field's declared type: scalars are serialized, objects recurse
//! into their sub-selection and lists complete every item.
//!
//! Failures never abort the walk. A failed position yields `None` plus an
//! error; the nearest nullable position turns that into `null`.

use futures::future::{BoxFuture, FutureExt, join_all};
use graphql_parser::query::{
    Directive, Document, Field, FragmentDefinition, Selection, SelectionSet, TypeCondition,
    Value as GqlValue,
};
use indexmap::IndexMap;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};

use super::response::{PathSegment, Resolution, ServerError};
use super::utils::{coerce_literal, serialize_scalar};
use crate::server::exposure::graphql::schema::{
    FieldDef, ObjectType, ResolverContext, SchemaRegistry, TypeRef,
};
use crate::server::host::ServerHost;

type FieldNode = Field<'static, String>;

/// Fields grouped by response key, in selection order
type GroupedFields<'a> = IndexMap<String, Vec<&'a FieldNode>>;

/// Per-request execution state
pub struct ExecutionContext<'a> {
    host: &'a ServerHost,
    schema: &'a SchemaRegistry,
    fragments: HashMap<&'a str, &'a FragmentDefinition<'static, String>>,
    variables: Map<String, Value>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        host: &'a ServerHost,
        document: &'a Document<'static, String>,
        variables: Map<String, Value>,
    ) -> Self {
        Self {
            host,
            schema: &host.schema,
            fragments: super::core::fragment_map(document),
            variables,
        }
    }

    // -------------------------------------------------------------------------
    // Field collection
    // -------------------------------------------------------------------------

    /// Group the fields selected on `type_name`, honouring `@skip`/`@include`
    /// and flattening fragments whose type condition applies.
    fn collect_fields(
        &self,
        type_name: &str,
        selection_sets: &[&'a SelectionSet<'static, String>],
    ) -> GroupedFields<'a> {
        let mut fields = GroupedFields::new();
        for selection_set in selection_sets {
            let mut visited = HashSet::new();
            self.collect_into(type_name, selection_set, &mut fields, &mut visited);
        }
        fields
    }

    fn collect_into(
        &self,
        type_name: &str,
        selection_set: &'a SelectionSet<'static, String>,
        fields: &mut GroupedFields<'a>,
        visited: &mut HashSet<&'a str>,
    ) {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => {
                    if !self.should_include(&field.directives) {
                        continue;
                    }
                    let key = field.alias.as_ref().unwrap_or(&field.name).clone();
                    fields.entry(key).or_default().push(field);
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.fragment_name.as_str();
                    if !self.should_include(&spread.directives) || !visited.insert(name) {
                        continue;
                    }
                    let Some(&fragment) = self.fragments.get(name) else {
                        continue;
                    };
                    let TypeCondition::On(condition) = &fragment.type_condition;
                    if condition == type_name {
                        self.collect_into(type_name, &fragment.selection_set, fields, visited);
                    }
                }
                Selection::InlineFragment(inline) => {
                    if !self.should_include(&inline.directives) {
                        continue;
                    }
                    if let Some(TypeCondition::On(condition)) = &inline.type_condition
                        && condition != type_name
                    {
                        continue;
                    }
                    self.collect_into(type_name, &inline.selection_set, fields, visited);
                }
            }
        }
    }

    fn should_include(&self, directives: &[Directive<'static, String>]) -> bool {
        for directive in directives {
            let condition = directive
                .arguments
                .iter()
                .find(|(name, _)| name == "if")
                .map(|(_, value)| match value {
                    GqlValue::Boolean(b) => *b,
                    GqlValue::Variable(name) => self
                        .variables
                        .get(name)
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    _ => false,
                })
                .unwrap_or(false);

            match directive.name.as_str() {
                "skip" if condition => return false,
                "include" if !condition => return false,
                _ => {}
            }
        }
        true
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Execute the selection sets against `parent` as an instance of
    /// `object_type`.
    ///
    /// With `serial` set, fields run one after another and a failing field
    /// stops the remaining ones (they are returned as `null`); otherwise
    /// sibling fields run concurrently.
    pub fn execute_selection_set<'b>(
        &'b self,
        object_type: &'a ObjectType,
        parent: &'b Value,
        selection_sets: Vec<&'a SelectionSet<'static, String>>,
        path: Vec<PathSegment>,
        serial: bool,
    ) -> BoxFuture<'b, Resolution> {
        async move {
            let fields = self.collect_fields(&object_type.name, &selection_sets);

            let resolutions: Vec<(&String, Resolution)> = if serial {
                let mut resolutions = Vec::with_capacity(fields.len());
                let mut halted = false;
                for (key, group) in &fields {
                    if halted {
                        resolutions.push((key, Resolution::null()));
                        continue;
                    }
                    let resolution = self
                        .execute_field(object_type, parent, key, group, &path)
                        .await;
                    halted = resolution.errors.iter().any(|e| e.path.len() == path.len() + 1);
                    resolutions.push((key, resolution));
                }
                resolutions
            } else {
                let path = &path;
                let pending = fields.iter().map(|(key, group)| async move {
                    (key, self.execute_field(object_type, parent, key, group, path).await)
                });
                join_all(pending).await
            };

            let mut data = Map::new();
            let mut errors = Vec::new();
            let mut failed = false;
            for (key, resolution) in resolutions {
                errors.extend(resolution.errors);
                match resolution.value {
                    Some(value) => {
                        data.insert(key.clone(), value);
                    }
                    None => failed = true,
                }
            }

            Resolution {
                value: (!failed).then_some(Value::Object(data)),
                errors,
            }
        }
        .boxed()
    }

    fn execute_field<'b>(
        &'b self,
        object_type: &'a ObjectType,
        parent: &'b Value,
        response_key: &'b str,
        fields: &'b [&'a FieldNode],
        path: &'b [PathSegment],
    ) -> BoxFuture<'b, Resolution> {
        async move {
            let field = fields[0];
            let mut field_path = path.to_vec();
            field_path.push(PathSegment::Key(response_key.to_string()));

            if field.name == "__typename" {
                return Resolution::value(json!(object_type.name));
            }

            let Some(definition) = object_type.fields.get(&field.name) else {
                let message = format!(
                    "Cannot query field \"{}\" on type \"{}\".",
                    field.name, object_type.name
                );
                return Resolution::error(
                    ServerError::new(message)
                        .at(field.position)
                        .with_path(&field_path),
                )
                .or_null();
            };

            let args = match self.coerce_arguments(definition, field) {
                Ok(args) => args,
                Err(message) => {
                    return self.field_error(definition, field, &field_path, message);
                }
            };

            let raw = match &definition.resolver {
                Some(resolver) => {
                    resolver(ResolverContext {
                        host: self.host,
                        parent,
                        args: &args,
                    })
                    .await
                }
                None => Ok(parent.get(&definition.name).cloned().unwrap_or(Value::Null)),
            };

            let raw = match raw {
                Ok(raw) => raw,
                Err(e) => {
                    return self.field_error(definition, field, &field_path, e.to_string());
                }
            };

            let selection_sets = fields.iter().map(|&f| &f.selection_set).collect();
            let resolution = self
                .complete_value(
                    &definition.ty,
                    raw,
                    selection_sets,
                    field_path,
                    &object_type.name,
                    field,
                )
                .await;

            if definition.ty.is_non_null() {
                resolution
            } else {
                resolution.or_null()
            }
        }
        .boxed()
    }

    fn field_error(
        &self,
        definition: &FieldDef,
        field: &FieldNode,
        path: &[PathSegment],
        message: String,
    ) -> Resolution {
        let display_path: Vec<String> = path.iter().map(ToString::to_string).collect();
        tracing::warn!(path = %display_path.join("."), error = %message, "field resolution failed");

        let resolution =
            Resolution::error(ServerError::new(message).at(field.position).with_path(path));
        if definition.ty.is_non_null() {
            resolution
        } else {
            resolution.or_null()
        }
    }

    /// Coerce the field's literal arguments (variables substituted) to the
    /// declared argument types.
    fn coerce_arguments(
        &self,
        definition: &FieldDef,
        field: &FieldNode,
    ) -> Result<Map<String, Value>, String> {
        let mut args = Map::new();

        for arg in &definition.args {
            let provided = field
                .arguments
                .iter()
                .find(|(name, _)| *name == arg.name)
                .map(|(_, value)| value);

            let value = match provided {
                Some(literal) => coerce_literal(&arg.ty, literal, &self.variables)?,
                None => None,
            };

            match value {
                Some(Value::Null) | None if arg.ty.is_non_null() => {
                    return Err(format!(
                        "Argument \"{}\" of non-null type \"{}\" must not be null.",
                        arg.name, arg.ty
                    ));
                }
                Some(value) => {
                    args.insert(arg.name.clone(), value);
                }
                None => {}
            }
        }

        Ok(args)
    }

    /// Complete a raw resolver value against `ty`.
    fn complete_value<'b>(
        &'b self,
        ty: &'a TypeRef,
        raw: Value,
        selection_sets: Vec<&'a SelectionSet<'static, String>>,
        path: Vec<PathSegment>,
        parent_type: &'a str,
        field: &'a FieldNode,
    ) -> BoxFuture<'b, Resolution> {
        async move {
            let error = |message: String, path: &[PathSegment]| {
                Resolution::error(ServerError::new(message).at(field.position).with_path(path))
            };

            match ty {
                TypeRef::NonNull(inner) => {
                    let mut resolution = self
                        .complete_value(inner, raw, selection_sets, path.clone(), parent_type, field)
                        .await;
                    if resolution.value == Some(Value::Null) {
                        resolution.value = None;
                        resolution.errors.push(
                            ServerError::new(format!(
                                "Cannot return null for non-nullable field {}.{}.",
                                parent_type, field.name
                            ))
                            .at(field.position)
                            .with_path(&path),
                        );
                    }
                    resolution
                }
                _ if raw.is_null() => Resolution::null(),
                TypeRef::List(inner) => {
                    let Value::Array(items) = raw else {
                        return error(
                            format!(
                                "Expected Iterable, but did not find one for field \"{}.{}\".",
                                parent_type, field.name
                            ),
                            &path,
                        );
                    };

                    let pending = items.into_iter().enumerate().map(|(index, item)| {
                        let mut item_path = path.clone();
                        item_path.push(PathSegment::Index(index));
                        self.complete_value(
                            inner,
                            item,
                            selection_sets.clone(),
                            item_path,
                            parent_type,
                            field,
                        )
                    });

                    let mut values = Vec::new();
                    let mut errors = Vec::new();
                    let mut failed = false;
                    for resolution in join_all(pending).await {
                        let resolution = if inner.is_non_null() {
                            resolution
                        } else {
                            resolution.or_null()
                        };
                        errors.extend(resolution.errors);
                        match resolution.value {
                            Some(value) => values.push(value),
                            None => failed = true,
                        }
                    }

                    Resolution {
                        value: (!failed).then_some(Value::Array(values)),
                        errors,
                    }
                }
                TypeRef::Named(name) if SchemaRegistry::is_scalar(name) => {
                    match serialize_scalar(name, &raw) {
                        Ok(value) => Resolution::value(value),
                        Err(message) => error(message, &path),
                    }
                }
                TypeRef::Named(name) => {
                    let Some(object_type) = self.schema.object(name) else {
                        return error(format!("Unknown type \"{}\".", name), &path);
                    };
                    if !raw.is_object() {
                        return error(
                            format!(
                                "Expected value of type \"{}\" for field \"{}.{}\", found {}.",
                                name, parent_type, field.name, raw
                            ),
                            &path,
                        );
                    }
                    self.execute_selection_set(object_type, &raw, selection_sets, path, false)
                        .await
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Author, Book};
    use crate::server::exposure::graphql::schema::ResolverFuture;
    use crate::storage::InMemoryDataService;
    use graphql_parser::query::{Definition, OperationDefinition, parse_query};
    use std::sync::Arc;

    fn fail(_ctx: ResolverContext<'_>) -> ResolverFuture<'_> {
        async move { Err(anyhow::anyhow!("backend down")) }.boxed()
    }

    fn items(_ctx: ResolverContext<'_>) -> ResolverFuture<'_> {
        async move { Ok(json!([{"n": 1}, {"n": null}, {"n": 3}])) }.boxed()
    }

    fn test_host() -> ServerHost {
        let schema = SchemaRegistry::new("Query")
            .register(
                ObjectType::new("Item")
                    .field(FieldDef::new("n", TypeRef::non_null(TypeRef::named("Int")))),
            )
            .register(
                ObjectType::new("Query")
                    .field(FieldDef::new("broken", TypeRef::named("String")).resolver(fail))
                    .field(
                        FieldDef::new("strict", TypeRef::non_null(TypeRef::named("String")))
                            .resolver(fail),
                    )
                    .field(FieldDef::new("items", TypeRef::list(TypeRef::named("Item"))).resolver(items))
                    .field(
                        FieldDef::new(
                            "strictItems",
                            TypeRef::list(TypeRef::non_null(TypeRef::named("Item"))),
                        )
                        .resolver(items),
                    ),
            );

        ServerHost::new(
            Arc::new(InMemoryDataService::<Book>::new()),
            Arc::new(InMemoryDataService::<Author>::new()),
            schema,
        )
        .unwrap()
    }

    async fn run(host: &ServerHost, query: &str) -> Resolution {
        let document = parse_query::<String>(query).unwrap().into_static();
        let Definition::Operation(OperationDefinition::SelectionSet(set)) = &document.definitions[0]
        else {
            panic!("expected an anonymous query");
        };
        let ctx = ExecutionContext::new(host, &document, Map::new());
        let root = host.schema.object("Query").unwrap();
        ctx.execute_selection_set(root, &Value::Null, vec![set], Vec::new(), false)
            .await
    }

    #[tokio::test]
    async fn test_nullable_field_error_is_local() {
        let host = test_host();
        let resolution = run(&host, "{ broken items { n } }").await;

        let data = resolution.value.unwrap();
        assert_eq!(data["broken"], Value::Null);
        assert_eq!(data["items"], json!([{"n": 1}, null, {"n": 3}]));
        assert_eq!(resolution.errors.len(), 2);
        assert_eq!(resolution.errors[0].message, "backend down");
        assert_eq!(resolution.errors[0].path, vec![PathSegment::Key("broken".into())]);
        assert_eq!(
            resolution.errors[1].path,
            vec![
                PathSegment::Key("items".into()),
                PathSegment::Index(1),
                PathSegment::Key("n".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_non_null_failure_propagates_to_parent() {
        let host = test_host();
        let resolution = run(&host, "{ strict items { n } }").await;

        assert!(resolution.value.is_none());
        assert_eq!(resolution.errors[0].message, "backend down");
    }

    #[tokio::test]
    async fn test_non_null_list_item_nulls_the_list() {
        let host = test_host();
        let resolution = run(&host, "{ strictItems { n } }").await;

        assert_eq!(resolution.value.unwrap()["strictItems"], Value::Null);
        assert!(resolution.errors[0].message.contains("non-nullable field Item.n"));
    }

    #[tokio::test]
    async fn test_aliases_typename_and_directives() {
        let host = test_host();
        let resolution = run(
            &host,
            "{ first: items { n __typename } hidden: broken @skip(if: true) ... on Query { t: __typename } }",
        )
        .await;

        let data = resolution.value.unwrap();
        assert_eq!(data["first"][0], json!({"n": 1, "__typename": "Item"}));
        assert!(data.get("hidden").is_none());
        assert_eq!(data["t"], "Query");
        let keys: Vec<&String> = data.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["first", "t"]);
    }
}
