//! Core GraphQL executor orchestration
//!
//! parse → select operation → validate → coerce variables → execute

use graphql_parser::Pos;
use graphql_parser::query::{
    Definition, Document, FragmentDefinition, OperationDefinition, SelectionSet,
    VariableDefinition, parse_query,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::field_resolver::ExecutionContext;
use super::response::{Response, ServerError};
use super::utils::{coerce_input, coerce_literal, type_ref_from_ast};
use super::validation::validate_operation;
use crate::core::GraphQLError;
use crate::server::host::ServerHost;

/// Body of a GraphQL request over HTTP
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GraphQLRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
    #[serde(default, rename = "operationName")]
    pub operation_name: Option<String>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// The operation chosen for execution
#[derive(Debug, Clone, Copy)]
pub struct Operation<'a> {
    pub kind: OperationKind,
    pub name: Option<&'a str>,
    pub position: Pos,
    pub variable_definitions: &'a [VariableDefinition<'static, String>],
    pub selection_set: &'a SelectionSet<'static, String>,
}

/// Fragment definitions of a document by name
pub(super) fn fragment_map<'a>(
    document: &'a Document<'static, String>,
) -> HashMap<&'a str, &'a FragmentDefinition<'static, String>> {
    document
        .definitions
        .iter()
        .filter_map(|definition| match definition {
            Definition::Fragment(fragment) => Some((fragment.name.as_str(), fragment)),
            Definition::Operation(_) => None,
        })
        .collect()
}

/// Pick the operation to run: the one named `operation_name`, or the only
/// operation of the document.
pub(super) fn select_operation<'a>(
    document: &'a Document<'static, String>,
    operation_name: Option<&str>,
) -> Result<Operation<'a>, ServerError> {
    // Subscriptions are listed without a runnable operation
    let mut operations: Vec<(Option<&'a str>, Pos, Option<Operation<'a>>)> = Vec::new();

    for definition in &document.definitions {
        let Definition::Operation(op) = definition else {
            continue;
        };
        let operation = match op {
            OperationDefinition::SelectionSet(selection_set) => Operation {
                kind: OperationKind::Query,
                name: None,
                position: selection_set.span.0,
                variable_definitions: &[],
                selection_set,
            },
            OperationDefinition::Query(query) => Operation {
                kind: OperationKind::Query,
                name: query.name.as_deref(),
                position: query.position,
                variable_definitions: &query.variable_definitions,
                selection_set: &query.selection_set,
            },
            OperationDefinition::Mutation(mutation) => Operation {
                kind: OperationKind::Mutation,
                name: mutation.name.as_deref(),
                position: mutation.position,
                variable_definitions: &mutation.variable_definitions,
                selection_set: &mutation.selection_set,
            },
            OperationDefinition::Subscription(subscription) => {
                operations.push((subscription.name.as_deref(), subscription.position, None));
                continue;
            }
        };
        operations.push((operation.name, operation.position, Some(operation)));
    }

    let (_, position, selected) = match operation_name {
        Some(name) => operations
            .into_iter()
            .find(|(op_name, _, _)| *op_name == Some(name))
            .ok_or_else(|| ServerError::new(format!("Unknown operation named \"{}\".", name)))?,
        None => {
            if operations.len() > 1 {
                if let Some((_, position, _)) = operations.iter().find(|(name, _, _)| name.is_none()) {
                    return Err(ServerError::new(
                        "This anonymous operation must be the only defined operation.",
                    )
                    .at(*position));
                }
                return Err(ServerError::new(
                    "Must provide operation name if query contains multiple operations.",
                ));
            }
            operations
                .into_iter()
                .next()
                .ok_or_else(|| ServerError::new("Must provide an operation."))?
        }
    };

    selected.ok_or_else(|| ServerError::new("Subscriptions are not supported.").at(position))
}

/// Coerce the request variables to the operation's variable definitions
fn coerce_variable_values(
    operation: &Operation<'_>,
    provided: &Map<String, Value>,
) -> Result<Map<String, Value>, Vec<ServerError>> {
    let mut coerced = Map::new();
    let mut errors = Vec::new();

    for definition in operation.variable_definitions {
        let name = &definition.name;
        let ty = type_ref_from_ast(&definition.var_type);

        match provided.get(name) {
            Some(value) => match coerce_input(&ty, value) {
                Ok(value) => {
                    coerced.insert(name.clone(), value);
                }
                Err(message) => errors.push(
                    ServerError::new(format!(
                        "Variable \"${}\" got invalid value {}; {}",
                        name, value, message
                    ))
                    .at(definition.position),
                ),
            },
            None => {
                if let Some(default) = &definition.default_value {
                    match coerce_literal(&ty, default, &Map::new()) {
                        Ok(Some(value)) => {
                            coerced.insert(name.clone(), value);
                        }
                        Ok(None) => {}
                        Err(message) => errors.push(ServerError::new(message).at(definition.position)),
                    }
                } else if ty.is_non_null() {
                    errors.push(
                        ServerError::new(format!(
                            "Variable \"${}\" of required type \"{}\" was not provided.",
                            name, ty
                        ))
                        .at(definition.position),
                    );
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(coerced)
    } else {
        Err(errors)
    }
}

/// GraphQL executor running documents against the host's schema registry
pub struct GraphQLExecutor {
    host: Arc<ServerHost>,
}

impl GraphQLExecutor {
    /// Create a new executor with the given host
    pub fn new(host: Arc<ServerHost>) -> Self {
        Self { host }
    }

    /// Execute an HTTP request body
    pub async fn execute_request(&self, request: GraphQLRequest) -> Response {
        if request.query.trim().is_empty() {
            let error = GraphQLError::InvalidRequest {
                message: "Must provide query string.".to_string(),
            };
            return Response::from_errors(vec![ServerError::new(error.to_string())]);
        }

        self.execute(
            &request.query,
            request.variables,
            request.operation_name.as_deref(),
        )
        .await
    }

    /// Execute a GraphQL document.
    ///
    /// Syntax, operation selection, validation and variable errors yield a
    /// response without `data`; once execution starts, `data` is always
    /// present and field failures are reported alongside it.
    pub async fn execute(
        &self,
        query: &str,
        variables: Option<Map<String, Value>>,
        operation_name: Option<&str>,
    ) -> Response {
        let document = match parse_query::<String>(query) {
            Ok(document) => document.into_static(),
            Err(e) => {
                let error = GraphQLError::ParseError {
                    message: e.to_string(),
                };
                tracing::debug!(error = %error, "rejected unparsable document");
                return Response::from_errors(vec![ServerError::new(error.to_string())]);
            }
        };

        let operation = match select_operation(&document, operation_name) {
            Ok(operation) => operation,
            Err(error) => return Response::from_errors(vec![error]),
        };

        let schema = &self.host.schema;
        let root_type = match operation.kind {
            OperationKind::Query => schema.query_type(),
            OperationKind::Mutation => match schema.mutation_type() {
                Some(mutation) => mutation,
                None => {
                    return Response::from_errors(vec![
                        ServerError::new("Schema is not configured for mutations.")
                            .at(operation.position),
                    ]);
                }
            },
        };

        let errors = validate_operation(schema, &document, &operation, root_type);
        if !errors.is_empty() {
            tracing::debug!(count = errors.len(), "document failed validation");
            return Response::from_errors(errors);
        }

        let variables = match coerce_variable_values(&operation, &variables.unwrap_or_default()) {
            Ok(variables) => variables,
            Err(errors) => return Response::from_errors(errors),
        };

        let Some(root) = schema.object(root_type) else {
            return Response::from_errors(vec![ServerError::new(format!(
                "Root type \"{}\" is not registered.",
                root_type
            ))]);
        };

        tracing::debug!(
            operation = operation.name.unwrap_or("<anonymous>"),
            kind = ?operation.kind,
            "executing GraphQL operation"
        );

        let ctx = ExecutionContext::new(&self.host, &document, variables);
        let resolution = ctx
            .execute_selection_set(
                root,
                &Value::Null,
                vec![operation.selection_set],
                Vec::new(),
                operation.kind == OperationKind::Mutation,
            )
            .await;

        Response::data(resolution.value.unwrap_or(Value::Null), resolution.errors)
    }
}
