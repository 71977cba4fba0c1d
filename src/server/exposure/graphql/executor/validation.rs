//! Static validation of the selected operation against the schema registry
//!
//! Every error is collected (validation does not stop at the first one) and
//! carries the location of the offending node. A document that produces any
//! error here is never executed.

use graphql_parser::Pos;
use graphql_parser::query::{
    Definition, Directive, Document, Field, FragmentDefinition, OperationDefinition, Selection,
    SelectionSet, TypeCondition, Value as GqlValue,
};
use serde_json::Map;
use std::collections::{HashMap, HashSet};

use super::core::Operation;
use super::response::ServerError;
use super::utils::{coerce_literal, print_literal, type_ref_from_ast};
use crate::server::exposure::graphql::schema::{SchemaRegistry, TypeRef};

type Doc = Document<'static, String>;

/// Validate `operation` (and the fragments it reaches) against `schema`
pub fn validate_operation(
    schema: &SchemaRegistry,
    document: &Doc,
    operation: &Operation<'_>,
    root_type: &str,
) -> Vec<ServerError> {
    let mut validator = Validator::new(schema, document);
    validator.check_fragment_names(document);
    validator.check_unused_fragments(document);
    validator.check_variable_definitions(operation);
    validator.visit_selection_set(root_type, operation.selection_set, &mut Vec::new());
    validator.check_unused_variables(operation);
    validator.errors
}

/// A variable definition as seen by usage checks
struct VariableInfo {
    ty: TypeRef,
    has_default: bool,
    position: Pos,
}

struct Validator<'a> {
    schema: &'a SchemaRegistry,
    fragments: HashMap<&'a str, &'a FragmentDefinition<'static, String>>,
    variables: HashMap<&'a str, VariableInfo>,
    used_variables: HashSet<String>,
    visited_fragments: HashSet<&'a str>,
    errors: Vec<ServerError>,
}

impl<'a> Validator<'a> {
    fn new(schema: &'a SchemaRegistry, document: &'a Doc) -> Self {
        Self {
            schema,
            fragments: super::core::fragment_map(document),
            variables: HashMap::new(),
            used_variables: HashSet::new(),
            visited_fragments: HashSet::new(),
            errors: Vec::new(),
        }
    }

    fn error(&mut self, message: String, pos: Pos) {
        self.errors.push(ServerError::new(message).at(pos));
    }

    // -------------------------------------------------------------------------
    // Document level
    // -------------------------------------------------------------------------

    fn check_fragment_names(&mut self, document: &'a Doc) {
        let mut seen = HashSet::new();
        for definition in &document.definitions {
            if let Definition::Fragment(fragment) = definition
                && !seen.insert(fragment.name.as_str())
            {
                self.error(
                    format!(
                        "There can be only one fragment named \"{}\".",
                        fragment.name
                    ),
                    fragment.position,
                );
            }
        }
    }

    /// Every fragment must be spread, directly or through another fragment,
    /// by some operation of the document
    fn check_unused_fragments(&mut self, document: &'a Doc) {
        let mut pending: Vec<&'a SelectionSet<'static, String>> = document
            .definitions
            .iter()
            .filter_map(|definition| match definition {
                Definition::Operation(OperationDefinition::SelectionSet(set)) => Some(set),
                Definition::Operation(OperationDefinition::Query(query)) => {
                    Some(&query.selection_set)
                }
                Definition::Operation(OperationDefinition::Mutation(mutation)) => {
                    Some(&mutation.selection_set)
                }
                Definition::Operation(OperationDefinition::Subscription(subscription)) => {
                    Some(&subscription.selection_set)
                }
                Definition::Fragment(_) => None,
            })
            .collect();

        let mut used: HashSet<&'a str> = HashSet::new();
        while let Some(selection_set) = pending.pop() {
            for selection in &selection_set.items {
                match selection {
                    Selection::Field(field) => pending.push(&field.selection_set),
                    Selection::InlineFragment(inline) => pending.push(&inline.selection_set),
                    Selection::FragmentSpread(spread) => {
                        let name = spread.fragment_name.as_str();
                        if used.insert(name)
                            && let Some(&fragment) = self.fragments.get(name)
                        {
                            pending.push(&fragment.selection_set);
                        }
                    }
                }
            }
        }

        for definition in &document.definitions {
            if let Definition::Fragment(fragment) = definition
                && !used.contains(fragment.name.as_str())
            {
                self.error(
                    format!("Fragment \"{}\" is never used.", fragment.name),
                    fragment.position,
                );
            }
        }
    }

    fn check_variable_definitions(&mut self, operation: &Operation<'a>) {
        for definition in operation.variable_definitions {
            let name = definition.name.as_str();
            let ty = type_ref_from_ast(&definition.var_type);
            let named = ty.named_type();

            if self.variables.contains_key(name) {
                self.error(
                    format!("There can be only one variable named \"${}\".", name),
                    definition.position,
                );
                continue;
            }

            if !self.schema.is_known_type(named) {
                self.error(format!("Unknown type \"{}\".", named), definition.position);
            } else if !SchemaRegistry::is_scalar(named) {
                self.error(
                    format!(
                        "Variable \"${}\" cannot be non-input type \"{}\".",
                        name, ty
                    ),
                    definition.position,
                );
            } else if let Some(default) = &definition.default_value
                && let Err(message) = coerce_literal(&ty, default, &Map::new())
            {
                self.error(
                    format!(
                        "Variable \"${}\" has invalid default value {}: {}",
                        name,
                        print_literal(default),
                        message
                    ),
                    definition.position,
                );
            }

            let has_default = definition
                .default_value
                .as_ref()
                .is_some_and(|value| !matches!(value, GqlValue::Null));

            self.variables.insert(
                name,
                VariableInfo {
                    ty,
                    has_default,
                    position: definition.position,
                },
            );
        }
    }

    fn check_unused_variables(&mut self, operation: &Operation<'a>) {
        let mut unused: Vec<(String, Pos)> = self
            .variables
            .iter()
            .filter(|(name, _)| !self.used_variables.contains(**name))
            .map(|(name, info)| (name.to_string(), info.position))
            .collect();
        unused.sort_by_key(|(_, pos)| (pos.line, pos.column));

        for (name, pos) in unused {
            let message = match operation.name {
                Some(op) => format!("Variable \"${}\" is never used in operation \"{}\".", name, op),
                None => format!("Variable \"${}\" is never used.", name),
            };
            self.error(message, pos);
        }
    }

    // -------------------------------------------------------------------------
    // Selections
    // -------------------------------------------------------------------------

    fn visit_selection_set(
        &mut self,
        parent_type: &str,
        selection_set: &'a SelectionSet<'static, String>,
        fragment_stack: &mut Vec<&'a str>,
    ) {
        for selection in &selection_set.items {
            match selection {
                Selection::Field(field) => self.visit_field(parent_type, field, fragment_stack),
                Selection::FragmentSpread(spread) => {
                    self.visit_directives(&spread.directives);
                    let name = spread.fragment_name.as_str();

                    let Some(fragment) = self.fragments.get(name).copied() else {
                        self.error(format!("Unknown fragment \"{}\".", name), spread.position);
                        continue;
                    };
                    if fragment_stack.contains(&name) {
                        self.error(
                            format!("Cannot spread fragment \"{}\" within itself.", name),
                            spread.position,
                        );
                        continue;
                    }

                    let TypeCondition::On(condition) = &fragment.type_condition;
                    if !self.check_type_condition(parent_type, condition, Some(name), spread.position)
                    {
                        continue;
                    }
                    if !self.visited_fragments.insert(name) {
                        continue;
                    }

                    fragment_stack.push(name);
                    self.visit_directives(&fragment.directives);
                    self.visit_selection_set(condition, &fragment.selection_set, fragment_stack);
                    fragment_stack.pop();
                }
                Selection::InlineFragment(inline) => {
                    self.visit_directives(&inline.directives);
                    let target = match &inline.type_condition {
                        Some(TypeCondition::On(condition)) => {
                            if !self.check_type_condition(
                                parent_type,
                                condition,
                                None,
                                inline.position,
                            ) {
                                continue;
                            }
                            condition.as_str()
                        }
                        None => parent_type,
                    };
                    self.visit_selection_set(target, &inline.selection_set, fragment_stack);
                }
            }
        }
    }

    /// Object types only, so a fragment applies iff its condition names the
    /// parent type itself.
    fn check_type_condition(
        &mut self,
        parent_type: &str,
        condition: &str,
        fragment: Option<&str>,
        pos: Pos,
    ) -> bool {
        if !self.schema.is_known_type(condition) {
            self.error(format!("Unknown type \"{}\".", condition), pos);
            return false;
        }
        if SchemaRegistry::is_scalar(condition) {
            self.error(
                format!(
                    "Fragment cannot condition on non composite type \"{}\".",
                    condition
                ),
                pos,
            );
            return false;
        }
        if condition != parent_type {
            let subject = match fragment {
                Some(name) => format!("Fragment \"{}\"", name),
                None => "Fragment".to_string(),
            };
            self.error(
                format!(
                    "{} cannot be spread here as objects of type \"{}\" can never be of type \"{}\".",
                    subject, parent_type, condition
                ),
                pos,
            );
            return false;
        }
        true
    }

    fn visit_field(
        &mut self,
        parent_type: &str,
        field: &'a Field<'static, String>,
        fragment_stack: &mut Vec<&'a str>,
    ) {
        self.visit_directives(&field.directives);
        let name = field.name.as_str();

        if name == "__typename" {
            for (arg, _) in &field.arguments {
                self.error(
                    format!(
                        "Unknown argument \"{}\" on field \"{}.__typename\".",
                        arg, parent_type
                    ),
                    field.position,
                );
            }
            if !field.selection_set.items.is_empty() {
                self.error(
                    "Field \"__typename\" must not have a selection since type \"String!\" has no subfields.".to_string(),
                    field.position,
                );
            }
            return;
        }

        let Some(definition) = self.schema.field(parent_type, name) else {
            self.error(
                format!("Cannot query field \"{}\" on type \"{}\".", name, parent_type),
                field.position,
            );
            return;
        };

        // Arguments
        let mut seen = HashSet::new();
        for (arg_name, value) in &field.arguments {
            if !seen.insert(arg_name.as_str()) {
                self.error(
                    format!("There can be only one argument named \"{}\".", arg_name),
                    field.position,
                );
                continue;
            }
            match definition.find_argument(arg_name) {
                Some(arg) => self.check_value(&arg.ty, value, field.position),
                None => self.error(
                    format!(
                        "Unknown argument \"{}\" on field \"{}.{}\".",
                        arg_name, parent_type, name
                    ),
                    field.position,
                ),
            }
        }
        for arg in &definition.args {
            if arg.ty.is_non_null() && !seen.contains(arg.name.as_str()) {
                self.error(
                    format!(
                        "Field \"{}\" argument \"{}\" of type \"{}\" is required, but it was not provided.",
                        name, arg.name, arg.ty
                    ),
                    field.position,
                );
            }
        }

        // Leaf / composite selection
        let return_type = definition.ty.named_type();
        let has_selection = !field.selection_set.items.is_empty();
        if SchemaRegistry::is_scalar(return_type) {
            if has_selection {
                self.error(
                    format!(
                        "Field \"{}\" must not have a selection since type \"{}\" has no subfields.",
                        name, definition.ty
                    ),
                    field.position,
                );
            }
        } else if !has_selection {
            self.error(
                format!(
                    "Field \"{}\" of type \"{}\" must have a selection of subfields. Did you mean \"{} {{ ... }}\"?",
                    name, definition.ty, name
                ),
                field.position,
            );
        } else {
            self.visit_selection_set(return_type, &field.selection_set, fragment_stack);
        }
    }

    fn visit_directives(&mut self, directives: &'a [Directive<'static, String>]) {
        let condition = TypeRef::non_null(TypeRef::named("Boolean"));

        for directive in directives {
            let name = directive.name.as_str();
            if name != "skip" && name != "include" {
                self.error(format!("Unknown directive \"@{}\".", name), directive.position);
                continue;
            }

            let mut has_if = false;
            for (arg, value) in &directive.arguments {
                if arg == "if" {
                    has_if = true;
                    self.check_value(&condition, value, directive.position);
                } else {
                    self.error(
                        format!("Unknown argument \"{}\" on directive \"@{}\".", arg, name),
                        directive.position,
                    );
                }
            }
            if !has_if {
                self.error(
                    format!(
                        "Directive \"@{}\" argument \"if\" of type \"Boolean!\" is required, but it was not provided.",
                        name
                    ),
                    directive.position,
                );
            }
        }
    }

    // -------------------------------------------------------------------------
    // Values
    // -------------------------------------------------------------------------

    fn check_value(&mut self, expected: &TypeRef, value: &GqlValue<'static, String>, pos: Pos) {
        if let GqlValue::Variable(name) = value {
            self.used_variables.insert(name.clone());
            let Some(info) = self.variables.get(name.as_str()) else {
                self.error(format!("Variable \"${}\" is not defined.", name), pos);
                return;
            };
            if !is_variable_usage_allowed(&info.ty, info.has_default, expected) {
                let message = format!(
                    "Variable \"${}\" of type \"{}\" used in position expecting type \"{}\".",
                    name, info.ty, expected
                );
                self.error(message, pos);
            }
            return;
        }

        // Variables nested in list literals still count as used
        let mut nested = Vec::new();
        collect_variables(value, &mut nested);
        for name in nested {
            if !self.variables.contains_key(name.as_str()) {
                self.error(format!("Variable \"${}\" is not defined.", name), pos);
            }
            self.used_variables.insert(name);
        }

        if let Err(message) = coerce_literal(expected, value, &Map::new()) {
            self.error(message, pos);
        }
    }
}

fn collect_variables(value: &GqlValue<'static, String>, out: &mut Vec<String>) {
    match value {
        GqlValue::Variable(name) => out.push(name.clone()),
        GqlValue::List(items) => items.iter().for_each(|item| collect_variables(item, out)),
        GqlValue::Object(fields) => fields.values().for_each(|item| collect_variables(item, out)),
        _ => {}
    }
}

/// A nullable variable may only flow into a non-null position when it has a
/// non-null default.
fn is_variable_usage_allowed(variable: &TypeRef, has_default: bool, location: &TypeRef) -> bool {
    if let TypeRef::NonNull(location_inner) = location
        && !variable.is_non_null()
    {
        return has_default && is_subtype(variable, location_inner);
    }
    is_subtype(variable, location)
}

fn is_subtype(sub: &TypeRef, sup: &TypeRef) -> bool {
    match (sub, sup) {
        (TypeRef::NonNull(a), TypeRef::NonNull(b)) => is_subtype(a, b),
        (TypeRef::NonNull(a), b) => is_subtype(a, b),
        (_, TypeRef::NonNull(_)) => false,
        (TypeRef::List(a), TypeRef::List(b)) => is_subtype(a, b),
        (TypeRef::List(_), _) | (_, TypeRef::List(_)) => false,
        (TypeRef::Named(a), TypeRef::Named(b)) => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::exposure::graphql::executor::core::select_operation;
    use crate::server::exposure::graphql::resolvers::catalog_schema;
    use graphql_parser::query::parse_query;

    fn errors_for(query: &str) -> Vec<String> {
        let schema = catalog_schema();
        let document = parse_query::<String>(query).unwrap().into_static();
        let operation = select_operation(&document, None).unwrap();
        let root = match operation.kind {
            super::super::core::OperationKind::Query => "Query",
            super::super::core::OperationKind::Mutation => "Mutation",
        };
        validate_operation(&schema, &document, &operation, root)
            .into_iter()
            .map(|e| e.message)
            .collect()
    }

    #[test]
    fn test_valid_query_has_no_errors() {
        let errors = errors_for(
            r#"
            query Catalog($id: ID) {
                book(id: $id) { ...BookParts author: authorID { name } }
                authors { __typename ... on Author { age } }
            }
            fragment BookParts on Book { id name @include(if: true) }
            "#,
        );
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_unknown_field() {
        let errors = errors_for("{ books { title } }");
        assert_eq!(errors, vec!["Cannot query field \"title\" on type \"Book\"."]);
    }

    #[test]
    fn test_unknown_argument() {
        let errors = errors_for("{ books(limit: 2) { id } }");
        assert_eq!(errors, vec!["Unknown argument \"limit\" on field \"Query.books\"."]);
    }

    #[test]
    fn test_missing_required_argument() {
        let errors = errors_for(r#"mutation { addAuthor(name: "Ann") { id } }"#);
        assert_eq!(
            errors,
            vec!["Field \"addAuthor\" argument \"age\" of type \"Int!\" is required, but it was not provided."]
        );
    }

    #[test]
    fn test_wrong_literal_type() {
        let errors = errors_for(r#"mutation { addAuthor(name: "Ann", age: "thirty") { id } }"#);
        assert_eq!(errors, vec!["Int cannot represent non-integer value: \"thirty\""]);

        let errors = errors_for("{ book(id: true) { id } }");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_leaf_and_object_selections() {
        let errors = errors_for("{ books { name { x } authorID } }");
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("must not have a selection"));
        assert!(errors[1].contains("must have a selection of subfields"));
    }

    #[test]
    fn test_fragment_errors() {
        let errors = errors_for("{ books { ...Missing } }");
        assert_eq!(errors, vec!["Unknown fragment \"Missing\"."]);

        let errors = errors_for("{ books { ...A } } fragment A on Author { id }");
        assert!(errors[0].contains("can never be of type \"Author\""));

        let errors = errors_for(
            "{ books { ...A } } fragment A on Book { ...B } fragment B on Book { ...A }",
        );
        assert!(errors.iter().any(|e| e.contains("within itself")));
    }

    #[test]
    fn test_unused_fragment() {
        let errors = errors_for("{ books { id } } fragment Unused on Book { name }");
        assert_eq!(errors, vec!["Fragment \"Unused\" is never used."]);

        // reached only through another fragment
        let errors = errors_for(
            "{ books { ...Outer } } fragment Outer on Book { ...Inner } fragment Inner on Book { id }",
        );
        assert!(errors.is_empty(), "{:?}", errors);

        // spread by a sibling operation that was not selected
        let schema = catalog_schema();
        let document = parse_query::<String>(
            "query A { books { id } } query B { books { ...Parts } } fragment Parts on Book { id }",
        )
        .unwrap()
        .into_static();
        let operation = select_operation(&document, Some("A")).unwrap();
        assert!(validate_operation(&schema, &document, &operation, "Query").is_empty());
    }

    #[test]
    fn test_variable_errors() {
        let errors = errors_for("{ book(id: $id) { id } }");
        assert_eq!(errors, vec!["Variable \"$id\" is not defined."]);

        let errors = errors_for("query Q($id: ID) { books { id } }");
        assert_eq!(errors, vec!["Variable \"$id\" is never used in operation \"Q\"."]);

        let errors = errors_for(
            "mutation($age: Int) { addAuthor(name: \"A\", age: $age) { id } }",
        );
        assert_eq!(
            errors,
            vec!["Variable \"$age\" of type \"Int\" used in position expecting type \"Int!\"."]
        );

        let errors = errors_for(
            "mutation($age: Int = 3) { addAuthor(name: \"A\", age: $age) { id } }",
        );
        assert!(errors.is_empty(), "{:?}", errors);

        let errors = errors_for("query($b: Book) { books { id @skip(if: $b) } }");
        assert!(errors[0].contains("cannot be non-input type"));
    }

    #[test]
    fn test_unknown_directive() {
        let errors = errors_for("{ books { id @deprecated } }");
        assert_eq!(errors, vec!["Unknown directive \"@deprecated\"."]);
    }

    #[test]
    fn test_locations_are_reported() {
        let schema = catalog_schema();
        let document = parse_query::<String>("{\n  books {\n    title\n  }\n}")
            .unwrap()
            .into_static();
        let operation = select_operation(&document, None).unwrap();
        let errors = validate_operation(&schema, &document, &operation, "Query");

        assert_eq!(errors[0].locations[0].line, 3);
        assert_eq!(errors[0].locations[0].column, 5);
    }

    #[test]
    fn test_variable_usage_rules() {
        let id = TypeRef::named("ID");
        let id_nn = TypeRef::non_null(TypeRef::named("ID"));

        assert!(is_variable_usage_allowed(&id_nn, false, &id));
        assert!(is_variable_usage_allowed(&id_nn, false, &id_nn));
        assert!(!is_variable_usage_allowed(&id, false, &id_nn));
        assert!(is_variable_usage_allowed(&id, true, &id_nn));
        assert!(!is_variable_usage_allowed(&TypeRef::named("Int"), false, &id));
    }
}
