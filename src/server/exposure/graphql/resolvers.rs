//! The catalog schema: `Book`, `Author`, `Query` and `Mutation`, with the
//! resolvers backing each computed field.
//!
//! Resolvers exchange JSON: a parent object is the serialized entity, and a
//! resolver returns the serialized entity (or list / null) it found.

use anyhow::Result;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use super::schema::{
    FieldDef, ObjectType, ResolverContext, ResolverFuture, SchemaRegistry, TypeRef,
};
use crate::entities::{Author, Book};

/// Build the schema registry served by the catalog
pub fn catalog_schema() -> SchemaRegistry {
    let id = || TypeRef::named("ID");
    let string = || TypeRef::named("String");
    let int = || TypeRef::named("Int");
    let book = || TypeRef::named("Book");
    let author = || TypeRef::named("Author");

    SchemaRegistry::new("Query")
        .with_mutation_type("Mutation")
        .register(
            ObjectType::new("Book")
                .field(FieldDef::new("id", id()))
                .field(FieldDef::new("name", string()))
                .field(FieldDef::new("genre", string()))
                .field(FieldDef::new("authorID", author()).resolver(book_author)),
        )
        .register(
            ObjectType::new("Author")
                .field(FieldDef::new("id", id()))
                .field(FieldDef::new("name", string()))
                .field(FieldDef::new("age", int()))
                .field(FieldDef::new("books", TypeRef::list(book())).resolver(author_books)),
        )
        .register(
            ObjectType::new("Query")
                .field(
                    FieldDef::new("book", book())
                        .argument("id", id())
                        .resolver(query_book),
                )
                .field(
                    FieldDef::new("author", author())
                        .argument("id", id())
                        .resolver(query_author),
                )
                .field(FieldDef::new("books", TypeRef::list(book())).resolver(query_books))
                .field(FieldDef::new("authors", TypeRef::list(author())).resolver(query_authors)),
        )
        .register(
            ObjectType::new("Mutation")
                .field(
                    FieldDef::new("addAuthor", author())
                        .argument("name", TypeRef::non_null(string()))
                        .argument("age", TypeRef::non_null(int()))
                        .resolver(add_author),
                )
                .field(
                    FieldDef::new("addBook", book())
                        .argument("name", TypeRef::non_null(string()))
                        .argument("genre", TypeRef::non_null(string()))
                        .argument("authorID", TypeRef::non_null(id()))
                        .resolver(add_book),
                ),
        )
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

// =============================================================================
// Cross-type resolvers
// =============================================================================

/// `Book.authorID`: the author the book references, null when dangling
fn book_author(ctx: ResolverContext<'_>) -> ResolverFuture<'_> {
    async move {
        let Some(author_id) = ctx.parent_str("authorID") else {
            return Ok(Value::Null);
        };
        to_json(ctx.host.authors.get(author_id).await?)
    }
    .boxed()
}

/// `Author.books`: every book whose `authorID` is this author's id
fn author_books(ctx: ResolverContext<'_>) -> ResolverFuture<'_> {
    async move {
        let Some(author_id) = ctx.parent_str("id") else {
            return Ok(Value::Array(Vec::new()));
        };
        to_json(ctx.host.books.search("authorID", author_id).await?)
    }
    .boxed()
}

// =============================================================================
// Query
// =============================================================================

fn query_book(ctx: ResolverContext<'_>) -> ResolverFuture<'_> {
    async move {
        match ctx.arg_str("id") {
            Some(id) => to_json(ctx.host.books.get(id).await?),
            None => Ok(Value::Null),
        }
    }
    .boxed()
}

fn query_author(ctx: ResolverContext<'_>) -> ResolverFuture<'_> {
    async move {
        match ctx.arg_str("id") {
            Some(id) => to_json(ctx.host.authors.get(id).await?),
            None => Ok(Value::Null),
        }
    }
    .boxed()
}

fn query_books(ctx: ResolverContext<'_>) -> ResolverFuture<'_> {
    async move { to_json(ctx.host.books.list().await?) }.boxed()
}

fn query_authors(ctx: ResolverContext<'_>) -> ResolverFuture<'_> {
    async move { to_json(ctx.host.authors.list().await?) }.boxed()
}

// =============================================================================
// Mutation
// =============================================================================

fn add_author(ctx: ResolverContext<'_>) -> ResolverFuture<'_> {
    async move {
        let author = Author::new(ctx.required_str("name")?, ctx.required_i32("age")?);
        let created = ctx.host.authors.create(author).await?;
        tracing::debug!(id = %created.id, "added author");
        to_json(created)
    }
    .boxed()
}

/// The referenced author is not checked: a book may point at an id no
/// author has, and its `authorID` then resolves to null.
fn add_book(ctx: ResolverContext<'_>) -> ResolverFuture<'_> {
    async move {
        let book = Book::new(
            ctx.required_str("name")?,
            ctx.required_str("genre")?,
            ctx.required_str("authorID")?,
        );
        let created = ctx.host.books.create(book).await?;
        tracing::debug!(id = %created.id, author_id = %created.author_id, "added book");
        to_json(created)
    }
    .boxed()
}
