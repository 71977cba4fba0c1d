//! Shared test harness for storage backend testing
//!
//! Provides helpers for building catalog records and for talking to a
//! `TestServer` over GraphQL, plus the contract suites:
//! - `data_service_tests!`: `DataService<Book>` / `DataService<Author>` contract
//! - `graphql_integration_tests!`: end-to-end catalog behaviour over HTTP
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//! use storage_harness::*;
//! ```

#![allow(dead_code)]

#[macro_use]
pub mod data_service_tests;
#[macro_use]
pub mod graphql_tests;

use axum_test::TestServer;
use bookshelf::entities::{Author, Book};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Record helpers
// ---------------------------------------------------------------------------

/// A book pointing at `author_id`
pub fn book_by(name: &str, genre: &str, author_id: &str) -> Book {
    Book::new(name, genre, author_id)
}

/// A book with a fixed id, for duplicate-id checks
pub fn book_with_id(id: &str, name: &str, author_id: &str) -> Book {
    let mut book = Book::new(name, "fiction", author_id);
    book.id = id.to_string();
    book
}

/// `n` authors named `Author_0`, `Author_1`, ... aged 30, 31, ...
pub fn sample_authors(n: usize) -> Vec<Author> {
    (0..n)
        .map(|i| Author::new(format!("Author_{}", i), 30 + i as i32))
        .collect()
}

// ---------------------------------------------------------------------------
// GraphQL helpers
// ---------------------------------------------------------------------------

/// POST a query, assert HTTP 200 and return the JSON body
pub async fn graphql(server: &TestServer, query: &str) -> Value {
    graphql_with_variables(server, query, json!({})).await
}

/// POST a query with variables, assert HTTP 200 and return the JSON body
pub async fn graphql_with_variables(server: &TestServer, query: &str, variables: Value) -> Value {
    let response = server
        .post("/graphql")
        .json(&json!({"query": query, "variables": variables}))
        .await;
    response.assert_status_ok();
    response.json()
}

/// Run `addAuthor` and return the new id
pub async fn add_author(server: &TestServer, name: &str, age: i32) -> String {
    let body = graphql_with_variables(
        server,
        "mutation($name: String!, $age: Int!) { addAuthor(name: $name, age: $age) { id } }",
        json!({"name": name, "age": age}),
    )
    .await;
    assert_no_errors(&body);
    body["data"]["addAuthor"]["id"]
        .as_str()
        .expect("addAuthor returned no id")
        .to_string()
}

/// Run `addBook` and return the new id
pub async fn add_book(server: &TestServer, name: &str, genre: &str, author_id: &str) -> String {
    let body = graphql_with_variables(
        server,
        "mutation($name: String!, $genre: String!, $authorID: ID!) {
            addBook(name: $name, genre: $genre, authorID: $authorID) { id }
        }",
        json!({"name": name, "genre": genre, "authorID": author_id}),
    )
    .await;
    assert_no_errors(&body);
    body["data"]["addBook"]["id"]
        .as_str()
        .expect("addBook returned no id")
        .to_string()
}

// ---------------------------------------------------------------------------
// Assertion helpers
// ---------------------------------------------------------------------------

/// Assert that a response carries no `errors` entry
pub fn assert_no_errors(body: &Value) {
    assert!(
        body.get("errors").is_none(),
        "Expected no errors, got {}",
        body["errors"]
    );
}

/// Assert that a list contains exactly `n` items.
pub fn assert_count<T>(list: &[T], expected: usize) {
    assert_eq!(
        list.len(),
        expected,
        "Expected {} items, got {}",
        expected,
        list.len()
    );
}

/// Names of the records in a JSON list, in order
pub fn names(list: &Value) -> Vec<&str> {
    list.as_array()
        .map(|items| items.iter().filter_map(|item| item["name"].as_str()).collect())
        .unwrap_or_default()
}
