//! Macro-generated end-to-end suite for the catalog GraphQL endpoint.
//!
//! Each test builds a full router through `ServerBuilder` on top of the
//! supplied book and author services and drives it with `axum_test`.
//!
//! # Usage
//!
//! ```rust,ignore
//! graphql_integration_tests!(
//!     InMemoryDataService::<Book>::new(),
//!     InMemoryDataService::<Author>::new()
//! );
//! ```

/// Generate the catalog GraphQL integration suite.
///
/// `$books` and `$authors` must evaluate to services implementing
/// `DataService<Book>` and `DataService<Author>`. They are re-evaluated for
/// each test so every test starts from empty collections.
#[macro_export]
macro_rules! graphql_integration_tests {
    ($books:expr, $authors:expr) => {
        mod graphql_integration {
            use super::*;
            use axum_test::TestServer;
            use bookshelf::server::ServerBuilder;
            use bookshelf::server::exposure::graphql::GraphQLExecutor;
            use serde_json::json;
            use std::sync::Arc;

            async fn test_server() -> TestServer {
                let app = ServerBuilder::new()
                    .with_book_service($books)
                    .with_author_service($authors)
                    .build()
                    .unwrap();
                TestServer::try_new(app).unwrap()
            }

            // ==================================================================
            // Mutations & root queries
            // ==================================================================

            #[tokio::test]
            async fn test_add_author_then_list() {
                let server = test_server().await;

                let body = graphql(
                    &server,
                    r#"mutation { addAuthor(name: "Ann", age: 30) { id name age } }"#,
                )
                .await;
                assert_no_errors(&body);
                let created = &body["data"]["addAuthor"];
                assert_eq!(created["name"], "Ann");
                assert_eq!(created["age"], 30);
                assert!(!created["id"].as_str().unwrap().is_empty());

                let body = graphql(&server, "{ authors { id name age } }").await;
                assert_no_errors(&body);
                assert_eq!(body["data"]["authors"], json!([created.clone()]));
            }

            #[tokio::test]
            async fn test_empty_catalog_lists() {
                let server = test_server().await;
                let body = graphql(&server, "{ books { id } authors { id } }").await;
                assert_eq!(body, json!({"data": {"books": [], "authors": []}}));
            }

            #[tokio::test]
            async fn test_book_by_id() {
                let server = test_server().await;
                let author = add_author(&server, "Ann", 30).await;
                let id = add_book(&server, "Dune", "sci-fi", &author).await;

                let body = graphql_with_variables(
                    &server,
                    "query($id: ID) { book(id: $id) { id name genre } }",
                    json!({"id": id}),
                )
                .await;
                assert_no_errors(&body);
                assert_eq!(
                    body["data"]["book"],
                    json!({"id": id, "name": "Dune", "genre": "sci-fi"})
                );
            }

            #[tokio::test]
            async fn test_unknown_ids_resolve_to_null() {
                let server = test_server().await;
                let body = graphql(
                    &server,
                    r#"{ book(id: "missing") { id } author(id: "missing") { id } }"#,
                )
                .await;
                assert_eq!(body, json!({"data": {"book": null, "author": null}}));
            }

            #[tokio::test]
            async fn test_add_book_echoes_author() {
                let server = test_server().await;
                let author = add_author(&server, "Ann", 30).await;

                let body = graphql_with_variables(
                    &server,
                    "mutation($a: ID!) {
                        addBook(name: \"Dune\", genre: \"sci-fi\", authorID: $a) {
                            name authorID { id name }
                        }
                    }",
                    json!({"a": author}),
                )
                .await;
                assert_no_errors(&body);
                assert_eq!(
                    body["data"]["addBook"],
                    json!({"name": "Dune", "authorID": {"id": author, "name": "Ann"}})
                );
            }

            #[tokio::test]
            async fn test_add_book_with_unknown_author() {
                let server = test_server().await;

                let body = graphql(
                    &server,
                    r#"mutation {
                        addBook(name: "Orphan", genre: "misc", authorID: "nobody") {
                            name authorID { id }
                        }
                    }"#,
                )
                .await;
                assert_no_errors(&body);
                assert_eq!(
                    body["data"]["addBook"],
                    json!({"name": "Orphan", "authorID": null})
                );

                // the dangling book is still stored
                let body = graphql(&server, "{ books { name } }").await;
                assert_eq!(names(&body["data"]["books"]), vec!["Orphan"]);
            }

            // ==================================================================
            // Cross-type resolution
            // ==================================================================

            #[tokio::test]
            async fn test_author_books_in_insertion_order() {
                let server = test_server().await;
                let ann = add_author(&server, "Ann", 30).await;
                let bob = add_author(&server, "Bob", 41).await;
                add_book(&server, "First", "f", &ann).await;
                add_book(&server, "Elsewhere", "f", &bob).await;
                add_book(&server, "Second", "f", &ann).await;
                add_book(&server, "Third", "f", &ann).await;

                let body = graphql_with_variables(
                    &server,
                    "query($id: ID) { author(id: $id) { name books { name } } }",
                    json!({"id": ann}),
                )
                .await;
                assert_no_errors(&body);
                assert_eq!(
                    names(&body["data"]["author"]["books"]),
                    vec!["First", "Second", "Third"]
                );
            }

            #[tokio::test]
            async fn test_author_without_books() {
                let server = test_server().await;
                add_author(&server, "Ann", 30).await;

                let body = graphql(&server, "{ authors { books { id } } }").await;
                assert_eq!(body, json!({"data": {"authors": [{"books": []}]}}));
            }

            #[tokio::test]
            async fn test_cross_references_agree() {
                let server = test_server().await;
                let ann = add_author(&server, "Ann", 30).await;
                let bob = add_author(&server, "Bob", 41).await;
                add_book(&server, "Dune", "sci-fi", &ann).await;
                add_book(&server, "Emma", "novel", &bob).await;

                let body = graphql(
                    &server,
                    "{
                        books { id authorID { id } }
                        authors { id books { id authorID { id } } }
                    }",
                )
                .await;
                assert_no_errors(&body);

                // every book listed under an author points back at that author
                for author in body["data"]["authors"].as_array().unwrap() {
                    for book in author["books"].as_array().unwrap() {
                        assert_eq!(book["authorID"]["id"], author["id"]);
                    }
                }

                // every book appears under the author it points at
                for book in body["data"]["books"].as_array().unwrap() {
                    let owner = body["data"]["authors"]
                        .as_array()
                        .unwrap()
                        .iter()
                        .find(|a| a["id"] == book["authorID"]["id"])
                        .unwrap();
                    let listed: Vec<_> = owner["books"]
                        .as_array()
                        .unwrap()
                        .iter()
                        .map(|b| b["id"].clone())
                        .collect();
                    assert!(listed.contains(&book["id"]));
                }
            }

            #[tokio::test]
            async fn test_deep_nesting() {
                let server = test_server().await;
                let ann = add_author(&server, "Ann", 30).await;
                add_book(&server, "Dune", "sci-fi", &ann).await;

                let body = graphql(
                    &server,
                    "{ books { authorID { books { authorID { name } } } } }",
                )
                .await;
                assert_no_errors(&body);
                assert_eq!(
                    body["data"]["books"][0]["authorID"]["books"][0]["authorID"]["name"],
                    "Ann"
                );
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            #[tokio::test]
            async fn test_concurrent_add_book() {
                let mut builder = ServerBuilder::new()
                    .with_book_service($books)
                    .with_author_service($authors);
                let executor = Arc::new(GraphQLExecutor::new(Arc::new(
                    builder.build_host().unwrap(),
                )));

                let mut handles = Vec::new();
                for i in 0..16 {
                    let executor = executor.clone();
                    handles.push(tokio::spawn(async move {
                        let query = format!(
                            r#"mutation {{ addBook(name: "Book_{}", genre: "g", authorID: "a") {{ id }} }}"#,
                            i
                        );
                        executor.execute(&query, None, None).await
                    }));
                }

                let mut ids = std::collections::HashSet::new();
                for handle in handles {
                    let response = handle.await.unwrap();
                    assert!(response.is_ok(), "{:?}", response.errors);
                    let data = response.data.unwrap();
                    ids.insert(data["addBook"]["id"].as_str().unwrap().to_string());
                }
                assert_eq!(ids.len(), 16);

                let response = executor.execute("{ books { id } }", None, None).await;
                let listed = response.data.unwrap()["books"].as_array().unwrap().len();
                assert_eq!(listed, 16, "no write may be lost");
            }
        }
    };
}
