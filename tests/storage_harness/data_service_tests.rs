//! Macro-generated test suite for the `DataService<Book>` and
//! `DataService<Author>` contract.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod storage_harness;
//!
//! use storage_harness::*;
//! use bookshelf::storage::InMemoryDataService;
//!
//! data_service_tests!(
//!     InMemoryDataService::<Book>::new(),
//!     InMemoryDataService::<Author>::new()
//! );
//! ```
//!
//! # Generated Tests
//!
//! ## Create & Get
//! - `test_create_and_get_book`: create then retrieve, verify all fields
//! - `test_create_and_get_author`
//! - `test_get_nonexistent`: unknown id returns None
//! - `test_get_is_exact_match`: no prefix or case-insensitive matches
//! - `test_create_duplicate_id`: second insert with the same id fails
//!
//! ## List
//! - `test_list_empty`
//! - `test_list_insertion_order`
//!
//! ## Search
//! - `test_search_by_author_id`: the `Author.books` lookup
//! - `test_search_integer_field`: search authors by age
//! - `test_search_no_results`
//! - `test_search_unknown_field`
//!
//! ## Concurrency
//! - `test_concurrent_creates`: parallel creates from spawned tasks

/// Generate a full `DataService` conformance test suite.
///
/// `$books` and `$authors` must evaluate to services implementing
/// `DataService<Book>` and `DataService<Author>`. They are re-evaluated for
/// each test. For the concurrency test the book service must also be
/// `Clone + 'static` (shared state via Arc pattern).
#[macro_export]
macro_rules! data_service_tests {
    ($books:expr, $authors:expr) => {
        mod data_service_contract_tests {
            use super::*;
            use bookshelf::core::entity::{Data, Entity};
            use bookshelf::core::service::DataService;
            use bookshelf::entities::{Author, Book};

            // ==================================================================
            // Create & Get
            // ==================================================================

            #[tokio::test]
            async fn test_create_and_get_book() {
                let service = $books;
                let book = book_by("Dune", "sci-fi", "author-1");
                let original_id = book.id.clone();

                let created = service.create(book).await.unwrap();
                assert_eq!(created.id(), original_id);
                assert_eq!(created.name(), "Dune");
                assert_eq!(created.genre, "sci-fi");
                assert_eq!(created.author_id, "author-1");

                let retrieved = service.get(&original_id).await.unwrap();
                assert_eq!(retrieved, Some(created));
            }

            #[tokio::test]
            async fn test_create_and_get_author() {
                let service = $authors;
                let created = service.create(Author::new("Ann", 30)).await.unwrap();

                let retrieved = service.get(created.id()).await.unwrap().unwrap();
                assert_eq!(retrieved.name, "Ann");
                assert_eq!(retrieved.age, 30);
            }

            #[tokio::test]
            async fn test_get_nonexistent() {
                let service = $books;
                assert!(service.get("no-such-id").await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_get_is_exact_match() {
                let service = $books;
                service
                    .create(book_with_id("Book-1", "Dune", "a"))
                    .await
                    .unwrap();

                assert!(service.get("Book-1").await.unwrap().is_some());
                assert!(service.get("book-1").await.unwrap().is_none());
                assert!(service.get("Book").await.unwrap().is_none());
            }

            #[tokio::test]
            async fn test_create_duplicate_id() {
                let service = $books;
                service
                    .create(book_with_id("dup", "First", "a"))
                    .await
                    .unwrap();

                let second = service.create(book_with_id("dup", "Second", "a")).await;
                assert!(second.is_err(), "duplicate id must be rejected");

                let stored = service.get("dup").await.unwrap().unwrap();
                assert_eq!(stored.name, "First");
            }

            // ==================================================================
            // List
            // ==================================================================

            #[tokio::test]
            async fn test_list_empty() {
                let service = $authors;
                assert!(service.list().await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_list_insertion_order() {
                let service = $authors;
                for author in sample_authors(5) {
                    service.create(author).await.unwrap();
                }

                let listed = service.list().await.unwrap();
                assert_count(&listed, 5);
                let names: Vec<&str> = listed.iter().map(|a| a.name()).collect();
                assert_eq!(
                    names,
                    vec!["Author_0", "Author_1", "Author_2", "Author_3", "Author_4"]
                );
            }

            // ==================================================================
            // Search
            // ==================================================================

            #[tokio::test]
            async fn test_search_by_author_id() {
                let service = $books;
                service.create(book_by("First", "f", "a1")).await.unwrap();
                service.create(book_by("Other", "f", "a10")).await.unwrap();
                service.create(book_by("Second", "f", "a1")).await.unwrap();

                let found = service.search("authorID", "a1").await.unwrap();
                let names: Vec<&str> = found.iter().map(|b| b.name()).collect();
                assert_eq!(names, vec!["First", "Second"]);
            }

            #[tokio::test]
            async fn test_search_integer_field() {
                let service = $authors;
                for author in sample_authors(3) {
                    service.create(author).await.unwrap();
                }

                let found = service.search("age", "31").await.unwrap();
                assert_count(&found, 1);
                assert_eq!(found[0].name, "Author_1");
            }

            #[tokio::test]
            async fn test_search_no_results() {
                let service = $books;
                service.create(book_by("Dune", "sci-fi", "a1")).await.unwrap();
                assert!(service.search("genre", "poetry").await.unwrap().is_empty());
            }

            #[tokio::test]
            async fn test_search_unknown_field() {
                let service = $books;
                service.create(book_by("Dune", "sci-fi", "a1")).await.unwrap();
                assert!(service.search("isbn", "a1").await.unwrap().is_empty());
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            #[tokio::test]
            async fn test_concurrent_creates() {
                let service = $books;

                let mut handles = Vec::new();
                for i in 0..20 {
                    let service = service.clone();
                    handles.push(tokio::spawn(async move {
                        service
                            .create(book_by(&format!("Book_{}", i), "f", "a1"))
                            .await
                            .unwrap()
                    }));
                }

                let mut ids = std::collections::HashSet::new();
                for handle in handles {
                    ids.insert(handle.await.unwrap().id);
                }

                assert_eq!(ids.len(), 20, "ids must be distinct");
                assert_count(&service.list().await.unwrap(), 20);
            }
        }
    };
}
