//! Sample catalog used for local development (`storage.seed: true`)

use crate::core::DataService;
use crate::entities::{Author, Book};
use anyhow::Result;

/// (name, age) of each sample author
const AUTHORS: &[(&str, i32)] = &[("Ada Wilde", 44), ("Cyril Town", 42), ("Vera Nova", 66)];

/// (name, genre, index into `AUTHORS`) of each sample book
const BOOKS: &[(&str, &str, usize)] = &[
    ("books of the wild", "fiction", 0),
    ("books of the city", "fact", 1),
    ("books of the galaxy", "sci-fi", 2),
    ("more books of the wild", "fiction", 0),
];

/// Insert the sample authors and books through the given services.
///
/// Ids are generated like any other insert; books reference the ids the
/// author service returned. Returns the number of records inserted.
pub async fn seed_catalog(
    books: &dyn DataService<Book>,
    authors: &dyn DataService<Author>,
) -> Result<usize> {
    let mut author_ids = Vec::with_capacity(AUTHORS.len());
    for (name, age) in AUTHORS {
        let created = authors.create(Author::new(*name, *age)).await?;
        author_ids.push(created.id);
    }

    for (name, genre, author) in BOOKS {
        books
            .create(Book::new(*name, *genre, author_ids[*author].clone()))
            .await?;
    }

    let inserted = AUTHORS.len() + BOOKS.len();
    tracing::info!(inserted, "seeded sample catalog");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryDataService;

    #[tokio::test]
    async fn test_seed_links_books_to_authors() {
        let books = InMemoryDataService::<Book>::new();
        let authors = InMemoryDataService::<Author>::new();

        let inserted = seed_catalog(&books, &authors).await.unwrap();
        assert_eq!(inserted, 7);

        let all_authors = authors.list().await.unwrap();
        assert_eq!(all_authors.len(), 3);

        for book in books.list().await.unwrap() {
            let author = authors.get(&book.author_id).await.unwrap();
            assert!(author.is_some(), "seeded book {} has no author", book.name);
        }

        let wild = books
            .search("authorID", &all_authors[0].id)
            .await
            .unwrap();
        assert_eq!(wild.len(), 2);
    }
}
