//! Catalog entities
//!
//! Two record types are stored, each in its own collection:
//! - [`Author`] in `authors`
//! - [`Book`] in `books`, referencing its author by id through `authorID`

pub mod author;
pub mod book;

pub use author::Author;
pub use book::Book;
