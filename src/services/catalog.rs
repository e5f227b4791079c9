//! Book and apparatus catalog management

use crate::{
    error::{AppError, AppResult},
    models::{
        apparatus::{Apparatus, CreateApparatus, UpdateApparatus},
        book::{Book, CreateBook, UpdateBook},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_books(&self, search: Option<&str>) -> AppResult<Vec<Book>> {
        self.repository.books.list(search).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    pub async fn create_book(&self, mut data: CreateBook) -> AppResult<Book> {
        data.isbn = normalize_isbn(data.isbn);
        if let Some(ref isbn) = data.isbn {
            self.ensure_isbn_free(isbn, None).await?;
        }
        let book = self.repository.books.create(&data).await?;
        tracing::info!(book_id = book.id, title = %book.title, copies = book.total_copies, "Book added");
        Ok(book)
    }

    pub async fn update_book(&self, id: i32, mut data: UpdateBook) -> AppResult<Book> {
        data.isbn = normalize_isbn(data.isbn);
        if let Some(ref isbn) = data.isbn {
            self.ensure_isbn_free(isbn, Some(id)).await?;
        }
        self.repository.books.update(id, &data).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    pub async fn list_apparatus(&self, category: Option<&str>) -> AppResult<Vec<Apparatus>> {
        self.repository.apparatus.list(category).await
    }

    pub async fn get_apparatus(&self, id: i32) -> AppResult<Apparatus> {
        self.repository.apparatus.get_by_id(id).await
    }

    pub async fn create_apparatus(&self, data: CreateApparatus) -> AppResult<Apparatus> {
        let apparatus = self.repository.apparatus.create(&data).await?;
        tracing::info!(
            apparatus_id = apparatus.id,
            name = %apparatus.name,
            quantity = apparatus.total_quantity,
            "Apparatus added"
        );
        Ok(apparatus)
    }

    pub async fn update_apparatus(&self, id: i32, data: UpdateApparatus) -> AppResult<Apparatus> {
        self.repository.apparatus.update(id, &data).await
    }

    pub async fn delete_apparatus(&self, id: i32) -> AppResult<()> {
        self.repository.apparatus.delete(id).await?;
        tracing::info!(apparatus_id = id, "Apparatus deleted");
        Ok(())
    }

    async fn ensure_isbn_free(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<()> {
        if self.repository.books.isbn_exists(isbn, exclude_id).await? {
            return Err(AppError::Conflict(format!("ISBN {} already exists", isbn)));
        }
        Ok(())
    }
}

/// Strip separators from an ISBN; blank means none
fn normalize_isbn(isbn: Option<String>) -> Option<String> {
    isbn.map(|s| s.chars().filter(|c| !c.is_whitespace() && *c != '-').collect::<String>())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_isbn() {
        assert_eq!(
            normalize_isbn(Some("978-0-13-468599-1".into())),
            Some("9780134685991".to_string())
        );
        assert_eq!(normalize_isbn(Some(" - ".into())), None);
        assert_eq!(normalize_isbn(None), None);
    }
}
