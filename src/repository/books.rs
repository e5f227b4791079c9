//! Books repository

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List books, optionally filtered by title, author or ISBN
    pub async fn list(&self, search: Option<&str>) -> AppResult<Vec<Book>> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.to_lowercase()));

        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE $1::text IS NULL
               OR LOWER(title) LIKE $1
               OR LOWER(COALESCE(author, '')) LIKE $1
               OR LOWER(COALESCE(isbn, '')) LIKE $1
            ORDER BY title, id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Check if an ISBN is used by another book
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::int IS NULL OR id != $2))",
        )
        .bind(isbn)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a book with every copy on the shelf
    pub async fn create(&self, data: &CreateBook) -> AppResult<Book> {
        let total = data.total_copies.unwrap_or(1);
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, total_copies, available_copies, is_important)
            VALUES ($1, $2, $3, $4, $4, $5)
            RETURNING *
            "#,
        )
        .bind(data.title.trim())
        .bind(&data.author)
        .bind(&data.isbn)
        .bind(total)
        .bind(data.is_important.unwrap_or(false))
        .fetch_one(&self.pool)
        .await?;
        Ok(book)
    }

    /// Update a book; a new total shifts the available count by the same delta
    pub async fn update(&self, id: i32, data: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let available = match data.total_copies {
            Some(total) => {
                let available = current.available_copies + (total - current.total_copies);
                if available < 0 {
                    return Err(AppError::Conflict(format!(
                        "Cannot set total_copies to {}: {} copies are on loan",
                        total,
                        current.total_copies - current.available_copies
                    )));
                }
                Some(available)
            }
            None => None,
        };

        // $1 is the id
        let mut sets: Vec<String> = Vec::new();

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, sets.len() + 2));
                }
            };
        }

        add_field!(data.title, "title");
        add_field!(data.author, "author");
        add_field!(data.isbn, "isbn");
        add_field!(data.total_copies, "total_copies");
        add_field!(available, "available_copies");
        add_field!(data.is_important, "is_important");

        if sets.is_empty() {
            return Ok(current);
        }

        let query = format!("UPDATE books SET {} WHERE id = $1 RETURNING *", sets.join(", "));
        let mut builder = sqlx::query_as::<_, Book>(&query).bind(id);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(data.title);
        bind_field!(data.author);
        bind_field!(data.isbn);
        bind_field!(data.total_copies);
        bind_field!(available);
        bind_field!(data.is_important);

        let book = builder.fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(book)
    }

    /// Delete a book that was never lent
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let has_loans: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM book_loans WHERE item_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        if has_loans {
            return Err(AppError::Conflict(
                "Book has borrow history and cannot be deleted".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }
}
