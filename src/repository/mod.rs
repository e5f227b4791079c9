//! Repository layer for database operations

pub mod apparatus;
pub mod attendance;
pub mod books;
pub mod loans;
pub mod students;

use sqlx::{Pool, Postgres};

use crate::services::policy::{ApparatusKind, BookKind};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub students: students::StudentsRepository,
    pub attendance: attendance::AttendanceRepository,
    pub books: books::BooksRepository,
    pub apparatus: apparatus::ApparatusRepository,
    pub book_loans: loans::LoansRepository<BookKind>,
    pub apparatus_loans: loans::LoansRepository<ApparatusKind>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            students: students::StudentsRepository::new(pool.clone()),
            attendance: attendance::AttendanceRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            apparatus: apparatus::ApparatusRepository::new(pool.clone()),
            book_loans: loans::LoansRepository::new(pool.clone()),
            apparatus_loans: loans::LoansRepository::new(pool.clone()),
            pool,
        }
    }

    /// Check that the database answers
    pub async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
