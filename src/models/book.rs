//! Book catalog model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    /// Loans of this book cannot be extended
    pub is_important: bool,
    pub created_at: DateTime<Utc>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    #[validate(length(max = 100, message = "author is too long"))]
    pub author: Option<String>,
    #[validate(length(min = 1, max = 20, message = "isbn must be 1-20 characters"))]
    pub isbn: Option<String>,
    #[validate(range(min = 1, message = "total_copies must be at least 1"))]
    pub total_copies: Option<i32>,
    pub is_important: Option<bool>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 200, message = "title must not be empty"))]
    pub title: Option<String>,
    pub author: Option<String>,
    #[validate(length(min = 1, max = 20, message = "isbn must be 1-20 characters"))]
    pub isbn: Option<String>,
    #[validate(range(min = 1, message = "total_copies must be at least 1"))]
    pub total_copies: Option<i32>,
    pub is_important: Option<bool>,
}
