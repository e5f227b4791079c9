//! Library endpoints: books and book borrows

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        book::{Book, CreateBook, UpdateBook},
        loan::{BookLoanView, CreateLoan, LoanQuery, ReturnLoan},
    },
    AppState,
};

use super::{success, ApiPath, ApiQuery, JsonOrDefault, MessageBody, Success, ValidatedJson};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive match on title, author or ISBN
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct BookListResponse {
    pub books: Vec<Book>,
    pub count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct BookResponse {
    pub book: Book,
}

#[derive(Serialize, ToSchema)]
pub struct BorrowListResponse {
    pub borrows: Vec<BookLoanView>,
    pub count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub borrow: BookLoanView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BorrowResponse {
    fn new(borrow: BookLoanView, message: &str) -> Self {
        Self {
            borrow,
            message: Some(message.to_string()),
        }
    }
}

/// List books
#[utoipa::path(
    get,
    path = "/library/books",
    tag = "library",
    params(BookQuery),
    responses((status = 200, description = "Books ordered by title", body = BookListResponse))
)]
pub async fn list_books(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BookQuery>,
) -> AppResult<Json<Success<BookListResponse>>> {
    let books = state.services.catalog.list_books(query.search.as_deref()).await?;
    Ok(success(BookListResponse {
        count: books.len(),
        books,
    }))
}

/// Add a book; every copy starts on the shelf
#[utoipa::path(
    post,
    path = "/library/books",
    tag = "library",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = BookResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "ISBN already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    ValidatedJson(data): ValidatedJson<CreateBook>,
) -> AppResult<(StatusCode, Json<Success<BookResponse>>)> {
    let book = state.services.catalog.create_book(data).await?;
    Ok((StatusCode::CREATED, success(BookResponse { book })))
}

/// Get a book
#[utoipa::path(
    get,
    path = "/library/books/{id}",
    tag = "library",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book", body = BookResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Success<BookResponse>>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(success(BookResponse { book }))
}

/// Update a book; changing total_copies shifts available_copies by the same amount
#[utoipa::path(
    put,
    path = "/library/books/{id}",
    tag = "library",
    params(("id" = i32, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Total below copies on loan, or ISBN in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(data): ValidatedJson<UpdateBook>,
) -> AppResult<Json<Success<BookResponse>>> {
    let book = state.services.catalog.update_book(id, data).await?;
    Ok(success(BookResponse { book }))
}

/// Delete a book that was never borrowed
#[utoipa::path(
    delete,
    path = "/library/books/{id}",
    tag = "library",
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted", body = MessageBody),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book has borrow history", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Success<MessageBody>>> {
    state.services.catalog.delete_book(id).await?;
    Ok(success(MessageBody {
        message: "Book deleted".to_string(),
    }))
}

/// List book borrows
#[utoipa::path(
    get,
    path = "/library/borrows",
    tag = "library",
    params(LoanQuery),
    responses(
        (status = 200, description = "Borrows, newest first", body = BorrowListResponse),
        (status = 400, description = "Unknown status filter", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_borrows(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LoanQuery>,
) -> AppResult<Json<Success<BorrowListResponse>>> {
    let borrows = state.services.book_loans.list(&query).await?;
    Ok(success(BorrowListResponse {
        count: borrows.len(),
        borrows,
    }))
}

/// Get a book borrow with its fine evaluated now
#[utoipa::path(
    get,
    path = "/library/borrows/{id}",
    tag = "library",
    params(("id" = i32, Path, description = "Borrow ID")),
    responses(
        (status = 200, description = "Borrow", body = BorrowResponse),
        (status = 404, description = "Borrow not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_borrow(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Success<BorrowResponse>>> {
    let borrow = state.services.book_loans.get(id).await?;
    Ok(success(BorrowResponse { borrow, message: None }))
}

/// Borrow a book for a student given by id or badge
#[utoipa::path(
    post,
    path = "/library/borrow",
    tag = "library",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowResponse),
        (status = 400, description = "No student given", body = crate::error::ErrorResponse),
        (status = 403, description = "Student account is inactive", body = crate::error::ErrorResponse),
        (status = 404, description = "Student or book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No copies available, or already borrowed by the student", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateLoan>,
) -> AppResult<(StatusCode, Json<Success<BorrowResponse>>)> {
    let borrow = state.services.book_loans.borrow(&request).await?;
    Ok((
        StatusCode::CREATED,
        success(BorrowResponse::new(borrow, "Book borrowed successfully")),
    ))
}

/// Extend a book borrow
#[utoipa::path(
    put,
    path = "/library/borrows/{id}/extend",
    tag = "library",
    params(("id" = i32, Path, description = "Borrow ID")),
    responses(
        (status = 200, description = "Due date extended", body = BorrowResponse),
        (status = 403, description = "Extension not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrow not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn extend_borrow(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Success<BorrowResponse>>> {
    let borrow = state.services.book_loans.extend(id).await?;
    Ok(success(BorrowResponse::new(borrow, "Due date extended")))
}

/// Return a book, at `as_of` when given
#[utoipa::path(
    put,
    path = "/library/borrows/{id}/return",
    tag = "library",
    params(("id" = i32, Path, description = "Borrow ID")),
    request_body(content = ReturnLoan, description = "Optional body"),
    responses(
        (status = 200, description = "Book returned, fine finalized", body = BorrowResponse),
        (status = 400, description = "Invalid as_of date", body = crate::error::ErrorResponse),
        (status = 403, description = "Already returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrow not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_borrow(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    JsonOrDefault(request): JsonOrDefault<ReturnLoan>,
) -> AppResult<Json<Success<BorrowResponse>>> {
    let borrow = state.services.book_loans.return_loan(id, &request).await?;
    Ok(success(BorrowResponse::new(borrow, "Book returned")))
}

/// Pay the fine of a book borrow
#[utoipa::path(
    post,
    path = "/library/fines/{id}/pay",
    tag = "library",
    params(("id" = i32, Path, description = "Borrow ID")),
    responses(
        (status = 200, description = "Fine paid", body = BorrowResponse),
        (status = 403, description = "Already paid or nothing to pay", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrow not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn pay_fine(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Success<BorrowResponse>>> {
    let borrow = state.services.book_loans.pay_fine(id).await?;
    Ok(success(BorrowResponse::new(borrow, "Fine paid")))
}
