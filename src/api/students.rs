//! Student management endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        loan::{ApparatusLoanView, BookLoanView},
        student::{CreateStudent, Registration, Student, StudentQuery, UpdateStudent},
    },
    AppState,
};

use super::{success, ApiPath, ApiQuery, MessageBody, Success, ValidatedJson};

#[derive(Serialize, ToSchema)]
pub struct StudentListResponse {
    pub students: Vec<Student>,
    pub count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct StudentResponse {
    pub student: Student,
    /// Set when a placeholder was completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StudentResponse {
    fn plain(student: Student) -> Self {
        Self {
            student,
            merged: None,
            message: None,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct StudentBorrowsResponse {
    pub book_borrows: Vec<BookLoanView>,
    pub apparatus_borrows: Vec<ApparatusLoanView>,
}

/// List students
#[utoipa::path(
    get,
    path = "/students",
    tag = "students",
    params(StudentQuery),
    responses(
        (status = 200, description = "Students ordered by name", body = StudentListResponse)
    )
)]
pub async fn list_students(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StudentQuery>,
) -> AppResult<Json<Success<StudentListResponse>>> {
    let students = state.services.students.list(&query).await?;
    Ok(success(StudentListResponse {
        count: students.len(),
        students,
    }))
}

/// Register a student, completing the auto-registered record of the same badge if any
#[utoipa::path(
    post,
    path = "/students",
    tag = "students",
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student created", body = StudentResponse),
        (status = 200, description = "Merged with auto-registered record", body = StudentResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "RFID UID or roll number already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_student(
    State(state): State<AppState>,
    ValidatedJson(data): ValidatedJson<CreateStudent>,
) -> AppResult<(StatusCode, Json<Success<StudentResponse>>)> {
    let response = match state.services.students.register(data).await? {
        Registration::Created(student) => (StatusCode::CREATED, success(StudentResponse::plain(student))),
        Registration::Merged(student) => (
            StatusCode::OK,
            success(StudentResponse {
                student,
                merged: Some(true),
                message: Some("Merged with auto-registered record".to_string()),
            }),
        ),
    };
    Ok(response)
}

/// Get a student
#[utoipa::path(
    get,
    path = "/students/{id}",
    tag = "students",
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student", body = StudentResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Success<StudentResponse>>> {
    let student = state.services.students.get(id).await?;
    Ok(success(StudentResponse::plain(student)))
}

/// Update a student
#[utoipa::path(
    put,
    path = "/students/{id}",
    tag = "students",
    params(("id" = i32, Path, description = "Student ID")),
    request_body = UpdateStudent,
    responses(
        (status = 200, description = "Student updated", body = StudentResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse),
        (status = 409, description = "RFID UID or roll number in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(data): ValidatedJson<UpdateStudent>,
) -> AppResult<Json<Success<StudentResponse>>> {
    let student = state.services.students.update(id, data).await?;
    Ok(success(StudentResponse::plain(student)))
}

/// Delete a student with its attendance and borrow history
#[utoipa::path(
    delete,
    path = "/students/{id}",
    tag = "students",
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student deleted", body = MessageBody),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_student(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Success<MessageBody>>> {
    state.services.students.delete(id).await?;
    Ok(success(MessageBody {
        message: "Student deleted".to_string(),
    }))
}

/// Book and apparatus borrows of a student
#[utoipa::path(
    get,
    path = "/students/{id}/borrows",
    tag = "students",
    params(("id" = i32, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Borrows, newest first", body = StudentBorrowsResponse),
        (status = 404, description = "Student not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn student_borrows(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Success<StudentBorrowsResponse>>> {
    state.services.students.get(id).await?;
    let book_borrows = state.services.book_loans.for_student(id).await?;
    let apparatus_borrows = state.services.apparatus_loans.for_student(id).await?;
    Ok(success(StudentBorrowsResponse {
        book_borrows,
        apparatus_borrows,
    }))
}
