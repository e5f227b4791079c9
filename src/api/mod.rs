//! API handlers for the campus access REST endpoints

pub mod attendance;
pub mod dashboard;
pub mod health;
pub mod labs;
pub mod library;
pub mod openapi;
pub mod scan;
pub mod students;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request},
    routing::{get, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use validator::Validate;

use crate::{error::AppError, AppState};

/// JSON body deserialized and then checked with `validator`
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Optional JSON body: an empty body yields `T::default()`
pub struct JsonOrDefault<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonOrDefault<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonOrDefault(T::default()));
        }
        serde_json::from_slice(&bytes)
            .map(JsonOrDefault)
            .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))
    }
}

/// Path parameters with JSON error responses
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string with JSON error responses
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Successful response: the payload fields next to `"success": true`
#[derive(Serialize)]
pub struct Success<T: Serialize> {
    success: bool,
    #[serde(flatten)]
    payload: T,
}

/// Wrap a payload into a success response
pub fn success<T: Serialize>(payload: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        payload,
    })
}

/// Payload carrying only a message
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageBody {
    pub message: String,
}

/// Build the application router with every route under `/api`
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Scanner
        .route("/scan", post(scan::scan))
        .route("/scan/latest", get(scan::latest_scan))
        // Students
        .route("/students", get(students::list_students).post(students::register_student))
        .route(
            "/students/:id",
            get(students::get_student)
                .put(students::update_student)
                .delete(students::delete_student),
        )
        .route("/students/:id/borrows", get(students::student_borrows))
        // Attendance
        .route("/attendance", get(attendance::list_attendance))
        .route("/attendance/today", get(attendance::today_attendance))
        .route("/attendance/:id/zone", put(attendance::update_zone))
        .route("/dashboard/stats", get(dashboard::stats))
        // Library
        .route("/library/books", get(library::list_books).post(library::create_book))
        .route(
            "/library/books/:id",
            get(library::get_book)
                .put(library::update_book)
                .delete(library::delete_book),
        )
        .route("/library/borrows", get(library::list_borrows))
        .route("/library/borrows/:id", get(library::get_borrow))
        .route("/library/borrows/:id/extend", put(library::extend_borrow))
        .route("/library/borrows/:id/return", put(library::return_borrow))
        .route("/library/borrow", post(library::borrow_book))
        .route("/library/fines/:id/pay", post(library::pay_fine))
        .route("/borrow", post(library::borrow_book))
        .route("/borrow/:id", get(library::get_borrow))
        .route("/borrow/:id/extend", put(library::extend_borrow))
        .route("/borrow/:id/return", put(library::return_borrow))
        .route("/fines/:id/pay", post(library::pay_fine))
        // Labs
        .route("/labs/apparatus", get(labs::list_apparatus).post(labs::create_apparatus))
        .route(
            "/labs/apparatus/:id",
            get(labs::get_apparatus)
                .put(labs::update_apparatus)
                .delete(labs::delete_apparatus),
        )
        .route("/labs/borrows", get(labs::list_borrows))
        .route("/labs/borrows/:id", get(labs::get_borrow))
        .route("/labs/borrows/:id/return", put(labs::return_borrow))
        .route("/labs/borrow", post(labs::borrow_apparatus))
        .route("/labs/fines/:id/pay", post(labs::pay_fine));

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
