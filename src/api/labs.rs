//! Lab endpoints: apparatus and apparatus borrows

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        apparatus::{Apparatus, CreateApparatus, UpdateApparatus},
        loan::{ApparatusLoanView, CreateLoan, LoanQuery, ReturnLoan},
    },
    AppState,
};

use super::{success, ApiPath, ApiQuery, JsonOrDefault, MessageBody, Success, ValidatedJson};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ApparatusQuery {
    pub category: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ApparatusListResponse {
    pub apparatus: Vec<Apparatus>,
    pub count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct ApparatusResponse {
    pub apparatus: Apparatus,
}

#[derive(Serialize, ToSchema)]
pub struct LabBorrowListResponse {
    pub borrows: Vec<ApparatusLoanView>,
    pub count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct LabBorrowResponse {
    pub borrow: ApparatusLoanView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// List apparatus
#[utoipa::path(
    get,
    path = "/labs/apparatus",
    tag = "labs",
    params(ApparatusQuery),
    responses((status = 200, description = "Apparatus by category and name", body = ApparatusListResponse))
)]
pub async fn list_apparatus(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ApparatusQuery>,
) -> AppResult<Json<Success<ApparatusListResponse>>> {
    let apparatus = state.services.catalog.list_apparatus(query.category.as_deref()).await?;
    Ok(success(ApparatusListResponse {
        count: apparatus.len(),
        apparatus,
    }))
}

/// Add apparatus
#[utoipa::path(
    post,
    path = "/labs/apparatus",
    tag = "labs",
    request_body = CreateApparatus,
    responses(
        (status = 201, description = "Apparatus created", body = ApparatusResponse),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_apparatus(
    State(state): State<AppState>,
    ValidatedJson(data): ValidatedJson<CreateApparatus>,
) -> AppResult<(StatusCode, Json<Success<ApparatusResponse>>)> {
    let apparatus = state.services.catalog.create_apparatus(data).await?;
    Ok((StatusCode::CREATED, success(ApparatusResponse { apparatus })))
}

#[utoipa::path(
    get,
    path = "/labs/apparatus/{id}",
    tag = "labs",
    params(("id" = i32, Path, description = "Apparatus ID")),
    responses(
        (status = 200, description = "Apparatus", body = ApparatusResponse),
        (status = 404, description = "Apparatus not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_apparatus(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Success<ApparatusResponse>>> {
    let apparatus = state.services.catalog.get_apparatus(id).await?;
    Ok(success(ApparatusResponse { apparatus }))
}

#[utoipa::path(
    put,
    path = "/labs/apparatus/{id}",
    tag = "labs",
    params(("id" = i32, Path, description = "Apparatus ID")),
    request_body = UpdateApparatus,
    responses(
        (status = 200, description = "Apparatus updated", body = ApparatusResponse),
        (status = 404, description = "Apparatus not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Total below units on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_apparatus(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    ValidatedJson(data): ValidatedJson<UpdateApparatus>,
) -> AppResult<Json<Success<ApparatusResponse>>> {
    let apparatus = state.services.catalog.update_apparatus(id, data).await?;
    Ok(success(ApparatusResponse { apparatus }))
}

#[utoipa::path(
    delete,
    path = "/labs/apparatus/{id}",
    tag = "labs",
    params(("id" = i32, Path, description = "Apparatus ID")),
    responses(
        (status = 200, description = "Apparatus deleted", body = MessageBody),
        (status = 404, description = "Apparatus not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Apparatus has borrow history", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_apparatus(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Success<MessageBody>>> {
    state.services.catalog.delete_apparatus(id).await?;
    Ok(success(MessageBody {
        message: "Apparatus deleted".to_string(),
    }))
}

/// List apparatus borrows
#[utoipa::path(
    get,
    path = "/labs/borrows",
    tag = "labs",
    params(LoanQuery),
    responses(
        (status = 200, description = "Borrows, newest first", body = LabBorrowListResponse),
        (status = 400, description = "Unknown status filter", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_borrows(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LoanQuery>,
) -> AppResult<Json<Success<LabBorrowListResponse>>> {
    let borrows = state.services.apparatus_loans.list(&query).await?;
    Ok(success(LabBorrowListResponse {
        count: borrows.len(),
        borrows,
    }))
}

#[utoipa::path(
    get,
    path = "/labs/borrows/{id}",
    tag = "labs",
    params(("id" = i32, Path, description = "Borrow ID")),
    responses(
        (status = 200, description = "Borrow", body = LabBorrowResponse),
        (status = 404, description = "Borrow not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_borrow(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Success<LabBorrowResponse>>> {
    let borrow = state.services.apparatus_loans.get(id).await?;
    Ok(success(LabBorrowResponse { borrow, message: None }))
}

/// Borrow one unit of apparatus
#[utoipa::path(
    post,
    path = "/labs/borrow",
    tag = "labs",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Apparatus borrowed", body = LabBorrowResponse),
        (status = 400, description = "No student given", body = crate::error::ErrorResponse),
        (status = 403, description = "Student account is inactive", body = crate::error::ErrorResponse),
        (status = 404, description = "Student or apparatus not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No units available", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_apparatus(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateLoan>,
) -> AppResult<(StatusCode, Json<Success<LabBorrowResponse>>)> {
    let borrow = state.services.apparatus_loans.borrow(&request).await?;
    Ok((
        StatusCode::CREATED,
        success(LabBorrowResponse {
            borrow,
            message: Some("Apparatus borrowed successfully".to_string()),
        }),
    ))
}

/// Return apparatus; a damaged return charges the apparatus damage fine
#[utoipa::path(
    put,
    path = "/labs/borrows/{id}/return",
    tag = "labs",
    params(("id" = i32, Path, description = "Borrow ID")),
    request_body(content = ReturnLoan, description = "Optional body"),
    responses(
        (status = 200, description = "Apparatus returned", body = LabBorrowResponse),
        (status = 403, description = "Already returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrow not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_borrow(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
    JsonOrDefault(request): JsonOrDefault<ReturnLoan>,
) -> AppResult<Json<Success<LabBorrowResponse>>> {
    let borrow = state.services.apparatus_loans.return_loan(id, &request).await?;
    let message = if borrow.is_damaged {
        format!("Apparatus returned damaged, fine {}", borrow.damage_fine)
    } else {
        "Apparatus returned".to_string()
    };
    Ok(success(LabBorrowResponse {
        borrow,
        message: Some(message),
    }))
}

/// Pay the damage fine of an apparatus borrow
#[utoipa::path(
    post,
    path = "/labs/fines/{id}/pay",
    tag = "labs",
    params(("id" = i32, Path, description = "Borrow ID")),
    responses(
        (status = 200, description = "Fine paid", body = LabBorrowResponse),
        (status = 403, description = "Already paid or nothing to pay", body = crate::error::ErrorResponse),
        (status = 404, description = "Borrow not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn pay_fine(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Success<LabBorrowResponse>>> {
    let borrow = state.services.apparatus_loans.pay_fine(id).await?;
    Ok(success(LabBorrowResponse {
        borrow,
        message: Some("Fine paid".to_string()),
    }))
}
