//! Loan management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{today, CreateLoan, ExtendLoan, LoanDetails, LoanQuery, OverdueQuery},
};

/// List loans, optionally filtered by member, book or status
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    params(LoanQuery),
    responses(
        (status = 200, description = "List of loans", body = Vec<LoanDetails>)
    )
)]
pub async fn list_loans(
    State(state): State<crate::AppState>,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let today = today();
    let loans = state.services.loans.list_loans(&query, today).await?;
    Ok(Json(
        loans.into_iter().map(|loan| LoanDetails::new(loan, today)).collect(),
    ))
}

/// Get loan by ID
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(id).await?;
    Ok(Json(LoanDetails::new(loan, today())))
}

/// Lend a book to a member for the standard loan period
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = LoanDetails),
        (status = 400, description = "No copies available"),
        (status = 404, description = "Book or member not found")
    )
)]
pub async fn create_loan(
    State(state): State<crate::AppState>,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    let today = today();
    let loan = state.services.loans.create_loan(&request, today).await?;
    Ok((StatusCode::CREATED, Json(LoanDetails::new(loan, today))))
}

/// Push back the due date of a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/extend",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    request_body = ExtendLoan,
    responses(
        (status = 200, description = "Due date extended", body = LoanDetails),
        (status = 400, description = "Negative extension"),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Loan already returned")
    )
)]
pub async fn extend_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    Json(request): Json<ExtendLoan>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.extend_due_date(id, request.days).await?;
    Ok(Json(LoanDetails::new(loan, today())))
}

/// Mark a loan as returned today
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(("id" = i32, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan returned", body = LoanDetails),
        (status = 404, description = "Loan not found"),
        (status = 422, description = "Loan already returned")
    )
)]
pub async fn return_loan(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<LoanDetails>> {
    let today = today();
    let loan = state.services.loans.return_loan(id, today).await?;
    Ok(Json(LoanDetails::new(loan, today)))
}

/// Unreturned loans past their due date
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "loans",
    params(OverdueQuery),
    responses(
        (status = 200, description = "Overdue loans", body = Vec<LoanDetails>)
    )
)]
pub async fn list_overdue_loans(
    State(state): State<crate::AppState>,
    Query(query): Query<OverdueQuery>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let today = query.today.unwrap_or_else(today);
    let loans = state.services.loans.get_overdue_loans(today).await?;
    Ok(Json(
        loans.into_iter().map(|loan| LoanDetails::new(loan, today)).collect(),
    ))
}
