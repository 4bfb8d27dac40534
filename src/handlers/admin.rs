use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::bookings::{booking_response, BookingResponse};
use crate::handlers::courts::{court_response, CourtResponse};
use crate::models::Court;
use crate::services::sweeper;
use crate::services::verification::{self, VerifyDecision};
use crate::state::AppState;

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let limit = query.limit.unwrap_or(50);
    let status_filter = query.status.as_deref();

    let rows = {
        let db = state.db.lock().unwrap();
        auth::require_admin(&db, &headers)?;
        queries::get_all_bookings(&db, status_filter, limit)?
    };

    Ok(Json(
        rows.into_iter()
            .map(|r| booking_response(r.booking, Some(r.court_name), r.court_description))
            .collect(),
    ))
}

// GET /api/admin/payments
#[derive(Deserialize)]
pub struct PaymentsQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct AdminPaymentResponse {
    pub id: String,
    pub booking_id: String,
    pub reference_code: String,
    pub court_name: String,
    pub amount: i64,
    pub method: String,
    pub transaction_reference: Option<String>,
    pub status: String,
    pub paid_at: Option<String>,
    pub created_at: String,
}

pub async fn get_payments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PaymentsQuery>,
) -> Result<Json<Vec<AdminPaymentResponse>>, AppError> {
    let limit = query.limit.unwrap_or(50);

    let rows = {
        let db = state.db.lock().unwrap();
        auth::require_admin(&db, &headers)?;
        queries::get_all_payments(&db, limit)?
    };

    let response: Vec<AdminPaymentResponse> = rows
        .into_iter()
        .map(|r| AdminPaymentResponse {
            id: r.payment.id,
            booking_id: r.payment.booking_id,
            reference_code: r.reference_code,
            court_name: r.court_name,
            amount: r.payment.amount,
            method: r.payment.method,
            transaction_reference: r.payment.transaction_reference,
            status: r.payment.status.as_str().to_string(),
            paid_at: r
                .payment
                .paid_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
            created_at: r.payment.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();

    Ok(Json(response))
}

// POST /api/admin/bookings/:id/verify
#[derive(Deserialize)]
pub struct VerifyRequest {
    pub status: String,
    pub payment_id: String,
}

pub async fn verify_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let decision = VerifyDecision::parse(&body.status).ok_or_else(|| {
        AppError::Validation(format!(
            "invalid target status: {} (expected 'paid' or 'cancelled')",
            body.status
        ))
    })?;

    {
        let mut db = state.db.lock().unwrap();
        auth::require_admin(&db, &headers)?;
        verification::verify_booking(&mut db, &id, &body.payment_id, decision)?;
    }

    Ok(Json(serde_json::json!({ "ok": true, "status": body.status })))
}

// POST /api/admin/bookings/:id/complete
pub async fn complete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    {
        let db = state.db.lock().unwrap();
        auth::require_admin(&db, &headers)?;
        verification::complete_booking(&db, &id)?;
    }

    Ok(Json(serde_json::json!({ "ok": true })))
}

// POST /api/admin/courts
#[derive(Deserialize)]
pub struct CreateCourtRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_per_hour: i64,
    pub is_active: Option<bool>,
}

pub async fn create_court(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateCourtRequest>,
) -> Result<Json<CourtResponse>, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("court name must not be empty".to_string()));
    }
    if body.price_per_hour <= 0 {
        return Err(AppError::Validation(
            "price per hour must be positive".to_string(),
        ));
    }

    let court = Court {
        id: Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        description: body.description,
        price_per_hour: body.price_per_hour,
        is_active: body.is_active.unwrap_or(true),
        created_at: Utc::now().naive_utc(),
    };

    {
        let db = state.db.lock().unwrap();
        auth::require_admin(&db, &headers)?;
        queries::insert_court(&db, &court)?;
    }

    Ok(Json(court_response(court)))
}

// POST /api/admin/courts/:id
//
// Deactivation hides a court from the booking flow; its bookings stay intact.
#[derive(Deserialize)]
pub struct UpdateCourtRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_per_hour: Option<i64>,
    pub is_active: Option<bool>,
}

pub async fn update_court(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateCourtRequest>,
) -> Result<Json<CourtResponse>, AppError> {
    let court = {
        let db = state.db.lock().unwrap();
        auth::require_admin(&db, &headers)?;

        let mut court = queries::get_court(&db, &id)?
            .ok_or_else(|| AppError::NotFound("court not found".to_string()))?;

        if let Some(name) = body.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("court name must not be empty".to_string()));
            }
            court.name = name.trim().to_string();
        }
        if let Some(description) = body.description {
            court.description = Some(description);
        }
        if let Some(price) = body.price_per_hour {
            if price <= 0 {
                return Err(AppError::Validation(
                    "price per hour must be positive".to_string(),
                ));
            }
            court.price_per_hour = price;
        }
        if let Some(active) = body.is_active {
            court.is_active = active;
        }

        queries::update_court(&db, &court)?;
        court
    };

    Ok(Json(court_response(court)))
}

// POST /api/admin/sweep
//
// Invoked by the external scheduler with the service credential, or manually
// by an admin. Anything else is rejected before any row is touched.
#[derive(Serialize)]
pub struct SweepResponse {
    pub cancelled: usize,
    pub bookings: Vec<SweptBookingResponse>,
}

#[derive(Serialize)]
pub struct SweptBookingResponse {
    pub id: String,
    pub reference_code: String,
}

pub async fn run_sweep(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SweepResponse>, AppError> {
    let service_token = &state.config.service_token;
    let is_service_call = auth::bearer_token(&headers)
        .is_some_and(|t| !service_token.is_empty() && t == service_token.as_str());

    let swept = {
        let mut db = state.db.lock().unwrap();
        if !is_service_call {
            auth::require_admin(&db, &headers)?;
        }
        sweeper::run_sweep(&mut db)?
    };

    if !swept.is_empty() {
        tracing::info!(count = swept.len(), "manual sweep cancelled expired bookings");
    }

    Ok(Json(SweepResponse {
        cancelled: swept.len(),
        bookings: swept
            .into_iter()
            .map(|b| SweptBookingResponse {
                id: b.id,
                reference_code: b.reference_code,
            })
            .collect(),
    }))
}
