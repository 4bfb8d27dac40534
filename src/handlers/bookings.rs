use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::courts::{court_response, CourtResponse};
use crate::models::{Booking, Payment};
use crate::services::booking as booking_service;
use crate::services::notify::NotificationKind;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub user_id: String,
    pub court_id: String,
    pub court_name: Option<String>,
    pub court_description: Option<String>,
    pub booking_date: String,
    pub start_time: String,
    pub end_time: String,
    pub total_amount: i64,
    pub status: String,
    pub reference_code: String,
    pub expires_at: String,
    pub created_at: String,
}

pub fn booking_response(
    booking: Booking,
    court_name: Option<String>,
    court_description: Option<String>,
) -> BookingResponse {
    BookingResponse {
        id: booking.id,
        user_id: booking.user_id,
        court_id: booking.court_id,
        court_name,
        court_description,
        booking_date: booking.booking_date.format("%Y-%m-%d").to_string(),
        start_time: booking.start_time.format("%H:%M:%S").to_string(),
        end_time: booking.end_time.format("%H:%M:%S").to_string(),
        total_amount: booking.total_amount,
        status: booking.status.as_str().to_string(),
        reference_code: booking.reference_code,
        expires_at: booking.expires_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        created_at: booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub booking_id: String,
    pub amount: i64,
    pub method: String,
    pub transaction_reference: Option<String>,
    pub status: String,
    pub paid_at: Option<String>,
    pub created_at: String,
}

pub fn payment_response(payment: Payment) -> PaymentResponse {
    PaymentResponse {
        id: payment.id,
        booking_id: payment.booking_id,
        amount: payment.amount,
        method: payment.method,
        transaction_reference: payment.transaction_reference,
        status: payment.status.as_str().to_string(),
        paid_at: payment
            .paid_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string()),
        created_at: payment.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

fn parse_booking_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid booking date: {s}")))
}

/// Dispatch is fire-and-forget: the booking transition has already committed
/// and a delivery failure only gets logged.
fn spawn_notification(
    state: &Arc<AppState>,
    email: String,
    court_name: String,
    booking: Booking,
    kind: NotificationKind,
) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        if let Err(e) = state
            .notifier
            .notify(&email, &court_name, &booking, kind)
            .await
        {
            tracing::error!(
                error = %e,
                reference = %booking.reference_code,
                kind = kind.as_str(),
                "failed to send booking notification"
            );
        }
    });
}

// POST /api/bookings
#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub court_id: String,
    pub booking_date: String,
    pub slots: Vec<String>,
    pub method: Option<String>,
    pub transaction_reference: Option<String>,
}

#[derive(Serialize)]
pub struct CreateBookingResponse {
    pub booking: BookingResponse,
    pub payment: PaymentResponse,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBookingRequest>,
) -> Result<Json<CreateBookingResponse>, AppError> {
    let (booking, payment, court_name, email) = {
        let mut db = state.db.lock().unwrap();
        let profile = auth::authenticate(&db, &headers)?;
        let date = parse_booking_date(&body.booking_date)?;

        let (booking, payment) = booking_service::create_booking(
            &mut db,
            &profile.id,
            &body.court_id,
            date,
            &body.slots,
            body.method.as_deref(),
            body.transaction_reference.as_deref(),
        )?;

        let court_name = queries::get_court(&db, &booking.court_id)?
            .map(|c| c.name)
            .unwrap_or_else(|| "Court".to_string());
        (booking, payment, court_name, profile.email)
    };

    spawn_notification(
        &state,
        email,
        court_name.clone(),
        booking.clone(),
        NotificationKind::Confirmation,
    );

    Ok(Json(CreateBookingResponse {
        booking: booking_response(booking, Some(court_name), None),
        payment: payment_response(payment),
    }))
}

// GET /api/bookings
pub async fn get_my_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let rows = {
        let db = state.db.lock().unwrap();
        let profile = auth::authenticate(&db, &headers)?;
        queries::get_bookings_for_user(&db, &profile.id)?
    };

    Ok(Json(
        rows.into_iter()
            .map(|r| booking_response(r.booking, Some(r.court_name), r.court_description))
            .collect(),
    ))
}

// GET /api/bookings/:id
#[derive(Serialize)]
pub struct BookingDetailResponse {
    pub booking: BookingResponse,
    pub court: Option<CourtResponse>,
    pub payment: Option<PaymentResponse>,
}

pub async fn get_my_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingDetailResponse>, AppError> {
    let (booking, court, payment) = {
        let db = state.db.lock().unwrap();
        let profile = auth::authenticate(&db, &headers)?;

        let booking = queries::get_booking_by_id(&db, &id)?
            .filter(|b| b.user_id == profile.id)
            .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;
        let court = queries::get_court(&db, &booking.court_id)?;
        let payment = queries::get_payment_for_booking(&db, &booking.id)?;
        (booking, court, payment)
    };

    let court_name = court.as_ref().map(|c| c.name.clone());
    Ok(Json(BookingDetailResponse {
        booking: booking_response(booking, court_name, None),
        court: court.map(court_response),
        payment: payment.map(payment_response),
    }))
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (booking, court_name, email) = {
        let mut db = state.db.lock().unwrap();
        let profile = auth::authenticate(&db, &headers)?;

        let booking = booking_service::cancel_booking(&mut db, &profile.id, &id)?;
        let court_name = queries::get_court(&db, &booking.court_id)?
            .map(|c| c.name)
            .unwrap_or_else(|| "Court".to_string());
        (booking, court_name, profile.email)
    };

    spawn_notification(
        &state,
        email,
        court_name,
        booking.clone(),
        NotificationKind::Cancellation,
    );

    Ok(Json(serde_json::json!({
        "ok": true,
        "reference_code": booking.reference_code,
    })))
}

// POST /api/bookings/:id/payment
#[derive(Deserialize)]
pub struct PaymentReferenceRequest {
    pub transaction_reference: String,
    pub method: Option<String>,
}

pub async fn attach_payment_reference(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<PaymentReferenceRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    let payment = {
        let db = state.db.lock().unwrap();
        let profile = auth::authenticate(&db, &headers)?;
        booking_service::attach_payment_reference(
            &db,
            &profile.id,
            &id,
            &body.transaction_reference,
            body.method.as_deref(),
        )?
    };

    Ok(Json(payment_response(payment)))
}
