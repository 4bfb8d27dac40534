use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::slots;
use crate::models::{Booking, BookingStatus, Payment, PaymentStatus};

/// How long a pending booking holds its slots before the sweeper reclaims it.
pub const HOLD_MINUTES: i64 = 30;

const DEFAULT_METHOD: &str = "gcash";

/// Human-facing booking reference, distinct from the row id.
pub fn generate_reference_code() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("PC{}", id[..8].to_uppercase())
}

/// Sorts the selected slots before deriving bounds, so unsorted input cannot
/// produce an inverted interval: start = earliest slot, end = one hour after
/// the latest.
fn derive_slot_bounds(slot_labels: &[String]) -> Result<(NaiveTime, NaiveTime), AppError> {
    let mut starts = Vec::with_capacity(slot_labels.len());
    for label in slot_labels {
        let start =
            slots::parse_slot_label(label).map_err(|e| AppError::Validation(e.to_string()))?;
        starts.push(start);
    }

    starts.sort();
    let before = starts.len();
    starts.dedup();
    if starts.len() != before {
        return Err(AppError::Validation(
            "duplicate time slots selected".to_string(),
        ));
    }

    let first = starts[0];
    let last = *starts.last().unwrap_or(&first);
    Ok((first, last + Duration::hours(1)))
}

/// Creates a pending booking and its companion payment stub in one
/// transaction. The overlap check runs inside the same transaction, so a
/// conflicting insert that slipped in after the caller last saw availability
/// is rejected here instead of double-selling the slot.
#[allow(clippy::too_many_arguments)]
pub fn create_booking(
    conn: &mut Connection,
    user_id: &str,
    court_id: &str,
    booking_date: NaiveDate,
    slot_labels: &[String],
    method: Option<&str>,
    transaction_reference: Option<&str>,
) -> Result<(Booking, Payment), AppError> {
    if slot_labels.is_empty() {
        return Err(AppError::Validation("no time slots selected".to_string()));
    }
    let (start_time, end_time) = derive_slot_bounds(slot_labels)?;

    let tx = conn.transaction()?;

    let court = queries::get_court(&tx, court_id)?
        .ok_or_else(|| AppError::NotFound("court not found".to_string()))?;
    if !court.is_active {
        return Err(AppError::Validation(
            "court is not open for booking".to_string(),
        ));
    }

    let total_amount = court.price_per_hour * slot_labels.len() as i64;
    if total_amount <= 0 {
        return Err(AppError::Validation(
            "total amount must be positive".to_string(),
        ));
    }

    if queries::count_overlapping(&tx, court_id, booking_date, start_time, end_time)? > 0 {
        return Err(AppError::Conflict(
            "one or more selected slots are no longer available".to_string(),
        ));
    }

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        court_id: court_id.to_string(),
        booking_date,
        start_time,
        end_time,
        total_amount,
        status: BookingStatus::Pending,
        reference_code: generate_reference_code(),
        expires_at: now + Duration::minutes(HOLD_MINUTES),
        created_at: now,
        updated_at: now,
    };
    queries::insert_booking(&tx, &booking)?;

    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        booking_id: booking.id.clone(),
        user_id: user_id.to_string(),
        amount: total_amount,
        method: method.unwrap_or(DEFAULT_METHOD).to_string(),
        transaction_reference: transaction_reference.map(str::to_string),
        status: PaymentStatus::Pending,
        paid_at: None,
        created_at: now,
    };
    queries::insert_payment(&tx, &payment)?;

    tx.commit()?;
    Ok((booking, payment))
}

/// User-initiated cancellation. Only pending and paid bookings qualify; the
/// conditional update means a racing sweep or admin denial simply wins and
/// this call reports the conflict. A pending payment is marked failed, a
/// completed one refunded, so the payment row never contradicts the booking.
pub fn cancel_booking(
    conn: &mut Connection,
    user_id: &str,
    booking_id: &str,
) -> Result<Booking, AppError> {
    let tx = conn.transaction()?;

    let mut booking = queries::get_booking_by_id(&tx, booking_id)?
        .filter(|b| b.user_id == user_id)
        .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

    if !queries::cancel_booking_for_user(&tx, booking_id, user_id)? {
        return Err(AppError::Conflict(
            "booking is already completed or cancelled".to_string(),
        ));
    }

    match booking.status {
        BookingStatus::Pending => {
            queries::fail_pending_payment_for_booking(&tx, booking_id)?;
        }
        BookingStatus::Paid => {
            queries::refund_completed_payment_for_booking(&tx, booking_id)?;
        }
        _ => {}
    }

    tx.commit()?;
    booking.status = BookingStatus::Cancelled;
    Ok(booking)
}

/// Records the user-supplied GCash transaction reference on the booking's
/// payment. Allowed only while the payment is still pending verification.
pub fn attach_payment_reference(
    conn: &Connection,
    user_id: &str,
    booking_id: &str,
    reference: &str,
    method: Option<&str>,
) -> Result<Payment, AppError> {
    if reference.trim().is_empty() {
        return Err(AppError::Validation(
            "transaction reference must not be empty".to_string(),
        ));
    }

    queries::get_booking_by_id(conn, booking_id)?
        .filter(|b| b.user_id == user_id)
        .ok_or_else(|| AppError::NotFound("booking not found".to_string()))?;

    if !queries::set_payment_reference(conn, booking_id, user_id, reference.trim(), method)? {
        return Err(AppError::Conflict(
            "payment has already been processed".to_string(),
        ));
    }

    queries::get_payment_for_booking(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound("payment not found".to_string()))
}
