use chrono::Utc;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::BookingStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyDecision {
    Approve,
    Deny,
}

impl VerifyDecision {
    /// Accepts the target booking status the admin UI submits.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "paid" => Some(VerifyDecision::Approve),
            "cancelled" => Some(VerifyDecision::Deny),
            _ => None,
        }
    }
}

/// Applies the admin's verdict on a pending booking and its payment as one
/// transaction. Approval: booking -> paid, payment -> completed with paid_at
/// stamped. Denial: booking -> cancelled, payment -> failed.
///
/// The booking update is conditional on the row still being pending, so an
/// already-verified, swept, or cancelled booking is reported as a conflict
/// instead of being resurrected. If the payment row does not match the
/// booking, the whole transaction rolls back and the error surfaces for a
/// retry; nothing is left half-applied.
pub fn verify_booking(
    conn: &mut Connection,
    booking_id: &str,
    payment_id: &str,
    decision: VerifyDecision,
) -> Result<(), AppError> {
    let tx = conn.transaction()?;

    let target = match decision {
        VerifyDecision::Approve => BookingStatus::Paid,
        VerifyDecision::Deny => BookingStatus::Cancelled,
    };

    if !queries::transition_booking(&tx, booking_id, BookingStatus::Pending, target)? {
        return Err(match queries::get_booking_by_id(&tx, booking_id)? {
            Some(_) => AppError::Conflict("booking is no longer pending".to_string()),
            None => AppError::NotFound("booking not found".to_string()),
        });
    }

    let payment_updated = match decision {
        VerifyDecision::Approve => {
            queries::complete_payment(&tx, payment_id, booking_id, Utc::now().naive_utc())?
        }
        VerifyDecision::Deny => queries::fail_payment(&tx, payment_id, booking_id)?,
    };

    if !payment_updated {
        // Transaction rolls back on drop; the booking stays pending.
        return Err(AppError::Conflict(
            "payment does not match booking, no changes applied".to_string(),
        ));
    }

    tx.commit()?;
    Ok(())
}

/// Marks a paid booking as completed after the session took place. The
/// payment row is already settled and stays untouched.
pub fn complete_booking(conn: &Connection, booking_id: &str) -> Result<(), AppError> {
    if !queries::transition_booking(
        conn,
        booking_id,
        BookingStatus::Paid,
        BookingStatus::Completed,
    )? {
        return Err(match queries::get_booking_by_id(conn, booking_id)? {
            Some(_) => AppError::Conflict("only paid bookings can be completed".to_string()),
            None => AppError::NotFound("booking not found".to_string()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Court, PaymentStatus, Profile};
    use crate::services::booking::create_booking;
    use chrono::NaiveDate;

    fn setup_db() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        queries::upsert_profile(
            &conn,
            &Profile {
                id: "user-1".to_string(),
                display_name: "Alice".to_string(),
                phone: None,
                email: "alice@example.com".to_string(),
                auth_token: "token-1".to_string(),
            },
        )
        .unwrap();
        queries::insert_court(
            &conn,
            &Court {
                id: "court-1".to_string(),
                name: "Center Court".to_string(),
                description: None,
                price_per_hour: 500,
                is_active: true,
                created_at: Utc::now().naive_utc(),
            },
        )
        .unwrap();
        conn
    }

    fn seed_pending(conn: &mut Connection) -> (String, String) {
        let (booking, payment) = create_booking(
            conn,
            "user-1",
            "court-1",
            NaiveDate::parse_from_str("2025-07-01", "%Y-%m-%d").unwrap(),
            &["09:00 AM".to_string()],
            None,
            Some("GC-0001"),
        )
        .unwrap();
        (booking.id, payment.id)
    }

    #[test]
    fn test_approve_marks_paid_and_completes_payment() {
        let mut conn = setup_db();
        let (booking_id, payment_id) = seed_pending(&mut conn);

        verify_booking(&mut conn, &booking_id, &payment_id, VerifyDecision::Approve).unwrap();

        let booking = queries::get_booking_by_id(&conn, &booking_id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Paid);

        let payment = queries::get_payment_for_booking(&conn, &booking_id)
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.paid_at.is_some());
    }

    #[test]
    fn test_deny_cancels_and_fails_payment() {
        let mut conn = setup_db();
        let (booking_id, payment_id) = seed_pending(&mut conn);

        verify_booking(&mut conn, &booking_id, &payment_id, VerifyDecision::Deny).unwrap();

        let booking = queries::get_booking_by_id(&conn, &booking_id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);

        let payment = queries::get_payment_for_booking(&conn, &booking_id)
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert!(payment.paid_at.is_none());
    }

    #[test]
    fn test_verify_rejects_non_pending_booking() {
        let mut conn = setup_db();
        let (booking_id, payment_id) = seed_pending(&mut conn);

        verify_booking(&mut conn, &booking_id, &payment_id, VerifyDecision::Approve).unwrap();

        let again = verify_booking(&mut conn, &booking_id, &payment_id, VerifyDecision::Deny);
        assert!(matches!(again, Err(AppError::Conflict(_))));

        // First verdict stands.
        let booking = queries::get_booking_by_id(&conn, &booking_id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Paid);
    }

    #[test]
    fn test_verify_unknown_booking_not_found() {
        let mut conn = setup_db();
        let result = verify_booking(&mut conn, "nope", "nope", VerifyDecision::Approve);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_payment_mismatch_rolls_back_booking_update() {
        let mut conn = setup_db();
        let (booking_id, _) = seed_pending(&mut conn);

        let result = verify_booking(
            &mut conn,
            &booking_id,
            "wrong-payment",
            VerifyDecision::Approve,
        );
        assert!(matches!(result, Err(AppError::Conflict(_))));

        // The booking-side update was rolled back, so a retry is safe.
        let booking = queries::get_booking_by_id(&conn, &booking_id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[test]
    fn test_complete_requires_paid_status() {
        let mut conn = setup_db();
        let (booking_id, payment_id) = seed_pending(&mut conn);

        let result = complete_booking(&conn, &booking_id);
        assert!(matches!(result, Err(AppError::Conflict(_))));

        verify_booking(&mut conn, &booking_id, &payment_id, VerifyDecision::Approve).unwrap();
        complete_booking(&conn, &booking_id).unwrap();

        let booking = queries::get_booking_by_id(&conn, &booking_id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Completed);
    }
}
