use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rusqlite::Connection;

use crate::db::queries::{self, SweptBooking};
use crate::errors::AppError;
use crate::state::AppState;

/// Cancels every booking still pending past its reservation expiry and fails
/// the companion payments that were never verified, in one transaction.
///
/// The compound condition (status = pending AND expires_at < now) lives in a
/// single statement, so a booking an admin approves concurrently is never
/// swept. Safe to run arbitrarily often: a second pass finds nothing.
pub fn run_sweep(conn: &mut Connection) -> Result<Vec<SweptBooking>, AppError> {
    let tx = conn.transaction()?;

    let swept = queries::cancel_expired_bookings(&tx, Utc::now().naive_utc())?;
    for booking in &swept {
        queries::fail_pending_payment_for_booking(&tx, &booking.id)?;
    }

    tx.commit()?;
    Ok(swept)
}

/// In-process stand-in for the external scheduler: sweeps on a fixed
/// interval for as long as the server runs. Interval 0 disables it.
pub fn spawn_periodic(state: Arc<AppState>, interval_secs: u64) {
    if interval_secs == 0 {
        tracing::info!("periodic expiry sweep disabled");
        return;
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            interval.tick().await;
            let result = {
                let mut db = state.db.lock().unwrap();
                run_sweep(&mut db)
            };
            match result {
                Ok(swept) if swept.is_empty() => {}
                Ok(swept) => {
                    tracing::info!(count = swept.len(), "expiry sweep cancelled bookings");
                }
                Err(e) => {
                    tracing::error!(error = %e, "expiry sweep failed");
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Booking, BookingStatus, Court, Payment, PaymentStatus, Profile};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use uuid::Uuid;

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

    fn seed_booking(
        conn: &Connection,
        start_hour: u32,
        status: BookingStatus,
        expires_at: NaiveDateTime,
    ) -> String {
        let now = Utc::now().naive_utc();
        let id = Uuid::new_v4().to_string();
        queries::insert_booking(
            conn,
            &Booking {
                id: id.clone(),
                user_id: "user-1".to_string(),
                court_id: "court-1".to_string(),
                booking_date: NaiveDate::parse_from_str("2025-07-01", "%Y-%m-%d").unwrap(),
                start_time: NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(start_hour + 1, 0, 0).unwrap(),
                total_amount: 500,
                status,
                reference_code: format!("PC{:08}", start_hour),
                expires_at,
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
        queries::insert_payment(
            conn,
            &Payment {
                id: Uuid::new_v4().to_string(),
                booking_id: id.clone(),
                user_id: "user-1".to_string(),
                amount: 500,
                method: "gcash".to_string(),
                transaction_reference: None,
                status: PaymentStatus::Pending,
                paid_at: None,
                created_at: now,
            },
        )
        .unwrap();
        id
    }

    #[test]
    fn test_fresh_pending_booking_survives_sweep() {
        let mut conn = setup_db();
        let now = Utc::now().naive_utc();
        let id = seed_booking(
            &conn,
            9,
            BookingStatus::Pending,
            now + chrono::Duration::minutes(30),
        );

        let swept = run_sweep(&mut conn).unwrap();
        assert!(swept.is_empty());

        let booking = queries::get_booking_by_id(&conn, &id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Pending);
    }

    #[test]
    fn test_expired_pending_booking_is_cancelled() {
        let mut conn = setup_db();
        let now = Utc::now().naive_utc();
        let id = seed_booking(
            &conn,
            9,
            BookingStatus::Pending,
            now - chrono::Duration::minutes(1),
        );

        let swept = run_sweep(&mut conn).unwrap();
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].id, id);
        assert_eq!(swept[0].reference_code, "PC00000009");

        let booking = queries::get_booking_by_id(&conn, &id).unwrap().unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);

        let payment = queries::get_payment_for_booking(&conn, &id).unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let mut conn = setup_db();
        let now = Utc::now().naive_utc();
        seed_booking(
            &conn,
            9,
            BookingStatus::Pending,
            now - chrono::Duration::minutes(1),
        );

        assert_eq!(run_sweep(&mut conn).unwrap().len(), 1);
        assert!(run_sweep(&mut conn).unwrap().is_empty());
    }

    #[test]
    fn test_sweep_ignores_non_pending_bookings() {
        let mut conn = setup_db();
        let past = Utc::now().naive_utc() - chrono::Duration::hours(1);

        let paid = seed_booking(&conn, 9, BookingStatus::Paid, past);
        let completed = seed_booking(&conn, 11, BookingStatus::Completed, past);
        let cancelled = seed_booking(&conn, 13, BookingStatus::Cancelled, past);

        let swept = run_sweep(&mut conn).unwrap();
        assert!(swept.is_empty());

        for (id, expected) in [
            (paid, BookingStatus::Paid),
            (completed, BookingStatus::Completed),
            (cancelled, BookingStatus::Cancelled),
        ] {
            let booking = queries::get_booking_by_id(&conn, &id).unwrap().unwrap();
            assert_eq!(booking.status, expected);
        }
    }
}
