use chrono::{Duration, NaiveDate};
use rusqlite::Connection;

use crate::db::queries;
use crate::models::slots::{self, SlotStatus};

/// Reports, for the fixed slot catalog, which hourly slots are free for the
/// given court and date. A slot is taken while any pending or paid booking
/// overlaps it; completed and cancelled bookings never block.
///
/// With `court_id` or `date` absent the result is empty rather than an error:
/// the caller simply has nothing to ask about yet.
pub fn slot_statuses(
    conn: &Connection,
    court_id: Option<&str>,
    date: Option<NaiveDate>,
) -> anyhow::Result<Vec<SlotStatus>> {
    let (court_id, date) = match (court_id, date) {
        (Some(c), Some(d)) => (c, d),
        _ => return Ok(Vec::new()),
    };

    let occupied = queries::occupied_intervals(conn, court_id, date)?;

    Ok(slots::catalog_hours()
        .map(|hour| {
            let start = slots::slot_start(hour);
            let end = start + Duration::hours(1);
            let taken = occupied
                .iter()
                .any(|(b_start, b_end)| slots::overlaps(start, end, *b_start, *b_end));
            SlotStatus {
                time: slots::slot_label(hour),
                available: !taken,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{Booking, BookingStatus, Court, Profile};
    use chrono::{NaiveTime, Utc};

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

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn seed_booking(conn: &Connection, start: &str, end: &str, status: BookingStatus) {
        let now = Utc::now().naive_utc();
        let id = uuid::Uuid::new_v4().to_string();
        queries::insert_booking(
            conn,
            &Booking {
                id: id.clone(),
                user_id: "user-1".to_string(),
                court_id: "court-1".to_string(),
                booking_date: date("2025-07-01"),
                start_time: t(start),
                end_time: t(end),
                total_amount: 500,
                status,
                reference_code: format!("PC{}", &id[..8].to_uppercase()),
                expires_at: now + Duration::minutes(30),
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_missing_params_returns_empty() {
        let conn = setup_db();
        assert!(slot_statuses(&conn, None, Some(date("2025-07-01")))
            .unwrap()
            .is_empty());
        assert!(slot_statuses(&conn, Some("court-1"), None).unwrap().is_empty());
    }

    #[test]
    fn test_no_bookings_all_slots_open() {
        let conn = setup_db();
        let statuses = slot_statuses(&conn, Some("court-1"), Some(date("2025-07-01"))).unwrap();
        assert_eq!(statuses.len(), 16);
        assert!(statuses.iter().all(|s| s.available));
    }

    #[test]
    fn test_pending_booking_blocks_its_slots() {
        let conn = setup_db();
        seed_booking(&conn, "09:00", "11:00", BookingStatus::Pending);

        let statuses = slot_statuses(&conn, Some("court-1"), Some(date("2025-07-01"))).unwrap();
        let taken: Vec<&str> = statuses
            .iter()
            .filter(|s| !s.available)
            .map(|s| s.time.as_str())
            .collect();
        assert_eq!(taken, vec!["09:00 AM", "10:00 AM"]);
    }

    #[test]
    fn test_paid_booking_blocks_but_terminal_statuses_do_not() {
        let conn = setup_db();
        seed_booking(&conn, "08:00", "09:00", BookingStatus::Paid);
        seed_booking(&conn, "14:00", "15:00", BookingStatus::Completed);
        seed_booking(&conn, "16:00", "17:00", BookingStatus::Cancelled);

        let statuses = slot_statuses(&conn, Some("court-1"), Some(date("2025-07-01"))).unwrap();
        let by_label = |label: &str| statuses.iter().find(|s| s.time == label).unwrap().available;

        assert!(!by_label("08:00 AM"));
        assert!(by_label("02:00 PM"));
        assert!(by_label("04:00 PM"));
    }

    #[test]
    fn test_other_date_does_not_block() {
        let conn = setup_db();
        seed_booking(&conn, "09:00", "10:00", BookingStatus::Pending);

        let statuses = slot_statuses(&conn, Some("court-1"), Some(date("2025-07-02"))).unwrap();
        assert!(statuses.iter().all(|s| s.available));
    }
}
