use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{Booking, BookingStatus, Court, Payment, PaymentStatus, Profile};

const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DT_FORMAT).to_string()
}

fn parse_dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DT_FORMAT).unwrap_or_else(|_| Utc::now().naive_utc())
}

fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| Utc::now().date_naive())
}

fn parse_time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M:%S").unwrap_or(NaiveTime::MIN)
}

// ── Courts ──

pub fn insert_court(conn: &Connection, court: &Court) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO courts (id, name, description, price_per_hour, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            court.id,
            court.name,
            court.description,
            court.price_per_hour,
            court.is_active as i32,
            fmt_dt(&court.created_at),
        ],
    )?;
    Ok(())
}

pub fn update_court(conn: &Connection, court: &Court) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE courts SET name = ?1, description = ?2, price_per_hour = ?3, is_active = ?4
         WHERE id = ?5",
        params![
            court.name,
            court.description,
            court.price_per_hour,
            court.is_active as i32,
            court.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn get_court(conn: &Connection, id: &str) -> anyhow::Result<Option<Court>> {
    let result = conn.query_row(
        "SELECT id, name, description, price_per_hour, is_active, created_at
         FROM courts WHERE id = ?1",
        params![id],
        |row| Ok(parse_court_row(row)),
    );

    match result {
        Ok(court) => Ok(Some(court?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_courts(conn: &Connection, active_only: bool) -> anyhow::Result<Vec<Court>> {
    let sql = if active_only {
        "SELECT id, name, description, price_per_hour, is_active, created_at
         FROM courts WHERE is_active = 1 ORDER BY name ASC"
    } else {
        "SELECT id, name, description, price_per_hour, is_active, created_at
         FROM courts ORDER BY name ASC"
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| Ok(parse_court_row(row)))?;

    let mut courts = vec![];
    for row in rows {
        courts.push(row??);
    }
    Ok(courts)
}

// ── Bookings ──

pub struct BookingWithCourt {
    pub booking: Booking,
    pub court_name: String,
    pub court_description: Option<String>,
}

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, user_id, court_id, booking_date, start_time, end_time,
                               total_amount, status, reference_code, expires_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            booking.id,
            booking.user_id,
            booking.court_id,
            booking.booking_date.format("%Y-%m-%d").to_string(),
            booking.start_time.format("%H:%M:%S").to_string(),
            booking.end_time.format("%H:%M:%S").to_string(),
            booking.total_amount,
            booking.status.as_str(),
            booking.reference_code,
            fmt_dt(&booking.expires_at),
            fmt_dt(&booking.created_at),
            fmt_dt(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, user_id, court_id, booking_date, start_time, end_time, total_amount,
                status, reference_code, expires_at, created_at, updated_at
         FROM bookings WHERE id = ?1",
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<BookingWithCourt>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.user_id, b.court_id, b.booking_date, b.start_time, b.end_time, b.total_amount,
                b.status, b.reference_code, b.expires_at, b.created_at, b.updated_at,
                c.name, c.description
         FROM bookings b
         INNER JOIN courts c ON c.id = b.court_id
         WHERE b.user_id = ?1
         ORDER BY b.booking_date DESC, b.start_time DESC",
    )?;

    let rows = stmt.query_map(params![user_id], |row| {
        let court_name: String = row.get(12)?;
        let court_description: Option<String> = row.get(13)?;
        Ok((parse_booking_row(row), court_name, court_description))
    })?;

    let mut bookings = vec![];
    for row in rows {
        let (booking, court_name, court_description) = row?;
        bookings.push(BookingWithCourt {
            booking: booking?,
            court_name,
            court_description,
        });
    }
    Ok(bookings)
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<&str>,
    limit: i64,
) -> anyhow::Result<Vec<BookingWithCourt>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            "SELECT b.id, b.user_id, b.court_id, b.booking_date, b.start_time, b.end_time, b.total_amount,
                    b.status, b.reference_code, b.expires_at, b.created_at, b.updated_at,
                    c.name, c.description
             FROM bookings b
             INNER JOIN courts c ON c.id = b.court_id
             WHERE b.status = ?1
             ORDER BY b.created_at DESC LIMIT ?2"
                .to_string(),
            vec![
                Box::new(status.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            "SELECT b.id, b.user_id, b.court_id, b.booking_date, b.start_time, b.end_time, b.total_amount,
                    b.status, b.reference_code, b.expires_at, b.created_at, b.updated_at,
                    c.name, c.description
             FROM bookings b
             INNER JOIN courts c ON c.id = b.court_id
             ORDER BY b.created_at DESC LIMIT ?1"
                .to_string(),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        let court_name: String = row.get(12)?;
        let court_description: Option<String> = row.get(13)?;
        Ok((parse_booking_row(row), court_name, court_description))
    })?;

    let mut bookings = vec![];
    for row in rows {
        let (booking, court_name, court_description) = row?;
        bookings.push(BookingWithCourt {
            booking: booking?,
            court_name,
            court_description,
        });
    }
    Ok(bookings)
}

/// Intervals held by bookings that still block a slot for the given court and
/// date. Cancelled and completed rows never block.
pub fn occupied_intervals(
    conn: &Connection,
    court_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<(NaiveTime, NaiveTime)>> {
    let mut stmt = conn.prepare(
        "SELECT start_time, end_time FROM bookings
         WHERE court_id = ?1 AND booking_date = ?2 AND status IN ('pending', 'paid')
         ORDER BY start_time ASC",
    )?;

    let rows = stmt.query_map(
        params![court_id, date.format("%Y-%m-%d").to_string()],
        |row| {
            let start: String = row.get(0)?;
            let end: String = row.get(1)?;
            Ok((parse_time(&start), parse_time(&end)))
        },
    )?;

    let mut intervals = vec![];
    for row in rows {
        intervals.push(row?);
    }
    Ok(intervals)
}

pub fn count_overlapping(
    conn: &Connection,
    court_id: &str,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE court_id = ?1 AND booking_date = ?2 AND status IN ('pending', 'paid')
           AND start_time < ?3 AND end_time > ?4",
        params![
            court_id,
            date.format("%Y-%m-%d").to_string(),
            end.format("%H:%M:%S").to_string(),
            start.format("%H:%M:%S").to_string(),
        ],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Conditional status transition. Affects zero rows unless the booking is
/// currently in `from`, so racing writers cannot clobber each other.
pub fn transition_booking(
    conn: &Connection,
    id: &str,
    from: BookingStatus,
    to: BookingStatus,
) -> anyhow::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![to.as_str(), now, id, from.as_str()],
    )?;
    Ok(count > 0)
}

pub fn cancel_booking_for_user(conn: &Connection, id: &str, user_id: &str) -> anyhow::Result<bool> {
    let now = fmt_dt(&Utc::now().naive_utc());
    let count = conn.execute(
        "UPDATE bookings SET status = 'cancelled', updated_at = ?1
         WHERE id = ?2 AND user_id = ?3 AND status IN ('pending', 'paid')",
        params![now, id, user_id],
    )?;
    Ok(count > 0)
}

pub struct SweptBooking {
    pub id: String,
    pub reference_code: String,
}

/// Cancels every pending booking whose hold has lapsed, in one statement.
/// The compound condition keeps the sweep from racing a concurrent approval.
pub fn cancel_expired_bookings(
    conn: &Connection,
    now: NaiveDateTime,
) -> anyhow::Result<Vec<SweptBooking>> {
    let now_str = fmt_dt(&now);
    let mut stmt = conn.prepare(
        "UPDATE bookings SET status = 'cancelled', updated_at = ?1
         WHERE status = 'pending' AND expires_at < ?1
         RETURNING id, reference_code",
    )?;

    let rows = stmt.query_map(params![now_str], |row| {
        Ok(SweptBooking {
            id: row.get(0)?,
            reference_code: row.get(1)?,
        })
    })?;

    let mut swept = vec![];
    for row in rows {
        swept.push(row?);
    }
    Ok(swept)
}

// ── Payments ──

pub struct PaymentWithBooking {
    pub payment: Payment,
    pub reference_code: String,
    pub court_name: String,
}

pub fn insert_payment(conn: &Connection, payment: &Payment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO payments (id, booking_id, user_id, amount, method, transaction_reference,
                               status, paid_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            payment.id,
            payment.booking_id,
            payment.user_id,
            payment.amount,
            payment.method,
            payment.transaction_reference,
            payment.status.as_str(),
            payment.paid_at.as_ref().map(fmt_dt),
            fmt_dt(&payment.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_payment_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<Option<Payment>> {
    let result = conn.query_row(
        "SELECT id, booking_id, user_id, amount, method, transaction_reference, status, paid_at, created_at
         FROM payments WHERE booking_id = ?1",
        params![booking_id],
        |row| Ok(parse_payment_row(row)),
    );

    match result {
        Ok(payment) => Ok(Some(payment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_payment_reference(
    conn: &Connection,
    booking_id: &str,
    user_id: &str,
    reference: &str,
    method: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET transaction_reference = ?1, method = COALESCE(?2, method)
         WHERE booking_id = ?3 AND user_id = ?4 AND status = 'pending'",
        params![reference, method, booking_id, user_id],
    )?;
    Ok(count > 0)
}

pub fn complete_payment(
    conn: &Connection,
    payment_id: &str,
    booking_id: &str,
    paid_at: NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET status = 'completed', paid_at = ?1
         WHERE id = ?2 AND booking_id = ?3",
        params![fmt_dt(&paid_at), payment_id, booking_id],
    )?;
    Ok(count > 0)
}

pub fn fail_payment(conn: &Connection, payment_id: &str, booking_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET status = 'failed' WHERE id = ?1 AND booking_id = ?2",
        params![payment_id, booking_id],
    )?;
    Ok(count > 0)
}

pub fn fail_pending_payment_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET status = 'failed' WHERE booking_id = ?1 AND status = 'pending'",
        params![booking_id],
    )?;
    Ok(count > 0)
}

pub fn refund_completed_payment_for_booking(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE payments SET status = 'refunded' WHERE booking_id = ?1 AND status = 'completed'",
        params![booking_id],
    )?;
    Ok(count > 0)
}

pub fn get_all_payments(conn: &Connection, limit: i64) -> anyhow::Result<Vec<PaymentWithBooking>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.booking_id, p.user_id, p.amount, p.method, p.transaction_reference,
                p.status, p.paid_at, p.created_at, b.reference_code, c.name
         FROM payments p
         INNER JOIN bookings b ON b.id = p.booking_id
         INNER JOIN courts c ON c.id = b.court_id
         ORDER BY p.created_at DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map(params![limit], |row| {
        let reference_code: String = row.get(9)?;
        let court_name: String = row.get(10)?;
        Ok((parse_payment_row(row), reference_code, court_name))
    })?;

    let mut payments = vec![];
    for row in rows {
        let (payment, reference_code, court_name) = row?;
        payments.push(PaymentWithBooking {
            payment: payment?,
            reference_code,
            court_name,
        });
    }
    Ok(payments)
}

// ── Profiles & Roles ──

pub fn get_profile_by_token(conn: &Connection, token: &str) -> anyhow::Result<Option<Profile>> {
    let result = conn.query_row(
        "SELECT id, display_name, phone, email, auth_token FROM profiles WHERE auth_token = ?1",
        params![token],
        |row| {
            Ok(Profile {
                id: row.get(0)?,
                display_name: row.get(1)?,
                phone: row.get(2)?,
                email: row.get(3)?,
                auth_token: row.get(4)?,
            })
        },
    );

    match result {
        Ok(profile) => Ok(Some(profile)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_profile(conn: &Connection, id: &str) -> anyhow::Result<Option<Profile>> {
    let result = conn.query_row(
        "SELECT id, display_name, phone, email, auth_token FROM profiles WHERE id = ?1",
        params![id],
        |row| {
            Ok(Profile {
                id: row.get(0)?,
                display_name: row.get(1)?,
                phone: row.get(2)?,
                email: row.get(3)?,
                auth_token: row.get(4)?,
            })
        },
    );

    match result {
        Ok(profile) => Ok(Some(profile)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn upsert_profile(conn: &Connection, profile: &Profile) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO profiles (id, display_name, phone, email, auth_token)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
           display_name = excluded.display_name,
           phone = excluded.phone,
           email = excluded.email,
           auth_token = excluded.auth_token",
        params![
            profile.id,
            profile.display_name,
            profile.phone,
            profile.email,
            profile.auth_token,
        ],
    )?;
    Ok(())
}

pub fn grant_role(conn: &Connection, user_id: &str, role: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO user_roles (user_id, role) VALUES (?1, ?2)
         ON CONFLICT(user_id, role) DO NOTHING",
        params![user_id, role],
    )?;
    Ok(())
}

pub fn has_role(conn: &Connection, user_id: &str, role: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM user_roles WHERE user_id = ?1 AND role = ?2",
        params![user_id, role],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

// ── Row parsing ──

fn parse_court_row(row: &rusqlite::Row) -> anyhow::Result<Court> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let description: Option<String> = row.get(2)?;
    let price_per_hour: i64 = row.get(3)?;
    let is_active: bool = row.get::<_, i32>(4)? != 0;
    let created_at_str: String = row.get(5)?;

    Ok(Court {
        id,
        name,
        description,
        price_per_hour,
        is_active,
        created_at: parse_dt(&created_at_str),
    })
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let court_id: String = row.get(2)?;
    let booking_date_str: String = row.get(3)?;
    let start_time_str: String = row.get(4)?;
    let end_time_str: String = row.get(5)?;
    let total_amount: i64 = row.get(6)?;
    let status_str: String = row.get(7)?;
    let reference_code: String = row.get(8)?;
    let expires_at_str: String = row.get(9)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    Ok(Booking {
        id,
        user_id,
        court_id,
        booking_date: parse_date(&booking_date_str),
        start_time: parse_time(&start_time_str),
        end_time: parse_time(&end_time_str),
        total_amount,
        status: BookingStatus::parse(&status_str),
        reference_code,
        expires_at: parse_dt(&expires_at_str),
        created_at: parse_dt(&created_at_str),
        updated_at: parse_dt(&updated_at_str),
    })
}

fn parse_payment_row(row: &rusqlite::Row) -> anyhow::Result<Payment> {
    let id: String = row.get(0)?;
    let booking_id: String = row.get(1)?;
    let user_id: String = row.get(2)?;
    let amount: i64 = row.get(3)?;
    let method: String = row.get(4)?;
    let transaction_reference: Option<String> = row.get(5)?;
    let status_str: String = row.get(6)?;
    let paid_at_str: Option<String> = row.get(7)?;
    let created_at_str: String = row.get(8)?;

    Ok(Payment {
        id,
        booking_id,
        user_id,
        amount,
        method,
        transaction_reference,
        status: PaymentStatus::parse(&status_str),
        paid_at: paid_at_str.as_deref().map(parse_dt),
        created_at: parse_dt(&created_at_str),
    })
}
