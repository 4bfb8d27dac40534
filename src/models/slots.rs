use chrono::NaiveTime;
use serde::Serialize;

/// Courts operate 06:00-22:00; the last bookable slot starts at 21:00.
pub const OPEN_HOUR: u32 = 6;
pub const CLOSE_HOUR: u32 = 22;

#[derive(Debug, Clone, Serialize)]
pub struct SlotStatus {
    pub time: String,
    pub available: bool,
}

pub fn catalog_hours() -> impl Iterator<Item = u32> {
    OPEN_HOUR..CLOSE_HOUR
}

pub fn slot_start(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
}

pub fn slot_label(hour: u32) -> String {
    slot_start(hour).format("%I:%M %p").to_string()
}

/// Parses a catalog label like "09:00 AM" into its start time. Labels outside
/// the operating hours or off the hour are rejected.
pub fn parse_slot_label(label: &str) -> anyhow::Result<NaiveTime> {
    let time = NaiveTime::parse_from_str(label.trim(), "%I:%M %p")
        .map_err(|_| anyhow::anyhow!("invalid time slot: {label}"))?;

    use chrono::Timelike;
    let hour = time.hour();
    if time.minute() != 0 || time.second() != 0 || hour < OPEN_HOUR || hour >= CLOSE_HOUR {
        return Err(anyhow::anyhow!("time slot outside operating hours: {label}"));
    }

    Ok(time)
}

/// Half-open interval overlap: [a_start, a_end) intersects [b_start, b_end).
pub fn overlaps(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && a_end > b_start
}
