use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::SlotStatus;
use crate::services::availability;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub court_id: Option<String>,
    pub date: Option<String>,
}

// GET /api/availability?court_id=<id>&date=YYYY-MM-DD
//
// With either parameter missing the response is an empty list, not an error:
// the client has simply not picked a court or date yet.
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<SlotStatus>>, AppError> {
    let date = match query.date.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map_err(|_| AppError::Validation(format!("invalid date: {s}")))?,
        ),
        None => None,
    };
    let court_id = query.court_id.as_deref().filter(|s| !s.is_empty());

    let slots = {
        let db = state.db.lock().unwrap();
        availability::slot_statuses(&db, court_id, date)?
    };

    Ok(Json(slots))
}
