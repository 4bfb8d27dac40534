use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Court;
use crate::state::AppState;

#[derive(Serialize)]
pub struct CourtResponse {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_per_hour: i64,
    pub is_active: bool,
    pub created_at: String,
}

pub fn court_response(court: Court) -> CourtResponse {
    CourtResponse {
        id: court.id,
        name: court.name,
        description: court.description,
        price_per_hour: court.price_per_hour,
        is_active: court.is_active,
        created_at: court.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

// GET /api/courts
pub async fn list_courts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CourtResponse>>, AppError> {
    let courts = {
        let db = state.db.lock().unwrap();
        queries::list_courts(&db, true)?
    };

    Ok(Json(courts.into_iter().map(court_response).collect()))
}

// GET /api/courts/:id
//
// Deactivated courts stay fetchable by id so booking history keeps resolving.
pub async fn get_court(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CourtResponse>, AppError> {
    let court = {
        let db = state.db.lock().unwrap();
        queries::get_court(&db, &id)?
    };

    match court {
        Some(court) => Ok(Json(court_response(court))),
        None => Err(AppError::NotFound("court not found".to_string())),
    }
}
