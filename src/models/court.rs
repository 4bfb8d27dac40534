use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Court {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price_per_hour: i64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}
