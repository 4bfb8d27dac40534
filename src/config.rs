use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub service_token: String,
    pub resend_api_key: String,
    pub notify_from_email: String,
    pub sweep_interval_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "courtbook.db".to_string()),
            service_token: env::var("SERVICE_TOKEN").unwrap_or_default(),
            resend_api_key: env::var("RESEND_API_KEY").unwrap_or_default(),
            notify_from_email: env::var("NOTIFY_FROM_EMAIL")
                .unwrap_or_else(|_| "bookings@courtbook.local".to_string()),
            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        }
    }
}
