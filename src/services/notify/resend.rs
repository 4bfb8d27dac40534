use anyhow::Context;
use async_trait::async_trait;

use super::{NotificationKind, NotificationProvider};
use crate::models::Booking;

pub struct ResendEmailProvider {
    api_key: String,
    from_email: String,
    client: reqwest::Client,
}

impl ResendEmailProvider {
    pub fn new(api_key: String, from_email: String) -> Self {
        Self {
            api_key,
            from_email,
            client: reqwest::Client::new(),
        }
    }

    fn render(booking: &Booking, court_name: &str, kind: NotificationKind) -> (String, String) {
        let reference = &booking.reference_code;
        match kind {
            NotificationKind::Confirmation => (
                format!("Booking Confirmed - {reference}"),
                format!(
                    "<h2>Booking Confirmed!</h2>\
                     <p>Your court reservation has been successfully created.</p>\
                     <p>Reference: {reference}<br>\
                     Court: {court_name}<br>\
                     Date: {}<br>\
                     Time: {} - {}<br>\
                     Amount: \u{20b1}{}</p>\
                     <p>Please complete payment within 30 minutes to secure your reservation.</p>",
                    booking.booking_date,
                    booking.start_time.format("%I:%M %p"),
                    booking.end_time.format("%I:%M %p"),
                    booking.total_amount,
                ),
            ),
            NotificationKind::Cancellation => (
                format!("Booking Cancelled - {reference}"),
                format!(
                    "<h2>Booking Cancelled</h2>\
                     <p>Your court reservation has been cancelled.</p>\
                     <p>Reference: {reference}<br>\
                     Court: {court_name}<br>\
                     Date: {}</p>\
                     <p>If this was a mistake, you can create a new booking at any time.</p>",
                    booking.booking_date,
                ),
            ),
        }
    }
}

#[async_trait]
impl NotificationProvider for ResendEmailProvider {
    async fn notify(
        &self,
        email: &str,
        court_name: &str,
        booking: &Booking,
        kind: NotificationKind,
    ) -> anyhow::Result<()> {
        let (subject, html) = Self::render(booking, court_name, kind);

        self.client
            .post("https://api.resend.com/emails")
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.from_email,
                "to": [email],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .context("failed to send booking email")?
            .error_for_status()
            .context("email API returned error")?;

        Ok(())
    }
}
