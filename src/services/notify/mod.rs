pub mod resend;

use async_trait::async_trait;

use crate::models::Booking;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Confirmation,
    Cancellation,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Confirmation => "confirmation",
            NotificationKind::Cancellation => "cancellation",
        }
    }
}

/// Fire-and-forget delivery of booking emails. Callers spawn the call and log
/// failures; a notification error never rolls back the transition behind it.
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn notify(
        &self,
        email: &str,
        court_name: &str,
        booking: &Booking,
        kind: NotificationKind,
    ) -> anyhow::Result<()>;
}

/// Stands in when no email provider is configured.
pub struct LogNotifier;

#[async_trait]
impl NotificationProvider for LogNotifier {
    async fn notify(
        &self,
        email: &str,
        _court_name: &str,
        booking: &Booking,
        kind: NotificationKind,
    ) -> anyhow::Result<()> {
        tracing::info!(
            kind = kind.as_str(),
            reference = %booking.reference_code,
            to = %email,
            "notification (log only)"
        );
        Ok(())
    }
}
