pub mod booking;
pub mod court;
pub mod payment;
pub mod profile;
pub mod slots;

pub use booking::{Booking, BookingStatus};
pub use court::Court;
pub use payment::{Payment, PaymentStatus};
pub use profile::Profile;
pub use slots::SlotStatus;
