pub mod availability;
pub mod booking;
pub mod notify;
pub mod sweeper;
pub mod verification;
