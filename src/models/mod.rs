//! Data models for ShareIt

pub mod booking;
pub mod comment;
pub mod item;
pub mod request;
pub mod user;

use chrono::{Local, NaiveDateTime};
use validator::ValidationError;

// Re-export commonly used types
pub use booking::{Booking, BookingState, BookingStatus};
pub use comment::Comment;
pub use item::{Item, ItemDetails};
pub use request::{ItemRequest, ItemRequestDetails};
pub use user::User;

/// Current local wall-clock time, the reference point for booking windows
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Rejects strings made only of whitespace
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}
