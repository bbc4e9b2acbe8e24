pub mod calendar;

pub use calendar::{due_announcements, PromotionDue, SALES_CALENDAR};
