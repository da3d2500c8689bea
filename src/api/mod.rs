pub mod auth;
pub mod categories;
pub mod dashboard;
pub mod listings;
pub mod payments;
pub mod reviews;
pub mod uploads;
pub mod webhooks;
