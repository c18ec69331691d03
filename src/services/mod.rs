pub mod auth;
pub mod bookings;
pub mod categories;
pub mod error;
pub mod items;
pub mod reviews;
