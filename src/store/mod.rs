//! Persistence collaborator for the marketplace.
//!
//! `Store` is the only way services reach data. [`PgStore`] backs it with
//! PostgreSQL through Diesel; [`MemoryStore`] keeps everything in `DashMap`s
//! and is what the integration tests run against.

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use crate::models::{
    Booking, BookingStatus, Category, Item, ItemChanges, ItemSearch, NewBooking, NewCategory, NewItem,
    NewReview, NewSession, NewUser, Review, Session, User,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("record not found")]
    NotFound,

    #[error("query failed: {0}")]
    Query(diesel::result::Error),
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};
        match err {
            Error::NotFound => StoreError::NotFound,
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::UniqueViolation(info.constraint_name().unwrap_or("unknown").to_string())
            }
            other => StoreError::Query(other),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Create/read/update access to users, sessions, categories, items,
/// bookings and reviews. Lists come back in creation order unless noted.
pub trait Store: Send + Sync {
    // users
    fn insert_user(&self, new_user: NewUser<'_>) -> StoreResult<User>;
    fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    fn user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    fn list_users(&self, skip: i64, limit: i64) -> StoreResult<Vec<User>>;

    // sessions
    fn insert_session(&self, new_session: NewSession) -> StoreResult<Session>;
    fn session_by_id(&self, id: Uuid) -> StoreResult<Option<Session>>;
    fn delete_session(&self, id: Uuid) -> StoreResult<()>;

    // categories, ordered by name
    fn insert_category(&self, new_category: NewCategory) -> StoreResult<Category>;
    fn category_by_id(&self, id: Uuid) -> StoreResult<Option<Category>>;
    fn list_categories(&self, skip: i64, limit: i64) -> StoreResult<Vec<Category>>;

    // items
    fn insert_item(&self, new_item: NewItem) -> StoreResult<Item>;
    fn item_by_id(&self, id: Uuid) -> StoreResult<Option<Item>>;
    fn list_items(&self, skip: i64, limit: i64) -> StoreResult<Vec<Item>>;
    fn search_items(&self, search: &ItemSearch) -> StoreResult<Vec<Item>>;
    fn items_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Item>>;
    fn update_item(&self, id: Uuid, changes: &ItemChanges) -> StoreResult<Item>;
    /// Removes the item together with its reviews.
    fn delete_item(&self, id: Uuid) -> StoreResult<()>;

    // bookings
    fn insert_booking(&self, new_booking: NewBooking) -> StoreResult<Booking>;
    fn booking_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>>;
    fn set_booking_status(&self, id: Uuid, status: BookingStatus) -> StoreResult<Booking>;
    fn bookings_by_renter(&self, renter_id: Uuid) -> StoreResult<Vec<Booking>>;
    fn bookings_by_item_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Booking>>;
    fn bookings_for_item(&self, item_id: Uuid, status: Option<BookingStatus>) -> StoreResult<Vec<Booking>>;

    // reviews
    fn insert_review(&self, new_review: NewReview) -> StoreResult<Review>;
    fn reviews_for_item(&self, item_id: Uuid) -> StoreResult<Vec<Review>>;
}
