// rental_backend/src/models.rs
use crate::schema::{bookings, categories, items, reviews, sessions, users};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use rocket::serde::{Deserialize, Serialize};
use rust_decimal::Decimal;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use uuid::Uuid;

pub const DEFAULT_AVAILABILITY_RULE: &str = "all_days";

/// Decimal places kept for money columns.
pub const AMOUNT_SCALE: u32 = 2;
/// `items.price_per_day` is NUMERIC(12, 2).
pub const PRICE_INTEGER_DIGITS: u32 = 10;
/// `bookings.total_price` is NUMERIC(14, 2).
pub const TOTAL_INTEGER_DIGITS: u32 = 12;

/// Smallest amount that no longer fits in `integer_digits` digits before the point.
pub fn amount_limit(integer_digits: u32) -> Decimal {
    Decimal::from(10_i64.pow(integer_digits))
}

// --- Users ---

#[derive(Queryable, Identifiable, Selectable, Serialize, Debug, PartialEq, Clone)]
#[diesel(table_name = users)]
#[serde(crate = "rocket::serde")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    #[serde(skip_serializing)] // Password hash should not be sent to client
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: Option<&'a str>,
    pub password_hash: &'a str,
}

// For returning user info without password hash
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "rocket::serde")]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

impl UserInfo {
    /// Full name when known, otherwise the username.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        UserInfo {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// `username` accepts either the username or the email address.
#[derive(Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(crate = "rocket::serde")]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

// --- Sessions ---

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = sessions)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = sessions)]
pub struct NewSession {
    pub user_id: Uuid,
    pub expires_at: NaiveDateTime,
}

// --- Categories ---

#[derive(Queryable, Identifiable, Selectable, Serialize, Deserialize, Debug, PartialEq, Clone)]
#[diesel(table_name = categories)]
#[serde(crate = "rocket::serde")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Insertable, Deserialize, Debug, Clone)]
#[diesel(table_name = categories)]
#[serde(crate = "rocket::serde")]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// --- Items ---

#[derive(Queryable, Identifiable, Selectable, Associations, Serialize, Deserialize, Debug, PartialEq, Clone)]
#[diesel(belongs_to(User, foreign_key = owner_id))]
#[diesel(belongs_to(Category))]
#[diesel(table_name = items)]
#[serde(crate = "rocket::serde")]
pub struct Item {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: String,
    pub price_per_day: Decimal,
    pub is_available: bool,
    pub image_url: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub available_from: Option<NaiveDate>,
    pub available_to: Option<NaiveDate>,
    pub availability_rule: String,
    pub disabled_dates: Vec<NaiveDate>,
    pub created_at: NaiveDateTime,
}

impl Item {
    /// Comma-joined location fields, skipping the ones that are unset.
    pub fn pickup_address(&self) -> String {
        [&self.address, &self.city, &self.state, &self.zip_code]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = items)]
pub struct NewItem {
    pub owner_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: String,
    pub price_per_day: Decimal,
    pub image_url: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub available_from: Option<NaiveDate>,
    pub available_to: Option<NaiveDate>,
    pub availability_rule: String,
    pub disabled_dates: Vec<NaiveDate>,
}

// Used for creating an item from a request (owner_id will be from auth)
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "rocket::serde")]
pub struct CreateItemRequest {
    pub name: String,
    pub description: String,
    pub price_per_day: Decimal,
    pub category_id: Uuid,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    #[serde(default)]
    pub available_from: Option<NaiveDate>,
    #[serde(default)]
    pub available_to: Option<NaiveDate>,
    #[serde(default)]
    pub availability_rule: Option<String>,
    #[serde(default)]
    pub disabled_dates: Vec<NaiveDate>,
}

/// Partial update of an item. Unset fields are left untouched.
#[derive(AsChangeset, Deserialize, Debug, Clone, Default)]
#[diesel(table_name = items)]
#[serde(crate = "rocket::serde")]
pub struct ItemChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_per_day: Option<Decimal>,
    pub is_available: Option<bool>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub available_from: Option<NaiveDate>,
    pub available_to: Option<NaiveDate>,
    pub availability_rule: Option<String>,
    pub disabled_dates: Option<Vec<NaiveDate>>,
}

impl ItemChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price_per_day.is_none()
            && self.is_available.is_none()
            && self.category_id.is_none()
            && self.image_url.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.zip_code.is_none()
            && self.available_from.is_none()
            && self.available_to.is_none()
            && self.availability_rule.is_none()
            && self.disabled_dates.is_none()
    }

    /// Returns a copy of `item` with these changes applied.
    pub fn apply_to(&self, item: &Item) -> Item {
        let mut merged = item.clone();
        if let Some(ref v) = self.name {
            merged.name = v.clone();
        }
        if let Some(ref v) = self.description {
            merged.description = v.clone();
        }
        if let Some(v) = self.price_per_day {
            merged.price_per_day = v;
        }
        if let Some(v) = self.is_available {
            merged.is_available = v;
        }
        if let Some(v) = self.category_id {
            merged.category_id = v;
        }
        if self.image_url.is_some() {
            merged.image_url = self.image_url.clone();
        }
        if self.address.is_some() {
            merged.address = self.address.clone();
        }
        if self.city.is_some() {
            merged.city = self.city.clone();
        }
        if self.state.is_some() {
            merged.state = self.state.clone();
        }
        if self.zip_code.is_some() {
            merged.zip_code = self.zip_code.clone();
        }
        if self.available_from.is_some() {
            merged.available_from = self.available_from;
        }
        if self.available_to.is_some() {
            merged.available_to = self.available_to;
        }
        if let Some(ref v) = self.availability_rule {
            merged.availability_rule = v.clone();
        }
        if let Some(ref v) = self.disabled_dates {
            merged.disabled_dates = v.clone();
        }
        merged
    }
}

/// Relational listing search; every filter is optional.
#[derive(Debug, Clone, Default)]
pub struct ItemSearch {
    pub q: Option<String>,
    pub city: Option<String>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub skip: i64,
    pub limit: i64,
}

impl ItemSearch {
    /// Same predicate the SQL query applies, for stores that filter in memory.
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(ref q) = self.q {
            let q = q.to_lowercase();
            if !item.name.to_lowercase().contains(&q) && !item.description.to_lowercase().contains(&q) {
                return false;
            }
        }
        if let Some(ref city) = self.city {
            match item.city {
                Some(ref c) if c.to_lowercase() == city.to_lowercase() => {}
                _ => return false,
            }
        }
        if let Some(category_id) = self.category_id {
            if item.category_id != category_id {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if item.price_per_day < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if item.price_per_day > max {
                return false;
            }
        }
        true
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "rocket::serde")]
pub struct ItemDetails {
    #[serde(flatten)]
    pub item: Item,
    pub owner: UserInfo,
    pub category: Category,
}

// --- Bookings ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = Text)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Moves allowed under the strict transition policy.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        *self == next
            || matches!(
                (self, next),
                (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
            )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized booking status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl ToSql<Text, Pg> for BookingStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for BookingStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = std::str::from_utf8(bytes.as_bytes())?;
        Ok(raw.parse()?)
    }
}

#[derive(Queryable, Identifiable, Selectable, Associations, Serialize, Deserialize, Debug, PartialEq, Clone)]
#[diesel(belongs_to(Item))]
#[diesel(belongs_to(User, foreign_key = renter_id))]
#[diesel(table_name = bookings)]
#[serde(crate = "rocket::serde")]
pub struct Booking {
    pub id: Uuid,
    pub item_id: Uuid,
    pub renter_id: Uuid,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = bookings)]
pub struct NewBooking {
    pub item_id: Uuid,
    pub renter_id: Uuid,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub total_price: Decimal,
    pub status: BookingStatus,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "rocket::serde")]
pub struct CreateBookingRequest {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "rocket::serde")]
pub struct BookingStatusUpdate {
    pub status: BookingStatus,
}

/// A booking with its item (owner and category included) and renter.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(crate = "rocket::serde")]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub item: ItemDetails,
    pub renter: UserInfo,
}

// --- Reviews ---

#[derive(Queryable, Identifiable, Selectable, Associations, Serialize, Deserialize, Debug, PartialEq, Clone)]
#[diesel(belongs_to(Item))]
#[diesel(belongs_to(User))]
#[diesel(table_name = reviews)]
#[serde(crate = "rocket::serde")]
pub struct Review {
    pub id: Uuid,
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = reviews)]
pub struct NewReview {
    pub item_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "rocket::serde")]
pub struct CreateReviewRequest {
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_wire_name() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>(), Ok(status));
        }
        assert!("approved".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn strict_transitions_follow_the_table() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Completed));
    }

    #[test]
    fn pickup_address_skips_missing_parts() {
        let item = Item {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            name: "Tent".into(),
            description: "Four person tent".into(),
            price_per_day: Decimal::new(2500, 2),
            is_available: true,
            image_url: None,
            address: Some("1 Main St".into()),
            city: None,
            state: Some("CA".into()),
            zip_code: Some("".into()),
            available_from: None,
            available_to: None,
            availability_rule: DEFAULT_AVAILABILITY_RULE.into(),
            disabled_dates: vec![],
            created_at: chrono::Utc::now().naive_utc(),
        };
        assert_eq!(item.pickup_address(), "1 Main St, CA");
    }

    #[test]
    fn search_filters_match_literally() {
        let item = Item {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            category_id: Uuid::new_v4(),
            name: "Drill".into(),
            description: "100% cordless".into(),
            price_per_day: Decimal::new(1000, 2),
            is_available: true,
            image_url: None,
            address: None,
            city: Some("Springfield".into()),
            state: None,
            zip_code: None,
            available_from: None,
            available_to: None,
            availability_rule: DEFAULT_AVAILABILITY_RULE.into(),
            disabled_dates: vec![],
            created_at: chrono::Utc::now().naive_utc(),
        };
        let by_city = |city: &str| ItemSearch {
            city: Some(city.into()),
            ..Default::default()
        };
        assert!(by_city("SPRINGFIELD").matches(&item));
        assert!(!by_city("S_ringfield").matches(&item));
        assert!(!by_city("%").matches(&item));

        let by_text = |q: &str| ItemSearch {
            q: Some(q.into()),
            ..Default::default()
        };
        assert!(by_text("100%").matches(&item));
        assert!(!by_text("d_ill").matches(&item));
    }
}
