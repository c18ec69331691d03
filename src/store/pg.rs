use super::{Store, StoreResult};
use crate::db::PgPool;
use crate::models::{
    Booking, BookingStatus, Category, Item, ItemChanges, ItemSearch, NewBooking, NewCategory, NewItem,
    NewReview, NewSession, NewUser, Review, Session, User,
};
use crate::schema::{bookings, categories, items, reviews, sessions, users};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use uuid::Uuid;

/// PostgreSQL-backed store; every call checks a connection out of the pool.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    fn conn(&self) -> StoreResult<PooledConnection<ConnectionManager<PgConnection>>> {
        Ok(self.pool.get()?)
    }
}

/// Escapes `%`, `_` and the escape character itself so `value` matches
/// literally in a LIKE pattern.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Store for PgStore {
    fn insert_user(&self, new_user: NewUser<'_>) -> StoreResult<User> {
        let mut conn = self.conn()?;
        let user = diesel::insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(&mut conn)?;
        Ok(user)
    }

    fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut conn = self.conn()?;
        Ok(users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::username.eq(username))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let mut conn = self.conn()?;
        Ok(users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn list_users(&self, skip: i64, limit: i64) -> StoreResult<Vec<User>> {
        let mut conn = self.conn()?;
        Ok(users::table
            .order((users::created_at.asc(), users::id.asc()))
            .offset(skip)
            .limit(limit)
            .select(User::as_select())
            .load(&mut conn)?)
    }

    fn insert_session(&self, new_session: NewSession) -> StoreResult<Session> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(sessions::table)
            .values(&new_session)
            .returning(Session::as_returning())
            .get_result(&mut conn)?)
    }

    fn session_by_id(&self, id: Uuid) -> StoreResult<Option<Session>> {
        let mut conn = self.conn()?;
        Ok(sessions::table
            .find(id)
            .select(Session::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn delete_session(&self, id: Uuid) -> StoreResult<()> {
        let mut conn = self.conn()?;
        diesel::delete(sessions::table.find(id)).execute(&mut conn)?;
        Ok(())
    }

    fn insert_category(&self, new_category: NewCategory) -> StoreResult<Category> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(categories::table)
            .values(&new_category)
            .returning(Category::as_returning())
            .get_result(&mut conn)?)
    }

    fn category_by_id(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let mut conn = self.conn()?;
        Ok(categories::table
            .find(id)
            .select(Category::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn list_categories(&self, skip: i64, limit: i64) -> StoreResult<Vec<Category>> {
        let mut conn = self.conn()?;
        Ok(categories::table
            .order(categories::name.asc())
            .offset(skip)
            .limit(limit)
            .select(Category::as_select())
            .load(&mut conn)?)
    }

    fn insert_item(&self, new_item: NewItem) -> StoreResult<Item> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(items::table)
            .values(&new_item)
            .returning(Item::as_returning())
            .get_result(&mut conn)?)
    }

    fn item_by_id(&self, id: Uuid) -> StoreResult<Option<Item>> {
        let mut conn = self.conn()?;
        Ok(items::table
            .find(id)
            .select(Item::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn list_items(&self, skip: i64, limit: i64) -> StoreResult<Vec<Item>> {
        let mut conn = self.conn()?;
        Ok(items::table
            .order((items::created_at.asc(), items::id.asc()))
            .offset(skip)
            .limit(limit)
            .select(Item::as_select())
            .load(&mut conn)?)
    }

    fn search_items(&self, search: &ItemSearch) -> StoreResult<Vec<Item>> {
        let mut conn = self.conn()?;
        let mut query = items::table.into_boxed();

        if let Some(ref q) = search.q {
            let pattern = format!("%{}%", escape_like(q));
            query = query.filter(items::name.ilike(pattern.clone()).or(items::description.ilike(pattern)));
        }
        if let Some(ref city) = search.city {
            // No wildcards left, so this is a case-insensitive equality.
            query = query.filter(items::city.ilike(escape_like(city)));
        }
        if let Some(category_id) = search.category_id {
            query = query.filter(items::category_id.eq(category_id));
        }
        if let Some(min) = search.min_price {
            query = query.filter(items::price_per_day.ge(min));
        }
        if let Some(max) = search.max_price {
            query = query.filter(items::price_per_day.le(max));
        }

        Ok(query
            .order((items::created_at.asc(), items::id.asc()))
            .offset(search.skip)
            .limit(search.limit)
            .select(Item::as_select())
            .load(&mut conn)?)
    }

    fn items_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Item>> {
        let mut conn = self.conn()?;
        Ok(items::table
            .filter(items::owner_id.eq(owner_id))
            .order((items::created_at.asc(), items::id.asc()))
            .select(Item::as_select())
            .load(&mut conn)?)
    }

    fn update_item(&self, id: Uuid, changes: &ItemChanges) -> StoreResult<Item> {
        let mut conn = self.conn()?;
        if changes.is_empty() {
            // Diesel rejects an empty changeset.
            return Ok(items::table.find(id).select(Item::as_select()).first(&mut conn)?);
        }
        Ok(diesel::update(items::table.find(id))
            .set(changes)
            .returning(Item::as_returning())
            .get_result(&mut conn)?)
    }

    fn delete_item(&self, id: Uuid) -> StoreResult<()> {
        let mut conn = self.conn()?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::delete(reviews::table.filter(reviews::item_id.eq(id))).execute(conn)?;
            let deleted = diesel::delete(items::table.find(id)).execute(conn)?;
            if deleted == 0 {
                return Err(diesel::result::Error::NotFound);
            }
            Ok(())
        })?;
        Ok(())
    }

    fn insert_booking(&self, new_booking: NewBooking) -> StoreResult<Booking> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(bookings::table)
            .values(&new_booking)
            .returning(Booking::as_returning())
            .get_result(&mut conn)?)
    }

    fn booking_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let mut conn = self.conn()?;
        Ok(bookings::table
            .find(id)
            .select(Booking::as_select())
            .first(&mut conn)
            .optional()?)
    }

    fn set_booking_status(&self, id: Uuid, status: BookingStatus) -> StoreResult<Booking> {
        let mut conn = self.conn()?;
        Ok(diesel::update(bookings::table.find(id))
            .set(bookings::status.eq(status))
            .returning(Booking::as_returning())
            .get_result(&mut conn)?)
    }

    fn bookings_by_renter(&self, renter_id: Uuid) -> StoreResult<Vec<Booking>> {
        let mut conn = self.conn()?;
        Ok(bookings::table
            .filter(bookings::renter_id.eq(renter_id))
            .order((bookings::created_at.asc(), bookings::id.asc()))
            .select(Booking::as_select())
            .load(&mut conn)?)
    }

    fn bookings_by_item_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Booking>> {
        let mut conn = self.conn()?;
        Ok(bookings::table
            .inner_join(items::table)
            .filter(items::owner_id.eq(owner_id))
            .order((bookings::created_at.asc(), bookings::id.asc()))
            .select(Booking::as_select())
            .load(&mut conn)?)
    }

    fn bookings_for_item(&self, item_id: Uuid, status: Option<BookingStatus>) -> StoreResult<Vec<Booking>> {
        let mut conn = self.conn()?;
        let mut query = bookings::table
            .filter(bookings::item_id.eq(item_id))
            .into_boxed();
        if let Some(status) = status {
            query = query.filter(bookings::status.eq(status));
        }
        Ok(query
            .order((bookings::created_at.asc(), bookings::id.asc()))
            .select(Booking::as_select())
            .load(&mut conn)?)
    }

    fn insert_review(&self, new_review: NewReview) -> StoreResult<Review> {
        let mut conn = self.conn()?;
        Ok(diesel::insert_into(reviews::table)
            .values(&new_review)
            .returning(Review::as_returning())
            .get_result(&mut conn)?)
    }

    fn reviews_for_item(&self, item_id: Uuid) -> StoreResult<Vec<Review>> {
        let mut conn = self.conn()?;
        Ok(reviews::table
            .filter(reviews::item_id.eq(item_id))
            .order((reviews::created_at.asc(), reviews::id.asc()))
            .select(Review::as_select())
            .load(&mut conn)?)
    }
}
