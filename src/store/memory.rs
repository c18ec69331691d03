use super::{Store, StoreError, StoreResult};
use crate::models::{
    Booking, BookingStatus, Category, Item, ItemChanges, ItemSearch, NewBooking, NewCategory, NewItem,
    NewReview, NewSession, NewUser, Review, Session, User,
};
use chrono::{Duration, NaiveDateTime, Utc};
use dashmap::DashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Process-local store. Nothing survives a restart.
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    sessions: DashMap<Uuid, Session>,
    categories: DashMap<Uuid, Category>,
    items: DashMap<Uuid, Item>,
    bookings: DashMap<Uuid, Booking>,
    reviews: DashMap<Uuid, Review>,
    // Strictly increasing, so `created_at` alone orders rows by insertion.
    clock: Mutex<NaiveDateTime>,
    // Held across uniqueness check and insert of users and categories.
    unique_writes: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            users: DashMap::new(),
            sessions: DashMap::new(),
            categories: DashMap::new(),
            items: DashMap::new(),
            bookings: DashMap::new(),
            reviews: DashMap::new(),
            clock: Mutex::new(NaiveDateTime::MIN),
            unique_writes: Mutex::new(()),
        }
    }

    fn now(&self) -> NaiveDateTime {
        let mut last = self.clock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Utc::now().naive_utc();
        *last = if now > *last { now } else { *last + Duration::microseconds(1) };
        *last
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn page<T>(mut rows: Vec<T>, skip: i64, limit: i64) -> Vec<T> {
    let skip = usize::try_from(skip).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    rows.drain(..skip.min(rows.len()));
    rows.truncate(limit);
    rows
}

fn collect_sorted<T: Clone, K: Ord>(map: &DashMap<Uuid, T>, filter: impl Fn(&T) -> bool, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut rows: Vec<T> = map
        .iter()
        .filter(|entry| filter(entry.value()))
        .map(|entry| entry.value().clone())
        .collect();
    rows.sort_by_key(|row| key(row));
    rows
}

impl Store for MemoryStore {
    fn insert_user(&self, new_user: NewUser<'_>) -> StoreResult<User> {
        let _guard = self.unique_writes.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.users.iter().any(|entry| entry.value().username == new_user.username) {
            return Err(StoreError::UniqueViolation("users_username_key".to_string()));
        }
        if self.users.iter().any(|entry| entry.value().email == new_user.email) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.to_string(),
            email: new_user.email.to_string(),
            full_name: new_user.full_name.map(str::to_string),
            password_hash: new_user.password_hash.to_string(),
            is_active: true,
            created_at: self.now(),
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    fn user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().username == username)
            .map(|entry| entry.value().clone()))
    }

    fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().email == email)
            .map(|entry| entry.value().clone()))
    }

    fn list_users(&self, skip: i64, limit: i64) -> StoreResult<Vec<User>> {
        let rows = collect_sorted(&self.users, |_| true, |user| user.created_at);
        Ok(page(rows, skip, limit))
    }

    fn insert_session(&self, new_session: NewSession) -> StoreResult<Session> {
        let session = Session {
            id: Uuid::new_v4(),
            user_id: new_session.user_id,
            created_at: self.now(),
            expires_at: new_session.expires_at,
        };
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    fn session_by_id(&self, id: Uuid) -> StoreResult<Option<Session>> {
        Ok(self.sessions.get(&id).map(|entry| entry.value().clone()))
    }

    fn delete_session(&self, id: Uuid) -> StoreResult<()> {
        self.sessions.remove(&id);
        Ok(())
    }

    fn insert_category(&self, new_category: NewCategory) -> StoreResult<Category> {
        let _guard = self.unique_writes.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if self.categories.iter().any(|entry| entry.value().name == new_category.name) {
            return Err(StoreError::UniqueViolation("categories_name_key".to_string()));
        }
        let category = Category {
            id: Uuid::new_v4(),
            name: new_category.name,
            description: new_category.description,
        };
        self.categories.insert(category.id, category.clone());
        Ok(category)
    }

    fn category_by_id(&self, id: Uuid) -> StoreResult<Option<Category>> {
        Ok(self.categories.get(&id).map(|entry| entry.value().clone()))
    }

    fn list_categories(&self, skip: i64, limit: i64) -> StoreResult<Vec<Category>> {
        let rows = collect_sorted(&self.categories, |_| true, |category| category.name.clone());
        Ok(page(rows, skip, limit))
    }

    fn insert_item(&self, new_item: NewItem) -> StoreResult<Item> {
        let item = Item {
            id: Uuid::new_v4(),
            owner_id: new_item.owner_id,
            category_id: new_item.category_id,
            name: new_item.name,
            description: new_item.description,
            price_per_day: new_item.price_per_day,
            is_available: true,
            image_url: new_item.image_url,
            address: new_item.address,
            city: new_item.city,
            state: new_item.state,
            zip_code: new_item.zip_code,
            available_from: new_item.available_from,
            available_to: new_item.available_to,
            availability_rule: new_item.availability_rule,
            disabled_dates: new_item.disabled_dates,
            created_at: self.now(),
        };
        self.items.insert(item.id, item.clone());
        Ok(item)
    }

    fn item_by_id(&self, id: Uuid) -> StoreResult<Option<Item>> {
        Ok(self.items.get(&id).map(|entry| entry.value().clone()))
    }

    fn list_items(&self, skip: i64, limit: i64) -> StoreResult<Vec<Item>> {
        let rows = collect_sorted(&self.items, |_| true, |item| item.created_at);
        Ok(page(rows, skip, limit))
    }

    fn search_items(&self, search: &ItemSearch) -> StoreResult<Vec<Item>> {
        let rows = collect_sorted(&self.items, |item| search.matches(item), |item| item.created_at);
        Ok(page(rows, search.skip, search.limit))
    }

    fn items_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Item>> {
        Ok(collect_sorted(&self.items, |item| item.owner_id == owner_id, |item| item.created_at))
    }

    fn update_item(&self, id: Uuid, changes: &ItemChanges) -> StoreResult<Item> {
        let mut entry = self.items.get_mut(&id).ok_or(StoreError::NotFound)?;
        let updated = changes.apply_to(entry.value());
        *entry.value_mut() = updated.clone();
        Ok(updated)
    }

    fn delete_item(&self, id: Uuid) -> StoreResult<()> {
        self.items.remove(&id).ok_or(StoreError::NotFound)?;
        self.reviews.retain(|_, review| review.item_id != id);
        Ok(())
    }

    fn insert_booking(&self, new_booking: NewBooking) -> StoreResult<Booking> {
        let booking = Booking {
            id: Uuid::new_v4(),
            item_id: new_booking.item_id,
            renter_id: new_booking.renter_id,
            start_date: new_booking.start_date,
            end_date: new_booking.end_date,
            total_price: new_booking.total_price,
            status: new_booking.status,
            created_at: self.now(),
        };
        self.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    fn booking_by_id(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|entry| entry.value().clone()))
    }

    fn set_booking_status(&self, id: Uuid, status: BookingStatus) -> StoreResult<Booking> {
        let mut entry = self.bookings.get_mut(&id).ok_or(StoreError::NotFound)?;
        entry.value_mut().status = status;
        Ok(entry.value().clone())
    }

    fn bookings_by_renter(&self, renter_id: Uuid) -> StoreResult<Vec<Booking>> {
        Ok(collect_sorted(&self.bookings, |booking| booking.renter_id == renter_id, |booking| booking.created_at))
    }

    fn bookings_by_item_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Booking>> {
        let owned: Vec<Uuid> = self
            .items
            .iter()
            .filter(|entry| entry.value().owner_id == owner_id)
            .map(|entry| *entry.key())
            .collect();
        Ok(collect_sorted(
            &self.bookings,
            |booking| owned.contains(&booking.item_id),
            |booking| booking.created_at,
        ))
    }

    fn bookings_for_item(&self, item_id: Uuid, status: Option<BookingStatus>) -> StoreResult<Vec<Booking>> {
        Ok(collect_sorted(
            &self.bookings,
            |booking| booking.item_id == item_id && status.map_or(true, |s| booking.status == s),
            |booking| booking.created_at,
        ))
    }

    fn insert_review(&self, new_review: NewReview) -> StoreResult<Review> {
        let review = Review {
            id: Uuid::new_v4(),
            item_id: new_review.item_id,
            user_id: new_review.user_id,
            rating: new_review.rating,
            comment: new_review.comment,
            created_at: self.now(),
        };
        self.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    fn reviews_for_item(&self, item_id: Uuid) -> StoreResult<Vec<Review>> {
        Ok(collect_sorted(&self.reviews, |review| review.item_id == item_id, |review| review.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn seed_item(store: &MemoryStore) -> Item {
        let owner = store
            .insert_user(NewUser {
                username: "owner",
                email: "owner@example.com",
                full_name: None,
                password_hash: "x",
            })
            .unwrap();
        let category = store
            .insert_category(NewCategory { name: "Tools".into(), description: None })
            .unwrap();
        store
            .insert_item(NewItem {
                owner_id: owner.id,
                category_id: category.id,
                name: "Drill".into(),
                description: "Cordless drill".into(),
                price_per_day: Decimal::new(1500, 2),
                image_url: None,
                address: None,
                city: Some("Austin".into()),
                state: None,
                zip_code: None,
                available_from: None,
                available_to: None,
                availability_rule: "all_days".into(),
                disabled_dates: vec![],
            })
            .unwrap()
    }

    #[test]
    fn duplicate_username_is_a_unique_violation() {
        let store = MemoryStore::new();
        let new_user = || NewUser {
            username: "sam",
            email: "sam@example.com",
            full_name: None,
            password_hash: "x",
        };
        store.insert_user(new_user()).unwrap();
        assert!(matches!(store.insert_user(new_user()), Err(StoreError::UniqueViolation(_))));
    }

    #[test]
    fn created_at_is_strictly_increasing() {
        let store = MemoryStore::new();
        let stamps: Vec<_> = (0..50).map(|_| store.now()).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn paging_skips_then_limits() {
        assert_eq!(page(vec![1, 2, 3, 4, 5], 1, 2), vec![2, 3]);
        assert_eq!(page(vec![1, 2], 5, 2), Vec::<i32>::new());
        assert_eq!(page(vec![1, 2], -1, 10), vec![1, 2]);
    }

    #[test]
    fn deleting_an_item_drops_its_reviews() {
        let store = MemoryStore::new();
        let item = seed_item(&store);
        store
            .insert_review(NewReview { item_id: item.id, user_id: item.owner_id, rating: 4, comment: None })
            .unwrap();
        store.delete_item(item.id).unwrap();
        assert!(store.item_by_id(item.id).unwrap().is_none());
        assert!(store.reviews_for_item(item.id).unwrap().is_empty());
    }

    #[test]
    fn search_filters_by_city_case_insensitively() {
        let store = MemoryStore::new();
        let item = seed_item(&store);
        let hits = store
            .search_items(&ItemSearch { city: Some("austin".into()), limit: 10, ..Default::default() })
            .unwrap();
        assert_eq!(hits, vec![item]);
        let misses = store
            .search_items(&ItemSearch { city: Some("Boston".into()), limit: 10, ..Default::default() })
            .unwrap();
        assert!(misses.is_empty());
    }

    #[test]
    fn concurrent_registrations_keep_usernames_unique() {
        let store = MemoryStore::new();
        let emails: Vec<String> = (0..16).map(|i| format!("sam{}@example.com", i)).collect();
        let inserted = std::thread::scope(|scope| {
            let handles: Vec<_> = emails
                .iter()
                .map(|email| {
                    let store = &store;
                    scope.spawn(move || {
                        store
                            .insert_user(NewUser {
                                username: "sam",
                                email: email.as_str(),
                                full_name: None,
                                password_hash: "x",
                            })
                            .is_ok()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count()
        });
        assert_eq!(inserted, 1);
        assert_eq!(store.list_users(0, 100).unwrap().len(), 1);
    }

    #[test]
    fn concurrent_category_creation_keeps_names_unique() {
        let store = MemoryStore::new();
        let inserted = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let store = &store;
                    scope.spawn(move || {
                        store
                            .insert_category(NewCategory { name: "Tools".into(), description: None })
                            .is_ok()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count()
        });
        assert_eq!(inserted, 1);
        assert_eq!(store.list_categories(0, 100).unwrap().len(), 1);
    }
}
