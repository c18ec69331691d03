//! Booking lifecycle: creation with pricing, owner-gated status changes,
//! and the read models behind "my bookings" and the item calendar.
//!
//! Two bookings for overlapping dates on the same item are both accepted;
//! nothing here excludes date ranges. Only the item owner may change a
//! booking's status, the renter included.

use super::error::ServiceError;
use super::items::{fetch_item, resolve_item};
use crate::models::{
    amount_limit, Booking, BookingDetails, BookingStatus, ItemDetails, NewBooking, UserInfo, AMOUNT_SCALE,
    TOTAL_INTEGER_DIGITS,
};
use crate::notify::Notifier;
use crate::store::Store;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// How `update_status` treats the requested status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any status may be assigned from any status.
    #[default]
    Unconstrained,
    /// pending -> confirmed | cancelled, confirmed -> completed | cancelled;
    /// cancelled and completed are final.
    Strict,
}

impl TransitionPolicy {
    pub fn allows(&self, from: BookingStatus, to: BookingStatus) -> bool {
        match self {
            TransitionPolicy::Unconstrained => true,
            TransitionPolicy::Strict => from.can_transition_to(to),
        }
    }
}

/// Whole rental days between `start` and `end`, counting a partial day as a
/// full one. `None` unless `end` is strictly after `start`.
pub fn rental_days(start: NaiveDateTime, end: NaiveDateTime) -> Option<i64> {
    if end <= start {
        return None;
    }
    let seconds = (end - start).num_seconds();
    Some(((seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY).max(1))
}

/// `days * price_per_day`, or `None` when the product overflows or does not
/// fit the booking total column.
pub fn total_price(price_per_day: Decimal, days: i64) -> Option<Decimal> {
    price_per_day
        .checked_mul(Decimal::from(days))
        .map(|total| total.round_dp(AMOUNT_SCALE))
        .filter(|total| *total < amount_limit(TOTAL_INTEGER_DIGITS))
}

pub struct BookingManager {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    policy: TransitionPolicy,
}

impl BookingManager {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>, policy: TransitionPolicy) -> Self {
        BookingManager { store, notifier, policy }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    #[instrument(name = "bookings.create", skip(self))]
    pub fn create_booking(
        &self,
        item_id: Uuid,
        renter_id: Uuid,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
    ) -> Result<BookingDetails, ServiceError> {
        let item = fetch_item(self.store.as_ref(), item_id)?;
        if item.owner_id == renter_id {
            return Err(ServiceError::InvalidOperation("Cannot book your own item".to_string()));
        }
        let days = rental_days(start_date, end_date)
            .ok_or_else(|| ServiceError::InvalidRequest("End date must be after start date.".to_string()))?;
        let price = total_price(item.price_per_day, days).ok_or_else(|| {
            ServiceError::InvalidRequest("Total price exceeds the largest supported amount".to_string())
        })?;

        let booking = self.store.insert_booking(NewBooking {
            item_id,
            renter_id,
            start_date,
            end_date,
            total_price: price,
            status: BookingStatus::Pending,
        })?;
        info!(booking_id = %booking.id, days, total_price = %price, "booking requested");

        let item = resolve_item(self.store.as_ref(), item)?;
        let details = self.attach(booking, item)?;

        if let Err(e) = self.notifier.booking_requested(&details) {
            warn!(booking_id = %details.booking.id, error = %e, "booking request notification failed");
        }
        Ok(details)
    }

    #[instrument(name = "bookings.update_status", skip(self))]
    pub fn update_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
        acting_user_id: Uuid,
    ) -> Result<BookingDetails, ServiceError> {
        let booking = self
            .store
            .booking_by_id(booking_id)?
            .ok_or_else(|| ServiceError::NotFound("Booking not found".to_string()))?;
        let item = fetch_item(self.store.as_ref(), booking.item_id)?;
        if item.owner_id != acting_user_id {
            return Err(ServiceError::Forbidden("Not authorized to update this booking".to_string()));
        }
        if !self.policy.allows(booking.status, new_status) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot change booking status from {} to {}",
                booking.status, new_status
            )));
        }

        let previous = booking.status;
        let updated = self.store.set_booking_status(booking_id, new_status)?;
        info!(from = %previous, to = %new_status, "booking status changed");

        let item = resolve_item(self.store.as_ref(), item)?;
        let details = self.attach(updated, item)?;

        if new_status == BookingStatus::Confirmed {
            if let Err(e) = self.notifier.booking_approved(&details) {
                warn!(booking_id = %booking_id, error = %e, "booking approval notification failed");
            }
        }
        Ok(details)
    }

    #[instrument(name = "bookings.list_for_renter", skip(self))]
    pub fn list_for_renter(&self, renter_id: Uuid) -> Result<Vec<BookingDetails>, ServiceError> {
        let bookings = self.store.bookings_by_renter(renter_id)?;
        debug!(count = bookings.len(), "loaded renter bookings");
        self.resolve_all(bookings)
    }

    #[instrument(name = "bookings.list_for_owner", skip(self))]
    pub fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<BookingDetails>, ServiceError> {
        let bookings = self.store.bookings_by_item_owner(owner_id)?;
        debug!(count = bookings.len(), "loaded bookings on owned listings");
        self.resolve_all(bookings)
    }

    /// Confirmed bookings of one item, as used to grey out calendar dates.
    #[instrument(name = "bookings.list_confirmed_for_item", skip(self))]
    pub fn list_confirmed_for_item(&self, item_id: Uuid) -> Result<Vec<BookingDetails>, ServiceError> {
        let item = fetch_item(self.store.as_ref(), item_id)?;
        let bookings = self.store.bookings_for_item(item_id, Some(BookingStatus::Confirmed))?;
        if bookings.is_empty() {
            return Ok(Vec::new());
        }
        let item = resolve_item(self.store.as_ref(), item)?;
        bookings
            .into_iter()
            .map(|booking| self.attach(booking, item.clone()))
            .collect()
    }

    fn attach(&self, booking: Booking, item: ItemDetails) -> Result<BookingDetails, ServiceError> {
        let renter = self.store.user_by_id(booking.renter_id)?.ok_or_else(|| {
            ServiceError::InternalError(format!("Renter {} of booking {} is missing", booking.renter_id, booking.id))
        })?;
        Ok(BookingDetails {
            booking,
            item,
            renter: UserInfo::from(renter),
        })
    }

    fn resolve_all(&self, bookings: Vec<Booking>) -> Result<Vec<BookingDetails>, ServiceError> {
        let mut items: HashMap<Uuid, ItemDetails> = HashMap::new();
        let mut resolved = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let item = match items.get(&booking.item_id) {
                Some(item) => item.clone(),
                None => {
                    let item = resolve_item(self.store.as_ref(), fetch_item(self.store.as_ref(), booking.item_id)?)?;
                    items.insert(booking.item_id, item.clone());
                    item
                }
            };
            resolved.push(self.attach(booking, item)?);
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCategory, NewItem, NewUser, DEFAULT_AVAILABILITY_RULE};
    use crate::notify::EmailLogNotifier;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn partial_days_round_up() {
        assert_eq!(rental_days(at(1, 0), at(2, 12)), Some(2));
        assert_eq!(rental_days(at(1, 0), at(2, 0)), Some(1));
        assert_eq!(rental_days(at(1, 0), at(1, 1)), Some(1));
        assert_eq!(rental_days(at(1, 0), at(4, 0)), Some(3));
    }

    #[test]
    fn sub_second_ranges_still_cost_a_day() {
        let start = at(1, 0);
        let end = start + chrono::Duration::milliseconds(10);
        assert_eq!(rental_days(start, end), Some(1));
    }

    #[test]
    fn empty_or_inverted_ranges_are_rejected() {
        assert_eq!(rental_days(at(2, 0), at(1, 0)), None);
        assert_eq!(rental_days(at(1, 0), at(1, 0)), None);
    }

    #[test]
    fn price_is_days_times_rate() {
        assert_eq!(total_price(dec!(100.00), 2), Some(dec!(200)));
        assert_eq!(total_price(dec!(19.99), 3), Some(dec!(59.97)));
    }

    #[test]
    fn oversized_totals_are_refused() {
        assert_eq!(total_price(Decimal::MAX, 2), None);
        assert_eq!(total_price(dec!(50000000000000000000000000000), 2), None);
        assert_eq!(total_price(dec!(9999999999.99), 100), Some(dec!(999999999999)));
        assert_eq!(total_price(dec!(9999999999.99), 101), None);
    }

    #[test]
    fn unconstrained_policy_allows_anything() {
        let policy = TransitionPolicy::default();
        assert_eq!(policy, TransitionPolicy::Unconstrained);
        assert!(policy.allows(BookingStatus::Completed, BookingStatus::Pending));
        assert!(!TransitionPolicy::Strict.allows(BookingStatus::Completed, BookingStatus::Pending));
    }

    #[test]
    fn booking_an_item_with_an_unrepresentable_total_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let owner = store
            .insert_user(NewUser {
                username: "owner",
                email: "owner@example.com",
                full_name: None,
                password_hash: "x",
            })
            .unwrap();
        let renter = store
            .insert_user(NewUser {
                username: "renter",
                email: "renter@example.com",
                full_name: None,
                password_hash: "x",
            })
            .unwrap();
        let category = store
            .insert_category(NewCategory { name: "Tools".into(), description: None })
            .unwrap();
        // Written straight to the store, bypassing item validation
        let item = store
            .insert_item(NewItem {
                owner_id: owner.id,
                category_id: category.id,
                name: "Gold drill".into(),
                description: "Priceless".into(),
                price_per_day: dec!(50000000000000000000000000000),
                image_url: None,
                address: None,
                city: None,
                state: None,
                zip_code: None,
                available_from: None,
                available_to: None,
                availability_rule: DEFAULT_AVAILABILITY_RULE.into(),
                disabled_dates: Vec::new(),
            })
            .unwrap();

        let manager = BookingManager::new(store.clone(), Arc::new(EmailLogNotifier), TransitionPolicy::default());
        let err = manager.create_booking(item.id, renter.id, at(1, 0), at(3, 0)).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
        assert!(store.bookings_by_renter(renter.id).unwrap().is_empty());
    }
}
