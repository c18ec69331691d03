use super::error::ServiceError;
use crate::models::{
    amount_limit, CreateItemRequest, Item, ItemChanges, ItemDetails, ItemSearch, NewItem, UserInfo, AMOUNT_SCALE,
    DEFAULT_AVAILABILITY_RULE, PRICE_INTEGER_DIGITS,
};
use crate::store::Store;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

pub(crate) fn fetch_item(store: &dyn Store, item_id: Uuid) -> Result<Item, ServiceError> {
    store
        .item_by_id(item_id)?
        .ok_or_else(|| ServiceError::NotFound("Item not found".to_string()))
}

/// Attaches the owner and category to an item for response shaping.
pub(crate) fn resolve_item(store: &dyn Store, item: Item) -> Result<ItemDetails, ServiceError> {
    let owner = store.user_by_id(item.owner_id)?.ok_or_else(|| {
        ServiceError::InternalError(format!("Owner {} of item {} is missing", item.owner_id, item.id))
    })?;
    let category = store.category_by_id(item.category_id)?.ok_or_else(|| {
        ServiceError::InternalError(format!("Category {} of item {} is missing", item.category_id, item.id))
    })?;
    Ok(ItemDetails {
        item,
        owner: UserInfo::from(owner),
        category,
    })
}

fn validate(
    name: &str,
    price_per_day: Decimal,
    available_from: Option<NaiveDate>,
    available_to: Option<NaiveDate>,
) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::InvalidRequest("Item name must not be empty".to_string()));
    }
    if price_per_day <= Decimal::ZERO {
        return Err(ServiceError::InvalidRequest("Price per day must be positive".to_string()));
    }
    if price_per_day >= amount_limit(PRICE_INTEGER_DIGITS) {
        return Err(ServiceError::InvalidRequest(format!(
            "Price per day must be below {}",
            amount_limit(PRICE_INTEGER_DIGITS)
        )));
    }
    if let (Some(from), Some(to)) = (available_from, available_to) {
        if from > to {
            return Err(ServiceError::InvalidRequest(
                "available_from must not be after available_to".to_string(),
            ));
        }
    }
    Ok(())
}

fn ensure_category(store: &dyn Store, category_id: Uuid) -> Result<(), ServiceError> {
    match store.category_by_id(category_id)? {
        Some(_) => Ok(()),
        None => Err(ServiceError::NotFound("Category not found".to_string())),
    }
}

pub fn create_item(store: &dyn Store, owner_id: Uuid, req: CreateItemRequest) -> Result<ItemDetails, ServiceError> {
    ensure_category(store, req.category_id)?;

    let new_item = NewItem {
        owner_id,
        category_id: req.category_id,
        name: req.name.trim().to_string(),
        description: req.description,
        price_per_day: req.price_per_day.round_dp(AMOUNT_SCALE),
        image_url: req.image_url,
        address: req.address,
        city: req.city,
        state: req.state,
        zip_code: req.zip_code,
        available_from: req.available_from,
        available_to: req.available_to,
        availability_rule: req
            .availability_rule
            .unwrap_or_else(|| DEFAULT_AVAILABILITY_RULE.to_string()),
        disabled_dates: req.disabled_dates,
    };

    validate(
        &new_item.name,
        new_item.price_per_day,
        new_item.available_from,
        new_item.available_to,
    )?;

    let item = store.insert_item(new_item)?;
    tracing::info!(item_id = %item.id, owner_id = %owner_id, "item listed");
    resolve_item(store, item)
}

pub fn list_items(store: &dyn Store, skip: i64, limit: i64) -> Result<Vec<Item>, ServiceError> {
    Ok(store.list_items(skip, limit)?)
}

pub fn search_items(store: &dyn Store, search: &ItemSearch) -> Result<Vec<Item>, ServiceError> {
    if let (Some(min), Some(max)) = (search.min_price, search.max_price) {
        if min > max {
            return Err(ServiceError::InvalidRequest("min_price must not exceed max_price".to_string()));
        }
    }
    Ok(store.search_items(search)?)
}

pub fn get_item(store: &dyn Store, item_id: Uuid) -> Result<ItemDetails, ServiceError> {
    let item = fetch_item(store, item_id)?;
    resolve_item(store, item)
}

pub fn update_item(
    store: &dyn Store,
    item_id: Uuid,
    current_user_id: Uuid,
    mut changes: ItemChanges,
) -> Result<ItemDetails, ServiceError> {
    let item = fetch_item(store, item_id)?;
    if item.owner_id != current_user_id {
        return Err(ServiceError::Forbidden("Not authorized to update this item".to_string()));
    }
    if let Some(category_id) = changes.category_id {
        ensure_category(store, category_id)?;
    }
    changes.name = changes.name.map(|name| name.trim().to_string());
    changes.price_per_day = changes.price_per_day.map(|price| price.round_dp(AMOUNT_SCALE));
    let merged = changes.apply_to(&item);
    validate(&merged.name, merged.price_per_day, merged.available_from, merged.available_to)?;

    let updated = store.update_item(item_id, &changes)?;
    tracing::info!(item_id = %item_id, "item updated");
    resolve_item(store, updated)
}

pub fn delete_item(store: &dyn Store, item_id: Uuid, current_user_id: Uuid) -> Result<(), ServiceError> {
    let item = fetch_item(store, item_id)?;
    if item.owner_id != current_user_id {
        return Err(ServiceError::Forbidden("Not authorized to delete this item".to_string()));
    }
    if !store.bookings_for_item(item_id, None)?.is_empty() {
        return Err(ServiceError::Conflict("Item has bookings and cannot be deleted".to_string()));
    }
    store.delete_item(item_id)?;
    tracing::info!(item_id = %item_id, "item deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCategory, NewUser};
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn seed(store: &MemoryStore) -> (Uuid, Uuid) {
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
        (owner.id, category.id)
    }

    fn request(category_id: Uuid, name: &str, price: Decimal) -> CreateItemRequest {
        CreateItemRequest {
            name: name.to_string(),
            description: "Cordless".to_string(),
            price_per_day: price,
            category_id,
            image_url: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            available_from: None,
            available_to: None,
            availability_rule: None,
            disabled_dates: Vec::new(),
        }
    }

    #[test]
    fn price_must_fit_the_price_column() {
        let store = MemoryStore::new();
        let (owner, category) = seed(&store);

        let err = create_item(&store, owner, request(category, "Drill", dec!(50000000000000000000000000000)))
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
        let err = create_item(&store, owner, request(category, "Drill", dec!(10000000000))).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));

        let item = create_item(&store, owner, request(category, "Drill", dec!(9999999999.994))).unwrap();
        assert_eq!(item.item.price_per_day, dec!(9999999999.99));
        assert!(store.list_items(0, 10).unwrap().len() == 1);
    }

    #[test]
    fn update_rejects_oversized_price() {
        let store = MemoryStore::new();
        let (owner, category) = seed(&store);
        let item = create_item(&store, owner, request(category, "Drill", dec!(10))).unwrap();

        let changes = ItemChanges {
            price_per_day: Some(dec!(10000000000)),
            ..Default::default()
        };
        let err = update_item(&store, item.item.id, owner, changes).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
        assert_eq!(fetch_item(&store, item.item.id).unwrap().price_per_day, dec!(10));
    }

    #[test]
    fn update_trims_the_name() {
        let store = MemoryStore::new();
        let (owner, category) = seed(&store);
        let item = create_item(&store, owner, request(category, "  Drill  ", dec!(10))).unwrap();
        assert_eq!(item.item.name, "Drill");

        let changes = ItemChanges {
            name: Some("  Hammer drill  ".to_string()),
            ..Default::default()
        };
        let updated = update_item(&store, item.item.id, owner, changes).unwrap();
        assert_eq!(updated.item.name, "Hammer drill");
        assert_eq!(fetch_item(&store, item.item.id).unwrap().name, "Hammer drill");
    }
}
