use super::error::ServiceError;
use crate::models::{Category, NewCategory};
use crate::store::{Store, StoreError};

pub fn create_category(store: &dyn Store, req: NewCategory) -> Result<Category, ServiceError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ServiceError::InvalidRequest("Category name must not be empty".to_string()));
    }

    let category = store
        .insert_category(NewCategory { name, description: req.description })
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => ServiceError::Conflict("Category already exists".to_string()),
            other => other.into(),
        })?;

    tracing::info!(category_id = %category.id, name = %category.name, "category created");
    Ok(category)
}

pub fn list_categories(store: &dyn Store, skip: i64, limit: i64) -> Result<Vec<Category>, ServiceError> {
    Ok(store.list_categories(skip, limit)?)
}
