use super::paging;
use crate::models::{CreateItemRequest, CreateReviewRequest, Item, ItemChanges, ItemDetails, ItemSearch, Review};
use crate::services::error::ServiceError;
use crate::services::{items, reviews};
use crate::{ApiError, AuthenticatedUser, RentalApp};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{delete, get, post, put, routes, FromForm, Route, State};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(FromForm, Debug)]
pub struct SearchParams {
    q: Option<String>,
    city: Option<String>,
    category_id: Option<Uuid>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    skip: Option<i64>,
    limit: Option<i64>,
}

fn price_bound(name: &str, value: Option<f64>) -> Result<Option<Decimal>, ServiceError> {
    value
        .map(|v| Decimal::try_from(v).map_err(|_| ServiceError::InvalidRequest(format!("Invalid {}", name))))
        .transpose()
}

impl SearchParams {
    fn into_search(self) -> Result<ItemSearch, ServiceError> {
        let (skip, limit) = paging(self.skip, self.limit);
        Ok(ItemSearch {
            q: self.q.filter(|q| !q.trim().is_empty()),
            city: self.city.filter(|c| !c.trim().is_empty()),
            category_id: self.category_id,
            min_price: price_bound("min_price", self.min_price)?,
            max_price: price_bound("max_price", self.max_price)?,
            skip,
            limit,
        })
    }
}

#[post("/items", data = "<req>")]
pub async fn create_item(
    req: Json<CreateItemRequest>,
    app: &State<RentalApp>,
    user: AuthenticatedUser,
) -> Result<(Status, Json<ItemDetails>), ApiError> {
    let req = req.into_inner();
    let owner_id = user.id();
    let item = app
        .blocking(move |app| items::create_item(app.store.as_ref(), owner_id, req))
        .await?;
    Ok((Status::Created, Json(item)))
}

#[get("/items?<skip>&<limit>")]
pub async fn list_items(
    skip: Option<i64>,
    limit: Option<i64>,
    app: &State<RentalApp>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let (skip, limit) = paging(skip, limit);
    let list = app.blocking(move |app| items::list_items(app.store.as_ref(), skip, limit)).await?;
    Ok(Json(list))
}

#[get("/items/search?<params..>")]
pub async fn search_items(params: SearchParams, app: &State<RentalApp>) -> Result<Json<Vec<Item>>, ApiError> {
    let search = params.into_search()?;
    let found = app.blocking(move |app| items::search_items(app.store.as_ref(), &search)).await?;
    Ok(Json(found))
}

#[get("/items/<item_id>")]
pub async fn get_item(item_id: Uuid, app: &State<RentalApp>) -> Result<Json<ItemDetails>, ApiError> {
    let item = app.blocking(move |app| items::get_item(app.store.as_ref(), item_id)).await?;
    Ok(Json(item))
}

#[put("/items/<item_id>", data = "<changes>")]
pub async fn update_item(
    item_id: Uuid,
    changes: Json<ItemChanges>,
    app: &State<RentalApp>,
    user: AuthenticatedUser,
) -> Result<Json<ItemDetails>, ApiError> {
    let changes = changes.into_inner();
    let owner_id = user.id();
    let item = app
        .blocking(move |app| items::update_item(app.store.as_ref(), item_id, owner_id, changes))
        .await?;
    Ok(Json(item))
}

#[delete("/items/<item_id>")]
pub async fn delete_item(item_id: Uuid, app: &State<RentalApp>, user: AuthenticatedUser) -> Result<Status, ApiError> {
    let owner_id = user.id();
    app.blocking(move |app| items::delete_item(app.store.as_ref(), item_id, owner_id))
        .await?;
    Ok(Status::NoContent)
}

#[post("/items/<item_id>/reviews", data = "<req>")]
pub async fn create_review(
    item_id: Uuid,
    req: Json<CreateReviewRequest>,
    app: &State<RentalApp>,
    user: AuthenticatedUser,
) -> Result<(Status, Json<Review>), ApiError> {
    let req = req.into_inner();
    let author_id = user.id();
    let review = app
        .blocking(move |app| reviews::create_review(app.store.as_ref(), item_id, author_id, req))
        .await?;
    Ok((Status::Created, Json(review)))
}

#[get("/items/<item_id>/reviews")]
pub async fn list_reviews(item_id: Uuid, app: &State<RentalApp>) -> Result<Json<Vec<Review>>, ApiError> {
    let list = app.blocking(move |app| reviews::list_reviews(app.store.as_ref(), item_id)).await?;
    Ok(Json(list))
}

pub fn routes() -> Vec<Route> {
    routes![
        create_item,
        list_items,
        search_items,
        get_item,
        update_item,
        delete_item,
        create_review,
        list_reviews
    ]
}
