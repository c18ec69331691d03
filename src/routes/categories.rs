use super::paging;
use crate::models::{Category, NewCategory};
use crate::services::categories;
use crate::{ApiError, RentalApp};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post, routes, Route, State};

#[post("/categories", data = "<req>")]
pub async fn create_category(
    req: Json<NewCategory>,
    app: &State<RentalApp>,
) -> Result<(Status, Json<Category>), ApiError> {
    let req = req.into_inner();
    let category = app
        .blocking(move |app| categories::create_category(app.store.as_ref(), req))
        .await?;
    Ok((Status::Created, Json(category)))
}

#[get("/categories?<skip>&<limit>")]
pub async fn list_categories(
    skip: Option<i64>,
    limit: Option<i64>,
    app: &State<RentalApp>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let (skip, limit) = paging(skip, limit);
    let list = app
        .blocking(move |app| categories::list_categories(app.store.as_ref(), skip, limit))
        .await?;
    Ok(Json(list))
}

pub fn routes() -> Vec<Route> {
    routes![create_category, list_categories]
}
