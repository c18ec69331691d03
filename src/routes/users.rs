use super::paging;
use crate::models::{Item, LoginRequest, RegisterRequest, TokenResponse, UserInfo};
use crate::services::auth;
use crate::{ApiError, AuthenticatedUser, BearerToken, RentalApp};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post, routes, Route, State};
use uuid::Uuid;

#[post("/users", data = "<req>")]
pub async fn register(req: Json<RegisterRequest>, app: &State<RentalApp>) -> Result<(Status, Json<UserInfo>), ApiError> {
    let req = req.into_inner();
    let user = app.blocking(move |app| auth::register_user(app.store.as_ref(), &req)).await?;
    Ok((Status::Created, Json(user)))
}

#[get("/users?<skip>&<limit>")]
pub async fn list_users(
    skip: Option<i64>,
    limit: Option<i64>,
    app: &State<RentalApp>,
) -> Result<Json<Vec<UserInfo>>, ApiError> {
    let (skip, limit) = paging(skip, limit);
    let users = app.blocking(move |app| auth::list_users(app.store.as_ref(), skip, limit)).await?;
    Ok(Json(users))
}

#[get("/users/me")]
pub fn me(user: AuthenticatedUser) -> Json<UserInfo> {
    Json(user.0.into())
}

#[get("/users/<user_id>/items")]
pub async fn user_items(user_id: Uuid, app: &State<RentalApp>) -> Result<Json<Vec<Item>>, ApiError> {
    let items = app.blocking(move |app| auth::user_items(app.store.as_ref(), user_id)).await?;
    Ok(Json(items))
}

#[post("/login", data = "<req>")]
pub async fn login(req: Json<LoginRequest>, app: &State<RentalApp>) -> Result<Json<TokenResponse>, ApiError> {
    let req = req.into_inner();
    let token = app
        .blocking(move |app| auth::login_user(app.store.as_ref(), &req, app.session_ttl))
        .await?;
    Ok(Json(token))
}

#[post("/logout")]
pub async fn logout(token: Option<BearerToken>, app: &State<RentalApp>) -> Result<Status, ApiError> {
    if let Some(BearerToken(token)) = token {
        app.blocking(move |app| auth::logout_user(app.store.as_ref(), &token)).await?;
    }
    // Always NoContent, whether or not a session was found.
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![register, list_users, me, user_items, login, logout]
}
