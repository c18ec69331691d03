use crate::models::{BookingDetails, BookingStatusUpdate, CreateBookingRequest};
use crate::{ApiError, AuthenticatedUser, RentalApp};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post, put, routes, Route, State};
use uuid::Uuid;

#[post("/items/<item_id>/bookings", data = "<req>")]
pub async fn create_booking(
    item_id: Uuid,
    req: Json<CreateBookingRequest>,
    app: &State<RentalApp>,
    user: AuthenticatedUser,
) -> Result<(Status, Json<BookingDetails>), ApiError> {
    let CreateBookingRequest { start_date, end_date } = req.into_inner();
    let renter_id = user.id();
    let booking = app
        .blocking(move |app| app.bookings.create_booking(item_id, renter_id, start_date, end_date))
        .await?;
    Ok((Status::Created, Json(booking)))
}

// Confirmed bookings only; feeds the item's availability calendar
#[get("/items/<item_id>/bookings")]
pub async fn item_bookings(item_id: Uuid, app: &State<RentalApp>) -> Result<Json<Vec<BookingDetails>>, ApiError> {
    let bookings = app
        .blocking(move |app| app.bookings.list_confirmed_for_item(item_id))
        .await?;
    Ok(Json(bookings))
}

#[get("/my-bookings")]
pub async fn my_bookings(
    app: &State<RentalApp>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<BookingDetails>>, ApiError> {
    let renter_id = user.id();
    let bookings = app.blocking(move |app| app.bookings.list_for_renter(renter_id)).await?;
    Ok(Json(bookings))
}

#[get("/my-listings/bookings")]
pub async fn my_listing_bookings(
    app: &State<RentalApp>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<BookingDetails>>, ApiError> {
    let owner_id = user.id();
    let bookings = app.blocking(move |app| app.bookings.list_for_owner(owner_id)).await?;
    Ok(Json(bookings))
}

#[put("/bookings/<booking_id>", data = "<update>")]
pub async fn update_booking_status(
    booking_id: Uuid,
    update: Json<BookingStatusUpdate>,
    app: &State<RentalApp>,
    user: AuthenticatedUser,
) -> Result<Json<BookingDetails>, ApiError> {
    let status = update.status;
    let acting_user_id = user.id();
    let booking = app
        .blocking(move |app| app.bookings.update_status(booking_id, status, acting_user_id))
        .await?;
    Ok(Json(booking))
}

pub fn routes() -> Vec<Route> {
    routes![create_booking, item_bookings, my_bookings, my_listing_bookings, update_booking_status]
}
