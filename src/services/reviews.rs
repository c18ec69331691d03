use super::error::ServiceError;
use super::items::fetch_item;
use crate::models::{CreateReviewRequest, NewReview, Review};
use crate::store::Store;
use uuid::Uuid;

pub const RATING_RANGE: std::ops::RangeInclusive<i32> = 1..=5;

pub fn create_review(
    store: &dyn Store,
    item_id: Uuid,
    author_id: Uuid,
    req: CreateReviewRequest,
) -> Result<Review, ServiceError> {
    fetch_item(store, item_id)?;
    if !RATING_RANGE.contains(&req.rating) {
        return Err(ServiceError::InvalidRequest(format!(
            "Rating must be between {} and {}",
            RATING_RANGE.start(),
            RATING_RANGE.end()
        )));
    }

    let review = store.insert_review(NewReview {
        item_id,
        user_id: author_id,
        rating: req.rating,
        comment: req.comment.filter(|c| !c.trim().is_empty()),
    })?;
    tracing::info!(review_id = %review.id, item_id = %item_id, rating = review.rating, "review posted");
    Ok(review)
}

pub fn list_reviews(store: &dyn Store, item_id: Uuid) -> Result<Vec<Review>, ServiceError> {
    fetch_item(store, item_id)?;
    Ok(store.reviews_for_item(item_id)?)
}
