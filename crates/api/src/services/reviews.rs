use carelink_database::{
    CreateReviewRequest, ListParams, ListQuery, Page, Patient, Review, ReviewRepository,
    UpdateReviewRequest, REVIEW_SORT_FIELDS,
};
use sqlx::SqlitePool;

use super::error::ServiceError;
use super::points::{ensure_owner, find_point};

const DEFAULT_ORDER: &str = "r.created_at DESC, r.id DESC";

pub async fn find_review(pool: &SqlitePool, public_id: &str) -> Result<Review, ServiceError> {
    ReviewRepository::new(pool.clone())
        .find_by_public_id(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("No review found with the id of {public_id}")))
}

pub async fn list_reviews(
    pool: &SqlitePool,
    query: &ListQuery,
) -> Result<Page<Review>, ServiceError> {
    let params = ListParams::resolve(query, REVIEW_SORT_FIELDS, DEFAULT_ORDER)?;
    Ok(ReviewRepository::new(pool.clone()).list(&params).await?)
}

pub async fn list_for_point(
    pool: &SqlitePool,
    point_public_id: &str,
) -> Result<Vec<Review>, ServiceError> {
    let point = find_point(pool, point_public_id).await?;
    Ok(ReviewRepository::new(pool.clone())
        .list_for_point(point.id)
        .await?)
}

/// One review per patient per point; a second attempt is a duplicate.
pub async fn create_review(
    pool: &SqlitePool,
    patient: &Patient,
    point_public_id: &str,
    req: &CreateReviewRequest,
) -> Result<Review, ServiceError> {
    let point = find_point(pool, point_public_id).await?;
    let review = ReviewRepository::new(pool.clone())
        .create(point.id, patient.id, req)
        .await?;
    tracing::info!(review = %review.public_id, point = %point.public_id, "review added");
    Ok(review)
}

pub async fn update_review(
    pool: &SqlitePool,
    patient: &Patient,
    public_id: &str,
    req: &UpdateReviewRequest,
) -> Result<Review, ServiceError> {
    let review = find_review(pool, public_id).await?;
    ensure_owner(patient, review.patient_id, "update", "review")?;
    Ok(ReviewRepository::new(pool.clone())
        .update(review.id, req)
        .await?)
}

pub async fn delete_review(
    pool: &SqlitePool,
    patient: &Patient,
    public_id: &str,
) -> Result<(), ServiceError> {
    let review = find_review(pool, public_id).await?;
    ensure_owner(patient, review.patient_id, "delete", "review")?;
    ReviewRepository::new(pool.clone()).delete(review.id).await?;
    Ok(())
}
