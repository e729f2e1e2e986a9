//! Review repository. Every write recomputes the reviewed point's average rating
//! inside the same transaction.

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::entities::{new_public_id, timestamp_now, CreateReviewRequest, Review, UpdateReviewRequest};
use crate::query::{ListParams, Page, SortFields};
use crate::types::{DatabaseError, DatabaseResult};

const SELECT_REVIEW: &str = "SELECT r.id, r.public_id, r.point_id, p.public_id AS point, \
     r.patient_id, pa.public_id AS patient, r.title, r.text, r.rating, r.created_at \
     FROM reviews r \
     JOIN points p ON p.id = r.point_id \
     JOIN patients pa ON pa.id = r.patient_id";

/// Binds: point id, point id. The average is NULL once no reviews remain.
pub(crate) const RECOMPUTE_AVERAGE: &str = "UPDATE points SET average_rating = \
     (SELECT AVG(rating) FROM reviews WHERE point_id = ?) WHERE id = ?";

pub const REVIEW_SORT_FIELDS: SortFields = &[
    ("title", "r.title"),
    ("rating", "r.rating"),
    ("createdAt", "r.created_at"),
];

#[derive(Clone)]
pub struct ReviewRepository {
    pool: SqlitePool,
}

async fn recompute_average(tx: &mut Transaction<'_, Sqlite>, point_id: i64) -> DatabaseResult<()> {
    sqlx::query(RECOMPUTE_AVERAGE)
        .bind(point_id)
        .bind(point_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

impl ReviewRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!("{SELECT_REVIEW} WHERE r.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Review>> {
        let review =
            sqlx::query_as::<_, Review>(&format!("{SELECT_REVIEW} WHERE r.public_id = ?"))
                .bind(public_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(review)
    }

    /// Insert a review. A second review of the same point by the same patient
    /// fails with [`DatabaseError::Duplicate`].
    pub async fn create(
        &self,
        point_id: i64,
        patient_id: i64,
        request: &CreateReviewRequest,
    ) -> DatabaseResult<Review> {
        request.validate()?;

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO reviews (public_id, point_id, patient_id, title, text, rating, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_public_id())
        .bind(point_id)
        .bind(patient_id)
        .bind(request.title.trim())
        .bind(request.text.trim())
        .bind(request.rating)
        .bind(timestamp_now())
        .execute(&mut *tx)
        .await?;
        recompute_average(&mut tx, point_id).await?;
        tx.commit().await?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| DatabaseError::QueryError("failed to retrieve created review".into()))
    }

    pub async fn list(&self, params: &ListParams) -> DatabaseResult<Page<Review>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews")
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, Review>(&format!(
            "{SELECT_REVIEW} ORDER BY {} LIMIT ? OFFSET ?",
            params.order_by
        ))
        .bind(i64::from(params.limit))
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, params))
    }

    pub async fn list_for_point(&self, point_id: i64) -> DatabaseResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "{SELECT_REVIEW} WHERE r.point_id = ? ORDER BY r.created_at, r.id"
        ))
        .bind(point_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }

    pub async fn update(&self, id: i64, request: &UpdateReviewRequest) -> DatabaseResult<Review> {
        let mut review = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("review {id}")))?;

        request.apply(&mut review);
        review.validate()?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE reviews SET title = ?, text = ?, rating = ? WHERE id = ?")
            .bind(&review.title)
            .bind(&review.text)
            .bind(review.rating)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        recompute_average(&mut tx, review.point_id).await?;
        tx.commit().await?;

        Ok(review)
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let Some(review) = self.find_by_id(id).await? else {
            return Ok(false);
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM reviews WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        recompute_average(&mut tx, review.point_id).await?;
        tx.commit().await?;
        Ok(true)
    }
}
