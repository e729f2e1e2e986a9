//! Donation point repository.

use sqlx::SqlitePool;

use crate::entities::{new_public_id, timestamp_now, CreatePointRequest, Point, UpdatePointRequest};
use crate::query::{ListParams, Page, SortFields};
use crate::types::{DatabaseError, DatabaseResult};

const SELECT_POINT: &str = "SELECT p.id, p.public_id, p.patient_id, pa.public_id AS patient, \
     p.name, p.description, p.address, p.latitude, p.longitude, p.phone, p.email, \
     p.average_rating, p.created_at \
     FROM points p JOIN patients pa ON pa.id = p.patient_id";

pub const POINT_SORT_FIELDS: SortFields = &[
    ("name", "p.name"),
    ("averageRating", "p.average_rating"),
    ("createdAt", "p.created_at"),
];

#[derive(Clone)]
pub struct PointRepository {
    pool: SqlitePool,
}

impl PointRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Point>> {
        let point = sqlx::query_as::<_, Point>(&format!("{SELECT_POINT} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(point)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Point>> {
        let point = sqlx::query_as::<_, Point>(&format!("{SELECT_POINT} WHERE p.public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(point)
    }

    pub async fn create(&self, patient_id: i64, request: &CreatePointRequest) -> DatabaseResult<Point> {
        request.validate()?;

        let result = sqlx::query(
            "INSERT INTO points (public_id, patient_id, name, description, address, latitude, \
             longitude, phone, email, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_public_id())
        .bind(patient_id)
        .bind(request.name.trim())
        .bind(request.description.trim())
        .bind(request.address.trim())
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(&request.phone)
        .bind(&request.email)
        .bind(timestamp_now())
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| DatabaseError::QueryError("failed to retrieve created point".into()))
    }

    pub async fn list(&self, params: &ListParams) -> DatabaseResult<Page<Point>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM points")
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, Point>(&format!(
            "{SELECT_POINT} ORDER BY {} LIMIT ? OFFSET ?",
            params.order_by
        ))
        .bind(i64::from(params.limit))
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, params))
    }

    /// Every point. The radius search filters these in memory.
    pub async fn list_all(&self) -> DatabaseResult<Vec<Point>> {
        let points = sqlx::query_as::<_, Point>(&format!("{SELECT_POINT} ORDER BY p.id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(points)
    }

    pub async fn update(&self, id: i64, request: &UpdatePointRequest) -> DatabaseResult<Point> {
        let mut point = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("point {id}")))?;

        request.apply(&mut point);
        point.validate()?;

        sqlx::query(
            "UPDATE points SET name = ?, description = ?, address = ?, latitude = ?, \
             longitude = ?, phone = ?, email = ? WHERE id = ?",
        )
        .bind(&point.name)
        .bind(&point.description)
        .bind(&point.address)
        .bind(point.latitude)
        .bind(point.longitude)
        .bind(&point.phone)
        .bind(&point.email)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(point)
    }

    /// Delete a point; its plasmas and reviews go with it.
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM points WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
