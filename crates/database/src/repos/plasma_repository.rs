//! Plasma offer repository.

use sqlx::SqlitePool;

use crate::entities::{new_public_id, timestamp_now, CreatePlasmaRequest, Plasma, UpdatePlasmaRequest};
use crate::query::{ListParams, Page, SortFields};
use crate::types::{DatabaseError, DatabaseResult};

const SELECT_PLASMA: &str = "SELECT pl.id, pl.public_id, pl.point_id, p.public_id AS point, \
     pl.patient_id, pa.public_id AS patient, pl.title, pl.description, pl.blood_group, \
     pl.quantity_ml, pl.available, pl.created_at \
     FROM plasmas pl \
     JOIN points p ON p.id = pl.point_id \
     JOIN patients pa ON pa.id = pl.patient_id";

pub const PLASMA_SORT_FIELDS: SortFields = &[
    ("title", "pl.title"),
    ("bloodGroup", "pl.blood_group"),
    ("quantityMl", "pl.quantity_ml"),
    ("createdAt", "pl.created_at"),
];

#[derive(Clone)]
pub struct PlasmaRepository {
    pool: SqlitePool,
}

impl PlasmaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Plasma>> {
        let plasma = sqlx::query_as::<_, Plasma>(&format!("{SELECT_PLASMA} WHERE pl.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(plasma)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Plasma>> {
        let plasma =
            sqlx::query_as::<_, Plasma>(&format!("{SELECT_PLASMA} WHERE pl.public_id = ?"))
                .bind(public_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(plasma)
    }

    pub async fn create(
        &self,
        point_id: i64,
        patient_id: i64,
        request: &CreatePlasmaRequest,
    ) -> DatabaseResult<Plasma> {
        request.validate()?;

        let result = sqlx::query(
            "INSERT INTO plasmas (public_id, point_id, patient_id, title, description, \
             blood_group, quantity_ml, available, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_public_id())
        .bind(point_id)
        .bind(patient_id)
        .bind(request.title.trim())
        .bind(request.description.trim())
        .bind(request.blood_group)
        .bind(request.quantity_ml)
        .bind(request.available.unwrap_or(true))
        .bind(timestamp_now())
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| DatabaseError::QueryError("failed to retrieve created plasma".into()))
    }

    pub async fn list(&self, params: &ListParams) -> DatabaseResult<Page<Plasma>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM plasmas")
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, Plasma>(&format!(
            "{SELECT_PLASMA} ORDER BY {} LIMIT ? OFFSET ?",
            params.order_by
        ))
        .bind(i64::from(params.limit))
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, params))
    }

    pub async fn list_for_point(&self, point_id: i64) -> DatabaseResult<Vec<Plasma>> {
        let plasmas = sqlx::query_as::<_, Plasma>(&format!(
            "{SELECT_PLASMA} WHERE pl.point_id = ? ORDER BY pl.created_at, pl.id"
        ))
        .bind(point_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(plasmas)
    }

    pub async fn update(&self, id: i64, request: &UpdatePlasmaRequest) -> DatabaseResult<Plasma> {
        let mut plasma = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("plasma {id}")))?;

        request.apply(&mut plasma);
        plasma.validate()?;

        sqlx::query(
            "UPDATE plasmas SET title = ?, description = ?, blood_group = ?, quantity_ml = ?, \
             available = ? WHERE id = ?",
        )
        .bind(&plasma.title)
        .bind(&plasma.description)
        .bind(plasma.blood_group)
        .bind(plasma.quantity_ml)
        .bind(plasma.available)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(plasma)
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM plasmas WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
