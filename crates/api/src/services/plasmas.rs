use carelink_database::{
    CreatePlasmaRequest, ListParams, ListQuery, Page, Patient, Plasma, PlasmaRepository,
    UpdatePlasmaRequest, PLASMA_SORT_FIELDS,
};
use sqlx::SqlitePool;

use super::error::ServiceError;
use super::points::{ensure_owner, find_point};

const DEFAULT_ORDER: &str = "pl.created_at DESC, pl.id DESC";

pub async fn find_plasma(pool: &SqlitePool, public_id: &str) -> Result<Plasma, ServiceError> {
    PlasmaRepository::new(pool.clone())
        .find_by_public_id(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("No plasma with the id of {public_id}")))
}

pub async fn list_plasmas(
    pool: &SqlitePool,
    query: &ListQuery,
) -> Result<Page<Plasma>, ServiceError> {
    let params = ListParams::resolve(query, PLASMA_SORT_FIELDS, DEFAULT_ORDER)?;
    Ok(PlasmaRepository::new(pool.clone()).list(&params).await?)
}

pub async fn list_for_point(
    pool: &SqlitePool,
    point_public_id: &str,
) -> Result<Vec<Plasma>, ServiceError> {
    let point = find_point(pool, point_public_id).await?;
    Ok(PlasmaRepository::new(pool.clone())
        .list_for_point(point.id)
        .await?)
}

/// Only the point's owner (or an admin) lists plasma at a point.
pub async fn create_plasma(
    pool: &SqlitePool,
    patient: &Patient,
    point_public_id: &str,
    req: &CreatePlasmaRequest,
) -> Result<Plasma, ServiceError> {
    let point = find_point(pool, point_public_id).await?;
    ensure_owner(patient, point.patient_id, "add a plasma to", "point")?;
    let plasma = PlasmaRepository::new(pool.clone())
        .create(point.id, patient.id, req)
        .await?;
    tracing::info!(plasma = %plasma.public_id, point = %point.public_id, "plasma listed");
    Ok(plasma)
}

pub async fn update_plasma(
    pool: &SqlitePool,
    patient: &Patient,
    public_id: &str,
    req: &UpdatePlasmaRequest,
) -> Result<Plasma, ServiceError> {
    let plasma = find_plasma(pool, public_id).await?;
    ensure_owner(patient, plasma.patient_id, "update", "plasma")?;
    Ok(PlasmaRepository::new(pool.clone())
        .update(plasma.id, req)
        .await?)
}

pub async fn delete_plasma(
    pool: &SqlitePool,
    patient: &Patient,
    public_id: &str,
) -> Result<(), ServiceError> {
    let plasma = find_plasma(pool, public_id).await?;
    ensure_owner(patient, plasma.patient_id, "delete", "plasma")?;
    PlasmaRepository::new(pool.clone()).delete(plasma.id).await?;
    Ok(())
}
