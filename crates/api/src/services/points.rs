use carelink_database::{
    CreatePointRequest, ListParams, ListQuery, Page, Patient, Point, PointRepository, Role,
    UpdatePointRequest, POINT_SORT_FIELDS,
};
use sqlx::SqlitePool;

use super::error::ServiceError;
use super::geo;

const DEFAULT_ORDER: &str = "p.created_at DESC, p.id DESC";

/// Owners act on their own records; admins act on everyone's.
pub fn ensure_owner(
    patient: &Patient,
    owner_id: i64,
    action: &str,
    what: &str,
) -> Result<(), ServiceError> {
    if patient.id == owner_id || patient.role == Role::Admin {
        return Ok(());
    }
    Err(ServiceError::unauthorized(format!(
        "User {} is not authorized to {action} this {what}",
        patient.public_id
    )))
}

pub async fn find_point(pool: &SqlitePool, public_id: &str) -> Result<Point, ServiceError> {
    PointRepository::new(pool.clone())
        .find_by_public_id(public_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("Point not found with id of {public_id}")))
}

pub async fn list_points(pool: &SqlitePool, query: &ListQuery) -> Result<Page<Point>, ServiceError> {
    let params = ListParams::resolve(query, POINT_SORT_FIELDS, DEFAULT_ORDER)?;
    Ok(PointRepository::new(pool.clone()).list(&params).await?)
}

pub async fn create_point(
    pool: &SqlitePool,
    owner: &Patient,
    req: &CreatePointRequest,
) -> Result<Point, ServiceError> {
    let point = PointRepository::new(pool.clone()).create(owner.id, req).await?;
    tracing::info!(point = %point.public_id, owner = %owner.public_id, "point created");
    Ok(point)
}

pub async fn update_point(
    pool: &SqlitePool,
    patient: &Patient,
    public_id: &str,
    req: &UpdatePointRequest,
) -> Result<Point, ServiceError> {
    let point = find_point(pool, public_id).await?;
    ensure_owner(patient, point.patient_id, "update", "point")?;
    Ok(PointRepository::new(pool.clone()).update(point.id, req).await?)
}

pub async fn delete_point(
    pool: &SqlitePool,
    patient: &Patient,
    public_id: &str,
) -> Result<(), ServiceError> {
    let point = find_point(pool, public_id).await?;
    ensure_owner(patient, point.patient_id, "delete", "point")?;
    PointRepository::new(pool.clone()).delete(point.id).await?;
    tracing::info!(point = %point.public_id, "point deleted");
    Ok(())
}

/// Points within `distance` miles of the given coordinates, nearest first.
pub async fn points_within_radius(
    pool: &SqlitePool,
    lat: f64,
    lng: f64,
    distance: f64,
) -> Result<Vec<Point>, ServiceError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(ServiceError::bad_request("Please provide valid coordinates"));
    }
    if !distance.is_finite() || distance < 0.0 {
        return Err(ServiceError::bad_request("Please provide a positive distance"));
    }

    let mut nearby: Vec<(f64, Point)> = PointRepository::new(pool.clone())
        .list_all()
        .await?
        .into_iter()
        .map(|point| (geo::distance_miles(lat, lng, point.latitude, point.longitude), point))
        .filter(|(miles, _)| *miles <= distance)
        .collect();
    nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

    Ok(nearby.into_iter().map(|(_, point)| point).collect())
}
