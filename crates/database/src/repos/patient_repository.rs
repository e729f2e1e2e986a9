//! Patient repository for database operations.

use sqlx::SqlitePool;

use crate::entities::{new_public_id, timestamp_now, CreatePatientRequest, Patient, Role, UpdatePatientRequest};
use crate::query::{ListParams, Page, SortFields};
use crate::types::{DatabaseError, DatabaseResult};

const SELECT_PATIENT: &str = "SELECT id, public_id, name, email, password_hash, role, age, blood_group, \
     is_previously_diagnosed, address, gender, phone_number, reset_password_token, \
     reset_password_expire, created_at FROM patients";

pub const PATIENT_SORT_FIELDS: SortFields = &[
    ("name", "name"),
    ("email", "email"),
    ("role", "role"),
    ("age", "age"),
    ("createdAt", "created_at"),
];

/// Repository for patient accounts
#[derive(Clone)]
pub struct PatientRepository {
    pool: SqlitePool,
}

impl PatientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Patient>> {
        let patient = sqlx::query_as::<_, Patient>(&format!("{SELECT_PATIENT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(patient)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Patient>> {
        let patient =
            sqlx::query_as::<_, Patient>(&format!("{SELECT_PATIENT} WHERE public_id = ?"))
                .bind(public_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(patient)
    }

    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Patient>> {
        let patient = sqlx::query_as::<_, Patient>(&format!(
            "{SELECT_PATIENT} WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(patient)
    }

    /// Insert a patient whose password has already been hashed.
    pub async fn create(
        &self,
        request: &CreatePatientRequest,
        password_hash: &str,
        role: Role,
    ) -> DatabaseResult<Patient> {
        request.validate()?;
        let gender = request
            .gender
            .ok_or_else(|| DatabaseError::validation("Please choose your gender"))?;

        let result = sqlx::query(
            "INSERT INTO patients (public_id, name, email, password_hash, role, age, blood_group, \
             is_previously_diagnosed, address, gender, phone_number, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_public_id())
        .bind(request.name.trim())
        .bind(request.email.trim().to_lowercase())
        .bind(password_hash)
        .bind(role)
        .bind(request.age.trim())
        .bind(request.blood_group)
        .bind(request.is_previously_diagnosed)
        .bind(&request.address)
        .bind(gender)
        .bind(&request.phone_number)
        .bind(timestamp_now())
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| DatabaseError::QueryError("failed to retrieve created patient".into()))
    }

    pub async fn list(&self, params: &ListParams) -> DatabaseResult<Page<Patient>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, Patient>(&format!(
            "{SELECT_PATIENT} ORDER BY {} LIMIT ? OFFSET ?",
            params.order_by
        ))
        .bind(i64::from(params.limit))
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, params))
    }

    pub async fn update(&self, id: i64, request: &UpdatePatientRequest) -> DatabaseResult<Patient> {
        let mut patient = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("patient {id}")))?;

        request.apply(&mut patient);
        patient.email = patient.email.trim().to_lowercase();
        patient.validate()?;

        sqlx::query(
            "UPDATE patients SET name = ?, email = ?, role = ?, age = ?, blood_group = ?, \
             is_previously_diagnosed = ?, address = ?, gender = ?, phone_number = ? WHERE id = ?",
        )
        .bind(&patient.name)
        .bind(&patient.email)
        .bind(patient.role)
        .bind(&patient.age)
        .bind(patient.blood_group)
        .bind(patient.is_previously_diagnosed)
        .bind(&patient.address)
        .bind(patient.gender)
        .bind(&patient.phone_number)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(patient)
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> DatabaseResult<()> {
        let result = sqlx::query(
            "UPDATE patients SET password_hash = ?, reset_password_token = NULL, \
             reset_password_expire = NULL WHERE id = ?",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found(format!("patient {id}")));
        }
        Ok(())
    }

    /// Store or clear the hashed reset token and its expiry timestamp.
    pub async fn set_reset_token(
        &self,
        id: i64,
        token: Option<(&str, &str)>,
    ) -> DatabaseResult<()> {
        let (hash, expire) = match token {
            Some((hash, expire)) => (Some(hash), Some(expire)),
            None => (None, None),
        };
        sqlx::query(
            "UPDATE patients SET reset_password_token = ?, reset_password_expire = ? WHERE id = ?",
        )
        .bind(hash)
        .bind(expire)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Find the patient holding a reset token that has not yet expired at `now`.
    pub async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: &str,
    ) -> DatabaseResult<Option<Patient>> {
        let patient = sqlx::query_as::<_, Patient>(&format!(
            "{SELECT_PATIENT} WHERE reset_password_token = ? AND reset_password_expire > ?"
        ))
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(patient)
    }

    /// Delete a patient together with their points, plasmas and reviews.
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Reviews owned by the patient on other owners' points change those averages.
        let touched: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT point_id FROM reviews WHERE patient_id = ?",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM patients WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        for point_id in touched {
            sqlx::query(super::review_repository::RECOMPUTE_AVERAGE)
                .bind(point_id)
                .bind(point_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
