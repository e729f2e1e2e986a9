//! Doctor repository for database operations.

use sqlx::SqlitePool;

use crate::entities::{new_public_id, timestamp_now, CreateDoctorRequest, Doctor, Role};
use crate::query::{ListParams, Page, SortFields};
use crate::types::{DatabaseError, DatabaseResult};

const SELECT_DOCTOR: &str = "SELECT id, public_id, role, name, email, password_hash, age, address, \
     gender, qualification, phone_number, photo, created_at FROM doctors";

pub const DOCTOR_SORT_FIELDS: SortFields = &[
    ("name", "name"),
    ("qualification", "qualification"),
    ("createdAt", "created_at"),
];

#[derive(Clone)]
pub struct DoctorRepository {
    pool: SqlitePool,
}

impl DoctorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Doctor>> {
        let doctor = sqlx::query_as::<_, Doctor>(&format!("{SELECT_DOCTOR} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doctor)
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Doctor>> {
        let doctor = sqlx::query_as::<_, Doctor>(&format!("{SELECT_DOCTOR} WHERE public_id = ?"))
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doctor)
    }

    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<Doctor>> {
        let doctor = sqlx::query_as::<_, Doctor>(&format!(
            "{SELECT_DOCTOR} WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doctor)
    }

    pub async fn create(
        &self,
        request: &CreateDoctorRequest,
        password_hash: &str,
    ) -> DatabaseResult<Doctor> {
        request.validate()?;
        let gender = request
            .gender
            .ok_or_else(|| DatabaseError::validation("Please choose your gender"))?;

        let result = sqlx::query(
            "INSERT INTO doctors (public_id, role, name, email, password_hash, age, address, \
             gender, qualification, phone_number, photo, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_public_id())
        .bind(Role::Doctor)
        .bind(request.name.trim())
        .bind(request.email.trim().to_lowercase())
        .bind(password_hash)
        .bind(request.age.trim())
        .bind(&request.address)
        .bind(gender)
        .bind(request.qualification.trim())
        .bind(&request.phone_number)
        .bind(&request.photo)
        .bind(timestamp_now())
        .execute(&self.pool)
        .await?;

        self.find_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| DatabaseError::QueryError("failed to retrieve created doctor".into()))
    }

    pub async fn list(&self, params: &ListParams) -> DatabaseResult<Page<Doctor>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM doctors")
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, Doctor>(&format!(
            "{SELECT_DOCTOR} ORDER BY {} LIMIT ? OFFSET ?",
            params.order_by
        ))
        .bind(i64::from(params.limit))
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, params))
    }

    /// Every doctor, alphabetically. Used for the chat inbox.
    pub async fn list_all(&self) -> DatabaseResult<Vec<Doctor>> {
        let doctors = sqlx::query_as::<_, Doctor>(&format!("{SELECT_DOCTOR} ORDER BY name ASC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(doctors)
    }
}
