//! Doctor account entity

use serde::{Deserialize, Serialize};

use super::common::{Gender, Role};
use crate::types::{DatabaseError, DatabaseResult};
use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "id")]
    pub public_id: String,
    pub role: Role,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub age: String,
    pub address: Option<String>,
    pub gender: Gender,
    pub qualification: String,
    pub phone_number: Option<String>,
    pub photo: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDoctorRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub age: String,
    pub address: Option<String>,
    pub gender: Option<Gender>,
    #[serde(default)]
    pub qualification: String,
    pub phone_number: Option<String>,
    pub photo: Option<String>,
}

impl CreateDoctorRequest {
    pub fn validate(&self) -> DatabaseResult<()> {
        validation::require(&self.name, "Please add a name")?;
        validation::email(&self.email)?;
        validation::password(&self.password)?;
        validation::require(&self.age, "Please type your age")?;
        if self.gender.is_none() {
            return Err(DatabaseError::validation("Please choose your gender"));
        }
        validation::require(&self.qualification, "Please enter your qualification")?;
        validation::phone_number(self.phone_number.as_deref(), 15)
    }
}
