//! Patient account entity and request types

use serde::{Deserialize, Serialize};

use super::common::{BloodGroup, Gender, Role};
use crate::types::{DatabaseError, DatabaseResult};
use crate::validation;

/// A registered patient. Donation-point operators and admins are patients
/// with a different role.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "id")]
    pub public_id: String,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub age: String,
    pub blood_group: Option<BloodGroup>,
    pub is_previously_diagnosed: bool,
    pub address: Option<String>,
    pub gender: Gender,
    pub phone_number: Option<String>,
    #[serde(skip)]
    pub reset_password_token: Option<String>,
    #[serde(skip)]
    pub reset_password_expire: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<Role>,
    #[serde(default)]
    pub age: String,
    pub blood_group: Option<BloodGroup>,
    #[serde(default)]
    pub is_previously_diagnosed: bool,
    pub address: Option<String>,
    pub gender: Option<Gender>,
    pub phone_number: Option<String>,
}

impl CreatePatientRequest {
    pub fn validate(&self) -> DatabaseResult<()> {
        validation::require(&self.name, "Please add a name")?;
        validation::email(&self.email)?;
        validation::password(&self.password)?;
        validation::require(&self.age, "Please type your age")?;
        if self.gender.is_none() {
            return Err(DatabaseError::validation("Please choose your gender"));
        }
        validation::phone_number(self.phone_number.as_deref(), 15)
    }
}

/// Partial update applied by admins and by `updatedetails`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub age: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub is_previously_diagnosed: Option<bool>,
    pub address: Option<String>,
    pub gender: Option<Gender>,
    pub phone_number: Option<String>,
}

impl UpdatePatientRequest {
    pub fn apply(&self, patient: &mut Patient) {
        if let Some(name) = &self.name {
            patient.name = name.clone();
        }
        if let Some(email) = &self.email {
            patient.email = email.clone();
        }
        if let Some(role) = self.role {
            patient.role = role;
        }
        if let Some(age) = &self.age {
            patient.age = age.clone();
        }
        if self.blood_group.is_some() {
            patient.blood_group = self.blood_group;
        }
        if let Some(flag) = self.is_previously_diagnosed {
            patient.is_previously_diagnosed = flag;
        }
        if self.address.is_some() {
            patient.address = self.address.clone();
        }
        if let Some(gender) = self.gender {
            patient.gender = gender;
        }
        if self.phone_number.is_some() {
            patient.phone_number = self.phone_number.clone();
        }
    }
}

impl Patient {
    pub fn validate(&self) -> DatabaseResult<()> {
        validation::require(&self.name, "Please add a name")?;
        validation::email(&self.email)?;
        validation::require(&self.age, "Please type your age")?;
        validation::phone_number(self.phone_number.as_deref(), 15)
    }
}
