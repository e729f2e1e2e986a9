//! Plasma donation offers attached to a donation point

use serde::{Deserialize, Serialize};

use super::common::BloodGroup;
use crate::types::{DatabaseError, DatabaseResult};
use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Plasma {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "id")]
    pub public_id: String,
    #[serde(skip)]
    pub point_id: i64,
    pub point: String,
    #[serde(skip)]
    pub patient_id: i64,
    pub patient: String,
    pub title: String,
    pub description: String,
    pub blood_group: BloodGroup,
    pub quantity_ml: i64,
    pub available: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlasmaRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub blood_group: Option<BloodGroup>,
    pub quantity_ml: Option<i64>,
    pub available: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlasmaRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub blood_group: Option<BloodGroup>,
    pub quantity_ml: Option<i64>,
    pub available: Option<bool>,
}

fn validate_fields(title: &str, description: &str, quantity_ml: i64) -> DatabaseResult<()> {
    validation::require(title, "Please add a title")?;
    validation::max_chars(title, 100, "Title can not be more than 100 characters")?;
    validation::require(description, "Please add a description")?;
    if quantity_ml <= 0 {
        return Err(DatabaseError::validation("Quantity must be greater than zero"));
    }
    Ok(())
}

impl CreatePlasmaRequest {
    pub fn validate(&self) -> DatabaseResult<()> {
        if self.blood_group.is_none() {
            return Err(DatabaseError::validation("Please add a blood group"));
        }
        let quantity = self
            .quantity_ml
            .ok_or_else(|| DatabaseError::validation("Please add a quantity"))?;
        validate_fields(&self.title, &self.description, quantity)
    }
}

impl UpdatePlasmaRequest {
    pub fn apply(&self, plasma: &mut Plasma) {
        if let Some(title) = &self.title {
            plasma.title = title.clone();
        }
        if let Some(description) = &self.description {
            plasma.description = description.clone();
        }
        if let Some(group) = self.blood_group {
            plasma.blood_group = group;
        }
        if let Some(quantity) = self.quantity_ml {
            plasma.quantity_ml = quantity;
        }
        if let Some(available) = self.available {
            plasma.available = available;
        }
    }
}

impl Plasma {
    pub fn validate(&self) -> DatabaseResult<()> {
        validate_fields(&self.title, &self.description, self.quantity_ml)
    }
}
