//! Donation point entity

use serde::{Deserialize, Serialize};

use crate::types::{DatabaseError, DatabaseResult};
use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    #[serde(skip)]
    pub id: i64,
    #[serde(rename = "id")]
    pub public_id: String,
    #[serde(skip)]
    pub patient_id: i64,
    /// Public id of the owning patient.
    pub patient: String,
    pub name: String,
    pub description: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub average_rating: Option<f64>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePointRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePointRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

fn validate_fields(
    name: &str,
    description: &str,
    address: &str,
    latitude: f64,
    longitude: f64,
    phone: Option<&str>,
    email: Option<&str>,
) -> DatabaseResult<()> {
    validation::require(name, "Please add a name")?;
    validation::max_chars(name, 50, "Name can not be more than 50 characters")?;
    validation::require(description, "Please add a description")?;
    validation::max_chars(
        description,
        500,
        "Description can not be more than 500 characters",
    )?;
    validation::require(address, "Please add an address")?;
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(DatabaseError::validation("Latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(DatabaseError::validation(
            "Longitude must be between -180 and 180",
        ));
    }
    if let Some(phone) = phone {
        validation::max_chars(phone, 20, "Phone number can not be longer than 20 characters")?;
    }
    if let Some(email) = email {
        validation::email(email)?;
    }
    Ok(())
}

impl CreatePointRequest {
    pub fn validate(&self) -> DatabaseResult<()> {
        let latitude = self
            .latitude
            .ok_or_else(|| DatabaseError::validation("Please add a latitude"))?;
        let longitude = self
            .longitude
            .ok_or_else(|| DatabaseError::validation("Please add a longitude"))?;
        validate_fields(
            &self.name,
            &self.description,
            &self.address,
            latitude,
            longitude,
            self.phone.as_deref(),
            self.email.as_deref(),
        )
    }
}

impl UpdatePointRequest {
    pub fn apply(&self, point: &mut Point) {
        if let Some(name) = &self.name {
            point.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            point.description = description.trim().to_string();
        }
        if let Some(address) = &self.address {
            point.address = address.trim().to_string();
        }
        if let Some(latitude) = self.latitude {
            point.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            point.longitude = longitude;
        }
        if self.phone.is_some() {
            point.phone = self.phone.clone();
        }
        if self.email.is_some() {
            point.email = self.email.clone();
        }
    }
}

impl Point {
    pub fn validate(&self) -> DatabaseResult<()> {
        validate_fields(
            &self.name,
            &self.description,
            &self.address,
            self.latitude,
            self.longitude,
            self.phone.as_deref(),
            self.email.as_deref(),
        )
    }
}
