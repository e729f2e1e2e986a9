//! Point reviews

use serde::{Deserialize, Serialize};

use crate::types::{DatabaseError, DatabaseResult};
use crate::validation;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
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
    pub text: String,
    pub rating: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    pub rating: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReviewRequest {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<i64>,
}

fn validate_fields(title: &str, text: &str, rating: i64) -> DatabaseResult<()> {
    validation::require(title, "Please add a title for the review")?;
    validation::max_chars(title, 100, "Title can not be more than 100 characters")?;
    validation::require(text, "Please add some text")?;
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(DatabaseError::validation(format!(
            "Please add a rating between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    Ok(())
}

impl CreateReviewRequest {
    pub fn validate(&self) -> DatabaseResult<()> {
        let rating = self.rating.ok_or_else(|| {
            DatabaseError::validation(format!(
                "Please add a rating between {MIN_RATING} and {MAX_RATING}"
            ))
        })?;
        validate_fields(&self.title, &self.text, rating)
    }
}

impl UpdateReviewRequest {
    pub fn apply(&self, review: &mut Review) {
        if let Some(title) = &self.title {
            review.title = title.clone();
        }
        if let Some(text) = &self.text {
            review.text = text.clone();
        }
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
    }
}

impl Review {
    pub fn validate(&self) -> DatabaseResult<()> {
        validate_fields(&self.title, &self.text, self.rating)
    }
}
