use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use super::shared::validate_text;
use crate::error::AppError;
use crate::extractors::json::Validate;

/// A showcased work with its current vote count.
#[derive(Debug, Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct KaryaResponse {
    pub id: i32,
    #[schema(example = "Smart Irrigation Node")]
    pub title: String,
    #[schema(example = "Binary Beasts")]
    pub team_name: String,
    pub description: String,
    #[schema(example = 42)]
    pub votes: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateKaryaRequest {
    pub title: String,
    pub team_name: String,
    #[serde(default)]
    pub description: String,
}

impl Validate for CreateKaryaRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_text(&self.title, "Title", 256)?;
        validate_text(&self.team_name, "Team name", 64)?;
        if self.description.len() > 10_000 {
            return Err(AppError::Validation(
                "Description must be at most 10KB".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VoteResponse {
    pub karya_id: i32,
    /// Vote count after this vote.
    pub votes: i64,
}
