use chrono::{DateTime, Utc};
use common::{Phase, PhaseSchedule};
use serde::{Deserialize, Serialize};

use super::shared::{double_option, validate_text};
use crate::entity::competition;
use crate::error::AppError;
use crate::extractors::json::Validate;

const MAX_TEAM_SIZE: i32 = 10;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCompetitionRequest {
    /// 2-8 letters or digits; stored uppercase.
    #[schema(example = "PTC")]
    pub code: String,
    #[schema(example = "ProtoTech Contest")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Fee in rupiah.
    #[schema(example = 150000)]
    pub registration_fee: i64,
    #[schema(example = 2)]
    pub min_team_size: i32,
    #[schema(example = 3)]
    pub max_team_size: i32,
    pub is_active: Option<bool>,
    pub registration_open: Option<DateTime<Utc>>,
    pub registration_close: Option<DateTime<Utc>>,
    pub preliminary_close: Option<DateTime<Utc>>,
    pub semifinal_close: Option<DateTime<Utc>>,
    pub final_close: Option<DateTime<Utc>>,
}

impl CreateCompetitionRequest {
    pub fn schedule(&self) -> PhaseSchedule {
        PhaseSchedule {
            registration_close: self.registration_close,
            preliminary_close: self.preliminary_close,
            semifinal_close: self.semifinal_close,
            final_close: self.final_close,
        }
    }
}

impl Validate for CreateCompetitionRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_code(&self.code)?;
        validate_text(&self.name, "Name", 128)?;
        validate_description(&self.description)?;
        validate_fee(self.registration_fee)?;
        validate_team_bounds(self.min_team_size, self.max_team_size)?;
        validate_schedule(self.registration_open, &self.schedule())
    }
}

/// Partial update. Schedule fields accept `null` to clear a boundary.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateCompetitionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub registration_fee: Option<i64>,
    pub min_team_size: Option<i32>,
    pub max_team_size: Option<i32>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub registration_open: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub registration_close: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub preliminary_close: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub semifinal_close: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub final_close: Option<Option<DateTime<Utc>>>,
}

impl Validate for UpdateCompetitionRequest {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(ref name) = self.name {
            validate_text(name, "Name", 128)?;
        }
        if let Some(ref description) = self.description {
            validate_description(description)?;
        }
        if let Some(fee) = self.registration_fee {
            validate_fee(fee)?;
        }
        // Team bounds and schedule are checked against the stored row.
        Ok(())
    }
}

pub fn validate_code(code: &str) -> Result<(), AppError> {
    let code = code.trim();
    if !(2..=8).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::Validation(
            "Code must be 2-8 letters or digits".into(),
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.len() > 100_000 {
        return Err(AppError::Validation(
            "Description must be at most 100KB".into(),
        ));
    }
    Ok(())
}

fn validate_fee(fee: i64) -> Result<(), AppError> {
    if fee < 0 {
        return Err(AppError::Validation(
            "registration_fee must be >= 0".into(),
        ));
    }
    Ok(())
}

pub fn validate_team_bounds(min: i32, max: i32) -> Result<(), AppError> {
    if min < 1 || max > MAX_TEAM_SIZE || min > max {
        return Err(AppError::Validation(format!(
            "Team size bounds must satisfy 1 <= min_team_size <= max_team_size <= {MAX_TEAM_SIZE}"
        )));
    }
    Ok(())
}

pub fn validate_schedule(
    registration_open: Option<DateTime<Utc>>,
    schedule: &PhaseSchedule,
) -> Result<(), AppError> {
    schedule
        .validate()
        .map_err(|msg| AppError::Validation(msg.into()))?;
    if let (Some(open), Some(close)) = (registration_open, schedule.registration_close)
        && open >= close
    {
        return Err(AppError::Validation(
            "registration_open must be before registration_close".into(),
        ));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CompetitionResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "PTC")]
    pub code: String,
    #[schema(example = "ProtoTech Contest")]
    pub name: String,
    pub description: String,
    #[schema(example = 150000)]
    pub registration_fee: i64,
    #[schema(example = 2)]
    pub min_team_size: i32,
    #[schema(example = 3)]
    pub max_team_size: i32,
    pub is_active: bool,
    pub registration_open: Option<DateTime<Utc>>,
    pub registration_close: Option<DateTime<Utc>>,
    pub preliminary_close: Option<DateTime<Utc>>,
    pub semifinal_close: Option<DateTime<Utc>>,
    pub final_close: Option<DateTime<Utc>>,
    pub current_phase: Phase,
    /// Whether new teams can register right now.
    pub registration_is_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<competition::Model> for CompetitionResponse {
    fn from(m: competition::Model) -> Self {
        let registration_is_open = m.accepts_registrations(Utc::now());
        Self {
            id: m.id,
            code: m.code,
            name: m.name,
            description: m.description,
            registration_fee: m.registration_fee,
            min_team_size: m.min_team_size,
            max_team_size: m.max_team_size,
            is_active: m.is_active,
            registration_open: m.registration_open,
            registration_close: m.registration_close,
            preliminary_close: m.preliminary_close,
            semifinal_close: m.semifinal_close,
            final_close: m.final_close,
            current_phase: m.current_phase,
            registration_is_open,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
