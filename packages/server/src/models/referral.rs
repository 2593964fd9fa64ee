use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::referral_code;
use crate::error::AppError;
use crate::extractors::json::Validate;

/// Public view of a usable code.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ReferralCodeResponse {
    #[schema(example = "EARLYBIRD")]
    pub code: String,
    #[schema(example = 20)]
    pub discount_percent: i32,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateReferralCodeRequest {
    /// 3-32 letters, digits, `-` or `_`; stored uppercase.
    #[schema(example = "EARLYBIRD")]
    pub code: String,
    /// 1-100.
    #[schema(example = 20)]
    pub discount_percent: i32,
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl Validate for CreateReferralCodeRequest {
    fn validate(&self) -> Result<(), AppError> {
        let code = self.code.trim();
        if !(3..=32).contains(&code.len())
            || !code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(AppError::Validation(
                "Code must be 3-32 letters, digits, '-' or '_'".into(),
            ));
        }
        if !(1..=100).contains(&self.discount_percent) {
            return Err(AppError::Validation(
                "discount_percent must be 1-100".into(),
            ));
        }
        if let Some(max) = self.max_uses
            && max < 1
        {
            return Err(AppError::Validation("max_uses must be >= 1".into()));
        }
        Ok(())
    }
}

/// Full view for admins.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AdminReferralCodeResponse {
    pub code: String,
    pub discount_percent: i32,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<referral_code::Model> for AdminReferralCodeResponse {
    fn from(m: referral_code::Model) -> Self {
        Self {
            code: m.code,
            discount_percent: m.discount_percent,
            max_uses: m.max_uses,
            used_count: m.used_count,
            is_active: m.is_active,
            expires_at: m.expires_at,
            created_at: m.created_at,
        }
    }
}
