use serde::{Deserialize, Serialize};

use super::shared::{validate_email, validate_text};
use crate::error::AppError;
use crate::extractors::json::Validate;

/// Request body for account registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Email address; stored lowercase and used to log in.
    #[schema(example = "ana@std.stei.itb.ac.id")]
    pub email: String,
    /// Display name (1-100 characters).
    #[schema(example = "Ana Putri")]
    pub name: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_email(&self.email)?;
        validate_text(&self.name, "Name", 100)?;
        if self.password.len() < 8 || self.password.len() > 128 {
            return Err(AppError::Validation(
                "Password must be 8-128 characters".into(),
            ));
        }
        Ok(())
    }
}

/// Successful registration response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "ana@std.stei.itb.ac.id")]
    pub email: String,
    #[schema(example = "Ana Putri")]
    pub name: String,
    /// `false` until the emailed activation link is used.
    #[schema(example = false)]
    pub is_active: bool,
}

impl From<crate::entity::user::Model> for RegisterResponse {
    fn from(user: crate::entity::user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_active: user.is_active,
        }
    }
}

/// Request body for account activation.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ActivateRequest {
    /// Token from the activation email.
    #[schema(example = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")]
    pub token: String,
}

impl Validate for ActivateRequest {
    fn validate(&self) -> Result<(), AppError> {
        let token = self.token.trim();
        if token.is_empty() || token.len() > 128 {
            return Err(AppError::Validation("Token must be 1-128 characters".into()));
        }
        Ok(())
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivateResponse {
    #[schema(example = "ana@std.stei.itb.ac.id")]
    pub email: String,
    #[schema(example = true)]
    pub is_active: bool,
}

/// Request body for login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ana@std.stei.itb.ac.id")]
    pub email: String,
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.email.trim().is_empty() {
            return Err(AppError::Validation("Email must not be empty".into()));
        }
        if self.password.is_empty() {
            return Err(AppError::Validation("Password must not be empty".into()));
        }
        Ok(())
    }
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "ana@std.stei.itb.ac.id")]
    pub email: String,
    #[schema(example = "Ana Putri")]
    pub name: String,
    #[schema(example = "participant")]
    pub role: String,
    #[schema(example = json!([]))]
    pub permissions: Vec<String>,
}

/// Current authenticated user's profile.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    #[schema(example = 42)]
    pub id: i32,
    #[schema(example = "ana@std.stei.itb.ac.id")]
    pub email: String,
    #[schema(example = "Ana Putri")]
    pub name: String,
    #[schema(example = "admin")]
    pub role: String,
    #[schema(example = json!(["registration:view", "registration:verify"]))]
    pub permissions: Vec<String>,
}
