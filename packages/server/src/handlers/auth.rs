use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use sea_orm::sea_query::LockType;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{activate_token, role, role_permission, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::ValidJson;
use crate::models::auth::{
    ActivateRequest, ActivateResponse, LoginRequest, LoginResponse, MeResponse, RegisterRequest,
    RegisterResponse,
};
use crate::models::shared::normalize_email;
use crate::notify;
use crate::state::AppState;
use crate::utils::{hash, jwt, token};

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    operation_id = "register",
    summary = "Create an account",
    description = "Creates a participant account. When activation is required the account starts inactive and an activation link is emailed.",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Email already registered (EMAIL_TAKEN)", body = ErrorBody),
        (status = 429, description = "Rate limited (RATE_LIMITED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = normalize_email(&payload.email);
    let require_activation = state.config.auth.require_activation;

    if user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .is_some()
    {
        return Err(AppError::EmailTaken);
    }

    let hash = hash::hash_password(&payload.password)
        .map_err(|e| AppError::Internal(format!("Password hash error: {}", e)))?;

    let now = Utc::now();
    let txn = state.db.begin().await?;

    let new_user = user::ActiveModel {
        email: Set(email),
        name: Set(payload.name.trim().to_string()),
        password: Set(hash),
        role: Set(role::DEFAULT_ROLE.to_string()),
        is_active: Set(!require_activation),
        created_at: Set(now),
        ..Default::default()
    };

    let user = new_user.insert(&txn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            tracing::debug!("Registration race condition: unique constraint caught on insert");
            AppError::EmailTaken
        }
        _ => AppError::from(e),
    })?;

    let activation = if require_activation {
        let token = activate_token::ActiveModel {
            token: Set(token::random_hex(32)),
            user_id: Set(user.id),
            expires_at: Set(now + Duration::hours(state.config.auth.activation_ttl_hours)),
            used_at: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;
        Some(token.token)
    } else {
        None
    };

    txn.commit().await?;

    if let Some(token) = activation {
        let link = format!(
            "{}/activate?token={}",
            state.config.server.public_url.trim_end_matches('/'),
            token
        );
        notify::spawn_send(
            state.mailer.clone(),
            notify::activation(&user.email, &user.name, &link),
        );
    }

    Ok((StatusCode::CREATED, Json(RegisterResponse::from(user))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/activate",
    tag = "Auth",
    operation_id = "activate",
    summary = "Activate an account",
    description = "Consumes an emailed activation token. Tokens are single-use and expire.",
    request_body = ActivateRequest,
    responses(
        (status = 200, description = "Account activated", body = ActivateResponse),
        (status = 400, description = "Token used or expired (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Unknown token (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn activate(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<ActivateRequest>,
) -> Result<Json<ActivateResponse>, AppError> {
    let now = Utc::now();
    let txn = state.db.begin().await?;

    let token = activate_token::Entity::find_by_id(payload.token.trim())
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Activation token not found".into()))?;

    if token.used_at.is_some() {
        return Err(AppError::Validation(
            "Activation token has already been used".into(),
        ));
    }
    if token.expires_at <= now {
        return Err(AppError::Validation("Activation token has expired".into()));
    }

    let user = user::Entity::find_by_id(token.user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let mut active_token: activate_token::ActiveModel = token.into();
    active_token.used_at = Set(Some(now));
    active_token.update(&txn).await?;

    let mut active_user: user::ActiveModel = user.into();
    active_user.is_active = Set(true);
    let user = active_user.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(user_id = user.id, "Account activated");
    Ok(Json(ActivateResponse {
        email: user.email,
        is_active: user.is_active,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    operation_id = "login",
    summary = "Log in",
    description = "Exchanges email and password for a JWT bearer token.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Wrong email or password (INVALID_CREDENTIALS)", body = ErrorBody),
        (status = 403, description = "Account not activated (ACCOUNT_INACTIVE)", body = ErrorBody),
        (status = 429, description = "Rate limited (RATE_LIMITED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = normalize_email(&payload.email);

    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let is_valid = hash::verify_password(&payload.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verify error: {}", e)))?;

    if !is_valid {
        return Err(AppError::InvalidCredentials);
    }
    if !user.is_active {
        return Err(AppError::AccountInactive);
    }

    let permissions = permissions_for_role(&state.db, &user.role).await?;

    let token = jwt::sign(
        user.id,
        &user.email,
        &user.role,
        permissions.clone(),
        &state.config.auth.jwt_secret,
        state.config.auth.token_ttl_hours,
    )
    .map_err(|e| AppError::Internal(format!("JWT sign error: {}", e)))?;

    Ok(Json(LoginResponse {
        token,
        id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
        permissions,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    operation_id = "me",
    summary = "Current user",
    responses(
        (status = 200, description = "Authenticated user", body = MeResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn me(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MeResponse>, AppError> {
    // A token can outlive its account.
    let user = user::Entity::find_by_id(auth_user.user_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        name: user.name,
        role: auth_user.role,
        permissions: auth_user.permissions,
    }))
}

pub(crate) async fn permissions_for_role<C: ConnectionTrait>(
    db: &C,
    role: &str,
) -> Result<Vec<String>, AppError> {
    let role_perms = role_permission::Entity::find()
        .filter(role_permission::Column::Role.eq(role))
        .all(db)
        .await?;
    Ok(role_perms.into_iter().map(|rp| rp.permission).collect())
}
