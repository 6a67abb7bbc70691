use anyhow::anyhow;
use axum::{Json, extract::State};
use invoicing_core::{error::AppError, validation::ValidatedJson};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    AppState,
    dtos::{MessageResponse, UserResponse},
    middleware::AuthUser,
    models::{NewUser, User},
    services::TokenResponse,
    utils::password::{Password, hash_password, verify_password},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub company_address: String,
    #[serde(default)]
    pub company_phone: String,
    #[serde(default)]
    pub company_website: String,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default)]
    pub default_tax_rate: Decimal,
    #[serde(default = "default_invoice_prefix")]
    pub invoice_prefix: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_invoice_prefix() -> String {
    "INV".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username or email address.
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenResponse,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub company_address: Option<String>,
    pub company_phone: Option<String>,
    pub company_website: Option<String>,
    pub company_logo: Option<String>,
    pub default_currency: Option<String>,
    pub default_tax_rate: Option<Decimal>,
    pub invoice_prefix: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

fn token_response(state: &AppState, user: &User) -> Result<TokenResponse, AppError> {
    let (access_token, refresh_token) = state.jwt.generate_token_pair(&user.id, &user.email)?;
    Ok(TokenResponse {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.access_token_expiry_seconds(),
    })
}

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if state.users.find_by_username(&body.username).await?.is_some() {
        return Err(AppError::Conflict(anyhow!("Username already taken")));
    }
    if state.users.find_by_email(&body.email).await?.is_some() {
        return Err(AppError::Conflict(anyhow!("Email already registered")));
    }

    let password_hash = hash_password(&Password::new(body.password))?;

    let user = User::new(NewUser {
        username: body.username,
        email: body.email,
        password_hash,
        first_name: body.first_name,
        last_name: body.last_name,
        company_name: body.company_name,
        company_address: body.company_address,
        company_phone: body.company_phone,
        company_website: body.company_website,
        default_currency: body.default_currency,
        default_tax_rate: body.default_tax_rate,
        invoice_prefix: body.invoice_prefix,
    });
    state.users.create(user.clone()).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    let tokens = token_response(&state, &user)?;
    Ok(Json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = state
        .users
        .find_by_username_or_email(&body.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow!("Invalid credentials")))?;

    verify_password(&Password::new(body.password), &user.password_hash)
        .map_err(|_| AppError::Unauthorized(anyhow!("Invalid credentials")))?;

    if !user.is_active {
        return Err(AppError::Forbidden(anyhow!("Account is deactivated")));
    }

    tracing::info!(user_id = %user.id, "User logged in");

    let tokens = token_response(&state, &user)?;
    Ok(Json(AuthResponse {
        user: user.into(),
        tokens,
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let claims = state
        .jwt
        .validate_refresh_token(&body.refresh_token)
        .map_err(|_| AppError::Unauthorized(anyhow!("Invalid or expired refresh token")))?;

    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow!("User no longer exists")))?;

    if !user.is_active {
        return Err(AppError::Forbidden(anyhow!("Account is deactivated")));
    }

    let access_token = state.jwt.generate_access_token(&user.id, &user.email)?;
    Ok(Json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.access_token_expiry_seconds(),
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))?;

    Ok(Json(user.into()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let mut user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))?;

    if let Some(first_name) = body.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = body.last_name {
        user.last_name = last_name;
    }
    if let Some(company_name) = body.company_name {
        user.company_name = company_name;
    }
    if let Some(company_address) = body.company_address {
        user.company_address = company_address;
    }
    if let Some(company_phone) = body.company_phone {
        user.company_phone = company_phone;
    }
    if let Some(company_website) = body.company_website {
        user.company_website = company_website;
    }
    if let Some(company_logo) = body.company_logo {
        user.company_logo = company_logo;
    }
    if let Some(default_currency) = body.default_currency {
        user.default_currency = default_currency;
    }
    if let Some(default_tax_rate) = body.default_tax_rate {
        user.default_tax_rate = default_tax_rate;
    }
    if let Some(invoice_prefix) = body.invoice_prefix {
        user.invoice_prefix = invoice_prefix;
    }
    user.updated_at = chrono::Utc::now();

    state.users.replace(&user).await?;
    Ok(Json(user.into()))
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let mut user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))?;

    verify_password(&Password::new(body.current_password), &user.password_hash)
        .map_err(|_| AppError::Unauthorized(anyhow!("Current password is incorrect")))?;

    user.password_hash = hash_password(&Password::new(body.new_password))?;
    user.updated_at = chrono::Utc::now();
    state.users.replace(&user).await?;

    tracing::info!(user_id = %user.id, "Password changed");

    Ok(Json(MessageResponse::new("Password changed successfully")))
}
