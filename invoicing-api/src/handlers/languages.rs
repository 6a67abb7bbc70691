use anyhow::anyhow;
use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use invoicing_core::{error::AppError, validation::ValidatedJson};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use validator::Validate;

use crate::{AppState, middleware::AuthUser, services::i18n};

#[derive(Debug, Serialize)]
pub struct SupportedLanguagesResponse {
    pub languages: Vec<LanguageEntry>,
    pub default_language: String,
}

#[derive(Debug, Serialize)]
pub struct LanguageEntry {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CurrentLanguageResponse {
    pub language: String,
    pub language_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetLanguageRequest {
    #[validate(length(min = 1))]
    pub language: String,
}

pub async fn supported_languages() -> Json<SupportedLanguagesResponse> {
    let languages = i18n::SUPPORTED_LANGUAGES
        .iter()
        .map(|(code, name)| LanguageEntry {
            code: code.to_string(),
            name: name.to_string(),
        })
        .collect();

    Json(SupportedLanguagesResponse {
        languages,
        default_language: i18n::DEFAULT_LANGUAGE.to_string(),
    })
}

pub async fn current_language(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<CurrentLanguageResponse>, AppError> {
    let user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))?;

    Ok(Json(CurrentLanguageResponse {
        language_name: i18n::language_name(&user.preferred_language).to_string(),
        language: user.preferred_language,
    }))
}

pub async fn set_language(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidatedJson(body): ValidatedJson<SetLanguageRequest>,
) -> Result<Json<CurrentLanguageResponse>, AppError> {
    if !i18n::is_supported(&body.language) {
        return Err(AppError::BadRequest(anyhow!(
            "Unsupported language: {}",
            body.language
        )));
    }

    let mut user = state
        .users
        .find_by_id(&claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow!("User not found")))?;

    user.preferred_language = body.language;
    user.updated_at = chrono::Utc::now();
    state.users.replace(&user).await?;

    Ok(Json(CurrentLanguageResponse {
        language_name: i18n::language_name(&user.preferred_language).to_string(),
        language: user.preferred_language,
    }))
}

/// Best-effort language detection from the Accept-Language header.
pub async fn detect_language(headers: HeaderMap) -> Json<Value> {
    let detected = headers
        .get("accept-language")
        .and_then(|v| v.to_str().ok())
        .and_then(i18n::detect_from_accept_language);

    match detected {
        Some(code) => Json(json!({
            "detected_language": code,
            "language_name": i18n::language_name(code),
            "supported": true,
        })),
        None => Json(json!({
            "detected_language": Value::Null,
            "language_name": i18n::language_name(i18n::DEFAULT_LANGUAGE),
            "supported": false,
        })),
    }
}

pub async fn tax_rules(Path(country): Path<String>) -> Result<Json<Value>, AppError> {
    let rule = i18n::tax_rule_for_country(&country)
        .ok_or_else(|| AppError::NotFound(anyhow!("No tax rules for country: {}", country)))?;

    Ok(Json(json!({
        "country": rule.country,
        "rate": rule.rate,
        "tax_name": rule.tax_name,
        "calculation": rule.calculation,
    })))
}
