use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;

const ACCESS_TOKEN_TYPE: &str = "access";
const REFRESH_TOKEN_TYPE: &str = "refresh";

/// JWT service for token generation and validation
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

/// Claims for access tokens (short-lived)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Email
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
    /// Token type, always `access`. Checked on decode so a refresh token
    /// can never pass as an access token or vice versa.
    pub token_type: String,
}

/// Claims for refresh tokens (long-lived)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
    pub token_type: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl JwtService {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        }
    }

    pub fn generate_access_token(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_token_expiry_minutes);

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))?;

        Ok(token)
    }

    pub fn generate_refresh_token(&self, user_id: &str) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::days(self.refresh_token_expiry_days);

        let claims = RefreshTokenClaims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: REFRESH_TOKEN_TYPE.to_string(),
        };

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode refresh token: {}", e))?;

        Ok(token)
    }

    /// Generate both access and refresh tokens
    pub fn generate_token_pair(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<(String, String), anyhow::Error> {
        let access_token = self.generate_access_token(user_id, email)?;
        let refresh_token = self.generate_refresh_token(user_id)?;
        Ok((access_token, refresh_token))
    }

    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid access token: {}", e))?;

        if token_data.claims.token_type != ACCESS_TOKEN_TYPE {
            return Err(anyhow::anyhow!("Not an access token"));
        }

        Ok(token_data.claims)
    }

    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshTokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<RefreshTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid refresh token: {}", e))?;

        if token_data.claims.token_type != REFRESH_TOKEN_TYPE {
            return Err(anyhow::anyhow!("Not a refresh token"));
        }

        Ok(token_data.claims)
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: Secret::new("test-secret-for-unit-tests".to_string()),
            access_token_expiry_minutes: 60,
            refresh_token_expiry_days: 30,
        }
    }

    #[test]
    fn access_token_round_trip() {
        let service = JwtService::new(&test_config());

        let token = service
            .generate_access_token("user_123", "test@example.com")
            .unwrap();
        assert!(!token.is_empty());

        let claims = service.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, "user_123");
        assert_eq!(claims.email, "test@example.com");
    }

    #[test]
    fn refresh_token_round_trip() {
        let service = JwtService::new(&test_config());

        let token = service.generate_refresh_token("user_123").unwrap();
        let claims = service.validate_refresh_token(&token).unwrap();
        assert_eq!(claims.sub, "user_123");
    }

    #[test]
    fn access_token_rejects_wrong_secret() {
        let service = JwtService::new(&test_config());
        let other = JwtService::new(&AuthConfig {
            jwt_secret: Secret::new("another-secret".to_string()),
            access_token_expiry_minutes: 60,
            refresh_token_expiry_days: 30,
        });

        let token = service
            .generate_access_token("user_123", "test@example.com")
            .unwrap();
        assert!(other.validate_access_token(&token).is_err());
    }

    #[test]
    fn access_token_is_not_a_refresh_token() {
        let service = JwtService::new(&test_config());

        let token = service
            .generate_access_token("user_123", "test@example.com")
            .unwrap();
        assert!(service.validate_refresh_token(&token).is_err());
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let service = JwtService::new(&test_config());

        let token = service.generate_refresh_token("user_123").unwrap();
        assert!(service.validate_access_token(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let service = JwtService::new(&test_config());
        assert!(service.validate_access_token("not.a.token").is_err());
    }
}
