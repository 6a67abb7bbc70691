use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub smtp: SmtpConfig,
    pub stripe: StripeConfig,
    pub paypal: PaypalConfig,
    pub frontend_url: String,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: Secret<String>,
    pub webhook_secret: Secret<String>,
    pub api_base: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PaypalConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub webhook_id: String,
    pub api_base: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("INVOICING_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("INVOICING_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let db_url = env::var("INVOICING_DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db_name =
            env::var("INVOICING_DATABASE_NAME").unwrap_or_else(|_| "invoicing_db".to_string());

        let jwt_secret = env::var("INVOICING_JWT_SECRET")
            .unwrap_or_else(|_| "dev-jwt-secret-change-me".to_string());
        let access_token_expiry_minutes = env::var("INVOICING_ACCESS_TOKEN_EXPIRY_MINUTES")
            .unwrap_or_else(|_| "60".to_string())
            .parse()?;
        let refresh_token_expiry_days = env::var("INVOICING_REFRESH_TOKEN_EXPIRY_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()?;

        let smtp_enabled = env::var("INVOICING_SMTP_ENABLED")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);
        let smtp_host = env::var("INVOICING_SMTP_HOST").unwrap_or_else(|_| "localhost".to_string());
        let smtp_port = env::var("INVOICING_SMTP_PORT")
            .unwrap_or_else(|_| "587".to_string())
            .parse()?;
        let smtp_user = env::var("INVOICING_SMTP_USER").unwrap_or_default();
        let smtp_password = env::var("INVOICING_SMTP_PASSWORD").unwrap_or_default();
        let smtp_from_email = env::var("INVOICING_SMTP_FROM_EMAIL")
            .unwrap_or_else(|_| "no-reply@localhost".to_string());
        let smtp_from_name =
            env::var("INVOICING_SMTP_FROM_NAME").unwrap_or_else(|_| "Invoicing".to_string());

        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").unwrap_or_default();
        let stripe_webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default();
        let stripe_api_base = env::var("STRIPE_API_BASE")
            .unwrap_or_else(|_| "https://api.stripe.com".to_string());

        let paypal_client_id = env::var("PAYPAL_CLIENT_ID").unwrap_or_default();
        let paypal_client_secret = env::var("PAYPAL_CLIENT_SECRET").unwrap_or_default();
        let paypal_webhook_id = env::var("PAYPAL_WEBHOOK_ID").unwrap_or_default();
        let paypal_api_base = env::var("PAYPAL_API_BASE")
            .unwrap_or_else(|_| "https://api-m.sandbox.paypal.com".to_string());

        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: Secret::new(db_url),
                db_name,
            },
            auth: AuthConfig {
                jwt_secret: Secret::new(jwt_secret),
                access_token_expiry_minutes,
                refresh_token_expiry_days,
            },
            smtp: SmtpConfig {
                enabled: smtp_enabled,
                host: smtp_host,
                port: smtp_port,
                user: smtp_user,
                password: Secret::new(smtp_password),
                from_email: smtp_from_email,
                from_name: smtp_from_name,
            },
            stripe: StripeConfig {
                secret_key: Secret::new(stripe_secret_key),
                webhook_secret: Secret::new(stripe_webhook_secret),
                api_base: stripe_api_base,
            },
            paypal: PaypalConfig {
                client_id: paypal_client_id,
                client_secret: Secret::new(paypal_client_secret),
                webhook_id: paypal_webhook_id,
                api_base: paypal_api_base,
            },
            frontend_url,
            service_name: "invoicing-api".to_string(),
        })
    }
}
