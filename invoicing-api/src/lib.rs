pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::net::SocketAddr;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
};
use invoicing_core::{error::AppError, middleware::request_id_middleware};
use mongodb::{Client, options::ClientOptions};
use secrecy::ExposeSecret;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::services::{
    EmailService, JwtService, NotificationHub, NotificationService, PaypalClient, StripeClient,
    repository::{
        ClientRepository, InvoiceRepository, NotificationRepository, PaymentRepository,
        UserRepository,
    },
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub config: Config,
    pub jwt: JwtService,
    pub users: UserRepository,
    pub clients: ClientRepository,
    pub invoices: InvoiceRepository,
    pub payments: PaymentRepository,
    pub notifications: NotificationRepository,
    pub email: EmailService,
    pub stripe: StripeClient,
    pub paypal: PaypalClient,
    pub hub: NotificationHub,
    pub notifier: NotificationService,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        // Connect to MongoDB
        let mut client_options = ClientOptions::parse(config.database.url.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!("Failed to parse MongoDB connection string: {}", e);
                AppError::DatabaseError(e.into())
            })?;
        client_options.app_name = Some(config.service_name.clone());

        let client = Client::with_options(client_options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::DatabaseError(e.into())
        })?;
        let db = client.database(&config.database.db_name);

        let users = UserRepository::new(&db);
        let clients = ClientRepository::new(&db);
        let invoices = InvoiceRepository::new(&db);
        let payments = PaymentRepository::new(&db);
        let notifications = NotificationRepository::new(&db);

        for result in [
            users.init_indexes().await,
            clients.init_indexes().await,
            invoices.init_indexes().await,
            payments.init_indexes().await,
            notifications.init_indexes().await,
        ] {
            result.map_err(|e| {
                tracing::error!("Failed to initialize database indexes: {}", e);
                AppError::DatabaseError(e)
            })?;
        }

        let jwt = JwtService::new(&config.auth);
        let email = EmailService::new(&config.smtp)?;

        let stripe = StripeClient::new(config.stripe.clone());
        if !stripe.is_configured() {
            tracing::warn!("Stripe credentials not configured - card payments disabled");
        }
        let paypal = PaypalClient::new(config.paypal.clone());
        if !paypal.is_configured() {
            tracing::warn!("PayPal credentials not configured - PayPal payments disabled");
        }

        let hub = NotificationHub::default();
        let notifier = NotificationService::new(notifications.clone(), hub.clone());

        let state = AppState {
            db,
            config: config.clone(),
            jwt,
            users,
            clients,
            invoices,
            payments,
            notifications,
            email,
            stripe,
            paypal,
            hub,
            notifier,
        };

        // Port 0 binds a random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port, "Server listening");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(self.listener, router).await
    }
}

/// Assembles the full route tree. Webhooks, health and auth entry points
/// are public; everything else requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh))
        .route("/api/webhooks/stripe", post(handlers::webhooks::stripe_webhook))
        .route("/api/webhooks/paypal", post(handlers::webhooks::paypal_webhook))
        .route(
            "/api/languages/supported",
            get(handlers::languages::supported_languages),
        )
        .route(
            "/api/languages/detect",
            get(handlers::languages::detect_language),
        );

    let protected = Router::new()
        .route(
            "/api/auth/profile",
            get(handlers::auth::get_profile).put(handlers::auth::update_profile),
        )
        .route(
            "/api/auth/change-password",
            post(handlers::auth::change_password),
        )
        .route(
            "/api/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route("/api/clients/tags", get(handlers::clients::list_tags))
        .route(
            "/api/clients/:id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route(
            "/api/invoices",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route(
            "/api/invoices/:id",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route("/api/invoices/:id/send", post(handlers::invoices::send_invoice))
        .route(
            "/api/invoices/:id/pdf",
            get(handlers::invoices::download_invoice_pdf),
        )
        .route(
            "/api/payments/stripe/create-intent",
            post(handlers::payments::create_stripe_intent),
        )
        .route(
            "/api/payments/paypal/create-order",
            post(handlers::payments::create_paypal_order),
        )
        .route("/api/payments/:id", get(handlers::payments::get_payment))
        .route(
            "/api/payments/:id/refund",
            post(handlers::payments::refund_payment),
        )
        .route(
            "/api/payments/invoice/:invoice_id",
            get(handlers::payments::list_invoice_payments),
        )
        .route("/api/reports/dashboard", get(handlers::reports::dashboard))
        .route("/api/reports/revenue", get(handlers::reports::revenue_report))
        .route("/api/reports/clients", get(handlers::reports::client_report))
        .route("/api/reports/export", post(handlers::reports::export_report))
        .route(
            "/api/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/api/notifications/unread-count",
            get(handlers::notifications::unread_count),
        )
        .route(
            "/api/notifications/mark-all-read",
            put(handlers::notifications::mark_all_read),
        )
        .route(
            "/api/notifications/clear-old",
            delete(handlers::notifications::clear_old),
        )
        .route(
            "/api/notifications/stream",
            get(handlers::notifications::notification_stream),
        )
        .route(
            "/api/notifications/:id",
            delete(handlers::notifications::delete_notification),
        )
        .route(
            "/api/notifications/:id/read",
            put(handlers::notifications::mark_read),
        )
        .route(
            "/api/languages/current",
            get(handlers::languages::current_language),
        )
        .route("/api/languages/set", put(handlers::languages::set_language))
        .route(
            "/api/languages/tax-rules/:country",
            get(handlers::languages::tax_rules),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
