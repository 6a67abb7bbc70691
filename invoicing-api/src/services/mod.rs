pub mod email;
pub mod i18n;
pub mod jwt;
pub mod metrics;
pub mod notifier;
pub mod numbering;
pub mod paypal;
pub mod pdf;
pub mod reports;
pub mod repository;
pub mod stripe;

pub use email::EmailService;
pub use jwt::{AccessTokenClaims, JwtService, RefreshTokenClaims, TokenResponse};
pub use notifier::{
    ClientEvent, InvoiceEvent, NotificationHub, NotificationService, PaymentEvent,
};
pub use paypal::PaypalClient;
pub use stripe::StripeClient;
