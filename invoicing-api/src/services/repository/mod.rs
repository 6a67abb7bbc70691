mod clients;
mod invoices;
mod notifications;
mod payments;
mod users;

pub use clients::{ClientListFilter, ClientRepository};
pub use invoices::{InvoiceListFilter, InvoiceRepository};
pub use notifications::NotificationRepository;
pub use payments::PaymentRepository;
pub use users::UserRepository;
