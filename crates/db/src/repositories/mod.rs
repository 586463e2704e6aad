//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod company;
pub mod invoice;
pub mod oauth_state;
pub mod payment;
pub mod rate_limit;

pub use company::{CompanyRepository, CreateCompanyInput, CredentialUpdate};
pub use invoice::{InvoiceRepository, UpsertInvoiceInput};
pub use oauth_state::OAuthStateRepository;
pub use payment::{PaymentRepository, RecordPaymentInput, RecordedPayment};
pub use rate_limit::RateLimitRepository;
