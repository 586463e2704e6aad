//! Payment provider RPC clients.
//!
//! Each provider is an opaque remote API consumed over HTTPS with its
//! documented request/response shapes. The three clients implement one
//! `ProviderGateway` capability set (connect initiation, callback
//! completion, checkout creation, charge verification) so the rest of the
//! system dispatches on the `PaymentProvider` tag and nothing else.

pub mod error;
pub mod gateway;
pub mod paypal;
pub mod square;
pub mod stripe;
pub mod types;

pub use error::ProviderError;
pub use gateway::{Gateways, ProviderGateway};
pub use paypal::PaypalGateway;
pub use square::SquareGateway;
pub use stripe::StripeGateway;
