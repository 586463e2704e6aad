//! `SeaORM` entity definitions.
//!
//! Status, method, and provider columns are stored as text and mapped to the
//! enums in `paylink-core` at the repository seam.

pub mod companies;
pub mod invoices;
pub mod oauth_states;
pub mod payments;
pub mod rate_limits;
