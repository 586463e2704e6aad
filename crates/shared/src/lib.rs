//! Shared types, errors, and configuration for Paylink.
//!
//! This crate provides common building blocks used across all other crates:
//! - Opaque token generation and shape validation
//! - Application-wide error types
//! - Configuration management
//! - Outbound email service

pub mod config;
pub mod email;
pub mod error;
pub mod token;

pub use config::AppConfig;
pub use email::{EmailError, EmailService};
pub use error::{AppError, AppResult};
