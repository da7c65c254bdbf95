//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Money in integer minor units with currency codes
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types
//! - Configuration management
//! - The outbound email collaborator and webhook signatures

pub mod auth;
pub mod config;
pub mod email;
pub mod error;
pub mod jwt;
pub mod signature;
pub mod types;

pub use auth::Claims;
pub use config::{AppConfig, BillingConfig, EmailConfig};
pub use email::{
    EmailError, EmailParams, EmailService, EmailTemplate, Mailer, MockMailer, SentEmail,
};
pub use error::AppError;
pub use jwt::{JwtConfig, JwtError, JwtService};
