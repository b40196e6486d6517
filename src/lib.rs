//! Finance Coach
//!
//! Backend for a personal-finance tracker:
//! - Users with goals, created together at onboarding
//! - Cent-denominated transactions with ordered validation
//! - Currency normalization between typed strings and cents
//! - A chat assistant that reads the caller's profile, goals and recent
//!   transactions through scoped, read-only tools
//!
//! FLOW:
//! CLIENT → REST → VALIDATE → STORE
//!            └→ ASSISTANT → MODEL ⇄ TOOLS → STORE

pub mod api;
pub mod assistant;
pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod model;
pub mod models;
pub mod money;
pub mod onboarding;
pub mod password;
pub mod services;
pub mod store;
pub mod tools;
pub mod validation;

pub use error::{AppError, Result};

// Re-export common types
pub use models::*;
pub use money::{format_cents_to_brl, parse_currency_in, parse_currency_to_cents, Locale};
