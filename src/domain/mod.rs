//! # Domain Layer
//!
//! Conversation state, turn and attachment models, and the sanitization
//! rules. This layer is independent of external frameworks and transports.

pub mod models;

mod error;

pub use error::DomainError;
pub use models::*;
