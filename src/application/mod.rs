//! # Application Layer
//!
//! The submit/stream use case and the client interface it drives,
//! coordinating the domain and connector layers.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
