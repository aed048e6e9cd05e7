//! Utility Module
//!
//! - [`AppError`] - application error type and HTTP mapping
//! - logging setup and request validation helpers

pub mod error;
pub mod logger;
pub mod validation;

pub use error::{AppError, AppResponse, AppResult};
