//! External-facing services

pub mod notify;

pub use notify::Notifier;
