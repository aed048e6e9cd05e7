//! Credits Module (Reservation Manager + Transfer Engine)
//!
//! The two balance-affecting primitives every session transition composes:
//! reserve/release a hold, and settle a hold into a transfer. All functions
//! run inside the caller's transaction so a session status change and its
//! ledger effect commit atomically or not at all.

pub mod reservation;
pub mod transfer;

pub use reservation::{release_in_tx, reserve_in_tx};
pub use transfer::{TransferOutcome, transfer_in_tx};
