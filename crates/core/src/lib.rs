//! `tally-core`: shared building blocks for the ledger and identity crates.
//!
//! This crate contains **pure** primitives (no infrastructure concerns).

pub mod error;
pub mod id;

pub use error::{ServiceError, ServiceResult};
pub use id::{AccountId, AuthId};
