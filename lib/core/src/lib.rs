//! Core types shared by the sessiongate crates.
//!
//! This crate provides the `Result` alias used with rootcause reports and the
//! strongly-typed identifiers for application-owned entities.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ParseIdError, UserId};
