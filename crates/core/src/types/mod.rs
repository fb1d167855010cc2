//! Core types for Repair Desk.
//!
//! This module provides type-safe wrappers for the values exchanged between
//! the console, the resource adapter and the backend.

pub mod id;
pub mod params;
pub mod record;
pub mod user;

pub use id::Identifier;
pub use params::*;
pub use record::Record;
pub use user::UserRecord;
