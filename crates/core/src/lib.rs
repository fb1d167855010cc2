//! Repair Desk Core - Shared types library.
//!
//! This crate provides common types used across all Repair Desk components:
//! - `admin` - Console library (session store, HTTP client, Strapi adapter)
//! - `cli` - Command-line surface of the console
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Identifiers, user and resource records, data-provider
//!   parameters and results

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
