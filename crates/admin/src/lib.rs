//! Repair Desk admin console library.
//!
//! Authenticates an operator against the shop's Strapi v5 backend, keeps the
//! issued token in a persisted session, and browses the `customers`,
//! `categories` and `units` collections.
//!
//! # Architecture
//!
//! ```text
//! AppShell ──▶ SessionStore ◀── LoginForm ──▶ AuthGateway ─┐
//!    │              ▲                                       │
//!    └──▶ StrapiProvider ──▶ ApiClient ◀──────────────────────┘
//! ```
//!
//! - [`session::SessionStore`] is the single source of auth truth; the HTTP
//!   client reads the bearer token from it and clears it on HTTP 401
//! - [`strapi::StrapiProvider`] maps the generic [`provider::DataProvider`]
//!   contract onto Strapi's REST conventions
//! - [`shell::AppShell`] picks the login view or the resource browser

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod login;
pub mod provider;
pub mod session;
pub mod shell;
pub mod strapi;

pub use config::{AdminConfig, ApiConfig, ConfigError};
pub use error::{ApiError, BackendError};
pub use provider::DataProvider;
pub use session::{Session, SessionEvent, SessionStore};
pub use shell::{AppShell, ShellError, View};
