//! Authentication: the backend credential endpoints and the session checks
//! the shell applies around resource operations.

mod gateway;
mod provider;

pub use gateway::{AuthGateway, AuthResponse};
pub use provider::AuthProvider;

use thiserror::Error;

/// Outcome of an auth check that did not pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No signed-in session.
    #[error("not authenticated")]
    NotAuthenticated,
    /// The backend refused access; the session has been cleared.
    #[error("access rejected by backend (HTTP {status})")]
    Rejected {
        /// 401 or 403.
        status: u16,
    },
}
