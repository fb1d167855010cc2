//! Session checks used by the shell around resource operations.

use crate::error::ApiError;
use crate::session::SessionStore;

use super::AuthError;

/// Auth hooks over the session store.
#[derive(Debug, Clone)]
pub struct AuthProvider {
    session: SessionStore,
}

impl AuthProvider {
    /// Provider over `session`.
    #[must_use]
    pub const fn new(session: SessionStore) -> Self {
        Self { session }
    }

    /// Succeeds iff the session is signed in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotAuthenticated` otherwise.
    pub fn check_auth(&self) -> Result<(), AuthError> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(AuthError::NotAuthenticated)
        }
    }

    /// Classify a failed request.
    ///
    /// 401 and 403 sign the user out and are rejected; everything else is
    /// left to the caller.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` for 401 and 403.
    pub fn check_error(&self, error: &ApiError) -> Result<(), AuthError> {
        match error.status() {
            Some(status @ (401 | 403)) => {
                if self.session.is_authenticated() {
                    tracing::warn!(status, "Access rejected, signing out");
                    self.session.logout();
                }
                Err(AuthError::Rejected { status })
            }
            _ => Ok(()),
        }
    }

    /// Sign out.
    pub fn logout(&self) {
        self.session.logout();
    }

    /// Permissions of the signed-in user. There is no role model, so always
    /// `None`.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub const fn get_permissions(&self) -> Option<serde_json::Value> {
        None
    }
}

#[cfg(test)]
mod tests {
    use repair_desk_core::UserRecord;
    use secrecy::SecretString;

    use super::*;

    fn signed_in() -> SessionStore {
        let session = SessionStore::in_memory();
        session.login(
            SecretString::from("token"),
            UserRecord::new("1", "admin", "admin@example.com"),
        );
        session
    }

    #[test]
    fn test_check_auth() {
        let session = SessionStore::in_memory();
        let provider = AuthProvider::new(session.clone());
        assert_eq!(provider.check_auth(), Err(AuthError::NotAuthenticated));

        session.login(
            SecretString::from("token"),
            UserRecord::new("1", "admin", "admin@example.com"),
        );
        assert_eq!(provider.check_auth(), Ok(()));
    }

    #[test]
    fn test_forbidden_signs_out() {
        let session = signed_in();
        let provider = AuthProvider::new(session.clone());

        let error = ApiError::Backend {
            status: 403,
            error: None,
        };
        assert_eq!(
            provider.check_error(&error),
            Err(AuthError::Rejected { status: 403 })
        );
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_unauthorized_is_rejected() {
        let provider = AuthProvider::new(SessionStore::in_memory());
        assert_eq!(
            provider.check_error(&ApiError::Unauthorized(None)),
            Err(AuthError::Rejected { status: 401 })
        );
    }

    #[test]
    fn test_other_errors_pass() {
        let session = signed_in();
        let provider = AuthProvider::new(session.clone());

        let error = ApiError::Backend {
            status: 400,
            error: None,
        };
        assert_eq!(provider.check_error(&error), Ok(()));
        assert_eq!(
            provider.check_error(&ApiError::UnexpectedResponse(String::new())),
            Ok(())
        );
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_logout_and_permissions() {
        let session = signed_in();
        let provider = AuthProvider::new(session.clone());

        assert!(provider.get_permissions().is_none());
        provider.logout();
        assert!(!session.is_authenticated());
    }
}
