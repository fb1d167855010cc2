//! Login form state machine.
//!
//! ```text
//! Idle ──submit──▶ Submitting ──ok──▶ Authenticated
//!   │                  │
//!   │ empty field      └──err──▶ Failed ──submit──▶ Submitting ...
//!   └──────────────────────────▶ Failed
//! ```
//!
//! Messages shown to the operator are in Thai, the product language.

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;

use crate::auth::AuthGateway;
use crate::error::ApiError;
use crate::session::SessionStore;

/// Shown when the identifier or password is empty.
pub const VALIDATION_MESSAGE: &str = "กรุณากรอกชื่อผู้ใช้และรหัสผ่าน";

/// Shown when login fails without a message from the backend.
pub const GENERIC_FAILURE_MESSAGE: &str = "เกิดข้อผิดพลาดในการเข้าสู่ระบบ";

/// Where the login form is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoginState {
    /// Waiting for input.
    #[default]
    Idle,
    /// Credentials sent, waiting for the backend.
    Submitting,
    /// The last attempt failed; `message` is for the operator.
    Failed {
        /// Human-readable reason.
        message: String,
    },
    /// Signed in. The session store holds the token.
    Authenticated,
}

impl LoginState {
    /// The failure message, if the last attempt failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// Callback run after a successful login.
pub type SuccessCallback = Box<dyn Fn() + Send + Sync>;

/// The login form.
pub struct LoginForm {
    gateway: AuthGateway,
    session: SessionStore,
    state: watch::Sender<LoginState>,
    on_success: Option<SuccessCallback>,
}

impl LoginForm {
    /// A form in `Idle`.
    #[must_use]
    pub fn new(gateway: AuthGateway, session: SessionStore) -> Self {
        let (state, _) = watch::channel(LoginState::Idle);
        Self {
            gateway,
            session,
            state,
            on_success: None,
        }
    }

    /// Run `callback` after each successful login.
    #[must_use]
    pub fn on_success(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LoginState {
        self.state.borrow().clone()
    }

    /// Watch state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoginState> {
        self.state.subscribe()
    }

    /// Submit credentials and return the resulting state.
    ///
    /// Ignored while a submission is in flight or after success.
    pub async fn submit(&self, identifier: &str, password: &SecretString) -> LoginState {
        if matches!(
            *self.state.borrow(),
            LoginState::Submitting | LoginState::Authenticated
        ) {
            return self.state();
        }

        if identifier.is_empty() || password.expose_secret().is_empty() {
            return self.fail(VALIDATION_MESSAGE.to_string());
        }

        let started = self.state.send_if_modified(|state| match state {
            LoginState::Submitting | LoginState::Authenticated => false,
            LoginState::Idle | LoginState::Failed { .. } => {
                *state = LoginState::Submitting;
                true
            }
        });
        if !started {
            return self.state();
        }

        let mut in_flight = InFlight {
            state: &self.state,
            finished: false,
        };
        let result = self.gateway.login(identifier, password).await;
        in_flight.finished = true;

        match result {
            Ok(response) => {
                self.session.login(response.jwt, response.user);
                if let Some(callback) = &self.on_success {
                    callback();
                }
                self.state.send_replace(LoginState::Authenticated);
                LoginState::Authenticated
            }
            Err(e) => {
                tracing::error!(error = %e, "Login error");
                self.fail(failure_message(&e))
            }
        }
    }

    /// Back to `Idle`, e.g. after the session was cleared.
    pub fn reset(&self) {
        self.state.send_replace(LoginState::Idle);
    }

    fn fail(&self, message: String) -> LoginState {
        let state = LoginState::Failed { message };
        self.state.send_replace(state.clone());
        state
    }
}

/// Returns an abandoned submission to `Idle`, e.g. when the caller dropped
/// the `submit` future before the backend answered.
struct InFlight<'a> {
    state: &'a watch::Sender<LoginState>,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.state.send_if_modified(|state| {
            if *state == LoginState::Submitting {
                *state = LoginState::Idle;
                true
            } else {
                false
            }
        });
    }
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("state", &*self.state.borrow())
            .field("on_success", &self.on_success.is_some())
            .finish_non_exhaustive()
    }
}

/// The backend's own message when it sent one, otherwise the generic text.
#[must_use]
pub fn failure_message(error: &ApiError) -> String {
    error
        .backend_message()
        .unwrap_or(GENERIC_FAILURE_MESSAGE)
        .to_string()
}
