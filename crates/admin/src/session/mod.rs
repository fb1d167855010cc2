//! Session store.
//!
//! Holds the current bearer token and user, persists every change to a
//! [`SessionStorage`], and notifies interested parties.
//!
//! # Architecture
//!
//! - One [`SessionStore`] per console, cloned into the HTTP client, the login
//!   flow and the shell (cheap: `Arc` inside)
//! - Each mutation replaces the whole [`Session`] snapshot in a
//!   `tokio::sync::watch` channel, so readers never see a half-applied change
//! - Mutations are serialized: the stored entry, the snapshot and the event
//!   order always agree
//! - [`SessionEvent`]s go out on a broadcast channel; the shell listens for
//!   [`SessionEvent::RedirectToLogin`] after a request was rejected

pub mod storage;

pub use storage::{
    FileSessionStorage, MemorySessionStorage, SessionStorage, StorageError, clear_stored_auth,
    read_stored_auth,
};

use std::sync::{Arc, Mutex, PoisonError};

use repair_desk_core::UserRecord;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

const EVENT_CAPACITY: usize = 16;

/// Snapshot of the authentication state.
///
/// `is_authenticated` is true exactly when both a token and a user are
/// present, for every state produced by [`SessionStore::login`] and
/// [`SessionStore::logout`]. [`SessionStore::update_user`] can attach a user
/// to an anonymous session without authenticating it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, with = "token_serde")]
    token: Option<SecretString>,
    #[serde(default)]
    user: Option<UserRecord>,
    #[serde(default)]
    is_authenticated: bool,
}

impl Session {
    /// The empty, unauthenticated session.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A signed-in session.
    #[must_use]
    pub const fn authenticated(token: SecretString, user: UserRecord) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
            is_authenticated: true,
        }
    }

    /// Bearer token, if any.
    #[must_use]
    pub const fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    /// Whether the session is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Drop the authenticated flag when the token or user is missing.
    ///
    /// Applied to rehydrated snapshots, which may have been edited by hand.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.is_authenticated && (self.token.is_none() || self.user.is_none()) {
            tracing::warn!("Stored session claims authentication without token or user");
            self.is_authenticated = false;
        }
        self
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        let token = |s: &Self| s.token.as_ref().map(|t| t.expose_secret().to_owned());
        token(self) == token(other)
            && self.user == other.user
            && self.is_authenticated == other.is_authenticated
    }
}

mod token_serde {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ref_option)] // signature required by serde(with)
    pub fn serialize<S: Serializer>(
        token: &Option<SecretString>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        token
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<SecretString>, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
    }
}

/// Why a session was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked to sign out.
    User,
    /// The backend rejected the session token.
    Unauthorized,
}

/// Session change notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user signed in.
    LoggedIn,
    /// The session was cleared.
    LoggedOut {
        /// What triggered the logout.
        reason: LogoutReason,
    },
    /// The user record was replaced.
    UserUpdated,
    /// Navigate to the login entry point.
    RedirectToLogin,
}

/// Process-wide session holder.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    state: watch::Sender<Session>,
    events: broadcast::Sender<SessionEvent>,
    storage: Box<dyn SessionStorage>,
    /// Serializes mutations so storage, snapshot and events stay in one order.
    write: Mutex<()>,
}

impl SessionStore {
    /// Create a store, rehydrating from `storage`.
    ///
    /// An unreadable entry is logged and treated as "not signed in".
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        let initial = match storage.load() {
            Ok(Some(session)) => {
                tracing::debug!(
                    authenticated = session.is_authenticated(),
                    "Session rehydrated"
                );
                session
            }
            Ok(None) => Session::empty(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to rehydrate session, starting signed out");
                Session::empty()
            }
        };

        let (state, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(SessionStoreInner {
                state,
                events,
                storage: Box::new(storage),
                write: Mutex::new(()),
            }),
        }
    }

    /// A store backed by memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemorySessionStorage::new())
    }

    /// Sign in: set token and user, mark authenticated.
    pub fn login(&self, token: SecretString, user: UserRecord) {
        tracing::info!(user_id = %user.id, username = %user.username, "Session started");
        self.apply(
            |session| *session = Session::authenticated(token, user),
            &[SessionEvent::LoggedIn],
        );
    }

    /// Sign out: clear token, user and the authenticated flag.
    pub fn logout(&self) {
        self.clear(LogoutReason::User, &[]);
    }

    /// Sign out because the backend rejected the token, then ask for the
    /// login entry point.
    pub fn logout_unauthorized(&self) {
        self.clear(LogoutReason::Unauthorized, &[SessionEvent::RedirectToLogin]);
    }

    /// Replace the user record. Token and authentication are untouched.
    pub fn update_user(&self, user: UserRecord) {
        self.apply(
            |session| session.user = Some(user),
            &[SessionEvent::UserUpdated],
        );
    }

    /// Current snapshot.
    #[must_use]
    pub fn read(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Current bearer token.
    #[must_use]
    pub fn token(&self) -> Option<SecretString> {
        self.inner.state.borrow().token.clone()
    }

    /// Whether the current snapshot is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated
    }

    /// Watch snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Receive session events from now on.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn clear(&self, reason: LogoutReason, then: &[SessionEvent]) {
        tracing::info!(?reason, "Session cleared");
        let mut events = vec![SessionEvent::LoggedOut { reason }];
        events.extend_from_slice(then);
        self.apply(|session| *session = Session::empty(), &events);
    }

    /// Change the snapshot in place, persist it, publish it, then emit
    /// `events`. The whole sequence runs under the write lock.
    fn apply(&self, change: impl FnOnce(&mut Session), events: &[SessionEvent]) {
        let _guard = self
            .inner
            .write
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut next = self.read();
        change(&mut next);

        if let Err(e) = self.inner.storage.save(&next) {
            tracing::warn!(error = %e, "Failed to persist session");
        }
        self.inner.state.send_replace(next);

        for event in events {
            // No receivers is fine
            let _ = self.inner.events.send(event.clone());
        }
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn mock_user() -> UserRecord {
        UserRecord::new("1", "testuser", "test@example.com")
    }

    #[test]
    fn test_initializes_signed_out() {
        let store = SessionStore::in_memory();
        let state = store.read();

        assert!(!state.is_authenticated());
        assert!(state.token().is_none());
        assert!(state.user().is_none());
    }

    #[test]
    fn test_login() {
        let store = SessionStore::in_memory();
        store.login(SecretString::from("jwt-token-123"), mock_user());

        let state = store.read();
        assert!(state.is_authenticated());
        assert_eq!(
            state.token().map(|t| t.expose_secret().to_owned()),
            Some("jwt-token-123".to_string())
        );
        assert_eq!(state.user(), Some(&mock_user()));
    }

    #[test]
    fn test_logout_restores_initial_state() {
        let store = SessionStore::in_memory();
        let initial = store.read();

        store.login(SecretString::from("jwt-token-123"), mock_user());
        assert!(store.is_authenticated());

        store.logout();
        assert_eq!(store.read(), initial);
        assert_eq!(store.read(), Session::empty());
    }

    #[test]
    fn test_update_user_keeps_authentication() {
        let store = SessionStore::in_memory();
        store.login(SecretString::from("token"), mock_user());

        let updated = UserRecord::new("1", "updateduser", "updated@example.com");
        store.update_user(updated.clone());

        let state = store.read();
        assert_eq!(state.user(), Some(&updated));
        assert!(state.is_authenticated());
        assert_eq!(
            state.token().map(|t| t.expose_secret().to_owned()),
            Some("token".to_string())
        );
    }

    #[test]
    fn test_update_user_does_not_authenticate() {
        let store = SessionStore::in_memory();
        store.update_user(mock_user());

        let state = store.read();
        assert!(state.user().is_some());
        assert!(state.token().is_none());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_mutations_are_persisted() {
        let dir = tempfile::tempdir().unwrap();

        let store = SessionStore::new(FileSessionStorage::new(dir.path()));
        store.login(SecretString::from("persisted"), mock_user());

        // A fresh store over the same directory sees the session
        let rehydrated = SessionStore::new(FileSessionStorage::new(dir.path()));
        assert!(rehydrated.is_authenticated());
        assert_eq!(rehydrated.read(), store.read());

        rehydrated.logout();
        let again = SessionStore::new(FileSessionStorage::new(dir.path()));
        assert_eq!(again.read(), Session::empty());
    }

    #[test]
    fn test_rehydrate_normalizes_inconsistent_state() {
        let storage = MemorySessionStorage::with_raw(
            r#"{"state":{"token":null,"user":null,"isAuthenticated":true},"version":0}"#,
        );
        let store = SessionStore::new(storage);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_rehydrate_corrupt_storage_starts_signed_out() {
        let store = SessionStore::new(MemorySessionStorage::with_raw("garbage"));
        assert_eq!(store.read(), Session::empty());
    }

    #[test]
    fn test_unauthorized_logout_emits_redirect() {
        let store = SessionStore::in_memory();
        store.login(SecretString::from("token"), mock_user());

        let mut events = store.events();
        store.logout_unauthorized();

        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::LoggedOut {
                reason: LogoutReason::Unauthorized
            }
        );
        assert_eq!(events.try_recv().unwrap(), SessionEvent::RedirectToLogin);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_user_logout_does_not_redirect() {
        let store = SessionStore::in_memory();
        let mut events = store.events();

        store.logout();
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::LoggedOut {
                reason: LogoutReason::User
            }
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let store = SessionStore::in_memory();
        let mut rx = store.subscribe();

        store.login(SecretString::from("token"), mock_user());
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_authenticated());
    }

    #[test]
    fn test_debug_redacts_token() {
        let store = SessionStore::in_memory();
        store.login(SecretString::from("super-secret-jwt"), mock_user());

        let debug_output = format!("{store:?}");
        assert!(!debug_output.contains("super-secret-jwt"));
    }

    #[test]
    fn test_token_and_authenticated_flag_move_together() {
        let store = SessionStore::in_memory();
        let check = |s: &Session| {
            if s.token().is_none() {
                assert!(!s.is_authenticated());
            }
            if s.is_authenticated() {
                assert!(s.token().is_some() && s.user().is_some());
            }
        };

        check(&store.read());
        store.login(SecretString::from("t"), mock_user());
        check(&store.read());
        store.update_user(mock_user());
        check(&store.read());
        store.logout();
        check(&store.read());
        store.update_user(mock_user());
        check(&store.read());
    }

    /// Storage that parks inside `save` while the saved user is `gated`.
    struct GatedStorage {
        shared: Arc<MemorySessionStorage>,
        gated: &'static str,
        entered: std::sync::mpsc::Sender<()>,
        release: Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl SessionStorage for GatedStorage {
        fn load(&self) -> Result<Option<Session>, StorageError> {
            self.shared.load()
        }

        fn save(&self, session: &Session) -> Result<(), StorageError> {
            if session.user().is_some_and(|u| u.username == self.gated) {
                self.entered.send(()).unwrap();
                self.release.lock().unwrap().recv().unwrap();
            }
            self.shared.save(session)
        }

        fn clear(&self) -> Result<(), StorageError> {
            self.shared.clear()
        }
    }

    #[test]
    fn test_logout_during_user_update_is_not_undone() {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let shared = Arc::new(MemorySessionStorage::new());
        let store = SessionStore::new(GatedStorage {
            shared: Arc::clone(&shared),
            gated: "renamed",
            entered: entered_tx,
            release: Mutex::new(release_rx),
        });
        store.login(SecretString::from("token"), mock_user());

        let updater = {
            let store = store.clone();
            std::thread::spawn(move || {
                store.update_user(UserRecord::new("1", "renamed", "test@example.com"));
            })
        };
        entered_rx.recv().unwrap();

        let logger = {
            let store = store.clone();
            std::thread::spawn(move || store.logout())
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        release_tx.send(()).unwrap();
        updater.join().unwrap();
        logger.join().unwrap();

        let state = store.read();
        assert!(!state.is_authenticated());
        assert!(state.token().is_none());
        assert_eq!(shared.load().unwrap(), Some(state));
    }

    #[test]
    fn test_events_follow_mutation_order() {
        let store = SessionStore::in_memory();
        let mut events = store.events();

        store.login(SecretString::from("t"), mock_user());
        store.update_user(mock_user());
        store.logout_unauthorized();

        let received: Vec<_> = std::iter::from_fn(|| events.try_recv().ok()).collect();
        assert_eq!(
            received,
            vec![
                SessionEvent::LoggedIn,
                SessionEvent::UserUpdated,
                SessionEvent::LoggedOut {
                    reason: LogoutReason::Unauthorized
                },
                SessionEvent::RedirectToLogin,
            ]
        );
    }
}
