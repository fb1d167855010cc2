//! Application shell.
//!
//! Wires the session store, HTTP client, resource adapter and auth hooks
//! together, decides between the login view and the resource browser, and
//! guards every resource operation with the session checks.

use std::sync::Arc;

use repair_desk_core::{
    CreateParams, DeleteManyParams, DeleteParams, GetListParams, GetListResult, GetManyParams,
    GetManyReferenceParams, GetManyResult, GetOneParams, IdentifiersResult, RecordResult,
    UpdateManyParams, UpdateParams,
};
use thiserror::Error;

use crate::auth::{AuthGateway, AuthProvider};
use crate::config::{AdminConfig, ApiConfig};
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::login::LoginForm;
use crate::provider::DataProvider;
use crate::session::{FileSessionStorage, Session, SessionStore};
use crate::strapi::StrapiProvider;

/// Console title.
pub const APP_TITLE: &str = "ระบบจัดการร้านซ่อม";

/// A browsable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDef {
    /// Backend collection name.
    pub name: &'static str,
    /// Display label.
    pub label: &'static str,
}

/// Registered resources.
pub const RESOURCES: &[ResourceDef] = &[
    ResourceDef {
        name: "customers",
        label: "ลูกค้า",
    },
    ResourceDef {
        name: "categories",
        label: "หมวดหมู่",
    },
    ResourceDef {
        name: "units",
        label: "หน่วย",
    },
];

/// Look up a registered resource by name.
#[must_use]
pub fn find_resource(name: &str) -> Option<&'static ResourceDef> {
    RESOURCES.iter().find(|r| r.name == name)
}

/// Which top-level view the shell shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Not signed in.
    Login,
    /// Signed in: resource browser.
    Browser,
}

impl View {
    /// The view for a session snapshot.
    #[must_use]
    pub const fn for_session(session: &Session) -> Self {
        if session.is_authenticated() {
            Self::Browser
        } else {
            Self::Login
        }
    }
}

/// Errors from shell operations.
#[derive(Debug, Error)]
pub enum ShellError {
    /// Resource name is not registered.
    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    /// No signed-in session.
    #[error("login required")]
    LoginRequired,

    /// The backend request failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The console.
#[derive(Clone)]
pub struct AppShell {
    session: SessionStore,
    gateway: AuthGateway,
    auth: AuthProvider,
    provider: Arc<dyn DataProvider>,
}

impl AppShell {
    /// Shell over the persisted session in `config.state_dir`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn from_config(config: &AdminConfig) -> Result<Self, ApiError> {
        let session = SessionStore::new(FileSessionStorage::new(&config.state_dir));
        Self::new(config.api(), session)
    }

    /// Shell talking to the Strapi backend at `api`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(api: &ApiConfig, session: SessionStore) -> Result<Self, ApiError> {
        let client = ApiClient::new(api, session.clone())?;
        let gateway = AuthGateway::new(client.clone());
        let provider = Arc::new(StrapiProvider::new(client));
        Ok(Self::with_provider(session, gateway, provider))
    }

    /// Shell over an arbitrary data provider.
    #[must_use]
    pub fn with_provider(
        session: SessionStore,
        gateway: AuthGateway,
        provider: Arc<dyn DataProvider>,
    ) -> Self {
        Self {
            auth: AuthProvider::new(session.clone()),
            session,
            gateway,
            provider,
        }
    }

    /// Console title.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        APP_TITLE
    }

    /// Registered resources.
    #[must_use]
    pub const fn resources(&self) -> &'static [ResourceDef] {
        RESOURCES
    }

    /// The session store.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The auth hooks.
    #[must_use]
    pub const fn auth(&self) -> &AuthProvider {
        &self.auth
    }

    /// The credential endpoints.
    #[must_use]
    pub const fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    /// The view for the current session.
    #[must_use]
    pub fn view(&self) -> View {
        View::for_session(&self.session.read())
    }

    /// A fresh login form bound to this shell's session.
    #[must_use]
    pub fn login_form(&self) -> LoginForm {
        LoginForm::new(self.gateway.clone(), self.session.clone())
    }

    /// Resolve once the session maps to `view`.
    pub async fn wait_for_view(&self, view: View) {
        let mut rx = self.session.subscribe();
        if rx.wait_for(|s| View::for_session(s) == view).await.is_err() {
            tracing::debug!("Session store dropped while waiting for view change");
        }
    }

    /// Open a registered resource.
    ///
    /// # Errors
    ///
    /// Returns `ShellError::UnknownResource` for unregistered names and
    /// `ShellError::LoginRequired` when signed out.
    pub fn browse(&self, name: &str) -> Result<ResourceBrowser<'_>, ShellError> {
        let resource =
            find_resource(name).ok_or_else(|| ShellError::UnknownResource(name.to_string()))?;
        self.auth.check_auth().map_err(|_| ShellError::LoginRequired)?;
        Ok(ResourceBrowser {
            shell: self,
            resource,
        })
    }
}

impl std::fmt::Debug for AppShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppShell")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// CRUD on one registered resource.
///
/// Each call re-checks the session, and failed requests go through
/// [`AuthProvider::check_error`], so 401/403 sign the user out.
#[derive(Debug, Clone, Copy)]
pub struct ResourceBrowser<'a> {
    shell: &'a AppShell,
    resource: &'static ResourceDef,
}

impl ResourceBrowser<'_> {
    /// The resource being browsed.
    #[must_use]
    pub const fn resource(&self) -> &'static ResourceDef {
        self.resource
    }

    /// # Errors
    ///
    /// See [`ShellError`].
    pub async fn list(&self, params: &GetListParams) -> Result<GetListResult, ShellError> {
        self.guard(self.provider().get_list(self.resource.name, params))
            .await
    }

    /// # Errors
    ///
    /// See [`ShellError`].
    pub async fn get_one(&self, params: &GetOneParams) -> Result<RecordResult, ShellError> {
        self.guard(self.provider().get_one(self.resource.name, params))
            .await
    }

    /// # Errors
    ///
    /// See [`ShellError`].
    pub async fn get_many(&self, params: &GetManyParams) -> Result<GetManyResult, ShellError> {
        self.guard(self.provider().get_many(self.resource.name, params))
            .await
    }

    /// # Errors
    ///
    /// See [`ShellError`].
    pub async fn get_many_reference(
        &self,
        params: &GetManyReferenceParams,
    ) -> Result<GetListResult, ShellError> {
        self.guard(self.provider().get_many_reference(self.resource.name, params))
            .await
    }

    /// # Errors
    ///
    /// See [`ShellError`].
    pub async fn create(&self, params: &CreateParams) -> Result<RecordResult, ShellError> {
        self.guard(self.provider().create(self.resource.name, params))
            .await
    }

    /// # Errors
    ///
    /// See [`ShellError`].
    pub async fn update(&self, params: &UpdateParams) -> Result<RecordResult, ShellError> {
        self.guard(self.provider().update(self.resource.name, params))
            .await
    }

    /// # Errors
    ///
    /// See [`ShellError`].
    pub async fn update_many(
        &self,
        params: &UpdateManyParams,
    ) -> Result<IdentifiersResult, ShellError> {
        self.guard(self.provider().update_many(self.resource.name, params))
            .await
    }

    /// # Errors
    ///
    /// See [`ShellError`].
    pub async fn delete(&self, params: &DeleteParams) -> Result<RecordResult, ShellError> {
        self.guard(self.provider().delete(self.resource.name, params))
            .await
    }

    /// # Errors
    ///
    /// See [`ShellError`].
    pub async fn delete_many(
        &self,
        params: &DeleteManyParams,
    ) -> Result<IdentifiersResult, ShellError> {
        self.guard(self.provider().delete_many(self.resource.name, params))
            .await
    }

    fn provider(&self) -> &dyn DataProvider {
        self.shell.provider.as_ref()
    }

    async fn guard<T>(
        &self,
        request: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ShellError> {
        self.shell
            .auth
            .check_auth()
            .map_err(|_| ShellError::LoginRequired)?;

        match request.await {
            Ok(value) => Ok(value),
            Err(e) => {
                if let Err(rejected) = self.shell.auth.check_error(&e) {
                    tracing::warn!(resource = self.resource.name, %rejected, "Session ended");
                }
                Err(e.into())
            }
        }
    }
}
