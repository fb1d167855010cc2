//! Integration tests for Repair Desk.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p repair-desk-integration-tests
//! ```
//!
//! No external services are needed: [`MockBackend`] serves a small subset of
//! the Strapi v5 REST API on `127.0.0.1` and records every request it sees.
//!
//! # Mock behaviour
//!
//! - `POST /api/auth/local` accepts [`VALID_IDENTIFIER`] / [`VALID_PASSWORD`]
//!   and returns [`VALID_TOKEN`] with a user whose `id` is `"1"`
//! - `POST /api/auth/local/register` accepts any username except
//!   [`TAKEN_USERNAME`]
//! - `/api/:resource[/:documentId]` requires `Authorization: Bearer abc`
//!   (401 otherwise, or always after [`MockBackend::revoke_tokens`])
//! - `PUT` on [`LOCKED_ID`] answers 403
//! - Creating a record with an empty `name` answers 400

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use repair_desk_admin::ApiConfig;
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Identifier the mock accepts.
pub const VALID_IDENTIFIER: &str = "admin";
/// Password the mock accepts.
pub const VALID_PASSWORD: &str = "secret";
/// JWT the mock issues and expects.
pub const VALID_TOKEN: &str = "abc";
/// Username the register endpoint refuses.
pub const TAKEN_USERNAME: &str = "taken";
/// documentId whose updates are forbidden.
pub const LOCKED_ID: &str = "locked";

const DEFAULT_PAGE_SIZE: usize = 25;

/// One request as received by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Path without the `/api` prefix.
    pub path: String,
    /// Decoded query pairs, in order.
    pub query: Vec<(String, String)>,
    /// Raw `Authorization` header.
    pub authorization: Option<String>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl RecordedRequest {
    /// Values of every query pair named `key`.
    #[must_use]
    pub fn query_values(&self, key: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

#[derive(Default)]
struct MockState {
    requests: Mutex<Vec<RecordedRequest>>,
    /// resource -> documentId -> record
    records: Mutex<BTreeMap<String, BTreeMap<String, Value>>>,
    next_id: AtomicU64,
    tokens_revoked: AtomicBool,
    delete_no_content: AtomicBool,
}

impl MockState {
    fn records(&self) -> MutexGuard<'_, BTreeMap<String, BTreeMap<String, Value>>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn requests(&self) -> MutexGuard<'_, Vec<RecordedRequest>> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// In-process Strapi stand-in.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockBackend {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Arc::new(MockState {
            next_id: AtomicU64::new(1),
            ..MockState::default()
        });

        let app = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("Mock backend has no address");

        let server = tokio::spawn(async move {
            // Ends when the test drops the backend
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Base URL including the `/api` prefix.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client settings pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the base URL does not parse, which cannot happen for a bound
    /// socket address.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(&self.base_url()).expect("Mock base URL is valid")
    }

    /// Store `record` (which must carry a `documentId`) under `resource`.
    pub fn seed(&self, resource: &str, record: Value) {
        let Some(document_id) = record.get("documentId").and_then(Value::as_str) else {
            return;
        };
        self.state
            .records()
            .entry(resource.to_string())
            .or_default()
            .insert(document_id.to_string(), record.clone());
    }

    /// A stored record.
    #[must_use]
    pub fn record(&self, resource: &str, document_id: &str) -> Option<Value> {
        self.state
            .records()
            .get(resource)
            .and_then(|records| records.get(document_id))
            .cloned()
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests().clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.requests().last().cloned()
    }

    /// Forget recorded requests.
    pub fn clear_requests(&self) {
        self.state.requests().clear();
    }

    /// Reject every token from now on.
    pub fn revoke_tokens(&self) {
        self.state.tokens_revoked.store(true, Ordering::SeqCst);
    }

    /// Answer deletes with `204 No Content` instead of the deleted record.
    pub fn delete_without_body(&self, enabled: bool) {
        self.state.delete_no_content.store(enabled, Ordering::SeqCst);
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Request handling
// =============================================================================

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(path) = uri.path().strip_prefix("/api") else {
        return error(StatusCode::NOT_FOUND, "NotFoundError", "Not Found");
    };

    let request = RecordedRequest {
        method: method.clone(),
        path: path.to_string(),
        query: url::form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
            .into_owned()
            .collect(),
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: serde_json::from_slice(&body).ok(),
    };
    state.requests().push(request.clone());

    match (method, path) {
        (Method::POST, "/auth/local") => login(&request),
        (Method::POST, "/auth/local/register") => register(&request),
        _ => {
            let expected = format!("Bearer {VALID_TOKEN}");
            if state.tokens_revoked.load(Ordering::SeqCst)
                || request.authorization.as_deref() != Some(expected.as_str())
            {
                return error(
                    StatusCode::UNAUTHORIZED,
                    "UnauthorizedError",
                    "Missing or invalid credentials",
                );
            }
            resource(&state, &request)
        }
    }
}

fn login(request: &RecordedRequest) -> Response {
    let body = request.body.clone().unwrap_or_default();
    let identifier = body.get("identifier").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);

    if identifier == Some(VALID_IDENTIFIER) && password == Some(VALID_PASSWORD) {
        Json(json!({
            "jwt": VALID_TOKEN,
            "user": {
                "id": "1",
                "documentId": "u1",
                "username": VALID_IDENTIFIER,
                "email": "admin@example.com",
                "confirmed": true,
                "blocked": false
            }
        }))
        .into_response()
    } else {
        error(
            StatusCode::BAD_REQUEST,
            "ValidationError",
            "Invalid identifier or password",
        )
    }
}

fn register(request: &RecordedRequest) -> Response {
    let body = request.body.clone().unwrap_or_default();
    let username = body.get("username").and_then(Value::as_str).unwrap_or_default();
    let email = body.get("email").and_then(Value::as_str).unwrap_or_default();

    if username == TAKEN_USERNAME {
        return error(
            StatusCode::BAD_REQUEST,
            "ApplicationError",
            "Email or Username are already taken",
        );
    }

    Json(json!({
        "jwt": "registered-token",
        "user": {"id": 2, "username": username, "email": email, "confirmed": true}
    }))
    .into_response()
}

fn resource(state: &MockState, request: &RecordedRequest) -> Response {
    let segments: Vec<&str> = request
        .path
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    match (segments.as_slice(), &request.method) {
        ([name], &Method::GET) => list(state, name, &request.query),
        ([name], &Method::POST) => create(state, name, request.body.as_ref()),
        ([name, id], &Method::GET) => match state.records().get(*name).and_then(|r| r.get(*id)) {
            Some(record) => single(record.clone()),
            None => not_found(),
        },
        ([name, id], &Method::PUT) => update(state, name, id, request.body.as_ref()),
        ([name, id], &Method::DELETE) => delete(state, name, id),
        _ => error(StatusCode::METHOD_NOT_ALLOWED, "MethodNotAllowedError", "Method Not Allowed"),
    }
}

fn list(state: &MockState, name: &str, query: &[(String, String)]) -> Response {
    let mut records: Vec<Value> = state
        .records()
        .get(name)
        .map(|r| r.values().cloned().collect())
        .unwrap_or_default();

    let wanted_ids: Vec<&str> = query
        .iter()
        .filter(|(k, _)| k == "filters[documentId][$in][]")
        .map(|(_, v)| v.as_str())
        .collect();
    if !wanted_ids.is_empty() {
        records.retain(|r| {
            r.get("documentId")
                .and_then(Value::as_str)
                .is_some_and(|id| wanted_ids.contains(&id))
        });
    }

    for (key, value) in query {
        let Some(filter) = key.strip_prefix("filters[") else {
            continue;
        };
        if let Some(field) = filter.strip_suffix("][$containsi]") {
            let needle = value.to_lowercase();
            records.retain(|r| {
                r.get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v.to_lowercase().contains(&needle))
            });
        } else if let Some(field) = filter.strip_suffix("][documentId][$eq]") {
            records.retain(|r| relation_id(r.get(field)) == Some(value.as_str()));
        } else if let Some(field) = filter.strip_suffix("][$eq]") {
            records.retain(|r| r.get(field).is_some_and(|v| text(v) == *value));
        }
    }

    if let Some(sort) = query.iter().find(|(k, _)| k == "sort").map(|(_, v)| v) {
        let (field, order) = sort.split_once(':').unwrap_or((sort.as_str(), "asc"));
        records.sort_by_key(|r| r.get(field).map(text).unwrap_or_default());
        if order == "desc" {
            records.reverse();
        }
    }

    let number = |key: &str, default: usize| {
        query
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(default)
    };
    let page = number("pagination[page]", 1);
    let page_size = number("pagination[pageSize]", DEFAULT_PAGE_SIZE);

    let total = records.len();
    let data: Vec<Value> = records
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Json(json!({
        "data": data,
        "meta": {
            "pagination": {
                "page": page,
                "pageSize": page_size,
                "pageCount": total.div_ceil(page_size),
                "total": total
            }
        }
    }))
    .into_response()
}

fn create(state: &MockState, name: &str, body: Option<&Value>) -> Response {
    let Some(Value::Object(fields)) = body.and_then(|b| b.get("data")) else {
        return error(StatusCode::BAD_REQUEST, "ValidationError", "Missing \"data\" payload in the request body");
    };
    if fields.get("name").and_then(Value::as_str) == Some("") {
        return validation_error("name must be defined.", "name");
    }

    let id = state.next_id.fetch_add(1, Ordering::SeqCst);
    let mut record: Map<String, Value> = fields.clone();
    record.insert("id".to_string(), json!(id));
    record.insert("documentId".to_string(), json!(format!("doc{id}")));

    let record = Value::Object(record);
    state
        .records()
        .entry(name.to_string())
        .or_default()
        .insert(format!("doc{id}"), record.clone());

    (StatusCode::CREATED, Json(json!({"data": record, "meta": {}}))).into_response()
}

fn update(state: &MockState, name: &str, id: &str, body: Option<&Value>) -> Response {
    if id == LOCKED_ID {
        return error(StatusCode::FORBIDDEN, "ForbiddenError", "Forbidden");
    }
    let Some(Value::Object(changes)) = body.and_then(|b| b.get("data")) else {
        return error(StatusCode::BAD_REQUEST, "ValidationError", "Missing \"data\" payload in the request body");
    };

    let mut records = state.records();
    let Some(Value::Object(record)) = records.get_mut(name).and_then(|r| r.get_mut(id)) else {
        return not_found();
    };
    for (key, value) in changes {
        record.insert(key.clone(), value.clone());
    }
    single(Value::Object(record.clone()))
}

fn delete(state: &MockState, name: &str, id: &str) -> Response {
    let removed = state.records().get_mut(name).and_then(|r| r.remove(id));
    match removed {
        Some(_) if state.delete_no_content.load(Ordering::SeqCst) => {
            StatusCode::NO_CONTENT.into_response()
        }
        Some(record) => single(record),
        None => not_found(),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// `documentId` of a relation stored either as an object or a bare id.
fn relation_id(value: Option<&Value>) -> Option<&str> {
    match value? {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("documentId").and_then(Value::as_str),
        _ => None,
    }
}

/// Query-string form of a JSON value.
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn single(record: Value) -> Response {
    Json(json!({"data": record, "meta": {}})).into_response()
}

fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "NotFoundError", "Not Found")
}

fn error(status: StatusCode, name: &str, message: &str) -> Response {
    let body = json!({
        "data": null,
        "error": {"status": status.as_u16(), "name": name, "message": message, "details": {}}
    });
    (status, Json(body)).into_response()
}

fn validation_error(message: &str, field: &str) -> Response {
    let body = json!({
        "data": null,
        "error": {
            "status": 400,
            "name": "ValidationError",
            "message": message,
            "details": {"errors": [{"path": [field], "message": message, "name": "ValidationError"}]}
        }
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}
