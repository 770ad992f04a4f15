//! HTTP fixture server for exercising the request pipeline end to end.
//!
//! Routes:
//! - `ANY /echo[/*rest]` reflects method, path, query, headers and body.
//! - `ANY /status/{code}` answers with `code`, using the `body` query
//!   parameter as the payload.
//! - `GET /delay/{ms}` answers `200` after sleeping.
//! - `GET /users/{id}` returns a user; id `0` is a `404` with a JSON error.
//! - `GET /malformed` answers `200` with a truncated JSON document.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/status/{code}", any(status))
        .route("/delay/{ms}", get(delay))
        .route("/users/{id}", get(user))
        .route("/malformed", get(malformed))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    method: Method,
    uri: Uri,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| Some((name.as_str().to_owned(), value.to_str().ok()?.to_owned())))
        .collect();
    let body = if body.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&body).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&body).into_owned())
        }))
    };
    tracing::debug!(%method, %uri, "echo");
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_owned(),
        query,
        headers,
        body,
    })
}

async fn status(
    Path(code): Path<u16>,
    Query(query): Query<BTreeMap<String, String>>,
) -> Result<(StatusCode, String), StatusCode> {
    let code = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    let body = query.get("body").cloned().unwrap_or_default();
    Ok((code, body))
}

async fn delay(Path(ms): Path<u64>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "delayed_ms": ms }))
}

async fn user(Path(id): Path<u64>) -> impl IntoResponse {
    if id == 0 {
        let error = serde_json::json!({ "error": "user not found", "id": id });
        return (StatusCode::NOT_FOUND, Json(error)).into_response();
    }
    Json(User {
        id,
        name: format!("user-{id}"),
    })
    .into_response()
}

async fn malformed() -> (StatusCode, &'static str) {
    (StatusCode::OK, r#"{"id": 1, "name": "#)
}
