//! # Endpoint HTTP Server
//!
//! Serves registered endpoints over HTTP. Every non-health request falls
//! through to the dynamic endpoint handler, which resolves it against the
//! current route-table snapshot and runs the engine. Error detail is
//! suppressed in production responses unless the debug flag is set.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::{AppConfig, ServerConfig, Verb};
use crate::engine::dispatch::{Dispatcher, IncomingRequest};
use crate::engine::errors::EngineError;
use crate::engine::params::RequestBody;
use crate::observability::Logger;
use crate::provider::ConnectionProvider;

use super::routes::{RouteTable, SharedRoutes};

/// Production messages for detail-gated errors
const NOT_FOUND_MESSAGE: &str = "API not found";
const UNAVAILABLE_MESSAGE: &str = "Unable to connect to the database";

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

/// HTTP server over a route table and a connection provider
pub struct EndpointServer<P: ConnectionProvider> {
    config: ServerConfig,
    routes: Arc<SharedRoutes>,
    dispatcher: Arc<Dispatcher<P>>,
}

/// Shared handler state
struct AppState<P: ConnectionProvider> {
    routes: Arc<SharedRoutes>,
    dispatcher: Arc<Dispatcher<P>>,
    debug: bool,
}

impl<P: ConnectionProvider> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            routes: self.routes.clone(),
            dispatcher: self.dispatcher.clone(),
            debug: self.debug,
        }
    }
}

impl<P: ConnectionProvider + 'static> EndpointServer<P> {
    /// Creates a server over an already-built route table
    pub fn new(config: ServerConfig, table: RouteTable, provider: Arc<P>) -> Self {
        let dispatcher = Dispatcher::new(provider, config.log_level, config.debug);
        Self {
            config,
            routes: Arc::new(SharedRoutes::new(table)),
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Creates a server from a loaded configuration
    pub fn from_config(config: AppConfig, provider: Arc<P>) -> Self {
        let table = RouteTable::build(config.endpoints);
        Self::new(config.server, table, provider)
    }

    /// The swap point for publishing a rebuilt route table; the
    /// administrative collaborator holds this to re-register endpoints
    /// without restarting the server.
    pub fn shared_routes(&self) -> Arc<SharedRoutes> {
        self.routes.clone()
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        let state = AppState {
            routes: self.routes.clone(),
            dispatcher: self.dispatcher.clone(),
            debug: self.config.debug,
        };

        Router::new()
            .route("/health", get(health_handler))
            .fallback(endpoint_handler::<P>)
            .with_state(state)
            .layer(cors_layer(&self.config))
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Start the HTTP server (async)
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid socket address: {}", e),
            )
        })?;

        let router = self.router();
        Logger::info("SERVER_START", &[("addr", &addr.to_string())]);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

/// CORS from config; no configured origins means permissive (development)
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Liveness probe
async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// Dynamic endpoint handler; every unrouted request lands here
async fn endpoint_handler<P: ConnectionProvider + 'static>(
    State(state): State<AppState<P>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(verb) = method_to_verb(&method) else {
        return error_response(StatusCode::NOT_FOUND, NOT_FOUND_MESSAGE);
    };

    let query = uri.query().map(parse_query_pairs).unwrap_or_default();
    let body = match decode_body(&headers, &body) {
        Ok(body) => body,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
    };

    let request = IncomingRequest {
        path: uri.path().to_string(),
        verb,
        query,
        body,
    };

    let snapshot = state.routes.snapshot();
    match state.dispatcher.handle(&snapshot, &request) {
        Ok(envelope) => Json(envelope.to_json()).into_response(),
        Err(err) => engine_error_response(err, state.debug),
    }
}

fn method_to_verb(method: &Method) -> Option<Verb> {
    Verb::from_name(method.as_str())
}

fn parse_query_pairs(query: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_default()
}

/// Decodes a request body by content type. Unknown content types carry no
/// parameters rather than failing the request.
fn decode_body(headers: &HeaderMap, body: &Bytes) -> Result<Option<RequestBody>, String> {
    if body.is_empty() {
        return Ok(None);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.starts_with("application/json") {
        serde_json::from_slice::<Value>(body)
            .map(|value| Some(RequestBody::Json(value)))
            .map_err(|e| format!("Invalid JSON body: {}", e))
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
            .map(|pairs| Some(RequestBody::Form(pairs)))
            .map_err(|e| format!("Invalid form body: {}", e))
    } else {
        Ok(None)
    }
}

/// Maps an engine error to its HTTP response, gating detail by debug mode
fn engine_error_response(err: EngineError, debug: bool) -> Response {
    let status = err.status_code();
    match err {
        // The 400 body is the list of binding-error strings
        EngineError::Binding(errors) => {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            (status, Json(json!(messages))).into_response()
        }
        EngineError::EndpointNotFound { .. } if !debug => {
            error_response(status, NOT_FOUND_MESSAGE)
        }
        EngineError::ConnectionUnavailable { .. } if !debug => {
            error_response(status, UNAVAILABLE_MESSAGE)
        }
        err => error_response(status, &err.to_string()),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorResponse {
        error: message.to_string(),
        code: status.as_u16(),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointDef;
    use crate::provider::MemoryProvider;

    fn test_server() -> EndpointServer<MemoryProvider> {
        let endpoints = vec![EndpointDef::new("users/<id>", "main")
            .with_statement(Verb::Get, "SELECT * FROM users WHERE id = <id>")];
        let config = AppConfig {
            connections: vec!["main".to_string()],
            endpoints,
            ..Default::default()
        };
        EndpointServer::from_config(config, Arc::new(MemoryProvider::new()))
    }

    #[test]
    fn test_router_builds() {
        let server = test_server();
        let _router = server.router();
        // If we get here, router construction succeeded
    }

    #[test]
    fn test_socket_addr_from_config() {
        let server = test_server();
        assert_eq!(server.socket_addr(), "0.0.0.0:8075");
    }

    #[test]
    fn test_method_to_verb() {
        assert_eq!(method_to_verb(&Method::GET), Some(Verb::Get));
        assert_eq!(method_to_verb(&Method::DELETE), Some(Verb::Delete));
        assert_eq!(method_to_verb(&Method::PATCH), None);
    }

    #[test]
    fn test_parse_query_pairs_keeps_order() {
        let pairs = parse_query_pairs("b=2&a=1&b=3");
        assert_eq!(
            pairs,
            vec![
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "3".to_string())
            ]
        );
    }

    #[test]
    fn test_decode_body_json() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        let body = Bytes::from_static(b"{\"id\": 7}");

        let decoded = decode_body(&headers, &body).unwrap();
        assert!(matches!(decoded, Some(RequestBody::Json(_))));

        let bad = Bytes::from_static(b"{nope");
        assert!(decode_body(&headers, &bad).is_err());
    }

    #[test]
    fn test_decode_body_form() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded".parse().unwrap(),
        );
        let body = Bytes::from_static(b"name=ada&id=7");

        let decoded = decode_body(&headers, &body).unwrap();
        let Some(RequestBody::Form(pairs)) = decoded else {
            panic!("expected form body");
        };
        assert_eq!(pairs[0], ("name".to_string(), "ada".to_string()));
    }

    #[test]
    fn test_decode_body_unknown_content_type() {
        let headers = HeaderMap::new();
        let body = Bytes::from_static(b"whatever");
        assert!(decode_body(&headers, &body).unwrap().is_none());
    }
}
