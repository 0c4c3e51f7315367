//! # HTTP Server
//!
//! Axum wiring around the engine: a health route, the dynamic endpoint
//! fallback, CORS, and the shared route-table swap point.

pub mod http;
pub mod routes;

pub use http::EndpointServer;
pub use routes::{RoutePattern, RouteTable, SharedRoutes};
