//! sqlroute - stored SQL templates behind configurable HTTP endpoints
//!
//! An administrator registers HTTP-reachable endpoints, each bound to a SQL
//! template per verb and a named database connection. At request time the
//! matching template is parsed, its placeholders are bound to request
//! parameters, the statement runs on the configured connection, and the
//! result is shaped into a JSON envelope.

pub mod cli;
pub mod config;
pub mod engine;
pub mod observability;
pub mod provider;
pub mod server;
