//! Observability subsystem for sqlroute
//!
//! Provides structured JSON logging and the per-request log policy that
//! applies endpoint-level overrides.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on request handling
//! 3. No async or background threads
//! 4. One log line = one event
//!
//! # Usage
//!
//! ```ignore
//! use sqlroute::observability::{LogPolicy, Logger, Severity};
//!
//! // Log an event
//! Logger::info("ENDPOINT_REQUEST", &[("path", "users/7")]);
//!
//! // Request-scoped gating
//! let policy = LogPolicy::new(Severity::Info);
//! policy.trace("TEMPLATE_PARSED", &[("statement", "SELECT 1")]);
//! ```

mod logger;

pub use logger::{LogPolicy, Logger, Severity};
