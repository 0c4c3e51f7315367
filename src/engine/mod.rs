//! # SQL Template Engine
//!
//! Turns a stored template string plus a bag of request parameters into a
//! safely parameterized statement, executes it (plain or callable) on a
//! named connection, and shapes the result into a JSON envelope.
//!
//! Within one request the stages are strictly sequential: parse fully
//! completes before execution begins, execution fully completes before
//! shaping. The engine holds no per-request state beyond the request's own
//! objects, so it can be invoked concurrently.

pub mod dispatch;
pub mod errors;
pub mod executor;
pub mod params;
pub mod shaper;
pub mod template;

pub use dispatch::{Dispatcher, IncomingRequest};
pub use errors::{BindError, EngineError, EngineResult};
pub use executor::{ExecutionResult, Row, StatementExecutor};
pub use params::{ParameterSource, RequestBody};
pub use shaper::Envelope;
pub use template::{BoundParameter, CastHint, ParsedTemplate};
