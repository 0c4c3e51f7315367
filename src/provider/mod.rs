//! # Database Connection Provider
//!
//! The trait boundary between the template engine and the database backends.
//! The engine asks the provider to run a bound statement or a stored
//! procedure on a named connection and walks the returned cursor. Vendor
//! quirks (output-parameter recovery, result-set draining, binary column
//! surfacing) live inside the adapter behind this boundary so the engine
//! stays driver-agnostic.

mod memory;

pub use memory::{
    JournalEntry, MemoryConnection, MemoryProvider, ProcedureFixture, ResultSetFixture,
    StatementFixture,
};

use serde_json::Value;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors surfaced by a connection provider
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The named connection is not configured or not reachable
    #[error("unknown connection [{0}]")]
    UnknownConnection(String),

    /// The statement or procedure call failed on the backend
    #[error("{0}")]
    Statement(String),
}

/// Wire-level type a driver reports for a result column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Bool,
    Int,
    Float,
    Text,
    /// Binary columns; some drivers surface bit/flag columns this way
    Blob,
}

/// Result-column metadata: name plus declared wire type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub wire_type: WireType,
}

impl Column {
    pub fn new(name: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            name: name.into(),
            wire_type,
        }
    }

    /// Text column shorthand, the most common fixture case
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, WireType::Text)
    }

    /// Integer column shorthand
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, WireType::Int)
    }
}

/// A single SQL value crossing the provider boundary, in either direction:
/// bound parameters flowing in, row cells flowing out.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Converts the value to JSON. `Bytes` decode to an unsigned big-endian
    /// integer; columns declared as blobs get the same treatment at the
    /// executor level regardless of the cell variant.
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Int(i) => Value::from(*i),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::Bytes(bytes) => Value::from(big_endian_uint(bytes)),
        }
    }
}

/// Folds bytes into an unsigned big-endian integer. Bit columns are at most
/// eight bytes wide; if a driver hands back more, the low-order bytes win.
pub fn big_endian_uint(bytes: &[u8]) -> u64 {
    let start = bytes.len().saturating_sub(8);
    bytes[start..]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

/// Argument to a stored-procedure call: either literal SQL text carried over
/// from the template (session variables, constants) or a bound value.
#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    Literal(String),
    Bound(SqlValue),
}

/// Cursor-like handle over one execution's results.
///
/// The cursor owns the connection resource for the duration of the
/// execution; dropping it releases the resource on every exit path.
pub trait Cursor {
    /// Column metadata for the current result set
    fn columns(&self) -> &[Column];

    /// Next row of the current result set, or None when drained
    fn next_row(&mut self) -> Option<Vec<SqlValue>>;

    /// Driver-reported affected-row count
    fn affected_rows(&self) -> u64;

    /// Advance to the next result set; true if one is available
    fn next_result_set(&mut self) -> ProviderResult<bool>;

    /// Named output-parameter values for a procedure call. Adapters that
    /// need a synthetic follow-up query to recover them issue it here.
    fn output_parameters(&mut self) -> ProviderResult<Vec<(String, SqlValue)>>;
}

/// A provider capable of issuing statements and procedure calls against
/// named connections.
pub trait ConnectionProvider: Send + Sync {
    /// Execute a driver-ready statement with positional values
    fn execute(
        &self,
        connection: &str,
        statement: &str,
        values: &[SqlValue],
    ) -> ProviderResult<Box<dyn Cursor + '_>>;

    /// Invoke a stored procedure by name with the given argument list
    fn call_procedure(
        &self,
        connection: &str,
        name: &str,
        args: &[CallArg],
    ) -> ProviderResult<Box<dyn Cursor + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_uint() {
        assert_eq!(big_endian_uint(&[]), 0);
        assert_eq!(big_endian_uint(&[0x01]), 1);
        assert_eq!(big_endian_uint(&[0x01, 0x00]), 256);
        assert_eq!(big_endian_uint(&[0xff, 0xff]), 65535);
        // More than eight bytes keeps the low-order ones
        assert_eq!(big_endian_uint(&[0xff, 0, 0, 0, 0, 0, 0, 0, 0x02]), 2);
    }

    #[test]
    fn test_sql_value_to_json() {
        assert_eq!(SqlValue::Null.to_json(), serde_json::Value::Null);
        assert_eq!(SqlValue::Bool(true).to_json(), serde_json::json!(true));
        assert_eq!(SqlValue::Int(-7).to_json(), serde_json::json!(-7));
        assert_eq!(
            SqlValue::Text("x".to_string()).to_json(),
            serde_json::json!("x")
        );
        assert_eq!(SqlValue::Bytes(vec![0x01]).to_json(), serde_json::json!(1));
    }

    #[test]
    fn test_float_to_json_handles_non_finite() {
        assert_eq!(SqlValue::Float(1.5).to_json(), serde_json::json!(1.5));
        assert_eq!(SqlValue::Float(f64::NAN).to_json(), serde_json::Value::Null);
    }
}
