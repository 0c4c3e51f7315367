//! # Statement Executor
//!
//! Issues a bound statement (plain query, DML, or callable) against a named
//! connection and captures affected-row counts, output parameters, and one
//! or more result sets. The connection/cursor resource is scoped to the
//! execution and released on every exit path when the cursor drops.
//!
//! No retries: statements may have side effects, so execution is
//! at-most-once and retry policy belongs to the caller.

use serde_json::{Map, Value};

use crate::provider::{Column, ConnectionProvider, Cursor, SqlValue, WireType};

use super::errors::EngineResult;
use super::template::{CallableSpec, ParsedTemplate};

/// One decoded result row: column name to JSON value
pub type Row = Map<String, Value>;

/// Captured output of one execution
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Driver-reported affected-row count
    pub affected: u64,
    /// Decoded rows for plain statements
    pub rows: Vec<Row>,
    /// Output-parameter values for callables
    pub output_parameters: Map<String, Value>,
    /// Ordered named result sets (`rs0`, `rs1`, ...) for callables
    pub result_sets: Vec<(String, Vec<Row>)>,
}

impl ExecutionResult {
    /// An empty result; also what callers see when a statement soft-fails
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Executes parsed templates against a connection provider
pub struct StatementExecutor<'a, P: ConnectionProvider> {
    provider: &'a P,
}

impl<'a, P: ConnectionProvider> StatementExecutor<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Runs the template on the named connection
    pub fn execute(
        &self,
        connection: &str,
        template: &ParsedTemplate,
    ) -> EngineResult<ExecutionResult> {
        match template.callable() {
            Some(callable) => self.execute_callable(connection, callable),
            None => self.execute_plain(connection, template),
        }
    }

    fn execute_plain(
        &self,
        connection: &str,
        template: &ParsedTemplate,
    ) -> EngineResult<ExecutionResult> {
        let values = template.parameter_values();
        let mut cursor = self
            .provider
            .execute(connection, template.statement(), &values)?;

        let mut result = ExecutionResult::empty();
        result.rows = drain_rows(cursor.as_mut());
        result.affected = cursor.affected_rows();
        Ok(result)
    }

    fn execute_callable(
        &self,
        connection: &str,
        callable: &CallableSpec,
    ) -> EngineResult<ExecutionResult> {
        let mut cursor = self
            .provider
            .call_procedure(connection, &callable.name, &callable.args)?;

        let mut result = ExecutionResult::empty();
        result.affected = cursor.affected_rows();
        for (name, value) in cursor.output_parameters()? {
            result.output_parameters.insert(name, value.to_json());
        }

        // Drain every result set; empty sets are skipped from the
        // numbering but not from iteration.
        let mut index = 0usize;
        loop {
            let rows = drain_rows(cursor.as_mut());
            if !rows.is_empty() {
                result.result_sets.push((format!("rs{}", index), rows));
                index += 1;
            }
            if !cursor.next_result_set()? {
                break;
            }
        }

        Ok(result)
    }
}

/// Decodes every row of the cursor's current result set
fn drain_rows(cursor: &mut dyn Cursor) -> Vec<Row> {
    let columns = cursor.columns().to_vec();
    let mut rows = Vec::new();
    while let Some(cells) = cursor.next_row() {
        let mut row = Row::new();
        for (column, cell) in columns.iter().zip(cells) {
            row.insert(column.name.clone(), decode_cell(column, cell));
        }
        rows.push(row);
    }
    rows
}

/// Bit/flag columns surface as binary on some drivers; those decode to an
/// unsigned big-endian integer rather than a byte sequence.
fn decode_cell(column: &Column, cell: SqlValue) -> Value {
    match (column.wire_type, cell) {
        (WireType::Blob, SqlValue::Bytes(bytes)) => {
            Value::from(crate::provider::big_endian_uint(&bytes))
        }
        (_, cell) => cell.to_json(),
    }
}
