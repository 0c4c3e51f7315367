//! # In-Memory Connection Provider
//!
//! Scripted provider used by the development server default and the test
//! suite. Connections hold statement and procedure fixtures with canned
//! result sets, output parameters, and affected-row counts. Every execution
//! is journaled so tests can assert on the statements and values that
//! actually reached the boundary.
//!
//! A production deployment swaps this for an adapter over a real driver.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::RwLock;

use super::{
    CallArg, Column, ConnectionProvider, Cursor, ProviderError, ProviderResult, SqlValue,
};

/// One journaled call across the provider boundary
#[derive(Debug, Clone)]
pub struct JournalEntry {
    pub connection: String,
    pub statement: String,
    pub values: Vec<SqlValue>,
}

/// A canned result set
#[derive(Debug, Clone, Default)]
pub struct ResultSetFixture {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl ResultSetFixture {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self { columns, rows }
    }

    /// A result set with no rows at all
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A scripted response for one exact driver-ready statement
#[derive(Debug, Clone)]
pub struct StatementFixture {
    pub statement: String,
    pub result: ResultSetFixture,
    pub affected: u64,
}

impl StatementFixture {
    /// Row-returning fixture
    pub fn rows(statement: impl Into<String>, columns: Vec<Column>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            statement: statement.into(),
            result: ResultSetFixture::new(columns, rows),
            affected: 0,
        }
    }

    /// DML fixture reporting an affected-row count
    pub fn updates(statement: impl Into<String>, affected: u64) -> Self {
        Self {
            statement: statement.into(),
            result: ResultSetFixture::empty(),
            affected,
        }
    }
}

/// A scripted stored procedure
#[derive(Debug, Clone)]
pub struct ProcedureFixture {
    pub name: String,
    pub output: Vec<(String, SqlValue)>,
    pub result_sets: Vec<ResultSetFixture>,
    pub affected: u64,
}

impl ProcedureFixture {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: Vec::new(),
            result_sets: Vec::new(),
            affected: 0,
        }
    }

    pub fn with_output(mut self, name: impl Into<String>, value: SqlValue) -> Self {
        self.output.push((name.into(), value));
        self
    }

    pub fn with_result_set(mut self, set: ResultSetFixture) -> Self {
        self.result_sets.push(set);
        self
    }

    pub fn with_affected(mut self, affected: u64) -> Self {
        self.affected = affected;
        self
    }
}

/// Fixtures for one named connection
#[derive(Debug, Clone, Default)]
pub struct MemoryConnection {
    statements: Vec<StatementFixture>,
    procedures: HashMap<String, ProcedureFixture>,
}

impl MemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statement(mut self, fixture: StatementFixture) -> Self {
        self.statements.push(fixture);
        self
    }

    pub fn with_procedure(mut self, fixture: ProcedureFixture) -> Self {
        self.procedures.insert(fixture.name.clone(), fixture);
        self
    }
}

/// In-memory scripted connection provider
pub struct MemoryProvider {
    connections: HashMap<String, MemoryConnection>,
    journal: RwLock<Vec<JournalEntry>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            journal: RwLock::new(Vec::new()),
        }
    }

    /// Provider that knows the given connection names but has no fixtures;
    /// every statement on them fails as unrecognized.
    pub fn from_connection_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut provider = Self::new();
        for name in names {
            provider
                .connections
                .insert(name.as_ref().to_string(), MemoryConnection::new());
        }
        provider
    }

    pub fn with_connection(mut self, name: impl Into<String>, connection: MemoryConnection) -> Self {
        self.connections.insert(name.into(), connection);
        self
    }

    /// Snapshot of every call that crossed the boundary so far
    pub fn journal(&self) -> Vec<JournalEntry> {
        match self.journal.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, connection: &str, statement: &str, values: Vec<SqlValue>) {
        let entry = JournalEntry {
            connection: connection.to_string(),
            statement: statement.to_string(),
            values,
        };
        match self.journal.write() {
            Ok(mut guard) => guard.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }

    fn connection(&self, name: &str) -> ProviderResult<&MemoryConnection> {
        self.connections
            .get(name)
            .ok_or_else(|| ProviderError::UnknownConnection(name.to_string()))
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionProvider for MemoryProvider {
    fn execute(
        &self,
        connection: &str,
        statement: &str,
        values: &[SqlValue],
    ) -> ProviderResult<Box<dyn Cursor + '_>> {
        let conn = self.connection(connection)?;
        self.record(connection, statement, values.to_vec());

        let fixture = conn
            .statements
            .iter()
            .find(|f| f.statement.trim() == statement.trim())
            .ok_or_else(|| ProviderError::Statement(format!("unrecognized statement: {}", statement.trim())))?;

        Ok(Box::new(MemoryCursor::single(
            fixture.result.clone(),
            fixture.affected,
        )))
    }

    fn call_procedure(
        &self,
        connection: &str,
        name: &str,
        args: &[CallArg],
    ) -> ProviderResult<Box<dyn Cursor + '_>> {
        let conn = self.connection(connection)?;
        let bound: Vec<SqlValue> = args
            .iter()
            .filter_map(|arg| match arg {
                CallArg::Bound(value) => Some(value.clone()),
                CallArg::Literal(_) => None,
            })
            .collect();
        self.record(connection, &format!("CALL {}", name), bound);

        let fixture = conn
            .procedures
            .values()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ProviderError::Statement(format!("unknown procedure: {}", name)))?;

        Ok(Box::new(MemoryCursor::multi(
            fixture.result_sets.clone(),
            fixture.output.clone(),
            fixture.affected,
        )))
    }
}

/// Cursor over canned result sets
struct MemoryCursor {
    current: ResultSetFixture,
    pending: VecDeque<ResultSetFixture>,
    row_index: usize,
    output: Vec<(String, SqlValue)>,
    affected: u64,
}

impl MemoryCursor {
    fn single(set: ResultSetFixture, affected: u64) -> Self {
        Self {
            current: set,
            pending: VecDeque::new(),
            row_index: 0,
            output: Vec::new(),
            affected,
        }
    }

    fn multi(sets: Vec<ResultSetFixture>, output: Vec<(String, SqlValue)>, affected: u64) -> Self {
        let mut pending: VecDeque<ResultSetFixture> = sets.into();
        let current = pending.pop_front().unwrap_or_default();
        Self {
            current,
            pending,
            row_index: 0,
            output,
            affected,
        }
    }
}

impl Cursor for MemoryCursor {
    fn columns(&self) -> &[Column] {
        &self.current.columns
    }

    fn next_row(&mut self) -> Option<Vec<SqlValue>> {
        let row = self.current.rows.get(self.row_index).cloned()?;
        self.row_index += 1;
        Some(row)
    }

    fn affected_rows(&self) -> u64 {
        self.affected
    }

    fn next_result_set(&mut self) -> ProviderResult<bool> {
        match self.pending.pop_front() {
            Some(set) => {
                self.current = set;
                self.row_index = 0;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn output_parameters(&mut self) -> ProviderResult<Vec<(String, SqlValue)>> {
        Ok(self.output.clone())
    }
}
