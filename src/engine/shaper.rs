//! # Response Shaper
//!
//! Converts executor output into the JSON envelope contract. The shape is
//! picked from the statement kind: callables always get the wrapped form,
//! bare updates report their count, and row-returning statements emit the
//! raw row list with no wrapping object.

use serde_json::{json, Map, Value};

use super::executor::{ExecutionResult, Row};
use super::template::ParsedTemplate;

/// The JSON response envelope
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Raw row list for non-callable, non-update statements
    Rows(Vec<Row>),
    /// `{"updated": n}` for non-callable updates
    Updated(u64),
    /// Wrapped form for callables
    Callable {
        parameters: Map<String, Value>,
        result_sets: Vec<(String, Vec<Row>)>,
        updated: u64,
    },
}

impl Envelope {
    /// Shapes an execution result according to the template kind
    pub fn shape(template: &ParsedTemplate, result: ExecutionResult) -> Self {
        if template.is_callable() {
            Envelope::Callable {
                parameters: result.output_parameters,
                result_sets: result.result_sets,
                updated: result.affected,
            }
        } else if template.is_update() {
            Envelope::Updated(result.affected)
        } else {
            Envelope::Rows(result.rows)
        }
    }

    /// Serializes the envelope to its wire JSON
    pub fn to_json(&self) -> Value {
        match self {
            Envelope::Rows(rows) => rows_to_json(rows),
            Envelope::Updated(count) => json!({ "updated": count }),
            Envelope::Callable {
                parameters,
                result_sets,
                updated,
            } => {
                let sets: Vec<Value> = result_sets
                    .iter()
                    .map(|(name, rows)| {
                        let mut set = Map::new();
                        set.insert(name.clone(), rows_to_json(rows));
                        Value::Object(set)
                    })
                    .collect();
                json!({
                    "parameters": parameters,
                    "resultsets": sets,
                    "updated": updated,
                })
            }
        }
    }
}

fn rows_to_json(rows: &[Row]) -> Value {
    Value::Array(rows.iter().cloned().map(Value::Object).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::params::ParameterSource;

    fn parse(template: &str) -> ParsedTemplate {
        let mut source = ParameterSource::new();
        ParsedTemplate::parse(template, &mut source)
    }

    fn row(entries: &[(&str, Value)]) -> Row {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_rows_shape_is_bare_array() {
        let template = parse("SELECT * FROM t");
        let result = ExecutionResult {
            rows: vec![row(&[("id", json!(1))]), row(&[("id", json!(2))])],
            ..ExecutionResult::empty()
        };

        let envelope = Envelope::shape(&template, result);
        assert_eq!(envelope.to_json(), json!([{"id": 1}, {"id": 2}]));
    }

    #[test]
    fn test_update_shape_reports_count() {
        let template = parse("UPDATE t SET v = 1");
        let result = ExecutionResult {
            affected: 3,
            ..ExecutionResult::empty()
        };

        let envelope = Envelope::shape(&template, result);
        assert_eq!(envelope.to_json(), json!({"updated": 3}));
    }

    #[test]
    fn test_callable_shape_always_wraps() {
        let template = parse("CALL report()");
        let mut parameters = Map::new();
        parameters.insert("@_report_0".to_string(), json!(9));
        let result = ExecutionResult {
            affected: 2,
            output_parameters: parameters,
            result_sets: vec![
                ("rs0".to_string(), vec![row(&[("a", json!(1))])]),
                ("rs1".to_string(), vec![row(&[("b", json!(2))])]),
            ],
            ..ExecutionResult::empty()
        };

        let envelope = Envelope::shape(&template, result);
        assert_eq!(
            envelope.to_json(),
            json!({
                "parameters": {"@_report_0": 9},
                "resultsets": [{"rs0": [{"a": 1}]}, {"rs1": [{"b": 2}]}],
                "updated": 2,
            })
        );
    }

    #[test]
    fn test_empty_result_shapes_cleanly() {
        let template = parse("SELECT * FROM t");
        let envelope = Envelope::shape(&template, ExecutionResult::empty());
        assert_eq!(envelope.to_json(), json!([]));
    }
}
