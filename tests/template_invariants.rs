//! Template Binding Invariant Tests
//!
//! Cross-module tests for the template lexer/binder:
//! - Marker count always equals bound-parameter count, in source order
//! - Optional-fragment elision is idempotent
//! - Cast coercion is total and stable
//! - Callable detection binds arguments without executing anything

use sqlroute::engine::{BindError, ParameterSource, ParsedTemplate};
use sqlroute::provider::SqlValue;

fn source_of(entries: &[(&str, &str)]) -> ParameterSource {
    let mut source = ParameterSource::new();
    for (name, value) in entries {
        source.insert(name, Some(value.to_string()));
    }
    source
}

// =============================================================================
// Marker / Parameter Invariant
// =============================================================================

/// Every placeholder becomes exactly one marker and one bound parameter.
#[test]
fn test_marker_count_equals_parameter_count() {
    let templates = [
        "SELECT * FROM t WHERE a = ?",
        "SELECT * FROM t WHERE a = ? AND b = ?",
        "SELECT * FROM t WHERE a = <a> AND b = <b> AND c = ?|i|",
        "UPDATE t SET a = <a>, b = <bool:b> WHERE c = ?",
    ];

    for template in templates {
        let mut source = source_of(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let parsed = ParsedTemplate::parse(template, &mut source);

        assert!(!parsed.has_errors(), "template: {}", template);
        assert_eq!(
            parsed.statement().matches('?').count(),
            parsed.params().len(),
            "template: {}",
            template
        );
    }
}

/// Parameters come out in left-to-right source order.
#[test]
fn test_parameters_in_source_order() {
    let mut source = source_of(&[("k", "1"), ("flag", "0"), ("limit", "10")]);
    let parsed = ParsedTemplate::parse(
        "SELECT * FROM t WHERE k = <k> AND flag = <bool:flag> AND n < <int:limit>",
        &mut source,
    );

    assert_eq!(parsed.parameter_names(), vec!["k", "flag", "limit"]);
    assert_eq!(
        parsed.parameter_values(),
        vec![
            SqlValue::Text("1".to_string()),
            SqlValue::Bool(false),
            SqlValue::Int(10)
        ]
    );
}

// =============================================================================
// Optional Fragment Elision
// =============================================================================

/// Scenario: missing optional parameter elides the whole bracketed region.
#[test]
fn test_optional_fragment_elided_entirely() {
    let mut source = source_of(&[("id", "7")]);
    let parsed = ParsedTemplate::parse(
        "SELECT * FROM t WHERE k = <id> [AND flag = <f>]",
        &mut source,
    );

    assert!(!parsed.has_errors());
    assert_eq!(parsed.statement(), "SELECT * FROM t WHERE k = ?");
    assert_eq!(parsed.parameter_names(), vec!["id"]);
    assert_eq!(
        parsed.parameter_values(),
        vec![SqlValue::Text("7".to_string())]
    );
}

/// Scenario: present optional parameter keeps the contents, drops brackets.
#[test]
fn test_optional_fragment_contents_kept() {
    let mut source = source_of(&[("id", "7"), ("f", "1")]);
    let parsed = ParsedTemplate::parse(
        "SELECT * FROM t WHERE k = <id> [AND flag = <f>]",
        &mut source,
    );

    assert!(!parsed.has_errors());
    assert_eq!(parsed.statement(), "SELECT * FROM t WHERE k = ? AND flag = ?");
    assert_eq!(parsed.parameter_names(), vec!["id", "f"]);
}

/// Re-parsing an already-elided statement yields the identical statement.
#[test]
fn test_elision_is_idempotent() {
    let template = "SELECT * FROM t WHERE k = <id> [AND flag = <f>]";

    let mut source = source_of(&[("id", "7")]);
    let first = ParsedTemplate::parse(template, &mut source);

    let mut source = source_of(&[("id", "7")]);
    let second = ParsedTemplate::parse(first.statement(), &mut source);

    assert_eq!(first.statement(), second.statement());
    assert_eq!(first.parameter_names(), second.parameter_names());
}

// =============================================================================
// Cast Coercion
// =============================================================================

/// Bool coercion is total: the falsy set, null passthrough, everything
/// else truthy.
#[test]
fn test_bool_coercion_is_total() {
    for falsy in ["0", "N", "n", "f", "F", "FALSE", "false", "no", "NO"] {
        let mut source = source_of(&[("flag", falsy)]);
        let parsed = ParsedTemplate::parse("SELECT <bool:flag>", &mut source);
        assert_eq!(
            parsed.parameter_values(),
            vec![SqlValue::Bool(false)],
            "value: {}",
            falsy
        );
    }

    for truthy in ["1", "true", "y", "yes", "anything else"] {
        let mut source = source_of(&[("flag", truthy)]);
        let parsed = ParsedTemplate::parse("SELECT <bool:flag>", &mut source);
        assert_eq!(
            parsed.parameter_values(),
            vec![SqlValue::Bool(true)],
            "value: {}",
            truthy
        );
    }

    // Null stays null
    let mut source = ParameterSource::new();
    source.insert("flag", None);
    let parsed = ParsedTemplate::parse("SELECT <bool:flag>", &mut source);
    assert_eq!(parsed.parameter_values(), vec![SqlValue::Null]);
}

/// Int-hinted non-numeric values are a cast error, never silently zeroed.
#[test]
fn test_int_cast_raises_on_garbage() {
    let mut source = source_of(&[("n", "seven")]);
    let parsed = ParsedTemplate::parse("SELECT ?|i|", &mut source);

    assert_eq!(
        parsed.errors(),
        &[BindError::Cast {
            name: "n".to_string(),
            value: "seven".to_string()
        }]
    );
}

/// Coercion is stable: parsing the same template and source twice yields
/// the same values.
#[test]
fn test_coercion_is_stable() {
    let run = || {
        let mut source = source_of(&[("flag", "no"), ("n", "12")]);
        ParsedTemplate::parse("SELECT <bool:flag>, <int:n>", &mut source).parameter_values()
    };
    assert_eq!(run(), run());
}

// =============================================================================
// Callable Detection
// =============================================================================

/// With an empty source, the positional placeholder synthesizes p0 and
/// binds null; only the named placeholder is a binding error.
#[test]
fn test_callable_missing_named_is_single_error() {
    let mut source = ParameterSource::new();
    let parsed = ParsedTemplate::parse("CALL get_user(?, <id>)", &mut source);

    assert!(parsed.is_callable());
    assert_eq!(parsed.errors(), &[BindError::Missing("id".to_string())]);

    let callable = parsed.callable().unwrap();
    assert_eq!(callable.name, "get_user");
    assert_eq!(callable.args.len(), 2);
}

/// Comments are stripped before anything else sees the template.
#[test]
fn test_comment_lines_never_bind() {
    let template = "-- lookup by key, optional flag: <unused>\nSELECT * FROM t WHERE k = <id>";
    let mut source = source_of(&[("id", "7")]);
    let parsed = ParsedTemplate::parse(template, &mut source);

    assert!(!parsed.has_errors());
    assert_eq!(parsed.parameter_names(), vec!["id"]);
}
