//! # Template Lexer/Binder
//!
//! Turns a stored SQL template plus a parameter source into a driver-ready
//! statement with an ordered bound-parameter list.
//!
//! Template syntax:
//! - `?` positional placeholder, `?|x|` with a single-character cast tag
//! - `<name>` / `<cast:name>` named placeholder
//! - `[ ... ]` one optional fragment, elided when a placeholder inside it
//!   is unresolved
//! - `-- ` line comments, stripped before parsing
//! - `CALL proc(args...)` stored-procedure invocation, case-insensitive
//!
//! Parsing stages run in a fixed order: comment stripping, placeholder
//! scanning and marker rewriting, optional-fragment elision, value
//! resolution, callable detection. Fragment membership is decided against
//! placeholder offsets in the uncommented pre-rewrite text, not the text
//! being rewritten.

use std::sync::OnceLock;

use regex::Regex;

use crate::provider::{CallArg, SqlValue};

use super::errors::BindError;
use super::params::ParameterSource;

/// Driver-neutral positional marker every placeholder is rewritten to
const MARKER: char = '?';

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // A literal '?', optionally immediately followed by a bracketed
        // single-character cast tag, or a '<...>' named span.
        Regex::new(r"\?(?:\|([A-Za-z])\|)?|<([^<>\s]+)>")
            .unwrap_or_else(|e| panic!("invalid placeholder pattern: {}", e))
    })
}

fn call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bcall\b").unwrap_or_else(|e| panic!("invalid call pattern: {}", e))
    })
}

/// Cast hint attached to a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastHint {
    /// Truthy-string coercion
    Bool,
    /// Strict integer parse; failure is a caller error
    Int,
}

impl CastHint {
    /// Resolves a single-character positional cast tag
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag.to_ascii_lowercase() {
            'b' => Some(CastHint::Bool),
            'i' | 'l' => Some(CastHint::Int),
            _ => None,
        }
    }

    /// Resolves a named-placeholder cast prefix
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "bool" | "b" => Some(CastHint::Bool),
            "int" | "i" | "l" => Some(CastHint::Int),
            _ => None,
        }
    }
}

/// A placeholder resolved (or failing to resolve) to a concrete value for
/// one execution.
#[derive(Debug, Clone)]
pub struct BoundParameter {
    pub name: String,
    /// Offsets in the uncommented pre-rewrite text; used only to test
    /// optional-fragment membership
    pub span: (usize, usize),
    pub cast: Option<CastHint>,
    pub value: SqlValue,
}

impl BoundParameter {
    fn new(name: String, span: (usize, usize), cast: Option<CastHint>) -> Self {
        Self {
            name,
            span,
            cast,
            value: SqlValue::Null,
        }
    }

    /// Assigns a raw value, always routing through the coercion rule when a
    /// cast hint is set. Re-assigning the same raw value yields the same
    /// coerced value.
    pub fn assign(&mut self, raw: Option<&str>) -> Result<(), BindError> {
        self.value = match self.cast {
            None => match raw {
                None => SqlValue::Null,
                Some(s) => SqlValue::Text(s.to_string()),
            },
            Some(CastHint::Bool) => coerce_bool(raw),
            Some(CastHint::Int) => coerce_int(&self.name, raw)?,
        };
        Ok(())
    }
}

/// Truthy-string coercion for bool-hinted parameters. Null stays null;
/// `"0"`, `"n"`, `"f"`, `"false"`, `"no"` in any casing coerce to false;
/// every other value coerces to true.
pub fn coerce_bool(raw: Option<&str>) -> SqlValue {
    match raw {
        None => SqlValue::Null,
        Some(s) => {
            let lowered = s.trim().to_ascii_lowercase();
            let falsy = matches!(lowered.as_str(), "0" | "n" | "f" | "false" | "no");
            SqlValue::Bool(!falsy)
        }
    }
}

fn coerce_int(name: &str, raw: Option<&str>) -> Result<SqlValue, BindError> {
    match raw {
        None => Ok(SqlValue::Null),
        Some(s) => s.trim().parse::<i64>().map(SqlValue::Int).map_err(|_| {
            BindError::Cast {
                name: name.to_string(),
                value: s.to_string(),
            }
        }),
    }
}

/// A detected stored-procedure invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CallableSpec {
    pub name: String,
    pub args: Vec<CallArg>,
}

/// Immutable result of parsing one template against one parameter source.
///
/// Invariant: the number of positional markers in `statement` equals the
/// number of bound parameters, in the same left-to-right order.
#[derive(Debug, Clone)]
pub struct ParsedTemplate {
    source: String,
    statement: String,
    params: Vec<BoundParameter>,
    errors: Vec<BindError>,
    callable: Option<CallableSpec>,
}

impl ParsedTemplate {
    /// Parses `template` against `parameters`. Binding failures are
    /// collected on the result, never raised midway, so callers can report
    /// every unresolved placeholder together.
    pub fn parse(template: &str, parameters: &mut ParameterSource) -> Self {
        let source = strip_comments(template);

        let mut errors = Vec::new();
        let (statement, params) = scan_placeholders(&source, parameters, &mut errors);
        let (statement, mut params) = elide_optional(&source, statement, params, parameters);
        let statement = statement.trim().to_string();

        for param in &mut params {
            match parameters.get(&param.name) {
                None => errors.push(BindError::Missing(param.name.clone())),
                Some(raw) => {
                    if let Err(e) = param.assign(raw) {
                        errors.push(e);
                    }
                }
            }
        }

        let callable = detect_callable(&statement, &params);

        Self {
            source,
            statement,
            params,
            errors,
            callable,
        }
    }

    /// The comment-stripped template text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The driver-ready statement with positional markers
    pub fn statement(&self) -> &str {
        &self.statement
    }

    pub fn params(&self) -> &[BoundParameter] {
        &self.params
    }

    pub fn errors(&self) -> &[BindError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_callable(&self) -> bool {
        self.callable.is_some()
    }

    pub fn callable(&self) -> Option<&CallableSpec> {
        self.callable.as_ref()
    }

    /// Parameter names in marker order
    pub fn parameter_names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    /// Resolved values in marker order
    pub fn parameter_values(&self) -> Vec<SqlValue> {
        self.params.iter().map(|p| p.value.clone()).collect()
    }

    /// True when the statement is a bare update, picking the update-count
    /// response shape. A leading select wins over a later update.
    pub fn is_update(&self) -> bool {
        let lowered = self.statement.to_lowercase();
        let Some(update_pos) = lowered.find("update") else {
            return false;
        };
        match lowered.find("select") {
            Some(select_pos) if select_pos < update_pos => false,
            _ => true,
        }
    }
}

/// Removes every line whose trimmed content begins with a line comment
fn strip_comments(template: &str) -> String {
    template
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Scans the uncommented text for positional and named placeholders,
/// rewriting each to the driver-neutral marker and recording a bound
/// parameter with its span in the scanned text. Positional occurrences are
/// indexed independently of named ones; the k-th `?` takes the parameter
/// source's k-th key, inserting the synthetic `p<k>` on a miss.
fn scan_placeholders(
    source: &str,
    parameters: &mut ParameterSource,
    errors: &mut Vec<BindError>,
) -> (String, Vec<BoundParameter>) {
    let mut statement = String::with_capacity(source.len());
    let mut params = Vec::new();
    let mut last = 0usize;
    let mut ordinal = 0usize;

    for captures in placeholder_regex().captures_iter(source) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let span = (whole.start(), whole.end());

        let param = if let Some(named) = captures.get(2) {
            let content = named.as_str();
            let (cast, name) = match content.split_once(':') {
                Some((hint, name)) => {
                    let cast = CastHint::from_name(hint);
                    if cast.is_none() {
                        errors.push(BindError::UnknownCast {
                            name: name.to_string(),
                            hint: hint.to_string(),
                        });
                    }
                    (cast, name)
                }
                None => (None, content),
            };
            BoundParameter::new(name.to_string(), span, cast)
        } else {
            let name = parameters.key_at_or_insert(ordinal);
            ordinal += 1;
            let cast = match captures.get(1) {
                Some(tag_match) => {
                    let tag = tag_match.as_str().chars().next().unwrap_or(' ');
                    let cast = CastHint::from_tag(tag);
                    if cast.is_none() {
                        errors.push(BindError::UnknownCast {
                            name: name.clone(),
                            hint: tag.to_string(),
                        });
                    }
                    cast
                }
                None => None,
            };
            BoundParameter::new(name, span, cast)
        };

        params.push(param);
        statement.push_str(&source[last..span.0]);
        statement.push(MARKER);
        last = span.1;
    }
    statement.push_str(&source[last..]);

    (statement, params)
}

/// Applies optional-fragment elision. Region bounds are located in the
/// uncommented pre-rewrite text and parameter membership is tested against
/// the spans recorded there. When every parameter inside the region
/// resolves, only the two bracket characters are stripped; otherwise the
/// whole region goes, along with its parameters.
fn elide_optional(
    source: &str,
    statement: String,
    params: Vec<BoundParameter>,
    parameters: &ParameterSource,
) -> (String, Vec<BoundParameter>) {
    let (Some(open), Some(close)) = (source.find('['), source.rfind(']')) else {
        return (statement, params);
    };
    if open > close {
        // Malformed bracketing is rejected at load time; leave it alone here
        return (statement, params);
    }

    let inside = |p: &BoundParameter| p.span.0 >= open && p.span.1 <= close;
    let missing = params
        .iter()
        .any(|p| inside(p) && !parameters.contains(&p.name));

    let (Some(s_open), Some(s_close)) = (statement.find('['), statement.rfind(']')) else {
        return (statement, params);
    };

    if missing {
        let mut kept = params;
        kept.retain(|p| !inside(p));
        let mut stripped = String::with_capacity(statement.len());
        stripped.push_str(&statement[..s_open]);
        stripped.push_str(&statement[s_close + 1..]);
        (stripped, kept)
    } else {
        let mut stripped = statement;
        stripped.remove(s_close);
        stripped.remove(s_open);
        (stripped, params)
    }
}

/// Detects a `CALL name(args...)` invocation in the rewritten statement.
/// Literal markers among the arguments are substituted with resolved bound
/// values in encounter order; other arguments are carried as literal text.
fn detect_callable(statement: &str, params: &[BoundParameter]) -> Option<CallableSpec> {
    let marker = call_regex().find(statement)?;
    let rest = marker.end();
    let open = statement[rest..].find('(')? + rest;
    let close = statement.rfind(')')?;
    if close <= open {
        return None;
    }

    let name = statement[rest..open].trim();
    if name.is_empty() {
        return None;
    }

    let inner = &statement[open + 1..close];
    let mut values = params.iter().map(|p| p.value.clone());
    let args = if inner.trim().is_empty() {
        Vec::new()
    } else {
        inner
            .split(',')
            .map(|arg| {
                let arg = arg.trim();
                if arg == "?" {
                    CallArg::Bound(values.next().unwrap_or(SqlValue::Null))
                } else {
                    CallArg::Literal(arg.to_string())
                }
            })
            .collect()
    };

    Some(CallableSpec {
        name: name.to_string(),
        args,
    })
}
