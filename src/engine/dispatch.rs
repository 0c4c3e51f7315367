//! # Endpoint Dispatch
//!
//! Per-request orchestration: resolve the endpoint, select the verb
//! template, build the parameter source, parse, execute, shape. Each
//! request is handled independently; the dispatcher holds no mutable state,
//! so it is safe to share across concurrent requests.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::{EndpointDef, Verb};
use crate::observability::{LogPolicy, Severity};
use crate::provider::ConnectionProvider;
use crate::server::routes::RouteTable;

use super::errors::{EngineError, EngineResult};
use super::executor::{ExecutionResult, StatementExecutor};
use super::params::{ParameterSource, RequestBody};
use super::shaper::Envelope;
use super::template::ParsedTemplate;

/// Reserved parameter letting a client override the effective verb
const METHOD_PARAMETER: &str = "method";

/// An inbound request after HTTP decoding, before endpoint resolution
#[derive(Debug, Clone)]
pub struct IncomingRequest {
    pub path: String,
    pub verb: Verb,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl IncomingRequest {
    pub fn new(path: impl Into<String>, verb: Verb) -> Self {
        Self {
            path: path.into(),
            verb,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// Request orchestrator over a connection provider
pub struct Dispatcher<P: ConnectionProvider> {
    provider: Arc<P>,
    base_level: Severity,
    debug: bool,
}

impl<P: ConnectionProvider> Dispatcher<P> {
    pub fn new(provider: Arc<P>, base_level: Severity, debug: bool) -> Self {
        Self {
            provider,
            base_level,
            debug,
        }
    }

    pub fn provider(&self) -> &P {
        self.provider.as_ref()
    }

    /// Runs one request against the given route-table snapshot
    pub fn handle(&self, table: &RouteTable, request: &IncomingRequest) -> EngineResult<Envelope> {
        let not_found = || EngineError::EndpointNotFound {
            path: request.path.clone(),
        };

        let (endpoint, captures) = table.resolve(&request.path).ok_or_else(not_found)?;
        // A disabled endpoint is indistinguishable from an unknown one
        if endpoint.is_disabled {
            return Err(not_found());
        }

        let mut parameters =
            ParameterSource::from_request(&captures, request.body.as_ref(), &request.query);

        let verb = effective_verb(request.verb, &parameters);
        let Some(template) = endpoint.statement_for(verb) else {
            return Err(not_found());
        };

        let log = self.log_policy(endpoint, &parameters);
        let request_id = Uuid::new_v4().to_string();
        log.info(
            "ENDPOINT_REQUEST",
            &[
                ("path", request.path.as_str()),
                ("verb", verb.as_str()),
                ("request_id", &request_id),
            ],
        );

        let parsed = ParsedTemplate::parse(template, &mut parameters);
        log.trace(
            "TEMPLATE_PARSED",
            &[
                ("statement", parsed.statement()),
                ("parameters", &parsed.parameter_names().join(",")),
                ("request_id", &request_id),
            ],
        );
        if parsed.has_errors() {
            return Err(EngineError::Binding(parsed.errors().to_vec()));
        }

        let executor = StatementExecutor::new(self.provider.as_ref());
        let result = match executor.execute(&endpoint.connection_name, &parsed) {
            Ok(result) => result,
            Err(EngineError::Statement(message)) if !self.debug => {
                // Soft-fail: the failure is logged and callers see an empty
                // result. Some legitimate run-time variability looks
                // identical to a failure, so only debug mode re-raises.
                log.error(
                    "STATEMENT_FAILED",
                    &[
                        ("path", request.path.as_str()),
                        ("error", &message),
                        ("request_id", &request_id),
                    ],
                );
                ExecutionResult::empty()
            }
            Err(err) => return Err(err),
        };

        log.info(
            "ENDPOINT_RESPONSE",
            &[
                ("path", request.path.as_str()),
                ("updated", &result.affected.to_string()),
                ("request_id", &request_id),
            ],
        );
        Ok(Envelope::shape(&parsed, result))
    }

    /// Builds the request's log policy from the global level, the
    /// endpoint's override, and its verbose-log filter pair. When the
    /// filter is configured and the request's value for the field does not
    /// match, verbose output is suppressed.
    fn log_policy(&self, endpoint: &EndpointDef, parameters: &ParameterSource) -> LogPolicy {
        let mut min = endpoint.log_level_override.unwrap_or(self.base_level);
        if let (Some(field), Some(expected)) =
            (&endpoint.filter_field_name, &endpoint.filter_field_value)
        {
            let matched = parameters.get(field).flatten() == Some(expected.as_str());
            if !matched && min < Severity::Info {
                min = Severity::Info;
            }
        }
        LogPolicy::new(min)
    }
}

/// Applies the reserved `method` override, constrained to the four
/// supported verbs; anything else keeps the transport verb.
fn effective_verb(verb: Verb, parameters: &ParameterSource) -> Verb {
    match parameters.get(METHOD_PARAMETER).flatten() {
        Some(raw) => Verb::from_name(raw).unwrap_or(verb),
        None => verb,
    }
}
