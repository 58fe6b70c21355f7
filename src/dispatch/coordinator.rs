//! End-to-end execution coordination.
//!
//! The coordinator resolves an inbound request to a function descriptor,
//! enforces the authorization and enablement policy, invokes the body, and
//! reconciles its result into a single outcome. Collaborators are injected
//! at construction; nothing is resolved from ambient state.

use crate::dispatch::buffering::Transport;
use crate::dispatch::routing::{ResolutionMode, RouteResolver};
use crate::function::descriptor::{AuthLevel, FunctionDescriptor};
use crate::function::handler::{CancellationToken, InvocationContext};
use crate::function::registry::FunctionDirectory;
use crate::http::{StatusCode, StratoRequest, StratoResponse};
use crate::security::gate::AuthorizationGate;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info_span, Instrument};

/// Reserved argument key under which the inbound HTTP request travels.
pub const HTTP_REQUEST_ARG: &str = "http.request";

/// A value in the invocation arguments map.
#[derive(Debug, Clone)]
pub enum ArgumentValue {
    /// The inbound HTTP request.
    Request(StratoRequest),
    /// An arbitrary JSON value.
    Json(serde_json::Value),
}

/// String-keyed arguments for one dispatch call.
///
/// The inbound request must be present under [`HTTP_REQUEST_ARG`]; the map
/// is built per call and discarded afterwards.
#[derive(Debug, Clone, Default)]
pub struct InvocationArguments {
    values: HashMap<String, ArgumentValue>,
}

impl InvocationArguments {
    /// Create an empty arguments map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an arguments map carrying the inbound request under the
    /// reserved key.
    pub fn for_request(request: StratoRequest) -> Self {
        Self::new().with(HTTP_REQUEST_ARG, ArgumentValue::Request(request))
    }

    /// Add an argument.
    pub fn with(mut self, key: impl Into<String>, value: ArgumentValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Get an argument by key.
    pub fn get(&self, key: &str) -> Option<&ArgumentValue> {
        self.values.get(key)
    }

    /// The inbound request, if present under the reserved key with the
    /// expected shape.
    pub fn request(&self) -> Option<&StratoRequest> {
        match self.values.get(HTTP_REQUEST_ARG) {
            Some(ArgumentValue::Request(request)) => Some(request),
            _ => None,
        }
    }
}

/// Faults that escape dispatch as hard failures.
///
/// Everything else the pipeline can produce is expressed as an HTTP-shaped
/// outcome in [`DispatchResult`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The arguments map lacks the reserved request entry. Contract error;
    /// fails fast instead of dispatching with a null request.
    #[error("invocation arguments are missing the reserved request entry")]
    MissingRequestArgument,

    /// The function body faulted. Propagated to the host untranslated; the
    /// host's top-level handler owns turning this into a response.
    #[error("function '{function}' faulted: {source}")]
    ExecutionFault {
        function: String,
        #[source]
        source: crate::function::handler::StratoError,
    },
}

/// Result of one dispatch call.
#[derive(Debug)]
pub struct DispatchResult {
    /// The produced response, or `None` when the transport had already
    /// started the response and dispatch made no decision.
    pub outcome: Option<StratoResponse>,
    /// The descriptor routing resolved, if any. Feeds the buffering policy
    /// regardless of how the outcome was reached.
    pub descriptor: Option<Arc<FunctionDescriptor>>,
}

/// Orchestrates the dispatch pipeline for one request at a time.
///
/// Stateless across calls; every inbound request is an independent unit of
/// work against the current directory and route table snapshots.
pub struct ExecutionCoordinator {
    directory: Arc<dyn FunctionDirectory>,
    resolver: Arc<RouteResolver>,
    gate: AuthorizationGate,
    mode: ResolutionMode,
    env: HashMap<String, String>,
}

impl ExecutionCoordinator {
    /// Create a coordinator over the given collaborators.
    ///
    /// Resolution defaults to [`ResolutionMode::ProxyOverride`] so operator
    /// routes registered later win over generic entries.
    pub fn new(
        directory: Arc<dyn FunctionDirectory>,
        resolver: Arc<RouteResolver>,
        gate: AuthorizationGate,
    ) -> Self {
        Self {
            directory,
            resolver,
            gate,
            mode: ResolutionMode::ProxyOverride,
            env: HashMap::new(),
        }
    }

    /// Set the route resolution mode.
    pub fn resolution_mode(mut self, mode: ResolutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the environment exposed to function bodies.
    pub fn with_environment(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Dispatch one request.
    ///
    /// `function_name_hint` is the caller's default; a route match replaces
    /// it, and a target-function data token on the matched route wins over
    /// both. The cancellation token is forwarded into the invocation as a
    /// child token.
    pub async fn execute(
        &self,
        function_name_hint: &str,
        arguments: &InvocationArguments,
        cancellation: CancellationToken,
        transport: &dyn Transport,
    ) -> Result<DispatchResult, DispatchError> {
        let request = arguments
            .request()
            .ok_or(DispatchError::MissingRequestArgument)?;

        let matched = self
            .resolver
            .resolve(&request.path, request.method.as_str(), self.mode);
        let (function_name, route_values) = match matched {
            Some(m) => (m.function_name, m.route_values),
            None => (function_name_hint.to_string(), HashMap::new()),
        };

        let descriptor = self.directory.lookup(&function_name);

        if transport.response_started() {
            debug!("Response already started; dispatch makes no decision");
            return Ok(DispatchResult {
                outcome: None,
                descriptor,
            });
        }

        let outcome = self
            .resolve_outcome(request, descriptor.as_deref(), route_values, cancellation)
            .await?;

        Ok(DispatchResult {
            outcome: Some(outcome),
            descriptor,
        })
    }

    /// Steps 4-9 of the pipeline, once the descriptor (or its absence) is
    /// known. Always produces an HTTP-shaped outcome; only body faults
    /// escape as errors.
    async fn resolve_outcome(
        &self,
        request: &StratoRequest,
        descriptor: Option<&FunctionDescriptor>,
        route_values: HashMap<String, String>,
        cancellation: CancellationToken,
    ) -> Result<StratoResponse, DispatchError> {
        let Some(descriptor) = descriptor else {
            return Ok(StratoResponse::new(StatusCode::NOT_FOUND));
        };

        let gate = self.gate.authorize(request, descriptor).await;
        if !gate.succeeded {
            debug!("Authorization failed for function '{}'", descriptor.name);
            return Ok(StratoResponse::new(StatusCode::UNAUTHORIZED));
        }

        // Disabled functions answer exactly like unknown ones so their
        // existence does not leak; admin callers see through that.
        if descriptor.is_disabled && !gate.principal.has_level(AuthLevel::Admin) {
            debug!("Function '{}' is disabled", descriptor.name);
            return Ok(StratoResponse::new(StatusCode::NOT_FOUND));
        }

        let request_id = generate_request_id();
        let ctx = InvocationContext::new(&descriptor.name, &request_id)
            .with_environment(self.env.clone())
            .with_route_values(route_values)
            .with_cancellation(cancellation.child());

        let mut direct = None;
        if self.directory.can_execute(descriptor) {
            if let Some(body) = self.directory.body(&descriptor.name) {
                let span = info_span!(
                    "function_invocation",
                    function = %descriptor.name,
                    method = %request.method,
                    path = %request.path,
                    request_id = %request_id,
                );
                direct = body
                    .invoke(request.clone(), &ctx)
                    .instrument(span)
                    .await
                    .map_err(|source| DispatchError::ExecutionFault {
                        function: descriptor.name.clone(),
                        source,
                    })?;
            }
        } else {
            debug!(
                "Host not ready; skipping execution of function '{}'",
                descriptor.name
            );
        }

        Ok(direct
            .or_else(|| ctx.take_response())
            .unwrap_or_else(|| StratoResponse::new(StatusCode::OK)))
    }
}

/// Generate a unique request ID.
fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{:x}", timestamp)
}
