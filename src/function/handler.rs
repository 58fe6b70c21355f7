//! Strato function body trait, invocation context, and cancellation.

use crate::http::{StratoRequest, StratoResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Cooperative cancellation signal shared between a caller and the
/// invocations it spawns.
///
/// Cloning (or calling [`child`](Self::child)) yields a token backed by the
/// same flag, so cancellation requested anywhere is observed everywhere.
/// Bodies are expected to poll `is_cancelled` at their own pace; nothing is
/// forcibly aborted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Returns `true` on the first call that flips the
    /// flag, `false` if the token was already cancelled.
    pub fn cancel(&self) -> bool {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Derive a token sharing this token's flag, for handing to an invocation.
    pub fn child(&self) -> Self {
        self.clone()
    }
}

/// Per-invocation state handed to a function body.
///
/// Carries the identity of the invocation, the environment, route-derived
/// values captured during resolution, the forwarded cancellation token, and
/// the response slot a body may deposit its result into instead of returning
/// one directly.
#[derive(Debug)]
pub struct InvocationContext {
    /// Name of the function being invoked.
    pub function_name: String,
    /// Request ID for tracing.
    pub request_id: String,
    /// Environment variables available to the function.
    pub env: HashMap<String, String>,
    /// Key/value data captured from the matched route.
    pub route_values: HashMap<String, String>,
    /// Cancellation token forwarded from the caller.
    pub cancellation: CancellationToken,
    response: Mutex<Option<StratoResponse>>,
}

impl InvocationContext {
    /// Create a new invocation context.
    pub fn new(function_name: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            request_id: request_id.into(),
            env: HashMap::new(),
            route_values: HashMap::new(),
            cancellation: CancellationToken::new(),
            response: Mutex::new(None),
        }
    }

    /// Set the environment map.
    pub fn with_environment(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Set the route values captured during resolution.
    pub fn with_route_values(mut self, values: HashMap<String, String>) -> Self {
        self.route_values = values;
        self
    }

    /// Set the cancellation token.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Get an environment variable.
    pub fn get_env(&self, key: &str) -> Option<&String> {
        self.env.get(key)
    }

    /// Get a route value captured from the matched route pattern.
    pub fn route_value(&self, key: &str) -> Option<&String> {
        self.route_values.get(key)
    }

    /// Deposit a response into the slot. A later deposit replaces an earlier
    /// one; the dispatcher reads the slot once after the body returns.
    pub fn respond(&self, response: StratoResponse) {
        *self
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(response);
    }

    /// Take the deposited response, if any.
    pub fn take_response(&self) -> Option<StratoResponse> {
        self.response
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Strato function body.
///
/// A body may produce its result three ways: return a response directly,
/// deposit one into the context's response slot, or do neither, in which
/// case the dispatcher answers 200 OK on its behalf.
#[async_trait]
pub trait StratoFunction: Send + Sync {
    /// Handle an invocation.
    async fn invoke(
        &self,
        request: StratoRequest,
        ctx: &InvocationContext,
    ) -> Result<Option<StratoResponse>, StratoError>;
}

/// Strato function error type.
#[derive(Debug, Clone)]
pub struct StratoError {
    /// Error message.
    pub message: String,
    /// Error code.
    pub code: u16,
}

impl StratoError {
    /// Create a new StratoError.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: 500,
        }
    }

    /// Create a StratoError with a specific code.
    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_code(404, message)
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code(400, message)
    }
}

impl std::fmt::Display for StratoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for StratoError {}

impl From<StratoError> for StratoResponse {
    fn from(err: StratoError) -> Self {
        StratoResponse::error(err.code, err.message)
    }
}

impl From<std::io::Error> for StratoError {
    fn from(err: std::io::Error) -> Self {
        StratoError::new(err.to_string())
    }
}

impl From<serde_json::Error> for StratoError {
    fn from(err: serde_json::Error) -> Self {
        StratoError::bad_request(err.to_string())
    }
}
