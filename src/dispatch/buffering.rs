//! Post-execution transport buffering policy.

use crate::function::descriptor::FunctionDescriptor;
use tracing::debug;

/// Transport-facing controls the dispatcher drives after execution.
///
/// All operations are idempotent and the defaults are safe no-ops, so
/// transports without buffering support need not implement anything.
pub trait Transport: Send + Sync {
    /// Stop buffering the request body; stream it through instead.
    fn disable_request_buffering(&self) {}

    /// Stop buffering the response body; stream it through instead.
    fn disable_response_buffering(&self) {}

    /// Whether the transport has already begun writing the response.
    fn response_started(&self) -> bool {
        false
    }
}

/// Terminal dispatch step deciding transport buffering from the resolved
/// function's kind.
pub struct BufferingPolicy;

impl BufferingPolicy {
    /// Apply the policy after the inner pipeline completes.
    ///
    /// Runs for every dispatch, including 401/404 short-circuits: the
    /// decision depends only on which descriptor routing resolved, never on
    /// whether execution was authorized or happened. Ordinary functions get
    /// pass-through streaming; proxy functions keep buffering enabled so
    /// they can inspect and replay bodies. No descriptor means the transport
    /// default stands.
    pub fn apply_post_execution(descriptor: Option<&FunctionDescriptor>, transport: &dyn Transport) {
        match descriptor {
            Some(d) if !d.is_proxy => {
                debug!("Disabling transport buffering for function '{}'", d.name);
                transport.disable_request_buffering();
                transport.disable_response_buffering();
            }
            _ => {}
        }
    }
}
