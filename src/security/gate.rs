//! Authorization gate run before every function invocation.
//!
//! The gate composes two injected services: authentication produces a
//! principal from the request, authorization evaluates the function-access
//! policy against that principal with the target descriptor as the protected
//! resource. The same policy may pass for one descriptor and fail for
//! another, because descriptors carry their own authorization level.

use crate::function::descriptor::{AuthLevel, FunctionDescriptor};
use crate::http::StratoRequest;
use async_trait::async_trait;
use std::sync::Arc;

/// Policy requirement evaluated for function access.
#[derive(Debug, Clone)]
pub struct FunctionPolicy {
    /// Baseline level every caller must hold.
    pub required_level: AuthLevel,
}

impl FunctionPolicy {
    /// The fixed baseline requirement for invoking functions. Per-function
    /// requirements come from the descriptor and are layered on top by the
    /// authorization service.
    pub fn function_access() -> Self {
        Self {
            required_level: AuthLevel::Anonymous,
        }
    }
}

/// An authenticated caller.
#[derive(Debug, Clone)]
pub struct Principal {
    /// Display name of the caller.
    pub name: String,
    /// Authorization level the caller holds.
    pub level: AuthLevel,
}

impl Principal {
    /// Create a principal with the given name and level.
    pub fn new(name: impl Into<String>, level: AuthLevel) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }

    /// The unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::new("anonymous", AuthLevel::Anonymous)
    }

    /// Whether the principal holds `level` or higher.
    pub fn has_level(&self, level: AuthLevel) -> bool {
        self.level >= level
    }
}

/// Result of authenticating a request: a principal when a scheme produced
/// one, else `None` (the caller is treated as anonymous downstream).
#[derive(Debug, Clone, Default)]
pub struct AuthenticationOutcome {
    /// The authenticated principal, if any.
    pub principal: Option<Principal>,
}

impl AuthenticationOutcome {
    /// An outcome carrying a principal.
    pub fn principal(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    /// An outcome with no principal.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Boolean authorization decision; no partial or advisory states.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationDecision {
    /// Whether access is granted.
    pub succeeded: bool,
}

/// Pluggable authentication scheme.
#[async_trait]
pub trait AuthenticationService: Send + Sync {
    /// Produce a principal from the request under the given policy.
    async fn authenticate(
        &self,
        policy: &FunctionPolicy,
        request: &StratoRequest,
    ) -> AuthenticationOutcome;
}

/// Pluggable resource-scoped authorization.
#[async_trait]
pub trait AuthorizationService: Send + Sync {
    /// Evaluate the policy against the authentication outcome, the request,
    /// and the descriptor as the protected resource.
    async fn authorize(
        &self,
        policy: &FunctionPolicy,
        authentication: &AuthenticationOutcome,
        request: &StratoRequest,
        resource: &FunctionDescriptor,
    ) -> AuthorizationDecision;
}

/// Gate decision plus the principal it was made for.
///
/// The principal is surfaced so the dispatcher can apply claims-based checks
/// (the disabled-function override) after the gate.
#[derive(Debug, Clone)]
pub struct GateOutcome {
    /// Whether the caller may invoke the function.
    pub succeeded: bool,
    /// The authenticated principal, anonymous when authentication produced
    /// none.
    pub principal: Principal,
}

/// Authenticates and authorizes a caller against a function descriptor.
pub struct AuthorizationGate {
    authentication: Arc<dyn AuthenticationService>,
    authorization: Arc<dyn AuthorizationService>,
}

impl AuthorizationGate {
    /// Create a gate over the injected services.
    pub fn new(
        authentication: Arc<dyn AuthenticationService>,
        authorization: Arc<dyn AuthorizationService>,
    ) -> Self {
        Self {
            authentication,
            authorization,
        }
    }

    /// Run the two-step gate for one request and descriptor.
    pub async fn authorize(
        &self,
        request: &StratoRequest,
        descriptor: &FunctionDescriptor,
    ) -> GateOutcome {
        let policy = FunctionPolicy::function_access();

        let authentication = self.authentication.authenticate(&policy, request).await;
        let decision = self
            .authorization
            .authorize(&policy, &authentication, request, descriptor)
            .await;

        GateOutcome {
            succeeded: decision.succeeded,
            principal: authentication.principal.unwrap_or_else(Principal::anonymous),
        }
    }
}
