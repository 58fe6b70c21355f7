//! Default authentication and authorization collaborators.
//!
//! Production deployments typically sit behind a gateway that terminates
//! real credential schemes; these providers cover the host's own needs:
//! shared function keys carried in a header, and level-dominance
//! authorization over the descriptor's requirement.

use crate::function::descriptor::{AuthLevel, FunctionDescriptor};
use crate::http::StratoRequest;
use crate::security::gate::{
    AuthenticationOutcome, AuthenticationService, AuthorizationDecision, AuthorizationService,
    FunctionPolicy, Principal,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Header carrying the caller's function key.
pub const FUNCTION_KEY_HEADER: &str = "x-function-key";

/// Authenticates callers by a shared key presented in
/// [`FUNCTION_KEY_HEADER`].
///
/// A known key yields a principal at the key's configured level; a missing
/// or unknown key yields the anonymous principal. Rejecting anonymous
/// callers is the authorization service's job, not this one's.
#[derive(Default)]
pub struct HeaderKeyAuthentication {
    keys: HashMap<String, AuthLevel>,
}

impl HeaderKeyAuthentication {
    /// Create a service with no keys; every caller is anonymous.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key at the given level.
    pub fn with_key(mut self, key: impl Into<String>, level: AuthLevel) -> Self {
        self.keys.insert(key.into(), level);
        self
    }
}

#[async_trait]
impl AuthenticationService for HeaderKeyAuthentication {
    async fn authenticate(
        &self,
        _policy: &FunctionPolicy,
        request: &StratoRequest,
    ) -> AuthenticationOutcome {
        match request
            .get_header(FUNCTION_KEY_HEADER)
            .and_then(|key| self.keys.get(key))
        {
            Some(level) => {
                debug!("Authenticated key client at level {:?}", level);
                AuthenticationOutcome::principal(Principal::new("key-client", *level))
            }
            None => AuthenticationOutcome::principal(Principal::anonymous()),
        }
    }
}

/// Grants access when the caller's level dominates both the policy baseline
/// and the descriptor's own requirement.
#[derive(Debug, Default)]
pub struct LevelAuthorization;

impl LevelAuthorization {
    /// Create the authorization service.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthorizationService for LevelAuthorization {
    async fn authorize(
        &self,
        policy: &FunctionPolicy,
        authentication: &AuthenticationOutcome,
        _request: &StratoRequest,
        resource: &FunctionDescriptor,
    ) -> AuthorizationDecision {
        let held = authentication
            .principal
            .as_ref()
            .map(|p| p.level)
            .unwrap_or(AuthLevel::Anonymous);
        let required = policy.required_level.max(resource.auth_level);

        AuthorizationDecision {
            succeeded: held >= required,
        }
    }
}
