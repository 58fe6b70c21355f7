//! Authentication and authorization for function access.

pub mod gate;
pub mod providers;

pub use gate::{
    AuthenticationOutcome, AuthenticationService, AuthorizationDecision, AuthorizationGate,
    AuthorizationService, FunctionPolicy, GateOutcome, Principal,
};
pub use providers::{HeaderKeyAuthentication, LevelAuthorization, FUNCTION_KEY_HEADER};
