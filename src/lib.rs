//! # Strato - HTTP Function Dispatch Host
//!
//! Strato is a Rust-based host runtime that dispatches incoming HTTP
//! requests to named function units through a priority-ordered route table,
//! enforcing authorization and enablement policy around every invocation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          HTTP Transport                             │
//! │                 (hyper server, per-connection state)                │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                   │
//!                                   ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Execution Coordinator                          │
//! │                                                                     │
//! │   RouteResolver ──► FunctionDirectory ──► AuthorizationGate ──►     │
//! │   (route table)     (descriptor lookup)   (authn + authz)           │
//! │                                                                     │
//! │              ──► function body ──► outcome ──► BufferingPolicy      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Routing resolves the request to a function name (operator proxy routes
//! registered later override earlier generic entries), the directory turns
//! the name into a descriptor, the gate authenticates and authorizes the
//! caller against that descriptor, and the body runs with an invocation
//! context it may deposit its response into. After dispatch, the buffering
//! policy flips the transport to pass-through streaming for ordinary
//! functions while proxy functions keep buffering enabled.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strato::prelude::*;
//!
//! struct HelloFunction;
//!
//! #[async_trait]
//! impl StratoFunction for HelloFunction {
//!     async fn invoke(
//!         &self,
//!         _request: StratoRequest,
//!         _ctx: &InvocationContext,
//!     ) -> Result<Option<StratoResponse>, StratoError> {
//!         Ok(Some(StratoResponse::text("Hello from Strato!")))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut routes = RouteTable::new();
//!     routes.add(RouteEntry::new(RouteMethod::Any, "/api/hello", "hello"));
//!
//!     let gate = AuthorizationGate::new(
//!         Arc::new(HeaderKeyAuthentication::new()),
//!         Arc::new(LevelAuthorization::new()),
//!     );
//!
//!     let server = HostServer::new(HostConfig::default(), routes, gate);
//!     server.register_function(
//!         FunctionDescriptor::new("hello").auth_level(AuthLevel::Anonymous),
//!         Arc::new(HelloFunction),
//!     );
//!
//!     server.run().await
//! }
//! ```

pub mod dispatch;
pub mod function;
pub mod http;
pub mod runtime;
pub mod security;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::dispatch::{
        ArgumentValue, BufferingPolicy, DispatchError, DispatchResult, ExecutionCoordinator,
        InvocationArguments, MatchResult, ResolutionMode, RouteEntry, RouteMethod, RouteResolver,
        RouteTable, Transport, HTTP_REQUEST_ARG, TARGET_FUNCTION_TOKEN,
    };
    pub use crate::function::{
        AuthLevel, CancellationToken, FunctionDescriptor, FunctionDirectory, FunctionRegistry,
        InvocationContext, RegisteredFunction, StratoError, StratoFunction,
    };
    pub use crate::http::{Method, StatusCode, StratoRequest, StratoResponse};
    pub use crate::runtime::{AssignmentContext, HostConfig, HostServer, ZIP_URL_SETTING};
    pub use crate::security::{
        AuthenticationOutcome, AuthenticationService, AuthorizationDecision, AuthorizationGate,
        AuthorizationService, FunctionPolicy, GateOutcome, HeaderKeyAuthentication,
        LevelAuthorization, Principal, FUNCTION_KEY_HEADER,
    };
    pub use async_trait::async_trait;
}

// Re-export for convenience
pub use dispatch::{ExecutionCoordinator, InvocationArguments, RouteResolver, RouteTable};
pub use function::{FunctionDescriptor, FunctionRegistry, StratoError, StratoFunction};
pub use http::{StratoRequest, StratoResponse};
pub use runtime::{HostConfig, HostServer};
pub use security::AuthorizationGate;
