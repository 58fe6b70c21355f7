//! Strato - Example Dispatch Host
//!
//! This example runs the Strato host with sample functions, a proxy route
//! override, and header-key authentication.

use std::sync::Arc;
use strato::prelude::*;
use tracing_subscriber::EnvFilter;

/// Example "Hello World" function.
struct HelloFunction;

#[async_trait]
impl StratoFunction for HelloFunction {
    async fn invoke(
        &self,
        request: StratoRequest,
        ctx: &InvocationContext,
    ) -> Result<Option<StratoResponse>, StratoError> {
        let name = request
            .get_header("X-Name")
            .cloned()
            .unwrap_or_else(|| "World".to_string());

        let response_body = serde_json::json!({
            "message": format!("Hello, {}!", name),
            "method": request.method.to_string(),
            "path": request.path,
            "request_id": ctx.request_id,
        });

        StratoResponse::json(&response_body)
            .map(Some)
            .map_err(|e| StratoError::new(e.to_string()))
    }
}

/// Echo function - deposits its answer in the response slot instead of
/// returning it.
struct EchoFunction;

#[async_trait]
impl StratoFunction for EchoFunction {
    async fn invoke(
        &self,
        request: StratoRequest,
        ctx: &InvocationContext,
    ) -> Result<Option<StratoResponse>, StratoError> {
        let body = request.text().unwrap_or_default();
        ctx.respond(StratoResponse::text(body));
        Ok(None)
    }
}

/// Proxy relay function standing in front of the hello function.
struct RelayFunction;

#[async_trait]
impl StratoFunction for RelayFunction {
    async fn invoke(
        &self,
        request: StratoRequest,
        _ctx: &InvocationContext,
    ) -> Result<Option<StratoResponse>, StratoError> {
        Ok(Some(
            StratoResponse::text(format!("relayed {}", request.path))
                .header("X-Relayed", "true"),
        ))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Strato host...");

    let assignment = AssignmentContext::new(1, "strato-dev")
        .with_env("REGION", "local")
        .with_env(ZIP_URL_SETTING, "");

    let config = HostConfig::new()
        .host("0.0.0.0")
        .port(8080)
        .env("ENVIRONMENT", "development")
        .assignment(assignment);

    // Routes are tried in reverse registration order, so the relay route
    // added last overrides the generic hello route for the same path.
    let mut routes = RouteTable::new();
    routes.add(RouteEntry::new(RouteMethod::Any, "/api/hello", "hello"));
    routes.add(RouteEntry::new(RouteMethod::Post, "/api/echo", "echo"));
    routes.add(
        RouteEntry::new(RouteMethod::Any, "/api/hello/relayed", "hello")
            .data_token(TARGET_FUNCTION_TOKEN, "relay"),
    );

    let gate = AuthorizationGate::new(
        Arc::new(
            HeaderKeyAuthentication::new()
                .with_key("dev-function-key", AuthLevel::Function)
                .with_key("dev-admin-key", AuthLevel::Admin),
        ),
        Arc::new(LevelAuthorization::new()),
    );

    let server = HostServer::new(config, routes, gate);

    server.register_function(
        FunctionDescriptor::new("hello").auth_level(AuthLevel::Anonymous),
        Arc::new(HelloFunction),
    );
    server.register_function(
        FunctionDescriptor::new("echo").auth_level(AuthLevel::Function),
        Arc::new(EchoFunction),
    );
    server.register_function(
        FunctionDescriptor::new("relay")
            .proxy()
            .auth_level(AuthLevel::Anonymous),
        Arc::new(RelayFunction),
    );

    tracing::info!("Registered functions: hello, echo, relay");
    tracing::info!("Try: curl http://localhost:8080/api/hello");
    tracing::info!("Try: curl http://localhost:8080/api/hello/relayed");
    tracing::info!(
        "Try: curl -X POST -H 'x-function-key: dev-function-key' -d 'test' http://localhost:8080/api/echo"
    );
    tracing::info!("Health check: curl http://localhost:8080/_health");

    server.run().await
}
