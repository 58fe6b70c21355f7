//! Strato host HTTP server.

use crate::dispatch::buffering::{BufferingPolicy, Transport};
use crate::dispatch::coordinator::{DispatchError, ExecutionCoordinator, InvocationArguments};
use crate::dispatch::routing::{RouteResolver, RouteTable};
use crate::function::descriptor::FunctionDescriptor;
use crate::function::handler::{CancellationToken, StratoFunction};
use crate::function::registry::FunctionRegistry;
use crate::http::{Method, StatusCode, StratoRequest, StratoResponse};
use crate::runtime::HostConfig;
use crate::security::gate::AuthorizationGate;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Strato host server.
///
/// Accepts HTTP requests and hands each one to the execution coordinator,
/// then applies the buffering policy for the descriptor routing resolved.
pub struct HostServer {
    /// Server configuration.
    config: HostConfig,
    /// Function registry backing the dispatcher.
    registry: Arc<FunctionRegistry>,
    /// Route resolver over the host's route table.
    resolver: Arc<RouteResolver>,
    /// Dispatch pipeline.
    coordinator: Arc<ExecutionCoordinator>,
}

impl HostServer {
    /// Create a host server over the given routes and authorization gate.
    pub fn new(config: HostConfig, routes: RouteTable, gate: AuthorizationGate) -> Self {
        let registry = Arc::new(FunctionRegistry::new());
        let resolver = Arc::new(RouteResolver::new(routes));
        let coordinator = Arc::new(
            ExecutionCoordinator::new(registry.clone(), resolver.clone(), gate)
                .resolution_mode(config.resolution_mode)
                .with_environment(config.function_env()),
        );
        Self {
            config,
            registry,
            resolver,
            coordinator,
        }
    }

    /// Get the function registry.
    pub fn registry(&self) -> Arc<FunctionRegistry> {
        self.registry.clone()
    }

    /// Get the route resolver, for wholesale route reloads.
    pub fn resolver(&self) -> Arc<RouteResolver> {
        self.resolver.clone()
    }

    /// Register a function with the host.
    pub fn register_function(&self, descriptor: FunctionDescriptor, body: Arc<dyn StratoFunction>) {
        self.registry.register(descriptor, body);
    }

    /// Start the HTTP server.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = self.config.bind_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;

        if let Some(assignment) = &self.config.assignment {
            info!(
                "Serving site '{}' (id {})",
                assignment.site_name, assignment.site_id
            );
        }
        info!("Strato host listening on {}", addr);

        let coordinator = self.coordinator.clone();
        let config = self.config.clone();

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);

            let coordinator = coordinator.clone();
            let config = config.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let coordinator = coordinator.clone();
                    let config = config.clone();
                    async move { handle_request(req, coordinator, config, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: {:?}", err);
                }
            });
        }
    }
}

/// Per-connection buffering state driven by the buffering policy.
///
/// Both flags start enabled; disabling is one-way for the life of the
/// connection, which keeps the operations idempotent.
#[derive(Debug)]
struct ConnectionTransport {
    request_buffering: AtomicBool,
    response_buffering: AtomicBool,
}

impl Default for ConnectionTransport {
    fn default() -> Self {
        Self {
            request_buffering: AtomicBool::new(true),
            response_buffering: AtomicBool::new(true),
        }
    }
}

impl ConnectionTransport {
    fn request_buffering_enabled(&self) -> bool {
        self.request_buffering.load(Ordering::Acquire)
    }

    fn response_buffering_enabled(&self) -> bool {
        self.response_buffering.load(Ordering::Acquire)
    }
}

impl Transport for ConnectionTransport {
    fn disable_request_buffering(&self) {
        self.request_buffering.store(false, Ordering::Release);
    }

    fn disable_response_buffering(&self) {
        self.response_buffering.store(false, Ordering::Release);
    }
}

/// Handle an incoming HTTP request.
async fn handle_request(
    req: Request<Incoming>,
    coordinator: Arc<ExecutionCoordinator>,
    config: HostConfig,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    debug!("Handling request: {} {} from {}", method, path, remote_addr);

    if config.enable_health && path == "/_health" {
        return Ok(build_response(StratoResponse::text("OK")));
    }

    // The first path segment is the default function-name hint; route
    // resolution may replace it.
    let hint = path
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or("")
        .to_string();

    let strato_request = match convert_request(req, &config).await {
        Ok(request) => request,
        Err(e) => {
            warn!("Failed to convert request: {}", e);
            return Ok(build_response(StratoResponse::error(
                StatusCode::BAD_REQUEST,
                e.to_string(),
            )));
        }
    };

    let arguments = InvocationArguments::for_request(strato_request);
    let cancellation = CancellationToken::new();
    let transport = ConnectionTransport::default();

    match coordinator
        .execute(&hint, &arguments, cancellation, &transport)
        .await
    {
        Ok(result) => {
            BufferingPolicy::apply_post_execution(result.descriptor.as_deref(), &transport);
            if !transport.request_buffering_enabled() || !transport.response_buffering_enabled() {
                debug!("Streaming to {} without transport buffering", remote_addr);
            }

            match result.outcome {
                Some(response) => Ok(build_response(response)),
                None => {
                    debug!("Dispatch made no decision; completing with default response");
                    Ok(build_response(StratoResponse::new(StatusCode::OK)))
                }
            }
        }
        Err(DispatchError::MissingRequestArgument) => {
            error!("Dispatch invoked without the inbound request argument");
            Ok(build_response(StratoResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal dispatch error",
            )))
        }
        Err(DispatchError::ExecutionFault { function, source }) => {
            error!("Function '{}' faulted: {}", function, source);
            Ok(build_response(StratoResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Function execution failed",
            )))
        }
    }
}

/// Convert a hyper Request to a StratoRequest.
async fn convert_request(
    req: Request<Incoming>,
    config: &HostConfig,
) -> Result<StratoRequest, Box<dyn std::error::Error + Send + Sync>> {
    let method = Method::from(req.method());
    let path = req.uri().path().to_string();

    let mut headers = HashMap::new();
    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_string(), v.to_string());
        }
    }

    let body_bytes = req.collect().await?.to_bytes();
    let body = if body_bytes.len() > config.max_body_size {
        return Err("Request body too large".into());
    } else if body_bytes.is_empty() {
        None
    } else {
        Some(body_bytes)
    };

    Ok(StratoRequest {
        method,
        path,
        headers,
        body,
    })
}

/// Build a hyper Response from a StratoResponse.
fn build_response(strato_response: StratoResponse) -> Response<Full<Bytes>> {
    let status = hyper::StatusCode::from_u16(strato_response.status.0).unwrap_or_else(|_| {
        warn!(
            "Invalid status code {}, falling back to 500 Internal Server Error",
            strato_response.status.0
        );
        hyper::StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut builder = Response::builder().status(status);

    for (name, value) in strato_response.headers {
        builder = builder.header(name, value);
    }

    let body = strato_response.body.unwrap_or_default();
    builder
        .body(Full::new(body))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}
