//! Integration tests for the Strato dispatch pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use strato::prelude::*;

/// Function body that counts invocations and optionally produces a result,
/// either as a direct return or through the context's response slot.
struct CountingFunction {
    hits: Arc<AtomicUsize>,
    direct: Option<StratoResponse>,
    slot: Option<StratoResponse>,
}

impl CountingFunction {
    fn silent(hits: Arc<AtomicUsize>) -> Self {
        Self {
            hits,
            direct: None,
            slot: None,
        }
    }

    fn returning(hits: Arc<AtomicUsize>, response: StratoResponse) -> Self {
        Self {
            hits,
            direct: Some(response),
            slot: None,
        }
    }

    fn depositing(hits: Arc<AtomicUsize>, response: StratoResponse) -> Self {
        Self {
            hits,
            direct: None,
            slot: Some(response),
        }
    }
}

#[async_trait]
impl StratoFunction for CountingFunction {
    async fn invoke(
        &self,
        _request: StratoRequest,
        ctx: &InvocationContext,
    ) -> Result<Option<StratoResponse>, StratoError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = &self.slot {
            ctx.respond(response.clone());
        }
        Ok(self.direct.clone())
    }
}

/// Function body that always faults.
struct FailingFunction;

#[async_trait]
impl StratoFunction for FailingFunction {
    async fn invoke(
        &self,
        _request: StratoRequest,
        _ctx: &InvocationContext,
    ) -> Result<Option<StratoResponse>, StratoError> {
        Err(StratoError::new("boom"))
    }
}

/// Function body that records what the invocation context carried.
struct ObservingFunction {
    seen_route_value: Arc<Mutex<Option<String>>>,
    seen_cancelled: Arc<Mutex<Option<bool>>>,
}

#[async_trait]
impl StratoFunction for ObservingFunction {
    async fn invoke(
        &self,
        _request: StratoRequest,
        ctx: &InvocationContext,
    ) -> Result<Option<StratoResponse>, StratoError> {
        *self.seen_route_value.lock().unwrap() = ctx.route_value("id").cloned();
        *self.seen_cancelled.lock().unwrap() = Some(ctx.cancellation.is_cancelled());
        Ok(None)
    }
}

/// Authentication stub producing a fixed principal.
struct StaticAuthentication {
    principal: Principal,
}

#[async_trait]
impl AuthenticationService for StaticAuthentication {
    async fn authenticate(
        &self,
        _policy: &FunctionPolicy,
        _request: &StratoRequest,
    ) -> AuthenticationOutcome {
        AuthenticationOutcome::principal(self.principal.clone())
    }
}

struct AllowAll;

#[async_trait]
impl AuthorizationService for AllowAll {
    async fn authorize(
        &self,
        _policy: &FunctionPolicy,
        _authentication: &AuthenticationOutcome,
        _request: &StratoRequest,
        _resource: &FunctionDescriptor,
    ) -> AuthorizationDecision {
        AuthorizationDecision { succeeded: true }
    }
}

struct DenyAll;

#[async_trait]
impl AuthorizationService for DenyAll {
    async fn authorize(
        &self,
        _policy: &FunctionPolicy,
        _authentication: &AuthenticationOutcome,
        _request: &StratoRequest,
        _resource: &FunctionDescriptor,
    ) -> AuthorizationDecision {
        AuthorizationDecision { succeeded: false }
    }
}

/// Transport double counting buffering changes.
#[derive(Default)]
struct RecordingTransport {
    request_disables: AtomicUsize,
    response_disables: AtomicUsize,
    started: bool,
}

impl Transport for RecordingTransport {
    fn disable_request_buffering(&self) {
        self.request_disables.fetch_add(1, Ordering::SeqCst);
    }

    fn disable_response_buffering(&self) {
        self.response_disables.fetch_add(1, Ordering::SeqCst);
    }

    fn response_started(&self) -> bool {
        self.started
    }
}

fn gate_for(principal: Principal) -> AuthorizationGate {
    AuthorizationGate::new(
        Arc::new(StaticAuthentication { principal }),
        Arc::new(AllowAll),
    )
}

fn denying_gate() -> AuthorizationGate {
    AuthorizationGate::new(
        Arc::new(StaticAuthentication {
            principal: Principal::new("caller", AuthLevel::Function),
        }),
        Arc::new(DenyAll),
    )
}

fn coordinator_for(
    registry: Arc<FunctionRegistry>,
    routes: RouteTable,
    gate: AuthorizationGate,
) -> ExecutionCoordinator {
    ExecutionCoordinator::new(registry, Arc::new(RouteResolver::new(routes)), gate)
}

fn get_request(path: &str) -> InvocationArguments {
    InvocationArguments::for_request(StratoRequest::new(Method::Get, path))
}

#[tokio::test]
async fn test_proxy_override_route_wins_over_earlier_entry() {
    let registry = Arc::new(FunctionRegistry::new());
    let f1 = Arc::new(AtomicUsize::new(0));
    let f2 = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("F1"),
        Arc::new(CountingFunction::silent(f1.clone())),
    );
    registry.register(
        FunctionDescriptor::new("F2"),
        Arc::new(CountingFunction::silent(f2.clone())),
    );

    let mut routes = RouteTable::new();
    routes.add(RouteEntry::new(RouteMethod::Any, "/a", "F1"));
    routes.add(RouteEntry::new(RouteMethod::Any, "/a", "F2"));

    let coordinator = coordinator_for(
        registry,
        routes,
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute("F1", &get_request("/a"), CancellationToken::new(), &transport)
        .await
        .unwrap();

    assert_eq!(result.descriptor.as_ref().map(|d| d.name.as_str()), Some("F2"));
    assert_eq!(f1.load(Ordering::SeqCst), 0);
    assert_eq!(f2.load(Ordering::SeqCst), 1);
    assert_eq!(result.outcome.unwrap().status, StatusCode::OK);
}

#[tokio::test]
async fn test_data_token_override_beats_hint_and_target() {
    let registry = Arc::new(FunctionRegistry::new());
    let target_hits = Arc::new(AtomicUsize::new(0));
    let override_hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("generic"),
        Arc::new(CountingFunction::silent(target_hits.clone())),
    );
    registry.register(
        FunctionDescriptor::new("special"),
        Arc::new(CountingFunction::silent(override_hits.clone())),
    );

    let mut routes = RouteTable::new();
    routes.add(
        RouteEntry::new(RouteMethod::Any, "/a", "generic")
            .data_token(TARGET_FUNCTION_TOKEN, "special"),
    );

    let coordinator = coordinator_for(
        registry,
        routes,
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "generic",
            &get_request("/a"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    assert_eq!(
        result.descriptor.as_ref().map(|d| d.name.as_str()),
        Some("special")
    );
    assert_eq!(target_hits.load(Ordering::SeqCst), 0);
    assert_eq!(override_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_route_miss_falls_back_to_hint() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("orders"),
        Arc::new(CountingFunction::silent(hits.clone())),
    );

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "orders",
            &get_request("/anything"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(result.outcome.unwrap().status, StatusCode::OK);
}

#[tokio::test]
async fn test_hint_lookup_is_case_insensitive() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("MyFunc"),
        Arc::new(CountingFunction::silent(hits.clone())),
    );

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "myfunc",
            &get_request("/myfunc"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(
        result.descriptor.as_ref().map(|d| d.name.as_str()),
        Some("MyFunc")
    );
}

#[tokio::test]
async fn test_unknown_function_yields_not_found() {
    let registry = Arc::new(FunctionRegistry::new());
    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "missing",
            &get_request("/missing"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    assert!(result.descriptor.is_none());
    assert_eq!(result.outcome.unwrap().status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_authorization_failure_yields_401_and_skips_body() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("orders"),
        Arc::new(CountingFunction::silent(hits.clone())),
    );

    let coordinator = coordinator_for(registry, RouteTable::new(), denying_gate());
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "orders",
            &get_request("/orders"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    assert_eq!(result.outcome.unwrap().status, StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_disabled_function_yields_not_found_without_admin() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("orders").disabled(),
        Arc::new(CountingFunction::silent(hits.clone())),
    );

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "orders",
            &get_request("/orders"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    assert_eq!(result.outcome.unwrap().status, StatusCode::NOT_FOUND);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_disabled_function_executes_for_admin() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("orders").disabled(),
        Arc::new(CountingFunction::silent(hits.clone())),
    );

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("operator", AuthLevel::Admin)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "orders",
            &get_request("/orders"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    assert_eq!(result.outcome.unwrap().status, StatusCode::OK);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_slot_response_is_returned_verbatim() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    let deposited = StratoResponse::new(StatusCode::CREATED)
        .header("X-Via", "slot")
        .body("made it");
    registry.register(
        FunctionDescriptor::new("orders"),
        Arc::new(CountingFunction::depositing(hits.clone(), deposited.clone())),
    );

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "orders",
            &get_request("/orders"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    assert_eq!(result.outcome.unwrap(), deposited);
}

#[tokio::test]
async fn test_direct_response_wins_over_default() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("orders"),
        Arc::new(CountingFunction::returning(
            hits.clone(),
            StratoResponse::text("direct"),
        )),
    );

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "orders",
            &get_request("/orders"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    let outcome = result.outcome.unwrap();
    assert_eq!(outcome.text_body(), Some("direct".to_string()));
}

#[tokio::test]
async fn test_no_response_defaults_to_ok() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("orders"),
        Arc::new(CountingFunction::silent(hits.clone())),
    );

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "orders",
            &get_request("/orders"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    let outcome = result.outcome.unwrap();
    assert_eq!(outcome.status, StatusCode::OK);
    assert!(outcome.body.is_none());
}

#[tokio::test]
async fn test_missing_request_argument_fails_fast() {
    let registry = Arc::new(FunctionRegistry::new());
    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let arguments = InvocationArguments::new().with(
        "unrelated",
        ArgumentValue::Json(serde_json::json!({"k": "v"})),
    );
    let result = coordinator
        .execute("orders", &arguments, CancellationToken::new(), &transport)
        .await;

    assert!(matches!(result, Err(DispatchError::MissingRequestArgument)));
}

#[tokio::test]
async fn test_execution_fault_propagates_to_caller() {
    let registry = Arc::new(FunctionRegistry::new());
    registry.register(FunctionDescriptor::new("orders"), Arc::new(FailingFunction));

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "orders",
            &get_request("/orders"),
            CancellationToken::new(),
            &transport,
        )
        .await;

    assert!(matches!(
        result,
        Err(DispatchError::ExecutionFault { ref function, .. }) if function == "orders"
    ));
}

#[tokio::test]
async fn test_buffering_disabled_once_for_non_proxy() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("orders"),
        Arc::new(CountingFunction::silent(hits.clone())),
    );

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "orders",
            &get_request("/orders"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();
    BufferingPolicy::apply_post_execution(result.descriptor.as_deref(), &transport);

    assert_eq!(transport.request_disables.load(Ordering::SeqCst), 1);
    assert_eq!(transport.response_disables.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_buffering_kept_for_proxy() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("relay").proxy(),
        Arc::new(CountingFunction::silent(hits.clone())),
    );

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "relay",
            &get_request("/relay"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();
    BufferingPolicy::apply_post_execution(result.descriptor.as_deref(), &transport);

    assert_eq!(transport.request_disables.load(Ordering::SeqCst), 0);
    assert_eq!(transport.response_disables.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_buffering_applies_after_unauthorized_short_circuit() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("orders"),
        Arc::new(CountingFunction::silent(hits.clone())),
    );

    let coordinator = coordinator_for(registry, RouteTable::new(), denying_gate());
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "orders",
            &get_request("/orders"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();
    BufferingPolicy::apply_post_execution(result.descriptor.as_deref(), &transport);

    // Buffering follows the resolved descriptor, not the 401 outcome.
    assert_eq!(result.outcome.unwrap().status, StatusCode::UNAUTHORIZED);
    assert_eq!(transport.request_disables.load(Ordering::SeqCst), 1);
    assert_eq!(transport.response_disables.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_route_values_reach_the_invocation_context() {
    let registry = Arc::new(FunctionRegistry::new());
    let seen_route_value = Arc::new(Mutex::new(None));
    let seen_cancelled = Arc::new(Mutex::new(None));
    registry.register(
        FunctionDescriptor::new("order-get"),
        Arc::new(ObservingFunction {
            seen_route_value: seen_route_value.clone(),
            seen_cancelled: seen_cancelled.clone(),
        }),
    );

    let mut routes = RouteTable::new();
    routes.add(RouteEntry::new(RouteMethod::Get, "/orders/:id", "order-get"));

    let coordinator = coordinator_for(
        registry,
        routes,
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    coordinator
        .execute(
            "order-get",
            &get_request("/orders/42"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    assert_eq!(*seen_route_value.lock().unwrap(), Some("42".to_string()));
}

#[tokio::test]
async fn test_cancellation_is_forwarded_into_the_invocation() {
    let registry = Arc::new(FunctionRegistry::new());
    let seen_route_value = Arc::new(Mutex::new(None));
    let seen_cancelled = Arc::new(Mutex::new(None));
    registry.register(
        FunctionDescriptor::new("orders"),
        Arc::new(ObservingFunction {
            seen_route_value: seen_route_value.clone(),
            seen_cancelled: seen_cancelled.clone(),
        }),
    );

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let cancellation = CancellationToken::new();
    cancellation.cancel();
    coordinator
        .execute("orders", &get_request("/orders"), cancellation, &transport)
        .await
        .unwrap();

    assert_eq!(*seen_cancelled.lock().unwrap(), Some(true));
}

#[tokio::test]
async fn test_not_ready_host_skips_execution_but_still_answers() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("orders"),
        Arc::new(CountingFunction::silent(hits.clone())),
    );
    registry.set_ready(false);

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "orders",
            &get_request("/orders"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(result.outcome.unwrap().status, StatusCode::OK);
}

#[tokio::test]
async fn test_started_response_yields_no_outcome() {
    let registry = Arc::new(FunctionRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    registry.register(
        FunctionDescriptor::new("orders"),
        Arc::new(CountingFunction::silent(hits.clone())),
    );

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    );
    let transport = RecordingTransport {
        started: true,
        ..Default::default()
    };

    let result = coordinator
        .execute(
            "orders",
            &get_request("/orders"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    assert!(result.outcome.is_none());
    assert!(result.descriptor.is_some());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_environment_reaches_the_invocation_context() {
    struct EnvFunction;

    #[async_trait]
    impl StratoFunction for EnvFunction {
        async fn invoke(
            &self,
            _request: StratoRequest,
            ctx: &InvocationContext,
        ) -> Result<Option<StratoResponse>, StratoError> {
            let region = ctx.get_env("REGION").cloned().unwrap_or_default();
            Ok(Some(StratoResponse::text(region)))
        }
    }

    let registry = Arc::new(FunctionRegistry::new());
    registry.register(FunctionDescriptor::new("orders"), Arc::new(EnvFunction));

    let mut env = HashMap::new();
    env.insert("REGION".to_string(), "eu-west".to_string());

    let coordinator = coordinator_for(
        registry,
        RouteTable::new(),
        gate_for(Principal::new("caller", AuthLevel::Function)),
    )
    .with_environment(env);
    let transport = RecordingTransport::default();

    let result = coordinator
        .execute(
            "orders",
            &get_request("/orders"),
            CancellationToken::new(),
            &transport,
        )
        .await
        .unwrap();

    assert_eq!(
        result.outcome.unwrap().text_body(),
        Some("eu-west".to_string())
    );
}
