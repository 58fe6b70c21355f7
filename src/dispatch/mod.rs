//! Request dispatch: route resolution, execution coordination, and the
//! post-execution buffering policy.

pub mod buffering;
pub mod coordinator;
pub mod routing;

pub use buffering::{BufferingPolicy, Transport};
pub use coordinator::{
    ArgumentValue, DispatchError, DispatchResult, ExecutionCoordinator, InvocationArguments,
    HTTP_REQUEST_ARG,
};
pub use routing::{
    MatchResult, ResolutionMode, RouteEntry, RouteMethod, RouteResolver, RouteTable,
    TARGET_FUNCTION_TOKEN,
};
