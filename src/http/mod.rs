//! HTTP types for Strato functions providing a fetch-like API.

mod request;
mod response;

pub use request::{Method, StratoRequest};
pub use response::{StatusCode, StratoResponse};
