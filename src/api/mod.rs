//! HTTP API Module
//!
//! Provides the REST API for directory and resource operations.

mod http;

pub use http::{AppState, ErrorResponse, HttpServer};
