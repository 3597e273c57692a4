//! The web module for handling the Axum API.

pub mod api;
pub mod models;

pub use api::{create_router, serve_http};
