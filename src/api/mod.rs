//! API Module
//!
//! HTTP handlers and routing for the caching proxy.
//!
//! # Endpoints
//! - `GET /resources/*path` - Read-through fetch of an upstream resource
//! - `DELETE /cache/keys/*key` - Invalidate one key
//! - `POST /cache/invalidate` - Invalidate keys matching a regex
//! - `DELETE /cache` - Clear the cache
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
