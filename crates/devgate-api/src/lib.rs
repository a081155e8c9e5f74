//! devgate API: the HTTP surface over the account lifecycle service.
//!
//! - [`AuthLayer`]: bearer-token session middleware
//! - [`AdminLayer`]: operator-key gate for status changes and purges
//! - [`router`]: route table for `/auth`, `/developers` and `/health`
//! - [`ApiError`]: domain error to HTTP response mapping

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use middleware::{AdminLayer, AuthContext, AuthLayer};
pub use router::router;
pub use state::AppState;
