//! HTTP request handlers.

pub mod auth;
pub mod developers;
pub mod health;
