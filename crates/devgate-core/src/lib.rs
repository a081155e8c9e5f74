//! devgate Core: domain models, storage contract and shared error
//! types for the developer account service.

pub mod error;
pub mod models;
pub mod repository;
