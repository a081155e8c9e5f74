//! Domain models for devgate.

pub mod account;
