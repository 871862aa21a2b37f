//! Core domain + policy logic for the single-user Telegram relay.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! messaging port (trait) implemented in the adapter crate.

pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod policy;
pub mod security;
pub mod storage;

pub use errors::{Error, Result};
