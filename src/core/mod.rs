//! Core domain types: identifiers, states, requests and records.

pub mod record;
pub mod request;
pub mod types;
