//! Typed access to the Storage REST API.
//!
//! `client` is the transport layer; `envelope` holds the per-call-kind
//! result shapes; `models` the entities and payloads.

pub mod client;
pub mod envelope;
pub mod models;
