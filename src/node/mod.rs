//! Node integration module for the mesh collector
//!
//! This module provides the client and wire types for talking to a node's JSON API gateway.
//! One-shot calls return network metadata and point queries; the layer and malfeasance
//! streams are long-lived newline-delimited JSON responses.

/// Node client trait and its HTTP gateway implementation
mod client;
/// Wire record definitions returned by the node
mod types;

pub use client::{HttpNodeClient, NodeClient, RecordStream};
pub use types::*;
