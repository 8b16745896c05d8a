//! Mesh collector: ingests layers, transactions, activations and malfeasance proofs from a
//! node's streaming API into a local SQLite store.

pub mod collector;
pub mod config;
pub mod listener;
pub mod model;
pub mod node;
pub mod storage;
pub mod utils;
