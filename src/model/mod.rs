//!
//! Domain entities persisted by the collector.
//!
//! Each entity has a pure `from_wire` constructor that maps one node record into its canonical
//! stored form. Byte identifiers are rendered as lowercase hex, account addresses are kept as
//! the node renders them.

mod account;
mod activation;
mod layer;
mod malfeasance;
mod network_info;
mod smesher;
mod transaction;

pub use account::Account;
pub use activation::Activation;
pub use layer::Layer;
pub use malfeasance::MalfeasanceProof;
pub use network_info::NetworkInfo;
pub use smesher::Smesher;
pub use transaction::{Transaction, TransactionPayload, TransactionReceipt};

/// Error types for record mapping
#[derive(Debug, thiserror::Error)]
pub enum MapError {
	#[error("Transaction {0} carries neither a coin transfer nor a smart contract payload")]
	MissingPayload(String),

	#[error("Transaction {0} carries both a coin transfer and a smart contract payload")]
	AmbiguousPayload(String),

	#[error("Missing required field: {0}")]
	MissingField(&'static str),
}
