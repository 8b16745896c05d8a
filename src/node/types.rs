//! Wire types returned by the node's JSON gateway
//!
//! The gateway renders protobuf messages as JSON: field names are lowerCamelCase,
//! 64-bit integers arrive as strings, byte fields arrive base64-encoded and zero values
//! are omitted. Every record therefore derives `Default` and deserializes leniently.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Deserializer, Serialize};

/// Accepts a 64-bit integer rendered either as a JSON number or as a decimal string.
fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Repr {
		Number(u64),
		Text(String),
	}

	match Repr::deserialize(deserializer)? {
		Repr::Number(value) => Ok(value),
		Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
	}
}

/// Decodes a base64 byte field.
fn de_bytes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
	let encoded = String::deserialize(deserializer)?;
	BASE64.decode(encoded.as_bytes()).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayerNumber {
	#[serde(deserialize_with = "de_u64")]
	pub number: u64,
}

impl From<u64> for LayerNumber {
	fn from(number: u64) -> Self {
		Self { number }
	}
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AccountId {
	pub address: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TransactionId {
	#[serde(deserialize_with = "de_bytes")]
	pub id: Vec<u8>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ActivationId {
	#[serde(deserialize_with = "de_bytes")]
	pub id: Vec<u8>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SmesherId {
	#[serde(deserialize_with = "de_bytes")]
	pub id: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Amount {
	#[serde(deserialize_with = "de_u64")]
	pub value: u64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct GasOffered {
	#[serde(deserialize_with = "de_u64")]
	pub gas_provided: u64,
	#[serde(deserialize_with = "de_u64")]
	pub gas_price: u64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Signature {
	pub scheme: i32,
	#[serde(deserialize_with = "de_bytes")]
	pub signature: Vec<u8>,
	#[serde(deserialize_with = "de_bytes")]
	pub public_key: Vec<u8>,
}

/// Plain coin transfer payload.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CoinTransfer {
	pub receiver: AccountId,
}

/// Smart-contract call or deploy payload. `data` is opaque SVM input.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SmartContract {
	#[serde(rename = "type")]
	pub tx_type: i32,
	pub data: String,
	pub account_id: AccountId,
}

/// A transaction as it appears inside a layer's block.
///
/// Exactly one of `coin_transfer` and `smart_contract` is set on a well-formed record.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionRecord {
	pub id: TransactionId,
	pub sender: AccountId,
	pub gas_offered: GasOffered,
	pub amount: Amount,
	#[serde(deserialize_with = "de_u64")]
	pub counter: u64,
	pub signature: Signature,
	pub coin_transfer: Option<CoinTransfer>,
	pub smart_contract: Option<SmartContract>,
}

/// Post-execution outcome of a transaction.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionReceiptRecord {
	pub id: TransactionId,
	pub result: i32,
	#[serde(deserialize_with = "de_u64")]
	pub gas_used: u64,
	pub fee: Amount,
	#[serde(deserialize_with = "de_u64")]
	pub layer_number: u64,
	pub index: u32,
	pub svm_data: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BlockRecord {
	#[serde(deserialize_with = "de_bytes")]
	pub id: Vec<u8>,
	pub transactions: Vec<TransactionRecord>,
	pub receipts: Vec<TransactionReceiptRecord>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivationRecord {
	pub id: ActivationId,
	pub layer: LayerNumber,
	pub smesher_id: SmesherId,
	pub coinbase: AccountId,
	pub prev_atx: ActivationId,
	pub num_units: u32,
}

/// Layer status as reported by the node. Variants are ordered by finality.
#[derive(
	Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum LayerStatus {
	#[default]
	#[serde(rename = "LAYER_STATUS_UNSPECIFIED")]
	Unspecified,
	#[serde(rename = "LAYER_STATUS_APPROVED")]
	Approved,
	#[serde(rename = "LAYER_STATUS_CONFIRMED")]
	Confirmed,
	#[serde(rename = "LAYER_STATUS_APPLIED")]
	Applied,
}

impl LayerStatus {
	pub fn as_i64(self) -> i64 {
		match self {
			LayerStatus::Unspecified => 0,
			LayerStatus::Approved => 1,
			LayerStatus::Confirmed => 2,
			LayerStatus::Applied => 3,
		}
	}

	pub fn from_i64(value: i64) -> Option<Self> {
		match value {
			0 => Some(LayerStatus::Unspecified),
			1 => Some(LayerStatus::Approved),
			2 => Some(LayerStatus::Confirmed),
			3 => Some(LayerStatus::Applied),
			_ => None,
		}
	}
}

/// A finalized layer with its blocks and the activations published in it.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayerRecord {
	pub number: LayerNumber,
	pub status: LayerStatus,
	#[serde(deserialize_with = "de_bytes")]
	pub hash: Vec<u8>,
	pub blocks: Vec<BlockRecord>,
	pub activations: Vec<ActivationRecord>,
}

/// Evidence that a smesher violated protocol rules.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct MalfeasanceProofRecord {
	pub smesher_id: SmesherId,
	pub layer: LayerNumber,
	pub kind: String,
	pub debug_info: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AccountState {
	#[serde(deserialize_with = "de_u64")]
	pub counter: u64,
	pub balance: Amount,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountRecord {
	pub account_id: AccountId,
	pub state_current: AccountState,
}

/// Proof-of-space-time parameters used to size a storage unit.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PostConfig {
	pub bits_per_label: u32,
	#[serde(deserialize_with = "de_u64")]
	pub labels_per_unit: u64,
}

impl PostConfig {
	/// Size in bytes of one storage unit.
	pub fn unit_size(&self) -> u64 {
		u64::from(self.bits_per_label).saturating_mul(self.labels_per_unit) / 8
	}
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SimpleInt {
	#[serde(deserialize_with = "de_u64")]
	pub value: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct GenesisTimeResponse {
	pub unixtime: SimpleInt,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct GenesisIdResponse {
	#[serde(deserialize_with = "de_bytes")]
	pub genesis_id: Vec<u8>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct EpochNumLayersResponse {
	pub numlayers: LayerNumber,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct MaxTransactionsPerSecondResponse {
	pub max_txs_per_second: SimpleInt,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LayerDurationResponse {
	pub duration: SimpleInt,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct AccountsResponse {
	pub account_wrapper: Vec<AccountRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct NodeStatus {
	pub synced_layer: LayerNumber,
	pub top_layer: LayerNumber,
	pub verified_layer: LayerNumber,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct NodeStatusResponse {
	pub status: NodeStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LayersQueryRequest {
	pub start_layer: LayerNumber,
	pub end_layer: LayerNumber,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LayersQueryResponse {
	pub layer: Vec<LayerRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LayerStreamResponse {
	pub layer: LayerRecord,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MalfeasanceStreamResponse {
	pub proof: MalfeasanceProofRecord,
}

/// One line of a streamed gateway response.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamEnvelope<T> {
	pub result: Option<T>,
	pub error: Option<GatewayStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct GatewayStatus {
	pub code: i32,
	pub message: String,
}

/// Error types for node operations
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),

	#[error("{endpoint} responded with HTTP {status}")]
	StatusError { endpoint: &'static str, status: u16 },

	#[error("Gateway error {code}: {message}")]
	GatewayError { code: i32, message: String },

	#[error("No data returned")]
	NoData,
}
