//!
//! Node client for the mesh collector.
//!
//! `NodeClient` is the seam between the ingestion core and the node: one-shot metadata calls,
//! point layer queries, and the two long-lived record streams. `HttpNodeClient` implements it
//! over the node's JSON gateway, where streaming endpoints answer with one JSON object per line.

use super::types::*;
use futures::Stream;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, error};

/// A pinned stream of wire records, each item either a record or a transport error.
pub type RecordStream<T> = Pin<Box<dyn Stream<Item = Result<T, NodeError>> + Send>>;

/// The node API surface consumed by the collector.
#[async_trait::async_trait]
pub trait NodeClient: Send + Sync {
	/// Genesis time as a unix timestamp in seconds.
	async fn genesis_time(&self) -> Result<u64, NodeError>;

	async fn genesis_id(&self) -> Result<Vec<u8>, NodeError>;

	async fn epoch_num_layers(&self) -> Result<u64, NodeError>;

	async fn max_transactions_per_second(&self) -> Result<u64, NodeError>;

	/// Layer duration in seconds.
	async fn layer_duration(&self) -> Result<u64, NodeError>;

	async fn accounts(&self) -> Result<Vec<AccountRecord>, NodeError>;

	async fn post_config(&self) -> Result<PostConfig, NodeError>;

	/// The highest layer the node has synced.
	async fn synced_layer(&self) -> Result<u64, NodeError>;

	/// Layers in `start..=end`, in ascending order.
	async fn layers_query(&self, start: u64, end: u64) -> Result<Vec<LayerRecord>, NodeError>;

	/// Subscribe to newly finalized layers. The stream has no natural end.
	async fn layer_stream(&self) -> Result<RecordStream<LayerRecord>, NodeError>;

	/// Subscribe to malfeasance proofs. The stream has no natural end.
	async fn malfeasance_stream(&self) -> Result<RecordStream<MalfeasanceProofRecord>, NodeError>;
}

/// Node client speaking to the JSON gateway of a node
#[derive(Clone)]
pub struct HttpNodeClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// Base URL of the gateway, without a trailing slash.
	base_url: String,
	/// Deadline applied to every one-shot request. Streams are never bounded.
	request_timeout: Duration,
}

impl HttpNodeClient {
	/// Create a new node client.
	///
	/// # Arguments
	/// * `base_url` - The gateway endpoint, e.g. `http://localhost:9093`.
	/// * `request_timeout` - Deadline for one-shot calls.
	pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, NodeError> {
		let http_client = Client::builder().build()?;

		Ok(Self {
			http_client,
			base_url: base_url.trim_end_matches('/').to_string(),
			request_timeout,
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.base_url, path)
	}

	/// Execute a one-shot gateway call.
	///
	/// # Arguments
	/// * `path` - The endpoint path relative to the base URL.
	/// * `body` - The JSON request body.
	///
	/// # Returns
	/// The decoded response, or a `NodeError` if the call or decoding fails.
	async fn call<B, R>(&self, path: &'static str, body: &B) -> Result<R, NodeError>
	where
		B: Serialize + ?Sized,
		R: DeserializeOwned,
	{
		debug!("Calling {}", path);

		let response = self
			.http_client
			.post(self.url(path))
			.timeout(self.request_timeout)
			.json(body)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(NodeError::StatusError {
				endpoint: path,
				status: response.status().as_u16(),
			});
		}

		Ok(response.json().await?)
	}

	/// Open a streaming gateway call and decode it line by line.
	async fn subscribe<T>(&self, path: &'static str) -> Result<RecordStream<T>, NodeError>
	where
		T: DeserializeOwned + Send + 'static,
	{
		debug!("Opening stream {}", path);

		let response = self
			.http_client
			.post(self.url(path))
			.json(&json!({}))
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(NodeError::StatusError {
				endpoint: path,
				status: response.status().as_u16(),
			});
		}

		Ok(ndjson_stream(response.bytes_stream()))
	}
}

#[async_trait::async_trait]
impl NodeClient for HttpNodeClient {
	async fn genesis_time(&self) -> Result<u64, NodeError> {
		let response: GenesisTimeResponse = self.call("v1/mesh/genesistime", &json!({})).await?;
		Ok(response.unixtime.value)
	}

	async fn genesis_id(&self) -> Result<Vec<u8>, NodeError> {
		let response: GenesisIdResponse = self.call("v1/mesh/genesisid", &json!({})).await?;
		Ok(response.genesis_id)
	}

	async fn epoch_num_layers(&self) -> Result<u64, NodeError> {
		let response: EpochNumLayersResponse =
			self.call("v1/mesh/epochnumlayers", &json!({})).await?;
		Ok(response.numlayers.number)
	}

	async fn max_transactions_per_second(&self) -> Result<u64, NodeError> {
		let response: MaxTransactionsPerSecondResponse = self
			.call("v1/mesh/maxtransactionspersecond", &json!({}))
			.await?;
		Ok(response.max_txs_per_second.value)
	}

	async fn layer_duration(&self) -> Result<u64, NodeError> {
		let response: LayerDurationResponse =
			self.call("v1/mesh/layerduration", &json!({})).await?;
		Ok(response.duration.value)
	}

	async fn accounts(&self) -> Result<Vec<AccountRecord>, NodeError> {
		let response: AccountsResponse = self.call("v1/debug/accounts", &json!({})).await?;
		Ok(response.account_wrapper)
	}

	async fn post_config(&self) -> Result<PostConfig, NodeError> {
		self.call("v1/smesher/postconfig", &json!({})).await
	}

	async fn synced_layer(&self) -> Result<u64, NodeError> {
		let response: NodeStatusResponse = self.call("v1/node/status", &json!({})).await?;
		Ok(response.status.synced_layer.number)
	}

	async fn layers_query(&self, start: u64, end: u64) -> Result<Vec<LayerRecord>, NodeError> {
		let request = LayersQueryRequest {
			start_layer: start.into(),
			end_layer: end.into(),
		};
		let response: LayersQueryResponse = self.call("v1/mesh/layersquery", &request).await?;
		Ok(response.layer)
	}

	async fn layer_stream(&self) -> Result<RecordStream<LayerRecord>, NodeError> {
		let stream = self
			.subscribe::<LayerStreamResponse>("v1/mesh/layerstream")
			.await?;
		Ok(Box::pin(stream.map(|item| item.map(|response| response.layer))))
	}

	async fn malfeasance_stream(&self) -> Result<RecordStream<MalfeasanceProofRecord>, NodeError> {
		let stream = self
			.subscribe::<MalfeasanceStreamResponse>("v1/mesh/malfeasancestream")
			.await?;
		Ok(Box::pin(stream.map(|item| item.map(|response| response.proof))))
	}
}

/// Split a chunked byte stream into lines and decode each line as a stream envelope.
///
/// Chunk boundaries are arbitrary; a record may span several chunks and a chunk may carry
/// several records. A trailing line without a newline is decoded when the body ends.
pub(crate) fn ndjson_stream<T, S, B, E>(bytes: S) -> RecordStream<T>
where
	T: DeserializeOwned + Send + 'static,
	S: Stream<Item = Result<B, E>> + Send + 'static,
	B: AsRef<[u8]> + Send + 'static,
	E: Into<NodeError> + Send + 'static,
{
	let state = (Box::pin(bytes), Vec::<u8>::new());

	let lines = futures_util::stream::unfold(state, |(mut bytes, mut buffer)| async move {
		loop {
			if let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
				let line: Vec<u8> = buffer.drain(..=pos).collect();
				return Some((Ok(line), (bytes, buffer)));
			}

			match bytes.next().await {
				Some(Ok(chunk)) => buffer.extend_from_slice(chunk.as_ref()),
				Some(Err(e)) => return Some((Err(e.into()), (bytes, buffer))),
				None => {
					if buffer.iter().all(u8::is_ascii_whitespace) {
						return None;
					}
					let line = std::mem::take(&mut buffer);
					return Some((Ok(line), (bytes, buffer)));
				}
			}
		}
	});

	Box::pin(lines.filter_map(|line| async move {
		match line {
			Ok(line) => decode_line(&line),
			Err(e) => Some(Err(e)),
		}
	}))
}

fn decode_line<T: DeserializeOwned>(line: &[u8]) -> Option<Result<T, NodeError>> {
	if line.iter().all(u8::is_ascii_whitespace) {
		return None;
	}

	match serde_json::from_slice::<StreamEnvelope<T>>(line) {
		Ok(StreamEnvelope {
			result: Some(record),
			..
		}) => Some(Ok(record)),
		Ok(StreamEnvelope {
			error: Some(status),
			..
		}) => {
			error!("Stream error from gateway: {}", status.message);
			Some(Err(NodeError::GatewayError {
				code: status.code,
				message: status.message,
			}))
		}
		Ok(_) => Some(Err(NodeError::NoData)),
		Err(e) => {
			error!(
				"Failed to decode stream line: {}",
				String::from_utf8_lossy(line)
			);
			Some(Err(NodeError::JsonError(e)))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chunks(parts: &[&str]) -> Vec<Result<Vec<u8>, NodeError>> {
		parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect()
	}

	#[tokio::test]
	async fn reassembles_records_split_across_chunks() {
		let stream = ndjson_stream::<LayerStreamResponse, _, _, _>(futures::stream::iter(chunks(&[
			"{\"result\":{\"layer\":{\"number\":{\"number\":\"1\"}}}}\n{\"res",
			"ult\":{\"layer\":{\"number\":{\"number\":\"2\"}}}}\n\n",
			"{\"result\":{\"layer\":{\"number\":{\"number\":3}}}}",
		])));

		let numbers: Vec<u64> = stream
			.map(|item| item.unwrap().layer.number.number)
			.collect()
			.await;

		assert_eq!(numbers, vec![1, 2, 3]);
	}

	#[tokio::test]
	async fn surfaces_gateway_errors_in_order() {
		let stream = ndjson_stream::<LayerStreamResponse, _, _, _>(futures::stream::iter(chunks(&[
			"{\"result\":{\"layer\":{\"number\":{\"number\":\"5\"}}}}\n",
			"{\"error\":{\"code\":14,\"message\":\"unavailable\"}}\n",
		])));

		let items: Vec<Result<LayerStreamResponse, NodeError>> = stream.collect().await;
		assert_eq!(items.len(), 2);
		assert_eq!(items[0].as_ref().unwrap().layer.number.number, 5);
		assert!(matches!(
			&items[1],
			Err(NodeError::GatewayError { code: 14, message }) if message == "unavailable"
		));
	}

	#[tokio::test]
	async fn passes_transport_errors_through() {
		let parts: Vec<Result<Vec<u8>, NodeError>> = vec![
			Ok(b"{\"result\":{\"proof\":{\"kind\":\"MALFEASANCE_ATX\"}}}\n".to_vec()),
			Err(NodeError::NoData),
		];
		let stream = ndjson_stream::<MalfeasanceStreamResponse, _, _, _>(futures::stream::iter(parts));

		let items: Vec<_> = stream.collect().await;
		assert_eq!(items[0].as_ref().unwrap().proof.kind, "MALFEASANCE_ATX");
		assert!(matches!(items[1], Err(NodeError::NoData)));
	}

	#[test]
	fn base_url_trailing_slash_is_trimmed() {
		let client = HttpNodeClient::new("http://localhost:9093/", Duration::from_secs(5)).unwrap();
		assert_eq!(client.url("v1/node/status"), "http://localhost:9093/v1/node/status");
	}
}
