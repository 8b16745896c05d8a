use chrono::DateTime;

/// Render bytes as `0x`-prefixed lowercase hex.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
	format!("0x{}", hex::encode(bytes))
}

/// Render unix seconds as RFC 3339, or the raw number if it is out of range.
pub fn format_unix_time(secs: u64) -> String {
	i64::try_from(secs)
		.ok()
		.and_then(|secs| DateTime::from_timestamp(secs, 0))
		.map(|time| time.to_rfc3339())
		.unwrap_or_else(|| secs.to_string())
}
