//! Formatting and time helpers.

use alloy_primitives::U256;

/// Truncates a hex string for log output.
///
/// Shows only the first 10 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Adds "0x" prefix to a hex string if it doesn't already have one.
pub fn with_0x_prefix(hex_str: &str) -> String {
	if hex_str.to_lowercase().starts_with("0x") {
		hex_str.to_string()
	} else {
		format!("0x{}", hex_str)
	}
}

/// Formats a raw on-chain token amount for display.
///
/// The integer value is split at `decimals` and trailing zeros of the
/// fractional part are trimmed, so `1500000000000000000` with 18 decimals
/// renders as `"1.5"` and whole amounts render without a decimal point.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
	let digits = amount.to_string();
	if decimals == 0 {
		return digits;
	}

	let decimal_places = decimals as usize;
	let (integer_part, decimal_part) = if digits.len() <= decimal_places {
		("0".to_string(), format!("{:0>width$}", digits, width = decimal_places))
	} else {
		let split_pos = digits.len() - decimal_places;
		(
			digits[..split_pos].to_string(),
			digits[split_pos..].to_string(),
		)
	};

	let decimal_trimmed = decimal_part.trim_end_matches('0');
	if decimal_trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, decimal_trimmed)
	}
}

/// Current UNIX timestamp in seconds, 0 if the clock is before the epoch.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}
