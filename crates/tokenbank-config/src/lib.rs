//! Configuration module for the TokenBank depositor.
//!
//! Configuration is loaded from TOML. String values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`, which keeps the wallet key out
//! of the file itself.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["contracts.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use alloy_primitives::Address;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tokenbank_types::{SecretString, CANONICAL_PERMIT2_ADDRESS, DEFAULT_TOKEN_DECIMALS};

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep only the message, not the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the depositor.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// The single chain the depositor talks to.
	pub network: NetworkConfig,
	/// Addresses of the bank, token and Permit2 contracts.
	pub contracts: ContractsConfig,
	/// Display properties of the deposit token.
	#[serde(default)]
	pub token: TokenConfig,
	/// Wallet used to sign permits and transactions.
	pub account: AccountConfig,
	/// Transaction confirmation settings.
	#[serde(default)]
	pub delivery: DeliveryConfig,
	/// Permit construction settings.
	#[serde(default)]
	pub deposit: DepositConfig,
}

/// Chain connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Expected chain id; connecting to a node on another chain fails.
	pub chain_id: u64,
	/// HTTP(S) JSON-RPC endpoint.
	pub rpc_url: String,
}

/// Addresses of the contracts a deposit touches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractsConfig {
	/// TokenBank contract receiving deposits.
	pub bank: Address,
	/// ERC-20 token being deposited.
	pub token: Address,
	/// Permit2 contract, the canonical deployment unless overridden.
	#[serde(default = "default_permit2")]
	pub permit2: Address,
}

fn default_permit2() -> Address {
	CANONICAL_PERMIT2_ADDRESS
}

/// Display properties of the deposit token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
	/// Decimals used to convert entered amounts into token units.
	#[serde(default = "default_decimals")]
	pub decimals: u8,
	/// Unit label shown next to balances.
	#[serde(default = "default_symbol")]
	pub symbol: String,
}

impl Default for TokenConfig {
	fn default() -> Self {
		Self {
			decimals: default_decimals(),
			symbol: default_symbol(),
		}
	}
}

fn default_decimals() -> u8 {
	DEFAULT_TOKEN_DECIMALS
}

fn default_symbol() -> String {
	"Tokens".to_string()
}

/// Wallet configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	/// Hex-encoded secp256k1 private key, usually `${TOKENBANK_PRIVATE_KEY}`.
	pub private_key: SecretString,
}

/// Transaction confirmation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
	/// Confirmations required before a transaction counts as mined.
	#[serde(default = "default_confirmations")]
	pub min_confirmations: u64,
	/// Seconds between receipt polls.
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
	/// Seconds to wait for confirmation before giving up.
	#[serde(default = "default_confirmation_timeout_seconds")]
	pub confirmation_timeout_seconds: u64,
}

impl Default for DeliveryConfig {
	fn default() -> Self {
		Self {
			min_confirmations: default_confirmations(),
			poll_interval_seconds: default_poll_interval_seconds(),
			confirmation_timeout_seconds: default_confirmation_timeout_seconds(),
		}
	}
}

fn default_confirmations() -> u64 {
	1
}

fn default_poll_interval_seconds() -> u64 {
	2
}

fn default_confirmation_timeout_seconds() -> u64 {
	300
}

/// Permit construction settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DepositConfig {
	/// Lifetime of a signed permit in seconds.
	#[serde(default = "default_deadline_seconds")]
	pub deadline_seconds: u64,
	/// Number of Permit2 nonce words scanned before giving up.
	#[serde(default = "default_max_nonce_words")]
	pub max_nonce_words: u32,
}

impl Default for DepositConfig {
	fn default() -> Self {
		Self {
			deadline_seconds: default_deadline_seconds(),
			max_nonce_words: default_max_nonce_words(),
		}
	}
}

fn default_deadline_seconds() -> u64 {
	3600
}

fn default_max_nonce_words() -> u32 {
	16
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last_end = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last_end..full_match.start()]);
		result.push_str(&value);
		last_end = full_match.end();
	}
	result.push_str(&input[last_end..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration to ensure all values are usable.
	///
	/// - The chain id is non-zero and the RPC URL is an HTTP(S) URL
	/// - Bank and token addresses are set, distinct, and not the Permit2 address
	/// - A private key is present
	/// - Confirmation and polling settings are within bounds
	/// - Permit deadline and nonce scan limits are within bounds
	fn validate(&self) -> Result<(), ConfigError> {
		if self.network.chain_id == 0 {
			return Err(ConfigError::Validation("network.chain_id cannot be 0".into()));
		}
		let rpc_url = self.network.rpc_url.trim();
		if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
			return Err(ConfigError::Validation(format!(
				"network.rpc_url must be an http(s) URL, got '{}'",
				self.network.rpc_url
			)));
		}

		if self.contracts.bank.is_zero() {
			return Err(ConfigError::Validation(
				"contracts.bank cannot be the zero address".into(),
			));
		}
		if self.contracts.token.is_zero() {
			return Err(ConfigError::Validation(
				"contracts.token cannot be the zero address".into(),
			));
		}
		if self.contracts.permit2.is_zero() {
			return Err(ConfigError::Validation(
				"contracts.permit2 cannot be the zero address".into(),
			));
		}
		if self.contracts.bank == self.contracts.token {
			return Err(ConfigError::Validation(
				"contracts.bank and contracts.token must differ".into(),
			));
		}
		if self.contracts.permit2 == self.contracts.bank
			|| self.contracts.permit2 == self.contracts.token
		{
			return Err(ConfigError::Validation(
				"contracts.permit2 must differ from the bank and token".into(),
			));
		}

		// 10^78 overflows uint256
		if self.token.decimals > 77 {
			return Err(ConfigError::Validation(format!(
				"token.decimals cannot exceed 77, got {}",
				self.token.decimals
			)));
		}

		if self.account.private_key.is_empty() {
			return Err(ConfigError::Validation(
				"account.private_key cannot be empty".into(),
			));
		}

		if self.delivery.min_confirmations == 0 {
			return Err(ConfigError::Validation(
				"min_confirmations must be at least 1".into(),
			));
		}
		if self.delivery.min_confirmations > 100 {
			return Err(ConfigError::Validation(
				"min_confirmations cannot exceed 100".into(),
			));
		}
		if self.delivery.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"poll_interval_seconds must be greater than 0".into(),
			));
		}
		if self.delivery.confirmation_timeout_seconds < self.delivery.poll_interval_seconds {
			return Err(ConfigError::Validation(
				"confirmation_timeout_seconds cannot be shorter than poll_interval_seconds".into(),
			));
		}

		if self.deposit.deadline_seconds == 0 {
			return Err(ConfigError::Validation(
				"deposit.deadline_seconds must be greater than 0".into(),
			));
		}
		if self.deposit.max_nonce_words == 0 || self.deposit.max_nonce_words > 256 {
			return Err(ConfigError::Validation(format!(
				"deposit.max_nonce_words must be between 1 and 256, got {}",
				self.deposit.max_nonce_words
			)));
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating
/// the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;

	const BASE_CONFIG: &str = r#"
[network]
chain_id = 421614
rpc_url = "https://sepolia-rollup.arbitrum.io/rpc"

[contracts]
bank = "0xdB3eF3cB3079C93A276A2B4B69087b8801727f64"
token = "0xe4Cec63058807C50C95CEF99b0Ab5A9831610386"

[account]
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("TOKENBANK_TEST_HOST", "localhost");
		std::env::set_var("TOKENBANK_TEST_PORT", "8545");

		let input = "rpc_url = \"http://${TOKENBANK_TEST_HOST}:${TOKENBANK_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "rpc_url = \"http://localhost:8545\"");

		std::env::remove_var("TOKENBANK_TEST_HOST");
		std::env::remove_var("TOKENBANK_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${TOKENBANK_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${TOKENBANK_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result
			.unwrap_err()
			.to_string()
			.contains("TOKENBANK_MISSING_VAR"));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = BASE_CONFIG.parse().unwrap();

		assert_eq!(config.network.chain_id, 421614);
		assert_eq!(
			config.contracts.bank,
			address!("0xdB3eF3cB3079C93A276A2B4B69087b8801727f64")
		);
		assert_eq!(config.contracts.permit2, CANONICAL_PERMIT2_ADDRESS);
		assert_eq!(config.token.decimals, 18);
		assert_eq!(config.token.symbol, "Tokens");
		assert_eq!(config.delivery.min_confirmations, 1);
		assert_eq!(config.deposit.deadline_seconds, 3600);
		assert_eq!(config.deposit.max_nonce_words, 16);
	}

	#[test]
	fn test_private_key_from_env() {
		std::env::set_var("TOKENBANK_TEST_KEY", "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d");

		let config_str = BASE_CONFIG.replace(
			"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
			"${TOKENBANK_TEST_KEY}",
		);
		let config: Config = config_str.parse().unwrap();
		assert!(config
			.account
			.private_key
			.with_exposed(|key| key.starts_with("0x59c6")));
		assert!(!format!("{:?}", config).contains("59c6995e"));

		std::env::remove_var("TOKENBANK_TEST_KEY");
	}

	#[test]
	fn test_rejects_non_http_rpc_url() {
		let config_str = BASE_CONFIG.replace(
			"https://sepolia-rollup.arbitrum.io/rpc",
			"wss://sepolia-rollup.arbitrum.io/rpc",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("network.rpc_url"));
	}

	#[test]
	fn test_rejects_same_bank_and_token() {
		let config_str = BASE_CONFIG.replace(
			"0xe4Cec63058807C50C95CEF99b0Ab5A9831610386",
			"0xdB3eF3cB3079C93A276A2B4B69087b8801727f64",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("must differ"));
	}

	#[test]
	fn test_rejects_out_of_range_settings() {
		let config_str = format!("{}\n[delivery]\nmin_confirmations = 0\n", BASE_CONFIG);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("min_confirmations must be at least 1"));

		let config_str = format!("{}\n[deposit]\nmax_nonce_words = 0\n", BASE_CONFIG);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("max_nonce_words"));

		let config_str = format!("{}\n[deposit]\ndeadline_seconds = 0\n", BASE_CONFIG);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("deadline_seconds"));

		let config_str = format!(
			"{}\n[delivery]\npoll_interval_seconds = 10\nconfirmation_timeout_seconds = 5\n",
			BASE_CONFIG
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("confirmation_timeout_seconds"));
	}

	#[test]
	fn test_rejects_empty_private_key() {
		let config_str = BASE_CONFIG.replace(
			"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
			"",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("private_key"));
	}

	#[test]
	fn test_invalid_address_is_parse_error() {
		let config_str = BASE_CONFIG.replace(
			"0xe4Cec63058807C50C95CEF99b0Ab5A9831610386",
			"not-an-address",
		);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}
}
