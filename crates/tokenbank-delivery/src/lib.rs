//! Transaction delivery for the TokenBank depositor.
//!
//! Everything that touches the chain goes through a [`DeliveryInterface`]:
//! contract reads (`eth_call`), transaction submission, receipts and the
//! block height. [`DeliveryService`] layers typed `sol!` calls and the
//! confirmation wait on top of it.

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokenbank_types::{truncate_id, Transaction, TransactionReceipt};

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur during transaction delivery operations.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// A call reverted or a mined transaction has a failed status.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// Error that occurs when return data cannot be decoded.
	#[error("Decode error: {0}")]
	Decode(String),
	/// The transaction did not reach the required confirmations in time.
	#[error("Timeout waiting for {confirmations} confirmations of {tx_hash} after {seconds} seconds")]
	Timeout {
		tx_hash: B256,
		confirmations: u64,
		seconds: u64,
	},
}

/// Trait defining the interface for chain access.
#[async_trait]
pub trait DeliveryInterface: Send + Sync {
	/// Chain id reported by the node.
	async fn chain_id(&self) -> Result<u64, DeliveryError>;

	/// Executes a read-only call, optionally as `from`.
	async fn call(
		&self,
		from: Option<Address>,
		to: Address,
		data: Bytes,
	) -> Result<Bytes, DeliveryError>;

	/// Signs and broadcasts a transaction from the configured wallet.
	async fn submit(&self, tx: Transaction) -> Result<B256, DeliveryError>;

	/// Returns the receipt if the transaction has been mined.
	async fn get_receipt(&self, hash: &B256) -> Result<Option<TransactionReceipt>, DeliveryError>;

	async fn get_block_number(&self) -> Result<u64, DeliveryError>;
}

/// How long and how often to wait for a transaction to be mined.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationSettings {
	pub min_confirmations: u64,
	pub poll_interval: Duration,
	pub timeout: Duration,
}

impl Default for ConfirmationSettings {
	fn default() -> Self {
		Self {
			min_confirmations: 1,
			poll_interval: Duration::from_secs(2),
			timeout: Duration::from_secs(300),
		}
	}
}

/// Service that manages reads, submission and confirmation on one chain.
pub struct DeliveryService {
	implementation: Box<dyn DeliveryInterface>,
	settings: ConfirmationSettings,
}

impl DeliveryService {
	pub fn new(implementation: Box<dyn DeliveryInterface>, settings: ConfirmationSettings) -> Self {
		Self {
			implementation,
			settings,
		}
	}

	pub async fn chain_id(&self) -> Result<u64, DeliveryError> {
		self.implementation.chain_id().await
	}

	/// Performs a typed read-only contract call and decodes its return value.
	pub async fn read<C: SolCall>(
		&self,
		from: Option<Address>,
		to: Address,
		call: C,
	) -> Result<C::Return, DeliveryError> {
		let output = self
			.implementation
			.call(from, to, call.abi_encode().into())
			.await?;
		C::abi_decode_returns(&output).map_err(|e| {
			DeliveryError::Decode(format!("Failed to decode {} result: {}", C::SIGNATURE, e))
		})
	}

	/// Encodes a contract call and submits it as a transaction.
	pub async fn deliver<C: SolCall>(&self, to: Address, call: C) -> Result<B256, DeliveryError> {
		let tx = Transaction::call(to, call.abi_encode());
		let tx_hash = self.implementation.submit(tx).await?;
		tracing::info!(
			tx_hash = %truncate_id(&tx_hash.to_string()),
			function = C::SIGNATURE,
			"Submitted transaction"
		);
		Ok(tx_hash)
	}

	/// Waits until `tx_hash` has the configured number of confirmations.
	///
	/// A mined transaction with a failed status is reported as
	/// [`DeliveryError::TransactionFailed`].
	pub async fn confirm(&self, tx_hash: &B256) -> Result<TransactionReceipt, DeliveryError> {
		let ConfirmationSettings {
			min_confirmations,
			poll_interval,
			timeout,
		} = self.settings;
		let start_time = tokio::time::Instant::now();

		loop {
			if start_time.elapsed() >= timeout {
				return Err(DeliveryError::Timeout {
					tx_hash: *tx_hash,
					confirmations: min_confirmations,
					seconds: timeout.as_secs(),
				});
			}

			if let Some(receipt) = self.implementation.get_receipt(tx_hash).await? {
				if !receipt.success {
					return Err(DeliveryError::TransactionFailed(format!(
						"Transaction {} reverted in block {}",
						tx_hash, receipt.block_number
					)));
				}

				let current_block = self.implementation.get_block_number().await?;
				// The inclusion block counts as the first confirmation
				let confirmations = (current_block + 1).saturating_sub(receipt.block_number);
				if confirmations >= min_confirmations {
					tracing::info!(
						tx_hash = %truncate_id(&tx_hash.to_string()),
						block = receipt.block_number,
						"Transaction confirmed"
					);
					return Ok(receipt);
				}

				tracing::debug!(
					"Waiting for {} more confirmations...",
					min_confirmations - confirmations
				);
			} else {
				tracing::debug!(tx_hash = %truncate_id(&tx_hash.to_string()), "Transaction not mined yet");
			}

			tokio::time::sleep(poll_interval).await;
		}
	}
}
