//! Alloy-based EVM delivery over HTTP JSON-RPC.

use crate::{DeliveryError, DeliveryInterface};
use alloy_network::{EthereumWallet, ReceiptResponse};
use alloy_primitives::{Address, Bytes, B256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use tokenbank_types::{truncate_id, SecretString, Transaction, TransactionReceipt};

/// Delivery backed by an alloy provider with the depositor's wallet attached.
///
/// The provider fills gas, nonce and chain id, and signs every submitted
/// transaction with the wallet.
pub struct AlloyDelivery {
	provider: DynProvider,
	chain_id: u64,
}

impl AlloyDelivery {
	/// Connects to `rpc_url` and attaches a wallet built from `private_key`.
	pub async fn new(
		rpc_url: &str,
		chain_id: u64,
		private_key: &SecretString,
	) -> Result<Self, DeliveryError> {
		let signer: PrivateKeySigner = private_key.with_exposed(|key| {
			key.trim()
				.parse()
				.map_err(|_| DeliveryError::Network("Invalid private key format".to_string()))
		})?;
		let wallet = EthereumWallet::from(signer.with_chain_id(Some(chain_id)));

		let provider = ProviderBuilder::new()
			.wallet(wallet)
			.connect(rpc_url)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to connect to {}: {}", rpc_url, e)))?
			.erased();

		tracing::debug!(chain_id, "Connected delivery provider");
		Ok(Self { provider, chain_id })
	}
}

#[async_trait]
impl DeliveryInterface for AlloyDelivery {
	async fn chain_id(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_chain_id()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get chain id: {}", e)))
	}

	async fn call(
		&self,
		from: Option<Address>,
		to: Address,
		data: Bytes,
	) -> Result<Bytes, DeliveryError> {
		let mut request = TransactionRequest::default().to(to).input(data.into());
		if let Some(from) = from {
			request = request.from(from);
		}

		self.provider.call(request).await.map_err(|e| {
			if e.as_error_resp().is_some() {
				DeliveryError::TransactionFailed(format!("Call to {} reverted: {}", to, e))
			} else {
				DeliveryError::Network(format!("Failed to call {}: {}", to, e))
			}
		})
	}

	async fn submit(&self, tx: Transaction) -> Result<B256, DeliveryError> {
		let request = TransactionRequest::default()
			.to(tx.to)
			.input(tx.data.into())
			.value(tx.value);

		let pending_tx = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to send transaction: {}", e)))?;

		let tx_hash = *pending_tx.tx_hash();
		tracing::debug!(
			tx_hash = %truncate_id(&tx_hash.to_string()),
			chain_id = self.chain_id,
			"Transaction accepted by node"
		);
		Ok(tx_hash)
	}

	async fn get_receipt(&self, hash: &B256) -> Result<Option<TransactionReceipt>, DeliveryError> {
		let receipt = self
			.provider
			.get_transaction_receipt(*hash)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get receipt: {}", e)))?;

		Ok(receipt.map(|receipt| TransactionReceipt {
			hash: receipt.transaction_hash,
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
		}))
	}

	async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		self.provider
			.get_block_number()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get block number: {}", e)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_rejects_invalid_private_key() {
		let result = AlloyDelivery::new(
			"http://localhost:8545",
			421614,
			&SecretString::from("not-a-key"),
		)
		.await;

		assert!(matches!(result, Err(DeliveryError::Network(msg)) if msg.contains("private key")));
	}

	#[tokio::test]
	async fn test_connects_lazily_over_http() {
		// HTTP transports do not open a connection until the first request
		let delivery = AlloyDelivery::new(
			"http://127.0.0.1:1",
			421614,
			&SecretString::from("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"),
		)
		.await
		.unwrap();

		assert_eq!(delivery.chain_id, 421614);
		assert!(matches!(
			delivery.get_block_number().await,
			Err(DeliveryError::Network(_))
		));
	}
}
