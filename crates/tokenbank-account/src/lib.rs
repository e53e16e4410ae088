//! Account management for the TokenBank depositor.
//!
//! The account is the "wallet" of the depositor: it owns the address that
//! holds tokens and produces the EIP-712 signatures both deposit paths need.
//! Transaction signing itself happens in the delivery layer, which receives
//! the same private key.

use alloy_primitives::{Address, Signature, B256};
use async_trait::async_trait;
use thiserror::Error;
use tokenbank_types::{PermitMessage, SecretString};

pub mod implementations {
	pub mod local;
}

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
}

/// Trait defining the interface for account implementations.
#[async_trait]
pub trait AccountInterface: Send + Sync {
	/// Address of the account.
	fn address(&self) -> Address;

	/// Signs a 32-byte digest, typically an EIP-712 signing hash.
	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError>;

	/// Returns the private key with 0x prefix for the delivery layer.
	fn private_key(&self) -> SecretString;
}

/// Service that manages account operations.
///
/// Wraps an account implementation and adds permit signing on top of raw
/// digest signing.
pub struct AccountService {
	implementation: Box<dyn AccountInterface>,
}

impl AccountService {
	pub fn new(implementation: Box<dyn AccountInterface>) -> Self {
		Self { implementation }
	}

	pub fn address(&self) -> Address {
		self.implementation.address()
	}

	/// Signs the EIP-712 digest of a permit message.
	pub async fn sign_permit(&self, message: &PermitMessage) -> Result<Signature, AccountError> {
		let hash = message.signing_hash();
		tracing::debug!(
			primary_type = message.primary_type(),
			amount = %message.amount(),
			hash = %hash,
			"Signing permit"
		);
		self.implementation.sign_hash(&hash).await
	}

	pub fn private_key(&self) -> SecretString {
		self.implementation.private_key()
	}
}
