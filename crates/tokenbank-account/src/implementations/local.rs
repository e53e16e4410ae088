//! Local private-key account.

use crate::{AccountError, AccountInterface};
use alloy_primitives::{Address, Signature, B256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use tokenbank_types::{with_0x_prefix, SecretString};

/// Account backed by an in-memory secp256k1 key.
#[derive(Debug)]
pub struct LocalAccount {
	signer: PrivateKeySigner,
	private_key: SecretString,
}

impl LocalAccount {
	/// Parses a hex private key, with or without 0x prefix.
	pub fn new(private_key: &SecretString) -> Result<Self, AccountError> {
		let signer: PrivateKeySigner = private_key.with_exposed(|key| {
			key.trim()
				.parse()
				.map_err(|_| AccountError::InvalidKey("Invalid private key format".to_string()))
		})?;
		let private_key = private_key.with_exposed(|key| SecretString::new(with_0x_prefix(key.trim())));

		tracing::debug!(address = %signer.address(), "Loaded local account");
		Ok(Self {
			signer,
			private_key,
		})
	}
}

#[async_trait]
impl AccountInterface for LocalAccount {
	fn address(&self) -> Address {
		self.signer.address()
	}

	async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		self.signer
			.sign_hash(hash)
			.await
			.map_err(|e| AccountError::SigningFailed(e.to_string()))
	}

	fn private_key(&self) -> SecretString {
		self.private_key.clone()
	}
}
