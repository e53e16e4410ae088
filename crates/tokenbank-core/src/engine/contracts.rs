//! Typed access to the token, Permit2 and bank contracts.

use alloy_primitives::{Address, Bytes, B256, U256};
use std::sync::Arc;
use tokenbank_config::ContractsConfig;
use tokenbank_delivery::{DeliveryError, DeliveryService};
use tokenbank_types::{IERC20Permit, IPermit2, ITokenBank, SplitSignature, TransactionReceipt};

/// The three contracts a deposit touches, bound to one delivery service.
pub struct TokenBankContracts {
	delivery: Arc<DeliveryService>,
	bank: Address,
	token: Address,
	permit2: Address,
}

impl TokenBankContracts {
	pub fn new(delivery: Arc<DeliveryService>, contracts: &ContractsConfig) -> Self {
		Self {
			delivery,
			bank: contracts.bank,
			token: contracts.token,
			permit2: contracts.permit2,
		}
	}

	pub fn bank(&self) -> Address {
		self.bank
	}

	pub fn token(&self) -> Address {
		self.token
	}

	pub fn permit2(&self) -> Address {
		self.permit2
	}

	/// Probes the token for EIP-2612 by calling `DOMAIN_SEPARATOR()`.
	///
	/// Any failure, whether a revert, undecodable output or an RPC error,
	/// counts as unsupported.
	pub async fn supports_eip2612(&self) -> bool {
		match self
			.delivery
			.read(None, self.token, IERC20Permit::DOMAIN_SEPARATORCall {})
			.await
		{
			Ok(separator) => {
				tracing::debug!(domain_separator = %separator, "Token exposes DOMAIN_SEPARATOR");
				true
			},
			Err(e) => {
				tracing::debug!(error = %e, "DOMAIN_SEPARATOR probe failed");
				false
			},
		}
	}

	pub async fn token_name(&self) -> Result<String, DeliveryError> {
		self.delivery
			.read(None, self.token, IERC20Permit::nameCall {})
			.await
	}

	pub async fn token_balance(&self, owner: Address) -> Result<U256, DeliveryError> {
		self.delivery
			.read(None, self.token, IERC20Permit::balanceOfCall { account: owner })
			.await
	}

	/// Bank balance of `owner`; `getBalance()` keys on the caller.
	pub async fn bank_balance(&self, owner: Address) -> Result<U256, DeliveryError> {
		self.delivery
			.read(Some(owner), self.bank, ITokenBank::getBalanceCall {})
			.await
	}

	pub async fn token_nonce(&self, owner: Address) -> Result<U256, DeliveryError> {
		self.delivery
			.read(None, self.token, IERC20Permit::noncesCall { owner })
			.await
	}

	/// Allowance `owner` has granted the Permit2 contract.
	pub async fn permit2_allowance(&self, owner: Address) -> Result<U256, DeliveryError> {
		self.delivery
			.read(
				None,
				self.token,
				IERC20Permit::allowanceCall {
					owner,
					spender: self.permit2,
				},
			)
			.await
	}

	pub async fn nonce_bitmap(&self, owner: Address, word_pos: U256) -> Result<U256, DeliveryError> {
		self.delivery
			.read(
				None,
				self.permit2,
				IPermit2::nonceBitmapCall {
					owner,
					wordPos: word_pos,
				},
			)
			.await
	}

	/// Grants Permit2 an unlimited allowance on the token.
	pub async fn approve_permit2(&self) -> Result<B256, DeliveryError> {
		self.delivery
			.deliver(
				self.token,
				IERC20Permit::approveCall {
					spender: self.permit2,
					amount: U256::MAX,
				},
			)
			.await
	}

	pub async fn permit_deposit(
		&self,
		amount: U256,
		deadline: U256,
		signature: SplitSignature,
	) -> Result<B256, DeliveryError> {
		self.delivery
			.deliver(
				self.bank,
				ITokenBank::permitDepositCall {
					amount,
					deadline,
					v: signature.v,
					r: signature.r,
					s: signature.s,
				},
			)
			.await
	}

	pub async fn deposit_with_permit2(
		&self,
		amount: U256,
		nonce: U256,
		deadline: U256,
		signature: Bytes,
	) -> Result<B256, DeliveryError> {
		self.delivery
			.deliver(
				self.bank,
				ITokenBank::depositWithPermit2Call {
					amount,
					nonce,
					deadline,
					signature,
				},
			)
			.await
	}

	pub async fn confirm(&self, tx_hash: &B256) -> Result<TransactionReceipt, DeliveryError> {
		self.delivery.confirm(tx_hash).await
	}
}
