//! Transaction delivery types.
//!
//! This module defines the transaction handed to the delivery layer and the
//! receipt it reports back once the transaction is mined.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// A contract call to be signed and submitted by the connected wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	/// Contract receiving the call.
	pub to: Address,
	/// ABI-encoded calldata.
	pub data: Bytes,
	/// Native value attached to the call.
	pub value: U256,
}

impl Transaction {
	/// Creates a zero-value contract call.
	pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
		Self {
			to,
			data: data.into(),
			value: U256::ZERO,
		}
	}
}

/// Transaction receipt containing execution details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: B256,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
}
