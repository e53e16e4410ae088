//! The two deposit paths.
//!
//! Both handlers run strictly in sequence: read on-chain state, sign a permit,
//! submit the deposit and wait for it to confirm. Status bookkeeping and error
//! reporting stay with the controller.

pub mod eip2612;
pub mod permit2;

use crate::engine::{contracts::TokenBankContracts, event_bus::EventBus};
use crate::DepositError;
use alloy_primitives::{Address, B256, U256};
use tokenbank_account::AccountService;
use tokenbank_types::{DepositEvent, TransactionKind, TransactionReceipt};

/// Everything a deposit handler needs for one run.
pub(crate) struct DepositContext<'a> {
	pub contracts: &'a TokenBankContracts,
	pub account: &'a AccountService,
	pub event_bus: &'a EventBus,
	pub chain_id: u64,
	pub owner: Address,
	/// Units of the token to deposit.
	pub amount: U256,
	/// Permit expiry as a UNIX timestamp.
	pub deadline: U256,
}

impl DepositContext<'_> {
	/// Publishes the pending transaction, waits for it and publishes the
	/// confirmation.
	pub(crate) async fn confirm(
		&self,
		kind: TransactionKind,
		tx_hash: B256,
	) -> Result<TransactionReceipt, DepositError> {
		self.event_bus
			.publish(DepositEvent::TransactionPending { kind, tx_hash })
			.ok();

		let receipt = self.contracts.confirm(&tx_hash).await?;

		self.event_bus
			.publish(DepositEvent::TransactionConfirmed {
				kind,
				receipt: receipt.clone(),
			})
			.ok();
		Ok(receipt)
	}
}
