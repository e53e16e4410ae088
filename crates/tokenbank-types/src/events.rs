//! Events published while a deposit is in progress.
//!
//! The controller publishes these on its event bus so a front-end can render
//! progress (approving, signing, waiting for confirmation) without polling
//! the controller's status.

use crate::TransactionReceipt;
use alloy_primitives::{B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which approval scheme a deposit uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepositMethod {
	/// Token-native `permit` (EIP-2612) followed by `permitDeposit`.
	Eip2612,
	/// Permit2 signature transfer followed by `depositWithPermit2`.
	Permit2,
}

impl fmt::Display for DepositMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DepositMethod::Eip2612 => write!(f, "EIP2612"),
			DepositMethod::Permit2 => write!(f, "Permit2"),
		}
	}
}

/// Kinds of transactions the depositor submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
	/// Unlimited ERC-20 approval granting Permit2 access to the token.
	Permit2Approval,
	/// The bank deposit itself.
	Deposit(DepositMethod),
}

/// Progress notifications emitted by the deposit controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepositEvent {
	/// The EIP-2612 capability probe finished.
	SupportChecked { supports_eip2612: bool },
	/// A transaction was handed to the wallet and is pending.
	TransactionPending { kind: TransactionKind, tx_hash: B256 },
	/// A transaction was mined with the required confirmations.
	TransactionConfirmed {
		kind: TransactionKind,
		receipt: TransactionReceipt,
	},
	/// A permit message was signed by the wallet.
	PermitSigned {
		method: DepositMethod,
		nonce: U256,
		deadline: U256,
	},
	/// A deposit handler failed; `error` is the message shown to the user.
	DepositFailed { error: String },
	/// Displayed balances were re-read.
	BalancesRefreshed {
		token_balance: Option<String>,
		bank_balance: Option<String>,
	},
}
