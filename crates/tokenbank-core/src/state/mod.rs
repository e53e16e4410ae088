//! Session and display state of the deposit controller.

use alloy_primitives::Address;

/// A connected wallet on the configured chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
	/// Account that owns the tokens and signs permits.
	pub address: Address,
	pub chain_id: u64,
}

/// What a front-end renders: progress flags, the latest error or success
/// text, and the formatted balances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepositStatus {
	/// A deposit handler is running.
	pub loading: bool,
	/// The Permit2 approval transaction is in flight.
	pub is_approving: bool,
	/// A Permit2 approval was confirmed during this session.
	pub approve_success: bool,
	/// The EIP-2612 probe is running.
	pub is_checking_support: bool,
	/// Result of the last EIP-2612 probe, `None` before the first one.
	pub supports_eip2612: Option<bool>,
	pub error: Option<String>,
	pub success: Option<String>,
	/// Wallet token balance in whole-token units.
	pub token_balance: Option<String>,
	/// Balance held for the wallet by the bank, in whole-token units.
	pub bank_balance: Option<String>,
}

impl DepositStatus {
	/// Resets the messages at the start of a handler.
	pub(crate) fn begin(&mut self) {
		self.loading = true;
		self.error = None;
		self.success = None;
	}
}
