//! Deposit controller for the TokenBank depositor.
//!
//! [`DepositController`] holds what a wallet front-end displays (session,
//! entered amount, balances, progress flags and messages) and exposes the
//! handlers a user triggers: connecting, probing the token for EIP-2612,
//! refreshing balances and the three deposit actions.
//!
//! Every deposit handler follows the same lifecycle. It sets `loading`,
//! clears the previous error and success text, runs its flow to
//! confirmation, refreshes balances and records either the success text or
//! the error message. Handlers borrow the controller mutably, so a second
//! deposit cannot start while one is running.

use alloy_primitives::U256;
use std::sync::Arc;
use thiserror::Error;
use tokenbank_account::{AccountError, AccountService};
use tokenbank_config::Config;
use tokenbank_delivery::{DeliveryError, DeliveryService};
use tokenbank_types::{
	current_timestamp, format_token_amount, AmountError, DepositEvent, DepositIntent,
	DepositMethod, NonceError, TransactionReceipt,
};
use tracing::instrument;

pub mod engine;
mod handlers;
pub mod state;

#[cfg(test)]
mod mock;

pub use engine::{contracts::TokenBankContracts, event_bus::EventBus};
pub use state::{DepositStatus, Session};

const PERMIT2_SUCCESS: &str = "Deposit with Permit2 successful!";
const EIP2612_SUCCESS: &str = "Deposit with EIP2612 successful!";
const DEPOSIT_SUCCESS: &str = "Deposit successful!";
const TOKEN_BALANCE_ERROR: &str = "Failed to fetch token balance";
const BANK_BALANCE_ERROR: &str = "Failed to fetch balance";
const AMOUNT_EXCEEDS_BALANCE: &str = "Amount exceeds balance";

/// Errors that can occur while running a deposit handler.
#[derive(Debug, Error)]
pub enum DepositError {
	#[error("Wallet not connected")]
	NotConnected,
	#[error("Wallet is on chain {actual}, expected chain {expected}")]
	ChainMismatch { expected: u64, actual: u64 },
	#[error(transparent)]
	Amount(#[from] AmountError),
	#[error(transparent)]
	Nonce(#[from] NonceError),
	#[error(transparent)]
	Account(#[from] AccountError),
	#[error(transparent)]
	Delivery(#[from] DeliveryError),
}

/// Result of a successful deposit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositOutcome {
	pub method: DepositMethod,
	pub receipt: TransactionReceipt,
}

/// Front-end state and handlers for depositing into the bank.
pub struct DepositController {
	account: Arc<AccountService>,
	delivery: Arc<DeliveryService>,
	contracts: TokenBankContracts,
	event_bus: EventBus,
	chain_id: u64,
	decimals: u8,
	deadline_seconds: u64,
	max_nonce_words: u32,
	session: Option<Session>,
	amount: String,
	/// Raw token balance behind `status.token_balance`.
	token_balance: Option<U256>,
	status: DepositStatus,
}

impl DepositController {
	pub fn new(
		config: &Config,
		account: Arc<AccountService>,
		delivery: Arc<DeliveryService>,
		event_bus: EventBus,
	) -> Self {
		let contracts = TokenBankContracts::new(delivery.clone(), &config.contracts);
		Self {
			account,
			delivery,
			contracts,
			event_bus,
			chain_id: config.network.chain_id,
			decimals: config.token.decimals,
			deadline_seconds: config.deposit.deadline_seconds,
			max_nonce_words: config.deposit.max_nonce_words,
			session: None,
			amount: String::new(),
			token_balance: None,
			status: DepositStatus::default(),
		}
	}

	pub fn status(&self) -> &DepositStatus {
		&self.status
	}

	pub fn session(&self) -> Option<Session> {
		self.session
	}

	pub fn amount(&self) -> &str {
		&self.amount
	}

	pub fn contracts(&self) -> &TokenBankContracts {
		&self.contracts
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Connects the wallet, then probes the token and reads its balance.
	///
	/// Fails when the node serves a different chain than the configured one.
	#[instrument(skip_all)]
	pub async fn connect(&mut self) -> Result<Session, DepositError> {
		let actual = self.delivery.chain_id().await?;
		if actual != self.chain_id {
			return Err(DepositError::ChainMismatch {
				expected: self.chain_id,
				actual,
			});
		}

		let session = Session {
			address: self.account.address(),
			chain_id: actual,
		};
		self.session = Some(session);
		tracing::info!(address = %session.address, chain_id = actual, "Wallet connected");

		self.check_eip2612_support().await;
		self.fetch_token_balance().await;
		Ok(session)
	}

	/// Drops the session and everything displayed for it.
	pub fn disconnect(&mut self) {
		if let Some(session) = self.session.take() {
			tracing::info!(address = %session.address, "Wallet disconnected");
		}
		self.token_balance = None;
		self.status = DepositStatus::default();
	}

	/// Records the entered amount and flags it when it exceeds the displayed
	/// token balance.
	pub fn set_amount(&mut self, amount: &str) {
		self.amount = amount.to_string();

		let exceeds = match (DepositIntent::parse(amount, self.decimals), self.token_balance) {
			(Ok(intent), Some(balance)) => intent.exceeds(balance),
			_ => false,
		};
		self.status.error = exceeds.then(|| AMOUNT_EXCEEDS_BALANCE.to_string());
	}

	/// Probes the token for `DOMAIN_SEPARATOR()` and records the result.
	#[instrument(skip_all, fields(token = %self.contracts.token()))]
	pub async fn check_eip2612_support(&mut self) -> bool {
		self.status.is_checking_support = true;
		let supported = self.contracts.supports_eip2612().await;
		self.status.supports_eip2612 = Some(supported);
		self.status.is_checking_support = false;

		tracing::info!(supports_eip2612 = supported, "Checked EIP-2612 support");
		self.event_bus
			.publish(DepositEvent::SupportChecked {
				supports_eip2612: supported,
			})
			.ok();
		supported
	}

	/// Reads the wallet's token balance. Errors are shown, not returned.
	pub async fn fetch_token_balance(&mut self) {
		let Some(session) = self.session else {
			return;
		};
		let result = self.contracts.token_balance(session.address).await;
		self.apply_token_balance(result);
	}

	/// Reads the wallet's balance held by the bank. Errors are shown, not
	/// returned.
	pub async fn fetch_bank_balance(&mut self) {
		let Some(session) = self.session else {
			return;
		};
		let result = self.contracts.bank_balance(session.address).await;
		self.apply_bank_balance(result);
	}

	/// Reads both balances concurrently.
	pub async fn refresh_balances(&mut self) {
		let Some(session) = self.session else {
			return;
		};
		let (token, bank) = tokio::join!(
			self.contracts.token_balance(session.address),
			self.contracts.bank_balance(session.address)
		);
		self.apply_token_balance(token);
		self.apply_bank_balance(bank);

		self.event_bus
			.publish(DepositEvent::BalancesRefreshed {
				token_balance: self.status.token_balance.clone(),
				bank_balance: self.status.bank_balance.clone(),
			})
			.ok();
	}

	/// Deposits through whichever path the token supports.
	#[instrument(skip_all, fields(amount = %self.amount))]
	pub async fn deposit(&mut self) -> Result<DepositOutcome, DepositError> {
		self.status.begin();
		let result = self.auto_deposit().await;
		self.finish(result, DEPOSIT_SUCCESS).await
	}

	/// Deposits with an EIP-2612 permit.
	#[instrument(skip_all, fields(amount = %self.amount))]
	pub async fn deposit_with_eip2612(&mut self) -> Result<DepositOutcome, DepositError> {
		self.status.begin();
		let result = self.run_checked(DepositMethod::Eip2612).await;
		self.finish(result, EIP2612_SUCCESS).await
	}

	/// Deposits with a Permit2 signature transfer, approving Permit2 first if
	/// needed.
	#[instrument(skip_all, fields(amount = %self.amount))]
	pub async fn deposit_with_permit2(&mut self) -> Result<DepositOutcome, DepositError> {
		self.status.begin();
		let result = self.run_checked(DepositMethod::Permit2).await;
		self.finish(result, PERMIT2_SUCCESS).await
	}

	async fn auto_deposit(&mut self) -> Result<DepositOutcome, DepositError> {
		let (session, intent) = self.prepare()?;

		let method = if self.check_eip2612_support().await {
			DepositMethod::Eip2612
		} else {
			DepositMethod::Permit2
		};
		tracing::info!(%method, "Selected deposit method");
		self.run(method, session, intent).await
	}

	async fn run_checked(&mut self, method: DepositMethod) -> Result<DepositOutcome, DepositError> {
		let (session, intent) = self.prepare()?;
		self.run(method, session, intent).await
	}

	/// Checks the session and parses the entered amount.
	fn prepare(&self) -> Result<(Session, DepositIntent), DepositError> {
		let session = self.require_session()?;
		let intent = DepositIntent::parse(&self.amount, self.decimals)?;
		Ok((session, intent))
	}

	async fn run(
		&mut self,
		method: DepositMethod,
		session: Session,
		intent: DepositIntent,
	) -> Result<DepositOutcome, DepositError> {
		let deadline = U256::from(current_timestamp() + self.deadline_seconds);

		let ctx = handlers::DepositContext {
			contracts: &self.contracts,
			account: self.account.as_ref(),
			event_bus: &self.event_bus,
			chain_id: session.chain_id,
			owner: session.address,
			amount: intent.units,
			deadline,
		};

		let receipt = match method {
			DepositMethod::Eip2612 => handlers::eip2612::deposit(&ctx).await?,
			DepositMethod::Permit2 => {
				handlers::permit2::deposit(&ctx, &mut self.status, self.max_nonce_words).await?
			},
		};
		Ok(DepositOutcome { method, receipt })
	}

	/// Records the outcome of a handler and clears the progress flags.
	async fn finish(
		&mut self,
		result: Result<DepositOutcome, DepositError>,
		success_text: &str,
	) -> Result<DepositOutcome, DepositError> {
		match &result {
			Ok(outcome) => {
				tracing::info!(
					method = %outcome.method,
					tx_hash = %outcome.receipt.hash,
					"Deposit confirmed"
				);
				self.refresh_balances().await;
				self.status.success = Some(success_text.to_string());
			},
			Err(e) => {
				tracing::error!(error = %e, "Deposit failed");
				self.status.error = Some(e.to_string());
				self.event_bus
					.publish(DepositEvent::DepositFailed {
						error: e.to_string(),
					})
					.ok();
			},
		}
		self.status.is_approving = false;
		self.status.loading = false;
		result
	}

	fn require_session(&self) -> Result<Session, DepositError> {
		self.session.ok_or(DepositError::NotConnected)
	}

	fn apply_token_balance(&mut self, result: Result<U256, DeliveryError>) {
		match result {
			Ok(balance) => {
				tracing::debug!(%balance, "Fetched token balance");
				self.token_balance = Some(balance);
				self.status.token_balance = Some(format_token_amount(balance, self.decimals));
			},
			Err(e) => {
				tracing::warn!(error = %e, "Error fetching token balance");
				self.status.error = Some(TOKEN_BALANCE_ERROR.to_string());
			},
		}
	}

	fn apply_bank_balance(&mut self, result: Result<U256, DeliveryError>) {
		match result {
			Ok(balance) => {
				tracing::debug!(%balance, "Fetched bank balance");
				self.status.bank_balance = Some(format_token_amount(balance, self.decimals));
			},
			Err(e) => {
				tracing::warn!(error = %e, "Error fetching bank balance");
				self.status.error = Some(BANK_BALANCE_ERROR.to_string());
			},
		}
	}
}
