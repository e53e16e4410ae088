//! Command-line front-end for depositing into a TokenBank contract.
//!
//! The binary connects the configured wallet, then runs one action: show
//! balances, probe the token for EIP-2612 support, or deposit with a permit.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokenbank_account::{implementations::local::LocalAccount, AccountService};
use tokenbank_config::Config;
use tokenbank_core::{DepositController, DepositOutcome, EventBus};
use tokenbank_delivery::{
	implementations::evm::alloy::AlloyDelivery, ConfirmationSettings, DeliveryService,
};
use tokenbank_types::{truncate_id, DepositEvent};
use tokio::sync::broadcast::error::RecvError;

/// Command-line arguments for the depositor.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show the wallet's token balance and its balance in the bank
	Balance,
	/// Check whether the token supports EIP-2612 permits
	Probe,
	/// Deposit tokens into the bank
	Deposit {
		/// Amount in whole tokens, e.g. 1.5
		#[arg(short, long)]
		amount: String,

		/// Approval scheme to use
		#[arg(short, long, value_enum, default_value_t = Method::Auto)]
		method: Method,
	},
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Method {
	/// EIP-2612 when the token supports it, Permit2 otherwise
	Auto,
	Eip2612,
	Permit2,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt().with_env_filter(env_filter).with_target(true).init();

	let config = Config::from_file(&args.config.to_string_lossy()).await?;
	tracing::info!(
		chain_id = config.network.chain_id,
		bank = %config.contracts.bank,
		token = %config.contracts.token,
		"Loaded configuration"
	);

	let event_bus = EventBus::new(64);
	let event_task = tokio::spawn(log_events(event_bus.clone()));

	let mut controller = build_controller(&config, event_bus).await?;
	let session = controller.connect().await?;
	println!("Connected {} on chain {}", session.address, session.chain_id);

	let symbol = &config.token.symbol;
	let result = match args.command {
		Command::Balance => {
			controller.refresh_balances().await;
			print_balances(&controller, symbol);
			Ok(())
		},
		Command::Probe => {
			let supported = controller.status().supports_eip2612.unwrap_or(false);
			println!(
				"Token {} {} EIP-2612",
				controller.contracts().token(),
				if supported { "supports" } else { "does not support" }
			);
			Ok(())
		},
		Command::Deposit { amount, method } => deposit(&mut controller, &amount, method, symbol).await,
	};

	// The logger stops once the last sender is gone, after draining the queue
	drop(controller);
	event_task.await?;
	result
}

/// Builds the account, delivery and controller from configuration.
async fn build_controller(
	config: &Config,
	event_bus: EventBus,
) -> Result<DepositController, Box<dyn std::error::Error>> {
	let account = LocalAccount::new(&config.account.private_key)?;
	let account = AccountService::new(Box::new(account));

	let delivery = AlloyDelivery::new(
		&config.network.rpc_url,
		config.network.chain_id,
		&account.private_key(),
	)
	.await?;
	let settings = ConfirmationSettings {
		min_confirmations: config.delivery.min_confirmations,
		poll_interval: Duration::from_secs(config.delivery.poll_interval_seconds),
		timeout: Duration::from_secs(config.delivery.confirmation_timeout_seconds),
	};
	let delivery = DeliveryService::new(Box::new(delivery), settings);

	Ok(DepositController::new(
		config,
		Arc::new(account),
		Arc::new(delivery),
		event_bus,
	))
}

async fn deposit(
	controller: &mut DepositController,
	amount: &str,
	method: Method,
	symbol: &str,
) -> Result<(), Box<dyn std::error::Error>> {
	controller.set_amount(amount);
	if let Some(warning) = &controller.status().error {
		tracing::warn!("{}", warning);
	}

	let outcome: DepositOutcome = match method {
		Method::Auto => controller.deposit().await?,
		Method::Eip2612 => {
			if controller.status().supports_eip2612 != Some(true) {
				return Err("Token does not support EIP-2612, use --method permit2".into());
			}
			controller.deposit_with_eip2612().await?
		},
		Method::Permit2 => controller.deposit_with_permit2().await?,
	};

	if let Some(success) = &controller.status().success {
		println!("{} ({} via {})", success, outcome.receipt.hash, outcome.method);
	}
	print_balances(controller, symbol);
	Ok(())
}

fn print_balances(controller: &DepositController, symbol: &str) {
	let status = controller.status();
	if let Some(error) = &status.error {
		eprintln!("{}", error);
	}
	println!(
		"Token balance: {} {}",
		status.token_balance.as_deref().unwrap_or("-"),
		symbol
	);
	println!(
		"Bank balance:  {} {}",
		status.bank_balance.as_deref().unwrap_or("-"),
		symbol
	);
}

/// Logs deposit progress until the bus closes.
async fn log_events(event_bus: EventBus) {
	let mut receiver = event_bus.subscribe();
	drop(event_bus);

	loop {
		match receiver.recv().await {
			Ok(DepositEvent::TransactionPending { kind, tx_hash }) => {
				tracing::info!(?kind, tx_hash = %truncate_id(&tx_hash.to_string()), "Waiting for confirmation");
			},
			Ok(DepositEvent::TransactionConfirmed { kind, receipt }) => {
				tracing::info!(?kind, block = receipt.block_number, "Confirmed");
			},
			Ok(DepositEvent::PermitSigned {
				method,
				nonce,
				deadline,
			}) => {
				tracing::info!(%method, %nonce, %deadline, "Permit signed");
			},
			Ok(event) => tracing::debug!(?event, "Deposit event"),
			Err(RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Event logger lagged behind");
			},
			Err(RecvError::Closed) => break,
		}
	}
}
