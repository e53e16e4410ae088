//! User-entered deposit amounts.
//!
//! Amounts are typed by the user as decimal strings ("1.5") and converted to
//! integer token units using the token's decimals before being placed into a
//! permit message.

use crate::utils::format_token_amount;
use alloy_primitives::{
	utils::{parse_units, ParseUnits},
	U256,
};
use thiserror::Error;

/// Decimals assumed for the deposit token when none are configured.
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

/// Errors that can occur while converting a decimal amount to token units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
	#[error("Amount is required")]
	Empty,
	#[error("Amount cannot be negative: {0}")]
	Negative(String),
	#[error("Amount must be greater than zero")]
	Zero,
	#[error("Amount {amount} has more than {decimals} decimal places")]
	TooPrecise { amount: String, decimals: u8 },
	#[error("Invalid amount '{amount}': {reason}")]
	Invalid { amount: String, reason: String },
}

/// A deposit amount as entered by the user together with its integer value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositIntent {
	/// The trimmed decimal string the user entered.
	pub amount: String,
	/// The amount in the token's smallest unit.
	pub units: U256,
	/// Decimals used for the conversion.
	pub decimals: u8,
}

impl DepositIntent {
	/// Parses a decimal amount into token units.
	///
	/// Fractional digits beyond `decimals` are rejected rather than truncated
	/// so the signed amount is always exactly what the user typed.
	pub fn parse(amount: &str, decimals: u8) -> Result<Self, AmountError> {
		let trimmed = amount.trim();
		if trimmed.is_empty() {
			return Err(AmountError::Empty);
		}
		if trimmed.starts_with('-') {
			return Err(AmountError::Negative(trimmed.to_string()));
		}
		// parse_units ignores `_`, so "1_5" would otherwise read as 15
		let well_formed = trimmed.chars().all(|c| c.is_ascii_digit() || c == '.')
			&& trimmed.matches('.').count() <= 1
			&& trimmed != ".";
		if !well_formed {
			return Err(AmountError::Invalid {
				amount: trimmed.to_string(),
				reason: "expected digits with an optional decimal point".to_string(),
			});
		}

		let fraction_digits = trimmed
			.split_once('.')
			.map(|(_, fraction)| fraction.len())
			.unwrap_or(0);
		if fraction_digits > decimals as usize {
			return Err(AmountError::TooPrecise {
				amount: trimmed.to_string(),
				decimals,
			});
		}

		let units = match parse_units(trimmed, decimals) {
			Ok(ParseUnits::U256(units)) => units,
			Ok(ParseUnits::I256(_)) => return Err(AmountError::Negative(trimmed.to_string())),
			Err(e) => {
				return Err(AmountError::Invalid {
					amount: trimmed.to_string(),
					reason: e.to_string(),
				})
			},
		};

		if units.is_zero() {
			return Err(AmountError::Zero);
		}

		Ok(Self {
			amount: trimmed.to_string(),
			units,
			decimals,
		})
	}

	/// Returns true when the amount is larger than the given raw balance.
	pub fn exceeds(&self, balance: U256) -> bool {
		self.units > balance
	}

	/// Formats the integer amount back into a decimal string.
	pub fn display(&self) -> String {
		format_token_amount(self.units, self.decimals)
	}
}
