//! Common types module for the TokenBank depositor.
//!
//! This module defines the data types shared by every component of the
//! depositor: the contract ABIs, the two permit message shapes, the Permit2
//! nonce bitmap, user-entered deposit amounts, and the events published while
//! a deposit is in progress.

/// Token amount parsing and display.
pub mod amount;
/// Static ABIs for the token, Permit2 and TokenBank contracts.
pub mod contracts;
/// Transaction and receipt types for blockchain interactions.
pub mod delivery;
/// Progress events published by the deposit flows.
pub mod events;
/// Permit2 nonce bitmap handling.
pub mod nonce;
/// EIP-2612 and Permit2 typed-data messages.
pub mod permit;
/// Redacting wrapper for private keys.
pub mod secret_string;
/// Utility functions for formatting and timestamps.
pub mod utils;

pub use alloy_primitives::{Address, Bytes, Signature, B256, U256};
pub use amount::{AmountError, DepositIntent, DEFAULT_TOKEN_DECIMALS};
pub use contracts::{IERC20Permit, IPermit2, ITokenBank, CANONICAL_PERMIT2_ADDRESS};
pub use delivery::{Transaction, TransactionReceipt};
pub use events::{DepositEvent, DepositMethod, TransactionKind};
pub use nonce::{find_next_nonce, split_nonce, NonceBitmap, NonceError, BITS_PER_WORD};
pub use permit::{Permit, PermitMessage, PermitTransferFrom, SplitSignature, TokenPermissions};
pub use secret_string::SecretString;
pub use utils::{current_timestamp, format_token_amount, truncate_id, with_0x_prefix};
