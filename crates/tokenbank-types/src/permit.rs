//! EIP-712 permit messages for the two deposit paths.
//!
//! ## EIP-2612
//!
//! ```text
//! EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)
//! Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)
//! ```
//!
//! The domain name is the token's `name()`, the version is `"1"` and the
//! verifying contract is the token itself.
//!
//! ## Permit2
//!
//! ```text
//! EIP712Domain(string name,uint256 chainId,address verifyingContract)
//! PermitTransferFrom(TokenPermissions permitted,address spender,uint256 nonce,uint256 deadline)
//! TokenPermissions(address token,uint256 amount)
//! ```
//!
//! The Permit2 domain carries no version.

use alloy_primitives::{Address, Signature, B256, U256};
use alloy_sol_types::{sol, Eip712Domain, SolStruct};
use std::borrow::Cow;

/// Domain name of the Permit2 contract.
pub const PERMIT2_DOMAIN_NAME: &str = "Permit2";
/// Domain version used by EIP-2612 tokens.
pub const EIP2612_DOMAIN_VERSION: &str = "1";

sol! {
	/// EIP-2612 approval signed by the token owner.
	#[derive(Debug, PartialEq, Eq)]
	struct Permit {
		address owner;
		address spender;
		uint256 value;
		uint256 nonce;
		uint256 deadline;
	}

	/// Token and maximum amount a Permit2 signature allows to be moved.
	#[derive(Debug, PartialEq, Eq)]
	struct TokenPermissions {
		address token;
		uint256 amount;
	}

	/// Permit2 `ISignatureTransfer` single-token permit.
	#[derive(Debug, PartialEq, Eq)]
	struct PermitTransferFrom {
		TokenPermissions permitted;
		address spender;
		uint256 nonce;
		uint256 deadline;
	}
}

/// A permit ready to be signed, paired with the domain it is signed under.
#[derive(Debug, Clone)]
pub enum PermitMessage {
	Eip2612 {
		domain: Eip712Domain,
		permit: Permit,
	},
	Permit2 {
		domain: Eip712Domain,
		permit: PermitTransferFrom,
	},
}

impl PermitMessage {
	/// Builds an EIP-2612 `Permit` for `token`.
	#[allow(clippy::too_many_arguments)]
	pub fn eip2612(
		token_name: String,
		chain_id: u64,
		token: Address,
		owner: Address,
		spender: Address,
		value: U256,
		nonce: U256,
		deadline: U256,
	) -> Self {
		let domain = Eip712Domain::new(
			Some(Cow::Owned(token_name)),
			Some(Cow::Borrowed(EIP2612_DOMAIN_VERSION)),
			Some(U256::from(chain_id)),
			Some(token),
			None,
		);
		PermitMessage::Eip2612 {
			domain,
			permit: Permit {
				owner,
				spender,
				value,
				nonce,
				deadline,
			},
		}
	}

	/// Builds a Permit2 `PermitTransferFrom` moving `amount` of `token`.
	pub fn permit2(
		chain_id: u64,
		permit2: Address,
		token: Address,
		amount: U256,
		spender: Address,
		nonce: U256,
		deadline: U256,
	) -> Self {
		let domain = Eip712Domain::new(
			Some(Cow::Borrowed(PERMIT2_DOMAIN_NAME)),
			None,
			Some(U256::from(chain_id)),
			Some(permit2),
			None,
		);
		PermitMessage::Permit2 {
			domain,
			permit: PermitTransferFrom {
				permitted: TokenPermissions { token, amount },
				spender,
				nonce,
				deadline,
			},
		}
	}

	/// The EIP-712 digest the wallet signs.
	pub fn signing_hash(&self) -> B256 {
		match self {
			PermitMessage::Eip2612 { domain, permit } => permit.eip712_signing_hash(domain),
			PermitMessage::Permit2 { domain, permit } => permit.eip712_signing_hash(domain),
		}
	}

	pub fn primary_type(&self) -> &'static str {
		match self {
			PermitMessage::Eip2612 { .. } => "Permit",
			PermitMessage::Permit2 { .. } => "PermitTransferFrom",
		}
	}

	pub fn domain(&self) -> &Eip712Domain {
		match self {
			PermitMessage::Eip2612 { domain, .. } | PermitMessage::Permit2 { domain, .. } => domain,
		}
	}

	pub fn nonce(&self) -> U256 {
		match self {
			PermitMessage::Eip2612 { permit, .. } => permit.nonce,
			PermitMessage::Permit2 { permit, .. } => permit.nonce,
		}
	}

	pub fn deadline(&self) -> U256 {
		match self {
			PermitMessage::Eip2612 { permit, .. } => permit.deadline,
			PermitMessage::Permit2 { permit, .. } => permit.deadline,
		}
	}

	/// The amount the permit authorizes.
	pub fn amount(&self) -> U256 {
		match self {
			PermitMessage::Eip2612 { permit, .. } => permit.value,
			PermitMessage::Permit2 { permit, .. } => permit.permitted.amount,
		}
	}
}

/// A 65-byte ECDSA signature split into the `(v, r, s)` arguments
/// `permitDeposit` expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSignature {
	/// Recovery id in the legacy 27/28 form.
	pub v: u8,
	pub r: B256,
	pub s: B256,
}

impl From<&Signature> for SplitSignature {
	fn from(signature: &Signature) -> Self {
		Self {
			v: 27 + signature.v() as u8,
			r: B256::new(signature.r().to_be_bytes::<32>()),
			s: B256::new(signature.s().to_be_bytes::<32>()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, keccak256};
	use alloy_sol_types::SolValue;

	const TOKEN: Address = address!("0xe4Cec63058807C50C95CEF99b0Ab5A9831610386");
	const BANK: Address = address!("0xdB3eF3cB3079C93A276A2B4B69087b8801727f64");
	const OWNER: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
	const PERMIT2: Address = address!("0x000000000022D473030F116dDEE9F6B43aC78BA3");

	#[test]
	fn test_type_strings() {
		assert_eq!(
			Permit::eip712_encode_type(),
			"Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)"
		);
		assert_eq!(
			PermitTransferFrom::eip712_encode_type(),
			"PermitTransferFrom(TokenPermissions permitted,address spender,uint256 nonce,uint256 deadline)TokenPermissions(address token,uint256 amount)"
		);
	}

	#[test]
	fn test_permit2_domain_has_no_version() {
		let message = PermitMessage::permit2(
			421614,
			PERMIT2,
			TOKEN,
			U256::from(1u64),
			BANK,
			U256::ZERO,
			U256::from(1_700_000_000u64),
		);

		let expected = keccak256(
			(
				keccak256("EIP712Domain(string name,uint256 chainId,address verifyingContract)"),
				keccak256("Permit2"),
				U256::from(421614u64),
				PERMIT2,
			)
				.abi_encode(),
		);
		assert_eq!(message.domain().hash_struct(), expected);
		assert_eq!(message.primary_type(), "PermitTransferFrom");
	}

	#[test]
	fn test_eip2612_domain_includes_name_and_version() {
		let message = PermitMessage::eip2612(
			"Bank Token".to_string(),
			421614,
			TOKEN,
			OWNER,
			BANK,
			U256::from(5u64),
			U256::from(3u64),
			U256::from(1_700_000_000u64),
		);

		let expected = keccak256(
			(
				keccak256(
					"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
				),
				keccak256("Bank Token"),
				keccak256("1"),
				U256::from(421614u64),
				TOKEN,
			)
				.abi_encode(),
		);
		assert_eq!(message.domain().hash_struct(), expected);
		assert_eq!(message.nonce(), U256::from(3u64));
		assert_eq!(message.amount(), U256::from(5u64));
	}

	#[test]
	fn test_permit2_signing_hash_matches_manual_encoding() {
		let amount = U256::from(1_500_000_000_000_000_000u128);
		let nonce = U256::from(257u64);
		let deadline = U256::from(1_700_003_600u64);
		let message = PermitMessage::permit2(1, PERMIT2, TOKEN, amount, BANK, nonce, deadline);

		let token_permissions_hash = keccak256(
			(
				keccak256("TokenPermissions(address token,uint256 amount)"),
				TOKEN,
				amount,
			)
				.abi_encode(),
		);
		let struct_hash = keccak256(
			(
				keccak256("PermitTransferFrom(TokenPermissions permitted,address spender,uint256 nonce,uint256 deadline)TokenPermissions(address token,uint256 amount)"),
				token_permissions_hash,
				BANK,
				nonce,
				deadline,
			)
				.abi_encode(),
		);
		let mut preimage = vec![0x19, 0x01];
		preimage.extend_from_slice(message.domain().hash_struct().as_slice());
		preimage.extend_from_slice(struct_hash.as_slice());

		assert_eq!(message.signing_hash(), keccak256(preimage));
	}

	#[test]
	fn test_split_signature_uses_legacy_v() {
		let even = Signature::new(U256::from(1u64), U256::from(2u64), false);
		let odd = Signature::new(U256::from(1u64), U256::from(2u64), true);

		let split = SplitSignature::from(&even);
		assert_eq!(split.v, 27);
		assert_eq!(split.r, B256::with_last_byte(1));
		assert_eq!(split.s, B256::with_last_byte(2));
		assert_eq!(SplitSignature::from(&odd).v, 28);
	}
}
