//! Contract interfaces used by the depositor.
//!
//! Only the functions the deposit flows touch are declared. Calls are encoded
//! and decoded through the generated `*Call` types so the delivery layer can
//! stay ABI-agnostic.

use alloy_primitives::{address, Address};
use alloy_sol_types::sol;

/// Canonical Uniswap Permit2 deployment, identical on every EVM chain.
pub const CANONICAL_PERMIT2_ADDRESS: Address =
	address!("0x000000000022D473030F116dDEE9F6B43aC78BA3");

sol! {
	/// ERC-20 token with the EIP-2612 permit extension.
	///
	/// `nonces` and `DOMAIN_SEPARATOR` are only present on permit-capable
	/// tokens; calling them on a plain ERC-20 reverts.
	interface IERC20Permit {
		function name() external view returns (string memory);
		function balanceOf(address account) external view returns (uint256);
		function allowance(address owner, address spender) external view returns (uint256);
		function approve(address spender, uint256 amount) external returns (bool);
		function nonces(address owner) external view returns (uint256);
		function DOMAIN_SEPARATOR() external view returns (bytes32);
	}

	/// Permit2 signature-transfer nonce registry.
	interface IPermit2 {
		function nonceBitmap(address owner, uint256 wordPos) external view returns (uint256);
	}

	/// Custodial bank accepting permit-based deposits.
	interface ITokenBank {
		function getBalance() external view returns (uint256);
		function permitDeposit(uint256 amount, uint256 deadline, uint8 v, bytes32 r, bytes32 s) external;
		function depositWithPermit2(uint256 amount, uint256 nonce, uint256 deadline, bytes calldata signature) external;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_sol_types::SolCall;

	#[test]
	fn test_selectors_match_solidity() {
		assert_eq!(IERC20Permit::balanceOfCall::SELECTOR, [0x70, 0xa0, 0x82, 0x31]);
		assert_eq!(IERC20Permit::allowanceCall::SELECTOR, [0xdd, 0x62, 0xed, 0x3e]);
		assert_eq!(IERC20Permit::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
		assert_eq!(
			IERC20Permit::DOMAIN_SEPARATORCall::SIGNATURE,
			"DOMAIN_SEPARATOR()"
		);
		assert_eq!(
			ITokenBank::permitDepositCall::SIGNATURE,
			"permitDeposit(uint256,uint256,uint8,bytes32,bytes32)"
		);
		assert_eq!(
			ITokenBank::depositWithPermit2Call::SIGNATURE,
			"depositWithPermit2(uint256,uint256,uint256,bytes)"
		);
		assert_eq!(
			IPermit2::nonceBitmapCall::SIGNATURE,
			"nonceBitmap(address,uint256)"
		);
	}
}
