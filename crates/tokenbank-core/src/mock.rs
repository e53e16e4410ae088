//! In-memory chain for exercising the deposit handlers.
//!
//! Calldata is decoded with the same `sol!` types the controller encodes
//! with, and the token, Permit2 and bank effects are applied to plain maps.
//! Deposits verify their permit signatures by recovery, so a wrong domain or
//! nonce shows up as a reverted transaction.

use alloy_primitives::{keccak256, Address, Bytes, Signature, B256, U256};
use alloy_sol_types::{SolInterface, SolValue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokenbank_delivery::{DeliveryError, DeliveryInterface};
use tokenbank_types::{
	current_timestamp, split_nonce, IERC20Permit::IERC20PermitCalls, IPermit2::IPermit2Calls,
	ITokenBank::ITokenBankCalls, PermitMessage, Transaction, TransactionReceipt,
};

pub(crate) struct ChainState {
	pub chain_id: u64,
	/// Account the wallet submits transactions from.
	pub sender: Address,
	pub bank: Address,
	pub token: Address,
	pub permit2: Address,
	pub token_name: String,
	pub supports_permit: bool,
	pub balances: HashMap<Address, U256>,
	pub allowances: HashMap<(Address, Address), U256>,
	pub token_nonces: HashMap<Address, U256>,
	pub bank_balances: HashMap<Address, U256>,
	pub bitmaps: HashMap<(Address, U256), U256>,
	pub fail_token_reads: bool,
	pub fail_bank_reads: bool,
	/// Makes `approve` transactions revert.
	pub fail_approvals: bool,
	pub block_number: u64,
	pub submitted: Vec<Transaction>,
	pub receipts: HashMap<B256, TransactionReceipt>,
}

impl ChainState {
	pub fn balance_of(&self, account: Address) -> U256 {
		self.balances.get(&account).copied().unwrap_or_default()
	}

	pub fn bank_balance_of(&self, account: Address) -> U256 {
		self.bank_balances.get(&account).copied().unwrap_or_default()
	}

	pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
		self.allowances
			.get(&(owner, spender))
			.copied()
			.unwrap_or_default()
	}

	pub fn bitmap(&self, owner: Address, word_pos: U256) -> U256 {
		self.bitmaps
			.get(&(owner, word_pos))
			.copied()
			.unwrap_or_default()
	}

	pub fn token_nonce(&self, owner: Address) -> U256 {
		self.token_nonces.get(&owner).copied().unwrap_or_default()
	}

	/// Number of submitted transactions whose calldata starts with `selector`.
	pub fn submitted_with_selector(&self, selector: [u8; 4]) -> usize {
		self.submitted
			.iter()
			.filter(|tx| tx.data.starts_with(&selector))
			.count()
	}

	fn read(&self, from: Option<Address>, to: Address, data: &[u8]) -> Result<Bytes, String> {
		let output = if to == self.token {
			match IERC20PermitCalls::abi_decode(data).map_err(|e| e.to_string())? {
				IERC20PermitCalls::name(_) => (self.token_name.clone(),).abi_encode_params(),
				IERC20PermitCalls::balanceOf(call) if !self.fail_token_reads => {
					self.balance_of(call.account).abi_encode()
				},
				IERC20PermitCalls::allowance(call) => {
					self.allowance(call.owner, call.spender).abi_encode()
				},
				IERC20PermitCalls::nonces(call) if self.supports_permit => {
					self.token_nonce(call.owner).abi_encode()
				},
				IERC20PermitCalls::DOMAIN_SEPARATOR(_) if self.supports_permit => {
					keccak256(self.token_name.as_bytes()).abi_encode()
				},
				_ => return Err("execution reverted".into()),
			}
		} else if to == self.permit2 {
			match IPermit2Calls::abi_decode(data).map_err(|e| e.to_string())? {
				IPermit2Calls::nonceBitmap(call) => self.bitmap(call.owner, call.wordPos).abi_encode(),
			}
		} else if to == self.bank {
			match ITokenBankCalls::abi_decode(data).map_err(|e| e.to_string())? {
				ITokenBankCalls::getBalance(_) if !self.fail_bank_reads => {
					self.bank_balance_of(from.unwrap_or_default()).abi_encode()
				},
				_ => return Err("execution reverted".into()),
			}
		} else {
			// Calls to accounts without code return nothing
			Vec::new()
		};
		Ok(output.into())
	}

	/// Applies a transaction, returning false when it would revert.
	fn execute(&mut self, tx: &Transaction) -> bool {
		let from = self.sender;
		if tx.to == self.token {
			match IERC20PermitCalls::abi_decode(&tx.data) {
				Ok(IERC20PermitCalls::approve(call)) if !self.fail_approvals => {
					self.allowances.insert((from, call.spender), call.amount);
					true
				},
				_ => false,
			}
		} else if tx.to == self.bank {
			match ITokenBankCalls::abi_decode(&tx.data) {
				Ok(ITokenBankCalls::permitDeposit(call)) => {
					if !self.supports_permit || call.deadline < U256::from(current_timestamp()) {
						return false;
					}
					let nonce = self.token_nonce(from);
					let message = PermitMessage::eip2612(
						self.token_name.clone(),
						self.chain_id,
						self.token,
						from,
						self.bank,
						call.amount,
						nonce,
						call.deadline,
					);
					let signature = Signature::new(
						U256::from_be_bytes(call.r.0),
						U256::from_be_bytes(call.s.0),
						call.v == 28,
					);
					if !signed_by(&signature, &message, from) {
						return false;
					}
					self.token_nonces.insert(from, nonce + U256::from(1u64));
					self.transfer_to_bank(from, call.amount)
				},
				Ok(ITokenBankCalls::depositWithPermit2(call)) => {
					if call.deadline < U256::from(current_timestamp())
						|| self.allowance(from, self.permit2) < call.amount
					{
						return false;
					}
					let (word_pos, bit) = split_nonce(call.nonce);
					let mut bitmap = self.bitmap(from, word_pos);
					if bitmap.bit(bit) {
						return false;
					}
					let message = PermitMessage::permit2(
						self.chain_id,
						self.permit2,
						self.token,
						call.amount,
						self.bank,
						call.nonce,
						call.deadline,
					);
					let Ok(signature) = Signature::from_raw(&call.signature) else {
						return false;
					};
					if !signed_by(&signature, &message, from) {
						return false;
					}
					bitmap.set_bit(bit, true);
					self.bitmaps.insert((from, word_pos), bitmap);
					self.transfer_to_bank(from, call.amount)
				},
				_ => false,
			}
		} else {
			false
		}
	}

	fn transfer_to_bank(&mut self, from: Address, amount: U256) -> bool {
		let balance = self.balance_of(from);
		if balance < amount {
			return false;
		}
		self.balances.insert(from, balance - amount);
		let held = self.bank_balance_of(from);
		self.bank_balances.insert(from, held + amount);
		true
	}
}

fn signed_by(signature: &Signature, message: &PermitMessage, owner: Address) -> bool {
	signature
		.recover_address_from_prehash(&message.signing_hash())
		.map(|signer| signer == owner)
		.unwrap_or(false)
}

/// Cloneable handle to the shared chain state.
#[derive(Clone)]
pub(crate) struct MockChain {
	pub state: Arc<Mutex<ChainState>>,
}

impl MockChain {
	pub fn new(chain_id: u64, sender: Address, bank: Address, token: Address, permit2: Address) -> Self {
		Self {
			state: Arc::new(Mutex::new(ChainState {
				chain_id,
				sender,
				bank,
				token,
				permit2,
				token_name: "Bank Token".to_string(),
				supports_permit: true,
				balances: HashMap::new(),
				allowances: HashMap::new(),
				token_nonces: HashMap::new(),
				bank_balances: HashMap::new(),
				bitmaps: HashMap::new(),
				fail_token_reads: false,
				fail_bank_reads: false,
				fail_approvals: false,
				block_number: 1,
				submitted: Vec::new(),
				receipts: HashMap::new(),
			})),
		}
	}

	pub fn with_state<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
		let mut state = self.state.lock().unwrap();
		f(&mut state)
	}
}

#[async_trait]
impl DeliveryInterface for MockChain {
	async fn chain_id(&self) -> Result<u64, DeliveryError> {
		Ok(self.state.lock().unwrap().chain_id)
	}

	async fn call(
		&self,
		from: Option<Address>,
		to: Address,
		data: Bytes,
	) -> Result<Bytes, DeliveryError> {
		self.state
			.lock()
			.unwrap()
			.read(from, to, &data)
			.map_err(DeliveryError::TransactionFailed)
	}

	async fn submit(&self, tx: Transaction) -> Result<B256, DeliveryError> {
		let mut state = self.state.lock().unwrap();
		let success = state.execute(&tx);
		state.block_number += 1;
		state.submitted.push(tx);

		let hash = keccak256((state.submitted.len() as u64).to_be_bytes());
		let receipt = TransactionReceipt {
			hash,
			block_number: state.block_number,
			success,
		};
		state.receipts.insert(hash, receipt);
		Ok(hash)
	}

	async fn get_receipt(&self, hash: &B256) -> Result<Option<TransactionReceipt>, DeliveryError> {
		Ok(self.state.lock().unwrap().receipts.get(hash).cloned())
	}

	async fn get_block_number(&self) -> Result<u64, DeliveryError> {
		Ok(self.state.lock().unwrap().block_number)
	}
}
