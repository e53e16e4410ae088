//! Deposit through a Permit2 signature transfer.

use super::DepositContext;
use crate::state::DepositStatus;
use crate::DepositError;
use alloy_primitives::U256;
use tokenbank_types::{
	DepositEvent, DepositMethod, NonceBitmap, NonceError, PermitMessage, TransactionKind,
	TransactionReceipt,
};
use tracing::instrument;

/// Approves Permit2 if needed, signs a `PermitTransferFrom` for the bank and
/// calls `depositWithPermit2`.
#[instrument(skip_all, fields(owner = %ctx.owner, amount = %ctx.amount))]
pub(crate) async fn deposit(
	ctx: &DepositContext<'_>,
	status: &mut DepositStatus,
	max_nonce_words: u32,
) -> Result<TransactionReceipt, DepositError> {
	ensure_permit2_approval(ctx, status).await?;

	let nonce = select_nonce(ctx, max_nonce_words).await?;
	let message = PermitMessage::permit2(
		ctx.chain_id,
		ctx.contracts.permit2(),
		ctx.contracts.token(),
		ctx.amount,
		ctx.contracts.bank(),
		nonce,
		ctx.deadline,
	);
	let signature = ctx.account.sign_permit(&message).await?;
	ctx.event_bus
		.publish(DepositEvent::PermitSigned {
			method: DepositMethod::Permit2,
			nonce: message.nonce(),
			deadline: message.deadline(),
		})
		.ok();

	let tx_hash = ctx
		.contracts
		.deposit_with_permit2(
			ctx.amount,
			nonce,
			ctx.deadline,
			signature.as_bytes().to_vec().into(),
		)
		.await?;

	ctx.confirm(TransactionKind::Deposit(DepositMethod::Permit2), tx_hash)
		.await
}

/// Raises the owner's allowance to Permit2 to the maximum when it is below
/// the deposit amount, and waits for the approval to confirm.
async fn ensure_permit2_approval(
	ctx: &DepositContext<'_>,
	status: &mut DepositStatus,
) -> Result<(), DepositError> {
	let allowance = ctx.contracts.permit2_allowance(ctx.owner).await?;
	if allowance >= ctx.amount {
		tracing::debug!(%allowance, "Permit2 allowance sufficient");
		return Ok(());
	}

	tracing::info!(%allowance, permit2 = %ctx.contracts.permit2(), "Approving Permit2");
	status.is_approving = true;
	let tx_hash = ctx.contracts.approve_permit2().await?;
	ctx.confirm(TransactionKind::Permit2Approval, tx_hash).await?;
	status.approve_success = true;
	status.is_approving = false;
	Ok(())
}

/// Picks the lowest unused nonce, scanning bitmap words from 0 upwards.
async fn select_nonce(ctx: &DepositContext<'_>, max_nonce_words: u32) -> Result<U256, DepositError> {
	for word in 0..max_nonce_words {
		let word_pos = U256::from(word);
		let bitmap = ctx.contracts.nonce_bitmap(ctx.owner, word_pos).await?;
		match NonceBitmap::new(word_pos, bitmap).next_unused() {
			Ok(nonce) => {
				tracing::debug!(%nonce, word, "Selected Permit2 nonce");
				return Ok(nonce);
			},
			Err(e) => tracing::debug!("{}, trying next word", e),
		}
	}

	Err(NonceError::Exhausted {
		words: max_nonce_words,
	}
	.into())
}
