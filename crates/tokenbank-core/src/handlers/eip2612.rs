//! Deposit through the token's own `permit` (EIP-2612).

use super::DepositContext;
use crate::DepositError;
use tokenbank_types::{
	DepositEvent, DepositMethod, PermitMessage, SplitSignature, TransactionKind, TransactionReceipt,
};
use tracing::instrument;

/// Signs a `Permit` for the bank and calls `permitDeposit`.
///
/// The permit nonce is the token's `nonces(owner)` and the domain name is read
/// from the token, so the digest matches what the token verifies on-chain.
#[instrument(skip_all, fields(owner = %ctx.owner, amount = %ctx.amount))]
pub(crate) async fn deposit(ctx: &DepositContext<'_>) -> Result<TransactionReceipt, DepositError> {
	let nonce = ctx.contracts.token_nonce(ctx.owner).await?;
	let token_name = ctx.contracts.token_name().await?;
	tracing::debug!(%nonce, token_name = %token_name, "Read permit nonce");

	let message = PermitMessage::eip2612(
		token_name,
		ctx.chain_id,
		ctx.contracts.token(),
		ctx.owner,
		ctx.contracts.bank(),
		ctx.amount,
		nonce,
		ctx.deadline,
	);
	let signature = ctx.account.sign_permit(&message).await?;
	ctx.event_bus
		.publish(DepositEvent::PermitSigned {
			method: DepositMethod::Eip2612,
			nonce: message.nonce(),
			deadline: message.deadline(),
		})
		.ok();

	let tx_hash = ctx
		.contracts
		.permit_deposit(ctx.amount, ctx.deadline, SplitSignature::from(&signature))
		.await?;

	ctx.confirm(TransactionKind::Deposit(DepositMethod::Eip2612), tx_hash)
		.await
}
