//! Fund Transfer Service - Custodial Withdrawals
//!
//! Moves held payment from the contest's custodial balance to a
//! recipient on authorized request. Local validation runs before any
//! ledger call, and a failed withdrawal is never retried automatically:
//! the first attempt may have partially succeeded, and a blind resubmit
//! risks double payment. The caller decides whether to resubmit.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::address::Address;
use crate::domain::amount::Amount;
use crate::error::ServiceError;
use crate::ports::ledger::{LedgerClient, TxSpec};

/// Receipt for a completed withdrawal.
#[derive(Debug, Clone)]
pub struct TransferReceipt {
  /// Withdrawal transaction reference.
  pub tx_ref: String,
  /// Amount moved.
  pub amount: Amount,
  /// Recipient account.
  pub recipient: Address,
}

/// Executes authorized withdrawals from the custodial balance.
pub struct FundTransferService<L: LedgerClient> {
  ledger: Arc<L>,
}

impl<L: LedgerClient> FundTransferService<L> {
  pub fn new(ledger: Arc<L>) -> Self {
    Self { ledger }
  }

  /// Withdraw `amount` to `recipient`, authorized by `authorizer`.
  ///
  /// Amount and address validation happen before any remote call;
  /// `InvalidAmount` / `InvalidAddress` therefore never cost a network
  /// round trip.
  #[instrument(skip(self), fields(recipient, authorizer))]
  pub async fn transfer(
    &self,
    amount: Amount,
    recipient: &str,
    authorizer: &str,
  ) -> Result<TransferReceipt, ServiceError> {
    if !amount.is_positive() {
      return Err(ServiceError::InvalidAmount(amount.value()));
    }
    let recipient: Address = recipient
      .parse()
      .map_err(|_| ServiceError::InvalidAddress(recipient.to_string()))?;
    let authorizer: Address = authorizer
      .parse()
      .map_err(|_| ServiceError::InvalidAddress(authorizer.to_string()))?;

    let tx = TxSpec::Withdraw {
      recipient: recipient.clone(),
      authorizer,
    };

    // Single submission, no retry loop.
    let receipt = self
      .ledger
      .submit(tx, amount)
      .await
      .map_err(|e| ServiceError::TransferFailed(e.to_string()))?;

    info!(
      tx_ref = %receipt.tx_ref,
      amount = %amount,
      recipient = %recipient,
      "Withdrawal submitted"
    );

    Ok(TransferReceipt {
      tx_ref: receipt.tx_ref,
      amount,
      recipient,
    })
  }
}
