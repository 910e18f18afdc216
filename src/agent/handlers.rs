//! Intent handlers and transaction confirmation.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::agent::router::Router;
use crate::agent::session::{ConversationSession, PendingTransaction};
use crate::chain::{Account, TxStatus};
use crate::error::{ChainError, Error};
use crate::llm::CompletionRequest;
use crate::prompts::templates;

/// Destination and amount pulled out of a send request.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SendParams {
    pub to_address: String,
    pub amount: Decimal,
}

/// Parse the oracle's extraction. Exactly `to_address` and a non-zero
/// `amount` are accepted; anything else means the request was incomplete.
pub(crate) fn parse_send_params(text: &str) -> Option<SendParams> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    let object = value.as_object()?;
    if object.len() != 2 {
        return None;
    }
    let to_address = object.get("to_address")?.as_str()?.trim();
    let amount = object.get("amount")?.as_f64()?;
    if to_address.is_empty() || amount == 0.0 {
        return None;
    }
    let amount = Decimal::try_from(amount).ok()?;
    Some(SendParams {
        to_address: to_address.to_string(),
        amount,
    })
}

impl Router {
    /// Return the session account, creating it on first use.
    async fn ensure_account(&self, session: &mut ConversationSession) -> Result<Account, Error> {
        if let Some(account) = session.account() {
            return Ok(account.clone());
        }
        let account = self
            .chain_call("create_account", self.chain.create_account())
            .await?;
        tracing::info!(session_id = %session.id(), address = %account.address(), "created account");
        session.set_account(account.clone());
        Ok(account)
    }

    pub(super) async fn handle_generate_account(
        &self,
        session: &mut ConversationSession,
    ) -> Result<String, Error> {
        if let Some(account) = session.account() {
            return Ok(format!("Account exists - {}", account.address()));
        }

        let account = self.ensure_account(session).await?;
        let address = account.address();
        let prompt = self.prompts.format("generate_account", &[("address", address)])?;

        match self.generate(CompletionRequest::from(prompt)).await {
            Ok(response) if response.text.contains(address) => Ok(response.text),
            Ok(response) => Ok(format!("{}\n\n{}", response.text.trim_end(), address)),
            Err(e) => {
                tracing::warn!(error = %e, "account reply generation failed");
                Ok(format!("Account created - {}", address))
            }
        }
    }

    pub(super) async fn handle_send_token(
        &self,
        session: &mut ConversationSession,
        message: &str,
    ) -> Result<String, Error> {
        let account = self.ensure_account(session).await?;

        let prompt = self.prompts.format("token_send", &[("user_input", message)])?;
        let response = self.generate(CompletionRequest::from(prompt)).await?;

        let Some(params) = parse_send_params(&response.text) else {
            tracing::debug!(extraction = %response.text, "incomplete send request");
            return Ok(templates::FOLLOW_UP_TOKEN_SEND.to_string());
        };

        let transaction = self
            .chain_call(
                "build_transfer",
                self.chain
                    .build_transfer(account.address(), &params.to_address, params.amount),
            )
            .await?;

        let preview = format!(
            "Transaction Preview: Sending {} {} to {}\n\
             To confirm, resend your original message exactly as you sent it.",
            transaction.amount(),
            self.chain.native_symbol(),
            transaction.to
        );
        session.set_pending_tx(PendingTransaction {
            triggering_message: message.to_string(),
            transaction,
        });
        Ok(preview)
    }

    pub(super) fn handle_swap_token(&self, message: &str) -> String {
        tracing::debug!(message, "swap requested");
        templates::SWAP_NOT_SUPPORTED.to_string()
    }

    pub(super) async fn handle_conversation(&self, message: &str) -> Result<String, Error> {
        let prompt = self.prompts.format("conversational", &[("user_input", message)])?;
        let response = self.generate(CompletionRequest::from(prompt)).await?;
        Ok(response.text)
    }

    /// Sign and submit the pending transaction.
    ///
    /// A rejected submission leaves it pending so the same message can
    /// confirm it again. Once the node accepts the broadcast the transaction
    /// is gone from the session, whether or not a receipt shows up in time.
    pub(super) async fn confirm_pending_tx(
        &self,
        session: &mut ConversationSession,
    ) -> Result<String, Error> {
        let pending = session
            .take_pending_tx()
            .ok_or(ChainError::NoPendingTransaction)?;
        let Some(account) = session.account().cloned() else {
            session.set_pending_tx(pending);
            return Err(ChainError::NoAccount.into());
        };

        let submitted = self
            .chain_call(
                "sign_and_submit",
                self.chain.sign_and_submit(&pending.transaction, &account),
            )
            .await;
        let tx_hash = match submitted {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                session.set_pending_tx(pending);
                return Err(e.into());
            }
        };
        tracing::info!(session_id = %session.id(), %tx_hash, "transaction submitted");

        let tx_url = self.chain.explorer_tx_url(&tx_hash);
        let fallback = format!(
            "Transaction sent: {}\n[See transaction on Explorer]({})",
            tx_hash, tx_url
        );

        let receipt = self
            .chain_call("wait_for_receipt", self.chain.wait_for_receipt(&tx_hash))
            .await;
        match receipt {
            Ok(TxStatus::Succeeded) => {}
            Ok(TxStatus::Reverted) => {
                return Ok(format!("{}\n{}", fallback, templates::TX_REVERTED));
            }
            Err(e) => {
                tracing::warn!(%tx_hash, error = %e, "no receipt for broadcast transaction");
                return Ok(format!("{}\n{}", fallback, templates::TX_RECEIPT_PENDING));
            }
        }

        let prompt = match self.prompts.format("tx_confirmation", &[("tx_url", tx_url.as_str())]) {
            Ok(prompt) => prompt,
            Err(e) => {
                tracing::warn!(error = %e, "confirmation prompt unavailable");
                return Ok(fallback);
            }
        };
        match self.generate(CompletionRequest::from(prompt)).await {
            Ok(response) if response.text.contains(&tx_hash) => Ok(response.text),
            Ok(_) => Ok(fallback),
            Err(e) => {
                tracing::warn!(error = %e, "confirmation reply generation failed");
                Ok(fallback)
            }
        }
    }

    /// Balance of the session account. Never creates an account.
    pub(super) async fn handle_balance(
        &self,
        session: &ConversationSession,
    ) -> Result<String, Error> {
        let Some(account) = session.account() else {
            return Ok(templates::NO_ACCOUNT_FOR_BALANCE.to_string());
        };
        let balance = self
            .chain_call("balance", self.chain.balance(account.address()))
            .await?;
        Ok(format!(
            "Balance of {}: {} {}",
            account.address(),
            balance.normalize(),
            self.chain.native_symbol()
        ))
    }
}
