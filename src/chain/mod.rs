//! Chain oracle.
//!
//! Accounts, native-token transfers and submission on an EVM chain (Flare by
//! default). The router depends on [`ChainClient`] only; [`FlareClient`] is
//! the JSON-RPC implementation.

mod flare;
mod rlp;
pub mod wallet;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

pub use self::flare::FlareClient;
pub use self::wallet::{Account, SignedTransaction};

use crate::error::ChainError;

/// Gas limit of a plain value transfer.
pub const TRANSFER_GAS: u64 = 21_000;

/// Decimals of the native token.
pub const NATIVE_DECIMALS: u32 = 18;

/// An unsigned EIP-1559 native-token transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTx {
    pub from: String,
    pub to: String,
    pub value_wei: u128,
    pub nonce: u64,
    pub chain_id: u64,
    pub gas: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl TransferTx {
    /// Transfer value in whole tokens.
    pub fn amount(&self) -> Decimal {
        from_wei(self.value_wei).unwrap_or(Decimal::MAX)
    }
}

/// Outcome recorded in a transaction receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Succeeded,
    Reverted,
}

/// Account creation, transfer construction and submission.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Symbol of the native token, used in previews.
    fn native_symbol(&self) -> &str;

    /// Explorer link for a transaction hash.
    fn explorer_tx_url(&self, tx_hash: &str) -> String;

    async fn create_account(&self) -> Result<Account, ChainError>;

    async fn build_transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<TransferTx, ChainError>;

    /// Native-token balance of `address`, in whole tokens.
    async fn balance(&self, address: &str) -> Result<Decimal, ChainError>;

    /// Sign and broadcast. Returns the `0x` tx hash once the node has
    /// accepted the transaction.
    async fn sign_and_submit(&self, tx: &TransferTx, account: &Account)
    -> Result<String, ChainError>;

    /// Poll for the receipt of a broadcast transaction.
    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxStatus, ChainError>;
}

/// Convert a token amount to wei, truncating below 1 wei.
pub fn to_wei(amount: Decimal) -> Result<u128, ChainError> {
    if amount <= Decimal::ZERO {
        return Err(ChainError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )));
    }
    let scale = Decimal::from(10u64.pow(NATIVE_DECIMALS));
    let wei = amount
        .checked_mul(scale)
        .ok_or_else(|| ChainError::InvalidAmount(format!("amount {amount} is too large")))?
        .trunc()
        .to_u128()
        .ok_or_else(|| ChainError::InvalidAmount(format!("amount {amount} is out of range")))?;
    if wei == 0 {
        return Err(ChainError::InvalidAmount(format!(
            "amount {amount} is below 1 wei"
        )));
    }
    Ok(wei)
}

/// Convert wei to a normalized token amount.
pub fn from_wei(wei: u128) -> Result<Decimal, ChainError> {
    let value = i128::try_from(wei)
        .map_err(|_| ChainError::InvalidAmount(format!("{wei} wei is out of range")))?;
    Decimal::try_from_i128_with_scale(value, NATIVE_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|e| ChainError::InvalidAmount(e.to_string()))
}

/// Join an explorer base URL and a transaction hash.
pub fn explorer_tx_url(explorer_url: &str, tx_hash: &str) -> String {
    format!("{}/tx/{}", explorer_url.trim_end_matches('/'), tx_hash)
}
