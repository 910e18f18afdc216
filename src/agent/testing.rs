//! Scripted oracles for router tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::attestation::{AttestationProvider, SIMULATED_TOKEN, TokenRequest, TokenType};
use crate::chain::{Account, ChainClient, TransferTx, TxStatus, to_wei};
use crate::error::{AttestationError, ChainError, LlmError};
use crate::llm::{CompletionProvider, CompletionRequest, CompletionResponse};

/// Test key; its address is deterministic.
pub const TEST_PRIVATE_KEY: &str =
    "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

enum Scripted {
    Ok(String, Duration),
    Err(String),
}

/// Completion provider that replays queued replies and records requests.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn push_ok(&self, text: &str) {
        self.push_delayed(text, Duration::ZERO);
    }

    pub fn push_delayed(&self, text: &str, delay: Duration) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Scripted::Ok(text.to_string(), delay));
    }

    pub fn push_err(&self, reason: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Scripted::Err(reason.to_string()));
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn generate(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Ok(text, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(CompletionResponse::new(text))
            }
            Some(Scripted::Err(reason)) => Err(LlmError::RequestFailed {
                provider: "scripted".to_string(),
                reason,
            }),
            None => Err(LlmError::RequestFailed {
                provider: "scripted".to_string(),
                reason: "no scripted reply left".to_string(),
            }),
        }
    }
}

/// How `RecordingChain::wait_for_receipt` answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptScript {
    Mined(TxStatus),
    /// Poll budget exhausted without a receipt.
    Missing,
    /// Never returns.
    Stall,
}

/// Chain client that signs nothing and counts everything.
pub struct RecordingChain {
    account: Account,
    accounts_created: AtomicUsize,
    transfers: Mutex<Vec<TransferTx>>,
    submitted: Mutex<Vec<TransferTx>>,
    fail_builds: AtomicBool,
    fail_submissions: AtomicBool,
    receipt: Mutex<ReceiptScript>,
    balance: Mutex<Decimal>,
    balance_queries: Mutex<Vec<String>>,
}

impl RecordingChain {
    pub fn new() -> Self {
        Self {
            account: Account::from_private_key_hex(TEST_PRIVATE_KEY).unwrap(),
            accounts_created: AtomicUsize::new(0),
            transfers: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            fail_builds: AtomicBool::new(false),
            fail_submissions: AtomicBool::new(false),
            receipt: Mutex::new(ReceiptScript::Mined(TxStatus::Succeeded)),
            balance: Mutex::new(Decimal::ZERO),
            balance_queries: Mutex::new(Vec::new()),
        }
    }

    /// Address the next `create_account` call returns.
    pub fn next_address(&self) -> String {
        self.account.address().to_string()
    }

    /// Hash the next successful submission returns.
    pub fn next_tx_hash(&self) -> String {
        tx_hash(self.submitted.lock().unwrap().len() + 1)
    }

    pub fn accounts_created(&self) -> usize {
        self.accounts_created.load(Ordering::SeqCst)
    }

    pub fn transfers_built(&self) -> Vec<TransferTx> {
        self.transfers.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<TransferTx> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn fail_builds(&self, fail: bool) {
        self.fail_builds.store(fail, Ordering::SeqCst);
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    pub fn script_receipt(&self, receipt: ReceiptScript) {
        *self.receipt.lock().unwrap() = receipt;
    }

    pub fn set_balance(&self, balance: Decimal) {
        *self.balance.lock().unwrap() = balance;
    }

    pub fn balance_queries(&self) -> Vec<String> {
        self.balance_queries.lock().unwrap().clone()
    }
}

fn tx_hash(n: usize) -> String {
    format!("0x{:064x}", n)
}

#[async_trait]
impl ChainClient for RecordingChain {
    fn native_symbol(&self) -> &str {
        "C2FLR"
    }

    fn explorer_tx_url(&self, tx_hash: &str) -> String {
        crate::chain::explorer_tx_url("https://explorer.test", tx_hash)
    }

    async fn create_account(&self) -> Result<Account, ChainError> {
        self.accounts_created.fetch_add(1, Ordering::SeqCst);
        Ok(self.account.clone())
    }

    async fn build_transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<TransferTx, ChainError> {
        if self.fail_builds.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc {
                code: -32000,
                message: "insufficient funds".to_string(),
            });
        }
        let tx = TransferTx {
            from: from.to_string(),
            to: to.to_string(),
            value_wei: to_wei(amount)?,
            nonce: 0,
            chain_id: 114,
            gas: crate::chain::TRANSFER_GAS,
            max_fee_per_gas: 25_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        };
        self.transfers.lock().unwrap().push(tx.clone());
        Ok(tx)
    }

    async fn sign_and_submit(
        &self,
        tx: &TransferTx,
        account: &Account,
    ) -> Result<String, ChainError> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc {
                code: -32000,
                message: "nonce too low".to_string(),
            });
        }
        assert_eq!(tx.from, account.address());
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(tx.clone());
        Ok(tx_hash(submitted.len()))
    }

    async fn balance(&self, address: &str) -> Result<Decimal, ChainError> {
        self.balance_queries.lock().unwrap().push(address.to_string());
        Ok(*self.balance.lock().unwrap())
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxStatus, ChainError> {
        let script = *self.receipt.lock().unwrap();
        match script {
            ReceiptScript::Mined(status) => Ok(status),
            ReceiptScript::Missing => Err(ChainError::ReceiptTimeout {
                tx_hash: tx_hash.to_string(),
                attempts: 2,
            }),
            ReceiptScript::Stall => std::future::pending().await,
        }
    }
}

/// Attestation provider that echoes nonces into tokens.
pub struct RecordingAttestation {
    nonces: Mutex<Vec<String>>,
    fail: AtomicBool,
    simulate: AtomicBool,
}

impl RecordingAttestation {
    pub fn new() -> Self {
        Self {
            nonces: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            simulate: AtomicBool::new(false),
        }
    }

    pub fn nonces(&self) -> Vec<String> {
        self.nonces.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn simulate(&self, simulate: bool) {
        self.simulate.store(simulate, Ordering::SeqCst);
    }
}

#[async_trait]
impl AttestationProvider for RecordingAttestation {
    fn audience(&self) -> &str {
        "https://sts.google.com"
    }

    fn token_type(&self) -> TokenType {
        TokenType::Oidc
    }

    async fn request_token(&self, request: &TokenRequest) -> Result<String, AttestationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AttestationError::UnexpectedStatus {
                status: 500,
                reason: "Internal Server Error".to_string(),
            });
        }
        if self.simulate.load(Ordering::SeqCst) {
            return Ok(SIMULATED_TOKEN.to_string());
        }
        let nonce = request.nonces()[0].clone();
        self.nonces.lock().unwrap().push(nonce.clone());
        Ok(format!("token-for-{nonce}"))
    }
}
