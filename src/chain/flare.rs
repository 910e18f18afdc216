//! Flare JSON-RPC client.

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::chain::wallet::{self, Account};
use crate::chain::{ChainClient, TRANSFER_GAS, TransferTx, TxStatus};
use crate::config::ChainConfig;
use crate::error::ChainError;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct TransactionReceipt {
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
    status: Option<String>,
}

/// Chain client speaking Ethereum JSON-RPC to a Flare node.
pub struct FlareClient {
    client: Client,
    rpc_url: String,
    explorer_url: String,
    native_symbol: String,
    receipt_poll_attempts: u32,
    receipt_poll_interval: Duration,
    next_id: AtomicU64,
}

impl FlareClient {
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            client: Client::new(),
            rpc_url: config.rpc_url.clone(),
            explorer_url: config.explorer_url.clone(),
            native_symbol: config.native_symbol.clone(),
            receipt_poll_attempts: config.receipt_poll_attempts,
            receipt_poll_interval: config.receipt_poll_interval,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Issue one JSON-RPC call. `Ok(None)` means the node answered `null`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>, ChainError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: JsonRpcResponse<T> =
            response
                .json()
                .await
                .map_err(|e| ChainError::MalformedResponse {
                    method: method.to_string(),
                    reason: e.to_string(),
                })?;

        if let Some(error) = body.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(body.result)
    }

    async fn call_required<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ChainError> {
        self.call(method, params)
            .await?
            .ok_or_else(|| ChainError::MalformedResponse {
                method: method.to_string(),
                reason: "missing result".to_string(),
            })
    }

    async fn quantity(&self, method: &str, params: serde_json::Value) -> Result<u128, ChainError> {
        let raw: String = self.call_required(method, params).await?;
        parse_quantity(method, &raw)
    }

    pub async fn chain_id(&self) -> Result<u64, ChainError> {
        let id = self.quantity("eth_chainId", json!([])).await?;
        u64::try_from(id).map_err(|_| ChainError::MalformedResponse {
            method: "eth_chainId".to_string(),
            reason: format!("chain id {id} out of range"),
        })
    }

    async fn poll_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt, ChainError> {
        for attempt in 1..=self.receipt_poll_attempts {
            let receipt: Option<TransactionReceipt> = self
                .call("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            if let Some(receipt) = receipt {
                return Ok(receipt);
            }
            tracing::debug!(tx_hash, attempt, "receipt not yet available");
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
        Err(ChainError::ReceiptTimeout {
            tx_hash: tx_hash.to_string(),
            attempts: self.receipt_poll_attempts,
        })
    }
}

/// Parse a `0x`-prefixed hex quantity.
fn parse_quantity(method: &str, raw: &str) -> Result<u128, ChainError> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::MalformedResponse {
            method: method.to_string(),
            reason: format!("quantity '{raw}' lacks 0x prefix"),
        })?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| ChainError::MalformedResponse {
        method: method.to_string(),
        reason: format!("invalid quantity '{raw}': {e}"),
    })
}

#[async_trait]
impl ChainClient for FlareClient {
    fn native_symbol(&self) -> &str {
        &self.native_symbol
    }

    fn explorer_tx_url(&self, tx_hash: &str) -> String {
        crate::chain::explorer_tx_url(&self.explorer_url, tx_hash)
    }

    async fn create_account(&self) -> Result<Account, ChainError> {
        let account = Account::generate();
        tracing::info!(address = %account.address(), "generated account");
        Ok(account)
    }

    async fn build_transfer(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> Result<TransferTx, ChainError> {
        wallet::parse_address(from)?;
        let to = wallet::to_checksum_address(&wallet::parse_address(to)?);
        let value_wei = crate::chain::to_wei(amount)?;

        let nonce = self
            .quantity("eth_getTransactionCount", json!([from, "pending"]))
            .await?;
        let gas_price = self.quantity("eth_gasPrice", json!([])).await?;
        let priority_fee = self
            .quantity("eth_maxPriorityFeePerGas", json!([]))
            .await?;
        let chain_id = self.chain_id().await?;

        let tx = TransferTx {
            from: from.to_string(),
            to,
            value_wei,
            nonce: u64::try_from(nonce).map_err(|_| ChainError::MalformedResponse {
                method: "eth_getTransactionCount".to_string(),
                reason: format!("nonce {nonce} out of range"),
            })?,
            chain_id,
            gas: TRANSFER_GAS,
            max_fee_per_gas: gas_price,
            // A tip above the fee cap is rejected by the node.
            max_priority_fee_per_gas: priority_fee.min(gas_price),
        };
        tracing::debug!(?tx, "built transfer");
        Ok(tx)
    }

    async fn balance(&self, address: &str) -> Result<Decimal, ChainError> {
        wallet::parse_address(address)?;
        let wei = self
            .quantity("eth_getBalance", json!([address, "latest"]))
            .await?;
        crate::chain::from_wei(wei)
    }

    async fn sign_and_submit(
        &self,
        tx: &TransferTx,
        account: &Account,
    ) -> Result<String, ChainError> {
        let signed = wallet::sign_transfer(tx, account)?;
        let submitted: String = self
            .call_required("eth_sendRawTransaction", json!([signed.raw_hex()]))
            .await?;
        if !submitted.eq_ignore_ascii_case(&signed.tx_hash) {
            tracing::warn!(
                local = %signed.tx_hash,
                node = %submitted,
                "node returned a different transaction hash"
            );
        }
        tracing::info!(tx_hash = %submitted, nonce = tx.nonce, "transaction broadcast");
        Ok(submitted)
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<TxStatus, ChainError> {
        let receipt = self.poll_receipt(tx_hash).await?;
        let status = if receipt.status.as_deref() == Some("0x0") {
            tracing::warn!(tx_hash = %receipt.transaction_hash, "transaction reverted");
            TxStatus::Reverted
        } else {
            TxStatus::Succeeded
        };
        tracing::info!(
            tx_hash = %receipt.transaction_hash,
            block = receipt.block_number.as_deref().unwrap_or("unknown"),
            ?status,
            "transaction mined"
        );
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const FROM: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";
    const TO: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn client(server: &MockServer) -> FlareClient {
        FlareClient::new(&ChainConfig {
            rpc_url: server.uri(),
            explorer_url: "https://coston2-explorer.flare.network/".to_string(),
            native_symbol: "C2FLR".to_string(),
            receipt_poll_attempts: 3,
            receipt_poll_interval: Duration::from_millis(1),
        })
    }

    async fn mock_result(server: &MockServer, rpc_method: &str, result: serde_json::Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": result
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn parses_quantities() {
        assert_eq!(parse_quantity("m", "0x0").unwrap(), 0);
        assert_eq!(parse_quantity("m", "0x72").unwrap(), 114);
        assert!(parse_quantity("m", "72").is_err());
        assert!(parse_quantity("m", "0xzz").is_err());
    }

    #[tokio::test]
    async fn builds_eip1559_transfer() {
        let server = MockServer::start().await;
        mock_result(&server, "eth_getTransactionCount", json!("0x7")).await;
        mock_result(&server, "eth_gasPrice", json!("0x5d21dba00")).await;
        mock_result(&server, "eth_maxPriorityFeePerGas", json!("0x3b9aca00")).await;
        mock_result(&server, "eth_chainId", json!("0x72")).await;

        let tx = client(&server)
            .build_transfer(FROM, &TO.to_lowercase(), dec!(1.5))
            .await
            .unwrap();
        assert_eq!(
            tx,
            TransferTx {
                from: FROM.to_string(),
                to: TO.to_string(),
                value_wei: 1_500_000_000_000_000_000,
                nonce: 7,
                chain_id: 114,
                gas: 21_000,
                max_fee_per_gas: 25_000_000_000,
                max_priority_fee_per_gas: 1_000_000_000,
            }
        );
        assert_eq!(tx.amount(), dec!(1.5));
    }

    #[tokio::test]
    async fn rejects_bad_recipient_before_any_call() {
        let server = MockServer::start().await;
        let err = client(&server)
            .build_transfer(FROM, "not-an-address", dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidAddress(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rpc_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32000, "message": "insufficient funds for gas * price + value" }
            })))
            .mount(&server)
            .await;

        match client(&server).chain_id().await.unwrap_err() {
            ChainError::Rpc { code, message } => {
                assert_eq!(code, -32000);
                assert!(message.contains("insufficient funds"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn submits_and_waits_for_receipt() {
        let server = MockServer::start().await;
        let account = Account::from_private_key_hex(
            "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
        )
        .unwrap();
        let tx = TransferTx {
            from: account.address().to_string(),
            to: TO.to_string(),
            value_wei: 1,
            nonce: 0,
            chain_id: 114,
            gas: 21_000,
            max_fee_per_gas: 25_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        };
        let expected_hash = wallet::sign_transfer(&tx, &account).unwrap().tx_hash;

        mock_result(&server, "eth_sendRawTransaction", json!(expected_hash)).await;
        mock_result(
            &server,
            "eth_getTransactionReceipt",
            json!({
                "transactionHash": expected_hash,
                "blockNumber": "0x10",
                "status": "0x1"
            }),
        )
        .await;

        let client = client(&server);
        let hash = client.sign_and_submit(&tx, &account).await.unwrap();
        assert_eq!(hash, expected_hash);
        assert_eq!(client.wait_for_receipt(&hash).await.unwrap(), TxStatus::Succeeded);
    }

    #[tokio::test]
    async fn reverted_receipt_is_reported() {
        let server = MockServer::start().await;
        mock_result(
            &server,
            "eth_getTransactionReceipt",
            json!({ "transactionHash": "0xbeef", "blockNumber": "0x11", "status": "0x0" }),
        )
        .await;

        let status = client(&server).wait_for_receipt("0xbeef").await.unwrap();
        assert_eq!(status, TxStatus::Reverted);
    }

    #[tokio::test]
    async fn broadcast_returns_before_any_receipt_exists() {
        let server = MockServer::start().await;
        mock_result(&server, "eth_sendRawTransaction", json!("0xfeed")).await;
        mock_result(&server, "eth_getTransactionReceipt", serde_json::Value::Null).await;

        let account = Account::generate();
        let tx = TransferTx {
            from: account.address().to_string(),
            to: TO.to_string(),
            value_wei: 1,
            nonce: 0,
            chain_id: 114,
            gas: 21_000,
            max_fee_per_gas: 1,
            max_priority_fee_per_gas: 1,
        };

        let client = client(&server);
        assert_eq!(client.sign_and_submit(&tx, &account).await.unwrap(), "0xfeed");

        match client.wait_for_receipt("0xfeed").await.unwrap_err() {
            ChainError::ReceiptTimeout { tx_hash, attempts } => {
                assert_eq!(tx_hash, "0xfeed");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other}"),
        }

        let methods: Vec<String> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                body["method"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(
            methods.iter().filter(|m| *m == "eth_sendRawTransaction").count(),
            1
        );
        assert_eq!(
            methods.iter().filter(|m| *m == "eth_getTransactionReceipt").count(),
            3
        );
    }

    #[tokio::test]
    async fn balance_reads_latest_block_in_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "eth_getBalance",
                "params": [FROM, "latest"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": "0x14d1120d7b160000"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let balance = client(&server).balance(FROM).await.unwrap();
        assert_eq!(balance, dec!(1.5));
    }

    #[tokio::test]
    async fn balance_rejects_bad_address_before_any_call() {
        let server = MockServer::start().await;
        let err = client(&server).balance("0x1234").await.unwrap_err();
        assert!(matches!(err, ChainError::InvalidAddress(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn explorer_link_uses_configured_base() {
        let server = MockServer::start().await;
        assert_eq!(
            client(&server).explorer_tx_url("0xabc"),
            "https://coston2-explorer.flare.network/tx/0xabc"
        );
    }
}
