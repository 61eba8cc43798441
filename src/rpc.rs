//! JSON-RPC clients for the chain daemon and the wallet daemon.
//!
//! Both endpoints speak JSON-RPC 2.0 over HTTP. Requests carry a bounded
//! timeout; a timed-out submission is a submission error and must never be
//! followed by a store mutation.
//!
//! The wallet side is a capability trait with one adapter per daemon family,
//! selected at configuration time. The settlement executor only ever sees
//! `submit_transfer(batch, overrides) -> tx_hash`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

use crate::batch::TransferBatch;
use crate::chain_state::AssetOverrides;
use crate::config::{DaemonConfig, DaemonFamily, PaymentsConfig, WalletConfig};

/// JSON-RPC request ID counter
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("missing result in RPC response")]
    MissingResult,

    #[error("missing transaction hash in wallet response")]
    MissingTxHash,
}

impl From<reqwest::Error> for RpcError {
    fn from(e: reqwest::Error) -> Self {
        RpcError::Transport(e.to_string())
    }
}

/// JSON-RPC 2.0 request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcErrorBody>,
}

/// JSON-RPC error body
#[derive(Debug, Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

/// One JSON-RPC HTTP endpoint.
#[derive(Debug, Clone)]
struct JsonRpcClient {
    client: reqwest::Client,
    url: String,
}

impl JsonRpcClient {
    fn new(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: REQUEST_ID.fetch_add(1, Ordering::SeqCst),
        };

        let response = self.client.post(&self.url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(RpcError::Http(response.status().to_string()));
        }

        let response: JsonRpcResponse<T> = response.json().await?;

        if let Some(error) = response.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        response.result.ok_or(RpcError::MissingResult)
    }
}

/// Source of the current chain height.
#[async_trait]
pub trait HeightSource: Send + Sync {
    async fn current_height(&self) -> Result<u64, RpcError>;
}

/// Chain daemon client.
pub struct DaemonClient {
    rpc: JsonRpcClient,
}

impl DaemonClient {
    pub fn from_config(config: &DaemonConfig) -> Result<Self, RpcError> {
        Ok(Self {
            rpc: JsonRpcClient::new(&config.url, Duration::from_secs(config.timeout_secs))?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BlockCountResult {
    count: u64,
}

#[async_trait]
impl HeightSource for DaemonClient {
    /// `getblockcount` reports the block count, which is the canonical
    /// height plus one.
    async fn current_height(&self) -> Result<u64, RpcError> {
        let result: BlockCountResult = self.rpc.call("getblockcount", json!([])).await?;
        Ok(result.count.saturating_sub(1))
    }
}

/// Wallet capability consumed by the settlement executor.
#[async_trait]
pub trait WalletRpc: Send + Sync {
    /// Submit one transfer batch; a non-error response yields the
    /// transaction hash.
    async fn submit_transfer(
        &self,
        batch: &TransferBatch,
        overrides: Option<&AssetOverrides>,
    ) -> Result<String, RpcError>;
}

/// HTTP wallet client with per-family request shaping.
pub struct HttpWalletClient {
    rpc: JsonRpcClient,
    family: DaemonFamily,
    priority: u32,
    unlock_time: u64,
    use_mixin_field: bool,
}

impl HttpWalletClient {
    pub fn from_config(wallet: &WalletConfig, payments: &PaymentsConfig) -> Result<Self, RpcError> {
        Ok(Self {
            rpc: JsonRpcClient::new(&wallet.url, Duration::from_secs(wallet.timeout_secs))?,
            family: wallet.family,
            priority: payments.priority,
            unlock_time: payments.unlock_time,
            use_mixin_field: payments.use_mixin_field,
        })
    }

    fn build_default_request(
        &self,
        batch: &TransferBatch,
        overrides: Option<&AssetOverrides>,
    ) -> Value {
        let destinations: Vec<Value> = batch
            .destinations
            .iter()
            .map(|d| {
                let mut dest = json!({
                    "address": d.address,
                    "amount": d.amount,
                });
                if let Some(o) = overrides {
                    dest["asset_type"] = json!(o.asset);
                }
                dest
            })
            .collect();

        let mut params = json!({
            "destinations": destinations,
            "fee": batch.fee,
            "priority": self.priority,
            "unlock_time": self.unlock_time,
        });
        if self.use_mixin_field {
            params["mixin"] = json!(batch.ring_size);
        } else {
            params["ring_size"] = json!(batch.ring_size);
        }
        if let Some(id) = &batch.payment_id {
            params["payment_id"] = json!(id);
        }
        if let Some(o) = overrides {
            params["source_asset"] = json!(o.asset);
            params["dest_asset"] = json!(o.asset);
            params["tx_type"] = json!(o.tx_type);
        }
        params
    }

    fn build_bytecoin_request(&self, batch: &TransferBatch) -> Value {
        let transfers: Vec<Value> = batch
            .destinations
            .iter()
            .map(|d| json!({ "address": d.address, "amount": d.amount }))
            .collect();

        let mut params = json!({
            "transfers": transfers,
            "fee": batch.fee,
            "anonymity": batch.ring_size,
            "unlockTime": self.unlock_time,
        });
        if let Some(id) = &batch.payment_id {
            params["paymentId"] = json!(id);
        }
        params
    }
}

#[derive(Debug, Deserialize)]
struct TransferResult {
    #[serde(default)]
    tx_hash: Option<String>,

    #[serde(default, rename = "transactionHash")]
    transaction_hash: Option<String>,
}

/// Strip delimiter characters some wallets wrap around the hash.
fn sanitize_tx_hash(hash: &str) -> String {
    hash.replace(['<', '>'], "")
}

#[async_trait]
impl WalletRpc for HttpWalletClient {
    async fn submit_transfer(
        &self,
        batch: &TransferBatch,
        overrides: Option<&AssetOverrides>,
    ) -> Result<String, RpcError> {
        let (method, params) = match self.family {
            DaemonFamily::Default => ("transfer", self.build_default_request(batch, overrides)),
            DaemonFamily::Bytecoin => ("sendTransaction", self.build_bytecoin_request(batch)),
        };

        let result: TransferResult = self.rpc.call(method, params).await?;

        let hash = match self.family {
            DaemonFamily::Default => result.tx_hash,
            DaemonFamily::Bytecoin => result.transaction_hash,
        };

        hash.map(|h| sanitize_tx_hash(&h))
            .ok_or(RpcError::MissingTxHash)
    }
}
