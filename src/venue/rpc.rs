//! JSON-RPC ledger client.
//!
//! Reads the account balance from an EVM-style node (`eth_getBalance`)
//! and delegates order execution to a signer/relay endpoint exposing a
//! single JSON-RPC method. Signing and broadcast happen behind the relay.
//!
//! Auth: `Authorization: Bearer {credential}` on execution calls.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::LedgerClient;
use crate::types::{AgentError, ExecutionOrder, ExecutionReceipt};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Native token decimals (wei → whole units).
const NATIVE_DECIMALS: u32 = 18;

const HTTP_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`RpcLedgerClient`].
#[derive(Debug, Clone)]
pub struct RpcSettings {
    pub rpc_url: String,
    pub address: String,
    /// JSON-RPC method the relay exposes for order execution.
    pub execute_method: String,
}

// ---------------------------------------------------------------------------
// JSON-RPC envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct RpcLedgerClient {
    http: Client,
    settings: RpcSettings,
    credential: SecretString,
}

impl RpcLedgerClient {
    /// Create a new client. Fails when the address or credential is missing,
    /// so the agent never runs with an execution path that cannot sign.
    pub fn new(settings: RpcSettings, credential: Option<SecretString>) -> Result<Self, AgentError> {
        if settings.address.trim().is_empty() {
            return Err(AgentError::Credentials("ledger address not configured".into()));
        }
        let credential = credential
            .filter(|c| !c.expose_secret().trim().is_empty())
            .ok_or_else(|| AgentError::Credentials("execution credential not set".into()))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent("HELM/0.1.0 (trading-agent)")
            .build()
            .map_err(|e| AgentError::Config(format!("Failed to build HTTP client: {e}")))?;

        info!(rpc_url = %settings.rpc_url, address = %settings.address, "RPC ledger client ready");

        Ok(Self {
            http,
            settings,
            credential,
        })
    }

    /// Issue a JSON-RPC call and return its `result`.
    async fn call(&self, method: &str, params: Value, auth: bool) -> Result<Value, String> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        debug!(method, url = %self.settings.rpc_url, "JSON-RPC call");

        let mut builder = self.http.post(&self.settings.rpc_url).json(&request);
        if auth {
            builder = builder.bearer_auth(self.credential.expose_secret());
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("HTTP {status}: {body}"));
        }

        let body: RpcResponse = resp
            .json()
            .await
            .map_err(|e| format!("malformed response: {e}"))?;

        if let Some(err) = body.error {
            return Err(format!("RPC error {}: {}", err.code, err.message));
        }
        body.result.ok_or_else(|| "response without result".to_string())
    }
}

/// Convert a hex-encoded wei quantity into whole native units.
pub fn wei_hex_to_decimal(hex: &str) -> Result<Decimal, String> {
    let digits = hex.trim_start_matches("0x");
    if digits.is_empty() {
        return Ok(Decimal::ZERO);
    }
    let wei = u128::from_str_radix(digits, 16).map_err(|e| format!("bad quantity {hex}: {e}"))?;
    let wei = i128::try_from(wei).map_err(|_| format!("quantity {hex} out of range"))?;
    Decimal::try_from_i128_with_scale(wei, NATIVE_DECIMALS)
        .map(|d| d.normalize())
        .map_err(|e| format!("quantity {hex} out of range: {e}"))
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn get_balance(&self) -> Result<Decimal, AgentError> {
        let result = self
            .call(
                "eth_getBalance",
                json!([self.settings.address, "latest"]),
                false,
            )
            .await
            .map_err(AgentError::Ledger)?;

        let hex = result
            .as_str()
            .ok_or_else(|| AgentError::Ledger(format!("unexpected balance result: {result}")))?;
        wei_hex_to_decimal(hex).map_err(AgentError::Ledger)
    }

    async fn execute(&self, order: ExecutionOrder) -> Result<ExecutionReceipt, AgentError> {
        let params = json!([{
            "from": self.settings.address,
            "instrument": order.instrument,
            "direction": order.direction,
            "size": order.size.to_string(),
        }]);

        let result = self
            .call(&self.settings.execute_method, params, true)
            .await
            .map_err(|message| AgentError::Execution {
                instrument: order.instrument.clone(),
                message,
            })?;

        let reference = result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AgentError::Execution {
                instrument: order.instrument.clone(),
                message: format!("unexpected execution result: {result}"),
            })?;

        info!(
            instrument = %order.instrument,
            direction = %order.direction,
            size = %order.size,
            reference = %reference,
            "Order confirmed by relay"
        );

        Ok(ExecutionReceipt {
            reference,
            instrument: order.instrument,
            direction: order.direction,
            size: order.size,
            timestamp: Utc::now(),
        })
    }

    fn identity(&self) -> Option<String> {
        Some(self.settings.address.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
