use alloy_primitives::{Address, Bytes, U256, hex};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};
use yd_api_types::{ChainId, TxHash};
use yd_chain_client::{CallRequest, ConnectorKind, ProviderError, TxRequest, WalletProvider};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

/// Wallet provider backed by a node's JSON-RPC endpoint.
///
/// Accounts are the node-managed ones (Hardhat / Anvil dev accounts or an
/// unlocked node), so the node plays the role of the injected wallet:
/// it signs messages and transactions on `personal_sign` /
/// `eth_sendTransaction`. Reads from `RPC_URL` at construction time
/// (default: `http://127.0.0.1:8545`).
pub struct JsonRpcProvider {
    id: String,
    kind: ConnectorKind,
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
    connected: AtomicBool,
}

impl Default for JsonRpcProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

impl JsonRpcProvider {
    pub fn new(endpoint: Option<String>) -> Self {
        let endpoint = endpoint
            .or_else(|| std::env::var("RPC_URL").ok())
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        Self {
            id: "injected".to_owned(),
            kind: ConnectorKind::Injected,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(false),
        }
    }

    pub fn with_identity(mut self, id: impl Into<String>, kind: ConnectorKind) -> Self {
        self.id = id.into();
        self.kind = kind;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!("rpc -> {} {}", method, body.params);

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| ProviderError::Network(format!("{method}: {err}")))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ProviderError::Network(format!("{method}: HTTP {status}: {text}")));
        }

        let parsed: RpcResponse = serde_json::from_str(&text)
            .map_err(|err| ProviderError::Network(format!("{method}: invalid response: {err}")))?;

        if let Some(error) = parsed.error {
            debug!("rpc <- {} error {} {}", method, error.code, error.message);
            return Err(classify_rpc_error(error.code, &error.message, error.data.as_ref()));
        }

        Ok(parsed.result.unwrap_or(Value::Null))
    }
}

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
    #[serde(default)]
    data: Option<Value>,
}

const METHOD_NOT_FOUND: i64 = -32601;
const USER_REJECTED: i64 = 4001;
const UNRECOGNIZED_CHAIN: i64 = 4902;
const EXECUTION_REVERTED: i64 = 3;

/// Map a JSON-RPC error object onto the wallet error taxonomy, keeping the
/// node's message verbatim.
pub fn classify_rpc_error(code: i64, message: &str, data: Option<&Value>) -> ProviderError {
    let lower = message.to_ascii_lowercase();

    if code == USER_REJECTED || lower.contains("user rejected") || lower.contains("user denied") {
        return ProviderError::UserRejected(message.to_owned());
    }
    if lower.contains("insufficient funds") {
        return ProviderError::InsufficientFunds(message.to_owned());
    }
    if code == EXECUTION_REVERTED || lower.contains("revert") {
        let reason = revert_reason(message).or_else(|| {
            data.and_then(|d| d.get("message"))
                .and_then(Value::as_str)
                .and_then(revert_reason)
        });
        return ProviderError::Reverted(reason);
    }
    if code == METHOD_NOT_FOUND || code == UNRECOGNIZED_CHAIN {
        return ProviderError::Unsupported(message.to_owned());
    }
    ProviderError::Other(message.to_owned())
}

fn revert_reason(message: &str) -> Option<String> {
    if let Some(start) = message.find("reason string '") {
        let rest = &message[start + "reason string '".len()..];
        return rest.rfind('\'').map(|end| rest[..end].to_owned());
    }
    if let Some((_, reason)) = message.split_once("execution reverted:") {
        let reason = reason.trim();
        if !reason.is_empty() {
            return Some(reason.to_owned());
        }
    }
    None
}

fn parse_quantity(value: &Value) -> Result<U256, ProviderError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ProviderError::Other(format!("expected hex quantity, got {value}")))?;
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|err| ProviderError::Other(format!("invalid quantity '{raw}': {err}")))
}

fn parse_bytes(value: &Value) -> Result<Bytes, ProviderError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ProviderError::Other(format!("expected hex data, got {value}")))?;
    hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
        .map(Bytes::from)
        .map_err(|err| ProviderError::Other(format!("invalid hex data: {err}")))
}

fn quantity(value: U256) -> String {
    format!("{value:#x}")
}

#[async_trait]
impl WalletProvider for JsonRpcProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ConnectorKind {
        self.kind
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let result = match self.request("eth_requestAccounts", json!([])).await {
            Err(ProviderError::Unsupported(_)) => self.request("eth_accounts", json!([])).await?,
            other => other?,
        };

        let accounts: Vec<Address> = serde_json::from_value(result)
            .map_err(|err| ProviderError::Other(format!("invalid account list: {err}")))?;
        if accounts.is_empty() {
            return Err(ProviderError::UserRejected(
                "wallet returned no accounts".to_owned(),
            ));
        }
        self.connected.store(true, Ordering::Relaxed);
        info!("rpc wallet {} exposed {} account(s)", self.endpoint, accounts.len());
        Ok(accounts)
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        let value = parse_quantity(&self.request("eth_chainId", json!([])).await?)?;
        u64::try_from(value)
            .map(ChainId)
            .map_err(|_| ProviderError::Other(format!("chain id out of range: {value}")))
    }

    async fn switch_chain(&self, chain: ChainId) -> Result<(), ProviderError> {
        self.request(
            "wallet_switchEthereumChain",
            json!([{ "chainId": quantity(U256::from(chain.0)) }]),
        )
        .await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        if !self.connected.swap(false, Ordering::Relaxed) {
            return Err(ProviderError::Other("provider is not connected".to_owned()));
        }
        Ok(())
    }

    async fn sign_message(&self, account: Address, message: &str) -> Result<String, ProviderError> {
        let result = self
            .request(
                "personal_sign",
                json!([hex::encode_prefixed(message.as_bytes()), account]),
            )
            .await?;
        result
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| ProviderError::Other(format!("unexpected signature value: {result}")))
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash, ProviderError> {
        let mut params = json!({
            "from": tx.from,
            "to": tx.to,
            "data": hex::encode_prefixed(&tx.data),
        });
        if !tx.value.is_zero() {
            params["value"] = Value::String(quantity(tx.value));
        }

        let result = self.request("eth_sendTransaction", json!([params])).await?;
        result
            .as_str()
            .and_then(|raw| raw.parse::<TxHash>().ok())
            .ok_or_else(|| ProviderError::Other(format!("unexpected transaction hash: {result}")))
    }

    async fn call(&self, req: CallRequest) -> Result<Bytes, ProviderError> {
        let result = self
            .request(
                "eth_call",
                json!([{ "to": req.to, "data": hex::encode_prefixed(&req.data) }, "latest"]),
            )
            .await?;
        parse_bytes(&result)
    }

    async fn get_balance(&self, account: Address) -> Result<U256, ProviderError> {
        let result = self
            .request("eth_getBalance", json!([account, "latest"]))
            .await?;
        parse_quantity(&result)
    }
}
