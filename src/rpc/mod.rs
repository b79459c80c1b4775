//! JSON-RPC access to a ledger node over `http://` or `https://`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use solana_sdk::hash::Hash;
use solana_sdk::packet::PACKET_DATA_SIZE;
use solana_sdk::transaction::Transaction;
use thiserror::Error;
use tracing::debug;
use vesting_core::pubkey::Pubkey;

const TIMEOUT: Duration = Duration::from_secs(30);
const COMMITMENT: &str = "confirmed";

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http status {status} from node")]
    Status { status: u16 },
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("unsupported endpoint {0}, expected an http:// or https:// url")]
    UnsupportedScheme(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
    #[error("failed to serialize transaction: {0}")]
    Serialize(#[from] bincode::Error),
    #[error("transaction is {size} bytes, the packet limit is {PACKET_DATA_SIZE}")]
    TransactionTooLarge { size: usize },
}

/// The node calls the CLI needs.
pub trait RpcClient {
    fn get_latest_blockhash(&self) -> Result<Hash, RpcError>;

    /// Raw account data, `None` when the account does not exist.
    fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RpcError>;

    fn account_exists(&self, address: &Pubkey) -> Result<bool, RpcError> {
        Ok(self.get_account_data(address)?.is_some())
    }

    /// Submit a signed transaction and return its signature.
    fn send_transaction(&self, transaction: &Transaction) -> Result<String, RpcError>;
}

/// Wire form of a transaction as accepted by `sendTransaction`.
pub fn encode_transaction(transaction: &Transaction) -> Result<String, RpcError> {
    let bytes = bincode::serialize(transaction)?;
    if bytes.len() > PACKET_DATA_SIZE {
        return Err(RpcError::TransactionTooLarge { size: bytes.len() });
    }
    Ok(STANDARD.encode(bytes))
}

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct Response {
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

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
struct AccountValue {
    data: (String, String),
}

pub struct HttpRpcClient {
    client: reqwest::blocking::Client,
    url: Url,
    request_id: AtomicU64,
}

impl HttpRpcClient {
    /// Client for a node URL such as `http://localhost:8899`, with a 30
    /// second request timeout.
    pub fn new(url: &str) -> Result<Self, RpcError> {
        let parsed = Url::parse(url).map_err(|_| RpcError::UnsupportedScheme(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(RpcError::UnsupportedScheme(url.to_string()));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            url: parsed,
            request_id: AtomicU64::new(1),
        })
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let request = Request {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        debug!(method, id, url = %self.url, "rpc request");

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&request)?)
            .send()?;
        if !response.status().is_success() {
            return Err(RpcError::Status {
                status: response.status().as_u16(),
            });
        }

        let response: Response = response.json()?;
        if let Some(err) = response.error {
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        response
            .result
            .ok_or_else(|| RpcError::InvalidResponse(format!("{method}: no result")))
    }
}

impl RpcClient for HttpRpcClient {
    fn get_latest_blockhash(&self) -> Result<Hash, RpcError> {
        let result = self.call(
            "getLatestBlockhash",
            json!([{ "commitment": COMMITMENT }]),
        )?;
        let value: WithContext<BlockhashValue> = serde_json::from_value(result)?;
        value
            .value
            .blockhash
            .parse()
            .map_err(|err| RpcError::InvalidResponse(format!("blockhash: {err}")))
    }

    fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, RpcError> {
        let result = self.call(
            "getAccountInfo",
            json!([address.to_string(), { "encoding": "base64", "commitment": COMMITMENT }]),
        )?;
        let value: WithContext<Option<AccountValue>> = serde_json::from_value(result)?;
        match value.value {
            None => Ok(None),
            Some(AccountValue {
                data: (encoded, encoding),
            }) => {
                if encoding != "base64" {
                    return Err(RpcError::InvalidResponse(format!(
                        "account data in {encoding}"
                    )));
                }
                STANDARD
                    .decode(encoded)
                    .map(Some)
                    .map_err(|err| RpcError::InvalidResponse(err.to_string()))
            }
        }
    }

    fn send_transaction(&self, transaction: &Transaction) -> Result<String, RpcError> {
        let encoded = encode_transaction(transaction)?;
        let result = self.call(
            "sendTransaction",
            json!([encoded, { "encoding": "base64", "preflightCommitment": COMMITMENT }]),
        )?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| RpcError::InvalidResponse("signature is not a string".into()))
    }
}
