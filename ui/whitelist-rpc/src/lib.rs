//! JSON-RPC wire types for talking to an EIP-1193 wallet.
//!
//! Everything in this crate is plain data: request/response envelopes, the
//! provider error object, call and transaction bodies, and the receipt shape.
//! The transport that moves these over HTTP lives in the app crate.

use std::fmt;

use alloy_primitives::{Address, Bytes, B256};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const JSONRPC_VERSION: &str = "2.0";

// EIP-1193 provider error codes
pub const PROVIDER_USER_REJECTED: i64 = 4001;
pub const PROVIDER_UNAUTHORIZED: i64 = 4100;
pub const PROVIDER_DISCONNECTED: i64 = 4900;
pub const PROVIDER_CHAIN_DISCONNECTED: i64 = 4901;

// Execution error codes
/// Returned by nodes when `eth_call` hits a revert.
pub const RPC_EXECUTION_REVERTED: i64 = 3;

// Method names
pub const ETH_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
pub const ETH_ACCOUNTS: &str = "eth_accounts";
pub const ETH_CHAIN_ID: &str = "eth_chainId";
pub const ETH_CALL: &str = "eth_call";
pub const ETH_SEND_TRANSACTION: &str = "eth_sendTransaction";
pub const ETH_GET_TRANSACTION_RECEIPT: &str = "eth_getTransactionReceipt";

pub const BLOCK_LATEST: &str = "latest";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RpcError {
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid hex quantity `{0}`")]
    InvalidQuantity(String),
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct Request<'a> {
    jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> Request<'a> {
    pub fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

/// A JSON-RPC 2.0 response. Wallets are loose about `id`, so it is not read.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorObject>,
}

impl Response {
    /// Split the envelope into its payload or the provider error.
    ///
    /// An `error` member wins over a `result` member when a wallet sends both.
    /// A missing `result` with no error is a JSON `null` result, which is how
    /// `eth_getTransactionReceipt` reports a transaction that is not mined yet.
    pub fn into_result(self) -> Result<Value, ErrorObject> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// The `error` member of a response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ErrorObject {
    pub fn is_user_rejection(&self) -> bool {
        self.code == PROVIDER_USER_REJECTED
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code == PROVIDER_UNAUTHORIZED
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(
            self.code,
            PROVIDER_DISCONNECTED | PROVIDER_CHAIN_DISCONNECTED
        )
    }

    pub fn is_revert(&self) -> bool {
        self.code == RPC_EXECUTION_REVERTED
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// First parameter of `eth_call`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallRequest {
    pub to: Address,
    pub data: Bytes,
}

/// Sole parameter of `eth_sendTransaction`. Gas and nonce are left to the
/// wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// The subset of `eth_getTransactionReceipt` the app needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<String>,
    /// `0x1` success, `0x0` failure. Absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<String>,
}

impl TransactionReceipt {
    pub fn block_number(&self) -> Result<Option<u64>, RpcError> {
        self.block_number.as_deref().map(parse_quantity).transpose()
    }

    /// Whether the transaction executed successfully. Receipts without a
    /// status field are treated as successful.
    pub fn succeeded(&self) -> Result<bool, RpcError> {
        match self.status.as_deref() {
            Some(s) => Ok(parse_quantity(s)? == 1),
            None => Ok(true),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a `0x`-prefixed hex quantity such as `"0x4"`.
pub fn parse_quantity(input: &str) -> Result<u64, RpcError> {
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(|| RpcError::InvalidQuantity(input.to_string()))?;
    if digits.is_empty() {
        return Err(RpcError::InvalidQuantity(input.to_string()));
    }
    u64::from_str_radix(digits, 16).map_err(|_| RpcError::InvalidQuantity(input.to_string()))
}

/// Deserialize a result payload into a concrete type.
pub fn decode_result<T: DeserializeOwned>(value: Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::Malformed(e.to_string()))
}
