//! Wallet boundary: the traits the controller talks to, and a JSON-RPC over
//! HTTP implementation of them for wallets that expose an EIP-1193 endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};
use whitelist_rpc::{
    self as rpc, CallRequest, ErrorObject, Request, Response, RpcError, TransactionReceipt,
    TransactionRequest,
};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, thiserror::Error)]
pub enum WalletError {
    #[error("request rejected in wallet: {0}")]
    Rejected(String),
    #[error("wallet has not authorized this app: {0}")]
    Unauthorized(String),
    #[error("wallet is disconnected: {0}")]
    Disconnected(String),
    #[error("wallet exposed no accounts")]
    NoAccounts,
    #[error("execution reverted: {0}")]
    Reverted(String),
    #[error("RPC error: {0}")]
    Rpc(ErrorObject),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(#[from] RpcError),
}

impl WalletError {
    /// True when the user (or the wallet on their behalf) declined a prompt.
    /// A locked wallet answering `eth_accounts` with nothing is a read
    /// failure, not a rejection.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_) | Self::Unauthorized(_))
    }
}

impl From<ErrorObject> for WalletError {
    fn from(err: ErrorObject) -> Self {
        if err.is_user_rejection() {
            Self::Rejected(err.message)
        } else if err.is_unauthorized() {
            Self::Unauthorized(err.message)
        } else if err.is_disconnected() {
            Self::Disconnected(err.message)
        } else if err.is_revert() {
            Self::Reverted(err.message)
        } else {
            Self::Rpc(err)
        }
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Negotiates access to a wallet. Calling `connect` may open an approval
/// prompt in the wallet, which the user can decline.
#[async_trait]
pub trait WalletConnector: Send + Sync + 'static {
    type Connection: WalletConnection;

    async fn connect(&self) -> Result<Self::Connection, WalletError>;
}

/// An authorized link to a wallet. Clones share the same underlying session.
#[async_trait]
pub trait WalletConnection: Clone + Send + Sync + 'static {
    async fn chain_id(&self) -> Result<u64, WalletError>;

    /// The account currently selected in the wallet.
    async fn account(&self) -> Result<Address, WalletError>;

    async fn call(&self, request: CallRequest) -> Result<Bytes, WalletError>;

    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256, WalletError>;

    /// `None` until the transaction is included in a block.
    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, WalletError>;
}

// ---------------------------------------------------------------------------
// JSON-RPC client
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RpcClient {
    http: reqwest::Client,
    url: Arc<str>,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, method, "wallet request");

        let response: Response = self
            .http
            .post(&*self.url)
            .json(&Request::new(id, method, params))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let value = response.into_result()?;
        Ok(rpc::decode_result(value)?)
    }
}

/// Connector for a wallet that serves JSON-RPC at a fixed URL.
#[derive(Clone, Debug)]
pub struct HttpWallet {
    rpc: RpcClient,
}

impl HttpWallet {
    pub fn new(url: &str) -> Result<Self, WalletError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("whitelist-ui/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(url, http))
    }

    pub fn with_client(url: &str, http: reqwest::Client) -> Self {
        Self {
            rpc: RpcClient {
                http,
                url: Arc::from(url),
                next_id: Arc::new(AtomicU64::new(1)),
            },
        }
    }
}

#[async_trait]
impl WalletConnector for HttpWallet {
    type Connection = HttpWalletConnection;

    async fn connect(&self) -> Result<Self::Connection, WalletError> {
        info!(url = %self.rpc.url, "requesting wallet accounts");
        let accounts: Vec<Address> = self.rpc.request(rpc::ETH_REQUEST_ACCOUNTS, json!([])).await?;
        // An approval that grants nothing is a declined prompt.
        if accounts.is_empty() {
            return Err(WalletError::Rejected("no accounts were shared".into()));
        }
        Ok(HttpWalletConnection {
            rpc: self.rpc.clone(),
        })
    }
}

/// Session handed out by [`HttpWallet::connect`].
#[derive(Clone, Debug)]
pub struct HttpWalletConnection {
    rpc: RpcClient,
}

#[async_trait]
impl WalletConnection for HttpWalletConnection {
    async fn chain_id(&self) -> Result<u64, WalletError> {
        let id: String = self.rpc.request(rpc::ETH_CHAIN_ID, json!([])).await?;
        Ok(rpc::parse_quantity(&id)?)
    }

    async fn account(&self) -> Result<Address, WalletError> {
        let accounts: Vec<Address> = self.rpc.request(rpc::ETH_ACCOUNTS, json!([])).await?;
        accounts.first().copied().ok_or(WalletError::NoAccounts)
    }

    async fn call(&self, request: CallRequest) -> Result<Bytes, WalletError> {
        self.rpc
            .request(rpc::ETH_CALL, json!([request, rpc::BLOCK_LATEST]))
            .await
    }

    async fn send_transaction(&self, request: TransactionRequest) -> Result<B256, WalletError> {
        self.rpc
            .request(rpc::ETH_SEND_TRANSACTION, json!([request]))
            .await
    }

    async fn transaction_receipt(
        &self,
        hash: B256,
    ) -> Result<Option<TransactionReceipt>, WalletError> {
        self.rpc
            .request(rpc::ETH_GET_TRANSACTION_RECEIPT, json!([hash]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;

    fn error_object(code: i64) -> ErrorObject {
        ErrorObject {
            code,
            message: "nope".into(),
            data: None,
        }
    }

    /// Serve canned JSON-RPC envelopes keyed by method name. Each envelope
    /// gets the request's `id` and `jsonrpc` filled in. Returns the base URL.
    async fn serve(replies: HashMap<&'static str, Value>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let replies = Arc::new(replies);
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(answer(socket, replies.clone()));
            }
        });
        url
    }

    async fn answer(mut socket: TcpStream, replies: Arc<HashMap<&'static str, Value>>) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let body = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                break buf[end + 4..end + 4 + len].to_vec();
            }
        };

        let request: Value = serde_json::from_slice(&body).unwrap();
        let method = request["method"].as_str().unwrap();
        let mut reply = replies
            .get(method)
            .cloned()
            .unwrap_or_else(|| json!({"error": {"code": -32601, "message": "method not found"}}));
        reply["jsonrpc"] = json!("2.0");
        reply["id"] = request["id"].clone();

        let text = reply.to_string();
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
            text.len(),
            text
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    }

    fn wallet(url: &str) -> HttpWallet {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        HttpWallet::with_client(url, http)
    }

    fn account() -> Address {
        Address::repeat_byte(0x42)
    }

    #[test]
    fn test_provider_codes_map_to_wallet_errors() {
        assert!(matches!(
            WalletError::from(error_object(rpc::PROVIDER_USER_REJECTED)),
            WalletError::Rejected(_)
        ));
        assert!(matches!(
            WalletError::from(error_object(rpc::PROVIDER_UNAUTHORIZED)),
            WalletError::Unauthorized(_)
        ));
        assert!(matches!(
            WalletError::from(error_object(rpc::PROVIDER_CHAIN_DISCONNECTED)),
            WalletError::Disconnected(_)
        ));
        assert!(matches!(
            WalletError::from(error_object(rpc::RPC_EXECUTION_REVERTED)),
            WalletError::Reverted(_)
        ));
        assert!(matches!(
            WalletError::from(error_object(-32603)),
            WalletError::Rpc(_)
        ));
    }

    #[test]
    fn test_rejection_classification() {
        assert!(WalletError::Rejected("x".into()).is_rejection());
        assert!(WalletError::Unauthorized("x".into()).is_rejection());
        assert!(!WalletError::NoAccounts.is_rejection());
        assert!(!WalletError::Reverted("x".into()).is_rejection());
        assert!(!WalletError::Transport("timeout".into()).is_rejection());
        assert!(!WalletError::Rpc(error_object(-32603)).is_rejection());
    }

    #[test]
    fn test_http_wallet_builds_without_runtime() {
        assert!(HttpWallet::new("http://127.0.0.1:1248").is_ok());
    }

    #[tokio::test]
    async fn test_connect_and_read_round_trip() {
        let mut word = [0u8; 32];
        word[31] = 7;
        let url = serve(HashMap::from([
            (rpc::ETH_REQUEST_ACCOUNTS, json!({"result": [account()]})),
            (rpc::ETH_ACCOUNTS, json!({"result": [account()]})),
            (rpc::ETH_CHAIN_ID, json!({"result": "0xaa36a7"})),
            (rpc::ETH_CALL, json!({"result": Bytes::from(word.to_vec())})),
        ]))
        .await;

        let connection = wallet(&url).connect().await.unwrap();
        assert_eq!(connection.chain_id().await.unwrap(), 11_155_111);
        assert_eq!(connection.account().await.unwrap(), account());

        let data = connection
            .call(CallRequest {
                to: Address::repeat_byte(0x11),
                data: Bytes::from(vec![0x12, 0x34, 0x56, 0x78]),
            })
            .await
            .unwrap();
        assert_eq!(data.as_ref(), &word[..]);
    }

    #[tokio::test]
    async fn test_declined_send_is_rejected() {
        let url = serve(HashMap::from([
            (rpc::ETH_REQUEST_ACCOUNTS, json!({"result": [account()]})),
            (
                rpc::ETH_SEND_TRANSACTION,
                json!({"error": {"code": 4001, "message": "User denied transaction signature."}}),
            ),
        ]))
        .await;

        let connection = wallet(&url).connect().await.unwrap();
        let err = connection
            .send_transaction(TransactionRequest {
                from: account(),
                to: Address::repeat_byte(0x11),
                data: Bytes::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::Rejected(ref msg) if msg.contains("denied")));
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_connect_sharing_no_accounts_is_rejected() {
        let url = serve(HashMap::from([(
            rpc::ETH_REQUEST_ACCOUNTS,
            json!({"result": []}),
        )]))
        .await;

        let err = wallet(&url).connect().await.unwrap_err();
        assert!(matches!(err, WalletError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_locked_wallet_account_read_is_not_a_rejection() {
        let url = serve(HashMap::from([
            (rpc::ETH_REQUEST_ACCOUNTS, json!({"result": [account()]})),
            (rpc::ETH_ACCOUNTS, json!({"result": []})),
        ]))
        .await;

        let connection = wallet(&url).connect().await.unwrap();
        let err = connection.account().await.unwrap_err();
        assert!(matches!(err, WalletError::NoAccounts));
        assert!(!err.is_rejection());
    }

    #[tokio::test]
    async fn test_unmined_receipt_is_none() {
        let hash = B256::repeat_byte(0xab);
        let url = serve(HashMap::from([
            (rpc::ETH_REQUEST_ACCOUNTS, json!({"result": [account()]})),
            (rpc::ETH_GET_TRANSACTION_RECEIPT, json!({"result": null})),
        ]))
        .await;

        let connection = wallet(&url).connect().await.unwrap();
        assert_eq!(connection.transaction_receipt(hash).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mined_receipt_and_bad_chain_id() {
        let hash = B256::repeat_byte(0xab);
        let url = serve(HashMap::from([
            (rpc::ETH_REQUEST_ACCOUNTS, json!({"result": [account()]})),
            (rpc::ETH_CHAIN_ID, json!({"result": "4"})),
            (
                rpc::ETH_GET_TRANSACTION_RECEIPT,
                json!({"result": {"transactionHash": hash, "blockNumber": "0x10", "status": "0x1"}}),
            ),
        ]))
        .await;

        let connection = wallet(&url).connect().await.unwrap();
        let receipt = connection.transaction_receipt(hash).await.unwrap().unwrap();
        assert_eq!(receipt.transaction_hash, hash);
        assert_eq!(receipt.block_number(), Ok(Some(16)));

        assert!(matches!(
            connection.chain_id().await,
            Err(WalletError::Decode(RpcError::InvalidQuantity(_)))
        ));
    }
}
