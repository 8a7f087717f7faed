//! The view controller: owns the wallet connection and the UI state, and runs
//! the connect / refresh / join sequences against the whitelist contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, B256};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};
use whitelist_rpc::TransactionReceipt;

use crate::config::AppConfig;
use crate::contract::{ChainAccessor, ContractError, WhitelistContractRef};
use crate::state::{Notice, UiState};
use crate::wallet::{WalletConnection, WalletConnector, WalletError};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Broad classes of controller failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    WrongNetwork,
    WalletRejection,
    RpcOrContract,
    /// A join sequence is already running.
    Busy,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WhitelistError {
    #[error("connected to chain {actual}, but this app only works on chain {expected}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("wallet rejected the request: {0}")]
    WalletRejected(String),
    #[error("{0}")]
    RpcOrContract(String),
    #[error("a whitelist transaction is already in flight")]
    TransactionInFlight,
    #[error("transaction {tx_hash} was not confirmed in time")]
    ConfirmationTimeout { tx_hash: B256 },
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },
}

impl WhitelistError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WrongNetwork { .. } => ErrorKind::WrongNetwork,
            Self::WalletRejected(_) => ErrorKind::WalletRejection,
            Self::TransactionInFlight => ErrorKind::Busy,
            Self::RpcOrContract(_) | Self::ConfirmationTimeout { .. } | Self::Reverted { .. } => {
                ErrorKind::RpcOrContract
            }
        }
    }
}

impl From<WalletError> for WhitelistError {
    fn from(err: WalletError) -> Self {
        if err.is_rejection() {
            Self::WalletRejected(err.to_string())
        } else {
            Self::RpcOrContract(err.to_string())
        }
    }
}

impl From<ContractError> for WhitelistError {
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::Wallet(inner) => inner.into(),
            ContractError::Reverted(tx_hash) => Self::Reverted { tx_hash },
            other => Self::RpcOrContract(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct WhitelistController<W: WalletConnector> {
    connector: W,
    contract: WhitelistContractRef,
    required_chain_id: u64,
    confirmation_timeout: Option<Duration>,
    /// Created on the first successful `connect`, then reused for the session.
    connection: Mutex<Option<W::Connection>>,
    joining: AtomicBool,
    /// Number of `connect` calls in progress, from any caller.
    connecting: watch::Sender<usize>,
    state: watch::Sender<UiState>,
    notices: watch::Sender<Option<Notice>>,
}

impl<W: WalletConnector> WhitelistController<W> {
    pub fn new(connector: W, config: &AppConfig) -> Self {
        Self {
            connector,
            contract: WhitelistContractRef::new(config.contract_address, config.poll_interval()),
            required_chain_id: config.required_chain_id,
            confirmation_timeout: config.confirmation_timeout(),
            connection: Mutex::new(None),
            joining: AtomicBool::new(false),
            connecting: watch::channel(0).0,
            state: watch::channel(UiState::default()).0,
            notices: watch::channel(None).0,
        }
    }

    pub fn state(&self) -> UiState {
        *self.state.borrow()
    }

    pub fn contract_address(&self) -> Address {
        self.contract.address
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state.subscribe()
    }

    pub fn subscribe_notices(&self) -> watch::Receiver<Option<Notice>> {
        self.notices.subscribe()
    }

    /// Non-zero while a `connect` call is running.
    pub fn subscribe_connecting(&self) -> watch::Receiver<usize> {
        self.connecting.subscribe()
    }

    /// Connect to the wallet and load the whitelist state.
    ///
    /// The wallet is only prompted the first time; later calls reuse the
    /// connection and just re-check the network. Concurrent callers wait on
    /// the same prompt.
    pub async fn connect(&self) -> Result<(), WhitelistError> {
        let _connecting = ConnectingGuard::enter(&self.connecting);
        let already_connected = self.state().wallet_connected;
        self.checked_connection().await?;
        if already_connected {
            return Ok(());
        }

        self.state.send_modify(|s| s.wallet_connected = true);
        info!("wallet connected");

        // Read failures are logged by the refresh operations and leave the
        // state alone.
        let _ = self.refresh_whitelist_count().await;
        let _ = self.refresh_membership().await;
        Ok(())
    }

    pub async fn get_accessor(
        &self,
        needs_signing: bool,
    ) -> Result<ChainAccessor<W::Connection>, WhitelistError> {
        let connection = self.checked_connection().await?;
        if !needs_signing {
            return Ok(ChainAccessor::ReadOnly(connection));
        }
        let address = connection.account().await?;
        Ok(ChainAccessor::Signing {
            connection,
            address,
        })
    }

    pub async fn refresh_whitelist_count(&self) -> Result<u64, WhitelistError> {
        let result = async {
            let accessor = self.get_accessor(false).await?;
            let count = self
                .contract
                .bind(&accessor)
                .num_addresses_whitelisted()
                .await?;
            Ok::<_, WhitelistError>(count)
        }
        .await;

        match result {
            Ok(count) => {
                self.state.send_modify(|s| s.whitelisted_count = count);
                debug!(count, "whitelist count refreshed");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "failed to read whitelist count");
                Err(e)
            }
        }
    }

    pub async fn refresh_membership(&self) -> Result<bool, WhitelistError> {
        let result = async {
            let accessor = self.get_accessor(true).await?;
            let address = accessor.signer().ok_or_else(|| {
                WhitelistError::RpcOrContract("signing accessor without an address".into())
            })?;
            let joined = self
                .contract
                .bind(&accessor)
                .whitelisted_address(address)
                .await?;
            Ok::<_, WhitelistError>(joined)
        }
        .await;

        match result {
            Ok(joined) => {
                self.state.send_modify(|s| s.joined_whitelist = joined);
                debug!(joined, "membership refreshed");
                Ok(joined)
            }
            Err(e) => {
                warn!(error = %e, "failed to read whitelist membership");
                Err(e)
            }
        }
    }

    /// Submit the join transaction and wait for it to be mined.
    ///
    /// `tx_pending` is raised only once the wallet has accepted the
    /// transaction, and is cleared again however the wait ends.
    pub async fn join_whitelist(&self) -> Result<TransactionReceipt, WhitelistError> {
        let Some(_guard) = JoinGuard::acquire(&self.joining) else {
            warn!("join requested while another join is in flight");
            return Err(WhitelistError::TransactionInFlight);
        };

        let accessor = self.get_accessor(true).await.inspect_err(|e| {
            warn!(error = %e, "could not get a signer for the join transaction");
        })?;
        let pending = self
            .contract
            .bind(&accessor)
            .add_address_to_whitelist()
            .await
            .map_err(WhitelistError::from)
            .inspect_err(|e| warn!(error = %e, "join transaction was not submitted"))?;

        let tx_hash = pending.hash();
        self.state.send_modify(|s| s.tx_pending = true);
        info!(%tx_hash, "join transaction submitted");

        let outcome = match self.confirmation_timeout {
            Some(limit) => match tokio::time::timeout(limit, pending.wait()).await {
                Ok(waited) => waited.map_err(WhitelistError::from),
                Err(_) => Err(WhitelistError::ConfirmationTimeout { tx_hash }),
            },
            None => pending.wait().await.map_err(WhitelistError::from),
        };
        self.state.send_modify(|s| s.tx_pending = false);

        let receipt = outcome
            .inspect_err(|e| error!(%tx_hash, error = %e, "join transaction failed"))?;
        info!(%tx_hash, "join transaction confirmed");

        let _ = self.refresh_whitelist_count().await;
        let _ = self.refresh_membership().await;
        Ok(receipt)
    }

    async fn checked_connection(&self) -> Result<W::Connection, WhitelistError> {
        let connection = {
            let mut slot = self.connection.lock().await;
            match slot.as_ref() {
                Some(connection) => connection.clone(),
                None => {
                    let connection = self.connector.connect().await?;
                    *slot = Some(connection.clone());
                    connection
                }
            }
        };

        let actual = connection.chain_id().await?;
        if actual != self.required_chain_id {
            let err = WhitelistError::WrongNetwork {
                expected: self.required_chain_id,
                actual,
            };
            warn!(expected = self.required_chain_id, actual, "wallet is on the wrong network");
            self.notices.send_replace(Some(Notice {
                title: "Wrong network".to_string(),
                message: format!(
                    "Your wallet is on chain {actual}. Switch it to chain {} and reconnect.",
                    self.required_chain_id
                ),
            }));
            return Err(err);
        }
        Ok(connection)
    }
}

/// Holds the join flag for the lifetime of one join sequence.
struct JoinGuard<'a>(&'a AtomicBool);

impl<'a> JoinGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for JoinGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Counts one `connect` call for as long as it runs.
struct ConnectingGuard<'a>(&'a watch::Sender<usize>);

impl<'a> ConnectingGuard<'a> {
    fn enter(count: &'a watch::Sender<usize>) -> Self {
        count.send_modify(|n| *n += 1);
        Self(count)
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n -= 1);
    }
}
