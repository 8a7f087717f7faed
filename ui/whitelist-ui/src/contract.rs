//! Whitelist contract proxy: calldata encoding and return-word decoding for
//! the three functions the app uses.

use std::time::Duration;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use tracing::debug;
use whitelist_rpc::{CallRequest, RpcError, TransactionReceipt, TransactionRequest};

use crate::wallet::{WalletConnection, WalletError};

pub(crate) const NUM_ADDRESSES_WHITELISTED: &str = "numAddressesWhitelisted()";
pub(crate) const WHITELISTED_ADDRESSES: &str = "whitelistedAddresses(address)";
pub(crate) const ADD_ADDRESS_TO_WHITELIST: &str = "addAddressToWhitelist()";

const SELECTOR_LEN: usize = 4;
const WORD_LEN: usize = 32;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ContractError {
    #[error("a signing accessor is required to send transactions")]
    ReadOnlyAccessor,
    #[error("unexpected return data: {0}")]
    Decode(String),
    #[error("transaction {0} reverted")]
    Reverted(B256),
    #[error(transparent)]
    Wallet(#[from] WalletError),
}

/// A chain handle derived from a wallet connection.
#[derive(Clone, Debug)]
pub enum ChainAccessor<C> {
    ReadOnly(C),
    Signing { connection: C, address: Address },
}

impl<C> ChainAccessor<C> {
    pub fn connection(&self) -> &C {
        match self {
            Self::ReadOnly(connection) => connection,
            Self::Signing { connection, .. } => connection,
        }
    }

    /// The account transactions are sent from, if this accessor can sign.
    pub fn signer(&self) -> Option<Address> {
        match self {
            Self::ReadOnly(_) => None,
            Self::Signing { address, .. } => Some(*address),
        }
    }
}

/// Where the whitelist contract lives and how receipts are polled for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WhitelistContractRef {
    pub address: Address,
    pub poll_interval: Duration,
}

impl WhitelistContractRef {
    pub fn new(address: Address, poll_interval: Duration) -> Self {
        Self {
            address,
            poll_interval,
        }
    }

    pub fn bind<'a, C>(&self, accessor: &'a ChainAccessor<C>) -> WhitelistContract<'a, C> {
        WhitelistContract {
            contract: *self,
            accessor,
        }
    }
}

/// A contract reference bound to an accessor.
pub struct WhitelistContract<'a, C> {
    contract: WhitelistContractRef,
    accessor: &'a ChainAccessor<C>,
}

impl<C: WalletConnection> WhitelistContract<'_, C> {
    pub async fn num_addresses_whitelisted(&self) -> Result<u64, ContractError> {
        let data = self.call(encode_call(NUM_ADDRESSES_WHITELISTED, &[])).await?;
        decode_uint(&data)
    }

    pub async fn whitelisted_address(&self, who: Address) -> Result<bool, ContractError> {
        let data = self
            .call(encode_call(WHITELISTED_ADDRESSES, &[address_word(who)]))
            .await?;
        decode_bool(&data)
    }

    pub async fn add_address_to_whitelist(&self) -> Result<PendingTransaction<C>, ContractError> {
        let from = self.accessor.signer().ok_or(ContractError::ReadOnlyAccessor)?;
        let request = TransactionRequest {
            from,
            to: self.contract.address,
            data: encode_call(ADD_ADDRESS_TO_WHITELIST, &[]),
        };
        let hash = self.accessor.connection().send_transaction(request).await?;
        Ok(PendingTransaction {
            hash,
            connection: self.accessor.connection().clone(),
            poll_interval: self.contract.poll_interval,
        })
    }

    async fn call(&self, data: Bytes) -> Result<Bytes, ContractError> {
        let request = CallRequest {
            to: self.contract.address,
            data,
        };
        Ok(self.accessor.connection().call(request).await?)
    }
}

/// A submitted transaction that has not been confirmed yet.
#[derive(Debug)]
pub struct PendingTransaction<C> {
    hash: B256,
    connection: C,
    poll_interval: Duration,
}

impl<C: WalletConnection> PendingTransaction<C> {
    pub fn hash(&self) -> B256 {
        self.hash
    }

    /// Poll until the transaction is included in a block.
    ///
    /// There is no deadline here; callers wrap this in a timeout if they
    /// want one.
    pub async fn wait(self) -> Result<TransactionReceipt, ContractError> {
        loop {
            if let Some(receipt) = self.connection.transaction_receipt(self.hash).await? {
                let mined = receipt.block_number().map_err(decode_error)?;
                if mined.is_some() {
                    if !receipt.succeeded().map_err(decode_error)? {
                        return Err(ContractError::Reverted(self.hash));
                    }
                    return Ok(receipt);
                }
            }
            debug!(tx_hash = %self.hash, "transaction not mined yet");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn decode_error(err: RpcError) -> ContractError {
    ContractError::Decode(err.to_string())
}

// ---------------------------------------------------------------------------
// ABI helpers
// ---------------------------------------------------------------------------

/// First four bytes of the keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; SELECTOR_LEN] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; SELECTOR_LEN];
    out.copy_from_slice(&hash[..SELECTOR_LEN]);
    out
}

fn encode_call(signature: &str, args: &[[u8; WORD_LEN]]) -> Bytes {
    let mut data = Vec::with_capacity(SELECTOR_LEN + args.len() * WORD_LEN);
    data.extend_from_slice(&selector(signature));
    for word in args {
        data.extend_from_slice(word);
    }
    Bytes::from(data)
}

/// Left-pad an address to a 32-byte ABI word.
fn address_word(address: Address) -> [u8; WORD_LEN] {
    let mut word = [0u8; WORD_LEN];
    word[WORD_LEN - 20..].copy_from_slice(address.as_slice());
    word
}

fn single_word(data: &[u8]) -> Result<&[u8], ContractError> {
    if data.len() != WORD_LEN {
        return Err(ContractError::Decode(format!(
            "expected {WORD_LEN} bytes, got {}",
            data.len()
        )));
    }
    Ok(data)
}

fn decode_uint(data: &[u8]) -> Result<u64, ContractError> {
    let value = U256::from_be_slice(single_word(data)?);
    u64::try_from(value).map_err(|_| ContractError::Decode(format!("count {value} overflows u64")))
}

fn decode_bool(data: &[u8]) -> Result<bool, ContractError> {
    let word = single_word(data)?;
    if word[..WORD_LEN - 1].iter().any(|b| *b != 0) || word[WORD_LEN - 1] > 1 {
        return Err(ContractError::Decode("bool word out of range".into()));
    }
    Ok(word[WORD_LEN - 1] == 1)
}
