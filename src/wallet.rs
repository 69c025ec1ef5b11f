//! Wallet boundary: session provider, contract-call provider, and the
//! address-book shapes wallets answer `connect` with.

use crate::error::WalletError;
use crate::transfer::TransferRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One account a wallet exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, rename = "publicKey", skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl AddressEntry {
    pub fn new(symbol: &str, address: &str) -> Self {
        Self {
            address: address.to_string(),
            symbol: Some(symbol.to_string()),
            public_key: None,
        }
    }

    fn has_symbol(&self, symbol: &str) -> bool {
        self.symbol
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case(symbol))
            .unwrap_or(false)
    }
}

/// Wallets have answered with two layouts over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressBook {
    /// `{"stx": [{...}], "btc": [{...}]}`
    Keyed(BTreeMap<String, Vec<AddressEntry>>),
    /// `[{"symbol": "STX", "address": ...}, ...]`
    Flat(Vec<AddressEntry>),
}

/// Result of `connect` or of reading the wallet's persisted session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBookResponse {
    #[serde(default)]
    pub addresses: Option<AddressBook>,
}

impl AddressBookResponse {
    pub fn flat(entries: Vec<AddressEntry>) -> Self {
        Self {
            addresses: Some(AddressBook::Flat(entries)),
        }
    }

    pub fn keyed(entries: impl IntoIterator<Item = (String, Vec<AddressEntry>)>) -> Self {
        Self {
            addresses: Some(AddressBook::Keyed(entries.into_iter().collect())),
        }
    }

    /// Decode a raw wallet response. Unknown layouts decode to an empty book.
    pub fn from_json(value: serde_json::Value) -> Self {
        match serde_json::from_value(value) {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Unrecognised address book layout: {}", e);
                Self::default()
            }
        }
    }

    /// Address for the chain's native asset.
    ///
    /// Tries the keyed layout's `symbol` bucket first, then searches every
    /// entry by its symbol tag. `None` means no native-asset address.
    pub fn native_address(&self, symbol: &str) -> Option<&str> {
        match self.addresses.as_ref()? {
            AddressBook::Keyed(map) => map
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(symbol))
                .and_then(|(_, entries)| entries.first())
                .or_else(|| map.values().flatten().find(|e| e.has_symbol(symbol)))
                .map(|e| e.address.as_str()),
            AddressBook::Flat(entries) => entries
                .iter()
                .find(|e| e.has_symbol(symbol))
                .map(|e| e.address.as_str()),
        }
    }
}

/// Reply to a contract-call request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallResponse {
    #[serde(default, alias = "txId")]
    pub txid: Option<String>,
}

impl CallResponse {
    pub fn with_txid(txid: impl Into<String>) -> Self {
        Self {
            txid: Some(txid.into()),
        }
    }
}

/// Wallet connection and the session it persists.
#[async_trait]
pub trait WalletSession: Send + Sync {
    fn is_connected(&self) -> bool;
    async fn connect(&self) -> Result<AddressBookResponse, WalletError>;
    fn disconnect(&self) -> Result<(), WalletError>;
    /// Session left by an earlier connect, if the wallet still has one
    fn persisted_session(&self) -> Option<AddressBookResponse>;
}

/// Signs and broadcasts contract calls.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    async fn call_contract(&self, request: &TransferRequest) -> Result<CallResponse, WalletError>;
}

/// The two wallet collaborators the controller is given.
#[derive(Clone)]
pub struct WalletHandle {
    pub session: Arc<dyn WalletSession>,
    pub caller: Arc<dyn ContractCaller>,
}

impl WalletHandle {
    pub fn new(session: Arc<dyn WalletSession>, caller: Arc<dyn ContractCaller>) -> Self {
        Self { session, caller }
    }

    /// Use one object for both roles
    pub fn from_wallet<W>(wallet: Arc<W>) -> Self
    where
        W: WalletSession + ContractCaller + 'static,
    {
        Self {
            session: wallet.clone(),
            caller: wallet,
        }
    }
}
