use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::recipients::RecipientPolicy;
use crate::transfer::MultiSendContracts;
use crate::types::ContractRef;
use crate::user_settings::UserSettings;

/// Network tag carried on every contract call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn tag(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            other => Err(anyhow!("Unknown network '{}': expected mainnet or testnet", other)),
        }
    }
}

/// A Stacks network with its address convention, native asset, and known deployments.
#[derive(Clone, Debug)]
pub struct StacksNetwork {
    pub label: &'static str,
    pub network: Network,
    /// Prefix every standard principal on this network starts with
    pub address_prefix: &'static str,
    pub native_token: &'static str,
    pub explorer_url: &'static str,
    pub stx_multi_send: Option<&'static str>,
    pub token_multi_send: Option<&'static str>,
}

/// Issuer of the deployed multi-send contracts on mainnet
pub const MULTI_SEND_ISSUER: &str = "SP32YN03PMDGXQA9HYEZS2WBAT32AZKDJTBAPF4T";

pub const NETWORKS: &[StacksNetwork] = &[
    StacksNetwork {
        label: "Stacks",
        network: Network::Mainnet,
        address_prefix: "SP",
        native_token: "STX",
        explorer_url: "https://explorer.hiro.so",
        stx_multi_send: Some("SP32YN03PMDGXQA9HYEZS2WBAT32AZKDJTBAPF4T.stx-multi-send"),
        token_multi_send: Some("SP32YN03PMDGXQA9HYEZS2WBAT32AZKDJTBAPF4T.token-multi-send"),
    },
    StacksNetwork {
        label: "Stacks Testnet",
        network: Network::Testnet,
        address_prefix: "ST",
        native_token: "STX",
        explorer_url: "https://explorer.hiro.so",
        stx_multi_send: None,
        token_multi_send: None,
    },
];

/// Find the table entry for a network
pub fn find_network(network: Network) -> &'static StacksNetwork {
    // NETWORKS has one entry per variant
    NETWORKS
        .iter()
        .find(|n| n.network == network)
        .unwrap_or(&NETWORKS[0])
}

/// Get the full URL to view a transaction on the block explorer
pub fn get_tx_explorer_url(explorer_base: &str, network: Network, txid: &str) -> Result<String> {
    let mut url = Url::parse(explorer_base)
        .with_context(|| format!("Invalid explorer URL '{}'", explorer_base))?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Explorer URL '{}' cannot carry a path", explorer_base))?
        .pop_if_empty()
        .push("txid")
        .push(txid);
    url.query_pairs_mut().append_pair("chain", network.tag());
    Ok(url.to_string())
}

#[derive(Clone, Debug)]
pub struct Config {
    pub network: Network,
    pub explorer_url: String,
    pub recipient_policy: RecipientPolicy,
    pub stx_multi_send: Option<ContractRef>,
    pub token_multi_send: Option<ContractRef>,
}

impl Config {
    pub fn from_network(network: Network) -> Self {
        let entry = find_network(network);
        Self {
            network,
            explorer_url: entry.explorer_url.to_string(),
            recipient_policy: RecipientPolicy::default(),
            // Table entries are well-formed constants
            stx_multi_send: entry.stx_multi_send.and_then(|c| ContractRef::parse(c).ok()),
            token_multi_send: entry.token_multi_send.and_then(|c| ContractRef::parse(c).ok()),
        }
    }

    /// Create config from persisted user settings alone
    pub fn from_settings(settings: &UserSettings) -> Result<Self> {
        Self::resolve(settings, None, |_| None)
    }

    /// Build the runtime config: settings, then `STACKSEND_*` environment
    /// variables, then an explicit network choice from the command line.
    pub fn load(settings: &UserSettings, network: Option<Network>) -> Result<Self> {
        Self::resolve(settings, network, |key| env::var(key).ok())
    }

    /// The network is picked before any contract override is applied, so
    /// overrides always land on the final network.
    fn resolve(
        settings: &UserSettings,
        network: Option<Network>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let network = match network {
            Some(network) => network,
            None => match lookup("STACKSEND_NETWORK") {
                Some(value) => value.parse()?,
                None => settings.selected_network,
            },
        };
        Self::from_network(network)
            .with_settings(settings)?
            .with_overrides(lookup)
    }

    fn with_settings(mut self, settings: &UserSettings) -> Result<Self> {
        self.recipient_policy = RecipientPolicy::new(settings.min_recipients, settings.max_recipients);
        if let Some(contract) = settings.get_stx_contract_override() {
            self.stx_multi_send = Some(
                ContractRef::parse(contract).context("Invalid STX multi-send contract in settings")?,
            );
        }
        if let Some(contract) = settings.get_token_contract_override() {
            self.token_multi_send = Some(
                ContractRef::parse(contract).context("Invalid token multi-send contract in settings")?,
            );
        }
        Ok(self)
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(min) = lookup("STACKSEND_MIN_RECIPIENTS") {
            self.recipient_policy.min = min
                .trim()
                .parse()
                .with_context(|| format!("Invalid STACKSEND_MIN_RECIPIENTS '{}'", min))?;
        }
        if let Some(max) = lookup("STACKSEND_MAX_RECIPIENTS") {
            self.recipient_policy.max = max
                .trim()
                .parse()
                .with_context(|| format!("Invalid STACKSEND_MAX_RECIPIENTS '{}'", max))?;
        }
        if let Some(contract) = lookup("STACKSEND_STX_CONTRACT") {
            self.stx_multi_send = Some(ContractRef::parse(&contract)?);
        }
        if let Some(contract) = lookup("STACKSEND_TOKEN_CONTRACT") {
            self.token_multi_send = Some(ContractRef::parse(&contract)?);
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        let policy = &self.recipient_policy;
        if policy.min == 0 || policy.min > policy.max {
            return Err(anyhow!(
                "Invalid recipient bounds {}..={}: minimum must be at least 1 and not above the maximum",
                policy.min,
                policy.max
            ));
        }
        Ok(())
    }

    pub fn address_prefix(&self) -> &'static str {
        find_network(self.network).address_prefix
    }

    pub fn native_token(&self) -> &'static str {
        find_network(self.network).native_token
    }

    pub fn network_label(&self) -> &'static str {
        find_network(self.network).label
    }

    /// Both multi-send contracts, or an error naming the missing one.
    pub fn multi_send_contracts(&self) -> Result<MultiSendContracts> {
        let stx = self.stx_multi_send.clone().ok_or_else(|| {
            anyhow!(
                "No STX multi-send contract known for {}. Set STACKSEND_STX_CONTRACT",
                self.network
            )
        })?;
        let token = self.token_multi_send.clone().ok_or_else(|| {
            anyhow!(
                "No token multi-send contract known for {}. Set STACKSEND_TOKEN_CONTRACT",
                self.network
            )
        })?;
        Ok(MultiSendContracts { stx, token })
    }

    pub fn tx_explorer_url(&self, txid: &str) -> Result<String> {
        get_tx_explorer_url(&self.explorer_url, self.network, txid)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_network(Network::Mainnet)
    }
}
