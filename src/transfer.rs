//! Transfer request construction for the two multi-send entry points.
//!
//! The builder is a pure transform over already-validated recipients: it does
//! not re-check the batch size. Callers check
//! [`RecipientList::is_valid_count`](crate::recipients::RecipientList::is_valid_count) first.

use crate::clarity::ClarityValue;
use crate::config::Network;
use crate::error::FormatError;
use crate::types::{ContractRef, TransferAmount, TransferMode};
use serde::Serialize;
use serde_json::Value;

/// Entry point of the STX multi-send contract: `(airdrop-stx (list principal) uint)`
pub const AIRDROP_STX_FUNCTION: &str = "airdrop-stx";

/// Entry point of the token multi-send contract: `(airdrop-token <ft-trait> (list principal) uint)`
pub const AIRDROP_TOKEN_FUNCTION: &str = "airdrop-token";

/// Micro-STX per STX
pub const STX_DECIMALS: u32 = 6;

/// The deployed batch-transfer contracts a request can target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSendContracts {
    pub stx: ContractRef,
    pub token: ContractRef,
}

/// Which balance changes the wallet lets the signed call make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostConditionMode {
    /// No post-conditions are declared; the signer's confirmation is the only guard
    Allow,
}

/// A resolved contract call, ready to hand to the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub contract: ContractRef,
    pub function_name: &'static str,
    pub function_args: Vec<ClarityValue>,
    pub network: Network,
    pub post_condition_mode: PostConditionMode,
}

/// Wire shape of a contract-call request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestDescriptor<'a> {
    contract: String,
    function_name: &'a str,
    function_args: &'a [ClarityValue],
    network: &'a str,
    post_condition_mode: PostConditionMode,
}

impl TransferRequest {
    /// The request in the JSON form a wallet's `stx_callContract` expects.
    pub fn descriptor(&self) -> Value {
        let descriptor = RequestDescriptor {
            contract: self.contract.to_string(),
            function_name: self.function_name,
            function_args: &self.function_args,
            network: self.network.tag(),
            post_condition_mode: self.post_condition_mode,
        };
        // Only strings, maps and sequences are involved
        serde_json::to_value(descriptor).unwrap_or(Value::Null)
    }

    pub fn recipient_count(&self) -> usize {
        self.function_args
            .iter()
            .find_map(ClarityValue::as_list)
            .map(<[ClarityValue]>::len)
            .unwrap_or(0)
    }
}

/// Build the contract call for one batch.
///
/// Native amounts are scaled to micro-STX with truncation below the sixth
/// decimal. Token amounts go through unscaled: the token's decimals are not
/// known here, so the caller is responsible for entering base units.
pub fn build_transfer_request(
    mode: TransferMode,
    recipients: &[String],
    amount: &TransferAmount,
    token_contract: Option<&str>,
    contracts: &MultiSendContracts,
    network: Network,
) -> Result<TransferRequest, FormatError> {
    let recipient_list = ClarityValue::principal_list(recipients.iter().cloned());

    let (contract, function_name, function_args) = match mode {
        TransferMode::Native => {
            let micro_stx = amount.scaled(STX_DECIMALS)?;
            // Amounts below one micro-STX truncate to nothing
            if micro_stx == 0 {
                return Err(FormatError::NonPositiveAmount);
            }
            (
                contracts.stx.clone(),
                AIRDROP_STX_FUNCTION,
                vec![recipient_list, ClarityValue::Uint(micro_stx)],
            )
        }
        TransferMode::Token => {
            let token_input = token_contract
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or(FormatError::MissingTokenContract)?;
            let token = ContractRef::parse(token_input)?;
            let units = amount.whole_units()?;
            (
                contracts.token.clone(),
                AIRDROP_TOKEN_FUNCTION,
                vec![
                    ClarityValue::ContractPrincipal(token),
                    recipient_list,
                    ClarityValue::Uint(units),
                ],
            )
        }
    };

    Ok(TransferRequest {
        contract,
        function_name,
        function_args,
        network,
        post_condition_mode: PostConditionMode::Allow,
    })
}
