//! Typed Clarity values used as contract-call arguments.
//!
//! Only the four shapes the multi-send entry points take are modelled. They
//! serialize to the `{"type": ..., "value": ...}` JSON form wallets accept.

use crate::types::ContractRef;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarityValue {
    /// 128-bit unsigned integer
    Uint(u128),
    /// Standard principal (account address)
    Principal(String),
    /// Contract principal `<issuer>.<name>`
    ContractPrincipal(ContractRef),
    List(Vec<ClarityValue>),
}

impl ClarityValue {
    /// Build a `(list principal ...)` from account addresses, keeping order.
    pub fn principal_list<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ClarityValue::List(
            addresses
                .into_iter()
                .map(|a| ClarityValue::Principal(a.into()))
                .collect(),
        )
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ClarityValue::Uint(_) => "uint",
            ClarityValue::Principal(_) => "principal",
            ClarityValue::ContractPrincipal(_) => "contract_principal",
            ClarityValue::List(_) => "list",
        }
    }

    pub fn as_uint(&self) -> Option<u128> {
        match self {
            ClarityValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ClarityValue]> {
        match self {
            ClarityValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }
}

impl Serialize for ClarityValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", self.type_name())?;
        match self {
            // u128 does not fit a JSON number safely on the JS side
            ClarityValue::Uint(v) => map.serialize_entry("value", &v.to_string())?,
            ClarityValue::Principal(address) => map.serialize_entry("value", address)?,
            ClarityValue::ContractPrincipal(contract) => {
                map.serialize_entry("value", &contract.to_string())?
            }
            ClarityValue::List(items) => map.serialize_entry("value", items)?,
        }
        map.end()
    }
}
