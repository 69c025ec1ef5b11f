//! Common types shared across modules.

use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which multi-send entry point a batch goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Batch payment of the chain's base asset (STX)
    #[default]
    #[serde(alias = "stx")]
    Native,
    /// Batch payment of a SIP-010 fungible token
    #[serde(alias = "sip10")]
    Token,
}

impl TransferMode {
    pub fn display_name(&self) -> &'static str {
        match self {
            TransferMode::Native => "Native STX",
            TransferMode::Token => "Token",
        }
    }

    /// Unit label shown next to the amount field
    pub fn unit_label(&self) -> &'static str {
        match self {
            TransferMode::Native => "STX",
            TransferMode::Token => "TKN",
        }
    }
}

impl FromStr for TransferMode {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stx" | "native" => Ok(TransferMode::Native),
            "token" | "sip10" | "sip-010" => Ok(TransferMode::Token),
            other => Err(FormatError::UnknownMode(other.to_string())),
        }
    }
}

/// A deployed contract, written `<issuer>.<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractRef {
    pub issuer: String,
    pub name: String,
}

impl ContractRef {
    pub fn new(issuer: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            name: name.into(),
        }
    }

    /// Parse `<issuer>.<name>`. Exactly one separator, both parts non-empty.
    pub fn parse(input: &str) -> Result<Self, FormatError> {
        let trimmed = input.trim();
        let mut parts = trimmed.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(issuer), Some(name), None) if !issuer.is_empty() && !name.is_empty() => {
                Ok(Self::new(issuer, name))
            }
            _ => Err(FormatError::MalformedContractRef(trimmed.to_string())),
        }
    }
}

impl fmt::Display for ContractRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.issuer, self.name)
    }
}

impl FromStr for ContractRef {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Positive decimal amount in human units.
///
/// Kept as integer and fractional digits rather than a float so that scaling
/// to base units never picks up binary rounding error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferAmount {
    whole: u128,
    /// Fractional digits with trailing zeros removed
    fraction: String,
}

impl TransferAmount {
    /// Scale to base units with `decimals` places, truncating anything finer.
    pub fn scaled(&self, decimals: u32) -> Result<u128, FormatError> {
        let overflow = || FormatError::AmountOverflow(self.to_string());

        let factor = 10u128.checked_pow(decimals).ok_or_else(overflow)?;
        let mut digits: String = self.fraction.chars().take(decimals as usize).collect();
        while digits.len() < decimals as usize {
            digits.push('0');
        }
        let fractional_units = if digits.is_empty() {
            0
        } else {
            digits.parse::<u128>().map_err(|_| overflow())?
        };

        self.whole
            .checked_mul(factor)
            .and_then(|v| v.checked_add(fractional_units))
            .ok_or_else(overflow)
    }

    /// The amount as an integer, refusing any fractional part.
    pub fn whole_units(&self) -> Result<u128, FormatError> {
        if self.fraction.is_empty() {
            Ok(self.whole)
        } else {
            Err(FormatError::FractionalTokenAmount(self.to_string()))
        }
    }
}

impl FromStr for TransferAmount {
    type Err = FormatError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let invalid = || FormatError::InvalidAmount(trimmed.to_string());

        let (whole_str, fraction_str) = match trimmed.split_once('.') {
            Some((w, f)) => (w, f),
            None => (trimmed, ""),
        };
        if whole_str.is_empty() && fraction_str.is_empty() {
            return Err(invalid());
        }
        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if !all_digits(whole_str) || !all_digits(fraction_str) {
            return Err(invalid());
        }

        let whole = if whole_str.is_empty() {
            0
        } else {
            whole_str
                .parse::<u128>()
                .map_err(|_| FormatError::AmountOverflow(trimmed.to_string()))?
        };
        let fraction = fraction_str.trim_end_matches('0').to_string();

        if whole == 0 && fraction.is_empty() {
            return Err(FormatError::NonPositiveAmount);
        }

        Ok(Self { whole, fraction })
    }
}

impl From<u64> for TransferAmount {
    fn from(value: u64) -> Self {
        Self {
            whole: value as u128,
            fraction: String::new(),
        }
    }
}

impl Default for TransferAmount {
    fn default() -> Self {
        Self::from(1)
    }
}

impl fmt::Display for TransferAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fraction.is_empty() {
            write!(f, "{}", self.whole)
        } else {
            write!(f, "{}.{}", self.whole, self.fraction)
        }
    }
}
