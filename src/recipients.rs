//! Recipient list parsing.
//!
//! Turns pasted multi-line text into an ordered list of addresses. Parsing
//! never fails; whether the list is usable is a separate, derived check
//! against a [`RecipientPolicy`].

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default minimum batch size
pub const DEFAULT_MIN_RECIPIENTS: usize = 5;

/// Default maximum batch size (keeps the call within block limits)
pub const DEFAULT_MAX_RECIPIENTS: usize = 50;

/// Inclusive bounds on how many recipients a single batch may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientPolicy {
    pub min: usize,
    pub max: usize,
}

impl Default for RecipientPolicy {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_RECIPIENTS,
            max: DEFAULT_MAX_RECIPIENTS,
        }
    }
}

impl RecipientPolicy {
    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn allows(&self, count: usize) -> bool {
        count >= self.min && count <= self.max
    }
}

/// Addresses in input order. Repeats are kept: the same address entered twice
/// is paid twice.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecipientList {
    addresses: Vec<String>,
}

impl RecipientList {
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn into_addresses(self) -> Vec<String> {
        self.addresses
    }

    pub fn is_valid_count(&self, policy: &RecipientPolicy) -> bool {
        policy.allows(self.len())
    }

    /// Same check as [`is_valid_count`](Self::is_valid_count) but with the
    /// reason attached.
    pub fn check_count(&self, policy: &RecipientPolicy) -> Result<(), ValidationError> {
        if self.is_valid_count(policy) {
            Ok(())
        } else {
            Err(ValidationError::RecipientCount {
                count: self.len(),
                min: policy.min,
                max: policy.max,
            })
        }
    }

    /// Addresses that appear more than once, in order of first appearance.
    pub fn duplicates(&self) -> Vec<&str> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for addr in &self.addresses {
            *counts.entry(addr.as_str()).or_insert(0) += 1;
        }

        let mut seen = Vec::new();
        for addr in &self.addresses {
            let addr = addr.as_str();
            if counts.get(addr).copied().unwrap_or(0) > 1 && !seen.contains(&addr) {
                seen.push(addr);
            }
        }
        seen
    }
}

/// Parse one address per line, keeping only lines that start with `prefix`
/// after trimming.
pub fn parse_recipients(raw_text: &str, prefix: &str) -> RecipientList {
    let addresses = raw_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.starts_with(prefix))
        .map(str::to_string)
        .collect();
    RecipientList { addresses }
}
