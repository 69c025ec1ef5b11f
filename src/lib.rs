//! Stacksend: batch STX and SIP-010 airdrops through one multi-send contract call.
//!
//! ## Module Structure
//!
//! - `recipients` - Recipient text parsing and batch-size policy
//! - `transfer` - Contract-call construction for native and token batches
//! - `controller` - Wallet session and submission state machine
//! - `wallet` - Wallet traits and address-book decoding
//! - `clarity` - Typed contract-call argument values
//! - `config` / `user_settings` - Networks, contracts, and persisted settings
//!
//! ## Usage
//!
//! ```no_run
//! use stacksend::config::Config;
//! use stacksend::recipients::parse_recipients;
//!
//! let config = Config::default();
//! let list = parse_recipients("SP1\nSP2", config.address_prefix());
//! assert!(!list.is_valid_count(&config.recipient_policy));
//! ```

pub mod clarity;
pub mod config;
pub mod controller;
pub mod error;
pub mod notifications;
pub mod recipients;
pub mod transfer;
pub mod types;
pub mod user_settings;
pub mod utils;
pub mod wallet;

pub use controller::{Controller, ControllerView, ExecuteOutcome, SessionState, SubmissionState};
pub use error::{ConnectionError, FormatError, ValidationError, WalletError};
pub use transfer::{build_transfer_request, TransferRequest};
pub use types::{ContractRef, TransferAmount, TransferMode};
