//! Session and submission control.
//!
//! The controller owns the form inputs, the wallet session, and the state of
//! the current submission attempt. Presentation reads cloned snapshots and
//! drives it through the setters and the two `handle_*` actions.

use crate::config::Config;
use crate::error::{ConnectionError, ValidationError, WalletError};
use crate::notifications::{push_notification, NotificationEntry};
use crate::recipients::parse_recipients;
use crate::transfer::{build_transfer_request, MultiSendContracts, TransferRequest};
use crate::types::{TransferAmount, TransferMode};
use crate::utils;
use crate::wallet::{AddressBookResponse, CallResponse, WalletHandle};
use anyhow::Result;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Wallet connection as seen by the app
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub connected: bool,
    pub account_address: Option<String>,
}

impl SessionState {
    fn from_response(response: Option<&AddressBookResponse>, native_symbol: &str) -> Self {
        Self {
            connected: true,
            account_address: response
                .and_then(|r| r.native_address(native_symbol))
                .map(str::to_string),
        }
    }

    /// Label for the connect button
    pub fn display_label(&self) -> String {
        match &self.account_address {
            Some(address) => utils::short_address(address),
            None if self.connected => "Connected".to_string(),
            None => "Connect Wallet".to_string(),
        }
    }
}

/// Where the current submission attempt stands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    /// Request handed to the wallet; waiting for the user to sign
    AwaitingWalletApproval,
    /// Accepted by the network under this transaction id
    Broadcast(String),
    /// The attempt produced no transaction id
    Failed,
}

impl SubmissionState {
    pub fn is_awaiting(&self) -> bool {
        matches!(self, SubmissionState::AwaitingWalletApproval)
    }

    pub fn txid(&self) -> Option<&str> {
        match self {
            SubmissionState::Broadcast(txid) => Some(txid),
            _ => None,
        }
    }
}

/// What a call to [`Controller::handle_execute`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// A submission or connect detour is already waiting on the wallet;
    /// nothing was built
    Busy,
    /// Input was refused before the wallet was contacted
    Rejected(ValidationError),
    /// No session was active, so the connect flow ran instead. Submission must
    /// be triggered again.
    ConnectRequired(Result<SessionState, ConnectionError>),
    Broadcast(String),
    Failed(WalletError),
}

/// Everything presentation needs to render the form
#[derive(Debug, Clone)]
pub struct ControllerView {
    pub address_list: Vec<String>,
    pub is_valid_count: bool,
    pub duplicates: Vec<String>,
    pub amount: TransferAmount,
    pub active_mode: TransferMode,
    pub token_contract_input: String,
    pub submission_state: SubmissionState,
    pub session_state: SessionState,
    /// A connect started by a submit is still waiting on the wallet
    pub connecting: bool,
    /// Valid batch and nothing in flight
    pub can_submit: bool,
    /// Explorer link for the last broadcast
    pub explorer_url: Option<String>,
}

#[derive(Debug, Default)]
struct FormState {
    address_input: String,
    amount: TransferAmount,
    mode: TransferMode,
    token_contract_input: String,
}

#[derive(Debug, Default)]
struct ControllerState {
    form: FormState,
    session: SessionState,
    submission: SubmissionState,
    connecting: bool,
    notifications: VecDeque<NotificationEntry>,
}

/// Either a request ready for the wallet or a detour through connect
enum Gate {
    Submit(TransferRequest),
    Connect,
}

/// Cloneable handle; all clones share one state.
#[derive(Clone)]
pub struct Controller {
    state: Arc<Mutex<ControllerState>>,
    wallet: WalletHandle,
    contracts: MultiSendContracts,
    config: Config,
    address_prefix: &'static str,
    native_symbol: &'static str,
}

impl Controller {
    /// Create the controller and rehydrate any session the wallet persisted.
    pub fn mount(config: &Config, wallet: WalletHandle) -> Result<Self> {
        let contracts = config.multi_send_contracts()?;
        let native_symbol = config.native_token();

        let session = if wallet.session.is_connected() {
            let persisted = wallet.session.persisted_session();
            let session = SessionState::from_response(persisted.as_ref(), native_symbol);
            info!(
                "Rehydrated wallet session for {}",
                session.account_address.as_deref().unwrap_or("<no STX address>")
            );
            session
        } else {
            debug!("No active wallet session to rehydrate");
            SessionState::default()
        };

        let state = ControllerState {
            session,
            ..ControllerState::default()
        };

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            wallet,
            contracts,
            config: config.clone(),
            address_prefix: config.address_prefix(),
            native_symbol,
        })
    }

    // ==================== form inputs ====================

    pub async fn set_address_input(&self, text: impl Into<String>) {
        self.state.lock().await.form.address_input = text.into();
    }

    pub async fn set_amount(&self, amount: TransferAmount) {
        self.state.lock().await.form.amount = amount;
    }

    /// Switch transfer mode. A finished outcome is cleared; an in-flight
    /// approval is left alone.
    pub async fn set_mode(&self, mode: TransferMode) {
        let mut state = self.state.lock().await;
        state.form.mode = mode;
        if !state.submission.is_awaiting() {
            state.submission = SubmissionState::Idle;
        }
    }

    pub async fn set_token_contract_input(&self, text: impl Into<String>) {
        self.state.lock().await.form.token_contract_input = text.into();
    }

    // ==================== read side ====================

    pub async fn snapshot(&self) -> ControllerView {
        let state = self.state.lock().await;
        let recipients = parse_recipients(&state.form.address_input, self.address_prefix);
        let is_valid_count = recipients.is_valid_count(&self.config.recipient_policy);
        let explorer_url = state
            .submission
            .txid()
            .and_then(|txid| self.config.tx_explorer_url(txid).ok());
        let in_flight = state.submission.is_awaiting() || state.connecting;

        ControllerView {
            duplicates: recipients.duplicates().into_iter().map(str::to_string).collect(),
            address_list: recipients.into_addresses(),
            is_valid_count,
            amount: state.form.amount.clone(),
            active_mode: state.form.mode,
            token_contract_input: state.form.token_contract_input.clone(),
            submission_state: state.submission.clone(),
            session_state: state.session.clone(),
            connecting: state.connecting,
            can_submit: is_valid_count && !in_flight,
            explorer_url,
        }
    }

    pub async fn submission_state(&self) -> SubmissionState {
        self.state.lock().await.submission.clone()
    }

    pub async fn session_state(&self) -> SessionState {
        self.state.lock().await.session.clone()
    }

    /// Take all pending notifications, oldest first
    pub async fn drain_notifications(&self) -> Vec<NotificationEntry> {
        self.state.lock().await.notifications.drain(..).collect()
    }

    // ==================== session ====================

    /// Connect when disconnected, disconnect when connected.
    pub async fn handle_connect(&self) -> Result<SessionState, ConnectionError> {
        let connected = self.state.lock().await.session.connected;
        if connected {
            self.disconnect().await?;
            Ok(SessionState::default())
        } else {
            self.connect().await
        }
    }

    pub async fn connect(&self) -> Result<SessionState, ConnectionError> {
        info!("Requesting wallet connection");
        let result = self.wallet.session.connect().await;

        let mut state = self.state.lock().await;
        state.connecting = false;
        match result {
            Ok(response) => {
                let session = SessionState::from_response(Some(&response), self.native_symbol);
                match &session.account_address {
                    Some(address) => info!("Wallet connected as {}", address),
                    None => warn!("Wallet connected but returned no {} address", self.native_symbol),
                }
                push_notification(
                    &mut state.notifications,
                    format!("Wallet connected: {}", session.display_label()),
                );
                state.session = session.clone();
                Ok(session)
            }
            Err(e) => {
                warn!("Wallet connection failed: {}", e);
                let err = ConnectionError(e);
                push_notification(&mut state.notifications, err.to_string());
                Err(err)
            }
        }
    }

    /// Drop the session. Local state is cleared as soon as the wallet accepts.
    pub async fn disconnect(&self) -> Result<(), ConnectionError> {
        let mut state = self.state.lock().await;
        if let Err(e) = self.wallet.session.disconnect() {
            warn!("Wallet disconnect failed: {}", e);
            let err = ConnectionError(e);
            push_notification(&mut state.notifications, err.to_string());
            return Err(err);
        }
        info!("Wallet disconnected");
        state.session = SessionState::default();
        push_notification(&mut state.notifications, "Wallet disconnected");
        Ok(())
    }

    // ==================== submission ====================

    /// Validate the form, then either detour through connect or hand a fresh
    /// request to the wallet and record the outcome.
    pub async fn handle_execute(&self) -> ExecuteOutcome {
        let gate = {
            let mut state = self.state.lock().await;
            if state.submission.is_awaiting() {
                debug!("Submission already awaiting wallet approval; ignoring");
                return ExecuteOutcome::Busy;
            }
            if state.connecting {
                debug!("Wallet connection already pending; ignoring");
                return ExecuteOutcome::Busy;
            }

            match self.prepare(&state.form) {
                Err(e) => {
                    warn!("Submission refused: {}", e);
                    push_notification(&mut state.notifications, e.to_string());
                    return ExecuteOutcome::Rejected(e);
                }
                Ok(_) if !state.session.connected => {
                    state.connecting = true;
                    Gate::Connect
                }
                Ok(request) => {
                    state.submission = SubmissionState::AwaitingWalletApproval;
                    Gate::Submit(request)
                }
            }
        };

        match gate {
            Gate::Connect => {
                info!("No wallet session; starting connect flow instead of submitting");
                ExecuteOutcome::ConnectRequired(self.connect().await)
            }
            Gate::Submit(request) => self.submit(request).await,
        }
    }

    fn prepare(&self, form: &FormState) -> Result<TransferRequest, ValidationError> {
        let recipients = parse_recipients(&form.address_input, self.address_prefix);
        recipients.check_count(&self.config.recipient_policy)?;
        let request = build_transfer_request(
            form.mode,
            recipients.addresses(),
            &form.amount,
            Some(form.token_contract_input.as_str()),
            &self.contracts,
            self.config.network,
        )?;
        Ok(request)
    }

    async fn submit(&self, request: TransferRequest) -> ExecuteOutcome {
        info!(
            "Submitting {}::{} to {} recipients on {}",
            request.contract,
            request.function_name,
            request.recipient_count(),
            request.network
        );
        let result = self.wallet.caller.call_contract(&request).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(CallResponse { txid: Some(txid) }) if !txid.trim().is_empty() => {
                info!("Broadcast transaction {}", txid);
                state.submission = SubmissionState::Broadcast(txid.clone());
                state.form.address_input.clear();
                push_notification(&mut state.notifications, format!("Broadcast successful: {}", txid));
                ExecuteOutcome::Broadcast(txid)
            }
            Ok(_) => {
                warn!("Wallet response carried no transaction id");
                state.submission = SubmissionState::Failed;
                let err = WalletError::Provider("response carried no transaction id".to_string());
                push_notification(&mut state.notifications, format!("Airdrop failed: {}", err));
                ExecuteOutcome::Failed(err)
            }
            Err(e) => {
                warn!("Airdrop failed: {}", e);
                state.submission = SubmissionState::Failed;
                push_notification(&mut state.notifications, format!("Airdrop failed: {}", e));
                ExecuteOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::error::FormatError;
    use crate::wallet::{AddressEntry, ContractCaller, WalletSession};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    const FIVE: &str = "SP1\nSP2\nSP3\nSP4\nSP5";

    /// In-memory wallet with scripted answers
    struct MockWallet {
        connected: AtomicBool,
        persisted: Option<AddressBookResponse>,
        connect_result: std::sync::Mutex<Result<AddressBookResponse, WalletError>>,
        disconnect_fails: AtomicBool,
        call_result: std::sync::Mutex<Result<CallResponse, WalletError>>,
        calls: AtomicUsize,
        last_request: std::sync::Mutex<Option<TransferRequest>>,
        gate: Option<Arc<Notify>>,
        connects: AtomicUsize,
        connect_gate: Option<Arc<Notify>>,
    }

    impl MockWallet {
        fn new() -> Self {
            Self {
                connected: AtomicBool::new(false),
                persisted: None,
                connect_result: std::sync::Mutex::new(Ok(AddressBookResponse::flat(vec![
                    AddressEntry::new("BTC", "bc1qowner"),
                    AddressEntry::new("STX", "SP2OWNERADDRESS9XYZ"),
                ]))),
                disconnect_fails: AtomicBool::new(false),
                call_result: std::sync::Mutex::new(Ok(CallResponse::with_txid("0xfeed"))),
                calls: AtomicUsize::new(0),
                last_request: std::sync::Mutex::new(None),
                gate: None,
                connects: AtomicUsize::new(0),
                connect_gate: None,
            }
        }

        fn connected() -> Self {
            let wallet = Self::new();
            wallet.connected.store(true, Ordering::SeqCst);
            wallet
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> Option<TransferRequest> {
            self.last_request.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WalletSession for MockWallet {
        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn connect(&self) -> Result<AddressBookResponse, WalletError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.connect_gate {
                gate.notified().await;
            }
            let result = self.connect_result.lock().unwrap().clone();
            if result.is_ok() {
                self.connected.store(true, Ordering::SeqCst);
            }
            result
        }

        fn disconnect(&self) -> Result<(), WalletError> {
            if self.disconnect_fails.load(Ordering::SeqCst) {
                return Err(WalletError::Provider("extension unavailable".into()));
            }
            self.connected.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn persisted_session(&self) -> Option<AddressBookResponse> {
            self.persisted.clone()
        }
    }

    #[async_trait]
    impl ContractCaller for MockWallet {
        async fn call_contract(&self, request: &TransferRequest) -> Result<CallResponse, WalletError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.call_result.lock().unwrap().clone()
        }
    }

    fn mount(wallet: &Arc<MockWallet>) -> Controller {
        Controller::mount(&Config::default(), WalletHandle::from_wallet(wallet.clone())).unwrap()
    }

    // ==================== mount / session tests ====================

    #[test]
    fn test_mount_rehydrates_persisted_session() {
        let mut wallet = MockWallet::connected();
        wallet.persisted = Some(AddressBookResponse::keyed([(
            "stx".to_string(),
            vec![AddressEntry::new("STX", "SP3PERSISTED")],
        )]));
        let controller = mount(&Arc::new(wallet));

        let session = tokio_test::block_on(controller.session_state());
        assert!(session.connected);
        assert_eq!(session.account_address.as_deref(), Some("SP3PERSISTED"));
    }

    #[test]
    fn test_mount_without_session() {
        let controller = mount(&Arc::new(MockWallet::new()));
        let session = tokio_test::block_on(controller.session_state());
        assert_eq!(session, SessionState::default());
        assert_eq!(session.display_label(), "Connect Wallet");
    }

    #[test]
    fn test_mount_fails_without_contracts() {
        let config = Config::from_network(Network::Testnet);
        let wallet = Arc::new(MockWallet::new());
        assert!(Controller::mount(&config, WalletHandle::from_wallet(wallet)).is_err());
    }

    #[test]
    fn test_connect_prefers_native_address() {
        let wallet = Arc::new(MockWallet::new());
        let controller = mount(&wallet);

        let session = tokio_test::block_on(controller.connect()).unwrap();
        assert_eq!(session.account_address.as_deref(), Some("SP2OWNERADDRESS9XYZ"));
        assert_eq!(session.display_label(), "SP2OW...9XYZ");
    }

    #[test]
    fn test_connect_failure_leaves_session_unchanged() {
        let wallet = MockWallet::new();
        *wallet.connect_result.lock().unwrap() = Err(WalletError::Rejected);
        let controller = mount(&Arc::new(wallet));

        let result = tokio_test::block_on(controller.connect());
        assert_eq!(result, Err(ConnectionError(WalletError::Rejected)));
        let session = tokio_test::block_on(controller.session_state());
        assert!(!session.connected);
        let notes = tokio_test::block_on(controller.drain_notifications());
        assert!(notes.iter().any(|n| n.message.contains("connection failed")));
    }

    #[test]
    fn test_handle_connect_toggles() {
        let wallet = Arc::new(MockWallet::new());
        let controller = mount(&wallet);

        tokio_test::block_on(async {
            let session = controller.handle_connect().await.unwrap();
            assert!(session.connected);
            let session = controller.handle_connect().await.unwrap();
            assert!(!session.connected);
            assert_eq!(controller.session_state().await, SessionState::default());
        });
        assert!(!wallet.is_connected());
    }

    #[test]
    fn test_disconnect_failure_keeps_session() {
        let wallet = Arc::new(MockWallet::connected());
        wallet.disconnect_fails.store(true, Ordering::SeqCst);
        let controller = mount(&wallet);

        let result = tokio_test::block_on(controller.disconnect());
        assert!(result.is_err());
        assert!(tokio_test::block_on(controller.session_state()).connected);
    }

    // ==================== validation tests ====================

    #[test]
    fn test_four_recipients_never_reach_wallet() {
        let wallet = Arc::new(MockWallet::connected());
        let controller = mount(&wallet);

        let outcome = tokio_test::block_on(async {
            controller.set_address_input("SP1\nSP2\nSP3\nSP4").await;
            let view = controller.snapshot().await;
            assert!(!view.is_valid_count);
            assert!(!view.can_submit);
            controller.handle_execute().await
        });

        assert_eq!(
            outcome,
            ExecuteOutcome::Rejected(ValidationError::RecipientCount { count: 4, min: 5, max: 50 })
        );
        assert_eq!(wallet.calls(), 0);
        assert_eq!(tokio_test::block_on(controller.submission_state()), SubmissionState::Idle);
    }

    #[test]
    fn test_invalid_count_does_not_start_connect() {
        let wallet = Arc::new(MockWallet::new());
        let controller = mount(&wallet);

        let outcome = tokio_test::block_on(controller.handle_execute());
        assert!(matches!(outcome, ExecuteOutcome::Rejected(_)));
        assert!(!wallet.is_connected());
    }

    #[test]
    fn test_malformed_token_rejected_before_wallet() {
        let wallet = Arc::new(MockWallet::new());
        let controller = mount(&wallet);

        let outcome = tokio_test::block_on(async {
            controller.set_mode(TransferMode::Token).await;
            controller.set_address_input(FIVE).await;
            controller.set_token_contract_input("malformed-no-dot").await;
            controller.handle_execute().await
        });

        assert_eq!(
            outcome,
            ExecuteOutcome::Rejected(ValidationError::Format(FormatError::MalformedContractRef(
                "malformed-no-dot".into()
            )))
        );
        assert!(!wallet.is_connected());
        assert_eq!(wallet.calls(), 0);
    }

    // ==================== submission tests ====================

    #[test]
    fn test_disconnected_execute_runs_connect_only() {
        let wallet = Arc::new(MockWallet::new());
        let controller = mount(&wallet);

        let outcome = tokio_test::block_on(async {
            controller.set_address_input(FIVE).await;
            controller.handle_execute().await
        });

        match outcome {
            ExecuteOutcome::ConnectRequired(Ok(session)) => assert!(session.connected),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(wallet.calls(), 0);
        assert_eq!(tokio_test::block_on(controller.submission_state()), SubmissionState::Idle);

        // Second trigger submits
        let outcome = tokio_test::block_on(controller.handle_execute());
        assert_eq!(outcome, ExecuteOutcome::Broadcast("0xfeed".into()));
        assert_eq!(wallet.calls(), 1);
    }

    #[test]
    fn test_native_broadcast_clears_recipients_only() {
        let wallet = Arc::new(MockWallet::connected());
        let controller = mount(&wallet);

        let view = tokio_test::block_on(async {
            controller.set_address_input(FIVE).await;
            controller.set_amount(TransferAmount::from(2)).await;
            let outcome = controller.handle_execute().await;
            assert_eq!(outcome, ExecuteOutcome::Broadcast("0xfeed".into()));
            controller.snapshot().await
        });

        let request = wallet.last_request().unwrap();
        assert_eq!(request.function_name, "airdrop-stx");
        assert_eq!(request.function_args[1].as_uint(), Some(2_000_000));
        assert_eq!(request.recipient_count(), 5);

        assert_eq!(view.submission_state, SubmissionState::Broadcast("0xfeed".into()));
        assert!(view.address_list.is_empty());
        assert_eq!(view.amount, TransferAmount::from(2));
        assert_eq!(view.active_mode, TransferMode::Native);
        assert_eq!(
            view.explorer_url.as_deref(),
            Some("https://explorer.hiro.so/txid/0xfeed?chain=mainnet")
        );
    }

    #[test]
    fn test_token_submission_arguments() {
        let wallet = Arc::new(MockWallet::connected());
        let controller = mount(&wallet);

        tokio_test::block_on(async {
            controller.set_mode(TransferMode::Token).await;
            controller.set_address_input(FIVE).await;
            controller.set_amount(TransferAmount::from(75)).await;
            controller.set_token_contract_input(" SP1ABC.tokenX ").await;
            controller.handle_execute().await;
        });

        let request = wallet.last_request().unwrap();
        assert_eq!(request.function_name, "airdrop-token");
        assert_eq!(request.contract.name, "token-multi-send");
        assert_eq!(request.function_args[2].as_uint(), Some(75));
        let view = tokio_test::block_on(controller.snapshot());
        assert_eq!(view.active_mode, TransferMode::Token);
        assert_eq!(view.token_contract_input, " SP1ABC.tokenX ");
    }

    #[test]
    fn test_wallet_error_marks_failed_and_keeps_form() {
        let wallet = MockWallet::connected();
        *wallet.call_result.lock().unwrap() = Err(WalletError::Rejected);
        let wallet = Arc::new(wallet);
        let controller = mount(&wallet);

        let view = tokio_test::block_on(async {
            controller.set_address_input(FIVE).await;
            let outcome = controller.handle_execute().await;
            assert_eq!(outcome, ExecuteOutcome::Failed(WalletError::Rejected));
            controller.snapshot().await
        });

        assert_eq!(view.submission_state, SubmissionState::Failed);
        assert_eq!(view.address_list.len(), 5);
        assert!(view.explorer_url.is_none());
    }

    #[test]
    fn test_missing_txid_is_failure() {
        let wallet = MockWallet::connected();
        *wallet.call_result.lock().unwrap() = Ok(CallResponse::default());
        let controller = mount(&Arc::new(wallet));

        let outcome = tokio_test::block_on(async {
            controller.set_address_input(FIVE).await;
            controller.handle_execute().await
        });
        assert!(matches!(outcome, ExecuteOutcome::Failed(WalletError::Provider(_))));
        assert_eq!(tokio_test::block_on(controller.submission_state()), SubmissionState::Failed);
    }

    #[test]
    fn test_retry_after_failure_uses_current_form() {
        let wallet = MockWallet::connected();
        *wallet.call_result.lock().unwrap() = Err(WalletError::Provider("network down".into()));
        let wallet = Arc::new(wallet);
        let controller = mount(&wallet);

        tokio_test::block_on(async {
            controller.set_address_input(FIVE).await;
            controller.handle_execute().await;
            *wallet.call_result.lock().unwrap() = Ok(CallResponse::with_txid("0xbeef"));
            controller.set_address_input(format!("{}\nSP6", FIVE)).await;
            let outcome = controller.handle_execute().await;
            assert_eq!(outcome, ExecuteOutcome::Broadcast("0xbeef".into()));
        });

        assert_eq!(wallet.calls(), 2);
        assert_eq!(wallet.last_request().unwrap().recipient_count(), 6);
    }

    #[test]
    fn test_last_txid_kept_until_next_attempt() {
        let wallet = Arc::new(MockWallet::connected());
        let controller = mount(&wallet);

        tokio_test::block_on(async {
            controller.set_address_input(FIVE).await;
            controller.handle_execute().await;
            // Empty form: rejected, previous outcome still shown
            let outcome = controller.handle_execute().await;
            assert!(matches!(outcome, ExecuteOutcome::Rejected(_)));
            assert_eq!(
                controller.submission_state().await,
                SubmissionState::Broadcast("0xfeed".into())
            );
        });
    }

    #[test]
    fn test_set_mode_clears_finished_outcome() {
        let wallet = Arc::new(MockWallet::connected());
        let controller = mount(&wallet);

        tokio_test::block_on(async {
            controller.set_address_input(FIVE).await;
            controller.handle_execute().await;
            controller.set_mode(TransferMode::Token).await;
            assert_eq!(controller.submission_state().await, SubmissionState::Idle);
        });
    }

    #[test]
    fn test_notifications_drain() {
        let wallet = Arc::new(MockWallet::connected());
        let controller = mount(&wallet);

        let notes = tokio_test::block_on(async {
            controller.set_address_input(FIVE).await;
            controller.handle_execute().await;
            controller.drain_notifications().await
        });
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("0xfeed"));
        assert!(tokio_test::block_on(controller.drain_notifications()).is_empty());
    }

    #[tokio::test]
    async fn test_second_submit_while_awaiting_is_ignored() {
        let gate = Arc::new(Notify::new());
        let mut wallet = MockWallet::connected();
        wallet.gate = Some(gate.clone());
        let wallet = Arc::new(wallet);
        let controller = mount(&wallet);
        controller.set_address_input(FIVE).await;

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.handle_execute().await })
        };
        while !controller.submission_state().await.is_awaiting() {
            tokio::task::yield_now().await;
        }

        assert_eq!(controller.handle_execute().await, ExecuteOutcome::Busy);
        assert!(!controller.snapshot().await.can_submit);

        gate.notify_one();
        let outcome = first.await.unwrap();
        assert_eq!(outcome, ExecuteOutcome::Broadcast("0xfeed".into()));
        assert_eq!(wallet.calls(), 1);
    }

    #[tokio::test]
    async fn test_set_mode_does_not_interrupt_approval() {
        let gate = Arc::new(Notify::new());
        let mut wallet = MockWallet::connected();
        wallet.gate = Some(gate.clone());
        let controller = mount(&Arc::new(wallet));
        controller.set_address_input(FIVE).await;

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.handle_execute().await })
        };
        while !controller.submission_state().await.is_awaiting() {
            tokio::task::yield_now().await;
        }
        controller.set_mode(TransferMode::Token).await;
        assert!(controller.submission_state().await.is_awaiting());

        gate.notify_one();
        first.await.unwrap();
        let view = controller.snapshot().await;
        assert_eq!(view.active_mode, TransferMode::Token);
        assert_eq!(view.submission_state, SubmissionState::Broadcast("0xfeed".into()));
    }

    #[tokio::test]
    async fn test_second_submit_while_connecting_is_ignored() {
        let gate = Arc::new(Notify::new());
        let mut wallet = MockWallet::new();
        wallet.connect_gate = Some(gate.clone());
        let wallet = Arc::new(wallet);
        let controller = mount(&wallet);
        controller.set_address_input(FIVE).await;

        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.handle_execute().await })
        };
        while !controller.snapshot().await.connecting {
            tokio::task::yield_now().await;
        }

        assert_eq!(controller.handle_execute().await, ExecuteOutcome::Busy);
        assert!(!controller.snapshot().await.can_submit);

        gate.notify_one();
        let outcome = first.await.unwrap();
        assert!(matches!(outcome, ExecuteOutcome::ConnectRequired(Ok(_))));
        assert_eq!(wallet.connects.load(Ordering::SeqCst), 1);
        assert_eq!(wallet.calls(), 0);

        let view = controller.snapshot().await;
        assert!(!view.connecting);
        assert!(view.can_submit);
    }

    #[test]
    fn test_failed_connect_detour_releases_gate() {
        let wallet = MockWallet::new();
        *wallet.connect_result.lock().unwrap() = Err(WalletError::Rejected);
        let wallet = Arc::new(wallet);
        let controller = mount(&wallet);
        tokio_test::block_on(controller.set_address_input(FIVE));

        let outcome = tokio_test::block_on(controller.handle_execute());
        assert!(matches!(outcome, ExecuteOutcome::ConnectRequired(Err(_))));
        assert!(!tokio_test::block_on(controller.snapshot()).connecting);

        let again = tokio_test::block_on(controller.handle_execute());
        assert!(matches!(again, ExecuteOutcome::ConnectRequired(Err(_))));
        assert_eq!(wallet.connects.load(Ordering::SeqCst), 2);
    }
}
