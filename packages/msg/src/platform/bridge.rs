//! External-chain bridge entities.

use crate::ids::{DepositId, SessionId, WithdrawalId};
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Binary, Decimal, Timestamp, Uint128};
use std::fmt;

/// A supported external chain.
#[cw_serde]
pub struct ExternalChain {
    /// Chain identifier, e.g. `ethereum`
    pub chain_id: String,
    /// Whether bridging to/from this chain is enabled
    pub enabled: bool,
    /// Minimum external deposit amount
    pub min_deposit: Uint128,
    /// Maximum external deposit amount
    pub max_deposit: Uint128,
}

/// A supported asset on an external chain.
#[cw_serde]
pub struct ExternalAsset {
    /// Chain the asset lives on
    pub chain_id: String,
    /// External asset symbol
    pub asset: String,
    /// Whether bridging this asset is enabled
    pub enabled: bool,
    /// Internal denom minted for deposits
    pub internal_denom: String,
    /// Internal units per external unit
    pub conversion_rate: Decimal,
    /// Rate-limit window duration override, seconds
    pub rate_limit_window: Option<u64>,
    /// Rate-limit capacity override, internal units
    pub rate_limit_max: Option<Uint128>,
}

/// Deposit lifecycle.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum DepositStatus {
    /// Observed, no approvals yet
    Pending,
    /// At least one approval received
    Attesting,
    /// Threshold reached, funds minted and delivered
    Completed,
    /// Terminally refused, e.g. banned recipient
    Rejected,
}

impl DepositStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, DepositStatus::Completed | DepositStatus::Rejected)
    }
}

impl fmt::Display for DepositStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            DepositStatus::Pending => "pending",
            DepositStatus::Attesting => "attesting",
            DepositStatus::Completed => "completed",
            DepositStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// An observed external deposit.
#[cw_serde]
pub struct Deposit {
    /// Unique deposit id
    pub deposit_id: DepositId,
    /// Source chain
    pub chain_id: String,
    /// External asset symbol
    pub asset: String,
    /// External transaction hash, unique per chain
    pub external_tx_hash: String,
    /// External block height of the deposit
    pub external_block_height: u64,
    /// External sender, opaque
    pub sender: String,
    /// Internal recipient
    pub recipient: Addr,
    /// Amount on the external chain
    pub external_amount: Uint128,
    /// Amount to mint internally
    pub converted_amount: Uint128,
    /// Lifecycle status
    pub status: DepositStatus,
    /// Approvals needed to complete
    pub required_attestations: u32,
    /// Validators that approved, in attestation order
    pub attested_by: Vec<Addr>,
    /// Observation time
    pub created_at: Timestamp,
    /// Completion time
    pub completed_at: Option<Timestamp>,
}

impl Deposit {
    /// Approvals observed so far.
    pub fn observed_attestations(&self) -> u32 {
        self.attested_by.len() as u32
    }

    /// Whether this validator already attested.
    pub fn has_attested(&self, validator: &Addr) -> bool {
        self.attested_by.iter().any(|v| v == validator)
    }
}

/// Withdrawal lifecycle.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum WithdrawalStatus {
    /// Escrowed, timelock running
    Pending,
    /// Alias state while the timelock runs
    Timelocked,
    /// Timelock elapsed, awaiting a signing session
    Ready,
    /// A tss session is collecting shares
    Signing,
    /// Threshold signature produced, escrow burned
    Signed,
    /// Broadcast confirmed by the shell
    Completed,
    /// Signing failed
    Failed,
    /// Cancelled before signing
    Cancelled,
    /// Signing session timed out
    Timeout,
    /// Escrow returned to the sender
    Refunded,
}

impl WithdrawalStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Completed
                | WithdrawalStatus::Cancelled
                | WithdrawalStatus::Refunded
        )
    }

    /// Whether the refund path is open.
    pub fn refundable(self) -> bool {
        matches!(self, WithdrawalStatus::Failed | WithdrawalStatus::Timeout)
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Timelocked => "timelocked",
            WithdrawalStatus::Ready => "ready",
            WithdrawalStatus::Signing => "signing",
            WithdrawalStatus::Signed => "signed",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Failed => "failed",
            WithdrawalStatus::Cancelled => "cancelled",
            WithdrawalStatus::Timeout => "timeout",
            WithdrawalStatus::Refunded => "refunded",
        };
        write!(f, "{s}")
    }
}

/// A requested withdrawal to an external chain.
#[cw_serde]
pub struct Withdrawal {
    /// Unique withdrawal id
    pub withdrawal_id: WithdrawalId,
    /// Destination chain
    pub chain_id: String,
    /// External asset symbol
    pub asset: String,
    /// Internal sender whose funds are escrowed
    pub sender: Addr,
    /// External recipient, opaque
    pub recipient: String,
    /// Escrowed internal amount, gross of fee
    pub internal_amount: Uint128,
    /// Amount to release externally
    pub external_amount: Uint128,
    /// Bridge fee retained, internal units
    pub fee: Uint128,
    /// When the timelock lapses
    pub timelock_expiry: Timestamp,
    /// Lifecycle status
    pub status: WithdrawalStatus,
    /// Signing session, once one is opened
    pub tss_session_id: Option<SessionId>,
    /// Request time
    pub created_at: Timestamp,
}

/// Tss session lifecycle.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum SessionStatus {
    /// Created, no shares yet
    Pending,
    /// Collecting shares
    Active,
    /// Combined signature produced
    Completed,
    /// Session failed
    Failed,
    /// Deadline passed before threshold
    Timeout,
}

impl SessionStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Timeout
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Timeout => "timeout",
        };
        write!(f, "{s}")
    }
}

/// A signature share submitted by a participant. Shares are opaque to the
/// core; only their count matters.
#[cw_serde]
pub struct SignatureShare {
    /// Submitting validator
    pub validator: Addr,
    /// Opaque share bytes
    pub data: Binary,
    /// Submission time
    pub submitted_at: Timestamp,
}

/// A threshold-signature coordination session.
#[cw_serde]
pub struct TssSession {
    /// Unique session id
    pub session_id: SessionId,
    /// Withdrawal being signed
    pub withdrawal_id: WithdrawalId,
    /// Destination chain
    pub chain_id: String,
    /// Eligible participants at session creation
    pub participants: Vec<Addr>,
    /// Shares required to combine
    pub required_sigs: u32,
    /// Session deadline
    pub timeout_at: Timestamp,
    /// Deterministic serialisation of what is being signed
    pub message: Binary,
    /// Shares received, at most one per participant
    pub shares: Vec<SignatureShare>,
    /// Combined signature, once produced
    pub combined_signature: Option<Binary>,
    /// Lifecycle status
    pub status: SessionStatus,
}

impl TssSession {
    /// Whether this validator is a session participant.
    pub fn is_participant(&self, validator: &Addr) -> bool {
        self.participants.iter().any(|v| v == validator)
    }

    /// Whether this validator already submitted a share.
    pub fn has_submitted(&self, validator: &Addr) -> bool {
        self.shares.iter().any(|s| &s.validator == validator)
    }
}

/// One rolling rate-limit window for a (chain, asset) pair.
#[cw_serde]
pub struct RateLimitWindow {
    /// Window start, seconds
    pub window_start: u64,
    /// Window length, seconds
    pub window_duration: u64,
    /// Amount accepted within the window, internal units
    pub used_amount: Uint128,
    /// Transactions accepted within the window
    pub tx_count: u64,
    /// Capacity of the window, internal units
    pub max_amount: Uint128,
}

/// Bridge operations the circuit breaker can individually forbid.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum BridgeOp {
    /// Observing and completing deposits
    Deposit,
    /// Requesting withdrawals
    Withdraw,
    /// Submitting attestations
    Attest,
}

impl fmt::Display for BridgeOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            BridgeOp::Deposit => "deposit",
            BridgeOp::Withdraw => "withdraw",
            BridgeOp::Attest => "attest",
        };
        write!(f, "{s}")
    }
}

/// The singleton bridge circuit breaker.
#[cw_serde]
#[derive(Default)]
pub struct CircuitBreaker {
    /// Master switch; individual flags only apply while enabled
    pub enabled: bool,
    /// Why the breaker was engaged
    pub reason: Option<String>,
    /// Who engaged it
    pub triggered_by: Option<Addr>,
    /// Deposits allowed
    pub allow_deposit: bool,
    /// Withdrawals allowed
    pub allow_withdraw: bool,
    /// Attestations allowed
    pub allow_attest: bool,
    /// Auto-disable time; None means until governance clears it
    pub expires_at: Option<Timestamp>,
}

impl CircuitBreaker {
    /// Whether `op` may proceed at `now`. An expired breaker allows
    /// everything.
    pub fn allows(&self, op: BridgeOp, now: Timestamp) -> bool {
        if !self.enabled {
            return true;
        }
        if let Some(expires_at) = self.expires_at {
            if now > expires_at {
                return true;
            }
        }
        match op {
            BridgeOp::Deposit => self.allow_deposit,
            BridgeOp::Withdraw => self.allow_withdraw,
            BridgeOp::Attest => self.allow_attest,
        }
    }

    /// Whether the breaker has lapsed and should be cleared by the sweep.
    pub fn lapsed(&self, now: Timestamp) -> bool {
        self.enabled && self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

/// Events
pub mod events {
    use super::*;
    use crate::constants::event_key;
    use crate::event::PlatformEventExt;
    use cosmwasm_std::Event;

    /// A deposit was observed.
    pub struct DepositObservedEvent {
        /// Unique deposit id
        pub deposit_id: DepositId,
        /// Source chain
        pub chain_id: String,
        /// External asset
        pub asset: String,
        /// External tx hash
        pub tx_hash: String,
        /// Internal amount to mint at completion
        pub converted_amount: Uint128,
        /// Approvals needed
        pub required_attestations: u32,
    }

    impl From<DepositObservedEvent> for Event {
        fn from(src: DepositObservedEvent) -> Self {
            Event::new("deposit-observed")
                .add_attribute(event_key::DEPOSIT_ID, src.deposit_id.to_string())
                .add_attribute(event_key::CHAIN, src.chain_id)
                .add_attribute(event_key::ASSET, src.asset)
                .add_attribute(event_key::TX_HASH, src.tx_hash)
                .add_attribute(event_key::INTERNAL_AMOUNT, src.converted_amount.to_string())
                .add_attribute(event_key::REQUIRED, src.required_attestations.to_string())
        }
    }

    /// A validator attested a deposit.
    pub struct DepositAttestedEvent {
        /// The deposit
        pub deposit_id: DepositId,
        /// Attesting validator
        pub validator: Addr,
        /// Approvals so far
        pub attestations: u32,
        /// Approvals needed
        pub required: u32,
    }

    impl From<DepositAttestedEvent> for Event {
        fn from(src: DepositAttestedEvent) -> Self {
            Event::new("deposit-attested")
                .add_attribute(event_key::DEPOSIT_ID, src.deposit_id.to_string())
                .add_attribute(event_key::VALIDATOR, src.validator.to_string())
                .add_attribute(event_key::ATTESTATIONS, src.attestations.to_string())
                .add_attribute(event_key::REQUIRED, src.required.to_string())
        }
    }

    /// A deposit reached a terminal state.
    pub struct DepositSettledEvent {
        /// The deposit
        pub deposit_id: DepositId,
        /// Completed or Rejected
        pub status: DepositStatus,
        /// Recipient credited on completion
        pub recipient: Addr,
        /// Internal amount minted on completion
        pub minted: Uint128,
    }

    impl From<DepositSettledEvent> for Event {
        fn from(src: DepositSettledEvent) -> Self {
            Event::new("deposit-settled")
                .add_attribute(event_key::DEPOSIT_ID, src.deposit_id.to_string())
                .add_attribute(event_key::STATUS, src.status.to_string())
                .add_attribute(event_key::RECIPIENT, src.recipient.to_string())
                .add_attribute(event_key::AMOUNT, src.minted.to_string())
        }
    }

    /// A withdrawal was requested.
    pub struct WithdrawalRequestedEvent {
        /// Unique withdrawal id
        pub withdrawal_id: WithdrawalId,
        /// Destination chain
        pub chain_id: String,
        /// Escrowed internal amount
        pub internal_amount: Uint128,
        /// External amount to release
        pub external_amount: Uint128,
        /// Bridge fee retained
        pub fee: Uint128,
        /// Timelock expiry
        pub timelock_expiry: Timestamp,
    }

    impl From<WithdrawalRequestedEvent> for Event {
        fn from(src: WithdrawalRequestedEvent) -> Self {
            Event::new("withdrawal-requested")
                .add_attribute(event_key::WITHDRAWAL_ID, src.withdrawal_id.to_string())
                .add_attribute(event_key::CHAIN, src.chain_id)
                .add_attribute(event_key::INTERNAL_AMOUNT, src.internal_amount.to_string())
                .add_attribute(event_key::EXTERNAL_AMOUNT, src.external_amount.to_string())
                .add_attribute(event_key::FEE, src.fee.to_string())
                .add_attribute(
                    event_key::EXPIRES_AT,
                    src.timelock_expiry.nanos().to_string(),
                )
        }
    }

    /// A withdrawal changed status.
    pub struct WithdrawalStatusEvent {
        /// The withdrawal
        pub withdrawal_id: WithdrawalId,
        /// New status
        pub status: WithdrawalStatus,
    }

    impl From<WithdrawalStatusEvent> for Event {
        fn from(src: WithdrawalStatusEvent) -> Self {
            Event::new("withdrawal-status")
                .add_attribute(event_key::WITHDRAWAL_ID, src.withdrawal_id.to_string())
                .add_attribute(event_key::STATUS, src.status.to_string())
        }
    }

    impl TryFrom<Event> for WithdrawalStatusEvent {
        type Error = anyhow::Error;

        fn try_from(evt: Event) -> Result<Self, Self::Error> {
            Ok(WithdrawalStatusEvent {
                withdrawal_id: WithdrawalId::new(evt.u64_attr(event_key::WITHDRAWAL_ID)?),
                status: evt.json_attr(event_key::STATUS).or_else(|_| {
                    evt.map_attr_result(event_key::STATUS, |s| {
                        serde_json::from_str(&format!("\"{s}\"")).map_err(anyhow::Error::from)
                    })
                })?,
            })
        }
    }

    /// A tss session opened.
    pub struct SessionOpenedEvent {
        /// Unique session id
        pub session_id: SessionId,
        /// Withdrawal being signed
        pub withdrawal_id: WithdrawalId,
        /// Participant count
        pub participants: u32,
        /// Shares required
        pub required_sigs: u32,
    }

    impl From<SessionOpenedEvent> for Event {
        fn from(src: SessionOpenedEvent) -> Self {
            Event::new("tss-session-opened")
                .add_attribute(event_key::SESSION_ID, src.session_id.to_string())
                .add_attribute(event_key::WITHDRAWAL_ID, src.withdrawal_id.to_string())
                .add_attribute("participants", src.participants.to_string())
                .add_attribute(event_key::REQUIRED, src.required_sigs.to_string())
        }
    }

    /// A tss session reached a terminal state.
    pub struct SessionClosedEvent {
        /// The session
        pub session_id: SessionId,
        /// Terminal status
        pub status: SessionStatus,
        /// Shares collected
        pub shares: u32,
    }

    impl From<SessionClosedEvent> for Event {
        fn from(src: SessionClosedEvent) -> Self {
            Event::new("tss-session-closed")
                .add_attribute(event_key::SESSION_ID, src.session_id.to_string())
                .add_attribute(event_key::STATUS, src.status.to_string())
                .add_attribute("shares", src.shares.to_string())
        }
    }

    /// The circuit breaker changed.
    pub struct CircuitBreakerEvent {
        /// Whether it is now engaged
        pub enabled: bool,
        /// Why
        pub reason: Option<String>,
    }

    impl From<CircuitBreakerEvent> for Event {
        fn from(src: CircuitBreakerEvent) -> Self {
            let mut event = Event::new("circuit-breaker")
                .add_attribute(event_key::ENABLED, src.enabled.to_string());
            if let Some(reason) = src.reason {
                event = event.add_attribute(event_key::REASON, reason);
            }
            event
        }
    }
}
