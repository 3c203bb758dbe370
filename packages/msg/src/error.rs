//! Error handling helpers for the platform core.

use cosmwasm_std::Event;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure to parse a wire-level enum string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised {kind}: {value}")]
pub struct ParseError {
    /// What was being parsed
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

/// An error raised by the platform core
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformError {
    /// Unique identifier for this error
    pub id: ErrorId,
    /// Subsystem the error came from
    pub domain: ErrorDomain,
    /// User friendly description
    pub description: String,
}

/// Unique identifier for an error within the platform.
///
/// The taxonomy is fixed; new conditions reuse the closest existing id.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorId {
    // input
    InvalidOrderSide,
    InvalidOrderType,
    InvalidTimeInForce,
    InvalidMarket,
    InvalidOrderId,
    InvalidReport,
    InvalidReportTarget,
    InvalidAppeal,
    InvalidAsset,
    SameAssetSwap,
    InvalidStrategyId,
    InvalidPlan,

    // authorization
    Unauthorized,
    NotDisputeParticipant,
    NotCounterparty,
    NotAssignedReviewer,
    AppealerNotParticipant,
    ReporterTierTooLow,
    StakeAgeTooLow,
    NotValidator,
    InsufficientTier,

    // state
    MarketInactive,
    MarketAlreadyExists,
    MarketNotFound,
    OrderNotFound,
    CannotCancelOrder,
    EscrowNotFound,
    EscrowAlreadyResolved,
    ReportNotFound,
    ReportAlreadyResolved,
    ReportNotPendingReturn,
    AlreadyRejected,
    VoluntaryReturnAlreadyDone,
    VoluntaryReturnExpired,
    ReviewerAlreadyVoted,
    EvidenceLockedAfterVoting,
    ReportDeadlinePassed,
    CannotAppeal,
    AppealLevelMaxed,
    AppealNotFound,
    AppealAlreadyResolved,
    AppealDeadlinePassed,
    AppealReviewerAlreadyVoted,
    WithdrawalNotFound,
    WithdrawalNotReady,
    TssSessionNotFound,
    TssSessionCompleted,
    TssSessionFailed,
    TssTimeout,
    DepositNotFound,
    DepositCompleted,
    DepositRejected,
    DuplicateDeposit,
    AlreadyAttested,
    AttestationMismatch,
    PlanNotFound,
    PlanNotClaimable,
    ClaimLocked,

    // abuse / gating
    ReporterBanned,
    ReporterRateLimited,
    ReporterCooldown,
    RetaliatoryReportNotAllowed,
    ReportCooldownActive,
    AddressBanned,
    CircuitBreakerActive,
    RateLimitExceeded,
    BridgingDisabled,
    ChainNotSupported,
    AssetNotSupported,

    // resource
    InsufficientFunds,
    InsufficientBalance,
    InsufficientFundsForReturn,
    OrderTooLarge,
    OrderTooSmall,
    DailyLimitExceeded,
    AmountTooSmall,
    AmountTooLarge,
    MintFailed,
    RecoveryFailed,
    TradingHalted,

    // internal
    External,
    StakingKeeperNotSet,
    NotImplemented,
    InsufficientReviewerTier,
    Any,
}

/// Subsystem within the platform the error originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum ErrorDomain {
    Dex,
    Fees,
    Liquidity,
    Escrow,
    Report,
    Appeal,
    Recovery,
    History,
    Bridge,
    Inheritance,
    Config,
    Default,
}

/// Generate a [PlatformError] and wrap it up in an anyhow error
#[macro_export]
macro_rules! platform_anyhow {
    ($id:expr, $domain:expr, $($t:tt)*) => {{
        anyhow::Error::new($crate::error::PlatformError {
            id: $id,
            domain: $domain,
            description: format!($($t)*),
        })
    }};
}

/// Ensure a condition is true, otherwise return from the function with an error.
#[macro_export]
macro_rules! platform_ensure {
    ($val:expr, $id:expr, $domain:expr, $($t:tt)*) => {{
        if !$val {
            return Err(anyhow::Error::new($crate::error::PlatformError {
                id: $id,
                domain: $domain,
                description: format!($($t)*),
            }));
        }
    }};
}

/// Return early with the given platform error
#[macro_export]
macro_rules! platform_bail {
    ($id:expr, $domain:expr, $($t:tt)*) => {{
        return Err(anyhow::Error::new($crate::error::PlatformError {
            id: $id,
            domain: $domain,
            description: format!($($t)*),
        }));
    }};
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            serde_json::to_string_pretty(&self).map_err(|_| fmt::Error)?
        )
    }
}

impl fmt::Debug for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl std::error::Error for PlatformError {}

impl PlatformError {
    /// Include error information into an event
    pub fn mixin_event(&self, evt: Event) -> Event {
        // unwraps are okay, shorthand to get the enum variants as strings
        evt.add_attributes([
            ("error-id", serde_json::to_string(&self.id).unwrap()),
            ("error-domain", serde_json::to_string(&self.domain).unwrap()),
            ("error-description", self.description.clone()),
        ])
    }

    /// Extract the [ErrorId] from an anyhow error, if it carries one.
    pub fn try_from_anyhow(err: &anyhow::Error) -> Option<&PlatformError> {
        err.downcast_ref()
    }
}
