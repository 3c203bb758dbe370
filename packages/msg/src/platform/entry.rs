//! The platform transaction surface.

use crate::ids::{AppealId, DepositId, EscrowId, OrderId, PlanId, ReportId, SessionId, WithdrawalId};
use crate::platform::bridge::{ExternalAsset, ExternalChain};
use crate::platform::config::{Config, ConfigUpdate};
use crate::platform::escrow::Resolution;
use crate::platform::inheritance::Beneficiary;
use crate::platform::market::MarketId;
use crate::platform::order::{OrderSide, OrderType, TimeInForce};
use crate::platform::report::{ReportTarget, ReportType, VoteChoice};
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Binary, Decimal, Timestamp, Uint128};

/// Constructs the platform state. Executed once by the surrounding shell.
#[cw_serde]
pub struct InstantiateMsg {
    /// Initial configuration
    pub config: Config,
}

/// A transaction dispatched to the platform core. The sender is carried
/// alongside by the shell.
#[cw_serde]
pub enum ExecuteMsg {
    // trading
    /// List a new market. Governance gated.
    CreateMarket {
        /// Base symbol
        base: String,
        /// Quote symbol
        quote: String,
        /// Minimum price increment
        tick_size: Decimal,
        /// Minimum quantity increment
        lot_size: Uint128,
        /// Minimum order quantity
        min_order_size: Uint128,
        /// Maximum order quantity
        max_order_size: Uint128,
        /// Maker fee; falls back to the config default
        maker_fee: Option<Decimal>,
        /// Taker fee; falls back to the config default
        taker_fee: Option<Decimal>,
    },
    /// Place an order.
    PlaceOrder {
        /// Market to trade
        market_id: MarketId,
        /// Book side
        side: OrderSide,
        /// Pricing behaviour
        order_type: OrderType,
        /// Residual handling
        time_in_force: TimeInForce,
        /// Quantity in base units
        quantity: Uint128,
        /// Limit price; required for limit and stop-limit orders
        price: Option<Decimal>,
        /// Trigger price; required for stop orders
        stop_price: Option<Decimal>,
        /// Expiry; required for GTD orders
        expires_at: Option<Timestamp>,
        /// Caller-supplied correlation id
        client_order_id: Option<String>,
    },
    /// Cancel one resting order.
    CancelOrder {
        /// The order to cancel
        order_id: OrderId,
    },
    /// Cancel every resting order of the sender, optionally per market.
    CancelAllOrders {
        /// Restrict to one market
        market_id: Option<MarketId>,
    },

    // liquidity
    /// Create the pool for a market. One pool per market.
    CreateLiquidityPool {
        /// Market the pool serves
        market_id: MarketId,
        /// Pool swap fee rate
        fee_rate: Decimal,
        /// Initial base deposit
        base_amount: Uint128,
        /// Initial quote deposit
        quote_amount: Uint128,
    },
    /// Deposit into a pool.
    AddLiquidity {
        /// Market the pool serves
        market_id: MarketId,
        /// Base deposit
        base_amount: Uint128,
        /// Quote deposit, capped to preserve the reserve ratio
        quote_amount: Uint128,
    },
    /// Withdraw from a pool.
    RemoveLiquidity {
        /// Market the pool serves
        market_id: MarketId,
        /// LP shares to burn
        lp_amount: Uint128,
    },
    /// Swap against a pool.
    Swap {
        /// Market the pool serves
        market_id: MarketId,
        /// Denom paid in; must be the pool's base or quote
        offer_denom: String,
        /// Amount paid in
        offer_amount: Uint128,
        /// Reject the swap below this output
        min_receive: Option<Uint128>,
    },

    // dispute escrow
    /// Open a dispute escrow. The sender is the buyer and funds it.
    OpenEscrow {
        /// Counterparty
        seller: Addr,
        /// Amount escrowed, gross of the reserve fee
        amount: Uint128,
        /// Denom escrowed
        denom: String,
    },
    /// Execute a resolution on a held escrow. Governance gated.
    ResolveEscrow {
        /// The escrow
        escrow_id: EscrowId,
        /// How to settle it
        resolution: Resolution,
    },

    // reports & appeals
    /// Submit a report.
    SubmitReport {
        /// Kind of wrongdoing
        report_type: ReportType,
        /// What the report is against
        target: ReportTarget,
        /// Severity, 1-5
        severity: u8,
        /// Initial evidence references
        evidence: Vec<String>,
        /// WrongResolution: the disputed escrow
        escrow_id: Option<EscrowId>,
    },
    /// Attach evidence to an open report.
    SubmitReportEvidence {
        /// The report
        report_id: ReportId,
        /// Content reference
        uri: String,
    },
    /// Cast a review vote.
    VoteOnReport {
        /// The report
        report_id: ReportId,
        /// The vote
        choice: VoteChoice,
        /// Optional written reasoning
        comment: Option<String>,
    },
    /// Settle a WrongResolution claim during the grace window.
    VoluntaryReturn {
        /// The report being settled
        report_id: ReportId,
    },
    /// Refuse a voluntary return and proceed to investigation.
    RejectVoluntaryReturn {
        /// The report
        report_id: ReportId,
        /// Written reason
        reason: String,
    },
    /// Appeal a resolved dispute escrow.
    SubmitDisputeAppeal {
        /// The resolved escrow
        escrow_id: EscrowId,
        /// Resolution the appellant asks for
        requested_resolution: Resolution,
        /// Initial evidence references
        evidence: Vec<String>,
    },
    /// Appeal a resolved report.
    SubmitReportAppeal {
        /// The resolved report
        report_id: ReportId,
        /// Initial evidence references
        evidence: Vec<String>,
    },
    /// Cast an appeal review vote. Confirm votes to overturn.
    VoteOnAppeal {
        /// The appeal
        appeal_id: AppealId,
        /// The vote
        choice: VoteChoice,
        /// Optional written reasoning
        comment: Option<String>,
    },
    /// Escalate a resolved appeal to the next level.
    EscalateAppeal {
        /// The appeal to escalate
        appeal_id: AppealId,
    },
    /// Attach evidence to an open appeal.
    AddAppealEvidence {
        /// The appeal
        appeal_id: AppealId,
        /// Content reference
        uri: String,
    },

    // bridge
    /// Report an external deposit observation. Validators only.
    ObserveDeposit {
        /// Source chain
        chain_id: String,
        /// External asset symbol
        asset: String,
        /// External transaction hash
        external_tx_hash: String,
        /// External block height
        external_block_height: u64,
        /// External sender, opaque
        external_sender: String,
        /// Internal recipient
        recipient: Addr,
        /// Amount on the external chain
        amount: Uint128,
    },
    /// Attest an observed deposit. Validators only.
    AttestDeposit {
        /// The deposit
        deposit_id: DepositId,
        /// Approval or refusal
        approved: bool,
        /// Tx hash the attester observed; must match on approval
        observed_tx_hash: String,
        /// Amount the attester observed; must match on approval
        observed_amount: Uint128,
    },
    /// Request a withdrawal to an external chain.
    RequestWithdrawal {
        /// Destination chain
        chain_id: String,
        /// External asset symbol
        asset: String,
        /// External recipient, opaque
        recipient: String,
        /// Internal amount to withdraw, gross of fee
        amount: Uint128,
    },
    /// Submit a signature share to a signing session. Participants only.
    SubmitTssSignature {
        /// The session
        session_id: SessionId,
        /// Opaque share bytes
        data: Binary,
    },
    /// Return the escrow of a failed or timed-out withdrawal.
    RefundWithdrawal {
        /// The withdrawal
        withdrawal_id: WithdrawalId,
    },
    /// Engage or clear the circuit breaker. Governance gated.
    UpdateCircuitBreaker {
        /// Engage or clear
        enabled: bool,
        /// Why
        reason: Option<String>,
        /// Deposits allowed while engaged
        allow_deposit: bool,
        /// Withdrawals allowed while engaged
        allow_withdraw: bool,
        /// Attestations allowed while engaged
        allow_attest: bool,
        /// Auto-disable time
        expires_at: Option<Timestamp>,
    },
    /// Register an external chain. Governance gated.
    AddExternalChain {
        /// Chain parameters
        chain: ExternalChain,
    },
    /// Register an external asset. Governance gated.
    AddExternalAsset {
        /// Asset parameters
        asset: ExternalAsset,
    },

    // inheritance
    /// Create an inheritance plan for the sender.
    CreatePlan {
        /// Beneficiaries ordered by priority
        beneficiaries: Vec<Beneficiary>,
        /// Owner inactivity before triggering, seconds
        inactivity_period: u64,
        /// Grace window, seconds; at least 30 days
        grace_period: u64,
        /// Per-beneficiary claim window, seconds
        claim_window: u64,
        /// Fallback charity; defaults to the protocol charity
        charity: Option<Addr>,
    },
    /// Replace the beneficiary set or windows of an active plan.
    UpdatePlan {
        /// The plan
        plan_id: PlanId,
        /// New beneficiary set, if changing
        beneficiaries: Option<Vec<Beneficiary>>,
        /// New inactivity period, if changing
        inactivity_period: Option<u64>,
        /// New grace period, if changing
        grace_period: Option<u64>,
        /// New claim window, if changing
        claim_window: Option<u64>,
    },
    /// Cancel an active plan.
    CancelPlan {
        /// The plan
        plan_id: PlanId,
    },
    /// Claim as the beneficiary whose window is open.
    ClaimAssets {
        /// The plan
        plan_id: PlanId,
    },
    /// Owner proof-of-life: cancel a trigger during grace.
    CancelTrigger {
        /// The plan
        plan_id: PlanId,
    },

    // governance
    /// Apply a partial config update. Governance gated.
    UpdateConfig(ConfigUpdate),
}
