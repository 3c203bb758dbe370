//! Storage namespaces for every `Item` and `Map` in the platform.
//!
//! Namespaces are byte-stable: changing any of these strings is a state
//! migration and requires explicit versioning.

/// Platform configuration singleton
pub const CONFIG: &str = "config";

// dex
/// Markets by [crate::platform::market::MarketId]
pub const MARKETS: &str = "markets";
/// Rolling 24h market statistics
pub const MARKET_STATS: &str = "market-stats";
/// Per-symbol trading guardrails
pub const MARKET_GUARDRAILS: &str = "market-guardrails";
/// Last allocated order id
pub const LAST_ORDER_ID: &str = "last-order-id";
/// Orders by [crate::ids::OrderId]
pub const ORDERS: &str = "orders";
/// Resting buy orders, best price first
pub const ORDER_BOOK_BIDS: &str = "order-book-bids";
/// Resting sell orders, best price first
pub const ORDER_BOOK_ASKS: &str = "order-book-asks";
/// Orders by owner
pub const ORDERS_BY_ADDR: &str = "orders-by-addr";
/// Untriggered buy-stop orders by stop price
pub const STOP_ORDERS_BUY: &str = "stop-orders-buy";
/// Untriggered sell-stop orders by stop price
pub const STOP_ORDERS_SELL: &str = "stop-orders-sell";
/// GTD orders by expiry time
pub const ORDERS_BY_EXPIRY: &str = "orders-by-expiry";
/// Last allocated trade id
pub const LAST_TRADE_ID: &str = "last-trade-id";
/// Trades by [crate::ids::TradeId]
pub const TRADES: &str = "trades";
/// Per-trader cumulative statistics
pub const TRADER_STATS: &str = "trader-stats";

// liquidity
/// Liquidity pools by market
pub const LIQUIDITY_POOLS: &str = "liquidity-pools";
/// LP shares by (market, provider)
pub const LP_SHARES: &str = "lp-shares";
/// Undistributed trading fees by market
pub const PENDING_LP_FEES: &str = "pending-lp-fees";
/// Timestamp of the last LP fee sweep
pub const LAST_FEE_SWEEP: &str = "last-fee-sweep";

// dispute escrow
/// Last allocated escrow id
pub const LAST_ESCROW_ID: &str = "last-escrow-id";
/// Dispute escrows by [crate::ids::EscrowId]
pub const ESCROWS: &str = "escrows";

// reports
/// Last allocated report id
pub const LAST_REPORT_ID: &str = "last-report-id";
/// Reports by [crate::ids::ReportId]
pub const REPORTS: &str = "reports";
/// Reports by target key
pub const REPORTS_BY_TARGET: &str = "reports-by-target";
/// Reports by reporter
pub const REPORTS_BY_REPORTER: &str = "reports-by-reporter";
/// Open reports by review deadline
pub const REPORT_DEADLINES: &str = "report-deadlines";
/// Pending voluntary returns by grace deadline
pub const RETURN_DEADLINES: &str = "return-deadlines";
/// Reports submitted per (reporter, utc day)
pub const REPORTS_PER_DAY: &str = "reports-per-day";

// appeals
/// Last allocated appeal id
pub const LAST_APPEAL_ID: &str = "last-appeal-id";
/// Appeals by [crate::ids::AppealId]
pub const APPEALS: &str = "appeals";
/// Appeal ids by subject key
pub const APPEALS_BY_SUBJECT: &str = "appeals-by-subject";
/// Open appeals by review deadline
pub const APPEAL_DEADLINES: &str = "appeal-deadlines";

// reporter / moderator history
/// Reporter history by address
pub const REPORTER_HISTORY: &str = "reporter-history";
/// Moderator metrics by address
pub const MODERATOR_METRICS: &str = "moderator-metrics";
/// Temporary bans by expiry time
pub const BAN_EXPIRIES: &str = "ban-expiries";

// bridge
/// External chains by chain id
pub const CHAINS: &str = "chains";
/// External assets by (chain, asset)
pub const CHAIN_ASSETS: &str = "chain-assets";
/// Last allocated deposit id
pub const LAST_DEPOSIT_ID: &str = "last-deposit-id";
/// Deposits by [crate::ids::DepositId]
pub const DEPOSITS: &str = "deposits";
/// Deposit ids by (chain, external tx hash)
pub const DEPOSITS_BY_TX: &str = "deposits-by-tx";
/// Last allocated withdrawal id
pub const LAST_WITHDRAWAL_ID: &str = "last-withdrawal-id";
/// Withdrawals by [crate::ids::WithdrawalId]
pub const WITHDRAWALS: &str = "withdrawals";
/// Pending withdrawals by timelock expiry
pub const WITHDRAWAL_TIMELOCKS: &str = "withdrawal-timelocks";
/// Last allocated tss session id
pub const LAST_SESSION_ID: &str = "last-session-id";
/// Tss sessions by [crate::ids::SessionId]
pub const TSS_SESSIONS: &str = "tss-sessions";
/// Active tss sessions by timeout
pub const SESSION_TIMEOUTS: &str = "session-timeouts";
/// Rate limit windows by (chain, asset, window start)
pub const RATE_LIMIT_WINDOWS: &str = "rate-limit-windows";
/// Bridge circuit breaker singleton
pub const CIRCUIT_BREAKER: &str = "circuit-breaker";

// inheritance
/// Last allocated plan id
pub const LAST_PLAN_ID: &str = "last-plan-id";
/// Inheritance plans by [crate::ids::PlanId]
pub const PLANS: &str = "plans";
/// Plan ids by owner
pub const PLANS_BY_OWNER: &str = "plans-by-owner";
/// Plan ids by beneficiary
pub const PLANS_BY_BENEFICIARY: &str = "plans-by-beneficiary";
/// Last on-chain activity by address
pub const LAST_ACTIVITY: &str = "last-activity";
/// Active plans by earliest possible trigger time
pub const PLAN_TRIGGERS: &str = "plan-triggers";
/// Triggered/executing plans by next phase deadline
pub const PLAN_DEADLINES: &str = "plan-deadlines";
/// Per-plan claim locks
pub const CLAIM_LOCKS: &str = "claim-locks";
