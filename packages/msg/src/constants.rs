//! Shared constants for events and defaults.

/// Attribute keys used by typed events.
pub mod event_key {
    #![allow(missing_docs)]

    pub const MARKET_ID: &str = "market-id";
    pub const ORDER_ID: &str = "order-id";
    pub const OWNER: &str = "owner";
    pub const SIDE: &str = "side";
    pub const ORDER_TYPE: &str = "order-type";
    pub const TIME_IN_FORCE: &str = "time-in-force";
    pub const QUANTITY: &str = "quantity";
    pub const PRICE: &str = "price";
    pub const STOP_PRICE: &str = "stop-price";
    pub const STATUS: &str = "status";
    pub const TRADE_ID: &str = "trade-id";
    pub const BUY_ORDER_ID: &str = "buy-order-id";
    pub const SELL_ORDER_ID: &str = "sell-order-id";
    pub const BUYER: &str = "buyer";
    pub const SELLER: &str = "seller";
    pub const BUYER_FEE: &str = "buyer-fee";
    pub const SELLER_FEE: &str = "seller-fee";
    pub const BUYER_IS_MAKER: &str = "buyer-is-maker";
    pub const EXECUTED_AT: &str = "executed-at";

    pub const PAYER: &str = "payer";
    pub const FEE_AMOUNT: &str = "fee-amount";
    pub const EQUITY_DENOM: &str = "equity-denom";
    pub const EQUITY_AMOUNT: &str = "equity-amount";
    pub const OUTPUT_AMOUNT: &str = "output-amount";

    pub const POOL_MARKET: &str = "pool-market";
    pub const LP_AMOUNT: &str = "lp-amount";
    pub const BASE_AMOUNT: &str = "base-amount";
    pub const QUOTE_AMOUNT: &str = "quote-amount";
    pub const FEES_DISTRIBUTED: &str = "fees-distributed";

    pub const ESCROW_ID: &str = "escrow-id";
    pub const RESOLUTION: &str = "resolution";

    pub const REPORT_ID: &str = "report-id";
    pub const REPORT_TYPE: &str = "report-type";
    pub const REPORTER: &str = "reporter";
    pub const TARGET: &str = "target";
    pub const SEVERITY: &str = "severity";
    pub const PRIORITY: &str = "priority";
    pub const TIER: &str = "tier";
    pub const REVIEWER: &str = "reviewer";
    pub const REVIEWERS: &str = "reviewers";
    pub const VOTE: &str = "vote";
    pub const DEADLINE: &str = "deadline";
    pub const ACTION: &str = "action";
    pub const REASON: &str = "reason";
    pub const AMOUNT: &str = "amount";
    pub const COUNTERPARTY: &str = "counterparty";

    pub const APPEAL_ID: &str = "appeal-id";
    pub const APPEAL_LEVEL: &str = "appeal-level";
    pub const APPELLANT: &str = "appellant";

    pub const RECOVERED: &str = "recovered";
    pub const SHORTFALL: &str = "shortfall";
    pub const SOURCE: &str = "source";

    pub const ADDRESS: &str = "address";
    pub const BAN_COUNT: &str = "ban-count";
    pub const EXPIRES_AT: &str = "expires-at";

    pub const CHAIN: &str = "chain";
    pub const ASSET: &str = "asset";
    pub const DEPOSIT_ID: &str = "deposit-id";
    pub const WITHDRAWAL_ID: &str = "withdrawal-id";
    pub const SESSION_ID: &str = "session-id";
    pub const TX_HASH: &str = "tx-hash";
    pub const VALIDATOR: &str = "validator";
    pub const ATTESTATIONS: &str = "attestations";
    pub const REQUIRED: &str = "required";
    pub const RECIPIENT: &str = "recipient";
    pub const SENDER: &str = "sender";
    pub const FEE: &str = "fee";
    pub const EXTERNAL_AMOUNT: &str = "external-amount";
    pub const INTERNAL_AMOUNT: &str = "internal-amount";
    pub const OPERATION: &str = "operation";
    pub const ENABLED: &str = "enabled";

    pub const PLAN_ID: &str = "plan-id";
    pub const BENEFICIARY: &str = "beneficiary";
    pub const CHARITY: &str = "charity";
    pub const TRIGGERED_AT: &str = "triggered-at";
    pub const GRACE_END: &str = "grace-end";
    pub const WINDOW_END: &str = "window-end";

    pub const ERROR: &str = "error";
}

/// Well-known attribute values.
pub mod event_val {
    #![allow(missing_docs)]

    pub const BUY: &str = "buy";
    pub const SELL: &str = "sell";
    pub const CONFIRMED: &str = "confirmed";
    pub const DISMISSED: &str = "dismissed";
    pub const UPHELD: &str = "upheld";
    pub const OVERTURNED: &str = "overturned";
    pub const ESCALATED: &str = "escalated";
    pub const ESCALATED_TO_GOVERNANCE: &str = "escalated_to_governance";
    pub const EXTENDED: &str = "extended";
    pub const CLAWBACK: &str = "clawback";
    pub const RESERVE: &str = "reserve";
    pub const SLASH: &str = "slash";
    pub const SKIPPED: &str = "skipped";
    pub const CLAIMED: &str = "claimed";
    pub const CHARITY_FALLBACK: &str = "charity_fallback";
}
