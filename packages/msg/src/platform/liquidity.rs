//! Liquidity pools and LP accounting.

use crate::platform::market::MarketId;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Decimal, Uint128};

/// A constant-product pool backing a market.
#[cw_serde]
pub struct LiquidityPool {
    /// Market the pool serves
    pub market_id: MarketId,
    /// Base asset reserve
    pub base_reserve: Uint128,
    /// Quote asset reserve
    pub quote_reserve: Uint128,
    /// Outstanding LP shares
    pub lp_supply: Uint128,
    /// Swap fee rate accrued to the pool
    pub fee_rate: Decimal,
    /// Quote volume swapped in the current day bucket
    pub volume_24h: Uint128,
    /// Swap fees accrued in the current day bucket
    pub fees_24h: Uint128,
    /// Day bucket the 24h counters cover
    pub day: u64,
}

/// Events
pub mod events {
    use super::*;
    use crate::constants::event_key;
    use cosmwasm_std::{Addr, Event};

    /// A pool was created.
    pub struct PoolCreatedEvent {
        /// Market the pool serves
        pub market_id: MarketId,
    }

    impl From<PoolCreatedEvent> for Event {
        fn from(src: PoolCreatedEvent) -> Self {
            Event::new("pool-created")
                .add_attribute(event_key::POOL_MARKET, src.market_id.to_string())
        }
    }

    /// Liquidity was deposited.
    pub struct LiquidityAddedEvent {
        /// Market the pool serves
        pub market_id: MarketId,
        /// Depositor
        pub provider: Addr,
        /// Base deposited
        pub base_amount: Uint128,
        /// Quote deposited
        pub quote_amount: Uint128,
        /// LP shares minted
        pub lp_minted: Uint128,
    }

    impl From<LiquidityAddedEvent> for Event {
        fn from(src: LiquidityAddedEvent) -> Self {
            Event::new("liquidity-added")
                .add_attribute(event_key::POOL_MARKET, src.market_id.to_string())
                .add_attribute(event_key::OWNER, src.provider.to_string())
                .add_attribute(event_key::BASE_AMOUNT, src.base_amount.to_string())
                .add_attribute(event_key::QUOTE_AMOUNT, src.quote_amount.to_string())
                .add_attribute(event_key::LP_AMOUNT, src.lp_minted.to_string())
        }
    }

    /// Liquidity was withdrawn.
    pub struct LiquidityRemovedEvent {
        /// Market the pool serves
        pub market_id: MarketId,
        /// Withdrawer
        pub provider: Addr,
        /// Base returned
        pub base_amount: Uint128,
        /// Quote returned
        pub quote_amount: Uint128,
        /// LP shares burned
        pub lp_burned: Uint128,
    }

    impl From<LiquidityRemovedEvent> for Event {
        fn from(src: LiquidityRemovedEvent) -> Self {
            Event::new("liquidity-removed")
                .add_attribute(event_key::POOL_MARKET, src.market_id.to_string())
                .add_attribute(event_key::OWNER, src.provider.to_string())
                .add_attribute(event_key::BASE_AMOUNT, src.base_amount.to_string())
                .add_attribute(event_key::QUOTE_AMOUNT, src.quote_amount.to_string())
                .add_attribute(event_key::LP_AMOUNT, src.lp_burned.to_string())
        }
    }

    /// A swap executed against the pool.
    pub struct SwapEvent {
        /// Market the pool serves
        pub market_id: MarketId,
        /// Swapper
        pub trader: Addr,
        /// Denom paid in
        pub offer_denom: String,
        /// Amount paid in
        pub offer_amount: Uint128,
        /// Denom received
        pub ask_denom: String,
        /// Amount received
        pub ask_amount: Uint128,
        /// Fee retained by the pool, in the offer denom
        pub fee: Uint128,
    }

    impl From<SwapEvent> for Event {
        fn from(src: SwapEvent) -> Self {
            Event::new("swap")
                .add_attribute(event_key::POOL_MARKET, src.market_id.to_string())
                .add_attribute(event_key::OWNER, src.trader.to_string())
                .add_attribute("offer-denom", src.offer_denom)
                .add_attribute("offer-amount", src.offer_amount.to_string())
                .add_attribute("ask-denom", src.ask_denom)
                .add_attribute("ask-amount", src.ask_amount.to_string())
                .add_attribute(event_key::FEE, src.fee.to_string())
        }
    }

    /// Collected trading fees were distributed to LP share holders.
    pub struct FeeDistributionEvent {
        /// Market whose fees were swept
        pub market_id: MarketId,
        /// Total distributed in quote units
        pub distributed: Uint128,
        /// Providers paid
        pub providers: u64,
    }

    impl From<FeeDistributionEvent> for Event {
        fn from(src: FeeDistributionEvent) -> Self {
            Event::new("fee-distribution")
                .add_attribute(event_key::POOL_MARKET, src.market_id.to_string())
                .add_attribute(event_key::FEES_DISTRIBUTED, src.distributed.to_string())
                .add_attribute("providers", src.providers.to_string())
        }
    }
}
