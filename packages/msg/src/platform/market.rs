//! Markets and market statistics.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Decimal, StdError, StdResult, Timestamp, Uint128};
use cw_storage_plus::{Key, KeyDeserialize, Prefixer, PrimaryKey};
use std::fmt;
use std::str::FromStr;

/// Identifies a market as `"{base}_{quote}"`, e.g. `APPLE_HODL`.
///
/// Stored as a single key segment so it can participate in composite keys.
#[cw_serde]
#[derive(Eq, PartialOrd, Ord, Hash)]
pub struct MarketId(String);

impl MarketId {
    /// Build from base and quote symbols.
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        MarketId(format!("{}_{}", base.into(), quote.into()))
    }

    /// The base symbol.
    pub fn base(&self) -> &str {
        self.0.split_once('_').map(|(b, _)| b).unwrap_or(&self.0)
    }

    /// The quote symbol.
    pub fn quote(&self) -> &str {
        self.0.split_once('_').map(|(_, q)| q).unwrap_or("")
    }

    /// Raw string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MarketId {
    type Err = StdError;
    fn from_str(src: &str) -> StdResult<Self> {
        if src.split('_').count() == 2 {
            Ok(MarketId(src.to_owned()))
        } else {
            Err(StdError::generic_err(format!("invalid market id: {src}")))
        }
    }
}

impl<'a> PrimaryKey<'a> for &'a MarketId {
    type Prefix = ();
    type SubPrefix = ();
    type Suffix = Self;
    type SuperSuffix = Self;

    fn key(&self) -> Vec<Key> {
        vec![Key::Ref(self.0.as_bytes())]
    }
}

impl<'a> Prefixer<'a> for &'a MarketId {
    fn prefix(&self) -> Vec<Key> {
        vec![Key::Ref(self.0.as_bytes())]
    }
}

impl KeyDeserialize for &MarketId {
    type Output = MarketId;
    const KEY_ELEMS: u16 = 1;

    #[inline(always)]
    fn from_vec(value: Vec<u8>) -> StdResult<Self::Output> {
        String::from_utf8(value)
            .map(MarketId)
            .map_err(|err| StdError::generic_err(err.to_string()))
    }
}

/// A listed trading pair.
#[cw_serde]
pub struct Market {
    /// Base symbol, the asset being traded
    pub base: String,
    /// Quote symbol, the asset it is priced in
    pub quote: String,
    /// Whether the market accepts orders
    pub active: bool,
    /// Administrative halt distinct from equity-level halts
    pub trading_halted: bool,
    /// Minimum price increment
    pub tick_size: Decimal,
    /// Minimum quantity increment
    pub lot_size: Uint128,
    /// Minimum order quantity
    pub min_order_size: Uint128,
    /// Maximum order quantity
    pub max_order_size: Uint128,
    /// Fee rate charged to the resting side
    pub maker_fee: Decimal,
    /// Fee rate charged to the incoming side
    pub taker_fee: Decimal,
    /// Price of the most recent trade; zero until the first trade
    pub last_price: Decimal,
    /// When the market was listed
    pub created_at: Timestamp,
    /// Refreshed on every stats update; last_price only moves on trades
    pub updated_at: Timestamp,
}

impl Market {
    /// The market's composite id.
    pub fn id(&self) -> MarketId {
        MarketId::new(&self.base, &self.quote)
    }
}

/// Rolling daily statistics for a market.
///
/// Buckets reset when the utc day of `block_time` advances.
#[cw_serde]
#[derive(Default)]
pub struct MarketStats {
    /// Day bucket these stats cover
    pub day: u64,
    /// Highest trade price in the bucket
    pub high: Decimal,
    /// Lowest trade price in the bucket
    pub low: Decimal,
    /// Price at the start of the bucket, for the guardrail check
    pub open: Decimal,
    /// Base volume in the bucket
    pub volume_base: Uint128,
    /// Quote volume in the bucket
    pub volume_quote: Uint128,
    /// Trades in the bucket
    pub trade_count: u64,
}

/// Per-trader cumulative statistics.
#[cw_serde]
#[derive(Default)]
pub struct TraderStats {
    /// Total trades participated in
    pub trade_count: u64,
    /// Cumulative quote volume
    pub volume_quote: Uint128,
    /// Trades where the trader was on both sides, a fraud heuristic input
    pub self_crossings: u64,
}

/// Per-symbol guardrail state maintained by the statistics subsystem.
#[cw_serde]
#[derive(Default)]
pub struct Guardrail {
    /// Market flagged for manipulation investigation by a confirmed report
    pub under_investigation: bool,
    /// Halted by the price-move guardrail; cleared by governance
    pub price_halted: bool,
}

/// Events
pub mod events {
    use super::MarketId;
    use crate::constants::event_key;
    use cosmwasm_std::{Decimal, Event};

    /// A market was created.
    pub struct MarketCreatedEvent {
        /// Composite market id
        pub market_id: MarketId,
        /// Minimum price increment
        pub tick_size: Decimal,
    }

    impl From<MarketCreatedEvent> for Event {
        fn from(src: MarketCreatedEvent) -> Self {
            Event::new("market-created")
                .add_attribute(event_key::MARKET_ID, src.market_id.to_string())
                .add_attribute("tick-size", src.tick_size.to_string())
        }
    }

    /// Trading on a market was halted by the price-move guardrail.
    pub struct MarketHaltedEvent {
        /// Composite market id
        pub market_id: MarketId,
        /// Day move ratio that tripped the guardrail
        pub move_ratio: Decimal,
    }

    impl From<MarketHaltedEvent> for Event {
        fn from(src: MarketHaltedEvent) -> Self {
            Event::new("market-halted")
                .add_attribute(event_key::MARKET_ID, src.market_id.to_string())
                .add_attribute("move-ratio", src.move_ratio.to_string())
        }
    }

    /// A market was flagged for manipulation investigation.
    pub struct MarketFlaggedEvent {
        /// Composite market id
        pub market_id: MarketId,
        /// Report that triggered the flag
        pub report_id: crate::ids::ReportId,
    }

    impl From<MarketFlaggedEvent> for Event {
        fn from(src: MarketFlaggedEvent) -> Self {
            Event::new("market-flagged")
                .add_attribute(event_key::MARKET_ID, src.market_id.to_string())
                .add_attribute(event_key::REPORT_ID, src.report_id.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_id_parts() {
        let id = MarketId::new("APPLE", "HODL");
        assert_eq!(id.base(), "APPLE");
        assert_eq!(id.quote(), "HODL");
        assert_eq!(id.to_string(), "APPLE_HODL");
        assert_eq!("APPLE_HODL".parse::<MarketId>().unwrap(), id);
        assert!("APPLEHODL".parse::<MarketId>().is_err());
    }
}
