//! Orders and trades for the central-limit order book.

use crate::ids::{OrderId, TradeId};
use crate::platform::market::MarketId;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Decimal, Timestamp, Uint128};
use std::fmt;
use std::str::FromStr;

/// Which side of the book an order rests on.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum OrderSide {
    /// Bid for the base asset, paying quote
    Buy,
    /// Offer of the base asset, receiving quote
    Sell,
}

impl OrderSide {
    /// The side this order matches against.
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for OrderSide {
    type Err = crate::error::ParseError;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        match src {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            other => Err(crate::error::ParseError {
                kind: "order side",
                value: other.to_owned(),
            }),
        }
    }
}

/// How the order prices itself.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum OrderType {
    /// Rest at `price` until filled or cancelled
    Limit,
    /// Take the best available prices immediately
    Market,
    /// Becomes a market order once `stop_price` is crossed
    Stop,
    /// Becomes a limit order once `stop_price` is crossed
    StopLimit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            OrderType::Limit => "limit",
            OrderType::Market => "market",
            OrderType::Stop => "stop",
            OrderType::StopLimit => "stop_limit",
        };
        write!(f, "{s}")
    }
}

/// What happens to the unfilled residual of a taker order.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum TimeInForce {
    /// Rest until cancelled
    Gtc,
    /// Fill what is immediately available, cancel the rest
    Ioc,
    /// Fill completely or execute nothing
    Fok,
    /// Rest until `expires_at`
    Gtd,
}

impl fmt::Display for TimeInForce {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TimeInForce::Gtc => "gtc",
            TimeInForce::Ioc => "ioc",
            TimeInForce::Fok => "fok",
            TimeInForce::Gtd => "gtd",
        };
        write!(f, "{s}")
    }
}

/// Order lifecycle status.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum OrderStatus {
    /// Stop order waiting for its trigger
    Pending,
    /// Resting on the book
    Open,
    /// Resting with some quantity filled
    PartiallyFilled,
    /// Fully filled
    Filled,
    /// Cancelled by the owner or by time-in-force handling
    Cancelled,
    /// GTD order past its expiry
    Expired,
}

impl OrderStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Open => "open",
            OrderStatus::PartiallyFilled => "partially_filled",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        };
        write!(f, "{s}")
    }
}

/// An order in the dex.
///
/// Invariant: `filled_quantity + remaining_quantity == quantity` for every
/// non-cancelled order.
#[cw_serde]
pub struct Order {
    /// Unique order id
    pub order_id: OrderId,
    /// Market the order trades
    pub market_id: MarketId,
    /// Owner of the order
    pub owner: Addr,
    /// Book side
    pub side: OrderSide,
    /// Pricing behaviour
    pub order_type: OrderType,
    /// Residual handling
    pub time_in_force: TimeInForce,
    /// Original quantity in base units
    pub quantity: Uint128,
    /// Quantity filled so far
    pub filled_quantity: Uint128,
    /// Quantity still outstanding
    pub remaining_quantity: Uint128,
    /// Limit price; None for market and untriggered stop-market orders
    pub price: Option<Decimal>,
    /// Trigger price for stop orders
    pub stop_price: Option<Decimal>,
    /// Volume-weighted average fill price
    pub average_price: Decimal,
    /// Escrow still held by the dex module for this order
    pub escrow_remaining: Uint128,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Caller-supplied correlation id
    pub client_order_id: Option<String>,
    /// Placement time
    pub created_at: Timestamp,
    /// Last mutation time
    pub updated_at: Timestamp,
    /// Expiry, GTD orders only
    pub expires_at: Option<Timestamp>,
}

impl Order {
    /// The limit price a resting order is keyed under. Only resting orders
    /// (limit / triggered stop-limit) have one.
    pub fn book_price(&self) -> Option<Decimal> {
        match self.status {
            OrderStatus::Open | OrderStatus::PartiallyFilled => self.price,
            _ => None,
        }
    }
}

/// A matched execution between two orders.
#[cw_serde]
pub struct Trade {
    /// Unique trade id
    pub trade_id: TradeId,
    /// Market traded
    pub market_id: MarketId,
    /// Buy side order
    pub buy_order_id: OrderId,
    /// Sell side order
    pub sell_order_id: OrderId,
    /// Buyer address
    pub buyer: Addr,
    /// Seller address
    pub seller: Addr,
    /// Base quantity exchanged
    pub quantity: Uint128,
    /// Execution price, always the maker's price
    pub price: Decimal,
    /// Fee charged to the buyer in quote units
    pub buyer_fee: Uint128,
    /// Fee charged to the seller in quote units
    pub seller_fee: Uint128,
    /// Whether the buyer was the resting side
    pub buyer_is_maker: bool,
    /// Block time of execution
    pub executed_at: Timestamp,
}

/// Events
pub mod events {
    use super::*;
    use crate::constants::event_key;
    use crate::event::PlatformEventExt;
    use cosmwasm_std::Event;

    /// An order was accepted onto the book.
    pub struct PlaceOrderEvent {
        /// The accepted order after any immediate matching
        pub order: Order,
    }

    impl From<PlaceOrderEvent> for Event {
        fn from(src: PlaceOrderEvent) -> Self {
            let order = src.order;
            let mut event = Event::new("place-order")
                .add_attribute(event_key::ORDER_ID, order.order_id.to_string())
                .add_attribute(event_key::MARKET_ID, order.market_id.to_string())
                .add_attribute(event_key::OWNER, order.owner.to_string())
                .add_attribute(event_key::SIDE, order.side.to_string())
                .add_attribute(event_key::ORDER_TYPE, order.order_type.to_string())
                .add_attribute(event_key::TIME_IN_FORCE, order.time_in_force.to_string())
                .add_attribute(event_key::QUANTITY, order.quantity.to_string())
                .add_attribute(event_key::STATUS, order.status.to_string());
            if let Some(price) = order.price {
                event = event.add_attribute(event_key::PRICE, price.to_string());
            }
            if let Some(stop_price) = order.stop_price {
                event = event.add_attribute(event_key::STOP_PRICE, stop_price.to_string());
            }
            event
        }
    }

    /// An order left the book without being fully filled.
    pub struct CancelOrderEvent {
        /// Cancelled order id
        pub order_id: OrderId,
        /// Escrow returned to the owner
        pub refunded: Uint128,
        /// Final status, Cancelled or Expired
        pub status: OrderStatus,
    }

    impl From<CancelOrderEvent> for Event {
        fn from(src: CancelOrderEvent) -> Self {
            Event::new("cancel-order")
                .add_attribute(event_key::ORDER_ID, src.order_id.to_string())
                .add_attribute("refunded", src.refunded.to_string())
                .add_attribute(event_key::STATUS, src.status.to_string())
        }
    }

    /// A trade executed.
    pub struct TradeEvent {
        /// The executed trade
        pub trade: Trade,
    }

    impl From<TradeEvent> for Event {
        fn from(src: TradeEvent) -> Self {
            let trade = src.trade;
            Event::new("trade")
                .add_attribute(event_key::TRADE_ID, trade.trade_id.to_string())
                .add_attribute(event_key::MARKET_ID, trade.market_id.to_string())
                .add_attribute(event_key::BUY_ORDER_ID, trade.buy_order_id.to_string())
                .add_attribute(event_key::SELL_ORDER_ID, trade.sell_order_id.to_string())
                .add_attribute(event_key::BUYER, trade.buyer.to_string())
                .add_attribute(event_key::SELLER, trade.seller.to_string())
                .add_attribute(event_key::QUANTITY, trade.quantity.to_string())
                .add_attribute(event_key::PRICE, trade.price.to_string())
                .add_attribute(event_key::BUYER_FEE, trade.buyer_fee.to_string())
                .add_attribute(event_key::SELLER_FEE, trade.seller_fee.to_string())
                .add_attribute(event_key::BUYER_IS_MAKER, trade.buyer_is_maker.to_string())
                .add_attribute(
                    event_key::EXECUTED_AT,
                    trade.executed_at.nanos().to_string(),
                )
        }
    }

    impl TryFrom<Event> for TradeEvent {
        type Error = anyhow::Error;

        fn try_from(evt: Event) -> Result<Self, Self::Error> {
            Ok(TradeEvent {
                trade: Trade {
                    trade_id: TradeId::new(evt.u64_attr(event_key::TRADE_ID)?),
                    market_id: evt.string_attr(event_key::MARKET_ID)?.parse()?,
                    buy_order_id: OrderId::new(evt.u64_attr(event_key::BUY_ORDER_ID)?),
                    sell_order_id: OrderId::new(evt.u64_attr(event_key::SELL_ORDER_ID)?),
                    buyer: evt.unchecked_addr_attr(event_key::BUYER)?,
                    seller: evt.unchecked_addr_attr(event_key::SELLER)?,
                    quantity: evt.amount_attr(event_key::QUANTITY)?,
                    price: evt.decimal_attr(event_key::PRICE)?,
                    buyer_fee: evt.amount_attr(event_key::BUYER_FEE)?,
                    seller_fee: evt.amount_attr(event_key::SELLER_FEE)?,
                    buyer_is_maker: evt
                        .string_attr(event_key::BUYER_IS_MAKER)?
                        .parse()
                        .map_err(anyhow::Error::from)?,
                    executed_at: evt.timestamp_attr(event_key::EXECUTED_AT)?,
                },
            })
        }
    }

    /// A stop order crossed its trigger and re-entered matching.
    pub struct StopTriggeredEvent {
        /// Triggered order id
        pub order_id: OrderId,
        /// Market last price that crossed the trigger
        pub last_price: Decimal,
    }

    impl From<StopTriggeredEvent> for Event {
        fn from(src: StopTriggeredEvent) -> Self {
            Event::new("stop-triggered")
                .add_attribute(event_key::ORDER_ID, src.order_id.to_string())
                .add_attribute(event_key::PRICE, src.last_price.to_string())
        }
    }

    /// A GTD order passed its expiry.
    pub struct OrderExpiredEvent {
        /// Expired order id
        pub order_id: OrderId,
        /// Escrow returned to the owner
        pub refunded: Uint128,
    }

    impl From<OrderExpiredEvent> for Event {
        fn from(src: OrderExpiredEvent) -> Self {
            Event::new("order-expired")
                .add_attribute(event_key::ORDER_ID, src.order_id.to_string())
                .add_attribute("refunded", src.refunded.to_string())
        }
    }
}
