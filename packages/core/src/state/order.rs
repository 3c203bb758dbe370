use crate::prelude::*;
use msg::platform::order::{
    events::*, Order as DexOrder, OrderSide, OrderStatus, OrderType, TimeInForce,
};

pub(super) const LAST_ORDER_ID: Item<OrderId> = Item::new(namespace::LAST_ORDER_ID);
pub(super) const ORDERS: Map<OrderId, DexOrder> = Map::new(namespace::ORDERS);

/// Price-time book indexes. Bids use the complemented price key so that
/// ascending iteration walks best price first and, within a price level,
/// oldest order first.
pub(super) const BOOK_BIDS: Map<(&MarketId, PriceKey, OrderId), ()> =
    Map::new(namespace::ORDER_BOOK_BIDS);
pub(super) const BOOK_ASKS: Map<(&MarketId, PriceKey, OrderId), ()> =
    Map::new(namespace::ORDER_BOOK_ASKS);

const ORDERS_BY_ADDR: Map<(&Addr, OrderId), ()> = Map::new(namespace::ORDERS_BY_ADDR);

/// Untriggered stop orders keyed by stop price, ascending.
pub(super) const STOP_BUY: Map<(&MarketId, PriceKey, OrderId), ()> =
    Map::new(namespace::STOP_ORDERS_BUY);
pub(super) const STOP_SELL: Map<(&MarketId, PriceKey, OrderId), ()> =
    Map::new(namespace::STOP_ORDERS_SELL);

/// GTD orders keyed by expiry seconds.
pub(super) const ORDERS_BY_EXPIRY: Map<(u64, OrderId), ()> =
    Map::new(namespace::ORDERS_BY_EXPIRY);

/// The book key a resting order sorts under.
pub(super) fn book_key(side: OrderSide, price: Decimal) -> PriceKey {
    match side {
        OrderSide::Buy => PriceKey::descending(price),
        OrderSide::Sell => PriceKey::ascending(price),
    }
}

fn book_entry(order: &DexOrder) -> Option<PriceKey> {
    if order.remaining_quantity.is_zero() {
        // includes residual-burned partially filled orders
        return None;
    }
    match order.status {
        OrderStatus::Open | OrderStatus::PartiallyFilled => {
            order.price.map(|price| book_key(order.side, price))
        }
        _ => None,
    }
}

fn stop_entry(order: &DexOrder) -> Option<PriceKey> {
    match (order.status, order.stop_price) {
        (OrderStatus::Pending, Some(stop_price)) => Some(PriceKey::ascending(stop_price)),
        _ => None,
    }
}

fn expiry_entry(order: &DexOrder) -> Option<u64> {
    if order.status.is_terminal()
        || order.remaining_quantity.is_zero()
        || order.time_in_force != TimeInForce::Gtd
    {
        return None;
    }
    order.expires_at.map(|t| t.seconds())
}

impl State<'_> {
    pub(crate) fn load_order(&self, store: &dyn Storage, order_id: OrderId) -> Result<DexOrder> {
        ORDERS.may_load(store, order_id)?.ok_or_else(|| {
            platform_anyhow!(
                ErrorId::OrderNotFound,
                ErrorDomain::Dex,
                "order {order_id} not found"
            )
        })
    }

    /// Persists an order and keeps every index in step with the primary.
    /// `old` is the previously stored version, None on first write.
    pub(crate) fn write_order(
        &self,
        ctx: &mut StateContext,
        old: Option<&DexOrder>,
        order: &DexOrder,
    ) -> Result<()> {
        ORDERS.save(ctx.storage, order.order_id, order)?;

        let market_id = &order.market_id;
        let old_book = old.and_then(book_entry);
        let new_book = book_entry(order);
        if old_book != new_book {
            if let Some(key) = old_book {
                let map = match order.side {
                    OrderSide::Buy => BOOK_BIDS,
                    OrderSide::Sell => BOOK_ASKS,
                };
                map.remove(ctx.storage, (market_id, key, order.order_id));
            }
            if let Some(key) = new_book {
                let map = match order.side {
                    OrderSide::Buy => BOOK_BIDS,
                    OrderSide::Sell => BOOK_ASKS,
                };
                map.save(ctx.storage, (market_id, key, order.order_id), &())?;
            }
        }

        let old_stop = old.and_then(stop_entry);
        let new_stop = stop_entry(order);
        if old_stop != new_stop {
            let map = match order.side {
                OrderSide::Buy => STOP_BUY,
                OrderSide::Sell => STOP_SELL,
            };
            if let Some(key) = old_stop {
                map.remove(ctx.storage, (market_id, key, order.order_id));
            }
            if let Some(key) = new_stop {
                map.save(ctx.storage, (market_id, key, order.order_id), &())?;
            }
        }

        let old_expiry = old.and_then(expiry_entry);
        let new_expiry = expiry_entry(order);
        if old_expiry != new_expiry {
            if let Some(at) = old_expiry {
                ORDERS_BY_EXPIRY.remove(ctx.storage, (at, order.order_id));
            }
            if let Some(at) = new_expiry {
                ORDERS_BY_EXPIRY.save(ctx.storage, (at, order.order_id), &())?;
            }
        }

        let active = |o: &DexOrder| !o.status.is_terminal() && !o.remaining_quantity.is_zero();
        let was_active = old.is_some_and(active);
        let is_active = active(order);
        if was_active != is_active {
            if is_active {
                ORDERS_BY_ADDR.save(ctx.storage, (&order.owner, order.order_id), &())?;
            } else {
                ORDERS_BY_ADDR.remove(ctx.storage, (&order.owner, order.order_id));
            }
        }

        Ok(())
    }

    /// The escrow an order locks at acceptance: base quantity for sells,
    /// quote at the limit price for priced buys. Market and untriggered
    /// stop-market buys settle directly and lock nothing.
    pub(crate) fn order_escrow(
        &self,
        market: &msg::platform::market::Market,
        side: OrderSide,
        quantity: Uint128,
        price: Option<Decimal>,
    ) -> Option<(String, Uint128)> {
        match side {
            OrderSide::Sell => Some((market.base.clone(), quantity)),
            OrderSide::Buy => price.map(|price| (market.quote.clone(), quantity.mul_ceil(price))),
        }
    }

    /// Returns the remaining escrow of a terminating order to its owner.
    fn release_escrow(&self, ctx: &mut StateContext, order: &DexOrder) -> Result<Uint128> {
        let refund = order.escrow_remaining;
        if refund.is_zero() {
            return Ok(refund);
        }
        let market = self.load_market(ctx.storage, &order.market_id)?;
        let denom = match order.side {
            OrderSide::Buy => market.quote,
            OrderSide::Sell => market.base,
        };
        self.bank
            .send_from_module(ctx.storage, module::DEX, &order.owner, &denom, refund)?;
        Ok(refund)
    }

    pub(crate) fn cancel_order(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        order_id: OrderId,
    ) -> Result<()> {
        let order = self.load_order(ctx.storage, order_id)?;
        platform_ensure!(
            &order.owner == sender,
            ErrorId::Unauthorized,
            ErrorDomain::Dex,
            "order {order_id} is not owned by {sender}"
        );
        self.cancel_order_inner(ctx, order)
    }

    fn cancel_order_inner(&self, ctx: &mut StateContext, order: DexOrder) -> Result<()> {
        platform_ensure!(
            !order.status.is_terminal(),
            ErrorId::CannotCancelOrder,
            ErrorDomain::Dex,
            "order {} is already {}",
            order.order_id,
            order.status
        );

        let refunded = self.release_escrow(ctx, &order)?;
        let mut cancelled = order.clone();
        cancelled.status = OrderStatus::Cancelled;
        cancelled.escrow_remaining = Uint128::zero();
        cancelled.updated_at = self.now();
        self.write_order(ctx, Some(&order), &cancelled)?;

        ctx.response_mut().add_event(CancelOrderEvent {
            order_id: order.order_id,
            refunded,
            status: OrderStatus::Cancelled,
        });
        Ok(())
    }

    pub(crate) fn cancel_all_orders(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        market_id: Option<MarketId>,
    ) -> Result<()> {
        let order_ids: Vec<OrderId> = ORDERS_BY_ADDR
            .prefix(sender)
            .keys(ctx.storage, None, None, Order::Ascending)
            .collect::<Result<_, _>>()?;

        for order_id in order_ids {
            let order = self.load_order(ctx.storage, order_id)?;
            if market_id
                .as_ref()
                .is_some_and(|wanted| wanted != &order.market_id)
            {
                continue;
            }
            self.cancel_order_inner(ctx, order)?;
        }
        Ok(())
    }

    /// Expires every GTD order whose expiry has passed. Bounded by the
    /// expiry index: only due orders are visited.
    pub(crate) fn expire_orders(&self, ctx: &mut StateContext) -> Result<()> {
        let now = self.now().seconds();
        let due: Vec<OrderId> = ORDERS_BY_EXPIRY
            .range(
                ctx.storage,
                None,
                Some(Bound::inclusive((now, OrderId::new(u64::MAX)))),
                Order::Ascending,
            )
            .map(|res| res.map(|((_, order_id), ())| order_id))
            .collect::<Result<_, _>>()?;

        for order_id in due {
            let order = self.load_order(ctx.storage, order_id)?;
            if order.status.is_terminal() {
                continue;
            }
            let refunded = self.release_escrow(ctx, &order)?;
            let mut expired = order.clone();
            expired.status = OrderStatus::Expired;
            expired.escrow_remaining = Uint128::zero();
            expired.updated_at = self.now();
            self.write_order(ctx, Some(&order), &expired)?;

            ctx.response_mut()
                .add_event(OrderExpiredEvent { order_id, refunded });
        }
        Ok(())
    }

    /// Validation shared by all placements; returns the market.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn validate_placement(
        &self,
        store: &dyn Storage,
        sender: &Addr,
        market_id: &MarketId,
        side: OrderSide,
        order_type: OrderType,
        time_in_force: TimeInForce,
        quantity: Uint128,
        price: Option<Decimal>,
        stop_price: Option<Decimal>,
        expires_at: Option<Timestamp>,
    ) -> Result<msg::platform::market::Market> {
        let market = self.load_active_market(store, market_id)?;

        if self.equity.is_equity(store, &market.base)? {
            platform_ensure!(
                !self.equity.is_trading_halted(store, &market.base)?,
                ErrorId::TradingHalted,
                ErrorDomain::Dex,
                "trading in {} is halted",
                market.base
            );
            platform_ensure!(
                !self.equity.is_blacklisted(store, &market.base, sender)?,
                ErrorId::Unauthorized,
                ErrorDomain::Dex,
                "{sender} is blacklisted for {}",
                market.base
            );
        }

        platform_ensure!(
            quantity >= market.min_order_size,
            ErrorId::OrderTooSmall,
            ErrorDomain::Dex,
            "quantity {quantity} below market minimum {}",
            market.min_order_size
        );
        platform_ensure!(
            quantity <= market.max_order_size,
            ErrorId::OrderTooLarge,
            ErrorDomain::Dex,
            "quantity {quantity} above market maximum {}",
            market.max_order_size
        );

        let needs_price = matches!(order_type, OrderType::Limit | OrderType::StopLimit);
        let needs_stop = matches!(order_type, OrderType::Stop | OrderType::StopLimit);
        platform_ensure!(
            !needs_price || price.is_some(),
            ErrorId::InvalidOrderType,
            ErrorDomain::Dex,
            "{order_type} order requires a price"
        );
        platform_ensure!(
            !needs_stop || stop_price.is_some(),
            ErrorId::InvalidOrderType,
            ErrorDomain::Dex,
            "{order_type} order requires a stop price"
        );
        platform_ensure!(
            needs_price || price.is_none(),
            ErrorId::InvalidOrderType,
            ErrorDomain::Dex,
            "{order_type} order does not take a price"
        );

        if let Some(price) = price {
            platform_ensure!(
                !price.is_zero() && is_tick_multiple(price, market.tick_size),
                ErrorId::InvalidMarket,
                ErrorDomain::Dex,
                "price {price} is not a positive multiple of tick size {}",
                market.tick_size
            );
        }
        if let Some(stop_price) = stop_price {
            platform_ensure!(
                !stop_price.is_zero(),
                ErrorId::InvalidOrderType,
                ErrorDomain::Dex,
                "stop price must be positive"
            );
        }

        match time_in_force {
            TimeInForce::Gtd => platform_ensure!(
                expires_at.is_some_and(|t| t > self.now()),
                ErrorId::InvalidTimeInForce,
                ErrorDomain::Dex,
                "gtd order requires a future expiry"
            ),
            _ => platform_ensure!(
                expires_at.is_none(),
                ErrorId::InvalidTimeInForce,
                ErrorDomain::Dex,
                "only gtd orders take an expiry"
            ),
        }

        // market and untriggered stop-market buys settle from the account at
        // execution time, so check spendable funds here for everything else
        if let Some((denom, amount)) = self.order_escrow(&market, side, quantity, price) {
            let balance = self.bank.balance(store, sender, &denom)?;
            platform_ensure!(
                balance >= amount,
                ErrorId::InsufficientFunds,
                ErrorDomain::Dex,
                "{sender} holds {balance} {denom}, needs {amount}"
            );
        } else {
            let quote_balance = self.bank.balance(store, sender, &market.quote)?;
            platform_ensure!(
                !quote_balance.is_zero(),
                ErrorId::InsufficientFunds,
                ErrorDomain::Dex,
                "{sender} holds no {} to buy with",
                market.quote
            );
        }

        Ok(market)
    }

    pub(super) fn next_order_id(&self, store: &mut dyn Storage) -> Result<OrderId> {
        alloc_id(store, &LAST_ORDER_ID)
    }
}

/// Whether `price` is an integer multiple of `tick`.
fn is_tick_multiple(price: Decimal, tick: Decimal) -> bool {
    if tick.is_zero() {
        return false;
    }
    let price = price.atomics();
    let tick = tick.atomics();
    (price.checked_rem(tick)).is_ok_and(|rem| rem.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn tick_multiples() {
        let tick = Decimal::from_str("0.01").unwrap();
        assert!(is_tick_multiple(Decimal::from_str("150.00").unwrap(), tick));
        assert!(is_tick_multiple(Decimal::from_str("0.03").unwrap(), tick));
        assert!(!is_tick_multiple(Decimal::from_str("0.005").unwrap(), tick));
        assert!(!is_tick_multiple(
            Decimal::from_str("150.001").unwrap(),
            tick
        ));
    }
}
