use crate::cache::CacheStorage;
use crate::prelude::*;
use crate::state::order::{BOOK_ASKS, BOOK_BIDS, STOP_BUY, STOP_SELL};
use msg::platform::market::Market;
use msg::platform::order::{
    events::*, Order as DexOrder, OrderSide, OrderStatus, OrderType, TimeInForce, Trade,
};

pub(super) const LAST_TRADE_ID: Item<TradeId> = Item::new(namespace::LAST_TRADE_ID);
pub(super) const TRADES: Map<TradeId, Trade> = Map::new(namespace::TRADES);

impl State<'_> {
    /// Accepts an order: validates, escrows, stores it, and for fillable
    /// orders runs the matching loop and time-in-force handling. Returns
    /// the order in its post-matching state.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn place_order(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        market_id: MarketId,
        side: OrderSide,
        order_type: OrderType,
        time_in_force: TimeInForce,
        quantity: Uint128,
        price: Option<Decimal>,
        stop_price: Option<Decimal>,
        expires_at: Option<Timestamp>,
        client_order_id: Option<String>,
    ) -> Result<DexOrder> {
        let market = self.validate_placement(
            ctx.storage,
            sender,
            &market_id,
            side,
            order_type,
            time_in_force,
            quantity,
            price,
            stop_price,
            expires_at,
        )?;

        let order_id = self.next_order_id(ctx.storage)?;

        let escrow = self.order_escrow(&market, side, quantity, price);
        if let Some((denom, amount)) = &escrow {
            self.bank
                .send_to_module(ctx.storage, sender, module::DEX, denom, *amount)?;
        }

        let is_stop = matches!(order_type, OrderType::Stop | OrderType::StopLimit);
        let mut order = DexOrder {
            order_id,
            market_id,
            owner: sender.clone(),
            side,
            order_type,
            time_in_force,
            quantity,
            filled_quantity: Uint128::zero(),
            remaining_quantity: quantity,
            price,
            stop_price,
            average_price: Decimal::zero(),
            escrow_remaining: escrow.map(|(_, amount)| amount).unwrap_or_default(),
            status: if is_stop {
                OrderStatus::Pending
            } else {
                OrderStatus::Open
            },
            client_order_id,
            created_at: self.now(),
            updated_at: self.now(),
            expires_at,
        };
        self.write_order(ctx, None, &order)?;

        if !is_stop {
            order = self.match_order(ctx, &market, order)?;
        }

        ctx.response_mut().add_event(PlaceOrderEvent {
            order: order.clone(),
        });
        Ok(order)
    }

    /// Matches a stored incoming order against the opposite book in
    /// price-time order, then applies time-in-force handling to the
    /// residual.
    pub(super) fn match_order(
        &self,
        ctx: &mut StateContext,
        market: &Market,
        mut taker: DexOrder,
    ) -> Result<DexOrder> {
        // FOK executes nothing unless the pre-scan covers it completely
        if taker.time_in_force == TimeInForce::Fok {
            let fillable = self.fillable_quantity(ctx.storage, &taker)?;
            if fillable < taker.remaining_quantity {
                return self.cancel_taker_residual(ctx, taker);
            }
        }

        let market_id = taker.market_id.clone();
        let book = match taker.side {
            OrderSide::Buy => BOOK_ASKS,
            OrderSide::Sell => BOOK_BIDS,
        };
        let mut after: Option<Bound<(PriceKey, OrderId)>> = None;

        while !taker.remaining_quantity.is_zero() {
            let entry = book
                .sub_prefix(&market_id)
                .keys(ctx.storage, after.clone(), None, Order::Ascending)
                .next()
                .transpose()?;
            let (price_key, maker_id) = match entry {
                Some(entry) => entry,
                None => break,
            };
            after = Some(Bound::exclusive((price_key, maker_id)));

            if maker_id == taker.order_id {
                continue;
            }
            let maker = self.load_order(ctx.storage, maker_id)?;
            let maker_price = match maker.price {
                Some(price) => price,
                None => continue,
            };

            // the book is sorted best-first: the first incompatible maker
            // ends the scan for priced takers
            if let Some(limit) = taker.price {
                let compatible = match taker.side {
                    OrderSide::Buy => maker_price <= limit,
                    OrderSide::Sell => maker_price >= limit,
                };
                if !compatible {
                    break;
                }
            }

            let fill = taker.remaining_quantity.min(maker.remaining_quantity);
            if fill.is_zero() {
                continue;
            }

            self.execute_fill(ctx, market, &mut taker, maker, fill, maker_price)?;
        }

        if !taker.remaining_quantity.is_zero() {
            match taker.time_in_force {
                TimeInForce::Gtc | TimeInForce::Gtd => {
                    // market orders cannot rest; their residual cancels
                    if taker.price.is_none() {
                        return self.cancel_taker_residual(ctx, taker);
                    }
                }
                TimeInForce::Ioc | TimeInForce::Fok => {
                    return self.cancel_taker_residual(ctx, taker);
                }
            }
        }

        Ok(taker)
    }

    /// Read-only scan totalling the quantity an FOK taker could fill.
    fn fillable_quantity(&self, store: &dyn Storage, taker: &DexOrder) -> Result<Uint128> {
        let book = match taker.side {
            OrderSide::Buy => BOOK_ASKS,
            OrderSide::Sell => BOOK_BIDS,
        };
        let mut total = Uint128::zero();
        for entry in book
            .sub_prefix(&taker.market_id)
            .keys(store, None, None, Order::Ascending)
        {
            let (_, maker_id) = entry?;
            if maker_id == taker.order_id {
                continue;
            }
            let maker = self.load_order(store, maker_id)?;
            let maker_price = match maker.price {
                Some(price) => price,
                None => continue,
            };
            if let Some(limit) = taker.price {
                let compatible = match taker.side {
                    OrderSide::Buy => maker_price <= limit,
                    OrderSide::Sell => maker_price >= limit,
                };
                if !compatible {
                    break;
                }
            }
            total += maker.remaining_quantity;
            if total >= taker.remaining_quantity {
                break;
            }
        }
        Ok(total)
    }

    /// Settles one taker/maker pair. Base and quote move atomically inside
    /// a cache context; a failed transfer voids only this pair. Fees are
    /// best-effort afterwards.
    fn execute_fill(
        &self,
        ctx: &mut StateContext,
        market: &Market,
        taker: &mut DexOrder,
        mut maker: DexOrder,
        fill: Uint128,
        price: Decimal,
    ) -> Result<()> {
        let taker_is_buy = taker.side == OrderSide::Buy;
        let buyer_is_maker = !taker_is_buy;
        let (buyer_addr, seller_addr, buy_order_id, sell_order_id) = if taker_is_buy {
            (
                taker.owner.clone(),
                maker.owner.clone(),
                taker.order_id,
                maker.order_id,
            )
        } else {
            (
                maker.owner.clone(),
                taker.owner.clone(),
                maker.order_id,
                taker.order_id,
            )
        };
        let quote_paid = fill.mul_floor(price);

        // buyer side funding: escrow at the limit price, or the account
        // directly for unpriced buys
        let buyer_escrow_release = {
            let buyer = if taker_is_buy { &*taker } else { &maker };
            buyer
                .price
                .map(|limit| fill.mul_ceil(limit).min(buyer.escrow_remaining))
        };

        let settled: Result<()> = {
            let mut cache = CacheStorage::new(&mut *ctx.storage);
            let result = (|| -> Result<()> {
                // base leg, always from the sell-side escrow
                self.bank.send_from_module(
                    &mut cache,
                    module::DEX,
                    &buyer_addr,
                    &market.base,
                    fill,
                )?;
                // quote leg
                match buyer_escrow_release {
                    Some(release) => {
                        self.bank.send_from_module(
                            &mut cache,
                            module::DEX,
                            &seller_addr,
                            &market.quote,
                            quote_paid,
                        )?;
                        // price improvement over the escrowed rate returns
                        // to the buyer
                        let refund = release.saturating_sub(quote_paid);
                        if !refund.is_zero() {
                            self.bank.send_from_module(
                                &mut cache,
                                module::DEX,
                                &buyer_addr,
                                &market.quote,
                                refund,
                            )?;
                        }
                    }
                    None => {
                        self.bank.send(
                            &mut cache,
                            &buyer_addr,
                            &seller_addr,
                            &market.quote,
                            quote_paid,
                        )?;
                    }
                }
                Ok(())
            })();
            result.map(|()| cache.commit())
        };
        if let Err(err) = settled {
            ctx.response_mut().add_event(
                Event::new("fill-voided")
                    .add_attribute(event_key::BUY_ORDER_ID, buy_order_id.to_string())
                    .add_attribute(event_key::SELL_ORDER_ID, sell_order_id.to_string())
                    .add_attribute(event_key::ERROR, err.to_string()),
            );
            return Ok(());
        }

        // fees are supplementary: failure never voids the settled trade
        let maker_fee = quote_paid.mul_floor(market.maker_fee);
        let taker_fee = quote_paid.mul_floor(market.taker_fee);
        let (buyer_fee_due, seller_fee_due) = if taker_is_buy {
            (taker_fee, maker_fee)
        } else {
            (maker_fee, taker_fee)
        };
        let buyer_fee = self.collect_trading_fee(ctx, market, &buyer_addr, buyer_fee_due)?;
        let seller_fee = self.collect_trading_fee(ctx, market, &seller_addr, seller_fee_due)?;

        // fold the fill into both orders
        let old_taker = taker.clone();
        let old_maker = maker.clone();
        apply_fill(taker, fill, price, self.now());
        apply_fill(&mut maker, fill, price, self.now());
        if let Some(release) = buyer_escrow_release {
            let buy_order = if taker_is_buy { &mut *taker } else { &mut maker };
            buy_order.escrow_remaining -= release;
        }
        {
            let sell_order = if taker_is_buy { &mut maker } else { &mut *taker };
            sell_order.escrow_remaining = sell_order.escrow_remaining.saturating_sub(fill);
        }
        self.refund_filled_dust(ctx, market, taker)?;
        self.refund_filled_dust(ctx, market, &mut maker)?;
        self.write_order(ctx, Some(&old_maker), &maker)?;
        self.write_order(ctx, Some(&old_taker), taker)?;

        // beneficial ownership follows the base asset for equities
        if self.equity.is_equity(ctx.storage, &market.base)? {
            let seller_filled_out = if taker_is_buy {
                maker.remaining_quantity.is_zero()
            } else {
                taker.remaining_quantity.is_zero()
            };
            self.sync_beneficial_owners(
                ctx,
                &market.base,
                &buyer_addr,
                &seller_addr,
                fill,
                seller_filled_out,
            );
        }

        // record the trade
        let trade_id = alloc_id(ctx.storage, &LAST_TRADE_ID)?;
        let trade = Trade {
            trade_id,
            market_id: taker.market_id.clone(),
            buy_order_id,
            sell_order_id,
            buyer: buyer_addr,
            seller: seller_addr,
            quantity: fill,
            price,
            buyer_fee,
            seller_fee,
            buyer_is_maker,
            executed_at: self.now(),
        };
        TRADES.save(ctx.storage, trade_id, &trade)?;
        ctx.response_mut().add_event(TradeEvent {
            trade: trade.clone(),
        });

        let market_id = taker.market_id.clone();
        self.update_market_stats(ctx, &market_id, Some((price, fill, quote_paid)))?;
        self.record_trader_stats(ctx, &trade)?;

        Ok(())
    }

    /// Rounding can leave a few units of quote escrow behind when a buy
    /// order fills completely; hand them back.
    fn refund_filled_dust(
        &self,
        ctx: &mut StateContext,
        market: &Market,
        order: &mut DexOrder,
    ) -> Result<()> {
        if order.status != OrderStatus::Filled || order.escrow_remaining.is_zero() {
            return Ok(());
        }
        let denom = match order.side {
            OrderSide::Buy => &market.quote,
            OrderSide::Sell => &market.base,
        };
        self.bank.send_from_module(
            ctx.storage,
            module::DEX,
            &order.owner,
            denom,
            order.escrow_remaining,
        )?;
        order.escrow_remaining = Uint128::zero();
        Ok(())
    }

    /// Cancels the unfilled residual of a taker order, refunding escrow.
    /// The order keeps its fills: zero fills cancel outright, partial
    /// fills terminate as PartiallyFilled with the residual burned.
    fn cancel_taker_residual(&self, ctx: &mut StateContext, mut taker: DexOrder) -> Result<DexOrder> {
        let old = taker.clone();

        let refund = taker.escrow_remaining;
        if !refund.is_zero() {
            let market = self.load_market(ctx.storage, &taker.market_id)?;
            let denom = match taker.side {
                OrderSide::Buy => market.quote,
                OrderSide::Sell => market.base,
            };
            self.bank
                .send_from_module(ctx.storage, module::DEX, &taker.owner, &denom, refund)?;
        }

        taker.escrow_remaining = Uint128::zero();
        taker.remaining_quantity = Uint128::zero();
        taker.status = if taker.filled_quantity.is_zero() {
            OrderStatus::Cancelled
        } else {
            OrderStatus::PartiallyFilled
        };
        taker.updated_at = self.now();
        self.write_order(ctx, Some(&old), &taker)?;

        ctx.response_mut().add_event(CancelOrderEvent {
            order_id: taker.order_id,
            refunded: refund,
            status: taker.status,
        });
        Ok(taker)
    }

    /// Triggers every stop order in the market crossed by the latest
    /// price. Bounded by the stop-price indexes; the last price is
    /// re-read after each trigger because triggered orders trade.
    pub(crate) fn process_stop_orders(
        &self,
        ctx: &mut StateContext,
        market_id: &MarketId,
    ) -> Result<()> {
        loop {
            let market = self.load_market(ctx.storage, market_id)?;
            let last_price = market.last_price;
            if last_price.is_zero() {
                return Ok(());
            }
            let last_key = PriceKey::ascending(last_price);

            // buy stops trigger at last >= stop, i.e. stop keys <= last
            let buy_hit = STOP_BUY
                .sub_prefix(market_id)
                .keys(
                    ctx.storage,
                    None,
                    Some(Bound::inclusive((last_key, OrderId::new(u64::MAX)))),
                    Order::Ascending,
                )
                .next()
                .transpose()?;
            // sell stops trigger at last <= stop, i.e. stop keys >= last
            let sell_hit = STOP_SELL
                .sub_prefix(market_id)
                .keys(
                    ctx.storage,
                    Some(Bound::inclusive((last_key, OrderId::new(0)))),
                    None,
                    Order::Ascending,
                )
                .next()
                .transpose()?;

            let order_id = match buy_hit.or(sell_hit) {
                Some((_, order_id)) => order_id,
                None => return Ok(()),
            };
            self.trigger_stop_order(ctx, &market, order_id, last_price)?;
        }
    }

    fn trigger_stop_order(
        &self,
        ctx: &mut StateContext,
        market: &Market,
        order_id: OrderId,
        last_price: Decimal,
    ) -> Result<()> {
        let order = self.load_order(ctx.storage, order_id)?;
        let mut triggered = order.clone();
        triggered.order_type = match order.order_type {
            OrderType::Stop => OrderType::Market,
            OrderType::StopLimit => OrderType::Limit,
            other => other,
        };
        triggered.status = OrderStatus::Open;
        triggered.updated_at = self.now();
        self.write_order(ctx, Some(&order), &triggered)?;

        ctx.response_mut().add_event(StopTriggeredEvent {
            order_id,
            last_price,
        });

        self.match_order(ctx, market, triggered)?;
        Ok(())
    }
}

/// Folds one fill into an order's quantities, average price and status.
fn apply_fill(order: &mut DexOrder, fill: Uint128, price: Decimal, now: Timestamp) {
    let filled_before = order.filled_quantity;
    order.filled_quantity += fill;
    order.remaining_quantity -= fill;
    order.updated_at = now;

    let weighted = order.average_price * Decimal::from_ratio(filled_before, 1u128)
        + price * Decimal::from_ratio(fill, 1u128);
    order.average_price = weighted / Decimal::from_ratio(order.filled_quantity, 1u128);

    order.status = if order.remaining_quantity.is_zero() {
        OrderStatus::Filled
    } else {
        OrderStatus::PartiallyFilled
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_fill_tracks_average_price() {
        let mut order = DexOrder {
            order_id: OrderId::new(1),
            market_id: MarketId::new("APPLE", "HODL"),
            owner: Addr::unchecked("trader"),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::Gtc,
            quantity: Uint128::new(100),
            filled_quantity: Uint128::zero(),
            remaining_quantity: Uint128::new(100),
            price: Some(Decimal::percent(15000)),
            stop_price: None,
            average_price: Decimal::zero(),
            escrow_remaining: Uint128::new(15000),
            status: OrderStatus::Open,
            client_order_id: None,
            created_at: Timestamp::from_seconds(0),
            updated_at: Timestamp::from_seconds(0),
            expires_at: None,
        };

        apply_fill(
            &mut order,
            Uint128::new(40),
            Decimal::percent(14000),
            Timestamp::from_seconds(1),
        );
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.average_price, Decimal::percent(14000));

        apply_fill(
            &mut order,
            Uint128::new(60),
            Decimal::percent(15000),
            Timestamp::from_seconds(2),
        );
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.remaining_quantity, Uint128::zero());
        // 40 @ 140 + 60 @ 150 = 146 average
        assert_eq!(order.average_price, Decimal::percent(14600));
    }
}
