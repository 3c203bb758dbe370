use crate::prelude::*;
use msg::platform::market::{events::*, Guardrail, Market, MarketStats};

pub(crate) const MARKETS: Map<&MarketId, Market> = Map::new(namespace::MARKETS);
const MARKET_STATS: Map<&MarketId, MarketStats> = Map::new(namespace::MARKET_STATS);
pub(super) const GUARDRAILS: Map<&MarketId, Guardrail> = Map::new(namespace::MARKET_GUARDRAILS);

impl State<'_> {
    /// Lists a new market. Governance gated.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn create_market(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        base: String,
        quote: String,
        tick_size: Decimal,
        lot_size: Uint128,
        min_order_size: Uint128,
        max_order_size: Uint128,
        maker_fee: Option<Decimal>,
        taker_fee: Option<Decimal>,
    ) -> Result<()> {
        self.assert_governance(sender)?;

        platform_ensure!(
            !base.is_empty() && !quote.is_empty() && base != quote,
            ErrorId::InvalidMarket,
            ErrorDomain::Dex,
            "invalid market symbols {base}/{quote}"
        );
        platform_ensure!(
            min_order_size <= max_order_size,
            ErrorId::InvalidMarket,
            ErrorDomain::Dex,
            "min order size exceeds max order size"
        );
        platform_ensure!(
            !tick_size.is_zero() && !lot_size.is_zero(),
            ErrorId::InvalidMarket,
            ErrorDomain::Dex,
            "tick and lot size must be positive"
        );

        let maker_fee = maker_fee.unwrap_or(self.config.default_maker_fee);
        let taker_fee = taker_fee.unwrap_or(self.config.default_taker_fee);
        platform_ensure!(
            maker_fee < Decimal::one() && taker_fee < Decimal::one(),
            ErrorId::InvalidMarket,
            ErrorDomain::Dex,
            "market fees must be below 100%"
        );

        let market_id = MarketId::new(&base, &quote);
        platform_ensure!(
            !MARKETS.has(ctx.storage, &market_id),
            ErrorId::MarketAlreadyExists,
            ErrorDomain::Dex,
            "market {market_id} already exists"
        );

        let market = Market {
            base,
            quote,
            active: true,
            trading_halted: false,
            tick_size,
            lot_size,
            min_order_size,
            max_order_size,
            maker_fee,
            taker_fee,
            last_price: Decimal::zero(),
            created_at: self.now(),
            updated_at: self.now(),
        };
        MARKETS.save(ctx.storage, &market_id, &market)?;

        ctx.response_mut().add_event(MarketCreatedEvent {
            market_id,
            tick_size,
        });

        Ok(())
    }

    pub(crate) fn load_market(&self, store: &dyn Storage, market_id: &MarketId) -> Result<Market> {
        MARKETS
            .may_load(store, market_id)?
            .ok_or_else(|| {
                platform_anyhow!(
                    ErrorId::MarketNotFound,
                    ErrorDomain::Dex,
                    "market {market_id} not found"
                )
            })
    }

    /// A market that accepts orders right now.
    pub(crate) fn load_active_market(
        &self,
        store: &dyn Storage,
        market_id: &MarketId,
    ) -> Result<Market> {
        let market = self.load_market(store, market_id)?;
        platform_ensure!(
            market.active,
            ErrorId::MarketInactive,
            ErrorDomain::Dex,
            "market {market_id} is inactive"
        );
        platform_ensure!(
            !market.trading_halted,
            ErrorId::TradingHalted,
            ErrorDomain::Dex,
            "trading in {market_id} is halted"
        );
        let guardrail = GUARDRAILS
            .may_load(store, market_id)?
            .unwrap_or_default();
        platform_ensure!(
            !guardrail.price_halted,
            ErrorId::TradingHalted,
            ErrorDomain::Dex,
            "trading in {market_id} is halted by the price guardrail"
        );
        Ok(market)
    }

    /// Every listed market id, for the per-market EndBlock passes. The
    /// market set is governance curated and small.
    pub(crate) fn all_market_ids(&self, store: &dyn Storage) -> Result<Vec<MarketId>> {
        MARKETS
            .keys(store, None, None, Order::Ascending)
            .map(|res| res.map_err(|err| err.into()))
            .collect()
    }

    /// Refreshes `updated_at` and, after a trade, the last price and the
    /// daily stats bucket. The last price only moves on trades.
    pub(crate) fn update_market_stats(
        &self,
        ctx: &mut StateContext,
        market_id: &MarketId,
        trade: Option<(Decimal, Uint128, Uint128)>,
    ) -> Result<()> {
        let mut market = self.load_market(ctx.storage, market_id)?;
        market.updated_at = self.now();

        if let Some((price, quantity, quote_volume)) = trade {
            market.last_price = price;

            let today = day_number(self.now());
            let mut stats = MARKET_STATS
                .may_load(ctx.storage, market_id)?
                .unwrap_or_default();
            if stats.day != today || stats.trade_count == 0 {
                stats = MarketStats {
                    day: today,
                    high: price,
                    low: price,
                    open: price,
                    volume_base: Uint128::zero(),
                    volume_quote: Uint128::zero(),
                    trade_count: 0,
                };
            }
            stats.high = stats.high.max(price);
            stats.low = stats.low.min(price);
            stats.volume_base += quantity;
            stats.volume_quote += quote_volume;
            stats.trade_count += 1;
            MARKET_STATS.save(ctx.storage, market_id, &stats)?;

            self.check_price_guardrail(ctx, market_id, &stats, price)?;
        }

        MARKETS.save(ctx.storage, market_id, &market)?;
        Ok(())
    }

    fn check_price_guardrail(
        &self,
        ctx: &mut StateContext,
        market_id: &MarketId,
        stats: &MarketStats,
        price: Decimal,
    ) -> Result<()> {
        if stats.open.is_zero() {
            return Ok(());
        }
        let move_ratio = if price > stats.open {
            (price - stats.open) / stats.open
        } else {
            (stats.open - price) / stats.open
        };
        if move_ratio > self.config.price_move_halt_ratio {
            let mut guardrail = GUARDRAILS
                .may_load(ctx.storage, market_id)?
                .unwrap_or_default();
            if !guardrail.price_halted {
                guardrail.price_halted = true;
                GUARDRAILS.save(ctx.storage, market_id, &guardrail)?;
                ctx.response_mut().add_event(MarketHaltedEvent {
                    market_id: market_id.clone(),
                    move_ratio,
                });
            }
        }
        Ok(())
    }

    /// Flags a market after a confirmed manipulation report.
    pub(crate) fn flag_market_for_investigation(
        &self,
        ctx: &mut StateContext,
        market_id: &MarketId,
        report_id: ReportId,
    ) -> Result<()> {
        let mut guardrail = GUARDRAILS
            .may_load(ctx.storage, market_id)?
            .unwrap_or_default();
        guardrail.under_investigation = true;
        GUARDRAILS.save(ctx.storage, market_id, &guardrail)?;
        ctx.response_mut().add_event(MarketFlaggedEvent {
            market_id: market_id.clone(),
            report_id,
        });
        Ok(())
    }
}
