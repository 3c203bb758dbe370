use crate::prelude::*;
use msg::platform::market::TraderStats;
use msg::platform::order::Trade;

const TRADER_STATS: Map<&Addr, TraderStats> = Map::new(namespace::TRADER_STATS);

impl State<'_> {
    /// Per-trader rollups feeding the fraud heuristics.
    pub(super) fn record_trader_stats(&self, ctx: &mut StateContext, trade: &Trade) -> Result<()> {
        let quote_volume = trade.quantity.mul_floor(trade.price);
        let self_cross = trade.buyer == trade.seller;

        for addr in [&trade.buyer, &trade.seller] {
            let mut stats = TRADER_STATS
                .may_load(ctx.storage, addr)?
                .unwrap_or_default();
            stats.trade_count += 1;
            stats.volume_quote += quote_volume;
            if self_cross {
                stats.self_crossings += 1;
            }
            TRADER_STATS.save(ctx.storage, addr, &stats)?;
            if self_cross {
                // both sides are the same record; write once
                break;
            }
        }
        Ok(())
    }

    /// Keeps the equity registry's beneficial-owner records in step with a
    /// fill. Registry errors are reported, never fatal.
    pub(super) fn sync_beneficial_owners(
        &self,
        ctx: &mut StateContext,
        company: &str,
        buyer: &Addr,
        seller: &Addr,
        shares: Uint128,
        seller_filled_out: bool,
    ) {
        let result = (|| -> Result<()> {
            self.equity
                .register_beneficial_owner(ctx.storage, company, buyer, shares)?;
            let seller_remaining = self.bank.balance(ctx.storage, seller, company)?;
            if seller_filled_out && seller_remaining.is_zero() {
                self.equity
                    .unregister_beneficial_owner(ctx.storage, company, seller)?;
            } else {
                self.equity.update_beneficial_owner_shares(
                    ctx.storage,
                    company,
                    seller,
                    seller_remaining,
                )?;
            }
            Ok(())
        })();
        if let Err(err) = result {
            ctx.response_mut().add_event(
                Event::new("beneficial-owner-sync-failed")
                    .add_attribute(event_key::ASSET, company.to_string())
                    .add_attribute(event_key::ERROR, err.to_string()),
            );
        }
    }
}
