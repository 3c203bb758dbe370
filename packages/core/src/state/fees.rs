use crate::prelude::*;
use crate::state::market::MARKETS;
use msg::platform::fees::events::*;
use msg::platform::market::Market;

pub(super) const PENDING_LP_FEES: Map<&MarketId, Uint128> = Map::new(namespace::PENDING_LP_FEES);
pub(super) const LAST_FEE_SWEEP: Item<Timestamp> = Item::new(namespace::LAST_FEE_SWEEP);

impl State<'_> {
    /// Settles a transaction fee in the fee denom, auto-swapping the
    /// payer's other holdings against module reserves when the balance
    /// falls short. Auto-swap never mints: the fee denom it pays out must
    /// already sit in the fee module.
    pub(crate) fn deduct_fee(&self, ctx: &mut StateContext, payer: &Addr, fee: Uint128) -> Result<()> {
        if fee.is_zero() {
            return Ok(());
        }
        let denom = self.config.fee_denom.clone();

        let balance = self.bank.balance(ctx.storage, payer, &denom)?;
        if balance < fee && self.config.auto_swap_enabled {
            self.auto_swap_for_fee(ctx, payer, fee - balance)?;
        }

        let balance = self.bank.balance(ctx.storage, payer, &denom)?;
        platform_ensure!(
            balance >= fee,
            ErrorId::InsufficientFunds,
            ErrorDomain::Fees,
            "{payer} holds {balance} {denom}, fee is {fee}"
        );
        self.bank
            .send_to_module(ctx.storage, payer, module::FEES, &denom, fee)?;

        ctx.response_mut().add_event(FeeDeductedEvent {
            payer: payer.clone(),
            amount: fee,
        });
        Ok(())
    }

    /// Converts the payer's holdings into the fee denom until `shortfall`
    /// is covered or no convertible holdings remain. Each conversion draws
    /// its output from fee-module reserves; a shortage refunds the equity
    /// and skips the denom.
    fn auto_swap_for_fee(
        &self,
        ctx: &mut StateContext,
        payer: &Addr,
        mut shortfall: Uint128,
    ) -> Result<()> {
        let fee_denom = self.config.fee_denom.clone();
        let one_plus_slippage = Decimal::one() + self.config.swap_slippage;
        let output_rate = Decimal::one() - self.config.swap_fee_rate;

        let holdings = self.bank.all_balances(ctx.storage, payer)?;
        for coin in holdings {
            if shortfall.is_zero() {
                break;
            }
            if coin.denom == fee_denom || coin.amount.is_zero() {
                continue;
            }

            let market_id = MarketId::new(&coin.denom, &fee_denom);
            let market = match MARKETS.may_load(ctx.storage, &market_id)? {
                Some(market) if market.active => market,
                _ => continue,
            };
            let price = market.last_price;
            if price.is_zero() {
                // an unpriced market can neither size nor settle a swap
                continue;
            }

            let needed = shortfall
                .mul_ceil(one_plus_slippage)
                .checked_div_ceil(price)
                .unwrap_or_default();
            let equity_amount = needed.min(coin.amount);
            if equity_amount.is_zero() {
                continue;
            }
            let output = equity_amount.mul_floor(price).mul_floor(output_rate);
            if output.is_zero() {
                continue;
            }

            self.bank
                .send_to_module(ctx.storage, payer, module::FEES, &coin.denom, equity_amount)?;
            let reserves = self
                .bank
                .module_balance(ctx.storage, module::FEES, &fee_denom)?;
            if reserves < output {
                // reserves cannot cover the output and minting is forbidden
                self.bank.send_from_module(
                    ctx.storage,
                    module::FEES,
                    payer,
                    &coin.denom,
                    equity_amount,
                )?;
                continue;
            }
            self.bank
                .send_from_module(ctx.storage, module::FEES, payer, &fee_denom, output)?;

            shortfall = shortfall.saturating_sub(output);
            ctx.response_mut().add_event(EquityToFeeSwapEvent {
                payer: payer.clone(),
                equity_denom: coin.denom,
                equity_amount,
                output,
            });
        }
        Ok(())
    }

    /// Collects a trading fee into the dex module, best-effort. Returns
    /// what was actually collected; failures are reported as events and
    /// never void the settled trade.
    pub(super) fn collect_trading_fee(
        &self,
        ctx: &mut StateContext,
        market: &Market,
        payer: &Addr,
        amount: Uint128,
    ) -> Result<Uint128> {
        if amount.is_zero() {
            return Ok(Uint128::zero());
        }
        match self
            .bank
            .send_to_module(ctx.storage, payer, module::DEX, &market.quote, amount)
        {
            Ok(()) => {
                let market_id = market.id();
                let pending = PENDING_LP_FEES
                    .may_load(ctx.storage, &market_id)?
                    .unwrap_or_default();
                PENDING_LP_FEES.save(ctx.storage, &market_id, &(pending + amount))?;
                Ok(amount)
            }
            Err(err) => {
                ctx.response_mut().add_event(
                    Event::new("fee-collection-failed")
                        .add_attribute(event_key::PAYER, payer.to_string())
                        .add_attribute(event_key::AMOUNT, amount.to_string())
                        .add_attribute(event_key::ERROR, err.to_string()),
                );
                Ok(Uint128::zero())
            }
        }
    }

    /// Periodic sweep distributing collected trading fees to LP share
    /// holders pro rata. Dust below one unit per provider stays pending
    /// for the next sweep.
    pub(crate) fn distribute_lp_fees(&self, ctx: &mut StateContext) -> Result<()> {
        let due = match LAST_FEE_SWEEP.may_load(ctx.storage)? {
            None => true,
            Some(last) => {
                self.now().seconds() >= last.seconds() + self.config.fee_sweep_interval
            }
        };
        if !due {
            return Ok(());
        }
        LAST_FEE_SWEEP.save(ctx.storage, &self.now())?;

        let market_ids: Vec<MarketId> = PENDING_LP_FEES
            .keys(ctx.storage, None, None, Order::Ascending)
            .collect::<Result<_, _>>()?;

        for market_id in market_ids {
            let pending = PENDING_LP_FEES
                .may_load(ctx.storage, &market_id)?
                .unwrap_or_default();
            if pending.is_zero() {
                continue;
            }
            let market = self.load_market(ctx.storage, &market_id)?;
            let Some(pool) = self.may_load_pool(ctx.storage, &market_id)? else {
                continue;
            };
            if pool.lp_supply.is_zero() {
                continue;
            }

            let mut distributed = Uint128::zero();
            let mut providers = 0u64;
            for entry in self.lp_share_holders(ctx.storage, &market_id)? {
                let (provider, shares) = entry;
                let payout = pending.multiply_ratio(shares, pool.lp_supply);
                if payout.is_zero() {
                    continue;
                }
                self.bank.send_from_module(
                    ctx.storage,
                    module::DEX,
                    &provider,
                    &market.quote,
                    payout,
                )?;
                distributed += payout;
                providers += 1;
            }

            PENDING_LP_FEES.save(ctx.storage, &market_id, &(pending - distributed))?;
            if !distributed.is_zero() {
                ctx.response_mut().add_event(
                    msg::platform::liquidity::events::FeeDistributionEvent {
                        market_id,
                        distributed,
                        providers,
                    },
                );
            }
        }
        Ok(())
    }
}
