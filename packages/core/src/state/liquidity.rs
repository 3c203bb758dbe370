use crate::prelude::*;
use cosmwasm_std::Isqrt;
use msg::platform::liquidity::{events::*, LiquidityPool};

const POOLS: Map<&MarketId, LiquidityPool> = Map::new(namespace::LIQUIDITY_POOLS);
const LP_SHARES: Map<(&MarketId, &Addr), Uint128> = Map::new(namespace::LP_SHARES);

impl State<'_> {
    pub(super) fn may_load_pool(
        &self,
        store: &dyn Storage,
        market_id: &MarketId,
    ) -> Result<Option<LiquidityPool>> {
        Ok(POOLS.may_load(store, market_id)?)
    }

    fn load_pool(&self, store: &dyn Storage, market_id: &MarketId) -> Result<LiquidityPool> {
        self.may_load_pool(store, market_id)?.ok_or_else(|| {
            platform_anyhow!(
                ErrorId::MarketNotFound,
                ErrorDomain::Liquidity,
                "no pool for market {market_id}"
            )
        })
    }

    pub(super) fn lp_share_holders(
        &self,
        store: &dyn Storage,
        market_id: &MarketId,
    ) -> Result<Vec<(Addr, Uint128)>> {
        LP_SHARES
            .prefix(market_id)
            .range(store, None, None, Order::Ascending)
            .map(|res| res.map_err(|err| err.into()))
            .collect()
    }

    pub(crate) fn create_pool(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        market_id: MarketId,
        fee_rate: Decimal,
        base_amount: Uint128,
        quote_amount: Uint128,
    ) -> Result<()> {
        let market = self.load_market(ctx.storage, &market_id)?;
        platform_ensure!(
            !POOLS.has(ctx.storage, &market_id),
            ErrorId::MarketAlreadyExists,
            ErrorDomain::Liquidity,
            "pool for {market_id} already exists"
        );
        platform_ensure!(
            fee_rate < Decimal::one(),
            ErrorId::InvalidAsset,
            ErrorDomain::Liquidity,
            "pool fee must be below 100%"
        );
        platform_ensure!(
            !base_amount.is_zero() && !quote_amount.is_zero(),
            ErrorId::AmountTooSmall,
            ErrorDomain::Liquidity,
            "initial reserves must be positive"
        );

        self.bank
            .send_to_module(ctx.storage, sender, module::LIQUIDITY, &market.base, base_amount)?;
        self.bank.send_to_module(
            ctx.storage,
            sender,
            module::LIQUIDITY,
            &market.quote,
            quote_amount,
        )?;

        let lp_minted: Uint128 = base_amount
            .full_mul(quote_amount)
            .isqrt()
            .try_into()
            .context("initial LP supply overflow")?;

        let pool = LiquidityPool {
            market_id: market_id.clone(),
            base_reserve: base_amount,
            quote_reserve: quote_amount,
            lp_supply: lp_minted,
            fee_rate,
            volume_24h: Uint128::zero(),
            fees_24h: Uint128::zero(),
            day: day_number(self.now()),
        };
        POOLS.save(ctx.storage, &market_id, &pool)?;
        LP_SHARES.save(ctx.storage, (&market_id, sender), &lp_minted)?;

        ctx.response_mut().add_event(PoolCreatedEvent {
            market_id: market_id.clone(),
        });
        ctx.response_mut().add_event(LiquidityAddedEvent {
            market_id,
            provider: sender.clone(),
            base_amount,
            quote_amount,
            lp_minted,
        });
        Ok(())
    }

    pub(crate) fn add_liquidity(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        market_id: MarketId,
        base_amount: Uint128,
        quote_amount: Uint128,
    ) -> Result<()> {
        let market = self.load_market(ctx.storage, &market_id)?;
        let mut pool = self.load_pool(ctx.storage, &market_id)?;
        platform_ensure!(
            !base_amount.is_zero(),
            ErrorId::AmountTooSmall,
            ErrorDomain::Liquidity,
            "deposit must be positive"
        );

        // preserve the reserve ratio; the quote the caller offered is a cap
        let quote_needed = base_amount.multiply_ratio(pool.quote_reserve, pool.base_reserve);
        platform_ensure!(
            quote_amount >= quote_needed,
            ErrorId::InsufficientFunds,
            ErrorDomain::Liquidity,
            "ratio requires {quote_needed} quote, only {quote_amount} offered"
        );

        self.bank
            .send_to_module(ctx.storage, sender, module::LIQUIDITY, &market.base, base_amount)?;
        self.bank.send_to_module(
            ctx.storage,
            sender,
            module::LIQUIDITY,
            &market.quote,
            quote_needed,
        )?;

        let lp_minted = pool.lp_supply.multiply_ratio(base_amount, pool.base_reserve);
        pool.base_reserve += base_amount;
        pool.quote_reserve += quote_needed;
        pool.lp_supply += lp_minted;
        POOLS.save(ctx.storage, &market_id, &pool)?;

        let shares = LP_SHARES
            .may_load(ctx.storage, (&market_id, sender))?
            .unwrap_or_default();
        LP_SHARES.save(ctx.storage, (&market_id, sender), &(shares + lp_minted))?;

        ctx.response_mut().add_event(LiquidityAddedEvent {
            market_id,
            provider: sender.clone(),
            base_amount,
            quote_amount: quote_needed,
            lp_minted,
        });
        Ok(())
    }

    pub(crate) fn remove_liquidity(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        market_id: MarketId,
        lp_amount: Uint128,
    ) -> Result<()> {
        let market = self.load_market(ctx.storage, &market_id)?;
        let mut pool = self.load_pool(ctx.storage, &market_id)?;
        let shares = LP_SHARES
            .may_load(ctx.storage, (&market_id, sender))?
            .unwrap_or_default();
        platform_ensure!(
            !lp_amount.is_zero() && lp_amount <= shares,
            ErrorId::InsufficientBalance,
            ErrorDomain::Liquidity,
            "{sender} holds {shares} LP shares, asked to burn {lp_amount}"
        );

        let base_out = pool.base_reserve.multiply_ratio(lp_amount, pool.lp_supply);
        let quote_out = pool.quote_reserve.multiply_ratio(lp_amount, pool.lp_supply);

        pool.base_reserve -= base_out;
        pool.quote_reserve -= quote_out;
        pool.lp_supply -= lp_amount;
        POOLS.save(ctx.storage, &market_id, &pool)?;

        let remaining = shares - lp_amount;
        if remaining.is_zero() {
            LP_SHARES.remove(ctx.storage, (&market_id, sender));
        } else {
            LP_SHARES.save(ctx.storage, (&market_id, sender), &remaining)?;
        }

        self.bank
            .send_from_module(ctx.storage, module::LIQUIDITY, sender, &market.base, base_out)?;
        self.bank.send_from_module(
            ctx.storage,
            module::LIQUIDITY,
            sender,
            &market.quote,
            quote_out,
        )?;

        ctx.response_mut().add_event(LiquidityRemovedEvent {
            market_id,
            provider: sender.clone(),
            base_amount: base_out,
            quote_amount: quote_out,
            lp_burned: lp_amount,
        });
        Ok(())
    }

    /// Constant-product swap against the pool.
    pub(crate) fn swap(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        market_id: MarketId,
        offer_denom: String,
        offer_amount: Uint128,
        min_receive: Option<Uint128>,
    ) -> Result<()> {
        let market = self.load_active_market(ctx.storage, &market_id)?;
        let mut pool = self.load_pool(ctx.storage, &market_id)?;
        platform_ensure!(
            !offer_amount.is_zero(),
            ErrorId::AmountTooSmall,
            ErrorDomain::Liquidity,
            "swap amount must be positive"
        );

        let offer_is_base = if offer_denom == market.base {
            true
        } else if offer_denom == market.quote {
            false
        } else {
            platform_bail!(
                ErrorId::InvalidAsset,
                ErrorDomain::Liquidity,
                "{offer_denom} is not traded in {market_id}"
            );
        };
        let ask_denom = if offer_is_base {
            market.quote.clone()
        } else {
            market.base.clone()
        };

        let fee = offer_amount.mul_floor(pool.fee_rate);
        let offer_after_fee = offer_amount - fee;
        let (in_reserve, out_reserve) = if offer_is_base {
            (pool.base_reserve, pool.quote_reserve)
        } else {
            (pool.quote_reserve, pool.base_reserve)
        };
        let ask_amount = out_reserve.multiply_ratio(offer_after_fee, in_reserve + offer_after_fee);
        platform_ensure!(
            !ask_amount.is_zero(),
            ErrorId::AmountTooSmall,
            ErrorDomain::Liquidity,
            "swap output rounds to zero"
        );
        if let Some(min_receive) = min_receive {
            platform_ensure!(
                ask_amount >= min_receive,
                ErrorId::AmountTooSmall,
                ErrorDomain::Liquidity,
                "output {ask_amount} below minimum {min_receive}"
            );
        }

        self.bank
            .send_to_module(ctx.storage, sender, module::LIQUIDITY, &offer_denom, offer_amount)?;
        self.bank
            .send_from_module(ctx.storage, module::LIQUIDITY, sender, &ask_denom, ask_amount)?;

        // the fee stays in the in-side reserve, accruing to LPs
        if offer_is_base {
            pool.base_reserve += offer_amount;
            pool.quote_reserve -= ask_amount;
        } else {
            pool.quote_reserve += offer_amount;
            pool.base_reserve -= ask_amount;
        }
        let today = day_number(self.now());
        if pool.day != today {
            pool.day = today;
            pool.volume_24h = Uint128::zero();
            pool.fees_24h = Uint128::zero();
        }
        let quote_volume = if offer_is_base { ask_amount } else { offer_amount };
        pool.volume_24h += quote_volume;
        pool.fees_24h += fee;
        POOLS.save(ctx.storage, &market_id, &pool)?;

        ctx.response_mut().add_event(SwapEvent {
            market_id,
            trader: sender.clone(),
            offer_denom,
            offer_amount,
            ask_denom,
            ask_amount,
            fee,
        });
        Ok(())
    }
}
