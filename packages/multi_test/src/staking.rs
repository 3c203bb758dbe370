//! An in-storage staking mock with settable tiers, stake and age.

use anyhow::Result;
use core_engine::collaborators::Staking;
use cosmwasm_std::{Addr, Decimal, Storage, Uint128};
use cw_storage_plus::Map;
use msg::ids::EscrowId;
use msg::tier::Tier;

const VALIDATORS: Map<&Addr, ()> = Map::new("mock-staking-validators");
const TIERS: Map<&Addr, Tier> = Map::new("mock-staking-tiers");
const STAKE: Map<&Addr, Uint128> = Map::new("mock-staking-stake");
const STAKE_AGE: Map<&Addr, u64> = Map::new("mock-staking-age");
const DISPUTE_REWARDS: Map<(&Addr, u64), u32> = Map::new("mock-staking-rewards");
const DISPUTE_PENALTIES: Map<(&Addr, u64), u32> = Map::new("mock-staking-penalties");

#[derive(Default)]
pub struct MockStaking;

impl MockStaking {
    /// Register a staker, optionally as a validator.
    pub fn set_staker(
        storage: &mut dyn Storage,
        addr: &Addr,
        tier: Tier,
        stake: Uint128,
        stake_age: u64,
        validator: bool,
    ) -> Result<()> {
        TIERS.save(storage, addr, &tier)?;
        STAKE.save(storage, addr, &stake)?;
        STAKE_AGE.save(storage, addr, &stake_age)?;
        if validator {
            VALIDATORS.save(storage, addr, &())?;
        } else {
            VALIDATORS.remove(storage, addr);
        }
        Ok(())
    }

    /// How often the dispute reward hook fired for (addr, escrow).
    pub fn dispute_rewards(storage: &dyn Storage, addr: &Addr, id: EscrowId) -> Result<u32> {
        Ok(DISPUTE_REWARDS
            .may_load(storage, (addr, id.u64()))?
            .unwrap_or_default())
    }
}

impl Staking for MockStaking {
    fn is_validator(&self, storage: &dyn Storage, addr: &Addr) -> Result<bool> {
        Ok(VALIDATORS.has(storage, addr))
    }

    fn tier_of(&self, storage: &dyn Storage, addr: &Addr) -> Result<Tier> {
        Ok(TIERS.may_load(storage, addr)?.unwrap_or(Tier::Bronze))
    }

    fn stake_age(&self, storage: &dyn Storage, addr: &Addr) -> Result<u64> {
        Ok(STAKE_AGE.may_load(storage, addr)?.unwrap_or_default())
    }

    fn validators_by_min_tier(&self, storage: &dyn Storage, tier: Tier) -> Result<Vec<Addr>> {
        // iteration over the map is address-ordered, so the result is
        // deterministic across runs
        let mut out = vec![];
        for entry in TIERS.range(storage, None, None, cosmwasm_std::Order::Ascending) {
            let (addr, t) = entry?;
            if t >= tier && VALIDATORS.has(storage, &addr) {
                out.push(addr);
            }
        }
        Ok(out)
    }

    fn staked_amount(&self, storage: &dyn Storage, addr: &Addr) -> Result<Uint128> {
        Ok(STAKE.may_load(storage, addr)?.unwrap_or_default())
    }

    fn slash(
        &self,
        storage: &mut dyn Storage,
        addr: &Addr,
        fraction: Decimal,
        _reason: &str,
    ) -> Result<Uint128> {
        let stake = self.staked_amount(storage, addr)?;
        let slashed = stake.mul_floor(fraction);
        STAKE.save(storage, addr, &(stake - slashed))?;
        Ok(slashed)
    }

    fn slash_amount(
        &self,
        storage: &mut dyn Storage,
        addr: &Addr,
        amount: Uint128,
        _reason: &str,
    ) -> Result<Uint128> {
        let stake = self.staked_amount(storage, addr)?;
        let slashed = amount.min(stake);
        STAKE.save(storage, addr, &(stake - slashed))?;
        Ok(slashed)
    }

    fn reward_successful_dispute(
        &self,
        storage: &mut dyn Storage,
        addr: &Addr,
        id: EscrowId,
    ) -> Result<()> {
        let count = DISPUTE_REWARDS
            .may_load(storage, (addr, id.u64()))?
            .unwrap_or_default();
        DISPUTE_REWARDS.save(storage, (addr, id.u64()), &(count + 1))?;
        Ok(())
    }

    fn penalize_bad_dispute(
        &self,
        storage: &mut dyn Storage,
        addr: &Addr,
        id: EscrowId,
    ) -> Result<()> {
        let count = DISPUTE_PENALTIES
            .may_load(storage, (addr, id.u64()))?
            .unwrap_or_default();
        DISPUTE_PENALTIES.save(storage, (addr, id.u64()), &(count + 1))?;
        Ok(())
    }
}
