//! An in-storage equity registry mock.

use anyhow::Result;
use core_engine::collaborators::Equity;
use cosmwasm_std::{Addr, Storage, Uint128};
use cw_storage_plus::Map;
use msg::ids::ReportId;

const EQUITIES: Map<&str, ()> = Map::new("mock-equity-registered");
const HALTED: Map<&str, ()> = Map::new("mock-equity-halted");
const BLACKLIST: Map<(&str, &Addr), ()> = Map::new("mock-equity-blacklist");
const OWNERS: Map<(&str, &Addr), Uint128> = Map::new("mock-equity-owners");
const DELISTED: Map<&str, u64> = Map::new("mock-equity-delisted");

#[derive(Default)]
pub struct MockEquity;

impl MockEquity {
    pub fn register_equity(storage: &mut dyn Storage, company: &str) -> Result<()> {
        Ok(EQUITIES.save(storage, company, &())?)
    }

    pub fn set_halted(storage: &mut dyn Storage, company: &str, halted: bool) -> Result<()> {
        if halted {
            EQUITIES.save(storage, company, &())?;
            Ok(HALTED.save(storage, company, &())?)
        } else {
            HALTED.remove(storage, company);
            Ok(())
        }
    }

    pub fn set_blacklisted(
        storage: &mut dyn Storage,
        company: &str,
        addr: &Addr,
        blacklisted: bool,
    ) -> Result<()> {
        if blacklisted {
            Ok(BLACKLIST.save(storage, (company, addr), &())?)
        } else {
            BLACKLIST.remove(storage, (company, addr));
            Ok(())
        }
    }

    /// The report that delisted a company, if any.
    pub fn delisted_by(storage: &dyn Storage, company: &str) -> Result<Option<u64>> {
        Ok(DELISTED.may_load(storage, company)?)
    }

    /// Registered beneficial-owner shares, for registry sync assertions.
    pub fn owner_shares(storage: &dyn Storage, company: &str, addr: &Addr) -> Result<Option<Uint128>> {
        Ok(OWNERS.may_load(storage, (company, addr))?)
    }
}

impl Equity for MockEquity {
    fn is_equity(&self, storage: &dyn Storage, denom: &str) -> Result<bool> {
        Ok(EQUITIES.has(storage, denom))
    }

    fn is_trading_halted(&self, storage: &dyn Storage, company: &str) -> Result<bool> {
        Ok(HALTED.has(storage, company))
    }

    fn is_blacklisted(&self, storage: &dyn Storage, company: &str, addr: &Addr) -> Result<bool> {
        Ok(BLACKLIST.has(storage, (company, addr)))
    }

    fn register_beneficial_owner(
        &self,
        storage: &mut dyn Storage,
        company: &str,
        addr: &Addr,
        shares: Uint128,
    ) -> Result<()> {
        let held = OWNERS
            .may_load(storage, (company, addr))?
            .unwrap_or_default();
        Ok(OWNERS.save(storage, (company, addr), &(held + shares))?)
    }

    fn update_beneficial_owner_shares(
        &self,
        storage: &mut dyn Storage,
        company: &str,
        addr: &Addr,
        shares: Uint128,
    ) -> Result<()> {
        Ok(OWNERS.save(storage, (company, addr), &shares)?)
    }

    fn unregister_beneficial_owner(
        &self,
        storage: &mut dyn Storage,
        company: &str,
        addr: &Addr,
    ) -> Result<()> {
        OWNERS.remove(storage, (company, addr));
        Ok(())
    }

    fn confirm_fraud_and_delist(
        &self,
        storage: &mut dyn Storage,
        company: &str,
        report_id: ReportId,
        actually_delist: bool,
    ) -> Result<()> {
        if actually_delist {
            DELISTED.save(storage, company, &report_id.u64())?;
        }
        Ok(())
    }
}
