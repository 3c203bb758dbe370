//! An in-storage bank mock.
//!
//! Balances live in the same `dyn Storage` the core writes, so handler
//! cache contexts roll bank moves back together with everything else.

use anyhow::{ensure, Result};
use core_engine::collaborators::Bank;
use cosmwasm_std::{Addr, Coin, Storage, Uint128};
use cw_storage_plus::Map;

const BALANCES: Map<(&str, &str), Uint128> = Map::new("mock-bank-balances");
const SUPPLY: Map<&str, Uint128> = Map::new("mock-bank-supply");

fn account_key(addr: &Addr) -> String {
    format!("a/{addr}")
}

fn module_key(module: &str) -> String {
    format!("m/{module}")
}

#[derive(Default)]
pub struct MockBank;

impl MockBank {
    fn holder_balance(storage: &dyn Storage, holder: &str, denom: &str) -> Result<Uint128> {
        Ok(BALANCES
            .may_load(storage, (holder, denom))?
            .unwrap_or_default())
    }

    fn holder_all(storage: &dyn Storage, holder: &str) -> Result<Vec<Coin>> {
        BALANCES
            .prefix(holder)
            .range(storage, None, None, cosmwasm_std::Order::Ascending)
            .filter_map(|res| match res {
                Ok((_, amount)) if amount.is_zero() => None,
                Ok((denom, amount)) => Some(Ok(Coin {
                    denom,
                    amount,
                })),
                Err(err) => Some(Err(err.into())),
            })
            .collect()
    }

    fn credit(storage: &mut dyn Storage, holder: &str, denom: &str, amount: Uint128) -> Result<()> {
        let balance = Self::holder_balance(storage, holder, denom)?;
        BALANCES.save(storage, (holder, denom), &(balance + amount))?;
        Ok(())
    }

    fn debit(storage: &mut dyn Storage, holder: &str, denom: &str, amount: Uint128) -> Result<()> {
        let balance = Self::holder_balance(storage, holder, denom)?;
        ensure!(
            balance >= amount,
            "insufficient funds: {holder} holds {balance} {denom}, needs {amount}"
        );
        BALANCES.save(storage, (holder, denom), &(balance - amount))?;
        Ok(())
    }

    fn transfer(
        storage: &mut dyn Storage,
        from: &str,
        to: &str,
        denom: &str,
        amount: Uint128,
    ) -> Result<()> {
        Self::debit(storage, from, denom, amount)?;
        Self::credit(storage, to, denom, amount)
    }

    /// Test setup: conjure a balance out of thin air, adjusting supply.
    pub fn fund(storage: &mut dyn Storage, addr: &Addr, denom: &str, amount: Uint128) -> Result<()> {
        Self::credit(storage, &account_key(addr), denom, amount)?;
        let supply = Self::supply(storage, denom)?;
        SUPPLY.save(storage, denom, &(supply + amount))?;
        Ok(())
    }

    /// Test setup: fund a module account directly.
    pub fn fund_module(
        storage: &mut dyn Storage,
        module: &str,
        denom: &str,
        amount: Uint128,
    ) -> Result<()> {
        Self::credit(storage, &module_key(module), denom, amount)?;
        let supply = Self::supply(storage, denom)?;
        SUPPLY.save(storage, denom, &(supply + amount))?;
        Ok(())
    }

    /// Total circulating supply of a denom, for no-mint assertions.
    pub fn supply(storage: &dyn Storage, denom: &str) -> Result<Uint128> {
        Ok(SUPPLY.may_load(storage, denom)?.unwrap_or_default())
    }
}

impl Bank for MockBank {
    fn balance(&self, storage: &dyn Storage, addr: &Addr, denom: &str) -> Result<Uint128> {
        Self::holder_balance(storage, &account_key(addr), denom)
    }

    fn all_balances(&self, storage: &dyn Storage, addr: &Addr) -> Result<Vec<Coin>> {
        Self::holder_all(storage, &account_key(addr))
    }

    fn module_balance(&self, storage: &dyn Storage, module: &str, denom: &str) -> Result<Uint128> {
        Self::holder_balance(storage, &module_key(module), denom)
    }

    fn module_all_balances(&self, storage: &dyn Storage, module: &str) -> Result<Vec<Coin>> {
        Self::holder_all(storage, &module_key(module))
    }

    fn send(
        &self,
        storage: &mut dyn Storage,
        from: &Addr,
        to: &Addr,
        denom: &str,
        amount: Uint128,
    ) -> Result<()> {
        Self::transfer(storage, &account_key(from), &account_key(to), denom, amount)
    }

    fn send_to_module(
        &self,
        storage: &mut dyn Storage,
        from: &Addr,
        module: &str,
        denom: &str,
        amount: Uint128,
    ) -> Result<()> {
        Self::transfer(storage, &account_key(from), &module_key(module), denom, amount)
    }

    fn send_from_module(
        &self,
        storage: &mut dyn Storage,
        module: &str,
        to: &Addr,
        denom: &str,
        amount: Uint128,
    ) -> Result<()> {
        Self::transfer(storage, &module_key(module), &account_key(to), denom, amount)
    }

    fn send_between_modules(
        &self,
        storage: &mut dyn Storage,
        from: &str,
        to: &str,
        denom: &str,
        amount: Uint128,
    ) -> Result<()> {
        Self::transfer(storage, &module_key(from), &module_key(to), denom, amount)
    }

    fn mint(
        &self,
        storage: &mut dyn Storage,
        module: &str,
        denom: &str,
        amount: Uint128,
    ) -> Result<()> {
        Self::credit(storage, &module_key(module), denom, amount)?;
        let supply = Self::supply(storage, denom)?;
        SUPPLY.save(storage, denom, &(supply + amount))?;
        Ok(())
    }

    fn burn(
        &self,
        storage: &mut dyn Storage,
        module: &str,
        denom: &str,
        amount: Uint128,
    ) -> Result<()> {
        Self::debit(storage, &module_key(module), denom, amount)?;
        let supply = Self::supply(storage, denom)?;
        ensure!(supply >= amount, "burning more {denom} than exists");
        SUPPLY.save(storage, denom, &(supply - amount))?;
        Ok(())
    }
}
