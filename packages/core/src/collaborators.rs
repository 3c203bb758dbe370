//! Interfaces to the external collaborators the core consumes.
//!
//! The core never imports concrete bank, staking or equity types. Every
//! collaborator operates on the shared `dyn Storage` so that handler-level
//! cache contexts cover collaborator writes too: discarding a cache rolls
//! back balance moves along with everything else.

use anyhow::Result;
use cosmwasm_std::{Addr, Coin, Decimal, Storage, Uint128};
use msg::ids::EscrowId;
use msg::tier::Tier;

/// Named module accounts holding platform-owned funds.
pub mod module {
    /// Order escrow and trading fee collection
    pub const DEX: &str = "dex";
    /// Collected transaction fees and auto-swap reserves
    pub const FEES: &str = "fees";
    /// Liquidity pool reserves
    pub const LIQUIDITY: &str = "liquidity";
    /// Bridge withdrawal escrow
    pub const BRIDGE: &str = "bridge";
    /// Dispute escrow holdings
    pub const DISPUTE: &str = "dispute";
    /// Recovery reserve fund
    pub const RESERVE: &str = "reserve";
    /// Inheritance estates
    pub const INHERITANCE: &str = "inheritance";
}

/// The balance ledger.
pub trait Bank {
    /// Balance of one denom for an account.
    fn balance(&self, storage: &dyn Storage, addr: &Addr, denom: &str) -> Result<Uint128>;

    /// All balances of an account.
    fn all_balances(&self, storage: &dyn Storage, addr: &Addr) -> Result<Vec<Coin>>;

    /// Balance of one denom for a module account.
    fn module_balance(&self, storage: &dyn Storage, module: &str, denom: &str) -> Result<Uint128>;

    /// All balances of a module account.
    fn module_all_balances(&self, storage: &dyn Storage, module: &str) -> Result<Vec<Coin>>;

    /// Account to account transfer.
    fn send(
        &self,
        storage: &mut dyn Storage,
        from: &Addr,
        to: &Addr,
        denom: &str,
        amount: Uint128,
    ) -> Result<()>;

    /// Account to module transfer.
    fn send_to_module(
        &self,
        storage: &mut dyn Storage,
        from: &Addr,
        module: &str,
        denom: &str,
        amount: Uint128,
    ) -> Result<()>;

    /// Module to account transfer.
    fn send_from_module(
        &self,
        storage: &mut dyn Storage,
        module: &str,
        to: &Addr,
        denom: &str,
        amount: Uint128,
    ) -> Result<()>;

    /// Module to module transfer.
    fn send_between_modules(
        &self,
        storage: &mut dyn Storage,
        from: &str,
        to: &str,
        denom: &str,
        amount: Uint128,
    ) -> Result<()>;

    /// Mint into a module account. Only bridge completions and tagged
    /// slash replacements may call this.
    fn mint(&self, storage: &mut dyn Storage, module: &str, denom: &str, amount: Uint128)
        -> Result<()>;

    /// Burn from a module account.
    fn burn(&self, storage: &mut dyn Storage, module: &str, denom: &str, amount: Uint128)
        -> Result<()>;
}

/// The staking subsystem.
pub trait Staking {
    /// Whether the address is an active validator.
    fn is_validator(&self, storage: &dyn Storage, addr: &Addr) -> Result<bool>;

    /// The address's staking tier.
    fn tier_of(&self, storage: &dyn Storage, addr: &Addr) -> Result<Tier>;

    /// Seconds the address's stake has been bonded.
    fn stake_age(&self, storage: &dyn Storage, addr: &Addr) -> Result<u64>;

    /// Active validators at or above a tier, in a deterministic order.
    fn validators_by_min_tier(&self, storage: &dyn Storage, tier: Tier) -> Result<Vec<Addr>>;

    /// Bonded stake of an address, in the fee denom.
    fn staked_amount(&self, storage: &dyn Storage, addr: &Addr) -> Result<Uint128>;

    /// Burn a fraction of the address's stake. Returns the amount removed.
    fn slash(
        &self,
        storage: &mut dyn Storage,
        addr: &Addr,
        fraction: Decimal,
        reason: &str,
    ) -> Result<Uint128>;

    /// Burn an absolute amount of the address's stake, bounded by what is
    /// bonded. Returns the amount removed.
    fn slash_amount(
        &self,
        storage: &mut dyn Storage,
        addr: &Addr,
        amount: Uint128,
        reason: &str,
    ) -> Result<Uint128>;

    /// Reputation reward for a successful dispute or review.
    fn reward_successful_dispute(
        &self,
        storage: &mut dyn Storage,
        addr: &Addr,
        id: EscrowId,
    ) -> Result<()>;

    /// Reputation penalty for a bad dispute or review.
    fn penalize_bad_dispute(
        &self,
        storage: &mut dyn Storage,
        addr: &Addr,
        id: EscrowId,
    ) -> Result<()>;
}

/// The equity and share registry.
pub trait Equity {
    /// Whether the denom is a registered company equity.
    fn is_equity(&self, storage: &dyn Storage, denom: &str) -> Result<bool>;

    /// Whether trading in the company is halted.
    fn is_trading_halted(&self, storage: &dyn Storage, company: &str) -> Result<bool>;

    /// Whether the address is blacklisted for the company.
    fn is_blacklisted(&self, storage: &dyn Storage, company: &str, addr: &Addr) -> Result<bool>;

    /// Record a new beneficial owner after a purchase.
    fn register_beneficial_owner(
        &self,
        storage: &mut dyn Storage,
        company: &str,
        addr: &Addr,
        shares: Uint128,
    ) -> Result<()>;

    /// Adjust a beneficial owner's share count.
    fn update_beneficial_owner_shares(
        &self,
        storage: &mut dyn Storage,
        company: &str,
        addr: &Addr,
        shares: Uint128,
    ) -> Result<()>;

    /// Remove a beneficial owner record after a full sale.
    fn unregister_beneficial_owner(
        &self,
        storage: &mut dyn Storage,
        company: &str,
        addr: &Addr,
    ) -> Result<()>;

    /// Confirm fraud against a company and optionally delist it.
    fn confirm_fraud_and_delist(
        &self,
        storage: &mut dyn Storage,
        company: &str,
        report_id: msg::ids::ReportId,
        actually_delist: bool,
    ) -> Result<()>;
}
