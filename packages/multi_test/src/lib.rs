//! Off-chain test harness for the platform core: in-memory storage, mock
//! collaborators and a controllable block clock.

pub mod bank;
pub mod equity;
pub mod staking;

use anyhow::Result;
use core_engine::{BlockEnv, Collaborators};
use cosmwasm_std::{Addr, MemoryStorage, Response, Timestamp, Uint128};
use msg::platform::config::Config;
use msg::platform::entry::{ExecuteMsg, InstantiateMsg};
use msg::platform::market::MarketId;
use msg::tier::Tier;

pub use bank::MockBank;
pub use equity::MockEquity;
pub use staking::MockStaking;

pub const GOVERNANCE: &str = "governance";
pub const CHARITY: &str = "protocol-charity";

pub struct PlatformApp {
    pub storage: MemoryStorage,
    pub bank: MockBank,
    pub staking: MockStaking,
    pub equity: MockEquity,
    pub time: Timestamp,
    pub height: u64,
    pub hash_prefix: [u8; 8],
}

impl PlatformApp {
    pub fn new() -> Self {
        let mut app = PlatformApp {
            storage: MemoryStorage::new(),
            bank: MockBank,
            staking: MockStaking,
            equity: MockEquity,
            time: Timestamp::from_seconds(1_700_000_000),
            height: 1,
            hash_prefix: [7; 8],
        };
        let config = Config::new(Addr::unchecked(GOVERNANCE), Addr::unchecked(CHARITY));
        core_engine::instantiate(&mut app.storage, InstantiateMsg { config }).unwrap();
        app
    }

    pub fn env(&self) -> BlockEnv {
        BlockEnv {
            time: self.time,
            height: self.height,
            hash_prefix: self.hash_prefix,
        }
    }

    pub fn exec(&mut self, sender: &str, msg: ExecuteMsg) -> Result<Response> {
        let env = self.env();
        let collab = Collaborators {
            bank: &self.bank,
            staking: &self.staking,
            equity: &self.equity,
        };
        core_engine::execute(&mut self.storage, collab, env, &Addr::unchecked(sender), msg)
    }

    pub fn end_block(&mut self) -> Result<Response> {
        let env = self.env();
        let collab = Collaborators {
            bank: &self.bank,
            staking: &self.staking,
            equity: &self.equity,
        };
        core_engine::end_block(&mut self.storage, collab, env)
    }

    pub fn deduct_fee(&mut self, payer: &str, fee: Uint128) -> Result<Response> {
        let env = self.env();
        let collab = Collaborators {
            bank: &self.bank,
            staking: &self.staking,
            equity: &self.equity,
        };
        core_engine::deduct_fee(&mut self.storage, collab, env, &Addr::unchecked(payer), fee)
    }

    /// Advance the block clock without running EndBlock.
    pub fn advance_time(&mut self, seconds: u64) {
        self.time = self.time.plus_seconds(seconds);
        self.height += 1;
    }

    /// Advance the clock and run the EndBlock sweep.
    pub fn advance_blocks(&mut self, seconds: u64) -> Result<Response> {
        self.advance_time(seconds);
        self.end_block()
    }

    // bank conveniences

    pub fn fund(&mut self, addr: &str, denom: &str, amount: u128) {
        MockBank::fund(
            &mut self.storage,
            &Addr::unchecked(addr),
            denom,
            Uint128::new(amount),
        )
        .unwrap();
    }

    pub fn fund_module(&mut self, module: &str, denom: &str, amount: u128) {
        MockBank::fund_module(&mut self.storage, module, denom, Uint128::new(amount)).unwrap();
    }

    pub fn balance(&self, addr: &str, denom: &str) -> Uint128 {
        use core_engine::collaborators::Bank;
        self.bank
            .balance(&self.storage, &Addr::unchecked(addr), denom)
            .unwrap()
    }

    pub fn module_balance(&self, module: &str, denom: &str) -> Uint128 {
        use core_engine::collaborators::Bank;
        self.bank.module_balance(&self.storage, module, denom).unwrap()
    }

    pub fn supply(&self, denom: &str) -> Uint128 {
        MockBank::supply(&self.storage, denom).unwrap()
    }

    // staking conveniences

    pub fn add_staker(&mut self, addr: &str, tier: Tier, stake: u128, age_days: u64) {
        MockStaking::set_staker(
            &mut self.storage,
            &Addr::unchecked(addr),
            tier,
            Uint128::new(stake),
            age_days * 24 * 60 * 60,
            false,
        )
        .unwrap();
    }

    pub fn add_validator(&mut self, addr: &str, tier: Tier, stake: u128) {
        MockStaking::set_staker(
            &mut self.storage,
            &Addr::unchecked(addr),
            tier,
            Uint128::new(stake),
            30 * 24 * 60 * 60,
            true,
        )
        .unwrap();
    }

    /// Permanently ban an address through the history record, as a
    /// confirmed-abuse outcome would.
    pub fn ban_address(&mut self, addr: &str) {
        use cw_storage_plus::Map;
        use msg::platform::history::{BanState, ReporterHistory};
        let histories: Map<&Addr, ReporterHistory> = Map::new(msg::namespace::REPORTER_HISTORY);
        let addr = Addr::unchecked(addr);
        let mut history = histories
            .may_load(&self.storage, &addr)
            .unwrap()
            .unwrap_or_default();
        history.ban = BanState {
            is_banned: true,
            reason: Some("test ban".to_owned()),
            banned_at: Some(self.time),
            expires_at: None,
            ban_count: history.ban.ban_count + 1,
        };
        histories.save(&mut self.storage, &addr, &history).unwrap();
    }

    // market conveniences

    /// The `APPLE/HODL` market most tests trade: tick 0.01, lot 1.
    pub fn create_apple_market(&mut self) -> MarketId {
        self.exec(
            GOVERNANCE,
            ExecuteMsg::CreateMarket {
                base: "APPLE".to_owned(),
                quote: "uhodl".to_owned(),
                tick_size: "0.01".parse().unwrap(),
                lot_size: Uint128::new(1),
                min_order_size: Uint128::new(1),
                max_order_size: Uint128::new(1_000_000_000),
                maker_fee: None,
                taker_fee: None,
            },
        )
        .unwrap();
        MarketId::new("APPLE", "uhodl")
    }
}

impl Default for PlatformApp {
    fn default() -> Self {
        Self::new()
    }
}
