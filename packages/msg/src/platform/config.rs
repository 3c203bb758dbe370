//! Platform configuration.

use crate::tier::Tier;
use crate::time::{DAY_SECONDS, HOUR_SECONDS, YEAR_SECONDS};
use anyhow::{ensure, Result};
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Decimal, Uint128};

/// Singleton platform configuration, written at construction and updatable
/// only by governance.
#[cw_serde]
pub struct Config {
    /// Denom all transaction fees are settled in
    pub fee_denom: String,
    /// Governance address gating market creation, bridge administration and
    /// config updates
    pub governance: Addr,
    /// Protocol charity, the default inheritance fallback
    pub charity: Addr,

    /// Whether fee shortfalls may be covered by auto-swapping holdings
    pub auto_swap_enabled: bool,
    /// Fee rate applied to auto-swap conversions
    pub swap_fee_rate: Decimal,
    /// Slippage headroom applied when sizing an auto-swap
    pub swap_slippage: Decimal,

    /// Default maker fee for new markets
    pub default_maker_fee: Decimal,
    /// Default taker fee for new markets
    pub default_taker_fee: Decimal,
    /// Seconds between LP fee-distribution sweeps
    pub fee_sweep_interval: u64,
    /// Halt trading when the daily price move exceeds this ratio
    pub price_move_halt_ratio: Decimal,

    /// Maximum reports a single reporter may submit per utc day
    pub reports_per_day: u32,
    /// Maximum deadline extensions before a report escalates
    pub max_extensions: u32,
    /// Maximum escalations before a report goes to governance
    pub max_escalations: u32,
    /// Voluntary-return grace window in seconds
    pub voluntary_return_window: u64,
    /// Minimum stake age in seconds before an address may report
    pub min_reporter_stake_age: u64,
    /// Cooldown in seconds after being targeted before reporting back
    pub retaliation_cooldown: u64,
    /// Portion of every dispute escrow routed to the recovery reserve
    pub reserve_fee_rate: Decimal,
    /// Portion of excess recovery paid to the reporter
    pub reporter_reward_rate: Decimal,
    /// Absolute cap on the reporter reward, in the fee denom
    pub reporter_reward_cap: Uint128,
    /// Overshoot applied to the recovery target above the victim's need
    pub recovery_margin: Decimal,

    /// Portion of eligible validators whose attestation completes a deposit
    pub attestation_threshold: Decimal,
    /// Portion of session participants whose shares complete a signature
    pub tss_threshold: Decimal,
    /// Tss session timeout in seconds
    pub tss_timeout: u64,
    /// Seconds a withdrawal stays timelocked before signing may begin
    pub withdrawal_timelock: u64,
    /// Fee rate retained on bridge withdrawals
    pub bridge_fee_rate: Decimal,
    /// Minimum staking tier for bridge validators
    pub min_validator_tier: Tier,
    /// Default rate-limit window duration in seconds
    pub rate_limit_window: u64,
    /// Default rate-limit capacity per window, in internal units
    pub rate_limit_max: Uint128,

    /// Minimum inheritance grace period in seconds
    pub min_grace_period: u64,
    /// Dormancy after which an untriggered plan falls back to charity
    pub ultra_long_inactivity: u64,
}

impl Config {
    /// Defaults for everything except the addresses.
    pub fn new(governance: Addr, charity: Addr) -> Self {
        Config {
            fee_denom: "uhodl".to_owned(),
            governance,
            charity,
            auto_swap_enabled: true,
            swap_fee_rate: Decimal::permille(3),
            swap_slippage: Decimal::percent(1),
            default_maker_fee: Decimal::permille(1),
            default_taker_fee: Decimal::permille(2),
            fee_sweep_interval: DAY_SECONDS,
            price_move_halt_ratio: Decimal::percent(30),
            reports_per_day: 3,
            max_extensions: 2,
            max_escalations: 3,
            voluntary_return_window: 48 * HOUR_SECONDS,
            min_reporter_stake_age: 7 * DAY_SECONDS,
            retaliation_cooldown: 7 * DAY_SECONDS,
            reserve_fee_rate: Decimal::permille(1),
            reporter_reward_rate: Decimal::percent(10),
            reporter_reward_cap: Uint128::new(1_000_000_000),
            recovery_margin: Decimal::percent(10),
            attestation_threshold: Decimal::percent(67),
            tss_threshold: Decimal::percent(67),
            tss_timeout: HOUR_SECONDS,
            withdrawal_timelock: HOUR_SECONDS,
            bridge_fee_rate: Decimal::permille(1),
            min_validator_tier: Tier::Warden,
            rate_limit_window: DAY_SECONDS,
            rate_limit_max: Uint128::new(1_000_000_000_000),
            min_grace_period: 30 * DAY_SECONDS,
            ultra_long_inactivity: 50 * YEAR_SECONDS,
        }
    }

    /// Reject configurations that would violate subsystem invariants.
    pub fn check(&self) -> Result<()> {
        ensure!(!self.fee_denom.is_empty(), "fee denom must be set");
        ensure!(self.swap_fee_rate < Decimal::one(), "swap fee must be < 1");
        ensure!(
            self.default_maker_fee < Decimal::one() && self.default_taker_fee < Decimal::one(),
            "market fees must be < 1"
        );
        ensure!(
            self.attestation_threshold > Decimal::zero()
                && self.attestation_threshold <= Decimal::one(),
            "attestation threshold must be in (0, 1]"
        );
        ensure!(
            self.tss_threshold > Decimal::zero() && self.tss_threshold <= Decimal::one(),
            "tss threshold must be in (0, 1]"
        );
        ensure!(
            self.min_grace_period >= 30 * DAY_SECONDS,
            "grace period must be at least 30 days"
        );
        ensure!(self.rate_limit_window > 0, "rate limit window must be positive");
        Ok(())
    }
}

/// Partial config update applied by governance.
#[cw_serde]
#[derive(Default)]
pub struct ConfigUpdate {
    /// New charity address
    pub charity: Option<Addr>,
    /// Toggle fee auto-swap
    pub auto_swap_enabled: Option<bool>,
    /// New auto-swap fee rate
    pub swap_fee_rate: Option<Decimal>,
    /// New auto-swap slippage headroom
    pub swap_slippage: Option<Decimal>,
    /// New withdrawal timelock in seconds
    pub withdrawal_timelock: Option<u64>,
    /// New bridge fee rate
    pub bridge_fee_rate: Option<Decimal>,
    /// New default rate-limit capacity
    pub rate_limit_max: Option<Uint128>,
    /// New LP fee sweep interval in seconds
    pub fee_sweep_interval: Option<u64>,
}

impl ConfigUpdate {
    /// Apply the update on top of an existing config.
    pub fn apply(self, config: &mut Config) {
        let ConfigUpdate {
            charity,
            auto_swap_enabled,
            swap_fee_rate,
            swap_slippage,
            withdrawal_timelock,
            bridge_fee_rate,
            rate_limit_max,
            fee_sweep_interval,
        } = self;
        if let Some(charity) = charity {
            config.charity = charity;
        }
        if let Some(auto_swap_enabled) = auto_swap_enabled {
            config.auto_swap_enabled = auto_swap_enabled;
        }
        if let Some(swap_fee_rate) = swap_fee_rate {
            config.swap_fee_rate = swap_fee_rate;
        }
        if let Some(swap_slippage) = swap_slippage {
            config.swap_slippage = swap_slippage;
        }
        if let Some(withdrawal_timelock) = withdrawal_timelock {
            config.withdrawal_timelock = withdrawal_timelock;
        }
        if let Some(bridge_fee_rate) = bridge_fee_rate {
            config.bridge_fee_rate = bridge_fee_rate;
        }
        if let Some(rate_limit_max) = rate_limit_max {
            config.rate_limit_max = rate_limit_max;
        }
        if let Some(fee_sweep_interval) = fee_sweep_interval {
            config.fee_sweep_interval = fee_sweep_interval;
        }
    }
}
