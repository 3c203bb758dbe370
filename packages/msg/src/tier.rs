//! Staking tiers consumed by the dispute and bridge pipelines.

use cosmwasm_schema::cw_serde;
use enum_iterator::Sequence;
use std::fmt;

/// A rank drawn from the staking subsystem, with increasing stake and
/// privilege thresholds.
#[cw_serde]
#[derive(Copy, PartialOrd, Ord, Eq, Sequence)]
pub enum Tier {
    /// Entry level, no dispute privileges
    Bronze,
    /// Minimum tier for submitting reports
    Keeper,
    /// Reviews priority 1-3 reports
    Warden,
    /// Reviews priority 4 reports
    Steward,
    /// Reviews priority 5 reports and level 3 appeals
    Archon,
}

impl Tier {
    /// Numeric rank used by the priority formula.
    pub fn rank(self) -> u8 {
        match self {
            Tier::Bronze => 0,
            Tier::Keeper => 1,
            Tier::Warden => 2,
            Tier::Steward => 3,
            Tier::Archon => 4,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Tier::Bronze => "bronze",
            Tier::Keeper => "keeper",
            Tier::Warden => "warden",
            Tier::Steward => "steward",
            Tier::Archon => "archon",
        };
        write!(f, "{s}")
    }
}
