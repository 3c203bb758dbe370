//! Inheritance plans, the dead-man switch.

use crate::ids::PlanId;
use anyhow::{ensure, Result};
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Coin, Decimal, Timestamp};
use std::fmt;

/// A beneficiary entry in a plan.
#[cw_serde]
pub struct Beneficiary {
    /// Receiving address
    pub address: Addr,
    /// Claim order; unique within a plan, 1 claims first
    pub priority: u32,
    /// Share of the remaining estate, in [0, 1]
    pub percentage: Decimal,
    /// Assets delivered before the percentage split
    pub specific_assets: Vec<Coin>,
}

/// Plan lifecycle.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum PlanStatus {
    /// Monitoring owner activity
    Active,
    /// Inactivity elapsed, grace window running
    Triggered,
    /// Grace elapsed, claim windows cascading
    Executing,
    /// Estate fully distributed
    Completed,
    /// Cancelled by the owner
    Cancelled,
}

impl PlanStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, PlanStatus::Completed | PlanStatus::Cancelled)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            PlanStatus::Active => "active",
            PlanStatus::Triggered => "triggered",
            PlanStatus::Executing => "executing",
            PlanStatus::Completed => "completed",
            PlanStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// The claim window currently open for one beneficiary priority.
#[cw_serde]
pub struct ClaimWindow {
    /// Priority whose window is open
    pub priority: u32,
    /// When the window closes and the cascade advances
    pub ends_at: Timestamp,
}

/// An inheritance plan.
#[cw_serde]
pub struct InheritancePlan {
    /// Unique plan id
    pub plan_id: PlanId,
    /// Monitored owner
    pub owner: Addr,
    /// Beneficiaries ordered by priority
    pub beneficiaries: Vec<Beneficiary>,
    /// Owner inactivity before the plan triggers, seconds
    pub inactivity_period: u64,
    /// Grace window after triggering, seconds; at least 30 days
    pub grace_period: u64,
    /// Length of each beneficiary claim window, seconds
    pub claim_window: u64,
    /// Fallback for residual assets; defaults to the protocol charity
    pub charity: Addr,
    /// Lifecycle status
    pub status: PlanStatus,
    /// Creation time
    pub created_at: Timestamp,
    /// When the plan triggered
    pub trigger_at: Option<Timestamp>,
    /// When the grace window ends
    pub grace_end: Option<Timestamp>,
    /// The open claim window while Executing
    pub current_claim_window: Option<ClaimWindow>,
    /// Estate swept into the inheritance module at trigger time
    pub escrowed: Vec<Coin>,
    /// Priorities whose claims were satisfied or skipped
    pub settled_priorities: Vec<u32>,
}

impl InheritancePlan {
    /// Validate beneficiary structure: unique priorities, percentages in
    /// [0, 1] summing to at most 1.
    pub fn check_beneficiaries(beneficiaries: &[Beneficiary]) -> Result<()> {
        ensure!(!beneficiaries.is_empty(), "at least one beneficiary required");
        let mut priorities: Vec<u32> = beneficiaries.iter().map(|b| b.priority).collect();
        priorities.sort_unstable();
        priorities.dedup();
        ensure!(
            priorities.len() == beneficiaries.len(),
            "beneficiary priorities must be unique"
        );
        ensure!(
            priorities.iter().all(|p| *p >= 1),
            "priorities start at 1"
        );
        let total: Decimal = beneficiaries
            .iter()
            .map(|b| b.percentage)
            .sum();
        ensure!(total <= Decimal::one(), "percentages exceed 100%");
        Ok(())
    }

    /// Beneficiaries in claim order.
    pub fn ordered_beneficiaries(&self) -> Vec<&Beneficiary> {
        let mut out: Vec<&Beneficiary> = self.beneficiaries.iter().collect();
        out.sort_by_key(|b| b.priority);
        out
    }

    /// The next unsettled priority after `current`, if any.
    pub fn next_priority(&self, current: Option<u32>) -> Option<u32> {
        self.ordered_beneficiaries()
            .iter()
            .map(|b| b.priority)
            .find(|p| {
                current.is_none_or(|c| *p > c) && !self.settled_priorities.contains(p)
            })
    }

    /// Beneficiary at a given priority.
    pub fn beneficiary_at(&self, priority: u32) -> Option<&Beneficiary> {
        self.beneficiaries.iter().find(|b| b.priority == priority)
    }
}

/// Events
pub mod events {
    use super::*;
    use crate::constants::event_key;
    use cosmwasm_std::{Event, Uint128};

    /// A plan was created or updated.
    pub struct PlanStoredEvent {
        /// Unique plan id
        pub plan_id: PlanId,
        /// Plan owner
        pub owner: Addr,
        /// Beneficiary count
        pub beneficiaries: u32,
    }

    impl From<PlanStoredEvent> for Event {
        fn from(src: PlanStoredEvent) -> Self {
            Event::new("plan-stored")
                .add_attribute(event_key::PLAN_ID, src.plan_id.to_string())
                .add_attribute(event_key::OWNER, src.owner.to_string())
                .add_attribute("beneficiaries", src.beneficiaries.to_string())
        }
    }

    /// A plan triggered on owner inactivity.
    pub struct PlanTriggeredEvent {
        /// The plan
        pub plan_id: PlanId,
        /// Trigger time
        pub triggered_at: Timestamp,
        /// End of the grace window
        pub grace_end: Timestamp,
    }

    impl From<PlanTriggeredEvent> for Event {
        fn from(src: PlanTriggeredEvent) -> Self {
            Event::new("plan-triggered")
                .add_attribute(event_key::PLAN_ID, src.plan_id.to_string())
                .add_attribute(event_key::TRIGGERED_AT, src.triggered_at.nanos().to_string())
                .add_attribute(event_key::GRACE_END, src.grace_end.nanos().to_string())
        }
    }

    /// A trigger was cancelled by fresh owner activity.
    pub struct TriggerCancelledEvent {
        /// The plan returning to Active
        pub plan_id: PlanId,
    }

    impl From<TriggerCancelledEvent> for Event {
        fn from(src: TriggerCancelledEvent) -> Self {
            Event::new("trigger-cancelled")
                .add_attribute(event_key::PLAN_ID, src.plan_id.to_string())
        }
    }

    /// A claim window opened for a priority.
    pub struct ClaimWindowOpenedEvent {
        /// The plan
        pub plan_id: PlanId,
        /// Priority now able to claim
        pub priority: u32,
        /// Window close time
        pub window_end: Timestamp,
    }

    impl From<ClaimWindowOpenedEvent> for Event {
        fn from(src: ClaimWindowOpenedEvent) -> Self {
            Event::new("claim-window-opened")
                .add_attribute(event_key::PLAN_ID, src.plan_id.to_string())
                .add_attribute(event_key::PRIORITY, src.priority.to_string())
                .add_attribute(event_key::WINDOW_END, src.window_end.nanos().to_string())
        }
    }

    /// A beneficiary claim settled, or was skipped for a ban.
    pub struct ClaimSettledEvent {
        /// The plan
        pub plan_id: PlanId,
        /// Beneficiary involved
        pub beneficiary: Addr,
        /// `claimed` or `skipped`
        pub action: String,
        /// Quote-less total of coins delivered; zero when skipped
        pub coins_delivered: u32,
    }

    impl From<ClaimSettledEvent> for Event {
        fn from(src: ClaimSettledEvent) -> Self {
            Event::new("claim-settled")
                .add_attribute(event_key::PLAN_ID, src.plan_id.to_string())
                .add_attribute(event_key::BENEFICIARY, src.beneficiary.to_string())
                .add_attribute(event_key::ACTION, src.action)
                .add_attribute("coins-delivered", src.coins_delivered.to_string())
        }
    }

    /// Residual estate fell back to charity.
    pub struct CharityFallbackEvent {
        /// The plan
        pub plan_id: PlanId,
        /// Receiving charity
        pub charity: Addr,
        /// Number of coin entries transferred
        pub coins: u32,
        /// Total of fee-denom units among them, for audit convenience
        pub fee_denom_total: Uint128,
    }

    impl From<CharityFallbackEvent> for Event {
        fn from(src: CharityFallbackEvent) -> Self {
            Event::new("charity-fallback")
                .add_attribute(event_key::PLAN_ID, src.plan_id.to_string())
                .add_attribute(event_key::CHARITY, src.charity.to_string())
                .add_attribute("coins", src.coins.to_string())
                .add_attribute("fee-denom-total", src.fee_denom_total.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beneficiary(addr: &str, priority: u32, pct: u64) -> Beneficiary {
        Beneficiary {
            address: Addr::unchecked(addr),
            priority,
            percentage: Decimal::percent(pct),
            specific_assets: vec![],
        }
    }

    #[test]
    fn beneficiary_validation() {
        InheritancePlan::check_beneficiaries(&[
            beneficiary("b1", 1, 50),
            beneficiary("b2", 2, 50),
        ])
        .unwrap();

        assert!(InheritancePlan::check_beneficiaries(&[]).is_err());
        assert!(InheritancePlan::check_beneficiaries(&[
            beneficiary("b1", 1, 50),
            beneficiary("b2", 1, 50),
        ])
        .is_err());
        assert!(InheritancePlan::check_beneficiaries(&[
            beneficiary("b1", 1, 60),
            beneficiary("b2", 2, 60),
        ])
        .is_err());
    }
}
