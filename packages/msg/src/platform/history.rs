//! Reporter and moderator track records and ban state.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Decimal, Timestamp, Uint128};

/// Ban state carried by a reporter history record.
#[cw_serde]
#[derive(Default)]
pub struct BanState {
    /// Whether the address is currently banned
    pub is_banned: bool,
    /// Why the current ban was applied
    pub reason: Option<String>,
    /// When the current ban started
    pub banned_at: Option<Timestamp>,
    /// When the current ban lifts; None means permanent
    pub expires_at: Option<Timestamp>,
    /// Lifetime count of bans applied
    pub ban_count: u32,
}

impl BanState {
    /// Whether the ban is active at `now`. Temporary bans lapse at their
    /// expiry even before the EndBlock sweep clears the flag.
    pub fn active(&self, now: Timestamp) -> bool {
        if !self.is_banned {
            return false;
        }
        match self.expires_at {
            None => true,
            Some(expires_at) => now <= expires_at,
        }
    }
}

/// Per-address reporter track record.
#[cw_serde]
#[derive(Default)]
pub struct ReporterHistory {
    /// Reports ever submitted
    pub total_reports: u64,
    /// Reports confirmed
    pub confirmed_reports: u64,
    /// Reports dismissed
    pub dismissed_reports: u64,
    /// Current run of consecutive dismissals
    pub consecutive_dismissed: u32,
    /// Cumulative reputation lost to penalties
    pub reputation_lost: u64,
    /// Cumulative stake slashed, in the fee denom
    pub stake_slashed: Uint128,
    /// Last time this address was itself the target of a report
    pub last_targeted_at: Option<Timestamp>,
    /// Last time this address submitted a report, for streak cooldowns
    pub last_report_at: Option<Timestamp>,
    /// Ban state
    pub ban: BanState,
}

impl ReporterHistory {
    /// Dismissed share of resolved reports.
    pub fn false_report_rate(&self) -> Decimal {
        let resolved = self.confirmed_reports + self.dismissed_reports;
        if resolved == 0 {
            Decimal::zero()
        } else {
            Decimal::from_ratio(self.dismissed_reports, resolved)
        }
    }

    /// Resolved reports counted by the false-rate rules.
    pub fn resolved_reports(&self) -> u64 {
        self.confirmed_reports + self.dismissed_reports
    }
}

/// Per-address moderator track record.
#[cw_serde]
#[derive(Default)]
pub struct ModeratorMetrics {
    /// Review decisions participated in
    pub total_decisions: u64,
    /// Decisions later overturned on appeal
    pub overturned: u64,
    /// Current run of consecutive overturns
    pub consecutive_overturns: u32,
    /// Reports filed against this moderator
    pub reports_against: u64,
    /// Of those, confirmed
    pub confirmed_reports: u64,
    /// Warnings issued by the auto-blacklist review rule
    pub warnings: u32,
    /// Whether the moderator is blacklisted from review duty
    pub blacklisted: bool,
    /// When a temporary blacklist lifts; None while permanent or clear
    pub blacklist_expires_at: Option<Timestamp>,
}

impl ModeratorMetrics {
    /// Overturned share of all decisions.
    pub fn overturn_rate(&self) -> Decimal {
        if self.total_decisions == 0 {
            Decimal::zero()
        } else {
            Decimal::from_ratio(self.overturned, self.total_decisions)
        }
    }

    /// Whether the moderator may be assigned reviews at `now`.
    pub fn eligible(&self, now: Timestamp) -> bool {
        if !self.blacklisted {
            return true;
        }
        match self.blacklist_expires_at {
            None => false,
            Some(expires_at) => now > expires_at,
        }
    }
}

/// Events
pub mod events {
    use crate::constants::event_key;
    use cosmwasm_std::{Addr, Event, Timestamp, Uint128};

    /// A reporter penalty was applied.
    pub struct ReporterPenaltyEvent {
        /// Penalised reporter
        pub reporter: Addr,
        /// Consecutive-dismissed streak that set the scale
        pub streak: u32,
        /// Reputation deducted
        pub reputation_penalty: u64,
        /// Stake slashed, in the fee denom
        pub slashed: Uint128,
    }

    impl From<ReporterPenaltyEvent> for Event {
        fn from(src: ReporterPenaltyEvent) -> Self {
            Event::new("reporter-penalty")
                .add_attribute(event_key::REPORTER, src.reporter.to_string())
                .add_attribute("streak", src.streak.to_string())
                .add_attribute("reputation-penalty", src.reputation_penalty.to_string())
                .add_attribute("slashed", src.slashed.to_string())
        }
    }

    /// An address was banned.
    pub struct BanEvent {
        /// Banned address
        pub address: Addr,
        /// Why
        pub reason: String,
        /// Expiry; None means permanent
        pub expires_at: Option<Timestamp>,
        /// Lifetime ban count after this ban
        pub ban_count: u32,
    }

    impl From<BanEvent> for Event {
        fn from(src: BanEvent) -> Self {
            let mut event = Event::new("address-banned")
                .add_attribute(event_key::ADDRESS, src.address.to_string())
                .add_attribute(event_key::REASON, src.reason)
                .add_attribute(event_key::BAN_COUNT, src.ban_count.to_string());
            if let Some(expires_at) = src.expires_at {
                event = event.add_attribute(event_key::EXPIRES_AT, expires_at.nanos().to_string());
            }
            event
        }
    }

    /// A temporary ban lapsed.
    pub struct BanExpiredEvent {
        /// Unbanned address
        pub address: Addr,
    }

    impl From<BanExpiredEvent> for Event {
        fn from(src: BanExpiredEvent) -> Self {
            Event::new("ban-expired").add_attribute(event_key::ADDRESS, src.address.to_string())
        }
    }

    /// A moderator was blacklisted or warned.
    pub struct ModeratorSanctionEvent {
        /// Sanctioned moderator
        pub moderator: Addr,
        /// `warning`, `temporary_blacklist` or `permanent_blacklist`
        pub sanction: String,
        /// Stake fraction slashed, if any
        pub slash_fraction: Option<cosmwasm_std::Decimal>,
    }

    impl From<ModeratorSanctionEvent> for Event {
        fn from(src: ModeratorSanctionEvent) -> Self {
            let mut event = Event::new("moderator-sanction")
                .add_attribute(event_key::ADDRESS, src.moderator.to_string())
                .add_attribute(event_key::ACTION, src.sanction);
            if let Some(fraction) = src.slash_fraction {
                event = event.add_attribute("slash-fraction", fraction.to_string());
            }
            event
        }
    }
}
