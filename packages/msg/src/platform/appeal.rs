//! Appeals against report and dispute resolutions.

use crate::ids::{AppealId, EscrowId, ReportId};
use crate::platform::escrow::Resolution;
use crate::platform::report::{EvidenceSnapshot, ReviewVote};
use crate::tier::Tier;
use crate::time::DAY_SECONDS;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Timestamp};
use std::fmt;

/// What an appeal contests: exactly one of a dispute escrow resolution or a
/// report resolution.
#[cw_serde]
pub enum AppealSubject {
    /// A resolved dispute escrow
    Dispute(EscrowId),
    /// A resolved report
    Report(ReportId),
}

impl fmt::Display for AppealSubject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppealSubject::Dispute(id) => write!(f, "dispute:{id}"),
            AppealSubject::Report(id) => write!(f, "report:{id}"),
        }
    }
}

/// Appeal lifecycle status.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum AppealStatus {
    /// Reviewers assigned and voting
    UnderReview,
    /// Original resolution stands
    Upheld,
    /// Original resolution reversed
    Overturned,
}

impl AppealStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        !matches!(self, AppealStatus::UnderReview)
    }
}

impl fmt::Display for AppealStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            AppealStatus::UnderReview => "under_review",
            AppealStatus::Upheld => "upheld",
            AppealStatus::Overturned => "overturned",
        };
        write!(f, "{s}")
    }
}

/// Review parameters for an appeal level.
pub struct AppealParams {
    /// Minimum reviewer tier
    pub tier: Tier,
    /// Reviewers assigned and votes required
    pub votes_required: u32,
    /// Review deadline length in seconds
    pub deadline_seconds: u64,
}

impl AppealParams {
    /// Level 1: Warden+, 5 voters, 5 days. Level 2: Steward+, 7, 7.
    /// Level 3: Archon+, 9, 10.
    pub fn for_level(level: u8) -> Self {
        match level {
            1 => AppealParams {
                tier: Tier::Warden,
                votes_required: 5,
                deadline_seconds: 5 * DAY_SECONDS,
            },
            2 => AppealParams {
                tier: Tier::Steward,
                votes_required: 7,
                deadline_seconds: 7 * DAY_SECONDS,
            },
            _ => AppealParams {
                tier: Tier::Archon,
                votes_required: 9,
                deadline_seconds: 10 * DAY_SECONDS,
            },
        }
    }
}

/// Maximum appeal level.
pub const MAX_APPEAL_LEVEL: u8 = 3;

/// An appeal.
#[cw_serde]
pub struct Appeal {
    /// Unique appeal id
    pub appeal_id: AppealId,
    /// What is contested
    pub subject: AppealSubject,
    /// Appealing party
    pub appellant: Addr,
    /// Appeal level, 1-3
    pub level: u8,
    /// Minimum reviewer tier for this level
    pub required_tier: Tier,
    /// Votes required to resolve
    pub votes_required: u32,
    /// Reviewers selected for this appeal, shuffled
    pub assigned_reviewers: Vec<Addr>,
    /// Votes cast
    pub votes: Vec<ReviewVote>,
    /// Lifecycle status
    pub status: AppealStatus,
    /// The resolution being contested
    pub original_resolution: Option<Resolution>,
    /// The resolution to execute if overturned
    pub new_resolution: Option<Resolution>,
    /// Review deadline
    pub deadline: Timestamp,
    /// Evidence frozen at submission
    pub evidence_snapshot: Option<EvidenceSnapshot>,
    /// Appeal evidence, append-only until the first vote
    pub evidence: Vec<super::report::Evidence>,
    /// Submission time
    pub created_at: Timestamp,
    /// Resolution time
    pub resolved_at: Option<Timestamp>,
}

impl Appeal {
    /// Whether this reviewer already voted.
    pub fn has_voted(&self, reviewer: &Addr) -> bool {
        self.votes.iter().any(|v| &v.reviewer == reviewer)
    }

    /// Votes to overturn cast so far.
    pub fn overturn_votes(&self) -> u32 {
        self.votes
            .iter()
            .filter(|v| v.choice == super::report::VoteChoice::Confirm)
            .count() as u32
    }

    /// Votes to uphold cast so far.
    pub fn uphold_votes(&self) -> u32 {
        self.votes
            .iter()
            .filter(|v| v.choice == super::report::VoteChoice::Dismiss)
            .count() as u32
    }
}

/// Events
pub mod events {
    use super::*;
    use crate::constants::event_key;
    use cosmwasm_std::Event;

    /// An appeal was submitted.
    pub struct AppealSubmittedEvent {
        /// Unique appeal id
        pub appeal_id: AppealId,
        /// What is contested
        pub subject: AppealSubject,
        /// Appealing party
        pub appellant: Addr,
        /// Appeal level
        pub level: u8,
        /// Reviewers drawn for this appeal
        pub reviewers: Vec<Addr>,
    }

    impl From<AppealSubmittedEvent> for Event {
        fn from(src: AppealSubmittedEvent) -> Self {
            Event::new("appeal-submitted")
                .add_attribute(event_key::APPEAL_ID, src.appeal_id.to_string())
                .add_attribute(event_key::TARGET, src.subject.to_string())
                .add_attribute(event_key::APPELLANT, src.appellant.to_string())
                .add_attribute(event_key::APPEAL_LEVEL, src.level.to_string())
                .add_attribute(
                    event_key::REVIEWERS,
                    crate::platform::report::events::join_addrs(&src.reviewers),
                )
        }
    }

    /// An appeal resolved.
    pub struct AppealResolvedEvent {
        /// Unique appeal id
        pub appeal_id: AppealId,
        /// Terminal status
        pub status: AppealStatus,
        /// Resolution executed, when overturned
        pub new_resolution: Option<Resolution>,
    }

    impl From<AppealResolvedEvent> for Event {
        fn from(src: AppealResolvedEvent) -> Self {
            let mut event = Event::new("appeal-resolved")
                .add_attribute(event_key::APPEAL_ID, src.appeal_id.to_string())
                .add_attribute(event_key::STATUS, src.status.to_string());
            if let Some(resolution) = src.new_resolution {
                event = event.add_attribute(event_key::RESOLUTION, resolution.to_string());
            }
            event
        }
    }
}
