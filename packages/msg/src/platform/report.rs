//! Reports and the tiered investigation pipeline.

use crate::ids::{EscrowId, ReportId};
use crate::tier::Tier;
use crate::time::DAY_SECONDS;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Timestamp, Uint128};
use std::fmt;

/// What kind of wrongdoing is being reported.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum ReportType {
    /// Fraudulent company conduct
    Fraud,
    /// Scam conduct by a company
    Scam,
    /// Misconduct by a moderator
    ModeratorMisconduct,
    /// Market manipulation
    MarketManipulation,
    /// Collusion between moderators
    Collusion,
    /// A dispute escrow was resolved to the wrong party
    WrongResolution,
}

impl ReportType {
    /// Base reputation penalty applied when a report of this type is
    /// dismissed.
    pub fn base_penalty(self) -> u64 {
        match self {
            ReportType::WrongResolution => 3000,
            _ => 1000,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ReportType::Fraud => "fraud",
            ReportType::Scam => "scam",
            ReportType::ModeratorMisconduct => "moderator_misconduct",
            ReportType::MarketManipulation => "market_manipulation",
            ReportType::Collusion => "collusion",
            ReportType::WrongResolution => "wrong_resolution",
        };
        write!(f, "{s}")
    }
}

/// Report lifecycle status.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum ReportStatus {
    /// Submitted, reviewers not yet active
    Open,
    /// WrongResolution grace window for the counterparty
    PendingVoluntaryReturn,
    /// Counterparty settled during the grace window
    VoluntarilyResolved,
    /// Reviewers assigned and voting
    UnderInvestigation,
    /// Majority confirmed
    Confirmed,
    /// Majority dismissed
    Dismissed,
    /// Out of escalations, handed to governance
    Appealed,
}

impl ReportStatus {
    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReportStatus::VoluntarilyResolved
                | ReportStatus::Confirmed
                | ReportStatus::Dismissed
                | ReportStatus::Appealed
        )
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ReportStatus::Open => "open",
            ReportStatus::PendingVoluntaryReturn => "pending_voluntary_return",
            ReportStatus::VoluntarilyResolved => "voluntarily_resolved",
            ReportStatus::UnderInvestigation => "under_investigation",
            ReportStatus::Confirmed => "confirmed",
            ReportStatus::Dismissed => "dismissed",
            ReportStatus::Appealed => "appealed",
        };
        write!(f, "{s}")
    }
}

/// What a report is filed against.
#[cw_serde]
pub struct ReportTarget {
    /// Kind of entity targeted
    pub kind: TargetKind,
    /// Entity identifier: an address, company symbol, market id, or
    /// decimal escrow id
    pub id: String,
}

impl ReportTarget {
    /// The single-segment index key for this target.
    pub fn index_key(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }
}

/// Kinds of report targets.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum TargetKind {
    /// A user or moderator address
    Address,
    /// A listed company
    Company,
    /// A market
    Market,
    /// A dispute escrow
    Escrow,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TargetKind::Address => "address",
            TargetKind::Company => "company",
            TargetKind::Market => "market",
            TargetKind::Escrow => "escrow",
        };
        write!(f, "{s}")
    }
}

/// A single piece of evidence attached to a report.
#[cw_serde]
pub struct Evidence {
    /// Who attached it
    pub submitted_by: Addr,
    /// Content reference, opaque to the core
    pub uri: String,
    /// When it was attached
    pub submitted_at: Timestamp,
}

/// How a reviewer voted.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum VoteChoice {
    /// The report is valid
    Confirm,
    /// The report is invalid
    Dismiss,
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VoteChoice::Confirm => write!(f, "confirm"),
            VoteChoice::Dismiss => write!(f, "dismiss"),
        }
    }
}

/// A recorded reviewer vote.
#[cw_serde]
pub struct ReviewVote {
    /// Voting reviewer
    pub reviewer: Addr,
    /// The vote
    pub choice: VoteChoice,
    /// Optional written reasoning
    pub comment: Option<String>,
    /// When the vote was cast
    pub voted_at: Timestamp,
}

/// The frozen evidence set recorded at the first vote.
#[cw_serde]
pub struct EvidenceSnapshot {
    /// Hash over the evidence list at freeze time
    pub hash: String,
    /// When the first vote froze the evidence
    pub frozen_at: Timestamp,
}

/// Review parameters derived from a report's priority.
pub struct ReviewParams {
    /// Minimum reviewer tier
    pub tier: Tier,
    /// Votes required to resolve
    pub votes_required: u32,
    /// Review deadline length in seconds
    pub deadline_seconds: u64,
}

impl ReviewParams {
    /// The tier / quorum / deadline table keyed by priority.
    pub fn for_priority(priority: u8) -> Self {
        match priority {
            5 => ReviewParams {
                tier: Tier::Archon,
                votes_required: 7,
                deadline_seconds: 3 * DAY_SECONDS,
            },
            4 => ReviewParams {
                tier: Tier::Steward,
                votes_required: 5,
                deadline_seconds: 5 * DAY_SECONDS,
            },
            _ => ReviewParams {
                tier: Tier::Warden,
                votes_required: 3,
                deadline_seconds: 7 * DAY_SECONDS,
            },
        }
    }

    /// Parameters for a given review tier, used after escalation.
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Archon => Self::for_priority(5),
            Tier::Steward => Self::for_priority(4),
            _ => Self::for_priority(3),
        }
    }
}

/// A submitted report.
#[cw_serde]
pub struct Report {
    /// Unique report id
    pub report_id: ReportId,
    /// Kind of wrongdoing
    pub report_type: ReportType,
    /// Submitting address
    pub reporter: Addr,
    /// What the report is against
    pub target: ReportTarget,
    /// Reporter-supplied severity, 1-5
    pub severity: u8,
    /// Derived priority, 1-5
    pub priority: u8,
    /// Lifecycle status
    pub status: ReportStatus,
    /// Attached evidence, append-only until frozen
    pub evidence: Vec<Evidence>,
    /// Set by the first vote; evidence is immutable afterwards
    pub evidence_snapshot: Option<EvidenceSnapshot>,
    /// Reviewers selected for the current round
    pub assigned_reviewers: Vec<Addr>,
    /// Votes cast in the current round
    pub votes: Vec<ReviewVote>,
    /// Votes from earlier rounds, kept when escalating
    pub previous_votes: Vec<ReviewVote>,
    /// Tier reviewing the current round
    pub current_tier: Tier,
    /// Times the report escalated to a higher tier
    pub escalation_count: u32,
    /// Times the deadline was extended for inactivity
    pub extension_count: u32,
    /// Current review deadline
    pub deadline: Timestamp,
    /// Submission time
    pub created_at: Timestamp,
    /// Resolution time
    pub resolved_at: Option<Timestamp>,

    /// WrongResolution: the disputed escrow
    pub escrow_id: Option<EscrowId>,
    /// WrongResolution: party holding the wrongly released funds
    pub counterparty: Option<Addr>,
    /// WrongResolution: amount owed back to the wronged party
    pub amount_to_return: Uint128,
    /// WrongResolution: end of the voluntary-return grace window
    pub voluntary_return_deadline: Option<Timestamp>,
    /// WrongResolution: counterparty explicitly rejected the return
    pub return_rejected: bool,
}

impl Report {
    /// Votes confirming in the current round.
    pub fn confirmed_votes(&self) -> u32 {
        self.votes
            .iter()
            .filter(|v| v.choice == VoteChoice::Confirm)
            .count() as u32
    }

    /// Votes dismissing in the current round.
    pub fn dismissed_votes(&self) -> u32 {
        self.votes
            .iter()
            .filter(|v| v.choice == VoteChoice::Dismiss)
            .count() as u32
    }

    /// Whether this reviewer already voted in the current round.
    pub fn has_voted(&self, reviewer: &Addr) -> bool {
        self.votes.iter().any(|v| &v.reviewer == reviewer)
    }

    /// Whether the evidence set is frozen.
    pub fn evidence_frozen(&self) -> bool {
        self.evidence_snapshot.is_some()
    }

    /// The priority formula: `clamp(tier + severity + floor(evidence/2), 1, 5)`.
    pub fn compute_priority(reporter_tier: Tier, severity: u8, evidence_count: usize) -> u8 {
        let raw =
            u32::from(reporter_tier.rank()) + u32::from(severity) + (evidence_count as u32) / 2;
        raw.clamp(1, 5) as u8
    }
}

/// Events
pub mod events {
    use super::*;
    use crate::constants::event_key;

    use cosmwasm_std::Event;

    /// A report was submitted.
    pub struct ReportSubmittedEvent {
        /// Unique report id
        pub report_id: ReportId,
        /// Kind of wrongdoing
        pub report_type: ReportType,
        /// Submitting address
        pub reporter: Addr,
        /// Target index key
        pub target: String,
        /// Derived priority
        pub priority: u8,
        /// Initial status
        pub status: ReportStatus,
        /// Reviewers drawn for the first round
        pub reviewers: Vec<Addr>,
    }

    impl From<ReportSubmittedEvent> for Event {
        fn from(src: ReportSubmittedEvent) -> Self {
            Event::new("report-submitted")
                .add_attribute(event_key::REPORT_ID, src.report_id.to_string())
                .add_attribute(event_key::REPORT_TYPE, src.report_type.to_string())
                .add_attribute(event_key::REPORTER, src.reporter.to_string())
                .add_attribute(event_key::TARGET, src.target)
                .add_attribute(event_key::PRIORITY, src.priority.to_string())
                .add_attribute(event_key::STATUS, src.status.to_string())
                .add_attribute(event_key::REVIEWERS, join_addrs(&src.reviewers))
        }
    }

    /// Renders an address list as a comma separated attribute value.
    pub fn join_addrs(addrs: &[Addr]) -> String {
        addrs
            .iter()
            .map(|a| a.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// A reviewer voted.
    pub struct ReportVoteEvent {
        /// Report voted on
        pub report_id: ReportId,
        /// Voting reviewer
        pub reviewer: Addr,
        /// The vote
        pub choice: VoteChoice,
        /// Votes received so far this round
        pub votes: u32,
        /// Quorum for this round
        pub votes_required: u32,
    }

    impl From<ReportVoteEvent> for Event {
        fn from(src: ReportVoteEvent) -> Self {
            Event::new("report-vote")
                .add_attribute(event_key::REPORT_ID, src.report_id.to_string())
                .add_attribute(event_key::REVIEWER, src.reviewer.to_string())
                .add_attribute(event_key::VOTE, src.choice.to_string())
                .add_attribute("votes", src.votes.to_string())
                .add_attribute(event_key::REQUIRED, src.votes_required.to_string())
        }
    }

    /// A report reached a terminal or escalated state.
    pub struct ReportOutcomeEvent {
        /// The report
        pub report_id: ReportId,
        /// New status
        pub status: ReportStatus,
        /// Action taken, see [crate::constants::event_val]
        pub action: String,
        /// Reviewers drawn for the next round, when extending or escalating
        pub reviewers: Vec<Addr>,
    }

    impl From<ReportOutcomeEvent> for Event {
        fn from(src: ReportOutcomeEvent) -> Self {
            let mut event = Event::new("report-outcome")
                .add_attribute(event_key::REPORT_ID, src.report_id.to_string())
                .add_attribute(event_key::STATUS, src.status.to_string())
                .add_attribute(event_key::ACTION, src.action);
            if !src.reviewers.is_empty() {
                event = event.add_attribute(event_key::REVIEWERS, join_addrs(&src.reviewers));
            }
            event
        }
    }

    /// The counterparty settled a WrongResolution claim in grace.
    pub struct VoluntaryReturnEvent {
        /// The report settled
        pub report_id: ReportId,
        /// Paying counterparty
        pub counterparty: Addr,
        /// Amount returned to the reporter
        pub amount: Uint128,
    }

    impl From<VoluntaryReturnEvent> for Event {
        fn from(src: VoluntaryReturnEvent) -> Self {
            Event::new("voluntary-return")
                .add_attribute(event_key::REPORT_ID, src.report_id.to_string())
                .add_attribute(event_key::COUNTERPARTY, src.counterparty.to_string())
                .add_attribute(event_key::AMOUNT, src.amount.to_string())
        }
    }

    /// The reporter was rewarded from excess recovery.
    pub struct ReporterRewardEvent {
        /// The confirmed report
        pub report_id: ReportId,
        /// Rewarded reporter
        pub reporter: Addr,
        /// Reward paid, in the fee denom
        pub amount: Uint128,
    }

    impl From<ReporterRewardEvent> for Event {
        fn from(src: ReporterRewardEvent) -> Self {
            Event::new("reporter-reward")
                .add_attribute(event_key::REPORT_ID, src.report_id.to_string())
                .add_attribute(event_key::REPORTER, src.reporter.to_string())
                .add_attribute(event_key::AMOUNT, src.amount.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_clamps() {
        assert_eq!(Report::compute_priority(Tier::Bronze, 0, 0), 1);
        assert_eq!(Report::compute_priority(Tier::Archon, 5, 20), 5);
        assert_eq!(Report::compute_priority(Tier::Keeper, 2, 2), 4);
    }

    #[test]
    fn review_params_table() {
        let p5 = ReviewParams::for_priority(5);
        assert_eq!(p5.tier, Tier::Archon);
        assert_eq!(p5.votes_required, 7);
        assert_eq!(p5.deadline_seconds, 3 * DAY_SECONDS);

        let p4 = ReviewParams::for_priority(4);
        assert_eq!(p4.tier, Tier::Steward);
        assert_eq!(p4.votes_required, 5);

        let p1 = ReviewParams::for_priority(1);
        assert_eq!(p1.tier, Tier::Warden);
        assert_eq!(p1.votes_required, 3);
        assert_eq!(p1.deadline_seconds, 7 * DAY_SECONDS);
    }
}
