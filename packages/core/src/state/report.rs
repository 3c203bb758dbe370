use crate::prelude::*;
use crate::rng::DetRng;
use crate::state::market::MARKETS;
use crate::state::escrow::ESCROWS;
use msg::platform::report::{
    events::*, Evidence, EvidenceSnapshot, Report, ReportStatus, ReportTarget, ReportType,
    ReviewParams, ReviewVote, TargetKind, VoteChoice,
};
use sha2::{Digest, Sha256};

pub(super) const LAST_REPORT_ID: Item<ReportId> = Item::new(namespace::LAST_REPORT_ID);
pub(super) const REPORTS: Map<ReportId, Report> = Map::new(namespace::REPORTS);
const REPORTS_BY_TARGET: Map<(&str, ReportId), ()> = Map::new(namespace::REPORTS_BY_TARGET);
const REPORTS_BY_REPORTER: Map<(&Addr, ReportId), ()> = Map::new(namespace::REPORTS_BY_REPORTER);
/// Reports under investigation, keyed by review deadline.
const REPORT_DEADLINES: Map<(u64, ReportId), ()> = Map::new(namespace::REPORT_DEADLINES);
/// Reports in the voluntary-return grace window, keyed by its end.
const RETURN_DEADLINES: Map<(u64, ReportId), ()> = Map::new(namespace::RETURN_DEADLINES);
const REPORTS_PER_DAY: Map<(&Addr, u64), u32> = Map::new(namespace::REPORTS_PER_DAY);

/// Which deadline index a report lives in, if any.
fn deadline_entry(report: &Report) -> Option<(bool, u64)> {
    match report.status {
        ReportStatus::UnderInvestigation => Some((false, report.deadline.seconds())),
        ReportStatus::PendingVoluntaryReturn => report
            .voluntary_return_deadline
            .map(|deadline| (true, deadline.seconds())),
        _ => None,
    }
}

impl State<'_> {
    pub(crate) fn load_report(&self, store: &dyn Storage, report_id: ReportId) -> Result<Report> {
        REPORTS.may_load(store, report_id)?.ok_or_else(|| {
            platform_anyhow!(
                ErrorId::ReportNotFound,
                ErrorDomain::Report,
                "report {report_id} not found"
            )
        })
    }

    /// Persists a report and keeps the deadline indexes in step.
    pub(super) fn save_report(
        &self,
        ctx: &mut StateContext,
        old: Option<&Report>,
        report: &Report,
    ) -> Result<()> {
        REPORTS.save(ctx.storage, report.report_id, report)?;

        if old.is_none() {
            REPORTS_BY_TARGET.save(
                ctx.storage,
                (&report.target.index_key(), report.report_id),
                &(),
            )?;
            REPORTS_BY_REPORTER.save(ctx.storage, (&report.reporter, report.report_id), &())?;
        }

        let old_entry = old.and_then(deadline_entry);
        let new_entry = deadline_entry(report);
        if old_entry != new_entry {
            if let Some((is_return, at)) = old_entry {
                if is_return {
                    RETURN_DEADLINES.remove(ctx.storage, (at, report.report_id));
                } else {
                    REPORT_DEADLINES.remove(ctx.storage, (at, report.report_id));
                }
            }
            if let Some((is_return, at)) = new_entry {
                if is_return {
                    RETURN_DEADLINES.save(ctx.storage, (at, report.report_id), &())?;
                } else {
                    REPORT_DEADLINES.save(ctx.storage, (at, report.report_id), &())?;
                }
            }
        }
        Ok(())
    }

    /// Selects reviewers for an entity: eligible moderators at or above the
    /// tier, shuffled deterministically from the block hash and entity id.
    pub(super) fn select_reviewers(
        &self,
        store: &dyn Storage,
        min_tier: Tier,
        count: u32,
        entity_id: u64,
        exclude: &[Addr],
    ) -> Result<Vec<Addr>> {
        let mut candidates: Vec<Addr> = self
            .staking
            .validators_by_min_tier(store, min_tier)?
            .into_iter()
            .filter(|addr| !exclude.contains(addr))
            .collect();
        let mut eligible = Vec::with_capacity(candidates.len());
        for addr in candidates.drain(..) {
            if self.is_banned(store, &addr)? {
                continue;
            }
            if !self.moderator_metrics(store, &addr)?.eligible(self.now()) {
                continue;
            }
            eligible.push(addr);
        }
        platform_ensure!(
            !eligible.is_empty(),
            ErrorId::InsufficientReviewerTier,
            ErrorDomain::Report,
            "no eligible reviewers at tier {min_tier} or above"
        );

        DetRng::for_entity(self.env.hash_prefix, entity_id).shuffle(&mut eligible);
        eligible.truncate(count as usize);
        Ok(eligible)
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn submit_report(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        report_type: ReportType,
        target: ReportTarget,
        severity: u8,
        evidence: Vec<String>,
        escrow_id: Option<EscrowId>,
    ) -> Result<ReportId> {
        platform_ensure!(
            (1..=5).contains(&severity),
            ErrorId::InvalidReport,
            ErrorDomain::Report,
            "severity must be 1-5"
        );

        // reporter gates
        let history = self.reporter_history(ctx.storage, sender)?;
        platform_ensure!(
            !history.ban.active(self.now()),
            ErrorId::ReporterBanned,
            ErrorDomain::Report,
            "{sender} is banned from reporting"
        );
        let tier = self.staking.tier_of(ctx.storage, sender)?;
        platform_ensure!(
            tier >= Tier::Keeper,
            ErrorId::ReporterTierTooLow,
            ErrorDomain::Report,
            "tier {tier} is below keeper"
        );
        let stake_age = self.staking.stake_age(ctx.storage, sender)?;
        platform_ensure!(
            stake_age >= self.config.min_reporter_stake_age,
            ErrorId::StakeAgeTooLow,
            ErrorDomain::Report,
            "stake age {stake_age}s is below the minimum"
        );

        let today = day_number(self.now());
        let submitted_today = REPORTS_PER_DAY
            .may_load(ctx.storage, (sender, today))?
            .unwrap_or_default();
        platform_ensure!(
            submitted_today < self.config.reports_per_day,
            ErrorId::ReporterRateLimited,
            ErrorDomain::Report,
            "daily report limit reached"
        );

        // dismissal streaks impose a proportional cooldown
        if history.consecutive_dismissed > 0 {
            if let Some(last) = history.last_report_at {
                let wait = u64::from(history.consecutive_dismissed) * DAY_SECONDS;
                platform_ensure!(
                    self.now() >= last.plus_seconds(wait),
                    ErrorId::ReporterCooldown,
                    ErrorDomain::Report,
                    "cooldown after {} dismissed reports",
                    history.consecutive_dismissed
                );
            }
        }

        // anti-retaliation
        if let Some(last_targeted) = history.last_targeted_at {
            platform_ensure!(
                self.now() > last_targeted.plus_seconds(self.config.retaliation_cooldown),
                ErrorId::ReportCooldownActive,
                ErrorDomain::Report,
                "{sender} was recently the target of a report"
            );
        }
        if target.kind == TargetKind::Address {
            let reverse_key = ReportTarget {
                kind: TargetKind::Address,
                id: sender.to_string(),
            }
            .index_key();
            let reverse_ids: Vec<ReportId> = REPORTS_BY_TARGET
                .prefix(&reverse_key)
                .keys(ctx.storage, None, None, Order::Ascending)
                .collect::<Result<_, _>>()?;
            for reverse_id in reverse_ids {
                let reverse = self.load_report(ctx.storage, reverse_id)?;
                platform_ensure!(
                    reverse.status.is_terminal() || reverse.reporter.as_str() != target.id,
                    ErrorId::RetaliatoryReportNotAllowed,
                    ErrorDomain::Report,
                    "an active report by the target against {sender} exists"
                );
            }
        }

        self.validate_report_target(ctx.storage, report_type, &target, escrow_id)?;

        // WrongResolution specifics
        let mut counterparty = None;
        let mut amount_to_return = Uint128::zero();
        if report_type == ReportType::WrongResolution {
            let escrow_id = escrow_id.ok_or_else(|| {
                platform_anyhow!(
                    ErrorId::InvalidReportTarget,
                    ErrorDomain::Report,
                    "wrong-resolution reports name an escrow"
                )
            })?;
            let escrow = self.load_escrow(ctx.storage, escrow_id)?;
            platform_ensure!(
                escrow.is_participant(sender),
                ErrorId::NotDisputeParticipant,
                ErrorDomain::Report,
                "{sender} took no part in escrow {escrow_id}"
            );
            let resolution = escrow.resolution.ok_or_else(|| {
                platform_anyhow!(
                    ErrorId::InvalidReportTarget,
                    ErrorDomain::Report,
                    "escrow {escrow_id} is not resolved"
                )
            })?;
            counterparty = escrow.paid_party(resolution).cloned();
            amount_to_return = match counterparty {
                // a split has no single counterparty and no voluntary path
                None => escrow.amount.checked_div(Uint128::new(2))?,
                Some(_) => escrow.amount,
            };
        }

        let report_id = alloc_id(ctx.storage, &LAST_REPORT_ID)?;
        let priority = Report::compute_priority(tier, severity, evidence.len());
        let params = ReviewParams::for_priority(priority);
        let assigned_reviewers = self.select_reviewers(
            ctx.storage,
            params.tier,
            params.votes_required,
            report_id.u64(),
            std::slice::from_ref(sender),
        )?;

        let voluntary = counterparty.is_some();
        let status = if voluntary {
            ReportStatus::PendingVoluntaryReturn
        } else {
            ReportStatus::UnderInvestigation
        };
        let report = Report {
            report_id,
            report_type,
            reporter: sender.clone(),
            target: target.clone(),
            severity,
            priority,
            status,
            evidence: evidence
                .into_iter()
                .map(|uri| Evidence {
                    submitted_by: sender.clone(),
                    uri,
                    submitted_at: self.now(),
                })
                .collect(),
            evidence_snapshot: None,
            assigned_reviewers,
            votes: vec![],
            previous_votes: vec![],
            current_tier: params.tier,
            escalation_count: 0,
            extension_count: 0,
            deadline: self.now().plus_seconds(params.deadline_seconds),
            created_at: self.now(),
            resolved_at: None,
            escrow_id,
            counterparty,
            amount_to_return,
            voluntary_return_deadline: voluntary
                .then(|| self.now().plus_seconds(self.config.voluntary_return_window)),
            return_rejected: false,
        };
        self.save_report(ctx, None, &report)?;

        // bookkeeping
        REPORTS_PER_DAY.save(ctx.storage, (sender, today), &(submitted_today + 1))?;
        self.record_report_submitted(ctx, sender)?;
        let mut history = self.reporter_history(ctx.storage, sender)?;
        history.last_report_at = Some(self.now());
        self.save_reporter_history(ctx.storage, sender, &history)?;
        if target.kind == TargetKind::Address {
            let target_addr = Addr::unchecked(&target.id);
            self.record_address_targeted(ctx, &target_addr)?;
            if matches!(
                report_type,
                ReportType::ModeratorMisconduct | ReportType::Collusion
            ) {
                self.record_report_against_moderator(ctx, &target_addr)?;
            }
        }

        ctx.response_mut().add_event(ReportSubmittedEvent {
            report_id,
            report_type,
            reporter: sender.clone(),
            target: target.index_key(),
            priority,
            status,
            reviewers: report.assigned_reviewers.clone(),
        });
        Ok(report_id)
    }

    fn validate_report_target(
        &self,
        store: &dyn Storage,
        report_type: ReportType,
        target: &ReportTarget,
        escrow_id: Option<EscrowId>,
    ) -> Result<()> {
        let exists = match target.kind {
            TargetKind::Address => !target.id.is_empty(),
            TargetKind::Company => self.equity.is_equity(store, &target.id)?,
            TargetKind::Market => target
                .id
                .parse::<MarketId>()
                .map(|market_id| MARKETS.has(store, &market_id))
                .unwrap_or(false),
            TargetKind::Escrow => match escrow_id {
                Some(escrow_id) => ESCROWS.has(store, escrow_id),
                None => false,
            },
        };
        platform_ensure!(
            exists,
            ErrorId::InvalidReportTarget,
            ErrorDomain::Report,
            "report target {} does not exist",
            target.index_key()
        );

        let kind_matches = match report_type {
            ReportType::Fraud | ReportType::Scam => {
                matches!(target.kind, TargetKind::Company | TargetKind::Address)
            }
            ReportType::ModeratorMisconduct | ReportType::Collusion => {
                target.kind == TargetKind::Address
            }
            ReportType::MarketManipulation => target.kind == TargetKind::Market,
            ReportType::WrongResolution => target.kind == TargetKind::Escrow,
        };
        platform_ensure!(
            kind_matches,
            ErrorId::InvalidReportTarget,
            ErrorDomain::Report,
            "{report_type} reports cannot target a {}",
            target.kind
        );
        Ok(())
    }

    pub(crate) fn submit_report_evidence(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        report_id: ReportId,
        uri: String,
    ) -> Result<()> {
        let report = self.load_report(ctx.storage, report_id)?;
        platform_ensure!(
            !report.status.is_terminal(),
            ErrorId::ReportAlreadyResolved,
            ErrorDomain::Report,
            "report {report_id} is already resolved"
        );
        platform_ensure!(
            !report.evidence_frozen(),
            ErrorId::EvidenceLockedAfterVoting,
            ErrorDomain::Report,
            "evidence on report {report_id} is frozen"
        );
        platform_ensure!(
            &report.reporter == sender,
            ErrorId::Unauthorized,
            ErrorDomain::Report,
            "only the reporter may add evidence"
        );

        let mut updated = report.clone();
        updated.evidence.push(Evidence {
            submitted_by: sender.clone(),
            uri,
            submitted_at: self.now(),
        });
        self.save_report(ctx, Some(&report), &updated)
    }

    pub(crate) fn vote_on_report(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        report_id: ReportId,
        choice: VoteChoice,
        comment: Option<String>,
    ) -> Result<()> {
        let report = self.load_report(ctx.storage, report_id)?;
        platform_ensure!(
            !report.status.is_terminal(),
            ErrorId::ReportAlreadyResolved,
            ErrorDomain::Report,
            "report {report_id} is already resolved"
        );
        platform_ensure!(
            report.status == ReportStatus::UnderInvestigation,
            ErrorId::InvalidReport,
            ErrorDomain::Report,
            "report {report_id} is not under investigation"
        );
        platform_ensure!(
            self.now() <= report.deadline,
            ErrorId::ReportDeadlinePassed,
            ErrorDomain::Report,
            "review deadline for report {report_id} has passed"
        );
        platform_ensure!(
            report.assigned_reviewers.contains(sender),
            ErrorId::NotAssignedReviewer,
            ErrorDomain::Report,
            "{sender} is not assigned to report {report_id}"
        );
        platform_ensure!(
            !report.has_voted(sender),
            ErrorId::ReviewerAlreadyVoted,
            ErrorDomain::Report,
            "{sender} already voted on report {report_id}"
        );

        let mut updated = report.clone();
        if updated.evidence_snapshot.is_none() {
            updated.evidence_snapshot = Some(EvidenceSnapshot {
                hash: evidence_hash(&updated.evidence)?,
                frozen_at: self.now(),
            });
        }
        updated.votes.push(ReviewVote {
            reviewer: sender.clone(),
            choice,
            comment,
            voted_at: self.now(),
        });
        self.record_moderator_decision(ctx, sender)?;

        let params = ReviewParams::for_tier(updated.current_tier);
        ctx.response_mut().add_event(ReportVoteEvent {
            report_id,
            reviewer: sender.clone(),
            choice,
            votes: updated.votes.len() as u32,
            votes_required: params.votes_required,
        });

        if updated.votes.len() as u32 >= params.votes_required {
            self.resolve_report(ctx, &report, updated)
        } else {
            self.save_report(ctx, Some(&report), &updated)
        }
    }

    /// Simple-majority resolution once quorum is reached.
    fn resolve_report(
        &self,
        ctx: &mut StateContext,
        old: &Report,
        mut report: Report,
    ) -> Result<()> {
        let confirmed = report.confirmed_votes() > report.dismissed_votes();
        report.resolved_at = Some(self.now());
        report.status = if confirmed {
            ReportStatus::Confirmed
        } else {
            ReportStatus::Dismissed
        };
        self.save_report(ctx, Some(old), &report)?;

        if confirmed {
            self.execute_confirmation(ctx, &report)?;
        } else {
            self.apply_dismissal_penalties(
                ctx,
                &report.reporter.clone(),
                report.report_type,
                report.escrow_id,
            )?;
        }

        ctx.response_mut().add_event(ReportOutcomeEvent {
            report_id: report.report_id,
            status: report.status,
            action: if confirmed {
                event_val::CONFIRMED.to_owned()
            } else {
                event_val::DISMISSED.to_owned()
            },
            reviewers: vec![],
        });
        Ok(())
    }

    /// Per-type actions when a report confirms.
    fn execute_confirmation(&self, ctx: &mut StateContext, report: &Report) -> Result<()> {
        self.record_confirmed_report(ctx, &report.reporter)?;

        match report.report_type {
            ReportType::Fraud | ReportType::Scam => {
                if report.target.kind == TargetKind::Company {
                    if let Err(err) = self.equity.confirm_fraud_and_delist(
                        ctx.storage,
                        &report.target.id,
                        report.report_id,
                        true,
                    ) {
                        ctx.response_mut().add_event(
                            Event::new("delist-failed")
                                .add_attribute(event_key::REPORT_ID, report.report_id.to_string())
                                .add_attribute(event_key::ERROR, err.to_string()),
                        );
                    }
                }
            }
            ReportType::ModeratorMisconduct | ReportType::Collusion => {
                let moderator = Addr::unchecked(&report.target.id);
                self.record_confirmed_moderator_report(ctx, &moderator)?;
            }
            ReportType::MarketManipulation => {
                if let Ok(market_id) = report.target.id.parse::<MarketId>() {
                    self.flag_market_for_investigation(ctx, &market_id, report.report_id)?;
                }
            }
            ReportType::WrongResolution => {
                self.execute_wrong_resolution_recovery(ctx, report)?;
            }
        }
        Ok(())
    }

    pub(crate) fn voluntary_return(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        report_id: ReportId,
    ) -> Result<()> {
        let report = self.load_report(ctx.storage, report_id)?;
        platform_ensure!(
            report.status != ReportStatus::VoluntarilyResolved,
            ErrorId::VoluntaryReturnAlreadyDone,
            ErrorDomain::Report,
            "report {report_id} was already settled voluntarily"
        );
        platform_ensure!(
            report.status == ReportStatus::PendingVoluntaryReturn,
            ErrorId::ReportNotPendingReturn,
            ErrorDomain::Report,
            "report {report_id} is not awaiting a voluntary return"
        );
        let counterparty = report.counterparty.clone().ok_or_else(|| {
            platform_anyhow!(
                ErrorId::NotCounterparty,
                ErrorDomain::Report,
                "report {report_id} has no voluntary path"
            )
        })?;
        platform_ensure!(
            sender == &counterparty,
            ErrorId::NotCounterparty,
            ErrorDomain::Report,
            "{sender} is not the counterparty"
        );
        platform_ensure!(
            report
                .voluntary_return_deadline
                .is_some_and(|deadline| self.now() <= deadline),
            ErrorId::VoluntaryReturnExpired,
            ErrorDomain::Report,
            "the voluntary return window has closed"
        );

        let escrow_id = report.escrow_id.context("wrong-resolution report without escrow")?;
        let escrow = self.load_escrow(ctx.storage, escrow_id)?;
        let balance = self
            .bank
            .balance(ctx.storage, sender, &escrow.denom)?;
        platform_ensure!(
            balance >= report.amount_to_return,
            ErrorId::InsufficientFundsForReturn,
            ErrorDomain::Report,
            "{sender} holds {balance} {}, must return {}",
            escrow.denom,
            report.amount_to_return
        );

        self.bank.send(
            ctx.storage,
            sender,
            &report.reporter,
            &escrow.denom,
            report.amount_to_return,
        )?;

        let mut updated = report.clone();
        updated.status = ReportStatus::VoluntarilyResolved;
        updated.resolved_at = Some(self.now());
        self.save_report(ctx, Some(&report), &updated)?;

        ctx.response_mut().add_event(VoluntaryReturnEvent {
            report_id,
            counterparty,
            amount: report.amount_to_return,
        });
        Ok(())
    }

    pub(crate) fn reject_voluntary_return(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        report_id: ReportId,
        reason: String,
    ) -> Result<()> {
        let report = self.load_report(ctx.storage, report_id)?;
        platform_ensure!(
            report.status == ReportStatus::PendingVoluntaryReturn,
            ErrorId::ReportNotPendingReturn,
            ErrorDomain::Report,
            "report {report_id} is not awaiting a voluntary return"
        );
        platform_ensure!(
            !report.return_rejected,
            ErrorId::AlreadyRejected,
            ErrorDomain::Report,
            "the voluntary return was already rejected"
        );
        platform_ensure!(
            report.counterparty.as_ref() == Some(sender),
            ErrorId::NotCounterparty,
            ErrorDomain::Report,
            "{sender} is not the counterparty"
        );

        let mut updated = report.clone();
        updated.return_rejected = true;
        self.advance_to_investigation(ctx, &report, updated)?;

        ctx.response_mut().add_event(
            Event::new("voluntary-return-rejected")
                .add_attribute(event_key::REPORT_ID, report_id.to_string())
                .add_attribute(event_key::REASON, reason),
        );
        Ok(())
    }

    /// Moves a grace-window report into active investigation.
    fn advance_to_investigation(
        &self,
        ctx: &mut StateContext,
        old: &Report,
        mut report: Report,
    ) -> Result<()> {
        report.status = ReportStatus::UnderInvestigation;
        let params = ReviewParams::for_tier(report.current_tier);
        report.deadline = self.now().plus_seconds(params.deadline_seconds);
        self.save_report(ctx, Some(old), &report)
    }

    /// EndBlock step: expire voluntary-return grace windows. Bounded by
    /// the return-deadline index.
    pub(crate) fn process_return_deadlines(&self, ctx: &mut StateContext) -> Result<()> {
        let due = due_ids(ctx.storage, &RETURN_DEADLINES, self.now())?;
        for report_id in due {
            let report = self.load_report(ctx.storage, report_id)?;
            if report.status != ReportStatus::PendingVoluntaryReturn {
                continue;
            }
            let updated = report.clone();
            self.advance_to_investigation(ctx, &report, updated)?;
        }
        Ok(())
    }

    /// EndBlock step: extend, escalate or auto-dismiss reports whose
    /// review deadline has passed. Bounded by the deadline index.
    pub(crate) fn process_report_deadlines(&self, ctx: &mut StateContext) -> Result<()> {
        let due = due_ids(ctx.storage, &REPORT_DEADLINES, self.now())?;
        for report_id in due {
            let report = self.load_report(ctx.storage, report_id)?;
            if report.status != ReportStatus::UnderInvestigation || self.now() <= report.deadline {
                continue;
            }

            if report.votes.is_empty() {
                if report.extension_count < self.config.max_extensions {
                    self.extend_report(ctx, report)?;
                } else {
                    self.escalate_report(ctx, report)?;
                }
            } else if report.confirmed_votes() > 0 {
                self.escalate_report(ctx, report)?;
            } else {
                // every vote received was a dismissal: safe to auto-dismiss
                let updated = report.clone();
                self.resolve_report(ctx, &report, updated)?;
            }
        }
        Ok(())
    }

    /// No votes at all: extend by three days and hand the round to a
    /// freshly shuffled reviewer set.
    fn extend_report(&self, ctx: &mut StateContext, report: Report) -> Result<()> {
        let mut updated = report.clone();
        updated.extension_count += 1;
        updated.deadline = self.now().plus_seconds(3 * DAY_SECONDS);
        let params = ReviewParams::for_tier(updated.current_tier);
        updated.assigned_reviewers = self.select_reviewers(
            ctx.storage,
            params.tier,
            params.votes_required,
            // vary the draw per extension round
            report.report_id.u64() ^ (u64::from(updated.extension_count) << 32),
            std::slice::from_ref(&report.reporter),
        )?;
        self.save_report(ctx, Some(&report), &updated)?;

        ctx.response_mut().add_event(ReportOutcomeEvent {
            report_id: report.report_id,
            status: updated.status,
            action: event_val::EXTENDED.to_owned(),
            reviewers: updated.assigned_reviewers.clone(),
        });
        Ok(())
    }

    /// Quorum was missed with at least one confirmation: hand the report
    /// to the next tier, or to governance past the escalation cap.
    fn escalate_report(&self, ctx: &mut StateContext, report: Report) -> Result<()> {
        let next_tier = match report.current_tier {
            Tier::Warden => Some(Tier::Steward),
            Tier::Steward => Some(Tier::Archon),
            _ => None,
        };
        let exhausted =
            report.escalation_count >= self.config.max_escalations || next_tier.is_none();

        let mut updated = report.clone();
        if exhausted {
            updated.status = ReportStatus::Appealed;
            updated.resolved_at = Some(self.now());
            self.save_report(ctx, Some(&report), &updated)?;
            ctx.response_mut().add_event(ReportOutcomeEvent {
                report_id: report.report_id,
                status: ReportStatus::Appealed,
                action: event_val::ESCALATED_TO_GOVERNANCE.to_owned(),
                reviewers: vec![],
            });
            return Ok(());
        }

        let next_tier = next_tier.expect("checked above");
        let params = ReviewParams::for_tier(next_tier);
        updated.current_tier = next_tier;
        updated.escalation_count += 1;
        updated.previous_votes.append(&mut updated.votes);
        updated.deadline = self.now().plus_seconds(params.deadline_seconds);
        updated.assigned_reviewers = self.select_reviewers(
            ctx.storage,
            params.tier,
            params.votes_required,
            report.report_id.u64() ^ u64::from(updated.escalation_count),
            std::slice::from_ref(&report.reporter),
        )?;
        self.save_report(ctx, Some(&report), &updated)?;

        ctx.response_mut().add_event(ReportOutcomeEvent {
            report_id: report.report_id,
            status: updated.status,
            action: event_val::ESCALATED.to_owned(),
            reviewers: updated.assigned_reviewers.clone(),
        });
        Ok(())
    }
}

/// Hash of the evidence list recorded when the first vote freezes it.
pub(super) fn evidence_hash(evidence: &[Evidence]) -> Result<String> {
    let bytes = serde_json::to_vec(evidence)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Report ids in a deadline index strictly before `now`.
fn due_ids(
    store: &dyn Storage,
    index: &Map<(u64, ReportId), ()>,
    now: Timestamp,
) -> Result<Vec<ReportId>> {
    index
        .prefix_range(
            store,
            None,
            Some(PrefixBound::exclusive(now.seconds())),
            Order::Ascending,
        )
        .map(|res| res.map(|((_, id), ())| id).map_err(|err| err.into()))
        .collect()
}
