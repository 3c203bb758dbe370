use crate::prelude::*;
use crate::state::report::evidence_hash;
use msg::platform::appeal::{
    events::*, Appeal, AppealParams, AppealStatus, AppealSubject, MAX_APPEAL_LEVEL,
};
use msg::platform::escrow::{Escrow, Resolution};
use msg::platform::report::{
    Evidence, EvidenceSnapshot, Report, ReportStatus, ReviewVote, VoteChoice,
};

const LAST_APPEAL_ID: Item<AppealId> = Item::new(namespace::LAST_APPEAL_ID);
const APPEALS: Map<AppealId, Appeal> = Map::new(namespace::APPEALS);
const APPEALS_BY_SUBJECT: Map<(&str, AppealId), ()> = Map::new(namespace::APPEALS_BY_SUBJECT);
const APPEAL_DEADLINES: Map<(u64, AppealId), ()> = Map::new(namespace::APPEAL_DEADLINES);

impl State<'_> {
    pub(crate) fn load_appeal(&self, store: &dyn Storage, appeal_id: AppealId) -> Result<Appeal> {
        APPEALS.may_load(store, appeal_id)?.ok_or_else(|| {
            platform_anyhow!(
                ErrorId::AppealNotFound,
                ErrorDomain::Appeal,
                "appeal {appeal_id} not found"
            )
        })
    }

    fn save_appeal(
        &self,
        ctx: &mut StateContext,
        old: Option<&Appeal>,
        appeal: &Appeal,
    ) -> Result<()> {
        APPEALS.save(ctx.storage, appeal.appeal_id, appeal)?;
        if old.is_none() {
            APPEALS_BY_SUBJECT.save(
                ctx.storage,
                (&appeal.subject.to_string(), appeal.appeal_id),
                &(),
            )?;
        }

        let old_deadline = old.and_then(|a| {
            (a.status == AppealStatus::UnderReview).then(|| a.deadline.seconds())
        });
        let new_deadline = (appeal.status == AppealStatus::UnderReview)
            .then(|| appeal.deadline.seconds());
        if old_deadline != new_deadline {
            if let Some(at) = old_deadline {
                APPEAL_DEADLINES.remove(ctx.storage, (at, appeal.appeal_id));
            }
            if let Some(at) = new_deadline {
                APPEAL_DEADLINES.save(ctx.storage, (at, appeal.appeal_id), &())?;
            }
        }
        Ok(())
    }

    /// Prior appeals on a subject: level for a new one = count + 1, and at
    /// most one may be open at a time.
    fn appeal_lineage(
        &self,
        store: &dyn Storage,
        subject: &AppealSubject,
    ) -> Result<(u8, Vec<Appeal>)> {
        let key = subject.to_string();
        let prior_ids: Vec<AppealId> = APPEALS_BY_SUBJECT
            .prefix(&key)
            .keys(store, None, None, Order::Ascending)
            .collect::<Result<_, _>>()?;
        let mut prior = Vec::with_capacity(prior_ids.len());
        for appeal_id in prior_ids {
            prior.push(self.load_appeal(store, appeal_id)?);
        }
        platform_ensure!(
            prior.iter().all(|a| a.status.is_terminal()),
            ErrorId::CannotAppeal,
            ErrorDomain::Appeal,
            "an appeal on {subject} is still under review"
        );
        let level = prior.len() as u8 + 1;
        platform_ensure!(
            level <= MAX_APPEAL_LEVEL,
            ErrorId::AppealLevelMaxed,
            ErrorDomain::Appeal,
            "{subject} has exhausted its appeal levels"
        );
        Ok((level, prior))
    }

    pub(crate) fn submit_dispute_appeal(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        escrow_id: EscrowId,
        requested_resolution: Resolution,
        evidence: Vec<String>,
    ) -> Result<AppealId> {
        let escrow = self.load_escrow(ctx.storage, escrow_id)?;
        let original = escrow.resolution.ok_or_else(|| {
            platform_anyhow!(
                ErrorId::CannotAppeal,
                ErrorDomain::Appeal,
                "escrow {escrow_id} is not resolved"
            )
        })?;
        platform_ensure!(
            escrow.is_participant(sender),
            ErrorId::AppealerNotParticipant,
            ErrorDomain::Appeal,
            "{sender} took no part in escrow {escrow_id}"
        );
        platform_ensure!(
            requested_resolution != original,
            ErrorId::InvalidAppeal,
            ErrorDomain::Appeal,
            "the requested resolution matches the original"
        );

        let subject = AppealSubject::Dispute(escrow_id);
        // original dispute voters are excluded from review
        let mut exclude = escrow.resolved_by.clone();
        exclude.push(sender.clone());
        self.open_appeal(
            ctx,
            sender,
            subject,
            Some(original),
            Some(requested_resolution),
            evidence,
            exclude,
        )
    }

    pub(crate) fn submit_report_appeal(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        report_id: ReportId,
        evidence: Vec<String>,
    ) -> Result<AppealId> {
        let report = self.load_report(ctx.storage, report_id)?;
        platform_ensure!(
            matches!(
                report.status,
                ReportStatus::Confirmed | ReportStatus::Dismissed
            ),
            ErrorId::CannotAppeal,
            ErrorDomain::Appeal,
            "report {report_id} has no appealable resolution"
        );
        let is_participant = &report.reporter == sender
            || report.counterparty.as_ref() == Some(sender)
            || report.target.id == sender.as_str();
        platform_ensure!(
            is_participant,
            ErrorId::AppealerNotParticipant,
            ErrorDomain::Appeal,
            "{sender} took no part in report {report_id}"
        );

        let subject = AppealSubject::Report(report_id);
        let mut exclude: Vec<Addr> = report
            .votes
            .iter()
            .chain(report.previous_votes.iter())
            .map(|vote| vote.reviewer.clone())
            .collect();
        exclude.push(sender.clone());
        self.open_appeal(ctx, sender, subject, None, None, evidence, exclude)
    }

    #[allow(clippy::too_many_arguments)]
    fn open_appeal(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        subject: AppealSubject,
        original_resolution: Option<Resolution>,
        new_resolution: Option<Resolution>,
        evidence: Vec<String>,
        exclude: Vec<Addr>,
    ) -> Result<AppealId> {
        let (level, _) = self.appeal_lineage(ctx.storage, &subject)?;
        let params = AppealParams::for_level(level);
        let appeal_id = alloc_id(ctx.storage, &LAST_APPEAL_ID)?;
        let assigned_reviewers = self.select_reviewers(
            ctx.storage,
            params.tier,
            params.votes_required,
            appeal_id.u64(),
            &exclude,
        )?;

        let appeal = Appeal {
            appeal_id,
            subject: subject.clone(),
            appellant: sender.clone(),
            level,
            required_tier: params.tier,
            votes_required: params.votes_required,
            assigned_reviewers,
            votes: vec![],
            status: AppealStatus::UnderReview,
            original_resolution,
            new_resolution,
            deadline: self.now().plus_seconds(params.deadline_seconds),
            evidence_snapshot: None,
            evidence: evidence
                .into_iter()
                .map(|uri| Evidence {
                    submitted_by: sender.clone(),
                    uri,
                    submitted_at: self.now(),
                })
                .collect(),
            created_at: self.now(),
            resolved_at: None,
        };
        self.save_appeal(ctx, None, &appeal)?;

        ctx.response_mut().add_event(AppealSubmittedEvent {
            appeal_id,
            subject,
            appellant: sender.clone(),
            level,
            reviewers: appeal.assigned_reviewers.clone(),
        });
        Ok(appeal_id)
    }

    pub(crate) fn add_appeal_evidence(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        appeal_id: AppealId,
        uri: String,
    ) -> Result<()> {
        let appeal = self.load_appeal(ctx.storage, appeal_id)?;
        platform_ensure!(
            appeal.status == AppealStatus::UnderReview,
            ErrorId::AppealAlreadyResolved,
            ErrorDomain::Appeal,
            "appeal {appeal_id} is already resolved"
        );
        platform_ensure!(
            appeal.evidence_snapshot.is_none(),
            ErrorId::EvidenceLockedAfterVoting,
            ErrorDomain::Appeal,
            "evidence on appeal {appeal_id} is frozen"
        );
        platform_ensure!(
            &appeal.appellant == sender,
            ErrorId::Unauthorized,
            ErrorDomain::Appeal,
            "only the appellant may add evidence"
        );

        let mut updated = appeal.clone();
        updated.evidence.push(Evidence {
            submitted_by: sender.clone(),
            uri,
            submitted_at: self.now(),
        });
        self.save_appeal(ctx, Some(&appeal), &updated)
    }

    pub(crate) fn vote_on_appeal(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        appeal_id: AppealId,
        choice: VoteChoice,
        comment: Option<String>,
    ) -> Result<()> {
        let appeal = self.load_appeal(ctx.storage, appeal_id)?;
        platform_ensure!(
            appeal.status == AppealStatus::UnderReview,
            ErrorId::AppealAlreadyResolved,
            ErrorDomain::Appeal,
            "appeal {appeal_id} is already resolved"
        );
        platform_ensure!(
            self.now() <= appeal.deadline,
            ErrorId::AppealDeadlinePassed,
            ErrorDomain::Appeal,
            "review deadline for appeal {appeal_id} has passed"
        );
        platform_ensure!(
            appeal.assigned_reviewers.contains(sender),
            ErrorId::NotAssignedReviewer,
            ErrorDomain::Appeal,
            "{sender} is not assigned to appeal {appeal_id}"
        );
        platform_ensure!(
            !appeal.has_voted(sender),
            ErrorId::AppealReviewerAlreadyVoted,
            ErrorDomain::Appeal,
            "{sender} already voted on appeal {appeal_id}"
        );

        let mut updated = appeal.clone();
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

        if updated.votes.len() as u32 >= updated.votes_required {
            self.resolve_appeal(ctx, &appeal, updated)
        } else {
            self.save_appeal(ctx, Some(&appeal), &updated)
        }
    }

    /// Escalate a resolved appeal to the next level. A fresh reviewer set
    /// is drawn that also excludes everyone who voted below.
    pub(crate) fn escalate_appeal(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        appeal_id: AppealId,
    ) -> Result<AppealId> {
        let appeal = self.load_appeal(ctx.storage, appeal_id)?;
        platform_ensure!(
            appeal.status.is_terminal(),
            ErrorId::CannotAppeal,
            ErrorDomain::Appeal,
            "appeal {appeal_id} is still under review"
        );
        platform_ensure!(
            &appeal.appellant == sender,
            ErrorId::Unauthorized,
            ErrorDomain::Appeal,
            "only the appellant may escalate"
        );

        let (_, prior) = self.appeal_lineage(ctx.storage, &appeal.subject)?;
        let mut exclude: Vec<Addr> = prior
            .iter()
            .flat_map(|a| a.votes.iter().map(|vote| vote.reviewer.clone()))
            .collect();
        if let AppealSubject::Dispute(escrow_id) = &appeal.subject {
            let escrow = self.load_escrow(ctx.storage, *escrow_id)?;
            exclude.extend(escrow.resolved_by);
        }
        exclude.push(sender.clone());

        self.open_appeal(
            ctx,
            sender,
            appeal.subject.clone(),
            appeal.original_resolution,
            appeal.new_resolution,
            appeal.evidence.iter().map(|e| e.uri.clone()).collect(),
            exclude,
        )
    }

    /// Majority decision: Confirm votes overturn, Dismiss votes uphold.
    /// Ties and empty rounds uphold the original outcome.
    fn resolve_appeal(
        &self,
        ctx: &mut StateContext,
        old: &Appeal,
        mut appeal: Appeal,
    ) -> Result<()> {
        let overturned = appeal.overturn_votes() > appeal.uphold_votes();
        appeal.status = if overturned {
            AppealStatus::Overturned
        } else {
            AppealStatus::Upheld
        };
        appeal.resolved_at = Some(self.now());
        self.save_appeal(ctx, Some(old), &appeal)?;

        let original_deciders = self.original_deciders(ctx.storage, &appeal)?;
        if overturned {
            for moderator in &original_deciders {
                self.record_moderator_overturned(ctx, moderator)?;
            }
            self.execute_overturn(ctx, &appeal)?;
        } else {
            for moderator in &original_deciders {
                self.record_moderator_upheld(ctx, moderator)?;
                if let AppealSubject::Dispute(escrow_id) = &appeal.subject {
                    self.staking
                        .reward_successful_dispute(ctx.storage, moderator, *escrow_id)?;
                }
            }
        }

        ctx.response_mut().add_event(AppealResolvedEvent {
            appeal_id: appeal.appeal_id,
            status: appeal.status,
            new_resolution: overturned.then_some(appeal.new_resolution).flatten(),
        });
        Ok(())
    }

    /// The moderators whose decision the appeal contests.
    fn original_deciders(&self, store: &dyn Storage, appeal: &Appeal) -> Result<Vec<Addr>> {
        match &appeal.subject {
            AppealSubject::Dispute(escrow_id) => {
                Ok(self.load_escrow(store, *escrow_id)?.resolved_by)
            }
            AppealSubject::Report(report_id) => {
                let report = self.load_report(store, *report_id)?;
                let winning = match report.status {
                    ReportStatus::Confirmed => VoteChoice::Confirm,
                    _ => VoteChoice::Dismiss,
                };
                Ok(report
                    .votes
                    .iter()
                    .filter(|vote| vote.choice == winning)
                    .map(|vote| vote.reviewer.clone())
                    .collect())
            }
        }
    }

    /// Re-executes the contested decision the other way round.
    fn execute_overturn(&self, ctx: &mut StateContext, appeal: &Appeal) -> Result<()> {
        match &appeal.subject {
            AppealSubject::Dispute(escrow_id) => {
                let escrow = self.load_escrow(ctx.storage, *escrow_id)?;
                let new_resolution = appeal.new_resolution.ok_or_else(|| {
                    platform_anyhow!(
                        ErrorId::InvalidAppeal,
                        ErrorDomain::Appeal,
                        "overturned dispute appeal without a replacement resolution"
                    )
                })?;
                self.reroute_resolved_escrow(ctx, &escrow, new_resolution)?;
                self.record_replacement_resolution(ctx, *escrow_id, new_resolution)?;
            }
            AppealSubject::Report(report_id) => {
                let report = self.load_report(ctx.storage, *report_id)?;
                self.flip_report_outcome(ctx, report)?;
            }
        }
        Ok(())
    }

    /// The escrow already paid out under the old resolution, so the switch
    /// is funded by the recovery waterfall against the old recipient.
    fn reroute_resolved_escrow(
        &self,
        ctx: &mut StateContext,
        escrow: &Escrow,
        new_resolution: Resolution,
    ) -> Result<()> {
        let old_resolution = escrow
            .resolution
            .context("rerouting an unresolved escrow")?;
        let old_party = escrow.paid_party(old_resolution).cloned();

        // report id 0 never exists; recovery events for appeal reroutes
        // carry it as a sentinel for "no report"
        let sentinel = ReportId::new(0);
        match escrow.paid_party(new_resolution).cloned() {
            Some(new_party) => {
                self.run_recovery(
                    ctx,
                    sentinel,
                    &new_party,
                    old_party.as_ref(),
                    &escrow.resolved_by,
                    escrow.amount,
                    &escrow.denom,
                )?;
            }
            None => {
                // split: each side is owed half, the odd unit to the buyer
                let seller_half = escrow.amount.checked_div(Uint128::new(2))?;
                let buyer_half = escrow.amount - seller_half;
                self.run_recovery(
                    ctx,
                    sentinel,
                    &escrow.buyer.clone(),
                    old_party.as_ref(),
                    &escrow.resolved_by,
                    buyer_half,
                    &escrow.denom,
                )?;
                self.run_recovery(
                    ctx,
                    sentinel,
                    &escrow.seller.clone(),
                    old_party.as_ref(),
                    &escrow.resolved_by,
                    seller_half,
                    &escrow.denom,
                )?;
            }
        }
        Ok(())
    }

    /// Flips a report's terminal outcome after an overturned appeal.
    fn flip_report_outcome(&self, ctx: &mut StateContext, report: Report) -> Result<()> {
        let mut updated = report.clone();
        match report.status {
            ReportStatus::Confirmed => {
                updated.status = ReportStatus::Dismissed;
                self.save_report(ctx, Some(&report), &updated)?;
                self.apply_dismissal_penalties(
                    ctx,
                    &report.reporter,
                    report.report_type,
                    report.escrow_id,
                )?;
            }
            ReportStatus::Dismissed => {
                updated.status = ReportStatus::Confirmed;
                self.save_report(ctx, Some(&report), &updated)?;
                self.record_confirmed_report(ctx, &report.reporter)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// EndBlock step: resolve appeals whose deadline passed with whatever
    /// votes arrived. Bounded by the deadline index.
    pub(crate) fn process_appeal_deadlines(&self, ctx: &mut StateContext) -> Result<()> {
        let due: Vec<AppealId> = APPEAL_DEADLINES
            .prefix_range(
                ctx.storage,
                None,
                Some(PrefixBound::exclusive(self.now().seconds())),
                Order::Ascending,
            )
            .map(|res| res.map(|((_, id), ())| id).map_err(|err| err.into()))
            .collect::<Result<_>>()?;

        for appeal_id in due {
            let appeal = self.load_appeal(ctx.storage, appeal_id)?;
            if appeal.status != AppealStatus::UnderReview || self.now() <= appeal.deadline {
                continue;
            }
            let updated = appeal.clone();
            self.resolve_appeal(ctx, &appeal, updated)?;
        }
        Ok(())
    }
}
