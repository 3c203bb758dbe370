use crate::prelude::*;
use msg::platform::history::{events::*, BanState, ModeratorMetrics, ReporterHistory};
use msg::platform::report::ReportType;

pub(super) const REPORTER_HISTORY: Map<&Addr, ReporterHistory> =
    Map::new(namespace::REPORTER_HISTORY);
pub(super) const MODERATOR_METRICS: Map<&Addr, ModeratorMetrics> =
    Map::new(namespace::MODERATOR_METRICS);
const BAN_EXPIRIES: Map<(u64, &Addr), ()> = Map::new(namespace::BAN_EXPIRIES);

impl State<'_> {
    pub(crate) fn reporter_history(
        &self,
        store: &dyn Storage,
        addr: &Addr,
    ) -> Result<ReporterHistory> {
        Ok(REPORTER_HISTORY.may_load(store, addr)?.unwrap_or_default())
    }

    pub(super) fn save_reporter_history(
        &self,
        store: &mut dyn Storage,
        addr: &Addr,
        history: &ReporterHistory,
    ) -> Result<()> {
        Ok(REPORTER_HISTORY.save(store, addr, history)?)
    }

    pub(crate) fn moderator_metrics(
        &self,
        store: &dyn Storage,
        addr: &Addr,
    ) -> Result<ModeratorMetrics> {
        Ok(MODERATOR_METRICS.may_load(store, addr)?.unwrap_or_default())
    }

    /// Whether the address is banned right now. Checked at every entry
    /// point: report submission, withdrawal requests, deposit completion,
    /// inheritance triggers and claims.
    pub(crate) fn is_banned(&self, store: &dyn Storage, addr: &Addr) -> Result<bool> {
        Ok(self.reporter_history(store, addr)?.ban.active(self.now()))
    }

    pub(crate) fn assert_not_banned(
        &self,
        store: &dyn Storage,
        addr: &Addr,
        domain: ErrorDomain,
    ) -> Result<()> {
        platform_ensure!(
            !self.is_banned(store, addr)?,
            ErrorId::AddressBanned,
            domain,
            "{addr} is banned"
        );
        Ok(())
    }

    /// Applies a ban, indexing temporary ones for the expiry sweep.
    pub(super) fn apply_ban(
        &self,
        ctx: &mut StateContext,
        addr: &Addr,
        reason: &str,
        duration: Option<u64>,
    ) -> Result<()> {
        let mut history = self.reporter_history(ctx.storage, addr)?;
        let expires_at = duration.map(|d| self.now().plus_seconds(d));
        history.ban = BanState {
            is_banned: true,
            reason: Some(reason.to_owned()),
            banned_at: Some(self.now()),
            expires_at,
            ban_count: history.ban.ban_count + 1,
        };
        self.save_reporter_history(ctx.storage, addr, &history)?;
        if let Some(expires_at) = expires_at {
            BAN_EXPIRIES.save(ctx.storage, (expires_at.seconds(), addr), &())?;
        }
        ctx.response_mut().add_event(BanEvent {
            address: addr.clone(),
            reason: reason.to_owned(),
            expires_at,
            ban_count: history.ban.ban_count,
        });
        Ok(())
    }

    /// EndBlock sweep clearing lapsed temporary bans. Bounded by the
    /// expiry index.
    pub(crate) fn sweep_expired_bans(&self, ctx: &mut StateContext) -> Result<()> {
        let now = self.now().seconds();
        let due: Vec<(u64, Addr)> = BAN_EXPIRIES
            .prefix_range(
                ctx.storage,
                None,
                Some(PrefixBound::inclusive(now)),
                Order::Ascending,
            )
            .map(|res| res.map(|(key, ())| key))
            .collect::<Result<_, _>>()?;

        for (at, addr) in due {
            BAN_EXPIRIES.remove(ctx.storage, (at, &addr));
            let mut history = self.reporter_history(ctx.storage, &addr)?;
            // the ban may have been replaced by a longer one meanwhile
            let lapsed = history
                .ban
                .expires_at
                .is_some_and(|expires_at| expires_at.seconds() <= now);
            if history.ban.is_banned && lapsed {
                history.ban.is_banned = false;
                history.ban.reason = None;
                self.save_reporter_history(ctx.storage, &addr, &history)?;
                ctx.response_mut()
                    .add_event(BanExpiredEvent { address: addr });
            }
        }
        Ok(())
    }

    pub(super) fn record_report_submitted(
        &self,
        ctx: &mut StateContext,
        reporter: &Addr,
    ) -> Result<()> {
        let mut history = self.reporter_history(ctx.storage, reporter)?;
        history.total_reports += 1;
        self.save_reporter_history(ctx.storage, reporter, &history)
    }

    pub(super) fn record_address_targeted(
        &self,
        ctx: &mut StateContext,
        target: &Addr,
    ) -> Result<()> {
        let mut history = self.reporter_history(ctx.storage, target)?;
        history.last_targeted_at = Some(self.now());
        self.save_reporter_history(ctx.storage, target, &history)
    }

    pub(super) fn record_confirmed_report(
        &self,
        ctx: &mut StateContext,
        reporter: &Addr,
    ) -> Result<()> {
        let mut history = self.reporter_history(ctx.storage, reporter)?;
        history.confirmed_reports += 1;
        history.consecutive_dismissed = 0;
        self.save_reporter_history(ctx.storage, reporter, &history)
    }

    /// Escalating penalties keyed on the consecutive-dismissed streak,
    /// with false-rate multipliers on top.
    pub(super) fn apply_dismissal_penalties(
        &self,
        ctx: &mut StateContext,
        reporter: &Addr,
        report_type: ReportType,
        escrow_id: Option<EscrowId>,
    ) -> Result<()> {
        let mut history = self.reporter_history(ctx.storage, reporter)?;
        history.dismissed_reports += 1;
        history.consecutive_dismissed += 1;
        let streak = history.consecutive_dismissed;

        let base = report_type.base_penalty();
        // (penalty multiplier in percent, slash percent, ban: None = no ban,
        // Some(None) = permanent, Some(Some(s)) = s seconds)
        let (multiplier_pct, slash_pct, ban): (u64, u64, Option<Option<u64>>) = match streak {
            1 => (100, 0, None),
            2 => (
                150,
                if report_type == ReportType::WrongResolution {
                    10
                } else {
                    0
                },
                None,
            ),
            3 => (200, 15, Some(Some(7 * DAY_SECONDS))),
            4 => (300, 25, Some(Some(30 * DAY_SECONDS))),
            _ => (500, 50, Some(None)),
        };

        let mut reputation_penalty = base * multiplier_pct / 100;

        let rate = history.false_report_rate();
        let resolved = history.resolved_reports();
        if rate > Decimal::percent(50) && resolved >= 5 {
            reputation_penalty = reputation_penalty * 3 / 2;
        }
        let permanent_for_rate = rate > Decimal::percent(80) && resolved >= 10;

        history.reputation_lost += reputation_penalty;

        let mut slashed = Uint128::zero();
        if slash_pct > 0 {
            slashed = self.staking.slash(
                ctx.storage,
                reporter,
                Decimal::percent(slash_pct),
                "dismissed report streak",
            )?;
            history.stake_slashed += slashed;
        }
        self.save_reporter_history(ctx.storage, reporter, &history)?;

        if let Some(escrow_id) = escrow_id {
            self.staking
                .penalize_bad_dispute(ctx.storage, reporter, escrow_id)?;
        }

        ctx.response_mut().add_event(ReporterPenaltyEvent {
            reporter: reporter.clone(),
            streak,
            reputation_penalty,
            slashed,
        });

        if permanent_for_rate {
            self.apply_ban(ctx, reporter, "false report rate above 80%", None)?;
        } else if let Some(duration) = ban {
            self.apply_ban(ctx, reporter, "dismissed report streak", duration)?;
        }
        Ok(())
    }

    pub(super) fn record_moderator_decision(
        &self,
        ctx: &mut StateContext,
        moderator: &Addr,
    ) -> Result<()> {
        let mut metrics = self.moderator_metrics(ctx.storage, moderator)?;
        metrics.total_decisions += 1;
        Ok(MODERATOR_METRICS.save(ctx.storage, moderator, &metrics)?)
    }

    pub(super) fn record_moderator_upheld(
        &self,
        ctx: &mut StateContext,
        moderator: &Addr,
    ) -> Result<()> {
        let mut metrics = self.moderator_metrics(ctx.storage, moderator)?;
        metrics.consecutive_overturns = 0;
        Ok(MODERATOR_METRICS.save(ctx.storage, moderator, &metrics)?)
    }

    /// An overturned decision: bump the counters and apply the
    /// auto-blacklist ladder.
    pub(super) fn record_moderator_overturned(
        &self,
        ctx: &mut StateContext,
        moderator: &Addr,
    ) -> Result<()> {
        let mut metrics = self.moderator_metrics(ctx.storage, moderator)?;
        metrics.overturned += 1;
        metrics.consecutive_overturns += 1;

        if metrics.consecutive_overturns >= 5 {
            self.staking.slash(
                ctx.storage,
                moderator,
                Decimal::percent(10),
                "five consecutive overturns",
            )?;
            metrics.blacklisted = true;
            metrics.blacklist_expires_at = Some(self.now().plus_seconds(14 * DAY_SECONDS));
            ctx.response_mut().add_event(ModeratorSanctionEvent {
                moderator: moderator.clone(),
                sanction: "temporary_blacklist".to_owned(),
                slash_fraction: Some(Decimal::percent(10)),
            });
        } else if metrics.consecutive_overturns == 3 {
            self.staking.slash(
                ctx.storage,
                moderator,
                Decimal::percent(5),
                "three consecutive overturns",
            )?;
            metrics.blacklisted = true;
            metrics.blacklist_expires_at = Some(self.now().plus_seconds(14 * DAY_SECONDS));
            ctx.response_mut().add_event(ModeratorSanctionEvent {
                moderator: moderator.clone(),
                sanction: "temporary_blacklist".to_owned(),
                slash_fraction: Some(Decimal::percent(5)),
            });
        } else if metrics.overturn_rate() >= Decimal::percent(30) && metrics.total_decisions >= 10 {
            metrics.warnings += 1;
            ctx.response_mut().add_event(ModeratorSanctionEvent {
                moderator: moderator.clone(),
                sanction: "warning".to_owned(),
                slash_fraction: None,
            });
        }

        Ok(MODERATOR_METRICS.save(ctx.storage, moderator, &metrics)?)
    }

    pub(super) fn record_report_against_moderator(
        &self,
        ctx: &mut StateContext,
        moderator: &Addr,
    ) -> Result<()> {
        let mut metrics = self.moderator_metrics(ctx.storage, moderator)?;
        metrics.reports_against += 1;
        Ok(MODERATOR_METRICS.save(ctx.storage, moderator, &metrics)?)
    }

    /// A confirmed misconduct or collusion report against a moderator.
    /// Two confirmations blacklist permanently.
    pub(super) fn record_confirmed_moderator_report(
        &self,
        ctx: &mut StateContext,
        moderator: &Addr,
    ) -> Result<()> {
        let mut metrics = self.moderator_metrics(ctx.storage, moderator)?;
        metrics.confirmed_reports += 1;
        if metrics.confirmed_reports >= 2 {
            metrics.blacklisted = true;
            metrics.blacklist_expires_at = None;
            ctx.response_mut().add_event(ModeratorSanctionEvent {
                moderator: moderator.clone(),
                sanction: "permanent_blacklist".to_owned(),
                slash_fraction: None,
            });
        }
        Ok(MODERATOR_METRICS.save(ctx.storage, moderator, &metrics)?)
    }

    /// EndBlock re-evaluation clearing lapsed temporary blacklists.
    pub(crate) fn reevaluate_moderators(&self, ctx: &mut StateContext) -> Result<()> {
        let entries: Vec<(Addr, ModeratorMetrics)> = MODERATOR_METRICS
            .range(ctx.storage, None, None, Order::Ascending)
            .collect::<Result<_, _>>()?;
        for (moderator, mut metrics) in entries {
            let lapsed = metrics.blacklisted
                && metrics
                    .blacklist_expires_at
                    .is_some_and(|expires_at| self.now() > expires_at);
            if lapsed {
                metrics.blacklisted = false;
                metrics.blacklist_expires_at = None;
                MODERATOR_METRICS.save(ctx.storage, &moderator, &metrics)?;
            }
        }
        Ok(())
    }
}
