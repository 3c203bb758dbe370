use crate::prelude::*;
use msg::platform::recovery::events::*;
use msg::platform::report::{events::ReporterRewardEvent, Report};

/// What one waterfall run produced.
pub(super) struct RecoveryOutcome {
    /// Delivered to the wronged party, capped at the required amount
    pub victim_received: Uint128,
    /// Recovered beyond the victim's need, retained as the reward pool
    pub excess_pool: Uint128,
}

impl State<'_> {
    /// Runs the waterfall for a confirmed WrongResolution report and pays
    /// the reporter reward out of the excess.
    pub(super) fn execute_wrong_resolution_recovery(
        &self,
        ctx: &mut StateContext,
        report: &Report,
    ) -> Result<()> {
        let escrow_id = report
            .escrow_id
            .context("wrong-resolution report without escrow")?;
        let escrow = self.load_escrow(ctx.storage, escrow_id)?;

        let outcome = self.run_recovery(
            ctx,
            report.report_id,
            &report.reporter,
            report.counterparty.as_ref(),
            &escrow.resolved_by,
            report.amount_to_return,
            &escrow.denom,
        )?;

        // reporter reward, paid only from excess recovery
        let reward = outcome
            .excess_pool
            .mul_floor(self.config.reporter_reward_rate)
            .min(self.config.reporter_reward_cap);
        if !reward.is_zero() {
            self.bank.send_from_module(
                ctx.storage,
                module::RESERVE,
                &report.reporter,
                &escrow.denom,
                reward,
            )?;
            ctx.response_mut().add_event(ReporterRewardEvent {
                report_id: report.report_id,
                reporter: report.reporter.clone(),
                amount: reward,
            });
        }
        self.staking
            .reward_successful_dispute(ctx.storage, &report.reporter, escrow_id)?;
        Ok(())
    }

    /// The clawback → reserve → slash waterfall.
    ///
    /// Targets `required × (1 + margin)`; the victim receives at most
    /// `required`, anything above it lands in the reserve module as the
    /// reward pool. Shortfalls are reported, never papered over.
    pub(super) fn run_recovery(
        &self,
        ctx: &mut StateContext,
        report_id: ReportId,
        victim: &Addr,
        wrongful_recipient: Option<&Addr>,
        wrong_voters: &[Addr],
        required: Uint128,
        denom: &str,
    ) -> Result<RecoveryOutcome> {
        let target = required + required.mul_floor(self.config.recovery_margin);
        let mut victim_received = Uint128::zero();
        let mut excess_pool = Uint128::zero();

        // 1. clawback from the wrongful recipient, forwarded to the victim
        if let Some(recipient) = wrongful_recipient {
            let balance = self.bank.balance(ctx.storage, recipient, denom)?;
            let take = required.min(balance);
            if !take.is_zero() {
                self.bank
                    .send_to_module(ctx.storage, recipient, module::RESERVE, denom, take)?;
                self.bank
                    .send_from_module(ctx.storage, module::RESERVE, victim, denom, take)?;
                victim_received += take;
                ctx.response_mut().add_event(RecoveryStepEvent {
                    report_id,
                    source: event_val::CLAWBACK.to_owned(),
                    amount: take,
                });
            }
            if balance < required {
                ctx.response_mut().add_event(
                    Event::new("clawback-shortfall")
                        .add_attribute(event_key::REPORT_ID, report_id.to_string())
                        .add_attribute(event_key::AMOUNT, (required - balance).to_string()),
                );
            }
        }

        // 2. the reserve fund covers remaining victim need
        let victim_need = required - victim_received;
        if !victim_need.is_zero() {
            let reserve = self
                .bank
                .module_balance(ctx.storage, module::RESERVE, denom)?;
            let cover = victim_need.min(reserve);
            if !cover.is_zero() {
                self.bank
                    .send_from_module(ctx.storage, module::RESERVE, victim, denom, cover)?;
                victim_received += cover;
                ctx.response_mut().add_event(RecoveryStepEvent {
                    report_id,
                    source: event_val::RESERVE.to_owned(),
                    amount: cover,
                });
            }
        }

        // 3. moderator slash: liability is split evenly among the voters
        // that carried the overturned resolution, bounded by stake. The
        // slash burns; a matching tagged mint funds the payout.
        if !wrong_voters.is_empty() {
            let per_voter = required.checked_div(Uint128::new(wrong_voters.len() as u128))?;
            for voter in wrong_voters {
                let remaining_target = target - victim_received - excess_pool;
                if remaining_target.is_zero() {
                    break;
                }
                let stake = self.staking.staked_amount(ctx.storage, voter)?;
                let liability = per_voter.min(stake).min(remaining_target);
                if liability.is_zero() {
                    continue;
                }
                let slashed = self.staking.slash_amount(
                    ctx.storage,
                    voter,
                    liability,
                    "overturned resolution",
                )?;
                if slashed.is_zero() {
                    continue;
                }
                // slash replacement: the only mint outside bridge deposits
                self.bank
                    .mint(ctx.storage, module::RESERVE, denom, slashed)?;
                let to_victim = slashed.min(required - victim_received);
                if !to_victim.is_zero() {
                    self.bank.send_from_module(
                        ctx.storage,
                        module::RESERVE,
                        victim,
                        denom,
                        to_victim,
                    )?;
                    victim_received += to_victim;
                }
                excess_pool += slashed - to_victim;
                ctx.response_mut().add_event(RecoveryStepEvent {
                    report_id,
                    source: event_val::SLASH.to_owned(),
                    amount: slashed,
                });
            }
        }

        if victim_received < required {
            ctx.response_mut().add_event(RecoveryShortfallEvent {
                report_id,
                recovered: victim_received,
                shortfall: required - victim_received,
            });
        }

        Ok(RecoveryOutcome {
            victim_received,
            excess_pool,
        })
    }
}
