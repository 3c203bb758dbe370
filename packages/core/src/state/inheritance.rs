use crate::prelude::*;
use msg::platform::inheritance::{
    events::*, Beneficiary, ClaimWindow, InheritancePlan, PlanStatus,
};

const LAST_PLAN_ID: Item<PlanId> = Item::new(namespace::LAST_PLAN_ID);
const PLANS: Map<PlanId, InheritancePlan> = Map::new(namespace::PLANS);
const PLANS_BY_OWNER: Map<(&Addr, PlanId), ()> = Map::new(namespace::PLANS_BY_OWNER);
const PLANS_BY_BENEFICIARY: Map<(&Addr, PlanId), ()> = Map::new(namespace::PLANS_BY_BENEFICIARY);
/// Last on-chain activity per address, mirrored into the trigger index.
const LAST_ACTIVITY: Map<&Addr, Timestamp> = Map::new(namespace::LAST_ACTIVITY);
/// Active plans by their earliest possible trigger time.
const PLAN_TRIGGERS: Map<(u64, PlanId), ()> = Map::new(namespace::PLAN_TRIGGERS);
/// Triggered/executing plans by their next phase deadline.
const PLAN_DEADLINES: Map<(u64, PlanId), ()> = Map::new(namespace::PLAN_DEADLINES);
/// Per-plan claim locks, held for the duration of one claim transaction.
const CLAIM_LOCKS: Map<PlanId, ()> = Map::new(namespace::CLAIM_LOCKS);

fn phase_deadline(plan: &InheritancePlan) -> Option<u64> {
    match plan.status {
        PlanStatus::Triggered => plan.grace_end.map(|t| t.seconds()),
        PlanStatus::Executing => plan
            .current_claim_window
            .as_ref()
            .map(|w| w.ends_at.seconds()),
        _ => None,
    }
}

impl State<'_> {
    pub(crate) fn load_plan(&self, store: &dyn Storage, plan_id: PlanId) -> Result<InheritancePlan> {
        PLANS.may_load(store, plan_id)?.ok_or_else(|| {
            platform_anyhow!(
                ErrorId::PlanNotFound,
                ErrorDomain::Inheritance,
                "plan {plan_id} not found"
            )
        })
    }

    fn save_plan_deadline(
        &self,
        store: &mut dyn Storage,
        old: Option<&InheritancePlan>,
        plan: &InheritancePlan,
    ) -> Result<()> {
        let old_entry = old.and_then(phase_deadline);
        let new_entry = phase_deadline(plan);
        if old_entry != new_entry {
            if let Some(at) = old_entry {
                PLAN_DEADLINES.remove(store, (at, plan.plan_id));
            }
            if let Some(at) = new_entry {
                PLAN_DEADLINES.save(store, (at, plan.plan_id), &())?;
            }
        }
        Ok(())
    }

    fn save_plan(
        &self,
        ctx: &mut StateContext,
        old: Option<&InheritancePlan>,
        plan: &InheritancePlan,
    ) -> Result<()> {
        PLANS.save(ctx.storage, plan.plan_id, plan)?;
        self.save_plan_deadline(ctx.storage, old, plan)
    }

    fn owner_last_activity(
        &self,
        store: &dyn Storage,
        plan: &InheritancePlan,
    ) -> Result<Timestamp> {
        Ok(LAST_ACTIVITY
            .may_load(store, &plan.owner)?
            .unwrap_or(plan.created_at))
    }

    fn trigger_key(&self, last_activity: Timestamp, plan: &InheritancePlan) -> u64 {
        last_activity.seconds() + plan.inactivity_period
    }

    /// Records sender activity and cancels any triggered plans of theirs.
    /// Runs ahead of every transaction as false-positive protection.
    pub(crate) fn touch_activity(&self, ctx: &mut StateContext, sender: &Addr) -> Result<()> {
        let previous = LAST_ACTIVITY.may_load(ctx.storage, sender)?;
        LAST_ACTIVITY.save(ctx.storage, sender, &self.now())?;

        let plan_ids: Vec<PlanId> = PLANS_BY_OWNER
            .prefix(sender)
            .keys(ctx.storage, None, None, Order::Ascending)
            .collect::<Result<_, _>>()?;
        for plan_id in plan_ids {
            let plan = self.load_plan(ctx.storage, plan_id)?;
            match plan.status {
                PlanStatus::Active => {
                    let old_key = self.trigger_key(previous.unwrap_or(plan.created_at), &plan);
                    let new_key = self.trigger_key(self.now(), &plan);
                    if old_key != new_key {
                        PLAN_TRIGGERS.remove(ctx.storage, (old_key, plan_id));
                        PLAN_TRIGGERS.save(ctx.storage, (new_key, plan_id), &())?;
                    }
                }
                PlanStatus::Triggered => self.cancel_trigger_inner(ctx, plan)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns a triggered plan to Active, releasing the swept estate.
    fn cancel_trigger_inner(&self, ctx: &mut StateContext, plan: InheritancePlan) -> Result<()> {
        for coin in &plan.escrowed {
            self.bank.send_from_module(
                ctx.storage,
                module::INHERITANCE,
                &plan.owner,
                &coin.denom,
                coin.amount,
            )?;
        }

        let mut updated = plan.clone();
        updated.status = PlanStatus::Active;
        updated.escrowed = vec![];
        updated.trigger_at = None;
        updated.grace_end = None;
        self.save_plan(ctx, Some(&plan), &updated)?;
        PLAN_TRIGGERS.save(
            ctx.storage,
            (self.trigger_key(self.now(), &updated), updated.plan_id),
            &(),
        )?;

        ctx.response_mut().add_event(TriggerCancelledEvent {
            plan_id: plan.plan_id,
        });
        Ok(())
    }

    pub(crate) fn create_plan(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        beneficiaries: Vec<Beneficiary>,
        inactivity_period: u64,
        grace_period: u64,
        claim_window: u64,
        charity: Option<Addr>,
    ) -> Result<PlanId> {
        InheritancePlan::check_beneficiaries(&beneficiaries)
            .map_err(|err| {
                platform_anyhow!(ErrorId::InvalidPlan, ErrorDomain::Inheritance, "{err}")
            })?;
        platform_ensure!(
            inactivity_period > 0 && claim_window > 0,
            ErrorId::InvalidPlan,
            ErrorDomain::Inheritance,
            "inactivity period and claim window must be positive"
        );
        platform_ensure!(
            grace_period >= self.config.min_grace_period,
            ErrorId::InvalidPlan,
            ErrorDomain::Inheritance,
            "grace period is below the 30 day minimum"
        );

        let plan_id = alloc_id(ctx.storage, &LAST_PLAN_ID)?;
        let plan = InheritancePlan {
            plan_id,
            owner: sender.clone(),
            beneficiaries,
            inactivity_period,
            grace_period,
            claim_window,
            charity: charity.unwrap_or_else(|| self.config.charity.clone()),
            status: PlanStatus::Active,
            created_at: self.now(),
            trigger_at: None,
            grace_end: None,
            current_claim_window: None,
            escrowed: vec![],
            settled_priorities: vec![],
        };
        self.save_plan(ctx, None, &plan)?;
        PLANS_BY_OWNER.save(ctx.storage, (sender, plan_id), &())?;
        for beneficiary in &plan.beneficiaries {
            PLANS_BY_BENEFICIARY.save(ctx.storage, (&beneficiary.address, plan_id), &())?;
        }
        PLAN_TRIGGERS.save(
            ctx.storage,
            (self.trigger_key(self.now(), &plan), plan_id),
            &(),
        )?;

        ctx.response_mut().add_event(PlanStoredEvent {
            plan_id,
            owner: sender.clone(),
            beneficiaries: plan.beneficiaries.len() as u32,
        });
        Ok(plan_id)
    }

    pub(crate) fn update_plan(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        plan_id: PlanId,
        beneficiaries: Option<Vec<Beneficiary>>,
        inactivity_period: Option<u64>,
        grace_period: Option<u64>,
        claim_window: Option<u64>,
    ) -> Result<()> {
        let plan = self.load_plan(ctx.storage, plan_id)?;
        platform_ensure!(
            &plan.owner == sender,
            ErrorId::Unauthorized,
            ErrorDomain::Inheritance,
            "plan {plan_id} is not owned by {sender}"
        );
        platform_ensure!(
            plan.status == PlanStatus::Active,
            ErrorId::InvalidPlan,
            ErrorDomain::Inheritance,
            "only active plans can be updated"
        );

        let mut updated = plan.clone();
        if let Some(beneficiaries) = beneficiaries {
            InheritancePlan::check_beneficiaries(&beneficiaries).map_err(|err| {
                platform_anyhow!(ErrorId::InvalidPlan, ErrorDomain::Inheritance, "{err}")
            })?;
            for beneficiary in &plan.beneficiaries {
                PLANS_BY_BENEFICIARY.remove(ctx.storage, (&beneficiary.address, plan_id));
            }
            for beneficiary in &beneficiaries {
                PLANS_BY_BENEFICIARY.save(ctx.storage, (&beneficiary.address, plan_id), &())?;
            }
            updated.beneficiaries = beneficiaries;
        }
        if let Some(grace_period) = grace_period {
            platform_ensure!(
                grace_period >= self.config.min_grace_period,
                ErrorId::InvalidPlan,
                ErrorDomain::Inheritance,
                "grace period is below the 30 day minimum"
            );
            updated.grace_period = grace_period;
        }
        if let Some(claim_window) = claim_window {
            platform_ensure!(
                claim_window > 0,
                ErrorId::InvalidPlan,
                ErrorDomain::Inheritance,
                "claim window must be positive"
            );
            updated.claim_window = claim_window;
        }
        if let Some(inactivity_period) = inactivity_period {
            platform_ensure!(
                inactivity_period > 0,
                ErrorId::InvalidPlan,
                ErrorDomain::Inheritance,
                "inactivity period must be positive"
            );
            let last_activity = self.owner_last_activity(ctx.storage, &plan)?;
            PLAN_TRIGGERS.remove(
                ctx.storage,
                (self.trigger_key(last_activity, &plan), plan_id),
            );
            updated.inactivity_period = inactivity_period;
            PLAN_TRIGGERS.save(
                ctx.storage,
                (self.trigger_key(last_activity, &updated), plan_id),
                &(),
            )?;
        }
        self.save_plan(ctx, Some(&plan), &updated)?;

        ctx.response_mut().add_event(PlanStoredEvent {
            plan_id,
            owner: sender.clone(),
            beneficiaries: updated.beneficiaries.len() as u32,
        });
        Ok(())
    }

    pub(crate) fn cancel_plan(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        plan_id: PlanId,
    ) -> Result<()> {
        let plan = self.load_plan(ctx.storage, plan_id)?;
        platform_ensure!(
            &plan.owner == sender,
            ErrorId::Unauthorized,
            ErrorDomain::Inheritance,
            "plan {plan_id} is not owned by {sender}"
        );
        platform_ensure!(
            matches!(plan.status, PlanStatus::Active | PlanStatus::Triggered),
            ErrorId::InvalidPlan,
            ErrorDomain::Inheritance,
            "plan {plan_id} can no longer be cancelled"
        );

        // a triggered plan returns its swept estate first
        for coin in &plan.escrowed {
            self.bank.send_from_module(
                ctx.storage,
                module::INHERITANCE,
                &plan.owner,
                &coin.denom,
                coin.amount,
            )?;
        }
        if plan.status == PlanStatus::Active {
            let last_activity = self.owner_last_activity(ctx.storage, &plan)?;
            PLAN_TRIGGERS.remove(
                ctx.storage,
                (self.trigger_key(last_activity, &plan), plan_id),
            );
        }

        let mut updated = plan.clone();
        updated.status = PlanStatus::Cancelled;
        updated.escrowed = vec![];
        self.save_plan(ctx, Some(&plan), &updated)?;
        Ok(())
    }

    /// Explicit owner proof-of-life during grace.
    pub(crate) fn cancel_trigger(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        plan_id: PlanId,
    ) -> Result<()> {
        let plan = self.load_plan(ctx.storage, plan_id)?;
        platform_ensure!(
            &plan.owner == sender,
            ErrorId::Unauthorized,
            ErrorDomain::Inheritance,
            "plan {plan_id} is not owned by {sender}"
        );
        platform_ensure!(
            plan.status == PlanStatus::Triggered,
            ErrorId::InvalidPlan,
            ErrorDomain::Inheritance,
            "plan {plan_id} is not triggered"
        );
        self.cancel_trigger_inner(ctx, plan)
    }

    pub(crate) fn claim_assets(
        &self,
        ctx: &mut StateContext,
        sender: &Addr,
        plan_id: PlanId,
    ) -> Result<()> {
        // the claim lock serialises concurrent claims; errors discard the
        // whole transaction, lock acquisition included
        platform_ensure!(
            !CLAIM_LOCKS.has(ctx.storage, plan_id),
            ErrorId::ClaimLocked,
            ErrorDomain::Inheritance,
            "a claim on plan {plan_id} is in flight"
        );
        CLAIM_LOCKS.save(ctx.storage, plan_id, &())?;

        let plan = self.load_plan(ctx.storage, plan_id)?;
        platform_ensure!(
            plan.status == PlanStatus::Executing,
            ErrorId::PlanNotClaimable,
            ErrorDomain::Inheritance,
            "plan {plan_id} is not distributing"
        );
        let window = plan.current_claim_window.clone().ok_or_else(|| {
            platform_anyhow!(
                ErrorId::PlanNotClaimable,
                ErrorDomain::Inheritance,
                "plan {plan_id} has no open claim window"
            )
        })?;
        platform_ensure!(
            self.now() <= window.ends_at,
            ErrorId::PlanNotClaimable,
            ErrorDomain::Inheritance,
            "the claim window has closed"
        );
        let beneficiary = plan
            .beneficiary_at(window.priority)
            .cloned()
            .context("claim window priority without beneficiary")?;
        platform_ensure!(
            &beneficiary.address == sender,
            ErrorId::Unauthorized,
            ErrorDomain::Inheritance,
            "the open window belongs to another beneficiary"
        );

        let mut updated = plan.clone();
        if self.is_banned(ctx.storage, sender)? {
            // banned beneficiaries are skipped, not paid
            ctx.response_mut().add_event(ClaimSettledEvent {
                plan_id,
                beneficiary: sender.clone(),
                action: event_val::SKIPPED.to_owned(),
                coins_delivered: 0,
            });
            updated.settled_priorities.push(window.priority);
            self.advance_claim_cascade(ctx, &plan, updated)?;
        } else {
            let delivered = self.pay_beneficiary(ctx, &mut updated, &beneficiary)?;
            ctx.response_mut().add_event(ClaimSettledEvent {
                plan_id,
                beneficiary: sender.clone(),
                action: event_val::CLAIMED.to_owned(),
                coins_delivered: delivered,
            });
            updated.settled_priorities.push(window.priority);
            self.advance_claim_cascade(ctx, &plan, updated)?;
        }

        CLAIM_LOCKS.remove(ctx.storage, plan_id);
        Ok(())
    }

    /// Specific assets first, then the beneficiary's share of the rest.
    /// Shares are normalised over unsettled beneficiaries so the final
    /// claimant drains the estate rather than stranding a remainder.
    fn pay_beneficiary(
        &self,
        ctx: &mut StateContext,
        plan: &mut InheritancePlan,
        beneficiary: &Beneficiary,
    ) -> Result<u32> {
        let mut delivered = 0u32;

        for wanted in &beneficiary.specific_assets {
            let available = take_from_escrow(&mut plan.escrowed, &wanted.denom, wanted.amount);
            if available.is_zero() {
                continue;
            }
            self.bank.send_from_module(
                ctx.storage,
                module::INHERITANCE,
                &beneficiary.address,
                &wanted.denom,
                available,
            )?;
            delivered += 1;
        }

        let unsettled_share: Decimal = plan
            .beneficiaries
            .iter()
            .filter(|b| !plan.settled_priorities.contains(&b.priority))
            .map(|b| b.percentage)
            .sum();
        if unsettled_share.is_zero() {
            return Ok(delivered);
        }
        let fraction = (beneficiary.percentage / unsettled_share).min(Decimal::one());

        let escrowed = plan.escrowed.clone();
        for coin in escrowed {
            let share = coin.amount.mul_floor(fraction);
            if share.is_zero() {
                continue;
            }
            take_from_escrow(&mut plan.escrowed, &coin.denom, share);
            self.bank.send_from_module(
                ctx.storage,
                module::INHERITANCE,
                &beneficiary.address,
                &coin.denom,
                share,
            )?;
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Opens the next priority's window, skipping banned beneficiaries,
    /// or finishes into charity once the cascade is exhausted.
    fn advance_claim_cascade(
        &self,
        ctx: &mut StateContext,
        old: &InheritancePlan,
        mut plan: InheritancePlan,
    ) -> Result<()> {
        loop {
            let current = plan.current_claim_window.as_ref().map(|w| w.priority);
            let priority = match plan.next_priority(current) {
                Some(priority) => priority,
                None => return self.finish_plan(ctx, old, plan),
            };
            let beneficiary = plan
                .beneficiary_at(priority)
                .cloned()
                .context("cascade priority without beneficiary")?;

            if self.is_banned(ctx.storage, &beneficiary.address)? {
                ctx.response_mut().add_event(ClaimSettledEvent {
                    plan_id: plan.plan_id,
                    beneficiary: beneficiary.address,
                    action: event_val::SKIPPED.to_owned(),
                    coins_delivered: 0,
                });
                plan.settled_priorities.push(priority);
                plan.current_claim_window = Some(ClaimWindow {
                    priority,
                    ends_at: self.now(),
                });
                continue;
            }

            let ends_at = self.now().plus_seconds(plan.claim_window);
            plan.current_claim_window = Some(ClaimWindow { priority, ends_at });
            self.save_plan(ctx, Some(old), &plan)?;
            ctx.response_mut().add_event(ClaimWindowOpenedEvent {
                plan_id: plan.plan_id,
                priority,
                window_end: ends_at,
            });
            return Ok(());
        }
    }

    /// Residual estate to charity, plan Completed.
    fn finish_plan(
        &self,
        ctx: &mut StateContext,
        old: &InheritancePlan,
        mut plan: InheritancePlan,
    ) -> Result<()> {
        let mut fee_denom_total = Uint128::zero();
        let coins = plan.escrowed.len() as u32;
        for coin in &plan.escrowed {
            if coin.amount.is_zero() {
                continue;
            }
            self.bank.send_from_module(
                ctx.storage,
                module::INHERITANCE,
                &plan.charity,
                &coin.denom,
                coin.amount,
            )?;
            if coin.denom == self.config.fee_denom {
                fee_denom_total += coin.amount;
            }
        }
        plan.escrowed = vec![];
        plan.current_claim_window = None;
        plan.status = PlanStatus::Completed;
        self.save_plan(ctx, Some(old), &plan)?;

        ctx.response_mut().add_event(CharityFallbackEvent {
            plan_id: plan.plan_id,
            charity: plan.charity.clone(),
            coins,
            fee_denom_total,
        });
        Ok(())
    }

    /// EndBlock step: trigger evaluation and phase transitions. Bounded
    /// by the trigger and deadline indexes.
    pub(crate) fn process_inheritance(&self, ctx: &mut StateContext) -> Result<()> {
        self.process_plan_triggers(ctx)?;
        self.process_plan_deadlines(ctx)
    }

    fn process_plan_triggers(&self, ctx: &mut StateContext) -> Result<()> {
        let due: Vec<(u64, PlanId)> = PLAN_TRIGGERS
            .prefix_range(
                ctx.storage,
                None,
                Some(PrefixBound::inclusive(self.now().seconds())),
                Order::Ascending,
            )
            .map(|res| res.map(|(key, ())| key))
            .collect::<Result<_, _>>()?;

        for (at, plan_id) in due {
            let plan = self.load_plan(ctx.storage, plan_id)?;
            if plan.status != PlanStatus::Active {
                PLAN_TRIGGERS.remove(ctx.storage, (at, plan_id));
                continue;
            }
            let last_activity = self.owner_last_activity(ctx.storage, &plan)?;
            let real_key = self.trigger_key(last_activity, &plan);
            if real_key > self.now().seconds() {
                // stale entry from a missed reindex; move it
                PLAN_TRIGGERS.remove(ctx.storage, (at, plan_id));
                PLAN_TRIGGERS.save(ctx.storage, (real_key, plan_id), &())?;
                continue;
            }
            if self.is_banned(ctx.storage, &plan.owner)? {
                // banned owners do not trigger; retry once the ban lifts
                continue;
            }

            PLAN_TRIGGERS.remove(ctx.storage, (at, plan_id));

            let dormant_for = self.now().seconds().saturating_sub(last_activity.seconds());
            if dormant_for >= self.config.ultra_long_inactivity {
                // ultra-long dormancy goes straight to charity
                let mut updated = plan.clone();
                updated.escrowed = self.sweep_owner_assets(ctx, &plan.owner)?;
                self.finish_plan(ctx, &plan, updated)?;
                continue;
            }

            let mut updated = plan.clone();
            updated.status = PlanStatus::Triggered;
            updated.trigger_at = Some(self.now());
            updated.grace_end = Some(self.now().plus_seconds(plan.grace_period));
            updated.escrowed = self.sweep_owner_assets(ctx, &plan.owner)?;
            self.save_plan(ctx, Some(&plan), &updated)?;

            ctx.response_mut().add_event(PlanTriggeredEvent {
                plan_id,
                triggered_at: self.now(),
                grace_end: updated.grace_end.expect("just set"),
            });
        }
        Ok(())
    }

    /// Option (a) of the sweep policy: the owner's full bank balance moves
    /// into the inheritance module at trigger time.
    fn sweep_owner_assets(&self, ctx: &mut StateContext, owner: &Addr) -> Result<Vec<Coin>> {
        let balances = self.bank.all_balances(ctx.storage, owner)?;
        let mut swept = Vec::with_capacity(balances.len());
        for coin in balances {
            if coin.amount.is_zero() {
                continue;
            }
            self.bank.send_to_module(
                ctx.storage,
                owner,
                module::INHERITANCE,
                &coin.denom,
                coin.amount,
            )?;
            swept.push(coin);
        }
        Ok(swept)
    }

    fn process_plan_deadlines(&self, ctx: &mut StateContext) -> Result<()> {
        let due: Vec<(u64, PlanId)> = PLAN_DEADLINES
            .prefix_range(
                ctx.storage,
                None,
                Some(PrefixBound::exclusive(self.now().seconds())),
                Order::Ascending,
            )
            .map(|res| res.map(|(key, ())| key))
            .collect::<Result<_, _>>()?;

        for (_, plan_id) in due {
            let plan = self.load_plan(ctx.storage, plan_id)?;
            match plan.status {
                PlanStatus::Triggered => {
                    let grace_over = plan
                        .grace_end
                        .is_some_and(|grace_end| self.now() > grace_end);
                    if !grace_over {
                        continue;
                    }
                    let mut updated = plan.clone();
                    updated.status = PlanStatus::Executing;
                    updated.current_claim_window = None;
                    self.advance_claim_cascade(ctx, &plan, updated)?;
                }
                PlanStatus::Executing => {
                    let window_over = plan
                        .current_claim_window
                        .as_ref()
                        .is_some_and(|w| self.now() > w.ends_at);
                    if !window_over {
                        continue;
                    }
                    // the window lapsed unclaimed: cascade onward
                    let mut updated = plan.clone();
                    if let Some(window) = &plan.current_claim_window {
                        updated.settled_priorities.push(window.priority);
                    }
                    self.advance_claim_cascade(ctx, &plan, updated)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Removes up to `wanted` of `denom` from the escrow list, returning what
/// was actually available.
fn take_from_escrow(escrowed: &mut Vec<Coin>, denom: &str, wanted: Uint128) -> Uint128 {
    for coin in escrowed.iter_mut() {
        if coin.denom == denom {
            let take = wanted.min(coin.amount);
            coin.amount -= take;
            return take;
        }
    }
    Uint128::zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_from_escrow_clamps() {
        let mut escrow = vec![Coin::new(100u128, "uapple"), Coin::new(50u128, "uhodl")];
        assert_eq!(
            take_from_escrow(&mut escrow, "uapple", Uint128::new(150)),
            Uint128::new(100)
        );
        assert_eq!(escrow[0].amount, Uint128::zero());
        assert_eq!(
            take_from_escrow(&mut escrow, "missing", Uint128::new(1)),
            Uint128::zero()
        );
    }
}
