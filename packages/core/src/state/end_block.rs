use crate::prelude::*;

impl State<'_> {
    /// The deterministic per-block sweep, run after all user transactions.
    /// Step order is fixed; every step is bounded by a status or deadline
    /// index.
    pub(crate) fn end_block(&self, ctx: &mut StateContext) -> Result<()> {
        // 1. stop-order processing per market at the updated last price
        for market_id in self.all_market_ids(ctx.storage)? {
            self.process_stop_orders(ctx, &market_id)?;
        }

        // 2. GTD order expiry
        self.expire_orders(ctx)?;

        // 3. report deadlines: extend / escalate / auto-dismiss
        self.process_report_deadlines(ctx)?;

        // 4. appeal deadlines
        self.process_appeal_deadlines(ctx)?;

        // 5. voluntary-return grace expiry
        self.process_return_deadlines(ctx)?;

        // 6. moderator auto-blacklist re-evaluation
        self.reevaluate_moderators(ctx)?;

        // 7. reporter ban expiry sweep
        self.sweep_expired_bans(ctx)?;

        // 8. withdrawal timelock transitions and session timeouts
        self.process_withdrawal_timelocks(ctx)?;

        // 9. circuit-breaker auto-expiry
        self.sweep_circuit_breaker(ctx)?;

        // 10. inheritance triggers and grace/claim transitions
        self.process_inheritance(ctx)?;

        // 11. statistics rollups and the LP fee sweep
        self.distribute_lp_fees(ctx)?;

        Ok(())
    }
}
