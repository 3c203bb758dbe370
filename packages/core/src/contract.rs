//! Transaction dispatch and the block boundary entry points.
//!
//! The shell invokes [instantiate] once, [execute] per transaction in
//! mempool-delivered order, and [end_block] after the last transaction of
//! every block. Each entry point runs inside a cache context: an error
//! leaves zero mutations visible.

use crate::cache::CacheStorage;
use crate::collaborators::{Bank, Equity, Staking};
use crate::prelude::*;
use crate::state::{save_config, State, StateContext};

/// Block context handed in by the shell. All time and randomness derive
/// from here; the core never reads a clock.
#[derive(Clone, Copy, Debug)]
pub struct BlockEnv {
    /// Monotonic block time
    pub time: Timestamp,
    /// Block height
    pub height: u64,
    /// First 8 bytes of the block hash, the randomness seed
    pub hash_prefix: [u8; 8],
}

/// The injected external collaborators.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    /// Balance ledger
    pub bank: &'a dyn Bank,
    /// Staking subsystem
    pub staking: &'a dyn Staking,
    /// Equity and share registry
    pub equity: &'a dyn Equity,
}

/// Write the initial configuration. Executed once.
pub fn instantiate(storage: &mut dyn Storage, msg: InstantiateMsg) -> Result<Response> {
    save_config(storage, &msg.config)?;
    Ok(Response::new())
}

/// Dispatch one transaction.
pub fn execute(
    storage: &mut dyn Storage,
    collab: Collaborators,
    env: BlockEnv,
    sender: &Addr,
    msg: ExecuteMsg,
) -> Result<Response> {
    let mut cache = CacheStorage::new(storage);
    let response = execute_inner(&mut cache, collab, env, sender, msg)?;
    cache.commit();
    Ok(response)
}

/// Run the EndBlock scheduler.
pub fn end_block(
    storage: &mut dyn Storage,
    collab: Collaborators,
    env: BlockEnv,
) -> Result<Response> {
    let mut cache = CacheStorage::new(storage);
    let state = State::new(collab.bank, collab.staking, collab.equity, env, &cache)?;
    let mut ctx = StateContext::new(&mut cache);
    state.end_block(&mut ctx)?;
    let response = ctx.into_response();
    cache.commit();
    Ok(response)
}

/// Settle the fee for a transaction, auto-swapping holdings if needed.
///
/// Called by the shell ahead of [execute], the way an ante handler runs
/// ahead of message dispatch.
pub fn deduct_fee(
    storage: &mut dyn Storage,
    collab: Collaborators,
    env: BlockEnv,
    payer: &Addr,
    fee: Uint128,
) -> Result<Response> {
    let mut cache = CacheStorage::new(storage);
    let state = State::new(collab.bank, collab.staking, collab.equity, env, &cache)?;
    let mut ctx = StateContext::new(&mut cache);
    state.deduct_fee(&mut ctx, payer, fee)?;
    let response = ctx.into_response();
    cache.commit();
    Ok(response)
}

fn execute_inner(
    storage: &mut dyn Storage,
    collab: Collaborators,
    env: BlockEnv,
    sender: &Addr,
    msg: ExecuteMsg,
) -> Result<Response> {
    let state = State::new(collab.bank, collab.staking, collab.equity, env, storage)?;
    let mut ctx = StateContext::new(storage);

    // Every successful sender-initiated transaction is proof of life for
    // the inheritance monitor; a failed one rolls this back with the rest.
    state.touch_activity(&mut ctx, sender)?;

    match msg {
        ExecuteMsg::CreateMarket {
            base,
            quote,
            tick_size,
            lot_size,
            min_order_size,
            max_order_size,
            maker_fee,
            taker_fee,
        } => state.create_market(
            &mut ctx,
            sender,
            base,
            quote,
            tick_size,
            lot_size,
            min_order_size,
            max_order_size,
            maker_fee,
            taker_fee,
        )?,
        ExecuteMsg::PlaceOrder {
            market_id,
            side,
            order_type,
            time_in_force,
            quantity,
            price,
            stop_price,
            expires_at,
            client_order_id,
        } => {
            state.place_order(
                &mut ctx,
                sender,
                market_id,
                side,
                order_type,
                time_in_force,
                quantity,
                price,
                stop_price,
                expires_at,
                client_order_id,
            )?;
        }
        ExecuteMsg::CancelOrder { order_id } => state.cancel_order(&mut ctx, sender, order_id)?,
        ExecuteMsg::CancelAllOrders { market_id } => {
            state.cancel_all_orders(&mut ctx, sender, market_id)?
        }

        ExecuteMsg::CreateLiquidityPool {
            market_id,
            fee_rate,
            base_amount,
            quote_amount,
        } => state.create_pool(&mut ctx, sender, market_id, fee_rate, base_amount, quote_amount)?,
        ExecuteMsg::AddLiquidity {
            market_id,
            base_amount,
            quote_amount,
        } => state.add_liquidity(&mut ctx, sender, market_id, base_amount, quote_amount)?,
        ExecuteMsg::RemoveLiquidity {
            market_id,
            lp_amount,
        } => state.remove_liquidity(&mut ctx, sender, market_id, lp_amount)?,
        ExecuteMsg::Swap {
            market_id,
            offer_denom,
            offer_amount,
            min_receive,
        } => state.swap(&mut ctx, sender, market_id, offer_denom, offer_amount, min_receive)?,

        ExecuteMsg::OpenEscrow {
            seller,
            amount,
            denom,
        } => {
            state.open_escrow(&mut ctx, sender, &seller, amount, denom)?;
        }
        ExecuteMsg::ResolveEscrow {
            escrow_id,
            resolution,
        } => {
            // governance or a warden-tier moderator may resolve
            if sender != &state.config.governance {
                let tier = state.staking.tier_of(ctx.storage, sender)?;
                platform_ensure!(
                    tier >= Tier::Warden,
                    ErrorId::InsufficientTier,
                    ErrorDomain::Escrow,
                    "{sender} is below warden tier"
                );
            }
            state.resolve_escrow(&mut ctx, sender, escrow_id, resolution)?;
        }

        ExecuteMsg::SubmitReport {
            report_type,
            target,
            severity,
            evidence,
            escrow_id,
        } => {
            state.submit_report(&mut ctx, sender, report_type, target, severity, evidence, escrow_id)?;
        }
        ExecuteMsg::SubmitReportEvidence { report_id, uri } => {
            state.submit_report_evidence(&mut ctx, sender, report_id, uri)?
        }
        ExecuteMsg::VoteOnReport {
            report_id,
            choice,
            comment,
        } => state.vote_on_report(&mut ctx, sender, report_id, choice, comment)?,
        ExecuteMsg::VoluntaryReturn { report_id } => {
            state.voluntary_return(&mut ctx, sender, report_id)?
        }
        ExecuteMsg::RejectVoluntaryReturn { report_id, reason } => {
            state.reject_voluntary_return(&mut ctx, sender, report_id, reason)?
        }
        ExecuteMsg::SubmitDisputeAppeal {
            escrow_id,
            requested_resolution,
            evidence,
        } => {
            state.submit_dispute_appeal(&mut ctx, sender, escrow_id, requested_resolution, evidence)?;
        }
        ExecuteMsg::SubmitReportAppeal {
            report_id,
            evidence,
        } => {
            state.submit_report_appeal(&mut ctx, sender, report_id, evidence)?;
        }
        ExecuteMsg::VoteOnAppeal {
            appeal_id,
            choice,
            comment,
        } => state.vote_on_appeal(&mut ctx, sender, appeal_id, choice, comment)?,
        ExecuteMsg::EscalateAppeal { appeal_id } => {
            state.escalate_appeal(&mut ctx, sender, appeal_id)?;
        }
        ExecuteMsg::AddAppealEvidence { appeal_id, uri } => {
            state.add_appeal_evidence(&mut ctx, sender, appeal_id, uri)?
        }

        ExecuteMsg::ObserveDeposit {
            chain_id,
            asset,
            external_tx_hash,
            external_block_height,
            external_sender,
            recipient,
            amount,
        } => {
            state.observe_deposit(
                &mut ctx,
                sender,
                chain_id,
                asset,
                external_tx_hash,
                external_block_height,
                external_sender,
                recipient,
                amount,
            )?;
        }
        ExecuteMsg::AttestDeposit {
            deposit_id,
            approved,
            observed_tx_hash,
            observed_amount,
        } => state.attest_deposit(
            &mut ctx,
            sender,
            deposit_id,
            approved,
            observed_tx_hash,
            observed_amount,
        )?,
        ExecuteMsg::RequestWithdrawal {
            chain_id,
            asset,
            recipient,
            amount,
        } => {
            state.request_withdrawal(&mut ctx, sender, chain_id, asset, recipient, amount)?;
        }
        ExecuteMsg::SubmitTssSignature { session_id, data } => {
            state.submit_tss_signature(&mut ctx, sender, session_id, data)?
        }
        ExecuteMsg::RefundWithdrawal { withdrawal_id } => {
            state.refund_withdrawal(&mut ctx, sender, withdrawal_id)?
        }
        ExecuteMsg::UpdateCircuitBreaker {
            enabled,
            reason,
            allow_deposit,
            allow_withdraw,
            allow_attest,
            expires_at,
        } => {
            state.assert_governance(sender)?;
            state.update_circuit_breaker(
                &mut ctx,
                sender,
                enabled,
                reason,
                allow_deposit,
                allow_withdraw,
                allow_attest,
                expires_at,
            )?;
        }
        ExecuteMsg::AddExternalChain { chain } => {
            state.assert_governance(sender)?;
            state.add_external_chain(&mut ctx, chain)?;
        }
        ExecuteMsg::AddExternalAsset { asset } => {
            state.assert_governance(sender)?;
            state.add_external_asset(&mut ctx, asset)?;
        }

        ExecuteMsg::CreatePlan {
            beneficiaries,
            inactivity_period,
            grace_period,
            claim_window,
            charity,
        } => {
            state.create_plan(
                &mut ctx,
                sender,
                beneficiaries,
                inactivity_period,
                grace_period,
                claim_window,
                charity,
            )?;
        }
        ExecuteMsg::UpdatePlan {
            plan_id,
            beneficiaries,
            inactivity_period,
            grace_period,
            claim_window,
        } => state.update_plan(
            &mut ctx,
            sender,
            plan_id,
            beneficiaries,
            inactivity_period,
            grace_period,
            claim_window,
        )?,
        ExecuteMsg::CancelPlan { plan_id } => state.cancel_plan(&mut ctx, sender, plan_id)?,
        ExecuteMsg::ClaimAssets { plan_id } => state.claim_assets(&mut ctx, sender, plan_id)?,
        ExecuteMsg::CancelTrigger { plan_id } => {
            state.cancel_trigger(&mut ctx, sender, plan_id)?
        }

        ExecuteMsg::UpdateConfig(update) => {
            state.assert_governance(sender)?;
            let mut config = state.config.clone();
            update.apply(&mut config);
            save_config(ctx.storage, &config)?;
        }
    }

    Ok(ctx.into_response())
}
