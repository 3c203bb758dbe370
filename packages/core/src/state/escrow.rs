use crate::prelude::*;
use msg::platform::escrow::{events::*, Escrow, EscrowStatus, Resolution};

const LAST_ESCROW_ID: Item<EscrowId> = Item::new(namespace::LAST_ESCROW_ID);
pub(super) const ESCROWS: Map<EscrowId, Escrow> = Map::new(namespace::ESCROWS);

impl State<'_> {
    /// Opens a dispute escrow funded by the buyer. A 0.1% cut replenishes
    /// the recovery reserve.
    pub(crate) fn open_escrow(
        &self,
        ctx: &mut StateContext,
        buyer: &Addr,
        seller: &Addr,
        amount: Uint128,
        denom: String,
    ) -> Result<EscrowId> {
        platform_ensure!(
            !amount.is_zero(),
            ErrorId::AmountTooSmall,
            ErrorDomain::Escrow,
            "escrow amount must be positive"
        );
        platform_ensure!(
            buyer != seller,
            ErrorId::InvalidReportTarget,
            ErrorDomain::Escrow,
            "cannot escrow against yourself"
        );

        let reserve_fee = amount.mul_floor(self.config.reserve_fee_rate);
        let net = amount - reserve_fee;

        self.bank
            .send_to_module(ctx.storage, buyer, module::DISPUTE, &denom, net)?;
        if !reserve_fee.is_zero() {
            self.bank
                .send_to_module(ctx.storage, buyer, module::RESERVE, &denom, reserve_fee)?;
        }

        let escrow_id = alloc_id(ctx.storage, &LAST_ESCROW_ID)?;
        let escrow = Escrow {
            escrow_id,
            buyer: buyer.clone(),
            seller: seller.clone(),
            amount: net,
            denom,
            status: EscrowStatus::Held,
            resolution: None,
            resolved_by: vec![],
            resolved_at: None,
        };
        ESCROWS.save(ctx.storage, escrow_id, &escrow)?;

        ctx.response_mut().add_event(EscrowOpenedEvent {
            escrow_id,
            amount: net,
            reserve_fee,
        });
        Ok(escrow_id)
    }

    pub(crate) fn load_escrow(&self, store: &dyn Storage, escrow_id: EscrowId) -> Result<Escrow> {
        ESCROWS.may_load(store, escrow_id)?.ok_or_else(|| {
            platform_anyhow!(
                ErrorId::EscrowNotFound,
                ErrorDomain::Escrow,
                "escrow {escrow_id} not found"
            )
        })
    }

    /// The resolution hook: pays held funds out of the dispute module.
    /// Appeals and the report pipeline both route through here. The
    /// resolver is recorded as bearing slash liability on overturn.
    pub(crate) fn resolve_escrow(
        &self,
        ctx: &mut StateContext,
        resolver: &Addr,
        escrow_id: EscrowId,
        resolution: Resolution,
    ) -> Result<()> {
        let mut escrow = self.load_escrow(ctx.storage, escrow_id)?;
        platform_ensure!(
            escrow.status == EscrowStatus::Held,
            ErrorId::EscrowAlreadyResolved,
            ErrorDomain::Escrow,
            "escrow {escrow_id} already resolved"
        );

        self.pay_resolution(ctx, &escrow, resolution)?;

        escrow.status = EscrowStatus::Resolved;
        escrow.resolution = Some(resolution);
        escrow.resolved_by = vec![resolver.clone()];
        escrow.resolved_at = Some(self.now());
        ESCROWS.save(ctx.storage, escrow_id, &escrow)?;

        ctx.response_mut().add_event(EscrowResolvedEvent {
            escrow_id,
            resolution,
        });
        Ok(())
    }

    /// Record a replacement resolution decided on appeal. The funds for
    /// the switch move through the recovery waterfall, not through here.
    pub(crate) fn record_replacement_resolution(
        &self,
        ctx: &mut StateContext,
        escrow_id: EscrowId,
        resolution: Resolution,
    ) -> Result<()> {
        let mut escrow = self.load_escrow(ctx.storage, escrow_id)?;
        escrow.resolution = Some(resolution);
        escrow.resolved_at = Some(self.now());
        ESCROWS.save(ctx.storage, escrow_id, &escrow)?;

        ctx.response_mut().add_event(EscrowResolvedEvent {
            escrow_id,
            resolution,
        });
        Ok(())
    }

    fn pay_resolution(
        &self,
        ctx: &mut StateContext,
        escrow: &Escrow,
        resolution: Resolution,
    ) -> Result<()> {
        match resolution {
            Resolution::ReleaseBuyer => self.bank.send_from_module(
                ctx.storage,
                module::DISPUTE,
                &escrow.buyer,
                &escrow.denom,
                escrow.amount,
            ),
            Resolution::ReleaseSeller | Resolution::Refund => self.bank.send_from_module(
                ctx.storage,
                module::DISPUTE,
                &escrow.seller,
                &escrow.denom,
                escrow.amount,
            ),
            Resolution::Split => {
                let seller_share = escrow.amount.checked_div(Uint128::new(2))?;
                let buyer_share = escrow.amount - seller_share;
                self.bank.send_from_module(
                    ctx.storage,
                    module::DISPUTE,
                    &escrow.buyer,
                    &escrow.denom,
                    buyer_share,
                )?;
                self.bank.send_from_module(
                    ctx.storage,
                    module::DISPUTE,
                    &escrow.seller,
                    &escrow.denom,
                    seller_share,
                )
            }
        }
    }
}
