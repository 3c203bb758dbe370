//! Dispute escrows and their resolution hook.
//!
//! WrongResolution reports and overturned appeals both operate on a resolved
//! escrow; the resolution hook is the single place funds leave the dispute
//! module account.

use crate::ids::EscrowId;
use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Timestamp, Uint128};
use std::fmt;

/// How a dispute escrow was (or should be) settled.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum Resolution {
    /// Full amount to the buyer
    ReleaseBuyer,
    /// Full amount to the seller
    ReleaseSeller,
    /// Full amount back to the seller
    Refund,
    /// Half each; the odd unit goes to the buyer
    Split,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Resolution::ReleaseBuyer => "release_buyer",
            Resolution::ReleaseSeller => "release_seller",
            Resolution::Refund => "refund",
            Resolution::Split => "split",
        };
        write!(f, "{s}")
    }
}

/// Escrow lifecycle.
#[cw_serde]
#[derive(Copy, Eq)]
pub enum EscrowStatus {
    /// Funds held by the dispute module
    Held,
    /// Resolution executed
    Resolved,
}

/// A dispute escrow.
#[cw_serde]
pub struct Escrow {
    /// Unique escrow id
    pub escrow_id: EscrowId,
    /// Party that funded the escrow
    pub buyer: Addr,
    /// Counterparty
    pub seller: Addr,
    /// Escrowed amount, net of the reserve fee
    pub amount: Uint128,
    /// Denom of the escrowed amount
    pub denom: String,
    /// Lifecycle status
    pub status: EscrowStatus,
    /// Resolution applied, if any
    pub resolution: Option<Resolution>,
    /// Moderators whose votes carried the resolution; they bear the slash
    /// liability if it is later overturned
    pub resolved_by: Vec<Addr>,
    /// When the resolution executed
    pub resolved_at: Option<Timestamp>,
}

impl Escrow {
    /// Whether the given address took part in this escrow.
    pub fn is_participant(&self, addr: &Addr) -> bool {
        &self.buyer == addr || &self.seller == addr
    }

    /// The party a resolution paid, used to determine the WrongResolution
    /// counterparty. Split has no single counterparty.
    pub fn paid_party(&self, resolution: Resolution) -> Option<&Addr> {
        match resolution {
            Resolution::ReleaseBuyer => Some(&self.buyer),
            Resolution::ReleaseSeller | Resolution::Refund => Some(&self.seller),
            Resolution::Split => None,
        }
    }
}

/// Events
pub mod events {
    use super::*;
    use crate::constants::event_key;
    use cosmwasm_std::Event;

    /// An escrow was opened.
    pub struct EscrowOpenedEvent {
        /// Unique escrow id
        pub escrow_id: EscrowId,
        /// Escrowed amount net of the reserve fee
        pub amount: Uint128,
        /// Reserve fee retained
        pub reserve_fee: Uint128,
    }

    impl From<EscrowOpenedEvent> for Event {
        fn from(src: EscrowOpenedEvent) -> Self {
            Event::new("escrow-opened")
                .add_attribute(event_key::ESCROW_ID, src.escrow_id.to_string())
                .add_attribute(event_key::AMOUNT, src.amount.to_string())
                .add_attribute("reserve-fee", src.reserve_fee.to_string())
        }
    }

    /// An escrow resolution executed.
    pub struct EscrowResolvedEvent {
        /// Unique escrow id
        pub escrow_id: EscrowId,
        /// Resolution applied
        pub resolution: Resolution,
    }

    impl From<EscrowResolvedEvent> for Event {
        fn from(src: EscrowResolvedEvent) -> Self {
            Event::new("escrow-resolved")
                .add_attribute(event_key::ESCROW_ID, src.escrow_id.to_string())
                .add_attribute(event_key::RESOLUTION, src.resolution.to_string())
        }
    }
}
