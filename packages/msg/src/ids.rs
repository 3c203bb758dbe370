//! Monotonic numeric identifiers for every entity family.
//!
//! Each id is a newtype over [Uint64] usable directly as a storage key.
//! Ids are allocated from per-family counters and are never 0.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{StdResult, Uint64};
use cw_storage_plus::{IntKey, Key, KeyDeserialize, Prefixer, PrimaryKey};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! entity_id {
    ($(#[doc = $doc:expr])+ $name:ident) => {
        $(#[doc = $doc])+
        #[cw_serde]
        #[derive(Copy, PartialOrd, Ord, Eq)]
        pub struct $name(Uint64);

        impl $name {
            /// Construct a new value from a [u64].
            pub fn new(x: u64) -> Self {
                $name(x.into())
            }

            /// Get the underlying `u64` representation.
            pub fn u64(self) -> u64 {
                self.0.u64()
            }

            /// The id following this one.
            pub fn next(self) -> Self {
                $name((self.0.u64() + 1).into())
            }
        }

        impl<'a> PrimaryKey<'a> for $name {
            type Prefix = ();
            type SubPrefix = ();
            type Suffix = Self;
            type SuperSuffix = Self;

            fn key(&self) -> Vec<Key> {
                vec![Key::Val64(self.0.u64().to_cw_bytes())]
            }
        }

        impl<'a> Prefixer<'a> for $name {
            fn prefix(&self) -> Vec<Key> {
                vec![Key::Val64(self.0.u64().to_cw_bytes())]
            }
        }

        impl KeyDeserialize for $name {
            type Output = $name;
            const KEY_ELEMS: u16 = 1;

            #[inline(always)]
            fn from_vec(value: Vec<u8>) -> StdResult<Self::Output> {
                u64::from_vec(value).map(|x| $name(Uint64::new(x)))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;
            fn from_str(src: &str) -> Result<Self, ParseIntError> {
                src.parse().map(|x| $name(Uint64::new(x)))
            }
        }

        impl crate::storage::EntityId for $name {
            fn from_u64(x: u64) -> Self {
                $name::new(x)
            }

            fn as_u64(self) -> u64 {
                self.u64()
            }
        }
    };
}

entity_id! {
    /// A unique numeric ID for each order in the dex.
    OrderId
}

entity_id! {
    /// A unique numeric ID for each executed trade.
    TradeId
}

entity_id! {
    /// A unique numeric ID for each dispute escrow.
    EscrowId
}

entity_id! {
    /// A unique numeric ID for each report.
    ReportId
}

entity_id! {
    /// A unique numeric ID for each appeal.
    AppealId
}

entity_id! {
    /// A unique numeric ID for each bridge deposit.
    DepositId
}

entity_id! {
    /// A unique numeric ID for each bridge withdrawal.
    WithdrawalId
}

entity_id! {
    /// A unique numeric ID for each threshold-signature session.
    SessionId
}

entity_id! {
    /// A unique numeric ID for each inheritance plan.
    PlanId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrip_and_order() {
        let a = OrderId::new(7);
        assert_eq!(a.to_string(), "7");
        assert_eq!("7".parse::<OrderId>().unwrap(), a);
        assert!(OrderId::new(8) > a);
        assert_eq!(a.next(), OrderId::new(8));
    }
}
