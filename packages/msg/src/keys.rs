//! Storage-key encodings where lexicographic order must match numeric order.

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Decimal, StdResult, Uint128};
use cw_storage_plus::{IntKey, Key, KeyDeserialize, Prefixer, PrimaryKey};

/// A price encoded as a big-endian `u128` storage key.
///
/// Ask-side books store the raw atomics so ascending iteration walks the
/// lowest ask first. Bid-side books store the complement so ascending
/// iteration walks the highest bid first while order ids within a price
/// level remain time-ordered.
#[cw_serde]
#[derive(Copy, PartialOrd, Ord, Eq)]
pub struct PriceKey(u128);

impl PriceKey {
    /// Key under which a price sorts ascending (ask books, stop indexes).
    pub fn ascending(price: Decimal) -> Self {
        PriceKey(price.atomics().u128())
    }

    /// Key under which a price sorts descending (bid books).
    pub fn descending(price: Decimal) -> Self {
        PriceKey(u128::MAX - price.atomics().u128())
    }

    /// Recover the price from an ascending key.
    pub fn price_ascending(self) -> Decimal {
        Decimal::new(Uint128::new(self.0))
    }

    /// Recover the price from a descending key.
    pub fn price_descending(self) -> Decimal {
        Decimal::new(Uint128::new(u128::MAX - self.0))
    }
}

impl<'a> PrimaryKey<'a> for PriceKey {
    type Prefix = ();
    type SubPrefix = ();
    type Suffix = Self;
    type SuperSuffix = Self;

    fn key(&self) -> Vec<Key> {
        vec![Key::Val128(self.0.to_cw_bytes())]
    }
}

impl<'a> Prefixer<'a> for PriceKey {
    fn prefix(&self) -> Vec<Key> {
        vec![Key::Val128(self.0.to_cw_bytes())]
    }
}

impl KeyDeserialize for PriceKey {
    type Output = PriceKey;
    const KEY_ELEMS: u16 = 1;

    #[inline(always)]
    fn from_vec(value: Vec<u8>) -> StdResult<Self::Output> {
        u128::from_vec(value).map(PriceKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn ascending_orders_numerically() {
        let lo = PriceKey::ascending(dec("149.99"));
        let hi = PriceKey::ascending(dec("150"));
        assert!(lo < hi);
        assert_eq!(lo.price_ascending(), dec("149.99"));
    }

    #[test]
    fn descending_inverts() {
        let lo = PriceKey::descending(dec("149.99"));
        let hi = PriceKey::descending(dec("150"));
        assert!(hi < lo);
        assert_eq!(hi.price_descending(), dec("150"));
    }

    proptest! {
        #[test]
        fn key_order_matches_price_order(a in 0u128..u128::MAX / 2, b in 0u128..u128::MAX / 2) {
            let pa = Decimal::new(Uint128::new(a));
            let pb = Decimal::new(Uint128::new(b));
            prop_assert_eq!(
                PriceKey::ascending(pa) < PriceKey::ascending(pb),
                a < b
            );
            prop_assert_eq!(
                PriceKey::descending(pa) < PriceKey::descending(pb),
                a > b
            );
        }
    }
}
