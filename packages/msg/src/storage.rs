//! Helpers for dealing with platform storage.

use anyhow::Result;
use cosmwasm_std::Storage;
use cw_storage_plus::Item;
use serde::{de::DeserializeOwned, Serialize};

/// Implemented by every entity id newtype in [crate::ids].
pub trait EntityId: Serialize + DeserializeOwned + Copy {
    /// Construct from a raw `u64`.
    fn from_u64(x: u64) -> Self;
    /// The raw `u64` representation.
    fn as_u64(self) -> u64;
}

/// Allocate the next id from a monotonic counter.
///
/// Ids start at 1; an id of 0 never appears in state.
pub fn alloc_id<T: EntityId>(store: &mut dyn Storage, counter: &Item<T>) -> Result<T> {
    let next = counter.may_load(store)?.map_or(1, |last| last.as_u64() + 1);
    let id = T::from_u64(next);
    counter.save(store, &id)?;
    Ok(id)
}
