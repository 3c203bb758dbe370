//! Cache-context transactions: a write buffer layered over the KV store.
//!
//! Every handler, and every multi-step settlement inside a handler, runs
//! against a [CacheStorage]. `commit` folds the buffer into the parent;
//! dropping the buffer discards it. Buffers nest, which is how a trade
//! settlement can be voided without voiding the whole transaction.

use cosmwasm_std::{Order, Record, Storage};
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::ops::Bound;

/// A pending write: `Some` is a set, `None` is a delete.
type PendingWrite = Option<Vec<u8>>;

/// A discardable write buffer over another [Storage].
pub struct CacheStorage<'a> {
    base: &'a mut dyn Storage,
    pending: BTreeMap<Vec<u8>, PendingWrite>,
}

impl<'a> CacheStorage<'a> {
    /// Open a buffer over `base`.
    pub fn new(base: &'a mut dyn Storage) -> Self {
        CacheStorage {
            base,
            pending: BTreeMap::new(),
        }
    }

    /// Fold all pending writes into the parent store.
    pub fn commit(self) {
        for (key, write) in self.pending {
            match write {
                Some(value) => self.base.set(&key, &value),
                None => self.base.remove(&key),
            }
        }
    }

    /// Drop all pending writes. Equivalent to dropping the buffer; spelled
    /// out at call sites where the discard is the point.
    pub fn discard(self) {}
}

impl Storage for CacheStorage<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.pending.get(key) {
            Some(write) => write.clone(),
            None => self.base.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.pending.insert(key.to_vec(), Some(value.to_vec()));
    }

    fn remove(&mut self, key: &[u8]) {
        self.pending.insert(key.to_vec(), None);
    }

    fn range<'b>(
        &'b self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Box<dyn Iterator<Item = Record> + 'b> {
        let bounds = (
            start.map_or(Bound::Unbounded, |s| Bound::Included(s.to_vec())),
            end.map_or(Bound::Unbounded, |e| Bound::Excluded(e.to_vec())),
        );
        let overlay: Vec<(Vec<u8>, PendingWrite)> = match order {
            Order::Ascending => self
                .pending
                .range(bounds)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Order::Descending => self
                .pending
                .range(bounds)
                .rev()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        };
        Box::new(MergedIter {
            base: self.base.range(start, end, order).peekable(),
            overlay: overlay.into_iter().peekable(),
            order,
        })
    }
}

/// Merges the parent iterator with the overlay; overlay entries shadow the
/// parent and overlay deletes suppress parent records.
struct MergedIter<I, J>
where
    I: Iterator<Item = Record>,
    J: Iterator<Item = (Vec<u8>, PendingWrite)>,
{
    base: Peekable<I>,
    overlay: Peekable<J>,
    order: Order,
}

impl<I, J> Iterator for MergedIter<I, J>
where
    I: Iterator<Item = Record>,
    J: Iterator<Item = (Vec<u8>, PendingWrite)>,
{
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        loop {
            let take_overlay = match (self.base.peek(), self.overlay.peek()) {
                (None, None) => return None,
                (Some(_), None) => false,
                (None, Some(_)) => true,
                (Some((bk, _)), Some((ok, _))) => match self.order {
                    Order::Ascending => ok <= bk,
                    Order::Descending => ok >= bk,
                },
            };

            if take_overlay {
                let (key, write) = self.overlay.next().expect("peeked overlay entry");
                // drop the shadowed parent record, if any
                if self.base.peek().is_some_and(|(bk, _)| *bk == key) {
                    self.base.next();
                }
                match write {
                    Some(value) => return Some((key, value)),
                    None => continue,
                }
            } else {
                return self.base.next();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::MemoryStorage;

    fn collect(store: &dyn Storage, order: Order) -> Vec<(Vec<u8>, Vec<u8>)> {
        store.range(None, None, order).collect()
    }

    #[test]
    fn discard_leaves_base_untouched() {
        let mut base = MemoryStorage::new();
        base.set(b"a", b"1");

        let mut cache = CacheStorage::new(&mut base);
        cache.set(b"a", b"2");
        cache.set(b"b", b"3");
        cache.discard();

        assert_eq!(base.get(b"a"), Some(b"1".to_vec()));
        assert_eq!(base.get(b"b"), None);
    }

    #[test]
    fn commit_folds_sets_and_removes() {
        let mut base = MemoryStorage::new();
        base.set(b"a", b"1");
        base.set(b"b", b"2");

        let mut cache = CacheStorage::new(&mut base);
        cache.set(b"a", b"9");
        cache.remove(b"b");
        cache.set(b"c", b"3");
        cache.commit();

        assert_eq!(base.get(b"a"), Some(b"9".to_vec()));
        assert_eq!(base.get(b"b"), None);
        assert_eq!(base.get(b"c"), Some(b"3".to_vec()));
    }

    #[test]
    fn range_merges_overlay_over_base() {
        let mut base = MemoryStorage::new();
        base.set(b"a", b"1");
        base.set(b"c", b"3");
        base.set(b"e", b"5");

        let mut cache = CacheStorage::new(&mut base);
        cache.set(b"b", b"2");
        cache.set(b"c", b"33");
        cache.remove(b"e");

        let asc = collect(&cache, Order::Ascending);
        assert_eq!(
            asc,
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec()),
                (b"c".to_vec(), b"33".to_vec()),
            ]
        );

        let desc = collect(&cache, Order::Descending);
        assert_eq!(desc.first().unwrap().0, b"c".to_vec());
        assert_eq!(desc.len(), 3);
    }

    #[test]
    fn nested_caches_commit_inward() {
        let mut base = MemoryStorage::new();
        let mut outer = CacheStorage::new(&mut base);
        outer.set(b"a", b"1");

        let mut inner = CacheStorage::new(&mut outer);
        inner.set(b"b", b"2");
        inner.commit();

        assert_eq!(outer.get(b"b"), Some(b"2".to_vec()));
        outer.commit();
        assert_eq!(base.get(b"a"), Some(b"1".to_vec()));
        assert_eq!(base.get(b"b"), Some(b"2".to_vec()));
    }
}
