//! Memoized statistics, invalidated by storage change notifications.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crossbeam_channel::Receiver;
use tracing::debug;
use uuid::Uuid;

use crate::storage::Change;

use super::StatsTable;

/// Statistics tables keyed by (sport, class).
///
/// Any change to any collection drops every entry: a result, sheet, or
/// roster edit can touch any table.
pub struct StatsCache {
    changes: Receiver<Change>,
    entries: HashMap<(Uuid, Uuid), StatsTable>,
}

impl StatsCache {
    /// Creates a cache fed by a storage subscription.
    pub fn new(changes: Receiver<Change>) -> Self {
        Self {
            changes,
            entries: HashMap::new(),
        }
    }

    /// Returns the cached table, computing it if missing or stale.
    ///
    /// A failed computation leaves nothing behind.
    pub fn get_or_try_compute<E>(
        &mut self,
        sport_id: Uuid,
        class_id: Uuid,
        compute: impl FnOnce() -> Result<StatsTable, E>,
    ) -> Result<&StatsTable, E> {
        let pending = self.changes.try_iter().count();
        if pending > 0 && !self.entries.is_empty() {
            debug!(changes = pending, "statistics cache invalidated");
            self.entries.clear();
        }
        match self.entries.entry((sport_id, class_id)) {
            Entry::Occupied(entry) => {
                debug!(sport = %sport_id, class = %class_id, "statistics cache hit");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(entry.insert(compute()?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;
    use std::convert::Infallible;

    use crossbeam_channel::unbounded;

    use crate::storage::{ChangeKind, Collection};

    fn empty_table() -> StatsTable {
        StatsTable {
            columns: vec![],
            rows: vec![],
        }
    }

    #[test]
    fn computes_once_until_a_change_arrives() {
        let (tx, rx) = unbounded();
        let mut cache = StatsCache::new(rx);
        let calls = Cell::new(0);
        let key = (Uuid::new_v4(), Uuid::new_v4());

        for _ in 0..3 {
            cache
                .get_or_try_compute(key.0, key.1, || {
                    calls.set(calls.get() + 1);
                    Ok::<_, Infallible>(empty_table())
                })
                .unwrap();
        }
        assert_eq!(calls.get(), 1);

        tx.send(Change {
            collection: Collection::Results,
            kind: ChangeKind::Appended,
            id: Uuid::new_v4(),
        })
        .unwrap();

        cache
            .get_or_try_compute(key.0, key.1, || {
                calls.set(calls.get() + 1);
                Ok::<_, Infallible>(empty_table())
            })
            .unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn keys_are_independent() {
        let (_tx, rx) = unbounded();
        let mut cache = StatsCache::new(rx);
        let sport = Uuid::new_v4();
        let calls = Cell::new(0);

        for class in [Uuid::new_v4(), Uuid::new_v4()] {
            cache
                .get_or_try_compute(sport, class, || {
                    calls.set(calls.get() + 1);
                    Ok::<_, Infallible>(empty_table())
                })
                .unwrap();
        }
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn failed_computation_is_not_cached() {
        let (_tx, rx) = unbounded();
        let mut cache = StatsCache::new(rx);
        let key = (Uuid::new_v4(), Uuid::new_v4());

        let err = cache
            .get_or_try_compute(key.0, key.1, || Err("database locked"))
            .unwrap_err();
        assert_eq!(err, "database locked");

        let table = cache
            .get_or_try_compute(key.0, key.1, || Ok::<_, &str>(empty_table()))
            .unwrap();
        assert!(table.rows.is_empty());
    }
}
