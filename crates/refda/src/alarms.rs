// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Alarm bookkeeping: entries keyed by `(resource, category)` ARI pair with
//! bounded severity history, manager acknowledgement state, and bulk
//! purge/compress operations.

use std::collections::VecDeque;

use dashmap::DashMap;

use crate::ari::{Ari, TimePoint};
use crate::config;

/// Index key. The category may be the null literal for uncategorized
/// alarms; ARI equality and hashing are structural so the pair is stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlarmKey {
    pub resource: Ari,
    pub category: Ari,
}

/// Manager-side acknowledgement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MgrState {
    #[default]
    None,
    Ack,
}

/// One severity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub severity: u64,
    pub at: TimePoint,
}

/// One alarm entry.
#[derive(Debug, Clone)]
pub struct AlarmEntry {
    pub resource: Ari,
    pub category: Ari,
    pub severity: u64,
    pub created_at: TimePoint,
    pub updated_at: TimePoint,
    /// Append-only on severity change, bounded by the configured maximum.
    pub history: VecDeque<HistoryEntry>,
    pub mgr_state: MgrState,
    pub mgr_ident: Ari,
    pub mgr_time: Option<TimePoint>,
}

/// The alarm table with its O(1) index.
#[derive(Debug, Default)]
pub struct AlarmTable {
    index: DashMap<AlarmKey, AlarmEntry>,
}

impl AlarmTable {
    pub fn new() -> AlarmTable {
        AlarmTable::default()
    }

    /// Create or update the alarm for `(resource, category)`. The history
    /// grows only when the severity actually changes.
    pub fn set_refs(&self, resource: Ari, category: Ari, severity: u64) {
        let now = TimePoint::now();
        let key = AlarmKey {
            resource: resource.clone(),
            category: category.clone(),
        };
        let mut entry = self.index.entry(key).or_insert_with(|| AlarmEntry {
            resource,
            category,
            severity,
            created_at: now,
            updated_at: now,
            history: VecDeque::new(),
            mgr_state: MgrState::None,
            mgr_ident: Ari::undefined(),
            mgr_time: None,
        });

        let changed = entry.history.back().map(|h| h.severity) != Some(severity);
        entry.severity = severity;
        entry.updated_at = now;
        if changed {
            if entry.history.len() >= config::ALARM_HISTORY_MAX {
                entry.history.pop_front();
            }
            entry.history.push_back(HistoryEntry { severity, at: now });
        }
    }

    /// Record a manager acknowledgement. Returns whether the entry exists.
    pub fn ack(&self, resource: &Ari, category: &Ari, mgr_ident: Ari) -> bool {
        let key = AlarmKey {
            resource: resource.clone(),
            category: category.clone(),
        };
        match self.index.get_mut(&key) {
            Some(mut entry) => {
                entry.mgr_state = MgrState::Ack;
                entry.mgr_ident = mgr_ident;
                entry.mgr_time = Some(TimePoint::now());
                true
            }
            None => false,
        }
    }

    /// Remove one entry. Returns whether it existed.
    pub fn remove(&self, resource: &Ari, category: &Ari) -> bool {
        let key = AlarmKey {
            resource: resource.clone(),
            category: category.clone(),
        };
        self.index.remove(&key).is_some()
    }

    /// Remove entries matching the filter. Returns the removed count.
    pub fn purge(&self, filter: impl Fn(&AlarmEntry) -> bool) -> usize {
        let before = self.index.len();
        self.index.retain(|_, entry| !filter(entry));
        before - self.index.len()
    }

    /// Collapse the history of matching entries to the most recent entry.
    /// Returns the count of compressed entries.
    pub fn compress(&self, filter: impl Fn(&AlarmEntry) -> bool) -> usize {
        let mut count = 0;
        for mut kv in self.index.iter_mut() {
            if filter(kv.value()) && kv.history.len() > 1 {
                let last = kv.history.pop_back();
                kv.history.clear();
                if let Some(last) = last {
                    kv.history.push_back(last);
                }
                count += 1;
            } else if filter(kv.value()) {
                count += 1;
            }
        }
        count
    }

    /// Snapshot of all entries, ordered by key for stable listings.
    pub fn entries(&self) -> Vec<AlarmEntry> {
        let mut out: Vec<AlarmEntry> = self.index.iter().map(|kv| kv.value().clone()).collect();
        out.sort_by(|a, b| {
            (&a.resource, &a.category).cmp(&(&b.resource, &b.category))
        });
        out
    }

    pub fn get(&self, resource: &Ari, category: &Ari) -> Option<AlarmEntry> {
        let key = AlarmKey {
            resource: resource.clone(),
            category: category.clone(),
        };
        self.index.get(&key).map(|kv| kv.value().clone())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ari::{ObjRef, ObjType};

    fn res(n: i64) -> Ari {
        Ari::objref(ObjRef::with_enums(65535, 10, ObjType::Ident, n))
    }

    fn cat(n: i64) -> Ari {
        Ari::objref(ObjRef::with_enums(65535, 10, ObjType::Ident, 100 + n))
    }

    #[test]
    fn test_set_refs_twice_grows_history_once_per_change() {
        let table = AlarmTable::new();
        table.set_refs(res(1), cat(1), 1);
        table.set_refs(res(1), cat(1), 2);
        let entry = table.get(&res(1), &cat(1)).expect("entry");
        assert_eq!(entry.severity, 2);
        assert_eq!(entry.history.len(), 2);

        // same severity again does not grow the history
        table.set_refs(res(1), cat(1), 2);
        let entry = table.get(&res(1), &cat(1)).expect("entry");
        assert_eq!(entry.history.len(), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_null_category_is_a_valid_key() {
        let table = AlarmTable::new();
        table.set_refs(res(1), Ari::null(), 3);
        table.set_refs(res(1), cat(1), 4);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&res(1), &Ari::null()).map(|e| e.severity), Some(3));
    }

    #[test]
    fn test_purge_by_severity() {
        let table = AlarmTable::new();
        table.set_refs(res(1), cat(1), 2);
        table.set_refs(res(2), cat(1), 3);
        table.set_refs(res(3), cat(1), 2);
        let removed = table.purge(|e| e.severity == 2);
        assert_eq!(removed, 2);
        assert_eq!(table.len(), 1);
        assert!(table.get(&res(2), &cat(1)).is_some());
    }

    #[test]
    fn test_compress_collapses_history() {
        let table = AlarmTable::new();
        table.set_refs(res(1), cat(1), 1);
        table.set_refs(res(1), cat(1), 2);
        table.set_refs(res(1), cat(1), 3);
        assert_eq!(table.get(&res(1), &cat(1)).expect("entry").history.len(), 3);

        let touched = table.compress(|_| true);
        assert_eq!(touched, 1);
        let entry = table.get(&res(1), &cat(1)).expect("entry");
        assert_eq!(entry.history.len(), 1);
        assert_eq!(entry.history.back().map(|h| h.severity), Some(3));
    }

    #[test]
    fn test_ack_records_manager() {
        let table = AlarmTable::new();
        table.set_refs(res(1), cat(1), 1);
        assert!(table.ack(&res(1), &cat(1), Ari::text("mgr://a")));
        let entry = table.get(&res(1), &cat(1)).expect("entry");
        assert_eq!(entry.mgr_state, MgrState::Ack);
        assert_eq!(entry.mgr_ident, Ari::text("mgr://a"));
        assert!(entry.mgr_time.is_some());
        assert!(!table.ack(&res(9), &cat(1), Ari::text("mgr://a")));
    }

    #[test]
    fn test_history_is_bounded() {
        let table = AlarmTable::new();
        for sev in 0..(config::ALARM_HISTORY_MAX as u64 + 5) {
            table.set_refs(res(1), cat(1), sev);
        }
        let entry = table.get(&res(1), &cat(1)).expect("entry");
        assert_eq!(entry.history.len(), config::ALARM_HISTORY_MAX);
    }
}
