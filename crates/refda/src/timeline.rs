// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Timeline: a min-heap of scheduled events keyed by absolute time.
//!
//! Events drive deferred execution finishes (EXEC), time-based rules (TBR),
//! and state-based rule polls (SBR). Events leave the heap only when due or
//! when a shutdown drain removes the rule-driven ones.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use crate::amm::CtrlExecutor;
use crate::ari::{Ari, TimePoint};
use crate::exec::ExecItem;

/// What a due event does.
pub enum EventKind {
    /// Resume a waiting execution item with the given callback.
    Exec {
        seq_pid: u64,
        item: Arc<ExecItem>,
        callback: CtrlExecutor,
    },
    /// Run a time-based rule, identified by its object path.
    Tbr { rule: Ari },
    /// Poll a state-based rule, identified by its object path.
    Sbr { rule: Ari },
}

impl EventKind {
    pub fn is_exec(&self) -> bool {
        matches!(self, EventKind::Exec { .. })
    }
}

/// A scheduled event.
pub struct TimelineEvent {
    pub ts: TimePoint,
    pub kind: EventKind,
}

impl TimelineEvent {
    pub fn exec(ts: TimePoint, seq_pid: u64, item: Arc<ExecItem>, callback: CtrlExecutor) -> Self {
        TimelineEvent {
            ts,
            kind: EventKind::Exec {
                seq_pid,
                item,
                callback,
            },
        }
    }

    pub fn tbr(ts: TimePoint, rule: Ari) -> Self {
        TimelineEvent {
            ts,
            kind: EventKind::Tbr { rule },
        }
    }

    pub fn sbr(ts: TimePoint, rule: Ari) -> Self {
        TimelineEvent {
            ts,
            kind: EventKind::Sbr { rule },
        }
    }
}

/// Heap entry ordered by (time, insertion sequence) so same-time events
/// fire in push order.
struct HeapEntry {
    ts: TimePoint,
    seq_no: u64,
    event: TimelineEvent,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.ts == other.ts && self.seq_no == other.seq_no
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed: BinaryHeap is a max-heap, we want the earliest first
        other
            .ts
            .cmp(&self.ts)
            .then_with(|| other.seq_no.cmp(&self.seq_no))
    }
}

/// The min-heap proper. Owned exclusively by the execution worker.
#[derive(Default)]
pub struct Timeline {
    heap: BinaryHeap<HeapEntry>,
    next_seq_no: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Timeline::default()
    }

    pub fn push(&mut self, event: TimelineEvent) {
        let seq_no = self.next_seq_no;
        self.next_seq_no += 1;
        self.heap.push(HeapEntry {
            ts: event.ts,
            seq_no,
            event,
        });
    }

    /// The earliest scheduled time, if any.
    pub fn next_ts(&self) -> Option<TimePoint> {
        self.heap.peek().map(|e| e.ts)
    }

    /// Pop the earliest event if it is due at `now`.
    pub fn pop_due(&mut self, now: TimePoint) -> Option<TimelineEvent> {
        if self.heap.peek().is_some_and(|e| e.ts <= now) {
            self.heap.pop().map(|e| e.event)
        } else {
            None
        }
    }

    /// Drop all rule-driven events, keeping EXEC resumes. Used at
    /// end-of-stream so in-flight waits still finish.
    pub fn retain_exec_only(&mut self) {
        let entries: Vec<HeapEntry> = std::mem::take(&mut self.heap).into_vec();
        for entry in entries {
            if entry.event.kind.is_exec() {
                self.heap.push(entry);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_orders_by_time_then_insertion() {
        let mut tl = Timeline::new();
        tl.push(TimelineEvent::tbr(TimePoint::new(10, 0), Ari::uint(1)));
        tl.push(TimelineEvent::sbr(TimePoint::new(5, 0), Ari::uint(2)));
        tl.push(TimelineEvent::tbr(TimePoint::new(5, 0), Ari::uint(3)));

        assert_eq!(tl.next_ts(), Some(TimePoint::new(5, 0)));

        let now = TimePoint::new(20, 0);
        let first = tl.pop_due(now).expect("first due");
        match first.kind {
            EventKind::Sbr { rule } => assert_eq!(rule, Ari::uint(2)),
            _ => panic!("expected the earlier SBR event first"),
        }
        let second = tl.pop_due(now).expect("second due");
        match second.kind {
            EventKind::Tbr { rule } => assert_eq!(rule, Ari::uint(3)),
            _ => panic!("expected same-time events in insertion order"),
        }
        assert!(tl.pop_due(now).is_some());
        assert!(tl.pop_due(now).is_none());
    }

    #[test]
    fn test_pop_due_respects_now() {
        let mut tl = Timeline::new();
        tl.push(TimelineEvent::tbr(TimePoint::new(100, 0), Ari::uint(1)));
        assert!(tl.pop_due(TimePoint::new(99, 0)).is_none());
        assert!(tl.pop_due(TimePoint::new(100, 0)).is_some());
    }

    #[test]
    fn test_retain_exec_only_drops_rules() {
        let mut tl = Timeline::new();
        tl.push(TimelineEvent::tbr(TimePoint::new(1, 0), Ari::uint(1)));
        tl.push(TimelineEvent::sbr(TimePoint::new(2, 0), Ari::uint(2)));
        assert_eq!(tl.len(), 2);
        tl.retain_exec_only();
        assert!(tl.is_empty());
    }
}
