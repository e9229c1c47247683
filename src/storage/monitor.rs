//! Live-stream bookkeeping for a region
//!
//! Every linked stream opened against a region registers here so that
//! closing the region force-closes all of them.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Weak,
    },
};

use parking_lot::Mutex;

/// Close flag shared between a stream and the monitor of its region
#[derive(Debug)]
pub(crate) struct StreamState {
    id: u64,
    closed: AtomicBool,
}

impl StreamState {
    pub(crate) fn new() -> Arc<Self> {
        static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);
        Arc::new(Self {
            id: NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed),
            closed: AtomicBool::new(false),
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Mark closed; true only for the call that performed the transition
    pub(crate) fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }
}

/// Concurrent set of linked streams attached to one region
#[derive(Debug, Default)]
pub(crate) struct StreamMonitor {
    streams: Mutex<HashMap<u64, Weak<StreamState>>>,
}

impl StreamMonitor {
    pub(crate) fn register(&self, state: &Arc<StreamState>) {
        self.streams.lock().insert(state.id(), Arc::downgrade(state));
    }

    pub(crate) fn deregister(&self, id: u64) {
        self.streams.lock().remove(&id);
    }

    /// Force-close every registered stream, returning how many were closed
    pub(crate) fn close_all(&self) -> usize {
        // Take the set first so streams deregistering themselves never
        // contend with the broadcast below.
        let snapshot = std::mem::take(&mut *self.streams.lock());
        snapshot
            .into_values()
            .filter_map(|weak| weak.upgrade())
            .filter(|state| state.mark_closed())
            .count()
    }

    /// Registered streams that are still alive
    pub(crate) fn len(&self) -> usize {
        self.streams
            .lock()
            .values()
            .filter(|weak| weak.upgrade().map_or(false, |s| !s.is_closed()))
            .count()
    }
}
