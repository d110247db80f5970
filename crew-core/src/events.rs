use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use crate::snapshot::CapabilitySnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static LISTENER_ID: AtomicU64 = AtomicU64::new(1);

fn next_listener_id() -> ListenerId {
    ListenerId(LISTENER_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreEventKind {
    Hydrated,
    Reset,
    MarkedStale,
}

/// Delivered to subscribers after every observable store change.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    Hydrated {
        version: u64,
        snapshot: Arc<CapabilitySnapshot>,
    },
    Reset {
        version: u64,
    },
    MarkedStale {
        version: u64,
    },
}

impl StoreEvent {
    pub fn kind(&self) -> StoreEventKind {
        match self {
            StoreEvent::Hydrated { .. } => StoreEventKind::Hydrated,
            StoreEvent::Reset { .. } => StoreEventKind::Reset,
            StoreEvent::MarkedStale { .. } => StoreEventKind::MarkedStale,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            StoreEvent::Hydrated { version, .. }
            | StoreEvent::Reset { version }
            | StoreEvent::MarkedStale { version } => *version,
        }
    }
}

/// Listener signature. Listeners run synchronously on the writer's thread,
/// with no store lock held.
pub type StoreListener = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventPat {
    Any,
    Exact(StoreEventKind),
}

impl EventPat {
    pub fn matches(&self, kind: StoreEventKind) -> bool {
        match self {
            EventPat::Any => true,
            EventPat::Exact(k) => *k == kind,
        }
    }
}

#[derive(Clone)]
struct ListenerEntry {
    id: ListenerId,
    pattern: EventPat,
    listener: StoreListener,
    once: bool,
}

/// Subscriber registry for the capability store.
///
/// Emission is split so the store never calls out while locked:
/// 1) snapshot matching listeners under the lock
/// 2) call them after the lock is released
/// 3) drop fired `once` listeners under the lock again
#[derive(Default)]
pub struct StoreEventHub {
    listeners: Vec<ListenerEntry>,
}

impl StoreEventHub {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn on(&mut self, pattern: EventPat, listener: StoreListener) -> ListenerId {
        self.push(pattern, listener, false)
    }

    pub fn once(&mut self, pattern: EventPat, listener: StoreListener) -> ListenerId {
        self.push(pattern, listener, true)
    }

    fn push(&mut self, pattern: EventPat, listener: StoreListener, once: bool) -> ListenerId {
        let id = next_listener_id();
        self.listeners.push(ListenerEntry {
            id,
            pattern,
            listener,
            once,
        });
        id
    }

    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|e| e.id != id);
        before != self.listeners.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn snapshot_emit(&self, kind: StoreEventKind) -> (Vec<StoreListener>, Vec<ListenerId>) {
        let mut to_call = Vec::new();
        let mut once_ids = Vec::new();

        for entry in &self.listeners {
            if entry.pattern.matches(kind) {
                to_call.push(entry.listener.clone());
                if entry.once {
                    once_ids.push(entry.id);
                }
            }
        }

        (to_call, once_ids)
    }

    pub fn finalize_once_removals(&mut self, once_ids: &[ListenerId]) {
        if once_ids.is_empty() {
            return;
        }
        self.listeners.retain(|e| !once_ids.contains(&e.id));
    }
}
