//! Attendance engine.
//!
//! [`AttendanceEngine`] is the only path from HTTP and WebSocket handlers to
//! storage. Every operation takes an explicit [`RequestContext`], resolves
//! the caller's authorized rooms, talks to the [`Stores`], and publishes a
//! [`ChangeEvent`] after each successful write.
//!
//! [`RequestContext`]: rollbook_core::scope::RequestContext
//! [`ChangeEvent`]: rollbook_events::ChangeEvent

pub mod attendance;
pub mod report;

use std::sync::Arc;

use rollbook_core::memory::MemoryStore;
use rollbook_core::store::{AttendanceStore, CatalogStore, ObservationStore};
use rollbook_db::PgStore;

pub use attendance::{AttendanceEngine, BulkEntry, RosterEntry};
pub use report::ReportSummary;

/// Storage handles the engine runs over.
#[derive(Clone)]
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub attendance: Arc<dyn AttendanceStore>,
    pub observations: Arc<dyn ObservationStore>,
}

impl Stores {
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            catalog: store.clone(),
            attendance: store.clone(),
            observations: store,
        }
    }

    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self {
            catalog: store.clone(),
            attendance: store.clone(),
            observations: store,
        }
    }
}
