use std::sync::Arc;

use rollbook_events::EventBus;

use crate::config::ServerConfig;
use crate::engine::{AttendanceEngine, Stores};
use crate::ws::{ReportWatches, WsManager};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Authorization-checked access to attendance data.
    pub engine: Arc<AttendanceEngine>,
    /// Database pool when running on PostgreSQL, used by the health check.
    pub pool: Option<rollbook_db::DbPool>,
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Live report watches owned by WebSocket connections.
    pub report_watches: Arc<ReportWatches>,
    /// Bus the engine publishes change events on.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Wire the engine, event bus and WebSocket bookkeeping over `stores`.
    pub fn new(config: ServerConfig, stores: Stores, pool: Option<rollbook_db::DbPool>) -> Self {
        let event_bus = Arc::new(EventBus::default());
        let engine = Arc::new(AttendanceEngine::new(
            stores,
            Arc::clone(&event_bus),
            config.week_start,
            config.report_max_range_days,
        ));
        Self {
            engine,
            pool,
            config: Arc::new(config),
            ws_manager: Arc::new(WsManager::new()),
            report_watches: Arc::new(ReportWatches::new()),
            event_bus,
        }
    }
}
