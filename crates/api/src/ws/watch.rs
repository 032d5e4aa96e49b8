//! Live report watches.
//!
//! A WebSocket client may hold one report watch. The report is pushed once
//! when the watch starts and again after every matching attendance change.
//! Recomputation runs through [`run_latest_wins`], so a burst of edits
//! yields at most one in-flight computation and stale reports are dropped.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Message;
use rollbook_core::error::{CoreError, CoreResult};
use rollbook_core::period::DateRange;
use rollbook_core::scope::{RequestContext, RoomFilter};
use rollbook_events::{run_latest_wins, ChangeEvent, ChangeFilter, RecomputeTrigger};
use serde_json::json;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::engine::{AttendanceEngine, ReportSummary};
use crate::ws::manager::WsSender;

struct ReportWatch {
    filter: ChangeFilter,
    trigger: RecomputeTrigger,
    cancel: CancellationToken,
}

/// Active report watches keyed by connection id.
#[derive(Default)]
pub struct ReportWatches {
    watches: RwLock<HashMap<String, ReportWatch>>,
}

impl ReportWatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or replace) the watch of `conn_id`.
    ///
    /// The scope is authorized up front; an unauthorized room fails here
    /// instead of producing a stream of error pushes.
    pub async fn start(
        &self,
        conn_id: &str,
        ctx: RequestContext,
        room_filter: RoomFilter,
        range: DateRange,
        engine: Arc<AttendanceEngine>,
        sender: WsSender,
    ) -> CoreResult<()> {
        let room_ids = engine.authorized_rooms(&ctx).await?.rooms_for(room_filter)?;
        let filter = ChangeFilter::company(ctx.company_id)
            .rooms(room_ids)
            .within(range);

        let (trigger, rx) = RecomputeTrigger::new();
        let cancel = CancellationToken::new();

        tokio::spawn(run_latest_wins(
            rx,
            cancel.clone(),
            move |generation| {
                let engine = Arc::clone(&engine);
                async move {
                    let result = engine.report_summary(&ctx, room_filter, range).await;
                    (generation, result)
                }
            },
            move |(generation, result)| sender.send(report_message(generation, result)).is_ok(),
        ));
        trigger.fire();

        let previous = self.watches.write().await.insert(
            conn_id.to_string(),
            ReportWatch {
                filter,
                trigger,
                cancel,
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
        tracing::debug!(conn_id, from = %range.from, to = %range.to, "Report watch started");
        Ok(())
    }

    /// Stop the watch of `conn_id`, if any. Returns whether one existed.
    pub async fn stop(&self, conn_id: &str) -> bool {
        match self.watches.write().await.remove(conn_id) {
            Some(watch) => {
                watch.cancel.cancel();
                tracing::debug!(conn_id, "Report watch stopped");
                true
            }
            None => false,
        }
    }

    /// Fire every watch whose scope the event may affect. Returns how many fired.
    pub async fn notify(&self, event: &ChangeEvent) -> usize {
        if !event.kind.is_attendance() {
            return 0;
        }
        let watches = self.watches.read().await;
        let mut fired = 0;
        for watch in watches.values() {
            if watch.filter.matches(event) {
                watch.trigger.fire();
                fired += 1;
            }
        }
        fired
    }

    /// Fire every watch, used when change events may have been missed.
    pub async fn fire_all(&self) {
        for watch in self.watches.read().await.values() {
            watch.trigger.fire();
        }
    }

    pub async fn watch_count(&self) -> usize {
        self.watches.read().await.len()
    }

    /// Cancel every watch.
    pub async fn shutdown_all(&self) {
        let mut watches = self.watches.write().await;
        for watch in watches.values() {
            watch.cancel.cancel();
        }
        watches.clear();
    }
}

fn report_message(generation: u64, result: CoreResult<ReportSummary>) -> Message {
    let body = match result {
        Ok(report) => json!({
            "type": "report",
            "generation": generation,
            "data": report,
        }),
        Err(e) => error_body(&e),
    };
    Message::Text(body.to_string().into())
}

/// `{"type":"error","code":..,"error":..}` frame for a failed client request.
pub(crate) fn error_message(e: &CoreError) -> Message {
    Message::Text(error_body(e).to_string().into())
}

fn error_body(e: &CoreError) -> serde_json::Value {
    if matches!(e, CoreError::Storage(_) | CoreError::Internal(_)) {
        tracing::error!(error = %e, "Report push failed");
    }
    json!({
        "type": "error",
        "code": e.code(),
        "error": e.client_message(),
    })
}
