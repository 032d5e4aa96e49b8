//! Event-to-client routing.
//!
//! Frames carry no record payload. Clients re-read what they display, and
//! report watches recompute from storage.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Message;
use rollbook_core::error::CoreResult;
use rollbook_core::scope::RequestContext;
use rollbook_core::types::DbId;
use rollbook_events::ChangeEvent;
use serde_json::json;
use tokio::sync::broadcast;

use crate::engine::AttendanceEngine;
use crate::ws::{ReportWatches, WsManager};

pub struct NotificationRouter {
    engine: Arc<AttendanceEngine>,
    ws_manager: Arc<WsManager>,
    report_watches: Arc<ReportWatches>,
}

impl NotificationRouter {
    pub fn new(
        engine: Arc<AttendanceEngine>,
        ws_manager: Arc<WsManager>,
        report_watches: Arc<ReportWatches>,
    ) -> Self {
        Self {
            engine,
            ws_manager,
            report_watches,
        }
    }

    /// Run the routing loop.
    ///
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](rollbook_events::EventBus) is dropped). A lagged
    /// receiver fires every report watch since the skipped events are
    /// unknown.
    pub async fn run(self, mut receiver: broadcast::Receiver<ChangeEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                    self.report_watches.fire_all().await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Route one event: fire report watches, then push a change frame to
    /// every connection of the company allowed to see it.
    ///
    /// Visibility is resolved once per user. A lookup failure hides the
    /// event from that user only.
    async fn route_event(&self, event: &ChangeEvent) {
        let fired = self.report_watches.notify(event).await;

        let connections = self.ws_manager.company_connections(event.company_id).await;
        let message = change_message(event);
        let mut visible: HashMap<DbId, bool> = HashMap::new();
        let mut delivered = 0usize;

        for (ctx, sender) in connections {
            let allowed = match visible.get(&ctx.user_id) {
                Some(allowed) => *allowed,
                None => {
                    let allowed = match self.visible_to(&ctx, event).await {
                        Ok(allowed) => allowed,
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                user_id = ctx.user_id,
                                event_type = event.kind.event_type(),
                                "Could not resolve event visibility"
                            );
                            false
                        }
                    };
                    visible.insert(ctx.user_id, allowed);
                    allowed
                }
            };
            if allowed && sender.send(message.clone()).is_ok() {
                delivered += 1;
            }
        }

        tracing::debug!(
            event_type = event.kind.event_type(),
            company_id = event.company_id,
            delivered,
            watches_fired = fired,
            "Change event routed"
        );
    }

    /// Room events need access to the room. Student events without a room
    /// (observations) need access to one of the student's rooms.
    async fn visible_to(&self, ctx: &RequestContext, event: &ChangeEvent) -> CoreResult<bool> {
        match (event.room_id, event.student_id) {
            (Some(room_id), _) => self.engine.can_access(ctx, room_id).await,
            (None, Some(student_id)) => self.engine.can_access_student(ctx, student_id).await,
            (None, None) => Ok(true),
        }
    }
}

/// `{"type":"attendance.changed", ...}` or `{"type":"observation.changed", ...}`.
pub fn change_message(event: &ChangeEvent) -> Message {
    let kind = if event.kind.is_attendance() {
        "attendance.changed"
    } else {
        "observation.changed"
    };
    let body = json!({
        "type": kind,
        "event_type": event.kind.event_type(),
        "room_id": event.room_id,
        "date": event.date,
        "timestamp": event.timestamp,
    });
    Message::Text(body.to_string().into())
}
