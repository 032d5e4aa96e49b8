//! Bulk writes when the storage backend fails for some entries.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::*;
use rollbook_core::attendance::{AttendanceKey, AttendanceRecord, AttendanceStatus};
use rollbook_core::error::{CoreError, CoreResult};
use rollbook_core::period::DateRange;
use rollbook_core::store::AttendanceStore;
use rollbook_core::types::{Date, DbId};
use serde_json::json;

/// Delegates to an inner store but fails every upsert for one student.
struct FailingUpserts {
    inner: Arc<dyn AttendanceStore>,
    failing_student: DbId,
}

#[async_trait]
impl AttendanceStore for FailingUpserts {
    async fn upsert_status(&self, key: AttendanceKey, status: AttendanceStatus) -> CoreResult<AttendanceRecord> {
        if key.student_id == self.failing_student {
            return Err(CoreError::Storage("connection reset by peer".into()));
        }
        self.inner.upsert_status(key, status).await
    }

    async fn delete_status(&self, key: AttendanceKey) -> CoreResult<bool> {
        self.inner.delete_status(key).await
    }

    async fn delete_day(&self, company_id: DbId, room_id: DbId, date: Date) -> CoreResult<u64> {
        self.inner.delete_day(company_id, room_id, date).await
    }

    async fn list_day(&self, company_id: DbId, room_id: DbId, date: Date) -> CoreResult<Vec<AttendanceRecord>> {
        self.inner.list_day(company_id, room_id, date).await
    }

    async fn list_range(
        &self,
        company_id: DbId,
        room_ids: &[DbId],
        range: DateRange,
    ) -> CoreResult<Vec<AttendanceRecord>> {
        self.inner.list_range(company_id, room_ids, range).await
    }

    async fn list_student_range(
        &self,
        company_id: DbId,
        student_id: DbId,
        room_ids: &[DbId],
        range: DateRange,
    ) -> CoreResult<Vec<AttendanceRecord>> {
        self.inner
            .list_student_range(company_id, student_id, room_ids, range)
            .await
    }
}

async fn app_failing_for(student_id: DbId) -> TestApp {
    build_test_app_with(|mut stores| {
        stores.attendance = Arc::new(FailingUpserts {
            inner: stores.attendance.clone(),
            failing_student: student_id,
        });
        stores
    })
    .await
}

#[tokio::test]
async fn storage_failure_fails_only_its_entry() {
    let app = app_failing_for(S2).await;
    let response = post_json(
        &app.router,
        &format!("/api/v1/rooms/{ROOM_A}/attendance/2024-01-10/bulk"),
        &app.user_token(),
        json!({
            "entries": [
                { "student_id": S1, "status": "present" },
                { "student_id": S2, "status": "absent" },
            ]
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["succeeded"], json!([S1]));
    let failed = json["data"]["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["student_id"], S2);
    assert_eq!(failed[0]["code"], "STORAGE_ERROR");
    assert!(!failed[0]["error"].as_str().unwrap().contains("connection reset"));
    assert_eq!(app.store.attendance_count().await, 1);

    let day = body_json(
        get(
            &app.router,
            &format!("/api/v1/rooms/{ROOM_A}/attendance/2024-01-10"),
            &app.user_token(),
        )
        .await,
    )
    .await;
    assert_eq!(day["data"], json!({ S1.to_string(): "present" }));
}

#[tokio::test]
async fn single_write_storage_failure_is_service_unavailable() {
    let app = app_failing_for(S1).await;
    let response = put_json(
        &app.router,
        &format!("/api/v1/rooms/{ROOM_A}/attendance/2024-01-10/{S1}"),
        &app.user_token(),
        json!({ "status": "present" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["code"], "STORAGE_ERROR");
    // The backend detail is not leaked.
    assert!(!json["error"].as_str().unwrap().contains("connection reset"));
}
