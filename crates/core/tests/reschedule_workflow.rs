//! End-to-end tests for the reschedule negotiation workflow over mocked
//! storage: explicit client responses, stale-state races, and the deadline
//! sweeper's auto-cancel path.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use peersup_core::{NotificationService, RescheduleService};
use peersup_db::entities::notification::{self, NotificationType};
use peersup_db::entities::refund::{self, RefundStatus};
use peersup_db::entities::reschedule_request::{self, RescheduleStatus};
use peersup_db::entities::session::{self, SessionKind, SessionStatus};
use peersup_db::entities::user::{self, UserRole};
use peersup_db::repositories::{
    NotificationRepository, RescheduleRequestRepository, SessionRepository, UserRepository,
};
use peersup_common::AppError;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use std::sync::Arc;

fn client() -> user::Model {
    user::Model {
        id: "client1".to_string(),
        username: "alice".to_string(),
        username_lower: "alice".to_string(),
        token: None,
        display_name: Some("Alice".to_string()),
        avatar_url: None,
        bio: None,
        role: UserRole::Client,
        is_suspended: false,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn scheduled_session(hours_out: i64) -> session::Model {
    session::Model {
        id: "sess1".to_string(),
        client_id: "client1".to_string(),
        supporter_id: "supporter1".to_string(),
        kind: SessionKind::Video,
        status: SessionStatus::Scheduled,
        scheduled_at: (Utc::now() + Duration::hours(hours_out)).into(),
        duration_minutes: 50,
        price_cents: 4500,
        cancel_reason: None,
        cancelled_at: None,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn request_with(status: RescheduleStatus, deadline_hours: i64) -> reschedule_request::Model {
    let original = Utc::now() + Duration::hours(deadline_hours + 3);
    reschedule_request::Model {
        id: "req1".to_string(),
        session_id: "sess1".to_string(),
        supporter_id: "supporter1".to_string(),
        client_id: "client1".to_string(),
        original_scheduled_at: original.into(),
        proposed_scheduled_at: (original + Duration::hours(24)).into(),
        status,
        reason: Some("Schedule conflict".to_string()),
        response_deadline: (Utc::now() + Duration::hours(deadline_hours)).into(),
        created_at: Utc::now().into(),
        responded_at: None,
    }
}

fn stored_notification(notification_type: NotificationType) -> notification::Model {
    notification::Model {
        id: "n1".to_string(),
        recipient_id: "supporter1".to_string(),
        actor_id: Some("client1".to_string()),
        notification_type,
        session_id: Some("sess1".to_string()),
        reschedule_request_id: Some("req1".to_string()),
        body: None,
        is_read: false,
        created_at: Utc::now().into(),
    }
}

fn stored_refund() -> refund::Model {
    refund::Model {
        id: "ref1".to_string(),
        session_id: "sess1".to_string(),
        client_id: "client1".to_string(),
        amount_cents: 4500,
        status: RefundStatus::Pending,
        provider_ref: None,
        failure_reason: None,
        attempt_count: 0,
        created_at: Utc::now().into(),
        issued_at: None,
    }
}

fn exec_ok() -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: 1,
    }
}

fn workflow(
    reschedule_db: Arc<DatabaseConnection>,
    session_db: Arc<DatabaseConnection>,
    user_db: Arc<DatabaseConnection>,
    notification_db: Arc<DatabaseConnection>,
) -> RescheduleService {
    RescheduleService::new(
        RescheduleRequestRepository::new(reschedule_db),
        SessionRepository::new(session_db),
        UserRepository::new(user_db),
        NotificationService::new(NotificationRepository::new(notification_db)),
    )
}

fn empty_db() -> Arc<DatabaseConnection> {
    Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
}

#[tokio::test]
async fn accept_moves_session_and_notifies_supporter() {
    let reschedule_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[request_with(RescheduleStatus::Pending, 5)]])
            // request transition, then the session move, inside one txn
            .append_exec_results([exec_ok(), exec_ok()])
            .into_connection(),
    );
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[client()]])
            .into_connection(),
    );
    let notification_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_notification(NotificationType::RescheduleAccepted)]])
            .into_connection(),
    );

    let service = workflow(reschedule_db, empty_db(), user_db, notification_db);
    let accepted = service.accept("req1", "client1").await.unwrap();

    assert_eq!(accepted.status, RescheduleStatus::Accepted);
    assert!(accepted.responded_at.is_some());
}

#[tokio::test]
async fn decline_leaves_session_untouched() {
    let reschedule_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[request_with(RescheduleStatus::Pending, 5)]])
            .append_exec_results([exec_ok()])
            .into_connection(),
    );
    let user_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[client()]])
            .into_connection(),
    );
    let notification_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_notification(NotificationType::RescheduleDeclined)]])
            .into_connection(),
    );

    // No session_db expectations: a decline never touches the session row.
    let service = workflow(reschedule_db, empty_db(), user_db, notification_db);
    let declined = service.decline("req1", "client1").await.unwrap();

    assert_eq!(declined.status, RescheduleStatus::Declined);
    assert!(declined.responded_at.is_some());
}

#[tokio::test]
async fn accept_after_decline_is_a_stale_state_conflict() {
    let reschedule_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[request_with(RescheduleStatus::Declined, 5)]])
            .into_connection(),
    );

    let service = workflow(reschedule_db, empty_db(), empty_db(), empty_db());
    let result = service.accept("req1", "client1").await;

    match result {
        Err(AppError::Conflict(msg)) => assert!(msg.contains("no longer pending")),
        other => panic!("expected stale-state conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn sweep_auto_cancels_unanswered_request_with_refund() {
    let reschedule_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            // the sweep query, then the refund insert's RETURNING row
            .append_query_results([[request_with(RescheduleStatus::Pending, -1)]])
            .append_query_results([[stored_refund()]])
            // request transition + session cancellation in the txn
            .append_exec_results([exec_ok(), exec_ok()])
            .into_connection(),
    );
    let session_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[scheduled_session(2)]])
            .into_connection(),
    );
    let notification_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                [stored_notification(NotificationType::SessionAutoCancelled)],
                [stored_notification(NotificationType::SessionAutoCancelled)],
            ])
            .into_connection(),
    );

    let service = workflow(reschedule_db, session_db, empty_db(), notification_db);
    let settled = service.process_expired().await.unwrap();

    assert_eq!(settled, 1);
}

#[tokio::test]
async fn sweep_skips_requests_that_lost_the_race() {
    let reschedule_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[request_with(RescheduleStatus::Pending, -1)]])
            // the client's accept already committed: zero rows transition
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection(),
    );
    let session_db = Arc::new(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[scheduled_session(2)]])
            .into_connection(),
    );

    let service = workflow(reschedule_db, session_db, empty_db(), empty_db());
    let settled = service.process_expired().await.unwrap();

    assert_eq!(settled, 0);
}
