//! Concurrency tests for stage numbering and per-request serialization.
//!
//! Stage numbers must stay a contiguous ascending sequence however many
//! writers pile onto one ledger entry, and two simultaneous decisions on
//! the same request number must never both succeed.

use std::sync::Arc;

use futures::future::join_all;
use uuid::Uuid;

use shipshape::workflow::mocks::RecordingAuditRecorder;
use shipshape::{
    FormDetails, InMemoryFormStore, InMemoryLedgerStore, InMemoryTrailStore, NewForm,
    RequestKind, RequestStatus, Role, TrailAction, TrailStore, UserIdentity,
    WorkflowCoordinator,
};

#[tokio::test]
async fn concurrent_appends_produce_contiguous_stages() {
    let store = Arc::new(InMemoryTrailStore::new());
    let entry_id = Uuid::new_v4();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .append(entry_id, TrailAction::Submit, &format!("u{i}"), None)
                    .await
            })
        })
        .collect();

    for result in join_all(tasks).await {
        result.expect("task should not panic").expect("append should succeed");
    }

    let history = store.history(entry_id).await.unwrap();
    let stages: Vec<u32> = history.iter().map(|e| e.stage).collect();
    assert_eq!(stages, (1..=16).collect::<Vec<u32>>());
}

#[tokio::test]
async fn simultaneous_approvals_cannot_both_succeed() {
    let coordinator = Arc::new(WorkflowCoordinator::new(
        Arc::new(InMemoryFormStore::new()),
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(InMemoryTrailStore::new()),
        Arc::new(RecordingAuditRecorder::new()),
    ));

    let requester = UserIdentity::new("u1", Role::User);
    let form = coordinator
        .create(
            NewForm {
                requester_user_id: String::new(),
                ship_id: None,
                purpose: "Patch nav software".to_string(),
                description: "Apply vendor hotfix".to_string(),
                details: FormDetails::empty_for(RequestKind::Software),
            },
            &requester,
        )
        .await
        .unwrap();
    coordinator.submit(&form.request_number, &requester).await.unwrap();

    let tasks: Vec<_> = ["u2", "u3"]
        .into_iter()
        .map(|admin_id| {
            let coordinator = coordinator.clone();
            let request_number = form.request_number.clone();
            let admin = UserIdentity::new(admin_id, Role::Administrator);
            tokio::spawn(async move { coordinator.approve(&request_number, &admin).await })
        })
        .collect();

    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.expect("task should not panic"))
        .collect();

    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one concurrent approval may win");

    // One Submit plus exactly one Approve, no double-append.
    let history = coordinator.history(&form.request_number).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].action, TrailAction::Approve);
    assert_eq!(
        coordinator
            .status_of(&form.request_number)
            .await
            .unwrap()
            .unwrap()
            .status,
        RequestStatus::Approved
    );
}

#[tokio::test]
async fn distinct_requests_proceed_independently() {
    let coordinator = Arc::new(WorkflowCoordinator::new(
        Arc::new(InMemoryFormStore::new()),
        Arc::new(InMemoryLedgerStore::new()),
        Arc::new(InMemoryTrailStore::new()),
        Arc::new(RecordingAuditRecorder::new()),
    ));

    let requester = UserIdentity::new("u1", Role::User);
    let mut numbers = Vec::new();
    for _ in 0..4 {
        let form = coordinator
            .create(
                NewForm {
                    requester_user_id: String::new(),
                    ship_id: None,
                    purpose: "Routine change".to_string(),
                    description: "One of several parallel requests".to_string(),
                    details: FormDetails::empty_for(RequestKind::Hardware),
                },
                &requester,
            )
            .await
            .unwrap();
        numbers.push(form.request_number);
    }

    let tasks: Vec<_> = numbers
        .iter()
        .cloned()
        .map(|request_number| {
            let coordinator = coordinator.clone();
            let requester = requester.clone();
            tokio::spawn(async move { coordinator.submit(&request_number, &requester).await })
        })
        .collect();

    for result in join_all(tasks).await {
        result.expect("task should not panic").expect("submit should succeed");
    }

    for request_number in &numbers {
        assert_eq!(
            coordinator.status_of(request_number).await.unwrap().unwrap().status,
            RequestStatus::Submitted
        );
        assert_eq!(coordinator.history(request_number).await.unwrap().len(), 1);
    }
}
