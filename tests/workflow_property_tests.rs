//! Property tests for the flag/status correspondence invariant.
//!
//! Whatever sequence of transition attempts lands on a request, after every
//! attempt the specialized form's flag pair must agree with its ledger
//! entry, and the approval trail must stay a contiguous ascending sequence.

use std::sync::Arc;

use proptest::prelude::*;

use shipshape::workflow::mocks::RecordingAuditRecorder;
use shipshape::{
    FormDetails, FormStore, InMemoryFormStore, InMemoryLedgerStore, InMemoryTrailStore, NewForm,
    RequestKind, RequestStatus, Role, UserIdentity, WorkflowCoordinator,
};

#[derive(Debug, Clone, Copy)]
enum Op {
    Submit,
    BeginReview,
    Approve,
    Reject,
    Implement,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Submit),
        Just(Op::BeginReview),
        Just(Op::Approve),
        Just(Op::Reject),
        Just(Op::Implement),
    ]
}

fn kind_strategy() -> impl Strategy<Value = RequestKind> {
    prop_oneof![
        Just(RequestKind::Hardware),
        Just(RequestKind::Software),
        Just(RequestKind::SystemPlan),
        Just(RequestKind::SecurityReview),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn flags_and_status_correspond_after_every_attempt(
        kind in kind_strategy(),
        ops in proptest::collection::vec(op_strategy(), 1..12),
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let forms = Arc::new(InMemoryFormStore::new());
            let coordinator = WorkflowCoordinator::new(
                forms.clone(),
                Arc::new(InMemoryLedgerStore::new()),
                Arc::new(InMemoryTrailStore::new()),
                Arc::new(RecordingAuditRecorder::new()),
            );

            let requester = UserIdentity::new("u1", Role::User);
            let admin = UserIdentity::new("u2", Role::Administrator);

            let form = coordinator
                .create(
                    NewForm {
                        requester_user_id: String::new(),
                        ship_id: None,
                        purpose: "Generated request".to_string(),
                        description: "Property-test subject".to_string(),
                        details: FormDetails::empty_for(kind),
                    },
                    &requester,
                )
                .await
                .unwrap();
            let request_number = form.request_number.clone();

            for op in ops {
                // Illegal attempts are rejected atomically; only the
                // invariant afterwards matters here.
                let _ = match op {
                    Op::Submit => coordinator.submit(&request_number, &requester).await.map(|_| ()),
                    Op::BeginReview => coordinator.begin_review(&request_number, &admin).await.map(|_| ()),
                    Op::Approve => coordinator.approve(&request_number, &admin).await.map(|_| ()),
                    Op::Reject => coordinator
                        .reject(&request_number, &admin, "generated rejection reason")
                        .await
                        .map(|_| ()),
                    Op::Implement => coordinator.implement(&request_number, &admin).await.map(|_| ()),
                };

                let form = forms
                    .find_by_request_number(&request_number)
                    .await
                    .unwrap()
                    .expect("form never disappears");
                let entry = coordinator
                    .status_of(&request_number)
                    .await
                    .unwrap()
                    .expect("ledger entry exists from creation on");

                // The flag pair itself stays coherent.
                assert!(
                    !(form.is_approved && form.is_under_review),
                    "approved implies not under review"
                );

                // Quiescent correspondence with the ledger.
                if form.is_approved {
                    assert!(
                        matches!(entry.status, RequestStatus::Approved | RequestStatus::Completed),
                        "approved form vs ledger {}", entry.status
                    );
                } else if form.is_under_review {
                    assert!(
                        entry.status.is_pending(),
                        "pending form vs ledger {}", entry.status
                    );
                } else {
                    assert!(
                        matches!(entry.status, RequestStatus::Draft | RequestStatus::Rejected),
                        "draft-shaped form vs ledger {}", entry.status
                    );
                }

                // Trail stages stay contiguous from 1.
                let history = coordinator.history(&request_number).await.unwrap();
                let stages: Vec<u32> = history.iter().map(|e| e.stage).collect();
                let expected: Vec<u32> = (1..=stages.len() as u32).collect();
                assert_eq!(stages, expected, "trail stages must be gap-free");
            }
        });
    }
}
