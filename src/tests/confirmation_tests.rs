//! Finality Tracking Tests
//!
//! The Confirming phase: fixed-interval polling, terminal error statuses,
//! the confirmation timeout and the caller's overall deadline. All tests run
//! on the paused tokio clock, so the 2s poll sleeps are virtual.

#[cfg(test)]
mod confirmation_tests {
    use std::time::Duration;
    use tokio::time::Instant;

    use crate::errors::{ErrorKind, TraderError};
    use crate::ledger::{ConfirmationLevel, SignatureState};
    use crate::tests::test_helpers::harness;
    use crate::test_utils::status_at;
    use crate::tx::TransactionOutcome;

    #[tokio::test(start_paused = true)]
    async fn test_tracks_until_finalized() {
        let h = harness();
        h.ledger.push_status(None);
        h.ledger.push_status(status_at(ConfirmationLevel::Confirmed));
        h.ledger.push_status(status_at(ConfirmationLevel::Finalized));
        let started = Instant::now();

        let outcome = h.manager.buy(h.tracked(1.0)).await.unwrap();

        match outcome {
            TransactionOutcome::Executed {
                signature,
                expected_output,
                record: Some(record),
            } => {
                assert_eq!(signature, h.ledger.signature());
                assert_eq!(record.signature, signature);
                assert_eq!(expected_output, 100.0);
            }
            other => panic!("expected finalized execution, got {other:?}"),
        }
        assert_eq!(h.ledger.status_polls(), 3);
        assert_eq!(h.ledger.transaction_fetches(), 1);
        // Two sleeps between three polls
        assert!(started.elapsed() >= Duration::from_secs(4));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_fails_immediately() {
        let h = harness();
        h.ledger.push_status(status_at(ConfirmationLevel::Processed));
        h.ledger.push_status(Some(SignatureState {
            err: Some("InstructionError(3, Custom(6002))".to_string()),
            confirmation: Some(ConfirmationLevel::Confirmed),
        }));

        let err = h.manager.sell(h.tracked(10_000.0)).await.unwrap_err();

        match err {
            TraderError::Transaction {
                operation,
                signature,
                message,
                ..
            } => {
                assert_eq!(operation, "confirm");
                assert_eq!(signature, Some(h.ledger.signature()));
                assert!(message.contains("Custom(6002)"));
            }
            other => panic!("expected transaction error, got {other:?}"),
        }
        assert_eq!(h.ledger.status_polls(), 2);
        assert_eq!(h.ledger.transaction_fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_timeout_is_rpc_error() {
        let h = harness();
        h.ledger.push_status(status_at(ConfirmationLevel::Confirmed));
        let started = Instant::now();

        let err = h
            .manager
            .buy(h.tracked(1.0).with_confirm_timeout(Duration::from_secs(10)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Rpc);
        assert!(err.message().contains("timed out"), "{err}");
        // Polls at 0, 2, 4, 6 and 8 seconds
        assert_eq!(h.ledger.status_polls(), 5);
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_timeout_is_sixty_seconds() {
        let h = harness();
        let started = Instant::now();

        let err = h.manager.buy(h.tracked(1.0)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Rpc);
        assert_eq!(h.ledger.status_polls(), 30);
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(started.elapsed() < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overall_deadline_cancels_tracking() {
        let h = harness();
        let started = Instant::now();

        let err = h
            .manager
            .buy(h.tracked(1.0).with_deadline(Duration::from_secs(5)))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Rpc);
        assert!(err.message().contains("timed out"), "{err}");
        assert!(started.elapsed() <= Duration::from_secs(6));
        assert!(h.ledger.status_polls() <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_untracked_execution_skips_polling() {
        let h = harness();
        h.ledger.push_status(status_at(ConfirmationLevel::Finalized));

        let outcome = h.manager.buy(h.execute(1.0)).await.unwrap();

        assert!(matches!(
            outcome,
            TransactionOutcome::Executed { record: None, .. }
        ));
        assert_eq!(h.ledger.status_polls(), 0);
    }
}
