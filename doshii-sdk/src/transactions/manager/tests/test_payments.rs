use super::*;

// ========================================================================
// Ready to pay
// ========================================================================

#[tokio::test]
async fn test_exact_amount_locks_order() {
    let h = create_harness();
    let pos_id = accepted_order(&h, "d-1").await;

    let trx = ready(
        h.payments
            .evaluate_payment_readiness(Transaction::capture("t-1", &pos_id, 2000))
            .await
            .unwrap(),
    );

    assert_eq!(trx.status, TransactionStatus::Waiting);
    assert_eq!(trx.amount, 2000);
    assert!(!trx.accept_less);
    assert_eq!(trx.version.as_deref(), Some("v2"));
    assert_eq!(
        h.payments.retrieve_transaction_version("t-1").unwrap().as_deref(),
        Some("v2")
    );

    let order = h.orders.retrieve_order(&pos_id).unwrap();
    assert_eq!(order.payment_lock.as_deref(), Some("t-1"));
    assert_eq!(
        h.reporter.calls().last(),
        Some(&ReportCall::UpdateTransaction {
            trx_id: "t-1".into(),
            amount: 2000,
            status: TransactionStatus::Waiting,
        })
    );
}

#[tokio::test]
async fn test_doshii_order_id_resolves() {
    let h = create_harness();
    let pos_id = accepted_order(&h, "d-2").await;

    let trx = ready(
        h.payments
            .evaluate_payment_readiness(Transaction::capture("t-1", "d-2", 2000))
            .await
            .unwrap(),
    );
    assert_eq!(trx.order_id, pos_id);
}

#[tokio::test]
async fn test_second_capture_while_locked_is_declined() {
    let h = create_harness();
    let pos_id = accepted_order(&h, "d-3").await;
    ready(
        h.payments
            .evaluate_payment_readiness(Transaction::capture("t-1", &pos_id, 2000))
            .await
            .unwrap(),
    );

    let second = h
        .payments
        .evaluate_payment_readiness(Transaction::capture("t-2", &pos_id, 2000))
        .await
        .unwrap();
    assert_eq!(declined_code(&second), Some(ErrorCode::OrderLocked));
    assert!(h.payments.transaction("t-2").is_none());
}

#[tokio::test]
async fn test_redelivered_ready_to_pay_is_answered_again() {
    let h = create_harness();
    let pos_id = accepted_order(&h, "d-4").await;
    let first = h
        .payments
        .evaluate_payment_readiness(Transaction::capture("t-1", &pos_id, 2000))
        .await
        .unwrap();
    let again = h
        .payments
        .evaluate_payment_readiness(Transaction::capture("t-1", &pos_id, 2000))
        .await
        .unwrap();

    assert_eq!(first, again);
    // accept + one ready report
    assert_eq!(h.reporter.calls().len(), 2);
}

#[tokio::test]
async fn test_mismatch_declined_without_partial() {
    let h = create_harness();
    let pos_id = accepted_order(&h, "d-5").await;

    for amount in [1500, 2500, 0] {
        let readiness = h
            .payments
            .evaluate_payment_readiness(Transaction::capture("t-1", &pos_id, amount))
            .await
            .unwrap();
        assert_eq!(
            declined_code(&readiness),
            Some(ErrorCode::PaymentAmountMismatch),
            "amount {amount}"
        );
    }
    assert!(!h.orders.retrieve_order(&pos_id).unwrap().is_locked());
}

#[tokio::test]
async fn test_partial_payment_trims_over_request() {
    let h = create_harness_with(AutoAcceptPolicy {
        allow_partial_payment: true,
    });
    let pos_id = accepted_order(&h, "d-6").await;

    let trx = ready(
        h.payments
            .evaluate_payment_readiness(Transaction::capture("t-1", &pos_id, 2500))
            .await
            .unwrap(),
    );
    assert_eq!(trx.amount, 2000);
    assert!(trx.accept_less);
}

#[tokio::test]
async fn test_partial_payments_complete_on_last_capture() {
    let h = create_harness_with(AutoAcceptPolicy {
        allow_partial_payment: true,
    });
    let pos_id = accepted_order(&h, "d-7").await;

    assert!(pay(&h, "t-1", &pos_id, 1500).await.is_none());
    let order = h.orders.retrieve_order(&pos_id).unwrap();
    assert!(!order.is_locked());

    // Only 5.00 left owing
    let over = ready(
        h.payments
            .evaluate_payment_readiness(Transaction::capture("t-2", &pos_id, 800))
            .await
            .unwrap(),
    );
    assert_eq!(over.amount, 500);

    let completed = h.payments.record_successful_payment(over).await.unwrap();
    assert_eq!(completed.unwrap().status, OrderStatus::Complete);
    assert!(h.orders.retrieve_order(&pos_id).is_err());
}

#[tokio::test]
async fn test_free_order_settles_with_zero_capture() {
    let h = create_harness();
    let order = Order::pending("d-free", vec![OrderItem::new("water", "Tap Water", 1, 0)]);
    let pos_id = h
        .orders
        .evaluate_new_order(order, &Consumer::default(), &[])
        .await
        .unwrap()
        .pos_id
        .unwrap();

    let overpay = h
        .payments
        .evaluate_payment_readiness(Transaction::capture("t-1", &pos_id, 100))
        .await
        .unwrap();
    assert_eq!(
        declined_code(&overpay),
        Some(ErrorCode::PaymentAmountMismatch)
    );

    let completed = pay(&h, "t-0", &pos_id, 0).await.unwrap();
    assert_eq!(completed.status, OrderStatus::Complete);
    assert_eq!(
        h.orders.outcome_for("d-free").unwrap().status,
        OrderStatus::Complete
    );
}

#[tokio::test]
async fn test_negative_amount_declined_as_payment() {
    let h = create_harness();
    let pos_id = accepted_order(&h, "d-8").await;

    let readiness = h
        .payments
        .evaluate_payment_readiness(Transaction::capture("t-1", &pos_id, -100))
        .await
        .unwrap();
    assert_eq!(declined_code(&readiness), Some(ErrorCode::InvalidAmountSign));
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let h = create_harness();
    let err = h
        .payments
        .evaluate_payment_readiness(Transaction::capture("t-1", "nope", 100))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::OrderNotFound);
}

#[tokio::test]
async fn test_failed_ready_report_is_resent() {
    let h = create_harness();
    let pos_id = accepted_order(&h, "d-9").await;
    h.reporter.fail_next(1);

    let err = h
        .payments
        .evaluate_payment_readiness(Transaction::capture("t-1", &pos_id, 2000))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ReportingFailure);
    assert!(h.orders.retrieve_order(&pos_id).unwrap().is_locked());
    assert_eq!(h.payments.retrieve_transaction_version("t-1").unwrap(), None);

    let trx = ready(
        h.payments
            .evaluate_payment_readiness(Transaction::capture("t-1", &pos_id, 2000))
            .await
            .unwrap(),
    );
    assert_eq!(trx.version.as_deref(), Some("v2"));
}

// ========================================================================
// Cancel and complete
// ========================================================================

#[tokio::test]
async fn test_cancel_unlocks_order() {
    let h = create_harness();
    let pos_id = accepted_order(&h, "d-10").await;
    let trx = ready(
        h.payments
            .evaluate_payment_readiness(Transaction::capture("t-1", &pos_id, 2000))
            .await
            .unwrap(),
    );

    let cancelled = h.payments.cancel_payment(&trx).await.unwrap();
    assert_eq!(cancelled.status, TransactionStatus::Rejected);
    assert!(!h.orders.retrieve_order(&pos_id).unwrap().is_locked());

    // Idempotent
    let again = h.payments.cancel_payment(&trx).await.unwrap();
    assert_eq!(again.status, TransactionStatus::Rejected);

    // Local edits are possible again
    let edit = OrderEdit {
        phase: Some("ready".into()),
        ..Default::default()
    };
    assert!(h.orders.update_order_locally(&pos_id, edit).await.is_ok());
}

#[tokio::test]
async fn test_cancel_unknown_and_complete() {
    let h = create_harness();
    let err = h
        .payments
        .cancel_payment(&Transaction::capture("ghost", "1001", 100))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TransactionNotFound);

    let pos_id = accepted_order(&h, "d-11").await;
    pay(&h, "t-1", &pos_id, 2000).await;
    let err = h
        .payments
        .cancel_payment(&Transaction::capture("t-1", &pos_id, 2000))
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::InvalidOperation(_)));
}

#[tokio::test]
async fn test_successful_payment_completes_order() {
    let h = create_harness();
    let pos_id = accepted_order(&h, "d-12").await;

    let order = pay(&h, "t-1", &pos_id, 2000).await.unwrap();
    assert_eq!(order.status, OrderStatus::Complete);
    assert_eq!(
        h.orders.outcome_for("d-12").unwrap().status,
        OrderStatus::Complete
    );
    assert_eq!(
        h.payments.transaction("t-1").unwrap().status,
        TransactionStatus::Complete
    );

    // Redelivered completion is a no-op
    let calls = h.reporter.calls().len();
    let again = h
        .payments
        .record_successful_payment(Transaction::capture("t-1", &pos_id, 2000))
        .await
        .unwrap();
    assert!(again.is_none());
    assert_eq!(h.reporter.calls().len(), calls);
}

#[tokio::test]
async fn test_successful_payment_rejects_refund_amount() {
    let h = create_harness();
    let err = h
        .payments
        .record_successful_payment(Transaction::capture("t-1", "1001", -5))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidAmountSign);
}

#[tokio::test]
async fn test_transaction_version_of_unknown_transaction() {
    let h = create_harness();
    assert!(matches!(
        h.payments.retrieve_transaction_version("ghost"),
        Err(ManagerError::TransactionNotFound(_))
    ));
    assert!(matches!(
        h.payments.record_transaction_version("ghost", "v1"),
        Err(ManagerError::TransactionNotFound(_))
    ));
}
