mod common;

use common::{insert_order, insert_payment_method, insert_transaction, sample_order, TestApp};
use multisafepay_bridge::entities::order_transaction;
use multisafepay_bridge::errors::ServiceError;
use sea_orm::EntityTrait;
use uuid::Uuid;

async fn fetch_transaction(app: &TestApp, id: Uuid) -> order_transaction::Model {
    order_transaction::Entity::find_by_id(id)
        .one(&*app.state.db)
        .await
        .expect("query failed")
        .expect("transaction vanished")
}

#[tokio::test]
async fn completed_status_moves_open_transaction_to_paid() {
    let app = TestApp::new().await;
    let order = insert_order(&app, sample_order()).await;
    let method = insert_payment_method(&app, "iDEAL", "IDEAL").await;
    let txn = insert_transaction(&app, order.id, method.id, "open").await;

    app.state
        .services
        .payments
        .transitioner()
        .transition("completed", txn.id)
        .await
        .expect("transition failed");

    let updated = fetch_transaction(&app, txn.id).await;
    assert_eq!(updated.state, "paid");
    assert_eq!(updated.version, 2);
}

#[tokio::test]
async fn duplicate_notification_is_a_no_op() {
    let app = TestApp::new().await;
    let order = insert_order(&app, sample_order()).await;
    let method = insert_payment_method(&app, "iDEAL", "IDEAL").await;
    let txn = insert_transaction(&app, order.id, method.id, "open").await;

    let transitioner = app.state.services.payments.transitioner();
    transitioner.transition("completed", txn.id).await.unwrap();
    transitioner.transition("completed", txn.id).await.unwrap();

    let updated = fetch_transaction(&app, txn.id).await;
    assert_eq!(updated.state, "paid");
    // the second notification must not bump the version again
    assert_eq!(updated.version, 2);
}

#[tokio::test]
async fn illegal_transition_reopens_and_retries_once() {
    let app = TestApp::new().await;
    let order = insert_order(&app, sample_order()).await;
    let method = insert_payment_method(&app, "iDEAL", "IDEAL").await;
    // cancelled cannot go straight to paid
    let txn = insert_transaction(&app, order.id, method.id, "cancelled").await;

    app.state
        .services
        .payments
        .transitioner()
        .transition("completed", txn.id)
        .await
        .expect("recovery failed");

    let updated = fetch_transaction(&app, txn.id).await;
    assert_eq!(updated.state, "paid");
    // one reopen plus one paid transition
    assert_eq!(updated.version, 3);
}

#[tokio::test]
async fn unrecoverable_transition_propagates_after_single_retry() {
    let app = TestApp::new().await;
    let order = insert_order(&app, sample_order()).await;
    let method = insert_payment_method(&app, "iDEAL", "IDEAL").await;
    // a refund needs a paid transaction; reopening does not make it legal
    let txn = insert_transaction(&app, order.id, method.id, "open").await;

    let err = app
        .state
        .services
        .payments
        .transitioner()
        .transition("refunded", txn.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::IllegalTransition { .. }));

    let updated = fetch_transaction(&app, txn.id).await;
    // the recovery reopen went through, the retry did not
    assert_eq!(updated.state, "open");
    assert_eq!(updated.version, 2);
}

#[tokio::test]
async fn partial_refunds_can_repeat_and_then_complete() {
    let app = TestApp::new().await;
    let order = insert_order(&app, sample_order()).await;
    let method = insert_payment_method(&app, "Visa", "VISA").await;
    let txn = insert_transaction(&app, order.id, method.id, "paid").await;

    let transitioner = app.state.services.payments.transitioner();
    transitioner
        .transition("partial_refunded", txn.id)
        .await
        .unwrap();
    assert_eq!(
        fetch_transaction(&app, txn.id).await.state,
        "refunded_partially"
    );

    transitioner.transition("refunded", txn.id).await.unwrap();
    assert_eq!(fetch_transaction(&app, txn.id).await.state, "refunded");
}

#[tokio::test]
async fn unmapped_status_changes_nothing() {
    let app = TestApp::new().await;
    let order = insert_order(&app, sample_order()).await;
    let method = insert_payment_method(&app, "iDEAL", "IDEAL").await;
    let txn = insert_transaction(&app, order.id, method.id, "open").await;

    app.state
        .services
        .payments
        .transitioner()
        .transition("uncleared", txn.id)
        .await
        .expect("unmapped status must not error");

    let updated = fetch_transaction(&app, txn.id).await;
    assert_eq!(updated.state, "open");
    assert_eq!(updated.version, 1);
}

#[tokio::test]
async fn reconciles_payment_method_to_gateway_reported_type() {
    let app = TestApp::new().await;
    let order = insert_order(&app, sample_order()).await;
    let generic = insert_payment_method(&app, "Credit card", "CREDITCARD").await;
    let visa = insert_payment_method(&app, "Visa", "VISA").await;
    let txn = insert_transaction(&app, order.id, generic.id, "paid").await;

    app.state
        .services
        .payments
        .transitioner()
        .reconcile_payment_method(txn.id, "VISA")
        .await
        .unwrap();

    let updated = fetch_transaction(&app, txn.id).await;
    assert_eq!(updated.payment_method_id, visa.id);
}

#[tokio::test]
async fn reconciliation_is_a_no_op_for_matching_or_unknown_types() {
    let app = TestApp::new().await;
    let order = insert_order(&app, sample_order()).await;
    let visa = insert_payment_method(&app, "Visa", "VISA").await;
    let txn = insert_transaction(&app, order.id, visa.id, "paid").await;

    let transitioner = app.state.services.payments.transitioner();

    // same code, different case
    transitioner
        .reconcile_payment_method(txn.id, "visa")
        .await
        .unwrap();
    assert_eq!(
        fetch_transaction(&app, txn.id).await.payment_method_id,
        visa.id
    );

    // no method configured for the reported type
    transitioner
        .reconcile_payment_method(txn.id, "MAESTRO")
        .await
        .unwrap();
    assert_eq!(
        fetch_transaction(&app, txn.id).await.payment_method_id,
        visa.id
    );
}
