use oasis_domain::payment::{PaymentMethod, PaymentStatus};
use oasis_tickets::error::TicketsServiceError;
use oasis_tickets::usecase::document::GetOrderPdfUseCase;
use oasis_tickets::usecase::payment::{
    InitiateGatewayPaymentUseCase, RecordCashierPaymentUseCase,
};

use crate::helpers::{
    CASHIER_ID, CLIENT_ID, MockGateway, MockRenderer, MockStorage, MockStore, OTHER_CLIENT_ID,
    cashier, client, other_client, place_order, seeded_store,
};

fn cashier_usecase(
    store: &MockStore,
    storage: &MockStorage,
) -> RecordCashierPaymentUseCase<MockStore, MockStore, MockStore, MockRenderer, MockStorage> {
    RecordCashierPaymentUseCase {
        orders: store.clone(),
        payments: store.clone(),
        users: store.clone(),
        renderer: MockRenderer,
        storage: storage.clone(),
        key_prefix: "tickets".to_owned(),
    }
}

fn gateway_usecase(
    store: &MockStore,
    gateway: &MockGateway,
) -> InitiateGatewayPaymentUseCase<MockStore, MockStore, MockGateway> {
    InitiateGatewayPaymentUseCase {
        orders: store.clone(),
        payments: store.clone(),
        gateway: gateway.clone(),
    }
}

// ── RecordCashierPayment ─────────────────────────────────────────────────────

#[tokio::test]
async fn should_record_cashier_payment_with_pdf_and_one_receipt_job() {
    let store = seeded_store();
    let storage = MockStorage::default();
    let order = place_order(&store, CLIENT_ID, &[7, 7]).await;

    let receipt = cashier_usecase(&store, &storage)
        .execute(&cashier(), order.id)
        .await
        .unwrap();

    assert_eq!(receipt.payment.status, PaymentStatus::Approved);
    assert_eq!(receipt.payment.method, PaymentMethod::Cashier);
    assert_eq!(receipt.payment.amount, 2000);
    assert_eq!(receipt.payment.user_id, CASHIER_ID);
    let key = format!("tickets/{}.pdf", order.id);
    assert_eq!(storage.keys(), vec![key.clone()]);
    assert_eq!(receipt.pdf_url, format!("https://files.test/{key}"));

    let outbox = store.outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(
        outbox[0].event.idempotency_key,
        format!("receipt:{}", receipt.payment.external_reference)
    );
}

#[tokio::test]
async fn should_not_approve_an_order_twice() {
    let store = seeded_store();
    let storage = MockStorage::default();
    let order = place_order(&store, CLIENT_ID, &[7]).await;
    let usecase = cashier_usecase(&store, &storage);

    usecase.execute(&cashier(), order.id).await.unwrap();
    let second = usecase.execute(&cashier(), order.id).await;

    assert!(matches!(second, Err(TicketsServiceError::AlreadyPaid)));
    assert_eq!(store.payments_of(order.id).len(), 1);
    assert_eq!(store.outbox().len(), 1);
}

#[tokio::test]
async fn should_forbid_clients_from_recording_cashier_payments() {
    let store = seeded_store();
    let order = place_order(&store, CLIENT_ID, &[7]).await;

    let result = cashier_usecase(&store, &MockStorage::default())
        .execute(&client(), order.id)
        .await;

    assert!(matches!(result, Err(TicketsServiceError::Forbidden)));
    assert!(store.payments_of(order.id).is_empty());
}

#[tokio::test]
async fn should_keep_payment_committed_when_pdf_upload_fails() {
    let store = seeded_store();
    let storage = MockStorage {
        fail: true,
        ..MockStorage::default()
    };
    let order = place_order(&store, CLIENT_ID, &[7]).await;

    let result = cashier_usecase(&store, &storage)
        .execute(&cashier(), order.id)
        .await;

    assert!(matches!(result, Err(TicketsServiceError::Upstream(_))));
    let payments = store.payments_of(order.id);
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Approved);
    assert_eq!(store.outbox().len(), 1);
}

#[tokio::test]
async fn should_refuse_payment_for_order_without_tickets() {
    let store = seeded_store();
    let order = place_order(&store, CLIENT_ID, &[]).await;

    let result = cashier_usecase(&store, &MockStorage::default())
        .execute(&cashier(), order.id)
        .await;

    assert!(matches!(result, Err(TicketsServiceError::Validation { .. })));
}

// ── InitiateGatewayPayment ───────────────────────────────────────────────────

#[tokio::test]
async fn should_create_gateway_checkout_for_own_order() {
    let store = seeded_store();
    let gateway = MockGateway::default();
    let order = place_order(&store, CLIENT_ID, &[7, 7]).await;

    let checkout = gateway_usecase(&store, &gateway)
        .execute(&client(), order.id)
        .await
        .unwrap();

    assert_eq!(checkout.payment.status, PaymentStatus::Created);
    assert_eq!(checkout.payment.method, PaymentMethod::Gateway);
    assert_eq!(checkout.payment.amount, 2000);
    assert_eq!(
        checkout.redirect_url,
        format!("https://gateway.test/checkout/{}", checkout.payment.external_reference)
    );

    let preferences = gateway.preferences.lock().unwrap().clone();
    assert_eq!(preferences.len(), 1);
    assert_eq!(preferences[0].external_reference, checkout.payment.external_reference);
    assert_eq!(preferences[0].items.len(), 1);
    assert_eq!(preferences[0].items[0].quantity, 2);
    assert_eq!(preferences[0].items[0].unit_price, 1000);

    // Created payments do not enqueue receipts.
    assert!(store.outbox().is_empty());
}

#[tokio::test]
async fn should_refuse_checkout_while_a_payment_is_processing() {
    let store = seeded_store();
    let gateway = MockGateway::default();
    let order = place_order(&store, CLIENT_ID, &[7]).await;
    store.add_payment(order.id, PaymentMethod::Gateway, PaymentStatus::Processing, "ref-p");

    let result = gateway_usecase(&store, &gateway)
        .execute(&client(), order.id)
        .await;

    assert!(matches!(result, Err(TicketsServiceError::PaymentProcessing)));
    assert_eq!(gateway.preference_count(), 0);
}

#[tokio::test]
async fn should_allow_a_new_attempt_after_rejection() {
    let store = seeded_store();
    let gateway = MockGateway::default();
    let order = place_order(&store, CLIENT_ID, &[7]).await;
    store.add_payment(order.id, PaymentMethod::Gateway, PaymentStatus::Rejected, "ref-r");

    let checkout = gateway_usecase(&store, &gateway)
        .execute(&client(), order.id)
        .await
        .unwrap();

    let payments = store.payments_of(order.id);
    assert_eq!(payments.len(), 2);
    assert_ne!(checkout.payment.external_reference, "ref-r");
    assert!(checkout.payment.id > payments[0].id);
}

#[tokio::test]
async fn should_forbid_checkout_for_another_clients_order() {
    let store = seeded_store();
    let gateway = MockGateway::default();
    let order = place_order(&store, CLIENT_ID, &[7]).await;

    let result = gateway_usecase(&store, &gateway)
        .execute(&other_client(), order.id)
        .await;

    assert!(matches!(result, Err(TicketsServiceError::Forbidden)));
    assert_eq!(gateway.preference_count(), 0);
}

#[tokio::test]
async fn should_leave_no_local_payment_when_gateway_fails() {
    let store = seeded_store();
    let gateway = MockGateway {
        fail_preferences: true,
        ..MockGateway::default()
    };
    let order = place_order(&store, OTHER_CLIENT_ID, &[7]).await;

    let result = gateway_usecase(&store, &gateway)
        .execute(&other_client(), order.id)
        .await;

    assert!(matches!(result, Err(TicketsServiceError::Upstream(_))));
    assert!(store.payments_of(order.id).is_empty());
}

// ── GetOrderPdf ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_publish_pdf_only_for_paid_orders() {
    let store = seeded_store();
    let storage = MockStorage::default();
    let order = place_order(&store, CLIENT_ID, &[7]).await;
    let usecase = GetOrderPdfUseCase {
        orders: store.clone(),
        users: store.clone(),
        renderer: MockRenderer,
        storage: storage.clone(),
        key_prefix: "orders".to_owned(),
    };

    let unpaid = usecase.execute(&client(), order.id).await;
    assert!(matches!(unpaid, Err(TicketsServiceError::NotPaid)));

    store.add_payment(order.id, PaymentMethod::Cashier, PaymentStatus::Approved, "paid");
    let url = usecase.execute(&client(), order.id).await.unwrap();
    let key = format!("orders/{CLIENT_ID}/{}.pdf", order.id);
    assert_eq!(url, format!("https://files.test/{key}"));
    assert_eq!(storage.keys(), vec![key]);

    let foreign = usecase.execute(&other_client(), order.id).await;
    assert!(matches!(foreign, Err(TicketsServiceError::Forbidden)));
}
