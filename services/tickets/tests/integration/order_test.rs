use chrono::Duration;

use oasis_domain::pagination::PageRequest;
use oasis_domain::payment::{PaymentMethod, PaymentStatus};
use oasis_tickets::domain::types::OrderFilter;
use oasis_tickets::error::TicketsServiceError;
use oasis_tickets::usecase::order::{
    CreateOrderInput, CreateOrderUseCase, FindOrderUseCase, GetOrderUseCase, ListOrdersUseCase,
    OrderLookup, UpdateOrderUseCase,
};
use oasis_tickets::usecase::redemption::UseTicketUseCase;

use crate::helpers::{
    CLIENT_ID, FixedClock, MockStore, OTHER_CLIENT_ID, admin, cashier, client, now, other_client,
    place_order, seeded_store,
};

fn create_usecase(store: &MockStore) -> CreateOrderUseCase<MockStore, MockStore, MockStore, FixedClock> {
    CreateOrderUseCase {
        orders: store.clone(),
        events: store.clone(),
        users: store.clone(),
        clock: FixedClock(now()),
    }
}

// ── CreateOrder ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_create_one_ticket_per_requested_event_id() {
    let store = seeded_store();

    let order = create_usecase(&store)
        .execute(
            &client(),
            CreateOrderInput {
                client_id: None,
                event_ids: vec![7, 7],
            },
        )
        .await
        .unwrap();

    assert_eq!(order.client_id, CLIENT_ID);
    assert_eq!(order.user_id, CLIENT_ID);
    assert_eq!(order.tickets.len(), 2);
    assert!(order.tickets.iter().all(|t| t.event.id == 7));
    assert_ne!(order.tickets[0].uuid, order.tickets[1].uuid);
    assert_eq!(order.price(), 2000);
    assert!(order.payment.is_none());
}

#[tokio::test]
async fn should_force_non_privileged_callers_to_buy_for_themselves() {
    let store = seeded_store();

    let order = create_usecase(&store)
        .execute(
            &client(),
            CreateOrderInput {
                client_id: Some(OTHER_CLIENT_ID),
                event_ids: vec![7],
            },
        )
        .await
        .unwrap();

    assert_eq!(order.client_id, CLIENT_ID);
}

#[tokio::test]
async fn should_let_cashier_create_order_for_a_client() {
    let store = seeded_store();

    let order = create_usecase(&store)
        .execute(
            &cashier(),
            CreateOrderInput {
                client_id: Some(CLIENT_ID),
                event_ids: vec![7],
            },
        )
        .await
        .unwrap();

    assert_eq!(order.client_id, CLIENT_ID);
    assert_eq!(order.user_id, cashier().user_id);
}

#[tokio::test]
async fn should_create_nothing_when_any_event_has_ended() {
    let store = seeded_store();
    store.add_event(8, now() - Duration::days(1), 8, 500);

    let result = create_usecase(&store)
        .execute(
            &client(),
            CreateOrderInput {
                client_id: None,
                event_ids: vec![7, 8],
            },
        )
        .await;

    assert!(
        matches!(result, Err(TicketsServiceError::EventExpired)),
        "expected EventExpired, got {result:?}"
    );
    assert_eq!(store.order_count(), 0);
    assert_eq!(store.ticket_count(), 0);
}

#[tokio::test]
async fn should_reject_unknown_event() {
    let store = seeded_store();

    let result = create_usecase(&store)
        .execute(
            &client(),
            CreateOrderInput {
                client_id: None,
                event_ids: vec![7, 999],
            },
        )
        .await;

    assert!(matches!(result, Err(TicketsServiceError::EventNotFound)));
    assert_eq!(store.order_count(), 0);
}

#[tokio::test]
async fn should_reject_empty_event_list() {
    let store = seeded_store();

    let result = create_usecase(&store)
        .execute(
            &client(),
            CreateOrderInput {
                client_id: None,
                event_ids: vec![],
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(TicketsServiceError::Validation {
            field: "event_ids",
            ..
        })
    ));
}

#[tokio::test]
async fn should_reject_unknown_client() {
    let store = seeded_store();

    let result = create_usecase(&store)
        .execute(
            &admin(),
            CreateOrderInput {
                client_id: Some(999),
                event_ids: vec![7],
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(TicketsServiceError::Validation {
            field: "client_id",
            ..
        })
    ));
}

// ── GetOrder / ListOrders ────────────────────────────────────────────────────

#[tokio::test]
async fn should_hide_orders_of_other_clients() {
    let store = seeded_store();
    let order = place_order(&store, CLIENT_ID, &[7]).await;
    let usecase = GetOrderUseCase {
        orders: store.clone(),
    };

    assert_eq!(usecase.execute(&client(), order.id).await.unwrap().id, order.id);
    assert_eq!(usecase.execute(&cashier(), order.id).await.unwrap().id, order.id);
    let result = usecase.execute(&other_client(), order.id).await;
    assert!(matches!(result, Err(TicketsServiceError::Forbidden)));

    let missing = usecase.execute(&admin(), 999).await;
    assert!(matches!(missing, Err(TicketsServiceError::OrderNotFound)));
}

#[tokio::test]
async fn should_scope_order_list_to_the_calling_client() {
    let store = seeded_store();
    let own = place_order(&store, CLIENT_ID, &[7]).await;
    place_order(&store, OTHER_CLIENT_ID, &[7]).await;
    let usecase = ListOrdersUseCase {
        orders: store.clone(),
    };

    let filter = OrderFilter {
        client_ids: vec![OTHER_CLIENT_ID],
        ..OrderFilter::default()
    };
    let mine = usecase
        .execute(&client(), filter, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, own.id);

    let all = usecase
        .execute(&admin(), OrderFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn should_reject_inverted_date_range() {
    let store = seeded_store();
    let usecase = ListOrdersUseCase {
        orders: store.clone(),
    };

    let filter = OrderFilter {
        created_from: Some(now()),
        created_to: Some(now() - Duration::days(1)),
        ..OrderFilter::default()
    };
    let result = usecase.execute(&admin(), filter, PageRequest::default()).await;
    assert!(matches!(result, Err(TicketsServiceError::Validation { .. })));
}

#[tokio::test]
async fn should_find_order_by_external_reference_for_staff_only() {
    let store = seeded_store();
    let order = place_order(&store, CLIENT_ID, &[7]).await;
    store.add_payment(order.id, PaymentMethod::Gateway, PaymentStatus::Created, "ref-1");
    let usecase = FindOrderUseCase {
        orders: store.clone(),
    };

    let found = usecase
        .execute(&cashier(), OrderLookup::ExternalReference("ref-1".to_owned()))
        .await
        .unwrap();
    assert_eq!(found.id, order.id);
    assert_eq!(found.external_reference(), Some("ref-1"));

    let forbidden = usecase
        .execute(&client(), OrderLookup::ExternalReference("ref-1".to_owned()))
        .await;
    assert!(matches!(forbidden, Err(TicketsServiceError::Forbidden)));

    let missing = usecase
        .execute(&admin(), OrderLookup::TransactionId("nope".to_owned()))
        .await;
    assert!(matches!(missing, Err(TicketsServiceError::OrderNotFound)));
}

// ── UpdateOrder ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_move_every_ticket_to_the_new_event() {
    let store = seeded_store();
    store.add_event(9, now() + Duration::days(3), 8, 1500);
    let order = place_order(&store, CLIENT_ID, &[7, 7]).await;
    let usecase = UpdateOrderUseCase {
        orders: store.clone(),
        events: store.clone(),
        clock: FixedClock(now()),
    };

    let updated = usecase.execute(&cashier(), order.id, 9).await.unwrap();

    assert_eq!(updated.tickets.len(), 2);
    assert!(updated.tickets.iter().all(|t| t.event.id == 9));
    assert_eq!(updated.price(), 3000);
}

#[tokio::test]
async fn should_refuse_to_move_an_order_with_a_used_ticket() {
    let store = seeded_store();
    store.add_event(9, now() + Duration::days(3), 8, 1500);
    let order = place_order(&store, CLIENT_ID, &[7, 7]).await;
    store.add_payment(order.id, PaymentMethod::Cashier, PaymentStatus::Approved, "paid");
    UseTicketUseCase {
        tickets: store.clone(),
        payments: store.clone(),
        clock: FixedClock(now()),
    }
    .execute(&cashier(), order.tickets[0].id)
    .await
    .unwrap();

    let result = UpdateOrderUseCase {
        orders: store.clone(),
        events: store.clone(),
        clock: FixedClock(now()),
    }
    .execute(&admin(), order.id, 9)
    .await;

    assert!(matches!(result, Err(TicketsServiceError::OrderUsed)));
    assert_eq!(store.ticket_row(order.tickets[1].id).event_id, 7);
}

#[tokio::test]
async fn should_refuse_to_move_an_order_to_a_finished_event() {
    let store = seeded_store();
    store.add_event(8, now() - Duration::days(2), 8, 500);
    let order = place_order(&store, CLIENT_ID, &[7]).await;

    let result = UpdateOrderUseCase {
        orders: store.clone(),
        events: store.clone(),
        clock: FixedClock(now()),
    }
    .execute(&admin(), order.id, 8)
    .await;

    assert!(matches!(result, Err(TicketsServiceError::EventExpired)));
}
