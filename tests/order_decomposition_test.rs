mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use common::{date, line, order_request, seed_variant, seed_window, setup_db};
use wholesale_api::{
    entities::{customer, order, order_item, planned_shipment, product_variant},
    errors::ServiceError,
    models::{OrderStatus, OrderType},
    services::orders::{CreateOrderRequest, OrderService, PlannedGroupSpec},
};

#[tokio::test]
async fn cart_splits_into_one_group_per_window() {
    let db = setup_db().await;
    seed_window(&db, "spring", "Spring 2025", Some(date(2025, 3, 1)), Some(date(2025, 3, 31)))
        .await;
    seed_window(&db, "summer", "Summer 2025", Some(date(2025, 5, 1)), Some(date(2025, 5, 31)))
        .await;
    seed_variant(&db, "STK-1", OrderType::Stock, None, None, dec!(10.00)).await;
    seed_variant(&db, "PRE-A", OrderType::PreOrder, Some("spring"), None, dec!(20.00)).await;
    seed_variant(&db, "PRE-B", OrderType::PreOrder, Some("spring"), None, dec!(30.00)).await;
    seed_variant(&db, "PRE-C", OrderType::PreOrder, Some("summer"), None, dec!(40.00)).await;

    let service = OrderService::new(db.clone(), None);
    let result = service
        .create_order(order_request(vec![
            line("STK-1", 2),
            line("PRE-A", 1),
            line("PRE-B", 3),
            line("PRE-C", 1),
        ]))
        .await
        .expect("order created");

    // Stock group + spring group + summer group.
    assert_eq!(result.planned_shipments.len(), 3);
    assert_eq!(result.items.len(), 4);

    let spring = result
        .planned_shipments
        .iter()
        .find(|g| g.window_ref.as_deref() == Some("spring"))
        .expect("spring group");
    assert_eq!(spring.starts_at, Some(date(2025, 3, 1)));
    assert_eq!(spring.ends_at, Some(date(2025, 3, 31)));
    let spring_members = result
        .items
        .iter()
        .filter(|i| i.planned_shipment_id == Some(spring.id))
        .count();
    assert_eq!(spring_members, 2);

    // Every item lands in a group before commit.
    assert!(result.items.iter().all(|i| i.planned_shipment_id.is_some()));

    let order = &result.order;
    assert_eq!(order.order_type, OrderType::PreOrder);
    assert!(order.order_number.starts_with("PR"));
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_amount, dec!(150.00));
    assert_eq!(order.window_start, Some(date(2025, 3, 1)));
    assert_eq!(order.window_end, Some(date(2025, 5, 31)));
}

#[tokio::test]
async fn stock_only_cart_is_a_stock_order() {
    let db = setup_db().await;
    seed_variant(&db, "STK-1", OrderType::Stock, None, None, dec!(10.00)).await;

    let service = OrderService::new(db.clone(), None);
    let result = service
        .create_order(order_request(vec![line("STK-1", 1)]))
        .await
        .expect("order created");

    assert_eq!(result.order.order_type, OrderType::Stock);
    assert!(result.order.order_number.starts_with("SO"));
    assert_eq!(result.planned_shipments.len(), 1);
    assert!(result.planned_shipments[0].window_ref.is_none());
}

#[tokio::test]
async fn unknown_skus_are_reported_together() {
    let db = setup_db().await;
    seed_variant(&db, "STK-1", OrderType::Stock, None, None, dec!(10.00)).await;

    let service = OrderService::new(db.clone(), None);
    let err = service
        .create_order(order_request(vec![
            line("STK-1", 1),
            line("GHOST-1", 1),
            line("GHOST-2", 1),
        ]))
        .await
        .unwrap_err();

    match err {
        ServiceError::ValidationError(message) => {
            assert!(message.contains("GHOST-1"));
            assert!(message.contains("GHOST-2"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn empty_cart_is_rejected() {
    let db = setup_db().await;
    let service = OrderService::new(db.clone(), None);
    let err = service.create_order(order_request(vec![])).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn window_violation_aborts_the_whole_order() {
    let db = setup_db().await;
    seed_window(&db, "spring", "Spring 2025", Some(date(2025, 3, 1)), Some(date(2025, 3, 31)))
        .await;
    seed_variant(&db, "PRE-A", OrderType::PreOrder, Some("spring"), None, dec!(20.00)).await;

    let service = OrderService::new(db.clone(), None);
    let mut request = order_request(vec![line("PRE-A", 1)]);
    request.plan = Some(vec![PlannedGroupSpec {
        window_ref: Some("spring".to_string()),
        starts_at: Some(date(2025, 6, 1)),
        ends_at: Some(date(2025, 6, 30)),
        item_skus: vec!["PRE-A".to_string()],
    }]);

    let err = service.create_order(request).await.unwrap_err();
    assert_matches!(err, ServiceError::WindowViolation { .. });

    // No partial state survives the failure.
    assert_eq!(order::Entity::find().count(&*db).await.unwrap(), 0);
    assert_eq!(customer::Entity::find().count(&*db).await.unwrap(), 0);
}

#[tokio::test]
async fn window_without_dates_is_a_hard_failure() {
    let db = setup_db().await;
    seed_window(&db, "tbd", "To Be Dated", None, None).await;
    seed_variant(&db, "PRE-A", OrderType::PreOrder, Some("tbd"), None, dec!(20.00)).await;

    let service = OrderService::new(db.clone(), None);
    let err = service
        .create_order(order_request(vec![line("PRE-A", 1)]))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::WindowViolation { .. });
}

#[tokio::test]
async fn explicit_plan_rejects_duplicate_and_unassigned_skus() {
    let db = setup_db().await;
    seed_variant(&db, "STK-1", OrderType::Stock, None, None, dec!(10.00)).await;
    seed_variant(&db, "STK-2", OrderType::Stock, None, None, dec!(10.00)).await;

    let service = OrderService::new(db.clone(), None);

    let duplicated = CreateOrderRequest {
        plan: Some(vec![
            PlannedGroupSpec {
                window_ref: None,
                starts_at: None,
                ends_at: None,
                item_skus: vec!["STK-1".to_string()],
            },
            PlannedGroupSpec {
                window_ref: None,
                starts_at: None,
                ends_at: None,
                item_skus: vec!["STK-1".to_string()],
            },
        ]),
        ..order_request(vec![line("STK-1", 1)])
    };
    assert_matches!(
        service.create_order(duplicated).await.unwrap_err(),
        ServiceError::ValidationError(_)
    );

    let unassigned = CreateOrderRequest {
        plan: Some(vec![PlannedGroupSpec {
            window_ref: None,
            starts_at: None,
            ends_at: None,
            item_skus: vec!["STK-1".to_string()],
        }]),
        ..order_request(vec![line("STK-1", 1), line("STK-2", 1)])
    };
    assert_matches!(
        service.create_order(unassigned).await.unwrap_err(),
        ServiceError::ValidationError(_)
    );
}

#[tokio::test]
async fn explicit_plan_rejects_memberless_groups() {
    let db = setup_db().await;
    seed_variant(&db, "STK-1", OrderType::Stock, None, None, dec!(10.00)).await;

    let service = OrderService::new(db.clone(), None);
    let with_empty_group = CreateOrderRequest {
        plan: Some(vec![
            PlannedGroupSpec {
                window_ref: None,
                starts_at: None,
                ends_at: None,
                item_skus: vec!["STK-1".to_string()],
            },
            PlannedGroupSpec {
                window_ref: None,
                starts_at: None,
                ends_at: None,
                item_skus: vec![],
            },
        ]),
        ..order_request(vec![line("STK-1", 1)])
    };
    assert_matches!(
        service.create_order(with_empty_group).await.unwrap_err(),
        ServiceError::ValidationError(_)
    );

    // Nothing is persisted, in particular no itemless group.
    assert_eq!(order::Entity::find().count(&*db).await.unwrap(), 0);
    assert_eq!(
        planned_shipment::Entity::find().count(&*db).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn items_link_back_to_their_catalog_variant() {
    let db = setup_db().await;
    seed_variant(&db, "STK-1", OrderType::Stock, None, None, dec!(10.00)).await;
    seed_variant(&db, "STK-2", OrderType::Stock, None, None, dec!(5.00)).await;

    OrderService::new(db.clone(), None)
        .create_order(order_request(vec![line("STK-1", 1), line("STK-2", 2)]))
        .await
        .expect("order created");

    let rows = order_item::Entity::find()
        .find_also_related(product_variant::Entity)
        .all(&*db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    for (item, variant) in rows {
        let variant = variant.expect("variant joined");
        assert_eq!(variant.sku, item.sku);
        assert_eq!(variant.id, item.variant_id);
    }
}

#[tokio::test]
async fn repeat_buyer_is_merged_not_duplicated() {
    let db = setup_db().await;
    seed_variant(&db, "STK-1", OrderType::Stock, None, None, dec!(10.00)).await;

    let service = OrderService::new(db.clone(), None);
    service
        .create_order(order_request(vec![line("STK-1", 1)]))
        .await
        .expect("first order");
    service
        .create_order(order_request(vec![line("STK-1", 2)]))
        .await
        .expect("second order");

    let customers = customer::Entity::find()
        .filter(customer::Column::Email.eq("buyer@example.com"))
        .all(&*db)
        .await
        .unwrap();
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].orders_count, 2);
}

#[tokio::test]
async fn negotiated_price_overrides_catalog_price() {
    let db = setup_db().await;
    seed_variant(&db, "STK-1", OrderType::Stock, None, None, dec!(10.00)).await;

    let service = OrderService::new(db.clone(), None);
    let mut request = order_request(vec![line("STK-1", 3)]);
    request.items[0].unit_price = Some(dec!(8.50));

    let result = service.create_order(request).await.expect("order created");
    assert_eq!(result.items[0].unit_price, dec!(8.50));
    assert_eq!(result.order.total_amount, dec!(25.50));
}
