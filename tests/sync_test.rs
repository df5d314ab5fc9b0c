mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

use common::{line, order_request, seed_variant, setup_db, MockCommerce};
use wholesale_api::{
    commerce::{
        types::{ExternalFulfillment, ExternalFulfillmentLine, ExternalTracking},
        CommerceError, CommercePlatform,
    },
    config::SyncConfig,
    db::DbPool,
    entities::{customer, order, order_item, shipment, shipment_tracking},
    errors::ServiceError,
    models::{OrderStatus, OrderType, RequestContext},
    services::{
        fulfillment::{FulfillmentService, RecordShipmentRequest, ShipmentLine},
        orders::{CreateOrderResult, OrderService},
        reconciliation::ReconciliationService,
        transfer::TransferService,
    },
};

async fn seed_transferable_order(db: &Arc<DbPool>) -> CreateOrderResult {
    seed_variant(db, "STK-1", OrderType::Stock, None, Some("ext-var-1"), dec!(10.00)).await;
    seed_variant(db, "STK-2", OrderType::Stock, None, Some("ext-var-2"), dec!(5.00)).await;
    OrderService::new(db.clone(), None)
        .create_order(order_request(vec![line("STK-1", 4), line("STK-2", 6)]))
        .await
        .expect("order created")
}

fn sync_config() -> SyncConfig {
    SyncConfig {
        pause_ms: 0,
        ..SyncConfig::default()
    }
}

fn reconciler(db: &Arc<DbPool>, mock: &Arc<MockCommerce>) -> ReconciliationService {
    ReconciliationService::new(
        db.clone(),
        None,
        mock.clone() as Arc<dyn CommercePlatform>,
        sync_config(),
    )
}

#[tokio::test]
async fn transfer_marks_the_order_and_records_line_references() {
    let db = setup_db().await;
    let created = seed_transferable_order(&db).await;
    let mock = MockCommerce::new();
    let service = TransferService::new(db.clone(), None, mock.clone());
    let ctx = RequestContext::new("tester");

    let result = service
        .transfer_order(&ctx, created.order.id)
        .await
        .expect("transfer succeeds");

    assert!(result.order.transferred);
    assert_eq!(result.order.external_id.as_deref(), Some(result.external_id.as_str()));
    assert!(result.unreferenced_items.is_empty());

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(created.order.id))
        .all(&*db)
        .await
        .unwrap();
    assert!(items.iter().all(|i| i.external_line_id.is_some()));

    let payloads = mock.created_orders.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].order_number, created.order.order_number);
    assert!(payloads[0].tags.contains(&"Stock".to_string()));
    assert_eq!(payloads[0].line_items.len(), 2);
}

#[tokio::test]
async fn unresolved_skus_abort_before_any_platform_call() {
    let db = setup_db().await;
    seed_variant(&db, "STK-1", OrderType::Stock, None, Some("ext-var-1"), dec!(10.00)).await;
    seed_variant(&db, "LOCAL-1", OrderType::Stock, None, None, dec!(7.00)).await;
    seed_variant(&db, "LOCAL-2", OrderType::Stock, None, None, dec!(3.00)).await;
    let created = OrderService::new(db.clone(), None)
        .create_order(order_request(vec![
            line("STK-1", 1),
            line("LOCAL-1", 1),
            line("LOCAL-2", 1),
        ]))
        .await
        .expect("order created");

    let mock = MockCommerce::new();
    let service = TransferService::new(db.clone(), None, mock.clone());
    let ctx = RequestContext::new("tester");

    let err = service.transfer_order(&ctx, created.order.id).await.unwrap_err();
    match err {
        ServiceError::UnresolvedSkus(skus) => {
            assert_eq!(skus.len(), 2);
            assert!(skus.contains(&"LOCAL-1".to_string()));
            assert!(skus.contains(&"LOCAL-2".to_string()));
        }
        other => panic!("expected unresolved SKUs, got {:?}", other),
    }
    assert_eq!(mock.call_count("create_order"), 0);

    let header = order::Entity::find_by_id(created.order.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert!(!header.transferred);
}

#[tokio::test]
async fn retransfer_is_refused() {
    let db = setup_db().await;
    let created = seed_transferable_order(&db).await;
    let mock = MockCommerce::new();
    let service = TransferService::new(db.clone(), None, mock.clone());
    let ctx = RequestContext::new("tester");

    service
        .transfer_order(&ctx, created.order.id)
        .await
        .expect("first transfer");
    assert_matches!(
        service.transfer_order(&ctx, created.order.id).await.unwrap_err(),
        ServiceError::AlreadyTransferred(_)
    );
    assert_eq!(mock.call_count("create_order"), 1);
}

#[tokio::test]
async fn stale_customer_reference_is_repaired_exactly_once() {
    let db = setup_db().await;
    let created = seed_transferable_order(&db).await;

    // Give the buyer a reference the platform no longer recognizes.
    let buyer = customer::Entity::find_by_id(created.order.customer_id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    let mut active: customer::ActiveModel = sea_orm::IntoActiveModel::into_active_model(buyer);
    active.external_id = sea_orm::Set(Some("stale-customer".to_string()));
    sea_orm::ActiveModelTrait::update(active, &*db).await.unwrap();

    let mock = MockCommerce::new();
    mock.reject_customer_once
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let service = TransferService::new(db.clone(), None, mock.clone());
    let ctx = RequestContext::new("tester");

    let result = service
        .transfer_order(&ctx, created.order.id)
        .await
        .expect("transfer recovers");
    assert!(result.order.transferred);
    assert_eq!(mock.call_count("create_order"), 2);
    assert_eq!(mock.call_count("create_customer"), 1);

    let buyer = customer::Entity::find_by_id(created.order.customer_id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(buyer.external_id.as_deref(), Some("stale-customer"));
    assert!(buyer.external_id.is_some());
}

#[tokio::test]
async fn batch_transfer_isolates_failures() {
    let db = setup_db().await;
    let good = seed_transferable_order(&db).await;
    seed_variant(&db, "LOCAL-1", OrderType::Stock, None, None, dec!(7.00)).await;
    let bad = OrderService::new(db.clone(), None)
        .create_order(order_request(vec![line("LOCAL-1", 1)]))
        .await
        .expect("order created");

    let mock = MockCommerce::new();
    let service = TransferService::new(db.clone(), None, mock.clone());
    let ctx = RequestContext::new("tester");

    let outcome = service
        .transfer_many(&ctx, &[good.order.id, bad.order.id])
        .await;
    assert_eq!(outcome.succeeded, vec![good.order.id]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, bad.order.id);
    assert!(!outcome.all_succeeded());
}

#[tokio::test]
async fn reconciliation_imports_unseen_fulfillments_once() {
    let db = setup_db().await;
    let created = seed_transferable_order(&db).await;
    let mock = MockCommerce::new();
    let ctx = RequestContext::new("tester");
    TransferService::new(db.clone(), None, mock.clone())
        .transfer_order(&ctx, created.order.id)
        .await
        .expect("transferred");

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(created.order.id))
        .all(&*db)
        .await
        .unwrap();
    mock.push_fulfillment(ExternalFulfillment {
        id: "warehouse-f1".to_string(),
        status: None,
        shipped_at: None,
        tracking: vec![ExternalTracking {
            carrier: Some("DHL".to_string()),
            number: "JD014".to_string(),
        }],
        line_items: items
            .iter()
            .map(|i| ExternalFulfillmentLine {
                line_item_id: i.external_line_id.clone(),
                variant_id: None,
                sku: None,
                quantity: i.quantity,
            })
            .collect(),
    });

    let service = reconciler(&db, &mock);
    let report = service.run_sync().await.expect("sync runs");
    assert_eq!(report.processed, 1);
    assert_eq!(report.created_shipments, 1);
    assert!(report.failures.is_empty());

    let shipments = shipment::Entity::find()
        .filter(shipment::Column::OrderId.eq(created.order.id))
        .all(&*db)
        .await
        .unwrap();
    assert_eq!(shipments.len(), 1);
    assert_eq!(
        shipments[0].external_fulfillment_id.as_deref(),
        Some("warehouse-f1")
    );
    let trackings = shipment_tracking::Entity::find()
        .filter(shipment_tracking::Column::ShipmentId.eq(shipments[0].id))
        .count(&*db)
        .await
        .unwrap();
    assert_eq!(trackings, 1);

    // Full coverage was imported, so the order reads as shipped.
    let header = order::Entity::find_by_id(created.order.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.status, OrderStatus::Shipped);

    // A second pass sees the stored reference and imports nothing.
    let report = service.run_sync().await.expect("second sync");
    assert_eq!(report.created_shipments, 0);
    let count = shipment::Entity::find()
        .filter(shipment::Column::OrderId.eq(created.order.id))
        .count(&*db)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn locally_mirrored_shipments_are_not_reimported() {
    let db = setup_db().await;
    let created = seed_transferable_order(&db).await;
    let mock = MockCommerce::new();
    let ctx = RequestContext::new("tester");
    TransferService::new(db.clone(), None, mock.clone())
        .transfer_order(&ctx, created.order.id)
        .await
        .expect("transferred");

    // Recording locally mirrors outbound and stores the returned reference.
    let fulfillment_service = FulfillmentService::new(db.clone(), None, Some(mock.clone()));
    let recorded = fulfillment_service
        .record_shipment(
            &ctx,
            RecordShipmentRequest {
                order_id: created.order.id,
                items: vec![ShipmentLine {
                    order_item_id: created.items[0].id,
                    quantity: 2,
                    unit_price: None,
                }],
                shipping_cost: dec!(0),
                shipped_at: None,
                tracking: vec![],
                note: None,
            },
        )
        .await
        .expect("recorded");
    assert!(recorded.warnings.is_empty());
    let mirrored_id = recorded
        .shipment
        .external_fulfillment_id
        .clone()
        .expect("mirrored reference stored");

    // The platform lists the mirror back at us.
    mock.push_fulfillment(ExternalFulfillment {
        id: mirrored_id,
        status: None,
        shipped_at: None,
        tracking: vec![],
        line_items: vec![ExternalFulfillmentLine {
            line_item_id: None,
            variant_id: Some("ext-var-1".to_string()),
            sku: None,
            quantity: 2,
        }],
    });

    let report = reconciler(&db, &mock).run_sync().await.expect("sync runs");
    assert_eq!(report.created_shipments, 0);
    let count = shipment::Entity::find()
        .filter(shipment::Column::OrderId.eq(created.order.id))
        .count(&*db)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn fulfillment_lines_fall_back_to_sku_matching() {
    let db = setup_db().await;
    let created = seed_transferable_order(&db).await;
    let mock = MockCommerce::new();
    let ctx = RequestContext::new("tester");
    TransferService::new(db.clone(), None, mock.clone())
        .transfer_order(&ctx, created.order.id)
        .await
        .expect("transferred");

    mock.push_fulfillment(ExternalFulfillment {
        id: "warehouse-f2".to_string(),
        status: None,
        shipped_at: None,
        tracking: vec![],
        line_items: vec![
            ExternalFulfillmentLine {
                line_item_id: None,
                variant_id: None,
                sku: Some("STK-2".to_string()),
                quantity: 3,
            },
            // Unknown line is dropped, not fatal.
            ExternalFulfillmentLine {
                line_item_id: None,
                variant_id: None,
                sku: Some("UNKNOWN".to_string()),
                quantity: 1,
            },
        ],
    });

    let report = reconciler(&db, &mock).run_sync().await.expect("sync runs");
    assert_eq!(report.created_shipments, 1);

    let header = order::Entity::find_by_id(created.order.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.status, OrderStatus::PartiallyShipped);
}

#[tokio::test]
async fn listing_failure_is_reported_but_not_fatal() {
    let db = setup_db().await;
    let created = seed_transferable_order(&db).await;
    let mock = MockCommerce::new();
    let ctx = RequestContext::new("tester");
    TransferService::new(db.clone(), None, mock.clone())
        .transfer_order(&ctx, created.order.id)
        .await
        .expect("transferred");
    *mock.fail_list_fulfillments.lock().unwrap() = Some(CommerceError::RateLimited);

    let report = reconciler(&db, &mock).run_sync().await.expect("sync runs");
    assert_eq!(report.processed, 1);
    assert_eq!(report.created_shipments, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, created.order.id);
}

#[tokio::test]
async fn external_status_is_refreshed_during_sync() {
    let db = setup_db().await;
    let created = seed_transferable_order(&db).await;
    let mock = MockCommerce::new();
    let ctx = RequestContext::new("tester");
    TransferService::new(db.clone(), None, mock.clone())
        .transfer_order(&ctx, created.order.id)
        .await
        .expect("transferred");
    mock.set_order_state("cancelled");

    reconciler(&db, &mock).run_sync().await.expect("sync runs");

    let header = order::Entity::find_by_id(created.order.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.external_status.as_deref(), Some("cancelled"));
}
