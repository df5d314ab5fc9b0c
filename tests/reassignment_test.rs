mod common;

use assert_matches::assert_matches;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use common::{date, line, order_request, seed_variant, seed_window, setup_db};
use wholesale_api::{
    entities::{audit_log, order, planned_shipment},
    errors::ServiceError,
    models::{OrderType, RequestContext},
    services::{
        fulfillment::{FulfillmentService, RecordShipmentRequest, ShipmentLine},
        orders::{CreateOrderResult, OrderService},
        reassignment::{ReassignItemRequest, ReassignTarget, ReassignmentService},
    },
};

use std::sync::Arc;
use uuid::Uuid;

/// One stock line (default group) and one spring pre-order line.
async fn seed_mixed_order(db: &Arc<wholesale_api::db::DbPool>) -> CreateOrderResult {
    seed_window(db, "spring", "Spring 2025", Some(date(2025, 3, 1)), Some(date(2025, 3, 31)))
        .await;
    seed_variant(db, "STK-1", OrderType::Stock, None, None, dec!(10.00)).await;
    seed_variant(db, "PRE-A", OrderType::PreOrder, Some("spring"), None, dec!(20.00)).await;
    OrderService::new(db.clone(), None)
        .create_order(order_request(vec![line("STK-1", 2), line("PRE-A", 1)]))
        .await
        .expect("order created")
}

fn reassign(
    created: &CreateOrderResult,
    item_index: usize,
    target: ReassignTarget,
    override_window: bool,
) -> ReassignItemRequest {
    let item = &created.items[item_index];
    ReassignItemRequest {
        order_id: created.order.id,
        order_item_id: item.id,
        source_group_id: item.planned_shipment_id.expect("item has a group"),
        target,
        override_window,
    }
}

#[tokio::test]
async fn unconstrained_item_moves_and_empty_group_is_removed() {
    let db = setup_db().await;
    let created = seed_mixed_order(&db).await;
    let service = ReassignmentService::new(db.clone(), None);
    let ctx = RequestContext::new("tester");

    let stock_item = created
        .items
        .iter()
        .position(|i| i.sku == "STK-1")
        .unwrap();
    let spring_group = created
        .planned_shipments
        .iter()
        .find(|g| g.window_ref.as_deref() == Some("spring"))
        .unwrap();

    let result = service
        .reassign_item(
            &ctx,
            reassign(
                &created,
                stock_item,
                ReassignTarget::Existing {
                    group_id: spring_group.id,
                },
                false,
            ),
        )
        .await
        .expect("move succeeds");

    assert_eq!(result.item.planned_shipment_id, Some(spring_group.id));
    assert!(!result.overridden);
    // The stock group emptied out and was deleted.
    let old_group = created.items[stock_item].planned_shipment_id.unwrap();
    assert_eq!(result.deleted_source_group, Some(old_group));
    assert!(planned_shipment::Entity::find_by_id(old_group)
        .one(&*db)
        .await
        .unwrap()
        .is_none());

    // Order bounds now reflect the surviving group only.
    let header = order::Entity::find_by_id(created.order.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(header.window_start, Some(date(2025, 3, 1)));
    assert_eq!(header.window_end, Some(date(2025, 3, 31)));
}

#[tokio::test]
async fn windowed_item_cannot_leave_its_window() {
    let db = setup_db().await;
    let created = seed_mixed_order(&db).await;
    let service = ReassignmentService::new(db.clone(), None);
    let ctx = RequestContext::new("tester");

    let pre_item = created.items.iter().position(|i| i.sku == "PRE-A").unwrap();
    let err = service
        .reassign_item(
            &ctx,
            reassign(
                &created,
                pre_item,
                ReassignTarget::New {
                    window_ref: None,
                    starts_at: Some(date(2025, 6, 1)),
                    ends_at: Some(date(2025, 6, 30)),
                },
                false,
            ),
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::WindowViolation { .. });
}

#[tokio::test]
async fn override_moves_anyway_and_is_audited() {
    let db = setup_db().await;
    let created = seed_mixed_order(&db).await;
    let service = ReassignmentService::new(db.clone(), None);
    let ctx = RequestContext::new("supervisor");

    let pre_item = created.items.iter().position(|i| i.sku == "PRE-A").unwrap();
    let result = service
        .reassign_item(
            &ctx,
            reassign(
                &created,
                pre_item,
                ReassignTarget::New {
                    window_ref: None,
                    starts_at: Some(date(2025, 6, 1)),
                    ends_at: Some(date(2025, 6, 30)),
                },
                true,
            ),
        )
        .await
        .expect("override succeeds");
    assert!(result.overridden);

    let audits = audit_log::Entity::find()
        .filter(audit_log::Column::OrderId.eq(created.order.id))
        .filter(audit_log::Column::Action.eq("reassign_window_override"))
        .all(&*db)
        .await
        .unwrap();
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].actor, "supervisor");
    assert_eq!(audits[0].order_item_id, Some(result.item.id));
    assert_eq!(audits[0].target_group_id, Some(result.target_group.id));
}

#[tokio::test]
async fn stale_source_group_is_refused() {
    let db = setup_db().await;
    let created = seed_mixed_order(&db).await;
    let service = ReassignmentService::new(db.clone(), None);
    let ctx = RequestContext::new("tester");

    let stock_item = created.items.iter().position(|i| i.sku == "STK-1").unwrap();
    let mut request = reassign(
        &created,
        stock_item,
        ReassignTarget::New {
            window_ref: None,
            starts_at: None,
            ends_at: None,
        },
        false,
    );
    request.source_group_id = Uuid::new_v4();

    assert_matches!(
        service.reassign_item(&ctx, request).await.unwrap_err(),
        ServiceError::StateConflict(_)
    );
}

#[tokio::test]
async fn target_must_differ_from_source() {
    let db = setup_db().await;
    let created = seed_mixed_order(&db).await;
    let service = ReassignmentService::new(db.clone(), None);
    let ctx = RequestContext::new("tester");

    let stock_item = created.items.iter().position(|i| i.sku == "STK-1").unwrap();
    let source = created.items[stock_item].planned_shipment_id.unwrap();
    assert_matches!(
        service
            .reassign_item(
                &ctx,
                reassign(
                    &created,
                    stock_item,
                    ReassignTarget::Existing { group_id: source },
                    false
                ),
            )
            .await
            .unwrap_err(),
        ServiceError::ValidationError(_)
    );
}

#[tokio::test]
async fn group_with_recorded_shipments_survives_emptying() {
    let db = setup_db().await;
    let created = seed_mixed_order(&db).await;
    let reassignment = ReassignmentService::new(db.clone(), None);
    let fulfillment = FulfillmentService::new(db.clone(), None, None);
    let ctx = RequestContext::new("tester");

    let stock_item = created.items.iter().position(|i| i.sku == "STK-1").unwrap();
    let stock_group = created.items[stock_item].planned_shipment_id.unwrap();

    // A shipment against the stock group pins it.
    fulfillment
        .record_shipment(
            &ctx,
            RecordShipmentRequest {
                order_id: created.order.id,
                items: vec![ShipmentLine {
                    order_item_id: created.items[stock_item].id,
                    quantity: 1,
                    unit_price: None,
                }],
                shipping_cost: dec!(0),
                shipped_at: None,
                tracking: vec![],
                note: None,
            },
        )
        .await
        .expect("shipment recorded");

    let result = reassignment
        .reassign_item(
            &ctx,
            reassign(
                &created,
                stock_item,
                ReassignTarget::New {
                    window_ref: None,
                    starts_at: None,
                    ends_at: None,
                },
                false,
            ),
        )
        .await
        .expect("move succeeds");

    assert_eq!(result.deleted_source_group, None);
    assert!(planned_shipment::Entity::find_by_id(stock_group)
        .one(&*db)
        .await
        .unwrap()
        .is_some());
}
