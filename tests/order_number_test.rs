mod common;

use rust_decimal_macros::dec;

use common::{line, order_request, seed_variant, setup_db};
use wholesale_api::{
    models::OrderType,
    order_number::OrderNumberAllocator,
    services::orders::OrderService,
};

#[tokio::test]
async fn numbers_are_sequential_per_prefix() {
    let db = setup_db().await;
    seed_variant(&db, "STK-1", OrderType::Stock, None, None, dec!(10.00)).await;
    let service = OrderService::new(db.clone(), None);

    let mut numbers = Vec::new();
    for _ in 0..3 {
        let result = service
            .create_order(order_request(vec![line("STK-1", 1)]))
            .await
            .expect("order created");
        numbers.push(result.order.order_number);
    }
    assert_eq!(numbers, vec!["SO1", "SO2", "SO3"]);
}

#[tokio::test]
async fn stock_and_preorder_sequences_are_independent() {
    let db = setup_db().await;
    seed_variant(&db, "STK-1", OrderType::Stock, None, None, dec!(10.00)).await;
    seed_variant(&db, "PRE-1", OrderType::PreOrder, None, None, dec!(20.00)).await;
    let service = OrderService::new(db.clone(), None);

    let stock = service
        .create_order(order_request(vec![line("STK-1", 1)]))
        .await
        .expect("stock order");
    let pre = service
        .create_order(order_request(vec![line("PRE-1", 1)]))
        .await
        .expect("pre-order");
    let stock_again = service
        .create_order(order_request(vec![line("STK-1", 1)]))
        .await
        .expect("second stock order");

    assert_eq!(stock.order.order_number, "SO1");
    assert_eq!(pre.order.order_number, "PR1");
    assert_eq!(stock_again.order.order_number, "SO2");
}

#[tokio::test]
async fn interleaved_allocations_never_collide() {
    let db = setup_db().await;
    let allocator = OrderNumberAllocator::for_backend(sea_orm::DatabaseBackend::Sqlite);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let db = db.clone();
        let allocator = allocator.clone();
        handles.push(tokio::spawn(async move {
            allocator
                .allocate(&*db, OrderType::Stock)
                .await
                .expect("allocation succeeds")
        }));
    }

    let mut numbers: Vec<String> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|handle| handle.expect("task finishes"))
        .collect();
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 8);
    assert!(numbers.iter().all(|n| n.starts_with("SO")));
}

#[tokio::test]
async fn mixed_cart_takes_the_preorder_prefix() {
    let db = setup_db().await;
    seed_variant(&db, "STK-1", OrderType::Stock, None, None, dec!(10.00)).await;
    seed_variant(&db, "PRE-1", OrderType::PreOrder, None, None, dec!(20.00)).await;
    let service = OrderService::new(db.clone(), None);

    let mixed = service
        .create_order(order_request(vec![line("STK-1", 1), line("PRE-1", 1)]))
        .await
        .expect("mixed order");
    assert!(mixed.order.order_number.starts_with("PR"));
}
