pub mod audit_log;
pub mod customer;
pub mod delivery_window;
pub mod order;
pub mod order_item;
pub mod order_sequence;
pub mod planned_shipment;
pub mod product_variant;
pub mod shipment;
pub mod shipment_item;
pub mod shipment_tracking;
