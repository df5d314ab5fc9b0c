//! Inline schema migrations.

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240401_000001_create_customers_table::Migration),
            Box::new(m20240401_000002_create_delivery_windows_table::Migration),
            Box::new(m20240401_000003_create_product_variants_table::Migration),
            Box::new(m20240401_000004_create_orders_table::Migration),
            Box::new(m20240401_000005_create_order_items_table::Migration),
            Box::new(m20240401_000006_create_planned_shipments_table::Migration),
            Box::new(m20240401_000007_create_shipment_tables::Migration),
            Box::new(m20240401_000008_create_order_sequences_table::Migration),
            Box::new(m20240401_000009_create_audit_logs_table::Migration),
        ]
    }
}

mod m20240401_000001_create_customers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240401_000001_create_customers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Customers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Customers::Email).string().not_null())
                        .col(ColumnDef::new(Customers::Name).string().not_null())
                        .col(ColumnDef::new(Customers::Phone).string().null())
                        .col(ColumnDef::new(Customers::ShippingAddress).string().null())
                        .col(ColumnDef::new(Customers::BillingAddress).string().null())
                        .col(ColumnDef::new(Customers::ExternalId).string().null())
                        .col(
                            ColumnDef::new(Customers::OrdersCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customers_email")
                        .table(Customers::Table)
                        .col(Customers::Email)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Customers {
        Table,
        Id,
        Email,
        Name,
        Phone,
        ShippingAddress,
        BillingAddress,
        ExternalId,
        OrdersCount,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240401_000002_create_delivery_windows_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240401_000002_create_delivery_windows_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DeliveryWindows::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryWindows::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryWindows::Handle).string().not_null())
                        .col(ColumnDef::new(DeliveryWindows::Name).string().not_null())
                        .col(ColumnDef::new(DeliveryWindows::StartsAt).date().null())
                        .col(ColumnDef::new(DeliveryWindows::EndsAt).date().null())
                        .col(
                            ColumnDef::new(DeliveryWindows::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryWindows::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_delivery_windows_handle")
                        .table(DeliveryWindows::Table)
                        .col(DeliveryWindows::Handle)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DeliveryWindows::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum DeliveryWindows {
        Table,
        Id,
        Handle,
        Name,
        StartsAt,
        EndsAt,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240401_000003_create_product_variants_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240401_000003_create_product_variants_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductVariants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductVariants::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductVariants::Sku).string().not_null())
                        .col(ColumnDef::new(ProductVariants::Name).string().not_null())
                        .col(ColumnDef::new(ProductVariants::OrderType).string().not_null())
                        .col(ColumnDef::new(ProductVariants::WindowRef).string().null())
                        .col(
                            ColumnDef::new(ProductVariants::ExternalVariantId)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::ExternalProductId)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ProductVariants::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_variants_sku")
                        .table(ProductVariants::Table)
                        .col(ProductVariants::Sku)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum ProductVariants {
        Table,
        Id,
        Sku,
        Name,
        OrderType,
        WindowRef,
        ExternalVariantId,
        ExternalProductId,
        Price,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240401_000004_create_orders_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240401_000004_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Orders::OrderType).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(ColumnDef::new(Orders::Lifecycle).string().not_null())
                        .col(
                            ColumnDef::new(Orders::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Currency).string().not_null())
                        .col(ColumnDef::new(Orders::ShippingAddress).string().not_null())
                        .col(ColumnDef::new(Orders::BillingAddress).string().not_null())
                        .col(ColumnDef::new(Orders::WindowStart).date().null())
                        .col(ColumnDef::new(Orders::WindowEnd).date().null())
                        .col(
                            ColumnDef::new(Orders::Transferred)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Orders::ExternalId).string().null())
                        .col(ColumnDef::new(Orders::ExternalStatus).string().null())
                        .col(ColumnDef::new(Orders::Notes).string().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_order_number")
                        .table(Orders::Table)
                        .col(Orders::OrderNumber)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_customer_id")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_transferred_status")
                        .table(Orders::Table)
                        .col(Orders::Transferred)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        OrderType,
        CustomerId,
        Status,
        Lifecycle,
        TotalAmount,
        Currency,
        ShippingAddress,
        BillingAddress,
        WindowStart,
        WindowEnd,
        Transferred,
        ExternalId,
        ExternalStatus,
        Notes,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}

mod m20240401_000005_create_order_items_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240401_000005_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(OrderItems::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::VariantId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Sku).string().not_null())
                        .col(ColumnDef::new(OrderItems::Name).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::CancelledQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::UnitPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(OrderItems::PlannedShipmentId).uuid().null())
                        .col(ColumnDef::new(OrderItems::ExternalLineId).string().null())
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_planned_shipment_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::PlannedShipmentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        VariantId,
        Sku,
        Name,
        Quantity,
        CancelledQuantity,
        UnitPrice,
        PlannedShipmentId,
        ExternalLineId,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240401_000006_create_planned_shipments_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240401_000006_create_planned_shipments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PlannedShipments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PlannedShipments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PlannedShipments::OrderId).uuid().not_null())
                        .col(ColumnDef::new(PlannedShipments::WindowRef).string().null())
                        .col(ColumnDef::new(PlannedShipments::WindowName).string().null())
                        .col(ColumnDef::new(PlannedShipments::StartsAt).date().null())
                        .col(ColumnDef::new(PlannedShipments::EndsAt).date().null())
                        .col(ColumnDef::new(PlannedShipments::Status).string().not_null())
                        .col(
                            ColumnDef::new(PlannedShipments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PlannedShipments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_planned_shipments_order_id")
                        .table(PlannedShipments::Table)
                        .col(PlannedShipments::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PlannedShipments::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum PlannedShipments {
        Table,
        Id,
        OrderId,
        WindowRef,
        WindowName,
        StartsAt,
        EndsAt,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240401_000007_create_shipment_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240401_000007_create_shipment_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Shipments::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Shipments::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Shipments::OrderId).uuid().not_null())
                        .col(ColumnDef::new(Shipments::PlannedShipmentId).uuid().null())
                        .col(
                            ColumnDef::new(Shipments::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Shipments::ShippingCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Shipments::Total)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Shipments::ShippedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::ExternalFulfillmentId)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Shipments::Note).string().null())
                        .col(ColumnDef::new(Shipments::CreatedBy).string().not_null())
                        .col(
                            ColumnDef::new(Shipments::Voided)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Shipments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Shipments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_order_id")
                        .table(Shipments::Table)
                        .col(Shipments::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipments_external_fulfillment_id")
                        .table(Shipments::Table)
                        .col(Shipments::ExternalFulfillmentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShipmentItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShipmentItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShipmentItems::ShipmentId).uuid().not_null())
                        .col(ColumnDef::new(ShipmentItems::OrderItemId).uuid().not_null())
                        .col(ColumnDef::new(ShipmentItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(ShipmentItems::UnitPrice).decimal().null())
                        .col(
                            ColumnDef::new(ShipmentItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipment_items_shipment_id")
                        .table(ShipmentItems::Table)
                        .col(ShipmentItems::ShipmentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShipmentTrackings::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShipmentTrackings::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShipmentTrackings::ShipmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ShipmentTrackings::Carrier).string().null())
                        .col(
                            ColumnDef::new(ShipmentTrackings::TrackingNumber)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShipmentTrackings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shipment_trackings_shipment_id")
                        .table(ShipmentTrackings::Table)
                        .col(ShipmentTrackings::ShipmentId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShipmentTrackings::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ShipmentItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Shipments::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Shipments {
        Table,
        Id,
        OrderId,
        PlannedShipmentId,
        Subtotal,
        ShippingCost,
        Total,
        ShippedAt,
        ExternalFulfillmentId,
        Note,
        CreatedBy,
        Voided,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum ShipmentItems {
        Table,
        Id,
        ShipmentId,
        OrderItemId,
        Quantity,
        UnitPrice,
        CreatedAt,
    }

    #[derive(Iden)]
    enum ShipmentTrackings {
        Table,
        Id,
        ShipmentId,
        Carrier,
        TrackingNumber,
        CreatedAt,
    }
}

mod m20240401_000008_create_order_sequences_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240401_000008_create_order_sequences_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderSequences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderSequences::Prefix)
                                .string()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderSequences::LastValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderSequences::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderSequences::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum OrderSequences {
        Table,
        Prefix,
        LastValue,
        UpdatedAt,
    }
}

mod m20240401_000009_create_audit_logs_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240401_000009_create_audit_logs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AuditLogs::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(AuditLogs::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(AuditLogs::OrderId).uuid().not_null())
                        .col(ColumnDef::new(AuditLogs::OrderItemId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::SourceGroupId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::TargetGroupId).uuid().null())
                        .col(ColumnDef::new(AuditLogs::Action).string().not_null())
                        .col(ColumnDef::new(AuditLogs::Actor).string().not_null())
                        .col(ColumnDef::new(AuditLogs::Detail).string().null())
                        .col(
                            ColumnDef::new(AuditLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_audit_logs_order_id")
                        .table(AuditLogs::Table)
                        .col(AuditLogs::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum AuditLogs {
        Table,
        Id,
        OrderId,
        OrderItemId,
        SourceGroupId,
        TargetGroupId,
        Action,
        Actor,
        Detail,
        CreatedAt,
    }
}
