use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240210_000001_create_orders_table::Migration),
            Box::new(m20240210_000002_create_order_items_table::Migration),
            Box::new(m20240210_000003_create_order_history_table::Migration),
        ]
    }
}

mod m20240210_000001_create_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240210_000001_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create orders table aligned with entities::order Model
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Orders::ClientName).string().not_null())
                        .col(ColumnDef::new(Orders::ClientPhone).string().null())
                        .col(ColumnDef::new(Orders::CurrentStatus).string().not_null())
                        .col(ColumnDef::new(Orders::EstimatedDate).date().null())
                        .col(
                            ColumnDef::new(Orders::GrandTotal)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::DpAmount)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::RemainingBalance)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::CreatedBy).string().null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            // The order number is the public identifier; uniqueness is
            // enforced here, not checked client-side.
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
                        .name("idx_orders_current_status")
                        .table(Orders::Table)
                        .col(Orders::CurrentStatus)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
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

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        OrderNumber,
        ClientName,
        ClientPhone,
        CurrentStatus,
        EstimatedDate,
        GrandTotal,
        DpAmount,
        RemainingBalance,
        CreatedBy,
        CreatedAt,
    }
}

mod m20240210_000002_create_order_items_table {

    use sea_orm_migration::prelude::*;

    use super::m20240210_000001_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240210_000002_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create order_items table aligned with entities::order_item Model
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                        .col(ColumnDef::new(OrderItems::Category).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderItems::Notes).string().null())
                        .col(
                            ColumnDef::new(OrderItems::PricePerUnit)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::TotalPrice)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
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
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductName,
        Category,
        Quantity,
        Notes,
        PricePerUnit,
        TotalPrice,
    }
}

mod m20240210_000003_create_order_history_table {

    use sea_orm_migration::prelude::*;

    use super::m20240210_000001_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240210_000003_create_order_history_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create order_history table aligned with entities::order_history Model
            manager
                .create_table(
                    Table::create()
                        .table(OrderHistory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderHistory::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderHistory::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderHistory::Title).string().not_null())
                        .col(ColumnDef::new(OrderHistory::Description).string().not_null())
                        .col(ColumnDef::new(OrderHistory::Status).string().not_null())
                        .col(ColumnDef::new(OrderHistory::ActorName).string().null())
                        .col(
                            ColumnDef::new(OrderHistory::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_history_order_id")
                                .from(OrderHistory::Table, OrderHistory::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_history_order_id")
                        .table(OrderHistory::Table)
                        .col(OrderHistory::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderHistory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum OrderHistory {
        Table,
        Id,
        OrderId,
        Title,
        Description,
        Status,
        ActorName,
        CreatedAt,
    }
}
