use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250110_000001_create_catalog_tables::Migration),
            Box::new(m20250110_000002_create_customers_table::Migration),
            Box::new(m20250110_000003_create_checkout_tables::Migration),
            Box::new(m20250110_000004_create_analytics_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250110_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250110_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Campaigns::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Campaigns::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Campaigns::Name).string().not_null())
                        .col(
                            ColumnDef::new(Campaigns::Currency)
                                .string()
                                .not_null()
                                .default("USD"),
                        )
                        .col(
                            ColumnDef::new(Campaigns::PreauthOnly)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Campaigns::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Campaigns::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Campaigns::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Sku).string().not_null())
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::ShippingCost)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Products::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Products::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Gateways::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Gateways::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Gateways::Name).string().not_null())
                        .col(ColumnDef::new(Gateways::Token).string().not_null())
                        .col(
                            ColumnDef::new(Gateways::Priority)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Gateways::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Gateways::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Gateways::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Offers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Offers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Offers::CampaignId).uuid().not_null())
                        .col(ColumnDef::new(Offers::ProductId).uuid().not_null())
                        .col(ColumnDef::new(Offers::GatewayId).uuid().null())
                        .col(ColumnDef::new(Offers::Name).string().not_null())
                        .col(ColumnDef::new(Offers::PriceOverride).decimal().null())
                        .col(ColumnDef::new(Offers::ShipPrice).decimal().null())
                        .col(
                            ColumnDef::new(Offers::QtyPerOrder)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Offers::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Offers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Offers::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_offers_campaign_id")
                        .table(Offers::Table)
                        .col(Offers::CampaignId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_gateways_priority")
                        .table(Gateways::Table)
                        .col(Gateways::Priority)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Offers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Gateways::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Campaigns::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Campaigns {
        Table,
        Id,
        Name,
        Currency,
        PreauthOnly,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        Name,
        Sku,
        Price,
        ShippingCost,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Gateways {
        Table,
        Id,
        Name,
        Token,
        Priority,
        Active,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Offers {
        Table,
        Id,
        CampaignId,
        ProductId,
        GatewayId,
        Name,
        PriceOverride,
        ShipPrice,
        QtyPerOrder,
        Active,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250110_000002_create_customers_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250110_000002_create_customers_table"
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
                        .col(
                            ColumnDef::new(Customers::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Customers::Email).string().not_null())
                        .col(ColumnDef::new(Customers::FirstName).string().not_null())
                        .col(ColumnDef::new(Customers::LastName).string().not_null())
                        .col(ColumnDef::new(Customers::Phone).string().null())
                        .col(
                            ColumnDef::new(Customers::Status)
                                .string_len(20)
                                .not_null()
                                .default("prospect"),
                        )
                        .col(
                            ColumnDef::new(Customers::DeclineCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Customers::LastDeclineReason).string().null())
                        .col(ColumnDef::new(Customers::LastDeclineCode).string().null())
                        .col(ColumnDef::new(Customers::SourceCampaignId).uuid().null())
                        .col(ColumnDef::new(Customers::SourceOfferId).uuid().null())
                        .col(ColumnDef::new(Customers::ShipAddress1).string().not_null())
                        .col(ColumnDef::new(Customers::ShipAddress2).string().null())
                        .col(ColumnDef::new(Customers::ShipCity).string().not_null())
                        .col(ColumnDef::new(Customers::ShipState).string().not_null())
                        .col(ColumnDef::new(Customers::ShipPostal).string().not_null())
                        .col(ColumnDef::new(Customers::ShipCountry).string().not_null())
                        .col(
                            ColumnDef::new(Customers::BillSameAsShip)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Customers::BillAddress1).string().null())
                        .col(ColumnDef::new(Customers::BillAddress2).string().null())
                        .col(ColumnDef::new(Customers::BillCity).string().null())
                        .col(ColumnDef::new(Customers::BillState).string().null())
                        .col(ColumnDef::new(Customers::BillPostal).string().null())
                        .col(ColumnDef::new(Customers::BillCountry).string().null())
                        .col(ColumnDef::new(Customers::IpAddress).string().null())
                        .col(ColumnDef::new(Customers::FirstOrderId).uuid().null())
                        .col(ColumnDef::new(Customers::ConvertedAt).timestamp().null())
                        .col(
                            ColumnDef::new(Customers::LifetimeValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Customers::TotalOrders)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Customers::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Customers::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customers_status")
                        .table(Customers::Table)
                        .col(Customers::Status)
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

    #[derive(DeriveIden)]
    enum Customers {
        Table,
        Id,
        Email,
        FirstName,
        LastName,
        Phone,
        Status,
        DeclineCount,
        LastDeclineReason,
        LastDeclineCode,
        SourceCampaignId,
        SourceOfferId,
        ShipAddress1,
        ShipAddress2,
        ShipCity,
        ShipState,
        ShipPostal,
        ShipCountry,
        BillSameAsShip,
        BillAddress1,
        BillAddress2,
        BillCity,
        BillState,
        BillPostal,
        BillCountry,
        IpAddress,
        FirstOrderId,
        ConvertedAt,
        LifetimeValue,
        TotalOrders,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250110_000003_create_checkout_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250110_000003_create_checkout_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Addresses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Addresses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Addresses::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Addresses::Kind).string_len(10).not_null())
                        .col(ColumnDef::new(Addresses::Line1).string().not_null())
                        .col(ColumnDef::new(Addresses::Line2).string().null())
                        .col(ColumnDef::new(Addresses::City).string().not_null())
                        .col(ColumnDef::new(Addresses::State).string().not_null())
                        .col(ColumnDef::new(Addresses::PostalCode).string().not_null())
                        .col(ColumnDef::new(Addresses::Country).string().not_null())
                        .col(ColumnDef::new(Addresses::CreatedAt).timestamp().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PaymentMethods::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PaymentMethods::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentMethods::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(PaymentMethods::Token).string().not_null())
                        .col(ColumnDef::new(PaymentMethods::CardType).string().not_null())
                        .col(ColumnDef::new(PaymentMethods::LastFour).string().not_null())
                        .col(
                            ColumnDef::new(PaymentMethods::ExpMonth)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PaymentMethods::ExpYear).integer().not_null())
                        .col(
                            ColumnDef::new(PaymentMethods::IsDefault)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(PaymentMethods::Active)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(PaymentMethods::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Orders::DisplayId).big_integer().not_null())
                        .col(ColumnDef::new(Orders::OrderNumber).string().not_null())
                        .col(ColumnDef::new(Orders::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Orders::CampaignId).uuid().null())
                        .col(ColumnDef::new(Orders::OfferId).uuid().null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(ColumnDef::new(Orders::PaymentStatus).string().not_null())
                        .col(
                            ColumnDef::new(Orders::FulfillmentStatus)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::Discount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::Shipping)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Tax).decimal().not_null().default(0))
                        .col(
                            ColumnDef::new(Orders::Total)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Currency).string().not_null())
                        .col(ColumnDef::new(Orders::ShippingAddressId).uuid().not_null())
                        .col(ColumnDef::new(Orders::BillingAddressId).uuid().not_null())
                        .col(ColumnDef::new(Orders::Metadata).json().null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            // The display id allocator relies on this being unique: a
            // concurrent duplicate insert must fail, not silently win.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_display_id")
                        .table(Orders::Table)
                        .col(Orders::DisplayId)
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
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().null())
                        .col(ColumnDef::new(OrderItems::OfferId).uuid().null())
                        .col(ColumnDef::new(OrderItems::Sku).string().not_null())
                        .col(ColumnDef::new(OrderItems::Name).string().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderItems::UnitPrice).decimal().not_null())
                        .col(ColumnDef::new(OrderItems::Total).decimal().not_null())
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::UpdatedAt).timestamp().null())
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
                .create_table(
                    Table::create()
                        .table(Transactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::OrderId).uuid().null())
                        .col(ColumnDef::new(Transactions::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Transactions::GatewayId).uuid().null())
                        .col(ColumnDef::new(Transactions::Kind).string_len(10).not_null())
                        .col(
                            ColumnDef::new(Transactions::Status)
                                .string_len(10)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::Amount).decimal().not_null())
                        .col(ColumnDef::new(Transactions::Currency).string().not_null())
                        .col(
                            ColumnDef::new(Transactions::PaymentMethodToken)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::GatewayTxnId).string().null())
                        .col(ColumnDef::new(Transactions::ResponseCode).string().null())
                        .col(
                            ColumnDef::new(Transactions::ResponseMessage)
                                .string()
                                .null(),
                        )
                        .col(ColumnDef::new(Transactions::AvsCode).string().null())
                        .col(ColumnDef::new(Transactions::CvvCode).string().null())
                        .col(ColumnDef::new(Transactions::ErrorCode).string().null())
                        .col(ColumnDef::new(Transactions::RetryAttempt).integer().null())
                        .col(
                            ColumnDef::new(Transactions::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_transactions_customer_id")
                        .table(Transactions::Table)
                        .col(Transactions::CustomerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Transactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PaymentMethods::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Addresses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Addresses {
        Table,
        Id,
        CustomerId,
        Kind,
        Line1,
        Line2,
        City,
        State,
        PostalCode,
        Country,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PaymentMethods {
        Table,
        Id,
        CustomerId,
        Token,
        CardType,
        LastFour,
        ExpMonth,
        ExpYear,
        IsDefault,
        Active,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        DisplayId,
        OrderNumber,
        CustomerId,
        CampaignId,
        OfferId,
        Status,
        PaymentStatus,
        FulfillmentStatus,
        Subtotal,
        Discount,
        Shipping,
        Tax,
        Total,
        Currency,
        ShippingAddressId,
        BillingAddressId,
        Metadata,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        OfferId,
        Sku,
        Name,
        Quantity,
        UnitPrice,
        Total,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Transactions {
        Table,
        Id,
        OrderId,
        CustomerId,
        GatewayId,
        Kind,
        Status,
        Amount,
        Currency,
        PaymentMethodToken,
        GatewayTxnId,
        ResponseCode,
        ResponseMessage,
        AvsCode,
        CvvCode,
        ErrorCode,
        RetryAttempt,
        CreatedAt,
    }
}

mod m20250110_000004_create_analytics_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250110_000004_create_analytics_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CampaignAnalytics::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CampaignAnalytics::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CampaignAnalytics::CampaignId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CampaignAnalytics::Date).date().not_null())
                        .col(
                            ColumnDef::new(CampaignAnalytics::OrdersCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CampaignAnalytics::OrdersValue)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            // The rollup upsert's conflict target
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_campaign_analytics_campaign_date")
                        .table(CampaignAnalytics::Table)
                        .col(CampaignAnalytics::CampaignId)
                        .col(CampaignAnalytics::Date)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CampaignAnalytics::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CampaignAnalytics {
        Table,
        Id,
        CampaignId,
        Date,
        OrdersCount,
        OrdersValue,
    }
}
