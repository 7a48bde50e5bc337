//! Shared metamodel fixture for unit tests.

use entiq_schema::{Attribute, EntityType, Metamodel, ScalarType};

/// An order/customer shaped metamodel used across the builder tests.
pub(crate) fn order_metamodel() -> Metamodel {
    Metamodel::builder()
        .entity(
            EntityType::new("Customer")
                .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
                .attribute(Attribute::scalar("name", ScalarType::String))
                .attribute(Attribute::to_one("address", "Address").optional())
                .attribute(Attribute::to_many("orders", "Order")),
        )
        .unwrap()
        .entity(
            EntityType::new("Address")
                .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
                .attribute(Attribute::scalar("city", ScalarType::String)),
        )
        .unwrap()
        .entity(
            EntityType::new("Order")
                .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
                .attribute(Attribute::scalar("total", ScalarType::Decimal))
                .attribute(Attribute::scalar("status", ScalarType::String))
                .attribute(Attribute::to_one("customer", "Customer"))
                .attribute(Attribute::to_many("items", "OrderItem")),
        )
        .unwrap()
        .entity(
            EntityType::new("OrderItem")
                .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
                .attribute(Attribute::scalar("price", ScalarType::Decimal)),
        )
        .unwrap()
        .entity(
            EntityType::new("OrderSummary")
                .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
                .attribute(Attribute::scalar("total", ScalarType::Decimal)),
        )
        .unwrap()
        .entity(
            EntityType::new("Category")
                .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
                .attribute(Attribute::to_one("parent", "Category").optional()),
        )
        .unwrap()
        .entity(
            EntityType::new("CategoryNode")
                .attribute(Attribute::scalar("id", ScalarType::BigInt).id()),
        )
        .unwrap()
        .build()
        .unwrap()
}
