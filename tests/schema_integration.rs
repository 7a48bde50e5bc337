//! Integration tests for the entity metamodel.

use entiq_schema::{
    Attribute, Cardinality, EntityType, Metamodel, ScalarType, SchemaError,
};

fn shop_metamodel() -> Metamodel {
    Metamodel::builder()
        .entity(
            EntityType::new("Product")
                .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
                .attribute(Attribute::scalar("name", ScalarType::String))
                .attribute(Attribute::scalar("price", ScalarType::Decimal))
                .attribute(
                    Attribute::to_many("variants", "Variant")
                        .cardinality(Cardinality::OneToMany),
                ),
        )
        .unwrap()
        .entity(
            EntityType::new("Variant")
                .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
                .attribute(Attribute::scalar("sku", ScalarType::String))
                .attribute(Attribute::to_one("product", "Product")),
        )
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn test_metamodel_round_trip_lookup() {
    let model = shop_metamodel();
    let product = model.entity("Product").unwrap();
    assert_eq!(product.name(), "Product");
    assert_eq!(product.identifier().unwrap().name, "id");

    let variants = model.attribute("Product", "variants").unwrap();
    assert!(variants.is_collection());
    assert_eq!(variants.target(), Some("Variant"));

    let back = model.attribute("Variant", "product").unwrap();
    assert!(back.is_relation());
    assert!(!back.is_collection());
}

#[test]
fn test_scalar_metadata() {
    let model = shop_metamodel();
    let price = model.attribute("Product", "price").unwrap();
    assert_eq!(price.scalar_type(), Some(ScalarType::Decimal));
    assert!(price.scalar_type().unwrap().is_numeric());
    assert!(!price.optional);
}

#[test]
fn test_unknown_lookups() {
    let model = shop_metamodel();
    assert!(matches!(
        model.entity("Warehouse"),
        Err(SchemaError::UnknownEntity { .. })
    ));
    assert!(model.attribute("Product", "warehouse").is_none());
}

#[test]
fn test_validation_rejects_dangling_relation() {
    let result = Metamodel::builder()
        .entity(
            EntityType::new("Product")
                .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
                .attribute(Attribute::to_many("variants", "Variant")),
        )
        .unwrap()
        .build();
    assert!(matches!(result, Err(SchemaError::UnknownTarget { .. })));
}

#[test]
fn test_serde_round_trip() {
    let model = shop_metamodel();
    let json = serde_json::to_string(&model).unwrap();
    let restored: Metamodel = serde_json::from_str(&json).unwrap();
    assert_eq!(model, restored);
}
