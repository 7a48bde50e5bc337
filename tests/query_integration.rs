//! Integration tests for the query builder.
//!
//! These tests drive the public builder API end to end:
//! - implicit join creation and reuse
//! - WHERE/GROUP BY/HAVING/ORDER BY rendering
//! - SIZE() rewriting in WHERE and SELECT position
//! - UPDATE/DELETE/INSERT statements
//! - parameter binding and transformation

use pretty_assertions::assert_eq;

use entiq_query::{ParamValue, QueryError, QueryFactory};
use entiq_schema::{Attribute, EntityType, Metamodel, ScalarType};

fn metamodel() -> Metamodel {
    Metamodel::builder()
        .entity(
            EntityType::new("Customer")
                .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
                .attribute(Attribute::scalar("name", ScalarType::String))
                .attribute(Attribute::to_one("address", "Address").optional()),
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
        .build()
        .unwrap()
}

#[test]
fn test_default_projection_is_root_alias() {
    let factory = QueryFactory::new(metamodel());
    let builder = factory.select("Order", "o").unwrap();
    assert_eq!(builder.to_query_string().unwrap(), "SELECT o FROM Order o");
}

#[test]
fn test_implicit_join_renders_generated_alias() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder.r#where("o.customer.name = :name").unwrap();
    assert_eq!(
        builder.to_query_string().unwrap(),
        "SELECT o FROM Order o JOIN o.customer customer_1 WHERE customer_1.name = :name"
    );
}

#[test]
fn test_implicit_join_reused_across_clauses() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder
        .select("o.customer.name")
        .unwrap()
        .r#where("o.customer.name LIKE :pattern")
        .unwrap()
        .order_by_asc("o.customer.name")
        .unwrap();
    // One join serves all three clauses.
    assert_eq!(
        builder.to_query_string().unwrap(),
        "SELECT customer_1.name FROM Order o JOIN o.customer customer_1 \
         WHERE customer_1.name LIKE :pattern ORDER BY customer_1.name ASC NULLS LAST"
    );
}

#[test]
fn test_optional_association_joins_left() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder.r#where("o.customer.address.city = 'Vienna'").unwrap();
    assert_eq!(
        builder.to_query_string().unwrap(),
        "SELECT o FROM Order o JOIN o.customer customer_1 \
         LEFT JOIN customer_1.address address_1 WHERE address_1.city = 'Vienna'"
    );
}

#[test]
fn test_to_one_leaf_renders_without_join() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder.r#where("o.customer IS NOT NULL").unwrap();
    assert_eq!(
        builder.to_query_string().unwrap(),
        "SELECT o FROM Order o WHERE o.customer IS NOT NULL"
    );
}

#[test]
fn test_size_in_where_becomes_count_subquery() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder.r#where("SIZE(o.items) > 2").unwrap();
    assert_eq!(
        builder.to_query_string().unwrap(),
        "SELECT o FROM Order o WHERE (SELECT COUNT(items) FROM o.items items) > 2"
    );
}

#[test]
fn test_size_subquery_deduplicated_by_absolute_path() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder
        .r#where("SIZE(o.items) > 2 AND SIZE(o.items) < 10")
        .unwrap();
    let query = builder.to_query_string().unwrap();
    assert_eq!(
        query,
        "SELECT o FROM Order o WHERE (SELECT COUNT(items) FROM o.items items) > 2 \
         AND (SELECT COUNT(items) FROM o.items items) < 10"
    );
}

#[test]
fn test_size_in_select_becomes_counted_join() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder.select("SIZE(o.items)").unwrap();
    assert_eq!(
        builder.to_query_string().unwrap(),
        "SELECT COUNT(items_1) FROM Order o LEFT JOIN o.items items_1 GROUP BY o.id"
    );
}

#[test]
fn test_group_by_deduplicates_resolved_paths() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder
        .select("o.customer.name")
        .unwrap()
        .select("COUNT(o.id)")
        .unwrap()
        .group_by("o.customer.name")
        .unwrap()
        .group_by("o.customer.name")
        .unwrap();
    assert_eq!(
        builder.to_query_string().unwrap(),
        "SELECT customer_1.name, COUNT(o.id) FROM Order o \
         JOIN o.customer customer_1 GROUP BY customer_1.name"
    );
}

#[test]
fn test_having_inlines_select_alias() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder
        .select_as("SUM(o.total)", "revenue")
        .unwrap()
        .group_by("o.customer.name")
        .unwrap()
        .having("revenue > :min")
        .unwrap();
    assert_eq!(
        builder.to_query_string().unwrap(),
        "SELECT SUM(o.total) AS revenue FROM Order o JOIN o.customer customer_1 \
         GROUP BY customer_1.name HAVING SUM(o.total) > :min"
    );
}

#[test]
fn test_having_without_group_by_fails() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    assert!(matches!(
        builder.having("COUNT(o.id) > 1"),
        Err(QueryError::InvalidStatement(_))
    ));
}

#[test]
fn test_order_by_select_alias() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder
        .select_as("SUM(o.total)", "revenue")
        .unwrap()
        .group_by("o.status")
        .unwrap()
        .order_by_desc("revenue")
        .unwrap();
    assert_eq!(
        builder.to_query_string().unwrap(),
        "SELECT SUM(o.total) AS revenue FROM Order o \
         GROUP BY o.status ORDER BY revenue DESC NULLS LAST"
    );
}

#[test]
fn test_select_alias_with_navigation_fails() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder.select_as("o.total", "t").unwrap();
    let err = builder.order_by_asc("t.cents");
    assert!(matches!(err, Err(QueryError::UnresolvablePath { .. })));
}

#[test]
fn test_limit_and_offset_render_last() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder.order_by_asc("o.id").unwrap();
    builder.set_max_results(10).set_first_result(20);
    assert_eq!(
        builder.to_query_string().unwrap(),
        "SELECT o FROM Order o ORDER BY o.id ASC NULLS LAST LIMIT 10 OFFSET 20"
    );
}

#[test]
fn test_update_statement() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.update("Order", "o").unwrap();
    builder
        .set("o.status", "'CLOSED'")
        .unwrap()
        .set("o.total", "o.total * 2")
        .unwrap()
        .r#where("o.status = :old")
        .unwrap();
    assert_eq!(
        builder.to_query_string().unwrap(),
        "UPDATE Order o SET o.status = 'CLOSED', o.total = o.total * 2 WHERE o.status = :old"
    );
}

#[test]
fn test_update_rejects_implicit_joins() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.update("Order", "o").unwrap();
    assert!(matches!(
        builder.r#where("o.customer.name = :name"),
        Err(QueryError::UnresolvablePath { .. })
    ));
}

#[test]
fn test_delete_statement() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.delete("Order", "o").unwrap();
    builder.r#where("o.status = 'CANCELLED'").unwrap();
    assert_eq!(
        builder.to_query_string().unwrap(),
        "DELETE FROM Order o WHERE o.status = 'CANCELLED'"
    );
}

#[test]
fn test_insert_select_statement() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.insert("OrderItem", "Order", "o").unwrap();
    builder
        .bind("id", "o.id")
        .unwrap()
        .bind("price", "o.total")
        .unwrap()
        .r#where("o.status = 'OPEN'")
        .unwrap();
    assert_eq!(
        builder.to_query_string().unwrap(),
        "INSERT INTO OrderItem(id, price) SELECT o.id, o.total FROM Order o WHERE o.status = 'OPEN'"
    );
}

#[test]
fn test_insert_bind_twice_fails() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.insert("OrderItem", "Order", "o").unwrap();
    builder.bind("price", "o.total").unwrap();
    assert!(matches!(
        builder.bind("price", "o.total"),
        Err(QueryError::CteBinding { .. })
    ));
}

#[test]
fn test_parameter_binding_and_unsatisfied() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder
        .r#where("o.total > :min AND o.status = :status")
        .unwrap();
    assert_eq!(
        builder.unsatisfied_parameters(),
        vec![":min".to_string(), ":status".to_string()]
    );

    builder.set_parameter("min", 100).unwrap();
    builder.set_parameter("status", "OPEN").unwrap();
    assert!(builder.unsatisfied_parameters().is_empty());

    let rendered = builder.rendered().unwrap();
    assert_eq!(rendered.parameters.len(), 2);
    assert_eq!(rendered.parameters[0].value, Some(ParamValue::Int(100)));
    assert_eq!(
        rendered.parameters[1].value,
        Some(ParamValue::String("OPEN".to_string()))
    );
}

#[test]
fn test_entity_parameter_collapses_to_identifier() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder.r#where("o.customer = :customer").unwrap();
    builder
        .set_parameter_entity(
            "customer",
            "Customer",
            serde_json::json!({"id": 42, "name": "ACME"}),
        )
        .unwrap();
    let rendered = builder.rendered().unwrap();
    assert_eq!(rendered.parameters[0].value, Some(ParamValue::Int(42)));
}

#[test]
fn test_reserved_parameter_prefix_rejected() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    assert!(matches!(
        builder.set_parameter("entiq_gen_param_0", 1),
        Err(QueryError::InvalidParameter { .. })
    ));
}

#[test]
fn test_outer_without_parent_is_left_untouched() {
    // At the top level there is no parent query to resolve against;
    // the call stays in the output unchanged.
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder.r#where("OUTER(o.total) > 1").unwrap();
    assert_eq!(
        builder.to_query_string().unwrap(),
        "SELECT o FROM Order o WHERE OUTER(o.total) > 1"
    );
}

#[test]
fn test_unknown_entity_fails() {
    let factory = QueryFactory::new(metamodel());
    assert!(factory.select("Vendor", "v").is_err());
}

#[test]
fn test_rendered_aliases_recover_attribute_mapping() {
    let factory = QueryFactory::new(metamodel());
    let mut builder = factory.select("Order", "o").unwrap();
    builder
        .r#where("o.customer.address.city = :city AND o.items.price > :min")
        .unwrap();
    let query = builder.to_query_string().unwrap();

    // Re-parse the join clauses: every generated alias maps back to the
    // attribute path it was created for.
    let mut mappings = Vec::new();
    for part in query.split(" JOIN ") {
        let tokens: Vec<&str> = part.split_whitespace().collect();
        if tokens.len() >= 2 && tokens[0].contains('.') {
            mappings.push((tokens[0].to_string(), tokens[1].to_string()));
        }
    }
    assert!(mappings.contains(&("o.customer".to_string(), "customer_1".to_string())));
    assert!(mappings.contains(&("customer_1.address".to_string(), "address_1".to_string())));
    assert!(mappings.contains(&("o.items".to_string(), "items_1".to_string())));
}
