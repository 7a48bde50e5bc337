//! ON-clause builder for explicit joins.

use entiq_expr::Predicate;

use crate::builder::QueryBuilder;
use crate::error::QueryResult;
use crate::guard::BuilderToken;
use crate::join::{JoinNodeId, JoinType};

/// Builds the ON predicate of an explicitly declared join.
///
/// Paths resolved inside the predicate register as dependencies of the
/// joined node, so the FROM clause orders the referenced joins first.
#[derive(Debug)]
pub struct OnBuilder<'a> {
    parent: &'a mut QueryBuilder,
    node: JoinNodeId,
    token: BuilderToken,
    predicate: Option<Predicate>,
}

impl<'a> OnBuilder<'a> {
    pub(crate) fn open(
        parent: &'a mut QueryBuilder,
        path: &str,
        alias: &str,
        join_type: JoinType,
    ) -> QueryResult<Self> {
        let token = parent.core.on_guard.on_started()?;
        let node = match parent.core.add_join(path, alias, join_type, false) {
            Ok(node) => node,
            Err(e) => {
                // The join never happened; release the guard before
                // surfacing the failure.
                parent.core.on_guard.on_ended(token)?;
                return Err(e);
            }
        };
        Ok(Self {
            parent,
            node,
            token,
            predicate: None,
        })
    }

    /// AND a predicate string into the ON clause.
    pub fn on(mut self, predicate: &str) -> QueryResult<Self> {
        let parsed = entiq_expr::parse_predicate(predicate)?;
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and_also(parsed),
            None => parsed,
        });
        Ok(self)
    }

    /// Attach the collected ON predicate and return to the parent.
    pub fn end(self) -> QueryResult<()> {
        self.parent.core.on_guard.on_ended(self.token)?;
        if let Some(predicate) = self.predicate {
            self.parent
                .core
                .set_join_on(self.node, predicate, None)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::QueryError;
    use crate::factory::QueryFactory;
    use crate::join::JoinType;
    use crate::testing::order_metamodel;

    #[test]
    fn test_join_on_renders_predicate() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        builder
            .join_on("o.items", "item", JoinType::Left)
            .unwrap()
            .on("item.price > :minPrice")
            .unwrap()
            .end()
            .unwrap();
        let query = builder.to_query_string().unwrap();
        assert_eq!(
            query,
            "SELECT o FROM Order o LEFT JOIN o.items item ON item.price > :minPrice"
        );
    }

    #[test]
    fn test_on_references_order_joins() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        builder
            .join_on("o.items", "item", JoinType::Inner)
            .unwrap()
            .on("item.price > o.customer.id")
            .unwrap()
            .end()
            .unwrap();
        let query = builder.to_query_string().unwrap();
        // The customer join referenced by the ON clause renders before
        // the item join that depends on it.
        let customer = query.find("JOIN o.customer customer_1").unwrap();
        let item = query.find("JOIN o.items item").unwrap();
        assert!(customer < item);
    }

    #[test]
    fn test_unended_on_builder_blocks_render() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        {
            let _on = builder.join_on("o.items", "item", JoinType::Inner).unwrap();
        }
        assert!(matches!(
            builder.to_query_string(),
            Err(QueryError::BuilderChaining(_))
        ));
    }
}
