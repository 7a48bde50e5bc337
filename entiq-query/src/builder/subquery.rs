//! Correlated subquery builders.
//!
//! `where_exists()` opens a [`SubqueryInitiator`]; declaring the FROM
//! clause turns it into a full [`SubqueryBuilder`] (the chaining guard
//! replaces the initiator's identity with the builder's). Paths inside
//! the subquery may reference the parent's aliases; to-one navigation
//! from an outer alias joins in the parent, collection navigation is
//! rejected.

use smol_str::SmolStr;

use entiq_expr::Predicate;

use crate::builder::QueryBuilder;
use crate::clause::ClauseKind;
use crate::core::QueryCore;
use crate::error::QueryResult;
use crate::guard::BuilderToken;
use crate::join::{ResolveLevel, resolve_correlated_root};

/// An opened subquery that does not yet have a FROM clause.
#[derive(Debug)]
pub struct SubqueryInitiator<'a> {
    parent: &'a mut QueryBuilder,
    token: BuilderToken,
    negated: bool,
}

impl<'a> SubqueryInitiator<'a> {
    pub(crate) fn open(parent: &'a mut QueryBuilder, negated: bool) -> QueryResult<Self> {
        let token = parent.core.subquery_guard.on_started()?;
        Ok(Self {
            parent,
            token,
            negated,
        })
    }

    /// Root the subquery at a metamodel entity.
    pub fn from(self, entity: &str, alias: &str) -> QueryResult<SubqueryBuilder<'a>> {
        let token = self.parent.core.subquery_guard.on_replaced(self.token)?;
        let core = QueryCore::new(
            self.parent.core.metamodel.clone(),
            crate::core::StatementKind::Select,
            entity,
            alias,
        )?;
        Ok(SubqueryBuilder {
            parent: self.parent,
            core,
            token,
            negated: self.negated,
        })
    }

    /// Root the subquery at a collection of the outer query
    /// (correlated subquery root).
    pub fn from_correlated(self, path: &str, alias: &str) -> QueryResult<SubqueryBuilder<'a>> {
        let token = self.parent.core.subquery_guard.on_replaced(self.token)?;
        let metamodel = self.parent.core.metamodel.clone();
        let parsed = entiq_expr::parse_path_expression(path)?;
        let correlated = {
            let mut outer = ResolveLevel {
                joins: &mut self.parent.core.joins,
                scope: &mut self.parent.core.scope,
            };
            resolve_correlated_root(&metamodel, &mut outer, &parsed)?
        };
        let core = QueryCore::new_correlated(
            metamodel,
            &correlated.entity,
            alias,
            correlated.correlation,
        )?;
        Ok(SubqueryBuilder {
            parent: self.parent,
            core,
            token,
            negated: self.negated,
        })
    }
}

/// A subquery under construction.
#[derive(Debug)]
pub struct SubqueryBuilder<'a> {
    parent: &'a mut QueryBuilder,
    core: QueryCore,
    token: BuilderToken,
    negated: bool,
}

impl SubqueryBuilder<'_> {
    /// Add a select item.
    pub fn select(mut self, expression: &str) -> QueryResult<Self> {
        self.core
            .add_select(expression, None, Some(&mut self.parent.core))?;
        Ok(self)
    }

    /// Add a select item under an alias.
    pub fn select_as(mut self, expression: &str, alias: &str) -> QueryResult<Self> {
        self.core.add_select(
            expression,
            Some(SmolStr::new(alias)),
            Some(&mut self.parent.core),
        )?;
        Ok(self)
    }

    /// AND a predicate string into the subquery's WHERE clause.
    pub fn r#where(mut self, predicate: &str) -> QueryResult<Self> {
        self.core.where_and(predicate, Some(&mut self.parent.core))?;
        Ok(self)
    }

    /// Add a GROUP BY entry.
    pub fn group_by(mut self, expression: &str) -> QueryResult<Self> {
        self.core
            .add_group_by(expression, Some(&mut self.parent.core))?;
        Ok(self)
    }

    /// Finish the subquery: attach it to the parent and AND the
    /// EXISTS predicate into the parent's WHERE clause.
    pub fn end(self) -> QueryResult<()> {
        self.parent.core.subquery_guard.on_ended(self.token)?;
        self.core.verify_builders_ended()?;
        let id = self
            .parent
            .core
            .attach_subquery(self.core, ClauseKind::Where);
        let exists = Predicate::Exists {
            subquery: id,
            negated: self.negated,
        };
        let pred = self.parent.core.arena.alloc_pred(exists);
        self.parent.core.conjoin(ClauseKind::Where, pred);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::QueryError;
    use crate::factory::QueryFactory;
    use crate::testing::order_metamodel;

    #[test]
    fn test_correlated_exists_subquery() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        builder
            .where_exists()
            .unwrap()
            .from_correlated("o.items", "item")
            .unwrap()
            .r#where("item.price > :minPrice")
            .unwrap()
            .end()
            .unwrap();
        let query = builder.to_query_string().unwrap();
        assert_eq!(
            query,
            "SELECT o FROM Order o WHERE EXISTS (SELECT item FROM o.items item WHERE item.price > :minPrice)"
        );
    }

    #[test]
    fn test_not_exists_with_outer_scalar_reference() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        builder
            .where_not_exists()
            .unwrap()
            .from("Customer", "c")
            .unwrap()
            .r#where("c.id = o.customer")
            .unwrap()
            .end()
            .unwrap();
        let query = builder.to_query_string().unwrap();
        assert_eq!(
            query,
            "SELECT o FROM Order o WHERE NOT EXISTS (SELECT c FROM Customer c WHERE c.id = o.customer)"
        );
    }

    #[test]
    fn test_outer_function_joins_in_parent() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        builder
            .where_exists()
            .unwrap()
            .from("Customer", "c")
            .unwrap()
            .r#where("c.name = OUTER(o.customer.name)")
            .unwrap()
            .end()
            .unwrap();
        let query = builder.to_query_string().unwrap();
        // The OUTER() path joined customer in the parent query.
        assert_eq!(
            query,
            "SELECT o FROM Order o JOIN o.customer customer_1 WHERE EXISTS (SELECT c FROM Customer c WHERE c.name = customer_1.name)"
        );
    }

    #[test]
    fn test_subquery_shadows_outer_alias() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        builder
            .where_exists()
            .unwrap()
            .from("Order", "o")
            .unwrap()
            .r#where("o.total > 100")
            .unwrap()
            .end()
            .unwrap();
        let query = builder.to_query_string().unwrap();
        // The inner `o` wins inside the subquery.
        assert_eq!(
            query,
            "SELECT o FROM Order o WHERE EXISTS (SELECT o FROM Order o WHERE o.total > 100)"
        );
    }

    #[test]
    fn test_second_subquery_while_open_fails() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        {
            let _initiator = builder.where_exists().unwrap();
        }
        // The dropped initiator never ended; the guard remains open.
        assert!(matches!(
            builder.where_exists(),
            Err(QueryError::BuilderChaining(_))
        ));
    }

    #[test]
    fn test_outer_collection_navigation_rejected() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        let result = builder
            .where_exists()
            .unwrap()
            .from("Customer", "c")
            .unwrap()
            .r#where("o.items.price > 10");
        assert!(matches!(
            result,
            Err(QueryError::IllegalCorrelation { .. })
        ));
    }
}
