//! Disjunctive predicate group builder.

use entiq_expr::Predicate;

use crate::builder::QueryBuilder;
use crate::clause::ClauseKind;
use crate::error::{QueryError, QueryResult};
use crate::guard::BuilderToken;

/// Collects OR-combined predicates for a WHERE or HAVING clause.
///
/// The group holds the parent exclusively while open; `end()` processes
/// the disjunction and ANDs it into the parent clause. Dropping the
/// group without `end()` leaves the chaining guard open, and the parent
/// fails at render time.
#[derive(Debug)]
pub struct OrGroupBuilder<'a> {
    parent: &'a mut QueryBuilder,
    clause: ClauseKind,
    token: BuilderToken,
    disjuncts: Vec<Predicate>,
}

impl<'a> OrGroupBuilder<'a> {
    pub(crate) fn open(
        parent: &'a mut QueryBuilder,
        clause: ClauseKind,
    ) -> QueryResult<Self> {
        if clause == ClauseKind::Having && parent.core.group_by.is_empty() {
            return Err(QueryError::InvalidStatement(
                "HAVING requires a GROUP BY clause".to_string(),
            ));
        }
        let token = parent.core.predicate_guard.on_started()?;
        Ok(Self {
            parent,
            clause,
            token,
            disjuncts: Vec::new(),
        })
    }

    /// Add one disjunct, parsed eagerly.
    pub fn or(mut self, predicate: &str) -> QueryResult<Self> {
        self.disjuncts.push(entiq_expr::parse_predicate(predicate)?);
        Ok(self)
    }

    /// Process the disjunction and return control to the parent.
    pub fn end(self) -> QueryResult<()> {
        self.parent.core.predicate_guard.on_ended(self.token)?;
        if self.disjuncts.is_empty() {
            return Err(QueryError::chaining(
                "a predicate group must contain at least one predicate",
            ));
        }
        let mut disjuncts = self.disjuncts;
        let combined = if disjuncts.len() == 1 {
            disjuncts.pop().expect("single disjunct")
        } else {
            Predicate::Or(disjuncts)
        };
        let id = self
            .parent
            .core
            .process_predicate(combined, self.clause, None, None)?;
        self.parent.core.conjoin(self.clause, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::QueryError;
    use crate::factory::QueryFactory;
    use crate::testing::order_metamodel;

    #[test]
    fn test_group_must_not_be_empty() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        let group = builder.where_or().unwrap();
        assert!(matches!(
            group.end(),
            Err(QueryError::BuilderChaining(_))
        ));
    }

    #[test]
    fn test_second_group_while_open_fails() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        {
            let _group = builder.where_or().unwrap();
            // The open group exclusively borrows the parent; a second
            // group can only be attempted after this one is dropped.
        }
        // The dropped group never ended: the guard is still open.
        assert!(matches!(
            builder.where_or(),
            Err(QueryError::BuilderChaining(_))
        ));
        assert!(matches!(
            builder.to_query_string(),
            Err(QueryError::BuilderChaining(_))
        ));
    }

    #[test]
    fn test_group_renders_parenthesized_disjunction() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        builder.r#where("o.total > 10").unwrap();
        builder
            .where_or()
            .unwrap()
            .or("o.status = 'NEW'")
            .unwrap()
            .or("o.status = 'OPEN'")
            .unwrap()
            .end()
            .unwrap();
        let query = builder.to_query_string().unwrap();
        assert_eq!(
            query,
            "SELECT o FROM Order o WHERE o.total > 10 AND (o.status = 'NEW' OR o.status = 'OPEN')"
        );
    }
}
