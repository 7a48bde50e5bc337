//! Set-operation operand builders.

use crate::builder::QueryBuilder;
use crate::clause::ClauseKind;
use crate::core::{QueryCore, StatementKind};
use crate::error::QueryResult;
use crate::guard::BuilderToken;
use crate::set_ops::{SetOperation, SetOperator};

/// Builds the right-hand operand of a set operation.
#[derive(Debug)]
pub struct SetOperandBuilder<'a> {
    parent: &'a mut QueryBuilder,
    operator: SetOperator,
    core: QueryCore,
    token: BuilderToken,
}

impl<'a> SetOperandBuilder<'a> {
    pub(crate) fn open(
        parent: &'a mut QueryBuilder,
        operator: SetOperator,
        entity: &str,
        alias: &str,
    ) -> QueryResult<Self> {
        parent.require_kind(StatementKind::Select, "a set operation")?;
        let token = parent.core.setop_guard.on_started()?;
        let core = match QueryCore::new(
            parent.core.metamodel.clone(),
            StatementKind::Select,
            entity,
            alias,
        ) {
            Ok(core) => core,
            Err(e) => {
                parent.core.setop_guard.on_ended(token)?;
                return Err(e);
            }
        };
        Ok(Self {
            parent,
            operator,
            core,
            token,
        })
    }

    /// Add a select item to the operand.
    pub fn select(mut self, expression: &str) -> QueryResult<Self> {
        self.core.add_select(expression, None, None)?;
        Ok(self)
    }

    /// AND a predicate string into the operand's WHERE clause.
    pub fn r#where(mut self, predicate: &str) -> QueryResult<Self> {
        self.core.where_and(predicate, None)?;
        Ok(self)
    }

    /// Add a GROUP BY entry to the operand.
    pub fn group_by(mut self, expression: &str) -> QueryResult<Self> {
        self.core.add_group_by(expression, None)?;
        Ok(self)
    }

    /// Finish the operand and append it to the parent.
    pub fn end(mut self) -> QueryResult<()> {
        self.parent.core.setop_guard.on_ended(self.token)?;
        self.core.verify_builders_ended()?;
        let params = std::mem::take(&mut self.core.params);
        self.parent.core.params.absorb(params, ClauseKind::SetOperand);
        self.parent.core.set_ops.push(SetOperation {
            operator: self.operator,
            operand: Box::new(self.core),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::QueryError;
    use crate::factory::QueryFactory;
    use crate::testing::order_metamodel;

    #[test]
    fn test_union_all_renders_parenthesized_operand() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        builder.select("o.id").unwrap();
        builder
            .union_all("Order", "o2")
            .unwrap()
            .select("o2.id")
            .unwrap()
            .r#where("o2.total > :big")
            .unwrap()
            .end()
            .unwrap();
        let query = builder.to_query_string().unwrap();
        assert_eq!(
            query,
            "SELECT o.id FROM Order o UNION ALL (SELECT o2.id FROM Order o2 WHERE o2.total > :big)"
        );
    }

    #[test]
    fn test_chained_set_operations() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        builder.select("o.id").unwrap();
        builder
            .union("Order", "a")
            .unwrap()
            .select("a.id")
            .unwrap()
            .end()
            .unwrap();
        builder
            .except("Order", "b")
            .unwrap()
            .select("b.id")
            .unwrap()
            .end()
            .unwrap();
        let query = builder.to_query_string().unwrap();
        assert_eq!(
            query,
            "SELECT o.id FROM Order o UNION (SELECT a.id FROM Order a) EXCEPT (SELECT b.id FROM Order b)"
        );
    }

    #[test]
    fn test_second_operand_while_open_fails() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.select("Order", "o").unwrap();
        {
            let _operand = builder.union("Order", "a").unwrap();
        }
        assert!(matches!(
            builder.union("Order", "b"),
            Err(QueryError::BuilderChaining(_))
        ));
    }

    #[test]
    fn test_set_operation_requires_select() {
        let factory = QueryFactory::new(order_metamodel());
        let mut builder = factory.delete("Order", "o").unwrap();
        assert!(matches!(
            builder.union("Order", "a"),
            Err(QueryError::InvalidStatement(_))
        ));
    }
}
