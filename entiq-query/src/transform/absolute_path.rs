//! Absolute path rendering: the root-alias-prefixed form of a resolved
//! path, used as a deterministic correlation identifier.

use entiq_expr::{PathBase, PathExpression};

use crate::error::{QueryError, QueryResult};
use crate::join::{JoinManager, JoinNodeId};

/// Render a resolved path as `rootAlias.joinPath[.property]`.
///
/// Fails fast on unresolved paths and select-alias references; both mean
/// a prior resolution step was skipped.
pub fn absolute_string(path: &PathExpression, joins: &JoinManager) -> QueryResult<String> {
    match &path.base {
        Some(PathBase::Join { node, property, .. }) => {
            let node = joins.node(JoinNodeId(*node));
            match property {
                Some(property) => Ok(format!("{}.{property}", node.absolute_path)),
                None => Ok(node.absolute_path.clone()),
            }
        }
        Some(PathBase::SelectAlias) => Err(QueryError::path(
            path.dotted(),
            "select alias references have no absolute form",
        )),
        None => Err(QueryError::path(
            path.dotted(),
            "path was not resolved before absolute rendering",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::{AliasKind, AliasScope};
    use crate::clause::ClauseKind;
    use crate::join::{JoinManager, ResolveOptions};
    use entiq_schema::{Attribute, EntityType, Metamodel, ScalarType};

    fn metamodel() -> Metamodel {
        Metamodel::builder()
            .entity(
                EntityType::new("Customer")
                    .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
                    .attribute(Attribute::scalar("name", ScalarType::String)),
            )
            .unwrap()
            .entity(
                EntityType::new("Order")
                    .attribute(Attribute::scalar("id", ScalarType::BigInt).id())
                    .attribute(Attribute::to_one("customer", "Customer")),
            )
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_absolute_form_of_resolved_path() {
        let metamodel = metamodel();
        let mut joins = JoinManager::new("Order", "o");
        let mut scope = AliasScope::new();
        scope.register("o", AliasKind::Join(joins.root())).unwrap();

        let mut path = entiq_expr::parse_path_expression("o.customer.name").unwrap();
        let mut level = crate::join::ResolveLevel {
            joins: &mut joins,
            scope: &mut scope,
        };
        crate::join::resolve_path(
            &metamodel,
            &mut level,
            None,
            &mut path,
            &ResolveOptions::clause(ClauseKind::Where),
        )
        .unwrap();

        assert_eq!(absolute_string(&path, &joins).unwrap(), "o.customer.name");
    }

    #[test]
    fn test_unresolved_path_fails_fast() {
        let joins = JoinManager::new("Order", "o");
        let path = entiq_expr::parse_path_expression("o.customer.name").unwrap();
        assert!(matches!(
            absolute_string(&path, &joins),
            Err(QueryError::UnresolvablePath { .. })
        ));
    }
}
