//! Assignment targets.
//!
//! Variables and fields are stored to directly. Property and indexer targets
//! become setter calls; because an assignment is also an expression, the
//! assigned value is parked in a fresh local and yielded after the call:
//!
//! ```text
//! obj.P = v    =>   { tmp; obj.set_P(tmp = v); tmp }
//! obj[i] = v   =>   { tmp; obj.set_Item(i, tmp = v); tmp }
//! ```

use exprtree_core::{
    BinaryExpr, CompileError, CompileResult, Expr, IndexExpr, Member, MemberExpr, PropertyRef,
};

use super::Normalizer;

pub(super) fn normalize_assign(
    n: &mut Normalizer<'_>,
    expr: &Expr,
    node: &BinaryExpr,
) -> CompileResult<Expr> {
    match node.left.as_ref() {
        Expr::Variable(_) => Ok(Expr::Binary(BinaryExpr {
            op: node.op,
            left: node.left.clone(),
            right: Box::new(n.visit(&node.right)?),
            data_type: node.data_type.clone(),
        })),
        Expr::Member(target) => match &target.member {
            Member::Field(_) => Ok(Expr::Binary(BinaryExpr {
                op: node.op,
                left: Box::new(Expr::Member(MemberExpr {
                    instance: n.visit_opt(target.instance.as_deref())?,
                    member: target.member.clone(),
                    data_type: target.data_type.clone(),
                })),
                right: Box::new(n.visit(&node.right)?),
                data_type: node.data_type.clone(),
            })),
            Member::Property(prop) => {
                let instance = target.instance.as_deref().cloned();
                assign_through_setter(n, expr, node, prop, instance, Vec::new())
            }
        },
        Expr::Index(IndexExpr {
            instance,
            indexer: Some(indexer),
            arguments,
            ..
        }) => assign_through_setter(
            n,
            expr,
            node,
            indexer,
            Some(instance.as_ref().clone()),
            arguments.clone(),
        ),
        other => Err(CompileError::unsupported(
            expr.kind(),
            format!("cannot assign to a {} node", other.kind()),
        )),
    }
}

fn assign_through_setter(
    n: &mut Normalizer<'_>,
    expr: &Expr,
    node: &BinaryExpr,
    prop: &PropertyRef,
    instance: Option<Expr>,
    mut arguments: Vec<Expr>,
) -> CompileResult<Expr> {
    let Some(setter) = prop.setter.clone() else {
        return Err(CompileError::unsupported(
            expr.kind(),
            format!("property {}::{} has no setter", prop.declaring_type, prop.name),
        ));
    };
    if prop.is_indexer() && !setter.is_special_name() {
        return Err(CompileError::unsupported(
            expr.kind(),
            format!("indexer setter {setter} is not a special-name accessor"),
        ));
    }

    tracing::trace!(property = %prop.name, ty = %node.data_type, "assign through setter");
    let tmp = n.fresh("assign", &node.data_type);
    arguments.push(Expr::assign(Expr::variable(&tmp), node.right.as_ref().clone()));
    let rewritten = Expr::block_typed(
        vec![tmp.clone()],
        vec![
            Expr::call(instance, setter, arguments),
            Expr::variable(&tmp),
        ],
        node.data_type.clone(),
    );
    n.visit(&rewritten)
}
