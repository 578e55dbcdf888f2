//! Property reads, indexer reads and object initializers.

use exprtree_core::{
    CompileError, CompileResult, Expr, ExprKind, IndexExpr, Member, MemberExpr, MemberInitExpr,
};

use super::{call_typed, Normalizer};

/// Fields are kept; a property read becomes a call to its getter.
pub(super) fn normalize_member(n: &mut Normalizer<'_>, node: &MemberExpr) -> CompileResult<Expr> {
    match &node.member {
        Member::Field(_) => Ok(Expr::Member(MemberExpr {
            instance: n.visit_opt(node.instance.as_deref())?,
            member: node.member.clone(),
            data_type: node.data_type.clone(),
        })),
        Member::Property(prop) => {
            let Some(getter) = prop.getter.clone() else {
                return Err(CompileError::unsupported(
                    ExprKind::Member,
                    format!("property {}::{} has no getter", prop.declaring_type, prop.name),
                ));
            };
            tracing::trace!(property = %prop.name, getter = %getter, "rewrite property read");
            let call = call_typed(
                node.instance.as_deref().cloned(),
                getter,
                Vec::new(),
                &node.data_type,
            );
            n.visit(&call)
        }
    }
}

/// `obj[args]` through an indexer becomes `obj.get_Item(args)`.
///
/// An index node with no indexer is passed through with its children
/// normalized; the code generator rejects it.
pub(super) fn normalize_index(n: &mut Normalizer<'_>, node: &IndexExpr) -> CompileResult<Expr> {
    let Some(indexer) = &node.indexer else {
        return Ok(Expr::Index(IndexExpr {
            instance: Box::new(n.visit(&node.instance)?),
            indexer: None,
            arguments: n.visit_all(&node.arguments)?,
            data_type: node.data_type.clone(),
        }));
    };

    let getter = match &indexer.getter {
        Some(getter) if getter.is_special_name() => getter.clone(),
        Some(getter) => {
            return Err(CompileError::unsupported(
                ExprKind::Index,
                format!("indexer getter {getter} is not a special-name accessor"),
            ));
        }
        None => {
            return Err(CompileError::unsupported(
                ExprKind::Index,
                format!("indexer {}::{} has no getter", indexer.declaring_type, indexer.name),
            ));
        }
    };

    tracing::trace!(indexer = %indexer.name, getter = %getter, "rewrite indexer read");
    let call = call_typed(
        Some(node.instance.as_ref().clone()),
        getter,
        node.arguments.clone(),
        &node.data_type,
    );
    n.visit(&call)
}

/// `new T(args) { a = x, b = y }`  =>  `{ tmp; tmp = new T(args); tmp.a = x; tmp.b = y; tmp }`
///
/// Bindings are applied in order, after construction.
pub(super) fn normalize_member_init(
    n: &mut Normalizer<'_>,
    node: &MemberInitExpr,
) -> CompileResult<Expr> {
    let ty = &node.data_type;
    tracing::trace!(ty = %ty, bindings = node.bindings.len(), "rewrite member init");

    let tmp = n.fresh("init", ty);
    let mut body = Vec::with_capacity(node.bindings.len() + 2);
    body.push(Expr::assign(
        Expr::variable(&tmp),
        Expr::New(node.new_expr.clone()),
    ));
    for binding in &node.bindings {
        let target = Expr::member(Some(Expr::variable(&tmp)), binding.member.clone());
        body.push(Expr::assign(target, binding.value.clone()));
    }
    body.push(Expr::variable(&tmp));

    let rewritten = Expr::block_typed(vec![tmp], body, ty.clone());
    n.visit(&rewritten)
}

#[cfg(test)]
mod tests {
    use exprtree_core::{
        BinaryOp, ConstructorDef, DataType, FieldDef, MemberBinding, MethodDef, MethodTraits,
        NewExpr, NoOperators, PropertyDef, VarId, Variable,
    };
    use pretty_assertions::assert_eq;

    use super::*;

    fn normalize(tree: &Expr) -> CompileResult<Expr> {
        Normalizer::new(&NoOperators).normalize(tree)
    }

    #[test]
    fn property_read_calls_getter() {
        let user = DataType::class("User");
        let getter = MethodDef::new(&user, "get_Name", vec![], DataType::string())
            .with_traits(MethodTraits::SPECIAL_NAME)
            .into_ref();
        let name = PropertyDef::new(&user, "Name", DataType::string(), vec![])
            .with_getter(getter.clone())
            .into_ref();
        let u = Variable::new(VarId(0), "u", user);

        let out = normalize(&Expr::property(Some(Expr::variable(&u)), name)).unwrap();
        assert_eq!(out, Expr::call(Some(Expr::variable(&u)), getter, vec![]));
    }

    #[test]
    fn write_only_property_read_is_rejected() {
        let user = DataType::class("User");
        let setter = MethodDef::new(&user, "set_Secret", vec![DataType::string()], DataType::void())
            .into_ref();
        let secret = PropertyDef::new(&user, "Secret", DataType::string(), vec![])
            .with_setter(setter)
            .into_ref();

        let err = normalize(&Expr::property(None, secret)).unwrap_err();
        assert_eq!(err.kind(), ExprKind::Member);
        assert!(err.to_string().contains("has no getter"));
    }

    #[test]
    fn indexer_read_calls_special_name_getter() {
        let map = DataType::class("Map");
        let getter = MethodDef::new(&map, "get_Item", vec![DataType::string()], DataType::int32())
            .with_traits(MethodTraits::SPECIAL_NAME)
            .into_ref();
        let item = PropertyDef::new(&map, "Item", DataType::int32(), vec![DataType::string()])
            .with_getter(getter.clone())
            .into_ref();
        let m = Variable::new(VarId(0), "m", map);

        let tree = Expr::index(Expr::variable(&m), item, vec![Expr::string("k")]);
        let out = normalize(&tree).unwrap();
        assert_eq!(
            out,
            Expr::call(Some(Expr::variable(&m)), getter, vec![Expr::string("k")])
        );
    }

    #[test]
    fn indexer_with_plain_getter_is_rejected() {
        let map = DataType::class("Map");
        let getter = MethodDef::new(&map, "Lookup", vec![DataType::string()], DataType::int32())
            .into_ref();
        let item = PropertyDef::new(&map, "Item", DataType::int32(), vec![DataType::string()])
            .with_getter(getter)
            .into_ref();
        let m = Variable::new(VarId(0), "m", map);

        let tree = Expr::index(Expr::variable(&m), item, vec![Expr::string("k")]);
        let err = normalize(&tree).unwrap_err();
        assert_eq!(err.kind(), ExprKind::Index);
    }

    #[test]
    fn member_init_assigns_bindings_in_order() {
        let point = DataType::structure("Point");
        let x = FieldDef::new(&point, "x", DataType::int32(), 0).into_ref();
        let y = FieldDef::new(&point, "y", DataType::int32(), 1).into_ref();
        let ctor = ConstructorDef::new(&point, vec![]).into_ref();

        let tree = Expr::member_init(
            NewExpr::new(ctor.clone(), vec![]),
            vec![
                MemberBinding::new(y.clone(), Expr::int(2)),
                MemberBinding::new(x.clone(), Expr::int(1)),
            ],
        );
        let out = normalize(&tree).unwrap();

        let tmp = Variable::new(VarId(0), "init0", point.clone());
        let expected = Expr::block_typed(
            vec![tmp.clone()],
            vec![
                Expr::assign(Expr::variable(&tmp), Expr::new_object(ctor, vec![])),
                Expr::assign(Expr::field(Some(Expr::variable(&tmp)), y), Expr::int(2)),
                Expr::assign(Expr::field(Some(Expr::variable(&tmp)), x), Expr::int(1)),
                Expr::variable(&tmp),
            ],
            point,
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn member_init_property_binding_goes_through_setter() {
        let shape = DataType::class("Shape");
        let setter = MethodDef::new(&shape, "set_Sides", vec![DataType::int32()], DataType::void())
            .with_traits(MethodTraits::SPECIAL_NAME)
            .into_ref();
        let sides = PropertyDef::new(&shape, "Sides", DataType::int32(), vec![])
            .with_setter(setter.clone())
            .into_ref();
        let ctor = ConstructorDef::new(&shape, vec![]).into_ref();

        let tree = Expr::member_init(
            NewExpr::new(ctor, vec![]),
            vec![MemberBinding::new(sides, Expr::int(3))],
        );
        let out = normalize(&tree).unwrap();

        let Expr::Block(block) = &out else {
            panic!("expected block, got {out:?}");
        };
        // construct, set, yield
        assert_eq!(block.body.len(), 3);
        assert_eq!(block.body[0].kind(), ExprKind::Binary(BinaryOp::Assign));
        let Expr::Block(setter_block) = &block.body[1] else {
            panic!("expected setter block, got {:?}", block.body[1]);
        };
        let Expr::Call(call) = &setter_block.body[0] else {
            panic!("expected setter call, got {:?}", setter_block.body[0]);
        };
        assert_eq!(call.method, setter);
        assert_eq!(out.data_type(), &shape);
    }
}
