use crate::{
    analyse::{analyse_expression, analyse_system},
    error::Handler,
    expr::{
        evaluate::Interpreter, AssignOp, BinaryOp, Expr, ExprKey, IncDecOp, PathOp, UnaryOp,
    },
    range::Range,
    span::{empty_span, Span},
    symbols::{Frame, Symbol},
    system::{
        Edge, Function, Instance, Location, Progress, Stmt, Sync, SyncDir, System, Template,
        Variable,
    },
    types::{Base, Prefix, Type},
};

fn sp() -> Span {
    empty_span()
}

fn run(system: &mut System) -> (Vec<String>, Vec<String>) {
    let handler = Handler::default();
    let _ = analyse_system(system, &handler);
    let (errors, warnings) = handler.consume();
    (
        errors.iter().map(|err| err.to_string()).collect(),
        warnings.iter().map(|warning| warning.to_string()).collect(),
    )
}

fn check_expr(system: &mut System, expr: ExprKey) -> Vec<String> {
    let handler = Handler::default();
    let _ = analyse_expression(system, expr, &handler);
    let (errors, _) = handler.consume();
    errors.iter().map(|err| err.to_string()).collect()
}

fn assert_no_errors(errors: &[String]) {
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

fn assert_error(errors: &[String], needle: &str) {
    assert!(
        errors.iter().any(|err| err.contains(needle)),
        "expected an error containing `{needle}`, got {errors:?}"
    );
}

fn declare_global(system: &mut System, name: &str, ty: Type, init: Option<ExprKey>) -> Symbol {
    let uid = system.globals.frame.add(name, ty);
    system.globals.variables.push(Variable {
        uid: uid.clone(),
        init,
    });
    uid
}

fn int_range(system: &mut System, lower: i32, upper: i32) -> Type {
    let lower = system.exprs.constant(lower, sp());
    let upper = system.exprs.constant(upper, sp());
    Type::integer(lower, upper)
}

fn add_template(system: &mut System, name: &str, parameters: Frame) -> usize {
    let uid = system
        .globals
        .frame
        .add(name, Type::template(parameters.clone()));
    system.templates.push(Template::new(uid, parameters));
    system.templates.len() - 1
}

fn add_instance(system: &mut System, template: usize, mapping: Vec<(Symbol, ExprKey)>) {
    let template_uid = system.templates[template].uid.clone();
    let uid = system.globals.frame.add("inst", Type::instance());
    system.instances.push(Instance {
        uid,
        template: template_uid,
        mapping,
        span: sp(),
    });
}

// Constant declarations feed the valuation, bounded declarations pick their
// range up from it, and assignments annotate as integers.
#[test]
fn bounded_declaration_and_assignment() {
    let mut system = System::new();

    let three = system.exprs.constant(3, sp());
    let n = declare_global(
        &mut system,
        "N",
        Type::int().set_prefix(Prefix::Constant, true),
        Some(three),
    );

    let zero = system.exprs.constant(0, sp());
    let n_ref = system.exprs.ident(&n, sp());
    let x = declare_global(&mut system, "x", Type::integer(zero, n_ref), None);

    let (errors, warnings) = run(&mut system);
    assert_no_errors(&errors);
    assert!(warnings.is_empty());

    let interp = Interpreter::new(&system.exprs, &system.constants);
    assert_eq!(
        interp.evaluate_range(x.ty().range().unwrap()),
        Ok(Range::new(0, 3))
    );

    let x_ref = system.exprs.ident(&x, sp());
    let two = system.exprs.constant(2, sp());
    let assign = system.exprs.assign(AssignOp::Assign, x_ref, two, sp());
    assert_no_errors(&check_expr(&mut system, assign));
    assert_eq!(system.exprs.ty(assign).base(), Base::Int);
}

#[test]
fn out_of_range_initialiser_is_rejected() {
    let mut system = System::new();
    let ty = int_range(&mut system, 0, 3);
    let five = system.exprs.constant(5, sp());
    declare_global(&mut system, "x", ty, Some(five));

    let (errors, _) = run(&mut system);
    assert_error(&errors, "initialiser is out of range");
}

#[test]
fn clock_guard_on_urgent_edge_is_rejected() {
    let mut system = System::new();
    let a = declare_global(
        &mut system,
        "a",
        Type::channel().set_prefix(Prefix::Urgent, true),
        None,
    );
    let c = declare_global(&mut system, "c", Type::clock(), None);

    let template = add_template(&mut system, "T", Frame::new());
    let mut edge = Edge::new(sp());
    let c_ref = system.exprs.ident(&c, sp());
    let one = system.exprs.constant(1, sp());
    edge.guard = Some(system.exprs.binary(BinaryOp::Ge, c_ref, one, sp()));
    let a_ref = system.exprs.ident(&a, sp());
    edge.sync = Some(Sync {
        channel: a_ref,
        dir: SyncDir::Send,
        span: sp(),
    });
    system.templates[template].edges.push(edge);

    let (errors, _) = run(&mut system);
    assert_error(&errors, "clock guards are not allowed on urgent edges");
}

#[test]
fn data_guard_on_urgent_edge_is_accepted() {
    let mut system = System::new();
    let a = declare_global(
        &mut system,
        "a",
        Type::channel().set_prefix(Prefix::Urgent, true),
        None,
    );
    let ty = int_range(&mut system, 0, 9);
    let x = declare_global(&mut system, "x", ty, None);

    let template = add_template(&mut system, "T", Frame::new());
    let mut edge = Edge::new(sp());
    let x_ref = system.exprs.ident(&x, sp());
    let two = system.exprs.constant(2, sp());
    edge.guard = Some(system.exprs.binary(BinaryOp::Lt, x_ref, two, sp()));
    let a_ref = system.exprs.ident(&a, sp());
    edge.sync = Some(Sync {
        channel: a_ref,
        dir: SyncDir::Send,
        span: sp(),
    });
    system.templates[template].edges.push(edge);

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);
}

#[test]
fn clock_guard_on_broadcast_receiver_is_rejected() {
    let mut system = System::new();
    let b = declare_global(
        &mut system,
        "b",
        Type::channel().set_prefix(Prefix::Broadcast, true),
        None,
    );
    let c = declare_global(&mut system, "c", Type::clock(), None);

    let template = add_template(&mut system, "T", Frame::new());
    let mut edge = Edge::new(sp());
    let c_ref = system.exprs.ident(&c, sp());
    let one = system.exprs.constant(1, sp());
    edge.guard = Some(system.exprs.binary(BinaryOp::Ge, c_ref, one, sp()));
    let b_ref = system.exprs.ident(&b, sp());
    edge.sync = Some(Sync {
        channel: b_ref,
        dir: SyncDir::Receive,
        span: sp(),
    });
    system.templates[template].edges.push(edge);

    let (errors, _) = run(&mut system);
    assert_error(&errors, "clock guards are not allowed on broadcast receivers");
}

// `struct { int a; int b; } r = { b = 2, a = 1 };` is accepted and the
// initializer is rewritten into field-declaration order.
#[test]
fn record_initialiser_is_reordered() {
    let mut system = System::new();
    let fields = Frame::new();
    fields.add("a", Type::int());
    fields.add("b", Type::int());
    let record = Type::record(fields);

    let two = system.exprs.constant(2, sp());
    let one = system.exprs.constant(1, sp());
    let init = system.exprs.list(
        vec![(Some("b".to_string()), two), (Some("a".to_string()), one)],
        sp(),
    );
    declare_global(&mut system, "r", record.clone(), Some(init));

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);

    let normalized = system.globals.variables[0].init.unwrap();
    assert_ne!(normalized, init);
    assert_eq!(*system.exprs.ty(normalized), record);
    match system.exprs.get(normalized) {
        Expr::List { elements, .. } => {
            assert!(elements.iter().all(|(name, _)| name.is_none()));
            let values: Vec<i32> = elements
                .iter()
                .map(|(_, key)| match system.exprs.get(*key) {
                    Expr::Constant { value, .. } => *value,
                    other => panic!("unexpected element {other:?}"),
                })
                .collect();
            assert_eq!(values, vec![1, 2]);
        }
        other => panic!("unexpected initialiser {other:?}"),
    }
}

#[test]
fn record_initialiser_field_errors() {
    let mut system = System::new();
    let fields = Frame::new();
    fields.add("a", Type::int());
    fields.add("b", Type::int());

    // Unknown field name.
    let one = system.exprs.constant(1, sp());
    let init = system
        .exprs
        .list(vec![(Some("nope".to_string()), one)], sp());
    declare_global(&mut system, "r", Type::record(fields.clone()), Some(init));
    let (errors, _) = run(&mut system);
    assert_error(&errors, "unknown field");

    // Same field written twice.
    let mut system = System::new();
    let one = system.exprs.constant(1, sp());
    let two = system.exprs.constant(2, sp());
    let init = system.exprs.list(
        vec![(Some("a".to_string()), one), (Some("a".to_string()), two)],
        sp(),
    );
    declare_global(&mut system, "r", Type::record(fields), Some(init));
    let (errors, _) = run(&mut system);
    assert_error(&errors, "multiple initialisers for field");
}

// A location invariant `c <= 10 && cost' == 2` keeps `c <= 10` and exposes
// the rate binding `(cost, 2)`.
#[test]
fn invariant_splits_into_residual_and_rates() {
    let mut system = System::new();
    let c = declare_global(&mut system, "c", Type::clock(), None);
    let cost = declare_global(&mut system, "cost", Type::cost(), None);

    let template = add_template(&mut system, "T", Frame::new());

    let c_ref = system.exprs.ident(&c, sp());
    let ten = system.exprs.constant(10, sp());
    let pure = system.exprs.binary(BinaryOp::Le, c_ref, ten, sp());

    let cost_ref = system.exprs.ident(&cost, sp());
    let rate = system.exprs.rate_of(cost_ref, sp());
    let two = system.exprs.constant(2, sp());
    let binding = system.exprs.binary(BinaryOp::Eq, rate, two, sp());

    let invariant = system.exprs.binary(BinaryOp::And, pure, binding, sp());

    let uid = system.templates[template]
        .declarations
        .frame
        .add("L0", Type::location());
    system.templates[template]
        .locations
        .push(Location::new(uid, Some(invariant), sp()));

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);

    let location = &system.templates[template].locations[0];
    assert_eq!(location.invariant, Some(pure));
    assert_eq!(location.rates, vec![(cost_ref, two)]);
    assert_eq!(location.cost_rate, Some(two));
    assert_eq!(system.exprs.ty(invariant).base(), Base::InvariantWr);
}

// `const int[0,10] &k` instantiated with a global `int[0,20]` variable.
#[test]
fn reference_argument_outside_formal_range_is_rejected() {
    let mut system = System::new();
    let g_ty = int_range(&mut system, 0, 20);
    let g = declare_global(&mut system, "g", g_ty, None);

    let parameters = Frame::new();
    let k_ty = int_range(&mut system, 0, 10)
        .set_prefix(Prefix::Constant, true)
        .set_prefix(Prefix::Reference, true);
    let k = parameters.add("k", k_ty);

    let template = add_template(&mut system, "T", parameters);
    let g_ref = system.exprs.ident(&g, sp());
    add_instance(&mut system, template, vec![(k, g_ref)]);

    let (errors, _) = run(&mut system);
    assert_error(
        &errors,
        "range of argument is outside of the range of the formal parameter",
    );
}

#[test]
fn reference_argument_with_matching_range_is_accepted() {
    let mut system = System::new();
    let g_ty = int_range(&mut system, 0, 10);
    let g = declare_global(&mut system, "g", g_ty, None);

    let parameters = Frame::new();
    let k_ty = int_range(&mut system, 0, 10).set_prefix(Prefix::Reference, true);
    let k = parameters.add("k", k_ty);

    let template = add_template(&mut system, "T", parameters);
    let g_ref = system.exprs.ident(&g, sp());
    add_instance(&mut system, template, vec![(k, g_ref)]);

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);
}

#[test]
fn value_argument_is_checked_against_formal_range() {
    let mut system = System::new();

    let parameters = Frame::new();
    let k_ty = int_range(&mut system, 0, 3).set_prefix(Prefix::Constant, true);
    let k = parameters.add("k", k_ty);

    let template = add_template(&mut system, "T", parameters);
    let seven = system.exprs.constant(7, sp());
    add_instance(&mut system, template, vec![(k, seven)]);

    let (errors, _) = run(&mut system);
    assert_error(
        &errors,
        "range of argument is outside of the range of the formal parameter",
    );
}

#[test]
fn value_parameters_coerce_between_bool_and_int() {
    let mut system = System::new();

    let parameters = Frame::new();
    let flag = parameters.add(
        "flag",
        Type::boolean().set_prefix(Prefix::Constant, true),
    );

    let template = add_template(&mut system, "T", parameters);
    let one = system.exprs.constant(1, sp());
    add_instance(&mut system, template, vec![(flag, one)]);

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);
}

#[test]
fn channel_argument_needs_the_formal_capability() {
    let mut system = System::new();
    let urgent = declare_global(
        &mut system,
        "u",
        Type::channel().set_prefix(Prefix::Urgent, true),
        None,
    );

    let parameters = Frame::new();
    let ch = parameters.add(
        "ch",
        Type::channel().set_prefix(Prefix::Reference, true),
    );

    let template = add_template(&mut system, "T", parameters);
    let u_ref = system.exprs.ident(&urgent, sp());
    add_instance(&mut system, template, vec![(ch, u_ref)]);

    let (errors, _) = run(&mut system);
    assert_error(&errors, "incompatible channel type");
}

#[test]
fn plain_channel_satisfies_urgent_formal() {
    let mut system = System::new();
    let plain = declare_global(&mut system, "p", Type::channel(), None);

    let parameters = Frame::new();
    let ch = parameters.add(
        "ch",
        Type::channel()
            .set_prefix(Prefix::Urgent, true)
            .set_prefix(Prefix::Reference, true),
    );

    let template = add_template(&mut system, "T", parameters);
    let p_ref = system.exprs.ident(&plain, sp());
    add_instance(&mut system, template, vec![(ch, p_ref)]);

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);
}

// Distinct scalar sets of the same size are distinct types.
#[test]
fn scalars_from_different_sets_cannot_be_compared() {
    let mut system = System::new();
    let zero = system.exprs.constant(0, sp());
    let four = system.exprs.constant(4, sp());
    let set_a = Type::scalar_set(zero, four);
    let zero = system.exprs.constant(0, sp());
    let four = system.exprs.constant(4, sp());
    let set_b = Type::scalar_set(zero, four);

    let x = declare_global(&mut system, "x", set_a.clone(), None);
    let y = declare_global(&mut system, "y", set_b, None);
    let z = declare_global(&mut system, "z", set_a, None);

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);

    let x_ref = system.exprs.ident(&x, sp());
    let y_ref = system.exprs.ident(&y, sp());
    let cmp = system.exprs.binary(BinaryOp::Eq, x_ref, y_ref, sp());
    assert_error(
        &check_expr(&mut system, cmp),
        "scalars can only be compared to scalars of the same scalarset",
    );

    let x_ref = system.exprs.ident(&x, sp());
    let z_ref = system.exprs.ident(&z, sp());
    let cmp = system.exprs.binary(BinaryOp::Eq, x_ref, z_ref, sp());
    assert_no_errors(&check_expr(&mut system, cmp));
    assert_eq!(system.exprs.ty(cmp).base(), Base::Bool);
}

// `p --> q` over boolean state predicates is a well-formed property.
#[test]
fn leads_to_property_is_a_constraint() {
    let mut system = System::new();
    let p = declare_global(&mut system, "p", Type::boolean(), None);
    let q = declare_global(&mut system, "q", Type::boolean(), None);

    let p_ref = system.exprs.ident(&p, sp());
    let q_ref = system.exprs.ident(&q, sp());
    let property = system.exprs.leads_to(p_ref, q_ref, sp());
    system.properties.push(property);

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);
    assert_eq!(system.exprs.ty(property).base(), Base::Constraint);
}

#[test]
fn property_with_side_effect_is_rejected() {
    let mut system = System::new();
    let x = declare_global(&mut system, "x", Type::int(), None);

    let x_ref = system.exprs.ident(&x, sp());
    let one = system.exprs.constant(1, sp());
    let update = system.exprs.assign(AssignOp::Assign, x_ref, one, sp());
    let property = system.exprs.quantified(PathOp::Possibly, update, sp());
    system.properties.push(property);

    let (errors, _) = run(&mut system);
    assert_error(&errors, "property must be side effect free");
}

#[test]
fn deadlock_is_a_valid_property() {
    let mut system = System::new();
    let deadlock = system.exprs.deadlock(sp());
    let property = system.exprs.quantified(PathOp::Invariantly, deadlock, sp());
    system.properties.push(property);

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);
}

#[test]
fn clock_expressions_classify_along_the_lattice() {
    let mut system = System::new();
    let c = declare_global(&mut system, "c", Type::clock(), None);
    let d = declare_global(&mut system, "d", Type::clock(), None);

    let cases: Vec<(ExprKey, Base)> = {
        let c_ref = system.exprs.ident(&c, sp());
        let one = system.exprs.constant(1, sp());
        let sum = system.exprs.binary(BinaryOp::Add, c_ref, one, sp());

        let c_ref = system.exprs.ident(&c, sp());
        let d_ref = system.exprs.ident(&d, sp());
        let diff = system.exprs.binary(BinaryOp::Sub, c_ref, d_ref, sp());

        let three = system.exprs.constant(3, sp());
        let diff_le = system.exprs.binary(BinaryOp::Le, diff, three, sp());

        let c_ref = system.exprs.ident(&c, sp());
        let five = system.exprs.constant(5, sp());
        let upper = system.exprs.binary(BinaryOp::Lt, c_ref, five, sp());

        let c_ref = system.exprs.ident(&c, sp());
        let five = system.exprs.constant(5, sp());
        let lower = system.exprs.binary(BinaryOp::Lt, five, c_ref, sp());

        let c_ref = system.exprs.ident(&c, sp());
        let d_ref = system.exprs.ident(&d, sp());
        let equal = system.exprs.binary(BinaryOp::Eq, c_ref, d_ref, sp());

        let c_ref = system.exprs.ident(&c, sp());
        let three = system.exprs.constant(3, sp());
        let unequal = system.exprs.binary(BinaryOp::Ne, c_ref, three, sp());

        let negated = system.exprs.unary(UnaryOp::Not, unequal, sp());

        vec![
            (sum, Base::Clock),
            (diff, Base::Diff),
            (diff_le, Base::Invariant),
            (upper, Base::Invariant),
            (lower, Base::Guard),
            (equal, Base::Guard),
            (unequal, Base::Constraint),
            (negated, Base::Constraint),
        ]
    };

    for (expr, expected) in cases {
        assert_no_errors(&check_expr(&mut system, expr));
        assert_eq!(system.exprs.ty(expr).base(), expected, "for {expr:?}");
    }
}

#[test]
fn clocks_do_not_multiply() {
    let mut system = System::new();
    let c = declare_global(&mut system, "c", Type::clock(), None);

    let c_ref = system.exprs.ident(&c, sp());
    let two = system.exprs.constant(2, sp());
    let product = system.exprs.binary(BinaryOp::Mul, c_ref, two, sp());

    assert_error(
        &check_expr(&mut system, product),
        "invalid operands to binary operator",
    );
    assert!(system.exprs.ty(product).is_unknown());
}

#[test]
fn assignment_requires_a_variable_target() {
    let mut system = System::new();
    let x = declare_global(&mut system, "x", Type::int(), None);

    let five = system.exprs.constant(5, sp());
    let x_ref = system.exprs.ident(&x, sp());
    let assign = system.exprs.assign(AssignOp::Assign, five, x_ref, sp());

    assert_error(
        &check_expr(&mut system, assign),
        "left hand side value expected",
    );
}

#[test]
fn constants_are_not_assignable() {
    let mut system = System::new();
    let one = system.exprs.constant(1, sp());
    let n = declare_global(
        &mut system,
        "N",
        Type::int().set_prefix(Prefix::Constant, true),
        Some(one),
    );

    let n_ref = system.exprs.ident(&n, sp());
    let two = system.exprs.constant(2, sp());
    let assign = system.exprs.assign(AssignOp::Assign, n_ref, two, sp());

    assert_error(
        &check_expr(&mut system, assign),
        "left hand side value expected",
    );
}

// An inline if is only an updatable location when both branches are declared
// over syntactically identical ranges.
#[test]
fn inline_if_as_assignment_target() {
    let mut system = System::new();
    let b = declare_global(&mut system, "b", Type::boolean(), None);
    let x_ty = int_range(&mut system, 0, 3);
    let x = declare_global(&mut system, "x", x_ty, None);
    let y_ty = int_range(&mut system, 0, 3);
    let y = declare_global(&mut system, "y", y_ty, None);
    let z_ty = int_range(&mut system, 0, 4);
    let z = declare_global(&mut system, "z", z_ty, None);

    let b_ref = system.exprs.ident(&b, sp());
    let x_ref = system.exprs.ident(&x, sp());
    let y_ref = system.exprs.ident(&y, sp());
    let select = system.exprs.inline_if(b_ref, x_ref, y_ref, sp());
    let one = system.exprs.constant(1, sp());
    let assign = system.exprs.assign(AssignOp::Assign, select, one, sp());
    assert_no_errors(&check_expr(&mut system, assign));

    let b_ref = system.exprs.ident(&b, sp());
    let x_ref = system.exprs.ident(&x, sp());
    let z_ref = system.exprs.ident(&z, sp());
    let select = system.exprs.inline_if(b_ref, x_ref, z_ref, sp());
    let one = system.exprs.constant(1, sp());
    let assign = system.exprs.assign(AssignOp::Assign, select, one, sp());
    assert_error(
        &check_expr(&mut system, assign),
        "left hand side value expected",
    );
}

#[test]
fn increment_requires_an_integer_location() {
    let mut system = System::new();
    let x = declare_global(&mut system, "x", Type::int(), None);
    let c = declare_global(&mut system, "c", Type::clock(), None);

    let x_ref = system.exprs.ident(&x, sp());
    let bump = system.exprs.inc_dec(IncDecOp::PreIncrement, x_ref, sp());
    assert_no_errors(&check_expr(&mut system, bump));
    assert_eq!(system.exprs.ty(bump).base(), Base::Int);

    let c_ref = system.exprs.ident(&c, sp());
    let bump = system.exprs.inc_dec(IncDecOp::PreIncrement, c_ref, sp());
    assert_error(&check_expr(&mut system, bump), "integer expression expected");
}

#[test]
fn cost_supports_only_additive_updates() {
    let mut system = System::new();
    let cost = declare_global(&mut system, "cost", Type::cost(), None);

    let cost_ref = system.exprs.ident(&cost, sp());
    let two = system.exprs.constant(2, sp());
    let add = system
        .exprs
        .assign(AssignOp::AddAssign, cost_ref, two, sp());
    assert_no_errors(&check_expr(&mut system, add));
    assert_eq!(system.exprs.ty(add).base(), Base::Cost);

    let cost_ref = system.exprs.ident(&cost, sp());
    let two = system.exprs.constant(2, sp());
    let sub = system
        .exprs
        .assign(AssignOp::SubAssign, cost_ref, two, sp());
    assert_error(
        &check_expr(&mut system, sub),
        "non-value types must use the regular assignment operator",
    );
}

#[test]
fn records_are_assignment_compatible_by_identity() {
    let mut system = System::new();
    let fields_a = Frame::new();
    fields_a.add("v", Type::int());
    let fields_b = Frame::new();
    fields_b.add("v", Type::int());

    let r1 = declare_global(&mut system, "r1", Type::record(fields_a.clone()), None);
    let r2 = declare_global(&mut system, "r2", Type::record(fields_b), None);
    let r3 = declare_global(&mut system, "r3", Type::record(fields_a), None);

    let r1_ref = system.exprs.ident(&r1, sp());
    let r2_ref = system.exprs.ident(&r2, sp());
    let assign = system.exprs.assign(AssignOp::Assign, r1_ref, r2_ref, sp());
    assert_error(
        &check_expr(&mut system, assign),
        "incompatible types in assignment",
    );

    let r1_ref = system.exprs.ident(&r1, sp());
    let r3_ref = system.exprs.ident(&r3, sp());
    let assign = system.exprs.assign(AssignOp::Assign, r1_ref, r3_ref, sp());
    assert_no_errors(&check_expr(&mut system, assign));
}

#[test]
fn array_initialiser_arity_must_match() {
    let mut system = System::new();

    let size = int_range(&mut system, 0, 2);
    let short: Vec<_> = (1..=2)
        .map(|v| (None, system.exprs.constant(v, sp())))
        .collect();
    let init = system.exprs.list(short, sp());
    declare_global(&mut system, "a", Type::array(Type::int(), size), Some(init));
    let (errors, _) = run(&mut system);
    assert_error(&errors, "missing fields in initialiser");

    let mut system = System::new();
    let size = int_range(&mut system, 0, 2);
    let long: Vec<_> = (1..=4)
        .map(|v| (None, system.exprs.constant(v, sp())))
        .collect();
    let init = system.exprs.list(long, sp());
    declare_global(&mut system, "a", Type::array(Type::int(), size), Some(init));
    let (errors, _) = run(&mut system);
    assert_error(&errors, "excess elements in array initialiser");
}

#[test]
fn array_initialiser_is_normalized_to_the_declared_type() {
    let mut system = System::new();
    let size = int_range(&mut system, 0, 2);
    let ty = Type::array(Type::int(), size);
    let elements: Vec<_> = (1..=3)
        .map(|v| (None, system.exprs.constant(v, sp())))
        .collect();
    let init = system.exprs.list(elements, sp());
    declare_global(&mut system, "a", ty.clone(), Some(init));

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);

    let normalized = system.globals.variables[0].init.unwrap();
    assert_eq!(*system.exprs.ty(normalized), ty);
    match system.exprs.get(normalized) {
        Expr::List { elements, .. } => assert_eq!(elements.len(), 3),
        other => panic!("unexpected initialiser {other:?}"),
    }
}

#[test]
fn constant_array_index_is_bounds_checked() {
    let mut system = System::new();
    let size = int_range(&mut system, 0, 2);
    let arr = declare_global(&mut system, "arr", Type::array(Type::int(), size), None);

    let arr_ref = system.exprs.ident(&arr, sp());
    let five = system.exprs.constant(5, sp());
    let index = system.exprs.index(arr_ref, five, sp());
    assert_error(&check_expr(&mut system, index), "array index out of range");

    let arr_ref = system.exprs.ident(&arr, sp());
    let one = system.exprs.constant(1, sp());
    let index = system.exprs.index(arr_ref, one, sp());
    assert_no_errors(&check_expr(&mut system, index));
    assert_eq!(system.exprs.ty(index).base(), Base::Int);
}

#[test]
fn scalar_indexed_arrays_demand_the_same_set() {
    let mut system = System::new();
    let zero = system.exprs.constant(0, sp());
    let four = system.exprs.constant(4, sp());
    let set_a = Type::scalar_set(zero, four);
    let zero = system.exprs.constant(0, sp());
    let four = system.exprs.constant(4, sp());
    let set_b = Type::scalar_set(zero, four);

    let arr = declare_global(
        &mut system,
        "arr",
        Type::array(Type::int(), set_a.clone()),
        None,
    );
    let i = declare_global(&mut system, "i", set_a, None);
    let j = declare_global(&mut system, "j", set_b, None);

    let arr_ref = system.exprs.ident(&arr, sp());
    let i_ref = system.exprs.ident(&i, sp());
    let index = system.exprs.index(arr_ref, i_ref, sp());
    assert_no_errors(&check_expr(&mut system, index));

    let arr_ref = system.exprs.ident(&arr, sp());
    let j_ref = system.exprs.ident(&j, sp());
    let index = system.exprs.index(arr_ref, j_ref, sp());
    assert_error(&check_expr(&mut system, index), "incompatible array index");
}

#[test]
fn inverted_declared_range_is_rejected() {
    let mut system = System::new();
    let ty = int_range(&mut system, 5, 0);
    declare_global(&mut system, "x", ty, None);

    let (errors, _) = run(&mut system);
    assert_error(&errors, "invalid integer range");
}

#[test]
fn parameterised_bounds_are_rejected_inside_records() {
    let mut system = System::new();

    let parameters = Frame::new();
    let n = parameters.add("N", Type::int().set_prefix(Prefix::Constant, true));
    let template = add_template(&mut system, "T", parameters);

    let fields = Frame::new();
    let zero = system.exprs.constant(0, sp());
    let n_ref = system.exprs.ident(&n, sp());
    fields.add("v", Type::integer(zero, n_ref));

    let uid = system.templates[template]
        .declarations
        .frame
        .add("r", Type::record(fields));
    system.templates[template]
        .declarations
        .variables
        .push(Variable { uid, init: None });

    let (errors, _) = run(&mut system);
    assert_error(&errors, "parameterised types are not allowed in records");
}

#[test]
fn parameterised_bounds_are_tolerated_outside_records() {
    let mut system = System::new();

    let parameters = Frame::new();
    let n = parameters.add("N", Type::int().set_prefix(Prefix::Constant, true));
    let template = add_template(&mut system, "T", parameters);

    let zero = system.exprs.constant(0, sp());
    let n_ref = system.exprs.ident(&n, sp());
    let uid = system.templates[template]
        .declarations
        .frame
        .add("v", Type::integer(zero, n_ref));
    system.templates[template]
        .declarations
        .variables
        .push(Variable { uid, init: None });

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);
}

// A guard calling a function that writes a global is not side effect free.
#[test]
fn effects_are_seen_through_function_calls() {
    let mut system = System::new();
    let x = declare_global(&mut system, "x", Type::int(), None);

    let parameters = Frame::new();
    let f = system
        .globals
        .frame
        .add("f", Type::function(parameters.clone(), Type::int()));

    let x_ref = system.exprs.ident(&x, sp());
    let one = system.exprs.constant(1, sp());
    let update = system.exprs.assign(AssignOp::Assign, x_ref, one, sp());
    let zero = system.exprs.constant(0, sp());
    let body = Stmt::Block {
        frame: Frame::with_parent(&parameters),
        decls: Vec::new(),
        stmts: vec![Stmt::Expr(update), Stmt::Return { value: Some(zero) }],
    };
    system.globals.functions.push(Function::new(f.clone(), body));

    let template = add_template(&mut system, "T", Frame::new());
    let mut edge = Edge::new(sp());
    let f_ref = system.exprs.ident(&f, sp());
    let call = system.exprs.call(f_ref, Vec::new(), sp());
    let one = system.exprs.constant(1, sp());
    edge.guard = Some(system.exprs.binary(BinaryOp::Eq, call, one, sp()));
    system.templates[template].edges.push(edge);

    let (errors, _) = run(&mut system);
    assert_error(&errors, "guard must be side effect free");

    let function = &system.globals.functions[0];
    assert!(function.changes.contains(&x));
    assert!(function.depends.contains(&x));
}

#[test]
fn call_arity_is_checked() {
    let mut system = System::new();
    let parameters = Frame::new();
    parameters.add("v", Type::int());
    let f = system
        .globals
        .frame
        .add("f", Type::function(parameters.clone(), Type::int()));
    system.globals.functions.push(Function::new(
        f.clone(),
        Stmt::Block {
            frame: Frame::with_parent(&parameters),
            decls: Vec::new(),
            stmts: vec![Stmt::Return { value: None }],
        },
    ));

    let f_ref = system.exprs.ident(&f, sp());
    let call = system.exprs.call(f_ref, Vec::new(), sp());
    assert_error(&check_expr(&mut system, call), "too few arguments");

    let f_ref = system.exprs.ident(&f, sp());
    let one = system.exprs.constant(1, sp());
    let two = system.exprs.constant(2, sp());
    let call = system.exprs.call(f_ref, vec![one, two], sp());
    assert_error(&check_expr(&mut system, call), "too many arguments");
}

#[test]
fn ineffective_updates_are_warned_about() {
    let mut system = System::new();
    let x = declare_global(&mut system, "x", Type::int(), None);

    let template = add_template(&mut system, "T", Frame::new());

    let mut edge = Edge::new(sp());
    let x_ref = system.exprs.ident(&x, sp());
    let one = system.exprs.constant(1, sp());
    edge.assign = Some(system.exprs.binary(BinaryOp::Eq, x_ref, one, sp()));
    system.templates[template].edges.push(edge);

    // The literal `1` is the conventional empty update and stays silent.
    let mut edge = Edge::new(sp());
    edge.assign = Some(system.exprs.constant(1, sp()));
    system.templates[template].edges.push(edge);

    let (errors, warnings) = run(&mut system);
    assert_no_errors(&errors);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("does not have any effect"));
}

#[test]
fn progress_measures_must_be_values() {
    let mut system = System::new();
    let c = declare_global(&mut system, "c", Type::clock(), None);

    let template = add_template(&mut system, "T", Frame::new());
    let measure = system.exprs.ident(&c, sp());
    system.templates[template].progress.push(Progress {
        guard: None,
        measure,
        span: sp(),
    });

    let (errors, _) = run(&mut system);
    assert_error(&errors, "progress measure must evaluate to a value");
}

#[test]
fn forall_classifies_and_must_be_pure() {
    let mut system = System::new();
    let c = declare_global(&mut system, "c", Type::clock(), None);
    let x = declare_global(&mut system, "x", Type::int(), None);

    let binder = Frame::new();
    let i_ty = int_range(&mut system, 0, 3);
    let i = binder.add("i", i_ty);

    let c_ref = system.exprs.ident(&c, sp());
    let ten = system.exprs.constant(10, sp());
    let body = system.exprs.binary(BinaryOp::Le, c_ref, ten, sp());
    let forall = system.exprs.forall(&i, body, sp());
    assert_no_errors(&check_expr(&mut system, forall));
    assert_eq!(system.exprs.ty(forall).base(), Base::Invariant);

    let x_ref = system.exprs.ident(&x, sp());
    let one = system.exprs.constant(1, sp());
    let update = system.exprs.assign(AssignOp::Assign, x_ref, one, sp());
    let forall = system.exprs.forall(&i, update, sp());
    assert_error(
        &check_expr(&mut system, forall),
        "expression must be side effect free",
    );
}

#[test]
fn unique_references_see_through_constant_indices() {
    let mut system = System::new();
    let size = int_range(&mut system, 0, 3);
    let arr = declare_global(&mut system, "arr", Type::array(Type::int(), size), None);
    let runtime = declare_global(&mut system, "i", Type::int(), None);

    let parameters = Frame::new();
    let r_ty = Type::int().set_prefix(Prefix::Reference, true);
    let r = parameters.add("r", r_ty);
    let template = add_template(&mut system, "T", parameters);

    // arr[i] with runtime i is an LHS value but not a unique reference.
    let arr_ref = system.exprs.ident(&arr, sp());
    let i_ref = system.exprs.ident(&runtime, sp());
    let element = system.exprs.index(arr_ref, i_ref, sp());
    add_instance(&mut system, template, vec![(r.clone(), element)]);

    let (errors, _) = run(&mut system);
    assert_error(&errors, "incompatible argument");

    // arr[1] is fine.
    let mut system = System::new();
    let size = int_range(&mut system, 0, 3);
    let arr = declare_global(&mut system, "arr", Type::array(Type::int(), size), None);
    let parameters = Frame::new();
    let r_ty = Type::int().set_prefix(Prefix::Reference, true);
    let r = parameters.add("r", r_ty);
    let template = add_template(&mut system, "T", parameters);

    let arr_ref = system.exprs.ident(&arr, sp());
    let one = system.exprs.constant(1, sp());
    let element = system.exprs.index(arr_ref, one, sp());
    add_instance(&mut system, template, vec![(r, element)]);

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);
}

#[test]
fn comma_takes_the_type_of_its_right_side() {
    let mut system = System::new();
    let x = declare_global(&mut system, "x", Type::int(), None);
    let c = declare_global(&mut system, "c", Type::clock(), None);

    let x_ref = system.exprs.ident(&x, sp());
    let one = system.exprs.constant(1, sp());
    let update = system.exprs.assign(AssignOp::Assign, x_ref, one, sp());
    let c_ref = system.exprs.ident(&c, sp());
    let comma = system.exprs.comma(update, c_ref, sp());

    assert_no_errors(&check_expr(&mut system, comma));
    assert_eq!(system.exprs.ty(comma).base(), Base::Clock);
}

// Analysing an already analysed system changes nothing further.
#[test]
fn analysis_is_idempotent() {
    let mut system = System::new();
    let fields = Frame::new();
    fields.add("a", Type::int());
    fields.add("b", Type::int());
    let record = Type::record(fields);

    let two = system.exprs.constant(2, sp());
    let one = system.exprs.constant(1, sp());
    let init = system.exprs.list(
        vec![(Some("b".to_string()), two), (Some("a".to_string()), one)],
        sp(),
    );
    declare_global(&mut system, "r", record, Some(init));

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);
    let first = system.globals.variables[0].init.unwrap();

    let (errors, _) = run(&mut system);
    assert_no_errors(&errors);
    let second = system.globals.variables[0].init.unwrap();

    assert!(system.exprs.syntactically_equal(first, second));
    match (system.exprs.get(first), system.exprs.get(second)) {
        (Expr::List { elements: a, .. }, Expr::List { elements: b, .. }) => {
            assert_eq!(a, b);
        }
        _ => panic!("expected normalized lists"),
    }
}

#[test]
fn block_locals_are_checked_and_normalized() {
    let mut system = System::new();

    let parameters = Frame::new();
    let f = system
        .globals
        .frame
        .add("f", Type::function(parameters.clone(), Type::void()));

    let block_frame = Frame::with_parent(&parameters);
    let local_ty = int_range(&mut system, 0, 3);
    let local = block_frame.add("v", local_ty);
    let nine = system.exprs.constant(9, sp());

    let body = Stmt::Block {
        frame: block_frame,
        decls: vec![Variable {
            uid: local,
            init: Some(nine),
        }],
        stmts: vec![Stmt::Return { value: None }],
    };
    system.globals.functions.push(Function::new(f, body));

    let (errors, _) = run(&mut system);
    assert_error(&errors, "initialiser is out of range");
}

#[test]
fn function_statements_reject_foreign_types() {
    let mut system = System::new();
    let c = declare_global(&mut system, "c", Type::clock(), None);

    let parameters = Frame::new();
    let f = system
        .globals
        .frame
        .add("f", Type::function(parameters.clone(), Type::void()));

    // A bare guard expression is not a statement.
    let c_ref = system.exprs.ident(&c, sp());
    let five = system.exprs.constant(5, sp());
    let guard = system.exprs.binary(BinaryOp::Lt, c_ref, five, sp());

    let body = Stmt::Block {
        frame: Frame::with_parent(&parameters),
        decls: Vec::new(),
        stmts: vec![Stmt::Expr(guard)],
    };
    system.globals.functions.push(Function::new(f, body));

    let (errors, _) = run(&mut system);
    assert_error(&errors, "invalid expression in function");
}

#[test]
fn loop_conditions_must_be_values() {
    let mut system = System::new();
    let c = declare_global(&mut system, "c", Type::clock(), None);

    let parameters = Frame::new();
    let f = system
        .globals
        .frame
        .add("f", Type::function(parameters.clone(), Type::void()));

    let c_ref = system.exprs.ident(&c, sp());
    let five = system.exprs.constant(5, sp());
    let cond = system.exprs.binary(BinaryOp::Lt, c_ref, five, sp());

    let body = Stmt::Block {
        frame: Frame::with_parent(&parameters),
        decls: Vec::new(),
        stmts: vec![Stmt::While {
            cond,
            body: Box::new(Stmt::Empty),
        }],
    };
    system.globals.functions.push(Function::new(f, body));

    let (errors, _) = run(&mut system);
    assert_error(&errors, "boolean expected");
}

#[test]
fn rate_applies_to_costs_only() {
    let mut system = System::new();
    let x = declare_global(&mut system, "x", Type::int(), None);

    let x_ref = system.exprs.ident(&x, sp());
    let rate = system.exprs.rate_of(x_ref, sp());
    assert_error(
        &check_expr(&mut system, rate),
        "rate can only be applied to cost variables",
    );
}
