use hintguard::{
    CallError, CheckConf, CheckStrategy, ClassBuilder, Hint, Instance, Object, TypeVarDef, TypingForm, Validator,
    die_if_unbearable, hints, is_bearable,
};
use pretty_assertions::assert_eq;

const MODULE: &str = "generic_tests";

fn exhaustive() -> CheckConf {
    CheckConf::new().strategy(CheckStrategy::On).color(false)
}

fn bearable(value: &Object, hint: &Hint) -> bool {
    is_bearable(value, hint, &exhaustive()).unwrap()
}

/// The cause of the violation `value` raises against `hint`.
fn cause(value: &Object, hint: &Hint) -> String {
    match die_if_unbearable(value, hint, &exhaustive()) {
        Err(CallError::Violation(v)) => v.cause,
        other => panic!("expected a violation for {value} against {hint}, got {other:?}"),
    }
}

#[test]
fn user_generic_checks_fields_bound_to_type_parameters() {
    let t = TypeVarDef::new("T").build();
    let boxed = ClassBuilder::new("Box")
        .module(MODULE)
        .orig_base(hints::typing(TypingForm::Generic, vec![t.clone()]))
        .annotation("item", t)
        .annotation("label", hints::str())
        .build()
        .unwrap();
    let box_of_int = hints::generic(&boxed, vec![hints::int()]);

    let good = Instance::new(&boxed).attr("item", 1).attr("label", 2).into_object();
    assert!(bearable(&good, &box_of_int));

    let bad = Instance::new(&boxed).attr("item", "a").into_object();
    assert!(!bearable(&bad, &box_of_int));
    assert_eq!(cause(&bad, &box_of_int), "value.item str 'a' not instance of int");

    assert!(!bearable(&Object::Int(1), &box_of_int));
    assert!(bearable(&bad, &Hint::class(&boxed)));
}

#[test]
fn generic_with_wrong_arity_is_rejected() {
    let t = TypeVarDef::new("T").build();
    let boxed = ClassBuilder::new("Pair")
        .module(MODULE)
        .orig_base(hints::typing(TypingForm::Generic, vec![t]))
        .build()
        .unwrap();
    let hint = hints::generic(&boxed, vec![hints::int(), hints::str()]);
    assert!(matches!(
        is_bearable(&Object::None, &hint, &exhaustive()),
        Err(CallError::Hint(_))
    ));
}

#[test]
fn builtin_subclass_checks_its_subscripted_base() {
    let t = TypeVarDef::new("T").build();
    let bag = ClassBuilder::new("Bag")
        .module(MODULE)
        .orig_base(hints::list(t))
        .build()
        .unwrap();
    let ints = Instance::new(&bag)
        .payload(Object::from(vec![1, 2]))
        .into_object();
    let mixed = Instance::new(&bag)
        .payload(Object::List(vec![Object::Int(1), Object::str("a")]))
        .into_object();

    let bag_of_int = hints::generic(&bag, vec![hints::int()]);
    assert!(bearable(&ints, &bag_of_int));
    assert!(!bearable(&mixed, &bag_of_int));
    assert_eq!(cause(&mixed, &bag_of_int), "value[1] str 'a' not instance of int");

    // Unsubscripted, the type parameter is unconstrained.
    assert!(bearable(&mixed, &Hint::class(&bag)));
    assert!(!bearable(&Object::from(vec![1]), &Hint::class(&bag)));
}

#[test]
fn fixed_tuples_check_length_and_items() {
    let hint = hints::tuple(&[hints::int(), hints::str()]);
    assert!(bearable(&Object::Tuple(vec![Object::Int(1), Object::str("a")]), &hint));
    assert_eq!(
        cause(&Object::Tuple(vec![Object::Int(1), Object::Int(2)]), &hint),
        "value[1] int 2 not instance of str"
    );
    assert_eq!(cause(&Object::Tuple(vec![Object::Int(1)]), &hint), "tuple (1,) length 1 not 2");
    assert!(bearable(&Object::Tuple(vec![]), &hints::tuple(&[])));
    assert!(!bearable(&Object::List(vec![]), &hints::tuple(&[])));
}

#[test]
fn mapping_failures_name_the_key() {
    let hint = hints::dict(hints::str(), hints::int());
    assert_eq!(
        cause(&Object::dict([(Object::Int(1), Object::Int(2))]), &hint),
        "value key int 1 not instance of str"
    );
    assert_eq!(
        cause(&Object::dict([(Object::str("a"), Object::str("b"))]), &hint),
        "value['a'] str 'b' not instance of int"
    );
}

#[test]
fn union_descends_into_the_member_with_matching_origin() {
    let hint = hints::union(&[hints::list(hints::int()), hints::str()]);
    assert!(bearable(&Object::str("s"), &hint));
    assert!(bearable(&Object::from(vec![1]), &hint));
    assert_eq!(cause(&Object::from(vec!["a"]), &hint), "value[0] str 'a' not instance of int");
    assert_eq!(
        cause(&Object::Float(1.0), &hint),
        "float 1.0 matches no member of typing.Union[list[int], str]"
    );
}

#[test]
fn type_hints_check_subclasses() {
    let hint = hints::type_of(hints::int());
    let b = hintguard::builtins();
    assert!(bearable(&Object::Type(b.int.clone()), &hint));
    assert!(bearable(&Object::Type(b.bool_.clone()), &hint));
    assert!(!bearable(&Object::Type(b.str.clone()), &hint));
    assert_eq!(cause(&Object::Int(1), &hint), "int 1 not instance of type");

    let either = hints::type_of(hints::union(&[hints::int(), hints::str()]));
    assert!(bearable(&Object::Type(b.str.clone()), &either));
    assert!(!bearable(&Object::Type(b.float.clone()), &either));

    let any_class = hints::type_of(hints::any());
    assert!(bearable(&Object::Type(b.float.clone()), &any_class));
    assert!(!bearable(&Object::Float(1.0), &any_class));
}

#[test]
fn typed_dict_requires_its_keys() {
    let movie = ClassBuilder::new("Movie")
        .module(MODULE)
        .typed_dict(true)
        .annotation("title", hints::str())
        .annotation("year", hints::typing(TypingForm::NotRequired, vec![hints::int()]))
        .build()
        .unwrap();
    let hint = Hint::class(&movie);
    assert!(bearable(&Object::dict([(Object::str("title"), Object::str("Heat"))]), &hint));
    assert_eq!(
        cause(&Object::dict([(Object::str("year"), Object::Int(1995))]), &hint),
        "dict {'year': 1995} missing required key 'title'"
    );
    assert!(!bearable(&Object::from(vec!["title"]), &hint));
}

#[test]
fn validators_run_after_the_inner_check() {
    let positive = Validator::is("x > 0", |x| matches!(x, Object::Int(i) if *i > 0));
    let hint = hints::annotated(hints::int(), [positive]);
    assert!(bearable(&Object::Int(3), &hint));
    assert_eq!(cause(&Object::Int(-1), &hint), "int -1 violates validator Is[x > 0]");
    assert_eq!(cause(&Object::str("3"), &hint), "str '3' not instance of int");

    let in_list = hints::list(hints::annotated(hints::int(), [Validator::is_equal(1)]));
    assert_eq!(
        cause(&Object::from(vec![1, 2]), &in_list),
        "value[1] int 2 violates validator IsEqual[1]"
    );
}

#[test]
fn union_member_keeps_its_validators() {
    let small = Validator::is("x < 10", |x| matches!(x, Object::Int(i) if *i < 10));
    let hint = hints::union(&[hints::annotated(hints::int(), [small]), hints::str()]);
    assert!(bearable(&Object::Int(3), &hint));
    assert!(bearable(&Object::str("big"), &hint));
    assert!(!bearable(&Object::Int(30), &hint));
}

#[test]
fn enum_members_match_literals_by_identity() {
    let color = ClassBuilder::new("Color").module(MODULE).enumeration().build().unwrap();
    let red = Instance::enum_member(&color, "RED", 1);
    let green = Instance::enum_member(&color, "GREEN", 2);
    let hint = hints::literal([red.clone()]);
    assert!(bearable(&red, &hint));
    assert!(!bearable(&green, &hint));
    assert!(!bearable(&Object::Int(1), &hint));
}

#[test]
fn runtime_protocols_check_members() {
    let closeable = ClassBuilder::new("SupportsClose")
        .module(MODULE)
        .protocol()
        .runtime_checkable()
        .method("close")
        .build()
        .unwrap();
    let file = ClassBuilder::new("File").module(MODULE).method("close").build().unwrap();
    let hint = Hint::class(&closeable);
    assert!(bearable(&Instance::new(&file).into_object(), &hint));
    assert!(!bearable(&Object::Int(1), &hint));
}

#[test]
fn numeric_tower_is_opt_in() {
    let conf = exhaustive().pep484_tower(true);
    assert_eq!(is_bearable(&Object::Int(1), &hints::float(), &conf), Ok(true));
    assert_eq!(is_bearable(&Object::Int(1), &hints::complex(), &conf), Ok(true));
    assert_eq!(is_bearable(&Object::Int(1), &hints::float(), &exhaustive()), Ok(false));
    assert_eq!(is_bearable(&Object::Bool(true), &hints::int(), &exhaustive()), Ok(true));
}

#[test]
fn nested_containers_check_all_levels() {
    let hint = hints::dict(hints::str(), hints::list(hints::tuple_of(hints::int())));
    let good = Object::dict([(
        Object::str("k"),
        Object::List(vec![Object::Tuple(vec![Object::Int(1), Object::Int(2)])]),
    )]);
    assert!(bearable(&good, &hint));
    let bad = Object::dict([(
        Object::str("k"),
        Object::List(vec![Object::Tuple(vec![Object::Int(1), Object::str("x")])]),
    )]);
    assert_eq!(cause(&bad, &hint), "value['k'][0][1] str 'x' not instance of int");
}

#[test]
fn large_int_literals_and_equality_validators_compare_exactly() {
    let big = 9_007_199_254_740_993;
    let hint = hints::literal([Object::Int(big)]);
    assert!(bearable(&Object::Int(big), &hint));
    assert!(!bearable(&Object::Int(big - 1), &hint));

    let max = hints::annotated(hints::int(), [Validator::is_equal(i64::MAX)]);
    assert!(bearable(&Object::Int(i64::MAX), &max));
    assert!(!bearable(&Object::Int(i64::MAX - 1), &max));
    assert_eq!(
        cause(&Object::Int(i64::MAX - 1), &max),
        "int 9223372036854775806 violates validator IsEqual[9223372036854775807]"
    );
}

#[test]
fn literals_accept_subclass_instances_of_equal_value() {
    let user_id = ClassBuilder::new("UserId")
        .module(MODULE)
        .base(&hintguard::builtins().int)
        .build()
        .unwrap();
    let hint = hints::literal([Object::Int(1), Object::str("a")]);
    assert!(bearable(&Instance::new(&user_id).payload(Object::Int(1)).into_object(), &hint));
    assert!(!bearable(&Instance::new(&user_id).payload(Object::Int(2)).into_object(), &hint));
    assert!(!bearable(&Object::Bool(true), &hint));
    assert!(!bearable(&Object::Float(1.0), &hint));
}

#[test]
fn union_outcome_does_not_depend_on_member_order() {
    let pairs = [
        (hints::int(), hints::list(hints::str())),
        (hints::str(), hints::none()),
        (
            hints::dict(hints::str(), hints::int()),
            hints::tuple(&[hints::int(), hints::str()]),
        ),
        (hints::float(), hints::annotated(hints::int(), [Validator::is_equal(1)])),
    ];
    let values = [
        Object::Int(1),
        Object::Int(2),
        Object::Bool(true),
        Object::Float(1.0),
        Object::str("a"),
        Object::None,
        Object::from(vec!["a", "b"]),
        Object::from(vec![1]),
        Object::List(vec![]),
        Object::dict([(Object::str("k"), Object::Int(1))]),
        Object::dict([(Object::Int(1), Object::Int(1))]),
        Object::Tuple(vec![Object::Int(1), Object::str("a")]),
        Object::Tuple(vec![Object::str("a"), Object::Int(1)]),
    ];
    for (a, b) in &pairs {
        let forward = hints::union(&[a.clone(), b.clone()]);
        let backward = hints::union(&[b.clone(), a.clone()]);
        for value in &values {
            assert_eq!(
                bearable(value, &forward),
                bearable(value, &backward),
                "{value} against {forward}"
            );
        }
    }
}
