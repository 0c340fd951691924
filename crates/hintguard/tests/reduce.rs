use hintguard::{
    CheckConf, ClassBuilder, Hint, HintError, HintPosition, Object, ParamKind, ReduceContext, TypeVarDef,
    TypingForm, Validator, builtins, hints, reduce,
};
use pretty_assertions::assert_eq;

fn ctx() -> ReduceContext {
    ReduceContext::new(&CheckConf::new())
}

fn reduced(hint: &Hint) -> String {
    reduce(hint, &ctx()).unwrap().hint.repr()
}

fn corpus() -> Vec<Hint> {
    let t = TypeVarDef::new("T").bound(hints::int()).build();
    vec![
        hints::int(),
        hints::none(),
        hints::any(),
        hints::optional(hints::str()),
        hints::union(&[hints::int(), hints::union(&[hints::str(), hints::none()])]),
        hints::pipe(&[hints::int(), hints::str()]),
        hints::typing(TypingForm::List, vec![hints::int()]),
        hints::form(TypingForm::Dict),
        hints::new_type("UserId", "reduce_tests", hints::int()),
        t,
        hints::typing(TypingForm::Final, vec![hints::str()]),
        hints::form(TypingForm::LiteralString),
        hints::typing(TypingForm::TypeGuard, vec![hints::int()]),
        hints::annotated(hints::int(), [Validator::is_equal(1)]),
        hints::literal([Object::Int(1), Object::str("a")]),
        hints::tuple(&[hints::int(), hints::unpack(hints::tuple_of(hints::str()))]),
    ]
}

#[test]
fn reduction_is_idempotent() {
    for position in [HintPosition::Standalone, HintPosition::Return, HintPosition::Nested] {
        let ctx = ctx().at(position);
        for hint in corpus() {
            let once = reduce(&hint, &ctx).unwrap();
            let twice = reduce(&once.hint, &ctx).unwrap();
            assert_eq!(once.hint, twice.hint, "reducing {hint} at {position:?}");
            assert!(twice.validators.is_empty(), "validators split off twice for {hint}");
        }
    }
}

#[test]
fn optional_becomes_union_with_none() {
    assert_eq!(reduced(&hints::optional(hints::int())), "typing.Union[int, None]");
}

#[test]
fn nested_unions_flatten() {
    let hint = hints::union(&[hints::int(), hints::union(&[hints::str(), hints::none()])]);
    assert_eq!(reduced(&hint), "typing.Union[int, str, None]");
}

#[test]
fn pipe_union_keeps_its_spelling() {
    assert_eq!(reduced(&hints::pipe(&[hints::int(), hints::str()])), "int | str");
}

#[test]
fn union_containing_any_is_ignorable() {
    let hint = hints::union(&[hints::int(), hints::any()]);
    assert_eq!(reduce(&hint, &ctx()).unwrap().hint, hints::object());
}

#[test]
fn deprecated_aliases_become_builtin_generics() {
    assert_eq!(reduced(&hints::typing(TypingForm::List, vec![hints::int()])), "list[int]");
    assert_eq!(reduced(&hints::form(TypingForm::Dict)), "dict");
}

#[test]
fn new_type_reduces_to_supertype() {
    let user_id = hints::new_type("UserId", "reduce_tests", hints::int());
    assert_eq!(reduce(&user_id, &ctx()).unwrap().hint, hints::int());
}

#[test]
fn type_variables_reduce_to_bound_or_constraints() {
    let bounded = TypeVarDef::new("B").bound(hints::str()).build();
    assert_eq!(reduced(&bounded), "str");

    let constrained = TypeVarDef::new("C").constraints(vec![hints::int(), hints::bytes()]).build();
    assert_eq!(reduced(&constrained), "typing.Union[int, bytes]");

    let free = TypeVarDef::new("F").build();
    assert_eq!(reduce(&free, &ctx()).unwrap().hint, hints::object());
}

#[test]
fn type_variable_substitution_wins_over_bound() {
    let t = TypeVarDef::new("T").bound(hints::str()).build();
    let ctx = ctx().typevar(&t, hints::int());
    assert_eq!(reduce(&t, &ctx).unwrap().hint, hints::int());
}

#[test]
fn qualifiers_and_guards_unwrap() {
    assert_eq!(reduced(&hints::typing(TypingForm::ClassVar, vec![hints::int()])), "int");
    assert_eq!(reduced(&hints::typing(TypingForm::TypeGuard, vec![hints::int()])), "bool");
    assert_eq!(reduced(&hints::form(TypingForm::LiteralString)), "str");
}

#[test]
fn nested_annotated_validators_run_innermost_first() {
    let inner = Validator::is_equal(1);
    let outer = Validator::is_equal(2);
    let hint = hints::annotated(hints::annotated(hints::int(), [inner.clone()]), [outer.clone()]);
    let result = reduce(&hint, &ctx()).unwrap();
    assert_eq!(result.hint, hints::int());
    assert_eq!(result.validators.len(), 2);
    assert!(result.validators[0].ptr_eq(&inner));
    assert!(result.validators[1].ptr_eq(&outer));
}

#[test]
fn annotated_without_metadata_is_malformed() {
    let hint = hints::typing(TypingForm::Annotated, vec![hints::int()]);
    assert!(matches!(reduce(&hint, &ctx()), Err(HintError::Malformed { .. })));
}

#[test]
fn self_needs_an_enclosing_class() {
    let hint = hints::form(TypingForm::SelfType);
    assert!(matches!(reduce(&hint, &ctx()), Err(HintError::Malformed { .. })));

    let owner = ClassBuilder::new("Owner").module("reduce_tests").build().unwrap();
    let inside = ctx().push_class(&owner);
    assert_eq!(reduce(&hint, &inside).unwrap().hint, Hint::class(&owner));
}

#[test]
fn variadic_positions_wrap_the_hint() {
    let args = ctx().at(HintPosition::Param(ParamKind::VarPositional));
    assert_eq!(reduce(&hints::int(), &args).unwrap().hint.repr(), "tuple[int, ...]");

    let kwargs = ctx().at(HintPosition::Param(ParamKind::VarKeyword));
    assert_eq!(reduce(&hints::str(), &kwargs).unwrap().hint.repr(), "dict[str, str]");
}

#[test]
fn unpacked_variadics() {
    let args = ctx().at(HintPosition::Param(ParamKind::VarPositional));
    let ts = hints::type_var_tuple("Ts");
    assert_eq!(reduce(&hints::unpack(ts), &args).unwrap().hint, hints::object());

    let shaped = hints::tuple(&[hints::int(), hints::str()]);
    assert_eq!(reduce(&hints::unpack(shaped.clone()), &args).unwrap().hint, shaped);

    let kwargs = ctx().at(HintPosition::Param(ParamKind::VarKeyword));
    assert!(matches!(
        reduce(&hints::unpack(hints::int()), &kwargs),
        Err(HintError::Malformed { .. })
    ));

    let movie = ClassBuilder::new("Movie")
        .module("reduce_tests")
        .typed_dict(true)
        .annotation("title", hints::str())
        .build()
        .unwrap();
    assert_eq!(
        reduce(&hints::unpack(Hint::class(&movie)), &kwargs).unwrap().hint,
        Hint::class(&movie)
    );
}

#[test]
fn unpack_outside_variadics_is_malformed() {
    let hint = hints::unpack(hints::tuple_of(hints::int()));
    assert!(matches!(reduce(&hint, &ctx()), Err(HintError::Malformed { .. })));
    let param = ctx().at(HintPosition::Param(ParamKind::PositionalOrKeyword));
    assert!(matches!(reduce(&hint, &param), Err(HintError::Malformed { .. })));
}

#[test]
fn tuples_with_unpacked_items() {
    let one = hints::tuple(&[hints::int(), hints::unpack(hints::type_var_tuple("Ts"))]);
    assert_eq!(reduce(&one, &ctx()).unwrap().hint, Hint::class(&builtins().tuple));

    let two = hints::tuple(&[
        hints::unpack(hints::type_var_tuple("Ts")),
        hints::unpack(hints::type_var_tuple("Us")),
    ]);
    assert!(matches!(reduce(&two, &ctx()), Err(HintError::Malformed { .. })));
}

#[test]
fn no_return_only_as_return() {
    let hint = hints::form(TypingForm::NoReturn);
    assert_eq!(reduce(&hint, &ctx().at(HintPosition::Return)).unwrap().hint, hint);
    let param = ctx().at(HintPosition::Param(ParamKind::PositionalOrKeyword));
    assert!(matches!(reduce(&hint, &param), Err(HintError::Malformed { .. })));
}

#[test]
fn bare_union_forms_need_subscription() {
    for form in [TypingForm::Optional, TypingForm::Union, TypingForm::Literal] {
        assert!(matches!(reduce(&hints::form(form), &ctx()), Err(HintError::Malformed { .. })));
    }
}
