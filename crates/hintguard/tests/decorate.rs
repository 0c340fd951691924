use hintguard::{
    BoundArgs, CallError, CallResult, Callable, CheckConf, CheckStrategy, ClassBuilder, DecorationError, Decorator,
    FunctionBuilder, HintError, HintSign, Instance, Module, Object, Parameter, RecordingTracer, TraceEvent, TypingForm,
    ViolationSite, die_if_unbearable, hints, is_bearable, linecache, modules,
};
use pretty_assertions::assert_eq;

const MODULE: &str = "decorate_tests";

fn plain() -> CheckConf {
    CheckConf::new().color(false)
}

fn decorate(callable: &Callable) -> Callable {
    Decorator::new(plain()).decorate(callable).unwrap()
}

fn repr_body(args: &BoundArgs) -> CallResult<Object> {
    Ok(Object::str(args.get("x").map(Object::repr).unwrap_or_default()))
}

fn sum_body(args: &BoundArgs) -> CallResult<Object> {
    let Some(Object::List(items)) = args.get("x") else {
        return Err(CallError::raised("TypeError", "expected a list"));
    };
    let mut total = 0;
    for item in items {
        match item {
            Object::Int(i) => total += i,
            other => {
                return Err(CallError::raised(
                    "TypeError",
                    format!("unsupported operand type(s) for +: 'int' and '{}'", other.type_name()),
                ));
            }
        }
    }
    Ok(Object::Int(total))
}

/// `def f(x: int) -> str: return str(x)`
fn int_to_str() -> Callable {
    FunctionBuilder::new("f")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::int()))
        .returns(hints::str())
        .body(repr_body)
        .build()
        .unwrap()
}

fn violation(result: CallResult<Object>) -> hintguard::Violation {
    match result {
        Err(CallError::Violation(v)) => v,
        other => panic!("expected a violation, got {other:?}"),
    }
}

#[test]
fn checked_call_passes_valid_arguments_through() {
    let f = decorate(&int_to_str());
    assert!(f.is_checked());
    assert_eq!(f.call_args(vec![Object::Int(5)]).unwrap(), Object::str("5"));
}

#[test]
fn wrong_argument_names_the_parameter() {
    let f = decorate(&int_to_str());
    let v = violation(f.call_args(vec![Object::str("a")]));
    assert_eq!(v.param(), Some("x"));
    assert_eq!(v.function, "f");
    assert_eq!(v.hint, "int");
    assert_eq!(
        v.to_string(),
        "Function f() parameter x='a' violates type hint int, as str 'a' not instance of int."
    );
}

#[test]
fn wrong_return_value_is_reported_at_return() {
    let f = FunctionBuilder::new("f")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::int()))
        .returns(hints::str())
        .body(|args| Ok(args.get("x").cloned().unwrap_or(Object::None)))
        .build()
        .unwrap();
    let v = violation(decorate(&f).call_args(vec![Object::Int(1)]));
    assert_eq!(v.site, ViolationSite::Return);
    assert_eq!(v.param(), None);
    assert_eq!(
        v.to_string(),
        "Function f() return 1 violates type hint str, as int 1 not instance of str."
    );
}

#[test]
fn single_item_list_is_checked_deterministically() {
    let g = FunctionBuilder::new("g")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::list(hints::int())))
        .returns(hints::int())
        .body(sum_body)
        .build()
        .unwrap();
    let g = decorate(&g);
    assert_eq!(g.call_args(vec![Object::from(vec![1, 2, 3])]).unwrap(), Object::Int(6));
    for _ in 0..20 {
        let v = violation(g.call_args(vec![Object::from(vec!["a"])]));
        assert_eq!(
            v.to_string(),
            "Function g() parameter x=['a'] violates type hint list[int], as x[0] str 'a' not instance of int."
        );
    }
}

#[test]
fn sampled_list_eventually_catches_bad_item() {
    let g = FunctionBuilder::new("g")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::list(hints::int())))
        .returns(hints::int())
        .body(sum_body)
        .build()
        .unwrap();
    let g = decorate(&g);
    let mixed = Object::List(vec![Object::Int(1), Object::str("2"), Object::Int(3)]);
    let (mut violations, mut raised) = (0, 0);
    for _ in 0..300 {
        match g.call_args(vec![mixed.clone()]) {
            Err(CallError::Violation(v)) => {
                assert_eq!(v.cause, "x[1] str '2' not instance of int");
                violations += 1;
            }
            Err(CallError::Raised { exc_type, .. }) => {
                assert_eq!(exc_type, "TypeError");
                raised += 1;
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert!(violations > 0);
    assert!(raised > 0);
}

#[test]
fn literal_matches_value_and_type() {
    let h = FunctionBuilder::new("h")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::literal([Object::Int(1), Object::str("two"), Object::None])))
        .returns(hints::bool())
        .body(|_| Ok(Object::Bool(true)))
        .build()
        .unwrap();
    let h = decorate(&h);
    for ok in [Object::Int(1), Object::str("two"), Object::None] {
        assert_eq!(h.call_args(vec![ok]).unwrap(), Object::Bool(true));
    }
    for bad in [Object::Int(2), Object::Float(1.0), Object::Bool(true), Object::str("three")] {
        let v = violation(h.call_args(vec![bad]));
        assert_eq!(v.param(), Some("x"));
        assert_eq!(v.hint, "typing.Literal[1, 'two', None]");
    }
}

#[test]
fn malformed_hint_leaves_original_untouched() {
    let original = FunctionBuilder::new("broken")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::int()))
        .param(Parameter::positional("y").hint(hints::typing(TypingForm::Annotated, vec![hints::int()])))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    let err = Decorator::new(plain()).decorate(&original).unwrap_err();
    assert!(matches!(err.hint_error(), Some(HintError::Malformed { .. })));
    assert!(err.to_string().starts_with("Function broken() parameter \"y\" type hint invalid: "));
    assert!(!original.is_checked());
    assert_eq!(original.call_args(vec![Object::str("a"), Object::str("b")]).unwrap(), Object::None);
}

#[test]
fn non_hint_annotation_is_rejected() {
    let original = FunctionBuilder::new("nonsense")
        .module(MODULE)
        .returns(hintguard::Hint::value(5))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    let err = Decorator::new(plain()).decorate(&original).unwrap_err();
    assert!(matches!(
        err,
        DecorationError::Hint { ref site, error: HintError::NotAHint { .. }, .. } if site == "return"
    ));
}

#[test]
fn decorating_twice_returns_the_same_wrapper() {
    let mut decorator = Decorator::new(plain());
    let once = decorator.decorate(&int_to_str()).unwrap();
    let twice = decorator.decorate(&once).unwrap();
    assert!(once.ptr_eq(&twice));
}

#[test]
fn disabled_strategy_returns_the_original() {
    let original = int_to_str();
    let decorated = Decorator::new(plain().strategy(CheckStrategy::O0))
        .decorate(&original)
        .unwrap();
    assert!(decorated.ptr_eq(&original));
    assert_eq!(decorated.call_args(vec![Object::str("a")]).unwrap(), Object::str("'a'"));
}

#[test]
fn no_type_check_function_is_returned_unchanged() {
    let original = FunctionBuilder::new("exempt")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::int()))
        .body(|_| Ok(Object::None))
        .no_type_check()
        .build()
        .unwrap();
    assert!(decorate(&original).ptr_eq(&original));
}

#[test]
fn no_type_check_module_exempts_its_functions() {
    modules().register(Module::new("decorate_tests_exempt").no_type_check());
    let original = FunctionBuilder::new("f")
        .module("decorate_tests_exempt")
        .param(Parameter::positional("x").hint(hints::int()))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    assert!(decorate(&original).ptr_eq(&original));
}

#[test]
fn unannotated_and_ignorable_hints_produce_no_wrapper() {
    let bare = FunctionBuilder::new("bare")
        .module(MODULE)
        .param(Parameter::positional("x"))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    assert!(decorate(&bare).ptr_eq(&bare));

    let anything = FunctionBuilder::new("anything")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::any()))
        .param(Parameter::positional("y").hint(hints::object()))
        .returns(hints::optional(hints::any()))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    assert!(decorate(&anything).ptr_eq(&anything));
}

#[test]
fn variadic_positional_checks_every_item_exhaustively() {
    let v = FunctionBuilder::new("v")
        .module(MODULE)
        .param(Parameter::var_positional("args").hint(hints::int()))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    let v = Decorator::new(plain().strategy(CheckStrategy::On)).decorate(&v).unwrap();
    assert_eq!(v.call_args(vec![Object::Int(1), Object::Int(2)]).unwrap(), Object::None);
    assert_eq!(v.call_args(vec![]).unwrap(), Object::None);
    let err = violation(v.call_args(vec![Object::Int(1), Object::str("x")]));
    assert_eq!(
        err.to_string(),
        "Function v() parameter args=(1, 'x') violates type hint tuple[int, ...], as args[1] str 'x' not instance of int."
    );
}

#[test]
fn variadic_keyword_checks_values() {
    let k = FunctionBuilder::new("k")
        .module(MODULE)
        .param(Parameter::var_keyword("kw").hint(hints::int()))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    let k = decorate(&k);
    assert_eq!(k.call(vec![], vec![("a".to_owned(), Object::Int(1))]).unwrap(), Object::None);
    let err = violation(k.call(vec![], vec![("a".to_owned(), Object::str("x"))]));
    assert_eq!(err.param(), Some("kw"));
    assert_eq!(err.hint, "dict[str, int]");
    assert_eq!(err.cause, "kw['a'] str 'x' not instance of int");
}

#[test]
fn defaults_are_trusted_but_passed_values_are_checked() {
    let d = FunctionBuilder::new("d")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::int()).default("not an int"))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    let d = decorate(&d);
    assert_eq!(d.call_args(vec![]).unwrap(), Object::None);
    assert_eq!(d.call_args(vec![Object::Int(3)]).unwrap(), Object::None);
    assert_eq!(violation(d.call_args(vec![Object::str("s")])).param(), Some("x"));
}

#[test]
fn binding_errors_surface_before_checks() {
    let f = decorate(&int_to_str());
    assert!(matches!(
        f.call_args(vec![Object::Int(1), Object::Int(2)]),
        Err(CallError::Bind(_))
    ));
    assert!(matches!(f.call_args(vec![]), Err(CallError::Bind(_))));
}

#[test]
fn exceptions_from_the_body_propagate() {
    let f = FunctionBuilder::new("boom")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::int()))
        .body(|_| Err(CallError::raised("ValueError", "boom")))
        .build()
        .unwrap();
    assert_eq!(
        decorate(&f).call_args(vec![Object::Int(1)]),
        Err(CallError::raised("ValueError", "boom"))
    );
}

#[test]
fn no_return_rejects_any_return() {
    let n = FunctionBuilder::new("n")
        .module(MODULE)
        .returns(hints::form(TypingForm::NoReturn))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    let v = violation(decorate(&n).call_args(vec![]));
    assert_eq!(v.site, ViolationSite::Return);
    assert!(v.cause.ends_with("returned despite typing.NoReturn"), "{}", v.cause);
}

#[test]
fn no_return_as_parameter_hint_is_malformed() {
    let n = FunctionBuilder::new("n")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::form(TypingForm::NoReturn)))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    let err = Decorator::new(plain()).decorate(&n).unwrap_err();
    assert!(matches!(err.hint_error(), Some(HintError::Malformed { .. })));
}

#[test]
fn wrapper_source_mirrors_the_signature() {
    let f = decorate(&int_to_str());
    let checked = f.checked().unwrap();
    assert_eq!(
        checked.source(),
        "def f(x):\n    if not isinstance(x, int):\n        raise __hg_violation('x', x)\n    __hg_return = __hg_func(x)\n    if not isinstance(__hg_return, str):\n        raise __hg_violation('return', __hg_return)\n    return __hg_return\n"
    );
    assert!(checked.filename().starts_with("<@hintguard(decorate_tests.f) at 0x"));
}

#[test]
fn wrapper_source_keeps_markers_and_defaults() {
    let k = FunctionBuilder::new("k")
        .module(MODULE)
        .param(Parameter::positional_only("a").hint(hints::int()))
        .param(Parameter::positional("b").hint(hints::str()).default("z"))
        .param(Parameter::keyword_only("c").hint(hints::int()))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    let k = decorate(&k);
    let checked = k.checked().unwrap();
    assert_eq!(
        checked.source(),
        "def k(a, /, b=__hg_default_b, *, c):\n    if not isinstance(a, int):\n        raise __hg_violation('a', a)\n    if b is not __hg_default_b and not isinstance(b, str):\n        raise __hg_violation('b', b)\n    if not isinstance(c, int):\n        raise __hg_violation('c', c)\n    __hg_return = __hg_func(a, b, c=c)\n    return __hg_return\n"
    );
    assert!(checked.scope().get("__hg_default_b").is_some());
    assert_eq!(
        k.call(vec![Object::Int(1)], vec![("c".to_owned(), Object::Int(2))]).unwrap(),
        Object::None
    );
}

#[test]
fn sampling_wrapper_draws_random_once() {
    let g = FunctionBuilder::new("g")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::list(hints::int())))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    let g = decorate(&g);
    let source = g.checked().unwrap().source();
    assert_eq!(source.matches("__hg_getrandbits(32)").count(), 1);
    assert_eq!(source.lines().nth(1), Some("    __hg_random = __hg_getrandbits(32)"));
}

#[test]
fn wrapper_source_is_registered_in_line_cache() {
    let f = decorate(&int_to_str());
    let checked = f.checked().unwrap();
    assert_eq!(linecache::lookup(checked.filename()).as_deref(), Some(checked.source()));
    assert_eq!(linecache::getline(checked.filename(), 1).as_deref(), Some("def f(x):"));
    assert_eq!(linecache::getline(checked.filename(), 0), None);
}

#[test]
fn colored_messages_highlight_hint_and_value() {
    let f = Decorator::new(CheckConf::new().color(true))
        .decorate(&int_to_str())
        .unwrap();
    let v = violation(f.call_args(vec![Object::str("a")]));
    assert_eq!(
        v.to_string(),
        "Function f() parameter x=\x1b[1;31m'a'\x1b[0m violates type hint \x1b[1;32mint\x1b[0m, as str 'a' not instance of int."
    );
    assert_eq!(v.value_repr, "'a'");
}

#[test]
fn recording_tracer_sees_every_phase() {
    let f = FunctionBuilder::new("t")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::optional(hints::int())))
        .returns(hints::int())
        .body(|_| Ok(Object::Int(0)))
        .build()
        .unwrap();
    let mut decorator = Decorator::with_tracer(plain(), RecordingTracer::new());
    let checked = decorator.decorate(&f).unwrap();
    let filename = checked.checked().unwrap().filename().to_owned();
    let events = decorator.tracer().events();

    assert_eq!(
        events[0],
        TraceEvent::Reduce {
            hint: "typing.Optional[int]".to_owned(),
            reduced: "typing.Union[int, None]".to_owned(),
        }
    );
    assert_eq!(
        events[1],
        TraceEvent::Classify {
            hint: "typing.Union[int, None]".to_owned(),
            sign: HintSign::Union,
        }
    );
    assert!(matches!(&events[2], TraceEvent::Generate { site, .. } if site == "x"));
    assert_eq!(
        events[3..].to_vec(),
        vec![
            TraceEvent::Classify {
                hint: "int".to_owned(),
                sign: HintSign::Isinstanceable,
            },
            TraceEvent::Generate {
                site: "return".to_owned(),
                check: "isinstance(__hg_return, int)".to_owned(),
            },
            TraceEvent::Synthesize {
                function: "t".to_owned(),
                filename,
            },
        ]
    );
}

#[test]
fn method_self_resolves_to_the_owner() {
    let point = ClassBuilder::new("Point").module(MODULE).build().unwrap();
    let same = FunctionBuilder::new("same")
        .module(MODULE)
        .qualname("Point.same")
        .param(Parameter::positional("self"))
        .param(Parameter::positional("other").hint(hints::form(TypingForm::SelfType)))
        .returns(hints::bool())
        .body(|_| Ok(Object::Bool(true)))
        .build()
        .unwrap();

    assert!(Decorator::new(plain()).decorate(&same).is_err());

    let checked = Decorator::new(plain()).decorate_method(&same, &point).unwrap();
    let p = Instance::new(&point).into_object();
    assert_eq!(checked.call_args(vec![p.clone(), p.clone()]).unwrap(), Object::Bool(true));
    let v = violation(checked.call_args(vec![p, Object::Int(1)]));
    assert_eq!(v.function, "Point.same");
    assert_eq!(v.param(), Some("other"));
}

#[test]
fn no_type_check_class_exempts_its_methods() {
    let owner = ClassBuilder::new("Loose").module(MODULE).no_type_check().build().unwrap();
    let m = FunctionBuilder::new("m")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::int()))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    assert!(Decorator::new(plain()).decorate_method(&m, &owner).unwrap().ptr_eq(&m));
}

#[test]
fn numeric_tower_widens_float() {
    let f = FunctionBuilder::new("f")
        .module(MODULE)
        .param(Parameter::positional("x").hint(hints::float()))
        .body(|_| Ok(Object::None))
        .build()
        .unwrap();
    assert!(decorate(&f).call_args(vec![Object::Int(1)]).is_err());
    let towered = Decorator::new(plain().pep484_tower(true)).decorate(&f).unwrap();
    assert_eq!(towered.call_args(vec![Object::Int(1)]).unwrap(), Object::None);
    assert_eq!(towered.call_args(vec![Object::Float(1.5)]).unwrap(), Object::None);
    assert!(towered.call_args(vec![Object::str("1")]).is_err());
}

#[test]
fn is_bearable_answers_without_raising() {
    let conf = plain();
    let hint = hints::dict(hints::str(), hints::list(hints::int()));
    let good = Object::dict([(Object::str("a"), Object::from(vec![1, 2]))]);
    let bad = Object::dict([(Object::str("a"), Object::from(vec!["b"]))]);
    assert_eq!(is_bearable(&good, &hint, &conf), Ok(true));
    assert_eq!(is_bearable(&bad, &hint, &conf), Ok(false));
    assert!(matches!(
        is_bearable(&good, &hintguard::Hint::value(3), &conf),
        Err(CallError::Hint(HintError::NotAHint { .. }))
    ));
}

#[test]
fn die_if_unbearable_describes_the_value() {
    let conf = plain();
    assert_eq!(die_if_unbearable(&Object::Int(1), &hints::int(), &conf), Ok(()));
    let v = match die_if_unbearable(&Object::str("a"), &hints::int(), &conf) {
        Err(CallError::Violation(v)) => v,
        other => panic!("expected a violation, got {other:?}"),
    };
    assert_eq!(v.site, ViolationSite::Value);
    assert_eq!(v.to_string(), "'a' violates type hint int, as str 'a' not instance of int.");
}

#[test]
fn concurrent_decoration_and_calls_agree() {
    let conf = plain().strategy(CheckStrategy::On);
    let hint = hints::dict(hints::str(), hints::list(hints::int()));
    let function = |name: &str| {
        FunctionBuilder::new(name)
            .module(MODULE)
            .param(Parameter::positional("x").hint(hint.clone()))
            .build()
            .unwrap()
    };
    let shared = Decorator::new(conf.clone()).decorate(&function("shared")).unwrap();
    let good = Object::dict([(Object::str("a"), Object::from(vec![1, 2, 3]))]);
    let bad = Object::dict([(Object::str("a"), Object::List(vec![Object::str("x"); 3]))]);

    let outcomes: Vec<Vec<String>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    let own = Decorator::new(conf.clone()).decorate(&function("own")).unwrap();
                    let mut seen = Vec::new();
                    for _ in 0..50 {
                        for callable in [&shared, &own] {
                            assert_eq!(callable.call_args(vec![good.clone()]), Ok(Object::None));
                            seen.push(violation(callable.call_args(vec![bad.clone()])).cause);
                        }
                        assert_eq!(is_bearable(&bad, &hint, &conf), Ok(false));
                        assert_eq!(is_bearable(&good, &hint, &conf), Ok(true));
                    }
                    seen
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(outcomes.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(outcomes[0][0], "x['a'][0] str 'x' not instance of int");
}
