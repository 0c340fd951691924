use hintguard::{
    CheckConf, CheckNode, CheckStrategy, CodeGenerator, DictPairs, Hint, Object, PithName, ReduceContext, Scope,
    classify_hint,
    codegen::{Frame, sample_index},
    diagnose::diagnose,
    hints, sampling,
};
use pretty_assertions::assert_eq;

fn check_of(hint: &Hint, strategy: CheckStrategy) -> CheckNode {
    let ctx = ReduceContext::new(&CheckConf::new().strategy(strategy));
    let classified = classify_hint(hint, &ctx).unwrap();
    CodeGenerator::new(&ctx)
        .generate_check(&classified, &PithName::param("x"), &mut Scope::new())
        .unwrap()
}

fn mixed() -> Object {
    Object::List(vec![Object::Int(1), Object::str("a"), Object::Int(3)])
}

#[test]
fn reseeding_makes_draws_reproducible() {
    sampling::reseed(42);
    let first: Vec<u32> = (0..16).map(|_| sampling::next_random()).collect();
    sampling::reseed(42);
    let second: Vec<u32> = (0..16).map(|_| sampling::next_random()).collect();
    assert_eq!(first, second);
    assert!(first.iter().any(|&r| r != first[0]));
}

#[test]
fn sequence_checks_the_item_the_frame_selects() {
    let node = check_of(&hints::list(hints::int()), CheckStrategy::O1);
    let value = mixed();
    assert_eq!(node.check(&value, &Frame { random: 0 }), Ok(true));
    assert_eq!(node.check(&value, &Frame { random: 1 }), Ok(false));
    assert_eq!(node.check(&value, &Frame { random: 2 }), Ok(true));
    assert_eq!(node.check(&value, &Frame { random: 4 }), Ok(false));
}

#[test]
fn every_index_is_reachable() {
    for len in 1..8 {
        let mut seen = vec![false; len];
        for random in 0..u32::try_from(len).unwrap() {
            seen[sample_index(random, len)] = true;
        }
        assert!(seen.iter().all(|&s| s), "length {len}");
    }
}

#[test]
fn empty_containers_pass() {
    let node = check_of(&hints::list(hints::int()), CheckStrategy::O1);
    assert_eq!(node.check(&Object::List(vec![]), &Frame { random: 9 }), Ok(true));
    let dict = check_of(&hints::dict(hints::str(), hints::int()), CheckStrategy::O1);
    assert_eq!(dict.check(&Object::Dict(DictPairs::default()), &Frame { random: 9 }), Ok(true));
}

#[test]
fn sets_and_dicts_check_their_first_entry() {
    let set = check_of(&hints::set(hints::int()), CheckStrategy::O1);
    let frame = Frame { random: 1 };
    assert_eq!(set.check(&Object::Set(vec![Object::Int(1), Object::str("a")]), &frame), Ok(true));
    assert_eq!(set.check(&Object::Set(vec![Object::str("a"), Object::Int(1)]), &frame), Ok(false));

    let dict = check_of(&hints::dict(hints::str(), hints::int()), CheckStrategy::O1);
    let later_bad = Object::dict([
        (Object::str("a"), Object::Int(1)),
        (Object::str("b"), Object::str("x")),
    ]);
    assert_eq!(dict.check(&later_bad, &frame), Ok(true));
}

#[test]
fn exhaustive_strategy_ignores_the_frame() {
    let node = check_of(&hints::list(hints::int()), CheckStrategy::On);
    for random in 0..6 {
        assert_eq!(node.check(&mixed(), &Frame { random }), Ok(false));
    }
    let set = check_of(&hints::set(hints::int()), CheckStrategy::On);
    assert_eq!(
        set.check(&Object::Set(vec![Object::Int(1), Object::str("a")]), &Frame { random: 0 }),
        Ok(false)
    );
}

#[test]
fn diagnosis_follows_the_sampled_item() {
    let node = check_of(&hints::list(hints::int()), CheckStrategy::O1);
    assert_eq!(diagnose(&node, &mixed(), &Frame { random: 0 }), Ok(None));
    let failure = diagnose(&node, &mixed(), &Frame { random: 1 }).unwrap().unwrap();
    assert_eq!(failure.path, "[1]");
    assert_eq!(failure.describe("x"), "x[1] str 'a' not instance of int");
}
