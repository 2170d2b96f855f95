use crate::{
    dom, func, out, rule, score, type_, type_in, CompiledRule, Fact, FathomError, InwardRule, Rule,
    RuleId, Ruleset,
};
use std::collections::BTreeSet;

fn set(types: &[&str]) -> BTreeSet<String> {
    types.iter().map(|t| t.to_string()).collect()
}

fn ids(ids: &[usize]) -> BTreeSet<RuleId> {
    ids.iter().map(|id| RuleId(*id)).collect()
}

fn inward(ruleset: &Ruleset<()>, id: usize) -> &InwardRule<()> {
    ruleset.inward_rule(RuleId(id)).unwrap()
}

#[test]
fn test_rule_knows_what_it_can_add_and_emit() {
    let ruleset: Ruleset<()> = Ruleset::new([
        rule(dom("p"), type_("para")),
        rule(
            type_("r"),
            type_in(["q"]).func(|_| Fact::new()).type_in(["r", "s"]),
        ),
        rule(type_("a"), score(2.0)),
    ])
    .unwrap();

    assert_eq!(inward(&ruleset, 0).types_it_could_emit(), &set(&["para"]));
    assert_eq!(inward(&ruleset, 0).types_it_could_add(), &set(&["para"]));

    assert_eq!(inward(&ruleset, 1).types_it_could_emit(), &set(&["r", "s"]));
    assert_eq!(inward(&ruleset, 1).types_it_could_add(), &set(&["s"]));

    assert_eq!(inward(&ruleset, 2).types_it_could_emit(), &set(&["a"]));
    assert!(inward(&ruleset, 2).types_it_could_add().is_empty());
}

#[test]
fn test_ruleset_remembers_what_types_rules_add_and_emit() {
    let ruleset: Ruleset<()> = Ruleset::new([
        rule(dom("p"), func(|_| Fact::new()).type_in(["q", "r"])),
        rule(type_("r"), type_("s")),
    ])
    .unwrap();
    assert_eq!(ruleset.inward_rules_that_could_emit("q"), &[RuleId(0)]);
    assert_eq!(ruleset.inward_rules_that_could_emit("r"), &[RuleId(0)]);
    assert_eq!(ruleset.inward_rules_that_could_add("s"), &[RuleId(1)]);
    assert!(ruleset.inward_rules_that_could_add("nothing").is_empty());
}

#[test]
fn test_func_without_type_in_is_rejected() {
    let result: Result<Ruleset<()>, _> = Ruleset::new([
        rule(dom("p"), type_("a")),
        rule(type_("a"), func(|_| Fact::new())),
    ]);
    match result {
        Err(FathomError::MalformedRule(msg)) => {
            assert!(msg.contains("without calling type_in()"), "{}", msg);
            assert!(msg.contains("rule #1"), "{}", msg);
        }
        other => panic!("Expected MalformedRule, got {:?}", other),
    }
}

#[test]
fn test_func_followed_by_static_type_is_accepted() {
    let ruleset: Ruleset<()> =
        Ruleset::new([rule(dom("p"), func(|_| Fact::new()).type_("a"))]).unwrap();
    assert_eq!(inward(&ruleset, 0).types_it_could_emit(), &set(&["a"]));
}

#[test]
fn test_pass_through_on_dom_is_rejected() {
    let result: Result<Ruleset<()>, _> = Ruleset::new([rule(dom("p"), score(2.0))]);
    assert!(matches!(result, Err(FathomError::MalformedRule(msg)) if msg.contains("must assign a type")));
}

#[test]
fn test_outward_rules_register_under_their_key() {
    let ruleset: Ruleset<()> = Ruleset::new([
        rule(dom("a"), type_("A")),
        rule(type_("A"), type_("B")),
        rule(type_("A"), out("ay")),
        rule(type_("B"), out("be")),
    ])
    .unwrap();

    assert_eq!(ruleset.rules().len(), 4);
    assert_eq!(ruleset.inward_rules(), &[RuleId(0), RuleId(1)]);
    assert_eq!(ruleset.outward_rule("ay").unwrap().id(), RuleId(2));
    assert_eq!(ruleset.outward_rule("be").unwrap().key(), "be");
    let mut keys: Vec<&str> = ruleset.out_keys().collect();
    keys.sort();
    assert_eq!(keys, vec!["ay", "be"]);

    assert!(matches!(
        ruleset.outward_rule("nope"),
        Err(FathomError::UnknownKey(key)) if key == "nope"
    ));
    assert!(matches!(
        ruleset.rule(RuleId(2)),
        Some(CompiledRule::Outward(_))
    ));
    // Outward rules are never executed as inward ones
    assert!(ruleset.inward_rule(RuleId(2)).is_err());
}

#[test]
fn test_rules_round_trip_through_a_new_ruleset() {
    let rules: Vec<Rule<()>> = vec![
        rule(dom("a"), type_("A")),
        rule(type_("A"), type_("B")),
        rule(type_("B"), out("be")),
    ];
    let ruleset = Ruleset::new(rules).unwrap();
    let again = Ruleset::new(ruleset.rules().to_vec()).unwrap();
    assert_eq!(format!("{:?}", again), format!("{:?}", ruleset));
    assert_eq!(
        again.inward_rules_that_could_add("B"),
        ruleset.inward_rules_that_could_add("B")
    );
}

#[test]
fn test_duplicate_out_key_later_rule_wins() {
    let ruleset: Ruleset<()> = Ruleset::new([
        rule(dom("a"), type_("A")),
        rule(type_("A"), out("k")),
        rule(type_("A").max(), out("k")),
    ])
    .unwrap();
    assert_eq!(ruleset.outward_rule("k").unwrap().id(), RuleId(2));
}

#[test]
fn test_rule_identifies_prerequisites() {
    let ruleset: Ruleset<()> = Ruleset::new([
        rule(dom("p"), type_("a")),        // dom rule
        rule(type_("a").max(), type_("b")), // max rule
        rule(type_("b"), score(2.0)),      // maintains b
        rule(type_("b"), type_("c")),      // adds c
    ])
    .unwrap();

    assert_eq!(ruleset.prerequisites(RuleId(0)).unwrap(), ids(&[]));
    assert_eq!(ruleset.prerequisites(RuleId(1)).unwrap(), ids(&[0]));
    // A rule refining b waits only for the rules adding it
    assert_eq!(ruleset.prerequisites(RuleId(2)).unwrap(), ids(&[1]));
    // Everyone else waits for every rule emitting it
    assert_eq!(ruleset.prerequisites(RuleId(3)).unwrap(), ids(&[1, 2]));
}

#[test]
fn test_and_prerequisites_are_the_union() {
    let ruleset: Ruleset<()> = Ruleset::new([
        rule(dom("a"), type_("A")),
        rule(dom("a[class]"), type_("C")),
        rule(dom("a"), type_("NEEDLESS")),
        rule(crate::and([type_("A"), type_("C")]), type_("BOTH")),
        rule(dom("p"), type_("A")),
    ])
    .unwrap();
    assert_eq!(ruleset.prerequisites(RuleId(3)).unwrap(), ids(&[0, 1, 4]));
}

#[test]
fn test_missing_producer() {
    let ruleset: Ruleset<()> = Ruleset::new([rule(type_("ghost"), type_("b"))]).unwrap();
    assert!(matches!(
        ruleset.prerequisites(RuleId(0)),
        Err(FathomError::MissingProducer { type_name }) if type_name == "ghost"
    ));
}

#[test]
fn test_rule_that_only_refines_its_own_type_has_no_producer() {
    // Emitting "a" from a type_("a") LHS never adds "a" to anything
    let ruleset: Ruleset<()> = Ruleset::new([rule(type_("a"), score(2.0))]).unwrap();
    assert!(matches!(
        ruleset.prerequisites(RuleId(0)),
        Err(FathomError::MissingProducer { .. })
    ));
}
