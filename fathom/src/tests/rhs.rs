use crate::{
    conserve_score, dom, func, score, score_with, type_, type_in, Fact, FathomError, Fnode,
    FnodeId, Side,
};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn dummy() -> Fnode<()> {
    Fnode::new(FnodeId(0), ())
}

fn fact(side: Side<()>, left_type: Option<&str>) -> Result<Fact<()>, FathomError> {
    side.as_rhs()?.fact(&dummy(), left_type)
}

#[test]
fn test_calls_combine_piecewise_with_rightmost_subfacts_shadowing() {
    let fact = fact(
        type_("foo")
            .score(5.0)
            .func(|_| Fact::new().with_score(6.0)),
        None,
    )
    .unwrap();
    assert_eq!(fact.type_name.as_deref(), Some("foo"));
    assert_eq!(fact.score, Some(6.0));
    assert_eq!(fact.note, None);
}

#[test]
fn test_same_named_calls_shadow_with_rightmost_winning() {
    let fact = fact(
        func(|_| Fact::new().with_score(1.0)).func(|_| Fact::new().with_note("foo")),
        None,
    )
    .unwrap();
    assert_eq!(fact.note, Some(json!("foo")));
    assert_eq!(fact.score, None);
}

#[test]
fn test_later_static_calls_shadow_func() {
    let fact = fact(
        func(|_| Fact::new().with_type("from_func").with_score(2.0)).type_("static"),
        None,
    )
    .unwrap();
    assert_eq!(fact.type_name.as_deref(), Some("static"));
    assert_eq!(fact.score, Some(2.0));
}

#[test]
fn test_callbacks_run_only_once() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let side: Side<()> = func(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Fact::new()
    });
    let fact = fact(side, None).unwrap();
    assert!(fact.type_name.is_none() && fact.note.is_none() && fact.score.is_none());
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_shadowed_callbacks_never_run() {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let side: Side<()> = score_with(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        2.0
    })
    .score(3.0);
    assert_eq!(fact(side, None).unwrap().score, Some(3.0));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_func_cannot_request_conservation() {
    let side: Side<()> = func(|_| Fact {
        conserve_score: true,
        ..Fact::new()
    });
    assert!(!fact(side, None).unwrap().conserve_score);
    assert!(fact(conserve_score(), None).unwrap().conserve_score);
}

#[test]
fn test_at_most_rejects_larger_scores() {
    match fact(type_("a").score(3.0).at_most(2.0), None) {
        Err(FathomError::ScoreBound { score, bound }) => {
            assert_eq!(score, 3.0);
            assert_eq!(bound, 2.0);
        }
        other => panic!("Expected ScoreBound, got {:?}", other),
    }
    assert!(fact(type_("a").score(2.0).at_most(2.0), None).is_ok());
    // An infinite bound lifts an earlier one
    assert!(fact(
        type_("a").score(3.0).at_most(2.0).at_most(f64::INFINITY),
        None
    )
    .is_ok());
}

#[test]
fn test_type_in_rejects_emitted_types_outside_the_set() {
    match fact(type_("c").type_in(["a", "b"]), None) {
        Err(FathomError::TypeOutOfBounds {
            type_name,
            allowed,
            inherited,
        }) => {
            assert_eq!(type_name, "c");
            assert_eq!(allowed, vec!["a".to_string(), "b".to_string()]);
            assert!(!inherited);
        }
        other => panic!("Expected TypeOutOfBounds, got {:?}", other),
    }
    assert!(fact(type_("b").type_in(["a", "b"]), None).is_ok());
}

#[test]
fn test_type_in_checks_inherited_types() {
    let side: Side<()> = type_in(["a"]).score(2.0);
    match fact(side.clone(), Some("z")) {
        Err(FathomError::TypeOutOfBounds {
            type_name,
            inherited,
            ..
        }) => {
            assert_eq!(type_name, "z");
            assert!(inherited);
        }
        other => panic!("Expected TypeOutOfBounds, got {:?}", other),
    }
    assert!(fact(side.clone(), Some("a")).is_ok());
    assert!(matches!(
        fact(side, None),
        Err(FathomError::UndeterminedType(_))
    ));
}

#[test]
fn test_empty_type_in_lifts_the_constraint() {
    assert!(fact(type_("c").type_in(["a"]).type_in(Vec::<&str>::new()), None).is_ok());
}

#[test]
fn test_possible_emissions() {
    let emissions = |side: Side<()>| side.as_rhs().unwrap().possible_emissions();

    let pinned = emissions(func(|_| Fact::new()).type_("a"));
    assert!(pinned.could_change_type);
    assert_eq!(pinned.possible_types, BTreeSet::from(["a".to_string()]));

    let declared = emissions(type_in(["q"]).func(|_| Fact::new()).type_in(["r", "s"]));
    assert!(declared.could_change_type);
    assert_eq!(
        declared.possible_types,
        BTreeSet::from(["r".to_string(), "s".to_string()])
    );

    // func() after type_() could override it
    let unknown = emissions(type_("a").func(|_| Fact::new()));
    assert!(unknown.could_change_type);
    assert!(unknown.possible_types.is_empty());

    let pass_through = emissions(score(2.0));
    assert!(!pass_through.could_change_type);
}

#[test]
fn test_lhs_only_calls_are_rejected_on_rhs() {
    assert!(matches!(
        dom::<()>("p").as_rhs(),
        Err(FathomError::MalformedRule(_))
    ));
    assert!(matches!(
        type_::<()>("a").max().as_rhs(),
        Err(FathomError::MalformedRule(_))
    ));
}

#[test]
fn test_rhs_reports_declared_bounds() {
    let rhs = type_::<()>("a").type_in(["a", "b"]).at_most(4.0).as_rhs().unwrap();
    assert_eq!(rhs.max_score(), 4.0);
    assert_eq!(rhs.declared_types().len(), 2);
}
