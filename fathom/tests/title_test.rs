use fathom::markup::{Document, Element};
use fathom::{dom, out, rule, type_, Fnode, Rule, Ruleset};
use serde_json::{json, Value};

const PAGE: &str = r#"
    <meta name="hdl" content="HDL">
    <meta property="og:title" content="OpenGraph">
    <meta property="twitter:title" content="Twitter">
    <title>Title</title>
"#;

fn content(fnode: &Fnode<Element>) -> Value {
    fnode.element().attr("content").map_or(Value::Null, Value::from)
}

fn title_rules() -> Vec<Rule<Element>> {
    vec![
        rule(
            dom(r#"meta[property="og:title"]"#),
            type_("titley").score(40.0).note(content),
        ),
        rule(
            dom(r#"meta[property="twitter:title"]"#),
            type_("titley").score(30.0).note(content),
        ),
        rule(
            dom(r#"meta[name="hdl"]"#),
            type_("titley").score(20.0).note(content),
        ),
        rule(
            dom("title"),
            type_("titley")
                .score(10.0)
                .note(|fnode: &Fnode<Element>| fnode.element().text()),
        ),
        rule(
            type_("titley").max(),
            out("best").through(|fnode: &Fnode<Element>| {
                fnode.note_for("titley").cloned().unwrap_or(Value::Null)
            }),
        ),
    ]
}

#[test]
fn test_best_title_wins() {
    let doc = Document::parse(PAGE).unwrap();
    let rules = Ruleset::new(title_rules()).unwrap();
    let mut bound = rules.against(&doc);

    let best = bound.get("best").unwrap();
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].score_for("titley"), 40.0);
    assert_eq!(best[0].note_for("titley"), Some(&json!("OpenGraph")));
    assert_eq!(best[0].element().attr("property"), Some("og:title"));

    assert_eq!(bound.emit("best").unwrap(), vec![json!("OpenGraph")]);
}

#[test]
fn test_every_candidate_is_scored() {
    let doc = Document::parse(PAGE).unwrap();
    let rules = Ruleset::new(title_rules()).unwrap();
    let mut bound = rules.against(&doc);

    let mut candidates: Vec<(f64, Value)> = bound
        .get(type_("titley"))
        .unwrap()
        .iter()
        .map(|fnode| {
            (
                fnode.score_for("titley"),
                fnode.note_for("titley").cloned().unwrap_or(Value::Null),
            )
        })
        .collect();
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
    assert_eq!(
        candidates,
        vec![
            (40.0, json!("OpenGraph")),
            (30.0, json!("Twitter")),
            (20.0, json!("HDL")),
            (10.0, json!("Title")),
        ]
    );
}

#[test]
fn test_fallback_to_title_element() {
    let doc = Document::parse("<html><head><title> Just a  title </title></head></html>").unwrap();
    let rules = Ruleset::new(title_rules()).unwrap();
    let mut bound = rules.against(&doc);
    assert_eq!(bound.emit("best").unwrap(), vec![json!("Just a title")]);
}

#[test]
fn test_no_candidates() {
    let doc = Document::parse("<p>No title here</p>").unwrap();
    let rules = Ruleset::new(title_rules()).unwrap();
    let mut bound = rules.against(&doc);
    assert!(bound.get("best").unwrap().is_empty());
}
