use fathom::markup::{Document, Element};
use fathom::{dom, out, rule, type_, FathomResult, Fnode, Ruleset};
use serde_json::Value;

const TITLE_TYPE: &str = "titley";

/// The winning title candidate of a document
#[derive(Debug, Clone, PartialEq)]
pub struct Title {
    pub text: String,
    pub score: f64,
    /// Where the title came from, e.g. `og:title` or `title`
    pub source: String,
}

fn content(fnode: &Fnode<Element>) -> Value {
    fnode
        .element()
        .attr("content")
        .map_or(Value::Null, Value::from)
}

fn text(fnode: &Fnode<Element>) -> Value {
    let text = fnode.element().text();
    if text.is_empty() {
        Value::Null
    } else {
        Value::from(text)
    }
}

/// Scores every title-like element of a page, best sources highest.
pub fn title_ruleset() -> FathomResult<Ruleset<Element>> {
    Ruleset::new([
        rule(
            dom(r#"meta[property="og:title"][content]"#),
            type_(TITLE_TYPE).score(40.0).note(content),
        ),
        rule(
            dom(
                r#"meta[property="twitter:title"][content], meta[name="twitter:title"][content]"#,
            ),
            type_(TITLE_TYPE).score(30.0).note(content),
        ),
        rule(
            dom(r#"meta[name="hdl"][content]"#),
            type_(TITLE_TYPE).score(20.0).note(content),
        ),
        rule(dom("title"), type_(TITLE_TYPE).score(10.0).note(text)),
        rule(type_(TITLE_TYPE).max(), out("best")),
    ])
}

/// The best-scoring title of a document. Ties go to the earliest element.
pub fn best_title(doc: &Document, rules: &Ruleset<Element>) -> FathomResult<Option<Title>> {
    let mut bound = rules.against(doc);
    let best = bound.get("best")?;
    let winner = best
        .iter()
        .filter(|fnode| fnode.has_note_for(TITLE_TYPE))
        .min_by_key(|fnode| fnode.element().index());

    Ok(winner.map(|fnode| {
        let element = fnode.element();
        let text = match fnode.note_for(TITLE_TYPE) {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        Title {
            text,
            score: fnode.score_for(TITLE_TYPE),
            source: element
                .attr("property")
                .or_else(|| element.attr("name"))
                .unwrap_or_else(|| element.name())
                .to_string(),
        }
    }))
}
