use crate::markup::{Document, Selector};
use crate::FathomError;

const PAGE: &str = r#"
<div id="main" class="content wide">
  <p class="lead">First</p>
  <section>
    <p lang="en-US">Second</p>
    <a href="https://example.com/x" rel="nofollow noopener">link</a>
  </section>
</div>
<p>Outside</p>
<meta property="og:title" content="OG">
"#;

fn texts(selector: &str) -> Vec<String> {
    let doc = Document::parse(PAGE).unwrap();
    doc.select(selector)
        .unwrap()
        .iter()
        .map(|e| e.text())
        .collect()
}

fn count(selector: &str) -> usize {
    Document::parse(PAGE).unwrap().select(selector).unwrap().len()
}

#[test]
fn test_type_and_universal_selectors() {
    assert_eq!(texts("p"), vec!["First", "Second", "Outside"]);
    assert_eq!(count("P"), 3);
    assert_eq!(count("*"), 7);
    assert_eq!(count("blink"), 0);
}

#[test]
fn test_id_and_class_selectors() {
    assert_eq!(count("#main"), 1);
    assert_eq!(texts(".lead"), vec!["First"]);
    assert_eq!(count("div.content.wide"), 1);
    assert_eq!(count(".content.missing"), 0);
    assert_eq!(count("p#main"), 0);
}

#[test]
fn test_combinators() {
    assert_eq!(texts("div p"), vec!["First", "Second"]);
    assert_eq!(texts("div > p"), vec!["First"]);
    assert_eq!(texts("  div   >   p  "), vec!["First"]);
    assert_eq!(count("section > a"), 1);
    assert_eq!(count("div > a"), 0);
    assert_eq!(count("div section a"), 1);
    assert_eq!(count("#main > section > p"), 1);
}

#[test]
fn test_attribute_selectors() {
    assert_eq!(count("[lang]"), 1);
    assert_eq!(count("[lang|=en]"), 1);
    assert_eq!(count("[lang|=e]"), 0);
    assert_eq!(count("[rel~=noopener]"), 1);
    assert_eq!(count("[rel~=noop]"), 0);
    assert_eq!(count("a[href^=\"https\"]"), 1);
    assert_eq!(count("[href$='/x']"), 1);
    assert_eq!(count("[href*=example]"), 1);
    assert_eq!(count("meta[property=\"og:title\"]"), 1);
    assert_eq!(count("meta[property=og]"), 0);
}

#[test]
fn test_groups_come_back_in_document_order_without_duplicates() {
    let doc = Document::parse(PAGE).unwrap();
    let names: Vec<String> = doc
        .select("p, a")
        .unwrap()
        .iter()
        .map(|e| e.name().to_string())
        .collect();
    assert_eq!(names, vec!["p", "p", "a", "p"]);
    assert_eq!(count("p, p.lead"), 3);
}

#[test]
fn test_invalid_selectors() {
    for source in ["", "div >", "[x", "p,,a", "#", "a[href=]", "div!"] {
        match Selector::parse(source) {
            Err(FathomError::Selector(_)) => {}
            other => panic!("Expected a selector error for {:?}, got {:?}", source, other),
        }
    }
}

#[test]
fn test_selector_remembers_its_source() {
    assert_eq!(Selector::parse("div > p").unwrap().as_str(), "div > p");
}

fn nested_divs(depth: usize, innermost: &str) -> Document {
    let source = format!(
        "{}{}{}",
        "<div>".repeat(depth),
        innermost,
        "</div>".repeat(depth)
    );
    Document::parse(&source).unwrap()
}

#[test]
fn test_descendant_matching_stays_fast_on_deep_nests() {
    let doc = nested_divs(200, "<b>x</b>");
    // The leftmost compound never matches, so every ancestor chain is a dead end
    assert!(doc.select("span div div div div div div").unwrap().is_empty());
    assert!(doc.select("span div > div div > div div b").unwrap().is_empty());

    assert_eq!(doc.select("div div div div div div").unwrap().len(), 195);
    assert_eq!(doc.select("div div > div div div b").unwrap().len(), 1);
}
