//! A small HTML-like document model to run rulesets against
//!
//! Parsing is lenient in the way browsers are: every input yields a tree.
//! Selectors cover the usual CSS subset (type, `*`, `#id`, `.class`,
//! attribute tests, descendant and child combinators, comma groups).

mod document;
pub(crate) mod entities;
mod selector;

pub use document::{Document, Element, Node};
pub use selector::Selector;

/// Location of a construct in its source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn from_pest_span(span: pest::Span) -> Self {
        let (line, col) = span.start_pos().line_col();
        Self {
            start: span.start(),
            end: span.end(),
            line,
            col,
        }
    }
}
