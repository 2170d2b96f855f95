//! # Fathom Engine
//!
//! **Rules for finding things in documents**
//!
//! Fathom scores and classifies the nodes of a tree, typically an HTML page,
//! with a set of small declarative rules. Rules say things like "every
//! `<meta property=og:title>` is probably a title" or "a title inside a
//! heading is twice as likely"; the engine works out which rules a question
//! depends on, runs each of them once, and hands back the answer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fathom::markup::{Document, Element};
//! use fathom::{dom, out, rule, type_, FathomResult, Ruleset};
//!
//! fn main() -> FathomResult<()> {
//!     let ruleset: Ruleset<Element> = Ruleset::new([
//!         rule(dom("meta[property=\"og:title\"]"), type_("titley").score(40.0)),
//!         rule(dom("title"), type_("titley").score(10.0)),
//!         rule(type_("titley").max(), out("best")),
//!     ])?;
//!
//!     let doc = Document::parse("<title>Hello</title>")?;
//!     let mut bound = ruleset.against(&doc);
//!     let best = bound.get("best")?;
//!     assert_eq!(best.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Fnodes
//! Each element a rule touches gets an [`Fnode`]: a score per type (a running
//! product starting at 1) and an optional note per type that can be written
//! only once.
//!
//! ### Rules
//! A [`rule`] pairs a left-hand side, which selects fnodes, with a right-hand
//! side, which either feeds new facts back in or exposes results under a key
//! with [`out`].
//!
//! ### Planning
//! Every inward rule declares up front which types it could emit. From that
//! the engine knows which rules must run before which, detects cycles, and
//! runs only what a query needs, each rule at most once per document.

pub mod bound;
pub mod error;
pub mod fnode;
pub mod lhs;
pub mod markup;
pub mod planner;
pub mod resource_limits;
pub mod rhs;
pub mod rule;
pub mod ruleset;
pub mod side;
pub mod tree;

pub use bound::{BoundRuleset, Query};
pub use error::{ErrorDetails, FathomError};
pub use fnode::{Fnode, FnodeId, TypeRecord};
pub use lhs::Lhs;
pub use markup::Span;
pub use resource_limits::ResourceLimits;
pub use rhs::{out, Fact, InwardRhs, OutwardRhs};
pub use rule::{rule, CompiledRule, InwardRule, OutwardRule, Rule, RuleId};
pub use ruleset::Ruleset;
pub use side::{
    and, at_most, conserve_score, dom, func, max, note, props, score, score_up_to, score_with,
    type_, type_in, Side,
};
pub use tree::Tree;

/// Result type for Fathom operations
pub type FathomResult<T> = Result<T, FathomError>;

#[cfg(test)]
mod tests;
