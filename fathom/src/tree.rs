//! The boundary between the engine and the tree it analyzes
//!
//! The engine never walks a tree itself. It asks a [`Tree`] for the elements
//! matching a selector and keys its fnodes by the handles it gets back, so a
//! handle's `Eq`/`Hash` must reflect node identity rather than content.

use crate::FathomResult;
use std::fmt::Debug;
use std::hash::Hash;

pub trait Tree {
    /// A cheap handle to one node, compared by identity
    type Element: Clone + Eq + Hash + Debug;

    /// Elements matching a selector, in document order
    fn select(&self, selector: &str) -> FathomResult<Vec<Self::Element>>;
}
