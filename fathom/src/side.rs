//! Chainable rule-side descriptors
//!
//! A [`Side`] is an immutable, append-only chain of calls such as
//! `type_("para").score(2.0).note(...)`. Extending a side never touches the
//! side it was built from: links are shared behind `Arc`s, so a common prefix
//! can be reused by any number of rules. Whether a chain means a left-hand
//! side or a right-hand side is decided only when a [`Rule`](crate::Rule)
//! compiles it via [`Side::as_lhs`] or [`Side::as_rhs`].

use crate::{Fact, Fnode};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub type NoteFn<E> = Arc<dyn Fn(&Fnode<E>) -> Value + Send + Sync>;
pub type ScoreFn<E> = Arc<dyn Fn(&Fnode<E>) -> f64 + Send + Sync>;
pub type PropsFn<E> = Arc<dyn Fn(&Fnode<E>) -> Fact<E> + Send + Sync>;

/// Either a fixed score multiplier or one computed per fnode
pub enum ScoreSource<E> {
    Fixed(f64),
    Computed(ScoreFn<E>),
}

impl<E> Clone for ScoreSource<E> {
    fn clone(&self) -> Self {
        match self {
            ScoreSource::Fixed(score) => ScoreSource::Fixed(*score),
            ScoreSource::Computed(callback) => ScoreSource::Computed(Arc::clone(callback)),
        }
    }
}

/// One link of a side chain
pub enum Call<E> {
    Dom(String),
    Type(String),
    TypeIn(Vec<String>),
    Note(NoteFn<E>),
    Score(ScoreSource<E>),
    Props(PropsFn<E>),
    AtMost(f64),
    ConserveScore,
    Max,
    And(Vec<Side<E>>),
}

impl<E> Call<E> {
    pub fn method_name(&self) -> &'static str {
        match self {
            Call::Dom(_) => "dom",
            Call::Type(_) => "type_",
            Call::TypeIn(_) => "type_in",
            Call::Note(_) => "note",
            Call::Score(_) => "score",
            Call::Props(_) => "func",
            Call::AtMost(_) => "at_most",
            Call::ConserveScore => "conserve_score",
            Call::Max => "max",
            Call::And(_) => "and",
        }
    }
}

impl<E> Clone for Call<E> {
    fn clone(&self) -> Self {
        match self {
            Call::Dom(selector) => Call::Dom(selector.clone()),
            Call::Type(type_name) => Call::Type(type_name.clone()),
            Call::TypeIn(types) => Call::TypeIn(types.clone()),
            Call::Note(callback) => Call::Note(Arc::clone(callback)),
            Call::Score(source) => Call::Score(source.clone()),
            Call::Props(callback) => Call::Props(Arc::clone(callback)),
            Call::AtMost(bound) => Call::AtMost(*bound),
            Call::ConserveScore => Call::ConserveScore,
            Call::Max => Call::Max,
            Call::And(sides) => Call::And(sides.clone()),
        }
    }
}

impl<E> fmt::Debug for Call<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Call::Dom(selector) => write!(f, "dom({:?})", selector),
            Call::Type(type_name) => write!(f, "type_({:?})", type_name),
            Call::TypeIn(types) => write!(f, "type_in({:?})", types),
            Call::Score(ScoreSource::Fixed(score)) => write!(f, "score({})", score),
            Call::AtMost(bound) => write!(f, "at_most({})", bound),
            Call::And(sides) => {
                write!(f, "and(")?;
                for (i, side) in sides.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", side)?;
                }
                write!(f, ")")
            }
            other => write!(f, "{}(..)", other.method_name()),
        }
    }
}

struct Link<E> {
    call: Call<E>,
    prev: Option<Arc<Link<E>>>,
}

/// An immutable chain of calls, compiled into an LHS or RHS by a rule
pub struct Side<E> {
    tail: Option<Arc<Link<E>>>,
    len: usize,
}

impl<E> Clone for Side<E> {
    fn clone(&self) -> Self {
        Self {
            tail: self.tail.clone(),
            len: self.len,
        }
    }
}

impl<E> Default for Side<E> {
    fn default() -> Self {
        Self { tail: None, len: 0 }
    }
}

impl<E> fmt::Debug for Side<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, call) in self.calls().iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{:?}", call)?;
        }
        Ok(())
    }
}

impl<E> Side<E> {
    fn from_call(call: Call<E>) -> Self {
        Self::default().push(call)
    }

    fn push(&self, call: Call<E>) -> Self {
        Self {
            tail: Some(Arc::new(Link {
                call,
                prev: self.tail.clone(),
            })),
            len: self.len + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The calls of this chain, first call first
    pub fn calls(&self) -> Vec<Call<E>> {
        let mut calls = Vec::with_capacity(self.len);
        let mut link = self.tail.as_deref();
        while let Some(current) = link {
            calls.push(current.call.clone());
            link = current.prev.as_deref();
        }
        calls.reverse();
        calls
    }

    /// On a left-hand side, constrain to an input type. On a right-hand side,
    /// emit the given type.
    pub fn type_(&self, type_name: impl Into<String>) -> Self {
        self.push(Call::Type(type_name.into()))
    }

    /// Constrain the right-hand side to emit one of the given types. An empty
    /// list lifts an earlier constraint.
    pub fn type_in<S: Into<String>>(&self, types: impl IntoIterator<Item = S>) -> Self {
        self.push(Call::TypeIn(types.into_iter().map(Into::into).collect()))
    }

    /// Whatever the callback returns becomes the note of the fact. A null
    /// value leaves any existing note alone.
    pub fn note<F, V>(&self, callback: F) -> Self
    where
        F: Fn(&Fnode<E>) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.push(Call::Note(Arc::new(move |fnode| callback(fnode).into())))
    }

    /// Multiply the score of the output type by a fixed number.
    pub fn score(&self, score: f64) -> Self {
        self.push(Call::Score(ScoreSource::Fixed(score)))
    }

    /// Multiply the score of the output type by a number computed per fnode.
    pub fn score_with<F>(&self, callback: F) -> Self
    where
        F: Fn(&Fnode<E>) -> f64 + Send + Sync + 'static,
    {
        self.push(Call::Score(ScoreSource::Computed(Arc::new(callback))))
    }

    /// Determine any of type, note, score and element with one callback.
    pub fn func<F>(&self, callback: F) -> Self
    where
        F: Fn(&Fnode<E>) -> Fact<E> + Send + Sync + 'static,
    {
        self.push(Call::Props(Arc::new(callback)))
    }

    pub fn props<F>(&self, callback: F) -> Self
    where
        F: Fn(&Fnode<E>) -> Fact<E> + Send + Sync + 'static,
    {
        self.func(callback)
    }

    /// Declare the largest score multiplier this right-hand side can produce.
    /// Exceeding it is an error at runtime. `f64::INFINITY` lifts the bound.
    pub fn at_most(&self, bound: f64) -> Self {
        self.push(Call::AtMost(bound))
    }

    pub fn score_up_to(&self, bound: f64) -> Self {
        self.at_most(bound)
    }

    /// Start the output type's score from the input type's score instead of 1.
    pub fn conserve_score(&self) -> Self {
        self.push(Call::ConserveScore)
    }

    /// Select only the highest-scoring fnode(s) of the input type.
    pub fn max(&self) -> Self {
        self.push(Call::Max)
    }
}

/// A left-hand side that selects tree elements matching a selector
pub fn dom<E>(selector: impl Into<String>) -> Side<E> {
    Side::from_call(Call::Dom(selector.into()))
}

/// Constrain to an input type (LHS) or emit a type (RHS)
pub fn type_<E>(type_name: impl Into<String>) -> Side<E> {
    Side::from_call(Call::Type(type_name.into()))
}

/// A left-hand side selecting fnodes that carry every one of the given types
pub fn and<E>(sides: impl IntoIterator<Item = Side<E>>) -> Side<E> {
    Side::from_call(Call::And(sides.into_iter().collect()))
}

pub fn type_in<E, S: Into<String>>(types: impl IntoIterator<Item = S>) -> Side<E> {
    Side::default().type_in(types)
}

pub fn note<E, F, V>(callback: F) -> Side<E>
where
    F: Fn(&Fnode<E>) -> V + Send + Sync + 'static,
    V: Into<Value>,
{
    Side::default().note(callback)
}

pub fn score<E>(score: f64) -> Side<E> {
    Side::default().score(score)
}

pub fn score_with<E, F>(callback: F) -> Side<E>
where
    F: Fn(&Fnode<E>) -> f64 + Send + Sync + 'static,
{
    Side::default().score_with(callback)
}

pub fn func<E, F>(callback: F) -> Side<E>
where
    F: Fn(&Fnode<E>) -> Fact<E> + Send + Sync + 'static,
{
    Side::default().func(callback)
}

pub fn props<E, F>(callback: F) -> Side<E>
where
    F: Fn(&Fnode<E>) -> Fact<E> + Send + Sync + 'static,
{
    Side::default().func(callback)
}

pub fn at_most<E>(bound: f64) -> Side<E> {
    Side::default().at_most(bound)
}

pub fn score_up_to<E>(bound: f64) -> Side<E> {
    Side::default().at_most(bound)
}

pub fn conserve_score<E>() -> Side<E> {
    Side::default().conserve_score()
}

pub fn max<E>() -> Side<E> {
    Side::default().max()
}
