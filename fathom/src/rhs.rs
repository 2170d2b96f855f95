//! The right-hand side of a rule
//!
//! An [`InwardRhs`] turns one input fnode into a [`Fact`] that is merged back
//! into the ledger. An [`OutwardRhs`] (built with [`out`]) is a terminal sink
//! that hands its left-hand side's fnodes to the caller under a key.

use crate::side::{Call, PropsFn, ScoreSource, Side};
use crate::{FathomError, FathomResult, Fnode};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub type ThroughFn<E> = Arc<dyn Fn(&Fnode<E>) -> Value + Send + Sync>;

/// What one right-hand side says about one input fnode
///
/// Any part may be missing; the merge fills in defaults (the input element,
/// the left-hand side's type). A `note` of `Some(Value::Null)` counts as
/// supplied but undefined.
pub struct Fact<E> {
    pub element: Option<E>,
    pub type_name: Option<String>,
    pub note: Option<Value>,
    pub score: Option<f64>,
    pub conserve_score: bool,
}

impl<E> Default for Fact<E> {
    fn default() -> Self {
        Self {
            element: None,
            type_name: None,
            note: None,
            score: None,
            conserve_score: false,
        }
    }
}

impl<E> Fact<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(mut self, element: E) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<Value>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

impl<E: fmt::Debug> fmt::Debug for Fact<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fact")
            .field("element", &self.element)
            .field("type_name", &self.type_name)
            .field("note", &self.note)
            .field("score", &self.score)
            .field("conserve_score", &self.conserve_score)
            .finish()
    }
}

// Subfact flags
const TYPE: u8 = 1;
const NOTE: u8 = 2;
const SCORE: u8 = 4;
const ELEMENT: u8 = 8;
const CONSERVE_SCORE: u8 = 16;

#[derive(Copy, Clone, PartialEq, Eq)]
enum Kind {
    Type,
    Note,
    Score,
    Props,
    ConserveScore,
}

enum RhsCall<E> {
    Type(String),
    Note(crate::side::NoteFn<E>),
    Score(ScoreSource<E>),
    Props(PropsFn<E>),
    ConserveScore,
}

impl<E> RhsCall<E> {
    fn kind(&self) -> Kind {
        match self {
            RhsCall::Type(_) => Kind::Type,
            RhsCall::Note(_) => Kind::Note,
            RhsCall::Score(_) => Kind::Score,
            RhsCall::Props(_) => Kind::Props,
            RhsCall::ConserveScore => Kind::ConserveScore,
        }
    }

    fn possible_subfacts(&self) -> u8 {
        match self {
            RhsCall::Type(_) => TYPE,
            RhsCall::Note(_) => NOTE,
            RhsCall::Score(_) => SCORE,
            RhsCall::Props(_) => TYPE | NOTE | SCORE | ELEMENT,
            RhsCall::ConserveScore => CONSERVE_SCORE,
        }
    }
}

/// What a right-hand side might emit, as far as static analysis can tell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emissions {
    /// Whether the rule might change the type of its input
    pub could_change_type: bool,
    /// The types it might emit when it changes type. Empty when unknown or
    /// when the rule passes its input type through.
    pub possible_types: BTreeSet<String>,
}

/// A compiled right-hand side that feeds facts back into the ledger
pub struct InwardRhs<E> {
    calls: Vec<RhsCall<E>>,
    max_score: f64,
    types: BTreeSet<String>,
}

impl<E> fmt::Debug for InwardRhs<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InwardRhs")
            .field("calls", &self.calls.len())
            .field("max_score", &self.max_score)
            .field("types", &self.types)
            .finish()
    }
}

impl<E> Side<E> {
    /// Compile this chain as an inward right-hand side.
    pub fn as_rhs(&self) -> FathomResult<InwardRhs<E>> {
        let mut rhs = InwardRhs {
            calls: Vec::new(),
            max_score: f64::INFINITY,
            types: BTreeSet::new(),
        };
        for call in self.calls() {
            match call {
                Call::Type(type_name) => rhs
                    .calls
                    .push(RhsCall::Type(crate::lhs::checked_type_name(type_name)?)),
                Call::Note(callback) => rhs.calls.push(RhsCall::Note(callback)),
                Call::Score(source) => rhs.calls.push(RhsCall::Score(source)),
                Call::Props(callback) => rhs.calls.push(RhsCall::Props(callback)),
                Call::ConserveScore => rhs.calls.push(RhsCall::ConserveScore),
                Call::TypeIn(types) => rhs.types = types.into_iter().collect(),
                Call::AtMost(bound) => rhs.max_score = bound,
                other @ (Call::Dom(_) | Call::Max | Call::And(_)) => {
                    return Err(FathomError::malformed(format!(
                        "{}() is not allowed on the right-hand side of a rule",
                        other.method_name()
                    )))
                }
            }
        }
        Ok(rhs)
    }
}

impl<E> InwardRhs<E> {
    /// The declared upper bound on the score multiplier (infinite if none)
    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    /// The `type_in()` constraint; empty if unconstrained
    pub fn declared_types(&self) -> &BTreeSet<String> {
        &self.types
    }

    /// Run the calls against an input fnode and assemble a fact.
    ///
    /// Calls are layered back to front: for each subfact, the rightmost call
    /// able to supply it wins, and only the rightmost call of each kind is
    /// consulted at all. A `func()` callback therefore runs at most once.
    pub fn fact(&self, fnode: &Fnode<E>, left_type: Option<&str>) -> FathomResult<Fact<E>> {
        let mut fact = Fact::default();
        let mut done_kinds: Vec<Kind> = Vec::with_capacity(5);
        let mut have: u8 = 0;

        for call in self.calls.iter().rev() {
            let kind = call.kind();
            if done_kinds.contains(&kind) {
                continue;
            }
            done_kinds.push(kind);
            if call.possible_subfacts() & !have == 0 {
                continue;
            }

            match call {
                RhsCall::Type(type_name) => {
                    fact.type_name = Some(type_name.clone());
                    have |= TYPE;
                }
                RhsCall::Note(callback) => {
                    fact.note = Some(callback(fnode));
                    have |= NOTE;
                }
                RhsCall::Score(ScoreSource::Fixed(score)) => {
                    fact.score = Some(*score);
                    have |= SCORE;
                }
                RhsCall::Score(ScoreSource::Computed(callback)) => {
                    fact.score = Some(callback(fnode));
                    have |= SCORE;
                }
                RhsCall::ConserveScore => {
                    fact.conserve_score = true;
                    have |= CONSERVE_SCORE;
                }
                RhsCall::Props(callback) => {
                    // conserve_score from a callback is ignored so the planner
                    // can trust what it saw statically.
                    let props = callback(fnode);
                    if let Some(element) = props.element {
                        if have & ELEMENT == 0 {
                            fact.element = Some(element);
                        }
                        have |= ELEMENT;
                    }
                    if let Some(type_name) = props.type_name {
                        if have & TYPE == 0 {
                            fact.type_name = Some(type_name);
                        }
                        have |= TYPE;
                    }
                    if let Some(note) = props.note {
                        if have & NOTE == 0 {
                            fact.note = Some(note);
                        }
                        have |= NOTE;
                    }
                    if let Some(score) = props.score {
                        if have & SCORE == 0 {
                            fact.score = Some(score);
                        }
                        have |= SCORE;
                    }
                }
            }
        }

        self.check_at_most(&fact)?;
        self.check_type_in(&fact, left_type)?;
        Ok(fact)
    }

    fn check_at_most(&self, fact: &Fact<E>) -> FathomResult<()> {
        match fact.score {
            Some(score) if score > self.max_score => Err(FathomError::ScoreBound {
                score,
                bound: self.max_score,
            }),
            _ => Ok(()),
        }
    }

    fn check_type_in(&self, fact: &Fact<E>, left_type: Option<&str>) -> FathomResult<()> {
        if self.types.is_empty() {
            return Ok(());
        }
        let (emitted, inherited) = match (&fact.type_name, left_type) {
            (Some(type_name), _) => (type_name.as_str(), false),
            (None, Some(left_type)) => (left_type, true),
            (None, None) => {
                return Err(FathomError::UndeterminedType(format!(
                    "a right-hand side constrained by type_in({}) emitted no type, \
                     and its left-hand side has none to inherit",
                    self.types.iter().cloned().collect::<Vec<_>>().join(", ")
                )))
            }
        };
        if self.types.contains(emitted) {
            Ok(())
        } else {
            Err(FathomError::TypeOutOfBounds {
                type_name: emitted.to_string(),
                allowed: self.types.iter().cloned().collect(),
                inherited,
            })
        }
    }

    /// Work out which types this right-hand side could emit.
    ///
    /// A static `type_()` to the right of every `func()` pins the type. A
    /// `func()` without such a `type_()` could emit anything, so the
    /// `type_in()` set (possibly empty) is all we know.
    pub fn possible_emissions(&self) -> Emissions {
        let mut could_change_type = false;
        for call in self.calls.iter().rev() {
            match call {
                RhsCall::Props(_) => {
                    could_change_type = true;
                    break;
                }
                RhsCall::Type(type_name) => {
                    return Emissions {
                        could_change_type: true,
                        possible_types: BTreeSet::from([type_name.clone()]),
                    }
                }
                _ => {}
            }
        }
        Emissions {
            could_change_type,
            possible_types: if could_change_type {
                self.types.clone()
            } else {
                BTreeSet::new()
            },
        }
    }
}

/// A terminal right-hand side exposing its input fnodes under a key
pub struct OutwardRhs<E> {
    key: String,
    through: Option<ThroughFn<E>>,
}

impl<E> Clone for OutwardRhs<E> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            through: self.through.clone(),
        }
    }
}

impl<E> fmt::Debug for OutwardRhs<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "out({:?})", self.key)?;
        if self.through.is_some() {
            write!(f, ".through(..)")?;
        }
        Ok(())
    }
}

impl<E> OutwardRhs<E> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run each fnode through a callback before handing it to the caller.
    pub fn through<F, V>(&self, callback: F) -> Self
    where
        F: Fn(&Fnode<E>) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        Self {
            key: self.key.clone(),
            through: Some(Arc::new(move |fnode| callback(fnode).into())),
        }
    }

    pub(crate) fn through_fn(&self) -> Option<&ThroughFn<E>> {
        self.through.as_ref()
    }
}

/// Expose the output of a rule's left-hand side to the caller under `key`,
/// retrievable with [`BoundRuleset::get`](crate::BoundRuleset::get).
pub fn out<E>(key: impl Into<String>) -> OutwardRhs<E> {
    OutwardRhs {
        key: key.into(),
        through: None,
    }
}
