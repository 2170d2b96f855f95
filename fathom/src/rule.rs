use crate::lhs::Lhs;
use crate::rhs::{InwardRhs, OutwardRhs};
use crate::side::Side;
use crate::{FathomError, FathomResult};
use std::collections::BTreeSet;
use std::fmt;

/// Position of a rule within its [`Ruleset`](crate::Ruleset)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub usize);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule #{}", self.0)
    }
}

/// The right-hand side of a rule as authored
pub enum RhsSpec<E> {
    Inward(Side<E>),
    Outward(OutwardRhs<E>),
}

impl<E> Clone for RhsSpec<E> {
    fn clone(&self) -> Self {
        match self {
            RhsSpec::Inward(side) => RhsSpec::Inward(side.clone()),
            RhsSpec::Outward(out) => RhsSpec::Outward(out.clone()),
        }
    }
}

impl<E> From<Side<E>> for RhsSpec<E> {
    fn from(side: Side<E>) -> Self {
        RhsSpec::Inward(side)
    }
}

impl<E> From<OutwardRhs<E>> for RhsSpec<E> {
    fn from(out: OutwardRhs<E>) -> Self {
        RhsSpec::Outward(out)
    }
}

/// A rule as authored: an uncompiled left-hand side and right-hand side
pub struct Rule<E> {
    lhs: Side<E>,
    rhs: RhsSpec<E>,
}

impl<E> Clone for Rule<E> {
    fn clone(&self) -> Self {
        Self {
            lhs: self.lhs.clone(),
            rhs: self.rhs.clone(),
        }
    }
}

impl<E> fmt::Debug for Rule<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rhs {
            RhsSpec::Inward(side) => write!(f, "rule({:?}, {:?})", self.lhs, side),
            RhsSpec::Outward(out) => write!(f, "rule({:?}, {:?})", self.lhs, out),
        }
    }
}

/// Pair a left-hand side with a right-hand side.
///
/// Nothing is checked here; the rule is compiled when it joins a
/// [`Ruleset`](crate::Ruleset).
pub fn rule<E>(lhs: Side<E>, rhs: impl Into<RhsSpec<E>>) -> Rule<E> {
    Rule {
        lhs,
        rhs: rhs.into(),
    }
}

impl<E> Rule<E> {
    pub fn lhs(&self) -> &Side<E> {
        &self.lhs
    }

    pub fn rhs(&self) -> &RhsSpec<E> {
        &self.rhs
    }

    pub(crate) fn compile(&self, id: RuleId) -> FathomResult<CompiledRule<E>> {
        let lhs = self.lhs.as_lhs()?;
        match &self.rhs {
            RhsSpec::Inward(side) => {
                let rhs = side.as_rhs()?;
                let (could_emit, could_add) = static_types(id, &lhs, &rhs)?;
                Ok(CompiledRule::Inward(InwardRule {
                    id,
                    lhs,
                    rhs,
                    could_emit,
                    could_add,
                }))
            }
            RhsSpec::Outward(out) => Ok(CompiledRule::Outward(OutwardRule {
                id,
                lhs,
                rhs: out.clone(),
            })),
        }
    }
}

fn static_types<E>(
    id: RuleId,
    lhs: &Lhs,
    rhs: &InwardRhs<E>,
) -> FathomResult<(BTreeSet<String>, BTreeSet<String>)> {
    let emissions = rhs.possible_emissions();
    let could_emit: BTreeSet<String> = if emissions.could_change_type {
        if emissions.possible_types.is_empty() {
            return Err(FathomError::malformed(format!(
                "Could not determine the emitted type of {} because its right-hand side \
                 calls func() without calling type_in()",
                id
            )));
        }
        emissions.possible_types
    } else {
        match lhs.guaranteed_type() {
            Some(type_name) => BTreeSet::from([type_name.to_string()]),
            None => {
                return Err(FathomError::malformed(format!(
                    "The right-hand side of {} ({}) must assign a type, since its \
                     left-hand side has none to pass through",
                    id, lhs
                )))
            }
        }
    };
    let could_add = could_emit
        .iter()
        .filter(|type_name| Some(type_name.as_str()) != lhs.guaranteed_type())
        .cloned()
        .collect();
    Ok((could_emit, could_add))
}

/// A rule whose output goes back into the ledger
#[derive(Debug)]
pub struct InwardRule<E> {
    pub(crate) id: RuleId,
    pub(crate) lhs: Lhs,
    pub(crate) rhs: InwardRhs<E>,
    could_emit: BTreeSet<String>,
    could_add: BTreeSet<String>,
}

impl<E> InwardRule<E> {
    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn lhs(&self) -> &Lhs {
        &self.lhs
    }

    pub fn rhs(&self) -> &InwardRhs<E> {
        &self.rhs
    }

    /// Types this rule might emit, including a passed-through input type
    pub fn types_it_could_emit(&self) -> &BTreeSet<String> {
        &self.could_emit
    }

    /// Types this rule might attach to an fnode that didn't have them
    pub fn types_it_could_add(&self) -> &BTreeSet<String> {
        &self.could_add
    }
}

/// A terminal rule, run fresh for every query
#[derive(Debug)]
pub struct OutwardRule<E> {
    pub(crate) id: RuleId,
    pub(crate) lhs: Lhs,
    pub(crate) rhs: OutwardRhs<E>,
}

impl<E> OutwardRule<E> {
    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn key(&self) -> &str {
        self.rhs.key()
    }

    pub fn lhs(&self) -> &Lhs {
        &self.lhs
    }
}

#[derive(Debug)]
pub enum CompiledRule<E> {
    Inward(InwardRule<E>),
    Outward(OutwardRule<E>),
}

impl<E> CompiledRule<E> {
    pub fn id(&self) -> RuleId {
        match self {
            CompiledRule::Inward(rule) => rule.id,
            CompiledRule::Outward(rule) => rule.id,
        }
    }

    pub fn lhs(&self) -> &Lhs {
        match self {
            CompiledRule::Inward(rule) => &rule.lhs,
            CompiledRule::Outward(rule) => &rule.lhs,
        }
    }
}
