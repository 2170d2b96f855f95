//! The left-hand side of a rule
//!
//! Left-hand sides select the fnodes a rule works on. They carry no state of
//! their own: the bound ruleset keeps the caches (per type, and per type for
//! `max()`), so one compiled rule can serve any number of documents.

use crate::side::{Call, Side};
use crate::{FathomError, FathomResult};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lhs {
    /// Elements the tree adapter matches for a selector. Graph root: no
    /// prerequisites and no inherent type.
    Dom { selector: String },
    /// All fnodes proven to carry a type
    Type { type_name: String },
    /// The highest-scoring fnode(s) of a type, ties included
    TypeMax { type_name: String },
    /// Fnodes carrying every one of several types
    And { type_names: Vec<String> },
}

impl Lhs {
    /// The single type every selected fnode is guaranteed to have, if any
    pub fn guaranteed_type(&self) -> Option<&str> {
        match self {
            Lhs::Type { type_name } | Lhs::TypeMax { type_name } => Some(type_name),
            Lhs::Dom { .. } | Lhs::And { .. } => None,
        }
    }

    /// Every type this side reads
    pub fn types_mentioned(&self) -> Vec<&str> {
        match self {
            Lhs::Dom { .. } => Vec::new(),
            Lhs::Type { type_name } | Lhs::TypeMax { type_name } => vec![type_name],
            Lhs::And { type_names } => type_names.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for Lhs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lhs::Dom { selector } => write!(f, "dom({:?})", selector),
            Lhs::Type { type_name } => write!(f, "type_({:?})", type_name),
            Lhs::TypeMax { type_name } => write!(f, "type_({:?}).max()", type_name),
            Lhs::And { type_names } => {
                let args: Vec<String> = type_names
                    .iter()
                    .map(|t| format!("type_({:?})", t))
                    .collect();
                write!(f, "and({})", args.join(", "))
            }
        }
    }
}

impl<E> Side<E> {
    /// Compile this chain as a left-hand side.
    pub fn as_lhs(&self) -> FathomResult<Lhs> {
        let calls = self.calls();
        let mut calls = calls.into_iter();
        let mut lhs = match calls.next() {
            Some(first) => lhs_from_first_call(first)?,
            None => {
                return Err(FathomError::malformed(
                    "The left-hand side of a rule() must start with dom(), type_() or and()",
                ))
            }
        };
        for call in calls {
            lhs = match (lhs, call) {
                (Lhs::Type { .. }, Call::Type(type_name)) => Lhs::Type {
                    type_name: checked_type_name(type_name)?,
                },
                (Lhs::TypeMax { .. }, Call::Type(type_name)) => Lhs::TypeMax {
                    type_name: checked_type_name(type_name)?,
                },
                (Lhs::Type { type_name }, Call::Max) | (Lhs::TypeMax { type_name }, Call::Max) => {
                    Lhs::TypeMax { type_name }
                }
                (lhs @ Lhs::Dom { .. }, Call::Max) | (lhs @ Lhs::And { .. }, Call::Max) => {
                    return Err(FathomError::malformed(format!(
                        "max() can only follow a type_() on a left-hand side, not {}",
                        lhs
                    )))
                }
                (lhs, Call::Type(_)) => {
                    return Err(FathomError::malformed(format!(
                        "type_() cannot refine {}; only type_() left-hand sides can be retyped",
                        lhs
                    )))
                }
                (_, other) => {
                    return Err(FathomError::malformed(format!(
                        "{}() is not allowed on the left-hand side of a rule",
                        other.method_name()
                    )))
                }
            };
        }
        Ok(lhs)
    }
}

fn lhs_from_first_call<E>(call: Call<E>) -> FathomResult<Lhs> {
    match call {
        Call::Dom(selector) => {
            if selector.trim().is_empty() {
                return Err(FathomError::malformed(
                    "A selector is required as the argument to dom()",
                ));
            }
            Ok(Lhs::Dom { selector })
        }
        Call::Type(type_name) => Ok(Lhs::Type {
            type_name: checked_type_name(type_name)?,
        }),
        Call::And(sides) => {
            if sides.is_empty() {
                return Err(FathomError::malformed("and() needs at least one argument"));
            }
            let mut type_names = Vec::with_capacity(sides.len());
            for side in &sides {
                match side.as_lhs()? {
                    Lhs::Type { type_name } => {
                        if !type_names.contains(&type_name) {
                            type_names.push(type_name);
                        }
                    }
                    other => {
                        return Err(FathomError::malformed(format!(
                            "and() supports only plain type_() arguments, got {}",
                            other
                        )))
                    }
                }
            }
            Ok(Lhs::And { type_names })
        }
        other => Err(FathomError::malformed(format!(
            "The left-hand side of a rule() must start with dom(), type_() or and(), not {}()",
            other.method_name()
        ))),
    }
}

pub(crate) fn checked_type_name(type_name: String) -> FathomResult<String> {
    if type_name.is_empty() {
        Err(FathomError::malformed("A type name is required when calling type_()"))
    } else {
        Ok(type_name)
    }
}
