//! The per-element fact ledger
//!
//! An [`Fnode`] holds everything the rules have said about one element of the
//! tree: a running score for each type it has been given, an optional
//! write-once note per type, and a record of which upstream scores have already
//! been conserved into it.

use crate::{FathomError, FathomResult};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// Identity of an fnode within one [`BoundRuleset`](crate::BoundRuleset)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FnodeId(pub usize);

impl fmt::Display for FnodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fnode_{}", self.0)
    }
}

/// Score and note that one type carries on one fnode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeRecord {
    pub score: f64,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub note: Value,
}

impl Default for TypeRecord {
    fn default() -> Self {
        Self {
            score: 1.0,
            note: Value::Null,
        }
    }
}

/// A tree element annotated with scores, notes and types
#[derive(Debug, Clone, Serialize)]
pub struct Fnode<E> {
    #[serde(skip)]
    id: FnodeId,
    #[serde(skip)]
    element: E,
    types: BTreeMap<String, TypeRecord>,
    /// Source fnode => types whose score on that fnode has already been
    /// multiplied into this one
    #[serde(skip)]
    conserved: HashMap<FnodeId, HashSet<String>>,
}

impl<E> Fnode<E> {
    pub(crate) fn new(id: FnodeId, element: E) -> Self {
        Self {
            id,
            element,
            types: BTreeMap::new(),
            conserved: HashMap::new(),
        }
    }

    pub fn id(&self) -> FnodeId {
        self.id
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    /// Whether any rule has attached the given type to this fnode
    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// The score for a type, 1 if nothing has touched it yet
    pub fn score_for(&self, type_name: &str) -> f64 {
        self.types.get(type_name).map_or(1.0, |record| record.score)
    }

    /// The note for a type, if one has been set
    pub fn note_for(&self, type_name: &str) -> Option<&Value> {
        self.types
            .get(type_name)
            .map(|record| &record.note)
            .filter(|note| !note.is_null())
    }

    pub fn has_note_for(&self, type_name: &str) -> bool {
        self.note_for(type_name).is_some()
    }

    /// Types attached so far, in name order
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Multiply the score for a type in place, attaching the type if needed.
    pub fn multiply_score_for(&mut self, type_name: &str, factor: f64) {
        self.record_for_setting(type_name).score *= factor;
    }

    /// Set the note for a type, attaching the type if needed.
    ///
    /// A null note never overwrites anything. A defined note may be written
    /// once; writing the same value again is a no-op and writing a different
    /// one is an error.
    pub fn set_note_for(&mut self, type_name: &str, note: Value) -> FathomResult<()> {
        let record = self.record_for_setting(type_name);
        if note.is_null() {
            return Ok(());
        }
        if record.note.is_null() {
            record.note = note;
            Ok(())
        } else if record.note == note {
            Ok(())
        } else {
            Err(FathomError::NoteConflict {
                type_name: type_name.to_string(),
                existing: record.note.clone(),
                attempted: note,
            })
        }
    }

    /// Multiply `target_type`'s score by the score `source` has for
    /// `source_type`, at most once per (source, source_type) pair.
    ///
    /// The caller reads `source_score` off the source fnode first, since the
    /// source is often this very fnode. Returns whether the multiplication
    /// happened.
    pub fn conserve_score_from(
        &mut self,
        source: FnodeId,
        source_type: &str,
        source_score: f64,
        target_type: &str,
    ) -> bool {
        let seen = self.conserved.entry(source).or_default();
        if seen.contains(source_type) {
            // Still make sure the target type is attached.
            self.record_for_setting(target_type);
            return false;
        }
        seen.insert(source_type.to_string());
        self.multiply_score_for(target_type, source_score);
        true
    }

    /// Source fnodes and types already conserved into this fnode
    pub fn conserved_sources(&self) -> BTreeMap<FnodeId, BTreeSet<&str>> {
        self.conserved
            .iter()
            .map(|(source, types)| (*source, types.iter().map(String::as_str).collect()))
            .collect()
    }

    fn record_for_setting(&mut self, type_name: &str) -> &mut TypeRecord {
        self.types.entry(type_name.to_string()).or_default()
    }
}
