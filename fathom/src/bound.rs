//! A ruleset bound to one tree
//!
//! Answers queries by:
//! 1. Working out which inward rules the query transitively needs
//! 2. Skipping the ones that already ran for this tree
//! 3. Running the rest in dependency order, each exactly once
//! 4. Reading the answer off the per-type caches those rules filled in

use crate::lhs::Lhs;
use crate::planner::{self, Plan};
use crate::rhs::Fact;
use crate::rule::RuleId;
use crate::side::Side;
use crate::tree::Tree;
use crate::{FathomError, FathomResult, Fnode, FnodeId, Ruleset};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, trace};

/// Something to ask a [`BoundRuleset`] for
pub enum Query<E> {
    /// The key of an `out()` rule
    Key(String),
    /// Any left-hand side, run as an anonymous `out()` rule
    Lhs(Side<E>),
    /// A tree element, annotated by every inward rule
    Element(E),
}

impl<E> From<&str> for Query<E> {
    fn from(key: &str) -> Self {
        Query::Key(key.to_string())
    }
}

impl<E> From<String> for Query<E> {
    fn from(key: String) -> Self {
        Query::Key(key)
    }
}

impl<E> From<Side<E>> for Query<E> {
    fn from(side: Side<E>) -> Self {
        Query::Lhs(side)
    }
}

/// A [`Ruleset`] earmarked to analyze one tree, plus everything derived so far
pub struct BoundRuleset<'a, T: Tree> {
    ruleset: &'a Ruleset<T::Element>,
    tree: &'a T,
    fnodes: Vec<Fnode<T::Element>>,
    fnode_ids: HashMap<T::Element, FnodeId>,
    /// Inward rule => the fnodes it emitted. Presence means the rule is done.
    rule_cache: HashMap<RuleId, Vec<FnodeId>>,
    /// Rules that failed partway; they must not run again
    failed: HashMap<RuleId, FathomError>,
    type_cache: HashMap<String, BTreeSet<FnodeId>>,
    max_cache: HashMap<String, Vec<FnodeId>>,
}

impl<'a, T: Tree> BoundRuleset<'a, T> {
    pub(crate) fn new(ruleset: &'a Ruleset<T::Element>, tree: &'a T) -> Self {
        Self {
            ruleset,
            tree,
            fnodes: Vec::new(),
            fnode_ids: HashMap::new(),
            rule_cache: HashMap::new(),
            failed: HashMap::new(),
            type_cache: HashMap::new(),
            max_cache: HashMap::new(),
        }
    }

    pub fn ruleset(&self) -> &'a Ruleset<T::Element> {
        self.ruleset
    }

    pub fn tree(&self) -> &'a T {
        self.tree
    }

    /// Answer a query, running whatever rules it needs first.
    ///
    /// For an out() key or a left-hand side, returns the fnodes the left-hand
    /// side selects. For an element, runs every inward rule and returns that
    /// element's fnode.
    pub fn get(
        &mut self,
        query: impl Into<Query<T::Element>>,
    ) -> FathomResult<Vec<&Fnode<T::Element>>> {
        let ruleset = self.ruleset;
        let ids = match query.into() {
            Query::Key(key) => {
                let rule = ruleset.outward_rule(&key)?;
                self.run_lhs(&rule.lhs)?
            }
            Query::Lhs(side) => {
                let lhs = side.as_lhs()?;
                self.run_lhs(&lhs)?
            }
            Query::Element(element) => {
                self.run_inward(ruleset.inward_rules().iter().copied())?;
                vec![self.fnode_for(element)]
            }
        };
        Ok(ids.iter().map(|id| &self.fnodes[id.0]).collect())
    }

    /// Run an out() rule and hand its fnodes through its `through()`
    /// callback. Without a callback, each fnode is serialized.
    pub fn emit(&mut self, key: &str) -> FathomResult<Vec<Value>> {
        let ruleset = self.ruleset;
        let rule = ruleset.outward_rule(key)?;
        let ids = self.run_lhs(&rule.lhs)?;
        let through = rule.rhs.through_fn();
        Ok(ids
            .iter()
            .map(|id| {
                let fnode = &self.fnodes[id.0];
                match through {
                    Some(callback) => callback(fnode),
                    None => serde_json::to_value(fnode).unwrap_or(Value::Null),
                }
            })
            .collect())
    }

    /// The fnode for an element, after running every inward rule
    pub fn fnode_for_element(&mut self, element: T::Element) -> FathomResult<&Fnode<T::Element>> {
        let ruleset = self.ruleset;
        self.run_inward(ruleset.inward_rules().iter().copied())?;
        let id = self.fnode_for(element);
        Ok(&self.fnodes[id.0])
    }

    pub fn fnode(&self, id: FnodeId) -> Option<&Fnode<T::Element>> {
        self.fnodes.get(id.0)
    }

    /// The fnode for an element as it stands, without running anything
    pub fn lookup(&self, element: &T::Element) -> Option<&Fnode<T::Element>> {
        self.fnode_ids.get(element).map(|id| &self.fnodes[id.0])
    }

    /// Every fnode created so far, in creation order
    pub fn fnodes(&self) -> &[Fnode<T::Element>] {
        &self.fnodes
    }

    pub fn is_done(&self, rule: RuleId) -> bool {
        self.rule_cache.contains_key(&rule)
    }

    pub fn done_rules(&self) -> BTreeSet<RuleId> {
        self.rule_cache.keys().copied().collect()
    }

    /// The fnodes a finished inward rule emitted
    pub fn rule_results(&self, rule: RuleId) -> Option<&[FnodeId]> {
        self.rule_cache.get(&rule).map(Vec::as_slice)
    }

    pub fn inward_rules_that_could_emit(&self, type_name: &str) -> &'a [RuleId] {
        self.ruleset.inward_rules_that_could_emit(type_name)
    }

    pub fn inward_rules_that_could_add(&self, type_name: &str) -> &'a [RuleId] {
        self.ruleset.inward_rules_that_could_add(type_name)
    }

    /// Direct prerequisites of an inward rule
    pub fn prerequisites(&self, rule: RuleId) -> FathomResult<BTreeSet<RuleId>> {
        self.ruleset.prerequisites(rule)
    }

    /// The not-yet-done prerequisite closure of a rule, as prerequisite =>
    /// rules that need it
    pub fn prerequisites_to(&self, rule: RuleId) -> FathomResult<BTreeMap<RuleId, Vec<RuleId>>> {
        Ok(self.plan([rule])?.needers)
    }

    /// Every fnode created so far, with its element's debug form
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.fnodes
                .iter()
                .map(|fnode| {
                    let mut value = serde_json::to_value(fnode).unwrap_or(Value::Null);
                    if let Value::Object(map) = &mut value {
                        map.insert(
                            "element".to_string(),
                            Value::String(format!("{:?}", fnode.element())),
                        );
                    }
                    value
                })
                .collect(),
        )
    }

    fn plan(&self, roots: impl IntoIterator<Item = RuleId>) -> FathomResult<Plan> {
        let ruleset = self.ruleset;
        planner::collect_prerequisites(
            roots,
            |rule| ruleset.prerequisites(rule),
            |rule| self.rule_cache.contains_key(&rule),
        )
    }

    /// Run a left-hand side's prerequisites, then select with it.
    fn run_lhs(&mut self, lhs: &Lhs) -> FathomResult<Vec<FnodeId>> {
        let prereqs = self.ruleset.lhs_prerequisites(lhs, None)?;
        self.run_inward(prereqs)?;
        self.select(lhs)
    }

    /// Make sure the given inward rules and everything they need have run.
    fn run_inward(&mut self, roots: impl IntoIterator<Item = RuleId>) -> FathomResult<()> {
        let plan = self.plan(roots)?;
        if plan.rules.is_empty() {
            return Ok(());
        }
        let order = planner::topological_sort(&plan)?;
        trace!(?order, "planned rule execution");

        for rule in order {
            if let Some(error) = self.failed.get(&rule) {
                return Err(error.clone());
            }
            if let Err(error) = self.execute(rule) {
                self.failed.insert(rule, error.clone());
                return Err(error);
            }
        }
        Ok(())
    }

    fn execute(&mut self, id: RuleId) -> FathomResult<()> {
        let ruleset = self.ruleset;
        let rule = ruleset.inward_rule(id)?;
        let left_type = rule.lhs.guaranteed_type();
        let inputs = self.select(&rule.lhs)?;
        debug!(rule = %id, lhs = %rule.lhs, inputs = inputs.len(), "executing rule");

        // Every fact is made before any is merged, so a bad right-hand side
        // leaves the ledger untouched.
        let facts = inputs
            .into_iter()
            .map(|input| {
                rule.rhs
                    .fact(&self.fnodes[input.0], left_type)
                    .map(|fact| (input, fact))
            })
            .collect::<FathomResult<Vec<_>>>()?;

        let mut results = Vec::new();
        let mut seen = HashSet::new();
        for (input, fact) in facts {
            let target = self.merge(input, left_type, fact)?;
            // Several inputs may be redirected to one element.
            if seen.insert(target) {
                results.push(target);
            }
        }

        for target in &results {
            for type_name in self.fnodes[target.0].types() {
                self.type_cache
                    .entry(type_name.to_string())
                    .or_default()
                    .insert(*target);
            }
        }
        self.rule_cache.insert(id, results);
        // A rule reading `max()` of a type it also emits has just moved the scores.
        for type_name in rule.types_it_could_emit() {
            self.max_cache.remove(type_name);
        }
        Ok(())
    }

    /// Fold one fact into the ledger and return the fnode it landed on.
    fn merge(
        &mut self,
        left: FnodeId,
        left_type: Option<&str>,
        fact: Fact<T::Element>,
    ) -> FathomResult<FnodeId> {
        let target = match fact.element {
            Some(element) => self.fnode_for(element),
            None => left,
        };
        let right_type = fact.type_name.as_deref().or(left_type);
        trace!(%left, %target, ?right_type, "merging fact");

        if fact.conserve_score {
            let (Some(source_type), Some(target_type)) = (left_type, right_type) else {
                return Err(FathomError::UndeterminedType(
                    "conserve_score() needs a left-hand side with a type to conserve; \
                     dom() and and() have none"
                        .to_string(),
                ));
            };
            let source_score = self.fnodes[left.0].score_for(source_type);
            self.fnodes[target.0].conserve_score_from(left, source_type, source_score, target_type);
        }

        if let Some(score) = fact.score {
            let target_type = right_type.ok_or_else(|| {
                FathomError::UndeterminedType(format!(
                    "a score of {} was given but neither the fact nor the left-hand side has a type",
                    score
                ))
            })?;
            self.fnodes[target.0].multiply_score_for(target_type, score);
        }

        if fact.type_name.is_some() || fact.note.is_some() {
            let target_type = right_type.ok_or_else(|| {
                FathomError::UndeterminedType(
                    "a note was given but neither the fact nor the left-hand side has a type"
                        .to_string(),
                )
            })?;
            self.fnodes[target.0].set_note_for(target_type, fact.note.unwrap_or(Value::Null))?;
        }

        Ok(target)
    }

    /// The fnodes a left-hand side selects right now. Callers run its
    /// prerequisites first.
    fn select(&mut self, lhs: &Lhs) -> FathomResult<Vec<FnodeId>> {
        match lhs {
            Lhs::Dom { selector } => {
                let elements = self.tree.select(selector)?;
                Ok(elements
                    .into_iter()
                    .map(|element| self.fnode_for(element))
                    .collect())
            }
            Lhs::Type { type_name } => Ok(self.fnodes_of_type(type_name)),
            Lhs::TypeMax { type_name } => {
                if let Some(cached) = self.max_cache.get(type_name) {
                    return Ok(cached.clone());
                }
                let mut best = f64::NEG_INFINITY;
                let mut maxes = Vec::new();
                for id in self.fnodes_of_type(type_name) {
                    let score = self.fnodes[id.0].score_for(type_name);
                    if score > best {
                        best = score;
                        maxes.clear();
                        maxes.push(id);
                    } else if score == best {
                        maxes.push(id);
                    }
                }
                self.max_cache.insert(type_name.clone(), maxes.clone());
                Ok(maxes)
            }
            Lhs::And { type_names } => {
                let Some((first, rest)) = type_names.split_first() else {
                    return Ok(Vec::new());
                };
                Ok(self
                    .fnodes_of_type(first)
                    .into_iter()
                    .filter(|id| {
                        let fnode = &self.fnodes[id.0];
                        rest.iter().all(|type_name| fnode.has_type(type_name))
                    })
                    .collect())
            }
        }
    }

    fn fnodes_of_type(&self, type_name: &str) -> Vec<FnodeId> {
        self.type_cache
            .get(type_name)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The fnode for an element, created on first sight
    fn fnode_for(&mut self, element: T::Element) -> FnodeId {
        if let Some(id) = self.fnode_ids.get(&element) {
            return *id;
        }
        let id = FnodeId(self.fnodes.len());
        self.fnodes.push(Fnode::new(id, element.clone()));
        self.fnode_ids.insert(element, id);
        id
    }
}
