//! Rulesets and their static type analysis
//!
//! Building a [`Ruleset`] compiles every rule, splits them into inward and
//! outward rules, and indexes the inward ones by the types they could emit or
//! add. Those indices are all the planner needs to work out which rules a
//! query depends on.

use crate::lhs::Lhs;
use crate::rule::{CompiledRule, InwardRule, OutwardRule, Rule, RuleId};
use crate::tree::Tree;
use crate::{BoundRuleset, FathomError, FathomResult};
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

pub struct Ruleset<E> {
    rules: Vec<Rule<E>>,
    compiled: Vec<CompiledRule<E>>,
    inward: Vec<RuleId>,
    outward: HashMap<String, RuleId>,
    could_emit: HashMap<String, Vec<RuleId>>,
    could_add: HashMap<String, Vec<RuleId>>,
}

impl<E> Ruleset<E> {
    /// Compile and index a list of rules.
    ///
    /// Fails if any rule is malformed, including inward rules whose emitted
    /// types can't be worked out statically.
    pub fn new(rules: impl IntoIterator<Item = Rule<E>>) -> FathomResult<Self> {
        let rules: Vec<Rule<E>> = rules.into_iter().collect();
        let mut ruleset = Ruleset {
            compiled: Vec::with_capacity(rules.len()),
            rules: Vec::new(),
            inward: Vec::new(),
            outward: HashMap::new(),
            could_emit: HashMap::new(),
            could_add: HashMap::new(),
        };

        for (index, rule) in rules.iter().enumerate() {
            let id = RuleId(index);
            let compiled = rule.compile(id)?;
            match &compiled {
                CompiledRule::Inward(inward) => {
                    ruleset.inward.push(id);
                    for type_name in inward.types_it_could_emit() {
                        ruleset
                            .could_emit
                            .entry(type_name.clone())
                            .or_default()
                            .push(id);
                    }
                    for type_name in inward.types_it_could_add() {
                        ruleset
                            .could_add
                            .entry(type_name.clone())
                            .or_default()
                            .push(id);
                    }
                }
                CompiledRule::Outward(outward) => {
                    if let Some(previous) = ruleset.outward.insert(outward.key().to_string(), id)
                    {
                        warn!(
                            key = outward.key(),
                            %previous,
                            replacement = %id,
                            "duplicate out() key; the later rule shadows the earlier one"
                        );
                    }
                }
            }
            ruleset.compiled.push(compiled);
        }

        ruleset.rules = rules;
        Ok(ruleset)
    }

    /// Bind this ruleset to a tree, ready for querying.
    pub fn against<'a, T>(&'a self, tree: &'a T) -> BoundRuleset<'a, T>
    where
        T: Tree<Element = E>,
    {
        BoundRuleset::new(self, tree)
    }

    /// The rules as they were passed in
    pub fn rules(&self) -> &[Rule<E>] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> Option<&CompiledRule<E>> {
        self.compiled.get(id.0)
    }

    pub fn inward_rules(&self) -> &[RuleId] {
        &self.inward
    }

    pub fn inward_rule(&self, id: RuleId) -> FathomResult<&InwardRule<E>> {
        match self.compiled.get(id.0) {
            Some(CompiledRule::Inward(rule)) => Ok(rule),
            Some(CompiledRule::Outward(_)) => Err(FathomError::malformed(format!(
                "{} is an out() rule and cannot be executed as an inward one",
                id
            ))),
            None => Err(FathomError::malformed(format!("{} does not exist", id))),
        }
    }

    /// The out() rule registered under a key
    pub fn outward_rule(&self, key: &str) -> FathomResult<&OutwardRule<E>> {
        let id = self
            .outward
            .get(key)
            .ok_or_else(|| FathomError::UnknownKey(key.to_string()))?;
        match &self.compiled[id.0] {
            CompiledRule::Outward(rule) => Ok(rule),
            CompiledRule::Inward(_) => Err(FathomError::UnknownKey(key.to_string())),
        }
    }

    pub fn out_keys(&self) -> impl Iterator<Item = &str> {
        self.outward.keys().map(String::as_str)
    }

    /// Inward rules whose output might carry a type, pass-through rules included
    pub fn inward_rules_that_could_emit(&self, type_name: &str) -> &[RuleId] {
        self.could_emit
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Inward rules that might attach a type to an fnode lacking it
    pub fn inward_rules_that_could_add(&self, type_name: &str) -> &[RuleId] {
        self.could_add
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The inward rules that must finish before an inward rule can run
    pub fn prerequisites(&self, id: RuleId) -> FathomResult<BTreeSet<RuleId>> {
        let rule = self.inward_rule(id)?;
        let mut prereqs = self.lhs_prerequisites(&rule.lhs, Some(rule))?;
        prereqs.remove(&id);
        Ok(prereqs)
    }

    /// The inward rules that must finish before a left-hand side can be read.
    ///
    /// `consumer` is the inward rule reading it, if any. A rule that reads a
    /// type and could emit that same type back only refines scores, so it
    /// waits for the rules that add the type rather than for every rule that
    /// emits it. Everyone else, and every `max()`, waits for all emitters so
    /// that the scores they see are final.
    ///
    /// A plain `type_(t)` reader could start once every adder of `t` is done,
    /// since the set of `t` fnodes is complete by then. It waits for the
    /// pass-through refiners of `t` as well, which makes its scores and
    /// notes independent of rule order at the cost of a longer plan.
    pub fn lhs_prerequisites(
        &self,
        lhs: &Lhs,
        consumer: Option<&InwardRule<E>>,
    ) -> FathomResult<BTreeSet<RuleId>> {
        let refines = |type_name: &str| {
            consumer.is_some_and(|rule| rule.types_it_could_emit().contains(type_name))
        };
        let mut prereqs = BTreeSet::new();
        match lhs {
            Lhs::Dom { .. } => {}
            Lhs::Type { type_name } => {
                prereqs.extend(self.type_prerequisites(type_name, refines(type_name))?);
            }
            Lhs::TypeMax { type_name } => {
                prereqs.extend(self.type_prerequisites(type_name, false)?);
            }
            Lhs::And { type_names } => {
                for type_name in type_names {
                    prereqs.extend(self.type_prerequisites(type_name, refines(type_name))?);
                }
            }
        }
        Ok(prereqs)
    }

    fn type_prerequisites(&self, type_name: &str, adders_only: bool) -> FathomResult<Vec<RuleId>> {
        let adders = self.inward_rules_that_could_add(type_name);
        if adders.is_empty() {
            return Err(FathomError::MissingProducer {
                type_name: type_name.to_string(),
            });
        }
        if adders_only {
            Ok(adders.to_vec())
        } else {
            Ok(self.inward_rules_that_could_emit(type_name).to_vec())
        }
    }
}

impl<E> std::fmt::Debug for Ruleset<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.rules.iter()).finish()
    }
}
