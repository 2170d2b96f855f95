//! Execution planning
//!
//! Plans a query in two phases:
//! 1. Walk the prerequisites of the requested rules, skipping rules that are
//!    already done, and record who needs whom
//! 2. Topologically sort what was collected so every rule runs after the
//!    rules it needs
//!
//! Both phases are iterative, so deep or cyclic rulesets can't overflow the
//! stack. Both report cycles as [`FathomError::CircularDependency`].

use crate::rule::RuleId;
use crate::{FathomError, FathomResult};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Undone rules a query needs, and the needs relation between them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Every rule collected, the requested roots included
    pub rules: BTreeSet<RuleId>,
    /// prerequisite => rules that need it, in discovery order
    pub needers: BTreeMap<RuleId, Vec<RuleId>>,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Mark {
    Executing,
    Collected,
}

struct Frame {
    rule: RuleId,
    prereqs: Vec<RuleId>,
    next: usize,
}

/// Collect the transitive, not-yet-done prerequisites of `roots`.
///
/// `prerequisites_of` gives a rule's direct prerequisites; `is_done` tells
/// which rules have already run and can be left out. Meeting a rule that is
/// still being walked means the ruleset has no valid order.
pub fn collect_prerequisites<P, D>(
    roots: impl IntoIterator<Item = RuleId>,
    mut prerequisites_of: P,
    is_done: D,
) -> FathomResult<Plan>
where
    P: FnMut(RuleId) -> FathomResult<BTreeSet<RuleId>>,
    D: Fn(RuleId) -> bool,
{
    let mut plan = Plan::default();
    let mut marks: HashMap<RuleId, Mark> = HashMap::new();

    let mut open = |rule: RuleId,
                    marks: &mut HashMap<RuleId, Mark>,
                    plan: &mut Plan|
     -> FathomResult<Frame> {
        marks.insert(rule, Mark::Executing);
        plan.rules.insert(rule);
        let prereqs = prerequisites_of(rule)?
            .into_iter()
            .filter(|prereq| !is_done(*prereq))
            .collect();
        Ok(Frame {
            rule,
            prereqs,
            next: 0,
        })
    };

    for root in roots {
        if is_done(root) || marks.contains_key(&root) {
            continue;
        }
        let mut stack = vec![open(root, &mut marks, &mut plan)?];

        while let Some(frame) = stack.last_mut() {
            if frame.next == frame.prereqs.len() {
                marks.insert(frame.rule, Mark::Collected);
                stack.pop();
                continue;
            }
            let prereq = frame.prereqs[frame.next];
            let needer = frame.rule;
            frame.next += 1;

            plan.needers.entry(prereq).or_default().push(needer);
            match marks.get(&prereq).copied() {
                Some(Mark::Executing) => {
                    return Err(FathomError::CircularDependency(format!(
                        "There is a cyclic dependency in the ruleset: {} needs {}, \
                         which is still waiting on its own prerequisites",
                        needer, prereq
                    )))
                }
                Some(Mark::Collected) => {}
                None => {
                    let frame = open(prereq, &mut marks, &mut plan)?;
                    stack.push(frame);
                }
            }
        }
    }

    Ok(plan)
}

/// Order the rules of a plan so that each comes after everything it needs.
pub fn topological_sort(plan: &Plan) -> FathomResult<Vec<RuleId>> {
    // Count how many prerequisites each rule is waiting on
    let mut dependency_count: BTreeMap<RuleId, usize> =
        plan.rules.iter().map(|rule| (*rule, 0)).collect();
    for needers in plan.needers.values() {
        for needer in needers {
            if let Some(count) = dependency_count.get_mut(needer) {
                *count += 1;
            }
        }
    }

    // Start with rules that need nothing
    let mut queue: VecDeque<RuleId> = dependency_count
        .iter()
        .filter(|(_, &count)| count == 0)
        .map(|(rule, _)| *rule)
        .collect();

    let mut result = Vec::with_capacity(plan.rules.len());

    while let Some(rule) = queue.pop_front() {
        result.push(rule);

        if let Some(needers) = plan.needers.get(&rule) {
            for needer in needers {
                if let Some(count) = dependency_count.get_mut(needer) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(*needer);
                    }
                }
            }
        }
    }

    // Anything left over is stuck in a cycle
    if result.len() != plan.rules.len() {
        let stuck: Vec<String> = dependency_count
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|(rule, _)| rule.to_string())
            .collect();
        return Err(FathomError::CircularDependency(format!(
            "There is a cyclic dependency in the ruleset among {}",
            stuck.join(", ")
        )));
    }

    Ok(result)
}
