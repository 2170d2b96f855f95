use super::document::Element;
use crate::{FathomError, FathomResult};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use std::collections::HashSet;

#[derive(Parser)]
#[grammar = "src/markup/selector.pest"]
struct SelectorParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOperator {
    /// `[a=v]`
    Equals,
    /// `[a~=v]`: one of the whitespace-separated words
    Includes,
    /// `[a^=v]`
    Prefix,
    /// `[a$=v]`
    Suffix,
    /// `[a*=v]`
    Substring,
    /// `[a|=v]`: exactly `v` or starting with `v-`
    DashMatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    condition: Option<(AttrOperator, String)>,
}

impl AttrTest {
    fn matches(&self, element: &Element) -> bool {
        let Some(actual) = element.attr(&self.name) else {
            return false;
        };
        let Some((operator, expected)) = &self.condition else {
            return true;
        };
        let expected = expected.as_str();
        match operator {
            AttrOperator::Equals => actual == expected,
            AttrOperator::Includes => {
                !expected.is_empty() && actual.split_whitespace().any(|word| word == expected)
            }
            AttrOperator::Prefix => !expected.is_empty() && actual.starts_with(expected),
            AttrOperator::Suffix => !expected.is_empty() && actual.ends_with(expected),
            AttrOperator::Substring => !expected.is_empty() && actual.contains(expected),
            AttrOperator::DashMatch => {
                actual == expected
                    || actual
                        .strip_prefix(expected)
                        .is_some_and(|rest| rest.starts_with('-'))
            }
        }
    }
}

/// One element's worth of conditions, like `a.external[href^="http"]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    /// `None` matches any tag
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if element.name() != tag {
                return false;
            }
        }
        self.ids.iter().all(|id| element.id() == Some(id.as_str()))
            && self.classes.iter().all(|class| element.has_class(class))
            && self.attrs.iter().all(|attr| attr.matches(element))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// Compounds joined by combinators, leftmost first
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    /// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

/// `(alternative, position, element index)` triples known not to match.
/// Only meaningful within one document.
type Misses = HashSet<(usize, usize, usize)>;

impl Complex {
    fn matches(&self, element: &Element, alternative: usize, misses: &mut Misses) -> bool {
        self.compounds
            .len()
            .checked_sub(1)
            .is_some_and(|last| self.matches_at(element, last, alternative, misses))
    }

    /// Whether `element` matches `compounds[position]` with everything left
    /// of it satisfied by its ancestors. Failures are remembered so that
    /// descendant combinators don't retry the same ancestor over and over.
    fn matches_at(
        &self,
        element: &Element,
        position: usize,
        alternative: usize,
        misses: &mut Misses,
    ) -> bool {
        let key = (alternative, position, element.index());
        if misses.contains(&key) {
            return false;
        }
        let matched = self.compounds[position].matches(element)
            && (position == 0
                || match self.combinators[position - 1] {
                    Combinator::Child => element.parent().is_some_and(|parent| {
                        self.matches_at(&parent, position - 1, alternative, misses)
                    }),
                    Combinator::Descendant => element.ancestors().any(|ancestor| {
                        self.matches_at(&ancestor, position - 1, alternative, misses)
                    }),
                });
        if !matched {
            misses.insert(key);
        }
        matched
    }
}

/// A compiled selector group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(source: &str) -> FathomResult<Self> {
        let group = SelectorParser::parse(Rule::selector_group, source)
            .map_err(|e| FathomError::Selector(format!("'{}': {}", source, e.variant)))?
            .next()
            .ok_or_else(|| FathomError::Selector(format!("'{}' is empty", source)))?;

        let alternatives = group
            .into_inner()
            .filter(|pair| pair.as_rule() == Rule::complex)
            .map(parse_complex)
            .collect();

        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, element: &Element) -> bool {
        self.matches_remembering(element, &mut Misses::new())
    }

    /// The elements that match, in the order given. They must all belong to
    /// one document.
    pub fn filter(&self, elements: impl IntoIterator<Item = Element>) -> Vec<Element> {
        let mut misses = Misses::new();
        elements
            .into_iter()
            .filter(|element| self.matches_remembering(element, &mut misses))
            .collect()
    }

    fn matches_remembering(&self, element: &Element, misses: &mut Misses) -> bool {
        self.alternatives
            .iter()
            .enumerate()
            .any(|(alternative, complex)| complex.matches(element, alternative, misses))
    }
}

fn parse_complex(pair: Pair<Rule>) -> Complex {
    let mut complex = Complex {
        compounds: Vec::new(),
        combinators: Vec::new(),
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::compound => complex.compounds.push(parse_compound(inner)),
            Rule::child_combinator => complex.combinators.push(Combinator::Child),
            Rule::descendant_combinator => complex.combinators.push(Combinator::Descendant),
            _ => {}
        }
    }
    complex
}

fn parse_compound(pair: Pair<Rule>) -> Compound {
    let mut compound = Compound::default();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::type_selector => compound.tag = Some(inner.as_str().to_ascii_lowercase()),
            Rule::id_selector => compound.ids.push(inner_name(inner)),
            Rule::class_selector => compound.classes.push(inner_name(inner)),
            Rule::attribute_selector => compound.attrs.push(parse_attr_test(inner)),
            _ => {}
        }
    }
    compound
}

fn inner_name(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|name| name.as_str().to_string())
        .unwrap_or_default()
}

fn parse_attr_test(pair: Pair<Rule>) -> AttrTest {
    let mut name = String::new();
    let mut operator = None;
    let mut value = String::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::attr_name => name = inner.as_str().to_ascii_lowercase(),
            Rule::attr_operator => {
                operator = Some(match inner.as_str() {
                    "~=" => AttrOperator::Includes,
                    "^=" => AttrOperator::Prefix,
                    "$=" => AttrOperator::Suffix,
                    "*=" => AttrOperator::Substring,
                    "|=" => AttrOperator::DashMatch,
                    _ => AttrOperator::Equals,
                })
            }
            Rule::double_quoted | Rule::single_quoted | Rule::bare_value => {
                value = inner.as_str().to_string()
            }
            _ => {}
        }
    }
    AttrTest {
        name,
        condition: operator.map(|operator| (operator, value)),
    }
}
