use super::entities;
use super::selector::Selector;
use super::Span;
use crate::resource_limits::ResourceLimits;
use crate::tree::Tree;
use crate::{FathomError, FathomResult};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::trace;

#[derive(Parser)]
#[grammar = "src/markup/markup.pest"]
struct MarkupParser;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const ROOT: usize = 0;

#[derive(Debug)]
enum NodeKind {
    Root,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Every node of one document, in document order
#[derive(Debug)]
struct Arena {
    source_id: String,
    nodes: Vec<NodeData>,
    max_selector_bytes: usize,
}

/// A parsed document
///
/// Cloning is cheap; clones share the same nodes, so elements selected
/// through any clone compare equal.
#[derive(Clone)]
pub struct Document {
    arena: Arc<Arena>,
}

impl Document {
    /// Parse markup with the default resource limits.
    pub fn parse(source: &str) -> FathomResult<Self> {
        Self::parse_with_limits(source, "<input>", &ResourceLimits::default())
    }

    pub fn parse_with_limits(
        source: &str,
        source_id: &str,
        limits: &ResourceLimits,
    ) -> FathomResult<Self> {
        if source.len() > limits.max_document_bytes {
            return Err(FathomError::ResourceLimitExceeded {
                limit_name: "max_document_bytes".to_string(),
                limit_value: format!(
                    "{} bytes ({} MB)",
                    limits.max_document_bytes,
                    limits.max_document_bytes / (1024 * 1024)
                ),
                actual_value: format!(
                    "{} bytes ({:.2} MB)",
                    source.len(),
                    source.len() as f64 / (1024.0 * 1024.0)
                ),
                suggestion: "Strip the document down or raise the limit".to_string(),
            });
        }

        let mut pairs = MarkupParser::parse(Rule::document, source).map_err(|e| {
            let span = match e.line_col {
                pest::error::LineColLocation::Pos((line, col)) => Span {
                    start: 0,
                    end: 0,
                    line,
                    col,
                },
                pest::error::LineColLocation::Span((line, col), (_, _)) => Span {
                    start: 0,
                    end: 0,
                    line,
                    col,
                },
            };
            FathomError::parse(
                format!("Could not tokenize markup: {}", e.variant),
                span,
                source_id,
                Arc::from(source),
            )
        })?;

        let mut builder = Builder::new(limits);
        if let Some(document) = pairs.next() {
            for token in document.into_inner() {
                match token.as_rule() {
                    Rule::start_tag => builder.start_tag(token)?,
                    Rule::end_tag => builder.end_tag(token),
                    Rule::script_element | Rule::style_element => builder.raw_element(token)?,
                    Rule::text => builder.text(&entities::decode(token.as_str())),
                    Rule::stray_lt => builder.text("<"),
                    Rule::comment => builder.comment(token),
                    _ => {}
                }
            }
        }

        trace!(
            source_id,
            nodes = builder.nodes.len(),
            unclosed = builder.open.len(),
            "parsed markup"
        );

        Ok(Self {
            arena: Arc::new(Arena {
                source_id: source_id.to_string(),
                nodes: builder.nodes,
                max_selector_bytes: limits.max_selector_bytes,
            }),
        })
    }

    pub fn source_id(&self) -> &str {
        &self.arena.source_id
    }

    /// Top-level elements, in document order
    pub fn root_elements(&self) -> Vec<Element> {
        self.element_children(ROOT)
    }

    /// Every element, in document order
    pub fn elements(&self) -> Vec<Element> {
        self.arena
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| matches!(node.kind, NodeKind::Element { .. }))
            .map(|(index, _)| self.element(index))
            .collect()
    }

    /// Elements matching a selector, in document order
    pub fn select(&self, selector: &str) -> FathomResult<Vec<Element>> {
        if selector.len() > self.arena.max_selector_bytes {
            return Err(FathomError::ResourceLimitExceeded {
                limit_name: "max_selector_bytes".to_string(),
                limit_value: format!("{} bytes", self.arena.max_selector_bytes),
                actual_value: format!("{} bytes", selector.len()),
                suggestion: "Split the selector into several rules".to_string(),
            });
        }
        let selector = Selector::parse(selector)?;
        Ok(selector.filter(self.elements()))
    }

    pub fn select_first(&self, selector: &str) -> FathomResult<Option<Element>> {
        Ok(self.select(selector)?.into_iter().next())
    }

    fn element(&self, index: usize) -> Element {
        Element {
            arena: Arc::clone(&self.arena),
            index,
        }
    }

    fn element_children(&self, index: usize) -> Vec<Element> {
        self.arena.nodes[index]
            .children
            .iter()
            .filter(|child| matches!(self.arena.nodes[**child].kind, NodeKind::Element { .. }))
            .map(|child| self.element(*child))
            .collect()
    }
}

impl Tree for Document {
    type Element = Element;

    fn select(&self, selector: &str) -> FathomResult<Vec<Element>> {
        Document::select(self, selector)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Document({:?}, {} nodes)",
            self.arena.source_id,
            self.arena.nodes.len()
        )
    }
}

/// A child of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

/// A handle to one element of a [`Document`]
///
/// Two handles are equal only if they point at the same node of the same
/// parsed document; equal markup parsed twice gives unequal elements.
#[derive(Clone)]
pub struct Element {
    arena: Arc<Arena>,
    index: usize,
}

impl Element {
    fn data(&self) -> &NodeData {
        &self.arena.nodes[self.index]
    }

    fn parts(&self) -> (&str, &[(String, String)]) {
        match &self.data().kind {
            NodeKind::Element { name, attrs } => (name, attrs),
            _ => ("", &[]),
        }
    }

    fn at(&self, index: usize) -> Element {
        Element {
            arena: Arc::clone(&self.arena),
            index,
        }
    }

    fn is_element(&self, index: usize) -> bool {
        matches!(self.arena.nodes[index].kind, NodeKind::Element { .. })
    }

    /// Lowercase tag name
    pub fn name(&self) -> &str {
        self.parts().0
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.parts()
            .1
            .iter()
            .find(|(attr, _)| attr.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Attributes in source order, names lowercased
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parts()
            .1
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attr("class")
            .map(|classes| classes.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Position in document order among all nodes of the document
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn source_id(&self) -> &str {
        &self.arena.source_id
    }

    pub fn parent(&self) -> Option<Element> {
        self.data()
            .parent
            .filter(|parent| self.is_element(*parent))
            .map(|parent| self.at(parent))
    }

    /// Enclosing elements, innermost first
    pub fn ancestors(&self) -> impl Iterator<Item = Element> {
        std::iter::successors(self.parent(), Element::parent)
    }

    pub fn children(&self) -> Vec<Element> {
        self.data()
            .children
            .iter()
            .filter(|child| self.is_element(**child))
            .map(|child| self.at(*child))
            .collect()
    }

    pub fn child_nodes(&self) -> Vec<Node> {
        self.data()
            .children
            .iter()
            .filter_map(|child| match &self.arena.nodes[*child].kind {
                NodeKind::Element { .. } => Some(Node::Element(self.at(*child))),
                NodeKind::Text(text) => Some(Node::Text(text.clone())),
                NodeKind::Comment(comment) => Some(Node::Comment(comment.clone())),
                NodeKind::Root => None,
            })
            .collect()
    }

    /// Elements nested anywhere inside this one, in document order
    pub fn descendants(&self) -> Vec<Element> {
        let mut found = Vec::new();
        let mut stack: Vec<usize> = self.data().children.iter().rev().copied().collect();
        while let Some(index) = stack.pop() {
            if self.is_element(index) {
                found.push(self.at(index));
            }
            stack.extend(self.arena.nodes[index].children.iter().rev());
        }
        found
    }

    /// All descendant text, with runs of whitespace collapsed to one space
    pub fn text(&self) -> String {
        let mut raw = String::new();
        let mut stack = vec![self.index];
        while let Some(index) = stack.pop() {
            let node = &self.arena.nodes[index];
            if let NodeKind::Text(text) = &node.kind {
                raw.push_str(text);
            }
            stack.extend(node.children.iter().rev());
        }
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.arena, &other.arena) && self.index == other.index
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.arena) as usize).hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.name())?;
        if let Some(id) = self.id() {
            write!(f, " id={:?}", id)?;
        }
        let classes = self.classes();
        if !classes.is_empty() {
            write!(f, " class={:?}", classes.join(" "))?;
        }
        write!(f, ">@{}", self.index)
    }
}

/// Nests tokens into the node arena
struct Builder<'l> {
    nodes: Vec<NodeData>,
    /// Open elements, outermost first
    open: Vec<usize>,
    limits: &'l ResourceLimits,
}

impl<'l> Builder<'l> {
    fn new(limits: &'l ResourceLimits) -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
            open: Vec::new(),
            limits,
        }
    }

    fn current(&self) -> usize {
        self.open.last().copied().unwrap_or(ROOT)
    }

    fn append(&mut self, kind: NodeKind) -> usize {
        let parent = self.current();
        let index = self.nodes.len();
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(index);
        index
    }

    fn open_name(&self, index: usize) -> &str {
        match &self.nodes[index].kind {
            NodeKind::Element { name, .. } => name,
            _ => "",
        }
    }

    fn open_element(&mut self, name: String, attrs: Vec<(String, String)>) -> FathomResult<usize> {
        while let Some(top) = self.open.last() {
            if closed_by_sibling(self.open_name(*top), &name) {
                self.open.pop();
            } else {
                break;
            }
        }

        let index = self.append(NodeKind::Element { name, attrs });
        self.open.push(index);
        if self.open.len() > self.limits.max_nesting_depth {
            return Err(FathomError::ResourceLimitExceeded {
                limit_name: "max_nesting_depth".to_string(),
                limit_value: self.limits.max_nesting_depth.to_string(),
                actual_value: self.open.len().to_string(),
                suggestion: "Check the document for unclosed elements".to_string(),
            });
        }
        Ok(index)
    }

    fn start_tag(&mut self, pair: Pair<Rule>) -> FathomResult<()> {
        let mut name = String::new();
        let mut attrs = Vec::new();
        let mut self_closing = false;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::tag_name => name = inner.as_str().to_ascii_lowercase(),
                Rule::attribute => push_attribute(&mut attrs, inner),
                Rule::self_closing => self_closing = true,
                _ => {}
            }
        }
        let void = VOID_ELEMENTS.contains(&name.as_str());
        self.open_element(name, attrs)?;
        if void || self_closing {
            self.open.pop();
        }
        Ok(())
    }

    fn raw_element(&mut self, pair: Pair<Rule>) -> FathomResult<()> {
        let mut name = String::new();
        let mut attrs = Vec::new();
        let mut content = "";
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::script_name | Rule::style_name => {
                    name = inner.as_str().to_ascii_lowercase()
                }
                Rule::attribute => push_attribute(&mut attrs, inner),
                Rule::raw_text_script | Rule::raw_text_style => content = inner.as_str(),
                _ => {}
            }
        }
        self.open_element(name, attrs)?;
        if !content.is_empty() {
            self.append(NodeKind::Text(content.to_string()));
        }
        self.open.pop();
        Ok(())
    }

    /// Close the innermost open element with this name, along with anything
    /// left open inside it. A stray end tag is ignored.
    fn end_tag(&mut self, pair: Pair<Rule>) {
        let Some(name) = pair
            .into_inner()
            .find(|inner| inner.as_rule() == Rule::tag_name)
            .map(|inner| inner.as_str().to_ascii_lowercase())
        else {
            return;
        };
        if let Some(position) = self
            .open
            .iter()
            .rposition(|index| self.open_name(*index) == name)
        {
            self.open.truncate(position);
        }
    }

    fn text(&mut self, text: &str) {
        let parent = self.current();
        if let Some(last) = self.nodes[parent].children.last().copied() {
            if let NodeKind::Text(existing) = &mut self.nodes[last].kind {
                existing.push_str(text);
                return;
            }
        }
        self.append(NodeKind::Text(text.to_string()));
    }

    fn comment(&mut self, pair: Pair<Rule>) {
        let body = pair
            .into_inner()
            .find(|inner| inner.as_rule() == Rule::comment_text)
            .map(|inner| inner.as_str().to_string())
            .unwrap_or_default();
        self.append(NodeKind::Comment(body));
    }
}

fn push_attribute(attrs: &mut Vec<(String, String)>, pair: Pair<Rule>) {
    let mut name = None;
    let mut value = String::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::attr_name => name = Some(inner.as_str().to_ascii_lowercase()),
            Rule::double_quoted | Rule::single_quoted | Rule::unquoted => {
                value = entities::decode(inner.as_str()).into_owned()
            }
            _ => {}
        }
    }
    // The first of several same-named attributes wins.
    if let Some(name) = name {
        if !attrs.iter().any(|(existing, _)| *existing == name) {
            attrs.push((name, value));
        }
    }
}

/// Whether opening `new` implicitly closes the open element `open`
fn closed_by_sibling(open: &str, new: &str) -> bool {
    match open {
        "p" => new == "p",
        "li" => new == "li",
        "option" => new == "option",
        "dt" | "dd" => matches!(new, "dt" | "dd"),
        "tr" => new == "tr",
        "td" | "th" => matches!(new, "td" | "th" | "tr"),
        _ => false,
    }
}
