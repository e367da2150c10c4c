//! Abstract syntax tree for a parsed regex

use crate::api;
use crate::codepointset::{CodePointSet, Interval};
use crate::options::Flavor;
use core::fmt;
use core::ops::Range;

/// Index of a capture group. Group 0 is the whole match.
pub type CaptureGroupID = u16;

/// The kinds of zero-width anchors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AnchorKind {
    /// Start of input: `^`, `\A`.
    Start,
    /// End of input: `$`, `\z`.
    End,
    /// Start of a line: multiline `^`.
    StartLine,
    /// End of a line: multiline `$`.
    EndLine,
    /// End of input, or before a newline which ends the input.
    EndOrFinalNewline,
    /// `\b`
    WordBoundary,
    /// `\B`
    NotWordBoundary,
}

/// A Quantifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Quantifier {
    /// Minimum number of iterations, inclusive.
    pub min: usize,

    /// Maximum number of iterations, inclusive, or None if unbounded.
    pub max: Option<usize>,

    /// Whether the quantifier prefers more iterations.
    pub greedy: bool,
}

/// The node types of the AST.
#[derive(Debug, Clone)]
pub enum Node {
    /// Match each child in order. An empty sequence matches the empty string.
    Sequence(Vec<Node>),

    /// Match any child, preferring earlier ones.
    Alternation(Vec<Node>),

    /// A quantified node like /.*/ or /x{3, 5}?/
    Quantifier {
        child: Box<Node>,
        quant: Quantifier,
        /// Capture groups appearing in the child.
        enclosed_groups: Range<CaptureGroupID>,
    },

    /// Match a single code point from a set.
    /// Case-insensitive classes are already closed over case.
    CharacterClass(CodePointSet),

    /// A group, capturing or not.
    Group {
        child: Box<Node>,
        capture: Option<CaptureGroupID>,
    },

    /// A zero-width anchor.
    Anchor(AnchorKind),

    /// A lookahead or lookbehind assertion.
    LookAround {
        child: Box<Node>,
        behind: bool,
        negate: bool,
    },

    /// A backreference to a capture group.
    BackReference(CaptureGroupID),
}

impl Node {
    /// \return a node which matches the empty string.
    pub fn empty() -> Node {
        Node::Sequence(Vec::new())
    }

    /// \return a node matching a single code point.
    pub fn code_point(cp: u32) -> Node {
        Node::CharacterClass(CodePointSet::from_code_point(cp))
    }

    /// \return a node matching any code point in [first, last].
    pub fn range(first: u32, last: u32) -> Node {
        Node::CharacterClass(CodePointSet::from_interval(Interval::new(first, last)))
    }

    /// \return whether this node is the empty sequence.
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Sequence(nodes) if nodes.is_empty())
    }

    /// \return true if this node will always fail to match.
    /// Note this is different than matching the empty string: an empty
    /// bracket /[]/ tries to match one char from an empty set.
    pub fn match_always_fails(&self) -> bool {
        match self {
            Node::CharacterClass(cps) => cps.is_empty(),
            Node::Sequence(nodes) => nodes.iter().any(Node::match_always_fails),
            Node::Alternation(nodes) => nodes.iter().all(Node::match_always_fails),
            Node::Group { child, .. } => child.match_always_fails(),
            _ => false,
        }
    }

    /// \return whether this node or any descendant satisfies `pred`.
    pub fn any(&self, pred: &mut dyn FnMut(&Node) -> bool) -> bool {
        let mut found = false;
        walk(false, self, &mut |n: &Node, w: &mut Walk| {
            if found {
                w.skip_children = true;
            } else if pred(n) {
                found = true;
            }
        });
        found
    }

    /// \return whether this node contains a capturing group.
    pub fn has_captures(&self) -> bool {
        self.any(&mut |n| matches!(n, Node::Group { capture: Some(_), .. }))
    }
}

/// A helper type for walking.
#[derive(Debug, Clone, Default)]
pub struct Walk {
    // If set to true, skip the children of this node.
    pub skip_children: bool,

    // The current depth of the walk.
    pub depth: usize,

    // If true, we are in a lookbehind.
    pub in_lookbehind: bool,
}

#[derive(Debug)]
struct Walker<'a, F>
where
    F: FnMut(&Node, &mut Walk),
{
    func: &'a mut F,
    postorder: bool,
    walk: Walk,
}

impl<F> Walker<'_, F>
where
    F: FnMut(&Node, &mut Walk),
{
    fn process_children(&mut self, n: &Node) {
        match n {
            Node::CharacterClass(..) | Node::Anchor(..) | Node::BackReference(..) => {}
            Node::Sequence(nodes) | Node::Alternation(nodes) => {
                for node in nodes {
                    self.process(node);
                }
            }
            Node::Quantifier { child, .. } | Node::Group { child, .. } => self.process(child),
            Node::LookAround { child, behind, .. } => {
                let saved = self.walk.in_lookbehind;
                self.walk.in_lookbehind = *behind;
                self.process(child);
                self.walk.in_lookbehind = saved;
            }
        }
    }

    fn process(&mut self, n: &Node) {
        self.walk.skip_children = false;
        if !self.postorder {
            (self.func)(n, &mut self.walk);
        }
        if !self.walk.skip_children {
            self.walk.depth += 1;
            self.process_children(n);
            self.walk.depth -= 1;
        }
        if self.postorder {
            (self.func)(n, &mut self.walk)
        }
    }
}

/// Call a function on every Node.
/// If \p postorder is true, then process children before the node;
/// otherwise process children after the node.
pub fn walk<F>(postorder: bool, n: &Node, func: &mut F)
where
    F: FnMut(&Node, &mut Walk),
{
    let mut walker = Walker {
        func,
        postorder,
        walk: Walk::default(),
    };
    walker.process(n);
}

/// A parsed regex.
#[derive(Debug, Clone)]
pub struct Regex {
    pub node: Node,
    pub flags: api::Flags,

    /// Number of capture groups, not counting the whole match.
    pub group_count: CaptureGroupID,

    /// Names of the capture groups, indexed by group number minus one.
    /// Empty if no group is named; unnamed groups have an empty name.
    pub group_names: Box<[Box<str>]>,

    /// The code points which end a line.
    pub line_terminators: CodePointSet,

    pub flavor: Flavor,
}

fn display_node(node: &Node, depth: usize, f: &mut fmt::Formatter) -> fmt::Result {
    for _ in 0..depth {
        write!(f, "..")?;
    }
    match node {
        Node::Sequence(nodes) if nodes.is_empty() => writeln!(f, "Empty"),
        Node::Sequence(..) => writeln!(f, "Sequence"),
        Node::Alternation(..) => writeln!(f, "Alternation"),
        Node::Quantifier {
            quant,
            enclosed_groups,
            ..
        } => {
            let max = match quant.max {
                Some(max) => max.to_string(),
                None => "inf".to_string(),
            };
            let kind = if quant.greedy { "greedy" } else { "lazy" };
            writeln!(
                f,
                "Quantifier {{{},{}}} {} (groups {:?})",
                quant.min, max, kind, enclosed_groups
            )
        }
        Node::CharacterClass(cps) => writeln!(f, "CharacterClass {}", cps),
        Node::Group {
            capture: Some(idx), ..
        } => writeln!(f, "Group {}", idx),
        Node::Group { capture: None, .. } => writeln!(f, "Group"),
        Node::Anchor(kind) => writeln!(f, "Anchor {:?}", kind),
        &Node::LookAround { behind, negate, .. } => {
            let sense = if negate { "negative" } else { "positive" };
            let direction = if behind { "behind" } else { "ahead" };
            writeln!(f, "LookAround {} {}", sense, direction)
        }
        Node::BackReference(group) => writeln!(f, "BackReference {}", group),
    }
}

impl fmt::Display for Regex {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut result = Ok(());
        walk(false, &self.node, &mut |node: &Node, walk: &mut Walk| {
            if result.is_ok() {
                result = display_node(node, walk.depth, f)
            }
        });
        result
    }
}
