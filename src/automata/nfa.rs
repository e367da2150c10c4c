//! Conversion of the AST to non-deterministic finite automata.

use crate::ast::{self, AnchorKind, CaptureGroupID, Node};
use crate::charclasses;
use crate::codepointset::CodePointSet;
use crate::error::Error;
use crate::indexing::InputIndexer;
use crate::options::Options;
use smallvec::{smallvec, SmallVec};

// A handle to a State in the NFA.
// This is implemented as an index but is remapped to a dense vector later.
pub type StateHandle = u32;

/// The unique accepting state.
pub const ACCEPT: StateHandle = 0;

/// The most look sets an NFA may use. Bit 31 of a context is START.
pub const MAX_LOOK_SETS: usize = 31;

/// Context bit set when the position is the start of the input.
pub const START: u32 = 1 << 31;

/// An index into the look sets of an NFA.
pub type LookSet = u8;

/// A capture operation performed when an epsilon edge is taken.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Op {
    /// Record the start of a group.
    Enter(CaptureGroupID),
    /// Record the end of a group.
    Exit(CaptureGroupID),
    /// Forget a group, at the start of a loop iteration.
    Reset(CaptureGroupID),
}

/// A zero-width condition gating an epsilon edge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Look {
    Start,
    End,
    /// End of input, or before a final newline.
    EndOrFinalNewline,
    StartLine(LookSet),
    EndLine(LookSet),
    WordBoundary { set: LookSet, negate: bool },
    /// The previous code point is (or is not) in a set.
    Prev { set: LookSet, negate: bool },
    /// The next code point is (or is not) in a set.
    Next { set: LookSet, negate: bool },
}

/// What lies to the right of a position.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LookAhead {
    /// Unknown: every lookahead condition passes.
    Any,
    /// The end of input.
    Eoi,
    /// A code point, as a mask of the look sets containing it.
    /// `final_newline` is set if it is a newline which ends the input.
    Char { mask: u32, final_newline: bool },
}

#[inline(always)]
fn bit(set: LookSet) -> u32 {
    1 << set
}

impl Look {
    /// \return whether this condition is satisfied, given the look context of
    /// the previous code point and what lies ahead.
    pub fn passes(self, ctx: u32, ahead: LookAhead) -> bool {
        let ahead_mask = |set: LookSet| match ahead {
            LookAhead::Any => None,
            LookAhead::Eoi => Some(false),
            LookAhead::Char { mask, .. } => Some(mask & bit(set) != 0),
        };
        match self {
            Look::Start => ctx & START != 0,
            Look::End => matches!(ahead, LookAhead::Any | LookAhead::Eoi),
            Look::EndOrFinalNewline => matches!(
                ahead,
                LookAhead::Any
                    | LookAhead::Eoi
                    | LookAhead::Char {
                        final_newline: true,
                        ..
                    }
            ),
            Look::StartLine(set) => ctx & (START | bit(set)) != 0,
            Look::EndLine(set) => ahead_mask(set).map_or(true, |m| m || ahead == LookAhead::Eoi),
            Look::WordBoundary { set, negate } => match ahead_mask(set) {
                None => true,
                Some(next) => {
                    let prev = ctx & bit(set) != 0;
                    (prev != next) != negate
                }
            },
            Look::Prev { set, negate } => (ctx & bit(set) != 0) != negate,
            Look::Next { set, negate } => ahead_mask(set).map_or(true, |m| m != negate),
        }
    }

    /// \return whether this condition looks at the previous code point.
    fn looks_behind(self) -> Option<u32> {
        match self {
            Look::Start => Some(START),
            Look::StartLine(set) => Some(START | bit(set)),
            Look::WordBoundary { set, .. } | Look::Prev { set, .. } => Some(bit(set)),
            Look::End | Look::EndOrFinalNewline | Look::EndLine(..) | Look::Next { .. } => None,
        }
    }
}

/// An epsilon transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpsEdge {
    pub target: StateHandle,
    pub ops: SmallVec<[Op; 2]>,
    pub look: Option<Look>,
}

impl EpsEdge {
    fn to(target: StateHandle) -> Self {
        EpsEdge {
            target,
            ops: SmallVec::new(),
            look: None,
        }
    }

    fn with_ops(target: StateHandle, ops: impl IntoIterator<Item = Op>) -> Self {
        EpsEdge {
            target,
            ops: ops.into_iter().collect(),
            look: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct State {
    // Epsilon transitions to other states, in priority order.
    pub eps: Vec<EpsEdge>,

    // Consuming transitions to other states.
    pub transitions: Vec<(CodePointSet, StateHandle)>,
}

impl State {
    // Add an epsilon transition to another state.
    fn add_eps(&mut self, edge: EpsEdge) {
        self.eps.push(edge);
    }

    /// \return whether this state consumes input.
    pub fn is_kernel(&self) -> bool {
        !self.transitions.is_empty()
    }
}

/// The states of the lookbehind automata tracked at a position, sorted.
pub type Tracked = SmallVec<[StateHandle; 4]>;

/// Automata for lookbehind assertions which may span more than one code point.
/// They run unanchored alongside the main automaton, and set a context bit at
/// each position where the text before it ends with a match of the body.
#[derive(Debug, Default)]
pub struct Lookbehinds {
    states: Vec<State>,
    // The start state, accepting state and context bit of each assertion.
    entries: Vec<(StateHandle, StateHandle, LookSet)>,
    // The longest body in code points, or None if some body is unbounded.
    max_width: Option<usize>,
}

impl Lookbehinds {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// \return how many code points before a position decide the assertions
    /// there, or None if the whole prefix may.
    pub fn max_width(&self) -> Option<usize> {
        self.max_width
    }

    /// \return the sets consumed by the automata.
    pub fn consumed_sets(&self) -> impl Iterator<Item = &CodePointSet> {
        self.states.iter().flat_map(|s| s.transitions.iter().map(|t| &t.0))
    }

    // Append the states of a body whose loose ends lead to its own ACCEPT.
    fn add(&mut self, body: Vec<State>, start: StateHandle, set: LookSet, width: Option<usize>) {
        let offset = self.states.len() as StateHandle;
        for mut state in body {
            for edge in &mut state.eps {
                edge.target += offset;
            }
            for t in &mut state.transitions {
                t.1 += offset;
            }
            self.states.push(state);
        }
        self.max_width = match (self.is_empty(), self.max_width, width) {
            (true, _, width) => width,
            (false, Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        self.entries.push((start + offset, ACCEPT + offset, set));
    }

    /// Advance the tracked states over a code point.
    /// \return the new tracked states and the context bits of the assertions
    /// which hold after it.
    pub fn step(&self, tracked: &[StateHandle], cp: u32) -> (Tracked, u32) {
        let roots = tracked.iter().copied().chain(self.entries.iter().map(|e| e.0));
        let reached = eps_closure(&self.states, roots);
        let mut next = Tracked::new();
        for (state, _) in self.states.iter().zip(&reached).filter(|p| *p.1) {
            for (cps, target) in &state.transitions {
                if cps.contains(cp) {
                    next.push(*target);
                }
            }
        }
        next.sort_unstable();
        next.dedup();
        let after = eps_closure(&self.states, next.iter().copied());
        let bits = self
            .entries
            .iter()
            .filter(|e| after[e.1 as usize])
            .fold(0, |mask, e| mask | bit(e.2));
        (next, bits)
    }
}

// A piece of an NFA, with a start node handle  and a set of "loose ends."
// These loose ends need epsilon transitions to the next start.
struct Fragment {
    start: StateHandle,
    ends: SmallVec<[StateHandle; 2]>,
}

impl Fragment {
    // Construct a Fragment from a start and from loose ends.
    #[inline]
    fn new(start: StateHandle, ends: impl IntoIterator<Item = StateHandle>) -> Self {
        Self {
            start,
            ends: ends.into_iter().collect(),
        }
    }
}

#[derive(Debug)]
pub struct Nfa {
    pub(super) start: StateHandle,
    pub(super) states: Box<[State]>,
    look_sets: Box<[CodePointSet]>,
    group_count: usize,
    anchored: bool,
    context_mask: u32,
    final_newline: bool,
    space: CodePointSet,
    lookbehinds: Lookbehinds,
}

struct Builder<'a> {
    // States indexed by handle.
    states: Vec<State>,
    look_sets: &'a mut Vec<CodePointSet>,
    lookbehinds: &'a mut Lookbehinds,
    space: &'a CodePointSet,
    line_terminators: &'a CodePointSet,
    state_budget: usize,
}

impl<'a> Builder<'a> {
    fn new(
        look_sets: &'a mut Vec<CodePointSet>,
        lookbehinds: &'a mut Lookbehinds,
        space: &'a CodePointSet,
        line_terminators: &'a CodePointSet,
        state_budget: usize,
    ) -> Self {
        Builder {
            states: vec![State::default()],
            look_sets,
            lookbehinds,
            space,
            line_terminators,
            state_budget,
        }
    }

    /// Try adding a new state, returning its handle.
    fn make(&mut self) -> Result<StateHandle, Error> {
        if self.states.len() < self.state_budget {
            self.states.push(State::default());
            Ok(self.states.len() as StateHandle - 1)
        } else {
            Err(Error::unsupported("NFA too large"))
        }
    }

    /// Access a state by handle.
    fn get(&mut self, idx: StateHandle) -> &mut State {
        &mut self.states[idx as usize]
    }

    /// \return the index of a look set, adding it if necessary.
    /// Bits of lookbehind automata hold empty placeholder sets, which are never
    /// shared.
    fn look_set(&mut self, set: CodePointSet) -> Result<LookSet, Error> {
        if let Some(idx) = self
            .look_sets
            .iter()
            .position(|s| *s == set && !s.is_empty())
        {
            return Ok(idx as LookSet);
        }
        if self.look_sets.len() >= MAX_LOOK_SETS {
            return Err(Error::unsupported("Too many distinct lookaround sets"));
        }
        self.look_sets.push(set);
        Ok((self.look_sets.len() - 1) as LookSet)
    }

    fn build(&mut self, node: &Node) -> Result<Fragment, Error> {
        match node {
            Node::Sequence(nodes) => self.build_sequence(nodes),
            Node::Alternation(nodes) => self.build_alt(nodes),
            Node::Quantifier {
                child,
                quant,
                enclosed_groups,
            } => {
                let resets: SmallVec<[Op; 2]> = enclosed_groups.clone().map(Op::Reset).collect();
                self.build_loop(child, quant, &resets)
            }
            Node::CharacterClass(cps) => self.build_class(cps),
            Node::Group { child, capture } => self.build_group(child, *capture),
            Node::Anchor(kind) => self.build_anchor(*kind),
            Node::LookAround {
                child,
                behind,
                negate,
            } => self.build_lookaround(child, *behind, *negate),
            Node::BackReference(_) => Err(Error::unsupported("Backreferences are not supported")),
        }
    }

    /// Build a sequence of nodes.
    fn build_sequence(&mut self, nodes: &[Node]) -> Result<Fragment, Error> {
        let mut ends: SmallVec<[StateHandle; 2]> = smallvec![];
        let mut start = None;
        for node in nodes {
            let next = self.build(node)?;
            if start.is_none() {
                start = Some(next.start);
            }
            for end in ends {
                self.get(end).add_eps(EpsEdge::to(next.start));
            }
            ends = next.ends;
        }
        match start {
            Some(start) => Ok(Fragment { start, ends }),
            None => {
                let s = self.make()?;
                Ok(Fragment::new(s, [s]))
            }
        }
    }

    /// Build an alternation of nodes. Earlier alternatives have priority.
    fn build_alt(&mut self, nodes: &[Node]) -> Result<Fragment, Error> {
        let start = self.make()?;
        let mut ends = smallvec![];
        for node in nodes {
            let alt = self.build(node)?;
            self.get(start).add_eps(EpsEdge::to(alt.start));
            ends.extend(alt.ends);
        }
        Ok(Fragment { start, ends })
    }

    fn build_class(&mut self, cps: &CodePointSet) -> Result<Fragment, Error> {
        let start = self.make()?;
        let end = self.make()?;
        let cps = cps.intersection(self.space);
        if !cps.is_empty() {
            self.get(start).transitions.push((cps, end));
        }
        Ok(Fragment::new(start, [end]))
    }

    fn build_group(
        &mut self,
        child: &Node,
        capture: Option<CaptureGroupID>,
    ) -> Result<Fragment, Error> {
        let group = match capture {
            Some(group) => group,
            None => return self.build(child),
        };
        let start = self.make()?;
        let body = self.build(child)?;
        let end = self.make()?;
        self.get(start)
            .add_eps(EpsEdge::with_ops(body.start, [Op::Enter(group)]));
        for body_end in body.ends {
            self.get(body_end)
                .add_eps(EpsEdge::with_ops(end, [Op::Exit(group)]));
        }
        Ok(Fragment::new(start, [end]))
    }

    /// Build a zero-width gate.
    fn build_gate(&mut self, look: Option<Look>) -> Result<Fragment, Error> {
        let start = self.make()?;
        let end = self.make()?;
        self.get(start).add_eps(EpsEdge {
            target: end,
            ops: SmallVec::new(),
            look,
        });
        Ok(Fragment::new(start, [end]))
    }

    fn build_anchor(&mut self, kind: AnchorKind) -> Result<Fragment, Error> {
        let look = match kind {
            AnchorKind::Start => Look::Start,
            AnchorKind::End => Look::End,
            AnchorKind::EndOrFinalNewline => Look::EndOrFinalNewline,
            AnchorKind::StartLine => Look::StartLine(self.look_set(self.line_terminators.clone())?),
            AnchorKind::EndLine => Look::EndLine(self.look_set(self.line_terminators.clone())?),
            AnchorKind::WordBoundary | AnchorKind::NotWordBoundary => Look::WordBoundary {
                set: self.look_set(CodePointSet::from_sorted_disjoint_intervals(
                    charclasses::WORD_CHARS.to_vec(),
                ))?,
                negate: kind == AnchorKind::NotWordBoundary,
            },
        };
        self.build_gate(Some(look))
    }

    /// Build a lookaround assertion. Lookaheads must reduce to a test of at most
    /// one code point; wider lookbehinds get an automaton of their own.
    fn build_lookaround(&mut self, child: &Node, behind: bool, negate: bool) -> Result<Fragment, Error> {
        let forbidden = child.any(&mut |n| {
            matches!(
                n,
                Node::Group {
                    capture: Some(_),
                    ..
                } | Node::Anchor(..)
                    | Node::LookAround { .. }
                    | Node::BackReference(..)
            )
        });
        if forbidden {
            return Err(Error::unsupported(
                "Lookaround containing captures, anchors or backreferences",
            ));
        }

        let mut scratch_sets = Vec::new();
        let mut nested = Lookbehinds::default();
        let mut sub = Builder::new(
            &mut scratch_sets,
            &mut nested,
            self.space,
            self.line_terminators,
            self.state_budget,
        );
        let frag = sub.build(child)?;
        for end in frag.ends {
            sub.get(end).add_eps(EpsEdge::to(ACCEPT));
        }
        let width = analyze_width(&sub.states, frag.start, behind);

        let look = match width {
            Width::Empty if negate => {
                // Never passes.
                let start = self.make()?;
                let end = self.make()?;
                return Ok(Fragment::new(start, [end]));
            }
            Width::Empty => None,
            Width::Single(set) => {
                let set = self.look_set(set)?;
                Some(if behind {
                    Look::Prev { set, negate }
                } else {
                    Look::Next { set, negate }
                })
            }
            Width::Wide if behind => {
                if self.states.len() + sub.states.len() > self.state_budget {
                    return Err(Error::unsupported("NFA too large"));
                }
                self.look_sets.push(CodePointSet::new());
                if self.look_sets.len() > MAX_LOOK_SETS {
                    return Err(Error::unsupported("Too many distinct lookaround sets"));
                }
                let set = (self.look_sets.len() - 1) as LookSet;
                let states = std::mem::take(&mut sub.states);
                self.lookbehinds
                    .add(states, frag.start, set, max_width(child));
                Some(Look::Prev { set, negate })
            }
            Width::Wide => {
                return Err(Error::unsupported(
                    "Lookahead wider than one character is not supported",
                ))
            }
        };
        self.build_gate(look)
    }

    /// Build a quantified node.
    fn build_loop(
        &mut self,
        child: &Node,
        quant: &ast::Quantifier,
        resets: &[Op],
    ) -> Result<Fragment, Error> {
        let start = self.make()?;
        let mut cursor = start;

        // Unroll minimum iterations. Finite automata can't count.
        for _ in 0..quant.min {
            let body = self.build(child)?;
            self.get(cursor)
                .add_eps(EpsEdge::with_ops(body.start, resets.iter().copied()));
            cursor = self.join(body.ends)?;
        }

        let end = self.make()?;
        match quant.max {
            None => {
                // Unbounded: the cursor becomes the loop head.
                let body = self.build(child)?;
                self.add_choice(cursor, body.start, end, quant.greedy, resets);
                for body_end in body.ends {
                    self.get(body_end).add_eps(EpsEdge::to(cursor));
                }
            }
            Some(max) => {
                // Optional iterations from min to max.
                for _ in quant.min..max {
                    let body = self.build(child)?;
                    self.add_choice(cursor, body.start, end, quant.greedy, resets);
                    cursor = self.join(body.ends)?;
                }
                self.get(cursor).add_eps(EpsEdge::to(end));
            }
        }
        Ok(Fragment::new(start, [end]))
    }

    // Add a choice between entering a loop body and exiting, in the order given by greed.
    fn add_choice(
        &mut self,
        from: StateHandle,
        body: StateHandle,
        exit: StateHandle,
        greedy: bool,
        resets: &[Op],
    ) {
        let enter = EpsEdge::with_ops(body, resets.iter().copied());
        let leave = EpsEdge::to(exit);
        let state = self.get(from);
        if greedy {
            state.add_eps(enter);
            state.add_eps(leave);
        } else {
            state.add_eps(leave);
            state.add_eps(enter);
        }
    }

    // Join loose ends into a single state.
    fn join(&mut self, ends: SmallVec<[StateHandle; 2]>) -> Result<StateHandle, Error> {
        if let [single] = ends[..] {
            return Ok(single);
        }
        let joined = self.make()?;
        for end in ends {
            self.get(end).add_eps(EpsEdge::to(joined));
        }
        Ok(joined)
    }
}

// The most code points a node may match, or None if unbounded.
fn max_width(node: &Node) -> Option<usize> {
    match node {
        Node::Sequence(nodes) => nodes
            .iter()
            .try_fold(0usize, |acc, n| acc.checked_add(max_width(n)?)),
        Node::Alternation(nodes) => nodes
            .iter()
            .try_fold(0usize, |acc, n| Some(acc.max(max_width(n)?))),
        Node::Quantifier { child, quant, .. } => match max_width(child)? {
            0 => Some(0),
            width => width.checked_mul(quant.max?),
        },
        Node::CharacterClass(_) => Some(1),
        Node::Group { child, .. } => max_width(child),
        Node::Anchor(..) | Node::LookAround { .. } => Some(0),
        Node::BackReference(..) => None,
    }
}

/// The width of the strings accepted by a lookaround body.
#[derive(Debug, PartialEq, Eq)]
enum Width {
    /// The body accepts the empty string.
    Empty,
    /// The assertion reduces to testing a single code point against a set.
    Single(CodePointSet),
    /// Anything else.
    Wide,
}

// The states reachable from some states through epsilon edges only.
fn eps_closure(states: &[State], roots: impl IntoIterator<Item = StateHandle>) -> Vec<bool> {
    let mut seen = vec![false; states.len()];
    let mut stack: Vec<StateHandle> = roots.into_iter().collect();
    while let Some(s) = stack.pop() {
        if std::mem::replace(&mut seen[s as usize], true) {
            continue;
        }
        stack.extend(states[s as usize].eps.iter().map(|e| e.target));
    }
    seen
}

// Decide what a lookaround body needs to know about its neighboring code point.
// For a lookahead, longer strings are subsumed if their first code point is
// already accepted alone; for a lookbehind, the same goes for the last one.
fn analyze_width(states: &[State], start: StateHandle, behind: bool) -> Width {
    let initial = eps_closure(states, [start]);
    if initial[ACCEPT as usize] {
        return Width::Empty;
    }

    let mut single = CodePointSet::new();
    let mut long = CodePointSet::new();
    let mut firsts = Vec::new();
    for (idx, state) in states.iter().enumerate() {
        if !initial[idx] {
            continue;
        }
        for (cps, target) in &state.transitions {
            let after = eps_closure(states, [*target]);
            if after[ACCEPT as usize] {
                single.add_set(cps.clone());
            }
            let continues = after
                .iter()
                .enumerate()
                .any(|(i, &reached)| reached && states[i].is_kernel());
            if continues && !behind {
                long.add_set(cps.clone());
            }
            firsts.push(*target);
        }
    }

    if behind {
        // Last code points of strings of length two or more.
        let mut reachable = eps_closure(states, firsts.iter().copied());
        loop {
            let mut grew = false;
            let targets: Vec<StateHandle> = reachable
                .iter()
                .enumerate()
                .filter(|&(_, &r)| r)
                .flat_map(|(i, _)| states[i].transitions.iter().map(|t| t.1))
                .collect();
            let more = eps_closure(states, targets);
            for (r, m) in reachable.iter_mut().zip(more) {
                if m && !*r {
                    *r = true;
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }
        for (idx, state) in states.iter().enumerate() {
            if !reachable[idx] {
                continue;
            }
            for (cps, target) in &state.transitions {
                if eps_closure(states, [*target])[ACCEPT as usize] {
                    long.add_set(cps.clone());
                }
            }
        }
    }

    let mut extra = long;
    extra.remove(single.intervals());
    if extra.is_empty() {
        Width::Single(single)
    } else {
        Width::Wide
    }
}

impl Nfa {
    /// Try converting a regular expression to a NFA.
    /// \return the NFA on success, or an Unsupported error if the AST has
    /// constructs outside the automaton model, or would exceed a budget.
    pub fn try_from(re: &ast::Regex, options: &Options) -> Result<Self, Error> {
        let space = options.encoding.code_point_space();
        let line_terminators = re.line_terminators.intersection(&space);
        let mut look_sets = Vec::new();
        let mut lookbehinds = Lookbehinds::default();
        let mut b = Builder::new(
            &mut look_sets,
            &mut lookbehinds,
            &space,
            &line_terminators,
            options.max_nfa_states,
        );

        // Group 0 wraps the pattern.
        let start = b.make()?;
        let body = b.build(&re.node)?;
        b.get(start)
            .add_eps(EpsEdge::with_ops(body.start, [Op::Enter(0)]));
        let accept_look = if options.python_fullmatch() {
            Some(Look::End)
        } else {
            None
        };
        for end in body.ends {
            b.get(end).add_eps(EpsEdge {
                target: ACCEPT,
                ops: smallvec![Op::Exit(0)],
                look: accept_look,
            });
        }

        let mut states = b.states;
        let start = if re.flags.no_opt {
            start
        } else {
            super::nfa_optimize::optimize_states(&mut states, start)
        };

        let looks = || states.iter().flat_map(|s| s.eps.iter().filter_map(|e| e.look));
        let context_mask = looks().filter_map(Look::looks_behind).fold(0, |m, b| m | b);
        let final_newline = looks().any(|l| l == Look::EndOrFinalNewline);

        let nfa = Nfa {
            start,
            states: states.into_boxed_slice(),
            look_sets: look_sets.into_boxed_slice(),
            group_count: re.group_count as usize + 1,
            anchored: options.python_anchored() || re.flags.sticky,
            context_mask,
            final_newline,
            space,
            lookbehinds,
        };
        log::debug!(
            "built NFA with {} states, {} look sets and {} lookbehind automata",
            nfa.len(),
            nfa.look_sets.len(),
            nfa.lookbehinds.entries.len()
        );
        Ok(nfa)
    }

    #[inline(always)]
    pub fn at(&self, idx: StateHandle) -> &State {
        &self.states[idx as usize]
    }

    #[inline]
    pub fn start(&self) -> StateHandle {
        self.start
    }

    /// \return the number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// \return the number of capture groups, including group 0.
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// \return whether matches may only start at the search position.
    pub fn anchored(&self) -> bool {
        self.anchored
    }

    /// \return the context bits which some gate inspects.
    pub fn context_mask(&self) -> u32 {
        self.context_mask
    }

    /// \return whether some gate distinguishes a final newline.
    pub fn uses_final_newline(&self) -> bool {
        self.final_newline
    }

    pub fn look_sets(&self) -> &[CodePointSet] {
        &self.look_sets
    }

    /// \return the code points of the input encoding.
    pub fn space(&self) -> &CodePointSet {
        &self.space
    }

    /// \return the mask of look sets containing a code point.
    pub fn look_mask(&self, cp: u32) -> u32 {
        self.look_sets
            .iter()
            .enumerate()
            .filter(|(_, set)| set.contains(cp))
            .fold(0, |mask, (idx, _)| mask | (1 << idx))
    }

    /// \return the context of a position, given the code point before it.
    /// This ignores lookbehind automata.
    pub fn context_for(&self, prev: Option<u32>) -> u32 {
        let ctx = match prev {
            None => START,
            Some(cp) => self.look_mask(cp),
        };
        ctx & self.context_mask
    }

    pub fn lookbehinds(&self) -> &Lookbehinds {
        &self.lookbehinds
    }

    /// \return the context after consuming a code point, and the lookbehind
    /// states tracked there.
    pub fn advance_context(&self, tracked: &[StateHandle], cp: u32) -> (u32, Tracked) {
        let ctx = self.context_for(Some(cp));
        if self.lookbehinds.is_empty() {
            return (ctx, Tracked::new());
        }
        let (next, bits) = self.lookbehinds.step(tracked, cp);
        (ctx | bits, next)
    }

    /// \return the context of a position in an input, and the lookbehind
    /// states tracked there.
    pub fn context_at<Input: InputIndexer>(&self, input: Input, pos: usize) -> (u32, Tracked) {
        if self.lookbehinds.is_empty() || pos == 0 {
            return (self.context_for(input.peek_left(pos)), Tracked::new());
        }
        // Rewind far enough to see every lookbehind match which ends at or
        // after `pos`.
        let mut cursor = pos;
        match self.lookbehinds.max_width() {
            Some(width) => {
                for _ in 0..width {
                    if input.next_left(&mut cursor).is_none() {
                        break;
                    }
                }
            }
            None => cursor = 0,
        }
        let mut ctx = self.context_for(input.peek_left(cursor));
        let mut tracked = Tracked::new();
        while cursor < pos {
            let cp = match input.next_right(&mut cursor) {
                Some(cp) => cp,
                None => break,
            };
            let (next_ctx, next) = self.advance_context(&tracked, cp);
            ctx = next_ctx;
            tracked = next;
        }
        (ctx, tracked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Flags;
    use crate::indexing::Utf8Input;
    use crate::options::{Encoding, Flavor, PythonMethod};

    fn build_with(pattern: &str, flags: &str, options: &Options) -> Result<Nfa, Error> {
        let re = crate::parse::try_parse(pattern.chars().map(u32::from), Flags::from(flags), options)?;
        Nfa::try_from(&re, options)
    }

    fn build(pattern: &str) -> Result<Nfa, Error> {
        build_with(pattern, "", &Options::default())
    }

    #[test]
    fn look_passes() {
        let ahead_word = LookAhead::Char {
            mask: 1,
            final_newline: false,
        };
        let ahead_other = LookAhead::Char {
            mask: 0,
            final_newline: false,
        };
        let wb = Look::WordBoundary {
            set: 0,
            negate: false,
        };
        assert!(wb.passes(START, ahead_word));
        assert!(!wb.passes(START, ahead_other));
        assert!(wb.passes(1, LookAhead::Eoi));
        assert!(!wb.passes(1, ahead_word));
        assert!(Look::Start.passes(START, LookAhead::Eoi));
        assert!(!Look::Start.passes(0, LookAhead::Eoi));
        assert!(Look::StartLine(0).passes(1, ahead_other));
        assert!(Look::EndLine(0).passes(0, ahead_word));
        assert!(Look::EndLine(0).passes(0, LookAhead::Eoi));
        assert!(!Look::End.passes(0, ahead_word));
        assert!(Look::EndOrFinalNewline.passes(
            0,
            LookAhead::Char {
                mask: 0,
                final_newline: true
            }
        ));
        let not_prev = Look::Prev { set: 0, negate: true };
        assert!(not_prev.passes(START, ahead_word));
        assert!(!not_prev.passes(1, ahead_word));
        assert!(Look::Next { set: 0, negate: true }.passes(0, LookAhead::Eoi));
        assert!(Look::Next { set: 0, negate: false }.passes(0, LookAhead::Any));
    }

    #[test]
    fn group_zero_wraps() {
        let nfa = build("a").unwrap();
        assert_eq!(nfa.group_count(), 1);
        let start = nfa.at(nfa.start());
        assert_eq!(start.eps[0].ops.as_slice(), &[Op::Enter(0)]);
        let exits = nfa
            .states
            .iter()
            .flat_map(|s| s.eps.iter())
            .filter(|e| e.target == ACCEPT)
            .count();
        assert_eq!(exits, 1);
        assert!(!nfa.anchored());
        assert_eq!(nfa.context_mask(), 0);
    }

    #[test]
    fn loops_reset_groups() {
        let nfa = build("(?:(a)|b)*").unwrap();
        assert_eq!(nfa.group_count(), 2);
        let has_reset = nfa
            .states
            .iter()
            .flat_map(|s| s.eps.iter())
            .any(|e| e.ops.contains(&Op::Reset(1)));
        assert!(has_reset);
    }

    #[test]
    fn size_limit() {
        let options = Options {
            max_nfa_states: 50,
            ..Options::default()
        };
        let err = build_with("a{100}", "", &options).unwrap_err();
        assert!(err.is_unsupported());
        assert_eq!(err.text(), "NFA too large");
        assert!(build_with("a{10}", "", &options).is_ok());
    }

    #[test]
    fn lookaround_widths() {
        // Single code point tests become gates.
        let nfa = build("a(?=[bc])").unwrap();
        assert_eq!(nfa.look_sets().len(), 1);
        assert!(build("(?<!x)y").is_ok());
        assert!(build("(?=b|bc)").is_ok());
        assert!(build("(?<=b|cb)").is_ok());
        assert!(build("(?=)a").is_ok());
        assert!(build("(?!)a").is_ok());
        assert!(build("(?<=a*b)").unwrap().lookbehinds().is_empty());

        for pattern in ["(?=ab)", "(?=b|cd)", "(?=a+b)", "(?=(a))", "(?=^a)", "(?=a(?=b))", "(?<=(a)b)"] {
            let err = build(pattern).unwrap_err();
            assert!(err.is_unsupported(), "{}", pattern);
        }
    }

    #[test]
    fn lookbehind_automata() {
        let nfa = build("(?<=ab)c").unwrap();
        assert!(!nfa.lookbehinds().is_empty());
        assert_eq!(nfa.lookbehinds().max_width(), Some(2));
        let set = nfa.look_sets().len() - 1;
        assert!(nfa.look_sets()[set].is_empty());

        let input = Utf8Input::new("xabc");
        let holds = |pos: usize| nfa.context_at(input, pos).0 & (1 << set) != 0;
        assert_eq!((0..=4).filter(|&p| holds(p)).collect::<Vec<_>>(), vec![3]);

        // Stepping forward agrees with rewinding.
        let (_, tracked) = nfa.context_at(input, 2);
        let (ctx, _) = nfa.advance_context(&tracked, 'b' as u32);
        assert_ne!(ctx & (1 << set), 0);

        assert_eq!(build("(?<=b|bc)").unwrap().lookbehinds().max_width(), Some(2));
        assert_eq!(build("(?<=ba*)").unwrap().lookbehinds().max_width(), None);
        assert_eq!(build("(?<=a|b(?:cd){2})").unwrap().lookbehinds().max_width(), Some(5));
        assert!(build("a").unwrap().lookbehinds().is_empty());
    }

    #[test]
    fn backreferences_unsupported() {
        assert!(build(r"(a)\1").unwrap_err().is_unsupported());
    }

    #[test]
    fn context_and_anchoring() {
        let nfa = build(r"\bfoo").unwrap();
        assert_eq!(nfa.context_mask(), 1);
        assert_eq!(nfa.context_for(None), 0);
        assert_eq!(nfa.context_for(Some('a' as u32)), 1);
        assert_eq!(nfa.context_for(Some(' ' as u32)), 0);

        let nfa = build("^foo").unwrap();
        assert_eq!(nfa.context_for(None), START);

        let sticky = build_with("foo", "y", &Options::default()).unwrap();
        assert!(sticky.anchored());

        let mut options = Options::with_flavor(Flavor::Python);
        options.python_method = PythonMethod::Match;
        assert!(build_with("foo", "", &options).unwrap().anchored());

        let nfa = build_with("foo$", "", &Options::with_flavor(Flavor::Python)).unwrap();
        assert!(nfa.uses_final_newline());
    }

    #[test]
    fn latin1_space() {
        let options = Options {
            encoding: Encoding::Latin1,
            ..Options::default()
        };
        let nfa = build_with("[^a]", "", &options).unwrap();
        assert_eq!(nfa.space().intervals().last().map(|iv| iv.last()), Some(0xFF));
        for state in nfa.states.iter() {
            for (cps, _) in &state.transitions {
                assert!(cps.intervals().iter().all(|iv| iv.last() <= 0xFF));
            }
        }
    }
}
