//! Powerset construction of a DFA from an NFA.
//!
//! A DFA state is an ordered list of NFA threads, whether a new match attempt
//! may still start, and the look context of the previous code point. Patterns
//! with wide lookbehinds also carry the states of their lookbehind automata.
//! The order of the threads is their priority, which makes the construction
//! follow leftmost-first semantics. Each step records how the capture slots
//! of the threads are carried over, so that captures may be replayed
//! without the NFA.
//!
//! Every reachable state is discovered at compile time, so a pattern whose DFA
//! is too large is rejected before it runs. Small NFAs keep the transition
//! tables computed then; larger ones recompute a state's table the first time
//! the input visits it.

use crate::automata::cache::StateCache;
use crate::automata::nfa::{LookAhead, Nfa, Op, StateHandle, Tracked, ACCEPT, START};
use crate::bytesearch::{ByteBitmap, ByteFinder};
use crate::codepointset::{CodePointSet, Interval};
use crate::error::Error;
use crate::indexing::InputIndexer;
use crate::options::Options;
use crate::util::add_utf8_first_bytes_to_bitmap;
use core::fmt;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::OnceLock;

/// The index of a DFA state.
pub type StateId = u32;

/// The state with no threads, from which nothing matches.
pub const DEAD: StateId = 0;

/// The source of a thread started fresh, rather than carried over.
pub const RESTART: u32 = u32::MAX;

/// The most classes a state may partition its input into.
pub const MAX_CLASSES: usize = 1024;

// Acceleration is abandoned for sets of more bytes than this.
const MAX_ACCEL_BYTES: u32 = 64;

/// The identity of a DFA state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    /// NFA states reached by consuming the previous code point, by priority.
    pub threads: SmallVec<[StateHandle; 4]>,
    /// Whether a new match attempt starts at each position.
    pub searching: bool,
    /// Look context of the previous code point.
    pub context: u32,
    /// States of the lookbehind automata.
    pub behind: Tracked,
}

impl StateKey {
    fn dead() -> Self {
        StateKey {
            threads: SmallVec::new(),
            searching: false,
            context: 0,
            behind: Tracked::new(),
        }
    }
}

/// How to compute the capture slots of a thread: take the slots of thread
/// `src` (or fresh slots, if `src` is RESTART) and apply `ops`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub src: u32,
    pub ops: SmallVec<[Op; 2]>,
}

/// The effect of consuming a code point.
#[derive(Debug, Clone)]
pub struct Transition {
    pub next: StateId,
    /// Set if a match ends before the code point.
    pub accept: Option<Replay>,
    /// The slots of each thread of `next`.
    pub moves: Box<[Replay]>,
    /// Set if every thread keeps its slots unchanged.
    pub identity: bool,
}

/// Maps code points to classes of identical behavior.
#[derive(Clone)]
pub struct ClassMap {
    ascii: [u16; 128],
    ranges: Box<[(Interval, u16)]>,
}

impl ClassMap {
    #[inline(always)]
    pub fn class_of(&self, cp: u32) -> usize {
        if cp < 128 {
            return self.ascii[cp as usize] as usize;
        }
        let idx = self
            .ranges
            .partition_point(|(iv, _)| iv.last() < cp)
            .min(self.ranges.len().saturating_sub(1));
        self.ranges.get(idx).map_or(0, |r| r.1 as usize)
    }

    /// \return the intervals with their classes.
    pub fn ranges(&self) -> &[(Interval, u16)] {
        &self.ranges
    }
}

impl fmt::Debug for ClassMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassMap({} ranges)", self.ranges.len())
    }
}

/// How to skip through a byte encoded input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ByteSkip {
    /// Nothing leaves the state: skip to the end.
    ToEnd,
    /// Skip to the next byte which may start a leaving code point.
    Find(ByteFinder),
    /// Too many bytes to be worth it.
    No,
}

impl ByteSkip {
    fn new(bitmap: &ByteBitmap) -> ByteSkip {
        if bitmap.count_bits() > MAX_ACCEL_BYTES {
            return ByteSkip::No;
        }
        match ByteFinder::new(bitmap) {
            Some(finder) => ByteSkip::Find(finder),
            None => ByteSkip::ToEnd,
        }
    }
}

/// Data for skipping ahead in a state which loops on most of its input.
#[derive(Debug, Clone)]
pub struct Accel {
    /// Code points which leave the state.
    pub leave: CodePointSet,
    pub utf8: ByteSkip,
    pub latin1: ByteSkip,
    /// Whether scanning wider units against `leave` is worthwhile.
    pub units: bool,
}

/// The outgoing transitions of a DFA state.
#[derive(Debug, Clone)]
pub struct Transitions {
    pub classes: ClassMap,
    pub table: Box<[Transition]>,
    /// Set if a match ends at the end of input.
    pub eoi: Option<Replay>,
    /// The transition for a newline which ends the input, if that differs.
    pub final_newline: Option<Transition>,
    pub accel: Option<Accel>,
}

impl Transitions {
    #[inline(always)]
    pub fn on(&self, cp: u32) -> &Transition {
        &self.table[self.classes.class_of(cp)]
    }

    fn dead(space: &CodePointSet) -> Transitions {
        let last = space.intervals().last().map_or(0, |iv| iv.last());
        Transitions {
            classes: ClassMap {
                ascii: [0; 128],
                ranges: Box::new([(Interval::new(0, last), 0)]),
            },
            table: Box::new([Transition {
                next: DEAD,
                accept: None,
                moves: Box::new([]),
                identity: true,
            }]),
            eoi: None,
            final_newline: None,
            accel: None,
        }
    }
}

/// The outcome of one step, before interning the next state.
struct Step {
    next: StateKey,
    accept: Option<Replay>,
    moves: Vec<Replay>,
}

/// Computes epsilon closures in priority order.
struct Closure<'a> {
    nfa: &'a Nfa,
    visited: Vec<bool>,
    kernel: Vec<(StateHandle, Replay)>,
    accept: Option<Replay>,
    ops: SmallVec<[Op; 4]>,
}

impl<'a> Closure<'a> {
    fn new(nfa: &'a Nfa) -> Self {
        Closure {
            nfa,
            visited: vec![false; nfa.len()],
            kernel: Vec::new(),
            accept: None,
            ops: SmallVec::new(),
        }
    }

    fn reset(&mut self) {
        self.visited.iter_mut().for_each(|v| *v = false);
        self.kernel.clear();
        self.accept = None;
    }

    fn replay(&self, src: u32) -> Replay {
        Replay {
            src,
            ops: self.ops.iter().copied().collect(),
        }
    }

    // Follow epsilons from a state. \return true once the accepting state is
    // reached, which cuts every lower priority path.
    fn follow(&mut self, state: StateHandle, src: u32, ctx: u32, ahead: LookAhead) -> bool {
        if std::mem::replace(&mut self.visited[state as usize], true) {
            return false;
        }
        if state == ACCEPT {
            self.accept = Some(self.replay(src));
            return true;
        }
        let nfa = self.nfa;
        let s = nfa.at(state);
        if s.is_kernel() {
            let replay = self.replay(src);
            self.kernel.push((state, replay));
        }
        for edge in &s.eps {
            if let Some(look) = edge.look {
                if !look.passes(ctx, ahead) {
                    continue;
                }
            }
            let mark = self.ops.len();
            self.ops.extend(edge.ops.iter().copied());
            let done = self.follow(edge.target, src, ctx, ahead);
            self.ops.truncate(mark);
            if done {
                return true;
            }
        }
        false
    }

    // Run the closure of every thread of a state.
    // \return whether a match ends here.
    fn run(&mut self, key: &StateKey, ahead: LookAhead) -> bool {
        self.reset();
        for (idx, &thread) in key.threads.iter().enumerate() {
            if self.follow(thread, idx as u32, key.context, ahead) {
                return true;
            }
        }
        key.searching && self.follow(self.nfa.start(), RESTART, key.context, ahead)
    }

    // Compute the step on a code point.
    fn step(&mut self, key: &StateKey, cp: u32, final_newline: bool) -> Step {
        let ahead = LookAhead::Char {
            mask: self.nfa.look_mask(cp),
            final_newline,
        };
        let accepted = self.run(key, ahead);
        let mut threads: SmallVec<[StateHandle; 4]> = SmallVec::new();
        let mut moves = Vec::new();
        for (state, replay) in &self.kernel {
            for (cps, target) in &self.nfa.at(*state).transitions {
                if cps.contains(cp) && !threads.contains(target) {
                    threads.push(*target);
                    moves.push(replay.clone());
                }
            }
        }
        let searching = key.searching && !accepted;
        let next = if threads.is_empty() && !searching {
            StateKey::dead()
        } else {
            let (context, behind) = self.nfa.advance_context(&key.behind, cp);
            StateKey {
                threads,
                searching,
                context,
                behind,
            }
        };
        Step {
            next,
            accept: self.accept.take(),
            moves,
        }
    }

    // \return the sets consumed by any state reachable from a key, assuming every
    // lookahead condition passes.
    fn consumed_sets(&mut self, key: &StateKey) -> Vec<&'a CodePointSet> {
        self.reset();
        let nfa = self.nfa;
        let mut stack: Vec<StateHandle> = key.threads.iter().rev().copied().collect();
        if key.searching {
            stack.insert(0, nfa.start());
        }
        let mut sets = Vec::new();
        while let Some(state) = stack.pop() {
            if std::mem::replace(&mut self.visited[state as usize], true) {
                continue;
            }
            let s = nfa.at(state);
            sets.extend(s.transitions.iter().map(|(cps, _)| cps));
            for edge in &s.eps {
                let open = edge
                    .look
                    .map_or(true, |look| look.passes(key.context, LookAhead::Any));
                if open {
                    stack.push(edge.target);
                }
            }
        }
        sets
    }
}

/// Split a code point space into classes, such that every set either contains
/// or excludes each class entirely.
/// \return the class map and the first code point of each class.
fn partition(space: &CodePointSet, sets: &[&CodePointSet]) -> (ClassMap, Vec<u32>) {
    let last = space.intervals().last().map_or(0, |iv| iv.last());
    let mut bounds: Vec<u32> = vec![0];
    for set in sets {
        for iv in set.intervals() {
            if iv.first() <= last {
                bounds.push(iv.first());
            }
            if iv.last() < last {
                bounds.push(iv.last() + 1);
            }
        }
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut signatures: FxHashMap<SmallVec<[u64; 2]>, u16> = FxHashMap::default();
    let mut reps: Vec<u32> = Vec::new();
    let mut ranges: Vec<(Interval, u16)> = Vec::new();
    for (idx, &first) in bounds.iter().enumerate() {
        let end = bounds.get(idx + 1).map_or(last, |b| b - 1);
        let mut sig: SmallVec<[u64; 2]> = SmallVec::from_elem(0, (sets.len() + 63) / 64);
        for (bit, set) in sets.iter().enumerate() {
            if set.contains(first) {
                sig[bit / 64] |= 1 << (bit % 64);
            }
        }
        let next_class = signatures.len() as u16;
        let class = *signatures.entry(sig).or_insert_with(|| {
            reps.push(first);
            next_class
        });
        match ranges.last_mut() {
            Some((iv, c)) if *c == class => *iv = Interval::new(iv.first(), end),
            _ => ranges.push((Interval::new(first, end), class)),
        }
    }

    let mut ascii = [0u16; 128];
    for (iv, class) in &ranges {
        for cp in iv.first()..=iv.last().min(127) {
            ascii[cp as usize] = *class;
        }
    }
    (
        ClassMap {
            ascii,
            ranges: ranges.into_boxed_slice(),
        },
        reps,
    )
}

/// The strategy used to carry capture slots through the DFA.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExecMode {
    /// Only report whether there is a match.
    BooleanMatch,
    /// Every state has at most one thread, whose slots are updated in place.
    SimpleCaptureGroups,
    /// Slots are tracked per thread.
    GenericCaptureGroups,
}

#[derive(Debug)]
pub struct Dfa {
    nfa: Nfa,
    cache: StateCache,
    eager: bool,
    mode: ExecMode,
    // Start states for the start-of-input context and the empty context.
    starts: [OnceLock<StateId>; 2],
}

impl Dfa {
    /// Construct a DFA from an NFA, discovering all of its states.
    /// Transition tables are kept if the NFA is small or the options ask for it.
    pub fn try_from(nfa: Nfa, options: &Options) -> Result<Self, Error> {
        let eager =
            nfa.len() <= options.eager_nfa_threshold || options.always_eager || options.validate;
        let cache = StateCache::new(options.max_dfa_states.max(1));
        let dead = cache.intern(StateKey::dead());
        debug_assert_eq!(dead, Some((DEAD, true)));
        if let Some(record) = cache.get(DEAD) {
            let _ = record.transitions.set(Transitions::dead(nfa.space()));
        }
        let mut dfa = Dfa {
            nfa,
            cache,
            eager,
            mode: ExecMode::GenericCaptureGroups,
            starts: [OnceLock::new(), OnceLock::new()],
        };
        dfa.explore(eager)?;
        if dfa.all_states(|key| key.threads.len() <= 1) {
            dfa.mode = ExecMode::SimpleCaptureGroups;
        }
        log::debug!(
            "explored DFA with {} states, {:?}, tables {}",
            dfa.cache.len(),
            dfa.mode,
            if eager { "kept" } else { "built lazily" }
        );
        Ok(dfa)
    }

    pub fn nfa(&self) -> &Nfa {
        &self.nfa
    }

    /// \return how captures are carried, when not in boolean mode.
    pub fn mode(&self) -> ExecMode {
        self.mode
    }

    /// \return whether every transition table was built at compile time.
    pub fn is_eager(&self) -> bool {
        self.eager
    }

    /// \return the number of states in the shared cache.
    pub fn state_count(&self) -> usize {
        self.cache.len()
    }

    fn all_states(&self, mut pred: impl FnMut(&StateKey) -> bool) -> bool {
        (0..self.cache.len() as StateId)
            .filter_map(|id| self.cache.get(id))
            .all(|record| pred(&record.key))
    }

    fn start_key(&self, context: u32, behind: Tracked) -> StateKey {
        let anchored = self.nfa.anchored();
        StateKey {
            threads: if anchored {
                SmallVec::from_elem(self.nfa.start(), 1)
            } else {
                SmallVec::new()
            },
            searching: !anchored,
            context,
            behind,
        }
    }

    // Every context, with its lookbehind states, in which a search may start.
    fn start_nodes(&self) -> Vec<(u32, Tracked)> {
        let lookbehinds = self.nfa.lookbehinds();
        let sets: Vec<&CodePointSet> = self
            .nfa
            .look_sets()
            .iter()
            .chain(lookbehinds.consumed_sets())
            .collect();
        let (_, reps) = partition(self.nfa.space(), &sets);
        let mut nodes: Vec<(u32, Tracked)> = reps
            .iter()
            .map(|&cp| (self.nfa.context_for(Some(cp)), Tracked::new()))
            .collect();
        nodes.push((self.nfa.context_for(None), Tracked::new()));
        nodes.push((0, Tracked::new()));
        nodes.sort_unstable();
        nodes.dedup();
        if lookbehinds.is_empty() {
            return nodes;
        }
        // A search may start after any prefix, so follow the lookbehind
        // automata over every class.
        let mut queue: VecDeque<usize> = (0..nodes.len()).collect();
        while let Some(idx) = queue.pop_front() {
            for &cp in &reps {
                let next = self.nfa.advance_context(&nodes[idx].1, cp);
                if !nodes.contains(&next) {
                    nodes.push(next);
                    queue.push_back(nodes.len() - 1);
                }
            }
        }
        nodes
    }

    /// Explore every reachable state, breadth first, keeping the tables if
    /// `publish` is set.
    fn explore(&self, publish: bool) -> Result<(), Error> {
        let full = || Error::unsupported("DFA state limit exceeded");
        let mut queue = VecDeque::new();
        for (context, behind) in self.start_nodes() {
            let (id, new) = self
                .cache
                .intern(self.start_key(context, behind))
                .ok_or_else(full)?;
            if new {
                queue.push_back(id);
            }
        }
        let mut closure = Closure::new(&self.nfa);
        while let Some(id) = queue.pop_front() {
            let record = match self.cache.get(id) {
                Some(record) => record,
                None => rs_unreachable!("Interned state is missing"),
            };
            if record.transitions.get().is_some() {
                continue;
            }
            let mut intern = |key: StateKey| {
                let (id, new) = self.cache.intern(key).ok_or_else(full)?;
                if new {
                    queue.push_back(id);
                }
                Ok(id)
            };
            let table = self.build_table(&mut closure, id, &record.key, &mut intern)?;
            if publish {
                let _ = record.transitions.set(table);
            }
        }
        Ok(())
    }

    /// Compute the transitions of a state, interning its successors.
    fn build_table(
        &self,
        closure: &mut Closure,
        id: StateId,
        key: &StateKey,
        intern: &mut dyn FnMut(StateKey) -> Result<StateId, Error>,
    ) -> Result<Transitions, Error> {
        let mut sets: Vec<&CodePointSet> = Vec::new();
        let look_sets = self.nfa.look_sets().iter();
        let behind_sets = self.nfa.lookbehinds().consumed_sets();
        for set in closure
            .consumed_sets(key)
            .into_iter()
            .chain(look_sets)
            .chain(behind_sets)
        {
            if !sets.contains(&set) {
                sets.push(set);
            }
        }
        let (classes, reps) = partition(self.nfa.space(), &sets);
        if reps.len() > MAX_CLASSES {
            return Err(Error::unsupported("DFA alphabet too large"));
        }

        let mut make = |step: Step| -> Result<Transition, Error> {
            let identity = step.moves.len() == key.threads.len()
                && step
                    .moves
                    .iter()
                    .enumerate()
                    .all(|(i, r)| r.src == i as u32 && r.ops.is_empty());
            Ok(Transition {
                next: intern(step.next)?,
                accept: step.accept,
                moves: step.moves.into_boxed_slice(),
                identity,
            })
        };

        let mut table = Vec::with_capacity(reps.len());
        for &rep in &reps {
            table.push(make(closure.step(key, rep, false))?);
        }
        let final_newline = if self.nfa.uses_final_newline() && self.nfa.space().contains('\n' as u32) {
            Some(make(closure.step(key, '\n' as u32, true))?)
        } else {
            None
        };
        let eoi = if closure.run(key, LookAhead::Eoi) {
            closure.accept.take()
        } else {
            None
        };

        let mut transitions = Transitions {
            classes,
            table: table.into_boxed_slice(),
            eoi,
            final_newline,
            accel: None,
        };
        transitions.accel = self.accel_for(id, &transitions);
        Ok(transitions)
    }

    // Compute acceleration data, if the state loops on itself for some classes.
    fn accel_for(&self, id: StateId, transitions: &Transitions) -> Option<Accel> {
        let loops = |t: &Transition| t.next == id && t.accept.is_none() && t.identity;
        if !transitions.table.iter().any(loops) {
            return None;
        }
        let mut leave = CodePointSet::new();
        for (iv, class) in transitions.classes.ranges() {
            if !loops(&transitions.table[*class as usize]) {
                leave.add(*iv);
            }
        }
        if transitions.final_newline.is_some() {
            leave.add_one('\n' as u32);
        }
        let mut utf8 = ByteBitmap::default();
        let mut latin1 = ByteBitmap::default();
        for iv in leave.intervals() {
            add_utf8_first_bytes_to_bitmap(*iv, &mut utf8);
            for cp in iv.first()..=iv.last().min(0xFF) {
                latin1.set(cp as u8);
            }
        }
        Some(Accel {
            utf8: ByteSkip::new(&utf8),
            latin1: ByteSkip::new(&latin1),
            units: leave.intervals().len() <= 4,
            leave,
        })
    }

    /// \return the start state for a search from a position.
    pub fn start_at<Input: InputIndexer>(&self, input: Input, pos: usize) -> StateId {
        let (context, behind) = self.nfa.context_at(input, pos);
        self.start_state(context, behind)
    }

    /// \return the start state for a context and lookbehind states.
    pub fn start_state(&self, context: u32, behind: Tracked) -> StateId {
        let slot = match context {
            _ if !behind.is_empty() => None,
            START => Some(&self.starts[0]),
            0 => Some(&self.starts[1]),
            _ => None,
        };
        if let Some(id) = slot.and_then(|s| s.get()) {
            return *id;
        }
        let id = match self.cache.intern(self.start_key(context, behind)) {
            Some((id, _)) => id,
            None => rs_unreachable!("Start state was not explored"),
        };
        if let Some(slot) = slot {
            let _ = slot.set(id);
        }
        id
    }

    /// \return the transitions of a state, computing them if necessary.
    pub fn transitions(&self, id: StateId) -> &Transitions {
        let record = match self.cache.get(id) {
            Some(record) => record,
            None => rs_unreachable!("Unknown DFA state"),
        };
        record
            .transitions
            .get_or_init(|| self.build_lazily(id, &record.key))
    }

    // Rebuild a table which was discarded after exploration. Its successors
    // are all in the cache already.
    fn build_lazily(&self, id: StateId, key: &StateKey) -> Transitions {
        let mut intern = |key: StateKey| match self.cache.intern(key) {
            Some((id, _)) => Ok(id),
            None => Err(Error::unsupported("DFA state limit exceeded")),
        };
        let mut closure = Closure::new(&self.nfa);
        match self.build_table(&mut closure, id, key, &mut intern) {
            Ok(table) => table,
            Err(_) => rs_unreachable!("Explored state cannot fail to build"),
        }
    }
}

fn fmt_replay(f: &mut fmt::Formatter<'_>, replay: &Replay) -> fmt::Result {
    if replay.src == RESTART {
        write!(f, "new")?;
    } else {
        write!(f, "t{}", replay.src)?;
    }
    for op in &replay.ops {
        match op {
            Op::Enter(g) => write!(f, " +{}", g)?,
            Op::Exit(g) => write!(f, " -{}", g)?,
            Op::Reset(g) => write!(f, " !{}", g)?,
        }
    }
    Ok(())
}

impl fmt::Display for Dfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "DFA({} states, {}, {:?})",
            self.cache.len(),
            if self.eager { "eager" } else { "lazy" },
            self.mode
        )?;
        for id in 0..self.cache.len() as StateId {
            let record = match self.cache.get(id) {
                Some(record) => record,
                None => continue,
            };
            let key = &record.key;
            write!(f, "[{}] threads {:?}", id, key.threads.as_slice())?;
            if key.searching {
                write!(f, " searching")?;
            }
            if key.context != 0 {
                write!(f, " ctx {:#x}", key.context)?;
            }
            if !key.behind.is_empty() {
                write!(f, " behind {:?}", key.behind.as_slice())?;
            }
            writeln!(f)?;
            let transitions = match record.transitions.get() {
                Some(t) => t,
                None => {
                    writeln!(f, "  (unexplored)")?;
                    continue;
                }
            };
            for (class, t) in transitions.table.iter().enumerate() {
                let mut cps = CodePointSet::new();
                for (iv, c) in transitions.classes.ranges() {
                    if *c as usize == class {
                        cps.add(*iv);
                    }
                }
                if t.next == DEAD && t.accept.is_none() {
                    continue;
                }
                write!(f, "  {} -> {}", cps, t.next)?;
                if let Some(accept) = &t.accept {
                    write!(f, " accept(")?;
                    fmt_replay(f, accept)?;
                    write!(f, ")")?;
                }
                writeln!(f)?;
            }
            if let Some(accept) = &transitions.eoi {
                write!(f, "  eoi accept(")?;
                fmt_replay(f, accept)?;
                writeln!(f, ")")?;
            }
            if let Some(accel) = &transitions.accel {
                writeln!(f, "  accel {}", accel.leave)?;
            }
        }
        Ok(())
    }
}
