//! DFA execution backend for pattern matching.
//!
//! The executor walks the DFA over the input one code point at a time,
//! remembering the most recent accepting transition. Capture slots are carried
//! along by replaying the per-transition moves recorded by the DFA.

use crate::automata::dfa::{Accel, ByteSkip, Dfa, ExecMode, Replay, Transition, DEAD, RESTART};
use crate::automata::nfa_backend::{apply_ops, UNSET};
use crate::bytesearch::ByteSearcher;
use crate::codepointset::CODE_POINT_MAX;
use crate::indexing::{InputIndexer, Units, REPLACEMENT_CHARACTER};
use crate::util::{is_lead_surrogate, is_trail_surrogate};

/// Result of DFA execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoMatch,
    /// A match was found, and its position was not asked for.
    Matched,
    /// A match was found, with these capture slots.
    Slots(Box<[usize]>),
}

// Follows the capture slots of the threads of the current state.
trait Tracker {
    /// A match ends at `pos`. \return true to stop searching.
    fn accept(&mut self, replay: &Replay, pos: usize) -> bool;

    /// Carry slots over a transition taken at `pos`.
    fn advance(&mut self, t: &Transition, pos: usize);

    fn finish(self) -> Outcome;
}

#[derive(Debug, Default)]
struct BooleanTracker {
    matched: bool,
}

impl Tracker for BooleanTracker {
    #[inline(always)]
    fn accept(&mut self, _replay: &Replay, _pos: usize) -> bool {
        self.matched = true;
        true
    }

    #[inline(always)]
    fn advance(&mut self, _t: &Transition, _pos: usize) {}

    fn finish(self) -> Outcome {
        if self.matched {
            Outcome::Matched
        } else {
            Outcome::NoMatch
        }
    }
}

// Every state has at most one thread, so there is one slot array.
#[derive(Debug)]
struct SimpleTracker {
    slots: Box<[usize]>,
    best: Option<Box<[usize]>>,
}

impl Tracker for SimpleTracker {
    #[inline(always)]
    fn accept(&mut self, replay: &Replay, pos: usize) -> bool {
        let mut slots = self.slots.clone();
        if replay.src == RESTART {
            slots.fill(UNSET);
        }
        apply_ops(&mut slots, &replay.ops, pos);
        self.best = Some(slots);
        false
    }

    #[inline(always)]
    fn advance(&mut self, t: &Transition, pos: usize) {
        if t.identity {
            return;
        }
        if let Some(mv) = t.moves.first() {
            if mv.src == RESTART {
                self.slots.fill(UNSET);
            }
            apply_ops(&mut self.slots, &mv.ops, pos);
        }
    }

    fn finish(self) -> Outcome {
        self.best.map_or(Outcome::NoMatch, Outcome::Slots)
    }
}

// One slot array per thread, stored contiguously.
#[derive(Debug)]
struct GenericTracker {
    nslots: usize,
    cur: Vec<usize>,
    next: Vec<usize>,
    best: Option<Box<[usize]>>,
}

impl GenericTracker {
    #[inline(always)]
    fn thread(&self, src: u32) -> &[usize] {
        let start = src as usize * self.nslots;
        &self.cur[start..start + self.nslots]
    }
}

impl Tracker for GenericTracker {
    #[inline(always)]
    fn accept(&mut self, replay: &Replay, pos: usize) -> bool {
        let mut slots: Box<[usize]> = if replay.src == RESTART {
            vec![UNSET; self.nslots].into_boxed_slice()
        } else {
            self.thread(replay.src).into()
        };
        apply_ops(&mut slots, &replay.ops, pos);
        self.best = Some(slots);
        false
    }

    #[inline(always)]
    fn advance(&mut self, t: &Transition, pos: usize) {
        if t.identity {
            return;
        }
        let n = self.nslots;
        self.next.clear();
        for mv in t.moves.iter() {
            let at = self.next.len();
            if mv.src == RESTART {
                self.next.resize(at + n, UNSET);
            } else {
                let start = mv.src as usize * n;
                self.next.extend_from_slice(&self.cur[start..start + n]);
            }
            apply_ops(&mut self.next[at..], &mv.ops, pos);
        }
        core::mem::swap(&mut self.cur, &mut self.next);
    }

    fn finish(self) -> Outcome {
        self.best.map_or(Outcome::NoMatch, Outcome::Slots)
    }
}

#[inline]
fn skip_bytes(bytes: &[u8], pos: usize, skip: ByteSkip) -> usize {
    match skip {
        ByteSkip::ToEnd => bytes.len(),
        ByteSkip::Find(finder) => finder
            .find_in(&bytes[pos..])
            .map_or(bytes.len(), |idx| pos + idx),
        ByteSkip::No => pos,
    }
}

// Skip units which cannot leave an accelerated state.
// Surrogates in UTF-16 stop the scan, leaving them to the decoder.
#[inline]
fn skip<Input: InputIndexer>(input: &Input, pos: usize, accel: &Accel) -> usize {
    match input.units() {
        Units::Utf8(bytes) => skip_bytes(bytes, pos, accel.utf8),
        Units::Latin1(bytes) => skip_bytes(bytes, pos, accel.latin1),
        Units::Utf16(units) if accel.units => units[pos..]
            .iter()
            .position(|&u| {
                let u = u as u32;
                is_lead_surrogate(u) || is_trail_surrogate(u) || accel.leave.contains(u)
            })
            .map_or(units.len(), |idx| pos + idx),
        Units::Ucs2(units) if accel.units => units[pos..]
            .iter()
            .position(|&u| accel.leave.contains(u as u32))
            .map_or(units.len(), |idx| pos + idx),
        Units::Utf32(units) if accel.units => units[pos..]
            .iter()
            .position(|&u| {
                let cp = if u > CODE_POINT_MAX { REPLACEMENT_CHARACTER } else { u };
                accel.leave.contains(cp)
            })
            .map_or(units.len(), |idx| pos + idx),
        _ => pos,
    }
}

// Walk the DFA from `start`.
// \return false if cancelled.
fn run<Input, T, F>(dfa: &Dfa, input: Input, start: usize, tracker: &mut T, cancel: &mut F) -> bool
where
    Input: InputIndexer,
    T: Tracker,
    F: FnMut() -> bool,
{
    let len = input.len();
    let mut pos = start;
    let mut state = dfa.start_at(input, pos);
    let mut table = dfa.transitions(state);
    let trace = log::log_enabled!(log::Level::Trace);
    loop {
        if let Some(accel) = &table.accel {
            pos = skip(&input, pos, accel);
        }
        let mut next_pos = pos;
        let cp = match input.next_right(&mut next_pos) {
            Some(cp) => cp,
            None => {
                if let Some(replay) = &table.eoi {
                    tracker.accept(replay, pos);
                }
                return true;
            }
        };
        if cancel() {
            return false;
        }
        let t = match &table.final_newline {
            Some(t) if cp == '\n' as u32 && next_pos == len => t,
            _ => table.on(cp),
        };
        if trace {
            log::trace!(
                "state {} at {}: U+{:04X} -> {}{}",
                state,
                pos,
                cp,
                t.next,
                if t.accept.is_some() { " (accept)" } else { "" }
            );
        }
        if let Some(replay) = &t.accept {
            if tracker.accept(replay, pos) {
                return true;
            }
        }
        if t.next == DEAD {
            return true;
        }
        tracker.advance(t, pos);
        let next = t.next;
        pos = next_pos;
        if next != state {
            state = next;
            table = dfa.transitions(state);
        }
    }
}

/// Execute the DFA against an input, starting the search at `start`.
/// The cancellation callback is polled once per code point; a cancelled
/// execution reports no match.
pub fn execute<Input, F>(dfa: &Dfa, input: Input, start: usize, mode: ExecMode, cancel: &mut F) -> Outcome
where
    Input: InputIndexer,
    F: FnMut() -> bool,
{
    debug_assert!(start <= input.len() && input.is_boundary(start));
    let nslots = 2 * dfa.nfa().group_count();
    let mode = match (mode, dfa.mode()) {
        (ExecMode::SimpleCaptureGroups, ExecMode::GenericCaptureGroups) => {
            ExecMode::GenericCaptureGroups
        }
        (mode, _) => mode,
    };
    match mode {
        ExecMode::BooleanMatch => {
            let mut tracker = BooleanTracker::default();
            if !run(dfa, input, start, &mut tracker, cancel) {
                return Outcome::NoMatch;
            }
            tracker.finish()
        }
        ExecMode::SimpleCaptureGroups => {
            let mut tracker = SimpleTracker {
                slots: vec![UNSET; nslots].into_boxed_slice(),
                best: None,
            };
            if !run(dfa, input, start, &mut tracker, cancel) {
                return Outcome::NoMatch;
            }
            tracker.finish()
        }
        ExecMode::GenericCaptureGroups => {
            // An anchored start state has one fresh thread.
            let threads = usize::from(dfa.nfa().anchored());
            let mut tracker = GenericTracker {
                nslots,
                cur: vec![UNSET; threads * nslots],
                next: Vec::new(),
                best: None,
            };
            if !run(dfa, input, start, &mut tracker, cancel) {
                return Outcome::NoMatch;
            }
            tracker.finish()
        }
    }
}
