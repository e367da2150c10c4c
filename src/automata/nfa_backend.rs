//! NFA simulation, used as the reference for the DFA.
//!
//! This is a PikeVM: it advances every thread in lockstep over the input, in
//! priority order, so it finds the same leftmost-first match as a backtracker
//! would without ever backtracking.

use crate::automata::nfa::{LookAhead, Nfa, Op, StateHandle, ACCEPT};
use crate::indexing::InputIndexer;

/// A capture slot which has not been set.
pub const UNSET: usize = usize::MAX;

/// Apply capture operations to slots, at a position.
#[inline]
pub fn apply_ops(slots: &mut [usize], ops: &[Op], pos: usize) {
    for op in ops {
        match *op {
            Op::Enter(g) => {
                slots[2 * g as usize] = pos;
                slots[2 * g as usize + 1] = UNSET;
            }
            Op::Exit(g) => slots[2 * g as usize + 1] = pos,
            Op::Reset(g) => {
                slots[2 * g as usize] = UNSET;
                slots[2 * g as usize + 1] = UNSET;
            }
        }
    }
}

/// \return what lies ahead of a position.
pub fn look_ahead<Input: InputIndexer>(nfa: &Nfa, input: Input, pos: usize) -> LookAhead {
    let mut next = pos;
    match input.next_right(&mut next) {
        None => LookAhead::Eoi,
        Some(cp) => LookAhead::Char {
            mask: nfa.look_mask(cp),
            final_newline: cp == '\n' as u32 && next == input.len() && nfa.uses_final_newline(),
        },
    }
}

struct Thread {
    state: StateHandle,
    slots: Box<[usize]>,
}

struct Simulation<'a> {
    nfa: &'a Nfa,
    // Per-step visited marks.
    visited: Vec<bool>,
    // Kernel threads produced by the closure, in priority order.
    kernel: Vec<Thread>,
    // Slots of the most recent match.
    matched: Option<Box<[usize]>>,
}

impl Simulation<'_> {
    // Follow epsilons from a thread, in priority order.
    // \return true if the accepting state was reached, cutting everything after.
    fn closure(&mut self, state: StateHandle, slots: Box<[usize]>, ctx: u32, ahead: LookAhead, pos: usize) -> bool {
        if self.visited[state as usize] {
            return false;
        }
        self.visited[state as usize] = true;
        if state == ACCEPT {
            self.matched = Some(slots);
            return true;
        }
        let s = self.nfa.at(state);
        if s.is_kernel() {
            self.kernel.push(Thread {
                state,
                slots: slots.clone(),
            });
        }
        for edge in &s.eps {
            if let Some(look) = edge.look {
                if !look.passes(ctx, ahead) {
                    continue;
                }
            }
            let mut next = slots.clone();
            apply_ops(&mut next, &edge.ops, pos);
            if self.closure(edge.target, next, ctx, ahead, pos) {
                return true;
            }
        }
        false
    }
}

/// Execute the NFA against an input, starting the search at `start`.
/// \return the capture slots of the leftmost-first match, or None.
pub fn execute_nfa<Input: InputIndexer>(nfa: &Nfa, input: Input, start: usize) -> Option<Box<[usize]>> {
    let nslots = 2 * nfa.group_count();
    let fresh = || vec![UNSET; nslots].into_boxed_slice();
    let mut sim = Simulation {
        nfa,
        visited: vec![false; nfa.len()],
        kernel: Vec::new(),
        matched: None,
    };

    let mut seeds: Vec<Thread> = Vec::new();
    if nfa.anchored() {
        seeds.push(Thread {
            state: nfa.start(),
            slots: fresh(),
        });
    }
    let mut searching = !nfa.anchored();
    let mut pos = start;
    let (mut ctx, mut behind) = nfa.context_at(input, pos);
    loop {
        let ahead = look_ahead(nfa, input, pos);
        sim.visited.iter_mut().for_each(|v| *v = false);
        sim.kernel.clear();
        let mut accepted = false;
        for seed in seeds.drain(..) {
            if sim.closure(seed.state, seed.slots, ctx, ahead, pos) {
                accepted = true;
                break;
            }
        }
        if searching && !accepted {
            accepted = sim.closure(nfa.start(), fresh(), ctx, ahead, pos);
        }
        if accepted {
            searching = false;
        }

        let mut next_pos = pos;
        let cp = match input.next_right(&mut next_pos) {
            Some(cp) => cp,
            None => break,
        };
        if sim.kernel.is_empty() && !searching {
            break;
        }
        for thread in sim.kernel.drain(..) {
            for (cps, target) in &nfa.at(thread.state).transitions {
                if cps.contains(cp) && !seeds.iter().any(|t| t.state == *target) {
                    seeds.push(Thread {
                        state: *target,
                        slots: thread.slots.clone(),
                    });
                }
            }
        }
        let (next_ctx, next_behind) = nfa.advance_context(&behind, cp);
        ctx = next_ctx;
        behind = next_behind;
        pos = next_pos;
    }
    sim.matched
}
