//! Optimize states in an NFA builder

use crate::automata::nfa::{State, StateHandle};
use rustc_hash::FxHashSet;

// Optimize epsilons within states.
fn optimize_eps(states: &mut [State]) {
    // Drop ungated zero-op epsilons to self.
    for (idx, state) in states.iter_mut().enumerate() {
        state.eps.retain(|edge| {
            !(edge.target as usize == idx && edge.ops.is_empty() && edge.look.is_none())
        });
    }

    // Stable-dedup identical epsilon edges.
    let mut seen = FxHashSet::default();
    for state in states {
        // Common case.
        if state.eps.len() < 2 {
            continue;
        }
        seen.clear();
        state.eps.retain(|edge| seen.insert(edge.clone()));
    }
}

// Forward state handles to their dense representation.
fn forward_to_dense(states: &mut [State], forwarder: impl Fn(StateHandle) -> StateHandle) {
    for state in states {
        for edge in &mut state.eps {
            edge.target = forwarder(edge.target);
        }
        for t in &mut state.transitions {
            t.1 = forwarder(t.1);
        }
    }
}

// A state is collapsible if it has no transitions and a single outgoing
// epsilon with no operations and no gate. In that case, "collapse" the state into its target.
fn get_collapse_target(s: &State) -> Option<StateHandle> {
    match s.eps.as_slice() {
        [edge] if edge.ops.is_empty() && edge.look.is_none() && s.transitions.is_empty() => {
            Some(edge.target)
        }
        _ => None,
    }
}

// Compute, for each state, the state which ultimately replaces it.
// Chains which loop back on themselves are left alone.
fn resolve_forwarding(states: &[State]) -> Box<[StateHandle]> {
    let direct: Box<[Option<StateHandle>]> = states.iter().map(get_collapse_target).collect();
    let mut resolved: Vec<Option<StateHandle>> = vec![None; states.len()];
    let mut chain = Vec::new();
    for idx in 0..states.len() {
        if resolved[idx].is_some() {
            continue;
        }
        chain.clear();
        let mut cursor = idx as StateHandle;
        let terminal = loop {
            if let Some(dst) = resolved[cursor as usize] {
                break dst;
            }
            match direct[cursor as usize] {
                Some(next) if !chain.contains(&cursor) => {
                    chain.push(cursor);
                    cursor = next;
                }
                // A cycle: the state closing it stays.
                Some(_) => break cursor,
                None => break cursor,
            }
        };
        resolved[terminal as usize].get_or_insert(terminal);
        for &h in &chain {
            resolved[h as usize] = Some(terminal);
        }
        resolved[idx].get_or_insert(terminal);
    }
    resolved
        .into_iter()
        .enumerate()
        .map(|(i, r)| r.unwrap_or(i as StateHandle))
        .collect()
}

// Collapse states that don't need to be distinct, and update handle references.
// \return the new handle of `start`.
fn collapse_and_forward(states: &mut Vec<State>, start: StateHandle) -> StateHandle {
    // Maps StateHandles to the StateHandle that replaces them.
    let forwarding = resolve_forwarding(states);

    // Construct our ultimate dense state array.
    // This keeps only states that aren't forwarded.
    let mut next_dense_index: StateHandle = 0;
    let mut handle_to_dense_index = Vec::with_capacity(states.len());
    for (idx, &target) in forwarding.iter().enumerate() {
        if target == idx as StateHandle {
            handle_to_dense_index.push(next_dense_index);
            next_dense_index += 1;
        } else {
            // Forwarded; never looked up.
            handle_to_dense_index.push(StateHandle::MAX);
        }
    }

    let sparse_to_dense = |h: StateHandle| handle_to_dense_index[forwarding[h as usize] as usize];
    forward_to_dense(states, sparse_to_dense);
    let start = sparse_to_dense(start);

    // Retain only non-forwarded states.
    let mut state_idx = 0;
    states.retain(|_state| {
        let keep = forwarding[state_idx] == state_idx as StateHandle;
        state_idx += 1;
        keep
    });
    debug_assert_eq!(states.len(), next_dense_index as usize);
    start
}

// Optimize NFA states in-place, returning the new start state.
// The accepting state 0 has no epsilons, so it keeps its handle.
pub(super) fn optimize_states(states: &mut Vec<State>, start: StateHandle) -> StateHandle {
    optimize_eps(states);
    collapse_and_forward(states, start)
}
