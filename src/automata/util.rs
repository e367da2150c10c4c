//! Human-readable dumps of NFAs.

use crate::automata::nfa::{EpsEdge, Look, Nfa, Op, StateHandle, ACCEPT};
use core::fmt;

/// Format a capture operation compactly.
fn format_op(op: Op) -> String {
    match op {
        Op::Enter(g) => format!("+{}", g),
        Op::Exit(g) => format!("-{}", g),
        Op::Reset(g) => format!("!{}", g),
    }
}

/// Format a gate, naming look sets by index.
fn format_look(look: Look) -> String {
    let neg = |negate: bool| if negate { "!" } else { "" };
    match look {
        Look::Start => "^".to_string(),
        Look::End => "$".to_string(),
        Look::EndOrFinalNewline => "$\\n?".to_string(),
        Look::StartLine(set) => format!("^L{}", set),
        Look::EndLine(set) => format!("$L{}", set),
        Look::WordBoundary { set, negate } => format!("{}\\b{}", neg(negate), set),
        Look::Prev { set, negate } => format!("{}prev∈L{}", neg(negate), set),
        Look::Next { set, negate } => format!("{}next∈L{}", neg(negate), set),
    }
}

fn format_edge(edge: &EpsEdge, start: StateHandle) -> String {
    let dest = match edge.target {
        ACCEPT => "ACCEPT".to_string(),
        idx if idx == start => "START".to_string(),
        target => target.to_string(),
    };
    let mut annotations = Vec::new();
    if let Some(look) = edge.look {
        annotations.push(format_look(look));
    }
    annotations.extend(edge.ops.iter().map(|&op| format_op(op)));
    if annotations.is_empty() {
        format!("ε ──> {}", dest)
    } else {
        format!("ε [{}] ──> {}", annotations.join(","), dest)
    }
}

impl Nfa {
    /// Generate a human-readable representation of the NFA
    pub fn to_readable_string(&self) -> String {
        let mut result = String::new();
        result.push_str("NFA States:\n");
        result.push_str("===========\n\n");

        for (idx, set) in self.look_sets().iter().enumerate() {
            if set.is_empty() {
                result.push_str(&format!("Look set L{}: lookbehind automaton\n", idx));
            } else {
                result.push_str(&format!("Look set L{}: {}\n", idx, set));
            }
        }
        if !self.look_sets().is_empty() {
            result.push('\n');
        }

        for (idx, state) in self.states.iter().enumerate() {
            let state_idx = idx as StateHandle;

            // Add special state markers
            let marker = match state_idx {
                ACCEPT => " (ACCEPT)",
                idx if idx == self.start() => " (START)",
                _ => "",
            };

            result.push_str(&format!("State {}{}\n", state_idx, marker));

            if !state.eps.is_empty() {
                result.push_str("  ε-transitions:\n");
                for edge in &state.eps {
                    result.push_str(&format!("    {}\n", format_edge(edge, self.start())));
                }
            }

            if !state.transitions.is_empty() {
                result.push_str("  Transitions:\n");
                for (cps, target) in &state.transitions {
                    result.push_str(&format!("    {} ──> {}\n", cps, target));
                }
            }

            // Empty state indicator
            if state.eps.is_empty() && state.transitions.is_empty() && state_idx != ACCEPT {
                result.push_str("  (no transitions)\n");
            }

            result.push('\n');
        }

        result
    }
}

impl fmt::Display for Nfa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NFA({} states)", self.len())?;
        for (idx, state) in self.states.iter().enumerate() {
            let handle = idx as StateHandle;
            let marker = match handle {
                ACCEPT => "A",
                idx if idx == self.start() => "S",
                _ => " ",
            };

            write!(f, "[{}{}]", marker, handle)?;

            for edge in &state.eps {
                write!(f, " ε")?;
                if let Some(look) = edge.look {
                    write!(f, "[{}]", format_look(look))?;
                }
                for &op in &edge.ops {
                    write!(f, "{}", format_op(op))?;
                }
                write!(f, "→{}", edge.target)?;
            }

            for (cps, target) in &state.transitions {
                write!(f, " {}→{}", cps, target)?;
            }

            if idx < self.len() - 1 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
