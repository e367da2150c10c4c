//! Conversion of the AST to finite automata, and their execution.

pub mod cache;
pub mod dfa;
pub mod dfa_backend;
pub mod nfa;
pub mod nfa_backend;
mod nfa_optimize;
mod util;
