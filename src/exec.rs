//! Execution engine bits.

use crate::api::{Flags, Match, MatchResult};
use crate::ast::CaptureGroupID;
use crate::automata::dfa::{Dfa, ExecMode};
use crate::automata::dfa_backend::{self, Outcome};
use crate::automata::nfa::Nfa;
use crate::automata::nfa_backend::{self, UNSET};
use crate::error::Error;
use crate::indexing::InputIndexer;
use crate::options::Options;
use crate::parse;

/// A compiled regex: the DFA plus what is needed to report matches.
#[derive(Debug)]
pub struct Compiled {
    pub(crate) dfa: Dfa,
    pub(crate) flags: Flags,
    pub(crate) options: Options,
    pub(crate) group_names: Box<[Box<str>]>,
}

impl Compiled {
    /// Parse a pattern and construct its automata.
    pub fn new<I>(pattern: I, flags: Flags, options: Options) -> Result<Compiled, Error>
    where
        I: Iterator<Item = u32> + Clone,
    {
        let re = parse::try_parse(pattern, flags, &options)?;
        let nfa = Nfa::try_from(&re, &options)?;
        let dfa = Dfa::try_from(nfa, &options)?;
        Ok(Compiled {
            dfa,
            flags,
            options,
            group_names: re.group_names,
        })
    }

    /// \return the number of capture groups, not counting the whole match.
    pub fn group_count(&self) -> CaptureGroupID {
        (self.dfa.nfa().group_count() - 1) as CaptureGroupID
    }

    /// \return the mode `exec` runs in.
    pub fn exec_mode(&self) -> ExecMode {
        if self.options.boolean_match {
            ExecMode::BooleanMatch
        } else {
            self.dfa.mode()
        }
    }

    /// Convert capture slots to a Match.
    pub(crate) fn to_match(&self, slots: &[usize]) -> Match {
        let group = |pair: &[usize]| match *pair {
            [start, end] if start != UNSET && end != UNSET => Some(start..end),
            _ => None,
        };
        Match {
            range: slots[0]..slots[1],
            captures: slots[2..].chunks(2).map(group).collect(),
            group_names: self.group_names.clone(),
        }
    }

    /// Search `input` from `from`.
    /// If `must_advance` is set, the search starts one code point after `from`.
    pub fn exec<Input, F>(
        &self,
        input: Input,
        from: usize,
        must_advance: bool,
        mode: ExecMode,
        cancel: &mut F,
    ) -> MatchResult
    where
        Input: InputIndexer,
        F: FnMut() -> bool,
    {
        if from > input.len() {
            return MatchResult::NoMatch;
        }
        assert!(
            input.is_boundary(from),
            "Search position {} is not at a code point boundary",
            from
        );
        let mut start = from;
        if must_advance && input.next_right(&mut start).is_none() {
            return MatchResult::NoMatch;
        }

        let mut cancelled = false;
        let mut poll = || {
            cancelled = cancel();
            cancelled
        };
        let outcome = dfa_backend::execute(&self.dfa, input, start, mode, &mut poll);
        if self.options.regression_test_mode && !cancelled {
            self.check_against_nfa(input, start, &outcome);
        }
        match outcome {
            Outcome::NoMatch => MatchResult::NoMatch,
            Outcome::Matched => MatchResult::Matched,
            Outcome::Slots(slots) => MatchResult::Captured(self.to_match(&slots)),
        }
    }

    /// Run the NFA simulation and panic if it disagrees with the DFA.
    fn check_against_nfa<Input: InputIndexer>(&self, input: Input, start: usize, outcome: &Outcome) {
        let expected = nfa_backend::execute_nfa(self.dfa.nfa(), input, start);
        let agrees = match (outcome, &expected) {
            (Outcome::NoMatch, None) | (Outcome::Matched, Some(_)) => true,
            (Outcome::Slots(actual), Some(expected)) => actual == expected,
            _ => false,
        };
        if !agrees {
            panic!(
                "DFA and NFA disagree at {}: DFA {:?}, NFA {:?}",
                start, outcome, expected
            );
        }
    }

    /// Find a match with its captures, ignoring `boolean_match`.
    pub fn find_at<Input: InputIndexer>(&self, input: Input, from: usize, must_advance: bool) -> Option<Match> {
        match self.exec(input, from, must_advance, self.dfa.mode(), &mut || false) {
            MatchResult::Captured(m) => Some(m),
            MatchResult::NoMatch | MatchResult::Matched => None,
        }
    }
}

/// A trait for finding the next match in a regex.
/// This is broken out from Matches to avoid needing to thread lifetimes
/// around.
pub trait MatchProducer: std::fmt::Debug {
    /// Attempt to match at the given location.
    /// \return either the Match and the position to start looking for the next
    /// match, or None on failure.
    fn next_match(&mut self, pos: usize, next_start: &mut Option<usize>) -> Option<Match>;
}

/// Produces the matches of a regex over one input.
#[derive(Debug)]
pub struct DfaExecutor<'r, Input: InputIndexer> {
    re: &'r Compiled,
    input: Input,
    // Whether the next search must start past its position.
    must_advance: bool,
}

impl<'r, Input: InputIndexer> DfaExecutor<'r, Input> {
    pub fn new(re: &'r Compiled, input: Input) -> Self {
        Self {
            re,
            input,
            must_advance: re.options.must_advance,
        }
    }
}

impl<Input: InputIndexer> MatchProducer for DfaExecutor<'_, Input> {
    fn next_match(&mut self, pos: usize, next_start: &mut Option<usize>) -> Option<Match> {
        let m = self.re.find_at(self.input, pos, self.must_advance);
        match &m {
            Some(m) => {
                // An empty match is reported once; the next search moves past it.
                self.must_advance = m.range.is_empty();
                *next_start = Some(m.end());
            }
            None => *next_start = None,
        }
        m
    }
}

/// A struct which enables iteration over matches.
#[derive(Debug)]
pub struct Matches<Producer: MatchProducer> {
    mp: Producer,
    offset: Option<usize>,
}

impl<Producer: MatchProducer> Matches<Producer> {
    pub fn new(mp: Producer, start: usize) -> Self {
        Matches {
            mp,
            offset: Some(start),
        }
    }
}

impl<Producer: MatchProducer> Iterator for Matches<Producer> {
    type Item = Match;
    fn next(&mut self) -> Option<Self::Item> {
        let start = self.offset?;
        self.mp.next_match(start, &mut self.offset)
    }
}
