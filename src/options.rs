//! Engine options.
//!
//! `Options` selects the syntax flavor, the input encoding and the various
//! compile-time limits. It can be built field by field, or parsed from an
//! option string like `Flavor=Python,Encoding=UTF-16,MustAdvance=true`.

use crate::codepointset::{CodePointSet, Interval, CODE_POINT_MAX};
use crate::error::Error;
use crate::folds::CaseFoldTable;
use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

/// Default limit on the number of NFA states.
pub const DEFAULT_MAX_NFA_STATES: usize = 3500;

/// Default limit on the number of DFA states held by the shared cache.
pub const DEFAULT_MAX_DFA_STATES: usize = 2400;

/// DFAs of NFAs up to this size keep their transition tables from compile time.
pub const DEFAULT_EAGER_NFA_THRESHOLD: usize = 256;

/// The syntax flavor of a pattern.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Flavor {
    #[default]
    ECMAScript,
    Python,
    Ruby,
}

/// The encoding of the input, which determines the code point space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16,
    Utf32,
    Latin1,
    Bytes,
}

impl Encoding {
    /// \return the largest code point representable in this encoding.
    pub fn max_code_point(self) -> u32 {
        match self {
            Encoding::Latin1 | Encoding::Bytes => 0xFF,
            Encoding::Utf8 | Encoding::Utf16 | Encoding::Utf32 => CODE_POINT_MAX,
        }
    }

    /// \return every code point of this encoding, as a set.
    pub fn code_point_space(self) -> CodePointSet {
        CodePointSet::from_interval(Interval::new(0, self.max_code_point()))
    }
}

/// Which Python matching method the regex implements.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PythonMethod {
    /// `re.search`: find a match anywhere.
    #[default]
    Search,
    /// `re.match`: the match must start at the search position.
    Match,
    /// `re.fullmatch`: the match must span from the search position to the end.
    FullMatch,
}

/// Options controlling how a regex is compiled and executed.
#[derive(Debug, Clone)]
pub struct Options {
    pub flavor: Flavor,
    pub encoding: Encoding,
    pub python_method: PythonMethod,

    /// If set, the convenience searches never report an empty match at their
    /// start position.
    pub must_advance: bool,

    /// If set, `exec` only reports whether a match exists, without positions.
    pub boolean_match: bool,

    /// If set, every DFA transition table is kept from compile time, however
    /// large the NFA.
    pub always_eager: bool,

    /// If set, compilation determinizes completely to validate the pattern.
    pub validate: bool,

    /// If set, `\s` also matches U+180E.
    pub u180e_whitespace: bool,

    /// If set, atomic groups `(?>...)` of the Python and Ruby flavors are
    /// parsed as non-capturing groups. They still match leftmost-first, so a
    /// match that backtracking would rule out may be found.
    pub ignore_atomic_groups: bool,

    /// If set, every execution is checked against the NFA simulation.
    pub regression_test_mode: bool,

    pub max_nfa_states: usize,
    pub max_dfa_states: usize,
    pub eager_nfa_threshold: usize,

    /// The case folding table for case-insensitive patterns.
    /// If None, Unicode simple case folding is used.
    pub case_folding: Option<Arc<CaseFoldTable>>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            flavor: Flavor::default(),
            encoding: Encoding::default(),
            python_method: PythonMethod::default(),
            must_advance: false,
            boolean_match: false,
            always_eager: false,
            validate: false,
            u180e_whitespace: false,
            ignore_atomic_groups: false,
            regression_test_mode: false,
            max_nfa_states: DEFAULT_MAX_NFA_STATES,
            max_dfa_states: DEFAULT_MAX_DFA_STATES,
            eager_nfa_threshold: DEFAULT_EAGER_NFA_THRESHOLD,
            case_folding: None,
        }
    }
}

impl Options {
    /// Construct default options for a flavor.
    pub fn with_flavor(flavor: Flavor) -> Self {
        Options {
            flavor,
            ..Options::default()
        }
    }

    /// \return the case folding table to use.
    pub fn fold_table(&self) -> Arc<CaseFoldTable> {
        match &self.case_folding {
            Some(table) => table.clone(),
            None => CaseFoldTable::unicode(),
        }
    }

    /// \return whether matches are anchored at the search position.
    pub(crate) fn python_anchored(&self) -> bool {
        self.flavor == Flavor::Python && self.python_method != PythonMethod::Search
    }

    /// \return whether matches must extend to the end of the input.
    pub(crate) fn python_fullmatch(&self) -> bool {
        self.flavor == Flavor::Python && self.python_method == PythonMethod::FullMatch
    }
}

fn parse_bool(key: &str, value: &str, offset: usize) -> Result<bool, Error> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::syntax(
            offset,
            format!("Invalid value for option {}: {}", key, value),
        )),
    }
}

fn parse_count(key: &str, value: &str, offset: usize) -> Result<usize, Error> {
    value.parse().map_err(|_| {
        Error::syntax(
            offset,
            format!("Invalid value for option {}: {}", key, value),
        )
    })
}

impl FromStr for Options {
    type Err = Error;

    /// Parse a comma separated list of `Key=Value` options.
    /// Keys and flavor names are case sensitive; the empty string produces
    /// the defaults.
    fn from_str(s: &str) -> Result<Self, Error> {
        let mut opts = Options::default();
        let mut offset = 0;
        for item in s.split(',') {
            let item_offset = offset;
            offset += item.chars().count() + 1;
            if item.is_empty() {
                continue;
            }
            let (key, value) = match item.split_once('=') {
                Some(kv) => kv,
                None => {
                    return Err(Error::syntax(
                        item_offset,
                        format!("Expected Key=Value in option: {}", item),
                    ))
                }
            };
            let value_offset = item_offset + key.chars().count() + 1;
            match key {
                "Flavor" => {
                    opts.flavor = match value {
                        "ECMAScript" => Flavor::ECMAScript,
                        "Python" => Flavor::Python,
                        "Ruby" => Flavor::Ruby,
                        _ => {
                            return Err(Error::syntax(
                                value_offset,
                                format!("Unknown flavor: {}", value),
                            ))
                        }
                    }
                }
                "Encoding" => {
                    opts.encoding = match value {
                        "UTF-8" => Encoding::Utf8,
                        "UTF-16" => Encoding::Utf16,
                        "UTF-32" => Encoding::Utf32,
                        "LATIN-1" => Encoding::Latin1,
                        "BYTES" => Encoding::Bytes,
                        _ => {
                            return Err(Error::syntax(
                                value_offset,
                                format!("Unknown encoding: {}", value),
                            ))
                        }
                    }
                }
                "PythonMethod" => {
                    opts.python_method = match value {
                        "search" => PythonMethod::Search,
                        "match" => PythonMethod::Match,
                        "fullmatch" => PythonMethod::FullMatch,
                        _ => {
                            return Err(Error::syntax(
                                value_offset,
                                format!("Unknown Python method: {}", value),
                            ))
                        }
                    }
                }
                "MustAdvance" => opts.must_advance = parse_bool(key, value, value_offset)?,
                "BooleanMatch" => opts.boolean_match = parse_bool(key, value, value_offset)?,
                "AlwaysEager" => opts.always_eager = parse_bool(key, value, value_offset)?,
                "Validate" => opts.validate = parse_bool(key, value, value_offset)?,
                "U180EWhitespace" => {
                    opts.u180e_whitespace = parse_bool(key, value, value_offset)?
                }
                "IgnoreAtomicGroups" => {
                    opts.ignore_atomic_groups = parse_bool(key, value, value_offset)?
                }
                "RegressionTestMode" => {
                    opts.regression_test_mode = parse_bool(key, value, value_offset)?
                }
                "MaxNFAStates" => opts.max_nfa_states = parse_count(key, value, value_offset)?,
                "MaxDFAStates" => opts.max_dfa_states = parse_count(key, value, value_offset)?,
                "EagerNFAThreshold" => {
                    opts.eager_nfa_threshold = parse_count(key, value, value_offset)?
                }
                _ => {
                    return Err(Error::syntax(
                        item_offset,
                        format!("Unknown option: {}", key),
                    ))
                }
            }
        }
        Ok(opts)
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Flavor::ECMAScript => "ECMAScript",
            Flavor::Python => "Python",
            Flavor::Ruby => "Ruby",
        })
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16 => "UTF-16",
            Encoding::Utf32 => "UTF-32",
            Encoding::Latin1 => "LATIN-1",
            Encoding::Bytes => "BYTES",
        })
    }
}
