use crate::automata::dfa::ExecMode;
use crate::error::Error;
use crate::exec::{self, Compiled, DfaExecutor};
use crate::indexing::{InputIndexer, Latin1Input, Utf32Input, Utf8Input};
use crate::options::Options;
use crate::util::to_char_sat;

#[cfg(feature = "utf16")]
use crate::indexing::{Ucs2Input, Utf16Input};

use core::{fmt, str::FromStr};
use std::sync::Arc;

/// Flags used to control regex parsing.
/// The default flags are case-sensitive, not-multiline, and optimizing.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    /// If set, make the regex case-insensitive.
    /// Equivalent to the 'i' flag in JavaScript.
    pub icase: bool,

    /// If set, ^ and $ match at line separators, not just the input boundaries.
    /// Equivalent to the 'm' flag in JavaScript.
    pub multiline: bool,

    /// If set, . matches at line separators as well as any other character.
    /// Equivalent to the 's' flag in JavaScript.
    pub dot_all: bool,

    /// If set, disable NFA optimization passes.
    pub no_opt: bool,

    /// If set, the regex is interpreted as a Unicode regex.
    /// Equivalent to the 'u' flag in JavaScript.
    pub unicode: bool,

    /// If set, matches must begin at the search position.
    /// Equivalent to the 'y' flag in JavaScript.
    pub sticky: bool,

    /// If set, whitespace and comments in the pattern are ignored, in flavors
    /// which support a verbose mode.
    pub extended: bool,
}

impl Flags {
    /// Construct a Flags from a Unicode codepoints iterator, using JavaScript field names.
    /// 'i' means to ignore case, 'm' means multiline, 's' means dot-all,
    /// 'u' means unicode, 'y' means sticky, 'x' means extended.
    /// Note the 'g' flag implies a stateful regex and is not supported.
    /// Other flags are ignored.
    #[inline]
    pub fn new<T: Iterator<Item = u32>>(chars: T) -> Self {
        let mut result = Self::default();
        for c in chars {
            match to_char_sat(c) {
                'm' => result.multiline = true,
                'i' => result.icase = true,
                's' => result.dot_all = true,
                'u' => result.unicode = true,
                'y' => result.sticky = true,
                'x' => result.extended = true,
                _ => {
                    // Silently skip unsupported flags.
                }
            }
        }
        result
    }
}

impl From<&str> for Flags {
    /// Construct a Flags from a string, using JavaScript field names.
    ///
    /// See also: [`Flags::new`].
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s.chars().map(u32::from))
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.multiline {
            f.write_str("m")?;
        }
        if self.icase {
            f.write_str("i")?;
        }
        if self.dot_all {
            f.write_str("s")?;
        }
        if self.unicode {
            f.write_str("u")?;
        }
        if self.sticky {
            f.write_str("y")?;
        }
        if self.extended {
            f.write_str("x")?;
        }
        Ok(())
    }
}

/// Range is used to express the extent of a match, as indexes into the input
/// string.
pub type Range = core::ops::Range<usize>;

/// An iterator type which yields `Match`es found in a string.
pub type Matches<'r, 't> = exec::Matches<DfaExecutor<'r, Utf8Input<'t>>>;

/// A Match represents a portion of a string which was found to match a Regex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The total range of the match. Note this may be empty, if the regex
    /// matched an empty string.
    pub range: Range,

    /// The list of captures. This has length equal to the number of capturing
    /// groups in the regex. For each capture, if the value is None, that group
    /// did not match (for example, it was in a not-taken branch of an
    /// alternation). If the value is Some, the group did match with the
    /// enclosed range.
    pub captures: Vec<Option<Range>>,

    // A list of capture group names. This is either:
    //   - Empty, if there were no named capture groups.
    //   - A list of names with length `captures.len()`, corresponding to the
    //     capture group names in order. Groups without names have an empty string.
    pub(crate) group_names: Box<[Box<str>]>,
}

impl Match {
    /// Access a group by index, using the convention of Python's group()
    /// function. Index 0 is the total match, index 1 is the first capture
    /// group.
    #[inline]
    pub fn group(&self, idx: usize) -> Option<Range> {
        if idx == 0 {
            Some(self.range.clone())
        } else {
            self.captures[idx - 1].clone()
        }
    }

    /// Access a named group by name.
    #[inline]
    pub fn named_group(&self, name: &str) -> Option<Range> {
        // Empty strings are used as sentinels to indicate unnamed group.
        if name.is_empty() {
            return None;
        }
        let pos = self.group_names.iter().position(|s| s.as_ref() == name)?;
        self.captures[pos].clone()
    }

    /// Return an iterator over the named groups of a Match.
    #[inline]
    pub fn named_groups(&self) -> NamedGroups {
        NamedGroups::new(self)
    }

    /// Returns the range over the starting and ending offsets of the match.
    ///
    /// This is a convenience function to work around
    /// the fact that Range does not support Copy.
    #[inline]
    pub fn range(&self) -> Range {
        self.range.clone()
    }

    /// Returns the starting offset of the match.
    #[inline]
    pub fn start(&self) -> usize {
        self.range.start
    }

    /// Returns the ending offset of the match.
    #[inline]
    pub fn end(&self) -> usize {
        self.range.end
    }

    /// Return an iterator over a Match. The first returned value is the total
    /// match, and subsequent values represent the capture groups.
    #[inline]
    pub fn groups(&self) -> Groups {
        Groups::new(self)
    }

    /// Return the start and end of every group, the total match first.
    /// Groups which did not participate are reported as `(-1, -1)`.
    pub fn group_offsets(&self) -> Vec<(isize, isize)> {
        self.groups()
            .map(|group| match group {
                Some(r) => (r.start as isize, r.end as isize),
                None => (-1, -1),
            })
            .collect()
    }
}

/// An iterator over the capture groups of a [`Match`]
///
/// This struct is created by the [`groups`] method on [`Match`].
///
/// [`Match`]: ../struct.Match.html
/// [`groups`]: ../struct.Match.html#method.groups
#[derive(Clone)]
pub struct Groups<'m> {
    mat: &'m Match,
    i: usize,
    max: usize,
}

impl<'m> Groups<'m> {
    #[inline]
    fn new(mat: &'m Match) -> Self {
        Self {
            mat,
            i: 0,
            max: mat.captures.len() + 1,
        }
    }
}

impl Iterator for Groups<'_> {
    type Item = Option<Range>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let i = self.i;
        if i < self.max {
            self.i += 1;
            Some(self.mat.group(i))
        } else {
            None
        }
    }
}

/// An iterator over the named capture groups of a [`Match`]
///
/// This struct is created by the [`named_groups`] method on [`Match`].
///
/// [`Match`]: ../struct.Match.html
/// [`named_groups`]: ../struct.Match.html#method.named_groups
#[derive(Clone)]
pub struct NamedGroups<'m> {
    mat: &'m Match,
    next_group_name_idx: usize,
}

impl<'m> NamedGroups<'m> {
    #[inline]
    fn new(mat: &'m Match) -> Self {
        Self {
            mat,
            next_group_name_idx: 0,
        }
    }
}

impl<'m> Iterator for NamedGroups<'m> {
    type Item = (&'m str, Option<Range>);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        // Increment next_group_name_idx until we find a non-empty name.
        debug_assert!(self.next_group_name_idx <= self.mat.group_names.len());
        let end = self.mat.group_names.len();
        let mut idx = self.next_group_name_idx;
        while idx < end && self.mat.group_names[idx].is_empty() {
            idx += 1;
        }
        if idx == end {
            return None;
        }
        let name = self.mat.group_names[idx].as_ref();
        let range = self.mat.captures[idx].clone();
        self.next_group_name_idx = idx + 1;
        Some((name, range))
    }
}

/// The result of a single execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// The regex does not match.
    NoMatch,

    /// The regex matches; only reported in boolean match mode.
    Matched,

    /// The regex matches, with the match and its capture groups.
    Captured(Match),
}

impl MatchResult {
    /// \return whether this reports a match.
    #[inline]
    pub fn is_match(&self) -> bool {
        !matches!(self, MatchResult::NoMatch)
    }

    /// \return the match, if positions were tracked.
    #[inline]
    pub fn into_match(self) -> Option<Match> {
        match self {
            MatchResult::Captured(m) => Some(m),
            MatchResult::NoMatch | MatchResult::Matched => None,
        }
    }
}

/// A Regex is the compiled version of a pattern.
/// Cloning is cheap, and a Regex may be used from many threads at once; the
/// lazily built DFA states are shared between them.
#[derive(Debug, Clone)]
pub struct Regex {
    inner: Arc<Compiled>,
}

impl Regex {
    /// Construct a regex by parsing `pattern` using the default flags.
    /// An Error may be returned if the syntax is invalid.
    /// Note that this is rather expensive; prefer to cache a Regex which is
    /// intended to be used more than once.
    #[inline]
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        Self::with_flags(pattern, Flags::default())
    }

    /// Construct a regex by parsing `pattern` with `flags`.
    /// An Error may be returned if the syntax is invalid.
    #[inline]
    pub fn with_flags<F>(pattern: &str, flags: F) -> Result<Regex, Error>
    where
        F: Into<Flags>,
    {
        Self::from_unicode(pattern.chars().map(u32::from), flags)
    }

    /// Construct a regex by parsing `pattern` with `flags`, using the flavor,
    /// encoding and limits given by `options`.
    ///
    /// ```rust
    /// use lazyre::{Flavor, Options, Regex};
    /// let options = Options::with_flavor(Flavor::Python);
    /// let re = Regex::with_options(r"(?P<year>\d{4})", "", options).unwrap();
    /// let m = re.find("in 1999").unwrap();
    /// assert_eq!(m.named_group("year"), Some(3..7));
    /// ```
    #[inline]
    pub fn with_options<F>(pattern: &str, flags: F, options: Options) -> Result<Regex, Error>
    where
        F: Into<Flags>,
    {
        Self::from_unicode_with_options(pattern.chars().map(u32::from), flags, options)
    }

    /// Construct a regex by parsing `pattern` with `flags`, where
    /// `pattern` is an iterator of `u32` Unicode codepoints.
    /// An Error may be returned if the syntax is invalid.
    /// This allows parsing regular expressions from exotic strings in
    /// other encodings, such as UTF-16 or UTF-32.
    pub fn from_unicode<I, F>(pattern: I, flags: F) -> Result<Regex, Error>
    where
        I: Iterator<Item = u32> + Clone,
        F: Into<Flags>,
    {
        Self::from_unicode_with_options(pattern, flags, Options::default())
    }

    /// Like [`Regex::from_unicode`], with explicit options.
    pub fn from_unicode_with_options<I, F>(pattern: I, flags: F, options: Options) -> Result<Regex, Error>
    where
        I: Iterator<Item = u32> + Clone,
        F: Into<Flags>,
    {
        let inner = Compiled::new(pattern, flags.into(), options)?;
        Ok(Regex {
            inner: Arc::new(inner),
        })
    }

    /// Execute the regex once against `input`, starting at `from`.
    /// If `must_advance` is set, a match may not begin at `from`.
    /// In boolean match mode, a match is reported as [`MatchResult::Matched`].
    /// A `from` past the end of the input reports [`MatchResult::NoMatch`].
    ///
    /// # Panics
    ///
    /// Panics if `from` is inside a code point, such as between the bytes of a
    /// UTF-8 sequence or the halves of a UTF-16 surrogate pair.
    #[inline]
    pub fn exec<Input: InputIndexer>(&self, input: Input, from: usize, must_advance: bool) -> MatchResult {
        self.exec_with_cancellation(input, from, must_advance, || false)
    }

    /// Like [`Regex::exec`], polling `cancel` once per consumed code point.
    /// A cancelled execution reports [`MatchResult::NoMatch`].
    ///
    /// # Panics
    ///
    /// Panics if `from` is inside a code point.
    pub fn exec_with_cancellation<Input, F>(
        &self,
        input: Input,
        from: usize,
        must_advance: bool,
        mut cancel: F,
    ) -> MatchResult
    where
        Input: InputIndexer,
        F: FnMut() -> bool,
    {
        self.inner
            .exec(input, from, must_advance, self.inner.exec_mode(), &mut cancel)
    }

    /// Searches `text` to find the first match.
    #[inline]
    pub fn find(&self, text: &str) -> Option<Match> {
        self.find_iter(text).next()
    }

    /// Searches `text`, returning an iterator over non-overlapping matches.
    /// Note that the resulting Iterator borrows both the regex `'r` and the
    /// input string as `'t`.
    #[inline]
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> Matches<'r, 't> {
        self.find_from(text, 0)
    }

    /// Returns an iterator for matches found in 'text' starting at byte index
    /// `start`. Note this may be different from passing a sliced `text` in
    /// the case of lookbehind assertions.
    /// Example:
    ///
    ///  ```rust
    ///   use lazyre::Regex;
    ///   let text = "xyxy";
    ///   let re = Regex::new(r"(?<=x)y").unwrap();
    ///   let t1 = re.find(&text[1..]).unwrap().range();
    ///   assert!(t1 == (2..3));
    ///   let t2 = re.find_from(text, 1).next().unwrap().range();
    ///   assert!(t2 == (1..2));
    ///   ```
    #[inline]
    pub fn find_from<'r, 't>(&'r self, text: &'t str, start: usize) -> Matches<'r, 't> {
        self.matches(Utf8Input::new(text), start)
    }

    /// \return whether `text` contains a match, without tracking positions.
    pub fn is_match(&self, text: &str) -> bool {
        self.inner
            .exec(
                Utf8Input::new(text),
                0,
                self.inner.options.must_advance,
                ExecMode::BooleanMatch,
                &mut || false,
            )
            .is_match()
    }

    /// Returns an iterator for matches found in Latin-1 `text` starting at
    /// index `start`. Each byte is one code point.
    pub fn find_from_latin1<'r, 't>(
        &'r self,
        text: &'t [u8],
        start: usize,
    ) -> exec::Matches<DfaExecutor<'r, Latin1Input<'t>>> {
        self.matches(Latin1Input::new(text), start)
    }

    /// Returns an iterator for matches found in 'text' starting at index `start`.
    #[cfg(feature = "utf16")]
    pub fn find_from_utf16<'r, 't>(
        &'r self,
        text: &'t [u16],
        start: usize,
    ) -> exec::Matches<DfaExecutor<'r, Utf16Input<'t>>> {
        self.matches(Utf16Input::new(text), start)
    }

    /// Returns an iterator for matches found in 'text' starting at index `start`.
    /// Surrogates are not paired.
    #[cfg(feature = "utf16")]
    pub fn find_from_ucs2<'r, 't>(
        &'r self,
        text: &'t [u16],
        start: usize,
    ) -> exec::Matches<DfaExecutor<'r, Ucs2Input<'t>>> {
        self.matches(Ucs2Input::new(text), start)
    }

    /// Returns an iterator for matches found in UTF-32 `text` starting at
    /// index `start`.
    pub fn find_from_utf32<'r, 't>(
        &'r self,
        text: &'t [u32],
        start: usize,
    ) -> exec::Matches<DfaExecutor<'r, Utf32Input<'t>>> {
        self.matches(Utf32Input::new(text), start)
    }

    fn matches<Input: InputIndexer>(&self, input: Input, start: usize) -> exec::Matches<DfaExecutor<'_, Input>> {
        exec::Matches::new(DfaExecutor::new(&self.inner, input), start)
    }

    /// \return the number of capture groups, not counting the whole match.
    pub fn group_count(&self) -> usize {
        self.inner.group_count() as usize
    }

    /// \return the mode [`Regex::exec`] runs in.
    pub fn exec_mode(&self) -> ExecMode {
        self.inner.exec_mode()
    }

    pub fn flags(&self) -> Flags {
        self.inner.flags
    }

    pub fn options(&self) -> &Options {
        &self.inner.options
    }

    /// \return a dump of the DFA states constructed so far.
    pub fn dump_dfa(&self) -> String {
        self.inner.dfa.to_string()
    }
}

impl FromStr for Regex {
    type Err = Error;

    /// Attempts to parse a string into a regular expression
    #[inline]
    fn from_str(s: &str) -> Result<Self, Error> {
        Self::new(s)
    }
}

/// Check that `pattern` compiles, constructing the complete DFA, and discard
/// the result.
pub fn validate<F: Into<Flags>>(pattern: &str, flags: F, options: Options) -> Result<(), Error> {
    let options = Options {
        validate: true,
        ..options
    };
    Compiled::new(pattern.chars().map(u32::from), flags.into(), options).map(|_| ())
}

// Access to the individual compilation phases, for the tool and tests.
#[doc(hidden)]
pub mod backends {
    use super::{Match, Regex};
    use crate::automata::nfa_backend;
    use crate::indexing::InputIndexer;
    pub use crate::automata::dfa::Dfa;
    pub use crate::automata::nfa::Nfa;
    pub use crate::parse::try_parse;

    /// Find the first match at or after `start` with the NFA simulation,
    /// bypassing the DFA.
    pub fn find_nfa<Input: InputIndexer>(re: &Regex, input: Input, start: usize) -> Option<Match> {
        nfa_backend::execute_nfa(re.inner.dfa.nfa(), input, start).map(|slots| re.inner.to_match(&slots))
    }
}
