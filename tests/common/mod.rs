#![allow(clippy::uninlined_format_args)]

use lazyre::Options;

/// Test that \p pattern fails to parse with default flags.
pub fn test_parse_fails(pattern: &str) {
    let res = lazyre::Regex::new(pattern);
    assert!(res.is_err(), "Pattern should not have parsed: {}", pattern);
}

/// Test that \p pattern fails to parse with flags.
pub fn test_parse_fails_flags(pattern: &str, flags: &str) {
    let res = lazyre::Regex::with_flags(pattern, flags);
    assert!(res.is_err(), "Pattern should not have parsed: {}", pattern);
}

/// Test that \p pattern parses but is rejected by the automaton compiler.
#[track_caller]
pub fn test_unsupported(pattern: &str, flags: &str, options: Options) {
    match lazyre::Regex::with_options(pattern, flags, options) {
        Err(err) => assert!(
            err.is_unsupported(),
            "Pattern {} should be unsupported, got: {}",
            pattern,
            err
        ),
        Ok(_) => panic!("Pattern should not have compiled: {}", pattern),
    }
}

/// Format a Match by inserting commas between all capture groups.
fn format_match(r: &lazyre::Match, input: &str) -> String {
    let mut result = input[r.range()].to_string();
    for cg in r.captures.iter() {
        result.push(',');
        if let Some(cg) = cg {
            result.push_str(&input[cg.clone()])
        }
    }
    result
}

/// Encode a string as UTF16.
pub fn to_utf16(input: &str) -> Vec<u16> {
    input.encode_utf16().collect()
}

/// Encode a string as UTF32.
pub fn to_utf32(input: &str) -> Vec<u32> {
    input.chars().map(u32::from).collect()
}

/// Given a range of a string encoded as UTF16, return the corresponding
/// range in the original string (UTF-8).
pub fn range_from_utf16(utf16: &[u16], r: lazyre::Range) -> lazyre::Range {
    use std::char::decode_utf16;
    // Figure out start.
    let start_utf8: usize = decode_utf16(utf16[0..r.start].iter().copied())
        .map(|r| r.expect("Invalid UTF16").len_utf8())
        .sum();
    let len_utf8: usize = decode_utf16(utf16[r].iter().copied())
        .map(|r| r.expect("Invalid UTF16").len_utf8())
        .sum();
    start_utf8..(start_utf8 + len_utf8)
}

/// Given a range of code point indexes into \p input, return the
/// corresponding byte range.
pub fn range_from_utf32(input: &str, r: lazyre::Range) -> lazyre::Range {
    let offset = |idx: usize| {
        input
            .char_indices()
            .map(|(pos, _)| pos)
            .chain(std::iter::once(input.len()))
            .nth(idx)
            .expect("Index out of range")
    };
    offset(r.start)..offset(r.end)
}

pub trait StringTestHelpers {
    /// "Fluent" style helper for testing that a String is equal to a str.
    fn test_eq(&self, s: &str);
}

impl StringTestHelpers for String {
    fn test_eq(&self, rhs: &str) {
        assert_eq!(self.as_str(), rhs)
    }
}

pub trait VecTestHelpers {
    /// "Fluent" style helper for testing that a Vec<&str> is equal to a
    /// Vec<&str>.
    fn test_eq(&self, rhs: Vec<&str>);
}

impl VecTestHelpers for Vec<&str> {
    fn test_eq(&self, rhs: Vec<&str>) {
        assert_eq!(*self, rhs)
    }
}

/// A compiled regex which remembers a TestConfig.
#[derive(Debug, Clone)]
pub struct TestCompiledRegex {
    pub re: lazyre::Regex,
    tc: TestConfig,
}

impl TestCompiledRegex {
    /// Search for self in \p input, returning a list of all matches.
    /// `start` is a byte offset into \p input.
    #[track_caller]
    pub fn matches(&'_ self, input: &'_ str, start: usize) -> Vec<lazyre::Match> {
        match self.tc.encoding {
            Encoding::Utf8 => self.re.find_from(input, start).collect(),
            #[cfg(feature = "utf16")]
            Encoding::Utf16 => self.match_utf16(input, start),
            #[cfg(feature = "utf16")]
            Encoding::Ucs2 => {
                // Don't test with UCS-2 if the input contains a surrogate pair,
                // as the tests expect these to pass. UCS-2 is tested separately
                // in other places.
                if input.chars().any(|c| c > '\u{FFFF}') {
                    return self.match_utf16(input, start);
                }
                self.match_ucs2(input, start)
            }
            #[cfg(not(feature = "utf16"))]
            Encoding::Utf16 | Encoding::Ucs2 => self.re.find_from(input, start).collect(),
            Encoding::Utf32 => self.match_utf32(input, start),
        }
    }

    /// Encode a string as UTF16, and match against it as UTF16.
    /// 'start' is given as the byte offset into the UTF8 string.
    #[cfg(feature = "utf16")]
    #[track_caller]
    pub fn match_utf16(&self, input: &str, start: usize) -> Vec<lazyre::Match> {
        // convert the input and start to UTF16.
        let u16_start = input[..start].chars().map(char::len_utf16).sum();
        let u16_input = to_utf16(input);
        let mut matches: Vec<_> = self.re.find_from_utf16(&u16_input, u16_start).collect();
        // Convert any ranges back to UTF8.
        for matc in matches.iter_mut() {
            matc.range = range_from_utf16(&u16_input, matc.range());
            for r in matc.captures.iter_mut().flatten() {
                *r = range_from_utf16(&u16_input, r.clone());
            }
        }
        matches
    }

    /// Encode a string as UTF16, and match against it as UCS2.
    #[cfg(feature = "utf16")]
    #[track_caller]
    pub fn match_ucs2(&self, input: &str, start: usize) -> Vec<lazyre::Match> {
        let u16_start = input[..start].chars().map(char::len_utf16).sum();
        let u16_input = to_utf16(input);
        let mut matches: Vec<_> = self.re.find_from_ucs2(&u16_input, u16_start).collect();
        // Convert any ranges back to UTF8.
        for matc in matches.iter_mut() {
            matc.range = range_from_utf16(&u16_input, matc.range());
            for r in matc.captures.iter_mut().flatten() {
                *r = range_from_utf16(&u16_input, r.clone());
            }
        }
        matches
    }

    /// Encode a string as UTF32, and match against it.
    #[track_caller]
    pub fn match_utf32(&self, input: &str, start: usize) -> Vec<lazyre::Match> {
        let u32_start = input[..start].chars().count();
        let u32_input = to_utf32(input);
        let mut matches: Vec<_> = self.re.find_from_utf32(&u32_input, u32_start).collect();
        for matc in matches.iter_mut() {
            matc.range = range_from_utf32(input, matc.range());
            for r in matc.captures.iter_mut().flatten() {
                *r = range_from_utf32(input, r.clone());
            }
        }
        matches
    }

    /// Search for self in \p input, returning the first Match, or None if
    /// none.
    pub fn find(&self, input: &str) -> Option<lazyre::Match> {
        self.matches(input, 0).into_iter().next()
    }

    /// Match against a string, returning the first formatted match.
    #[track_caller]
    pub fn match1f(&self, input: &str) -> String {
        match self.find(input) {
            Some(m) => format_match(&m, input),
            None => panic!("Failed to match {}", input),
        }
    }

    /// Match against a string, returning the string of the named capture group given.
    pub fn match1_named_group(&self, input: &str, group: &str) -> String {
        match self.find(input) {
            Some(m) => match m.named_group(group) {
                Some(r) => match input.get(r.clone()) {
                    Some(str) => str.to_string(),
                    None => panic!("Cannot get range from string input {:?}", r),
                },
                None => panic!("Named capture group does not exist {}", group),
            },
            None => panic!("Failed to match {}", input),
        }
    }

    /// Match against a string, returning the match as a Vec containing None
    /// for unmatched groups, or the matched strings.
    pub fn match1_vec<'b>(&self, input: &'b str) -> Vec<Option<&'b str>> {
        let mut result = Vec::new();
        let m: lazyre::Match = self.find(input).expect("Failed to match");
        result.push(Some(&input[m.range()]));
        for cr in m.captures {
            result.push(cr.map(|r| &input[r]));
        }
        result
    }

    /// Test that matching against \p input fails.
    #[track_caller]
    pub fn test_fails(&self, input: &str) {
        assert!(self.find(input).is_none(), "Should not have matched")
    }

    /// Test that matching against \p input succeeds.
    #[track_caller]
    pub fn test_succeeds(&self, input: &str) {
        assert!(self.find(input).is_some(), "Should have matched")
    }

    /// Return a list of all non-overlapping total match ranges from a given
    /// start.
    pub fn match_all_from(&'_ self, input: &'_ str, start: usize) -> Vec<lazyre::Range> {
        self.matches(input, start)
            .into_iter()
            .map(move |m| m.range())
            .collect()
    }

    /// Return a list of all non-overlapping matches.
    pub fn match_all<'b>(&self, input: &'b str) -> Vec<&'b str> {
        self.matches(input, 0)
            .into_iter()
            .map(move |m| &input[m.range()])
            .collect()
    }

    /// Collect all matches into a String, separated by commas.
    pub fn run_global_match(&self, input: &str) -> String {
        self.matches(input, 0)
            .into_iter()
            .map(move |m| format_match(&m, input))
            .collect::<Vec<String>>()
            .join(",")
    }
}

/// Our encoding types.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Encoding {
    Utf8,
    Utf16,
    Ucs2,
    Utf32,
}

/// How the DFA is constructed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Construction {
    /// Every state is built at compile time.
    Eager,
    /// States are built while matching.
    Lazy,
}

/// Description of how to test a regex.
#[derive(Debug, Copy, Clone)]
pub struct TestConfig {
    // Whether to optimize the NFA.
    optimize: bool,

    construction: Construction,

    // Which input encoding to match against.
    encoding: Encoding,
}

impl TestConfig {
    /// Apply this config's construction strategy to \p options.
    /// Every execution is also checked against the NFA simulation.
    pub fn options(&self, options: Options) -> Options {
        let mut options = Options {
            regression_test_mode: true,
            ..options
        };
        match self.construction {
            Construction::Eager => options.always_eager = true,
            Construction::Lazy => options.eager_nfa_threshold = 0,
        }
        options
    }

    /// Compile a pattern to a regex, with default flags.
    pub fn compile(&self, pattern: &str) -> TestCompiledRegex {
        self.compilef(pattern, "")
    }

    /// Compile a pattern to a regex, with given flags.
    #[track_caller]
    pub fn compilef(&self, pattern: &str, flags_str: &str) -> TestCompiledRegex {
        self.compileo(pattern, flags_str, Options::default())
    }

    /// Compile a pattern to a regex, with given flags and options.
    #[track_caller]
    pub fn compileo(&self, pattern: &str, flags_str: &str, options: Options) -> TestCompiledRegex {
        let mut flags = lazyre::Flags::from(flags_str);
        flags.no_opt = !self.optimize;

        let re = lazyre::Regex::with_options(pattern, flags, self.options(options));
        match re {
            Ok(re) => TestCompiledRegex { re, tc: *self },
            Err(err) => panic!(
                "Failed to compile! flags: {} pattern: {}, error: {}",
                flags_str, pattern, err
            ),
        }
    }

    /// Test that \p pattern and \p flags successfully parses, and matches
    /// \p input.
    #[track_caller]
    pub fn test_match_succeeds(&self, pattern: &str, flags_str: &str, input: &str) {
        let cr = self.compilef(pattern, flags_str);
        cr.test_succeeds(input)
    }

    /// Test that \p pattern and \p flags successfully parses, and does not
    /// match \p input.
    #[track_caller]
    pub fn test_match_fails(&self, pattern: &str, flags_str: &str, input: &str) {
        let cr = self.compilef(pattern, flags_str);
        cr.test_fails(input)
    }
}

/// Invoke \p F with each test config, in turn.
pub fn test_with_configs<F>(func: F)
where
    F: Fn(TestConfig),
{
    // Note we wish to be able to determine the TestConfig from the line number.
    for construction in [Construction::Eager, Construction::Lazy] {
        func(TestConfig {
            optimize: false,
            construction,
            encoding: Encoding::Utf8,
        });
        func(TestConfig {
            optimize: true,
            construction,
            encoding: Encoding::Utf8,
        });
        func(TestConfig {
            optimize: true,
            construction,
            encoding: Encoding::Utf32,
        });

        // UTF16 and UCS2.
        if cfg!(feature = "utf16") {
            func(TestConfig {
                optimize: true,
                construction,
                encoding: Encoding::Utf16,
            });
            func(TestConfig {
                optimize: true,
                construction,
                encoding: Encoding::Ucs2,
            });
        }
    }
}

/// Invoke `F` with UTF-8 configs only.
pub fn test_with_utf8_configs<F>(func: F)
where
    F: Fn(TestConfig),
{
    for construction in [Construction::Eager, Construction::Lazy] {
        func(TestConfig {
            optimize: true,
            construction,
            encoding: Encoding::Utf8,
        });
    }
}
