//! Property tests: the DFA agrees with the NFA simulation on random patterns,
//! and reported captures are consistent with the patterns that produced them.

use lazyre::backends;
use lazyre::{Options, Regex, Utf8Input};
use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};

/// A small random pattern over the alphabet `abc`.
#[derive(Debug, Clone)]
struct Pattern(String);

/// A random pattern without assertions or capture groups, whose matches do
/// not depend on their surroundings.
#[derive(Debug, Clone)]
struct Plain(String);

/// A small random input over the alphabet `abc` plus newline.
#[derive(Debug, Clone)]
struct Haystack(String);

const ATOMS: &[&str] = &["a", "b", "c", ".", "[ab]", "[^a]", "a|b"];
const ASSERTIONS: &[&str] = &["\\b", "\\B", "^", "$", "(?<=a)", "(?<!b)", "(?=c)", "(?!a)"];
const QUANTIFIERS: &[&str] = &["", "", "*", "+", "?", "*?", "+?", "??", "{1,2}", "{2}"];

fn pick<'a>(g: &mut Gen, choices: &[&'a str]) -> &'a str {
    g.choose(choices).copied().unwrap_or("")
}

fn gen_term(g: &mut Gen, depth: u32, plain: bool) -> String {
    let roll = u8::arbitrary(g) % 8;
    if roll == 0 && !plain {
        return pick(g, ASSERTIONS).to_string();
    }
    let atom = if depth > 0 && roll <= 2 {
        let open = if bool::arbitrary(g) && !plain { "(" } else { "(?:" };
        format!("{}{})", open, gen_alt(g, depth - 1, plain))
    } else {
        let atom = pick(g, ATOMS);
        if atom.contains('|') {
            format!("(?:{})", atom)
        } else {
            atom.to_string()
        }
    };
    format!("{}{}", atom, pick(g, QUANTIFIERS))
}

fn gen_seq(g: &mut Gen, depth: u32, plain: bool) -> String {
    let len = 1 + usize::arbitrary(g) % 3;
    (0..len).map(|_| gen_term(g, depth, plain)).collect()
}

fn gen_alt(g: &mut Gen, depth: u32, plain: bool) -> String {
    let branches = 1 + usize::arbitrary(g) % 2;
    (0..branches)
        .map(|_| gen_seq(g, depth, plain))
        .collect::<Vec<_>>()
        .join("|")
}

impl Arbitrary for Pattern {
    fn arbitrary(g: &mut Gen) -> Self {
        Pattern(gen_alt(g, 2, false))
    }
}

impl Arbitrary for Plain {
    fn arbitrary(g: &mut Gen) -> Self {
        Plain(gen_alt(g, 2, true))
    }
}

impl Arbitrary for Haystack {
    fn arbitrary(g: &mut Gen) -> Self {
        let len = usize::arbitrary(g) % 12;
        Haystack(
            (0..len)
                .map(|_| *g.choose(&['a', 'b', 'c', '\n']).unwrap_or(&'a'))
                .collect(),
        )
    }
}

fn compile(pattern: &str, options: Options) -> Option<Regex> {
    match Regex::with_options(pattern, "", options) {
        Ok(re) => Some(re),
        Err(err) => {
            // Random patterns may exceed the automaton limits; anything else is a bug.
            assert!(err.is_unsupported(), "{}: {}", pattern, err);
            None
        }
    }
}

fn strategies() -> Vec<Options> {
    vec![
        Options {
            always_eager: true,
            ..Options::default()
        },
        Options {
            eager_nfa_threshold: 0,
            ..Options::default()
        },
        Options {
            eager_nfa_threshold: 0,
            max_dfa_states: 40,
            ..Options::default()
        },
    ]
}

fn dfa_matches_nfa(pattern: Pattern, haystack: Haystack) -> TestResult {
    let text = haystack.0.as_str();
    let mut tested = false;
    for options in strategies() {
        let re = match compile(&pattern.0, options) {
            Some(re) => re,
            None => continue,
        };
        tested = true;
        for start in 0..=text.len() {
            let dfa = re.find_from(text, start).next();
            let nfa = backends::find_nfa(&re, Utf8Input::new(text), start);
            if dfa != nfa {
                return TestResult::error(format!(
                    "{:?} on {:?} from {}: DFA {:?}, NFA {:?}",
                    pattern.0, text, start, dfa, nfa
                ));
            }
        }
    }
    if tested {
        TestResult::passed()
    } else {
        TestResult::discard()
    }
}

fn boolean_mode_agrees(pattern: Pattern, haystack: Haystack) -> TestResult {
    let re = match compile(&pattern.0, Options::default()) {
        Some(re) => re,
        None => return TestResult::discard(),
    };
    TestResult::from_bool(re.is_match(&haystack.0) == re.find(&haystack.0).is_some())
}

fn repeated_search_is_deterministic(pattern: Pattern, haystack: Haystack) -> TestResult {
    let options = Options {
        eager_nfa_threshold: 0,
        ..Options::default()
    };
    let re = match compile(&pattern.0, options) {
        Some(re) => re,
        None => return TestResult::discard(),
    };
    let first: Vec<_> = re.find_iter(&haystack.0).collect();
    let second: Vec<_> = re.clone().find_iter(&haystack.0).collect();
    TestResult::from_bool(first == second)
}

// A capture of `sub` in context must be a string that `sub` matches alone.
fn captures_round_trip(prefix: Pattern, sub: Plain, suffix: Pattern, haystack: Haystack) -> TestResult {
    let text = haystack.0.as_str();
    let pattern = format!("(?:{})(?<sub>{})(?:{})", prefix.0, sub.0, suffix.0);
    let re = match compile(&pattern, Options::default()) {
        Some(re) => re,
        None => return TestResult::discard(),
    };
    let captured = match re.find(text) {
        Some(m) => match m.named_group("sub") {
            Some(range) => range,
            None => return TestResult::error(format!("{:?} on {:?}: no capture", pattern, text)),
        },
        None => return TestResult::discard(),
    };
    let whole = match compile(&format!("^(?:{})$", sub.0), Options::default()) {
        Some(re) => re,
        None => return TestResult::discard(),
    };
    let piece = &text[captured.clone()];
    match whole.find(piece) {
        Some(m) if m.range() == (0..piece.len()) => TestResult::passed(),
        found => TestResult::error(format!(
            "{:?} on {:?} captured {:?}, which {:?} matches as {:?}",
            pattern,
            text,
            captured,
            sub.0,
            found.map(|m| m.range())
        )),
    }
}

#[test]
fn qc_dfa_matches_nfa() {
    QuickCheck::new()
        .tests(500)
        .quickcheck(dfa_matches_nfa as fn(Pattern, Haystack) -> TestResult);
}

#[test]
fn qc_boolean_mode_agrees() {
    QuickCheck::new()
        .tests(300)
        .quickcheck(boolean_mode_agrees as fn(Pattern, Haystack) -> TestResult);
}

#[test]
fn qc_repeated_search_is_deterministic() {
    QuickCheck::new()
        .tests(200)
        .quickcheck(repeated_search_is_deterministic as fn(Pattern, Haystack) -> TestResult);
}

#[test]
fn qc_captures_round_trip() {
    QuickCheck::new()
        .tests(300)
        .quickcheck(captures_round_trip as fn(Pattern, Plain, Pattern, Haystack) -> TestResult);
}
