// Work around dead code warnings: rust-lang issue #46379
pub mod common;

// Work around dead code warnings: rust-lang issue #46379
use common::*;
use lazyre::{ExecMode, MatchResult, Options, Regex, Utf8Input};

fn test_zero_length_matches_tc(tc: TestConfig) {
    tc.compile(".*?").match_all("a").test_eq(vec!["", ""]);
    tc.compile(".*?")
        .match_all("\u{0251}")
        .test_eq(vec!["", ""]);
    assert_eq!(
        tc.compile("").match_all_from("abc", 0),
        vec![0..0, 1..1, 2..2, 3..3]
    );
    assert_eq!(tc.compile("").match_all_from("abc", 2), vec![2..2, 3..3]);
}

#[test]
fn test_zero_length_matches() {
    test_with_configs(test_zero_length_matches_tc)
}

fn scenarios_tc(tc: TestConfig) {
    assert_eq!(tc.compile("a+b").match_all_from("caaab", 0), vec![1..5]);
    assert_eq!(tc.compile("(a)(b)?").match1_vec("a"), vec![Some("a"), Some("a"), None]);
    tc.compile("^abc$").test_fails("xabcx");
    assert_eq!(tc.compile("a{2,4}").match_all_from("aaaaa", 0), vec![0..4]);
}

#[test]
fn scenarios() {
    test_with_configs(scenarios_tc)
}

fn non_matching_captures_tc(tc: TestConfig) {
    assert_eq!(
        tc.compile("aa(b)?aa").match1_vec("aaaa"),
        &[Some("aaaa"), None]
    );
    assert_eq!(tc.compilef("(x)?y", "").match1_vec("y"), vec![Some("y"), None]);
    assert_eq!(
        tc.compilef(r";'()([/,-6,/])()]", "").match1_vec(";'/]"),
        vec![Some(";'/]"), Some(""), Some("/"), Some("")]
    );
}

#[test]
fn non_matching_captures() {
    test_with_configs(non_matching_captures_tc)
}

fn test_multiline_tc(tc: TestConfig) {
    tc.compilef(r"^abc", "").match1f("abc").test_eq("abc");
    tc.compile(r"^def").test_fails("abc\ndef");
    tc.compilef(r"^def", "m").match1f("abc\ndef").test_eq("def");
    tc.compilef(r"^def", "m")
        .match1f("abc\n\rdef")
        .test_eq("def");

    tc.compile(r"(a*)^(a*)$").test_fails("aa\raaa");
    tc.compilef(r"(a*)^(a*)$", "m")
        .match1f("aa\raaa")
        .test_eq("aa,,aa");
    tc.compilef(r"[ab]$", "").match1f("a\rb").test_eq("b");
    tc.compilef(r"[ab]$", "m").match1f("a\rb").test_eq("a");

    tc.compilef(r"^\d", "m")
        .match_all("aaa\n789\r\nccc\r\n345")
        .test_eq(vec!["7", "3"]);
    tc.compilef(r"\d$", "m")
        .match_all("aaa789\n789\r\nccc10\r\n345")
        .test_eq(vec!["9", "9", "0", "5"]);
}

#[test]
fn test_multiline() {
    test_with_configs(test_multiline_tc)
}

fn test_dotall_tc(tc: TestConfig) {
    tc.compile(r".").test_fails("\n");
    tc.compilef(r".", "s").match1f("\n").test_eq("\n");

    tc.compile(r".").test_fails("\r");
    tc.compilef(r".", "s").match1f("\r").test_eq("\r");

    tc.compile(r".").test_fails("\u{2028}");
    tc.compilef(r".", "s")
        .match1f("\u{2028}")
        .test_eq("\u{2028}");

    tc.compile("abc.def").test_fails("abc\ndef");
    tc.compilef("abc.def", "s")
        .match1f("abc\ndef")
        .test_eq("abc\ndef");

    tc.compile(".*").match1f("abc\ndef").test_eq("abc");
    tc.compilef(".*", "s")
        .match1f("abc\ndef")
        .test_eq("abc\ndef");
}

#[test]
fn test_dotall() {
    test_with_configs(test_dotall_tc)
}

fn test_lookarounds_tc(tc: TestConfig) {
    tc.compilef(r"(?<![a-z])..", "")
        .match1f("abcdefghijk123456")
        .test_eq("ab");
    tc.compilef(r"(?<![a-z])\d{2}", "")
        .match1f("abcdefghijk123456")
        .test_eq("23");
    tc.compilef(r"(?<=[a-z])\d", "")
        .match1f("12a34")
        .test_eq("3");
    tc.compilef(r"(?<=x)y", "")
        .match_all_from("xyxy", 1)
        .into_iter()
        .map(|r| format!("{}..{}", r.start, r.end))
        .collect::<Vec<_>>()
        .join(",")
        .test_eq("1..2,3..4");

    tc.compilef(r"[a-z]+(?!\d)", "")
        .match1f("abc1 def")
        .test_eq("ab");
    tc.compilef(r"\w+(?=,)", "")
        .run_global_match("one,two,three")
        .test_eq("one,two");
    tc.compilef(r"a(?=b)", "")
        .match_all_from("acab", 0)
        .into_iter()
        .map(|r| format!("{}..{}", r.start, r.end))
        .collect::<Vec<_>>()
        .join(",")
        .test_eq("2..3");
    tc.test_match_fails(r"a(?!b)", "", "abab");

    // Lookbehinds wider than one code point.
    let ranges = |pattern: &str, input: &str, start: usize| {
        tc.compilef(pattern, "")
            .match_all_from(input, start)
            .into_iter()
            .map(|r| format!("{}..{}", r.start, r.end))
            .collect::<Vec<_>>()
            .join(",")
    };
    ranges(r"(?<=ab)c", "abc xbc abcabc", 0).test_eq("2..3,10..11,13..14");
    ranges(r"(?<=ab)c", "abc", 2).test_eq("2..3");
    ranges(r"(?<=ba*)c", "cbaaac bc", 0).test_eq("5..6,8..9");
    ranges(r"(?<=a|bc)d", "d ad bcd cd", 0).test_eq("3..4,7..8");
    ranges(r"(?<!ab)c", "abc bc c", 0).test_eq("5..6,7..8");
    tc.compilef(r"(?<=\d{2}-)\w+", "")
        .match1f("a-b 1-c 12-de")
        .test_eq("de");

    // Only the last code point of a variable body matters here.
    tc.compilef(r"(?<=a*b)c", "").match1f("bc").test_eq("c");
    tc.test_match_fails(r"(?<=a*b)c", "", "ac");
}

#[test]
fn test_lookarounds() {
    test_with_configs(test_lookarounds_tc)
}

fn test_word_boundaries_tc(tc: TestConfig) {
    tc.test_match_succeeds(r"\bfoo\b", "", "a foo b");
    tc.test_match_fails(r"\bfoo\b", "", "afoo");
    tc.test_match_fails(r"\bfoo\b", "", "foo_");
    tc.compile(r"\B\w").match1f("ab").test_eq("b");
    tc.compile(r"\b\w+\b")
        .match_all("hello, big world")
        .test_eq(vec!["hello", "big", "world"]);
}

#[test]
fn test_word_boundaries() {
    test_with_configs(test_word_boundaries_tc)
}

fn test_priority_tc(tc: TestConfig) {
    assert_eq!(
        tc.compile(r"(a|ab)(c|bcd)(d*)").match1_vec("abcd"),
        vec![Some("abcd"), Some("a"), Some("bcd"), Some("")]
    );
    tc.compile("a+?").match1f("aaa").test_eq("a");
    tc.compile("<.+?>").match1f("<a><b>").test_eq("<a>");
    tc.compile("<.+>").match1f("<a><b>").test_eq("<a><b>");
    tc.compile("(a*?)(a*)").match1f("aaa").test_eq("aaa,,aaa");
    tc.compile("x*y|x").match1f("xxx").test_eq("x");
    assert_eq!(
        tc.compilef("^(b+|a){1,2}?bc", "").match1_vec("bbc"),
        vec![Some("bbc"), Some("b")]
    );
}

#[test]
fn test_priority() {
    test_with_configs(test_priority_tc)
}

fn test_loop_captures_tc(tc: TestConfig) {
    tc.compile("(a|b)*").match1f("ab").test_eq("ab,b");
    assert_eq!(tc.compile("(?:(a)|b)+").match1_vec("ab"), vec![Some("ab"), None]);
    tc.compilef(r"((a)|(b))*?c", "")
        .match1f("abc")
        .test_eq("abc,b,,b");
    tc.compile(r"(\d{2})+").match1f("123456").test_eq("123456,56");
    tc.compile(r"(?:(\w)\s?){2,3}")
        .match1f("a b c d")
        .test_eq("a b c ,c");
}

#[test]
fn test_loop_captures() {
    test_with_configs(test_loop_captures_tc)
}

fn test_counted_repetition_tc(tc: TestConfig) {
    tc.compile(r"x{2}").match_all("xxxxx").test_eq(vec!["xx", "xx"]);
    tc.compile(r"\d{3,}").match_all("1 12 123 1234").test_eq(vec!["123", "1234"]);
    tc.compile(r"a{0}b").match1f("ab").test_eq("b");
    tc.compile(r"(ab){1,2}?c").match1f("ababc").test_eq("ababc,ab");
    tc.compile(r"a{2,3}?").match_all("aaaaa").test_eq(vec!["aa", "aa"]);
}

#[test]
fn test_counted_repetition() {
    test_with_configs(test_counted_repetition_tc)
}

fn test_case_insensitive_tc(tc: TestConfig) {
    tc.compilef("abc", "i").match1f("xABC").test_eq("ABC");
    tc.compilef("[a-c]+", "i").match1f("xAbCd").test_eq("AbC");
    tc.compilef("\u{00B5}", "i").test_succeeds("\u{03BC}");
    tc.compilef("\u{03BC}", "i").test_succeeds("\u{039C}");
    tc.test_match_fails("abc", "", "ABC");
}

#[test]
fn test_case_insensitive() {
    test_with_configs(test_case_insensitive_tc)
}

fn test_named_groups_tc(tc: TestConfig) {
    let cr = tc.compile(r"(?<first>\w+)\s(?<last>\w+)");
    cr.match1_named_group("John Smith", "first").test_eq("John");
    cr.match1_named_group("John Smith", "last").test_eq("Smith");

    let m = cr.find("Ada Lovelace").expect("Should have matched");
    let names: Vec<_> = m.named_groups().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["first", "last"]);
}

#[test]
fn test_named_groups() {
    test_with_configs(test_named_groups_tc)
}

fn test_unicode_input_tc(tc: TestConfig) {
    tc.compile("^.$").test_succeeds("\u{1F600}");
    tc.compilef(r"\u{1F600}+", "u")
        .match1f("x\u{1F600}\u{1F600}y")
        .test_eq("\u{1F600}\u{1F600}");
    tc.compile("é+").match_all("caféé née").test_eq(vec!["éé", "é"]);
    tc.compile("[^a]").match1f("a\u{10000}").test_eq("\u{10000}");
}

#[test]
fn test_unicode_input() {
    test_with_configs(test_unicode_input_tc)
}

fn test_sticky_tc(tc: TestConfig) {
    let cr = tc.compilef("a", "y");
    cr.test_fails("ba");
    assert_eq!(cr.match_all_from("ba", 1), vec![1..2]);
    assert_eq!(cr.match_all_from("aab", 0), vec![0..1, 1..2]);
}

#[test]
fn test_sticky() {
    test_with_configs(test_sticky_tc)
}

#[test]
fn test_must_advance() {
    let re = Regex::new("").unwrap();
    match re.exec(Utf8Input::new("ab"), 0, true) {
        MatchResult::Captured(m) => assert_eq!(m.range(), 1..1),
        other => panic!("Unexpected result {:?}", other),
    }
    assert_eq!(re.exec(Utf8Input::new("ab"), 2, true), MatchResult::NoMatch);
    assert_eq!(re.exec(Utf8Input::new("ab"), 3, false), MatchResult::NoMatch);

    // The lookbehind context is the skipped code point.
    let re = Regex::new(r"(?<=a)").unwrap();
    match re.exec(Utf8Input::new("ab"), 0, true) {
        MatchResult::Captured(m) => assert_eq!(m.range(), 1..1),
        other => panic!("Unexpected result {:?}", other),
    }

    let options = Options {
        must_advance: true,
        ..Options::default()
    };
    let re = Regex::with_options("", "", options).unwrap();
    let ranges: Vec<_> = re.find_iter("ab").map(|m| m.range()).collect();
    assert_eq!(ranges, vec![1..1, 2..2]);
}

#[test]
#[should_panic(expected = "not at a code point boundary")]
fn test_exec_inside_code_point() {
    let re = Regex::new("x").unwrap();
    let _ = re.exec(Utf8Input::new("\u{e9}x"), 1, false);
}

#[test]
fn test_boolean_match() {
    let options = Options {
        boolean_match: true,
        ..Options::default()
    };
    let re = Regex::with_options(r"(a+)(b)", "", options).unwrap();
    assert_eq!(re.exec_mode(), ExecMode::BooleanMatch);
    assert_eq!(re.exec(Utf8Input::new("xaab"), 0, false), MatchResult::Matched);
    assert_eq!(re.exec(Utf8Input::new("xaa"), 0, false), MatchResult::NoMatch);

    // The iterator conveniences still report positions.
    assert_eq!(re.find("xaab").map(|m| m.range()), Some(1..4));
    assert!(re.is_match("ab"));
    assert!(!re.is_match("ba"));
}

#[test]
fn test_exec_modes() {
    assert_eq!(
        Regex::new("abc").unwrap().exec_mode(),
        ExecMode::SimpleCaptureGroups
    );
    assert_eq!(
        Regex::new("(a|ab)(c|bcd)").unwrap().exec_mode(),
        ExecMode::GenericCaptureGroups
    );
}

#[test]
fn test_cancellation() {
    let re = Regex::new("a+b").unwrap();
    let mut polls = 0;
    let result = re.exec_with_cancellation(Utf8Input::new("xaaab"), 0, false, || {
        polls += 1;
        true
    });
    assert_eq!(result, MatchResult::NoMatch);
    assert_eq!(polls, 1);

    let result = re.exec_with_cancellation(Utf8Input::new("xaaab"), 0, false, || false);
    assert!(result.is_match());
}

#[test]
fn test_group_offsets() {
    let re = Regex::new("(a)|(b)").unwrap();
    let m = re.find("xb").unwrap();
    assert_eq!(m.group_offsets(), vec![(1, 2), (-1, -1), (1, 2)]);
    assert_eq!(re.group_count(), 2);
}

#[test]
fn test_other_encodings() {
    let re = Regex::new("\u{00E9}+").unwrap();
    let m = re.find_from_latin1(b"caf\xE9\xE9!", 0).next().unwrap();
    assert_eq!(m.range(), 3..5);

    let text: Vec<u32> = "x\u{1F600}\u{E9}".chars().map(u32::from).collect();
    let m = re.find_from_utf32(&text, 0).next().unwrap();
    assert_eq!(m.range(), 2..3);

    // Unpaired surrogates in UCS-2 are matched individually.
    #[cfg(feature = "utf16")]
    {
        let re = Regex::new(r"[\uD800-\uDBFF]").unwrap();
        let m = re.find_from_ucs2(&[0x61, 0xD83D, 0xDE00], 0).next().unwrap();
        assert_eq!(m.range(), 1..2);
        assert!(re.find_from_utf16(&[0x61, 0xD83D, 0xDE00], 0).next().is_none());
    }
}

#[test]
fn test_state_limit() {
    let err = Regex::new("(a|b)*a(a|b){12}").unwrap_err();
    assert!(err.is_unsupported());
    assert_eq!(err.text(), "DFA state limit exceeded");

    // The limit applies at compile time even when tables are built lazily.
    let options = Options {
        eager_nfa_threshold: 0,
        ..Options::default()
    };
    let err = Regex::with_options("(a|b)*a(a|b){80}", "", options).unwrap_err();
    assert_eq!(err.text(), "DFA state limit exceeded");
}

#[test]
fn test_lazy_cache_limit() {
    let options = |max_dfa_states| Options {
        eager_nfa_threshold: 0,
        max_dfa_states,
        regression_test_mode: true,
        ..Options::default()
    };
    assert!(Regex::with_options("(a|b)*a(a|b){3}", "", options(4))
        .unwrap_err()
        .is_unsupported());

    let re = Regex::with_options("(a|b)*a(a|b){3}", "", options(1000)).unwrap();
    let text = "bbbabbb";
    let m = re.find(text).unwrap();
    assert_eq!(m.range(), 0..7);
    assert_eq!(m.group(1), Some(2..3));
    assert_eq!(m.group(2), Some(6..7));
    assert!(re.find("bbbbbbb").is_none());
}

#[test]
fn test_determinism() {
    let options = Options {
        eager_nfa_threshold: 0,
        ..Options::default()
    };
    let re = Regex::with_options(r"(\w+)@(\w+)\.com", "", options).unwrap();
    let text = "mail alice@example.com or bob@test.com";
    let first: Vec<_> = re.find_iter(text).collect();
    for _ in 0..10 {
        let again: Vec<_> = re.find_iter(text).collect();
        assert_eq!(first, again);
    }
    assert_eq!(first.len(), 2);
    assert_eq!(first[1].group(1), Some(26..29));
}

#[test]
fn test_concurrent_matching() {
    let _ = env_logger::builder().is_test(true).try_init();
    let options = Options {
        eager_nfa_threshold: 0,
        ..Options::default()
    };
    let re = Regex::with_options(r"([a-z]+)(\d+)", "", options).unwrap();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let re = re.clone();
            std::thread::spawn(move || {
                let text = format!("{} abc{} xyz{}", "-".repeat(i), i, i * 7);
                re.find_iter(&text)
                    .map(|m| text[m.group(1).unwrap()].to_string())
                    .collect::<Vec<_>>()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), vec!["abc", "xyz"]);
    }
}

#[test]
fn test_dump_dfa() {
    let re = Regex::new("ab").unwrap();
    re.find("xxab");
    let dump = re.dump_dfa();
    assert!(dump.starts_with("DFA("), "{}", dump);
    assert!(dump.contains("eager"));
}

#[test]
fn test_validate() {
    assert!(lazyre::validate("a+b", "", Options::default()).is_ok());
    assert!(lazyre::validate("(", "", Options::default())
        .unwrap_err()
        .is_syntax());
    let limited = Options {
        max_dfa_states: 8,
        ..Options::default()
    };
    assert!(lazyre::validate("(a|b)*a(a|b){4}", "", limited)
        .unwrap_err()
        .is_unsupported());
}
