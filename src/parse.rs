//! Parser from regex patterns to the AST

use crate::api;
use crate::ast::{self, AnchorKind, CaptureGroupID, Node, Quantifier};
use crate::charclasses;
use crate::codepointset::{CodePointSet, Interval, CODE_POINT_MAX};
use crate::error::Error;
use crate::flavor::{self, Dialect, DollarKind, IdentityEscapes};
use crate::folds::CaseFoldTable;
use crate::options::{Flavor, Options};
use crate::util::to_char_sat;
use std::iter::Peekable;
use std::sync::Arc;

/// Maximum number of capture groups, not counting the whole match.
pub const MAX_CAPTURE_GROUPS: usize = 65534;

/// Placeholder for a named backreference whose group is not yet known.
const UNRESOLVED_BACKREF: CaptureGroupID = CaptureGroupID::MAX;

enum ClassAtom {
    CodePoint(u32),
    CharacterClass(CodePointSet),
}

fn make_cat(mut nodes: Vec<Node>) -> Node {
    match nodes.len() {
        1 => nodes.pop().unwrap_or_else(Node::empty),
        _ => Node::Sequence(nodes),
    }
}

fn make_alt(mut nodes: Vec<Node>) -> Node {
    match nodes.len() {
        0 => Node::empty(),
        1 => nodes.pop().unwrap_or_else(Node::empty),
        _ => Node::Alternation(nodes),
    }
}

fn is_syntax_char(c: char) -> bool {
    matches!(
        c,
        '^' | '$' | '\\' | '.' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '/'
    )
}

fn is_name_char(c: char, first: bool) -> bool {
    c == '_' || c == '$' || c.is_alphabetic() || (!first && c.is_alphanumeric())
}

/// Assign indices to named backreferences, in the order they were parsed.
fn resolve_backrefs(node: &mut Node, resolved: &mut std::vec::IntoIter<CaptureGroupID>) {
    match node {
        Node::BackReference(idx) if *idx == UNRESOLVED_BACKREF => {
            if let Some(group) = resolved.next() {
                *idx = group;
            }
        }
        Node::Sequence(nodes) | Node::Alternation(nodes) => {
            for n in nodes {
                resolve_backrefs(n, resolved);
            }
        }
        Node::Quantifier { child, .. } | Node::Group { child, .. } | Node::LookAround { child, .. } => {
            resolve_backrefs(child, resolved)
        }
        Node::CharacterClass(..) | Node::Anchor(..) | Node::BackReference(..) => {}
    }
}

/// Represents the state used to parse a regex.
struct Parser<'a, I>
where
    I: Iterator<Item = u32> + Clone,
{
    /// The remaining input.
    input: Peekable<I>,

    /// Number of code points consumed so far.
    offset: usize,

    /// Flags in effect. Inline flag groups modify these.
    flags: api::Flags,

    /// Syntax table of the flavor.
    dialect: &'static Dialect,

    options: &'a Options,

    /// Case folding for case-insensitive literals.
    folds: Arc<CaseFoldTable>,

    /// Every code point of the input encoding.
    space: CodePointSet,

    /// ECMAScript with the unicode flag, which forbids the legacy syntax.
    strict: bool,

    /// Number of capturing groups.
    group_count: CaptureGroupID,

    /// Name of each group, empty if unnamed.
    group_names: Vec<Box<str>>,

    /// Numbered backreferences and the offsets at which they appear.
    numbered_backrefs: Vec<(usize, usize)>,

    /// Named backreferences whose group is resolved at the end.
    named_backrefs: Vec<(String, usize)>,

    /// Nesting depth of lookaround assertions.
    lookaround_depth: usize,

    /// Whether a global inline flag group may still appear.
    global_flags_allowed: bool,
}

impl<'a, I> Parser<'a, I>
where
    I: Iterator<Item = u32> + Clone,
{
    fn error<T, S: ToString>(&self, text: S) -> Result<T, Error> {
        Err(Error::syntax(self.offset, text))
    }

    /// Consume a character, returning it.
    fn consume(&mut self, c: char) -> u32 {
        let nc = self.next();
        debug_assert!(nc == Some(c as u32), "char was not next");
        c as u32
    }

    /// If our contents begin with the char c, consume it from our contents
    /// and return true. Otherwise return false.
    fn try_consume(&mut self, c: char) -> bool {
        if self.input.peek() == Some(&(c as u32)) {
            self.next();
            true
        } else {
            false
        }
    }

    /// If our contents begin with the string \p s, consume it from our contents
    /// and return true. Otherwise return false.
    fn try_consume_str(&mut self, s: &str) -> bool {
        let mut cursor = self.input.clone();
        let mut count = 0;
        for c1 in s.chars() {
            if cursor.next() != Some(c1 as u32) {
                return false;
            }
            count += 1;
        }
        self.input = cursor;
        self.offset += count;
        true
    }

    /// Peek at the next character.
    fn peek(&mut self) -> Option<char> {
        self.input.peek().copied().map(to_char_sat)
    }

    /// \return the next code point.
    fn next(&mut self) -> Option<u32> {
        let res = self.input.next();
        if res.is_some() {
            self.offset += 1;
        }
        res
    }

    /// \return the next character.
    fn next_char(&mut self) -> Option<char> {
        self.next().map(to_char_sat)
    }

    fn mark(&self) -> (Peekable<I>, usize) {
        (self.input.clone(), self.offset)
    }

    fn reset(&mut self, mark: (Peekable<I>, usize)) {
        self.input = mark.0;
        self.offset = mark.1;
    }

    /// Skip whitespace and comments in verbose mode.
    fn skip_ignored(&mut self) {
        if !(self.flags.extended && self.dialect.verbose_flag) {
            return;
        }
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.next();
                }
                Some('#') => {
                    while let Some(c) = self.next_char() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn try_parse(&mut self) -> Result<ast::Regex, Error> {
        // Parse a disjunction. If we consume everything, it's success. If there's
        // something left, it's an error (for example, an excess closing paren).
        let body = self.consume_disjunction()?;
        match self.peek() {
            Some(')') => self.error("Unbalanced parenthesis"),
            Some(c) => self.error(format!("Unexpected char: {}", c)),
            None => self.finalize(body),
        }
    }

    /// ES6 21.2.2.3 Disjunction.
    fn consume_disjunction(&mut self) -> Result<Node, Error> {
        let mut terms = vec![self.consume_term()?];
        while self.try_consume('|') {
            self.global_flags_allowed = false;
            terms.push(self.consume_term()?)
        }
        Ok(make_alt(terms))
    }

    /// ES6 21.2.2.5 Term.
    fn consume_term(&mut self) -> Result<Node, Error> {
        let mut result: Vec<Node> = Vec::new();
        loop {
            self.skip_ignored();
            let start_group = self.group_count;
            let start_offset = result.len();
            let mut quantifier_allowed = true;

            let c = match self.peek() {
                None => break,
                Some(c) => c,
            };
            match c {
                // A term is terminated by closing parens or vertical bar (alternations).
                ')' | '|' => break,
                '^' => {
                    self.consume('^');
                    let multiline = self.flags.multiline || self.dialect.dollar == DollarKind::Line;
                    result.push(Node::Anchor(if multiline {
                        AnchorKind::StartLine
                    } else {
                        AnchorKind::Start
                    }));
                    quantifier_allowed = false;
                }

                '$' => {
                    self.consume('$');
                    let kind = if self.flags.multiline {
                        AnchorKind::EndLine
                    } else {
                        match self.dialect.dollar {
                            DollarKind::End => AnchorKind::End,
                            DollarKind::EndOrFinalNewline => AnchorKind::EndOrFinalNewline,
                            DollarKind::Line => AnchorKind::EndLine,
                        }
                    };
                    result.push(Node::Anchor(kind));
                    quantifier_allowed = false;
                }

                '\\' => {
                    self.consume('\\');
                    let node = self.consume_atom_escape()?;
                    quantifier_allowed = !matches!(node, Node::Anchor(..));
                    result.push(node);
                }

                '.' => {
                    self.consume('.');
                    result.push(self.dot());
                }

                '(' => {
                    self.consume('(');
                    match self.consume_group()? {
                        Some((node, quantifiable)) => {
                            quantifier_allowed = quantifiable;
                            result.push(node);
                        }
                        None => continue,
                    }
                }

                '[' => {
                    result.push(self.consume_bracket()?);
                }

                ']' | '}' if self.strict => {
                    return self.error("Lone quantifier brackets");
                }

                c => {
                    // It's an error if this parses successfully as a quantifier.
                    // Note this covers *, +, ? as well.
                    let saved = self.mark();
                    if let Ok(Some(_)) = self.try_consume_quantifier_prefix() {
                        self.reset(saved);
                        return self.error("Nothing to repeat");
                    }
                    self.reset(saved);
                    if c == '{' && self.strict {
                        return self.error("Lone quantifier brackets");
                    }
                    let cp = self.next().unwrap_or(c as u32);
                    result.push(self.literal(cp));
                }
            }
            self.global_flags_allowed = false;

            // We just parsed a term; try parsing quantifiers.
            loop {
                self.skip_ignored();
                let quant = match self.try_consume_quantifier()? {
                    Some(quant) => quant,
                    None => break,
                };
                if !quantifier_allowed {
                    return self.error("Nothing to repeat");
                }
                if let Some(max) = quant.max {
                    if quant.min > max {
                        return self.error("Invalid quantifier range");
                    }
                }
                let quantifee = result.split_off(start_offset);
                result.push(Node::Quantifier {
                    child: Box::new(make_cat(quantifee)),
                    quant,
                    enclosed_groups: (start_group + 1)..(self.group_count + 1),
                });
                if !self.dialect.nested_quantifiers {
                    break;
                }
            }
        }
        Ok(make_cat(result))
    }

    /// Parse the remainder of a group after its opening paren.
    /// \return the node and whether it may be quantified, or None if the
    /// group produced no node (comments and global flags).
    fn consume_group(&mut self) -> Result<Option<(Node, bool)>, Error> {
        let group_offset = self.offset - 1;
        let node;
        let mut quantifiable = true;
        if self.try_consume('?') {
            let c = match self.peek() {
                Some(c) => c,
                None => return self.error("Invalid group"),
            };
            match c {
                ':' => {
                    self.consume(':');
                    node = self.consume_scoped(None)?;
                }
                '=' | '!' => {
                    self.consume(c);
                    quantifiable = self.dialect.quantifiable_lookaround;
                    node = self.consume_lookaround_assertion(false, c == '!')?;
                }
                '<' if self.lookbehind_ahead() => {
                    self.consume('<');
                    let negate = self.peek() == Some('!');
                    self.next();
                    quantifiable = self.dialect.quantifiable_lookaround;
                    node = self.consume_lookaround_assertion(true, negate)?;
                }
                '<' if self.dialect.angle_named_groups => {
                    self.consume('<');
                    let name = self.consume_group_name('>')?;
                    node = self.consume_capture_group(Some(name))?;
                }
                'P' if self.dialect.python_groups => {
                    self.consume('P');
                    if self.try_consume('<') {
                        let name = self.consume_group_name('>')?;
                        node = self.consume_capture_group(Some(name))?;
                    } else if self.try_consume('=') {
                        let ref_offset = self.offset;
                        let name = self.consume_group_name(')')?;
                        return Ok(Some((self.named_backref(name, ref_offset)?, true)));
                    } else {
                        return self.error("Unknown extension ?P");
                    }
                }
                '#' if self.dialect.comments => {
                    while let Some(c) = self.next_char() {
                        if c == ')' {
                            return Ok(None);
                        }
                    }
                    return self.error("Unterminated comment");
                }
                '>' if self.dialect.backtracking_extensions && self.options.ignore_atomic_groups => {
                    self.consume('>');
                    node = self.consume_scoped(None)?;
                }
                '>' if self.dialect.backtracking_extensions => {
                    return Err(Error::unsupported("atomic groups"));
                }
                '(' if self.dialect.backtracking_extensions => {
                    return Err(Error::unsupported("conditional groups"));
                }
                c if self.dialect.inline_flags && (c == '-' || c.is_ascii_alphabetic()) => {
                    return self.consume_inline_flags(group_offset);
                }
                _ => return self.error("Invalid group"),
            }
        } else {
            node = self.consume_capture_group(None)?;
        }
        Ok(Some((node, quantifiable)))
    }

    /// \return whether the input starts with a lookbehind marker after `(?`.
    fn lookbehind_ahead(&self) -> bool {
        let mut cursor = self.input.clone();
        cursor.next() == Some('<' as u32)
            && matches!(cursor.next().map(to_char_sat), Some('=') | Some('!'))
    }

    /// Parse the contents of a group with flags restored at its end, and
    /// its closing paren.
    fn consume_scoped(&mut self, capture: Option<CaptureGroupID>) -> Result<Node, Error> {
        let saved_flags = self.flags;
        self.global_flags_allowed = false;
        let contents = self.consume_disjunction()?;
        self.flags = saved_flags;
        if !self.try_consume(')') {
            return self.error("Unbalanced parenthesis");
        }
        Ok(Node::Group {
            child: Box::new(contents),
            capture,
        })
    }

    fn consume_capture_group(&mut self, name: Option<String>) -> Result<Node, Error> {
        if self.group_count as usize >= MAX_CAPTURE_GROUPS {
            return self.error("Capture group count limit exceeded");
        }
        if let Some(name) = &name {
            if self.group_names.iter().any(|n| n.as_ref() == name.as_str()) {
                return self.error("Duplicate capture group name");
            }
        }
        self.group_count += 1;
        let group = self.group_count;
        self.group_names
            .push(name.unwrap_or_default().into_boxed_str());
        self.consume_scoped(Some(group))
    }

    /// Parse a group name up to and including `terminator`.
    fn consume_group_name(&mut self, terminator: char) -> Result<String, Error> {
        let mut name = String::new();
        loop {
            match self.next_char() {
                Some(c) if c == terminator => break,
                Some(c) if is_name_char(c, name.is_empty()) => name.push(c),
                Some(_) => return self.error("Invalid capture group name"),
                None => return self.error("Unterminated capture group name"),
            }
        }
        if name.is_empty() {
            return self.error("Empty capture group name");
        }
        Ok(name)
    }

    /// Parse inline flags like `(?i)` or `(?i-m:...)`, after the `(?`.
    fn consume_inline_flags(
        &mut self,
        group_offset: usize,
    ) -> Result<Option<(Node, bool)>, Error> {
        let mut flags = self.flags;
        let mut negate = false;
        loop {
            let c = match self.next_char() {
                Some(c) => c,
                None => return self.error("Missing ) after inline flags"),
            };
            match c {
                '-' if !negate => negate = true,
                'i' => flags.icase = !negate,
                'm' if self.dialect.m_means_dot_all => flags.dot_all = !negate,
                'm' => flags.multiline = !negate,
                's' if !self.dialect.m_means_dot_all => flags.dot_all = !negate,
                'x' => flags.extended = !negate,
                // ASCII and Unicode modes do not change the ASCII classes.
                'a' | 'u' if self.dialect.python_groups && !negate => {}
                ')' => {
                    if self.dialect.global_flags_at_start_only {
                        if negate {
                            return self.error("Missing : after inline flags");
                        }
                        if !self.global_flags_allowed {
                            return Err(Error::syntax(
                                group_offset,
                                "Global flags not at the start of the expression",
                            ));
                        }
                    }
                    self.flags = flags;
                    return Ok(None);
                }
                ':' => {
                    let saved_flags = self.flags;
                    self.flags = flags;
                    let node = self.consume_scoped(None)?;
                    self.flags = saved_flags;
                    return Ok(Some((node, true)));
                }
                _ => return self.error(format!("Unknown inline flag: {}", c)),
            }
        }
    }

    /// ES6 21.2.2.13 CharacterClass.
    fn consume_bracket(&mut self) -> Result<Node, Error> {
        self.consume('[');
        let invert = self.try_consume('^');
        let mut cps = CodePointSet::new();

        if self.dialect.literal_leading_bracket && self.try_consume(']') {
            cps.add_set(self.literal_set(']' as u32));
        }

        loop {
            match self.peek() {
                None => {
                    return self.error("Unbalanced bracket");
                }
                Some(']') => {
                    self.consume(']');
                    cps.intersect(self.space.intervals());
                    if invert {
                        cps = cps.complement_within(&self.space);
                    }
                    return Ok(Node::CharacterClass(cps));
                }
                Some('[') if self.dialect.flavor == Flavor::Ruby => {
                    return Err(Error::unsupported("nested character classes"));
                }
                Some('&') if self.dialect.flavor == Flavor::Ruby && self.lookahead_str("&&") => {
                    return Err(Error::unsupported("character class intersection"));
                }
                _ => {}
            }

            // Parse a code point or character class.
            let first = match self.try_consume_bracket_class_atom()? {
                Some(atom) => atom,
                None => continue,
            };

            // Check for a dash; we may have a range.
            if self.peek() != Some('-') || self.lookahead_str("-]") {
                self.add_class_atom(&mut cps, first);
                continue;
            }
            self.consume('-');

            let second = match self.try_consume_bracket_class_atom()? {
                Some(atom) => atom,
                None => {
                    // No second atom. For example: [a-].
                    self.add_class_atom(&mut cps, first);
                    self.add_class_atom(&mut cps, ClassAtom::CodePoint('-' as u32));
                    continue;
                }
            };

            // Ranges can't contain character classes: [\d-z] is invalid.
            // Ranges must also be in order: z-a is invalid.
            match (first, second) {
                (ClassAtom::CodePoint(c1), ClassAtom::CodePoint(c2)) if c1 <= c2 => {
                    let mut range = CodePointSet::from_interval(Interval::new(c1, c2));
                    if self.flags.icase {
                        self.folds.close_over(&mut range);
                    }
                    cps.add_set(range);
                }
                _ => {
                    return self.error("Invalid character range");
                }
            }
        }
    }

    /// \return whether the input starts with \p s, without consuming it.
    fn lookahead_str(&self, s: &str) -> bool {
        let mut cursor = self.input.clone();
        s.chars().all(|c| cursor.next() == Some(c as u32))
    }

    fn add_class_atom(&self, cps: &mut CodePointSet, atom: ClassAtom) {
        match atom {
            ClassAtom::CodePoint(c) => cps.add_set(self.literal_set(c)),
            ClassAtom::CharacterClass(set) => cps.add_set(set),
        }
    }

    fn try_consume_bracket_class_atom(&mut self) -> Result<Option<ClassAtom>, Error> {
        let c = match self.peek() {
            None | Some(']') => return Ok(None),
            Some(c) => c,
        };
        if c != '\\' {
            return Ok(self.next().map(ClassAtom::CodePoint));
        }
        self.consume('\\');
        let ec = match self.peek() {
            Some(ec) => ec,
            None => return self.error("Unterminated escape"),
        };
        if let Some(set) = self.class_escape(ec) {
            self.next();
            return Ok(Some(ClassAtom::CharacterClass(set)));
        }
        match ec {
            // "Return the CharSet containing the single character <BS> U+0008"
            'b' => {
                self.consume('b');
                Ok(Some(ClassAtom::CodePoint(0x08)))
            }
            // ES6 21.2.1 ClassEscape: \- escapes - in Unicode expressions.
            '-' => {
                self.consume('-');
                Ok(Some(ClassAtom::CodePoint('-' as u32)))
            }
            '0'..='9' if !self.strict && ec != '0' || self.dialect.octal_escapes => {
                Ok(Some(ClassAtom::CodePoint(self.consume_octal_escape()?)))
            }
            _ => {
                self.check_unsupported_escape(ec)?;
                Ok(Some(ClassAtom::CodePoint(self.consume_character_escape()?)))
            }
        }
    }

    /// \return the set for a class escape like `\d`, or None if \p c does not
    /// name a class in this flavor.
    fn class_escape(&self, c: char) -> Option<CodePointSet> {
        let mut cps = match c.to_ascii_lowercase() {
            'd' => CodePointSet::from_sorted_disjoint_intervals(charclasses::DIGITS.to_vec()),
            'w' => CodePointSet::from_sorted_disjoint_intervals(charclasses::WORD_CHARS.to_vec()),
            's' => {
                let mut cps = CodePointSet::from_sorted_disjoint_intervals(
                    self.dialect.whitespace.to_vec(),
                );
                if self.dialect.flavor == Flavor::ECMAScript {
                    for &iv in charclasses::LINE_TERMINATOR.iter() {
                        cps.add(iv)
                    }
                }
                if self.options.u180e_whitespace {
                    cps.add(charclasses::MONGOLIAN_VOWEL_SEPARATOR);
                }
                cps
            }
            'h' if self.dialect.hex_class_escapes => {
                CodePointSet::from_sorted_disjoint_intervals(charclasses::HEX_DIGITS.to_vec())
            }
            _ => return None,
        };
        if c.is_ascii_uppercase() {
            cps = cps.complement_within(&self.space);
        } else {
            cps.intersect(self.space.intervals());
        }
        Some(cps)
    }

    fn try_consume_quantifier(&mut self) -> Result<Option<Quantifier>, Error> {
        if let Some(mut quant) = self.try_consume_quantifier_prefix()? {
            quant.greedy = !self.try_consume('?');
            if quant.greedy && self.dialect.backtracking_extensions && self.peek() == Some('+') {
                return Err(Error::unsupported("possessive quantifiers"));
            }
            Ok(Some(quant))
        } else {
            Ok(None)
        }
    }

    fn try_consume_quantifier_prefix(&mut self) -> Result<Option<Quantifier>, Error> {
        let (min, max) = match self.peek() {
            Some('+') => (1, None),
            Some('*') => (0, None),
            Some('?') => (0, Some(1)),
            Some('{') => return self.try_consume_braced_quantifier(),
            _ => return Ok(None),
        };
        self.next();
        Ok(Some(Quantifier {
            min,
            max,
            greedy: true,
        }))
    }

    /// Parse a quantifier like {3}, {3,} or {3,4}.
    /// If the braces do not form a quantifier, they are literal in lenient
    /// flavors and nothing is consumed.
    fn try_consume_braced_quantifier(&mut self) -> Result<Option<Quantifier>, Error> {
        let saved = self.mark();
        self.consume('{');
        let min = self.try_consume_decimal_integer_literal();
        let mut max = min;
        let mut has_comma = false;
        if self.try_consume(',') {
            has_comma = true;
            // Like {3,} or {3,4}
            max = self.try_consume_decimal_integer_literal();
        }
        let valid = (min.is_some() || (has_comma && self.dialect.open_lower_bound))
            && self.try_consume('}');
        if !valid {
            if self.dialect.lenient_braces && !self.strict {
                self.reset(saved);
                return Ok(None);
            }
            return self.error("Incomplete quantifier");
        }
        if !has_comma {
            max = min;
        }
        Ok(Some(Quantifier {
            min: min.unwrap_or(0),
            max,
            greedy: true,
        }))
    }

    /// ES6 11.8.3 DecimalIntegerLiteral.
    /// If the value would overflow, usize::MAX is returned.
    /// All decimal digits are consumed regardless.
    fn try_consume_decimal_integer_literal(&mut self) -> Option<usize> {
        let mut result: usize = 0;
        let mut char_count = 0;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            self.next();
            char_count += 1;
            result = result.saturating_mul(10);
            result = result.saturating_add(digit as usize);
        }
        if char_count > 0 {
            Some(result)
        } else {
            None
        }
    }

    /// Consume exactly \p count hex digits.
    fn consume_hex_digits(&mut self, count: usize) -> Option<u32> {
        let saved = self.mark();
        let mut result = 0;
        for _ in 0..count {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    self.next();
                    result = result * 16 + d;
                }
                None => {
                    self.reset(saved);
                    return None;
                }
            }
        }
        Some(result)
    }

    /// Consume an octal escape of up to three digits.
    fn consume_octal_escape(&mut self) -> Result<u32, Error> {
        let mut result = 0;
        for _ in 0..3 {
            match self.peek().and_then(|c| c.to_digit(8)) {
                Some(d) => {
                    self.next();
                    result = result * 8 + d;
                }
                None => break,
            }
        }
        if result > 0o377 {
            return self.error("Octal escape value outside of range 0-0o377");
        }
        Ok(result)
    }

    fn consume_lookaround_assertion(&mut self, behind: bool, negate: bool) -> Result<Node, Error> {
        self.lookaround_depth += 1;
        self.global_flags_allowed = false;
        let contents = self.consume_disjunction()?;
        self.lookaround_depth -= 1;
        if !self.try_consume(')') {
            return self.error("Unbalanced parenthesis");
        }
        Ok(Node::LookAround {
            child: Box::new(contents),
            behind,
            negate,
        })
    }

    /// Reject escapes which the flavor supports but which have no automaton
    /// counterpart.
    fn check_unsupported_escape(&self, c: char) -> Result<(), Error> {
        if self.dialect.unsupported_escapes.contains(c) {
            return Err(Error::unsupported(format!("escape \\{}", c)));
        }
        if c == 'p' || c == 'P' {
            match self.dialect.flavor {
                Flavor::Ruby => return Err(Error::unsupported("Unicode property escapes")),
                Flavor::ECMAScript if self.strict => {
                    return Err(Error::unsupported("Unicode property escapes"))
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn consume_character_escape(&mut self) -> Result<u32, Error> {
        let c = match self.peek() {
            Some(c) => c,
            None => return self.error("Incomplete escape"),
        };
        if let Some(&(_, cp)) = self
            .dialect
            .extra_letter_escapes
            .iter()
            .find(|&&(e, _)| e == c)
        {
            self.next();
            return Ok(cp);
        }
        match c {
            'f' => {
                self.consume('f');
                Ok(0xC)
            }
            'n' => {
                self.consume('n');
                Ok(0xA)
            }
            'r' => {
                self.consume('r');
                Ok(0xD)
            }
            't' => {
                self.consume('t');
                Ok(0x9)
            }
            'v' => {
                self.consume('v');
                Ok(0xB)
            }
            'c' if self.dialect.control_escapes => {
                // Control escape.
                self.consume('c');
                match self.next_char() {
                    Some(nc) if nc.is_ascii_alphabetic() => Ok((nc as u32) % 32),
                    _ => self.error("Invalid character escape"),
                }
            }
            '0' => {
                // CharacterEscape :: "0 [lookahead != DecimalDigit]"
                self.consume('0');
                match self.peek() {
                    Some('0'..='9') => self.error("Invalid character escape"),
                    _ => Ok(0),
                }
            }

            'x' => {
                // HexEscapeSequence :: x HexDigit HexDigit
                self.consume('x');
                match self.consume_hex_digits(2) {
                    Some(cp) => Ok(cp),
                    None if self.lenient_identity() => Ok('x' as u32),
                    None => self.error("Invalid character escape"),
                }
            }

            'u' => {
                self.consume('u');
                let braced = self.dialect.braced_unicode_escape
                    && (self.dialect.flavor != Flavor::ECMAScript || self.flags.unicode);
                if braced && self.try_consume('{') {
                    let cp = self.try_consume_hex_literal();
                    return match cp {
                        Some(cp) if cp <= CODE_POINT_MAX && self.try_consume('}') => Ok(cp),
                        _ => self.error("Invalid Unicode escape"),
                    };
                }
                match self.consume_hex_digits(4) {
                    Some(hi @ 0xD800..=0xDBFF) if self.strict => {
                        // Combine a surrogate pair written as two escapes.
                        let saved = self.mark();
                        if self.try_consume_str("\\u") {
                            if let Some(lo @ 0xDC00..=0xDFFF) = self.consume_hex_digits(4) {
                                return Ok(0x10000 + ((hi - 0xD800) << 10) + (lo - 0xDC00));
                            }
                        }
                        self.reset(saved);
                        Ok(hi)
                    }
                    Some(cp) => Ok(cp),
                    None if self.lenient_identity() => Ok('u' as u32),
                    None => self.error("Invalid Unicode escape"),
                }
            }

            'U' if self.dialect.long_unicode_escape => {
                self.consume('U');
                match self.consume_hex_digits(8) {
                    Some(cp) if cp <= CODE_POINT_MAX => Ok(cp),
                    _ => self.error("Invalid Unicode escape"),
                }
            }

            c if is_syntax_char(c) => {
                self.next();
                Ok(c as u32)
            }

            c if self.strict => self.error(format!("Invalid escape: \\{}", c)),

            c if self.dialect.identity_escapes == IdentityEscapes::RejectLetters
                && c.is_ascii_alphanumeric() =>
            {
                self.error(format!("Bad escape: \\{}", c))
            }

            _ => self.next().map_or_else(|| self.error("Incomplete escape"), Ok),
        }
    }

    /// \return whether a malformed escape stands for its own letter.
    fn lenient_identity(&self) -> bool {
        self.dialect.flavor == Flavor::ECMAScript && !self.strict
    }

    /// Consume hex digits until something else appears.
    fn try_consume_hex_literal(&mut self) -> Option<u32> {
        let mut result: u32 = 0;
        let mut count = 0;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
            self.next();
            count += 1;
            result = result.saturating_mul(16).saturating_add(d);
        }
        if count > 0 {
            Some(result)
        } else {
            None
        }
    }

    fn consume_atom_escape(&mut self) -> Result<Node, Error> {
        let c = match self.peek() {
            Some(c) => c,
            None => return self.error("Incomplete escape"),
        };
        if let Some(set) = self.class_escape(c) {
            self.next();
            return Ok(Node::CharacterClass(set));
        }
        let anchor = match c {
            'b' => Some(AnchorKind::WordBoundary),
            'B' => Some(AnchorKind::NotWordBoundary),
            'A' if self.dialect.start_anchor_escape => Some(AnchorKind::Start),
            'Z' => match self.dialect.cap_z_escape {
                Some(DollarKind::EndOrFinalNewline) => Some(AnchorKind::EndOrFinalNewline),
                Some(_) => Some(AnchorKind::End),
                None => None,
            },
            'z' if self.dialect.lower_z_escape => Some(AnchorKind::End),
            _ => None,
        };
        if let Some(anchor) = anchor {
            self.next();
            return Ok(Node::Anchor(anchor));
        }
        self.check_unsupported_escape(c)?;
        match c {
            '0' if self.dialect.octal_escapes => {
                let cp = self.consume_octal_escape()?;
                Ok(self.literal(cp))
            }
            '1'..='9' => {
                let ref_offset = self.offset;
                if self.dialect.octal_escapes && self.octal_ahead() {
                    let cp = self.consume_octal_escape()?;
                    return Ok(self.literal(cp));
                }
                let mut val = 0;
                if self.dialect.flavor == Flavor::Python {
                    // Python backreferences have at most two digits.
                    for _ in 0..2 {
                        match self.peek().and_then(|c| c.to_digit(10)) {
                            Some(d) => {
                                self.next();
                                val = val * 10 + d as usize;
                            }
                            None => break,
                        }
                    }
                } else {
                    val = self.try_consume_decimal_integer_literal().unwrap_or(0);
                }
                if val > MAX_CAPTURE_GROUPS {
                    return Err(Error::syntax(
                        ref_offset,
                        format!("Backreference \\{} too large", val),
                    ));
                }
                self.check_backref_position()?;
                self.numbered_backrefs.push((val, ref_offset));
                Ok(Node::BackReference(val as CaptureGroupID))
            }
            'k' if self.dialect.flavor != Flavor::Python => {
                self.consume('k');
                let ref_offset = self.offset;
                if self.try_consume('<') {
                    let name = self.consume_group_name('>')?;
                    self.named_backref(name, ref_offset)
                } else if self.lenient_identity() {
                    Ok(self.literal('k' as u32))
                } else {
                    self.error("Invalid named reference")
                }
            }
            _ => {
                let cp = self.consume_character_escape()?;
                Ok(self.literal(cp))
            }
        }
    }

    /// \return whether three octal digits follow.
    fn octal_ahead(&self) -> bool {
        let mut cursor = self.input.clone();
        (0..3).all(|_| {
            cursor
                .next()
                .map_or(false, |c| to_char_sat(c).is_digit(8))
        })
    }

    fn check_backref_position(&self) -> Result<(), Error> {
        if self.lookaround_depth > 0 {
            return Err(Error::unsupported(
                "backreferences in lookaround assertions",
            ));
        }
        Ok(())
    }

    fn named_backref(&mut self, name: String, ref_offset: usize) -> Result<Node, Error> {
        self.check_backref_position()?;
        let known = self
            .group_names
            .iter()
            .position(|n| n.as_ref() == name.as_str());
        match known {
            Some(idx) => Ok(Node::BackReference((idx + 1) as CaptureGroupID)),
            None => {
                self.named_backrefs.push((name, ref_offset));
                Ok(Node::BackReference(UNRESOLVED_BACKREF))
            }
        }
    }

    /// \return the set matching code point \p cp, closed over case if
    /// case-insensitive.
    fn literal_set(&self, cp: u32) -> CodePointSet {
        let mut cps = if self.flags.icase {
            self.folds.equivalents(cp)
        } else {
            CodePointSet::from_code_point(cp)
        };
        cps.intersect(self.space.intervals());
        cps
    }

    fn literal(&self, cp: u32) -> Node {
        Node::CharacterClass(self.literal_set(cp))
    }

    fn dot(&self) -> Node {
        if self.flags.dot_all {
            Node::CharacterClass(self.space.clone())
        } else {
            let terminators =
                CodePointSet::from_sorted_disjoint_intervals(self.dialect.line_terminators.to_vec());
            Node::CharacterClass(terminators.complement_within(&self.space))
        }
    }

    fn finalize(&mut self, mut node: Node) -> Result<ast::Regex, Error> {
        debug_assert!(self.group_count as usize <= MAX_CAPTURE_GROUPS);
        for &(val, offset) in &self.numbered_backrefs {
            if val > self.group_count as usize {
                return Err(Error::syntax(
                    offset,
                    format!("Backreference \\{} exceeds number of capture groups", val),
                ));
            }
        }
        let mut resolved = Vec::with_capacity(self.named_backrefs.len());
        for (name, offset) in &self.named_backrefs {
            match self
                .group_names
                .iter()
                .position(|n| n.as_ref() == name.as_str())
            {
                Some(idx) => resolved.push((idx + 1) as CaptureGroupID),
                None => {
                    return Err(Error::syntax(
                        *offset,
                        format!("Unknown group name: {}", name),
                    ))
                }
            }
        }
        if !resolved.is_empty() {
            resolve_backrefs(&mut node, &mut resolved.into_iter());
        }

        let group_names = if self.group_names.iter().any(|n| !n.is_empty()) {
            std::mem::take(&mut self.group_names).into_boxed_slice()
        } else {
            Box::new([])
        };
        let mut line_terminators =
            CodePointSet::from_sorted_disjoint_intervals(self.dialect.line_terminators.to_vec());
        line_terminators.intersect(self.space.intervals());
        Ok(ast::Regex {
            node,
            flags: self.flags,
            group_count: self.group_count,
            group_names,
            line_terminators,
            flavor: self.dialect.flavor,
        })
    }
}

/// Try parsing a given pattern.
/// Return the resulting AST, or an error.
pub fn try_parse<I>(pattern: I, flags: api::Flags, options: &Options) -> Result<ast::Regex, Error>
where
    I: Iterator<Item = u32> + Clone,
{
    let dialect = flavor::dialect(options.flavor);
    let mut p = Parser {
        input: pattern.peekable(),
        offset: 0,
        flags,
        dialect,
        options,
        folds: options.fold_table(),
        space: options.encoding.code_point_space(),
        strict: dialect.flavor == Flavor::ECMAScript && flags.unicode,
        group_count: 0,
        group_names: Vec::new(),
        numbered_backrefs: Vec::new(),
        named_backrefs: Vec::new(),
        lookaround_depth: 0,
        global_flags_allowed: true,
    };
    let re = p.try_parse()?;
    log::debug!(
        "parsed {} pattern with {} capture groups",
        re.flavor,
        re.group_count
    );
    Ok(re)
}
