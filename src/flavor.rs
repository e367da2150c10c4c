//! Per-flavor syntax tables.
//!
//! A `Dialect` is a passive description of how one regex flavor differs from
//! the ECMAScript reference syntax. The parser consults it instead of
//! branching on the flavor itself.

use crate::charclasses;
use crate::codepointset::Interval;
use crate::options::Flavor;

/// How `^` and `$` behave outside of multiline mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DollarKind {
    /// `$` matches only at the end of input.
    End,
    /// `$` matches at the end of input, or before a final newline.
    EndOrFinalNewline,
    /// `^` and `$` are always line anchors.
    Line,
}

/// How unknown escapes of ASCII letters are treated.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IdentityEscapes {
    /// Any character may be escaped to stand for itself.
    Lenient,
    /// Escaping an ASCII letter without a meaning is an error.
    RejectLetters,
}

/// The syntax table of one flavor.
#[derive(Debug)]
pub struct Dialect {
    pub flavor: Flavor,

    /// Characters which terminate a line, for `.` and the line anchors.
    pub line_terminators: &'static [Interval],

    /// Behavior of `$` (and `^`) without the multiline flag.
    pub dollar: DollarKind,

    /// Supports `(?P<name>...)` and `(?P=name)`.
    pub python_groups: bool,

    /// Supports `(?<name>...)`.
    pub angle_named_groups: bool,

    /// Supports inline flag groups like `(?i)` and `(?i-m:...)`.
    pub inline_flags: bool,

    /// Inline flags are only permitted at the very start of the pattern.
    pub global_flags_at_start_only: bool,

    /// Inline `m` means dot-all rather than multiline.
    pub m_means_dot_all: bool,

    /// Supports `(?#...)` comments.
    pub comments: bool,

    /// Supports `\A`.
    pub start_anchor_escape: bool,

    /// Meaning of `\Z`, if supported.
    pub cap_z_escape: Option<DollarKind>,

    /// Supports `\z`.
    pub lower_z_escape: bool,

    /// Supports `\h` and `\H` as hex digit classes.
    pub hex_class_escapes: bool,

    /// Supports octal escapes like `\012`.
    pub octal_escapes: bool,

    /// Supports `\cX` control escapes.
    pub control_escapes: bool,

    /// Single letter escapes beyond `\f \n \r \t \v`.
    pub extra_letter_escapes: &'static [(char, u32)],

    /// Supports `\UHHHHHHHH`.
    pub long_unicode_escape: bool,

    /// Supports `\u{H...}` (only with the `u` flag in ECMAScript).
    pub braced_unicode_escape: bool,

    /// A `{` which does not start a valid quantifier is a literal.
    pub lenient_braces: bool,

    /// Unknown escapes.
    pub identity_escapes: IdentityEscapes,

    /// `]` directly after `[` or `[^` is a literal.
    pub literal_leading_bracket: bool,

    /// Supports `{,n}` quantifiers.
    pub open_lower_bound: bool,

    /// A quantifier may directly follow another quantifier.
    pub nested_quantifiers: bool,

    /// Lookaround assertions may be quantified.
    pub quantifiable_lookaround: bool,

    /// Recognizes possessive quantifiers, atomic groups and conditionals,
    /// which are then rejected as unsupported.
    pub backtracking_extensions: bool,

    /// Supports the `x` (verbose) flag.
    pub verbose_flag: bool,

    /// Escapes of ASCII letters with meanings the automaton cannot express.
    pub unsupported_escapes: &'static str,

    /// The `\s` class.
    pub whitespace: &'static [Interval],
}

pub static ECMASCRIPT: Dialect = Dialect {
    flavor: Flavor::ECMAScript,
    line_terminators: &charclasses::LINE_TERMINATOR,
    dollar: DollarKind::End,
    python_groups: false,
    angle_named_groups: true,
    inline_flags: false,
    global_flags_at_start_only: false,
    m_means_dot_all: false,
    comments: false,
    start_anchor_escape: false,
    cap_z_escape: None,
    lower_z_escape: false,
    hex_class_escapes: false,
    octal_escapes: false,
    control_escapes: true,
    extra_letter_escapes: &[],
    long_unicode_escape: false,
    braced_unicode_escape: true,
    lenient_braces: true,
    identity_escapes: IdentityEscapes::Lenient,
    literal_leading_bracket: false,
    open_lower_bound: false,
    nested_quantifiers: false,
    quantifiable_lookaround: false,
    backtracking_extensions: false,
    verbose_flag: false,
    unsupported_escapes: "",
    whitespace: &charclasses::WHITESPACE,
};

pub static PYTHON: Dialect = Dialect {
    flavor: Flavor::Python,
    line_terminators: &charclasses::NEWLINE,
    dollar: DollarKind::EndOrFinalNewline,
    python_groups: true,
    angle_named_groups: false,
    inline_flags: true,
    global_flags_at_start_only: true,
    m_means_dot_all: false,
    comments: true,
    start_anchor_escape: true,
    cap_z_escape: Some(DollarKind::End),
    lower_z_escape: false,
    hex_class_escapes: false,
    octal_escapes: true,
    control_escapes: false,
    extra_letter_escapes: &[('a', 0x07)],
    long_unicode_escape: true,
    braced_unicode_escape: false,
    lenient_braces: true,
    identity_escapes: IdentityEscapes::RejectLetters,
    literal_leading_bracket: true,
    open_lower_bound: true,
    nested_quantifiers: false,
    quantifiable_lookaround: true,
    backtracking_extensions: true,
    verbose_flag: true,
    unsupported_escapes: "N",
    whitespace: &charclasses::PYTHON_WHITESPACE,
};

pub static RUBY: Dialect = Dialect {
    flavor: Flavor::Ruby,
    line_terminators: &charclasses::NEWLINE,
    dollar: DollarKind::Line,
    python_groups: false,
    angle_named_groups: true,
    inline_flags: true,
    global_flags_at_start_only: false,
    m_means_dot_all: true,
    comments: true,
    start_anchor_escape: true,
    cap_z_escape: Some(DollarKind::EndOrFinalNewline),
    lower_z_escape: true,
    hex_class_escapes: true,
    octal_escapes: false,
    control_escapes: true,
    extra_letter_escapes: &[('a', 0x07), ('e', 0x1B)],
    long_unicode_escape: false,
    braced_unicode_escape: true,
    lenient_braces: true,
    identity_escapes: IdentityEscapes::Lenient,
    literal_leading_bracket: true,
    open_lower_bound: true,
    nested_quantifiers: true,
    quantifiable_lookaround: true,
    backtracking_extensions: true,
    verbose_flag: true,
    unsupported_escapes: "GKRXgy",
    whitespace: &charclasses::ASCII_WHITESPACE,
};

/// \return the syntax table for a flavor.
pub fn dialect(flavor: Flavor) -> &'static Dialect {
    match flavor {
        Flavor::ECMAScript => &ECMASCRIPT,
        Flavor::Python => &PYTHON,
        Flavor::Ruby => &RUBY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_matches_flavor() {
        for flavor in [Flavor::ECMAScript, Flavor::Python, Flavor::Ruby] {
            assert_eq!(dialect(flavor).flavor, flavor);
        }
        assert_eq!(dialect(Flavor::Ruby).dollar, DollarKind::Line);
        assert!(dialect(Flavor::Python).python_groups);
        assert!(!dialect(Flavor::ECMAScript).inline_flags);
    }
}
