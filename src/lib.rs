/*!

# lazyre - a lazy-DFA regex engine for backtracking dialects

This crate provides a regular expression engine for ECMAScript, Python and Ruby syntax which executes patterns with finite automata.
Patterns are parsed into an AST, compiled to an NFA, and determinized into a DFA, either completely at compile time or lazily while matching.
Matching is linear in the length of the input.

# Example: test if a string contains a match

```rust
use lazyre::Regex;
let re = Regex::new(r"\d{4}").unwrap();
let matched = re.find("2020-20-05").is_some();
assert!(matched);
```

# Example: using capture groups

Capture groups are available in the `Match` object produced by a successful match.
A capture group is a range of offsets into the input.

```rust
use lazyre::Regex;
let re = Regex::new(r"(\d{4})").unwrap();
let text = "Today is 2020-20-05";
let m = re.find(text).unwrap();
let group = m.group(1).unwrap();
println!("Year: {}", &text[group]);
// Output: Year: 2020
```

# Flavors and options

`Options` selects the syntax flavor, the input encoding, and the automaton limits.
It may also be parsed from an option string:

```rust
use lazyre::{Options, Regex};
let options: Options = "Flavor=Python,PythonMethod=match".parse().unwrap();
let re = Regex::with_options(r"\w+", "", options).unwrap();
assert_eq!(re.find("hello world").unwrap().range(), 0..5);
assert!(re.find(" hello").is_none());
```

# Priority

All flavors use leftmost-first semantics: among the matches starting at the leftmost position, the one a backtracking engine would find first is reported.
Capture groups report the positions of their last iteration.

# Unsupported constructs

Backreferences, lookarounds which can match more than one code point, and capture groups inside lookarounds cannot be expressed by a finite automaton.
Such patterns are rejected at compile time with `Error::Unsupported`, as are patterns whose automata exceed the configured limits.

```rust
use lazyre::Regex;
let err = Regex::new(r"(a)\1").unwrap_err();
assert!(err.is_unsupported());
```

# Execution modes

A Regex executes in one of three modes, reported by `Regex::exec_mode`:

- **BooleanMatch** reports only whether a match exists. It is selected by `Options::boolean_match`, and used by `Regex::is_match`.
- **SimpleCaptureGroups** tracks one set of capture positions. It is used when no DFA state carries more than one NFA thread.
- **GenericCaptureGroups** tracks capture positions per NFA thread.

# Threads

`Regex` is `Send` and `Sync`. Lazily constructed DFA states are shared between all threads using a Regex; construction of a new state takes a short lock, and everything else is lock free.

# Crate features

- **utf16**. When enabled, additional APIs are made available that allow matching text formatted in UTF-16 and UCS-2 (`&[u16]`) without going through a conversion to and from UTF-8 (`&str`) first.
- **prohibit-unsafe**. Prohibits all uses of unsafe code.

*/

#![warn(clippy::all)]
#![allow(clippy::upper_case_acronyms, clippy::match_like_matches_macro)]
// Clippy's manual_range_contains suggestion produces worse codegen.
#![allow(clippy::manual_range_contains)]
#![cfg_attr(feature = "prohibit-unsafe", forbid(unsafe_code))]

pub use crate::api::*;
pub use crate::automata::dfa::ExecMode;
pub use crate::error::Error;
pub use crate::folds::CaseFoldTable;
pub use crate::indexing::{InputIndexer, Latin1Input, Ucs2Input, Utf16Input, Utf32Input, Utf8Input};
pub use crate::options::{Encoding, Flavor, Options, PythonMethod};

#[macro_use]
mod util;

mod api;
#[doc(hidden)]
pub mod ast;
#[doc(hidden)]
pub mod automata;
mod bytesearch;
mod charclasses;
mod codepointset;
mod error;
mod exec;
mod flavor;
mod folds;
mod indexing;
mod options;
mod parse;
