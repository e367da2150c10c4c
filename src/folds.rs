//! Case folding data.
//!
//! A `CaseFoldTable` maps each code point to a canonical representative of its
//! case equivalence class. The parser consults it to expand case-insensitive
//! literals and classes ahead of time, so matching never folds.
//! Tables are plain data and are passed in through `Options`.

use crate::codepointset::{CodePoint, CodePointSet};
use std::sync::{Arc, OnceLock};

/// Highest code point with a case mapping in current Unicode versions.
const LAST_CASED_CODE_POINT: u32 = 0x1E943;

/// A fold from one code point to its canonical representative.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Fold {
    from: CodePoint,
    to: CodePoint,
}

/// A simple (one to one) case folding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseFoldTable {
    // Sorted by `from`. Code points which fold to themselves are absent.
    folds: Vec<Fold>,
}

impl CaseFoldTable {
    /// Construct a table from (code point, folded) pairs.
    /// Pairs which map a code point to itself are ignored.
    pub fn from_pairs<I: IntoIterator<Item = (CodePoint, CodePoint)>>(pairs: I) -> CaseFoldTable {
        let mut folds: Vec<Fold> = pairs
            .into_iter()
            .filter(|&(from, to)| from != to)
            .map(|(from, to)| Fold { from, to })
            .collect();
        folds.sort_unstable_by_key(|f| f.from);
        folds.dedup_by_key(|f| f.from);
        CaseFoldTable { folds }
    }

    /// A table folding only ASCII letters.
    pub fn ascii() -> CaseFoldTable {
        CaseFoldTable::from_pairs(('A'..='Z').map(|c| (c as u32, c.to_ascii_lowercase() as u32)))
    }

    /// The Unicode simple case folding table, derived from the standard
    /// library's case mappings. This is computed once and shared.
    pub fn unicode() -> Arc<CaseFoldTable> {
        static UNICODE: OnceLock<Arc<CaseFoldTable>> = OnceLock::new();
        UNICODE
            .get_or_init(|| {
                let table = CaseFoldTable::from_pairs(
                    (0..=LAST_CASED_CODE_POINT)
                        .filter_map(char::from_u32)
                        .map(|c| (c as u32, simple_fold(c) as u32)),
                );
                log::debug!("built unicode case fold table with {} folds", table.len());
                Arc::new(table)
            })
            .clone()
    }

    /// \return the number of code points which do not fold to themselves.
    pub fn len(&self) -> usize {
        self.folds.len()
    }

    /// \return whether the table folds nothing.
    pub fn is_empty(&self) -> bool {
        self.folds.is_empty()
    }

    /// \return the canonical representative of `cp`.
    pub fn fold(&self, cp: CodePoint) -> CodePoint {
        match self.folds.binary_search_by(|f| f.from.cmp(&cp)) {
            Ok(idx) => self.folds[idx].to,
            Err(_) => cp,
        }
    }

    /// \return the set of all code points equivalent to `cp`, including itself.
    pub fn equivalents(&self, cp: CodePoint) -> CodePointSet {
        let mut set = CodePointSet::from_code_point(cp);
        self.close_over(&mut set);
        set
    }

    /// Add to `set` every code point case-equivalent to one of its members.
    pub fn close_over(&self, set: &mut CodePointSet) {
        // Collect the canonical representatives touched by the set.
        let mut targets: Vec<CodePoint> = self
            .folds
            .iter()
            .filter(|f| set.contains(f.from) || set.contains(f.to))
            .map(|f| f.to)
            .collect();
        if targets.is_empty() {
            return;
        }
        targets.sort_unstable();
        targets.dedup();
        for f in &self.folds {
            if targets.binary_search(&f.to).is_ok() {
                set.add_one(f.from);
                set.add_one(f.to);
            }
        }
    }
}

impl Default for CaseFoldTable {
    fn default() -> Self {
        CaseFoldTable::ascii()
    }
}

/// \return the single code point of a case mapping, or None if the mapping
/// expands to several code points.
fn single(mut mapping: impl Iterator<Item = char>) -> Option<char> {
    match (mapping.next(), mapping.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Fold through uppercase and back to lowercase. Characters whose mappings
/// are not one to one (like U+00DF or U+0130) keep their identity.
fn simple_fold(c: char) -> char {
    let upper = single(c.to_uppercase()).unwrap_or(c);
    single(upper.to_lowercase()).unwrap_or(upper)
}
