//! Input text in its various encodings.
//!
//! Positions are offsets in code units: bytes for UTF-8 and Latin-1, `u16`
//! units for UTF-16 and UCS-2, and `u32` units for UTF-32.

use crate::util::{
    combine_surrogates, is_lead_surrogate, is_trail_surrogate, is_utf8_continuation, utf8_w2,
    utf8_w3, utf8_w4,
};
use core::fmt;

/// The code point substituted for undecodable UTF-32 units.
pub const REPLACEMENT_CHARACTER: u32 = 0xFFFD;

/// The raw code units of an input, used for scanning ahead without decoding.
#[derive(Debug, Copy, Clone)]
pub enum Units<'a> {
    Utf8(&'a [u8]),
    Latin1(&'a [u8]),
    Utf16(&'a [u16]),
    Ucs2(&'a [u16]),
    Utf32(&'a [u32]),
}

/// A helper type that holds an input and decodes code points from it.
pub trait InputIndexer: fmt::Debug + Copy + Clone {
    /// \return the length of the input, in code units.
    fn len(&self) -> usize;

    /// \return whether the input is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// \return the code point to the right of (starting at) \p pos, or None if
    /// we are at the end. Advance the position past it.
    fn next_right(&self, pos: &mut usize) -> Option<u32>;

    /// \return the code point to the left of (ending just before) \p pos, or
    /// None if we are at the start. Retreat the position past it.
    fn next_left(&self, pos: &mut usize) -> Option<u32>;

    /// \return whether \p pos falls between two code points.
    fn is_boundary(&self, pos: usize) -> bool;

    /// \return the raw code units.
    fn units(&self) -> Units<'_>;

    /// Peek at the code point to the right of a position.
    #[inline(always)]
    fn peek_right(&self, mut pos: usize) -> Option<u32> {
        self.next_right(&mut pos)
    }

    /// Peek at the code point to the left of a position.
    #[inline(always)]
    fn peek_left(&self, mut pos: usize) -> Option<u32> {
        self.next_left(&mut pos)
    }
}

/// \return the length of a UTF8 sequence starting with this byte.
#[inline(always)]
const fn utf8_seq_len(b: u8) -> usize {
    if b < 128 {
        1
    } else {
        match b & 0xF0 {
            0xE0 => 3,
            0xF0 => 4,
            _ => 2,
        }
    }
}

/// \return whether a byte represents the start of a utf8 sequence (aka a
/// char boundary).
#[inline(always)]
fn is_seq_start(b: u8) -> bool {
    // Taken from is_char_boundary.
    // "This is bit magic equivalent to: b < 128 || b >= 192"
    (b as i8) >= -0x40
}

/// UTF-8 input from a str.
#[derive(Debug, Copy, Clone)]
pub struct Utf8Input<'a> {
    input: &'a str,
}

impl<'a> Utf8Input<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { input: s }
    }

    /// \return a byte at a given position.
    /// This asserts that we are not at the right end.
    #[inline(always)]
    fn getb(&self, pos: usize) -> u8 {
        debug_assert!(pos < self.input.len());
        if cfg!(feature = "prohibit-unsafe") {
            self.input.as_bytes()[pos]
        } else {
            unsafe { *self.input.as_bytes().get_unchecked(pos) }
        }
    }

    /// Assert that a position is a valid UTF8 character boundary.
    #[inline(always)]
    fn debug_assert_boundary(&self, pos: usize) {
        debug_assert!(pos == self.input.len() || is_seq_start(self.getb(pos)));
    }
}

impl InputIndexer for Utf8Input<'_> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.input.len()
    }

    #[inline(always)]
    fn next_right(&self, pos: &mut usize) -> Option<u32> {
        self.debug_assert_boundary(*pos);
        if *pos >= self.input.len() {
            return None;
        }

        let b0 = self.getb(*pos);
        if b0 < 128 {
            *pos += 1;
            return Some(b0 as u32);
        }

        // Multibyte case.
        let len = utf8_seq_len(b0);
        let codepoint = match len {
            2 => utf8_w2(b0, self.getb(*pos + 1)),
            3 => utf8_w3(b0, self.getb(*pos + 1), self.getb(*pos + 2)),
            4 => utf8_w4(
                b0,
                self.getb(*pos + 1),
                self.getb(*pos + 2),
                self.getb(*pos + 3),
            ),
            _ => rs_unreachable!("Invalid utf8 sequence length"),
        };
        *pos += len;
        Some(codepoint)
    }

    #[inline(always)]
    fn next_left(&self, pos: &mut usize) -> Option<u32> {
        self.debug_assert_boundary(*pos);
        if *pos == 0 {
            return None;
        }

        let z = self.getb(*pos - 1);
        if z < 128 {
            *pos -= 1;
            return Some(z as u32);
        }

        // Multibyte case.
        // bytes are w x y z, with 'pos' pointing after z.
        let codepoint;
        let y = self.getb(*pos - 2);
        if !is_utf8_continuation(y) {
            codepoint = utf8_w2(y, z);
            *pos -= 2;
        } else {
            let x = self.getb(*pos - 3);
            if !is_utf8_continuation(x) {
                codepoint = utf8_w3(x, y, z);
                *pos -= 3;
            } else {
                let w = self.getb(*pos - 4);
                codepoint = utf8_w4(w, x, y, z);
                *pos -= 4;
            }
        }
        self.debug_assert_boundary(*pos);
        Some(codepoint)
    }

    #[inline(always)]
    fn is_boundary(&self, pos: usize) -> bool {
        self.input.is_char_boundary(pos)
    }

    #[inline(always)]
    fn units(&self) -> Units<'_> {
        Units::Utf8(self.input.as_bytes())
    }
}

/// Latin-1 input, one byte per code point. Also used for raw bytes.
#[derive(Debug, Copy, Clone)]
pub struct Latin1Input<'a> {
    input: &'a [u8],
}

impl<'a> Latin1Input<'a> {
    pub fn new(s: &'a [u8]) -> Self {
        Self { input: s }
    }
}

impl InputIndexer for Latin1Input<'_> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.input.len()
    }

    #[inline(always)]
    fn next_right(&self, pos: &mut usize) -> Option<u32> {
        let b = *self.input.get(*pos)?;
        *pos += 1;
        Some(b as u32)
    }

    #[inline(always)]
    fn next_left(&self, pos: &mut usize) -> Option<u32> {
        let b = *self.input.get(pos.checked_sub(1)?)?;
        *pos -= 1;
        Some(b as u32)
    }

    #[inline(always)]
    fn is_boundary(&self, pos: usize) -> bool {
        pos <= self.input.len()
    }

    #[inline(always)]
    fn units(&self) -> Units<'_> {
        Units::Latin1(self.input)
    }
}

/// UTF-16 input. Surrogate pairs decode to one code point; lone surrogates
/// decode as themselves.
#[derive(Debug, Copy, Clone)]
pub struct Utf16Input<'a> {
    input: &'a [u16],
}

impl<'a> Utf16Input<'a> {
    pub fn new(s: &'a [u16]) -> Self {
        Self { input: s }
    }

    #[inline(always)]
    fn unit(&self, pos: usize) -> Option<u32> {
        self.input.get(pos).map(|&u| u as u32)
    }
}

impl InputIndexer for Utf16Input<'_> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.input.len()
    }

    #[inline(always)]
    fn next_right(&self, pos: &mut usize) -> Option<u32> {
        let u0 = self.unit(*pos)?;
        *pos += 1;
        if is_lead_surrogate(u0) {
            if let Some(u1) = self.unit(*pos).filter(|&u| is_trail_surrogate(u)) {
                *pos += 1;
                return Some(combine_surrogates(u0, u1));
            }
        }
        Some(u0)
    }

    #[inline(always)]
    fn next_left(&self, pos: &mut usize) -> Option<u32> {
        let u1 = self.unit(pos.checked_sub(1)?)?;
        *pos -= 1;
        if is_trail_surrogate(u1) && *pos > 0 {
            if let Some(u0) = self.unit(*pos - 1).filter(|&u| is_lead_surrogate(u)) {
                *pos -= 1;
                return Some(combine_surrogates(u0, u1));
            }
        }
        Some(u1)
    }

    #[inline(always)]
    fn is_boundary(&self, pos: usize) -> bool {
        pos <= self.input.len()
    }

    #[inline(always)]
    fn units(&self) -> Units<'_> {
        Units::Utf16(self.input)
    }
}

/// UCS-2 input: each `u16` unit is a code point, surrogates included.
#[derive(Debug, Copy, Clone)]
pub struct Ucs2Input<'a> {
    input: &'a [u16],
}

impl<'a> Ucs2Input<'a> {
    pub fn new(s: &'a [u16]) -> Self {
        Self { input: s }
    }
}

impl InputIndexer for Ucs2Input<'_> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.input.len()
    }

    #[inline(always)]
    fn next_right(&self, pos: &mut usize) -> Option<u32> {
        let u = *self.input.get(*pos)?;
        *pos += 1;
        Some(u as u32)
    }

    #[inline(always)]
    fn next_left(&self, pos: &mut usize) -> Option<u32> {
        let u = *self.input.get(pos.checked_sub(1)?)?;
        *pos -= 1;
        Some(u as u32)
    }

    #[inline(always)]
    fn is_boundary(&self, pos: usize) -> bool {
        pos <= self.input.len()
    }

    #[inline(always)]
    fn units(&self) -> Units<'_> {
        Units::Ucs2(self.input)
    }
}

/// UTF-32 input. Units beyond the code point range decode as U+FFFD.
#[derive(Debug, Copy, Clone)]
pub struct Utf32Input<'a> {
    input: &'a [u32],
}

impl<'a> Utf32Input<'a> {
    pub fn new(s: &'a [u32]) -> Self {
        Self { input: s }
    }
}

#[inline(always)]
fn sanitize_utf32(u: u32) -> u32 {
    if u > crate::codepointset::CODE_POINT_MAX {
        REPLACEMENT_CHARACTER
    } else {
        u
    }
}

impl InputIndexer for Utf32Input<'_> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.input.len()
    }

    #[inline(always)]
    fn next_right(&self, pos: &mut usize) -> Option<u32> {
        let u = *self.input.get(*pos)?;
        *pos += 1;
        Some(sanitize_utf32(u))
    }

    #[inline(always)]
    fn next_left(&self, pos: &mut usize) -> Option<u32> {
        let u = *self.input.get(pos.checked_sub(1)?)?;
        *pos -= 1;
        Some(sanitize_utf32(u))
    }

    #[inline(always)]
    fn is_boundary(&self, pos: usize) -> bool {
        pos <= self.input.len()
    }

    #[inline(always)]
    fn units(&self) -> Units<'_> {
        Units::Utf32(self.input)
    }
}
