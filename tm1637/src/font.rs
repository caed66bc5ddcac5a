//! The segment font: a fixed table mapping the characters a 7 segment digit can reasonably show
//! to the segment bitmask the TM1637 expects.
//!
//! Bit 0 is segment A, bit 6 is segment G.  Bit 7 is not part of any glyph; depending on the
//! module it drives the decimal point after the digit or, on the second digit of most 4 digit
//! clock modules, the colon.

use crate::{Error, Result};

/// The most digits the TM1637 can drive
pub const MAX_DIGITS: usize = 6;

/// Segment bytes for one write, one per digit position
pub type DisplayBuffer = heapless::Vec<u8, MAX_DIGITS>;

/// The auxiliary bit: decimal point or colon, depending on the position and the module
pub const AUX_BIT: u8 = 0b1000_0000;

/// Segment pair for the degree sign followed by `C`, shown after temperatures
pub const DEGREES_CELSIUS: [u8; 2] = [0x63, 0x39];

/// How text is turned into segments
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodingMode {
    /// Every character takes one digit.
    #[default]
    Plain,

    /// For modules with a decimal point after each digit: a `.` following a character lights the
    /// point on that character's digit instead of taking a digit of its own.
    DecimalPoint,
}

/// Characters in the same order as [`FONT_TABLE`].  Used for the reverse lookup.
const FONT_CHARS: &[u8; 39] = b"0123456789abcdefghijklmnopqrstuvwxyz -*";

/// The glyphs, in the order of [`FONT_CHARS`]
const FONT_TABLE: &[u8; 39] = &[
    0x3F, /* 0 */
    0x06, /* 1 */
    0x5B, /* 2 */
    0x4F, /* 3 */
    0x66, /* 4 */
    0x6D, /* 5 */
    0x7D, /* 6 */
    0x07, /* 7 */
    0x7F, /* 8 */
    0x6F, /* 9 */
    0x77, /* a */
    0x7C, /* b */
    0x39, /* c */
    0x5E, /* d */
    0x79, /* e */
    0x71, /* f */
    0x3D, /* g */
    0x76, /* h */
    0x06, /* i */
    0x1E, /* j */
    0x76, /* k */
    0x38, /* l */
    0x55, /* m */
    0x54, /* n */
    0x3F, /* o */
    0x73, /* p */
    0x67, /* q */
    0x50, /* r */
    0x6D, /* s */
    0x78, /* t */
    0x3E, /* u */
    0x1C, /* v */
    0x2A, /* w */
    0x76, /* x */
    0x6E, /* y */
    0x5B, /* z */
    0x00, /* (space) */
    0x40, /* - */
    0x63, /* * (degree sign) */
];

const SPACE_INDEX: usize = 36;
const DASH_INDEX: usize = 37;
const STAR_INDEX: usize = 38;

/// Encode a single character.
///
/// Supports `0-9`, `a-z` (either case), space, `-` and `*`.  The latter renders as a degree sign.
pub fn encode_char(ch: char) -> Result<u8> {
    let index = match ch {
        '0'..='9' => ch as usize - '0' as usize,
        'a'..='z' => ch as usize - 'a' as usize + 10,
        'A'..='Z' => ch as usize - 'A' as usize + 10,
        ' ' => SPACE_INDEX,
        '-' => DASH_INDEX,
        '*' => STAR_INDEX,
        _ => return Err(Error::InvalidCharacter(ch)),
    };

    FONT_TABLE
        .get(index)
        .copied()
        .ok_or(Error::InvalidCharacter(ch))
}

/// Encode a hex digit.  Only the low nibble of `digit` is used.
pub fn encode_digit(digit: u8) -> u8 {
    FONT_TABLE[(digit & 0x0f) as usize]
}

/// Find the character a segment pattern was encoded from, ignoring the auxiliary bit.
///
/// Some characters share a glyph (`0` and `o`, `1` and `i`, `2` and `z`, `5` and `s`, and `h`, `k`
/// and `x`); for those the first one in font order is returned, so digits win over letters.
pub fn decode_segment(segment: u8) -> Option<char> {
    let segment = segment & !AUX_BIT;

    FONT_TABLE
        .iter()
        .position(|glyph| *glyph == segment)
        .and_then(|index| FONT_CHARS.get(index))
        .map(|ascii| char::from(*ascii))
}

/// Lazily encode `text`, one segment byte per item.
///
/// The iterator yields an error for the first character not in the font and keeps going after
/// it, so callers that want all-or-nothing behavior should collect or validate first.
pub fn segments(text: &str, mode: EncodingMode) -> Segments<'_> {
    Segments {
        chars: text.chars().peekable(),
        mode,
    }
}

/// Iterator returned by [`segments`]
pub struct Segments<'a> {
    chars: core::iter::Peekable<core::str::Chars<'a>>,
    mode: EncodingMode,
}

impl Iterator for Segments<'_> {
    type Item = Result<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        let ch = self.chars.next()?;

        let mut segment = match encode_char(ch) {
            Ok(segment) => segment,
            Err(e) => return Some(Err(e)),
        };

        if self.mode == EncodingMode::DecimalPoint {
            // Any run of dots right after a character lights that character's point
            while self.chars.next_if_eq(&'.').is_some() {
                segment |= AUX_BIT;
            }
        }

        Some(Ok(segment))
    }
}

/// Encode `text`, one digit per character.
///
/// Fails if any character is not in the font, or if the text needs more than [`MAX_DIGITS`]
/// digits.
pub fn encode_string(text: &str) -> Result<DisplayBuffer> {
    collect_buffer(segments(text, EncodingMode::Plain))
}

/// Like [`encode_string`], but a `.` right after a character sets the decimal point on that
/// character's digit instead of using a digit of its own.
///
/// A leading `.` has no digit to attach to and is rejected like any other unsupported character.
pub fn encode_string_with_points(text: &str) -> Result<DisplayBuffer> {
    collect_buffer(segments(text, EncodingMode::DecimalPoint))
}

fn collect_buffer(segments: Segments<'_>) -> Result<DisplayBuffer> {
    let mut buffer = DisplayBuffer::new();

    for segment in segments {
        buffer.push(segment?).map_err(|_| Error::OutOfRange)?;
    }

    Ok(buffer)
}
