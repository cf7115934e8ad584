//! Transcoding of names and string payloads into UTF-8.
//!
//! Everything stored in a tree is UTF-8. Input in other encodings is
//! converted directly into spare arena space, which is sized with a
//! worst-case multiplier per encoding and then trimmed to the bytes
//! actually written.

/// A source encoding accepted for names and string payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf16,
    Utf32,
    /// Single-byte character set with a table for bytes `0x80..=0xFF`.
    Sbcs,
}

impl Encoding {
    /// Most UTF-8 bytes a single source unit can become.
    #[inline]
    #[must_use]
    pub const fn worst_case_multiplier(self) -> u32 {
        match self {
            Encoding::Utf8 => 1,
            Encoding::Utf16 | Encoding::Sbcs => 3,
            Encoding::Utf32 => 4,
        }
    }
}

/// Text borrowed in one of the supported encodings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Text<'a> {
    Utf8(&'a [u8]),
    Utf16(&'a [u16]),
    Utf32(&'a [char]),
    Sbcs(&'a [u8], &'static [u16; 128]),
}

impl<'a> Text<'a> {
    #[inline]
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        match self {
            Text::Utf8(_) => Encoding::Utf8,
            Text::Utf16(_) => Encoding::Utf16,
            Text::Utf32(_) => Encoding::Utf32,
            Text::Sbcs(..) => Encoding::Sbcs,
        }
    }

    /// Length in source units.
    #[inline]
    #[must_use]
    pub const fn units(&self) -> usize {
        match self {
            Text::Utf8(s) => s.len(),
            Text::Utf16(s) => s.len(),
            Text::Utf32(s) => s.len(),
            Text::Sbcs(s, _) => s.len(),
        }
    }

    /// Upper bound on the UTF-8 length of this text.
    #[inline]
    #[must_use]
    pub const fn worst_case_len(&self) -> u64 {
        self.units() as u64 * self.encoding().worst_case_multiplier() as u64
    }

    /// Writes the UTF-8 form into `dest` and returns the bytes written.
    ///
    /// # Panics
    ///
    /// Panics if `dest` is shorter than [`Text::worst_case_len`] requires.
    pub fn write_utf8(&self, dest: &mut [u8]) -> usize {
        match *self {
            Text::Utf8(src) => {
                dest[..src.len()].copy_from_slice(src);
                src.len()
            }
            Text::Utf16(src) => utf16_to_utf8(dest, src),
            Text::Utf32(src) => utf32_to_utf8(dest, src),
            Text::Sbcs(src, high128) => sbcs_to_utf8(dest, src, high128),
        }
    }
}

/// Converts UTF-16, replacing unpaired surrogates with U+FFFD.
pub fn utf16_to_utf8(dest: &mut [u8], src: &[u16]) -> usize {
    let mut at = 0;
    for ch in char::decode_utf16(src.iter().copied()) {
        let ch = ch.unwrap_or(char::REPLACEMENT_CHARACTER);
        at += ch.encode_utf8(&mut dest[at..]).len();
    }
    at
}

pub fn utf32_to_utf8(dest: &mut [u8], src: &[char]) -> usize {
    let mut at = 0;
    for ch in src {
        at += ch.encode_utf8(&mut dest[at..]).len();
    }
    at
}

/// Converts single-byte text. Bytes below 0x80 are ASCII; the rest are
/// looked up in `high128`.
pub fn sbcs_to_utf8(dest: &mut [u8], src: &[u8], high128: &[u16; 128]) -> usize {
    let mut at = 0;
    for &byte in src {
        if byte < 0x80 {
            dest[at] = byte;
            at += 1;
        } else {
            let unit = high128[usize::from(byte - 0x80)];
            let ch = char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER);
            at += ch.encode_utf8(&mut dest[at..]).len();
        }
    }
    at
}

const fn identity_high128() -> [u16; 128] {
    let mut table = [0u16; 128];
    let mut i = 0;
    while i < 128 {
        table[i] = 0x80 + i as u16;
        i += 1;
    }
    table
}

/// ISO-8859-1: every byte maps to the code point of the same value.
pub static LATIN1_HIGH128: [u16; 128] = identity_high128();

/// Windows-1252. Undefined bytes map to the C1 control of the same value.
pub static CP1252_HIGH128: [u16; 128] = [
    0x20AC, 0x0081, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, // 80
    0x02C6, 0x2030, 0x0160, 0x2039, 0x0152, 0x008D, 0x017D, 0x008F, // 88
    0x0090, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, // 90
    0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0x009D, 0x017E, 0x0178, // 98
    0x00A0, 0x00A1, 0x00A2, 0x00A3, 0x00A4, 0x00A5, 0x00A6, 0x00A7, // A0
    0x00A8, 0x00A9, 0x00AA, 0x00AB, 0x00AC, 0x00AD, 0x00AE, 0x00AF, // A8
    0x00B0, 0x00B1, 0x00B2, 0x00B3, 0x00B4, 0x00B5, 0x00B6, 0x00B7, // B0
    0x00B8, 0x00B9, 0x00BA, 0x00BB, 0x00BC, 0x00BD, 0x00BE, 0x00BF, // B8
    0x00C0, 0x00C1, 0x00C2, 0x00C3, 0x00C4, 0x00C5, 0x00C6, 0x00C7, // C0
    0x00C8, 0x00C9, 0x00CA, 0x00CB, 0x00CC, 0x00CD, 0x00CE, 0x00CF, // C8
    0x00D0, 0x00D1, 0x00D2, 0x00D3, 0x00D4, 0x00D5, 0x00D6, 0x00D7, // D0
    0x00D8, 0x00D9, 0x00DA, 0x00DB, 0x00DC, 0x00DD, 0x00DE, 0x00DF, // D8
    0x00E0, 0x00E1, 0x00E2, 0x00E3, 0x00E4, 0x00E5, 0x00E6, 0x00E7, // E0
    0x00E8, 0x00E9, 0x00EA, 0x00EB, 0x00EC, 0x00ED, 0x00EE, 0x00EF, // E8
    0x00F0, 0x00F1, 0x00F2, 0x00F3, 0x00F4, 0x00F5, 0x00F6, 0x00F7, // F0
    0x00F8, 0x00F9, 0x00FA, 0x00FB, 0x00FC, 0x00FD, 0x00FE, 0x00FF, // F8
];

/// Latin-1 encoded text, stored as UTF-8 on insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Latin1Str<'a>(pub &'a [u8]);

/// Windows-1252 encoded text, stored as UTF-8 on insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cp1252Str<'a>(pub &'a [u8]);

/// UTF-16 text, stored as UTF-8 on insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Utf16Str<'a>(pub &'a [u16]);

impl<'a> From<Latin1Str<'a>> for Text<'a> {
    fn from(s: Latin1Str<'a>) -> Self {
        Text::Sbcs(s.0, &LATIN1_HIGH128)
    }
}

impl<'a> From<Cp1252Str<'a>> for Text<'a> {
    fn from(s: Cp1252Str<'a>) -> Self {
        Text::Sbcs(s.0, &CP1252_HIGH128)
    }
}

impl<'a> From<Utf16Str<'a>> for Text<'a> {
    fn from(s: Utf16Str<'a>) -> Self {
        Text::Utf16(s.0)
    }
}

impl<'a> From<&'a str> for Text<'a> {
    fn from(s: &'a str) -> Self {
        Text::Utf8(s.as_bytes())
    }
}

impl<'a> From<&'a String> for Text<'a> {
    fn from(s: &'a String) -> Self {
        Text::Utf8(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Text<'a> {
    fn from(s: &'a [u8]) -> Self {
        Text::Utf8(s)
    }
}

impl<'a> From<&'a [u16]> for Text<'a> {
    fn from(s: &'a [u16]) -> Self {
        Text::Utf16(s)
    }
}

impl<'a> From<&'a [char]> for Text<'a> {
    fn from(s: &'a [char]) -> Self {
        Text::Utf32(s)
    }
}
