//! Byte classification and the base64 encoding policy
//!
//! A value is written literally (`attr: value`) unless the active
//! [`EncodingStrategy`] says it must be base64-encoded (`attr:: dmFsdWU=`).
//! The decision is made from the set of [`ByteClass`]es present in the value.

/// Classification of a piece of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteClass {
    /// Printable ASCII (0x20-0x7E)
    PlainAscii,
    /// ASCII control characters (0x00-0x1F, 0x7F)
    AsciiControl,
    /// Non-ASCII character a terminal renders legibly (see [`DISPLAYABLE_RANGES`])
    DisplayableNonAscii,
    /// Any other non-ASCII character (combining marks, format characters, ...)
    NonDisplayableNonAscii,
    /// Bytes that are not valid UTF-8
    InvalidUtf8,
}

impl ByteClass {
    fn bit(self) -> u8 {
        match self {
            ByteClass::PlainAscii => 1,
            ByteClass::AsciiControl => 1 << 1,
            ByteClass::DisplayableNonAscii => 1 << 2,
            ByteClass::NonDisplayableNonAscii => 1 << 3,
            ByteClass::InvalidUtf8 => 1 << 4,
        }
    }

    /// Classify a single character
    pub fn of_char(ch: char) -> Self {
        let cp = ch as u32;
        if cp < 0x20 || cp == 0x7F {
            ByteClass::AsciiControl
        } else if cp < 0x80 {
            ByteClass::PlainAscii
        } else if is_displayable(cp) {
            ByteClass::DisplayableNonAscii
        } else {
            ByteClass::NonDisplayableNonAscii
        }
    }
}

/// The set of classes found in a value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteClasses(u8);

impl ByteClasses {
    /// Add a class to the set
    pub fn insert(&mut self, class: ByteClass) {
        self.0 |= class.bit();
    }

    /// Check if the set has `class`
    pub fn contains(&self, class: ByteClass) -> bool {
        self.0 & class.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Non-ASCII code points treated as displayable, as sorted inclusive ranges.
///
/// This is a fixed approximation of "would a terminal render this legibly",
/// not a Unicode property. Letters, digits, punctuation and symbols of the
/// common scripts are in; C1 controls, NBSP, the soft hyphen, combining
/// marks, zero-width and bidi formatting characters, private use, variation
/// selectors, the BOM and the specials block are out.
pub const DISPLAYABLE_RANGES: &[(u32, u32)] = &[
    (0x00A1, 0x00AC), // Latin-1 punctuation and symbols
    (0x00AE, 0x02FF), // Latin-1 letters, Latin Extended-A/B, IPA, spacing modifiers
    (0x0370, 0x0377), // Greek
    (0x037A, 0x037F),
    (0x0384, 0x038A),
    (0x038C, 0x038C),
    (0x038E, 0x03A1),
    (0x03A3, 0x0482), // Greek, Cyrillic
    (0x048A, 0x052F), // Cyrillic, Cyrillic Supplement
    (0x0531, 0x0556), // Armenian
    (0x0559, 0x058A),
    (0x05D0, 0x05EA), // Hebrew letters
    (0x0620, 0x064A), // Arabic letters
    (0x0660, 0x0669), // Arabic-Indic digits
    (0x0904, 0x0939), // Devanagari
    (0x0958, 0x0961),
    (0x0966, 0x096F),
    (0x0E01, 0x0E30), // Thai
    (0x0E32, 0x0E33),
    (0x0E3F, 0x0E46),
    (0x0E4F, 0x0E5B),
    (0x10A0, 0x10FF), // Georgian
    (0x1100, 0x11FF), // Hangul Jamo
    (0x1E00, 0x1FFE), // Latin Extended Additional, Greek Extended
    (0x2010, 0x2027), // dashes, quotes, bullets, ellipsis
    (0x2030, 0x205E), // per-mille, primes, misc punctuation
    (0x2070, 0x20C0), // super/subscripts, currency
    (0x2100, 0x23FF), // letterlike, number forms, arrows, math, technical
    (0x2460, 0x2BFF), // enclosed alphanumerics through misc symbols and arrows
    (0x3001, 0x303F), // CJK symbols and punctuation
    (0x3041, 0x3096), // Hiragana
    (0x309B, 0x30FF), // Hiragana marks, Katakana
    (0x4E00, 0x9FFF), // CJK Unified Ideographs
    (0xAC00, 0xD7A3), // Hangul syllables
    (0xFF01, 0xFF60), // fullwidth forms
    (0xFFE0, 0xFFE6),
    (0x1F300, 0x1FAFF), // emoji and pictographs
];

fn is_displayable(cp: u32) -> bool {
    DISPLAYABLE_RANGES
        .binary_search_by(|&(start, end)| {
            if end < cp {
                std::cmp::Ordering::Less
            } else if start > cp {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .is_ok()
}

/// Compute the set of byte classes present in `value`
pub fn classify(value: &[u8]) -> ByteClasses {
    let mut classes = ByteClasses::default();
    for chunk in value.utf8_chunks() {
        for ch in chunk.valid().chars() {
            classes.insert(ByteClass::of_char(ch));
        }
        if !chunk.invalid().is_empty() {
            classes.insert(ByteClass::InvalidUtf8);
        }
    }
    classes
}

/// Policy deciding which values get base64-encoded on write.
///
/// The four switches are independent. Regardless of them, a value is always
/// encoded when it starts or ends with a space, starts with `:` or `<`, or
/// contains NUL, LF or CR, since it could not be read back otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingStrategy {
    encode_ascii_control_chars: bool,
    encode_displayable_non_ascii: bool,
    encode_non_displayable_non_ascii: bool,
    encode_non_utf8: bool,
}

impl EncodingStrategy {
    /// Encode control characters, non-displayable characters and non-UTF-8 data
    pub const DEFAULT: Self = Self::new(true, false, true, true);
    /// Only encode what would corrupt the LDIF syntax
    pub const MINIMAL: Self = Self::new(false, false, false, false);
    /// Encode anything that is not plain printable ASCII
    pub const MAXIMAL: Self = Self::new(true, true, true, true);

    /// Create a strategy from the four switches
    pub const fn new(
        encode_ascii_control_chars: bool,
        encode_displayable_non_ascii: bool,
        encode_non_displayable_non_ascii: bool,
        encode_non_utf8: bool,
    ) -> Self {
        Self {
            encode_ascii_control_chars,
            encode_displayable_non_ascii,
            encode_non_displayable_non_ascii,
            encode_non_utf8,
        }
    }

    /// Set whether ASCII control characters force base64
    pub fn with_ascii_control_chars(mut self, encode: bool) -> Self {
        self.encode_ascii_control_chars = encode;
        self
    }

    /// Set whether displayable non-ASCII characters force base64
    pub fn with_displayable_non_ascii(mut self, encode: bool) -> Self {
        self.encode_displayable_non_ascii = encode;
        self
    }

    /// Set whether non-displayable non-ASCII characters force base64
    pub fn with_non_displayable_non_ascii(mut self, encode: bool) -> Self {
        self.encode_non_displayable_non_ascii = encode;
        self
    }

    /// Set whether invalid UTF-8 forces base64
    pub fn with_non_utf8(mut self, encode: bool) -> Self {
        self.encode_non_utf8 = encode;
        self
    }

    /// Check if ASCII control characters force base64
    pub fn encode_ascii_control_chars(&self) -> bool {
        self.encode_ascii_control_chars
    }

    /// Check if displayable non-ASCII characters force base64
    pub fn encode_displayable_non_ascii(&self) -> bool {
        self.encode_displayable_non_ascii
    }

    /// Check if non-displayable non-ASCII characters force base64
    pub fn encode_non_displayable_non_ascii(&self) -> bool {
        self.encode_non_displayable_non_ascii
    }

    /// Check if invalid UTF-8 forces base64
    pub fn encode_non_utf8(&self) -> bool {
        self.encode_non_utf8
    }

    /// Decide whether `value` must be written in base64 form
    pub fn should_encode(&self, value: &[u8]) -> bool {
        let (first, last) = match (value.first(), value.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return false,
        };

        if first == b' ' || last == b' ' || first == b':' || first == b'<' {
            return true;
        }
        if value.iter().any(|&b| matches!(b, b'\0' | b'\n' | b'\r')) {
            return true;
        }

        let classes = classify(value);
        (self.encode_non_utf8 && classes.contains(ByteClass::InvalidUtf8))
            || (self.encode_ascii_control_chars && classes.contains(ByteClass::AsciiControl))
            || (self.encode_displayable_non_ascii && classes.contains(ByteClass::DisplayableNonAscii))
            || (self.encode_non_displayable_non_ascii
                && classes.contains(ByteClass::NonDisplayableNonAscii))
    }
}

impl Default for EncodingStrategy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [EncodingStrategy; 3] = [
        EncodingStrategy::DEFAULT,
        EncodingStrategy::MINIMAL,
        EncodingStrategy::MAXIMAL,
    ];

    const CONTROL: &[u8] = b"tab\there";
    const NON_UTF8: &[u8] = &[b'a', 0xFE, b'b'];
    const DISPLAYABLE: &[u8] = "jalapeño".as_bytes();
    // "e" followed by U+0301 COMBINING ACUTE ACCENT
    const NON_DISPLAYABLE: &[u8] = "cafe\u{0301}".as_bytes();

    #[test]
    fn test_table_is_sorted_and_disjoint() {
        for pair in DISPLAYABLE_RANGES.windows(2) {
            assert!(pair[0].0 <= pair[0].1);
            assert!(pair[0].1 < pair[1].0, "{:X?} overlaps {:X?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_classify_char() {
        assert_eq!(ByteClass::of_char('a'), ByteClass::PlainAscii);
        assert_eq!(ByteClass::of_char('\t'), ByteClass::AsciiControl);
        assert_eq!(ByteClass::of_char('\u{7F}'), ByteClass::AsciiControl);
        assert_eq!(ByteClass::of_char('ñ'), ByteClass::DisplayableNonAscii);
        assert_eq!(ByteClass::of_char('é'), ByteClass::DisplayableNonAscii);
        assert_eq!(ByteClass::of_char('Ж'), ByteClass::DisplayableNonAscii);
        assert_eq!(ByteClass::of_char('世'), ByteClass::DisplayableNonAscii);
        assert_eq!(ByteClass::of_char('\u{0301}'), ByteClass::NonDisplayableNonAscii);
        assert_eq!(ByteClass::of_char('\u{0085}'), ByteClass::NonDisplayableNonAscii);
        assert_eq!(ByteClass::of_char('\u{00AD}'), ByteClass::NonDisplayableNonAscii);
        assert_eq!(ByteClass::of_char('\u{200B}'), ByteClass::NonDisplayableNonAscii);
        assert_eq!(ByteClass::of_char('\u{E000}'), ByteClass::NonDisplayableNonAscii);
    }

    #[test]
    fn test_classify_collects_union() {
        let mut value = b"x\ty".to_vec();
        value.extend_from_slice("ñ".as_bytes());
        value.push(0xFF);
        let classes = classify(&value);
        assert!(classes.contains(ByteClass::PlainAscii));
        assert!(classes.contains(ByteClass::AsciiControl));
        assert!(classes.contains(ByteClass::DisplayableNonAscii));
        assert!(classes.contains(ByteClass::InvalidUtf8));
        assert!(!classes.contains(ByteClass::NonDisplayableNonAscii));
        assert!(classify(b"").is_empty());
    }

    #[test]
    fn test_syntax_colliding_values_always_encoded() {
        for strategy in ALL {
            for value in [&b" leading"[..], b"trailing ", b":colon", b"<angle", b" "] {
                assert!(strategy.should_encode(value), "{:?} {:?}", strategy, value);
            }
        }
    }

    #[test]
    fn test_line_breaks_and_nul_always_encoded() {
        for strategy in ALL {
            assert!(strategy.should_encode(b"a\nb"));
            assert!(strategy.should_encode(b"a\rb"));
            assert!(strategy.should_encode(b"a\0b"));
        }
    }

    #[test]
    fn test_plain_ascii_never_encoded() {
        for strategy in ALL {
            for value in [&b"plain"[..], b"cn=John Doe,o=example", b"a:b<c", b"x"] {
                assert!(!strategy.should_encode(value), "{:?} {:?}", strategy, value);
            }
            assert!(!strategy.should_encode(b""));
        }
    }

    #[test]
    fn test_default_strategy() {
        let strategy = EncodingStrategy::default();
        assert_eq!(strategy, EncodingStrategy::DEFAULT);
        assert!(strategy.should_encode(CONTROL));
        assert!(strategy.should_encode(NON_UTF8));
        assert!(!strategy.should_encode(DISPLAYABLE));
        assert!(strategy.should_encode(NON_DISPLAYABLE));
    }

    #[test]
    fn test_minimal_strategy() {
        let strategy = EncodingStrategy::MINIMAL;
        assert!(!strategy.should_encode(CONTROL));
        assert!(!strategy.should_encode(NON_UTF8));
        assert!(!strategy.should_encode(DISPLAYABLE));
        assert!(!strategy.should_encode(NON_DISPLAYABLE));
    }

    #[test]
    fn test_maximal_strategy() {
        let strategy = EncodingStrategy::MAXIMAL;
        assert!(strategy.should_encode(CONTROL));
        assert!(strategy.should_encode(NON_UTF8));
        assert!(strategy.should_encode(DISPLAYABLE));
        assert!(strategy.should_encode(NON_DISPLAYABLE));
    }

    #[test]
    fn test_switches_are_independent() {
        let strategy = EncodingStrategy::MINIMAL.with_non_utf8(true);
        assert!(strategy.should_encode(NON_UTF8));
        assert!(!strategy.should_encode(CONTROL));
        assert!(!strategy.should_encode(NON_DISPLAYABLE));

        let strategy = EncodingStrategy::MINIMAL.with_displayable_non_ascii(true);
        assert!(strategy.should_encode(DISPLAYABLE));
        assert!(!strategy.should_encode(NON_DISPLAYABLE));
        assert!(strategy.encode_displayable_non_ascii());
        assert!(!strategy.encode_ascii_control_chars());
    }
}
