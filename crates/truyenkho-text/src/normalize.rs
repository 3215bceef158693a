//! Vietnamese diacritic stripping.
//!
//! Titles are NFD-decomposed so that tone and vowel marks become separate
//! combining characters, which are then dropped.  The letter đ/Đ carries no
//! combining mark and is mapped by hand.

use unicode_normalization::UnicodeNormalization;

/// Remove Vietnamese diacritics from a string, preserving case.
///
/// "Đấu Phá Thương Khung" becomes "Dau Pha Thuong Khung".
pub fn strip_diacritics(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' => 'd',
            'Đ' => 'D',
            other => other,
        })
        .collect()
}

/// Lowercased, accent-less form used for accent-insensitive matching.
pub fn fold_for_search(input: &str) -> String {
    strip_diacritics(input).to_lowercase()
}

/// Combining Diacritical Marks block (U+0300..U+036F).
fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}
