//! URL-slug generation.
//!
//! Slugs are derived from the display title:
//! 1. Strip Vietnamese diacritics (see [`crate::normalize`])
//! 2. Lowercase
//! 3. Drop everything that is not alphanumeric, `_` or whitespace
//! 4. Collapse whitespace runs into single hyphens
//! 5. Append a suffix for uniqueness
//!
//! Edit flows use the entity's numeric id as suffix, so regenerating the
//! slug for the same (title, id) pair is idempotent and cannot collide with
//! any other entity.  Create flows, where the id is not known yet, use a
//! random base-36 token; the UNIQUE column constraint is the final arbiter
//! and callers retry with a fresh token on a duplicate.

use rand::Rng;

use crate::error::SlugError;
use crate::normalize::strip_diacritics;

/// Length of the random suffix used by [`slug_with_token`].
const TOKEN_LEN: usize = 8;

/// Build a slug for an entity whose id is known (edit flows).
///
/// Deterministic: the same title and id always yield the same slug.
pub fn slug_for_id(title: &str, id: i64) -> Result<String, SlugError> {
    let base = slug_base(title)?;
    Ok(format!("{base}-{id}"))
}

/// Build a slug with a fresh random base-36 suffix (create flows).
pub fn slug_with_token(title: &str) -> Result<String, SlugError> {
    let base = slug_base(title)?;
    Ok(format!("{base}-{}", random_token()))
}

/// The suffix-less slug body; errors on titles with no usable characters.
fn slug_base(title: &str) -> Result<String, SlugError> {
    let stripped = strip_diacritics(title).to_lowercase();

    let mut out = String::with_capacity(stripped.len());
    let mut pending_hyphen = false;
    for c in stripped.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else if c.is_whitespace() {
            pending_hyphen = true;
        }
        // Anything else (punctuation, symbols) is dropped outright.
    }

    if out.is_empty() {
        return Err(SlugError::EmptyTitle);
    }
    Ok(out)
}

/// Random lowercase base-36 token of [`TOKEN_LEN`] characters.
fn random_token() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vietnamese_title_with_id_suffix() {
        assert_eq!(
            slug_for_id("Đấu Phá Thương Khung", 42).unwrap(),
            "dau-pha-thuong-khung-42"
        );
    }

    #[test]
    fn idempotent_for_same_title_and_id() {
        let a = slug_for_id("Phàm Nhân Tu Tiên", 7).unwrap();
        let b = slug_for_id("Phàm Nhân Tu Tiên", 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn output_alphabet_is_restricted() {
        let slug = slug_for_id("Tiên Nghịch!!! (bản dịch)", 9).unwrap();
        assert!(slug.chars().all(|c| c.is_ascii_lowercase()
            || c.is_ascii_digit()
            || c == '-'
            || c == '_'));
        assert!(slug.ends_with("-9"));
    }

    #[test]
    fn punctuation_is_dropped_not_hyphenated() {
        assert_eq!(slug_for_id("Ma Đạo: Tổ Sư", 1).unwrap(), "ma-dao-to-su-1");
    }

    #[test]
    fn empty_title_is_rejected() {
        assert_eq!(slug_base(""), Err(SlugError::EmptyTitle));
        assert_eq!(slug_base("   "), Err(SlugError::EmptyTitle));
        assert_eq!(slug_base("!!!"), Err(SlugError::EmptyTitle));
    }

    #[test]
    fn token_suffix_has_expected_shape() {
        let slug = slug_with_token("Nguyên Tôn").unwrap();
        let suffix = slug.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), TOKEN_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert!(slug.starts_with("nguyen-ton-"));
    }
}
