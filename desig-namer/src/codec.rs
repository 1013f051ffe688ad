//! Designation suffix codec
//!
//! Suffixes count in base 26 over `a..=z`. Incrementing carries to the left,
//! and a full carry grows the suffix by one letter instead of wrapping:
//! `aaz -> aba`, `azz -> baa`, `zzz -> aaaa`.

use std::cmp::Ordering;

/// Next suffix in allocation order
///
/// Input must be non-empty lowercase ASCII letters; anything else is a
/// caller bug (checked in debug builds only).
pub fn successor(suffix: &str) -> String {
    debug_assert!(!suffix.is_empty(), "successor of an empty suffix");
    debug_assert!(
        suffix.bytes().all(|b| b.is_ascii_lowercase()),
        "suffix '{}' is not lowercase letters",
        suffix
    );

    let mut letters: Vec<char> = suffix.chars().collect();

    for i in (0..letters.len()).rev() {
        if letters[i] < 'z' {
            letters[i] = char::from(letters[i] as u8 + 1);
            return letters.into_iter().collect();
        }
        letters[i] = 'a';
    }

    // Every letter was 'z': grow by one
    letters.insert(0, 'a');
    letters.into_iter().collect()
}

/// Total order matching allocation order
///
/// Shorter suffixes were issued first; equal lengths compare as strings.
/// Plain string order is wrong across a length rollover (`aaaaaa` < `zzzzz`).
pub fn suffix_order(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successor_known_values() {
        assert_eq!(successor("aaaaa"), "aaaab");
        assert_eq!(successor("aaaaz"), "aaaba");
        assert_eq!(successor("aaazz"), "aabaa");
        assert_eq!(successor("azzzz"), "baaaa");
        assert_eq!(successor("zzzzz"), "aaaaaa");
    }

    #[test]
    fn test_successor_single_letter() {
        assert_eq!(successor("a"), "b");
        assert_eq!(successor("y"), "z");
        assert_eq!(successor("z"), "aa");
    }

    #[test]
    fn test_successor_carry_stops_at_first_incrementable() {
        assert_eq!(successor("abzz"), "acaa");
        assert_eq!(successor("zyzz"), "zzaa");
    }

    #[test]
    fn test_successor_sorts_after_input_at_equal_length() {
        let mut s = "aaxzy".to_string();
        for _ in 0..2000 {
            let next = successor(&s);
            if next.len() == s.len() {
                assert!(next > s, "{} should sort after {}", next, s);
            }
            assert_eq!(suffix_order(&next, &s), Ordering::Greater);
            s = next;
        }
    }

    #[test]
    fn test_length_rollover_ordering() {
        let grown = successor("zzzzz");
        // Plain string order gets this wrong
        assert!(grown.as_str() < "zzzzz");
        assert_eq!(suffix_order(&grown, "zzzzz"), Ordering::Greater);
        assert_eq!(suffix_order(&grown, "aaaaa"), Ordering::Greater);
    }

    #[test]
    fn test_successor_visits_every_two_letter_suffix_once() {
        let mut seen = std::collections::HashSet::new();
        let mut s = "aa".to_string();
        while s.len() == 2 {
            assert!(seen.insert(s.clone()), "{} issued twice", s);
            s = successor(&s);
        }
        assert_eq!(seen.len(), 26 * 26);
        assert_eq!(s, "aaa");
    }
}
