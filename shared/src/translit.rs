//! Latin-to-Cyrillic transliteration for product search
//!
//! The product catalog is stored in Cyrillic while revizors often type
//! queries on a Latin keyboard. Search transliterates such queries and
//! matches both forms. Longest sequences win ("shch" before "sh" before
//! "s"), matching how the names are conventionally romanized.

/// Transliteration table, ASCII sequences to Cyrillic
const LATIN_TO_CYRILLIC: &[(&str, &str)] = &[
    ("shch", "щ"),
    ("sch", "щ"),
    ("yo", "ё"),
    ("zh", "ж"),
    ("kh", "х"),
    ("ts", "ц"),
    ("ch", "ч"),
    ("sh", "ш"),
    ("a", "а"),
    ("b", "б"),
    ("v", "в"),
    ("g", "г"),
    ("d", "д"),
    ("e", "е"),
    ("z", "з"),
    ("i", "и"),
    ("y", "й"),
    ("k", "к"),
    ("l", "л"),
    ("m", "м"),
    ("n", "н"),
    ("o", "о"),
    ("p", "п"),
    ("r", "р"),
    ("s", "с"),
    ("t", "т"),
    ("u", "у"),
    ("f", "ф"),
    ("h", "х"),
    ("j", "дж"),
    ("x", "кс"),
    ("w", "в"),
    ("q", "к"),
    ("c", "ц"),
];

fn lookup(chunk: &str) -> Option<&'static str> {
    LATIN_TO_CYRILLIC
        .iter()
        .find(|(latin, _)| *latin == chunk)
        .map(|(_, cyrillic)| *cyrillic)
}

/// Whether the text contains any Latin letter worth transliterating
pub fn contains_latin(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphabetic())
}

/// Transliterate a lowercased query to Cyrillic.
///
/// Non-Latin characters (digits, punctuation, existing Cyrillic) pass
/// through unchanged. At each position the longest matching sequence is
/// consumed, up to four ASCII characters.
pub fn transliterate_to_cyrillic(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut result = String::with_capacity(lower.len() * 2);
    let mut i = 0;

    while i < lower.len() {
        let mut matched = false;
        for len in (1..=4).rev() {
            if let Some(chunk) = lower.get(i..i + len) {
                if let Some(cyrillic) = lookup(chunk) {
                    result.push_str(cyrillic);
                    i += len;
                    matched = true;
                    break;
                }
            }
        }
        if !matched {
            // Safe: i is always on a char boundary here
            if let Some(ch) = lower[i..].chars().next() {
                result.push(ch);
                i += ch.len_utf8();
            } else {
                break;
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_letters() {
        assert_eq!(transliterate_to_cyrillic("aspirin"), "аспирин");
        assert_eq!(transliterate_to_cyrillic("moloko"), "молоко");
    }

    #[test]
    fn test_digraphs_win_over_singles() {
        // "sh" must map to "ш", not "с"+"х"
        assert_eq!(transliterate_to_cyrillic("shokolad"), "шоколад");
        assert_eq!(transliterate_to_cyrillic("chay"), "чай");
        assert_eq!(transliterate_to_cyrillic("paratsetamol"), "парацетамол");
    }

    #[test]
    fn test_longest_sequence_wins() {
        assert_eq!(transliterate_to_cyrillic("shchi"), "щи");
        assert_eq!(transliterate_to_cyrillic("borshch"), "борщ");
    }

    #[test]
    fn test_case_folding() {
        assert_eq!(transliterate_to_cyrillic("Aspirin"), "аспирин");
        assert_eq!(transliterate_to_cyrillic("MOLOKO"), "молоко");
    }

    #[test]
    fn test_passthrough() {
        assert_eq!(transliterate_to_cyrillic("500"), "500");
        assert_eq!(transliterate_to_cyrillic("но-шпа"), "но-шпа");
        assert_eq!(transliterate_to_cyrillic("vitamin c 250"), "витамин ц 250");
    }

    #[test]
    fn test_contains_latin() {
        assert!(contains_latin("aspirin"));
        assert!(contains_latin("аспирин b"));
        assert!(!contains_latin("аспирин"));
        assert!(!contains_latin("500 мг"));
    }
}
