//! Name canonicalization used for document type matching

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Canonicalizes a raw name for matching.
///
/// Accented letters are folded to their base letter, the result is
/// uppercased, every run of characters outside `A-Z0-9` becomes a single
/// space, and the ends are trimmed. Total and pure.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in fold_to_ascii(raw).chars() {
        let c = c.to_ascii_uppercase();
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Transliterates to ASCII, dropping characters with no ASCII base form
fn fold_to_ascii(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());

    for c in raw.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii() {
            folded.push(c);
            continue;
        }

        match c {
            'ß' => folded.push_str("ss"),
            'æ' => folded.push_str("ae"),
            'Æ' => folded.push_str("AE"),
            'œ' => folded.push_str("oe"),
            'Œ' => folded.push_str("OE"),
            'ø' => folded.push('o'),
            'Ø' => folded.push('O'),
            'đ' => folded.push('d'),
            'Đ' => folded.push('D'),
            'ł' => folded.push('l'),
            'Ł' => folded.push('L'),
            // Anything else separates words
            _ => folded.push(' '),
        }
    }

    folded
}
