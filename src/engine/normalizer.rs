//! Input canonicalisation shared by every filter stage and the tactic classifier.
//!
//! - Case folding is done per character (no context-sensitive rules), so a
//!   substring of the raw text is always a substring of the folded text.
//! - Whitespace runs collapse to a single space; leading/trailing whitespace is dropped.
//! - Tokens are maximal runs of alphanumeric or `_` characters.
//! - Stems come from a small Porter-style suffix stripper.

use serde::{Deserialize, Serialize};

/// Shortest stem any rule is allowed to leave behind.
const MIN_STEM: usize = 3;

/// Canonical view of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedForm {
    /// Untransformed input, as submitted.
    pub raw: String,
    /// Lowercased, whitespace-collapsed text.
    pub text: String,
    pub tokens: Vec<String>,
    /// `stem(token)` for every token, same order.
    pub stems: Vec<String>,
}

impl NormalizedForm {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

/// Normalize free text. Total: never fails, empty input gives an empty token list.
pub fn normalize(input: &str) -> NormalizedForm {
    let text = collapse_whitespace(&fold_case(input));
    let tokens = tokenize(&text);
    let stems = tokens.iter().map(|t| stem(t)).collect();
    NormalizedForm {
        raw: input.to_string(),
        text,
        tokens,
        stems,
    }
}

/// Context-free lowercase.
pub fn fold_case(input: &str) -> String {
    input.chars().flat_map(char::to_lowercase).collect()
}

pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase + collapse; the lookup key used by the lexicon.
pub fn lookup_key(input: &str) -> String {
    collapse_whitespace(&fold_case(input))
}

pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Stem every token of a (possibly multi-word) phrase.
pub fn stem_phrase(phrase: &str) -> Vec<String> {
    tokenize(&fold_case(phrase)).iter().map(|t| stem(t)).collect()
}

/// Porter-style suffix stripping.
///
/// Deterministic, operates on lowercase input, and never shortens a word below
/// three characters. Words of two characters or fewer are returned unchanged.
pub fn stem(word: &str) -> String {
    let mut w: Vec<char> = fold_case(word).chars().collect();
    if w.len() <= 2 {
        return w.into_iter().collect();
    }

    step_plurals(&mut w);
    step_past_and_gerund(&mut w);
    step_terminal_y(&mut w);
    step_derivational(&mut w);
    step_trailing_e(&mut w);

    w.into_iter().collect()
}

fn ends_with(w: &[char], suffix: &str) -> bool {
    let s: Vec<char> = suffix.chars().collect();
    w.len() >= s.len() && w[w.len() - s.len()..] == s[..]
}

/// Replace `suffix` with `replacement` if the remaining stem keeps `MIN_STEM` chars.
fn replace_suffix(w: &mut Vec<char>, suffix: &str, replacement: &str) -> bool {
    if !ends_with(w, suffix) {
        return false;
    }
    let keep = w.len() - suffix.chars().count();
    if keep < MIN_STEM {
        return false;
    }
    w.truncate(keep);
    w.extend(replacement.chars());
    true
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn has_vowel(w: &[char]) -> bool {
    w.iter().any(|&c| is_vowel(c))
}

fn step_plurals(w: &mut Vec<char>) {
    if ends_with(w, "sses") {
        w.truncate(w.len() - 2);
    } else if ends_with(w, "ies") {
        if w.len() > 4 {
            w.truncate(w.len() - 2);
        }
    } else if ends_with(w, "ss") || ends_with(w, "us") {
        // "class", "status"
    } else if ends_with(w, "s") && w.len() > MIN_STEM {
        w.pop();
    }
}

fn step_past_and_gerund(w: &mut Vec<char>) {
    if ends_with(w, "eed") {
        if w.len() > 4 {
            w.pop();
        }
        return;
    }

    let suffix_len = if ends_with(w, "ing") {
        3
    } else if ends_with(w, "ed") {
        2
    } else {
        return;
    };
    let keep = w.len() - suffix_len;
    if keep < MIN_STEM || !has_vowel(&w[..keep]) {
        return;
    }
    w.truncate(keep);

    if ends_with(w, "at") || ends_with(w, "bl") || ends_with(w, "iz") {
        w.push('e');
    } else if w.len() > MIN_STEM {
        let last = w[w.len() - 1];
        let prev = w[w.len() - 2];
        if last == prev && !is_vowel(last) && !matches!(last, 'l' | 's' | 'z') {
            w.pop();
        }
    }
}

fn step_terminal_y(w: &mut Vec<char>) {
    if w.len() > MIN_STEM + 1 && ends_with(w, "y") && has_vowel(&w[..w.len() - 1]) {
        let last = w.len() - 1;
        w[last] = 'i';
    }
}

fn step_derivational(w: &mut Vec<char>) {
    const RULES: &[(&str, &str)] = &[
        ("ational", "ate"),
        ("tional", "tion"),
        ("ization", "ize"),
        ("ation", "ate"),
        ("fulness", "ful"),
        ("ousness", "ous"),
        ("ness", ""),
        ("ment", ""),
        ("li", ""),
    ];
    for (suffix, replacement) in RULES {
        if ends_with(w, suffix) {
            replace_suffix(w, suffix, replacement);
            return;
        }
    }
}

fn step_trailing_e(w: &mut Vec<char>) {
    if w.len() > MIN_STEM && ends_with(w, "e") {
        w.pop();
    }
}
