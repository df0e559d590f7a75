//! Transliteration: per-input-method automata turning typed Latin keys
//! into target-script text.
//!
//! Each configured input method is a deterministic automaton over input
//! characters. `transliterate` recomputes the full output from scratch and
//! is the definition of correctness; `feed` is the incremental form used on
//! the live typing path and is implemented in terms of the same
//! tokenizer/renderer, so the two can never disagree.

use crate::error::Error;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Maximum number of simultaneously configured input methods.
pub const MAX_INPUT_METHODS: usize = 10;

/// The name of the pass-through method.
pub const NO_IME: &str = "NoIME";

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    /// Consonant: carries an implicit vowel unless followed by a matra or
    /// another consonant (conjunct, written with virama).
    Consonant(&'static str),
    /// Vowel: independent form at syllable start, matra after a consonant.
    Vowel {
        independent: &'static str,
        matra: &'static str,
    },
    /// Combining sign (anusvara, visarga) attached to the syllable.
    Sign(&'static str),
    /// Anything the table does not know; passed through unchanged.
    Other(char),
}

#[derive(Debug, Clone)]
struct Token {
    /// The roman spelling consumed.
    len: usize,
    kind: TokenKind,
}

/// Script table for an ITRANS-style Indic method. Opaque outside this
/// module; methods reference the static tables below.
#[derive(Debug, Clone)]
pub struct IndicTable {
    entries: &'static HashMap<&'static str, TokenKind>,
    max_key_len: usize,
    virama: char,
}

static DEVANAGARI: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    use TokenKind::{Consonant, Sign, Vowel};
    let mut map = HashMap::new();
    let consonants: &[(&str, &str)] = &[
        ("k", "क"),
        ("kh", "ख"),
        ("g", "ग"),
        ("gh", "घ"),
        ("ch", "च"),
        ("chh", "छ"),
        ("j", "ज"),
        ("jh", "झ"),
        ("T", "ट"),
        ("Th", "ठ"),
        ("D", "ड"),
        ("Dh", "ढ"),
        ("N", "ण"),
        ("t", "त"),
        ("th", "थ"),
        ("d", "द"),
        ("dh", "ध"),
        ("n", "न"),
        ("p", "प"),
        ("ph", "फ"),
        ("b", "ब"),
        ("bh", "भ"),
        ("m", "म"),
        ("y", "य"),
        ("r", "र"),
        ("l", "ल"),
        ("v", "व"),
        ("w", "व"),
        ("sh", "श"),
        ("Sh", "ष"),
        ("s", "स"),
        ("h", "ह"),
    ];
    for (roman, deva) in consonants.iter().copied() {
        map.insert(roman, Consonant(deva));
    }
    let vowels: &[(&str, &str, &str)] = &[
        ("a", "अ", ""),
        ("aa", "आ", "ा"),
        ("A", "आ", "ा"),
        ("i", "इ", "ि"),
        ("ii", "ई", "ी"),
        ("I", "ई", "ी"),
        ("u", "उ", "ु"),
        ("uu", "ऊ", "ू"),
        ("U", "ऊ", "ू"),
        ("e", "ए", "े"),
        ("ai", "ऐ", "ै"),
        ("o", "ओ", "ो"),
        ("au", "औ", "ौ"),
    ];
    for (roman, independent, matra) in vowels.iter().copied() {
        map.insert(roman, Vowel { independent, matra });
    }
    map.insert("M", Sign("ं"));
    map.insert("H", Sign("ः"));
    map
});

static HI_ITRANS: Lazy<IndicTable> = Lazy::new(|| IndicTable {
    entries: &*DEVANAGARI,
    max_key_len: DEVANAGARI.keys().map(|k| k.len()).max().unwrap_or(1),
    virama: '\u{094D}',
});

impl IndicTable {
    /// Greedy longest-match tokenization of a roman character sequence.
    fn tokenize(&self, chars: &[char]) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut index = 0;
        while index < chars.len() {
            let mut matched = None;
            let upper = self.max_key_len.min(chars.len() - index);
            for len in (1..=upper).rev() {
                let candidate: String = chars[index..index + len].iter().collect();
                if let Some(kind) = self.entries.get(candidate.as_str()) {
                    matched = Some(Token {
                        len,
                        kind: kind.clone(),
                    });
                    break;
                }
            }
            let token = matched.unwrap_or(Token {
                len: 1,
                kind: TokenKind::Other(chars[index]),
            });
            index += token.len;
            tokens.push(token);
        }
        tokens
    }

    /// Render tokens to the target script. A trailing consonant keeps its
    /// explicit virama until a vowel arrives.
    fn render(&self, tokens: &[Token]) -> String {
        let mut out = String::new();
        let mut open_consonant = false;
        for token in tokens {
            match &token.kind {
                TokenKind::Consonant(deva) => {
                    out.push_str(deva);
                    out.push(self.virama);
                    open_consonant = true;
                }
                TokenKind::Vowel { independent, matra } => {
                    if open_consonant {
                        out.pop();
                        out.push_str(matra);
                    } else {
                        out.push_str(independent);
                    }
                    open_consonant = false;
                }
                TokenKind::Sign(sign) => {
                    out.push_str(sign);
                    open_consonant = false;
                }
                TokenKind::Other(ch) => {
                    out.push(*ch);
                    open_consonant = false;
                }
            }
        }
        out
    }

    /// Index of the first token of the last, still-mutable syllable: the
    /// trailing consonant cluster plus an optional vowel and signs. Tokens
    /// before it can no longer be changed by further input.
    fn open_syllable_start(&self, tokens: &[Token]) -> usize {
        let mut start = tokens.len();
        let mut seen_vowel_or_sign = false;
        for (index, token) in tokens.iter().enumerate().rev() {
            match token.kind {
                TokenKind::Consonant(_) => {
                    start = index;
                    if seen_vowel_or_sign {
                        break;
                    }
                }
                TokenKind::Vowel { .. } | TokenKind::Sign(_) => {
                    if seen_vowel_or_sign {
                        break;
                    }
                    seen_vowel_or_sign = true;
                    start = index;
                }
                TokenKind::Other(_) => break,
            }
        }
        start
    }
}

/// A configured input method.
#[derive(Debug, Clone)]
pub enum Transliterator {
    /// Pass-through: every key inserts its character.
    NoIme,
    /// Table-driven Indic automaton; carries the pending roman syllable.
    Indic {
        name: &'static str,
        table: &'static IndicTable,
        pending: Vec<char>,
    },
}

impl Transliterator {
    /// Look a method up by its configured name.
    pub fn by_name(name: &str) -> Option<Transliterator> {
        match name {
            NO_IME | "" => Some(Transliterator::NoIme),
            "hi-itrans" => Some(Transliterator::Indic {
                name: "hi-itrans",
                table: &*HI_ITRANS,
                pending: Vec::new(),
            }),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Transliterator::NoIme => NO_IME,
            Transliterator::Indic { name, .. } => name,
        }
    }

    /// Deterministic recomputation from scratch. Pure: no automaton state
    /// is read or written.
    pub fn transliterate(&self, chars: &[char]) -> String {
        match self {
            Transliterator::NoIme => chars.iter().collect(),
            Transliterator::Indic { table, .. } => table.render(&table.tokenize(chars)),
        }
    }

    /// Feed one input character. Returns the newly committed output and the
    /// rendering of the still-mutable pending context.
    pub fn feed(&mut self, ch: char) -> (String, String) {
        match self {
            Transliterator::NoIme => (ch.to_string(), String::new()),
            Transliterator::Indic { table, pending, .. } => {
                pending.push(ch);
                let tokens = table.tokenize(pending);
                let split = table.open_syllable_start(&tokens);
                let consumed: usize = tokens[..split].iter().map(|t| t.len).sum();
                let committed = table.render(&tokens[..split]);
                pending.drain(..consumed);
                let pending_view = table.render(&tokens[split..]);
                (committed, pending_view)
            }
        }
    }

    /// Flush and return whatever is still pending.
    pub fn finish(&mut self) -> String {
        match self {
            Transliterator::NoIme => String::new(),
            Transliterator::Indic { table, pending, .. } => {
                let out = table.render(&table.tokenize(pending));
                pending.clear();
                out
            }
        }
    }

    pub fn reset(&mut self) {
        if let Transliterator::Indic { pending, .. } = self {
            pending.clear();
        }
    }
}

/// The ordered set of configured input methods; the first is the priority
/// method whose view becomes the canonical preedit string.
#[derive(Debug, Clone)]
pub struct TransliterationSet {
    methods: Vec<Transliterator>,
}

impl Default for TransliterationSet {
    fn default() -> Self {
        TransliterationSet {
            methods: vec![Transliterator::NoIme],
        }
    }
}

impl TransliterationSet {
    /// Build from configured names. Unknown names are reported and
    /// skipped; an empty result falls back to the single pass-through
    /// method. Configuring more than [`MAX_INPUT_METHODS`] truncates.
    pub fn from_names(names: &[String]) -> (TransliterationSet, Vec<Error>) {
        let mut methods = Vec::new();
        let mut errors = Vec::new();
        for name in names.iter().take(MAX_INPUT_METHODS) {
            match Transliterator::by_name(name) {
                Some(m) => methods.push(m),
                None => errors.push(Error::malformed(
                    "inputmethod",
                    0,
                    format!("unknown input method {name:?}"),
                )),
            }
        }
        if names.len() > MAX_INPUT_METHODS {
            errors.push(Error::ResourceLimit {
                what: "input methods",
                limit: MAX_INPUT_METHODS,
            });
        }
        if methods.is_empty() {
            methods.push(Transliterator::NoIme);
        }
        (TransliterationSet { methods }, errors)
    }

    pub fn methods(&self) -> &[Transliterator] {
        &self.methods
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.methods.iter().map(Transliterator::name).collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Recompute every method's view of the same typed character sequence.
    pub fn views(&self, chars: &[char]) -> Vec<String> {
        self.methods
            .iter()
            .map(|m| m.transliterate(chars))
            .collect()
    }

    pub fn reset(&mut self) {
        for method in &mut self.methods {
            method.reset();
        }
    }

    /// Make the next configured method the priority one.
    pub fn rotate_next(&mut self) {
        if self.methods.len() > 1 {
            self.methods.rotate_left(1);
        }
    }

    /// Make the previous configured method the priority one.
    pub fn rotate_previous(&mut self) {
        if self.methods.len() > 1 {
            self.methods.rotate_right(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn noime_is_identity() {
        let t = Transliterator::NoIme;
        assert_eq!(t.transliterate(&chars("guru")), "guru");
    }

    #[test]
    fn hi_itrans_basic_words() {
        let t = Transliterator::by_name("hi-itrans").unwrap();
        assert_eq!(t.transliterate(&chars("guru")), "गुरु");
        assert_eq!(t.transliterate(&chars("namaste")), "नमस्ते");
        assert_eq!(t.transliterate(&chars("bhaarat")), "भारत्");
        assert_eq!(t.transliterate(&chars("aam")), "आम्");
    }

    #[test]
    fn trailing_consonant_keeps_virama_until_vowel() {
        let t = Transliterator::by_name("hi-itrans").unwrap();
        assert_eq!(t.transliterate(&chars("gur")), "गुर्");
        assert_eq!(t.transliterate(&chars("guru")), "गुरु");
    }

    #[test]
    fn unknown_characters_pass_through() {
        let t = Transliterator::by_name("hi-itrans").unwrap();
        assert_eq!(t.transliterate(&chars("guru2")), "गुरु2");
    }

    #[test]
    fn incremental_feed_matches_from_scratch() {
        let inputs = ["guru", "namaste", "gurkhaa", "aaie", "kMsa", "xyz 12"];
        for input in inputs {
            let reference = Transliterator::by_name("hi-itrans")
                .unwrap()
                .transliterate(&chars(input));
            let mut automaton = Transliterator::by_name("hi-itrans").unwrap();
            let mut committed = String::new();
            for ch in input.chars() {
                let (flushed, _pending) = automaton.feed(ch);
                committed.push_str(&flushed);
            }
            committed.push_str(&automaton.finish());
            assert_eq!(committed, reference, "input {input:?}");
        }
    }

    #[test]
    fn set_falls_back_to_noime_and_reports_unknown() {
        let (set, errors) =
            TransliterationSet::from_names(&["no-such-ime".to_string()]);
        assert_eq!(errors.len(), 1);
        assert_eq!(set.names(), vec![NO_IME]);

        let (set, errors) = TransliterationSet::from_names(&[]);
        assert!(errors.is_empty());
        assert_eq!(set.names(), vec![NO_IME]);
    }

    #[test]
    fn views_cover_all_methods_in_priority_order() {
        let (set, _) = TransliterationSet::from_names(&[
            "hi-itrans".to_string(),
            NO_IME.to_string(),
        ]);
        let views = set.views(&chars("guru"));
        assert_eq!(views, vec!["गुरु".to_string(), "guru".to_string()]);
    }
}
