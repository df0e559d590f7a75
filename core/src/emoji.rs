//! The emoji and symbol index: multilingual names and keywords, fuzzy
//! lookup, related-emoji search and skin-tone variants.
//!
//! Built once at startup from bundled data and immutable afterwards. The
//! inverted index over normalized tokens answers exact token queries; fuzzy
//! matching (prefix, substring, small edit distance) falls back to a scan,
//! which is fine at the size of the bundled set.

use crate::error::Error;
use crate::utils::fold;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

const BUILTIN_EMOJI_JSON: &str = include_str!("../data/emoji.json");

/// Emoji released after this Unicode version are hidden unless the
/// configuration opts into all of Unicode.
pub const DEFAULT_MAX_UNICODE_VERSION: f32 = 13.0;

const SKIN_TONE_MODIFIERS: [char; 5] =
    ['\u{1F3FB}', '\u{1F3FC}', '\u{1F3FD}', '\u{1F3FE}', '\u{1F3FF}'];

/// One emoji or symbol with its multilingual labels.
#[derive(Debug, Clone, Deserialize)]
pub struct EmojiEntry {
    /// The code point sequence as a string.
    #[serde(rename = "emoji")]
    pub sequence: String,
    #[serde(rename = "names")]
    pub names_by_language: HashMap<String, Vec<String>>,
    #[serde(rename = "keywords", default)]
    pub keywords_by_language: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(rename = "version", default)]
    pub unicode_version: f32,
    #[serde(default)]
    pub skin_tone_base: bool,
    /// Romanized forms added at load time (kana names → romaji); matched
    /// with lower priority than real labels.
    #[serde(skip)]
    pub fallback_names: Vec<String>,
}

impl EmojiEntry {
    /// Preferred display name: first English name, else any.
    pub fn name(&self) -> &str {
        self.names_by_language
            .get("en")
            .and_then(|names| names.first())
            .or_else(|| self.names_by_language.values().flatten().next())
            .map(String::as_str)
            .unwrap_or("")
    }

    fn labels(&self) -> impl Iterator<Item = &String> {
        self.names_by_language
            .values()
            .flatten()
            .chain(self.keywords_by_language.values().flatten())
            .chain(self.categories.iter())
    }
}

/// A scored hit from a query.
#[derive(Debug, Clone)]
pub struct EmojiMatch<'a> {
    pub entry: &'a EmojiEntry,
    pub score: i64,
}

/// Options controlling a query.
#[derive(Debug, Clone, Copy)]
pub struct EmojiQueryOptions {
    pub limit: usize,
    /// Show emoji from every Unicode version, not just the supported set.
    pub include_all_versions: bool,
}

impl Default for EmojiQueryOptions {
    fn default() -> Self {
        EmojiQueryOptions {
            limit: 20,
            include_all_versions: false,
        }
    }
}

#[derive(Debug)]
pub struct EmojiIndex {
    entries: Vec<EmojiEntry>,
    /// Normalized token → entry indices; the exact-match fast path.
    inverted: HashMap<String, Vec<usize>>,
    by_sequence: HashMap<String, usize>,
}

static BUILTIN: Lazy<EmojiIndex> = Lazy::new(|| {
    EmojiIndex::from_json_str(BUILTIN_EMOJI_JSON).expect("bundled emoji data parses")
});

impl EmojiIndex {
    /// The index over the bundled data.
    pub fn builtin() -> &'static EmojiIndex {
        &BUILTIN
    }

    pub fn from_json_str(json: &str) -> Result<EmojiIndex, Error> {
        let mut entries: Vec<EmojiEntry> = serde_json::from_str(json)
            .map_err(|e| Error::malformed("emoji data", e.line(), e.to_string()))?;
        for entry in &mut entries {
            entry.fallback_names = entry
                .names_by_language
                .values()
                .flatten()
                .filter_map(|name| romanize_kana(name))
                .collect();
        }
        let mut inverted: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_sequence = HashMap::new();
        for (index, entry) in entries.iter().enumerate() {
            by_sequence.insert(entry.sequence.clone(), index);
            let mut tokens = HashSet::new();
            for label in entry.labels() {
                tokens.extend(normalize_tokens(label));
            }
            for token in tokens {
                inverted.entry(token).or_default().push(index);
            }
        }
        Ok(EmojiIndex {
            entries,
            inverted,
            by_sequence,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, sequence: &str) -> Option<&EmojiEntry> {
        self.by_sequence
            .get(sequence)
            .map(|index| &self.entries[*index])
    }

    /// Fuzzy query. Every query token must match some label of an entry;
    /// the entry score is the sum of the best per-token label scores.
    pub fn matches(&self, query: &str, options: EmojiQueryOptions) -> Vec<EmojiMatch<'_>> {
        let tokens = normalize_tokens(query);
        if tokens.is_empty() {
            return Vec::new();
        }
        let single_token = tokens.len() == 1;

        // Exact-token fast path: entries listed under every token.
        let mut candidates: Option<HashSet<usize>> = None;
        for token in &tokens {
            let posting: HashSet<usize> = self
                .inverted
                .get(token.as_str())
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default();
            candidates = Some(match candidates {
                None => posting,
                Some(existing) => existing.intersection(&posting).copied().collect(),
            });
        }
        let mut pool: HashSet<usize> = candidates.unwrap_or_default();
        if pool.len() < options.limit {
            // Widen to a fuzzy scan over everything.
            pool = (0..self.entries.len()).collect();
        }

        let mut scored: Vec<EmojiMatch<'_>> = Vec::new();
        for index in pool {
            let entry = &self.entries[index];
            if !options.include_all_versions
                && entry.unicode_version > DEFAULT_MAX_UNICODE_VERSION
            {
                continue;
            }
            let mut total = 0i64;
            let mut all_matched = true;
            for token in &tokens {
                let mut best = 0i64;
                for label in entry.labels() {
                    best = best.max(label_score(label, token, single_token));
                }
                // Romanized fallbacks count half.
                for label in &entry.fallback_names {
                    best = best.max(label_score(label, token, single_token) / 2);
                }
                if best == 0 {
                    all_matched = false;
                    break;
                }
                total += best;
            }
            if all_matched {
                scored.push(EmojiMatch {
                    entry,
                    score: total,
                });
            }
        }
        scored.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.entry.sequence.cmp(&b.entry.sequence))
        });
        scored.truncate(options.limit);
        scored
    }

    /// A 4-6 hex digit query names a single code point; return the
    /// character and a `U+XXXX name-ish` annotation.
    pub fn codepoint_match(&self, query: &str) -> Option<(String, String)> {
        let digits = query.chars().count();
        if !(4..=6).contains(&digits) || !query.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(query, 16).ok()?;
        let ch = char::from_u32(value)?;
        if ch.is_control() {
            return None;
        }
        let annotation = format!("U+{value:04X}");
        Some((ch.to_string(), annotation))
    }

    /// Emoji sharing at least one keyword or category with the given one,
    /// scored by overlap count.
    pub fn related(&self, sequence: &str) -> Vec<EmojiMatch<'_>> {
        let Some(origin) = self.entry(sequence) else {
            return Vec::new();
        };
        let origin_labels: HashSet<String> = origin
            .keywords_by_language
            .values()
            .flatten()
            .chain(origin.categories.iter())
            .map(|label| fold(label))
            .collect();
        let mut out: Vec<EmojiMatch<'_>> = Vec::new();
        for entry in &self.entries {
            if entry.sequence == origin.sequence {
                continue;
            }
            let overlap = entry
                .keywords_by_language
                .values()
                .flatten()
                .chain(entry.categories.iter())
                .map(|label| fold(label))
                .collect::<HashSet<String>>()
                .intersection(&origin_labels)
                .count();
            if overlap > 0 {
                out.push(EmojiMatch {
                    entry,
                    score: overlap as i64,
                });
            }
        }
        out.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.entry.sequence.cmp(&b.entry.sequence))
        });
        out
    }

    /// The five skin-tone variants of a modifier base, or empty.
    pub fn skin_tone_variants(&self, sequence: &str) -> Vec<String> {
        match self.entry(sequence) {
            Some(entry) if entry.skin_tone_base => SKIN_TONE_MODIFIERS
                .iter()
                .map(|modifier| format!("{}{}", entry.sequence, modifier))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Lowercase, fold accents, split on whitespace, underscores and hyphens.
pub fn normalize_tokens(text: &str) -> Vec<String> {
    fold(text)
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Score one query token against one label. Zero means no match. Tiers:
/// whole-label match, then exact word, then prefix, then word-boundary
/// substring, then space-insensitive substring, then edit distance ≤ 2;
/// within a tier longer matches relative to the label score higher.
fn label_score(label: &str, token: &str, single_token_query: bool) -> i64 {
    let label_folded = fold(label);
    let label_words: Vec<&str> = label_folded.split_whitespace().collect();
    let token_len = token.chars().count() as i64;

    if !label_words.is_empty() && label_words.len() == 1 && label_words[0] == token {
        return if single_token_query { 300 } else { 200 };
    }
    if label_words.iter().any(|word| *word == token) {
        return 200;
    }
    if label_folded.starts_with(token) {
        return 120 + token_len;
    }
    if label_words.iter().any(|word| word.starts_with(token)) {
        return 100 + token_len;
    }
    let compact: String = label_folded.split_whitespace().collect();
    if let Some(position) = compact.find(token) {
        return if position == 0 { 40 } else { 20 } + token_len;
    }
    // Small-typo tier: any label word within edit distance 2.
    if token_len >= 3 {
        for word in &label_words {
            if let Some(distance) = bounded_distance(token, word, 2) {
                if distance > 0 {
                    return (10 + token_len - 4 * distance as i64).max(1);
                }
            }
        }
    }
    0
}

fn bounded_distance(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for i in 1..=a.len() {
        current[0] = i;
        let mut row_min = i;
        for j in 1..=b.len() {
            let substitution = usize::from(a[i - 1] != b[j - 1]);
            current[j] = (prev[j] + 1)
                .min(current[j - 1] + 1)
                .min(prev[j - 1] + substitution);
            row_min = row_min.min(current[j]);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut current);
    }
    (prev[b.len()] <= max).then_some(prev[b.len()])
}

/// Romanize hiragana/katakana names so latin queries can find them. Names
/// containing anything else stay unromanized.
fn romanize_kana(text: &str) -> Option<String> {
    static KANA: Lazy<HashMap<char, &'static str>> = Lazy::new(|| {
        let pairs: &[(char, &str)] = &[
            ('あ', "a"), ('い', "i"), ('う', "u"), ('え', "e"), ('お', "o"),
            ('か', "ka"), ('き', "ki"), ('く', "ku"), ('け', "ke"), ('こ', "ko"),
            ('が', "ga"), ('ぎ', "gi"), ('ぐ', "gu"), ('げ', "ge"), ('ご', "go"),
            ('さ', "sa"), ('し', "shi"), ('す', "su"), ('せ', "se"), ('そ', "so"),
            ('ざ', "za"), ('じ', "ji"), ('ず', "zu"), ('ぜ', "ze"), ('ぞ', "zo"),
            ('た', "ta"), ('ち', "chi"), ('つ', "tsu"), ('て', "te"), ('と', "to"),
            ('だ', "da"), ('で', "de"), ('ど', "do"),
            ('な', "na"), ('に', "ni"), ('ぬ', "nu"), ('ね', "ne"), ('の', "no"),
            ('は', "ha"), ('ひ', "hi"), ('ふ', "fu"), ('へ', "he"), ('ほ', "ho"),
            ('ば', "ba"), ('び', "bi"), ('ぶ', "bu"), ('べ', "be"), ('ぼ', "bo"),
            ('ぱ', "pa"), ('ぴ', "pi"), ('ぷ', "pu"), ('ぺ', "pe"), ('ぽ', "po"),
            ('ま', "ma"), ('み', "mi"), ('む', "mu"), ('め', "me"), ('も', "mo"),
            ('や', "ya"), ('ゆ', "yu"), ('よ', "yo"),
            ('ら', "ra"), ('り', "ri"), ('る', "ru"), ('れ', "re"), ('ろ', "ro"),
            ('わ', "wa"), ('を', "wo"), ('ん', "n"),
        ];
        pairs.iter().copied().collect()
    });
    let mut out = String::new();
    for ch in text.chars() {
        // Katakana folds onto hiragana, one block apart.
        let normalized = if ('\u{30A1}'..='\u{30F6}').contains(&ch) {
            char::from_u32(ch as u32 - 0x60).unwrap_or(ch)
        } else {
            ch
        };
        match KANA.get(&normalized) {
            Some(romaji) => out.push_str(romaji),
            None => return None,
        }
    }
    (!out.is_empty()).then_some(out)
}
