//! Locale dictionaries: completion, spellchecking and corrections.
//!
//! A `Dictionary` indexes one word list with an FST over accent-folded,
//! casefolded keys; the payload vector maps FST values back to the original
//! accented forms, so accent-insensitive prefix queries return the accented
//! words. `Dictionaries` hosts one dictionary per configured locale, loaded
//! lazily on first use and cached.

use crate::error::Error;
use crate::utils::fold;
use fst::automaton::{Automaton, Str};
use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Maximum number of simultaneously configured dictionaries.
pub const MAX_DICTIONARIES: usize = 10;

/// Completions score 0; corrections score -1, -2, ... in suggestion order,
/// mirroring the contract of `suggest`.
pub type Suggestion = (String, i32);

const BUILTIN_EN: &str = include_str!("../data/wordlists/en.txt");
const BUILTIN_HI: &str = include_str!("../data/wordlists/hi.txt");

/// One loaded word list.
#[derive(Debug)]
pub struct Dictionary {
    name: String,
    /// Folded key → index into `payload`.
    index: Map<Vec<u8>>,
    /// Original accented forms per folded key.
    payload: Vec<Vec<String>>,
    /// Exact word forms for spellchecking.
    word_set: HashSet<String>,
    max_word_len: usize,
}

impl Dictionary {
    /// Build from an iterator of words. Duplicate words collapse; input is
    /// trimmed and hunspell affix flags (`word/FLAGS`) are stripped.
    pub fn from_words<I, S>(name: &str, words: I) -> Dictionary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut word_set = HashSet::new();
        let mut max_word_len = 0;
        for raw in words {
            let word = raw.as_ref();
            let word = word.split('/').next().unwrap_or(word).trim();
            if word.is_empty() || word.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                continue;
            }
            let folded = fold(word);
            if word_set.insert(word.to_string()) {
                max_word_len = max_word_len.max(word.chars().count());
                let bucket = grouped.entry(folded).or_default();
                bucket.push(word.to_string());
            }
        }
        let mut builder = MapBuilder::memory();
        let mut payload = Vec::with_capacity(grouped.len());
        for (folded, bucket) in grouped {
            // BTreeMap iterates in key order, which is what the builder
            // requires.
            let _ = builder.insert(folded.as_bytes(), payload.len() as u64);
            payload.push(bucket);
        }
        let index = builder.into_map();
        Dictionary {
            name: name.to_string(),
            index,
            payload,
            word_set,
            max_word_len,
        }
    }

    /// Parse a hunspell `.dic` file or a plain word list. The optional
    /// leading word count line of `.dic` files is skipped.
    pub fn from_text(name: &str, text: &str) -> Dictionary {
        Dictionary::from_words(name, text.lines())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.word_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_set.is_empty()
    }

    /// Accent-insensitive prefix completion. The original accented forms
    /// are returned.
    pub fn lookup(&self, prefix: &str) -> Vec<String> {
        if prefix.is_empty() || prefix.chars().count() > self.max_word_len {
            return Vec::new();
        }
        let folded = fold(prefix);
        let automaton = Str::new(&folded).starts_with();
        let mut stream = self.index.search(automaton).into_stream();
        let mut out = Vec::new();
        while let Some((_key, value)) = stream.next() {
            if let Some(bucket) = self.payload.get(value as usize) {
                out.extend(bucket.iter().cloned());
            }
        }
        out
    }

    /// Exact-form spellcheck: the word, or its accent-folded form, must be
    /// in the list.
    pub fn spellcheck(&self, word: &str) -> bool {
        if word.is_empty() {
            return false;
        }
        if self.word_set.contains(word) {
            return true;
        }
        let folded = fold(word);
        self.index
            .get(folded.as_bytes())
            .and_then(|v| self.payload.get(v as usize))
            .is_some_and(|bucket| bucket.iter().any(|w| fold(w) == folded))
    }

    /// Spell corrections: list words within edit distance 2 of the folded
    /// input, nearest first, then shorter, then lexicographic.
    pub fn corrections(&self, word: &str) -> Vec<String> {
        const MAX_DISTANCE: usize = 2;
        const MAX_CORRECTIONS: usize = 10;
        if word.is_empty() {
            return Vec::new();
        }
        let folded = fold(word);
        let mut scored: Vec<(usize, &String)> = Vec::new();
        for bucket in &self.payload {
            for candidate in bucket {
                let candidate_folded = fold(candidate);
                // Cheap length gate before the quadratic distance.
                let len_delta = candidate_folded
                    .chars()
                    .count()
                    .abs_diff(folded.chars().count());
                if len_delta > MAX_DISTANCE {
                    continue;
                }
                let distance = edit_distance(&folded, &candidate_folded, MAX_DISTANCE);
                if let Some(distance) = distance {
                    if distance > 0 {
                        scored.push((distance, candidate));
                    }
                }
            }
        }
        scored.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.chars().count().cmp(&b.1.chars().count()))
                .then_with(|| a.1.cmp(b.1))
        });
        scored
            .into_iter()
            .take(MAX_CORRECTIONS)
            .map(|(_, w)| w.clone())
            .collect()
    }
}

/// Bounded Damerau-Levenshtein distance; `None` when above `max`.
fn edit_distance(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    if n.abs_diff(m) > max {
        return None;
    }
    let mut prev_prev: Vec<usize> = vec![0; m + 1];
    let mut prev: Vec<usize> = (0..=m).collect();
    let mut current = vec![0usize; m + 1];
    for i in 1..=n {
        current[0] = i;
        let mut row_min = current[0];
        for j in 1..=m {
            let substitution = usize::from(a[i - 1] != b[j - 1]);
            let mut cost = (prev[j] + 1)
                .min(current[j - 1] + 1)
                .min(prev[j - 1] + substitution);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                cost = cost.min(prev_prev[j - 2] + 1);
            }
            current[j] = cost;
            row_min = row_min.min(cost);
        }
        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev_prev, &mut prev);
        std::mem::swap(&mut prev, &mut current);
    }
    (prev[m] <= max).then_some(prev[m])
}

/// The set of configured locale dictionaries, loaded lazily.
#[derive(Debug, Default)]
pub struct Dictionaries {
    names: Vec<String>,
    search_dirs: Vec<PathBuf>,
    loaded: HashMap<String, Option<Dictionary>>,
}

impl Dictionaries {
    /// Configure the locales to host. More than [`MAX_DICTIONARIES`]
    /// truncates.
    pub fn new(names: &[String], search_dirs: Vec<PathBuf>) -> Dictionaries {
        Dictionaries {
            names: names.iter().take(MAX_DICTIONARIES).cloned().collect(),
            search_dirs,
            loaded: HashMap::new(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Insert an already built dictionary (tests, embedded data).
    pub fn insert(&mut self, dictionary: Dictionary) {
        let name = dictionary.name().to_string();
        if !self.names.contains(&name) {
            self.names.push(name.clone());
        }
        self.loaded.insert(name, Some(dictionary));
    }

    fn load(&mut self, name: &str) -> Option<&Dictionary> {
        if !self.loaded.contains_key(name) {
            let dictionary = self.load_uncached(name);
            self.loaded.insert(name.to_string(), dictionary);
        }
        self.loaded.get(name).and_then(|d| d.as_ref())
    }

    fn load_uncached(&self, name: &str) -> Option<Dictionary> {
        for dir in &self.search_dirs {
            for file_name in [format!("{name}.dic"), format!("{name}.txt")] {
                let path = dir.join(&file_name);
                if !path.is_file() {
                    continue;
                }
                // One retry on transient read failure, then the source is
                // dropped for this session.
                for attempt in 0..2 {
                    match std::fs::read_to_string(&path) {
                        Ok(text) => {
                            debug!(dictionary = name, path = %path.display(), "loaded");
                            return Some(Dictionary::from_text(name, &text));
                        }
                        Err(source) if attempt == 0 => {
                            warn!(path = %path.display(), %source, "dictionary read failed, retrying");
                        }
                        Err(source) => {
                            warn!(
                                error = %Error::transient(path.display().to_string(), source),
                                "dictionary dropped"
                            );
                        }
                    }
                }
            }
        }
        // Bundled fallbacks so an unconfigured installation still has
        // something to complete from.
        if name == "en" || name.starts_with("en_") {
            return Some(Dictionary::from_text(name, BUILTIN_EN));
        }
        if name == "hi" || name.starts_with("hi_") {
            return Some(Dictionary::from_text(name, BUILTIN_HI));
        }
        warn!(dictionary = name, "no word list found");
        None
    }

    /// Accent-insensitive completion across all configured locales.
    pub fn lookup(&mut self, prefix: &str) -> Vec<String> {
        let names = self.names.clone();
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for name in names {
            if let Some(dictionary) = self.load(&name) {
                for word in dictionary.lookup(prefix) {
                    if seen.insert(word.clone()) {
                        out.push(word);
                    }
                }
            }
        }
        out
    }

    /// True if any configured dictionary accepts the word.
    pub fn spellcheck(&mut self, word: &str) -> bool {
        let names = self.names.clone();
        names.iter().any(|name| {
            self.load(name)
                .is_some_and(|dictionary| dictionary.spellcheck(word))
        })
    }

    /// A phrase passes if every whitespace-separated word passes.
    pub fn spellcheck_phrase(&mut self, phrase: &str) -> bool {
        let mut words = phrase.split_whitespace().peekable();
        if words.peek().is_none() {
            return false;
        }
        words.all(|word| {
            let trimmed = word.trim_matches(|c: char| c.is_ascii_punctuation());
            trimmed.is_empty() || self.spellcheck(trimmed)
        })
    }

    /// Completions and corrections merged across locales: completions score
    /// 0, corrections negative in suggestion order; per word the maximum
    /// score wins. Sorted by score descending, then length, then text.
    pub fn suggest(&mut self, input: &str) -> Vec<Suggestion> {
        const MAX_WORDS: usize = 50;
        // A slash cannot occur in any dictionary word (it introduces affix
        // flags), so such input cannot match anything.
        if input.is_empty() || input.contains('/') {
            return Vec::new();
        }
        let names = self.names.clone();
        let mut merged: HashMap<String, i32> = HashMap::new();
        for name in names {
            let Some(dictionary) = self.load(&name) else {
                continue;
            };
            for word in dictionary.lookup(input) {
                merged.entry(word).or_insert(0);
            }
            if input.chars().count() >= 4 {
                if dictionary.spellcheck(input) {
                    merged.entry(input.to_string()).or_insert(0);
                }
                for (rank, word) in dictionary.corrections(input).into_iter().enumerate() {
                    let score = -(rank as i32 + 1);
                    merged
                        .entry(word)
                        .and_modify(|existing| *existing = (*existing).max(score))
                        .or_insert(score);
                }
            }
        }
        let mut out: Vec<Suggestion> = merged.into_iter().collect();
        out.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| a.0.chars().count().cmp(&b.0.chars().count()))
                .then_with(|| a.0.cmp(&b.0))
        });
        out.truncate(MAX_WORDS);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn english() -> Dictionary {
        Dictionary::from_text("en", BUILTIN_EN)
    }

    #[test]
    fn prefix_completion() {
        let dictionary = english();
        let hits = dictionary.lookup("tre");
        assert!(hits.contains(&"tree".to_string()));
        assert!(hits.contains(&"treetops".to_string()));
        assert!(dictionary.lookup("").is_empty());
    }

    #[test]
    fn accent_insensitive_lookup_returns_accented_form() {
        let dictionary = Dictionary::from_words("de", ["Glühwürmchen", "Glut"]);
        let hits = dictionary.lookup("gluhw");
        assert_eq!(hits, vec!["Glühwürmchen".to_string()]);
        // Accented query matches too.
        assert_eq!(dictionary.lookup("Glühw").len(), 1);
    }

    #[test]
    fn spellcheck_exact_and_folded() {
        let dictionary = Dictionary::from_words("es", ["tenéis"]);
        assert!(dictionary.spellcheck("tenéis"));
        assert!(dictionary.spellcheck("teneis"));
        assert!(!dictionary.spellcheck("tenei"));
    }

    #[test]
    fn corrections_within_distance_two() {
        let dictionary = english();
        let corrections = dictionary.corrections("tehre");
        assert!(corrections.contains(&"there".to_string()));
        assert!(corrections.contains(&"three".to_string()));
        assert!(!corrections.contains(&"hello".to_string()));
    }

    #[test]
    fn hunspell_flags_are_stripped() {
        let dictionary = Dictionary::from_text("xx", "3\nhello/S\nworld\n");
        assert!(dictionary.spellcheck("hello"));
        assert!(dictionary.spellcheck("world"));
        assert!(!dictionary.spellcheck("3"));
    }

    #[test]
    fn suggest_scores_completions_zero_and_corrections_negative() {
        let mut dictionaries = Dictionaries::default();
        dictionaries.insert(english());
        let suggestions = dictionaries.suggest("camel");
        let camel = suggestions.iter().find(|(w, _)| w == "camel").unwrap();
        assert_eq!(camel.1, 0);
        let camels = suggestions.iter().find(|(w, _)| w == "camels").unwrap();
        assert_eq!(camels.1, 0);
        let teh = dictionaries.suggest("tehn");
        assert!(teh.iter().all(|(_, score)| *score <= 0));
        assert!(teh.iter().any(|(w, score)| w == "then" && *score < 0));
        // Slash input never matches.
        assert!(dictionaries.suggest("ab/cd").is_empty());
    }

    #[test]
    fn phrase_spellcheck_requires_every_word() {
        let mut dictionaries = Dictionaries::default();
        dictionaries.insert(english());
        assert!(dictionaries.spellcheck_phrase("hello world"));
        assert!(!dictionaries.spellcheck_phrase("hello qqqq"));
        assert!(!dictionaries.spellcheck_phrase("   "));
    }

    #[test]
    fn edit_distance_transposition_counts_one() {
        assert_eq!(edit_distance("teh", "the", 2), Some(1));
        assert_eq!(edit_distance("abcd", "abcd", 2), Some(0));
        assert_eq!(edit_distance("abcdef", "abc", 2), None);
    }
}
