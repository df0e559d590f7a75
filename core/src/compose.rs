//! Compose sequences: the trie, the X11 Compose-file parser, and the
//! incremental engine with its fallback rules.
//!
//! The trie is immutable once built; reloading the user overlay builds a
//! fresh trie and swaps the shared `Arc`. The engine owns only the current
//! prefix of consumed keysyms.

use crate::error::Error;
use crate::keysym::{Keysym, KEY_MULTI};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

const BUILTIN_COMPOSE: &str = include_str!("../data/Compose.builtin");

#[derive(Debug, Clone)]
enum Node {
    Interior(HashMap<Keysym, Node>),
    Leaf(String),
}

impl Node {
    fn interior() -> Node {
        Node::Interior(HashMap::new())
    }
}

/// Result of walking a keysym sequence through the trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Walk {
    /// The sequence is a complete definition.
    Resolved(String),
    /// The sequence is a proper prefix of at least one definition.
    Live,
    /// No definition extends this sequence.
    Undefined,
}

/// One completion of a live prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Keys still to be typed.
    pub remaining: Vec<Keysym>,
    pub result: String,
}

/// Map from key sequences to result strings, built from Compose files.
#[derive(Debug, Clone)]
pub struct ComposeTrie {
    root: Node,
    max_sequence_len: usize,
}

/// Paths substituted into `include` directives: `%L` is the locale compose
/// file, `%S` the system compose directory, `%H` the home directory.
#[derive(Debug, Clone, Default)]
pub struct IncludeEnv {
    pub locale_file: Option<PathBuf>,
    pub system_dir: Option<PathBuf>,
    pub home: Option<PathBuf>,
}

impl Default for ComposeTrie {
    fn default() -> Self {
        let mut trie = ComposeTrie::new();
        // The built-in table is under our control; parse errors in it would
        // be a bug, but they are still only skipped entries.
        let errors = trie.parse_str(BUILTIN_COMPOSE, "<builtin>", &IncludeEnv::default());
        for error in &errors {
            warn!(%error, "built-in compose table entry skipped");
        }
        trie
    }
}

impl ComposeTrie {
    pub fn new() -> Self {
        ComposeTrie {
            root: Node::interior(),
            max_sequence_len: 0,
        }
    }

    /// Length of the longest defined sequence.
    pub fn max_sequence_len(&self) -> usize {
        self.max_sequence_len
    }

    /// Define `sequence` → `result`. An empty `result` removes the
    /// sequence. A shorter definition replaces any longer ones below it; a
    /// definition through an existing leaf replaces that leaf.
    pub fn insert(&mut self, sequence: &[Keysym], result: &str) {
        if sequence.is_empty() {
            return;
        }
        if result.is_empty() {
            self.remove(sequence);
            return;
        }
        let mut node = &mut self.root;
        for keysym in &sequence[..sequence.len() - 1] {
            let map = match node {
                Node::Interior(map) => map,
                Node::Leaf(_) => {
                    *node = Node::interior();
                    match node {
                        Node::Interior(map) => map,
                        Node::Leaf(_) => unreachable!(),
                    }
                }
            };
            node = map.entry(*keysym).or_insert_with(Node::interior);
        }
        let last = sequence[sequence.len() - 1];
        match node {
            Node::Interior(map) => {
                map.insert(last, Node::Leaf(result.to_string()));
            }
            Node::Leaf(_) => {
                let mut map = HashMap::new();
                map.insert(last, Node::Leaf(result.to_string()));
                *node = Node::Interior(map);
            }
        }
        self.max_sequence_len = self.max_sequence_len.max(sequence.len());
    }

    fn remove(&mut self, sequence: &[Keysym]) {
        fn rec(node: &mut Node, sequence: &[Keysym]) -> bool {
            let Node::Interior(map) = node else {
                return false;
            };
            let Some(first) = sequence.first() else {
                return false;
            };
            if sequence.len() == 1 {
                map.remove(first);
            } else if let Some(child) = map.get_mut(first) {
                if rec(child, &sequence[1..]) {
                    map.remove(first);
                }
            }
            map.is_empty()
        }
        rec(&mut self.root, sequence);
    }

    fn child<'a>(map: &'a HashMap<Keysym, Node>, keysym: Keysym) -> Option<(&'a Node, Keysym)> {
        if let Some(node) = map.get(&keysym) {
            return Some((node, keysym));
        }
        // Keypad fallback, both directions: a sequence defined with <1>
        // accepts KP_1 and the other way round.
        if let Some(plain) = keysym.keypad_to_plain() {
            if let Some(node) = map.get(&plain) {
                return Some((node, plain));
            }
        }
        if let Some(keypad) = keysym.plain_to_keypad() {
            if let Some(node) = map.get(&keypad) {
                return Some((node, keypad));
            }
        }
        None
    }

    /// Walk a full sequence from the root, applying the keypad fallback at
    /// every step.
    pub fn walk(&self, sequence: &[Keysym]) -> Walk {
        let mut node = &self.root;
        for keysym in sequence {
            let map = match node {
                Node::Interior(map) => map,
                // Trailing keys after a resolved sequence are junk.
                Node::Leaf(result) => return Walk::Resolved(result.clone()),
            };
            match Self::child(map, *keysym) {
                Some((next, _)) => node = next,
                None => return Walk::Undefined,
            }
        }
        match node {
            Node::Interior(_) => Walk::Live,
            Node::Leaf(result) => Walk::Resolved(result.clone()),
        }
    }

    /// Does any sequence start with this keysym?
    pub fn starts_sequence(&self, keysym: Keysym) -> bool {
        match &self.root {
            Node::Interior(map) => Self::child(map, keysym).is_some(),
            Node::Leaf(_) => false,
        }
    }

    /// Enumerate all completions below `prefix` whose remaining keys can be
    /// typed with the given available keysyms. Results are ordered by the
    /// coarse Unicode category of the result, then lexicographically.
    pub fn completions(&self, prefix: &[Keysym], available: &HashSet<Keysym>) -> Vec<Completion> {
        let mut node = &self.root;
        for keysym in prefix {
            let map = match node {
                Node::Interior(map) => map,
                Node::Leaf(_) => return Vec::new(),
            };
            match Self::child(map, *keysym) {
                Some((next, _)) => node = next,
                None => return Vec::new(),
            }
        }
        let typable = |keysym: Keysym| {
            available.contains(&keysym)
                || keysym
                    .keypad_to_plain()
                    .is_some_and(|plain| available.contains(&plain))
                || keysym
                    .plain_to_keypad()
                    .is_some_and(|keypad| available.contains(&keypad))
        };
        let mut out = Vec::new();
        let mut remaining = Vec::new();
        fn dfs(
            node: &Node,
            typable: &dyn Fn(Keysym) -> bool,
            remaining: &mut Vec<Keysym>,
            out: &mut Vec<Completion>,
        ) {
            match node {
                Node::Leaf(result) => out.push(Completion {
                    remaining: remaining.clone(),
                    result: result.clone(),
                }),
                Node::Interior(map) => {
                    for (keysym, child) in map {
                        if !typable(*keysym) {
                            continue;
                        }
                        remaining.push(*keysym);
                        dfs(child, typable, remaining, out);
                        remaining.pop();
                    }
                }
            }
        }
        dfs(node, &typable, &mut remaining, &mut out);
        out.sort_by(|a, b| {
            let rank_a = a.result.chars().next().map(category_rank).unwrap_or(u8::MAX);
            let rank_b = b.result.chars().next().map(category_rank).unwrap_or(u8::MAX);
            rank_a.cmp(&rank_b).then_with(|| a.result.cmp(&b.result))
        });
        out
    }

    /// Parse a Compose file and add its sequences. Parse errors are
    /// collected per line; valid lines still load.
    pub fn load_file(&mut self, path: &Path, env: &IncludeEnv) -> Vec<Error> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) => {
                return vec![Error::transient(path.display().to_string(), source)];
            }
        };
        self.parse_str(&text, &path.display().to_string(), env)
    }

    /// Parse Compose-format text.
    pub fn parse_str(&mut self, text: &str, file: &str, env: &IncludeEnv) -> Vec<Error> {
        let mut errors = Vec::new();
        for (index, raw_line) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix("include") {
                match parse_quoted(rest.trim()) {
                    Some((include_path, _)) => {
                        if let Some(resolved) = expand_include(&include_path, env) {
                            errors.extend(self.load_file(&resolved, env));
                        }
                    }
                    None => errors.push(Error::malformed(file, line_no, "bad include directive")),
                }
                continue;
            }
            match parse_sequence_line(line) {
                Ok((sequence, result)) => self.insert(&sequence, &result),
                Err(message) => errors.push(Error::malformed(file, line_no, message)),
            }
        }
        errors
    }
}

fn expand_include(path: &str, env: &IncludeEnv) -> Option<PathBuf> {
    if path == "%L" {
        return env.locale_file.clone();
    }
    let mut expanded = path.to_string();
    if expanded.contains("%S") {
        expanded = expanded.replace("%S", env.system_dir.as_ref()?.to_str()?);
    }
    if expanded.contains("%H") {
        expanded = expanded.replace("%H", env.home.as_ref()?.to_str()?);
    }
    Some(PathBuf::from(expanded))
}

/// Parse a `"quoted"` string with backslash escapes; returns the content
/// and the rest of the line after the closing quote.
fn parse_quoted(text: &str) -> Option<(String, &str)> {
    let rest = text.strip_prefix('"')?;
    let mut out = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, ch)) = chars.next() {
        match ch {
            '"' => return Some((out, &rest[i + 1..])),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, escaped)) => out.push(escaped),
                None => return None,
            },
            _ => out.push(ch),
        }
    }
    None
}

fn parse_sequence_line(line: &str) -> Result<(Vec<Keysym>, String), String> {
    let (keys_part, rest) = line
        .split_once(':')
        .ok_or_else(|| "missing ':' separator".to_string())?;
    let mut sequence = Vec::new();
    let mut remainder = keys_part.trim();
    while !remainder.is_empty() {
        let open = remainder
            .find('<')
            .ok_or_else(|| format!("junk before key name: {remainder:?}"))?;
        let close = remainder[open..]
            .find('>')
            .ok_or_else(|| "unterminated key name".to_string())?
            + open;
        let name = &remainder[open + 1..close];
        let keysym =
            Keysym::from_name(name).ok_or_else(|| format!("unknown keysym name {name:?}"))?;
        sequence.push(keysym);
        remainder = remainder[close + 1..].trim_start();
    }
    if sequence.is_empty() {
        return Err("empty key sequence".to_string());
    }
    let (result, _trailer) =
        parse_quoted(rest.trim()).ok_or_else(|| "missing quoted result".to_string())?;
    Ok((sequence, result))
}

/// Coarse category rank for completion ordering: letters before numbers
/// before punctuation before symbols before everything else.
fn category_rank(ch: char) -> u8 {
    if ch.is_alphabetic() {
        0
    } else if ch.is_numeric() {
        1
    } else if ch.is_ascii_punctuation() || ch.is_whitespace() {
        2
    } else {
        3
    }
}

/// Outcome of feeding one keysym to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeResult {
    /// The key is not part of a compose sequence; the caller handles it.
    NotHandled,
    /// The key extended a live prefix.
    Composing,
    /// A sequence resolved; the text is ready to insert.
    Committed(String),
    /// The key cannot extend the prefix and no fallback applied. The key
    /// was discarded, the prefix kept; the host is expected to beep.
    Rejected,
}

/// Incremental compose state over a shared trie.
#[derive(Debug, Clone)]
pub struct ComposeEngine {
    trie: Arc<ComposeTrie>,
    prefix: Vec<Keysym>,
}

impl ComposeEngine {
    pub fn new(trie: Arc<ComposeTrie>) -> Self {
        ComposeEngine {
            trie,
            prefix: Vec::new(),
        }
    }

    /// Swap in a freshly built trie (overlay reload). The current prefix is
    /// kept; it is re-validated on the next key.
    pub fn set_trie(&mut self, trie: Arc<ComposeTrie>) {
        self.trie = trie;
    }

    pub fn trie(&self) -> &Arc<ComposeTrie> {
        &self.trie
    }

    pub fn is_composing(&self) -> bool {
        !self.prefix.is_empty()
    }

    pub fn prefix(&self) -> &[Keysym] {
        &self.prefix
    }

    pub fn reset(&mut self) {
        self.prefix.clear();
    }

    /// Remove the last consumed keysym (backspace inside a sequence).
    pub fn pop(&mut self) -> bool {
        self.prefix.pop().is_some()
    }

    /// Completions of the current prefix over the reported keyboard.
    pub fn completions(&self, available: &HashSet<Keysym>) -> Vec<Completion> {
        if self.prefix.is_empty() {
            return Vec::new();
        }
        self.trie.completions(&self.prefix, available)
    }

    /// Human-readable rendering of the pending sequence for the preedit:
    /// the compose key as `·`, dead keys as their combining mark, other
    /// keys as the character they insert.
    pub fn preedit(&self) -> String {
        let mut out = String::new();
        for keysym in &self.prefix {
            if *keysym == KEY_MULTI {
                out.push('·');
            } else if let Some(mark) = keysym.combining_mark() {
                out.push(mark);
            } else if let Some(ch) = keysym.to_char() {
                out.push(ch);
            } else {
                let _ = write!(out, "<{}>", keysym.name());
            }
        }
        out
    }

    /// Feed one keysym.
    pub fn feed(&mut self, keysym: Keysym) -> ComposeResult {
        if self.prefix.is_empty()
            && !keysym.is_dead_key()
            && keysym != KEY_MULTI
            && !self.trie.starts_sequence(keysym)
        {
            return ComposeResult::NotHandled;
        }
        let mut tentative = self.prefix.clone();
        tentative.push(keysym);
        match self.trie.walk(&tentative) {
            Walk::Resolved(result) => {
                self.prefix.clear();
                ComposeResult::Committed(result)
            }
            Walk::Live => {
                self.prefix = tentative;
                ComposeResult::Composing
            }
            Walk::Undefined => match dead_key_fallback(&tentative) {
                DeadKeyFallback::Resolved(result) => {
                    self.prefix.clear();
                    ComposeResult::Committed(result)
                }
                DeadKeyFallback::Incomplete => {
                    self.prefix = tentative;
                    ComposeResult::Composing
                }
                DeadKeyFallback::Invalid => ComposeResult::Rejected,
            },
        }
    }
}

enum DeadKeyFallback {
    Resolved(String),
    /// Every key so far is a dead key; more input can still resolve it.
    Incomplete,
    Invalid,
}

/// Interpret a sequence not present in the trie as dead keys followed by a
/// base letter: the base then the combining marks in reverse typing order,
/// NFC-normalized.
fn dead_key_fallback(sequence: &[Keysym]) -> DeadKeyFallback {
    let Some((last, leading)) = sequence.split_last() else {
        return DeadKeyFallback::Invalid;
    };
    let mut marks = Vec::new();
    for keysym in leading {
        match keysym.combining_mark() {
            Some(mark) => marks.push(mark),
            None => return DeadKeyFallback::Invalid,
        }
    }
    if last.combining_mark().is_some() {
        return DeadKeyFallback::Incomplete;
    }
    if leading.is_empty() {
        return DeadKeyFallback::Invalid;
    }
    let Some(base) = last.to_char() else {
        return DeadKeyFallback::Invalid;
    };
    // The base must be a cased letter; dead keys before punctuation or
    // digits stay invalid.
    if !(base.is_lowercase() || base.is_uppercase()) {
        return DeadKeyFallback::Invalid;
    }
    let mut combined = String::new();
    combined.push(base);
    for mark in marks.iter().rev() {
        combined.push(*mark);
    }
    DeadKeyFallback::Resolved(combined.nfc().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keysym::{
        KEY_DEAD_ABOVEDOT, KEY_DEAD_CIRCUMFLEX, KEY_DEAD_MACRON, KEY_DEAD_TILDE, KEY_KP_0,
    };

    fn key(ch: char) -> Keysym {
        Keysym::from_char(ch)
    }

    fn default_engine() -> ComposeEngine {
        ComposeEngine::new(Arc::new(ComposeTrie::default()))
    }

    #[test]
    fn builtin_emdash_resolves() {
        let mut engine = default_engine();
        assert_eq!(engine.feed(KEY_MULTI), ComposeResult::Composing);
        assert_eq!(engine.feed(key('-')), ComposeResult::Composing);
        assert_eq!(engine.feed(key('-')), ComposeResult::Composing);
        assert_eq!(
            engine.feed(key('-')),
            ComposeResult::Committed("—".to_string())
        );
        assert!(!engine.is_composing());
    }

    #[test]
    fn defined_dead_key_sequence_wins_over_fallback() {
        let mut engine = default_engine();
        assert_eq!(engine.feed(KEY_DEAD_TILDE), ComposeResult::Composing);
        assert_eq!(
            engine.feed(key('n')),
            ComposeResult::Committed("ñ".to_string())
        );
    }

    #[test]
    fn undefined_dead_key_sequence_falls_back_to_combining_marks() {
        // dead_macron dead_abovedot e → ė̄ (U+0117 U+0304): the marks apply
        // innermost-last, then NFC composes what it can.
        let mut engine = default_engine();
        assert_eq!(engine.feed(KEY_DEAD_MACRON), ComposeResult::Composing);
        assert_eq!(engine.feed(KEY_DEAD_ABOVEDOT), ComposeResult::Composing);
        assert_eq!(
            engine.feed(key('e')),
            ComposeResult::Committed("\u{0117}\u{0304}".to_string())
        );
    }

    #[test]
    fn dead_key_before_non_letter_is_rejected_and_prefix_kept() {
        let mut engine = default_engine();
        assert_eq!(engine.feed(KEY_DEAD_CIRCUMFLEX), ComposeResult::Composing);
        assert_eq!(engine.feed(key('5')), ComposeResult::Rejected);
        // Valid prefix preserved.
        assert_eq!(engine.prefix(), &[KEY_DEAD_CIRCUMFLEX]);
        assert_eq!(
            engine.feed(key('x')),
            ComposeResult::Committed("x\u{0302}".to_string())
        );
    }

    #[test]
    fn keypad_digits_fall_back_to_plain() {
        let mut engine = default_engine();
        assert_eq!(engine.feed(KEY_MULTI), ComposeResult::Composing);
        assert_eq!(engine.feed(Keysym(KEY_KP_0.0 + 1)), ComposeResult::Composing);
        assert_eq!(
            engine.feed(Keysym(KEY_KP_0.0 + 2)),
            ComposeResult::Committed("½".to_string())
        );
    }

    #[test]
    fn max_length_plus_one_takes_error_branch() {
        let trie = ComposeTrie::default();
        let max = trie.max_sequence_len();
        let mut engine = ComposeEngine::new(Arc::new(trie));
        // Type the longest defined sequence except its last key, then a key
        // that extends nothing.
        assert_eq!(engine.feed(KEY_MULTI), ComposeResult::Composing);
        assert_eq!(engine.feed(key('~')), ComposeResult::Composing);
        assert_eq!(engine.feed(KEY_DEAD_CIRCUMFLEX), ComposeResult::Composing);
        assert!(engine.prefix().len() < max + 1);
        assert_eq!(engine.feed(key('!')), ComposeResult::Rejected);
        assert_eq!(engine.prefix().len(), 3);
        assert_eq!(
            engine.feed(key('A')),
            ComposeResult::Committed("Ẫ".to_string())
        );
    }

    #[test]
    fn empty_result_removes_sequence() {
        let mut trie = ComposeTrie::default();
        let errors = trie.parse_str(
            "<Multi_key> <minus> <minus> <minus> : \"\"\n",
            "<test>",
            &IncludeEnv::default(),
        );
        assert!(errors.is_empty());
        assert_eq!(
            trie.walk(&[KEY_MULTI, key('-'), key('-'), key('-')]),
            Walk::Undefined
        );
        // Sibling sequences survive.
        assert_eq!(
            trie.walk(&[KEY_MULTI, key('-'), key('-'), key('.')]),
            Walk::Resolved("–".to_string())
        );
    }

    #[test]
    fn malformed_lines_reported_with_position_rest_loaded() {
        let mut trie = ComposeTrie::new();
        let text = "<Multi_key> <a> : \"x\"\n<nosuchkeyname_zz> <b> : \"y\"\nbad line\n<Multi_key> <b> : \"z\"\n";
        let errors = trie.parse_str(text, "user-compose", &IncludeEnv::default());
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("user-compose:2"));
        assert_eq!(trie.walk(&[KEY_MULTI, key('a')]), Walk::Resolved("x".into()));
        assert_eq!(trie.walk(&[KEY_MULTI, key('b')]), Walk::Resolved("z".into()));
    }

    #[test]
    fn completions_respect_available_keys_and_order() {
        let trie = ComposeTrie::default();
        let mut available: HashSet<Keysym> = ('a'..='z').map(key).collect();
        available.extend(['-', '.', '<', '>', '=', '/', '+', ':', '(', ')'].map(key));
        let completions = trie.completions(&[KEY_MULTI, key('-')], &available);
        let results: Vec<&str> = completions.iter().map(|c| c.result.as_str()).collect();
        assert!(results.contains(&"—"));
        assert!(results.contains(&"→"));
        // Not typable without digits.
        let digitless = trie.completions(&[KEY_MULTI, key('1')], &available);
        assert!(digitless.is_empty());
        // Ordering is stable: non-increasing category rank never inverts.
        for pair in completions.windows(2) {
            let a = pair[0].result.chars().next().unwrap();
            let b = pair[1].result.chars().next().unwrap();
            assert!(super::category_rank(a) <= super::category_rank(b));
        }
    }

    #[test]
    fn shorter_definition_replaces_longer() {
        let mut trie = ComposeTrie::new();
        trie.insert(&[KEY_MULTI, key('t'), key('e'), key('s'), key('t')], "😇");
        trie.insert(&[KEY_MULTI, key('t'), key('e')], "😇");
        assert_eq!(
            trie.walk(&[KEY_MULTI, key('t'), key('e')]),
            Walk::Resolved("😇".to_string())
        );
        // The longer path now resolves at the leaf with trailing junk.
        assert_eq!(
            trie.walk(&[KEY_MULTI, key('t'), key('e'), key('s')]),
            Walk::Resolved("😇".to_string())
        );
    }
}
