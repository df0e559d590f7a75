//! The live preedit: the typed tokens, the token-granular cursor, and the
//! per-input-method views derived from them.
//!
//! Views are always recomputed from scratch through the pure
//! `transliterate` path, so edits in the middle of the buffer can never
//! leave a stale automaton state behind.

use typebooster_core::keysym::Keysym;
use typebooster_core::translit::TransliterationSet;

/// One typed token: the raw key and the character it inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedToken {
    pub keyval: Keysym,
    pub ch: char,
}

/// All derived strings for the current token sequence. Every view shares
/// the same token count and cursor index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreeditViews {
    /// The priority view (or the raw string in direct mode).
    pub canonical: String,
    /// Cursor as a character offset into `canonical`.
    pub canonical_cursor: usize,
    /// One view per configured input method, priority order.
    pub views: Vec<String>,
}

/// The editable preedit buffer.
#[derive(Debug, Clone, Default)]
pub struct Preedit {
    tokens: Vec<TypedToken>,
    /// Token index the next insert goes before.
    cursor: usize,
}

impl Preedit {
    pub fn new() -> Preedit {
        Preedit::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn chars(&self) -> Vec<char> {
        self.tokens.iter().map(|t| t.ch).collect()
    }

    /// The raw typed string (no transliteration).
    pub fn raw(&self) -> String {
        self.tokens.iter().map(|t| t.ch).collect()
    }

    pub fn insert(&mut self, keyval: Keysym, ch: char) {
        self.tokens.insert(self.cursor, TypedToken { keyval, ch });
        self.cursor += 1;
    }

    /// Insert a whole string (compose result, reopened word), one token
    /// per character.
    pub fn insert_text(&mut self, text: &str) {
        for ch in text.chars() {
            self.insert(Keysym::from_char(ch), ch);
        }
    }

    /// Uppercase the first typed character in place (auto-capitalize).
    pub fn capitalize_first(&mut self) {
        if let Some(token) = self.tokens.first_mut() {
            if let Some(upper) = token.ch.to_uppercase().next() {
                token.ch = upper;
                token.keyval = Keysym::from_char(upper);
            }
        }
    }

    /// Remove the token before the cursor.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.tokens.remove(self.cursor);
        true
    }

    /// Remove the token at the cursor.
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.tokens.len() {
            return false;
        }
        self.tokens.remove(self.cursor);
        true
    }

    /// Move token-wise; false when already at the edge.
    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor >= self.tokens.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.tokens.len();
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
        self.cursor = 0;
    }

    /// Recompute every view. In direct mode the canonical string is the
    /// raw input; otherwise it is the priority method's view.
    pub fn views(&self, methods: &TransliterationSet, transliterate: bool) -> PreeditViews {
        let chars = self.chars();
        let views = methods.views(&chars);
        let canonical = if transliterate {
            views.first().cloned().unwrap_or_default()
        } else {
            self.raw()
        };
        let canonical_cursor = if self.cursor == self.tokens.len() {
            canonical.chars().count()
        } else if transliterate {
            methods
                .methods()
                .first()
                .map(|m| m.transliterate(&chars[..self.cursor]).chars().count())
                .unwrap_or(self.cursor)
        } else {
            self.cursor
        };
        PreeditViews {
            canonical,
            canonical_cursor,
            views,
        }
    }
}
