//! typebooster-core
//!
//! Core subsystems of the typebooster predictive input engine, shared by
//! the engine crate and by tooling:
//!
//! - `keysym` / `keymap` - raw key events, keysyms, semantic commands
//! - `compose` - dead-key/compose sequences with fallbacks and completions
//! - `translit` - input-method automata (pass-through, ITRANS Devanagari)
//! - `dictionary` - locale word lists: completion, spellcheck, corrections
//! - `emoji` - the emoji/symbol index with fuzzy lookup
//! - `userdb` - the persistent learning store with context and decay
//! - `candidate` - scored candidates and the paginated lookup table
//! - `config` - the option schema, TOML persistence, hot-reload store
//!
//! Nothing here talks to a host input-method framework; the engine crate
//! owns the event loop and the host surface.

pub mod candidate;
pub use candidate::{merge_and_rank, Candidate, CandidateList, CandidateSource};

pub mod compose;
pub use compose::{ComposeEngine, ComposeResult, ComposeTrie, Completion, IncludeEnv};

pub mod config;
pub use config::{
    AutoSelect, AutoSetting, ConfigStore, InlineCompletion, OptionKind, OptionSpec, RecordMode,
    Settings, SCHEMA,
};

pub mod dictionary;
pub use dictionary::{Dictionaries, Dictionary};

pub mod emoji;
pub use emoji::{EmojiEntry, EmojiIndex, EmojiMatch, EmojiQueryOptions};

pub mod error;
pub use error::{Error, Result};

pub mod keymap;
pub use keymap::{Command, KeyBindings, KeyCombo, KeyEvent, KeyMap, TranslateContext};

pub mod keysym;
pub use keysym::{Keysym, Modifiers};

pub mod translit;
pub use translit::{TransliterationSet, Transliterator, MAX_INPUT_METHODS, NO_IME};

pub mod userdb;
pub use userdb::{score, ScoreInputs, UserDb, UserDbEntry};

/// Unicode helpers shared by several subsystems.
pub mod utils {
    use unicode_normalization::char::is_combining_mark;
    use unicode_normalization::UnicodeNormalization;

    /// NFC-normalize and trim.
    pub fn normalize(s: &str) -> String {
        s.nfc().collect::<String>().trim().to_string()
    }

    /// Accent folding for matching: NFKD, strip combining marks,
    /// lowercase. The folded form is only ever used as a lookup key; the
    /// original string is what gets displayed or committed.
    pub fn fold(s: &str) -> String {
        s.nfkd()
            .filter(|ch| !is_combining_mark(*ch))
            .flat_map(char::to_lowercase)
            .collect()
    }

    /// Does this text end a sentence (for auto-capitalization)?
    pub fn ends_sentence(s: &str) -> bool {
        matches!(
            s.trim_end().chars().last(),
            Some('.') | Some('!') | Some('?') | Some('…') | Some('。') | Some('？') | Some('！')
        )
    }

}
