//! Candidate production: the merge ladder over the user database, the
//! dictionaries and the emoji index.
//!
//! Scores are banded so that the global sort respects the source priority
//! the sources themselves imply: learned phrases land in `1.0 +
//! user-score`, dictionary completions just under `0`, spell corrections
//! below them, emoji and symbols at the bottom. Within a band the source's
//! own ordering survives.

use std::sync::{Arc, Mutex};
use typebooster_core::candidate::{merge_and_rank, Candidate, CandidateSource};
use typebooster_core::config::Settings;
use typebooster_core::dictionary::Dictionaries;
use typebooster_core::emoji::{EmojiIndex, EmojiQueryOptions};
use typebooster_core::userdb::UserDb;

/// Upper bound on the produced list; pagination shows at most a handful of
/// pages anyway.
const MAX_CANDIDATES: usize = 40;

/// Inputs of one production run; a snapshot, so it can cross the worker
/// thread boundary.
#[derive(Debug, Clone)]
pub struct ProduceRequest {
    /// All transliteration views of the preedit, priority order; the
    /// first entry is the canonical view.
    pub views: Vec<String>,
    pub context1: String,
    pub context2: String,
    /// Emoji lookup is on (mode enabled or trigger character present).
    pub emoji_mode: bool,
    /// The user explicitly asked for the lookup table; overrides the
    /// minimum-length gate.
    pub lookup_requested: bool,
    pub settings: Arc<Settings>,
}

/// The shared read-side stores candidate production runs against.
#[derive(Clone)]
pub struct CandidateEngine {
    pub user_db: UserDb,
    pub dictionaries: Arc<Mutex<Dictionaries>>,
    pub emoji: &'static EmojiIndex,
}

impl CandidateEngine {
    pub fn new(user_db: UserDb, dictionaries: Dictionaries) -> CandidateEngine {
        CandidateEngine {
            user_db,
            dictionaries: Arc::new(Mutex::new(dictionaries)),
            emoji: EmojiIndex::builtin(),
        }
    }

    /// Strip leading/trailing trigger characters; `Some` when one was
    /// present (forcing emoji lookup).
    fn strip_trigger<'a>(&self, view: &'a str, triggers: &str) -> Option<&'a str> {
        if triggers.is_empty() || view.is_empty() {
            return None;
        }
        let is_trigger = |c: char| triggers.contains(c);
        let stripped = view
            .trim_start_matches(is_trigger)
            .trim_end_matches(is_trigger);
        (stripped.len() != view.len()).then_some(stripped)
    }

    /// Run the ladder and return the merged, ranked list.
    pub fn produce(&self, request: &ProduceRequest) -> Vec<Candidate> {
        let settings = &request.settings;
        let min_chars = settings.mincharcomplete as usize;
        let page_size = settings.pagesize as usize;

        let views: Vec<&str> = {
            let mut seen = Vec::new();
            for view in &request.views {
                if !view.is_empty() && !seen.contains(&view.as_str()) {
                    seen.push(view.as_str());
                }
            }
            seen
        };
        if views.is_empty() {
            return Vec::new();
        }

        // Trigger characters force emoji lookup even with the mode off.
        let mut emoji_queries: Vec<String> = Vec::new();
        let mut emoji_forced = false;
        for view in &views {
            if let Some(stripped) = self.strip_trigger(view, &settings.emojitriggercharacters) {
                emoji_forced = true;
                if !stripped.is_empty() {
                    emoji_queries.push(stripped.to_string());
                }
            } else if request.emoji_mode {
                emoji_queries.push((*view).to_string());
            }
        }

        let long_enough = views
            .iter()
            .any(|view| view.chars().count() >= min_chars);
        if !long_enough && !request.lookup_requested && !emoji_forced {
            return Vec::new();
        }

        let mut out: Vec<Candidate> = Vec::new();

        // 1. The learned store, every view.
        for view in &views {
            for (phrase, score) in
                self.user_db
                    .lookup(view, &request.context1, &request.context2)
            {
                out.push(Candidate::new(phrase, CandidateSource::UserDb, 1.0 + score));
            }
        }

        // 2. Dictionary completions once the learned store runs short.
        let mut dictionaries = self.dictionaries.lock().expect("dictionaries lock");
        if out.len() < page_size * 2 {
            for view in &views {
                for word in dictionaries.lookup(view) {
                    let length_penalty = word.chars().count() as f64 * 1e-3;
                    out.push(Candidate::new(
                        word,
                        CandidateSource::Dictionary,
                        -length_penalty,
                    ));
                }
            }
        }

        // 3. Spell corrections if still short.
        if out.len() < page_size * 2 {
            for view in &views {
                for (word, score) in dictionaries.suggest(view) {
                    if score < 0 {
                        out.push(Candidate::new(
                            word,
                            CandidateSource::Spellcheck,
                            -0.5 + f64::from(score) * 0.01,
                        ));
                    }
                }
            }
        }
        drop(dictionaries);

        // 4. Emoji, symbols and code points.
        let emoji_options = EmojiQueryOptions {
            limit: 20,
            include_all_versions: settings.unicodedataall,
        };
        for query in &emoji_queries {
            for hit in self.emoji.matches(query, emoji_options) {
                out.push(
                    Candidate::new(
                        hit.entry.sequence.clone(),
                        CandidateSource::Emoji,
                        -2.0 + hit.score as f64 * 1e-4,
                    )
                    .with_annotation(hit.entry.name()),
                );
            }
            if let Some((text, annotation)) = self.emoji.codepoint_match(query) {
                out.push(
                    Candidate::new(text, CandidateSource::Emoji, -1.51)
                        .with_annotation(annotation),
                );
            }
        }

        // 5./6. Dedup by text, sort by score then source priority.
        let mut merged = merge_and_rank(out);
        merged.truncate(MAX_CANDIDATES);
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(views: &[&str], settings: Settings) -> ProduceRequest {
        ProduceRequest {
            views: views.iter().map(|s| s.to_string()).collect(),
            context1: String::new(),
            context2: String::new(),
            emoji_mode: settings.emojipredictions,
            lookup_requested: false,
            settings: Arc::new(settings),
        }
    }

    fn engine() -> CandidateEngine {
        CandidateEngine::new(
            UserDb::new_temp(),
            Dictionaries::new(&["en".to_string()], Vec::new()),
        )
    }

    #[test]
    fn camel_word_outranks_camel_emoji() {
        let engine = engine();
        let mut settings = Settings::default();
        settings.emojipredictions = true;
        let candidates = engine.produce(&request(&["camel"], settings));
        let camel = candidates.iter().position(|c| c.text == "camel").unwrap();
        let emoji = candidates.iter().position(|c| c.text == "🐫").unwrap();
        assert!(camel < emoji, "word before emoji: {candidates:?}");
        assert_eq!(candidates[camel].source, CandidateSource::Dictionary);
    }

    #[test]
    fn learned_phrase_ranks_first() {
        let engine = engine();
        engine.user_db.record_commit("camels", "", "");
        let mut settings = Settings::default();
        settings.emojipredictions = true;
        let candidates = engine.produce(&request(&["camel"], settings));
        assert_eq!(candidates[0].text, "camels");
        assert_eq!(candidates[0].source, CandidateSource::UserDb);
    }

    #[test]
    fn transliterated_and_raw_views_both_complete() {
        let engine = CandidateEngine::new(
            UserDb::new_temp(),
            Dictionaries::new(&["en".to_string(), "hi".to_string()], Vec::new()),
        );
        let candidates = engine.produce(&request(&["गुरु", "guru"], Settings::default()));
        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        assert!(texts.contains(&"गुरु"), "{texts:?}");
        assert!(texts.contains(&"guru"), "{texts:?}");
    }

    #[test]
    fn trigger_character_forces_emoji() {
        let engine = engine();
        let settings = Settings::default();
        assert!(!settings.emojipredictions);
        let candidates = engine.produce(&request(&["camel_"], settings));
        assert!(candidates.iter().any(|c| c.text == "🐫"));
    }

    #[test]
    fn trigger_character_alone_yields_nothing() {
        let engine = engine();
        let candidates = engine.produce(&request(&["_"], Settings::default()));
        assert!(candidates.is_empty());
    }

    #[test]
    fn codepoint_query_matches_single_char() {
        let engine = engine();
        let mut settings = Settings::default();
        settings.emojipredictions = true;
        let candidates = engine.produce(&request(&["2014"], settings));
        let dash = candidates.iter().find(|c| c.text == "—").unwrap();
        assert_eq!(dash.annotation.as_deref(), Some("U+2014"));
    }

    #[test]
    fn below_min_chars_produces_nothing() {
        let engine = engine();
        let mut settings = Settings::default();
        settings.mincharcomplete = 3;
        let candidates = engine.produce(&request(&["ca"], settings.clone()));
        assert!(candidates.is_empty());
        // Unless the lookup was explicitly requested.
        let mut explicit = request(&["ca"], settings);
        explicit.lookup_requested = true;
        assert!(!engine.produce(&explicit).is_empty());
    }
}
