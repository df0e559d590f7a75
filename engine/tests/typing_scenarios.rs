//! End-to-end scenarios through the assembled engine: key events in, host
//! context out. The candidate delay is zero so `pump` returns as soon as
//! the producer finishes.

use std::sync::Arc;
use std::time::Duration;
use typebooster::Engine;
use typebooster_core::config::{ConfigStore, RecordMode, Settings};
use typebooster_core::keymap::KeyEvent;
use typebooster_core::keysym::{
    Keysym, Modifiers, KEY_DEAD_ABOVEDOT, KEY_DEAD_MACRON, KEY_ESCAPE, KEY_LEFT, KEY_MULTI,
    KEY_TAB,
};
use typebooster_core::userdb::UserDb;

const PUMP: Duration = Duration::from_secs(5);

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.candidatesdelaymilliseconds = 0;
    settings
}

fn engine_with(settings: Settings) -> Engine {
    let mut engine = Engine::new(Arc::new(ConfigStore::new(settings)), UserDb::new_temp());
    engine.focus_in("test-editor");
    engine
}

fn type_text(engine: &mut Engine, text: &str) {
    for ch in text.chars() {
        let _ = engine.process_char(ch);
    }
}

fn press(engine: &mut Engine, keysym: Keysym) {
    let _ = engine.process_key(&KeyEvent::press(keysym, Modifiers::NONE));
}

#[test]
fn camel_with_emoji_mode_lists_word_before_emoji() {
    let mut config = settings();
    config.emojipredictions = true;
    let mut engine = engine_with(config);
    type_text(&mut engine, "camel");
    assert!(engine.pump(PUMP));

    let ctx = engine.context();
    assert_eq!(ctx.preedit_text, "camel");
    assert!(ctx.candidates_visible);
    let texts: Vec<&str> = ctx.candidates.iter().map(|c| c.text.as_str()).collect();
    let camel = texts.iter().position(|t| *t == "camel").expect("camel");
    if let Some(emoji) = texts.iter().position(|t| *t == "🐫") {
        assert!(camel < emoji, "word before emoji: {texts:?}");
    } else {
        // The camel emoji may have fallen off the first page; it must
        // still not outrank the word on page one.
        assert!(texts.contains(&"camel"));
    }
}

#[test]
fn hindi_and_english_views_complete_side_by_side() {
    let mut config = settings();
    config.inputmethod = vec!["hi-itrans".to_string(), "NoIME".to_string()];
    config.dictionary = vec!["hi".to_string(), "en".to_string()];
    config.pagesize = 9;
    let mut engine = engine_with(config);
    type_text(&mut engine, "guru");
    assert!(engine.pump(PUMP));

    let ctx = engine.context();
    assert_eq!(ctx.preedit_text, "गुरु");
    let texts: Vec<&str> = ctx.candidates.iter().map(|c| c.text.as_str()).collect();
    assert!(texts.contains(&"गुरु"), "{texts:?}");
    assert!(texts.contains(&"guru"), "{texts:?}");
}

#[test]
fn compose_triple_minus_commits_em_dash() {
    let mut engine = engine_with(settings());
    press(&mut engine, KEY_MULTI);
    type_text(&mut engine, "---");
    let ctx = engine.context();
    assert_eq!(ctx.commit_text, "—");
    assert!(!ctx.preedit_visible);
    assert_eq!(ctx.preedit_text, "");
}

#[test]
fn undefined_dead_key_sequence_resolves_by_fallback() {
    let mut engine = engine_with(settings());
    press(&mut engine, KEY_DEAD_MACRON);
    press(&mut engine, KEY_DEAD_ABOVEDOT);
    type_text(&mut engine, "e");
    assert_eq!(engine.context().commit_text, "\u{0117}\u{0304}");
}

#[test]
fn compose_preview_is_visible_while_composing() {
    let mut engine = engine_with(settings());
    press(&mut engine, KEY_MULTI);
    type_text(&mut engine, "-");
    let ctx = engine.context();
    assert!(ctx.preedit_visible);
    assert!(ctx.preedit_text.contains('·'));
    press(&mut engine, KEY_ESCAPE);
    assert!(!engine.context().preedit_visible);
}

#[test]
fn record_mode_correct_only_learns_dictionary_words() {
    let db = UserDb::new_temp();
    let mut config = settings();
    config.recordmode = RecordMode::Correct;
    {
        let mut engine = Engine::new(Arc::new(ConfigStore::new(config)), db.clone());
        engine.focus_in("test-editor");
        type_text(&mut engine, "teh ");
        type_text(&mut engine, "the ");
        // Dropping the engine joins the writer worker, so both commits
        // have been fully applied (or skipped) below.
    }
    assert!(!db.knows_phrase("teh"));
    assert!(db.knows_phrase("the"));
}

#[test]
fn autocommit_characters_commit_word_char_and_space() {
    let mut config = settings();
    config.autocommitcharacters = ".,".to_string();
    let mut engine = engine_with(config);
    type_text(&mut engine, "hello");
    assert_eq!(engine.context().preedit_text, "hello");
    type_text(&mut engine, ".");
    let ctx = engine.context();
    assert_eq!(ctx.commit_text, "hello. ");
    assert!(!ctx.preedit_visible);
}

#[test]
fn committed_phrases_feed_the_next_prediction() {
    let db = UserDb::new_temp();
    let config = settings();
    {
        let mut engine = Engine::new(Arc::new(ConfigStore::new(config.clone())), db.clone());
        engine.focus_in("test-editor");
        type_text(&mut engine, "hello ");
        type_text(&mut engine, "world ");
    }
    // Context chain reached the store in commit order.
    let rows = db.dump();
    let world = rows.iter().find(|row| row.phrase == "world").expect("world");
    assert_eq!(world.context1, "hello");

    let mut engine = Engine::new(Arc::new(ConfigStore::new(config)), db);
    engine.focus_in("test-editor");
    type_text(&mut engine, "wor");
    assert!(engine.pump(PUMP));
    let ctx = engine.context();
    assert_eq!(ctx.candidates.first().map(|c| c.text.as_str()), Some("world"));
    assert!(ctx.candidates[0].deletable);
}

#[test]
fn off_the_record_stops_learning_but_not_reading() {
    let db = UserDb::new_temp();
    db.record_commit("hello", "", "");
    let mut config = settings();
    config.offtherecord = true;
    {
        let mut engine = Engine::new(Arc::new(ConfigStore::new(config)), db.clone());
        engine.focus_in("test-editor");
        type_text(&mut engine, "help ");
        // Reads still work while recording is off.
        type_text(&mut engine, "hel");
        assert!(engine.pump(PUMP));
        let texts: Vec<&str> = engine
            .context()
            .candidates
            .iter()
            .map(|c| c.text.as_str())
            .collect();
        assert!(texts.contains(&"hello"), "{texts:?}");
        press(&mut engine, KEY_ESCAPE);
    }
    assert!(!db.knows_phrase("help"));
}

#[test]
fn second_keystroke_invalidates_first_candidate_job() {
    let mut config = settings();
    config.candidatesdelaymilliseconds = 100;
    let mut engine = engine_with(config);
    // Two keystrokes inside one debounce window: only the "ca" state may
    // ever be shown.
    let _ = engine.process_char('c');
    let _ = engine.process_char('a');
    assert!(engine.pump(PUMP));
    let ctx = engine.context();
    assert!(ctx
        .candidates
        .iter()
        .all(|c| c.text.to_lowercase().starts_with("ca")));
    assert_eq!(ctx.preedit_text, "ca");
}

#[test]
fn cursor_left_at_start_is_a_no_op() {
    let mut engine = engine_with(settings());
    type_text(&mut engine, "hi");
    press(&mut engine, KEY_LEFT);
    press(&mut engine, KEY_LEFT);
    // Cursor is at token 0; one more left must not commit or clear.
    press(&mut engine, KEY_LEFT);
    let ctx = engine.context();
    assert_eq!(ctx.preedit_text, "hi");
    assert_eq!(ctx.preedit_cursor, 0);
    assert!(ctx.commit_text.is_empty());
}

#[test]
fn trigger_character_alone_yields_no_candidates() {
    let mut engine = engine_with(settings());
    type_text(&mut engine, "_");
    // Nothing to produce; pump times out quickly with no list shown.
    engine.pump(Duration::from_millis(200));
    assert!(!engine.context().candidates_visible);
}

#[test]
fn reopen_preedit_restores_last_committed_word() {
    let mut engine = engine_with(settings());
    type_text(&mut engine, "hello ");
    assert_eq!(engine.context().commit_text, "hello ");
    engine.set_surrounding_text("hello", 5, 5);
    press(&mut engine, KEY_LEFT);
    let ctx = engine.context();
    assert_eq!(ctx.delete_surrounding, Some((-5, 5)));
    assert_eq!(ctx.preedit_text, "hello");
}

#[test]
fn reopen_is_a_silent_no_op_on_unreliable_surrounding_text() {
    let mut engine = engine_with(settings());
    type_text(&mut engine, "hello ");
    // The surrounding text does not show the word we committed.
    engine.set_surrounding_text("xyzzy", 5, 5);
    press(&mut engine, KEY_LEFT);
    let ctx = engine.context();
    assert_eq!(ctx.delete_surrounding, None);
    assert!(!ctx.preedit_visible);
}

#[test]
fn no_reopen_before_first_commit_in_focus_session() {
    let mut engine = engine_with(settings());
    engine.set_surrounding_text("hello", 5, 5);
    press(&mut engine, KEY_LEFT);
    assert_eq!(engine.context().delete_surrounding, None);
}

#[test]
fn tab_enables_lookup_then_navigates() {
    let mut config = settings();
    config.tabenable = true;
    let mut engine = engine_with(config);
    type_text(&mut engine, "tre");
    assert!(engine.pump(PUMP));
    // With tabenable the table stays hidden until requested.
    assert!(!engine.context().candidates_visible);
    press(&mut engine, KEY_TAB);
    assert!(engine.pump(PUMP));
    assert!(engine.context().candidates_visible);
    // Now Tab navigates.
    press(&mut engine, KEY_TAB);
    assert_eq!(engine.context().candidate_cursor, Some(0));
}

#[test]
fn digit_commits_visible_candidate() {
    let mut engine = engine_with(settings());
    type_text(&mut engine, "tre");
    assert!(engine.pump(PUMP));
    let first = engine.context().candidates[0].text.clone();
    type_text(&mut engine, "1");
    let ctx = engine.context();
    assert_eq!(ctx.commit_text, first);
    assert!(!ctx.preedit_visible);
}

#[test]
fn auto_capitalize_after_sentence_terminator() {
    let mut config = settings();
    config.autocapitalize = true;
    let mut engine = engine_with(config);
    type_text(&mut engine, "done. ");
    assert_eq!(engine.context().commit_text, "done. ");
    type_text(&mut engine, "h");
    assert_eq!(engine.context().preedit_text, "H");
}

#[test]
fn focus_out_commits_pending_preedit() {
    let mut engine = engine_with(settings());
    type_text(&mut engine, "pending");
    engine.focus_out();
    assert_eq!(engine.context().commit_text, "pending");
}
