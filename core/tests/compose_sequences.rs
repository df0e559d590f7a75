//! Compose-sequence behavior through the public API: defined sequences,
//! both fallback rules, completions and overlay reload.

use std::collections::HashSet;
use std::sync::Arc;
use typebooster_core::compose::{ComposeEngine, ComposeResult, ComposeTrie, IncludeEnv, Walk};
use typebooster_core::keysym::{
    Keysym, KEY_DEAD_ABOVEDOT, KEY_DEAD_BELOWDOT, KEY_DEAD_CIRCUMFLEX, KEY_DEAD_DOUBLEGRAVE,
    KEY_DEAD_MACRON, KEY_KP_0, KEY_MULTI,
};

fn key(ch: char) -> Keysym {
    Keysym::from_char(ch)
}

fn feed_all(engine: &mut ComposeEngine, keys: &[Keysym]) -> ComposeResult {
    let mut last = ComposeResult::NotHandled;
    for keysym in keys {
        last = engine.feed(*keysym);
    }
    last
}

#[test]
fn defined_sequences_resolve() {
    let mut engine = ComposeEngine::new(Arc::new(ComposeTrie::default()));
    assert_eq!(
        feed_all(&mut engine, &[KEY_MULTI, key('.'), key('.')]),
        ComposeResult::Committed("…".to_string())
    );
    assert_eq!(
        feed_all(
            &mut engine,
            &[KEY_MULTI, key('~'), KEY_DEAD_CIRCUMFLEX, key('A')]
        ),
        ComposeResult::Committed("Ẫ".to_string())
    );
}

#[test]
fn dead_key_fallback_order_matters() {
    // The mark typed last lands innermost; NFC composes what it can.
    let mut engine = ComposeEngine::new(Arc::new(ComposeTrie::default()));
    assert_eq!(
        feed_all(&mut engine, &[KEY_DEAD_MACRON, KEY_DEAD_ABOVEDOT, key('e')]),
        ComposeResult::Committed("\u{0117}\u{0304}".to_string())
    );
    assert_eq!(
        feed_all(&mut engine, &[KEY_DEAD_ABOVEDOT, KEY_DEAD_MACRON, key('e')]),
        ComposeResult::Committed("\u{0113}\u{0307}".to_string())
    );
    // ṩ composes fully in either order.
    assert_eq!(
        feed_all(&mut engine, &[KEY_DEAD_ABOVEDOT, KEY_DEAD_BELOWDOT, key('s')]),
        ComposeResult::Committed("\u{1E69}".to_string())
    );
}

#[test]
fn fallback_applies_to_any_cased_letter() {
    let mut engine = ComposeEngine::new(Arc::new(ComposeTrie::default()));
    // Cyrillic takes combining marks just as well as Latin.
    assert_eq!(
        feed_all(&mut engine, &[KEY_DEAD_DOUBLEGRAVE, key('а')]),
        ComposeResult::Committed("\u{0430}\u{030F}".to_string())
    );
}

#[test]
fn keypad_fallback_is_symmetric() {
    let trie = Arc::new(ComposeTrie::default());
    let mut engine = ComposeEngine::new(trie.clone());
    assert_eq!(
        feed_all(
            &mut engine,
            &[KEY_MULTI, Keysym(KEY_KP_0.0 + 1), Keysym(KEY_KP_0.0 + 2)]
        ),
        ComposeResult::Committed("½".to_string())
    );

    // The reverse direction: a sequence defined on keypad keys accepts
    // the plain digits.
    let mut custom = ComposeTrie::default();
    custom.insert(&[KEY_MULTI, Keysym(KEY_KP_0.0 + 7)], "⁷");
    let mut engine = ComposeEngine::new(Arc::new(custom));
    assert_eq!(
        feed_all(&mut engine, &[KEY_MULTI, key('7')]),
        ComposeResult::Committed("⁷".to_string())
    );
}

#[test]
fn longest_sequence_plus_one_keeps_prefix() {
    let trie = ComposeTrie::default();
    let max = trie.max_sequence_len();
    assert!(max >= 4);
    let mut engine = ComposeEngine::new(Arc::new(trie));
    assert_eq!(engine.feed(KEY_MULTI), ComposeResult::Composing);
    assert_eq!(engine.feed(key('~')), ComposeResult::Composing);
    assert_eq!(engine.feed(KEY_DEAD_CIRCUMFLEX), ComposeResult::Composing);
    // A key that extends nothing is rejected; the live prefix survives.
    assert_eq!(engine.feed(key('#')), ComposeResult::Rejected);
    assert_eq!(engine.prefix().len(), 3);
    assert_eq!(engine.feed(key('A')), ComposeResult::Committed("Ẫ".to_string()));
}

#[test]
fn user_overlay_removes_and_redefines() {
    let mut trie = ComposeTrie::default();
    let errors = trie.parse_str(
        "<Multi_key> <o> <c> : \"\"\n<Multi_key> <o> <k> : \"OK\"\n",
        "user",
        &IncludeEnv::default(),
    );
    assert!(errors.is_empty());
    assert_eq!(trie.walk(&[KEY_MULTI, key('o'), key('c')]), Walk::Undefined);
    assert_eq!(
        trie.walk(&[KEY_MULTI, key('o'), key('k')]),
        Walk::Resolved("OK".to_string())
    );
    // Swapping the shared trie is how a reload publishes.
    let mut engine = ComposeEngine::new(Arc::new(ComposeTrie::default()));
    engine.set_trie(Arc::new(trie));
    assert_eq!(
        feed_all(&mut engine, &[KEY_MULTI, key('o'), key('k')]),
        ComposeResult::Committed("OK".to_string())
    );
}

#[test]
fn completions_are_typable_on_the_reported_keyboard() {
    let trie = ComposeTrie::default();
    let mut available: HashSet<Keysym> = ('a'..='z').map(key).collect();
    available.extend(('0'..='9').map(key));
    available.extend(['-', '.', '<', '>', '=', '~', '/', '+', ':', '(', ')'].map(key));
    let completions = trie.completions(&[KEY_MULTI], &available);
    assert!(!completions.is_empty());
    for completion in &completions {
        for keysym in &completion.remaining {
            let reachable = available.contains(keysym)
                || keysym
                    .keypad_to_plain()
                    .is_some_and(|plain| available.contains(&plain))
                || keysym
                    .plain_to_keypad()
                    .is_some_and(|keypad| available.contains(&keypad));
            assert!(reachable, "untypable completion {completion:?}");
        }
    }
    // Uppercase A is not available, so the Ẫ sequence is not offered.
    assert!(completions.iter().all(|c| c.result != "Ẫ"));
}
