//! Emoji index behavior through the public API, mirrored on the kinds of
//! queries the candidate engine sends.

use typebooster_core::emoji::{EmojiIndex, EmojiQueryOptions};

fn sequences(index: &EmojiIndex, query: &str) -> Vec<String> {
    index
        .matches(query, EmojiQueryOptions::default())
        .into_iter()
        .map(|hit| hit.entry.sequence.clone())
        .collect()
}

#[test]
fn single_keyword_queries() {
    let index = EmojiIndex::builtin();
    assert!(sequences(index, "camel").contains(&"🐫".to_string()));
    assert!(sequences(index, "pizza").contains(&"🍕".to_string()));
    assert!(sequences(index, "halo").contains(&"😇".to_string()));
}

#[test]
fn multi_word_names_match_in_any_order() {
    let index = EmojiIndex::builtin();
    let a = sequences(index, "birthday cake");
    let b = sequences(index, "cake birthday");
    assert!(a.contains(&"🎂".to_string()));
    assert_eq!(a.first(), b.first());
}

#[test]
fn german_names_and_accent_folding() {
    let index = EmojiIndex::builtin();
    assert!(sequences(index, "kamel").contains(&"🐫".to_string()));
    assert!(sequences(index, "Kamel").contains(&"🐫".to_string()));
}

#[test]
fn scores_decrease_monotonically() {
    let index = EmojiIndex::builtin();
    let matches = index.matches("face", EmojiQueryOptions { limit: 50, ..Default::default() });
    for pair in matches.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}

#[test]
fn related_finds_shared_category_members() {
    let index = EmojiIndex::builtin();
    let related: Vec<String> = index
        .related("🍕")
        .into_iter()
        .map(|hit| hit.entry.sequence.clone())
        .collect();
    // Shares the food keyword/category with the mango and the cake.
    assert!(related.contains(&"🥭".to_string()));
    assert!(!related.contains(&"🍕".to_string()));
}

#[test]
fn skin_tone_variants_enumerate_modifiers() {
    let index = EmojiIndex::builtin();
    let variants = index.skin_tone_variants("👋");
    assert_eq!(variants.len(), 5);
    assert!(variants[0].starts_with("👋"));
    assert!(variants[0].contains('\u{1F3FB}'));
}

#[test]
fn unicode_codepoint_queries_are_four_to_six_hex_digits() {
    let index = EmojiIndex::builtin();
    assert_eq!(
        index.codepoint_match("2014").map(|(text, _)| text),
        Some("—".to_string())
    );
    assert_eq!(
        index.codepoint_match("1F3FB").map(|(text, _)| text),
        Some("\u{1F3FB}".to_string())
    );
    assert!(index.codepoint_match("123").is_none());
    assert!(index.codepoint_match("1234567").is_none());
    assert!(index.codepoint_match("12g4").is_none());
}
