//! Raw key events, semantic commands and the keybinding table.
//!
//! `KeyMap` is a pure translation step: a `KeyEvent` plus the configured
//! bindings yield zero or more `Command`s. All stateful interpretation
//! (digit shortcuts only while a lookup table is visible, Tab precedence,
//! shift case-mode toggling via press/release pairs) is resolved here from
//! a small context snapshot the controller passes in; the keymap itself
//! holds no mutable state.

use crate::error::Error;
use crate::keysym::{self, Keysym, Modifiers};
use std::collections::HashMap;
use std::fmt;

/// A raw key event as delivered by the host. Immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Hardware keycode; opaque to the engine, echoed back on forwarding.
    pub code: u16,
    pub keyval: Keysym,
    pub modifiers: Modifiers,
    pub is_release: bool,
    /// Set when the event was re-injected by the engine itself.
    pub is_forwarded: bool,
}

impl KeyEvent {
    pub fn press(keyval: Keysym, modifiers: Modifiers) -> Self {
        KeyEvent {
            code: 0,
            keyval,
            modifiers,
            is_release: false,
            is_forwarded: false,
        }
    }

    pub fn release(keyval: Keysym, modifiers: Modifiers) -> Self {
        KeyEvent {
            code: 0,
            keyval,
            modifiers,
            is_release: true,
            is_forwarded: false,
        }
    }

    pub fn from_char(ch: char) -> Self {
        KeyEvent::press(Keysym::from_char(ch), Modifiers::NONE)
    }

    /// The character this event would insert, if it is a plain insert.
    pub fn insert_char(&self) -> Option<char> {
        if self.modifiers.contains(Modifiers::CONTROL) || self.modifiers.contains(Modifiers::ALT) {
            return None;
        }
        self.keyval.to_char().filter(|ch| !ch.is_control())
    }
}

/// Semantic commands a key event can translate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    InsertRaw,
    Backspace,
    Delete,
    CursorLeft,
    CursorRight,
    CommitPreedit,
    /// Commit the Nth candidate of the visible page (1-based).
    CommitCandidate(u8),
    Cancel,
    SelectNext,
    SelectPrevious,
    PageUp,
    PageDown,
    EnableLookup,
    ToggleEmoji,
    ToggleOffTheRecord,
    LookupRelated,
    ToggleInputMode,
    ToggleCaseMode,
    NextInputMethod,
    PreviousInputMethod,
    ReopenPreedit,
}

impl Command {
    /// All commands that can appear in the keybinding configuration.
    pub const ALL: &'static [Command] = &[
        Command::Backspace,
        Command::Delete,
        Command::CursorLeft,
        Command::CursorRight,
        Command::CommitPreedit,
        Command::Cancel,
        Command::SelectNext,
        Command::SelectPrevious,
        Command::PageUp,
        Command::PageDown,
        Command::EnableLookup,
        Command::ToggleEmoji,
        Command::ToggleOffTheRecord,
        Command::LookupRelated,
        Command::ToggleInputMode,
        Command::ToggleCaseMode,
        Command::NextInputMethod,
        Command::PreviousInputMethod,
        Command::ReopenPreedit,
    ];

    pub fn config_name(self) -> &'static str {
        match self {
            Command::InsertRaw => "insert_raw",
            Command::Backspace => "backspace",
            Command::Delete => "delete",
            Command::CursorLeft => "cursor_left",
            Command::CursorRight => "cursor_right",
            Command::CommitPreedit => "commit_preedit",
            Command::CommitCandidate(_) => "commit_candidate",
            Command::Cancel => "cancel",
            Command::SelectNext => "select_next_candidate",
            Command::SelectPrevious => "select_previous_candidate",
            Command::PageUp => "lookup_table_page_up",
            Command::PageDown => "lookup_table_page_down",
            Command::EnableLookup => "enable_lookup",
            Command::ToggleEmoji => "toggle_emoji_prediction",
            Command::ToggleOffTheRecord => "toggle_off_the_record",
            Command::LookupRelated => "lookup_related",
            Command::ToggleInputMode => "toggle_input_mode_on_off",
            Command::ToggleCaseMode => "toggle_case_mode",
            Command::NextInputMethod => "next_input_method",
            Command::PreviousInputMethod => "previous_input_method",
            Command::ReopenPreedit => "reopen_preedit",
        }
    }

    pub fn from_config_name(name: &str) -> Option<Command> {
        Command::ALL
            .iter()
            .copied()
            .find(|c| c.config_name() == name)
    }
}

/// A key combination in a binding: modifiers plus a keysym.
///
/// Combos on bare modifier keys (`Shift_L`) match on the release event,
/// provided the previous press was the same key (no key in between).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub modifiers: Modifiers,
    pub keysym: Keysym,
}

impl KeyCombo {
    /// Parse a combo string like `Control+comma` or `Shift+Tab`.
    pub fn parse(text: &str) -> Result<KeyCombo, Error> {
        let mut modifiers = Modifiers::NONE;
        let mut keysym = None;
        let parts: Vec<&str> = text.split('+').collect();
        for (index, part) in parts.iter().enumerate() {
            if index + 1 < parts.len() {
                match Modifiers::from_name(part) {
                    Some(m) => modifiers = modifiers | m,
                    None => {
                        return Err(Error::malformed(
                            "keybindings",
                            0,
                            format!("unknown modifier {part:?} in {text:?}"),
                        ))
                    }
                }
            } else {
                keysym = Keysym::from_name(part);
                if keysym.is_none() {
                    return Err(Error::malformed(
                        "keybindings",
                        0,
                        format!("unknown keysym {part:?} in {text:?}"),
                    ));
                }
            }
        }
        match keysym {
            Some(keysym) => Ok(KeyCombo { modifiers, keysym }),
            None => Err(Error::malformed("keybindings", 0, "empty key combination")),
        }
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.contains(Modifiers::CONTROL) {
            write!(f, "Control+")?;
        }
        if self.modifiers.contains(Modifiers::ALT) {
            write!(f, "Alt+")?;
        }
        if self.modifiers.contains(Modifiers::SHIFT) {
            write!(f, "Shift+")?;
        }
        if self.modifiers.contains(Modifiers::SUPER) {
            write!(f, "Super+")?;
        }
        write!(f, "{}", self.keysym)
    }
}

/// Snapshot of controller state the translation depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslateContext {
    /// A candidate lookup table is currently shown.
    pub candidates_visible: bool,
    /// There is a non-empty preedit.
    pub preedit_open: bool,
    /// Keysym of the previous press event, for modifier-release matching.
    pub previous_press: Option<Keysym>,
}

/// The keybinding table: command → set of combos.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: HashMap<Command, Vec<KeyCombo>>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut table = KeyBindings {
            bindings: HashMap::new(),
        };
        let defaults: &[(Command, &[&str])] = &[
            (Command::Backspace, &["BackSpace"]),
            (Command::Delete, &["Delete"]),
            (Command::CursorLeft, &["Left"]),
            (Command::CursorRight, &["Right"]),
            (Command::CommitPreedit, &["Return", "KP_Enter"]),
            (Command::Cancel, &["Escape"]),
            (Command::SelectNext, &["Tab", "Down"]),
            (Command::SelectPrevious, &["Shift+Tab", "Up"]),
            (Command::PageUp, &["Page_Up"]),
            (Command::PageDown, &["Page_Down"]),
            (Command::EnableLookup, &["Tab"]),
            (Command::ToggleEmoji, &["Control+period"]),
            (Command::ToggleOffTheRecord, &["Control+Shift+o"]),
            (Command::LookupRelated, &["Control+r"]),
            (Command::ToggleInputMode, &["Control+space"]),
            (Command::ToggleCaseMode, &["Shift_L"]),
            (Command::NextInputMethod, &["Control+Down"]),
            (Command::PreviousInputMethod, &["Control+Up"]),
        ];
        for (command, combos) in defaults {
            let parsed = combos
                .iter()
                .map(|c| KeyCombo::parse(c).expect("default binding parses"))
                .collect();
            table.bindings.insert(*command, parsed);
        }
        table
    }
}

impl KeyBindings {
    /// Build a table from configuration strings. Unknown commands and
    /// unparsable combos are collected as errors; valid entries still load.
    /// Commands absent from `config` keep their defaults; a command mapped
    /// to an empty list is disabled.
    pub fn from_config(config: &HashMap<String, Vec<String>>) -> (KeyBindings, Vec<Error>) {
        let mut table = KeyBindings::default();
        let mut errors = Vec::new();
        for (name, combos) in config {
            let Some(command) = Command::from_config_name(name) else {
                errors.push(Error::malformed(
                    "keybindings",
                    0,
                    format!("unknown command {name:?}"),
                ));
                continue;
            };
            let mut parsed = Vec::new();
            for combo in combos {
                match KeyCombo::parse(combo) {
                    Ok(c) => parsed.push(c),
                    Err(e) => errors.push(e),
                }
            }
            table.bindings.insert(command, parsed);
        }
        (table, errors)
    }

    pub fn combos(&self, command: Command) -> &[KeyCombo] {
        self.bindings
            .get(&command)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn set(&mut self, command: Command, combos: Vec<KeyCombo>) {
        self.bindings.insert(command, combos);
    }

    fn matches(&self, command: Command, event: &KeyEvent, ctx: &TranslateContext) -> bool {
        self.combos(command).iter().any(|combo| {
            if combo.keysym.is_modifier_key() {
                // Bare modifier combos fire on release, and only when the
                // press immediately before was the same key.
                event.is_release
                    && event.keyval == combo.keysym
                    && ctx.previous_press == Some(combo.keysym)
            } else {
                !event.is_release
                    && event.keyval == combo.keysym
                    && event.modifiers.binding_relevant() == combo.modifiers.binding_relevant()
            }
        })
    }
}

/// Pure keysym+modifier → command translation.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    bindings: KeyBindings,
}

impl KeyMap {
    pub fn new(bindings: KeyBindings) -> Self {
        KeyMap { bindings }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Translate one event into semantic commands.
    ///
    /// Returns an empty list when the event means nothing under the current
    /// bindings (the caller then treats printable presses as `InsertRaw`
    /// and forwards the rest).
    pub fn translate(&self, event: &KeyEvent, ctx: &TranslateContext) -> Vec<Command> {
        let mut commands = Vec::new();

        // Digit keys commit candidates only while a lookup table is shown;
        // otherwise they are ordinary input.
        if !event.is_release && ctx.candidates_visible {
            if let Some(ch) = event.keyval.to_char() {
                if let Some(digit) = ch.to_digit(10) {
                    if (1..=9).contains(&digit) && event.modifiers.binding_relevant().is_empty() {
                        return vec![Command::CommitCandidate(digit as u8)];
                    }
                }
            }
            if let Some(plain) = event.keyval.keypad_to_plain() {
                if let Some(digit) = plain.to_char().and_then(|ch| ch.to_digit(10)) {
                    if (1..=9).contains(&digit) {
                        return vec![Command::CommitCandidate(digit as u8)];
                    }
                }
            }
        }

        for command in Command::ALL {
            if self.bindings.matches(*command, event, ctx) {
                commands.push(*command);
            }
        }

        // A key bound to both lookup enabling and candidate navigation
        // resolves by visibility: without a lookup table the key requests
        // one, with a table shown it navigates.
        if commands.contains(&Command::EnableLookup) {
            if ctx.candidates_visible {
                commands.retain(|c| *c != Command::EnableLookup);
            } else {
                commands.retain(|c| {
                    !matches!(
                        c,
                        Command::SelectNext | Command::SelectPrevious | Command::CommitPreedit
                    )
                });
            }
        }

        // Dead keys and the compose key are inserts too: the compose
        // engine consumes them ahead of the preedit.
        let compose_key = event.keyval.is_dead_key() || event.keyval == keysym::KEY_MULTI;
        if !event.is_release
            && commands.is_empty()
            && (event.insert_char().is_some() || compose_key)
        {
            commands.push(Command::InsertRaw);
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keysym::{KEY_SHIFT_L, KEY_TAB};

    fn ctx(candidates_visible: bool) -> TranslateContext {
        TranslateContext {
            candidates_visible,
            preedit_open: true,
            previous_press: None,
        }
    }

    #[test]
    fn tab_prefers_lookup_until_visible() {
        let keymap = KeyMap::default();
        let tab = KeyEvent::press(KEY_TAB, Modifiers::NONE);
        assert_eq!(keymap.translate(&tab, &ctx(false)), vec![Command::EnableLookup]);
        assert_eq!(keymap.translate(&tab, &ctx(true)), vec![Command::SelectNext]);
    }

    #[test]
    fn digits_commit_only_with_visible_candidates() {
        let keymap = KeyMap::default();
        let three = KeyEvent::from_char('3');
        assert_eq!(
            keymap.translate(&three, &ctx(true)),
            vec![Command::CommitCandidate(3)]
        );
        assert_eq!(keymap.translate(&three, &ctx(false)), vec![Command::InsertRaw]);
    }

    #[test]
    fn shift_release_pairs_toggle_case_mode() {
        let keymap = KeyMap::default();
        let release = KeyEvent::release(KEY_SHIFT_L, Modifiers::SHIFT);
        let mut context = ctx(false);
        // Release without a matching previous press: nothing.
        assert!(keymap.translate(&release, &context).is_empty());
        context.previous_press = Some(KEY_SHIFT_L);
        assert_eq!(
            keymap.translate(&release, &context),
            vec![Command::ToggleCaseMode]
        );
    }

    #[test]
    fn unknown_keysym_in_config_is_reported_not_fatal() {
        let mut config = HashMap::new();
        config.insert(
            "cancel".to_string(),
            vec!["Escape".to_string(), "NoSuchKeyXyz+".to_string()],
        );
        let (table, errors) = KeyBindings::from_config(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(table.combos(Command::Cancel).len(), 1);
    }

    #[test]
    fn command_may_be_disabled_with_empty_set() {
        let mut config = HashMap::new();
        config.insert("enable_lookup".to_string(), Vec::new());
        let (table, errors) = KeyBindings::from_config(&config);
        assert!(errors.is_empty());
        let keymap = KeyMap::new(table);
        let tab = KeyEvent::press(KEY_TAB, Modifiers::NONE);
        // Tab now only navigates.
        assert_eq!(keymap.translate(&tab, &ctx(false)), vec![Command::SelectNext]);
    }
}
