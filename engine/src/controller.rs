//! The preedit controller: the state machine that turns translated
//! commands into preedit edits, commits, candidate navigation and host
//! updates.
//!
//! The controller is synchronous and side-effect free toward the outside
//! world: everything it wants done asynchronously (candidate production,
//! database writes) comes back as [`Effect`]s for the engine to dispatch.

use crate::host::{DisplayCandidate, HostContext, SurroundingText};
use crate::preedit::Preedit;
use tracing::debug;
use typebooster_core::candidate::{Candidate, CandidateList, CandidateSource};
use typebooster_core::compose::{ComposeEngine, ComposeResult, ComposeTrie};
use typebooster_core::config::{AutoSelect, InlineCompletion, Settings};
use typebooster_core::keymap::{Command, KeyBindings, KeyEvent, KeyMap, TranslateContext};
use typebooster_core::keysym::Keysym;
use typebooster_core::translit::TransliterationSet;
use typebooster_core::utils;

/// First-candidate score above which an inline completion is offered.
const INLINE_CONFIDENCE: f64 = -0.4;

/// Whether the engine consumed the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    Handled,
    NotHandled,
}

/// Asynchronous work requested by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// (Re)start debounced candidate production for the current preedit.
    ScheduleCandidates {
        views: Vec<String>,
        context1: String,
        context2: String,
        emoji_mode: bool,
        lookup_requested: bool,
    },
    /// Invalidate any in-flight production.
    CancelCandidates,
    /// Record a commit in the learning store (record-mode gate applies at
    /// the dispatch site).
    Record {
        phrase: String,
        context1: String,
        context2: String,
    },
    /// Remove a phrase from the learning store.
    Forget {
        phrase: String,
        context1: String,
        context2: String,
    },
    /// Fill the lookup table with emoji related to `target`.
    LookupRelated { target: String },
}

/// One commit as remembered by the action log: enough to undo it (reopen
/// the text, roll the context window back).
#[derive(Debug, Clone, PartialEq)]
struct CommitAction {
    text: String,
    context1_before: String,
    context2_before: String,
}

/// Commits the action log remembers; one is enough for reopening, a few
/// more keep the context rollback exact across repeated reopens.
const ACTION_LOG_LIMIT: usize = 10;

/// Commit-time case transformation, cycled by the case-mode command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMode {
    #[default]
    Original,
    Capitalize,
    Upper,
    Lower,
}

impl CaseMode {
    fn next(self) -> CaseMode {
        match self {
            CaseMode::Original => CaseMode::Capitalize,
            CaseMode::Capitalize => CaseMode::Upper,
            CaseMode::Upper => CaseMode::Lower,
            CaseMode::Lower => CaseMode::Original,
        }
    }

    fn apply(self, text: &str) -> String {
        match self {
            CaseMode::Original => text.to_string(),
            CaseMode::Capitalize => {
                let mut chars = text.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            }
            CaseMode::Upper => text.to_uppercase(),
            CaseMode::Lower => text.to_lowercase(),
        }
    }
}

/// The live preedit state machine. Empty preedit ⇔ the Empty state.
pub struct PreeditController {
    keymap: KeyMap,
    compose: ComposeEngine,
    translit: TransliterationSet,
    preedit: Preedit,
    candidates: CandidateList,
    lookup_visible: bool,
    lookup_requested: bool,
    inline_text: Option<String>,
    context1: String,
    context2: String,
    previous_press: Option<Keysym>,
    case_mode: CaseMode,
    /// Transliteration on (true) or direct typing (false).
    input_mode: bool,
    emoji_mode: bool,
    off_the_record: bool,
    commits_in_session: u32,
    surrounding: Option<SurroundingText>,
    /// Reopening is blocked for this focus (terminal, password input,
    /// inconsistent surrounding text).
    reopen_blocked: bool,
    /// Recent commits, newest last.
    action_log: Vec<CommitAction>,
}

impl PreeditController {
    pub fn new(settings: &Settings, compose_trie: std::sync::Arc<ComposeTrie>) -> Self {
        let (bindings, binding_errors) = KeyBindings::from_config(&settings.keybindings);
        for error in &binding_errors {
            debug!(%error, "keybinding skipped");
        }
        let (translit, translit_errors) = TransliterationSet::from_names(&settings.inputmethod);
        for error in &translit_errors {
            debug!(%error, "input method skipped");
        }
        PreeditController {
            keymap: KeyMap::new(bindings),
            compose: ComposeEngine::new(compose_trie),
            translit,
            preedit: Preedit::new(),
            candidates: CandidateList::with_page_size(settings.pagesize as usize),
            lookup_visible: false,
            lookup_requested: false,
            inline_text: None,
            context1: String::new(),
            context2: String::new(),
            previous_press: None,
            case_mode: CaseMode::Original,
            input_mode: settings.inputmode,
            emoji_mode: settings.emojipredictions,
            off_the_record: settings.offtherecord,
            commits_in_session: 0,
            surrounding: None,
            reopen_blocked: false,
            action_log: Vec::new(),
        }
    }

    /// Re-apply hot-reloaded settings between events.
    pub fn apply_settings(&mut self, settings: &Settings) {
        let (bindings, _) = KeyBindings::from_config(&settings.keybindings);
        self.keymap = KeyMap::new(bindings);
        let (translit, _) = TransliterationSet::from_names(&settings.inputmethod);
        self.translit = translit;
        self.candidates.set_page_size(settings.pagesize as usize);
        self.emoji_mode = settings.emojipredictions;
        self.off_the_record = settings.offtherecord;
        self.input_mode = settings.inputmode;
    }

    pub fn preedit_is_empty(&self) -> bool {
        self.preedit.is_empty() && !self.compose.is_composing()
    }

    pub fn off_the_record(&self) -> bool {
        self.off_the_record
    }

    pub fn emoji_mode(&self) -> bool {
        self.emoji_mode
    }

    pub fn input_mode(&self) -> bool {
        self.input_mode
    }

    pub fn set_off_the_record(&mut self, value: bool) {
        self.off_the_record = value;
    }

    pub fn set_emoji_mode(&mut self, value: bool) {
        self.emoji_mode = value;
    }

    pub fn context(&self) -> (&str, &str) {
        (&self.context1, &self.context2)
    }

    pub fn input_method_names(&self) -> Vec<&'static str> {
        self.translit.names()
    }

    /// New focus session: the preedit is gone, the context no longer
    /// applies, reopening starts blocked until a commit happened here.
    pub fn focus_in(&mut self, reopen_blocked: bool) {
        self.preedit.clear();
        self.compose.reset();
        self.candidates.clear();
        self.lookup_visible = false;
        self.lookup_requested = false;
        self.inline_text = None;
        self.context1.clear();
        self.context2.clear();
        self.commits_in_session = 0;
        self.surrounding = None;
        self.reopen_blocked = reopen_blocked;
        self.action_log.clear();
        self.previous_press = None;
    }

    /// Focus leaves: commit what is typed so nothing is lost.
    pub fn focus_out(&mut self, settings: &Settings, ctx: &mut HostContext) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.preedit.is_empty() {
            let text = self.canonical_text();
            self.commit(&text, settings, ctx, &mut effects);
        }
        self.compose.reset();
        self.render(ctx);
        effects
    }

    /// Host-reported surrounding text. An inconsistent report invalidates
    /// the context window rather than guessing.
    pub fn set_surrounding_text(&mut self, surrounding: SurroundingText) {
        if !self.context1.is_empty() {
            let before: String = surrounding
                .text
                .chars()
                .take(surrounding.cursor)
                .collect::<String>()
                .trim_end()
                .to_string();
            if !before.ends_with(self.context1.trim_end()) {
                debug!("surrounding text disagrees with context, clearing");
                self.context1.clear();
                self.context2.clear();
            }
        }
        self.surrounding = Some(surrounding);
    }

    pub fn swap_compose_trie(&mut self, trie: std::sync::Arc<ComposeTrie>) {
        self.compose.set_trie(trie);
    }

    fn canonical_text(&self) -> String {
        self.preedit
            .views(&self.translit, self.input_mode)
            .canonical
    }

    fn schedule(&self, effects: &mut Vec<Effect>) {
        let views = self.current_views();
        if views.iter().all(String::is_empty) {
            effects.push(Effect::CancelCandidates);
            return;
        }
        effects.push(Effect::ScheduleCandidates {
            views,
            context1: self.context1.clone(),
            context2: self.context2.clone(),
            emoji_mode: self.emoji_mode,
            lookup_requested: self.lookup_requested,
        });
    }

    fn current_views(&self) -> Vec<String> {
        let derived = self.preedit.views(&self.translit, self.input_mode);
        let mut views = Vec::with_capacity(derived.views.len() + 1);
        views.push(derived.canonical.clone());
        for view in derived.views {
            if !views.contains(&view) {
                views.push(view);
            }
        }
        views
    }

    /// Handle one key event. Mutates the host context and returns the
    /// consumed/not-consumed verdict plus requested effects.
    pub fn handle_event(
        &mut self,
        event: &KeyEvent,
        settings: &Settings,
        ctx: &mut HostContext,
    ) -> (KeyResult, Vec<Effect>) {
        let mut effects = Vec::new();
        let translate_ctx = TranslateContext {
            candidates_visible: self.lookup_visible && !self.candidates.is_empty(),
            preedit_open: !self.preedit.is_empty(),
            previous_press: self.previous_press,
        };
        let commands = self.keymap.translate(event, &translate_ctx);
        if !event.is_release {
            self.previous_press = Some(event.keyval);
        }

        if commands.is_empty() {
            return (KeyResult::NotHandled, effects);
        }

        let mut result = KeyResult::NotHandled;
        for command in commands {
            result = self.dispatch(command, event, settings, ctx, &mut effects);
            if result == KeyResult::Handled {
                break;
            }
        }
        self.render(ctx);
        (result, effects)
    }

    fn dispatch(
        &mut self,
        command: Command,
        event: &KeyEvent,
        settings: &Settings,
        ctx: &mut HostContext,
        effects: &mut Vec<Effect>,
    ) -> KeyResult {
        match command {
            Command::InsertRaw => self.insert_key(event, settings, ctx, effects),
            Command::Backspace => self.backspace(settings, ctx, effects),
            Command::Delete => {
                if self.preedit.delete() {
                    if self.preedit.is_empty() {
                        self.clear_candidates(effects);
                    } else {
                        self.schedule(effects);
                    }
                    KeyResult::Handled
                } else {
                    KeyResult::NotHandled
                }
            }
            Command::CursorLeft => self.cursor_move(false, settings, ctx, effects),
            Command::CursorRight => self.cursor_move(true, settings, ctx, effects),
            Command::CommitPreedit => {
                if self.preedit.is_empty() {
                    return KeyResult::NotHandled;
                }
                let text = match self.candidates.selected_candidate() {
                    Some(candidate) => candidate.text.clone(),
                    None => self.canonical_text(),
                };
                self.commit(&text, settings, ctx, effects);
                // The key itself still reaches the application.
                ctx.forwarded.push(*event);
                KeyResult::Handled
            }
            Command::CommitCandidate(index) => {
                match self.candidates.candidate_on_page(index as usize) {
                    Some(candidate) => {
                        let text = candidate.text.clone();
                        self.commit(&text, settings, ctx, effects);
                        KeyResult::Handled
                    }
                    None => KeyResult::NotHandled,
                }
            }
            Command::Cancel => self.cancel(effects),
            Command::SelectNext => {
                if self.candidates.is_empty() {
                    return KeyResult::NotHandled;
                }
                self.lookup_visible = true;
                self.inline_text = None;
                self.candidates.select_next();
                KeyResult::Handled
            }
            Command::SelectPrevious => {
                if self.candidates.is_empty() {
                    return KeyResult::NotHandled;
                }
                self.lookup_visible = true;
                self.inline_text = None;
                self.candidates.select_previous();
                KeyResult::Handled
            }
            Command::PageUp => {
                if self.lookup_visible && self.candidates.page_up() {
                    KeyResult::Handled
                } else {
                    KeyResult::NotHandled
                }
            }
            Command::PageDown => {
                if self.lookup_visible && self.candidates.page_down() {
                    KeyResult::Handled
                } else {
                    KeyResult::NotHandled
                }
            }
            Command::EnableLookup => {
                if self.preedit.is_empty() {
                    return KeyResult::NotHandled;
                }
                self.lookup_requested = true;
                self.inline_text = None;
                self.schedule(effects);
                KeyResult::Handled
            }
            Command::ToggleEmoji => {
                self.emoji_mode = !self.emoji_mode;
                self.schedule(effects);
                KeyResult::Handled
            }
            Command::ToggleOffTheRecord => {
                self.off_the_record = !self.off_the_record;
                KeyResult::Handled
            }
            Command::LookupRelated => {
                let target = self
                    .candidates
                    .selected_candidate()
                    .map(|candidate| candidate.text.clone())
                    .or_else(|| self.action_log.last().map(|action| action.text.clone()));
                match target {
                    Some(target) => {
                        effects.push(Effect::LookupRelated { target });
                        KeyResult::Handled
                    }
                    None => KeyResult::NotHandled,
                }
            }
            Command::ToggleInputMode => {
                self.input_mode = !self.input_mode;
                self.schedule(effects);
                KeyResult::Handled
            }
            Command::ToggleCaseMode => {
                self.case_mode = self.case_mode.next();
                KeyResult::Handled
            }
            Command::NextInputMethod => {
                self.translit.rotate_next();
                self.schedule(effects);
                KeyResult::Handled
            }
            Command::PreviousInputMethod => {
                self.translit.rotate_previous();
                self.schedule(effects);
                KeyResult::Handled
            }
            Command::ReopenPreedit => {
                if self.try_reopen(settings, ctx) {
                    self.schedule(effects);
                    KeyResult::Handled
                } else {
                    KeyResult::NotHandled
                }
            }
        }
    }

    fn insert_key(
        &mut self,
        event: &KeyEvent,
        settings: &Settings,
        ctx: &mut HostContext,
        effects: &mut Vec<Effect>,
    ) -> KeyResult {
        // The compose engine sees the key first.
        match self.compose.feed(event.keyval) {
            ComposeResult::Committed(text) => {
                if self.preedit.is_empty() {
                    // A sequence resolved outside a word: the result goes
                    // straight to the application.
                    self.commit(&text, settings, ctx, effects);
                } else {
                    self.preedit.insert_text(&text);
                    self.schedule(effects);
                }
                return KeyResult::Handled;
            }
            ComposeResult::Composing => return KeyResult::Handled,
            ComposeResult::Rejected => {
                // Last key discarded, prefix kept; the host beeps.
                return KeyResult::Handled;
            }
            ComposeResult::NotHandled => {}
        }

        let Some(ch) = event.insert_char() else {
            return KeyResult::NotHandled;
        };

        if self.preedit.is_empty() && ch == ' ' {
            // A bare space belongs to the application.
            return KeyResult::NotHandled;
        }

        if !self.preedit.is_empty() {
            // Space and the configured auto-commit characters finish the
            // word instead of joining it.
            if ch == ' ' {
                let text = match self.candidates.selected_candidate() {
                    Some(candidate) => candidate.text.clone(),
                    None => self.canonical_text(),
                };
                self.commit(&text, settings, ctx, effects);
                ctx.commit_text.push(' ');
                return KeyResult::Handled;
            }
            if settings.autocommitcharacters.contains(ch) {
                let text = self.canonical_text();
                self.commit(&text, settings, ctx, effects);
                ctx.commit_text.push(ch);
                ctx.commit_text.push(' ');
                return KeyResult::Handled;
            }
        }

        let was_empty = self.preedit.is_empty();
        self.preedit.insert(event.keyval, ch);
        if was_empty && settings.autocapitalize && self.sentence_boundary_behind() {
            self.preedit.capitalize_first();
        }
        self.schedule(effects);
        KeyResult::Handled
    }

    fn sentence_boundary_behind(&self) -> bool {
        if let Some(surrounding) = &self.surrounding {
            let before: String = surrounding.text.chars().take(surrounding.cursor).collect();
            if !before.trim_end().is_empty() {
                return utils::ends_sentence(&before);
            }
        }
        utils::ends_sentence(&self.context1)
    }

    fn backspace(
        &mut self,
        _settings: &Settings,
        _ctx: &mut HostContext,
        effects: &mut Vec<Effect>,
    ) -> KeyResult {
        if self.compose.is_composing() {
            self.compose.pop();
            return KeyResult::Handled;
        }
        if self.preedit.backspace() {
            if self.preedit.is_empty() {
                self.clear_candidates(effects);
            } else {
                self.schedule(effects);
            }
            KeyResult::Handled
        } else {
            KeyResult::NotHandled
        }
    }

    fn cursor_move(
        &mut self,
        right: bool,
        settings: &Settings,
        ctx: &mut HostContext,
        effects: &mut Vec<Effect>,
    ) -> KeyResult {
        if self.preedit.is_empty() {
            if settings.arrowkeysreopenpreedit && !right && self.try_reopen(settings, ctx) {
                self.schedule(effects);
                return KeyResult::Handled;
            }
            return KeyResult::NotHandled;
        }
        let moved = if right {
            self.preedit.move_right()
        } else {
            self.preedit.move_left()
        };
        if moved {
            self.schedule(effects);
            return KeyResult::Handled;
        }
        if right {
            // Past the right edge: the word is done; commit and let the
            // application see the arrow.
            let text = self.canonical_text();
            self.commit(&text, settings, ctx, effects);
            ctx.forwarded.push(KeyEvent::press(
                typebooster_core::keysym::KEY_RIGHT,
                typebooster_core::keysym::Modifiers::NONE,
            ));
            KeyResult::Handled
        } else {
            // At token 0 moving further left is a no-op.
            KeyResult::Handled
        }
    }

    fn cancel(&mut self, effects: &mut Vec<Effect>) -> KeyResult {
        if self.candidates.is_selected() {
            self.candidates.deselect();
            return KeyResult::Handled;
        }
        if self.lookup_visible {
            self.lookup_visible = false;
            self.lookup_requested = false;
            return KeyResult::Handled;
        }
        if self.compose.is_composing() {
            self.compose.reset();
            return KeyResult::Handled;
        }
        if !self.preedit.is_empty() {
            self.preedit.clear();
            self.clear_candidates(effects);
            return KeyResult::Handled;
        }
        KeyResult::NotHandled
    }

    fn clear_candidates(&mut self, effects: &mut Vec<Effect>) {
        self.candidates.clear();
        self.lookup_visible = false;
        self.lookup_requested = false;
        self.inline_text = None;
        effects.push(Effect::CancelCandidates);
    }

    /// Commit `text`: send it to the host, feed the learning store, shift
    /// the context window, return to Empty.
    fn commit(
        &mut self,
        text: &str,
        _settings: &Settings,
        ctx: &mut HostContext,
        effects: &mut Vec<Effect>,
    ) {
        let committed = self.case_mode.apply(text);
        ctx.commit_text.push_str(&committed);
        if !self.off_the_record && !committed.trim().is_empty() {
            effects.push(Effect::Record {
                phrase: committed.clone(),
                context1: self.context1.clone(),
                context2: self.context2.clone(),
            });
        }
        self.action_log.push(CommitAction {
            text: committed.clone(),
            context1_before: self.context1.clone(),
            context2_before: self.context2.clone(),
        });
        if self.action_log.len() > ACTION_LOG_LIMIT {
            self.action_log.remove(0);
        }
        self.context2 = std::mem::take(&mut self.context1);
        self.context1 = utils::normalize(&committed);
        self.commits_in_session += 1;
        self.case_mode = CaseMode::Original;
        self.preedit.clear();
        self.compose.reset();
        self.clear_candidates(effects);
    }

    /// Reopen a previously committed word sitting directly before the
    /// cursor. Conservative on purpose: any doubt about the surrounding
    /// text means silent no-op.
    fn try_reopen(&mut self, _settings: &Settings, ctx: &mut HostContext) -> bool {
        if self.reopen_blocked || self.commits_in_session == 0 {
            return false;
        }
        let Some(surrounding) = &self.surrounding else {
            return false;
        };
        let before: String = surrounding.text.chars().take(surrounding.cursor).collect();
        let word: String = before
            .chars()
            .rev()
            .take_while(|c| !c.is_whitespace())
            .collect::<Vec<char>>()
            .into_iter()
            .rev()
            .collect();
        if word.is_empty() {
            return false;
        }
        // Only reopen what we know we committed; a mismatch means the
        // surrounding-text deltas cannot be trusted.
        let trusted = self
            .action_log
            .last()
            .map(|action| action.text.trim_end() == word)
            .unwrap_or(false);
        if !trusted {
            return false;
        }
        let char_count = word.chars().count();
        ctx.delete_surrounding = Some((-(char_count as i64), char_count));
        self.preedit.clear();
        self.preedit.insert_text(&word);
        // Undo the commit: the context window rolls back to its state
        // before it.
        let action = self.action_log.pop().expect("checked above");
        self.context1 = action.context1_before;
        self.context2 = action.context2_before;
        true
    }

    /// New candidates arrived (from the producer or a related lookup).
    pub fn apply_candidates(
        &mut self,
        candidates: Vec<Candidate>,
        settings: &Settings,
        ctx: &mut HostContext,
    ) {
        self.candidates.set_candidates(candidates);
        self.inline_text = None;
        if self.candidates.is_empty() {
            self.lookup_visible = false;
            self.render(ctx);
            return;
        }
        let canonical = self.canonical_text();
        let inline_candidate: Option<String> =
            self.candidates.candidates().first().and_then(|candidate| {
                (settings.inlinecompletion == InlineCompletion::Visible
                    && !self.lookup_requested
                    && candidate.score >= INLINE_CONFIDENCE
                    && candidate.text.len() > canonical.len()
                    && candidate.text.starts_with(&canonical)
                    && !canonical.is_empty())
                .then(|| candidate.text.clone())
            });
        if let Some(text) = inline_candidate {
            self.inline_text = Some(text);
            self.lookup_visible = false;
        } else {
            self.lookup_visible = !settings.tabenable || self.lookup_requested;
            if settings.autoselectcandidate == AutoSelect::On {
                self.candidates.select_current();
            }
        }
        self.render(ctx);
    }

    /// Related-emoji results fill the table directly.
    pub fn apply_related(&mut self, related: Vec<Candidate>, ctx: &mut HostContext) {
        if related.is_empty() {
            return;
        }
        self.candidates.set_candidates(related);
        self.lookup_visible = true;
        self.inline_text = None;
        self.render(ctx);
    }

    /// Render the current state into the host context.
    pub fn render(&self, ctx: &mut HostContext) {
        let views = self.preedit.views(&self.translit, self.input_mode);
        let mut preedit_text = views.canonical.clone();
        let mut cursor = views.canonical_cursor;
        if self.compose.is_composing() {
            let pending = self.compose.preedit();
            preedit_text.insert_str(
                preedit_text
                    .char_indices()
                    .nth(cursor)
                    .map(|(i, _)| i)
                    .unwrap_or(preedit_text.len()),
                &pending,
            );
            cursor += pending.chars().count();
        } else if let Some(inline) = &self.inline_text {
            // Inline completion: preedit shows the whole suggestion, the
            // cursor stays where typing ends.
            preedit_text = inline.clone();
        }
        ctx.preedit_text = preedit_text;
        ctx.preedit_cursor = cursor;
        ctx.preedit_visible = !ctx.preedit_text.is_empty();

        ctx.candidates_visible = self.lookup_visible && !self.candidates.is_empty();
        if ctx.candidates_visible {
            ctx.candidates = self
                .candidates
                .current_page_candidates()
                .iter()
                .map(|candidate| DisplayCandidate {
                    text: candidate.text.clone(),
                    annotation: candidate.annotation.clone(),
                    deletable: candidate.source == CandidateSource::UserDb,
                })
                .collect();
            ctx.candidate_cursor = self
                .candidates
                .is_selected()
                .then(|| self.candidates.cursor());
        } else {
            ctx.candidates.clear();
            ctx.candidate_cursor = None;
        }

        let mut auxiliary = String::new();
        if self.compose.is_composing() {
            auxiliary = format!("compose: {}", self.compose.preedit());
        } else if ctx.candidates_visible && self.candidates.num_pages() > 1 {
            auxiliary = format!(
                "{}/{}",
                self.candidates.current_page() + 1,
                self.candidates.num_pages()
            );
        }
        if self.off_the_record {
            if !auxiliary.is_empty() {
                auxiliary.push(' ');
            }
            auxiliary.push_str("off the record");
        }
        if self.case_mode != CaseMode::Original {
            if !auxiliary.is_empty() {
                auxiliary.push(' ');
            }
            auxiliary.push_str(match self.case_mode {
                CaseMode::Capitalize => "Aa",
                CaseMode::Upper => "AA",
                CaseMode::Lower => "aa",
                CaseMode::Original => "",
            });
        }
        ctx.auxiliary_text = auxiliary;
        ctx.auxiliary_visible = !ctx.auxiliary_text.is_empty();
    }
}
