//! typebooster
//!
//! The assembled predictive input engine: one [`Engine`] owns the preedit
//! controller, the shared stores, the candidate-producer worker and the
//! database writer, and exposes the abstract host surface (key events in,
//! a [`HostContext`] out).
//!
//! The engine is single-threaded toward its caller: `process_key` runs on
//! the host event loop and never blocks; the workers post results that the
//! loop folds in via [`Engine::poll`] (or [`Engine::pump`] where blocking
//! is fine, as in the demo binary and the tests).

pub mod candidates;
pub mod controller;
pub mod host;
pub mod jobs;
pub mod preedit;

use crate::candidates::{CandidateEngine, ProduceRequest};
use crate::controller::{Effect, KeyResult, PreeditController};
use crate::host::{HostContext, Property, SurroundingText};
use crate::jobs::{CandidateWorker, DbOp, DbWriter, SOFT_DEADLINE};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use typebooster_core::candidate::{Candidate, CandidateSource};
use typebooster_core::compose::{ComposeTrie, IncludeEnv};
use typebooster_core::config::{ConfigStore, RecordMode, Settings};
use typebooster_core::dictionary::Dictionaries;
use typebooster_core::emoji::EmojiIndex;
use typebooster_core::keymap::KeyEvent;
use typebooster_core::userdb::UserDb;

pub use crate::controller::KeyResult as EngineKeyResult;

/// The complete engine. One instance per input context is the expected
/// hosting model; everything shared (stores, indexes) is behind `Arc`s.
pub struct Engine {
    config: Arc<ConfigStore>,
    settings: Arc<Settings>,
    settings_version: u64,
    controller: PreeditController,
    ctx: HostContext,
    worker: CandidateWorker,
    db_writer: DbWriter,
    user_db: UserDb,
    candidate_engine: CandidateEngine,
    enabled: bool,
    client_id: String,
}

impl Engine {
    /// Build an engine from settings and an opened user database.
    pub fn new(config: Arc<ConfigStore>, user_db: UserDb) -> Engine {
        let settings = config.current();
        let dictionaries = Dictionaries::new(&settings.dictionary, default_dictionary_dirs());
        let candidate_engine = CandidateEngine::new(user_db.clone(), dictionaries);
        let worker = CandidateWorker::spawn(candidate_engine.clone());
        let db_writer = DbWriter::spawn(user_db.clone());
        let controller = PreeditController::new(&settings, Arc::new(ComposeTrie::default()));
        let settings_version = config.version();
        Engine {
            config,
            settings,
            settings_version,
            controller,
            ctx: HostContext::default(),
            worker,
            db_writer,
            user_db,
            candidate_engine,
            enabled: true,
            client_id: String::new(),
        }
    }

    /// An engine over default settings and a throwaway store; used by the
    /// tests and the demo binary.
    pub fn with_defaults(settings: Settings) -> Engine {
        Engine::new(
            Arc::new(ConfigStore::new(settings)),
            UserDb::new_temp(),
        )
    }

    pub fn context(&self) -> &HostContext {
        &self.ctx
    }

    pub fn user_db(&self) -> &UserDb {
        &self.user_db
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Surface a one-shot notice (database quarantine and the like).
    pub fn push_notice(&mut self, notice: String) {
        self.ctx.notices.push(notice);
    }

    /// Rebuild the compose trie from the given files (system file first,
    /// user overlay last) and swap it in atomically.
    pub fn reload_compose(&mut self, paths: &[PathBuf], env: &IncludeEnv) {
        let mut trie = ComposeTrie::default();
        for path in paths {
            for error in trie.load_file(path, env) {
                debug!(%error, "compose entry skipped");
            }
        }
        self.controller.swap_compose_trie(Arc::new(trie));
    }

    // ----- inbound host surface -------------------------------------------

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
        self.ctx.clear_all();
    }

    /// A new input context got the focus.
    pub fn focus_in(&mut self, client_id: &str) {
        self.client_id = client_id.to_string();
        self.refresh_settings(true);
        let client = client_id.to_lowercase();
        let is_terminal = client.contains("term") || client.contains("console");
        let is_password = client.contains("password");
        self.enabled = !(self.settings.disableinterminals && is_terminal);
        self.controller.focus_in(is_terminal || is_password);
        self.ctx.clear_all();
        self.refresh_properties();
        info!(client_id, enabled = self.enabled, "focus in");
    }

    pub fn focus_out(&mut self) {
        self.ctx.clear_transient();
        let effects = {
            let settings = self.settings.clone();
            self.controller.focus_out(&settings, &mut self.ctx)
        };
        self.apply_effects(effects);
    }

    pub fn set_surrounding_text(&mut self, text: &str, cursor: usize, anchor: usize) {
        self.controller.set_surrounding_text(SurroundingText {
            text: text.to_string(),
            cursor,
            anchor,
        });
    }

    /// Host-side property toggle (panel menu).
    pub fn property_activate(&mut self, name: &str, state: bool) {
        match name {
            "emoji-mode" => self.controller.set_emoji_mode(state),
            "off-the-record" => self.controller.set_off_the_record(state),
            _ => debug!(name, "unknown property ignored"),
        }
        self.refresh_properties();
    }

    /// Process one key event; the heart of the event loop.
    pub fn process_key(&mut self, event: &KeyEvent) -> KeyResult {
        if !self.enabled {
            return KeyResult::NotHandled;
        }
        self.refresh_settings(false);
        self.ctx.clear_transient();
        let settings = self.settings.clone();
        let (result, effects) = self.controller.handle_event(event, &settings, &mut self.ctx);
        self.apply_effects(effects);
        self.refresh_properties();
        result
    }

    /// Convenience for hosts and tests: type a plain character.
    pub fn process_char(&mut self, ch: char) -> KeyResult {
        self.process_key(&KeyEvent::from_char(ch))
    }

    /// Fold in any finished candidate production without blocking.
    pub fn poll(&mut self) -> bool {
        match self.worker.try_collect() {
            Some(response) => {
                let settings = self.settings.clone();
                self.controller
                    .apply_candidates(response.candidates, &settings, &mut self.ctx);
                true
            }
            None => false,
        }
    }

    /// Block until the latest candidate job reports (demo binary, tests).
    /// Exceeding the soft deadline surfaces a busy indicator; the job is
    /// not killed.
    pub fn pump(&mut self, timeout: Duration) -> bool {
        let started = Instant::now();
        let first_leg = timeout.min(SOFT_DEADLINE);
        let mut response = self.worker.wait(first_leg);
        if response.is_none() && timeout > first_leg {
            self.ctx.auxiliary_text = "…".to_string();
            self.ctx.auxiliary_visible = true;
            response = self.worker.wait(timeout.saturating_sub(started.elapsed()));
        }
        match response {
            Some(response) => {
                let settings = self.settings.clone();
                self.controller
                    .apply_candidates(response.candidates, &settings, &mut self.ctx);
                true
            }
            None => false,
        }
    }

    /// Run periodic maintenance (the decay pass) on the writer worker.
    pub fn run_maintenance(&self) {
        self.db_writer.send(DbOp::DecayPass);
    }

    /// Queue a training-text import on the writer worker.
    pub fn import_training_text(&self, text: String) {
        self.db_writer.send(DbOp::ImportTraining(text));
    }

    /// Remove a phrase from the learning store (user deletes a candidate).
    pub fn forget_candidate(&mut self, phrase: &str) {
        let (context1, context2) = {
            let (c1, c2) = self.controller.context();
            (c1.to_string(), c2.to_string())
        };
        self.db_writer.send(DbOp::Forget {
            phrase: phrase.to_string(),
            context1,
            context2,
        });
    }

    // ----- internals ------------------------------------------------------

    /// Pick up a hot-reloaded configuration between events.
    fn refresh_settings(&mut self, force: bool) {
        let version = self.config.version();
        if !force && version == self.settings_version {
            return;
        }
        self.settings_version = version;
        let mut settings = (*self.config.current()).clone();
        // Per-client autosettings override the base configuration.
        if !self.client_id.is_empty() {
            let overrides: Vec<(String, String)> = settings
                .autosettings_for(&self.client_id)
                .into_iter()
                .map(|auto| (auto.option.clone(), auto.value.clone()))
                .collect();
            for (option, value) in overrides {
                if let Err(error) = settings.apply_str(&option, &value) {
                    debug!(%error, "autosetting skipped");
                }
            }
        }
        self.settings = Arc::new(settings);
        self.controller.apply_settings(&self.settings);
        // A changed locale list swaps the shared dictionaries; the worker
        // sees the new set through the same handle.
        let mut dictionaries = self
            .candidate_engine
            .dictionaries
            .lock()
            .expect("dictionaries lock");
        if dictionaries.names() != self.settings.dictionary.as_slice() {
            *dictionaries = Dictionaries::new(&self.settings.dictionary, default_dictionary_dirs());
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ScheduleCandidates {
                    views,
                    context1,
                    context2,
                    emoji_mode,
                    lookup_requested,
                } => {
                    let request = ProduceRequest {
                        views,
                        context1,
                        context2,
                        emoji_mode,
                        lookup_requested,
                        settings: self.settings.clone(),
                    };
                    let delay = Duration::from_millis(self.settings.candidatesdelaymilliseconds);
                    self.worker.submit(request, delay);
                }
                Effect::CancelCandidates => {
                    self.worker.cancel_outstanding();
                }
                Effect::Record {
                    phrase,
                    context1,
                    context2,
                } => {
                    if self.should_record(&phrase) {
                        self.db_writer.send(DbOp::Record {
                            phrase,
                            context1,
                            context2,
                        });
                    }
                }
                Effect::Forget {
                    phrase,
                    context1,
                    context2,
                } => {
                    self.db_writer.send(DbOp::Forget {
                        phrase,
                        context1,
                        context2,
                    });
                }
                Effect::LookupRelated { target } => {
                    let related: Vec<Candidate> = EmojiIndex::builtin()
                        .related(&target)
                        .into_iter()
                        .map(|hit| {
                            Candidate::new(
                                hit.entry.sequence.clone(),
                                CandidateSource::Related,
                                -2.0 + hit.score as f64 * 1e-4,
                            )
                            .with_annotation(hit.entry.name())
                        })
                        .collect();
                    self.controller.apply_related(related, &mut self.ctx);
                }
            }
        }
    }

    /// The record-mode gate for one committed phrase.
    fn should_record(&self, phrase: &str) -> bool {
        match self.settings.recordmode {
            RecordMode::Nothing => false,
            RecordMode::Everything => true,
            RecordMode::Correct => self.spellchecks(phrase),
            RecordMode::CorrectOrPreviouslyRecorded => {
                self.spellchecks(phrase) || self.user_db.knows_phrase(phrase)
            }
        }
    }

    fn spellchecks(&self, phrase: &str) -> bool {
        self.candidate_engine
            .dictionaries
            .lock()
            .expect("dictionaries lock")
            .spellcheck_phrase(phrase)
    }

    fn refresh_properties(&mut self) {
        self.ctx.properties = vec![
            Property {
                key: "emoji-mode",
                label: "Emoji predictions".to_string(),
                state: self.controller.emoji_mode(),
            },
            Property {
                key: "off-the-record",
                label: "Off the record".to_string(),
                state: self.controller.off_the_record(),
            },
            Property {
                key: "input-mode",
                label: format!(
                    "Input method: {}",
                    self.controller
                        .input_method_names()
                        .first()
                        .copied()
                        .unwrap_or("NoIME")
                ),
                state: self.controller.input_mode(),
            },
        ];
    }
}

fn default_dictionary_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(home) = std::env::var("HOME") {
        dirs.push(PathBuf::from(home).join(".local/share/typebooster/dictionaries"));
    }
    dirs.push(PathBuf::from("/usr/share/hunspell"));
    dirs.push(PathBuf::from("/usr/share/myspell"));
    dirs
}
