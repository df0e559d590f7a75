//! The persistent learning store: phrase frequencies keyed by the phrase
//! and up to two preceding commits, with time decay.
//!
//! Backed by a single `redb` file per user. Readers run in snapshot
//! transactions and are never blocked; all writes go through one writer
//! task (the engine's database worker), so methods here can take `&self`.
//! The scoring formula is a single pure function, [`score`], so its
//! properties can be tested in isolation.

use crate::error::Error;
use crate::utils::normalize;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

const PHRASES: TableDefinition<&str, &[u8]> = TableDefinition::new("phrases");
const METADATA: TableDefinition<&str, &str> = TableDefinition::new("metadata");

const SCHEMA_VERSION: &str = "1";

/// Separator between phrase, context1 and context2 in the table key.
const KEY_SEP: char = '\u{1f}';

/// Decay half-life in days: an unused entry loses half its weight here.
pub const HALF_LIFE_DAYS: f64 = 30.0;

/// Entries older than this with negligible weight are purged by
/// `decay_pass`.
const PURGE_AGE_DAYS: f64 = 180.0;
const PURGE_EPSILON: f64 = 0.05;

/// Default ceiling on stored entries; inserts beyond it evict the entry
/// with the lowest (user_freq, timestamp).
pub const DEFAULT_MAX_ENTRIES: u64 = 50_000;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PhraseRecord {
    frequency: u64,
    /// Seconds since the epoch of the last commit.
    timestamp: f64,
    /// Decayed weight; incremented on commit, halved by decay passes.
    user_freq: f64,
}

/// One row as surfaced to callers (debugging, export).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDbEntry {
    pub phrase: String,
    pub context1: String,
    pub context2: String,
    pub frequency: u64,
    pub timestamp: f64,
    pub user_freq: f64,
}

/// Store-level counters for the metadata export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDbMetadata {
    pub schema_version: String,
    pub entry_count: u64,
    pub total_frequency: u64,
}

/// Inputs of the ranking formula, all derived from one lookup snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    /// This phrase's share of all matching rows (0..=1).
    pub unigram: f64,
    /// Share among rows whose context1 matches, when any row does.
    pub bigram: Option<f64>,
    /// Share among rows whose (context1, context2) match.
    pub trigram: Option<f64>,
    /// Days since the phrase was last committed.
    pub age_days: f64,
}

/// The ranking formula: a linear combination of the context levels (the
/// trigram share weighs as much as the other two together) scaled by an
/// exponential recency factor with a half-life of [`HALF_LIFE_DAYS`].
pub fn score(inputs: &ScoreInputs) -> f64 {
    let mix = match (inputs.bigram, inputs.trigram) {
        (Some(bigram), Some(trigram)) => {
            0.25 * inputs.unigram + 0.25 * bigram + 0.5 * trigram
        }
        (Some(bigram), None) => 0.5 * inputs.unigram + 0.5 * bigram,
        _ => inputs.unigram,
    };
    let recency = (-inputs.age_days.max(0.0) / HALF_LIFE_DAYS * std::f64::consts::LN_2).exp();
    mix * recency
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn encode_key(phrase: &str, context1: &str, context2: &str) -> String {
    format!("{phrase}{KEY_SEP}{context1}{KEY_SEP}{context2}")
}

fn decode_key(key: &str) -> (String, String, String) {
    let mut parts = key.splitn(3, KEY_SEP);
    let phrase = parts.next().unwrap_or("").to_string();
    let context1 = parts.next().unwrap_or("").to_string();
    let context2 = parts.next().unwrap_or("").to_string();
    (phrase, context1, context2)
}

/// The user database handle. Cloning shares the underlying store.
#[derive(Debug, Clone)]
pub struct UserDb {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    db: Database,
    path: PathBuf,
    max_entries: u64,
}

impl UserDb {
    /// Open or create the store at `path`. A store that cannot be opened
    /// or carries an unknown schema is quarantined (renamed with a
    /// `.corrupt` suffix) and a fresh one is created; the returned notice
    /// is the user-visible one-shot message.
    pub fn open(path: impl AsRef<Path>) -> Result<(UserDb, Option<String>), Error> {
        let path = path.as_ref();
        match Self::open_strict(path, DEFAULT_MAX_ENTRIES) {
            Ok(db) => Ok((db, None)),
            Err(first_error) => {
                let quarantine = path.with_extension(format!(
                    "corrupt-{}",
                    now_secs() as u64
                ));
                warn!(
                    path = %path.display(),
                    quarantine = %quarantine.display(),
                    %first_error,
                    "user database quarantined"
                );
                std::fs::rename(path, &quarantine).map_err(|source| Error::UserDbCorruption {
                    path: path.display().to_string(),
                    message: format!("rename failed: {source}"),
                })?;
                let db = Self::open_strict(path, DEFAULT_MAX_ENTRIES).map_err(|error| {
                    Error::UserDbCorruption {
                        path: path.display().to_string(),
                        message: error.to_string(),
                    }
                })?;
                let notice = format!(
                    "Learned data could not be read and was moved to {}; starting fresh.",
                    quarantine.display()
                );
                Ok((db, Some(notice)))
            }
        }
    }

    fn open_strict(path: &Path, max_entries: u64) -> Result<UserDb, Error> {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        let db = Database::create(path).map_err(|e| Error::UserDbCorruption {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let user_db = UserDb {
            inner: Arc::new(Inner {
                db,
                path: path.to_path_buf(),
                max_entries,
            }),
        };
        user_db.check_schema()?;
        Ok(user_db)
    }

    /// A store in a fresh temp file; used by tests and the demo binary.
    pub fn new_temp() -> UserDb {
        let mut path = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        path.push(format!(
            "typebooster_userdb_{}_{}.redb",
            std::process::id(),
            nanos
        ));
        Self::open_strict(&path, DEFAULT_MAX_ENTRIES).expect("create temp user db")
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    fn check_schema(&self) -> Result<(), Error> {
        let corrupt = |message: String| Error::UserDbCorruption {
            path: self.inner.path.display().to_string(),
            message,
        };
        let write = self
            .inner
            .db
            .begin_write()
            .map_err(|e| corrupt(e.to_string()))?;
        {
            let mut table = write
                .open_table(METADATA)
                .map_err(|e| corrupt(e.to_string()))?;
            let existing_version = table
                .get("schema_version")
                .map_err(|e| corrupt(e.to_string()))?
                .map(|version| version.value().to_string());
            match existing_version {
                Some(version) if version != SCHEMA_VERSION => {
                    return Err(corrupt(format!(
                        "schema version {} not supported",
                        version
                    )));
                }
                Some(_) => {}
                None => {
                    table
                        .insert("schema_version", SCHEMA_VERSION)
                        .map_err(|e| corrupt(e.to_string()))?;
                }
            }
            // Make sure the phrase table exists so readers never race its
            // creation.
            write
                .open_table(PHRASES)
                .map_err(|e| corrupt(e.to_string()))?;
        }
        write.commit().map_err(|e| corrupt(e.to_string()))?;
        Ok(())
    }

    /// Record one commit of `phrase` after `context1`/`context2`.
    pub fn record_commit(&self, phrase: &str, context1: &str, context2: &str) {
        self.record_commit_at(phrase, context1, context2, now_secs());
    }

    /// Same with an explicit timestamp (tests, training import).
    pub fn record_commit_at(&self, phrase: &str, context1: &str, context2: &str, now: f64) {
        if phrase.is_empty() {
            return;
        }
        let phrase = normalize(phrase);
        let context1 = normalize(context1);
        let context2 = normalize(context2);
        if let Err(error) = self.upsert(&phrase, &context1, &context2, now) {
            warn!(%error, "user db commit dropped");
        }
    }

    fn upsert(
        &self,
        phrase: &str,
        context1: &str,
        context2: &str,
        now: f64,
    ) -> Result<(), redb::Error> {
        let key = encode_key(phrase, context1, context2);
        let write = self.inner.db.begin_write()?;
        {
            let mut table = write.open_table(PHRASES)?;
            let record = match table.get(key.as_str())? {
                Some(existing) => {
                    let mut record: PhraseRecord = bincode::deserialize(existing.value())
                        .unwrap_or(PhraseRecord {
                            frequency: 0,
                            timestamp: now,
                            user_freq: 0.0,
                        });
                    record.frequency = record.frequency.saturating_add(1);
                    record.user_freq += 1.0;
                    record.timestamp = now;
                    record
                }
                None => PhraseRecord {
                    frequency: 1,
                    timestamp: now,
                    user_freq: 1.0,
                },
            };
            let encoded = bincode::serialize(&record).expect("record serializes");
            table.insert(key.as_str(), encoded.as_slice())?;

            // Ceiling: evict the weakest entry, not the newest.
            if table.len()? > self.inner.max_entries {
                let mut weakest: Option<(String, f64, f64)> = None;
                for row in table.iter()? {
                    let (row_key, row_value) = row?;
                    if row_key.value() == key {
                        continue;
                    }
                    let record: PhraseRecord = match bincode::deserialize(row_value.value()) {
                        Ok(record) => record,
                        Err(_) => PhraseRecord {
                            frequency: 0,
                            timestamp: 0.0,
                            user_freq: 0.0,
                        },
                    };
                    let is_weaker = match &weakest {
                        None => true,
                        Some((_, user_freq, timestamp)) => {
                            (record.user_freq, record.timestamp) < (*user_freq, *timestamp)
                        }
                    };
                    if is_weaker {
                        weakest =
                            Some((row_key.value().to_string(), record.user_freq, record.timestamp));
                    }
                }
                if let Some((evict_key, _, _)) = weakest {
                    table.remove(evict_key.as_str())?;
                }
            }
        }
        write.commit()?;
        Ok(())
    }

    /// Ranked completion lookup: phrases starting with `prefix`, scored by
    /// [`score`] over the snapshot the read transaction pins.
    pub fn lookup(&self, prefix: &str, context1: &str, context2: &str) -> Vec<(String, f64)> {
        self.lookup_at(prefix, context1, context2, now_secs())
    }

    pub fn lookup_at(
        &self,
        prefix: &str,
        context1: &str,
        context2: &str,
        now: f64,
    ) -> Vec<(String, f64)> {
        let prefix = normalize(prefix);
        if prefix.is_empty() {
            return Vec::new();
        }
        let context1 = normalize(context1);
        let context2 = normalize(context2);
        let rows = match self.rows_with_prefix(&prefix) {
            Ok(rows) => rows,
            Err(error) => {
                warn!(%error, "user db lookup failed");
                return Vec::new();
            }
        };
        if rows.is_empty() {
            return Vec::new();
        }

        struct Accumulated {
            unigram: f64,
            bigram: f64,
            trigram: f64,
            last_used: f64,
        }
        let mut per_phrase: HashMap<String, Accumulated> = HashMap::new();
        let mut total_unigram = 0.0;
        let mut total_bigram = 0.0;
        let mut total_trigram = 0.0;
        for entry in &rows {
            let accumulated = per_phrase
                .entry(entry.phrase.clone())
                .or_insert(Accumulated {
                    unigram: 0.0,
                    bigram: 0.0,
                    trigram: 0.0,
                    last_used: 0.0,
                });
            accumulated.unigram += entry.user_freq;
            total_unigram += entry.user_freq;
            accumulated.last_used = accumulated.last_used.max(entry.timestamp);
            if !context1.is_empty() && entry.context1 == context1 {
                accumulated.bigram += entry.user_freq;
                total_bigram += entry.user_freq;
                if !context2.is_empty() && entry.context2 == context2 {
                    accumulated.trigram += entry.user_freq;
                    total_trigram += entry.user_freq;
                }
            }
        }

        let mut out: Vec<(String, f64)> = per_phrase
            .into_iter()
            .map(|(phrase, accumulated)| {
                let inputs = ScoreInputs {
                    unigram: accumulated.unigram / total_unigram,
                    bigram: (total_bigram > 0.0).then(|| accumulated.bigram / total_bigram),
                    trigram: (total_trigram > 0.0).then(|| accumulated.trigram / total_trigram),
                    age_days: (now - accumulated.last_used).max(0.0) / SECONDS_PER_DAY,
                };
                (phrase, score(&inputs))
            })
            .collect();
        out.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.chars().count().cmp(&b.0.chars().count()))
                .then_with(|| a.0.cmp(&b.0))
        });
        out
    }

    fn rows_with_prefix(&self, prefix: &str) -> Result<Vec<UserDbEntry>, redb::Error> {
        let read = self.inner.db.begin_read()?;
        let table = match read.open_table(PHRASES) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut out = Vec::new();
        for row in table.range(prefix..)? {
            let (key, value) = row?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            let (phrase, context1, context2) = decode_key(key);
            if let Ok(record) = bincode::deserialize::<PhraseRecord>(value.value()) {
                out.push(UserDbEntry {
                    phrase,
                    context1,
                    context2,
                    frequency: record.frequency,
                    timestamp: record.timestamp,
                    user_freq: record.user_freq,
                });
            }
        }
        Ok(out)
    }

    /// Is the phrase recorded under any context?
    pub fn knows_phrase(&self, phrase: &str) -> bool {
        let phrase = normalize(phrase);
        self.rows_with_prefix(&phrase)
            .map(|rows| rows.iter().any(|entry| entry.phrase == phrase))
            .unwrap_or(false)
    }

    /// Total raw frequency of the phrase across contexts.
    pub fn frequency(&self, phrase: &str) -> u64 {
        let phrase = normalize(phrase);
        self.rows_with_prefix(&phrase)
            .map(|rows| {
                rows.iter()
                    .filter(|entry| entry.phrase == phrase)
                    .map(|entry| entry.frequency)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Delete one (phrase, context1, context2) entry.
    pub fn forget(&self, phrase: &str, context1: &str, context2: &str) {
        let key = encode_key(&normalize(phrase), &normalize(context1), &normalize(context2));
        if let Err(error) = self.remove_key(&key) {
            warn!(%error, "user db forget failed");
        }
    }

    /// Delete the phrase under every context.
    pub fn forget_phrase(&self, phrase: &str) {
        let phrase = normalize(phrase);
        let keys: Vec<String> = match self.rows_with_prefix(&phrase) {
            Ok(rows) => rows
                .into_iter()
                .filter(|entry| entry.phrase == phrase)
                .map(|entry| encode_key(&entry.phrase, &entry.context1, &entry.context2))
                .collect(),
            Err(_) => return,
        };
        for key in keys {
            let _ = self.remove_key(&key);
        }
    }

    fn remove_key(&self, key: &str) -> Result<(), redb::Error> {
        let write = self.inner.db.begin_write()?;
        {
            let mut table = write.open_table(PHRASES)?;
            table.remove(key)?;
        }
        write.commit()?;
        Ok(())
    }

    /// Periodic decay: halve `user_freq` of entries unused for longer than
    /// the half-life; purge entries that decayed to noise long ago.
    /// Monotone: no entry's weight ever increases.
    pub fn decay_pass(&self) {
        self.decay_pass_at(now_secs());
    }

    pub fn decay_pass_at(&self, now: f64) {
        if let Err(error) = self.decay_inner(now) {
            warn!(%error, "user db decay pass failed");
        }
    }

    fn decay_inner(&self, now: f64) -> Result<(), redb::Error> {
        let half_life_secs = HALF_LIFE_DAYS * SECONDS_PER_DAY;
        let purge_age_secs = PURGE_AGE_DAYS * SECONDS_PER_DAY;
        let mut updates: Vec<(String, Option<PhraseRecord>)> = Vec::new();
        {
            let read = self.inner.db.begin_read()?;
            let table = match read.open_table(PHRASES) {
                Ok(table) => table,
                Err(redb::TableError::TableDoesNotExist(_)) => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            for row in table.iter()? {
                let (key, value) = row?;
                let Ok(mut record) = bincode::deserialize::<PhraseRecord>(value.value()) else {
                    updates.push((key.value().to_string(), None));
                    continue;
                };
                let age = now - record.timestamp;
                if age > purge_age_secs && record.user_freq < PURGE_EPSILON {
                    updates.push((key.value().to_string(), None));
                } else if age > half_life_secs {
                    record.user_freq /= 2.0;
                    updates.push((key.value().to_string(), Some(record)));
                }
            }
        }
        if updates.is_empty() {
            return Ok(());
        }
        let write = self.inner.db.begin_write()?;
        {
            let mut table = write.open_table(PHRASES)?;
            for (key, record) in updates {
                match record {
                    Some(record) => {
                        let encoded = bincode::serialize(&record).expect("record serializes");
                        table.insert(key.as_str(), encoded.as_slice())?;
                    }
                    None => {
                        table.remove(key.as_str())?;
                    }
                }
            }
        }
        write.commit()?;
        Ok(())
    }

    /// Read a text file's words as training data: every word is recorded
    /// with its two predecessors as context.
    pub fn import_training_text(&self, text: &str) {
        let now = now_secs();
        let mut context1 = String::new();
        let mut context2 = String::new();
        for word in text.split_whitespace() {
            let word = word.trim_matches(|c: char| c.is_ascii_punctuation());
            if word.is_empty() {
                continue;
            }
            self.record_commit_at(word, &context1, &context2, now);
            context2 = std::mem::take(&mut context1);
            context1 = word.to_string();
        }
        info!(path = %self.inner.path.display(), "training data imported");
    }

    /// Every entry, for export and debugging.
    pub fn dump(&self) -> Vec<UserDbEntry> {
        self.rows_with_prefix("").unwrap_or_default()
    }

    pub fn metadata(&self) -> UserDbMetadata {
        let rows = self.dump();
        UserDbMetadata {
            schema_version: SCHEMA_VERSION.to_string(),
            entry_count: rows.len() as u64,
            total_frequency: rows.iter().map(|entry| entry.frequency).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_then_lookup_round_trip() {
        let db = UserDb::new_temp();
        db.record_commit("colour", "", "");
        let hits = db.lookup("colo", "", "");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "colour");
        assert_eq!(db.frequency("colour"), 1);
    }

    #[test]
    fn context_match_outranks_context_mismatch() {
        let db = UserDb::new_temp();
        let now = 1_000_000.0;
        // "cold" committed often but in another context; "colour" in ours.
        for _ in 0..5 {
            db.record_commit_at("cold", "freezing", "", now);
        }
        db.record_commit_at("colour", "nice", "a", now);
        let hits = db.lookup_at("co", "nice", "a", now);
        assert_eq!(hits[0].0, "colour");
        // Without context the frequent phrase wins.
        let hits = db.lookup_at("co", "", "", now);
        assert_eq!(hits[0].0, "cold");
    }

    #[test]
    fn forget_removes_entry() {
        let db = UserDb::new_temp();
        db.record_commit("teh", "", "");
        assert!(db.knows_phrase("teh"));
        db.forget("teh", "", "");
        assert!(!db.knows_phrase("teh"));
        assert!(db.lookup("teh", "", "").is_empty());
    }

    #[test]
    fn decay_is_monotone_and_purges_stale_noise() {
        let db = UserDb::new_temp();
        let day = SECONDS_PER_DAY;
        db.record_commit_at("old", "", "", 0.0);
        db.record_commit_at("fresh", "", "", 200.0 * day);
        let before: HashMap<String, f64> = db
            .dump()
            .into_iter()
            .map(|entry| (entry.phrase, entry.user_freq))
            .collect();
        db.decay_pass_at(200.0 * day);
        let after: HashMap<String, f64> = db
            .dump()
            .into_iter()
            .map(|entry| (entry.phrase, entry.user_freq))
            .collect();
        for (phrase, weight) in &after {
            assert!(weight <= &before[phrase], "{phrase} increased");
        }
        assert_eq!(after["old"], before["old"] / 2.0);
        assert_eq!(after["fresh"], before["fresh"]);

        // Decay "old" below the purge threshold, then age it out.
        for _ in 0..6 {
            db.decay_pass_at(200.0 * day);
        }
        db.decay_pass_at(400.0 * day);
        assert!(!db.knows_phrase("old"));
        assert!(db.knows_phrase("fresh"));
    }

    #[test]
    fn recency_boosts_recent_phrases() {
        let db = UserDb::new_temp();
        let day = SECONDS_PER_DAY;
        db.record_commit_at("stale", "", "", 0.0);
        db.record_commit_at("stale", "", "", 0.0);
        db.record_commit_at("star", "", "", 90.0 * day);
        let hits = db.lookup_at("sta", "", "", 90.0 * day);
        assert_eq!(hits[0].0, "star");
    }

    #[test]
    fn score_is_pure_and_ordered() {
        let base = ScoreInputs {
            unigram: 0.4,
            bigram: None,
            trigram: None,
            age_days: 0.0,
        };
        assert_eq!(score(&base), score(&base));
        // More context never hurts for equal shares.
        let with_bigram = ScoreInputs {
            bigram: Some(0.4),
            ..base
        };
        let with_trigram = ScoreInputs {
            bigram: Some(0.4),
            trigram: Some(0.4),
            ..base
        };
        assert!(score(&with_bigram) >= score(&base) - 1e-12);
        assert!(score(&with_trigram) >= score(&with_bigram) - 1e-12);
        // Aging strictly decays.
        let aged = ScoreInputs {
            age_days: 30.0,
            ..base
        };
        assert!((score(&aged) - score(&base) / 2.0).abs() < 1e-12);
    }

    #[test]
    fn eviction_removes_weakest_entry() {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "typebooster_evict_{}_{}.redb",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let db = UserDb {
            inner: Arc::new(Inner {
                db: Database::create(&path).unwrap(),
                path: path.clone(),
                max_entries: 3,
            }),
        };
        db.check_schema().unwrap();
        db.record_commit_at("strong", "", "", 100.0);
        db.record_commit_at("strong", "", "", 100.0);
        db.record_commit_at("weak", "", "", 10.0);
        db.record_commit_at("middle", "", "", 50.0);
        // Fourth distinct entry exceeds the ceiling of three.
        db.record_commit_at("newest", "", "", 200.0);
        assert!(!db.knows_phrase("weak"));
        assert!(db.knows_phrase("strong"));
        assert!(db.knows_phrase("newest"));
        assert_eq!(db.dump().len(), 3);
    }

    #[test]
    fn quarantine_on_corruption() {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "typebooster_corrupt_{}_{}.redb",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::write(&path, b"this is not a redb file at all").unwrap();
        let (db, notice) = UserDb::open(&path).unwrap();
        assert!(notice.is_some());
        db.record_commit("hello", "", "");
        assert!(db.knows_phrase("hello"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn training_import_records_context_chain() {
        let db = UserDb::new_temp();
        db.import_training_text("one two three");
        assert!(db.knows_phrase("three"));
        let rows = db.dump();
        let three = rows.iter().find(|entry| entry.phrase == "three").unwrap();
        assert_eq!(three.context1, "two");
        assert_eq!(three.context2, "one");
    }
}
