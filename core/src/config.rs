//! Configuration: the typed settings struct, the declarative option
//! schema, TOML persistence, and the version-stamped publication used for
//! hot reload.
//!
//! Every recognized option is described in [`SCHEMA`] with its type,
//! default and bounds; the setup tooling iterates over that table instead
//! of reflecting over the struct. Unrecognized appearance keys (colors,
//! labels) are kept verbatim and forwarded to the host.

use crate::error::Error;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// What commits get recorded in the user database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RecordMode {
    /// Record every commit.
    #[default]
    #[serde(rename = "everything")]
    Everything = 0,
    /// Record commits that spellcheck, or that are already recorded.
    #[serde(rename = "correct-or-recorded")]
    CorrectOrPreviouslyRecorded = 1,
    /// Record only commits that validate against a loaded dictionary.
    #[serde(rename = "correct")]
    Correct = 2,
    /// Record nothing.
    #[serde(rename = "nothing")]
    Nothing = 3,
}

impl RecordMode {
    pub fn from_index(index: i64) -> Option<RecordMode> {
        match index {
            0 => Some(RecordMode::Everything),
            1 => Some(RecordMode::CorrectOrPreviouslyRecorded),
            2 => Some(RecordMode::Correct),
            3 => Some(RecordMode::Nothing),
            _ => None,
        }
    }
}

/// Inline completion: show the best candidate merged into the preedit
/// instead of opening the lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InlineCompletion {
    #[default]
    Off = 0,
    Visible = 1,
}

/// Whether the first candidate starts out selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AutoSelect {
    #[default]
    Off = 0,
    On = 1,
}

/// One autosetting rule: set `option` to `value` when the focused client
/// id matches `pattern` (a regex-ish substring match; see
/// [`Settings::autosettings_for`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoSetting {
    pub option: String,
    pub value: String,
    pub pattern: String,
}

/// The complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Configured transliterations, priority order, max 10.
    pub inputmethod: Vec<String>,
    /// Configured dictionary locales, max 10.
    pub dictionary: Vec<String>,
    pub emojipredictions: bool,
    /// Characters that force an emoji lookup when leading or trailing.
    pub emojitriggercharacters: String,
    /// Show emoji of every Unicode version.
    pub unicodedataall: bool,
    /// Minimum typed characters before completion kicks in (1..=9).
    pub mincharcomplete: u8,
    /// Candidates per lookup-table page (1..=9).
    pub pagesize: u8,
    pub inlinecompletion: InlineCompletion,
    pub autoselectcandidate: AutoSelect,
    /// Characters that commit the preedit, then themselves plus a space.
    pub autocommitcharacters: String,
    /// Only show the lookup table on request (Tab).
    pub tabenable: bool,
    pub arrowkeysreopenpreedit: bool,
    pub disableinterminals: bool,
    pub offtherecord: bool,
    pub recordmode: RecordMode,
    /// Direct input (false) versus transliterated input (true).
    pub inputmode: bool,
    pub rememberinputmode: bool,
    pub rememberlastusedpreeditime: bool,
    pub candidatesdelaymilliseconds: u64,
    pub debuglevel: i32,
    pub autocapitalize: bool,
    /// command name → key combo strings; unset commands keep defaults.
    pub keybindings: HashMap<String, Vec<String>>,
    pub autosettings: Vec<AutoSetting>,
    /// Appearance keys the core ignores and forwards to the host.
    pub appearance: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            inputmethod: Vec::new(),
            dictionary: vec!["en".to_string()],
            emojipredictions: false,
            emojitriggercharacters: "_".to_string(),
            unicodedataall: false,
            mincharcomplete: 1,
            pagesize: 6,
            inlinecompletion: InlineCompletion::Off,
            autoselectcandidate: AutoSelect::Off,
            autocommitcharacters: String::new(),
            tabenable: false,
            arrowkeysreopenpreedit: true,
            disableinterminals: false,
            offtherecord: false,
            recordmode: RecordMode::Everything,
            inputmode: true,
            rememberinputmode: true,
            rememberlastusedpreeditime: true,
            candidatesdelaymilliseconds: 200,
            debuglevel: 0,
            autocapitalize: false,
            keybindings: HashMap::new(),
            autosettings: Vec::new(),
            appearance: HashMap::new(),
        }
    }
}

/// Option value type for the schema table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    /// Integer with inclusive bounds.
    Int { min: i64, max: i64 },
    Str,
    /// Comma-separated list with a maximum length.
    StrList { max_items: usize },
    /// Index into a fixed set of variants.
    Enum { variants: &'static [&'static str] },
    KeyBindings,
    AutoSettings,
}

/// One schema row: option name, type, default rendered as a string.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: &'static str,
}

/// The declarative option table. The setup tool iterates over this; the
/// engine validates against it.
pub static SCHEMA: Lazy<Vec<OptionSpec>> = Lazy::new(|| {
    use OptionKind::*;
    vec![
        OptionSpec { name: "inputmethod", kind: StrList { max_items: 10 }, default: "" },
        OptionSpec { name: "dictionary", kind: StrList { max_items: 10 }, default: "en" },
        OptionSpec { name: "emojipredictions", kind: Bool, default: "false" },
        OptionSpec { name: "emojitriggercharacters", kind: Str, default: "_" },
        OptionSpec { name: "unicodedataall", kind: Bool, default: "false" },
        OptionSpec { name: "mincharcomplete", kind: Int { min: 1, max: 9 }, default: "1" },
        OptionSpec { name: "pagesize", kind: Int { min: 1, max: 9 }, default: "6" },
        OptionSpec {
            name: "inlinecompletion",
            kind: Enum { variants: &["off", "visible"] },
            default: "off",
        },
        OptionSpec {
            name: "autoselectcandidate",
            kind: Enum { variants: &["off", "on"] },
            default: "off",
        },
        OptionSpec { name: "autocommitcharacters", kind: Str, default: "" },
        OptionSpec { name: "tabenable", kind: Bool, default: "false" },
        OptionSpec { name: "arrowkeysreopenpreedit", kind: Bool, default: "true" },
        OptionSpec { name: "disableinterminals", kind: Bool, default: "false" },
        OptionSpec { name: "offtherecord", kind: Bool, default: "false" },
        OptionSpec {
            name: "recordmode",
            kind: Enum {
                variants: &["everything", "correct-or-recorded", "correct", "nothing"],
            },
            default: "everything",
        },
        OptionSpec { name: "inputmode", kind: Bool, default: "true" },
        OptionSpec { name: "rememberinputmode", kind: Bool, default: "true" },
        OptionSpec { name: "rememberlastusedpreeditime", kind: Bool, default: "true" },
        OptionSpec {
            name: "candidatesdelaymilliseconds",
            kind: Int { min: 0, max: 60_000 },
            default: "200",
        },
        OptionSpec { name: "debuglevel", kind: Int { min: 0, max: 5 }, default: "0" },
        OptionSpec { name: "autocapitalize", kind: Bool, default: "false" },
        OptionSpec { name: "keybindings", kind: KeyBindings, default: "" },
        OptionSpec { name: "autosettings", kind: AutoSettings, default: "" },
    ]
});

impl Settings {
    pub fn spec(name: &str) -> Option<&'static OptionSpec> {
        SCHEMA.iter().find(|spec| spec.name == name)
    }

    /// Load from a TOML file. Every malformed or out-of-bounds entry is
    /// reported and skipped; the rest applies over the defaults.
    pub fn load_toml(path: impl AsRef<std::path::Path>) -> (Settings, Vec<Error>) {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(source) => {
                return (
                    Settings::default(),
                    vec![Error::transient(path.display().to_string(), source)],
                )
            }
        };
        Settings::from_toml_str(&text, &path.display().to_string())
    }

    pub fn from_toml_str(text: &str, file: &str) -> (Settings, Vec<Error>) {
        let mut settings = Settings::default();
        let mut errors = Vec::new();
        let table: toml::Table = match text.parse() {
            Ok(table) => table,
            Err(e) => {
                errors.push(Error::malformed(file, 0, e.to_string()));
                return (settings, errors);
            }
        };
        for (name, value) in table {
            if let Err(error) = settings.apply_toml(&name, value, file) {
                errors.push(error);
            }
        }
        (settings, errors)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn save_toml(&self, path: impl AsRef<std::path::Path>) -> Result<(), Error> {
        let text = self
            .to_toml_string()
            .map_err(|e| Error::invariant(format!("settings serialize: {e}")))?;
        std::fs::write(path.as_ref(), text)
            .map_err(|source| Error::transient(path.as_ref().display().to_string(), source))
    }

    fn apply_toml(&mut self, name: &str, value: toml::Value, file: &str) -> Result<(), Error> {
        let malformed = |message: String| Error::malformed(file, 0, message);
        let Some(spec) = Settings::spec(name) else {
            // Appearance keys are not part of the schema; keep them for
            // the host. Anything else is reported.
            if name.starts_with("color") || name.starts_with("label") || name.starts_with("font") {
                if let Some(text) = value.as_str() {
                    self.appearance.insert(name.to_string(), text.to_string());
                    return Ok(());
                }
            }
            return Err(malformed(format!("unknown option {name:?}")));
        };
        match spec.kind {
            OptionKind::Bool => {
                let parsed = value
                    .as_bool()
                    .ok_or_else(|| malformed(format!("{name}: expected bool")))?;
                match name {
                    "emojipredictions" => self.emojipredictions = parsed,
                    "unicodedataall" => self.unicodedataall = parsed,
                    "tabenable" => self.tabenable = parsed,
                    "arrowkeysreopenpreedit" => self.arrowkeysreopenpreedit = parsed,
                    "disableinterminals" => self.disableinterminals = parsed,
                    "offtherecord" => self.offtherecord = parsed,
                    "inputmode" => self.inputmode = parsed,
                    "rememberinputmode" => self.rememberinputmode = parsed,
                    "rememberlastusedpreeditime" => self.rememberlastusedpreeditime = parsed,
                    "autocapitalize" => self.autocapitalize = parsed,
                    _ => return Err(malformed(format!("{name}: not a bool option"))),
                }
            }
            OptionKind::Int { min, max } => {
                let parsed = value
                    .as_integer()
                    .ok_or_else(|| malformed(format!("{name}: expected integer")))?;
                if parsed < min || parsed > max {
                    return Err(malformed(format!("{name}: {parsed} outside {min}..={max}")));
                }
                match name {
                    "mincharcomplete" => self.mincharcomplete = parsed as u8,
                    "pagesize" => self.pagesize = parsed as u8,
                    "candidatesdelaymilliseconds" => {
                        self.candidatesdelaymilliseconds = parsed as u64
                    }
                    "debuglevel" => self.debuglevel = parsed as i32,
                    _ => return Err(malformed(format!("{name}: not an int option"))),
                }
            }
            OptionKind::Str => {
                let parsed = value
                    .as_str()
                    .ok_or_else(|| malformed(format!("{name}: expected string")))?;
                match name {
                    "emojitriggercharacters" => {
                        self.emojitriggercharacters = parsed.to_string()
                    }
                    "autocommitcharacters" => self.autocommitcharacters = parsed.to_string(),
                    _ => return Err(malformed(format!("{name}: not a string option"))),
                }
            }
            OptionKind::StrList { max_items } => {
                let items: Vec<String> = match &value {
                    toml::Value::String(text) => text
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect(),
                    toml::Value::Array(array) => array
                        .iter()
                        .filter_map(|v| v.as_str())
                        .map(str::to_string)
                        .collect(),
                    _ => return Err(malformed(format!("{name}: expected string or array"))),
                };
                if items.len() > max_items {
                    return Err(malformed(format!(
                        "{name}: more than {max_items} entries"
                    )));
                }
                match name {
                    "inputmethod" => self.inputmethod = items,
                    "dictionary" => self.dictionary = items,
                    _ => return Err(malformed(format!("{name}: not a list option"))),
                }
            }
            OptionKind::Enum { variants } => {
                let index = match &value {
                    toml::Value::Integer(index) => *index,
                    toml::Value::String(text) => variants
                        .iter()
                        .position(|v| v == text)
                        .map(|p| p as i64)
                        .ok_or_else(|| {
                            malformed(format!("{name}: unknown variant {text:?}"))
                        })?,
                    _ => return Err(malformed(format!("{name}: expected enum index or name"))),
                };
                if index < 0 || index as usize >= variants.len() {
                    return Err(malformed(format!("{name}: index {index} out of range")));
                }
                match name {
                    "inlinecompletion" => {
                        self.inlinecompletion = if index == 0 {
                            InlineCompletion::Off
                        } else {
                            InlineCompletion::Visible
                        }
                    }
                    "autoselectcandidate" => {
                        self.autoselectcandidate =
                            if index == 0 { AutoSelect::Off } else { AutoSelect::On }
                    }
                    "recordmode" => {
                        self.recordmode = RecordMode::from_index(index)
                            .ok_or_else(|| malformed(format!("{name}: bad index {index}")))?
                    }
                    _ => return Err(malformed(format!("{name}: not an enum option"))),
                }
            }
            OptionKind::KeyBindings => {
                let table = value
                    .as_table()
                    .ok_or_else(|| malformed(format!("{name}: expected table")))?;
                for (command, combos) in table {
                    let combos: Vec<String> = match combos {
                        toml::Value::Array(array) => array
                            .iter()
                            .filter_map(|v| v.as_str())
                            .map(str::to_string)
                            .collect(),
                        toml::Value::String(text) if text.is_empty() => Vec::new(),
                        toml::Value::String(text) => vec![text.clone()],
                        _ => {
                            return Err(malformed(format!(
                                "keybindings.{command}: expected array of strings"
                            )))
                        }
                    };
                    self.keybindings.insert(command.clone(), combos);
                }
            }
            OptionKind::AutoSettings => {
                let array = value
                    .as_array()
                    .ok_or_else(|| malformed(format!("{name}: expected array")))?;
                for entry in array {
                    let triple = entry.as_array().filter(|a| a.len() == 3).ok_or_else(|| {
                        malformed(format!("{name}: expected [option, value, pattern]"))
                    })?;
                    let as_str = |index: usize| {
                        triple[index]
                            .as_str()
                            .map(str::to_string)
                            .ok_or_else(|| malformed(format!("{name}: non-string entry")))
                    };
                    self.autosettings.push(AutoSetting {
                        option: as_str(0)?,
                        value: as_str(1)?,
                        pattern: as_str(2)?,
                    });
                }
            }
        }
        Ok(())
    }

    /// Apply one option given as a raw string (autosettings, property
    /// toggles). The value is parsed as TOML first, falling back to a
    /// plain string.
    pub fn apply_str(&mut self, name: &str, raw: &str) -> Result<(), Error> {
        let value = if let Ok(boolean) = raw.parse::<bool>() {
            toml::Value::Boolean(boolean)
        } else if let Ok(integer) = raw.parse::<i64>() {
            toml::Value::Integer(integer)
        } else {
            toml::Value::String(raw.to_string())
        };
        self.apply_toml(name, value, "autosettings")
    }

    /// The autosettings whose pattern matches a client id. Matching is a
    /// case-insensitive substring test; a pattern wrapped in `^...$`
    /// requires a full match.
    pub fn autosettings_for(&self, client_id: &str) -> Vec<&AutoSetting> {
        let client = client_id.to_lowercase();
        self.autosettings
            .iter()
            .filter(|setting| {
                let pattern = setting.pattern.to_lowercase();
                if let Some(exact) = pattern
                    .strip_prefix('^')
                    .and_then(|p| p.strip_suffix('$'))
                {
                    client == exact
                } else {
                    client.contains(pattern.trim_start_matches('^').trim_end_matches('$'))
                }
            })
            .collect()
    }
}

/// Version-stamped publication point for hot reload: writers publish a new
/// immutable snapshot, the event loop picks it up between events.
#[derive(Debug)]
pub struct ConfigStore {
    current: RwLock<Arc<Settings>>,
    version: AtomicU64,
}

impl Default for ConfigStore {
    fn default() -> Self {
        ConfigStore::new(Settings::default())
    }
}

impl ConfigStore {
    pub fn new(settings: Settings) -> ConfigStore {
        ConfigStore {
            current: RwLock::new(Arc::new(settings)),
            version: AtomicU64::new(1),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn current(&self) -> Arc<Settings> {
        self.current.read().expect("config lock").clone()
    }

    /// Publish a new snapshot; returns its version stamp.
    pub fn publish(&self, settings: Settings) -> u64 {
        let mut slot = self.current.write().expect("config lock");
        *slot = Arc::new(settings);
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_schema() {
        let settings = Settings::default();
        assert_eq!(settings.pagesize, 6);
        assert_eq!(settings.emojitriggercharacters, "_");
        assert_eq!(settings.recordmode, RecordMode::Everything);
        for spec in SCHEMA.iter() {
            assert!(Settings::spec(spec.name).is_some());
        }
    }

    #[test]
    fn toml_round_trip_and_validation() {
        let text = r##"
inputmethod = "hi-itrans,NoIME"
dictionary = ["en", "de"]
emojipredictions = true
pagesize = 4
mincharcomplete = 12
recordmode = "correct"
autocommitcharacters = ".,"
colorlookuptable = "#fafafa"
nosuchoption = 1

[keybindings]
cancel = ["Escape", "Control+g"]
enable_lookup = []
"##;
        let (settings, errors) = Settings::from_toml_str(text, "test.toml");
        assert_eq!(
            settings.inputmethod,
            vec!["hi-itrans".to_string(), "NoIME".to_string()]
        );
        assert_eq!(settings.dictionary.len(), 2);
        assert!(settings.emojipredictions);
        assert_eq!(settings.pagesize, 4);
        // Out-of-range and unknown entries are skipped, not fatal.
        assert_eq!(settings.mincharcomplete, 1);
        assert_eq!(errors.len(), 2);
        assert_eq!(settings.recordmode, RecordMode::Correct);
        assert_eq!(settings.keybindings["cancel"].len(), 2);
        assert!(settings.keybindings["enable_lookup"].is_empty());
        assert_eq!(settings.appearance["colorlookuptable"], "#fafafa");
        // And it serializes back.
        assert!(settings.to_toml_string().is_ok());
    }

    #[test]
    fn autosettings_match_client_ids() {
        let (settings, errors) = Settings::from_toml_str(
            r#"autosettings = [["offtherecord", "true", "gnome-terminal"], ["pagesize", "9", "^firefox$"]]"#,
            "test.toml",
        );
        assert!(errors.is_empty());
        assert_eq!(settings.autosettings.len(), 2);
        let hits = settings.autosettings_for("Gnome-Terminal-Server");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].option, "offtherecord");
        assert_eq!(settings.autosettings_for("firefox").len(), 1);
        assert!(settings.autosettings_for("firefox-esr").is_empty());
    }

    #[test]
    fn config_store_versions_monotonically() {
        let store = ConfigStore::default();
        let v1 = store.version();
        let mut updated = (*store.current()).clone();
        updated.pagesize = 9;
        let v2 = store.publish(updated);
        assert!(v2 > v1);
        assert_eq!(store.current().pagesize, 9);
    }
}
